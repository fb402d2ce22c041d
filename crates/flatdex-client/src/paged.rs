use crate::error::Result;

/// One page of a paginated catalog response.
pub(crate) struct PagedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Accumulates items across pages until the reported total is covered.
///
/// `fetch` receives the zero-based page number and is called once per page,
/// so covering `total` items at `page_size` items per page takes exactly
/// `ceil(total / page_size)` requests.
pub(crate) fn collect_paged<T, F>(page_size: u32, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Result<PagedResponse<T>>,
{
    let mut items = Vec::new();
    let mut page = 0u32;

    loop {
        let response = fetch(page)?;
        let count = response.items.len() as u64;
        items.extend(response.items);

        if response.total <= u64::from(page_size) * u64::from(page) + count {
            return Ok(items);
        }

        page += 1;
    }
}
