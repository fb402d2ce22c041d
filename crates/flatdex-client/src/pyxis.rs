use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use ureq::Agent;

use flatdex_model::dates;

use crate::{
    error::{ClientError, Result},
    http::get_json,
    http_client::ClientConfig,
    paged::{collect_paged, PagedResponse},
};

/// Read access to the container catalog backend.
pub trait Catalog {
    /// Repository names the catalog associates with the given registry.
    fn repositories(&self, registry: &str) -> Result<Vec<String>>;

    /// The ordered (most recent first) tag history for one repository tag.
    /// A tag the catalog does not know yields an empty list.
    fn tag_history(&self, registry: &str, repository: &str, tag: &str) -> Result<Vec<TagEvent>>;
}

/// One tag-history observation: the build that held the tag, and when it
/// became the holder.
#[derive(Clone, Debug, PartialEq)]
pub struct TagEvent {
    pub nvr: String,
    pub date: DateTime<Utc>,
}

/// HTTP client for a Pyxis-style container catalog.
pub struct PyxisClient {
    agent: Agent,
    base_url: String,
    page_size: u32,
}

impl PyxisClient {
    pub fn new(base_url: &str, client_config: &ClientConfig, page_size: u32) -> Self {
        Self {
            agent: client_config.build(),
            base_url: base_url.to_string(),
            page_size,
        }
    }

    fn paged_url(&self, url: &str, page: u32) -> String {
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{url}{sep}page_size={}&page={page}", self.page_size)
    }
}

#[derive(Deserialize)]
struct RepositoryPage {
    data: Vec<RepositoryEntry>,
    total: u64,
}

#[derive(Deserialize)]
struct RepositoryEntry {
    registry: String,
    repository: String,
}

#[derive(Deserialize)]
struct TagHistoryPage {
    history: Vec<TagHistoryEntry>,
    total: u64,
}

#[derive(Deserialize)]
struct TagHistoryEntry {
    brew_build: String,
    start_date: String,
}

impl Catalog for PyxisClient {
    fn repositories(&self, registry: &str) -> Result<Vec<String>> {
        let url = format!("{}repositories?image_usage_type=Flatpak", self.base_url);

        let entries = collect_paged(self.page_size, |page| {
            let paginated = self.paged_url(&url, page);
            info!("Requesting {paginated}");
            let response: RepositoryPage = get_json(&self.agent, &paginated)?;
            Ok(PagedResponse {
                items: response.data,
                total: response.total,
            })
        })?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.registry == registry)
            .map(|entry| entry.repository)
            .collect())
    }

    fn tag_history(&self, registry: &str, repository: &str, tag: &str) -> Result<Vec<TagEvent>> {
        let url = format!(
            "{}tag-history/registry/{registry}/repository/{repository}/tag/{tag}",
            self.base_url
        );

        let entries = collect_paged(self.page_size, |page| {
            let paginated = self.paged_url(&url, page);
            info!("Requesting {paginated}");
            match get_json::<TagHistoryPage>(&self.agent, &paginated) {
                Ok(response) => Ok(PagedResponse {
                    items: response.history,
                    total: response.total,
                }),
                // The catalog answers 404 for a tag it has never seen
                Err(ClientError::NotFound { .. }) => Ok(PagedResponse {
                    items: Vec::new(),
                    total: 0,
                }),
                Err(err) => Err(err),
            }
        })?;

        entries
            .into_iter()
            .map(|entry| {
                let date = dates::parse_date(&entry.start_date).map_err(|_| {
                    ClientError::InvalidTimestamp {
                        value: entry.start_date.clone(),
                    }
                })?;
                Ok(TagEvent {
                    nvr: entry.brew_build,
                    date,
                })
            })
            .collect()
    }
}
