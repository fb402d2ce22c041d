use std::path::Path;

use crate::error::{HashError, HashResult};

/// Computes the blake3 digest of a file's contents.
///
/// # Errors
///
/// * [`HashError::ReadFailed`] if the file cannot be read.
pub fn file_digest<P: AsRef<Path>>(path: P) -> HashResult<blake3::Hash> {
    let path = path.as_ref();
    let mut hasher = blake3::Hasher::new();
    hasher.update_mmap(path).map_err(|err| HashError::ReadFailed {
        path: path.to_path_buf(),
        source: err,
    })?;
    Ok(hasher.finalize())
}

/// Computes the blake3 digest of an in-memory byte slice.
pub fn bytes_digest(bytes: &[u8]) -> blake3::Hash {
    blake3::hash(bytes)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::{bytes_digest, file_digest};

    #[test]
    fn test_file_digest_matches_bytes_digest() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"snapshot contents\n").unwrap();

        assert_eq!(
            file_digest(file.path()).unwrap(),
            bytes_digest(b"snapshot contents\n")
        );
    }

    #[test]
    fn test_file_digest_missing_file() {
        assert!(file_digest("/no/such/file").is_err());
    }

    #[test]
    fn test_bytes_digest_differs() {
        assert_ne!(bytes_digest(b"a"), bytes_digest(b"b"));
    }
}
