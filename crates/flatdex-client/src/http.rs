use std::{thread, time::Duration};

use serde::de::DeserializeOwned;
use tracing::warn;
use ureq::{http::StatusCode, Agent};

use crate::error::{ClientError, Result};

const RETRY_MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 500;

// Request Timeout, Internal Server Error, Bad Gateway, Service Unavailable,
// Gateway Timeout
const RETRY_STATUSES: [u16; 5] = [408, 500, 502, 503, 504];

pub(crate) fn is_transient(status: u16) -> bool {
    RETRY_STATUSES.contains(&status)
}

pub(crate) fn backoff_delay(completed_attempts: u32) -> Duration {
    let factor = 1u64 << completed_attempts.min(16);
    Duration::from_millis(RETRY_BASE_DELAY_MS.saturating_mul(factor))
}

/// Issues a GET request for a JSON document, retrying transient failures
/// with exponential backoff.
///
/// Transient HTTP statuses (408/5xx gateway family) and transport errors are
/// retried up to [`RETRY_MAX_ATTEMPTS`] times; other statuses fail
/// immediately, with 404 mapped to [`ClientError::NotFound`] so callers can
/// treat missing resources as empty results.
pub(crate) fn get_json<T: DeserializeOwned>(agent: &Agent, url: &str) -> Result<T> {
    let mut attempt = 0;

    loop {
        attempt += 1;

        match agent.get(url).header("Accept", "application/json").call() {
            Ok(mut response) => {
                let status = response.status();

                if status.is_success() {
                    return response.body_mut().read_json::<T>().map_err(|source| {
                        ClientError::InvalidResponse {
                            url: url.to_string(),
                            source: Box::new(source),
                        }
                    });
                }

                if status == StatusCode::NOT_FOUND {
                    return Err(ClientError::NotFound {
                        url: url.to_string(),
                    });
                }

                if !is_transient(status.as_u16()) {
                    return Err(ClientError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }

                if attempt >= RETRY_MAX_ATTEMPTS {
                    return Err(ClientError::RetriesExhausted {
                        url: url.to_string(),
                        status: status.as_u16(),
                        attempts: attempt,
                    });
                }

                warn!("{url} returned status {status}, retrying");
            }
            Err(source) => {
                if attempt >= RETRY_MAX_ATTEMPTS {
                    return Err(ClientError::Transport {
                        url: url.to_string(),
                        source: Box::new(source),
                    });
                }

                warn!("Request to {url} failed ({source}), retrying");
            }
        }

        thread::sleep(backoff_delay(attempt - 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        for status in [408, 500, 502, 503, 504] {
            assert!(is_transient(status));
        }
        for status in [200, 301, 400, 401, 403, 404, 410] {
            assert!(!is_transient(status));
        }
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
        assert_eq!(backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert!(backoff_delay(u32::MAX) < Duration::from_secs(24 * 60 * 60));
    }
}
