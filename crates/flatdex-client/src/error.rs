use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ClientError {
    #[error("Request to {url} failed: {source}")]
    #[diagnostic(
        code(flatdex_client::transport),
        help("Check your network connection and the backend URL")
    )]
    Transport {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("{url} returned status {status}")]
    #[diagnostic(code(flatdex_client::status))]
    Status { url: String, status: u16 },

    #[error("{url} still failing with status {status} after {attempts} attempts")]
    #[diagnostic(
        code(flatdex_client::retries_exhausted),
        help("The backend looks unhealthy; try again later")
    )]
    RetriesExhausted {
        url: String,
        status: u16,
        attempts: u32,
    },

    #[error("{url} not found")]
    #[diagnostic(code(flatdex_client::not_found))]
    NotFound { url: String },

    #[error("Build {nvr} not found in the build-tracking backend")]
    #[diagnostic(
        code(flatdex_client::build_not_found),
        help("The catalog referenced a build the build system does not know")
    )]
    BuildNotFound { nvr: String },

    #[error("Unexpected payload from {url}: {source}")]
    #[diagnostic(code(flatdex_client::payload))]
    InvalidResponse {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("Invalid timestamp `{value}` in catalog response")]
    #[diagnostic(code(flatdex_client::timestamp))]
    InvalidTimestamp { value: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;
