use miette::Diagnostic;
use thiserror::Error;

use flatdex_client::ClientError;
use flatdex_model::ModelError;
use flatdex_utils::error::FileSystemError;

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error("{0}")]
    #[diagnostic(code(flatdex_core::filesystem))]
    FileSystem(#[from] FileSystemError),

    #[error("Invalid build identifier `{nvr}`")]
    #[diagnostic(
        code(flatdex_core::invalid_nvr),
        help("Build identifiers must have the form name-version-release")
    )]
    InvalidNvr { nvr: String },

    #[error("Build {nvr} has no usable image digest")]
    #[diagnostic(
        code(flatdex_core::missing_digest),
        help("The build archive carries neither an OCI nor a docker manifest digest")
    )]
    MissingDigest { nvr: String },

    #[error("Failed to serialize snapshot: {0}")]
    #[diagnostic(code(flatdex_core::serialize))]
    Serialize(#[from] serde_json::Error),

    #[error("Error while {action}")]
    #[diagnostic(code(flatdex_core::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| CoreError::IoError {
            action: context(),
            source: err,
        })
    }
}
