use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ModelError {
    #[error("Failed to decode {entity}: {source}")]
    #[diagnostic(
        code(flatdex_model::decode),
        help("The document does not match the expected schema")
    )]
    Decode {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode {entity}: {source}")]
    #[diagnostic(code(flatdex_model::encode))]
    Encode {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ModelError>;
