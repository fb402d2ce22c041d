//! Typed data model for flatdex.
//!
//! Entities here carry a canonical bidirectional JSON mapping and no business
//! logic. JSON keys are PascalCase forms of the field names; collections are
//! omitted when empty and default to empty when absent; indexed collections
//! (in-memory maps) serialize as arrays sorted by their key field so encoded
//! output is deterministic.

pub mod build;
pub mod dates;
pub mod error;
pub mod indexed;
pub mod registry;

pub use build::{BuildModel, FlatpakBuildModel, ImageBuildModel};
pub use error::{ModelError, Result};
pub use indexed::Keyed;
pub use registry::{
    ImageModel, RegistryModel, RepositoryModel, TagHistoryItemModel, TagHistoryModel,
};
