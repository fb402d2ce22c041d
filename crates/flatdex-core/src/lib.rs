//! The flatdex aggregation engine.
//!
//! For each configured registry this crate walks the two metadata backends
//! (catalog tag histories and build-system tag membership), reconciles the
//! observations into one [`flatdex_model::RegistryModel`], persists the
//! per-registry snapshot atomically, and publishes the per-index files.

pub mod error;
pub mod index;
pub mod resolver;
pub mod updater;
pub mod writer;

pub use error::{CoreError, ErrorContext, Result};
pub use index::Indexer;
pub use resolver::BuildResolver;
pub use updater::{update_registries, update_registry};
pub use writer::write_snapshot;
