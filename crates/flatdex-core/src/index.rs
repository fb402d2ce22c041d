use std::{collections::HashMap, fs, path::Path};

use serde::Serialize;
use tracing::{debug, info};

use flatdex_config::{Config, IndexConfig, RegistryConfig};
use flatdex_model::{ImageModel, RegistryModel, RepositoryModel};
use flatdex_utils::fs::atomic_write;

use crate::{
    error::{ErrorContext, Result},
    writer::to_sorted_pretty,
};

const FLATPAK_TOKEN_TYPE_LABEL: &str = "org.flatpak.commit-metadata.xa.token-type";
// base64-encoded GVariant holding a variant holding the int32 1
const FLATPAK_TOKEN_TYPE_VALUE: &str = "AQAAAABp";

/// The published form of one index config: the index's registry filtered
/// down to images carrying the index tag.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct IndexDocument<'a> {
    registry: &'a str,
    results: Vec<RepositoryModel>,
}

/// Writes the per-index output files from the queried registry data.
///
/// The first run always writes; later runs short-circuit when the queried
/// data digest has not changed since the previous cycle.
pub struct Indexer<'a> {
    config: &'a Config,
    last_data_digest: Option<blake3::Hash>,
}

impl<'a> Indexer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            last_data_digest: None,
        }
    }

    fn data_digest(&self, data: &HashMap<String, RegistryModel>) -> Result<blake3::Hash> {
        let mut hasher = blake3::Hasher::new();

        let mut names: Vec<&String> = data.keys().collect();
        names.sort();
        for name in names {
            hasher.update(name.as_bytes());
            hasher.update(data[name].to_json_text()?.as_bytes());
        }

        Ok(hasher.finalize())
    }

    pub fn index(&mut self, data: &HashMap<String, RegistryModel>) -> Result<()> {
        let digest = self.data_digest(data)?;
        if self.last_data_digest == Some(digest) {
            debug!("Skipping indexing, queried data has not changed");
            return Ok(());
        }

        for index in &self.config.indexes {
            let Some(registry_model) = data.get(&index.registry) else {
                debug!("No queried information found for {}", index.registry);
                continue;
            };
            let Some(registry_config) = self.config.registries.get(&index.registry) else {
                continue;
            };

            self.write_index(index, registry_config, registry_model)?;
        }

        self.last_data_digest = Some(digest);
        Ok(())
    }

    fn write_index(
        &self,
        index: &IndexConfig,
        registry_config: &RegistryConfig,
        registry_model: &RegistryModel,
    ) -> Result<()> {
        let output = Path::new(&index.output);

        // Auto-create only one directory level, to better catch
        // configuration mistakes
        if let Some(dir) = output.parent() {
            if !dir.is_dir() {
                fs::create_dir(dir)
                    .with_context(|| format!("creating directory {}", dir.display()))?;
            }
        }

        let tag = index.effective_tag();

        let mut results: Vec<RepositoryModel> = Vec::new();
        for repository in registry_model.repositories.values() {
            let mut published = RepositoryModel::new(&repository.name);

            for image in repository.images.values() {
                if !image.tags.iter().any(|t| t == tag) {
                    continue;
                }
                if let Some(architecture) = &index.architecture {
                    if image.architecture != *architecture {
                        continue;
                    }
                }

                published.add_image(published_image(registry_config, image));
            }

            if !published.images.is_empty() {
                results.push(published);
            }
        }
        results.sort_by(|a, b| a.name.cmp(&b.name));

        let document = IndexDocument {
            registry: &registry_config.public_url,
            results,
        };

        let content = to_sorted_pretty(&document)?;
        if atomic_write(output, &content)? {
            info!("Wrote {}", output.display());
        } else {
            info!("{} is unchanged", output.display());
        }

        Ok(())
    }
}

/// The published copy of an image: internal fields cleared, labels adjusted
/// per registry config.
fn published_image(registry_config: &RegistryConfig, image: &ImageModel) -> ImageModel {
    let mut published = image.clone();
    published.diff_ids = Vec::new();
    published.pull_spec = None;

    if registry_config.force_flatpak_token {
        published.labels.insert(
            FLATPAK_TOKEN_TYPE_LABEL.to_string(),
            FLATPAK_TOKEN_TYPE_VALUE.to_string(),
        );
    }

    published
}
