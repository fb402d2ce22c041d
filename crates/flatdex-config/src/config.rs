use std::{collections::HashMap, fs, path::{Path, PathBuf}, time::Duration};

use serde::{Deserialize, Serialize};
use flatdex_utils::{env::substitute_env_vars, time::parse_duration};

use crate::error::{ConfigError, Result};

/// Top-level application configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the container catalog API. Required as soon as any
    /// registry uses the `pyxis` datasource. A trailing slash is enforced.
    pub pyxis_url: Option<String>,

    /// Base URL of the build-tracking API. A trailing slash is enforced.
    pub koji_url: String,

    /// Directory holding the shared build descriptor store.
    pub store_path: String,

    /// Directory where per-registry snapshot files are written.
    pub work_dir: String,

    /// Page size used when walking paginated catalog responses.
    /// Default: 50
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Registry configurations, keyed by registry name.
    #[serde(default)]
    pub registries: HashMap<String, RegistryConfig>,

    /// Index configurations.
    #[serde(default)]
    pub indexes: Vec<IndexConfig>,

    #[serde(default)]
    pub daemon: DaemonConfig,
}

fn default_page_size() -> u32 {
    50
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Public URL of the registry, embedded in published index files.
    pub public_url: String,

    /// Datasource backing this registry. Only `pyxis` is supported.
    pub datasource: String,

    /// Explicit repository list; when empty, repositories are discovered
    /// through the catalog.
    #[serde(default)]
    pub repositories: Vec<String>,

    /// Injects the Flatpak token-type label into published images.
    #[serde(default)]
    pub force_flatpak_token: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Unique name, used in diagnostics.
    pub name: String,

    /// Name of the registry this index covers.
    pub registry: String,

    /// Path of the published index file.
    pub output: String,

    /// Catalog tag to walk. Mutually exclusive with `koji_tag`.
    pub tag: Option<String>,

    /// Build-system tag to walk. Mutually exclusive with `tag`.
    pub koji_tag: Option<String>,

    /// Restrict the index to one architecture; unset matches every
    /// architecture.
    pub architecture: Option<String>,
}

impl IndexConfig {
    /// The tag images carry in the registry model, whichever strategy
    /// produced them.
    pub fn effective_tag(&self) -> &str {
        self.tag
            .as_deref()
            .or(self.koji_tag.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DaemonConfig {
    /// Time between update cycles in daemon mode.
    /// Default: "30m"
    #[serde(default = "default_update_interval")]
    pub update_interval: String,
}

fn default_update_interval() -> String {
    "30m".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            update_interval: default_update_interval(),
        }
    }
}

impl DaemonConfig {
    pub fn interval(&self) -> Result<Duration> {
        parse_duration(&self.update_interval).ok_or_else(|| ConfigError::InvalidUpdateInterval {
            value: self.update_interval.clone(),
        })
    }
}

impl Config {
    /// Loads, expands and validates a TOML config file. Every string value
    /// in the document passes through `${VAR}` environment expansion before
    /// deserialization.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut raw: toml::Value = toml::from_str(text)?;
        expand_strings(&mut raw)?;

        let expanded = toml::to_string(&raw)?;
        let mut config: Config = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        for (name, registry) in &self.registries {
            if registry.datasource != "pyxis" {
                return Err(ConfigError::InvalidDatasource {
                    registry: name.clone(),
                });
            }
        }

        if !self.registries.is_empty() && self.pyxis_url.is_none() {
            return Err(ConfigError::MissingPyxisUrl);
        }

        if let Some(url) = &mut self.pyxis_url {
            force_trailing_slash(url);
            validate_url("pyxis_url", url)?;
        }

        force_trailing_slash(&mut self.koji_url);
        validate_url("koji_url", &self.koji_url)?;

        for index in &self.indexes {
            if !self.registries.contains_key(&index.registry) {
                return Err(ConfigError::UnknownRegistry {
                    index: index.name.clone(),
                    registry: index.registry.clone(),
                });
            }

            if index.tag.is_some() == index.koji_tag.is_some() {
                return Err(ConfigError::TagSelection {
                    index: index.name.clone(),
                });
            }

            if index.output.is_empty() {
                return Err(ConfigError::EmptyOutput {
                    index: index.name.clone(),
                });
            }
        }

        self.daemon.interval()?;

        Ok(())
    }

    /// Index configs covering the named registry.
    pub fn indexes_for_registry<'a>(&'a self, registry: &'a str) -> impl Iterator<Item = &'a IndexConfig> {
        self.indexes.iter().filter(move |index| index.registry == registry)
    }

    /// Path of the per-registry snapshot file.
    pub fn registry_snapshot_path(&self, registry: &str) -> PathBuf {
        Path::new(&self.work_dir).join(format!("{registry}.json"))
    }
}

fn force_trailing_slash(url: &mut String) {
    if !url.ends_with('/') {
        url.push('/');
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<()> {
    url::Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    })?;
    Ok(())
}

fn expand_strings(value: &mut toml::Value) -> Result<()> {
    match value {
        toml::Value::String(text) => {
            *text = substitute_env_vars(text)?;
        }
        toml::Value::Array(items) => {
            for item in items {
                expand_strings(item)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                expand_strings(item)?;
            }
        }
        _ => {}
    }

    Ok(())
}
