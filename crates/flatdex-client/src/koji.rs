use std::collections::HashMap;

use serde::Deserialize;
use tracing::info;
use ureq::Agent;

use crate::{
    error::{ClientError, Result},
    http::get_json,
    http_client::ClientConfig,
};

/// Read access to the build-tracking backend.
pub trait BuildTracker {
    /// The latest image-type builds carrying the given build-system tag.
    fn latest_tagged(&self, tag: &str) -> Result<Vec<TaggedBuild>>;

    /// The full build record for one NVR.
    fn build(&self, nvr: &str) -> Result<BuildRecord>;

    /// The per-architecture image archives of a build.
    fn build_archives(&self, build_id: u64) -> Result<Vec<ArchiveRecord>>;
}

#[derive(Clone, Debug, Deserialize)]
pub struct TaggedBuild {
    pub nvr: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BuildRecord {
    pub name: String,
    pub build_id: u64,
    pub nvr: String,
    #[serde(default)]
    pub source: Option<String>,
    pub owner_name: String,
    pub completion_ts: f64,
    #[serde(default)]
    pub extra: BuildExtra,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BuildExtra {
    #[serde(default)]
    pub image: Option<ImageExtra>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ImageExtra {
    #[serde(default)]
    pub flatpak: bool,
    #[serde(default)]
    pub modules: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ArchiveRecord {
    pub id: u64,
    pub extra: ArchiveExtra,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ArchiveExtra {
    pub docker: DockerInfo,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DockerInfo {
    pub config: ImageConfig,
    pub digests: HashMap<String, String>,
    #[serde(default)]
    pub repositories: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ImageConfig {
    pub os: String,
    pub architecture: String,
    #[serde(default)]
    pub config: RuntimeConfig,
    #[serde(default)]
    pub rootfs: RootFs,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RuntimeConfig {
    #[serde(rename = "Labels", default)]
    pub labels: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RootFs {
    #[serde(default)]
    pub diff_ids: Vec<String>,
}

/// HTTP client for the build-tracking backend.
pub struct KojiClient {
    agent: Agent,
    base_url: String,
}

impl KojiClient {
    pub fn new(base_url: &str, client_config: &ClientConfig) -> Self {
        Self {
            agent: client_config.build(),
            base_url: base_url.to_string(),
        }
    }
}

impl BuildTracker for KojiClient {
    fn latest_tagged(&self, tag: &str) -> Result<Vec<TaggedBuild>> {
        let url = format!("{}tags/{tag}/builds?type=image&latest=true", self.base_url);
        info!("Requesting {url}");
        get_json(&self.agent, &url)
    }

    fn build(&self, nvr: &str) -> Result<BuildRecord> {
        let url = format!("{}builds/{nvr}", self.base_url);
        info!("Requesting {url}");
        get_json(&self.agent, &url).map_err(|err| match err {
            ClientError::NotFound { .. } => ClientError::BuildNotFound {
                nvr: nvr.to_string(),
            },
            other => other,
        })
    }

    fn build_archives(&self, build_id: u64) -> Result<Vec<ArchiveRecord>> {
        let url = format!("{}builds/{build_id}/archives", self.base_url);
        info!("Requesting {url}");
        get_json(&self.agent, &url)
    }
}
