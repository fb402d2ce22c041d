use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::DateTime;
use tracing::{info, warn};

use flatdex_client::{BuildStore, BuildTracker};
use flatdex_model::{BuildModel, FlatpakBuildModel, ImageBuildModel, ImageModel};

use crate::error::{CoreError, Result};

const MEDIA_TYPE_OCI: &str = "application/vnd.oci.image.manifest.v1+json";
const MEDIA_TYPE_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Resolves build identifiers to fully-populated build descriptors at most
/// once per identifier per process, backed by the shared build store.
///
/// The memo map tolerates concurrent lookups for the same identifier: the
/// lock is dropped around backend queries, so two racing callers may both
/// query the backend, with the last insert winning.
pub struct BuildResolver<'a, T: BuildTracker, S: BuildStore> {
    tracker: &'a T,
    store: &'a S,
    image_builds: Mutex<HashMap<String, Arc<BuildModel>>>,
}

impl<'a, T: BuildTracker, S: BuildStore> BuildResolver<'a, T, S> {
    pub fn new(tracker: &'a T, store: &'a S) -> Self {
        Self {
            tracker,
            store,
            image_builds: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up one image build: memo map, then the shared store, then the
    /// build-tracking backend. Store failures are logged and treated as
    /// misses; they never fail the resolution.
    pub fn image_build(&self, nvr: &str) -> Result<Arc<BuildModel>> {
        if let Some(build) = self.image_builds.lock().unwrap().get(nvr) {
            return Ok(build.clone());
        }

        let key = format!("build:{nvr}");

        match self.store.get(&key) {
            Ok(Some(text)) => match BuildModel::from_json_text(&text) {
                Ok(build) => {
                    let build = Arc::new(build);
                    self.image_builds
                        .lock()
                        .unwrap()
                        .insert(nvr.to_string(), build.clone());
                    return Ok(build);
                }
                Err(err) => warn!("Ignoring undecodable store entry for {nvr}: {err}"),
            },
            Ok(None) => {}
            Err(err) => warn!("Store read for {nvr} failed: {err}"),
        }

        let build = Arc::new(self.query_image_build(nvr)?);

        match build.to_json_text() {
            Ok(text) => {
                if let Err(err) = self.store.set(&key, &text) {
                    warn!("Store write for {nvr} failed: {err}");
                }
            }
            Err(err) => warn!("Could not encode {nvr} for the store: {err}"),
        }

        self.image_builds
            .lock()
            .unwrap()
            .insert(nvr.to_string(), build.clone());

        Ok(build)
    }

    fn query_image_build(&self, nvr: &str) -> Result<BuildModel> {
        let record = self.tracker.build(nvr)?;

        info!("Fetching archives for {nvr}");
        let archives = self.tracker.build_archives(record.build_id)?;

        let mut images = Vec::with_capacity(archives.len());
        for archive in archives {
            let docker = archive.extra.docker;

            let (media_type, digest) = [MEDIA_TYPE_OCI, MEDIA_TYPE_MANIFEST_V2]
                .iter()
                .find_map(|media_type| {
                    docker
                        .digests
                        .get(*media_type)
                        .map(|digest| (*media_type, digest.clone()))
                })
                .ok_or_else(|| CoreError::MissingDigest {
                    nvr: nvr.to_string(),
                })?;

            images.push(ImageModel {
                digest,
                media_type: media_type.to_string(),
                os: docker.config.os,
                architecture: docker.config.architecture,
                labels: docker.config.config.labels,
                annotations: HashMap::new(),
                tags: Vec::new(),
                diff_ids: docker.config.rootfs.diff_ids,
                pull_spec: docker.repositories.into_iter().next(),
            });
        }

        let completion_time =
            DateTime::from_timestamp(record.completion_ts as i64, 0).unwrap_or_default();

        let is_flatpak = record
            .extra
            .image
            .as_ref()
            .map(|image| image.flatpak)
            .unwrap_or(false);

        let build = ImageBuildModel {
            name: record.name,
            build_id: record.build_id,
            nvr: record.nvr,
            source: record.source,
            user_name: record.owner_name,
            completion_time,
            images,
        };

        if is_flatpak {
            let mut module_builds = record
                .extra
                .image
                .map(|image| image.modules)
                .unwrap_or_default();
            module_builds.sort();

            Ok(BuildModel::Flatpak(FlatpakBuildModel {
                build,
                module_builds,
                package_builds: Vec::new(),
            }))
        } else {
            Ok(BuildModel::Image(build))
        }
    }
}
