use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use flatdex_client::{BuildStore, BuildTracker, Catalog};
use flatdex_config::{Config, IndexConfig, RegistryConfig};
use flatdex_model::{BuildModel, RegistryModel, TagHistoryItemModel, TagHistoryModel};

use crate::{
    error::{CoreError, Result},
    resolver::BuildResolver,
    writer::write_snapshot,
};

/// The architectures one tag is wanted for. An entry of `None` is the
/// wildcard: it matches every architecture.
#[derive(Debug, Default)]
pub(crate) struct ArchSelection(BTreeSet<Option<String>>);

impl ArchSelection {
    pub fn insert(&mut self, architecture: Option<&str>) {
        self.0.insert(architecture.map(|arch| arch.to_string()));
    }

    pub fn matches(&self, architecture: &str) -> bool {
        self.0
            .iter()
            .any(|wanted| match wanted {
                None => true,
                Some(arch) => arch == architecture,
            })
    }
}

fn split_nvr(nvr: &str) -> Option<(&str, &str, &str)> {
    let (rest, release) = nvr.rsplit_once('-')?;
    let (name, version) = rest.rsplit_once('-')?;
    Some((name, version, release))
}

/// Folds one ordered observation list for `(repository, tag)` into the
/// registry model.
///
/// Every matching image receives the version and version-release tags; the
/// bare tag goes only to images of the build holding the tag right now, the
/// first entry of the ordered list. The tag history is attached only when at
/// least one item survived architecture filtering.
fn add_build_history(
    model: &mut RegistryModel,
    repository: &str,
    tag: &str,
    architectures: &ArchSelection,
    build_items: &[(Arc<BuildModel>, DateTime<Utc>)],
) -> Result<()> {
    let mut tag_history = TagHistoryModel::new(tag);
    let current_nvr = build_items.first().map(|(build, _)| build.nvr().to_string());

    for (build, start_date) in build_items {
        let (_, version, release) =
            split_nvr(build.nvr()).ok_or_else(|| CoreError::InvalidNvr {
                nvr: build.nvr().to_string(),
            })?;

        for image in build.images() {
            if !architectures.matches(&image.architecture) {
                continue;
            }

            let mut tagged = image.clone();
            tagged.tags = vec![version.to_string(), format!("{version}-{release}")];
            if current_nvr.as_deref() == Some(build.nvr()) {
                tagged.tags.push(tag.to_string());
            }

            model.add_image(repository, tagged);

            tag_history.items.push(TagHistoryItemModel {
                architecture: image.architecture.clone(),
                date: *start_date,
                digest: image.digest.clone(),
            });
        }
    }

    if !tag_history.items.is_empty() {
        model.add_tag_history(repository, tag_history);
    }

    Ok(())
}

/// Builds the registry model for one registry from its index configs.
///
/// Catalog-driven indexes walk per-repository tag histories (newest first);
/// build-system-driven indexes walk the latest tagged builds, keeping only
/// Flatpak builds and stamping them all with the epoch, since the build
/// system does not record when a tag landed.
pub fn update_registry<C, T, S>(
    name: &str,
    registry_config: &RegistryConfig,
    indexes: &[&IndexConfig],
    catalog: &C,
    tracker: &T,
    resolver: &BuildResolver<'_, T, S>,
) -> Result<RegistryModel>
where
    C: Catalog,
    T: BuildTracker,
    S: BuildStore,
{
    let mut model = RegistryModel::default();

    let mut desired_tags: BTreeMap<&str, ArchSelection> = BTreeMap::new();
    let mut desired_koji_tags: BTreeMap<&str, ArchSelection> = BTreeMap::new();

    for index in indexes {
        if let Some(tag) = &index.tag {
            desired_tags
                .entry(tag)
                .or_default()
                .insert(index.architecture.as_deref());
        } else if let Some(koji_tag) = &index.koji_tag {
            desired_koji_tags
                .entry(koji_tag)
                .or_default()
                .insert(index.architecture.as_deref());
        }
    }

    if !desired_tags.is_empty() {
        let repositories = if registry_config.repositories.is_empty() {
            catalog.repositories(name)?
        } else {
            registry_config.repositories.clone()
        };

        for repository in &repositories {
            for (tag, architectures) in &desired_tags {
                let events = catalog.tag_history(name, repository, tag)?;
                if events.is_empty() {
                    continue;
                }

                let mut build_items = Vec::with_capacity(events.len());
                for event in events {
                    build_items.push((resolver.image_build(&event.nvr)?, event.date));
                }

                add_build_history(&mut model, repository, tag, architectures, &build_items)?;
            }
        }
    }

    if !desired_koji_tags.is_empty() {
        let start_date = DateTime::<Utc>::UNIX_EPOCH;

        for (koji_tag, architectures) in &desired_koji_tags {
            for tagged in tracker.latest_tagged(koji_tag)? {
                let build = resolver.image_build(&tagged.nvr)?;

                let BuildModel::Flatpak(flatpak) = build.as_ref() else {
                    continue;
                };

                let Some(repository) = flatpak.repository() else {
                    warn!("Skipping {}: no pull spec to derive a repository from", tagged.nvr);
                    continue;
                };

                add_build_history(
                    &mut model,
                    &repository,
                    koji_tag,
                    architectures,
                    &[(build.clone(), start_date)],
                )?;
            }
        }
    }

    Ok(model)
}

/// Updates every configured registry that has at least one index, writing
/// each finished model to its snapshot path. A registry that fails is
/// logged and skipped; the others still complete.
pub fn update_registries<C, T, S>(
    config: &Config,
    catalog: &C,
    tracker: &T,
    resolver: &BuildResolver<'_, T, S>,
) -> HashMap<String, RegistryModel>
where
    C: Catalog,
    T: BuildTracker,
    S: BuildStore,
{
    let mut data = HashMap::new();

    for (name, registry_config) in &config.registries {
        let indexes: Vec<&IndexConfig> = config.indexes_for_registry(name).collect();
        if indexes.is_empty() {
            continue;
        }

        let outcome = update_registry(name, registry_config, &indexes, catalog, tracker, resolver)
            .and_then(|model| {
                write_snapshot(&model, &config.registry_snapshot_path(name))?;
                Ok(model)
            });

        match outcome {
            Ok(model) => {
                info!("Updated registry {name}");
                data.insert(name.clone(), model);
            }
            Err(err) => error!("Failed to update registry {name}: {err}"),
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;
    use flatdex_client::{MemoryStore, TagEvent};
    use tempfile::tempdir;

    use crate::resolver::tests::FakeTracker;

    use super::*;

    struct FakeCatalog {
        repositories: Vec<String>,
        histories: HashMap<(String, String), Vec<TagEvent>>,
    }

    impl FakeCatalog {
        fn new(repositories: &[&str]) -> Self {
            Self {
                repositories: repositories.iter().map(|r| r.to_string()).collect(),
                histories: HashMap::new(),
            }
        }

        fn add_history(&mut self, repository: &str, tag: &str, events: Vec<TagEvent>) {
            self.histories
                .insert((repository.to_string(), tag.to_string()), events);
        }
    }

    impl Catalog for FakeCatalog {
        fn repositories(&self, _registry: &str) -> flatdex_client::Result<Vec<String>> {
            Ok(self.repositories.clone())
        }

        fn tag_history(
            &self,
            _registry: &str,
            repository: &str,
            tag: &str,
        ) -> flatdex_client::Result<Vec<TagEvent>> {
            Ok(self
                .histories
                .get(&(repository.to_string(), tag.to_string()))
                .cloned()
                .unwrap_or_default())
        }
    }

    fn registry_config(repositories: &[&str]) -> RegistryConfig {
        RegistryConfig {
            public_url: "https://registry.example.com/".to_string(),
            datasource: "pyxis".to_string(),
            repositories: repositories.iter().map(|r| r.to_string()).collect(),
            force_flatpak_token: false,
        }
    }

    fn tag_index(tag: &str, architecture: Option<&str>) -> IndexConfig {
        IndexConfig {
            name: format!("{tag}-index"),
            registry: "production".to_string(),
            output: format!("/srv/{tag}.json"),
            tag: Some(tag.to_string()),
            koji_tag: None,
            architecture: architecture.map(|a| a.to_string()),
        }
    }

    fn koji_index(koji_tag: &str, architecture: Option<&str>) -> IndexConfig {
        IndexConfig {
            name: format!("{koji_tag}-index"),
            registry: "production".to_string(),
            output: format!("/srv/{koji_tag}.json"),
            tag: None,
            koji_tag: Some(koji_tag.to_string()),
            architecture: architecture.map(|a| a.to_string()),
        }
    }

    fn event(nvr: &str, year: i32) -> TagEvent {
        TagEvent {
            nvr: nvr.to_string(),
            date: Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_bare_tag_goes_to_most_recent_build_only() {
        let mut tracker = FakeTracker::new();
        tracker.add_build("app-2.0-1", 1, true, &[("sha256:new", "amd64", "r.example.com/apps/app:x")]);
        tracker.add_build("app-1.0-1", 2, true, &[("sha256:old", "amd64", "r.example.com/apps/app:y")]);

        let mut catalog = FakeCatalog::new(&[]);
        catalog.add_history(
            "apps/app",
            "latest",
            vec![event("app-2.0-1", 2024), event("app-1.0-1", 2023)],
        );

        let store = MemoryStore::new();
        let resolver = BuildResolver::new(&tracker, &store);
        let indexes = [tag_index("latest", Some("amd64"))];
        let index_refs: Vec<&IndexConfig> = indexes.iter().collect();

        let model = update_registry(
            "production",
            &registry_config(&["apps/app"]),
            &index_refs,
            &catalog,
            &tracker,
            &resolver,
        )
        .unwrap();

        let repository = &model.repositories["apps/app"];
        assert_eq!(
            repository.images["sha256:new"].tags,
            vec!["2.0", "2.0-1", "latest"]
        );
        assert_eq!(repository.images["sha256:old"].tags, vec!["1.0", "1.0-1"]);

        let history = &repository.tag_histories["latest"];
        assert_eq!(history.items.len(), 2);
        assert_eq!(history.items[0].digest, "sha256:new");
        assert_eq!(history.items[1].digest, "sha256:old");
    }

    #[test]
    fn test_architecture_filtering() {
        let mut tracker = FakeTracker::new();
        tracker.add_build(
            "app-1.0-1",
            1,
            true,
            &[
                ("sha256:amd", "amd64", "r.example.com/apps/app:x"),
                ("sha256:arm", "arm64", "r.example.com/apps/app:x"),
            ],
        );

        let mut catalog = FakeCatalog::new(&[]);
        catalog.add_history("apps/app", "latest", vec![event("app-1.0-1", 2024)]);

        let store = MemoryStore::new();
        let resolver = BuildResolver::new(&tracker, &store);
        let indexes = [tag_index("latest", Some("amd64"))];
        let index_refs: Vec<&IndexConfig> = indexes.iter().collect();

        let model = update_registry(
            "production",
            &registry_config(&["apps/app"]),
            &index_refs,
            &catalog,
            &tracker,
            &resolver,
        )
        .unwrap();

        let repository = &model.repositories["apps/app"];
        assert!(repository.images.contains_key("sha256:amd"));
        assert!(!repository.images.contains_key("sha256:arm"));
        assert_eq!(repository.tag_histories["latest"].items.len(), 1);
    }

    #[test]
    fn test_wildcard_architecture_matches_all() {
        let mut tracker = FakeTracker::new();
        tracker.add_build(
            "app-1.0-1",
            1,
            true,
            &[
                ("sha256:amd", "amd64", "r.example.com/apps/app:x"),
                ("sha256:arm", "arm64", "r.example.com/apps/app:x"),
            ],
        );

        let mut catalog = FakeCatalog::new(&[]);
        catalog.add_history("apps/app", "latest", vec![event("app-1.0-1", 2024)]);

        let store = MemoryStore::new();
        let resolver = BuildResolver::new(&tracker, &store);
        let indexes = [tag_index("latest", None), tag_index("latest", Some("amd64"))];
        let index_refs: Vec<&IndexConfig> = indexes.iter().collect();

        let model = update_registry(
            "production",
            &registry_config(&["apps/app"]),
            &index_refs,
            &catalog,
            &tracker,
            &resolver,
        )
        .unwrap();

        assert_eq!(model.repositories["apps/app"].images.len(), 2);
    }

    #[test]
    fn test_missing_tag_history_is_not_an_error() {
        let mut tracker = FakeTracker::new();
        tracker.add_build("app-1.0-1", 1, true, &[("sha256:x", "amd64", "r.example.com/apps/app:x")]);

        let mut catalog = FakeCatalog::new(&[]);
        // `other/repo` has no history for the tag at all
        catalog.add_history("apps/app", "latest", vec![event("app-1.0-1", 2024)]);

        let store = MemoryStore::new();
        let resolver = BuildResolver::new(&tracker, &store);
        let indexes = [tag_index("latest", None)];
        let index_refs: Vec<&IndexConfig> = indexes.iter().collect();

        let model = update_registry(
            "production",
            &registry_config(&["other/repo", "apps/app"]),
            &index_refs,
            &catalog,
            &tracker,
            &resolver,
        )
        .unwrap();

        assert!(!model.repositories.contains_key("other/repo"));
        assert!(model.repositories.contains_key("apps/app"));
    }

    #[test]
    fn test_koji_walker_keeps_only_flatpaks_and_uses_epoch() {
        let mut tracker = FakeTracker::new();
        tracker.add_build(
            "game-1.0-1",
            1,
            true,
            &[("sha256:game", "amd64", "r.example.com/osbs/game:x")],
        );
        tracker.add_build(
            "base-image-9.0-1",
            2,
            false,
            &[("sha256:base", "amd64", "r.example.com/osbs/base:x")],
        );
        tracker
            .tagged
            .insert("release".to_string(), vec!["game-1.0-1".to_string(), "base-image-9.0-1".to_string()]);

        let catalog = FakeCatalog::new(&[]);
        let store = MemoryStore::new();
        let resolver = BuildResolver::new(&tracker, &store);
        let indexes = [koji_index("release", None)];
        let index_refs: Vec<&IndexConfig> = indexes.iter().collect();

        let model = update_registry(
            "production",
            &registry_config(&[]),
            &index_refs,
            &catalog,
            &tracker,
            &resolver,
        )
        .unwrap();

        assert_eq!(model.repositories.len(), 1);
        let repository = &model.repositories["osbs/game"];
        assert_eq!(
            repository.images["sha256:game"].tags,
            vec!["1.0", "1.0-1", "release"]
        );
        assert_eq!(
            repository.tag_histories["release"].items[0].date,
            DateTime::<Utc>::UNIX_EPOCH
        );
    }

    #[test]
    fn test_same_digest_from_both_walkers_is_merged() {
        let mut tracker = FakeTracker::new();
        tracker.add_build(
            "app-1.0-1",
            1,
            true,
            &[("sha256:one", "amd64", "r.example.com/apps/app:x")],
        );
        tracker
            .tagged
            .insert("release".to_string(), vec!["app-1.0-1".to_string()]);

        let mut catalog = FakeCatalog::new(&[]);
        catalog.add_history("apps/app", "latest", vec![event("app-1.0-1", 2024)]);

        let store = MemoryStore::new();
        let resolver = BuildResolver::new(&tracker, &store);
        let indexes = [tag_index("latest", None), koji_index("release", None)];
        let index_refs: Vec<&IndexConfig> = indexes.iter().collect();

        let model = update_registry(
            "production",
            &registry_config(&["apps/app"]),
            &index_refs,
            &catalog,
            &tracker,
            &resolver,
        )
        .unwrap();

        let repository = &model.repositories["apps/app"];
        assert_eq!(repository.images.len(), 1);
        let tags = &repository.images["sha256:one"].tags;
        assert!(tags.contains(&"latest".to_string()));
        assert!(tags.contains(&"release".to_string()));
        assert_eq!(tags.iter().filter(|t| *t == "1.0").count(), 1);
        assert_eq!(repository.tag_histories.len(), 2);
    }

    #[test]
    fn test_update_registries_isolates_failures() {
        let work_dir = tempdir().unwrap();

        let mut tracker = FakeTracker::new();
        tracker.add_build("app-1.0-1", 1, true, &[("sha256:x", "amd64", "r.example.com/apps/app:x")]);

        let mut catalog = FakeCatalog::new(&[]);
        catalog.add_history("apps/app", "latest", vec![event("app-1.0-1", 2024)]);
        // `broken` references a build the tracker does not know
        catalog.add_history("apps/app", "beta", vec![event("ghost-1.0-1", 2024)]);

        let config_text = format!(
            r#"
            pyxis_url = "https://catalog.example.com/v1"
            koji_url = "https://builds.example.com/api"
            store_path = "/tmp/flatdex-store"
            work_dir = "{}"

            [registries.production]
            public_url = "https://registry.example.com/"
            datasource = "pyxis"
            repositories = ["apps/app"]

            [registries.broken]
            public_url = "https://broken.example.com/"
            datasource = "pyxis"
            repositories = ["apps/app"]

            [[indexes]]
            name = "latest"
            registry = "production"
            output = "/srv/latest.json"
            tag = "latest"

            [[indexes]]
            name = "beta"
            registry = "broken"
            output = "/srv/beta.json"
            tag = "beta"
            "#,
            work_dir.path().display()
        );
        let config = Config::parse(&config_text).unwrap();

        let store = MemoryStore::new();
        let resolver = BuildResolver::new(&tracker, &store);

        let data = update_registries(&config, &catalog, &tracker, &resolver);

        assert!(data.contains_key("production"));
        assert!(!data.contains_key("broken"));
        assert!(work_dir.path().join("production.json").exists());
        assert!(!work_dir.path().join("broken.json").exists());
    }

    #[test]
    fn test_split_nvr() {
        assert_eq!(split_nvr("app-1.0-1"), Some(("app", "1.0", "1")));
        assert_eq!(
            split_nvr("org.gnome.Aisleriot-3.38.0-3"),
            Some(("org.gnome.Aisleriot", "3.38.0", "3"))
        );
        assert_eq!(split_nvr("noversion"), None);
    }

    #[test]
    fn test_arch_selection() {
        let mut selection = ArchSelection::default();
        selection.insert(Some("amd64"));
        assert!(selection.matches("amd64"));
        assert!(!selection.matches("arm64"));

        selection.insert(None);
        assert!(selection.matches("arm64"));
    }
}
