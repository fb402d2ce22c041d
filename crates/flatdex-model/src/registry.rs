use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ModelError, Result},
    indexed::Keyed,
};

/// The canonical aggregate built for one registry per run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegistryModel {
    #[serde(with = "crate::indexed", default, skip_serializing_if = "HashMap::is_empty")]
    pub repositories: HashMap<String, RepositoryModel>,
}

impl RegistryModel {
    /// Inserts an image into the named repository, creating the repository on
    /// first use. Re-observing a digest merges tag lists instead of
    /// duplicating the entry.
    pub fn add_image(&mut self, name: &str, image: ImageModel) {
        self.repositories
            .entry(name.to_string())
            .or_insert_with(|| RepositoryModel::new(name))
            .add_image(image);
    }

    /// Attaches a tag history to the named repository.
    pub fn add_tag_history(&mut self, name: &str, history: TagHistoryModel) {
        self.repositories
            .entry(name.to_string())
            .or_insert_with(|| RepositoryModel::new(name))
            .tag_histories
            .insert(history.name.clone(), history);
    }

    pub fn to_json_text(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| ModelError::Encode {
            entity: "registry",
            source,
        })
    }

    pub fn from_json_text(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| ModelError::Decode {
            entity: "registry",
            source,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RepositoryModel {
    pub name: String,

    #[serde(with = "crate::indexed", default, skip_serializing_if = "HashMap::is_empty")]
    pub images: HashMap<String, ImageModel>,

    #[serde(with = "crate::indexed", default, skip_serializing_if = "HashMap::is_empty")]
    pub tag_histories: HashMap<String, TagHistoryModel>,
}

impl RepositoryModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            images: HashMap::new(),
            tag_histories: HashMap::new(),
        }
    }

    /// Inserts an image keyed by digest; an already-present digest keeps its
    /// entry and absorbs any tags the new observation carries.
    pub fn add_image(&mut self, image: ImageModel) {
        match self.images.entry(image.digest.clone()) {
            std::collections::hash_map::Entry::Occupied(mut existing) => {
                let tags = &mut existing.get_mut().tags;
                for tag in image.tags {
                    if !tags.contains(&tag) {
                        tags.push(tag);
                    }
                }
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(image);
            }
        }
    }
}

impl Keyed for RepositoryModel {
    fn key(&self) -> &str {
        &self.name
    }
}

/// One container image, identified by its content digest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageModel {
    pub digest: String,
    pub media_type: String,
    #[serde(rename = "OS")]
    pub os: String,
    pub architecture: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diff_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_spec: Option<String>,
}

impl Keyed for ImageModel {
    fn key(&self) -> &str {
        &self.digest
    }
}

/// The ordered record of which image held a tag over time, most recent first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagHistoryModel {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<TagHistoryItemModel>,
}

impl TagHistoryModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: Vec::new(),
        }
    }
}

impl Keyed for TagHistoryModel {
    fn key(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagHistoryItemModel {
    pub architecture: String,

    #[serde(with = "crate::dates::iso")]
    pub date: DateTime<Utc>,

    pub digest: String,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn image(digest: &str, architecture: &str, tags: &[&str]) -> ImageModel {
        ImageModel {
            digest: digest.to_string(),
            media_type: "application/vnd.oci.image.manifest.v1+json".to_string(),
            os: "linux".to_string(),
            architecture: architecture.to_string(),
            labels: HashMap::new(),
            annotations: HashMap::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            diff_ids: Vec::new(),
            pull_spec: None,
        }
    }

    #[test]
    fn test_add_image_merges_tags_by_digest() {
        let mut registry = RegistryModel::default();
        registry.add_image("app/aisleriot", image("sha256:aaa", "amd64", &["1.0", "latest"]));
        registry.add_image("app/aisleriot", image("sha256:aaa", "amd64", &["1.0", "stable"]));

        let repository = &registry.repositories["app/aisleriot"];
        assert_eq!(repository.images.len(), 1);
        assert_eq!(
            repository.images["sha256:aaa"].tags,
            vec!["1.0", "latest", "stable"]
        );
    }

    #[test]
    fn test_round_trip() {
        let mut registry = RegistryModel::default();
        let mut img = image("sha256:bbb", "arm64", &["2.0"]);
        img.labels
            .insert("org.flatpak.ref".to_string(), "app/org.example.App".to_string());
        img.pull_spec = Some("registry.example.com/app/example:tag".to_string());
        registry.add_image("app/example", img);

        let mut history = TagHistoryModel::new("latest");
        history.items.push(TagHistoryItemModel {
            architecture: "arm64".to_string(),
            date: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            digest: "sha256:bbb".to_string(),
        });
        registry.add_tag_history("app/example", history);

        let text = registry.to_json_text().unwrap();
        let decoded = RegistryModel::from_json_text(&text).unwrap();
        assert_eq!(decoded, registry);
    }

    #[test]
    fn test_json_field_names() {
        let mut registry = RegistryModel::default();
        registry.add_image("repo", image("sha256:ccc", "amd64", &[]));

        let value: serde_json::Value =
            serde_json::from_str(&registry.to_json_text().unwrap()).unwrap();
        let encoded = &value["Repositories"][0]["Images"][0];
        assert_eq!(encoded["Digest"], "sha256:ccc");
        assert_eq!(encoded["OS"], "linux");
        assert_eq!(encoded["Architecture"], "amd64");
        // Empty collections and unset optionals are omitted
        assert!(encoded.get("Tags").is_none());
        assert!(encoded.get("Labels").is_none());
        assert!(encoded.get("PullSpec").is_none());
    }

    #[test]
    fn test_repositories_sorted_on_encode() {
        let mut registry = RegistryModel::default();
        registry.add_image("zoo", image("sha256:z", "amd64", &[]));
        registry.add_image("bar", image("sha256:b", "amd64", &[]));

        let text = registry.to_json_text().unwrap();
        assert!(text.find("bar").unwrap() < text.find("zoo").unwrap());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let err = RegistryModel::from_json_text(
            r#"{"Repositories": [{"Images": [], "TagHistories": []}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("registry"));
    }

    #[test]
    fn test_empty_registry_encodes_to_empty_object() {
        assert_eq!(RegistryModel::default().to_json_text().unwrap(), "{}");
    }
}
