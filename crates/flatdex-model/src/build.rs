use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    error::{ModelError, Result},
    registry::ImageModel,
};

/// A container image build as recorded by the build-tracking backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageBuildModel {
    pub name: String,
    pub build_id: u64,
    pub nvr: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    pub user_name: String,

    #[serde(with = "crate::dates::iso")]
    pub completion_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageModel>,
}

/// An image build that produced a Flatpak, with its module composition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlatpakBuildModel {
    #[serde(flatten)]
    pub build: ImageBuildModel,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub module_builds: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_builds: Vec<String>,
}

impl FlatpakBuildModel {
    /// Derives the repository path from the first image's pull spec, which
    /// looks like `registry.example.com/namespace/name:tag` or
    /// `registry.example.com/namespace/name@sha256:...`.
    pub fn repository(&self) -> Option<String> {
        let pull_spec = self.build.images.first()?.pull_spec.as_deref()?;
        let (_, rest) = pull_spec.split_once('/')?;

        let repository = match rest.rsplit_once('@') {
            Some((repository, _)) => repository,
            None => match rest.rsplit_once(':') {
                Some((repository, _)) => repository,
                None => rest,
            },
        };

        Some(repository.to_string())
    }
}

/// Backend-agnostic build descriptor, decoded into the most specific variant
/// the payload shape supports: image-family payloads carrying `ModuleBuilds`
/// are Flatpak builds, the rest are plain image builds.
#[derive(Clone, Debug, PartialEq)]
pub enum BuildModel {
    Image(ImageBuildModel),
    Flatpak(FlatpakBuildModel),
}

impl BuildModel {
    pub fn nvr(&self) -> &str {
        match self {
            BuildModel::Image(build) => &build.nvr,
            BuildModel::Flatpak(build) => &build.build.nvr,
        }
    }

    pub fn images(&self) -> &[ImageModel] {
        match self {
            BuildModel::Image(build) => &build.images,
            BuildModel::Flatpak(build) => &build.build.images,
        }
    }

    pub fn to_json_text(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| ModelError::Encode {
            entity: "build",
            source,
        })
    }

    pub fn from_json_text(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| ModelError::Decode {
            entity: "build",
            source,
        })
    }
}

impl Serialize for BuildModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            BuildModel::Image(build) => build.serialize(serializer),
            BuildModel::Flatpak(build) => build.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for BuildModel {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let object = value
            .as_object()
            .ok_or_else(|| de::Error::custom("build descriptor must be an object"))?;

        if object.contains_key("ModuleBuilds") {
            serde_json::from_value(value)
                .map(BuildModel::Flatpak)
                .map_err(de::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(BuildModel::Image)
                .map_err(de::Error::custom)
        }
    }
}
