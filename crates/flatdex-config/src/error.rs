use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file `{path}`: {source}")]
    #[diagnostic(code(flatdex_config::io), help("Check that the file exists and is readable"))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(flatdex_config::toml),
        help("Check your config file syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    #[diagnostic(code(flatdex_config::toml_serialize))]
    TomlSerError(#[from] toml::ser::Error),

    #[error("{field}: `{value}` is not a valid URL")]
    #[diagnostic(code(flatdex_config::url))]
    InvalidUrl { field: &'static str, value: String },

    #[error(transparent)]
    #[diagnostic(code(flatdex_config::env))]
    Env(#[from] flatdex_utils::error::EnvError),

    #[error("registries/{registry}: datasource must be `pyxis`")]
    #[diagnostic(code(flatdex_config::datasource))]
    InvalidDatasource { registry: String },

    #[error("pyxis_url must be configured when a registry uses the pyxis datasource")]
    #[diagnostic(code(flatdex_config::pyxis_url))]
    MissingPyxisUrl,

    #[error("indexes/{index}: no registry config found for `{registry}`")]
    #[diagnostic(code(flatdex_config::unknown_registry))]
    UnknownRegistry { index: String, registry: String },

    #[error("indexes/{index}: exactly one of `tag` and `koji_tag` must be set")]
    #[diagnostic(
        code(flatdex_config::tag_selection),
        help("Catalog-driven indexes set `tag`, build-system-driven indexes set `koji_tag`")
    )]
    TagSelection { index: String },

    #[error("indexes/{index}: output must not be empty")]
    #[diagnostic(code(flatdex_config::output))]
    EmptyOutput { index: String },

    #[error("daemon: invalid update_interval `{value}`")]
    #[diagnostic(
        code(flatdex_config::update_interval),
        help("Use a duration string such as `30m` or `1h`")
    )]
    InvalidUpdateInterval { value: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
