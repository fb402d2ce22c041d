use std::time::Duration;

use ureq::Agent;

pub const DEFAULT_USER_AGENT: &str = concat!("flatdex/", env!("CARGO_PKG_VERSION"));

/// Settings applied to every backend HTTP agent.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: String,
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl ClientConfig {
    /// Builds an HTTP agent from this config. Status codes are reported
    /// through the response rather than as transport errors so the retry
    /// layer can inspect them.
    pub fn build(&self) -> Agent {
        ureq::Agent::config_builder()
            .user_agent(&self.user_agent)
            .timeout_global(self.timeout)
            .http_status_as_error(false)
            .build()
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.user_agent.starts_with("flatdex/"));
        assert_eq!(config.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_build_agent() {
        let agent = ClientConfig::default().build();
        let _ = agent.get("https://example.com");
    }
}
