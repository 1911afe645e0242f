use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use anyhow::{Context, Result};
use shared::types::{Deployment, Service};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub specs: SpecsConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Namespace to watch; empty watches all namespaces
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,
    #[serde(default = "default_spec_load_timeout")]
    pub spec_load_timeout_secs: u64,
    /// Hostname substrings that are never discovered
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpecsConfig {
    #[serde(default = "default_spec_dir")]
    pub dir: String,
    /// Rewrite policy location, a file path or an http(s) URL
    #[serde(default)]
    pub rewrites: Option<String>,
    /// Tag name -> group label
    #[serde(default)]
    pub groupings: BTreeMap<String, String>,
    /// Source URL -> replacement; an empty replacement means `site.url`
    #[serde(default)]
    pub rewrite_urls: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

/// Seed for the static registry watcher.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub services: Vec<RegisteredService>,
    #[serde(default)]
    pub deployments: Vec<Deployment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredService {
    #[serde(default)]
    pub namespace: String,
    #[serde(flatten)]
    pub service: Service,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_resync_interval() -> u64 {
    300
}

fn default_spec_load_timeout() -> u64 {
    5
}

fn default_spec_dir() -> String {
    "discover/specs".to_string()
}

fn default_listen() -> String {
    "[::]:3123".to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            resync_interval_secs: default_resync_interval(),
            spec_load_timeout_secs: default_spec_load_timeout(),
            ignore: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    pub fn spec_load_timeout(&self) -> Duration {
        Duration::from_secs(self.spec_load_timeout_secs)
    }
}

impl Default for SpecsConfig {
    fn default() -> Self {
        Self {
            dir: default_spec_dir(),
            rewrites: None,
            groupings: BTreeMap::new(),
            rewrite_urls: BTreeMap::new(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::Protocol;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.discovery.namespace, "default");
        assert_eq!(config.discovery.spec_load_timeout(), Duration::from_secs(5));
        assert_eq!(config.specs.dir, "discover/specs");
        assert!(config.specs.rewrites.is_none());
        assert_eq!(config.api.listen, "[::]:3123");
        assert!(config.registry.services.is_empty());
    }

    #[test]
    fn test_full_config() {
        let raw = r#"
            [discovery]
            namespace = "platform"
            resync_interval_secs = 30
            spec_load_timeout_secs = 2
            ignore = ["kube-dns", "internal"]

            [specs]
            dir = "discover/apis/"
            rewrites = "https://config.example.com/rewrites.yaml"

            [specs.groupings]
            billing = "Billing APIs"

            [specs.rewrite_urls]
            "http://petstore.internal" = ""
            "http://old.example.com" = "https://new.example.com"

            [site]
            url = "https://developer.example.com"

            [[registry.services]]
            namespace = "platform"
            hostname = "petstore.platform.svc"
            ports = [{ name = "http", port = 8080, protocol = "HTTP" }]

            [[registry.deployments]]
            name = "petstore"
            namespace = "platform"
        "#;

        let config = Config::parse(raw).unwrap();
        assert_eq!(config.discovery.ignore, vec!["kube-dns", "internal"]);
        assert_eq!(config.discovery.resync_interval(), Duration::from_secs(30));
        assert_eq!(config.specs.groupings["billing"], "Billing APIs");
        assert_eq!(config.specs.rewrite_urls["http://petstore.internal"], "");
        assert_eq!(config.site.url, "https://developer.example.com");

        let seeded = &config.registry.services[0];
        assert_eq!(seeded.namespace, "platform");
        assert_eq!(seeded.service.hostname, "petstore.platform.svc");
        assert_eq!(seeded.service.ports[0].protocol, Protocol::Http);
        assert_eq!(config.registry.deployments[0].name, "petstore");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Config::parse("[discovery]\nresync_interval_secs = \"soon\"").is_err());
    }
}
