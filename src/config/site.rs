//! Site configuration (_config.yml)

use anyhow::{bail, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Port used when neither the CLI, `PORT` nor the config file set one
pub const DEFAULT_PORT: u16 = 3000;

/// Main site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,

    // Server
    pub port: u16,
    pub lead_prefix: String,
    pub read_timeout_ms: u64,
    pub max_concurrent_reads: usize,

    // Directory
    pub content_dir: String,
    pub posts_dir: String,
    pub pillar_dir: String,
    pub pages_dir: String,
    pub aggregate_file: String,
    pub static_dir: String,
    pub views_dir: Option<String>,

    // Home page
    pub featured: String,
    pub first_page_size: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Slate".to_string(),
            description: String::new(),

            port: DEFAULT_PORT,
            lead_prefix: "/leads".to_string(),
            read_timeout_ms: 5000,
            max_concurrent_reads: 64,

            content_dir: "content".to_string(),
            posts_dir: "posts".to_string(),
            pillar_dir: "pillar".to_string(),
            pages_dir: "pages".to_string(),
            aggregate_file: "all.json".to_string(),
            static_dir: "public".to_string(),
            views_dir: None,

            featured: "start-here".to_string(),
            first_page_size: 10,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.lead_prefix.trim_matches('/').is_empty() {
            bail!(
                "lead_prefix {:?} would claim the whole site; use a path such as /leads",
                self.lead_prefix
            );
        }
        Ok(())
    }

    /// Apply a `PORT` value from the environment, if it parses
    pub fn apply_port_env(&mut self, value: Option<&str>) {
        let Some(raw) = value else {
            return;
        };
        match raw.trim().parse::<u16>() {
            Ok(port) => self.port = port,
            Err(_) => tracing::warn!("Ignoring invalid PORT value {:?}", raw),
        }
    }

    /// Upper bound for a single content file read
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Lead intake prefix normalized to `/name` form
    pub fn lead_prefix(&self) -> String {
        let trimmed = self.lead_prefix.trim_matches('/');
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.first_page_size, 10);
        assert_eq!(config.aggregate_file, "all.json");
        assert_eq!(config.featured, "start-here");
        assert_eq!(config.max_concurrent_reads, 64);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Guides
port: 8080
first_page_size: 5
pages_dir: static
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Guides");
        assert_eq!(config.port, 8080);
        assert_eq!(config.first_page_size, 5);
        assert_eq!(config.pages_dir, "static");
        // Untouched fields keep their defaults
        assert_eq!(config.posts_dir, "posts");
    }

    #[test]
    fn test_port_env_override() {
        let mut config = SiteConfig::default();
        config.apply_port_env(Some("4100"));
        assert_eq!(config.port, 4100);

        config.apply_port_env(Some("not-a-port"));
        assert_eq!(config.port, 4100);

        config.apply_port_env(None);
        assert_eq!(config.port, 4100);
    }

    #[test]
    fn test_root_lead_prefix_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        for prefix in ["/", "\"\"", "//"] {
            let path = dir.path().join("_config.yml");
            fs::write(&path, format!("lead_prefix: {}\n", prefix)).unwrap();
            let err = SiteConfig::load(&path).unwrap_err();
            assert!(err.to_string().contains("lead_prefix"), "{}", err);
        }

        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn test_lead_prefix_normalized() {
        let config = SiteConfig {
            lead_prefix: "leads/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.lead_prefix(), "/leads");
    }
}
