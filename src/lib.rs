//! slate: a small content server
//!
//! Serves pre-authored JSON and markdown records from a read-only content
//! store, rendered through Tera views or exposed as a JSON API.

pub mod commands;
pub mod config;
pub mod content;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Name of the site configuration file inside the base directory
pub const CONFIG_FILE: &str = "_config.yml";

/// A content site on disk
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Root of the content store
    pub content_dir: PathBuf,
    /// Static assets served under /static
    pub static_dir: PathBuf,
    /// Optional directory of view overrides
    pub views_dir: Option<PathBuf>,
}

impl Site {
    /// Open a site from a directory, falling back to default config when
    /// `_config.yml` is absent
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No {} in {:?}, using defaults", CONFIG_FILE, base_dir);
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Build a site from an already loaded configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let content_dir = base_dir.join(&config.content_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let views_dir = config.views_dir.as_ref().map(|dir| base_dir.join(dir));

        Self {
            config,
            base_dir,
            content_dir,
            static_dir,
            views_dir,
        }
    }

    /// Loader for this site's content store
    pub fn loader(&self) -> content::ContentLoader {
        content::ContentLoader::new(&self.base_dir, &self.config)
    }
}
