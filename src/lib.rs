//! mdserve: a Markdown-to-HTML web server
//!
//! Renders Markdown files as HTML on request, substituting `{{name}}`
//! layout placeholders and caching both raw file contents and fully
//! resolved templates. Cache entries are invalidated by file-change
//! events, so disk I/O and regex work happen only once per file version.

pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod helpers;
pub mod placeholder;
pub mod render;
pub mod server;
pub mod template;

pub use error::Error;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// The main application: configuration plus resolved directories
#[derive(Clone)]
pub struct MdServe {
    /// Server configuration
    pub config: config::ServerConfig,
    /// Base directory (where mdserve.yml lives)
    pub base_dir: PathBuf,
    /// Directory served as the site
    pub site_dir: PathBuf,
    /// Absolute path of the layout template
    pub template_path: PathBuf,
}

impl MdServe {
    /// Create an application from a base directory, loading `mdserve.yml`
    /// when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("mdserve.yml");

        let config = if config_path.exists() {
            config::ServerConfig::load(&config_path)?
        } else {
            config::ServerConfig::default()
        };

        let site_dir = base_dir.join(&config.site_dir);
        let template_path = site_dir.join(&config.template);

        Ok(Self {
            config,
            base_dir,
            site_dir,
            template_path,
        })
    }
}
