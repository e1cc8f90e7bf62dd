//! Server configuration (mdserve.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind to
    pub ip: String,
    /// Port to listen on
    pub port: u16,

    /// Directory served as the site, relative to the base directory
    pub site_dir: String,
    /// Application root path all virtual paths resolve against
    pub root: String,
    /// Layout template, relative to the site directory
    pub template: String,
    /// File served for directory requests
    pub index: String,

    /// Whether `?download=1` may fetch the raw Markdown source
    pub allow_download: bool,
    /// Extensions handled by the Markdown pipeline; everything else is
    /// served as a static file
    pub markdown_extensions: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: 8080,
            site_dir: "site".to_string(),
            root: "/".to_string(),
            template: "templates/layout.html".to_string(),
            index: "index.md".to_string(),
            allow_download: false,
            markdown_extensions: vec![
                "md".to_string(),
                "markdown".to_string(),
                "mdh".to_string(),
            ],
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Whether `path` should go through the Markdown pipeline
    pub fn is_markdown(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.markdown_extensions
                    .iter()
                    .any(|m| m.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}
