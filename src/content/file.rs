//! Markdown file model

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::FrontMatter;
use crate::cache::FileCache;
use crate::error::Error;

/// Format used for the date placeholder values
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A Markdown file as requested by a client
///
/// The raw text comes through the file content cache, so repeated requests
/// for the same file do not touch the disk until the file changes.
#[derive(Debug)]
pub struct MarkdownFile {
    /// Absolute path on disk
    pub path: PathBuf,
    /// File name component, used for download headers
    pub file_name: String,
    /// Raw text exactly as stored on disk, front matter included
    pub content: Arc<str>,
    /// Parsed front matter
    pub front_matter: FrontMatter,
    /// Body with the front matter stripped
    body: String,
    date_created: Option<DateTime<Local>>,
    date_modified: Option<DateTime<Local>>,
}

impl MarkdownFile {
    /// Load a Markdown file, reading its raw text through `cache`
    pub fn load(path: &Path, cache: &FileCache) -> Result<Self, Error> {
        let content = cache.get_text(path)?;
        let (front_matter, body) = FrontMatter::parse(&content);
        let body = body.to_string();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let metadata = std::fs::metadata(path).ok();
        let date_created = metadata
            .as_ref()
            .and_then(|m| m.created().ok())
            .map(DateTime::<Local>::from);
        let date_modified = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Local>::from);

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            content,
            front_matter,
            body,
            date_created,
            date_modified,
        })
    }

    /// The Markdown body with front matter stripped
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the file should be served at all
    pub fn is_published(&self) -> bool {
        self.front_matter.published
    }

    /// The status code the response should carry
    pub fn status_code(&self) -> u16 {
        self.front_matter.status_code
    }

    /// Title from front matter, falling back to the file stem
    pub fn title(&self) -> String {
        self.front_matter.title.clone().unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default()
        })
    }

    /// Value for a metadata placeholder: built-in fields first, then
    /// front-matter extras. `None` means the field is unknown to this file.
    pub fn field_value(&self, name: &str) -> Option<String> {
        match name {
            "title" => Some(self.title()),
            "filename" => Some(self.file_name.clone()),
            "author" => self.front_matter.author.clone(),
            "datecreated" => self
                .date_created
                .map(|d| d.format(DATE_FORMAT).to_string()),
            "datemodified" => self
                .date_modified
                .map(|d| d.format(DATE_FORMAT).to_string()),
            "date" => self.front_matter.date.clone(),
            _ => self.front_matter.extra_value(name),
        }
    }
}
