//! Template resolution
//!
//! Loads a layout template, performs the one-time structural substitutions
//! and stores the result in the file content cache under the template's own
//! path. Editing the template on disk evicts the resolved form like any
//! other cached file, so the transform runs once per template per cache
//! lifetime.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{self, FileCache};
use crate::error::Error;
use crate::helpers;
use crate::placeholder::DEFAULT_ENGINE;

/// The placeholder marking where per-request rendered content is inserted.
/// Mandatory, and allowed exactly once per template.
pub const CONTENT_FIELD: &str = "content";
/// Substituted with the application root path
pub const BASE_FOLDER_FIELD: &str = "basefolder";
/// Substituted with the directory containing the template file
pub const TEMPLATE_BASE_FOLDER_FIELD: &str = "templatebasefolder";

/// Resolves layout templates against the application root
pub struct TemplateResolver {
    cache: Arc<FileCache>,
    site_dir: PathBuf,
}

impl TemplateResolver {
    /// Create a resolver storing resolved templates in `cache`.
    /// `site_dir` is the filesystem directory the server root maps to;
    /// it anchors the `templatebasefolder` value.
    pub fn new(cache: Arc<FileCache>, site_dir: PathBuf) -> Self {
        Self { cache, site_dir }
    }

    /// Return the resolved text of the template at `template_path`
    ///
    /// On a cache miss the raw template is read from disk, structural
    /// placeholders are substituted, virtual paths are rewritten, and the
    /// result is cached under the template's path. Structural errors abort
    /// resolution and nothing is cached, so the next call re-attempts.
    pub fn resolve(&self, template_path: &Path, root: &str) -> Result<Arc<str>, Error> {
        if let Some(cached) = self.cache.lookup(template_path) {
            return Ok(cached);
        }

        tracing::debug!("resolving template: {}", template_path.display());

        // Read directly rather than through get_text: the read-through path
        // would cache the raw form under the path reserved for the
        // resolved form.
        let mut contents = cache::read_text_from_file(template_path)?;

        let engine = &*DEFAULT_ENGINE;
        let mut content_present = false;
        let mut base_folder: Option<String> = None;
        let mut template_base: Option<String> = None;

        for field in engine.find_all(&contents, None) {
            let name = engine.field_name(&field.text);
            let value = match name.as_str() {
                CONTENT_FIELD => {
                    // Presence check only; the renderer fills it per request
                    if content_present {
                        return Err(Error::InvalidTemplate(format!(
                            "the {} placeholder can only be used once in a template",
                            engine.token_for(CONTENT_FIELD)
                        )));
                    }
                    content_present = true;
                    continue;
                }
                BASE_FOLDER_FIELD => base_folder
                    .get_or_insert_with(|| helpers::without_trailing_slash(root).to_string())
                    .clone(),
                TEMPLATE_BASE_FOLDER_FIELD => template_base
                    .get_or_insert_with(|| self.template_base_folder(template_path, root))
                    .clone(),
                // Unknown names stay untouched; per-file processing
                // depends on them surviving resolution
                _ => continue,
            };
            contents = contents.replace(&field.text, &value);
        }

        let contents = helpers::to_absolute(&contents, root);

        if !content_present {
            return Err(Error::InvalidTemplate(format!(
                "the {} placeholder must be present",
                engine.token_for(CONTENT_FIELD)
            )));
        }

        let resolved: Arc<str> = Arc::from(contents);
        self.cache.put(template_path, Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Server-absolute directory containing the template, without a
    /// trailing separator
    fn template_base_folder(&self, template_path: &Path, root: &str) -> String {
        let rel_dir = template_path
            .parent()
            .and_then(|d| d.strip_prefix(&self.site_dir).ok())
            .map(|d| d.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        let joined = format!("{}/{}", root.trim_end_matches('/'), rel_dir);
        helpers::without_trailing_slash(&joined).to_string()
    }
}
