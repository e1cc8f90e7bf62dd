//! Page rendering
//!
//! Combines a resolved layout with the rendered body and per-file metadata.
//! The resolved template is shared across concurrent requests, so all
//! substitution happens on a fresh copy taken from the cache.

use std::path::Path;

use crate::content::{MarkdownFile, MarkdownRenderer};
use crate::error::Error;
use crate::helpers;
use crate::placeholder::DEFAULT_ENGINE;
use crate::template::{TemplateResolver, CONTENT_FIELD};

/// Renders Markdown files into full HTML pages
pub struct PageRenderer {
    resolver: TemplateResolver,
    markdown: MarkdownRenderer,
}

impl PageRenderer {
    /// Create a renderer on top of a template resolver
    pub fn new(resolver: TemplateResolver) -> Self {
        Self {
            resolver,
            markdown: MarkdownRenderer::new(),
        }
    }

    /// Render `file` through the layout at `template_path`
    ///
    /// The content slot is filled with the rendered Markdown body, then
    /// every remaining placeholder in the page is substituted with the
    /// file's metadata. Placeholders with no value resolve to the empty
    /// string so no token leaks into the final HTML.
    pub fn render_page(
        &self,
        file: &MarkdownFile,
        template_path: &Path,
        root: &str,
    ) -> Result<String, Error> {
        let template = self.resolver.resolve(template_path, root)?;

        let body = self.markdown.render(file.body());
        // The renderer percent-encodes "~", so root-relative links in the
        // body are rewritten after rendering
        let body = helpers::to_absolute(&body, root);

        let engine = &*DEFAULT_ENGINE;
        let mut page = engine.replace(&template, CONTENT_FIELD, &body);

        // Metadata fields may appear in the layout or in the body itself
        for name in engine.names_of(&page) {
            let value = file.field_value(&name).unwrap_or_default();
            page = engine.replace(&page, &name, &value);
        }

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::FakeNotifier;
    use crate::cache::{ChangeNotifier, FileCache};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        renderer: PageRenderer,
        cache: Arc<FileCache>,
        template_path: PathBuf,
        site_dir: PathBuf,
    }

    fn fixture(template: &str) -> Fixture {
        let dir = TempDir::new().unwrap();
        let site_dir = dir.path().to_path_buf();
        let template_path = site_dir.join("layout.html");
        fs::write(&template_path, template).unwrap();

        let notifier = Arc::new(FakeNotifier::new());
        let cache = Arc::new(FileCache::new(notifier as Arc<dyn ChangeNotifier>));
        let resolver = TemplateResolver::new(Arc::clone(&cache), site_dir.clone());

        Fixture {
            _dir: dir,
            renderer: PageRenderer::new(resolver),
            cache,
            template_path,
            site_dir,
        }
    }

    fn write_page(fixture: &Fixture, name: &str, content: &str) -> MarkdownFile {
        let path = fixture.site_dir.join(name);
        fs::write(&path, content).unwrap();
        MarkdownFile::load(&path, &fixture.cache).unwrap()
    }

    #[test]
    fn test_content_slot_filled_with_rendered_body() {
        let f = fixture("<html><title>{{title}}</title>{{content}}</html>");
        let file = write_page(&f, "page.md", "---\ntitle: Hi\n---\n# Heading\n");

        let html = f
            .renderer
            .render_page(&file, &f.template_path, "/")
            .unwrap();
        assert!(html.contains("<title>Hi</title>"));
        assert!(html.contains("<h1>Heading</h1>"));
        assert!(!html.contains("{{content}}"));
    }

    #[test]
    fn test_unknown_placeholders_blanked() {
        let f = fixture("{{content}}<footer>{{copyright}}</footer>");
        let file = write_page(&f, "page.md", "body");

        let html = f
            .renderer
            .render_page(&file, &f.template_path, "/")
            .unwrap();
        assert!(html.contains("<footer></footer>"));
    }

    #[test]
    fn test_metadata_in_body_substituted() {
        let f = fixture("{{content}}");
        let file = write_page(&f, "page.md", "---\nauthor: Jane\n---\nWritten by {{author}}.");

        let html = f
            .renderer
            .render_page(&file, &f.template_path, "/")
            .unwrap();
        assert!(html.contains("Written by Jane."));
    }

    #[test]
    fn test_dollar_digit_metadata_appears_verbatim() {
        let f = fixture("{{content}}<p>{{offer}}</p>");
        let file = write_page(&f, "page.md", "---\noffer: $1 discount\n---\nbody");

        let html = f
            .renderer
            .render_page(&file, &f.template_path, "/")
            .unwrap();
        assert!(html.contains("<p>$1 discount</p>"));
    }

    #[test]
    fn test_virtual_paths_in_body_rewritten() {
        let f = fixture("{{content}}");
        let file = write_page(&f, "page.md", "![logo](~/img/logo.png)");

        let html = f
            .renderer
            .render_page(&file, &f.template_path, "/site")
            .unwrap();
        assert!(html.contains("/site/img/logo.png"));
        assert!(!html.contains("~/"));
        assert!(!html.contains("%7E/"));
    }

    #[test]
    fn test_invalid_template_propagates() {
        let f = fixture("no slot here");
        let file = write_page(&f, "page.md", "body");

        let err = f
            .renderer
            .render_page(&file, &f.template_path, "/")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));
    }

    #[test]
    fn test_cached_template_not_mutated_across_renders() {
        let f = fixture("<title>{{title}}</title>{{content}}");
        let first = write_page(&f, "a.md", "---\ntitle: First\n---\none");
        let second = write_page(&f, "b.md", "---\ntitle: Second\n---\ntwo");

        let html_a = f
            .renderer
            .render_page(&first, &f.template_path, "/")
            .unwrap();
        let html_b = f
            .renderer
            .render_page(&second, &f.template_path, "/")
            .unwrap();

        assert!(html_a.contains("<title>First</title>"));
        assert!(html_b.contains("<title>Second</title>"));
        // The cached resolved form still carries the open slots
        let cached = f.cache.lookup(&f.template_path).unwrap();
        assert!(cached.contains("{{title}}"));
        assert!(cached.contains("{{content}}"));
    }
}
