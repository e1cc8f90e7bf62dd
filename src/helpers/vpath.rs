//! Virtual path rewriting
//!
//! Content references assets relative to the application root with a `~/`
//! marker. The Markdown renderer percent-encodes `~` as `%7E`, so depending
//! on which processing stage ran first either form can appear; both are
//! rewritten. Pure text substitution, no filesystem access.

/// Root-relative path marker as written in source files
pub const VIRTUAL_ROOT: &str = "~/";
/// The same marker after percent-encoding by the Markdown renderer
pub const VIRTUAL_ROOT_ENCODED: &str = "%7E/";

/// Rewrite every root-relative marker in `content` to `root_absolute`
///
/// # Examples
/// ```ignore
/// to_absolute("~/img/a.png", "/site/") // -> "/site/img/a.png"
/// ```
pub fn to_absolute(content: &str, root_absolute: &str) -> String {
    let base = with_trailing_slash(root_absolute);
    content
        .replace(VIRTUAL_ROOT, &base)
        .replace(VIRTUAL_ROOT_ENCODED, &base)
}

/// Normalize a root path to exactly one trailing slash
fn with_trailing_slash(root: &str) -> String {
    format!("{}/", root.trim_end_matches('/'))
}

/// Strip the trailing separator from an absolute server path, as placeholder
/// values are substituted without one
pub fn without_trailing_slash(path: &str) -> &str {
    if path == "/" {
        path
    } else {
        path.trim_end_matches('/')
    }
}
