//! Placeholder engine
//!
//! Finds and substitutes `{{name}}` tokens in arbitrary text. Placeholders
//! are not a template language: there are no conditionals, loops or nested
//! expressions. The name character class excludes the delimiter characters
//! themselves, so tokens cannot nest or overlap.

use lazy_static::lazy_static;
use regex::{NoExpand, Regex, RegexBuilder};

/// Default placeholder prefix
pub const PLACEHOLDER_PREFIX: &str = "{{";
/// Default placeholder suffix
pub const PLACEHOLDER_SUFFIX: &str = "}}";
/// Default name pattern: alphanumerics plus "/" for paths, "." for file
/// names, "-" and "_"
pub const PLACEHOLDER_NAME_PATTERN: &str = r"[0-9a-z/\.\-_]+?";

lazy_static! {
    /// The engine used everywhere a caller does not need custom delimiters
    pub static ref DEFAULT_ENGINE: PlaceholderEngine = PlaceholderEngine::default();
}

/// A placeholder found in a content scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMatch {
    /// Byte offset of the first character of the token
    pub start: usize,
    /// The full token text, delimiters included
    pub text: String,
}

/// A configurable placeholder engine parameterized by prefix, suffix and
/// name pattern. Matching is always case-insensitive: `{{Content}}` and
/// `{{CONTENT}}` are the same slot.
#[derive(Debug, Clone)]
pub struct PlaceholderEngine {
    prefix: String,
    suffix: String,
    name_pattern: String,
}

impl Default for PlaceholderEngine {
    fn default() -> Self {
        Self::new(
            PLACEHOLDER_PREFIX,
            PLACEHOLDER_SUFFIX,
            PLACEHOLDER_NAME_PATTERN,
        )
    }
}

impl PlaceholderEngine {
    /// Create an engine with custom delimiters and name pattern.
    /// `name_pattern` is a regex fragment and must not contain capture
    /// groups or the delimiter characters.
    pub fn new(prefix: &str, suffix: &str, name_pattern: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            name_pattern: name_pattern.to_string(),
        }
    }

    /// Build the regex source matching either a specific (escaped) name or
    /// the engine's name pattern. Optional whitespace is allowed between
    /// the delimiters and the name.
    fn pattern_for(&self, name: Option<&str>) -> String {
        let name_pattern = match name {
            Some(n) => regex::escape(n),
            None => self.name_pattern.clone(),
        };
        format!(
            r"{}\s*?{}\s*?{}",
            regex::escape(&self.prefix),
            name_pattern,
            regex::escape(&self.suffix)
        )
    }

    fn regex_for(&self, name: Option<&str>) -> Regex {
        RegexBuilder::new(&self.pattern_for(name))
            .case_insensitive(true)
            .build()
            .expect("placeholder pattern is a valid regex")
    }

    /// Find every placeholder in `content`, in left-to-right order of first
    /// character offset. If `name` is given, only tokens with that exact
    /// (case-insensitive) name are returned.
    pub fn find_all(&self, content: &str, name: Option<&str>) -> Vec<PlaceholderMatch> {
        self.regex_for(name)
            .find_iter(content)
            .map(|m| PlaceholderMatch {
                start: m.start(),
                text: m.as_str().to_string(),
            })
            .collect()
    }

    /// Distinct normalized placeholder names present in `content`, in order
    /// of first appearance
    pub fn names_of(&self, content: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for m in self.find_all(content, None) {
            let name = self.field_name(&m.text);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Whether the named placeholder appears anywhere in `content`
    pub fn is_present(&self, content: &str, name: &str) -> bool {
        self.regex_for(Some(name)).is_match(content)
    }

    /// Replace every occurrence of the named placeholder with `new_value`,
    /// case-insensitively.
    ///
    /// The replacement goes through `NoExpand` so that content-derived text
    /// containing `$1`-style sequences is inserted verbatim instead of being
    /// interpreted as a capture-group reference. That applies to every
    /// replacement, not just user input.
    pub fn replace(&self, content: &str, name: &str, new_value: &str) -> String {
        if content.is_empty() || name.is_empty() {
            return content.to_string();
        }
        self.regex_for(Some(name))
            .replace_all(content, NoExpand(new_value))
            .into_owned()
    }

    /// Extract the normalized name from a token: strips the delimiters,
    /// trims whitespace and lower-cases. Assumes `placeholder` is a
    /// well-formed token found by a previous match; no validation.
    pub fn field_name(&self, placeholder: &str) -> String {
        placeholder[self.prefix.len()..placeholder.len() - self.suffix.len()]
            .trim()
            .to_lowercase()
    }

    /// Wrap a name with the engine's delimiters. No escaping; used to build
    /// error messages, not content.
    pub fn token_for(&self, name: &str) -> String {
        format!("{}{}{}", self.prefix, name, self.suffix)
    }
}
