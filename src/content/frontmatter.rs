//! Front-matter parsing

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Front-matter data from a Markdown file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    /// Files are published by default; unpublished files respond not-found
    #[serde(default = "default_published")]
    pub published: bool,
    /// HTTP status code to respond with (for custom error pages)
    #[serde(default = "default_status_code")]
    pub status_code: u16,

    /// Additional custom fields, usable as metadata placeholders
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

fn default_published() -> bool {
    true
}

fn default_status_code() -> u16 {
    200
}

impl Default for FrontMatter {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            date: None,
            published: true,
            status_code: 200,
            extra: HashMap::new(),
        }
    }
}

impl FrontMatter {
    /// Parse front matter from a content string
    ///
    /// Supports YAML between `---` fences and a leading JSON object.
    /// Malformed front matter degrades to "no front matter" with a warning
    /// rather than failing the request. Returns the front matter and the
    /// remaining body.
    pub fn parse(content: &str) -> (Self, &str) {
        let trimmed = content.trim_start();

        if trimmed.starts_with("---") {
            return Self::parse_yaml(trimmed);
        }
        if trimmed.starts_with('{') {
            return Self::parse_json(trimmed);
        }

        (FrontMatter::default(), trimmed)
    }

    fn parse_yaml(content: &str) -> (Self, &str) {
        let rest = content[3..].trim_start_matches(['\n', '\r']);

        let Some(end_pos) = rest.find("\n---") else {
            // No closing fence: treat as body
            return (FrontMatter::default(), content);
        };

        let yaml_content = &rest[..end_pos];
        let remaining = rest[end_pos + 4..].trim_start_matches(['\n', '\r']);

        if yaml_content.trim().is_empty() {
            return (FrontMatter::default(), remaining);
        }

        match serde_yaml::from_str::<FrontMatter>(yaml_content) {
            Ok(fm) => (fm, remaining),
            Err(e) => {
                tracing::warn!("failed to parse YAML front matter, treating as content: {}", e);
                (FrontMatter::default(), content)
            }
        }
    }

    fn parse_json(content: &str) -> (Self, &str) {
        // Find the matching closing brace of the leading object
        let mut depth = 0;
        let mut end_pos = 0;
        for (i, c) in content.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end_pos = i + 1;
                        break;
                    }
                }
                _ => {}
            }
        }

        if end_pos == 0 {
            return (FrontMatter::default(), content);
        }

        let remaining = content[end_pos..].trim_start_matches(['\n', '\r']);
        match serde_json::from_str::<FrontMatter>(&content[..end_pos]) {
            Ok(fm) => (fm, remaining),
            Err(e) => {
                tracing::warn!("failed to parse JSON front matter, treating as content: {}", e);
                (FrontMatter::default(), content)
            }
        }
    }

    /// Look up an extra field by name, case-insensitively, rendered as the
    /// string form used for placeholder substitution
    pub fn extra_value(&self, name: &str) -> Option<String> {
        self.extra
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| yaml_to_string(v))
    }
}

/// Scalar YAML values rendered the way they were written; everything else
/// falls back to its YAML serialization
fn yaml_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
