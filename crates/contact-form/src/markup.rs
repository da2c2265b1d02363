//! Trusted markup
//!
//! Labels and instructions in `config.json` may carry HTML (bold text, links,
//! placeholders). They are wrapped in [`Markup`] and emitted verbatim, while
//! every plain string goes through [`escape`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Markup authored in the configuration, emitted without escaping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TextLines", into = "String")]
pub struct Markup(String);

/// A string or a list of strings joined with single spaces.
#[derive(Deserialize)]
#[serde(untagged)]
enum TextLines {
    One(String),
    Many(Vec<String>),
}

impl From<TextLines> for Markup {
    fn from(lines: TextLines) -> Self {
        match lines {
            TextLines::One(text) => Self(text),
            TextLines::Many(lines) => Self(lines.join(" ")),
        }
    }
}

impl From<Markup> for String {
    fn from(markup: Markup) -> Self {
        markup.0
    }
}

impl Markup {
    /// Wrap markup that must not be escaped
    pub fn trusted(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    /// Wrap plain text, escaping it
    pub fn text(text: &str) -> Self {
        Self(escape(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Text content with tags removed and whitespace collapsed.
    pub fn plain_text(&self) -> String {
        static TAGS: OnceLock<Regex> = OnceLock::new();
        let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
        let stripped = tags.replace_all(&self.0, " ");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escape text for element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    handlebars::html_escape(text)
}
