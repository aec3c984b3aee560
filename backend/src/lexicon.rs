//! Keyword table used by persona detection and output cleanup.
//!
//! The literal sets are tied to the language of the generated copy, so they
//! live in a data table rather than in the resolver or sanitizer. The built-in
//! table targets Korean marketing copy; `LEXICON_PATH` can point at a JSON file
//! that overrides any subset of fields.

use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("cannot read lexicon file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid lexicon JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("lexicon pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),

    #[error("lexicon field `{0}` must not be empty")]
    Empty(&'static str),
}

/// Raw, serializable form of the table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LexiconTable {
    /// Any of these anywhere in target or concern marks the persona as male.
    pub male_tokens: Vec<String>,
    /// Unit following a numeral that means "decade of age" (e.g. `30대`).
    pub decade_marker: String,
    /// Decade used when neither field names one.
    pub default_age: String,
    /// Scaffolding tokens the model leaks into copy; removed case-insensitively.
    pub disallowed_tokens: Vec<String>,
    /// Inline marker the client renders as a line break.
    pub line_break: String,
}

impl Default for LexiconTable {
    fn default() -> Self {
        let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            male_tokens: owned(&["남성", "남자", "남편", "아빠", "아버지", "아들", "신랑"]),
            decade_marker: "대".to_string(),
            default_age: "35".to_string(),
            disallowed_tokens: owned(&[
                "Subheadline:",
                "Headline:",
                "Body copy:",
                "Body:",
                "Call to action:",
                "CTA:",
                "Hook:",
                "Title:",
                "Caption:",
            ]),
            line_break: "<br>".to_string(),
        }
    }
}

/// Compiled, read-only lexicon shared by every session.
#[derive(Debug, Clone)]
pub struct Lexicon {
    table: LexiconTable,
    decade_re: Regex,
    disallowed_re: Option<Regex>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::compile(LexiconTable::default()).expect("built-in lexicon compiles")
    }
}

impl Lexicon {
    pub fn compile(table: LexiconTable) -> Result<Self, LexiconError> {
        if table.decade_marker.is_empty() {
            return Err(LexiconError::Empty("decade_marker"));
        }
        if table.line_break.is_empty() {
            return Err(LexiconError::Empty("line_break"));
        }

        let decade_re = Regex::new(&format!(r"(\d+){}", regex::escape(&table.decade_marker)))?;

        let mut tokens: Vec<&str> = table
            .disallowed_tokens
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .collect();
        // Longest first so a token never shadows a longer one sharing its prefix.
        tokens.sort_by(|a, b| b.len().cmp(&a.len()));
        let disallowed_re = if tokens.is_empty() {
            None
        } else {
            let alternation = tokens
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            Some(RegexBuilder::new(&alternation).case_insensitive(true).build()?)
        };

        Ok(Self {
            table,
            decade_re,
            disallowed_re,
        })
    }

    /// Load a JSON table from disk. Fields absent from the file keep defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LexiconError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table: LexiconTable = serde_json::from_str(&raw)?;
        Self::compile(table)
    }

    pub fn male_tokens(&self) -> &[String] {
        &self.table.male_tokens
    }

    pub fn decade_marker(&self) -> &str {
        &self.table.decade_marker
    }

    pub fn default_age(&self) -> &str {
        &self.table.default_age
    }

    pub fn line_break(&self) -> &str {
        &self.table.line_break
    }

    /// First `<digits><marker>` occurrence in `text`, digits only.
    pub fn find_decade<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.decade_re
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// Remove every disallowed token, ignoring case.
    pub fn strip_disallowed(&self, text: &str) -> String {
        match &self.disallowed_re {
            Some(re) => re.replace_all(text, "").into_owned(),
            None => text.to_string(),
        }
    }
}
