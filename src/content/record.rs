//! Content record and collection models

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::MarkdownRenderer;

lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap();
}

/// Keys that are lifted into typed fields and never kept as metadata
const RESERVED_KEYS: [&str; 4] = ["slug", "title", "body", "markdown"];

/// Check that a slug is safe to use both in a URL and as a file stem
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// One of the content store's sub-directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Regular posts
    General,
    /// Cornerstone articles
    Pillar,
    /// Standalone pages (about, contact, ...)
    Static,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::General, Partition::Pillar, Partition::Static];

    pub fn name(&self) -> &'static str {
        match self {
            Partition::General => "general",
            Partition::Pillar => "pillar",
            Partition::Static => "static",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Partition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" | "post" | "posts" => Ok(Partition::General),
            "pillar" => Ok(Partition::Pillar),
            "static" | "page" | "pages" => Ok(Partition::Static),
            other => Err(format!("unknown partition: {}", other)),
        }
    }
}

/// A well-formed document whose shape is not a valid record
#[derive(Error, Debug, PartialEq)]
pub enum ShapeError {
    #[error("expected a JSON object")]
    NotAnObject,

    #[error("expected a JSON array")]
    NotAnArray,

    #[error("missing or empty `{0}`")]
    Missing(&'static str),

    #[error("`{0}` must be a string")]
    NotAString(&'static str),

    #[error("record needs a `body` or `markdown` string")]
    NoBody,

    #[error("invalid slug {0:?}")]
    InvalidSlug(String),

    #[error("entry {index}: {source}")]
    Entry {
        index: usize,
        #[source]
        source: Box<ShapeError>,
    },
}

/// A single renderable piece of content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRecord {
    /// Identifier taken from the file name
    pub slug: String,

    pub title: String,

    /// Rendered HTML body
    pub body: String,

    /// Every other top-level key, in file order
    #[serde(flatten)]
    pub metadata: IndexMap<String, Value>,
}

impl ContentRecord {
    /// Build a record from a parsed JSON document.
    ///
    /// `body` is used verbatim when present; otherwise `markdown` is rendered
    /// to HTML. Any `slug` key in the document is ignored in favour of the
    /// file name.
    pub fn from_json(
        slug: &str,
        value: Value,
        markdown: &MarkdownRenderer,
    ) -> Result<Self, ShapeError> {
        let Value::Object(mut map) = value else {
            return Err(ShapeError::NotAnObject);
        };

        let title = required_string(map.get("title"), "title")?;
        let body = match (map.get("body"), map.get("markdown")) {
            (Some(Value::String(body)), _) => body.clone(),
            (Some(_), _) => return Err(ShapeError::NotAString("body")),
            (None, Some(Value::String(md))) => markdown.render(md),
            (None, Some(_)) => return Err(ShapeError::NotAString("markdown")),
            (None, None) => return Err(ShapeError::NoBody),
        };

        for key in RESERVED_KEYS {
            map.shift_remove(key);
        }

        Ok(Self {
            slug: slug.to_string(),
            title,
            body,
            metadata: map.into_iter().collect(),
        })
    }
}

/// One entry of the aggregate listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSummary {
    pub slug: String,
    pub title: String,
    #[serde(flatten)]
    pub metadata: IndexMap<String, Value>,
}

impl ContentSummary {
    pub fn from_json(value: Value) -> Result<Self, ShapeError> {
        let Value::Object(mut map) = value else {
            return Err(ShapeError::NotAnObject);
        };

        let slug = required_string(map.get("slug"), "slug")?;
        if !is_valid_slug(&slug) {
            return Err(ShapeError::InvalidSlug(slug));
        }
        let title = required_string(map.get("title"), "title")?;

        map.shift_remove("slug");
        map.shift_remove("title");

        Ok(Self {
            slug,
            title,
            metadata: map.into_iter().collect(),
        })
    }
}

/// Ordered list of summaries, kept in the order of the aggregate file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ContentCollection {
    items: Vec<ContentSummary>,
}

impl ContentCollection {
    pub fn new(items: Vec<ContentSummary>) -> Self {
        Self { items }
    }

    pub fn from_json(value: Value) -> Result<Self, ShapeError> {
        let Value::Array(entries) = value else {
            return Err(ShapeError::NotAnArray);
        };

        let items = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                ContentSummary::from_json(entry).map_err(|e| ShapeError::Entry {
                    index,
                    source: Box::new(e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { items })
    }

    pub fn items(&self) -> &[ContentSummary] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Split into the landing page's items and the overflow remainder.
    /// The halves are disjoint and concatenate back to the full list.
    pub fn split_first_page(&self, size: usize) -> (&[ContentSummary], &[ContentSummary]) {
        self.items.split_at(size.min(self.items.len()))
    }
}

fn required_string(value: Option<&Value>, key: &'static str) -> Result<String, ShapeError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) | None | Some(Value::Null) => Err(ShapeError::Missing(key)),
        Some(_) => Err(ShapeError::NotAString(key)),
    }
}
