//! Page templates rendered with the Tera template engine
//!
//! The default views are embedded in the binary. A site may override any of
//! them by dropping a file with the same name into its views directory.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};
use thiserror::Error;
use walkdir::WalkDir;

/// Views shipped with the binary
const EMBEDDED_VIEWS: [(&str, &str); 12] = [
    ("layout.html", include_str!("views/layout.html")),
    ("home.html", include_str!("views/home.html")),
    ("allposts.html", include_str!("views/allposts.html")),
    ("post.html", include_str!("views/post.html")),
    ("pillar.html", include_str!("views/pillar.html")),
    ("about.html", include_str!("views/about.html")),
    ("contact.html", include_str!("views/contact.html")),
    ("projects.html", include_str!("views/projects.html")),
    ("404.html", include_str!("views/404.html")),
    ("error.html", include_str!("views/error.html")),
    // Partials
    (
        "partials/record.html",
        include_str!("views/partials/record.html"),
    ),
    (
        "partials/post_list.html",
        include_str!("views/partials/post_list.html"),
    ),
];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to render {view}: {source}")]
    Template {
        view: String,
        #[source]
        source: tera::Error,
    },

    #[error("failed to render {view}: {message}")]
    Other { view: String, message: String },
}

/// Anything that can turn a view name and a context into HTML
pub trait Renderer: Send + Sync {
    fn render(&self, view: &str, context: &Context) -> Result<String, RenderError>;
}

/// Template renderer backed by Tera
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a renderer with the embedded views only
    pub fn new() -> anyhow::Result<Self> {
        Self::with_overrides(None)
    }

    /// Create a renderer, letting `*.html` files under `views_dir` replace
    /// embedded views of the same (relative) name
    pub fn with_overrides(views_dir: Option<&Path>) -> anyhow::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(EMBEDDED_VIEWS.to_vec())?;

        if let Some(dir) = views_dir {
            let overrides = load_overrides(dir)?;
            if !overrides.is_empty() {
                tracing::info!("Loaded {} view override(s) from {:?}", overrides.len(), dir);
                tera.add_raw_templates(overrides)?;
            }
        }

        tera.register_filter("strip_html", strip_html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, view: &str, context: &Context) -> Result<String, RenderError> {
        self.tera
            .render(view, context)
            .map_err(|source| RenderError::Template {
                view: view.to_string(),
                source,
            })
    }
}

fn load_overrides(dir: &Path) -> anyhow::Result<Vec<(String, String)>> {
    if !dir.exists() {
        tracing::warn!("Views directory {:?} does not exist, using built-in views", dir);
        return Ok(Vec::new());
    }

    let mut views = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_html = path.extension().map(|ext| ext == "html").unwrap_or(false);
        if !entry.file_type().is_file() || !is_html {
            continue;
        }

        let name = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        views.push((name, fs::read_to_string(path)?));
    }

    Ok(views)
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    Ok(tera::Value::String(result))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}
