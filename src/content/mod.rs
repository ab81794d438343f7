//! Content module - records, collections and the loader that reads them

mod error;
mod frontmatter;
pub mod loader;
mod markdown;
mod record;

pub use error::{LoadError, Target};
pub use frontmatter::{FrontMatter, FrontMatterError};
pub use loader::ContentLoader;
pub use markdown::MarkdownRenderer;
pub use record::{
    is_valid_slug, ContentCollection, ContentRecord, ContentSummary, Partition, ShapeError,
};
