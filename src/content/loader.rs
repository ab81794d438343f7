//! Content loader - reads records and the aggregate listing from the content store

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use walkdir::WalkDir;

use super::{
    is_valid_slug, ContentCollection, ContentRecord, FrontMatter, LoadError, MarkdownRenderer,
    Partition, ShapeError, Target,
};
use crate::config::SiteConfig;

/// Loads content from the content directory.
///
/// The loader never writes and keeps no state between calls, so one instance
/// is shared by every request. Reads run on the blocking pool; each holds a
/// permit until the underlying read returns, so a stalled filesystem can tie
/// up at most `max_concurrent_reads` threads.
#[derive(Clone)]
pub struct ContentLoader {
    general_dir: PathBuf,
    pillar_dir: PathBuf,
    static_dir: PathBuf,
    aggregate_path: PathBuf,
    timeout: Duration,
    read_permits: Arc<Semaphore>,
    markdown: Arc<MarkdownRenderer>,
}

impl ContentLoader {
    /// Create a loader rooted at `<base_dir>/<content_dir>`
    pub fn new(base_dir: &Path, config: &SiteConfig) -> Self {
        let root = base_dir.join(&config.content_dir);
        Self {
            general_dir: root.join(&config.posts_dir),
            pillar_dir: root.join(&config.pillar_dir),
            static_dir: root.join(&config.pages_dir),
            aggregate_path: root.join(&config.aggregate_file),
            timeout: config.read_timeout(),
            read_permits: Arc::new(Semaphore::new(config.max_concurrent_reads.max(1))),
            markdown: Arc::new(MarkdownRenderer::new()),
        }
    }

    /// Directory backing a partition
    pub fn partition_dir(&self, partition: Partition) -> &Path {
        match partition {
            Partition::General => &self.general_dir,
            Partition::Pillar => &self.pillar_dir,
            Partition::Static => &self.static_dir,
        }
    }

    pub fn aggregate_path(&self) -> &Path {
        &self.aggregate_path
    }

    /// Load a single record.
    ///
    /// `<slug>.json` takes precedence over `<slug>.md`. Slugs that are not
    /// URL/filesystem safe are reported as not found without touching disk.
    pub async fn load(&self, partition: Partition, slug: &str) -> Result<ContentRecord, LoadError> {
        let target = Target::record(partition, slug);
        if !is_valid_slug(slug) {
            return Err(LoadError::NotFound { target });
        }

        let dir = self.partition_dir(partition);

        let json_path = dir.join(format!("{}.json", slug));
        if let Some(raw) = self.read(&json_path, &target).await? {
            let value: serde_json::Value =
                serde_json::from_str(&raw).map_err(|e| LoadError::Parse {
                    target: target.clone(),
                    source: Box::new(e),
                })?;
            return ContentRecord::from_json(slug, value, &self.markdown)
                .map_err(|source| LoadError::Invalid { target, source });
        }

        let md_path = dir.join(format!("{}.md", slug));
        if let Some(raw) = self.read(&md_path, &target).await? {
            return self.parse_markdown_record(slug, &raw, target);
        }

        Err(LoadError::NotFound { target })
    }

    /// Load the aggregate listing used by the index routes
    pub async fn load_collection(&self) -> Result<ContentCollection, LoadError> {
        let target = Target::Aggregate;
        let raw = self
            .read(&self.aggregate_path, &target)
            .await?
            .ok_or_else(|| LoadError::NotFound {
                target: target.clone(),
            })?;

        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| LoadError::Parse {
                target: target.clone(),
                source: Box::new(e),
            })?;

        ContentCollection::from_json(value).map_err(|source| LoadError::Invalid { target, source })
    }

    /// Slugs present in a partition, sorted by file name
    pub fn list(&self, partition: Partition) -> Vec<String> {
        let dir = self.partition_dir(partition);
        if !dir.exists() {
            return Vec::new();
        }

        let mut slugs: Vec<String> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| record_slug(e.path()))
            .collect();

        // foo.json and foo.md name the same record
        slugs.dedup();
        slugs
    }

    /// Read a file under the configured timeout. A missing file is `Ok(None)`.
    ///
    /// The timeout covers waiting for a read permit as well as the read.
    async fn read(&self, path: &Path, target: &Target) -> Result<Option<String>, LoadError> {
        let permits = Arc::clone(&self.read_permits);
        let path = path.to_path_buf();
        let read = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|e| std::io::Error::new(ErrorKind::Other, e))?;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                std::fs::read_to_string(path)
            })
            .await
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))?
        };

        match tokio::time::timeout(self.timeout, read).await {
            Ok(Ok(content)) => Ok(Some(content)),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Ok(Err(e)) => Err(LoadError::Io {
                target: target.clone(),
                source: e,
            }),
            Err(_) => Err(LoadError::Timeout {
                target: target.clone(),
                after: self.timeout,
            }),
        }
    }

    fn parse_markdown_record(
        &self,
        slug: &str,
        raw: &str,
        target: Target,
    ) -> Result<ContentRecord, LoadError> {
        let (fm, body) = FrontMatter::parse(raw).map_err(|e| LoadError::Parse {
            target: target.clone(),
            source: Box::new(e),
        })?;

        let title = match fm.title {
            Some(title) if !title.trim().is_empty() => title,
            _ => {
                return Err(LoadError::Invalid {
                    target,
                    source: ShapeError::Missing("title"),
                })
            }
        };

        let mut metadata = fm.extra;
        for key in ["slug", "body", "markdown"] {
            metadata.shift_remove(key);
        }

        Ok(ContentRecord {
            slug: slug.to_string(),
            title,
            body: self.markdown.render(body),
            metadata,
        })
    }
}

/// Record slug for a store file, if it is a `.json` or `.md` file
fn record_slug(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if ext != "json" && ext != "md" {
        return None;
    }
    path.file_stem()?.to_str().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ContentLoader) {
        setup_with(SiteConfig::default())
    }

    fn setup_with(config: SiteConfig) -> (TempDir, ContentLoader) {
        let dir = TempDir::new().unwrap();
        for sub in ["posts", "pillar", "pages"] {
            fs::create_dir_all(dir.path().join("content").join(sub)).unwrap();
        }
        let loader = ContentLoader::new(dir.path(), &config);
        (dir, loader)
    }

    fn write(dir: &TempDir, rel: &str, content: &str) {
        fs::write(dir.path().join("content").join(rel), content).unwrap();
    }

    #[tokio::test]
    async fn test_load_json_record() {
        let (dir, loader) = setup();
        write(
            &dir,
            "posts/rust-intro.json",
            r#"{"title": "Rust Intro", "body": "<p>Hello</p>", "author": "Sam"}"#,
        );

        let record = loader.load(Partition::General, "rust-intro").await.unwrap();
        assert_eq!(record.slug, "rust-intro");
        assert_eq!(record.title, "Rust Intro");
        assert_eq!(record.body, "<p>Hello</p>");
        assert_eq!(record.metadata["author"], "Sam");
    }

    #[tokio::test]
    async fn test_load_markdown_record() {
        let (dir, loader) = setup();
        write(
            &dir,
            "pillar/start-here.md",
            "---\ntitle: Start Here\nlevel: beginner\n---\n\n# Welcome\n",
        );

        let record = loader.load(Partition::Pillar, "start-here").await.unwrap();
        assert_eq!(record.title, "Start Here");
        assert!(record.body.contains("<h1>Welcome</h1>"));
        assert_eq!(record.metadata["level"], "beginner");
    }

    #[tokio::test]
    async fn test_json_wins_over_markdown() {
        let (dir, loader) = setup();
        write(&dir, "pages/about.json", r#"{"title": "From JSON", "body": ""}"#);
        write(&dir, "pages/about.md", "---\ntitle: From Markdown\n---\n");

        let record = loader.load(Partition::Static, "about").await.unwrap();
        assert_eq!(record.title, "From JSON");
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let (_dir, loader) = setup();
        let err = loader.load(Partition::General, "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_partitions_are_separate() {
        let (dir, loader) = setup();
        write(&dir, "posts/shared.json", r#"{"title": "Post", "body": "x"}"#);

        assert!(loader.load(Partition::General, "shared").await.is_ok());
        let err = loader.load(Partition::Pillar, "shared").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unsafe_slug_is_not_found() {
        let (dir, loader) = setup();
        write(&dir, "all.json", "[]");

        let err = loader.load(Partition::General, "../all").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let (dir, loader) = setup();
        write(&dir, "posts/broken.json", "{ \"title\": ");

        let err = loader.load(Partition::General, "broken").await.unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_invalid() {
        let (dir, loader) = setup();
        write(&dir, "posts/untitled.json", r#"{"body": "no title"}"#);

        let err = loader.load(Partition::General, "untitled").await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::Invalid {
                source: ShapeError::Missing("title"),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_directory_in_place_of_file_is_io_error() {
        let (dir, loader) = setup();
        fs::create_dir_all(dir.path().join("content/posts/weird.json")).unwrap();

        let err = loader.load(Partition::General, "weird").await.unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[tokio::test]
    async fn test_load_collection_keeps_file_order() {
        let (dir, loader) = setup();
        write(
            &dir,
            "all.json",
            r#"[{"slug": "zeta", "title": "Z"}, {"slug": "alpha", "title": "A"}]"#,
        );

        let collection = loader.load_collection().await.unwrap();
        let slugs: Vec<_> = collection.items().iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(slugs, vec!["zeta", "alpha"]);
    }

    #[tokio::test]
    async fn test_missing_aggregate_is_not_found() {
        let (_dir, loader) = setup();
        let err = loader.load_collection().await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.target(), &Target::Aggregate);
    }

    #[test]
    fn test_list_partition() {
        let (dir, loader) = setup();
        write(&dir, "posts/b.json", "{}");
        write(&dir, "posts/a.md", "");
        write(&dir, "posts/a.json", "{}");
        write(&dir, "posts/notes.txt", "");

        assert_eq!(loader.list(Partition::General), vec!["a", "b"]);
        assert!(loader.list(Partition::Pillar).is_empty());
    }

    /// A FIFO with no writer blocks any reader until `release` opens it.
    #[cfg(unix)]
    fn stalled_file(dir: &TempDir, rel: &str) -> PathBuf {
        let path = dir.path().join("content").join(rel);
        let status = std::process::Command::new("mkfifo")
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success());
        path
    }

    #[cfg(unix)]
    fn release(path: &Path) {
        // the reader is parked in open(), so this returns at once; dropping gives it EOF
        drop(fs::OpenOptions::new().write(true).open(path).unwrap());
    }

    #[cfg(unix)]
    fn short_timeout(max_concurrent_reads: usize) -> SiteConfig {
        SiteConfig {
            read_timeout_ms: 200,
            max_concurrent_reads,
            ..SiteConfig::default()
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stalled_read_times_out() {
        let (dir, loader) = setup_with(short_timeout(4));
        let fifo = stalled_file(&dir, "posts/stuck.json");

        let err = loader.load(Partition::General, "stuck").await.unwrap_err();
        assert!(matches!(err, LoadError::Timeout { .. }), "{:?}", err);
        assert!(!err.is_not_found());

        release(&fifo);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stalled_reads_are_bounded_by_permits() {
        let (dir, loader) = setup_with(short_timeout(1));
        let fifo = stalled_file(&dir, "posts/stuck.json");
        write(&dir, "posts/fine.json", r#"{"title": "Fine", "body": ""}"#);

        let err = loader.load(Partition::General, "stuck").await.unwrap_err();
        assert!(matches!(err, LoadError::Timeout { .. }));

        // the only permit is still held by the parked read
        let err = loader.load(Partition::General, "fine").await.unwrap_err();
        assert!(matches!(err, LoadError::Timeout { .. }));

        release(&fifo);

        let mut loaded = None;
        for _ in 0..20 {
            if let Ok(record) = loader.load(Partition::General, "fine").await {
                loaded = Some(record);
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        assert_eq!(loaded.unwrap().title, "Fine");
    }
}
