//! Route table
//!
//! Routes are kept in an ordered list and matched in declaration order; the
//! first pattern that matches a path wins.

use crate::content::Partition;

/// Where a record route takes its slug from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugSource {
    /// Always the same record
    Fixed(&'static str),
    /// The record named by the `featured` setting
    Featured,
    /// The `:slug` segment of the path
    Param,
}

/// What a matched route loads and how it answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Featured pillar record plus the first page of the aggregate
    Home { view: &'static str },
    /// The aggregate entries past the first page
    Overflow { view: &'static str },
    /// One record rendered through a view
    Record {
        partition: Partition,
        slug: SlugSource,
        view: &'static str,
    },
    /// The whole aggregate as JSON
    ApiCollection,
    /// One record as JSON
    ApiRecord { partition: Partition },
}

impl RouteKind {
    pub fn is_api(&self) -> bool {
        matches!(self, RouteKind::ApiCollection | RouteKind::ApiRecord { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    /// `/`-separated template; a `:name` segment captures the slug
    pub path: &'static str,
    pub kind: RouteKind,
}

/// A route that matched a concrete path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a RoutePattern,
    /// Captured `:slug` segment, if the pattern has one
    pub param: Option<String>,
}

impl<'a> RouteMatch<'a> {
    /// Slug to load for record routes; `featured` fills in `SlugSource::Featured`
    pub fn slug<'s>(&'s self, featured: &'s str) -> Option<&'s str> {
        match self.route.kind {
            RouteKind::Record {
                slug: SlugSource::Fixed(slug),
                ..
            } => Some(slug),
            RouteKind::Record {
                slug: SlugSource::Featured,
                ..
            } => Some(featured),
            _ => self.param.as_deref(),
        }
    }
}

impl RoutePattern {
    pub const fn new(path: &'static str, kind: RouteKind) -> Self {
        Self { path, kind }
    }

    /// Match a request path against this pattern
    pub fn matches(&self, path: &str) -> Option<RouteMatch<'_>> {
        let pattern = segments(self.path);
        let actual = segments(path);
        if pattern.len() != actual.len() {
            return None;
        }

        let mut param = None;
        for (expected, got) in pattern.iter().zip(actual.iter()) {
            if expected.starts_with(':') {
                if got.is_empty() {
                    return None;
                }
                param = Some(got.to_string());
            } else if expected != got {
                return None;
            }
        }

        Some(RouteMatch { route: self, param })
    }
}

/// Split a path into segments, ignoring the leading and a trailing slash
fn segments(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Vec::new();
    }
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    trimmed.split('/').collect()
}

/// Ordered list of routes
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RoutePattern>,
}

impl RouteTable {
    pub fn new(routes: Vec<RoutePattern>) -> Self {
        Self { routes }
    }

    /// The site's route set
    pub fn standard() -> Self {
        use RouteKind::*;

        Self::new(vec![
            RoutePattern::new("/", Home { view: "home.html" }),
            RoutePattern::new("/allposts", Overflow { view: "allposts.html" }),
            RoutePattern::new(
                "/about",
                Record {
                    partition: Partition::Static,
                    slug: SlugSource::Fixed("about"),
                    view: "about.html",
                },
            ),
            RoutePattern::new(
                "/contact",
                Record {
                    partition: Partition::Static,
                    slug: SlugSource::Fixed("contact"),
                    view: "contact.html",
                },
            ),
            RoutePattern::new(
                "/projects",
                Record {
                    partition: Partition::Static,
                    slug: SlugSource::Fixed("projects"),
                    view: "projects.html",
                },
            ),
            RoutePattern::new(
                "/start-here",
                Record {
                    partition: Partition::Pillar,
                    slug: SlugSource::Featured,
                    view: "pillar.html",
                },
            ),
            RoutePattern::new("/api/posts", ApiCollection),
            RoutePattern::new(
                "/api/:slug",
                ApiRecord {
                    partition: Partition::General,
                },
            ),
            RoutePattern::new(
                "/:slug",
                Record {
                    partition: Partition::General,
                    slug: SlugSource::Param,
                    view: "post.html",
                },
            ),
        ])
    }

    /// First route, in declaration order, that matches `path`
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|route| route.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_matches_home_only() {
        let table = RouteTable::standard();
        let m = table.resolve("/").unwrap();
        assert_eq!(m.route.path, "/");
        assert_eq!(m.param, None);
    }

    #[test]
    fn test_fixed_routes_win_over_slug_param() {
        let table = RouteTable::standard();
        let m = table.resolve("/about").unwrap();
        assert_eq!(m.route.path, "/about");
        assert_eq!(m.slug("start-here"), Some("about"));

        let m = table.resolve("/allposts").unwrap();
        assert_eq!(m.route.kind, RouteKind::Overflow { view: "allposts.html" });
    }

    #[test]
    fn test_api_posts_declared_before_api_slug() {
        let table = RouteTable::standard();
        assert_eq!(
            table.resolve("/api/posts").unwrap().route.kind,
            RouteKind::ApiCollection
        );

        let m = table.resolve("/api/learn-go").unwrap();
        assert!(m.route.kind.is_api());
        assert_eq!(m.slug("start-here"), Some("learn-go"));
    }

    #[test]
    fn test_declaration_order_decides() {
        let table = RouteTable::new(vec![
            RoutePattern::new(
                "/:slug",
                RouteKind::Record {
                    partition: Partition::General,
                    slug: SlugSource::Param,
                    view: "post.html",
                },
            ),
            RoutePattern::new("/allposts", RouteKind::Overflow { view: "allposts.html" }),
        ]);
        let m = table.resolve("/allposts").unwrap();
        assert_eq!(m.route.path, "/:slug");
        assert_eq!(m.slug("start-here"), Some("allposts"));
    }

    #[test]
    fn test_slug_route_and_trailing_slash() {
        let table = RouteTable::standard();
        let m = table.resolve("/python-basics/").unwrap();
        assert_eq!(m.route.path, "/:slug");
        assert_eq!(m.slug("start-here"), Some("python-basics"));
    }

    #[test]
    fn test_start_here_serves_featured_record() {
        let table = RouteTable::standard();
        let m = table.resolve("/start-here").unwrap();
        assert_eq!(m.slug("rust-path"), Some("rust-path"));
        assert_eq!(m.slug("start-here"), Some("start-here"));

        // featured never leaks into other record routes
        let m = table.resolve("/about").unwrap();
        assert_eq!(m.slug("rust-path"), Some("about"));
        let m = table.resolve("/learn-go").unwrap();
        assert_eq!(m.slug("rust-path"), Some("learn-go"));
    }

    #[test]
    fn test_unmatched_paths() {
        let table = RouteTable::standard();
        assert!(table.resolve("/a/b/c").is_none());
        assert!(table.resolve("/blog/post").is_none());
        assert!(table.resolve("//").is_none());
    }
}
