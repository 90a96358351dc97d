//! Allow-list of routes exempt from inactivity tracking.

use serde::{Deserialize, Serialize};

use crate::RouteClassifier;

/// Routes that never count toward inactivity: unauthenticated pages.
pub const DEFAULT_EXEMPT_ROUTES: [&str; 5] =
    ["/", "/login", "/signup", "/reset-password", "/reset-password/*"];

/// An explicit allow-list of exempt routes.
///
/// Entries are matched against the path with any query string or fragment
/// removed and a trailing slash ignored. An entry ending in `/*` matches
/// every path below that prefix (but not the prefix itself).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExemptRoutes {
    entries: Vec<String>,
}

impl Default for ExemptRoutes {
    fn default() -> Self {
        Self::new(DEFAULT_EXEMPT_ROUTES)
    }
}

impl ExemptRoutes {
    /// Builds an allow-list from route patterns.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// An allow-list that exempts nothing.
    pub fn none() -> Self {
        Self { entries: Vec::new() }
    }

    /// Adds one more pattern.
    pub fn with(mut self, entry: impl Into<String>) -> Self {
        self.entries.push(entry.into());
        self
    }

    /// The configured patterns, in insertion order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl RouteClassifier for ExemptRoutes {
    fn is_exempt(&self, path: &str) -> bool {
        let path = normalize(path);
        self.entries.iter().any(|entry| match entry.strip_suffix("/*") {
            Some(prefix) => {
                let prefix = normalize(prefix);
                path.len() > prefix.len()
                    && path.starts_with(prefix)
                    && (prefix == "/" || path.as_bytes()[prefix.len()] == b'/')
            }
            None => normalize(entry) == path,
        })
    }
}

/// Strips query/fragment and a trailing slash; the root stays `/`.
fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    match path.strip_suffix('/') {
        Some("") | None => {
            if path.is_empty() { "/" } else { path }
        }
        Some(trimmed) => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routes_exempt_public_pages() {
        let routes = ExemptRoutes::default();

        assert!(routes.is_exempt("/"));
        assert!(routes.is_exempt("/login"));
        assert!(routes.is_exempt("/login/"));
        assert!(routes.is_exempt("/signup?ref=mail"));
        assert!(routes.is_exempt("/reset-password/abc123"));
    }

    #[test]
    fn test_default_routes_track_application_pages() {
        let routes = ExemptRoutes::default();

        assert!(!routes.is_exempt("/tasks"));
        assert!(!routes.is_exempt("/projects/42/approvals"));
        assert!(!routes.is_exempt("/login-history"));
    }

    #[test]
    fn test_wildcard_does_not_match_sibling_prefix() {
        let routes = ExemptRoutes::new(["/public/*"]);

        assert!(routes.is_exempt("/public/terms"));
        assert!(!routes.is_exempt("/public"));
        assert!(!routes.is_exempt("/publications"));
    }

    #[test]
    fn test_none_exempts_nothing() {
        let routes = ExemptRoutes::none();

        assert!(!routes.is_exempt("/"));
        assert!(!routes.is_exempt("/login"));
    }

    #[test]
    fn test_with_appends_entry() {
        let routes = ExemptRoutes::none().with("/help");

        assert_eq!(routes.entries(), ["/help".to_string()]);
        assert!(routes.is_exempt("/help/"));
    }

    #[test]
    fn test_normalize_root_and_fragments() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("/#top"), "/");
        assert_eq!(normalize("/tasks/#list"), "/tasks");
    }

    #[test]
    fn test_routes_deserialize_from_plain_list() {
        let routes: ExemptRoutes =
            serde_json::from_str(r#"["/login", "/sso/*"]"#).expect("valid json");

        assert!(routes.is_exempt("/sso/callback"));
        assert!(!routes.is_exempt("/tasks"));
    }
}
