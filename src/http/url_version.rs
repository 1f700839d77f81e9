//! API version segment insertion
//!
//! Outgoing paths are written without a version (`/api/widgets/5`). The
//! [`UrlVersionResolver`] inserts the version the target namespace is pinned
//! to, or the global latest version, right after the `api` segment:
//!
//! ```text
//! /api/widgets/5   --(widgets pinned to v2)-->   /api/v2/widgets/5
//! /api/reports     --(not pinned, latest v3)-->  /api/v3/reports
//! ```
//!
//! Resolution is a pure function of the path and the namespace table.
//! Applying it to its own output inserts a second version segment; the
//! pipeline therefore resolves each request exactly once and the 401 replay
//! reuses the already-resolved URL.

use serde::{Deserialize, Serialize};

/// Maps a URL path segment to the API version it requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceEntry {
    /// Path segment identifying the namespace
    pub namespace: String,
    /// Pinned version; `None` means "use the global latest"
    #[serde(default)]
    pub version: Option<String>,
}

impl NamespaceEntry {
    /// Creates an entry.
    pub fn new(namespace: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            namespace: namespace.into(),
            version: version.map(str::to_string),
        }
    }
}

/// Rewrites request paths to carry an API version segment.
///
/// # Examples
///
/// ```
/// use tollgate::http::url_version::{NamespaceEntry, UrlVersionResolver};
///
/// let resolver = UrlVersionResolver::new(
///     vec![NamespaceEntry::new("widgets", Some("v2"))],
///     "v3",
/// );
/// assert_eq!(resolver.resolve("/api/widgets"), "/api/v2/widgets");
/// assert_eq!(resolver.resolve("/api/gadgets"), "/api/v3/gadgets");
/// ```
#[derive(Debug, Clone)]
pub struct UrlVersionResolver {
    namespaces: Vec<NamespaceEntry>,
    latest_version: String,
}

impl UrlVersionResolver {
    /// Creates a resolver over `namespaces` (searched in order).
    pub fn new(namespaces: Vec<NamespaceEntry>, latest_version: impl Into<String>) -> Self {
        Self {
            namespaces,
            latest_version: latest_version.into(),
        }
    }

    /// Global latest version.
    pub fn latest_version(&self) -> &str {
        &self.latest_version
    }

    /// Returns the version that `resolve` would insert for `url`.
    pub fn version_for(&self, url: &str) -> &str {
        let (path, _) = split_suffix(url);
        let segments: Vec<&str> = path.split('/').collect();
        self.select_version(&segments)
    }

    fn select_version(&self, segments: &[&str]) -> &str {
        let pinned = self
            .namespaces
            .iter()
            .find(|entry| segments.contains(&entry.namespace.as_str()))
            .and_then(|entry| entry.version.as_deref());

        match pinned {
            Some(version) if version != self.latest_version => version,
            _ => &self.latest_version,
        }
    }

    /// Inserts the version segment into `url`.
    ///
    /// The first namespace entry (table order) that appears as a whole path
    /// segment decides the version. The segment is inserted after the first
    /// `api` segment, or at the front when the path has none. Duplicate
    /// slashes are collapsed; the `://` of an absolute URL and any query
    /// string or fragment are preserved.
    pub fn resolve(&self, url: &str) -> String {
        let (path, suffix) = split_suffix(url);
        let mut segments: Vec<&str> = path.split('/').collect();
        let version = self.select_version(&segments);

        let index = segments
            .iter()
            .position(|segment| *segment == "api")
            .map_or(0, |i| i + 1);
        segments.insert(index, version);

        format!("{}{}", collapse_slashes(&segments.join("/")), suffix)
    }
}

/// Splits `url` at the first `?` or `#`.
fn split_suffix(url: &str) -> (&str, &str) {
    match url.find(|c: char| c == '?' || c == '#') {
        Some(i) => url.split_at(i),
        None => (url, ""),
    }
}

fn collapse_slashes(path: &str) -> String {
    let (prefix, rest) = match path.find("://") {
        Some(i) if path[..i].chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) => {
            path.split_at(i + 3)
        }
        _ => ("", path),
    };

    let mut out = String::with_capacity(path.len());
    out.push_str(prefix);
    let mut previous_slash = false;
    for c in rest.chars() {
        if c == '/' && previous_slash {
            continue;
        }
        previous_slash = c == '/';
        out.push(c);
    }
    out
}
