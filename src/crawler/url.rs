//! URL canonicalization and same-site link scoping
//!
//! Pages are stored by path only, so every URL of a site is reduced to its
//! path component. Links leave a page only if they stay inside the site: same
//! host (ignoring a `www.` prefix), under the site's root path, and free of
//! query strings and fragments.

use std::collections::HashSet;
use url::Url;

use crate::utils::bare_host;

/// Path under which a page of a site is stored
///
/// Scheme, host, query and fragment are dropped; the site root maps to `/`.
///
/// # Examples
///
/// ```
/// use sitesearch::crawler::url::page_path;
/// use url::Url;
///
/// let url = Url::parse("https://www.example.com/catalog/phones?page=2#top").unwrap();
/// assert_eq!(page_path(&url), "/catalog/phones");
///
/// let root = Url::parse("https://example.com").unwrap();
/// assert_eq!(page_path(&root), "/");
/// ```
pub fn page_path(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Boundaries of one configured site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteScope {
    root: Url,
    host: String,
    root_dir: String,
}

impl SiteScope {
    /// Create the scope of a site root URL
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed URLs, and
    /// `url::ParseError::EmptyHost` for URLs without a host.
    pub fn new(root: &str) -> Result<Self, url::ParseError> {
        let root = Url::parse(root)?;
        let host = root
            .host_str()
            .map(|h| bare_host(&h.to_lowercase()).to_string())
            .ok_or(url::ParseError::EmptyHost)?;

        let mut root_dir = page_path(&root);
        if !root_dir.ends_with('/') {
            root_dir.push('/');
        }

        Ok(Self {
            root,
            host,
            root_dir,
        })
    }

    /// Root URL of the site
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Check whether a URL belongs to this site
    pub fn contains(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        let same_host = url
            .host_str()
            .is_some_and(|h| bare_host(&h.to_lowercase()) == self.host);
        // explicit ports must agree; default ports of either scheme are equivalent
        if !same_host || url.port() != self.root.port() {
            return false;
        }

        let path = page_path(url);
        path.starts_with(&self.root_dir) || format!("{path}/") == self.root_dir
    }

    /// Check whether a URL names the site root itself
    pub fn is_root(&self, url: &Url) -> bool {
        self.contains(url)
            && page_path(url).trim_end_matches('/') == self.root_dir.trim_end_matches('/')
    }

    /// Select the links of a page that the crawl should follow
    ///
    /// Keeps in-site links without query or fragment, drops links back to the
    /// page itself, and removes duplicates while keeping document order.
    pub fn follow_links(&self, page_url: &Url, links: &[Url]) -> Vec<Url> {
        let own_path = page_path(page_url);
        let mut seen = HashSet::new();

        links
            .iter()
            .filter(|link| link.query().is_none() && link.fragment().is_none())
            .filter(|link| self.contains(link))
            .filter(|link| {
                let path = page_path(link);
                path != own_path && seen.insert(path)
            })
            .cloned()
            .collect()
    }
}
