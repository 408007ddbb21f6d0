use crate::url::normalize_url;
use crate::UrlError;
use std::fmt;
use url::Url;

/// The normalized root URL of a configured site
///
/// A root defines the same-site boundary: only URLs with the same scheme,
/// host and port whose path lies at or below the root path belong to the
/// site. Page paths are stored relative to this root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRoot {
    url: Url,
    key: String,
}

impl SiteRoot {
    /// Parses and normalizes a configured site URL
    ///
    /// Any query string on the root is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use site_indexer::url::SiteRoot;
    ///
    /// let root = SiteRoot::parse("https://Example.com/").unwrap();
    /// assert_eq!(root.as_str(), "https://example.com");
    /// ```
    pub fn parse(url_str: &str) -> Result<Self, UrlError> {
        let mut url = normalize_url(url_str)?;
        url.set_query(None);

        let key = if url.path() == "/" {
            url.as_str().trim_end_matches('/').to_string()
        } else {
            url.as_str().to_string()
        };

        Ok(Self { url, key })
    }

    /// The stored form of the root: normalized, without a trailing slash
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The root as a URL, suitable as the first crawl target
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns true if `candidate` lies inside this site
    ///
    /// The path comparison respects segment boundaries, so a root of
    /// `https://a.test/docs` contains `/docs/intro` but not `/docs-old`.
    pub fn contains(&self, candidate: &Url) -> bool {
        if candidate.scheme() != self.url.scheme()
            || candidate.host_str() != self.url.host_str()
            || candidate.port_or_known_default() != self.url.port_or_known_default()
        {
            return false;
        }

        let root_path = self.url.path();
        if root_path == "/" {
            return true;
        }

        match candidate.path().strip_prefix(root_path) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Returns the path of `url` relative to this root, including any query
    ///
    /// The root itself maps to `/`.
    pub fn relative_path(&self, url: &Url) -> String {
        let root_path = self.url.path();
        let path = if root_path == "/" {
            url.path()
        } else {
            url.path().strip_prefix(root_path).unwrap_or(url.path())
        };

        let mut relative = if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        };

        if let Some(query) = url.query() {
            relative.push('?');
            relative.push_str(query);
        }

        relative
    }
}

impl fmt::Display for SiteRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
