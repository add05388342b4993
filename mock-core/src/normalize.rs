//! URL normalization
//!
//! Every URL the engine compares is first resolved against the document base,
//! so `/v1/users`, `users` and `https://host/v1/users` all end up in the same
//! absolute form.

use tracing::debug;
use url::Url;

/// Resolves URL-like input against a fixed base.
#[derive(Debug, Clone)]
pub struct UrlNormalizer {
    base: Option<Url>,
}

impl UrlNormalizer {
    /// Create a normalizer for the given base href.
    ///
    /// An unparseable base is tolerated: absolute inputs still normalize,
    /// relative ones are returned unchanged.
    pub fn new(base_href: &str) -> Self {
        let base = match Url::parse(base_href) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!("Base href {:?} is not a valid URL: {}", base_href, e);
                None
            }
        };
        Self { base }
    }

    pub fn base_href(&self) -> Option<&str> {
        self.base.as_ref().map(Url::as_str)
    }

    /// Resolve `input` to an absolute URL string.
    ///
    /// Never fails: input that cannot be resolved comes back unchanged.
    pub fn normalize(&self, input: &str) -> String {
        let resolved = match &self.base {
            Some(base) => base.join(input),
            None => Url::parse(input),
        };

        match resolved {
            Ok(url) => url.into(),
            Err(_) => input.to_string(),
        }
    }

    /// Same as [`normalize`](Self::normalize), with a missing input treated as
    /// the empty string.
    pub fn normalize_opt(&self, input: Option<&str>) -> String {
        self.normalize(input.unwrap_or_default())
    }
}

/// One-shot helper around [`UrlNormalizer`].
pub fn normalize_url(input: Option<&str>, base_href: &str) -> String {
    UrlNormalizer::new(base_href).normalize_opt(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://app.example.com/dashboard/index.html?tab=1#top";

    #[test]
    fn test_relative_paths_resolve_against_base() {
        let n = UrlNormalizer::new(BASE);
        assert_eq!(n.normalize("/v1/users"), "https://app.example.com/v1/users");
        assert_eq!(n.normalize("users"), "https://app.example.com/dashboard/users");
        assert_eq!(n.normalize("?page=2"), "https://app.example.com/dashboard/index.html?page=2");
        assert_eq!(n.normalize("//cdn.example.com/a.js"), "https://cdn.example.com/a.js");
    }

    #[test]
    fn test_absolute_urls_are_canonicalized() {
        let n = UrlNormalizer::new(BASE);
        assert_eq!(n.normalize("HTTPS://API.Example.com"), "https://api.example.com/");
        assert_eq!(
            n.normalize("https://api.example.com/a/../b?x=1"),
            "https://api.example.com/b?x=1"
        );
    }

    #[test]
    fn test_missing_input_resolves_to_base_document() {
        let n = UrlNormalizer::new(BASE);
        assert_eq!(n.normalize_opt(None), "https://app.example.com/dashboard/index.html?tab=1");
    }

    #[test]
    fn test_unresolvable_input_is_returned_unchanged() {
        let n = UrlNormalizer::new(BASE);
        assert_eq!(n.normalize("http://[::1"), "http://[::1");

        let no_base = UrlNormalizer::new("not a url");
        assert_eq!(no_base.base_href(), None);
        assert_eq!(no_base.normalize("/relative"), "/relative");
        assert_eq!(no_base.normalize("https://example.com"), "https://example.com/");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let n = UrlNormalizer::new(BASE);
        for input in ["/a/b", "../x?y=1#z", "https://h.com/%7Euser", "", "http://[::1", "*"] {
            let once = n.normalize(input);
            assert_eq!(n.normalize(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_normalize_url_helper() {
        assert_eq!(
            normalize_url(Some("/api"), "http://localhost:3000/"),
            "http://localhost:3000/api"
        );
        assert_eq!(normalize_url(None, "http://localhost:3000/app"), "http://localhost:3000/app");
    }
}
