//! URL canonicalization for consistent request keys.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a request target against the origin it was sent to.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve against `base`; an absolute target replaces it wholesale
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str, base: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://127.0.0.1:8080/").unwrap()
    }

    #[test]
    fn test_canonicalize_path() {
        let url = canonicalize("/calculator", &origin()).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/calculator");
    }

    #[test]
    fn test_canonicalize_absolute_ignores_base() {
        let url = canonicalize("https://images.unsplash.com/photo.jpg", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("images.unsplash.com"));
        assert_eq!(url.path(), "/photo.jpg");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://EXAMPLE.COM/About", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/About");
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("/blog#latest", &origin()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/blog");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("/api/foo?b=2&a=1", &origin()).unwrap();
        assert_eq!(url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_canonicalize_url_in_query_stays_on_origin() {
        let url = canonicalize("/api/share?url=https://example.com/x", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("127.0.0.1"));
        assert_eq!(url.path(), "/api/share");
        assert_eq!(url.query(), Some("url=https://example.com/x"));
    }

    #[test]
    fn test_canonicalize_trim_whitespace() {
        let url = canonicalize("  /about  ", &origin()).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/about");
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd", &origin());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("", &origin()), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   ", &origin()), Err(UrlError::Empty)));
    }
}
