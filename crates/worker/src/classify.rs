//! Request classification.
//!
//! Every GET is assigned exactly one routing class; first match wins:
//!
//! 1. image destination, or host on the image CDN allow-list → `Image`
//! 2. path equals or ends with a static manifest entry → `Static`
//! 3. path starts with an API prefix → `Api`
//! 4. document destination → `Document`
//! 5. anything else → `Other`
//!
//! Image is checked before Static so an image that also appears in the
//! manifest still gets the long-TTL image policy.

use offcache_core::{AppConfig, CacheRequest, Destination, RoutingClass};
use url::Url;

/// Pure request → routing class function over the deployment's manifests.
#[derive(Debug, Clone)]
pub struct Classifier {
    static_assets: Vec<String>,
    api_prefixes: Vec<String>,
    image_hosts: Vec<String>,
}

impl Classifier {
    pub fn new(static_assets: Vec<String>, api_prefixes: Vec<String>, image_hosts: Vec<String>) -> Self {
        let image_hosts = image_hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect();
        Self { static_assets, api_prefixes, image_hosts }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.static_assets.clone(), config.api_prefixes.clone(), config.image_hosts.clone())
    }

    /// Routing class for a request, or None when the request bypasses the
    /// cache entirely (anything but GET).
    pub fn classify(&self, request: &CacheRequest) -> Option<RoutingClass> {
        if !request.is_get() {
            return None;
        }
        Some(self.class_of(request.destination, &request.url))
    }

    fn class_of(&self, destination: Destination, url: &Url) -> RoutingClass {
        let path = url.path();

        if destination == Destination::Image || url.host_str().is_some_and(|host| self.is_image_host(host)) {
            return RoutingClass::Image;
        }

        if self
            .static_assets
            .iter()
            .any(|asset| path == asset || path.ends_with(asset.as_str()))
        {
            return RoutingClass::Static;
        }

        if self.api_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return RoutingClass::Api;
        }

        if destination == Destination::Document {
            return RoutingClass::Document;
        }

        RoutingClass::Other
    }

    fn is_image_host(&self, host: &str) -> bool {
        self.image_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    fn classifier() -> Classifier {
        Classifier::from_config(&AppConfig::default())
    }

    fn get(url: &str, destination: Destination) -> CacheRequest {
        CacheRequest::get(url, destination).unwrap()
    }

    #[test]
    fn test_non_get_bypasses() {
        let url = Url::parse("http://127.0.0.1:8080/api/foo").unwrap();
        let request = CacheRequest::new(Method::POST, url, Destination::Empty);
        assert_eq!(classifier().classify(&request), None);
    }

    #[test]
    fn test_image_destination() {
        let request = get("http://127.0.0.1:8080/img/saturn.png", Destination::Image);
        assert_eq!(classifier().classify(&request), Some(RoutingClass::Image));
    }

    #[test]
    fn test_image_cdn_host() {
        let request = get("https://images.unsplash.com/photo.jpg", Destination::Empty);
        assert_eq!(classifier().classify(&request), Some(RoutingClass::Image));

        let request = get("https://IMAGES.unsplash.com/photo.jpg", Destination::Empty);
        assert_eq!(classifier().classify(&request), Some(RoutingClass::Image));
    }

    #[test]
    fn test_image_wins_over_static() {
        let request = get("http://127.0.0.1:8080/favicon.svg", Destination::Image);
        assert_eq!(classifier().classify(&request), Some(RoutingClass::Image));
    }

    #[test]
    fn test_static_exact_and_suffix() {
        let c = classifier();
        assert_eq!(
            c.classify(&get("http://127.0.0.1:8080/static/css/main.css", Destination::Style)),
            Some(RoutingClass::Static)
        );
        assert_eq!(
            c.classify(&get("http://127.0.0.1:8080/build/static/js/bundle.js", Destination::Script)),
            Some(RoutingClass::Static)
        );
        // "/" is in the manifest, so every trailing-slash path is static.
        assert_eq!(c.classify(&get("http://127.0.0.1:8080/blog/", Destination::Document)), Some(RoutingClass::Static));
    }

    #[test]
    fn test_static_beats_document() {
        let request = get("http://127.0.0.1:8080/calculator", Destination::Document);
        assert_eq!(classifier().classify(&request), Some(RoutingClass::Static));
    }

    #[test]
    fn test_api_prefix() {
        let c = classifier();
        assert_eq!(c.classify(&get("http://127.0.0.1:8080/api/foo", Destination::Empty)), Some(RoutingClass::Api));
        assert_eq!(
            c.classify(&get("http://127.0.0.1:8080/api/foo", Destination::Document)),
            Some(RoutingClass::Api)
        );
    }

    #[test]
    fn test_document() {
        let request = get("http://127.0.0.1:8080/blog/saturn-return-explained", Destination::Document);
        assert_eq!(classifier().classify(&request), Some(RoutingClass::Document));
    }

    #[test]
    fn test_other() {
        let request = get("http://127.0.0.1:8080/assets/index-abc123.js", Destination::Script);
        assert_eq!(classifier().classify(&request), Some(RoutingClass::Other));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let c = classifier();
        let requests = [
            get("https://images.unsplash.com/photo.jpg", Destination::Image),
            get("http://127.0.0.1:8080/favicon.ico", Destination::Empty),
            get("http://127.0.0.1:8080/api/returns?year=2026", Destination::Empty),
            get("http://127.0.0.1:8080/blog/post", Destination::Document),
            get("http://127.0.0.1:8080/manifest.json", Destination::Other),
        ];
        for request in &requests {
            let first = c.classify(request);
            for _ in 0..10 {
                assert_eq!(c.classify(request), first);
            }
        }
    }
}
