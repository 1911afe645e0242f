use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, OnceLock};
use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use shared::protocol::{DISCOVERY_BASE_PATH, SPEC_CACHE_CONTROL, SPEC_CONTENT_TYPE};
use crate::api::replacer::UrlReplacer;
use crate::discoverer::PublishedSpecs;

/// Routes under this prefix belong to the status API.
const RESERVED_PREFIX: &str = "/v1/";

/// Serves discovered specs over HTTP.
///
/// Registration happens once. The route set and each route's body are taken
/// from the published set at the time of the first call; specs published
/// afterwards are not served until restart.
pub struct DiscoverRoutes {
    replacer: Arc<UrlReplacer>,
    registered: OnceLock<Registered>,
}

struct Registered {
    router: Router,
    routes: Vec<String>,
}

/// Route for a publish path: separators normalized, base path stripped.
pub fn route_for(publish_path: &str) -> String {
    let path = publish_path.replace('\\', "/");
    let route = path.strip_prefix(DISCOVERY_BASE_PATH).unwrap_or(&path);

    if route.starts_with('/') {
        route.to_string()
    } else {
        format!("/{}", route)
    }
}

impl DiscoverRoutes {
    pub fn new(
        rewrite_urls: &BTreeMap<String, String>,
        site_url: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            replacer: Arc::new(UrlReplacer::from_config(rewrite_urls, site_url)?),
            registered: OnceLock::new(),
        })
    }

    /// Routes registered so far; empty until the first `register` call.
    pub fn routes(&self) -> &[String] {
        self.registered.get().map(|r| r.routes.as_slice()).unwrap_or(&[])
    }

    /// Registers a GET route per published spec on the first call and
    /// returns that same router on every later call.
    pub fn register(&self, specs: &PublishedSpecs) -> Router {
        self.registered.get_or_init(|| self.build(specs)).router.clone()
    }

    fn build(&self, specs: &PublishedSpecs) -> Registered {
        tracing::info!("Registering route specifications");

        let mut router = Router::new();
        let mut seen = HashSet::new();
        let mut routes = Vec::new();

        for (path, data) in specs.iter() {
            let route = route_for(path);
            tracing::debug!("  - {}", path);
            tracing::debug!("    = URL : {}", route);

            if route.starts_with(RESERVED_PREFIX) {
                tracing::warn!("route {} is reserved for the status API, skipping {}", route, path);
                continue;
            }
            if !seen.insert(route.clone()) {
                tracing::warn!("route {} already registered, skipping {}", route, path);
                continue;
            }

            let data: Arc<[u8]> = Arc::from(data.as_slice());
            let replacer = Arc::clone(&self.replacer);
            let served = route.clone();
            router = router.route(
                &route,
                get(move || {
                    let data = Arc::clone(&data);
                    let replacer = Arc::clone(&replacer);
                    let served = served.clone();
                    async move { serve_spec(&served, &data, &replacer) }
                }),
            );
            routes.push(route);
        }

        Registered { router, routes }
    }
}

fn serve_spec(route: &str, data: &[u8], replacer: &UrlReplacer) -> impl IntoResponse {
    tracing::debug!("Serve discovered spec {}", route);

    let body = replacer.replace(&String::from_utf8_lossy(data));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, SPEC_CONTENT_TYPE),
            (header::CACHE_CONTROL, SPEC_CACHE_CONTROL),
        ],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn published(entries: &[(&str, &str)]) -> PublishedSpecs {
        PublishedSpecs::new(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                .collect(),
        )
    }

    async fn get_route(router: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_route_for() {
        assert_eq!(route_for("discover/specs/petstore.svc"), "/specs/petstore.svc");
        assert_eq!(route_for("discover\\specs\\petstore.svc"), "/specs/petstore.svc");
        assert_eq!(route_for("/srv/specs/petstore.svc"), "/srv/specs/petstore.svc");
        assert_eq!(route_for("apis/petstore.svc"), "/apis/petstore.svc");
    }

    #[tokio::test]
    async fn test_serves_spec_with_headers_and_rewrites() {
        let rewrites = BTreeMap::from([("http://petstore.internal".to_string(), String::new())]);
        let routes = DiscoverRoutes::new(&rewrites, "https://developer.example.com").unwrap();
        let body = r#"{"host":"http://petstore.internal/v1"}"#;
        let specs = published(&[("discover/specs/petstore.svc", body)]);

        let router = routes.register(&specs);
        let (status, headers, body) = get_route(router, "/specs/petstore.svc").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=259200");
        assert_eq!(body, r#"{"host":"https://developer.example.com/v1"}"#);
    }

    #[tokio::test]
    async fn test_registration_happens_once() {
        let routes = DiscoverRoutes::new(&BTreeMap::new(), "").unwrap();
        assert!(routes.routes().is_empty());

        let first = published(&[("discover/specs/a.svc", "{\"v\":1}")]);
        routes.register(&first);
        assert_eq!(routes.routes(), ["/specs/a.svc".to_string()]);

        let second = published(&[
            ("discover/specs/a.svc", "{\"v\":2}"),
            ("discover/specs/b.svc", "{}"),
        ]);
        let router = routes.register(&second);
        assert_eq!(routes.routes(), ["/specs/a.svc".to_string()]);

        let (status, _, _) = get_route(router.clone(), "/specs/b.svc").await;
        assert_eq!(status, StatusCode::NOT_FOUND, "specs published later are not served");

        let (_, _, body) = get_route(router, "/specs/a.svc").await;
        assert_eq!(body, "{\"v\":1}", "bodies are frozen at registration");
    }

    #[tokio::test]
    async fn test_colliding_routes_registered_once() {
        let routes = DiscoverRoutes::new(&BTreeMap::new(), "").unwrap();
        let specs = published(&[
            ("discover/specs/a.svc", "{\"from\":1}"),
            ("/specs/a.svc", "{\"from\":2}"),
        ]);

        let router = routes.register(&specs);
        assert_eq!(routes.routes().len(), 1);

        let (status, _, body) = get_route(router, "/specs/a.svc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "{\"from\":2}");
    }

    #[tokio::test]
    async fn test_status_api_routes_are_not_shadowed() {
        let routes = DiscoverRoutes::new(&BTreeMap::new(), "").unwrap();
        let specs = published(&[
            ("discover/v1/specs", "{}"),
            ("discover/specs/a.svc", "{}"),
        ]);

        let spec_routes = routes.register(&specs);
        assert_eq!(routes.routes(), ["/specs/a.svc".to_string()]);

        let status = Router::new().route("/v1/specs", get(|| async { "status" }));
        let (code, _, body) = get_route(status.merge(spec_routes), "/v1/specs").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, "status");
    }

    #[tokio::test]
    async fn test_concurrent_registration_builds_once() {
        let routes = Arc::new(DiscoverRoutes::new(&BTreeMap::new(), "").unwrap());
        let specs = Arc::new(published(&[("discover/specs/a.svc", "{}")]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let routes = Arc::clone(&routes);
                let specs = Arc::clone(&specs);
                std::thread::spawn(move || {
                    routes.register(&specs);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(routes.routes(), ["/specs/a.svc".to_string()]);
    }
}
