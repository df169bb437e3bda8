// ────────────────────────────────
// src/proxy/proxy.rs
// Single-origin reverse proxy handle owned by one backend
// ────────────────────────────────

use hyper::client::HttpConnector;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION, HOST};
use hyper::{Body, Client, Request, Response, StatusCode, Uri, Version};
use hyper_tls::HttpsConnector;
use std::net::SocketAddr;
use url::{Position, Url};

const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Forwards requests to one fixed origin, streaming the upstream response back.
pub struct ReverseProxy {
    target: Url,
    authority: String,
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl ReverseProxy {
    pub fn new(target: Url) -> Self {
        let authority = target[Position::BeforeHost..Position::AfterPort].to_string();
        let client = Client::builder().build::<_, Body>(HttpsConnector::new());

        Self {
            target,
            authority,
            client,
        }
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub async fn forward(
        &self,
        req: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>, ProxyError> {
        let outbound = self.rewrite_request(req, client_addr)?;
        let mut response = self.client.request(outbound).await?;
        strip_hop_by_hop(response.headers_mut());
        Ok(response)
    }

    fn rewrite_request(
        &self,
        req: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Request<Body>, ProxyError> {
        let (mut parts, body) = req.into_parts();

        let path = join_paths(self.target.path(), parts.uri.path());
        let path_and_query = match merge_queries(self.target.query(), parts.uri.query()) {
            Some(query) => format!("{path}?{query}"),
            None => path,
        };
        parts.uri = Uri::builder()
            .scheme(self.target.scheme())
            .authority(self.authority.as_str())
            .path_and_query(path_and_query)
            .build()?;
        parts.version = Version::HTTP_11;

        strip_hop_by_hop(&mut parts.headers);
        parts
            .headers
            .insert(HOST, HeaderValue::from_str(&self.authority)?);
        if let Some(peer) = client_addr {
            append_forwarded_for(&mut parts.headers, peer);
        }

        Ok(Request::from_parts(parts, body))
    }
}

/// Joins with exactly one slash between the two halves.
pub(crate) fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

pub(crate) fn merge_queries(target: Option<&str>, request: Option<&str>) -> Option<String> {
    match (target.filter(|q| !q.is_empty()), request.filter(|q| !q.is_empty())) {
        (Some(t), Some(r)) => Some(format!("{t}&{r}")),
        (Some(q), None) | (None, Some(q)) => Some(q.to_string()),
        (None, None) => None,
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, peer: SocketAddr) {
    let ip = peer.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{prior}, {ip}"),
        None => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(HeaderName::from_static(X_FORWARDED_FOR), value);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("No healthy backends available")]
    NoHealthyBackends,

    #[error("Upstream error: {0}")]
    Upstream(#[from] hyper::Error),

    #[error("Invalid upstream request: {0}")]
    InvalidRequest(#[from] hyper::http::Error),
}

impl From<hyper::header::InvalidHeaderValue> for ProxyError {
    fn from(err: hyper::header::InvalidHeaderValue) -> Self {
        ProxyError::InvalidRequest(err.into())
    }
}

// Convert ProxyError to Hyper Response for error handling
impl From<ProxyError> for Response<Body> {
    fn from(err: ProxyError) -> Self {
        let (status, message) = match err {
            ProxyError::NoHealthyBackends => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service not available")
            }
            ProxyError::Upstream(_) | ProxyError::InvalidRequest(_) => {
                (StatusCode::BAD_GATEWAY, "Bad gateway")
            }
        };

        let mut response = Response::new(Body::from(message));
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", "/"), "/");
        assert_eq!(join_paths("/", "/users"), "/users");
        assert_eq!(join_paths("/api", "/users"), "/api/users");
        assert_eq!(join_paths("/api/", "/users"), "/api/users");
        assert_eq!(join_paths("/api/breeds/list/all", "/"), "/api/breeds/list/all/");
        assert_eq!(join_paths("/api", "users"), "/api/users");
    }

    #[test]
    fn test_merge_queries() {
        assert_eq!(merge_queries(None, None), None);
        assert_eq!(merge_queries(Some(""), None), None);
        assert_eq!(merge_queries(Some("a=1"), None).as_deref(), Some("a=1"));
        assert_eq!(merge_queries(None, Some("b=2")).as_deref(), Some("b=2"));
        assert_eq!(
            merge_queries(Some("a=1"), Some("b=2")).as_deref(),
            Some("a=1&b=2")
        );
    }

    #[test]
    fn test_rewrite_targets_backend_origin() {
        let proxy = ReverseProxy::new(Url::parse("http://10.0.0.5:8080/base?key=k").unwrap());
        let req = Request::builder()
            .method("POST")
            .uri("http://lb.local/items?page=2")
            .header(HOST, "lb.local")
            .header(CONNECTION, "close, x-private")
            .header("x-private", "secret")
            .header("keep-alive", "timeout=5")
            .header("x-custom", "kept")
            .header("x-forwarded-for", "192.0.2.1")
            .body(Body::empty())
            .unwrap();
        let peer: SocketAddr = "198.51.100.7:40000".parse().unwrap();

        let out = proxy.rewrite_request(req, Some(peer)).unwrap();

        assert_eq!(out.method(), "POST");
        assert_eq!(
            out.uri().to_string(),
            "http://10.0.0.5:8080/base/items?key=k&page=2"
        );
        assert_eq!(out.headers()[HOST], "10.0.0.5:8080");
        assert_eq!(out.headers()["x-custom"], "kept");
        assert_eq!(out.headers()["x-forwarded-for"], "192.0.2.1, 198.51.100.7");
        assert!(out.headers().get(CONNECTION).is_none());
        assert!(out.headers().get("keep-alive").is_none());
        assert!(out.headers().get("x-private").is_none());
    }

    #[test]
    fn test_default_port_omitted_from_host() {
        let proxy = ReverseProxy::new(Url::parse("https://example.com").unwrap());
        let req = Request::get("/").body(Body::empty()).unwrap();

        let out = proxy.rewrite_request(req, None).unwrap();

        assert_eq!(out.uri().to_string(), "https://example.com/");
        assert_eq!(out.headers()[HOST], "example.com");
        assert!(out.headers().get("x-forwarded-for").is_none());
    }

    #[test]
    fn test_error_statuses() {
        let unavailable: Response<Body> = ProxyError::NoHealthyBackends.into();
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);

        let http_err = Uri::builder().scheme("bad scheme").build().unwrap_err();
        let bad_gateway: Response<Body> = ProxyError::InvalidRequest(http_err).into();
        assert_eq!(bad_gateway.status(), StatusCode::BAD_GATEWAY);
    }
}
