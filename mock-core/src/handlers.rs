use crate::admin::Metrics;
use crate::engine::InterceptionEngine;
use crate::response::SyntheticResponse;
use hudsucker::{
    hyper::{
        ext::ReasonPhrase,
        header::{HeaderName, HeaderValue},
        Body, Method, Request, Response, StatusCode,
    },
    HttpContext, HttpHandler, RequestOrResponse,
};
use std::sync::{atomic::Ordering, Arc};
use tracing::{debug, info, warn};

impl From<SyntheticResponse> for Response<Body> {
    fn from(synthetic: SyntheticResponse) -> Self {
        let SyntheticResponse {
            status,
            status_text,
            headers,
            body,
            ..
        } = synthetic;

        let mut response = Response::new(Body::from(body));
        let code = StatusCode::from_u16(status).unwrap_or_else(|_| {
            warn!("Status code {} is not representable, answering 200", status);
            StatusCode::OK
        });
        *response.status_mut() = code;

        // HTTP/1 clients only see a non-canonical reason through this extension.
        if code.canonical_reason() != Some(status_text.as_str()) {
            match ReasonPhrase::try_from(status_text) {
                Ok(reason) => {
                    response.extensions_mut().insert(reason);
                }
                Err(e) => warn!("Dropping invalid reason phrase for {}: {:?}", code, e),
            }
        }

        for (name, value) in headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().insert(name, value);
                }
                _ => warn!("Dropping invalid mock header {:?}", name),
            }
        }
        response
    }
}

/// Proxy handler answering matched requests from the mock rules
#[derive(Clone)]
pub struct MockHandler {
    engine: Arc<InterceptionEngine>,
    metrics: Arc<Metrics>,
}

impl MockHandler {
    pub fn new(engine: Arc<InterceptionEngine>, metrics: Arc<Metrics>) -> Self {
        Self { engine, metrics }
    }

    /// Decide between a synthetic response and forwarding upstream.
    pub fn route(&self, req: Request<Body>) -> RequestOrResponse {
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        // Tunnel setup is never mocked; hudsucker hands us the decrypted requests later.
        if req.method() == Method::CONNECT {
            return RequestOrResponse::Request(req);
        }

        let uri = req.uri().to_string();
        match self.engine.resolve(&uri) {
            Some(resolution) => {
                self.metrics.intercepted_requests.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Mocked [{}] {} {} -> {} {}",
                    resolution.rule_id,
                    req.method(),
                    resolution.url,
                    resolution.response.status,
                    resolution.response.status_text
                );
                RequestOrResponse::Response(resolution.response.into())
            }
            None => {
                self.metrics.passed_through_requests.fetch_add(1, Ordering::Relaxed);
                debug!("Passing through {} {}", req.method(), uri);
                RequestOrResponse::Request(req)
            }
        }
    }
}

#[async_trait::async_trait]
impl HttpHandler for MockHandler {
    async fn handle_request(
        &mut self,
        _ctx: &HttpContext,
        req: Request<Body>,
    ) -> RequestOrResponse {
        self.route(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{BodyType, Rule, RuleMatcher};
    use hudsucker::hyper::body::to_bytes;

    fn handler() -> (MockHandler, Arc<Metrics>) {
        let engine = InterceptionEngine::new("http://localhost/");
        engine.replace_rules(vec![Rule::new(
            "users",
            "https://api.example.com/users",
            RuleMatcher::Exact,
        )
        .with_status(404)
        .with_body(BodyType::Json, r#"{"error": "gone"}"#)]);
        let metrics = Arc::new(Metrics::default());
        (MockHandler::new(Arc::new(engine), metrics.clone()), metrics)
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_matched_request_gets_synthetic_response() {
        let (handler, metrics) = handler();
        let outcome = handler.route(request(Method::GET, "https://api.example.com/users"));

        let RequestOrResponse::Response(response) = outcome else {
            panic!("expected a synthetic response");
        };
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["content-type"], "application/json");
        let body = to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], br#"{"error":"gone"}"#);
        assert_eq!(metrics.intercepted_requests.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_unmatched_request_passes_through_untouched() {
        let (handler, metrics) = handler();
        let outcome = handler.route(request(Method::POST, "https://api.example.com/orders"));

        let RequestOrResponse::Request(req) = outcome else {
            panic!("expected pass-through");
        };
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.uri(), "https://api.example.com/orders");
        assert_eq!(metrics.passed_through_requests.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_connect_is_never_mocked() {
        let (handler, _) = handler();
        let outcome = handler.route(request(Method::CONNECT, "api.example.com:443"));
        assert!(matches!(outcome, RequestOrResponse::Request(_)));
    }

    fn synthetic(status: u16, status_text: &str) -> SyntheticResponse {
        SyntheticResponse {
            status,
            status_text: status_text.to_string(),
            headers: Vec::new(),
            body: String::new(),
            url: "u".to_string(),
        }
    }

    fn reason(response: &Response<Body>) -> Option<&[u8]> {
        response.extensions().get::<ReasonPhrase>().map(|r| r.as_bytes())
    }

    #[test]
    fn test_status_text_reaches_the_wire() {
        let custom: Response<Body> = synthetic(200, "All Good").into();
        assert_eq!(reason(&custom), Some(&b"All Good"[..]));

        let unknown: Response<Body> = synthetic(999, "OK").into();
        assert_eq!(unknown.status().as_u16(), 999);
        assert_eq!(reason(&unknown), Some(&b"OK"[..]));

        let canonical: Response<Body> = synthetic(404, "Not Found").into();
        assert_eq!(reason(&canonical), None);

        let invalid: Response<Body> = synthetic(200, "bad\nreason").into();
        assert_eq!(invalid.status(), StatusCode::OK);
        assert_eq!(reason(&invalid), None);
    }

    #[test]
    fn test_out_of_range_status_falls_back_to_ok() {
        let response: Response<Body> = SyntheticResponse {
            status: 42,
            status_text: "OK".to_string(),
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: String::new(),
            url: "u".to_string(),
        }
        .into();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
