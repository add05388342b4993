//! Interception for request/response style HTTP calls
//!
//! [`InterceptedFetch`] wraps the original transport, captured once at
//! construction. Matched requests are answered from the engine without
//! touching the transport; everything else is handed to it untouched.

use crate::engine::InterceptionEngine;
use crate::response::SyntheticResponse;
use async_trait::async_trait;
use std::borrow::Cow;
use std::sync::Arc;

/// Anything that names the URL it is going to request
pub trait FetchTarget {
    fn target_url(&self) -> Cow<'_, str>;
}

impl FetchTarget for String {
    fn target_url(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl FetchTarget for &str {
    fn target_url(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl FetchTarget for url::Url {
    fn target_url(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl<B> FetchTarget for hudsucker::hyper::Request<B> {
    fn target_url(&self) -> Cow<'_, str> {
        Cow::Owned(self.uri().to_string())
    }
}

/// A request descriptor exposing its URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            ..Default::default()
        }
    }
}

impl FetchTarget for FetchRequest {
    fn target_url(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.url)
    }
}

/// Either a bare URL or a full request descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchInput {
    Url(String),
    Request(FetchRequest),
}

impl FetchTarget for FetchInput {
    fn target_url(&self) -> Cow<'_, str> {
        match self {
            FetchInput::Url(url) => Cow::Borrowed(url),
            FetchInput::Request(request) => request.target_url(),
        }
    }
}

impl From<&str> for FetchInput {
    fn from(url: &str) -> Self {
        FetchInput::Url(url.to_string())
    }
}

impl From<FetchRequest> for FetchInput {
    fn from(request: FetchRequest) -> Self {
        FetchInput::Request(request)
    }
}

/// An HTTP transport
#[async_trait]
pub trait Fetch: Send + Sync {
    type Request: FetchTarget + Send + 'static;
    type Response: From<SyntheticResponse> + Send;
    type Error: Send;

    async fn fetch(&self, request: Self::Request) -> Result<Self::Response, Self::Error>;
}

/// A transport with mock rules applied in front of it
pub struct InterceptedFetch<F> {
    engine: Arc<InterceptionEngine>,
    original: F,
}

impl<F: Fetch> InterceptedFetch<F> {
    pub fn new(engine: Arc<InterceptionEngine>, original: F) -> Self {
        Self { engine, original }
    }

    pub fn original(&self) -> &F {
        &self.original
    }

    /// Answer from the first matching rule, or delegate to the original
    /// transport and return its result as-is.
    pub async fn intercept(&self, request: F::Request) -> Result<F::Response, F::Error> {
        let url = request.target_url().into_owned();
        if let Some(resolution) = self.engine.resolve(&url) {
            return Ok(resolution.response.into());
        }
        self.original.fetch(request).await
    }
}

#[async_trait]
impl<F: Fetch> Fetch for InterceptedFetch<F> {
    type Request = F::Request;
    type Response = F::Response;
    type Error = F::Error;

    async fn fetch(&self, request: Self::Request) -> Result<Self::Response, Self::Error> {
        self.intercept(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_url_of_inputs() {
        assert_eq!(FetchInput::from("/a").target_url(), "/a");
        assert_eq!(FetchInput::from(FetchRequest::get("/b")).target_url(), "/b");
        assert_eq!("c".target_url(), "c");

        let url = url::Url::parse("https://x.test/d").unwrap();
        assert_eq!(url.target_url(), "https://x.test/d");

        let request = hudsucker::hyper::Request::builder()
            .uri("http://x.test/e?f=1")
            .body(())
            .unwrap();
        assert_eq!(request.target_url(), "http://x.test/e?f=1");
    }
}
