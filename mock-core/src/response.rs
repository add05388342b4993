//! Synthetic response construction

use crate::rule::{BodyType, ResponseTemplate};
use serde::Serialize;
use tracing::debug;

/// Fields needed to fabricate a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSpec {
    pub body_type: BodyType,
    pub status_code: Option<u16>,
    pub status_text: Option<String>,
    pub body: Option<String>,
}

impl From<&ResponseTemplate> for ResponseSpec {
    fn from(template: &ResponseTemplate) -> Self {
        Self {
            body_type: template.body_type,
            status_code: Some(template.status_code),
            status_text: Some(template.status_text.clone()),
            body: Some(template.body.clone()),
        }
    }
}

/// A fabricated network response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// URL the response claims to come from
    pub url: String,
}

impl SyntheticResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }
}

/// Reason phrase used when a rule does not provide one.
pub fn status_text(status_code: u16) -> &'static str {
    match status_code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Serialize the body according to its declared type.
///
/// JSON bodies are parsed and written back out; anything that fails to parse
/// is served verbatim.
pub fn render_body(body_type: BodyType, body: Option<&str>) -> String {
    let raw = body.unwrap_or_default();
    match body_type {
        BodyType::Text => raw.to_string(),
        BodyType::Json => match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => value.to_string(),
            Err(e) => {
                debug!("JSON body did not parse ({}), serving it as text", e);
                raw.to_string()
            }
        },
    }
}

/// Build the synthetic response for `spec`.
pub fn build(spec: &ResponseSpec, request_url: &str) -> SyntheticResponse {
    let status = spec.status_code.filter(|code| *code != 0).unwrap_or(200);
    let status_text = spec
        .status_text
        .as_deref()
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| status_text(status))
        .to_string();

    SyntheticResponse {
        status,
        status_text,
        headers: vec![(
            "Content-Type".to_string(),
            spec.body_type.content_type().to_string(),
        )],
        body: render_body(spec.body_type, spec.body.as_deref()),
        url: request_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(body_type: BodyType, body: &str) -> ResponseSpec {
        ResponseSpec {
            body_type,
            status_code: None,
            status_text: None,
            body: Some(body.to_string()),
        }
    }

    #[test]
    fn test_json_body_round_trips() {
        let response = build(&spec(BodyType::Json, r#"{ "a" : 1 }"#), "https://x.test/a");
        let parsed: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(parsed, serde_json::json!({ "a": 1 }));
        assert_eq!(response.body, r#"{"a":1}"#);
        assert_eq!(response.content_type(), Some("application/json"));
    }

    #[test]
    fn test_json_keeps_key_order() {
        let response = build(&spec(BodyType::Json, r#"{"z":1,"a":2}"#), "u");
        assert_eq!(response.body, r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn test_invalid_json_is_served_literally() {
        let response = build(&spec(BodyType::Json, "{a:"), "u");
        assert_eq!(response.body, "{a:");
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_text_body_is_untouched() {
        let response = build(&spec(BodyType::Text, r#"{ "a" : 1 }"#), "u");
        assert_eq!(response.body, r#"{ "a" : 1 }"#);
        assert_eq!(response.header("content-type"), Some("text/plain"));

        let empty = ResponseSpec {
            body: None,
            ..spec(BodyType::Text, "")
        };
        assert_eq!(build(&empty, "u").body, "");
    }

    #[test]
    fn test_status_defaults_and_reason_phrases() {
        let mut s = spec(BodyType::Text, "");
        assert_eq!(build(&s, "u").status, 200);

        s.status_code = Some(0);
        assert_eq!(build(&s, "u").status, 200);

        s.status_code = Some(404);
        assert_eq!(build(&s, "u").status_text, "Not Found");

        s.status_code = Some(999);
        let response = build(&s, "u");
        assert_eq!(response.status, 999);
        assert_eq!(response.status_text, "OK");

        s.status_text = Some("Teapot".to_string());
        assert_eq!(build(&s, "u").status_text, "Teapot");

        s.status_text = Some(String::new());
        assert_eq!(build(&s, "u").status_text, "OK");
    }

    #[test]
    fn test_response_carries_request_url() {
        let response = build(&spec(BodyType::Text, "x"), "https://x.test/a?b=1");
        assert_eq!(response.url, "https://x.test/a?b=1");
    }
}
