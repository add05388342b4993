//! Mock rule definitions
//!
//! Rules arrive from the outside world as loosely-typed [`RuleInput`] values
//! (camelCase JSON, every field optional) and are validated once into
//! [`Rule`], whose match mode is a closed enum. Only wildcard rules own
//! variants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the response body is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    #[default]
    Text,
    Json,
}

impl BodyType {
    /// Anything other than `json` is served as text.
    pub fn parse(value: &str) -> Self {
        if value == "json" {
            BodyType::Json
        } else {
            BodyType::Text
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            BodyType::Json => "application/json",
            BodyType::Text => "text/plain",
        }
    }
}

/// Match mode tag, as written by rule authors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Substring,
    Exact,
    Wildcard,
}

impl MatchType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "substring" => Some(MatchType::Substring),
            "exact" => Some(MatchType::Exact),
            "wildcard" => Some(MatchType::Wildcard),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Substring => "substring",
            MatchType::Exact => "exact",
            MatchType::Wildcard => "wildcard",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire format of a variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VariantInput {
    pub key: String,
    pub body_type: Option<String>,
    pub status_code: Option<u16>,
    pub body: Option<String>,
}

/// Wire format of a rule, as delivered by the rule store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleInput {
    pub id: String,
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub match_type: Option<String>,
    pub enabled: Option<bool>,
    pub global_enabled: Option<bool>,
    pub body_type: Option<String>,
    pub status_code: Option<u16>,
    pub status_text: Option<String>,
    pub body: Option<String>,
    pub variants: Option<Vec<VariantInput>>,
}

impl RuleInput {
    /// Parse a JSON rule list. `null` entries are kept as `None` and dropped
    /// later by [`InterceptionEngine::update_rules`](crate::InterceptionEngine::update_rules).
    pub fn list_from_json(json: &str) -> crate::Result<Vec<Option<RuleInput>>> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Response fields shared by rules and variants
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTemplate {
    pub body_type: BodyType,
    pub status_code: u16,
    pub status_text: String,
    pub body: String,
}

/// A capture-keyed override of a wildcard rule's response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub key: String,
    pub body_type: BodyType,
    /// Zero means "use the rule's status code".
    pub status_code: u16,
    pub body: String,
}

impl From<VariantInput> for Variant {
    fn from(input: VariantInput) -> Self {
        Self {
            key: input.key,
            body_type: input.body_type.as_deref().map(BodyType::parse).unwrap_or_default(),
            status_code: input.status_code.unwrap_or(0),
            body: input.body.unwrap_or_default(),
        }
    }
}

/// Match mode with the data each mode needs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "matchType", rename_all = "lowercase")]
pub enum RuleMatcher {
    Substring,
    Exact,
    Wildcard { variants: Vec<Variant> },
    /// Unknown tag from the rule store. Never matches.
    Unrecognized { raw: String },
}

impl RuleMatcher {
    pub fn match_type(&self) -> Option<MatchType> {
        match self {
            RuleMatcher::Substring => Some(MatchType::Substring),
            RuleMatcher::Exact => Some(MatchType::Exact),
            RuleMatcher::Wildcard { .. } => Some(MatchType::Wildcard),
            RuleMatcher::Unrecognized { .. } => None,
        }
    }
}

/// Validated rule, owned by the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: Option<String>,
    pub pattern: String,
    #[serde(flatten)]
    pub matcher: RuleMatcher,
    pub enabled: bool,
    pub global_enabled: bool,
    pub response: ResponseTemplate,
}

impl Rule {
    /// Convenience constructor for an enabled rule with a text body.
    pub fn new(id: impl Into<String>, pattern: impl Into<String>, matcher: RuleMatcher) -> Self {
        Self {
            id: id.into(),
            name: None,
            pattern: pattern.into(),
            matcher,
            enabled: true,
            global_enabled: true,
            response: ResponseTemplate {
                body_type: BodyType::Text,
                status_code: 200,
                status_text: String::new(),
                body: String::new(),
            },
        }
    }

    pub fn with_body(mut self, body_type: BodyType, body: impl Into<String>) -> Self {
        self.response.body_type = body_type;
        self.response.body = body.into();
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.response.status_code = status_code;
        self
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.global_enabled
    }

    pub fn variants(&self) -> &[Variant] {
        match &self.matcher {
            RuleMatcher::Wildcard { variants } => variants,
            _ => &[],
        }
    }
}

impl From<RuleInput> for Rule {
    fn from(input: RuleInput) -> Self {
        let raw_type = input.match_type.unwrap_or_else(|| "substring".to_string());
        let matcher = match MatchType::parse(&raw_type) {
            Some(MatchType::Substring) => RuleMatcher::Substring,
            Some(MatchType::Exact) => RuleMatcher::Exact,
            Some(MatchType::Wildcard) => RuleMatcher::Wildcard {
                variants: input
                    .variants
                    .unwrap_or_default()
                    .into_iter()
                    .map(Variant::from)
                    .collect(),
            },
            None => RuleMatcher::Unrecognized { raw: raw_type },
        };

        Self {
            id: input.id,
            name: input.name,
            pattern: input.pattern.unwrap_or_default(),
            matcher,
            enabled: input.enabled != Some(false),
            global_enabled: input.global_enabled != Some(false),
            response: ResponseTemplate {
                body_type: input.body_type.as_deref().map(BodyType::parse).unwrap_or_default(),
                status_code: input.status_code.unwrap_or(200),
                status_text: input.status_text.unwrap_or_default(),
                body: input.body.unwrap_or_default(),
            },
        }
    }
}
