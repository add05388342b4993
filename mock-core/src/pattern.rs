//! URL pattern matching
//!
//! Three modes are supported:
//! - `substring`: the target contains the pattern, either as typed or resolved
//!   against the base URL
//! - `exact`: normalized target and normalized pattern are equal
//! - `wildcard`: every `*` matches one or more characters and is captured

use crate::normalize::UrlNormalizer;
use crate::rule::{MatchType, Rule};
use regex::Regex;
use tracing::debug;

const QUOTES: [char; 3] = ['`', '"', '\''];

/// Result of matching a URL against a rule
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchOutcome {
    pub ok: bool,
    /// Wildcard captures, left to right. Empty for the other modes.
    pub captures: Vec<String>,
}

impl MatchOutcome {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn hit(captures: Vec<String>) -> Self {
        Self { ok: true, captures }
    }
}

/// Trim the pattern and strip one surrounding pair of quotes or backticks.
pub fn sanitize_pattern(pattern: &str) -> &str {
    let trimmed = pattern.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && QUOTES.contains(&first) => {
            trimmed[first.len_utf8()..trimmed.len() - last.len_utf8()].trim()
        }
        _ => trimmed,
    }
}

/// Translate a wildcard pattern into a regex with one lazy capture per `*`.
///
/// Patterns that look absolute (contain `://`) must cover the whole target.
pub fn wildcard_regex(pattern: &str, anchored: bool) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("(.+?)");
    let source = if anchored {
        format!("^{}$", body)
    } else {
        body
    };

    match Regex::new(&source) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!("Wildcard pattern {:?} did not compile: {}", pattern, e);
            None
        }
    }
}

fn captures_of(re: &Regex, target: &str) -> Option<Vec<String>> {
    re.captures(target).map(|caps| {
        caps.iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect()
    })
}

/// A rule pattern prepared for repeated matching.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    raw: String,
    absolute: String,
    wildcard: Option<WildcardRegexes>,
}

#[derive(Debug, Clone)]
struct WildcardRegexes {
    absolute: Option<Regex>,
    raw: Option<Regex>,
}

impl CompiledPattern {
    /// Returns `None` for patterns that are empty after sanitizing; those never
    /// match anything.
    pub fn compile(
        pattern: &str,
        match_type: Option<MatchType>,
        normalizer: &UrlNormalizer,
    ) -> Option<Self> {
        let raw = sanitize_pattern(pattern);
        if raw.is_empty() {
            return None;
        }
        let absolute = normalizer.normalize(raw);

        let wildcard = (match_type == Some(MatchType::Wildcard)).then(|| {
            let anchored = raw.contains("://");
            WildcardRegexes {
                absolute: wildcard_regex(&absolute, anchored),
                raw: wildcard_regex(raw, anchored),
            }
        });

        Some(Self {
            raw: raw.to_string(),
            absolute,
            wildcard,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn absolute(&self) -> &str {
        &self.absolute
    }

    /// Match an already-normalized target URL.
    pub fn matches(&self, match_type: Option<MatchType>, target: &str) -> MatchOutcome {
        match match_type {
            Some(MatchType::Exact) if target == self.absolute => MatchOutcome::hit(Vec::new()),
            Some(MatchType::Substring)
                if target.contains(self.raw.as_str()) || target.contains(self.absolute.as_str()) =>
            {
                MatchOutcome::hit(Vec::new())
            }
            Some(MatchType::Wildcard) => match self.captures(target) {
                Some(captures) => MatchOutcome::hit(captures),
                None => MatchOutcome::miss(),
            },
            _ => MatchOutcome::miss(),
        }
    }

    /// Wildcard captures for `target`: the absolute form is tried first, then
    /// the pattern as typed.
    pub fn captures(&self, target: &str) -> Option<Vec<String>> {
        let wildcard = self.wildcard.as_ref()?;
        wildcard
            .absolute
            .as_ref()
            .and_then(|re| captures_of(re, target))
            .or_else(|| wildcard.raw.as_ref().and_then(|re| captures_of(re, target)))
    }
}

/// Match `target_url` against `rule` from scratch.
pub fn matches(target_url: &str, rule: &Rule, normalizer: &UrlNormalizer) -> MatchOutcome {
    if !rule.is_active() {
        return MatchOutcome::miss();
    }
    let match_type = rule.matcher.match_type();
    match CompiledPattern::compile(&rule.pattern, match_type, normalizer) {
        Some(pattern) => pattern.matches(match_type, &normalizer.normalize(target_url)),
        None => MatchOutcome::miss(),
    }
}
