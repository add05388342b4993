//! Variant selection for wildcard rules
//!
//! A variant's key is the `|`-joined list of wildcard captures. The captures
//! are recomputed here rather than threaded through from the original match.

use crate::normalize::UrlNormalizer;
use crate::pattern::CompiledPattern;
use crate::response::ResponseSpec;
use crate::rule::{Rule, RuleMatcher, Variant};

/// Join captures into a variant key.
pub fn variant_key(captures: &[String]) -> String {
    captures.join("|")
}

/// Response spec for the variant matching `captures`, if any.
pub fn find_variant(rule: &Rule, captures: &[String]) -> Option<ResponseSpec> {
    let key = variant_key(captures);
    rule.variants()
        .iter()
        .find(|variant| variant.key == key)
        .map(|variant| variant_spec(rule, variant))
}

fn variant_spec(rule: &Rule, variant: &Variant) -> ResponseSpec {
    let status_code = if variant.status_code == 0 {
        rule.response.status_code
    } else {
        variant.status_code
    };

    ResponseSpec {
        body_type: variant.body_type,
        status_code: Some(status_code),
        status_text: None,
        body: Some(variant.body.clone()),
    }
}

/// Select the best-fit variant of a wildcard rule for an already matched URL.
///
/// Returns `None` for non-wildcard rules and when no variant key equals the
/// captures; the caller then falls back to the rule's own response.
pub fn select_variant(
    rule: &Rule,
    target_url: &str,
    normalizer: &UrlNormalizer,
) -> Option<ResponseSpec> {
    if !matches!(rule.matcher, RuleMatcher::Wildcard { .. }) {
        return None;
    }
    let pattern = CompiledPattern::compile(&rule.pattern, rule.matcher.match_type(), normalizer)?;
    select_compiled(rule, &pattern, &normalizer.normalize(target_url))
}

/// Variant selection with a pre-compiled pattern and a normalized target.
pub(crate) fn select_compiled(
    rule: &Rule,
    pattern: &CompiledPattern,
    target: &str,
) -> Option<ResponseSpec> {
    if rule.variants().is_empty() {
        return None;
    }
    let captures = pattern.captures(target)?;
    find_variant(rule, &captures)
}
