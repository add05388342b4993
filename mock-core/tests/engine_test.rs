use mock_core::normalize::normalize_url;
use mock_core::pattern::matches;
use mock_core::{InterceptionEngine, Rule, RuleInput, RuleMatcher, UrlNormalizer, VariantInput};
use proptest::prelude::*;

const BASE: &str = "https://app.example.com/dashboard/";

fn rule(id: &str, pattern: &str, match_type: &str) -> RuleInput {
    RuleInput {
        id: id.to_string(),
        pattern: Some(pattern.to_string()),
        match_type: Some(match_type.to_string()),
        ..Default::default()
    }
}

fn arb_match_type() -> impl Strategy<Value = RuleMatcher> {
    prop_oneof![
        Just(RuleMatcher::Substring),
        Just(RuleMatcher::Exact),
        Just(RuleMatcher::Wildcard { variants: Vec::new() }),
    ]
}

fn arb_url() -> impl Strategy<Value = String> {
    prop_oneof![
        "https?://[a-z]{1,10}\\.test(/[a-zA-Z0-9._*-]{0,12}){0,4}(\\?[a-z]{1,5}=[0-9]{1,3})?",
        "(/|\\./|\\.\\./)?[a-zA-Z0-9._-]{0,12}(/[a-zA-Z0-9._-]{0,12}){0,3}",
    ]
}

fn arb_blank_pattern() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[ \t\n]{1,4}",
        Just("''".to_string()),
        Just("\" \"".to_string()),
        Just("`  `".to_string()),
    ]
}

proptest! {
    #[test]
    fn prop_normalize_is_idempotent(url in arb_url()) {
        let once = normalize_url(Some(&url), BASE);
        prop_assert_eq!(normalize_url(Some(&once), BASE), once);
    }

    #[test]
    fn prop_inactive_rules_never_match(
        pattern in arb_url(),
        url in arb_url(),
        matcher in arb_match_type(),
        enabled in any::<bool>(),
    ) {
        let normalizer = UrlNormalizer::new(BASE);
        let mut rule = Rule::new("r", pattern, matcher);
        // Also covers a rule matched against its own pattern.
        let own = rule.pattern.clone();
        if enabled {
            rule.global_enabled = false;
        } else {
            rule.enabled = false;
        }
        prop_assert!(!matches(&url, &rule, &normalizer).ok);
        prop_assert!(!matches(&own, &rule, &normalizer).ok);
    }

    #[test]
    fn prop_blank_patterns_never_match(
        pattern in arb_blank_pattern(),
        url in arb_url(),
        matcher in arb_match_type(),
    ) {
        let normalizer = UrlNormalizer::new(BASE);
        let rule = Rule::new("r", pattern, matcher);
        prop_assert!(!matches(&url, &rule, &normalizer).ok);
        prop_assert!(!matches(BASE, &rule, &normalizer).ok);
    }
}

#[test]
fn test_exact_match_requires_identical_url() {
    let engine = InterceptionEngine::new(BASE);
    engine.update_rules(vec![rule("exact", "https://api.example.com/v1/users", "exact")]);

    assert!(engine.resolve("https://api.example.com/v1/users").is_some());
    assert!(engine.resolve("https://api.example.com/v1/users?x=1").is_none());
}

#[test]
fn test_substring_match_with_relative_and_absolute_patterns() {
    let engine = InterceptionEngine::new(BASE);
    engine.update_rules(vec![rule("relative", "/v1/users", "substring")]);
    assert!(engine.resolve("https://api.example.com/v1/users/42").is_some());

    engine.update_rules(vec![rule("absolute", "https://api.example.com/v1", "substring")]);
    assert!(engine.resolve("https://api.example.com/v1/users/42").is_some());
    assert!(engine.resolve("https://other.example.com/v1/users/42").is_none());
}

#[test]
fn test_wildcard_capture_selects_variant() {
    let engine = InterceptionEngine::new(BASE);
    let mut input = rule("users", "https://api.example.com/users/*", "wildcard");
    input.body = Some("base".to_string());
    input.variants = Some(vec![VariantInput {
        key: "42".to_string(),
        body_type: None,
        status_code: None,
        body: Some("forty-two".to_string()),
    }]);
    engine.update_rules(vec![input]);

    let (_, captures) = engine.find_match("https://api.example.com/users/42").unwrap();
    assert_eq!(captures, ["42"]);

    let resolution = engine.resolve("https://api.example.com/users/42").unwrap();
    assert_eq!(resolution.response.body, "forty-two");
    assert_eq!(resolution.response.status, 200);
}

#[test]
fn test_json_bodies_are_reserialized_or_kept_verbatim() {
    let engine = InterceptionEngine::new(BASE);
    let mut good = rule("good", "/good", "substring");
    good.body_type = Some("json".to_string());
    good.body = Some(r#"{"a":1}"#.to_string());
    let mut bad = rule("bad", "/bad", "substring");
    bad.body_type = Some("json".to_string());
    bad.body = Some("{a:".to_string());
    engine.update_rules(vec![good, bad]);

    let body = engine.resolve("/good").unwrap().response.body;
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed, serde_json::json!({"a": 1}));

    let bad = engine.resolve("/bad").unwrap().response;
    assert_eq!(bad.body, "{a:");
    assert_eq!(bad.status, 200);
}

#[test]
fn test_status_text_derivation() {
    let engine = InterceptionEngine::new(BASE);
    let mut missing = rule("missing", "/missing", "substring");
    missing.status_code = Some(404);
    let mut odd = rule("odd", "/odd", "substring");
    odd.status_code = Some(999);
    engine.update_rules(vec![missing, odd]);

    assert_eq!(engine.resolve("/missing").unwrap().response.status_text, "Not Found");
    assert_eq!(engine.resolve("/odd").unwrap().response.status_text, "OK");
}

#[test]
fn test_rule_order_decides_between_overlapping_rules() {
    let engine = InterceptionEngine::new(BASE);
    let mut first = rule("first", "/api/*", "wildcard");
    first.body = Some("1".to_string());
    let mut second = rule("second", "/api/items", "exact");
    second.body = Some("2".to_string());
    engine.update_rules(vec![first.clone(), second.clone()]);
    assert_eq!(engine.resolve("/api/items").unwrap().response.body, "1");

    engine.update_rules(vec![second, first]);
    assert_eq!(engine.resolve("/api/items").unwrap().response.body, "2");
}

#[test]
fn test_update_rules_forgets_removed_ids() {
    let engine = InterceptionEngine::new(BASE);
    engine.update_rules(vec![rule("a", "/a", "substring"), rule("b", "/b", "substring")]);
    assert_eq!(engine.resolve("/b").unwrap().rule_id, "b");

    engine.update_rules(vec![rule("a", "/a", "substring")]);
    assert!(engine.resolve("/b").is_none());
}

#[test]
fn test_rules_from_json_store() {
    let json = r#"[
        null,
        {"id": "w", "name": "Item", "pattern": " `/api/items/*` ", "matchType": "wildcard",
         "bodyType": "json", "body": "{}",
         "variants": [{"key": "7", "bodyType": "json", "statusCode": 404, "body": "{\"missing\": 7}"}]},
        {"id": "off", "pattern": "/api", "enabled": false}
    ]"#;
    let engine = InterceptionEngine::new(BASE);
    engine.update_rules(RuleInput::list_from_json(json).unwrap());
    assert_eq!(engine.rules().len(), 2);

    let found = engine.resolve("https://app.example.com/api/items/7").unwrap();
    assert_eq!(found.rule_id, "w");
    assert_eq!(found.response.status, 404);
    assert_eq!(found.response.status_text, "Not Found");
    assert_eq!(found.response.body, r#"{"missing":7}"#);

    let other = engine.resolve("/api/items/8").unwrap();
    assert_eq!(other.response.body, "{}");
}
