//! Interception engine
//!
//! Holds the active rule snapshot and turns an outgoing request URL into
//! either a synthetic response or "not mine, use the network". Both the
//! fetch-style and XHR-style seams, as well as the proxy handler, go through
//! [`InterceptionEngine::resolve`].

use crate::hits::RuleHit;
use crate::normalize::UrlNormalizer;
use crate::pattern::{CompiledPattern, MatchOutcome};
use crate::response::{self, ResponseSpec, SyntheticResponse};
use crate::rule::{Rule, RuleInput, RuleMatcher};
use crate::scheduler::Scheduler;
use crate::variant;
use crate::xhr::{XhrInterceptor, XhrTransport};
use std::sync::{Arc, Mutex, RwLock, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A rule together with its pre-compiled pattern
#[derive(Debug, Clone)]
struct ActiveRule {
    rule: Rule,
    /// `None` when the pattern is empty after sanitizing.
    pattern: Option<CompiledPattern>,
}

impl ActiveRule {
    fn new(rule: Rule, normalizer: &UrlNormalizer) -> Self {
        let pattern = CompiledPattern::compile(&rule.pattern, rule.matcher.match_type(), normalizer);
        Self { rule, pattern }
    }

    fn matches(&self, target: &str) -> MatchOutcome {
        if !self.rule.is_active() {
            return MatchOutcome::miss();
        }
        match &self.pattern {
            Some(pattern) => pattern.matches(self.rule.matcher.match_type(), target),
            None => MatchOutcome::miss(),
        }
    }
}

/// Outcome of a matched request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub rule_id: String,
    /// Normalized request URL
    pub url: String,
    pub response: SyntheticResponse,
}

/// The interception engine
pub struct InterceptionEngine {
    normalizer: UrlNormalizer,
    rules: RwLock<Arc<Vec<ActiveRule>>>,
    hit_sender: Option<mpsc::Sender<RuleHit>>,
    xhr_patch: Mutex<Weak<XhrInterceptor>>,
}

impl InterceptionEngine {
    /// Create an engine resolving relative URLs against `base_href`.
    pub fn new(base_href: &str) -> Self {
        Self {
            normalizer: UrlNormalizer::new(base_href),
            rules: RwLock::new(Arc::new(Vec::new())),
            hit_sender: None,
            xhr_patch: Mutex::new(Weak::new()),
        }
    }

    pub fn with_hit_sender(mut self, sender: mpsc::Sender<RuleHit>) -> Self {
        self.hit_sender = Some(sender);
        self
    }

    pub fn normalizer(&self) -> &UrlNormalizer {
        &self.normalizer
    }

    /// Replace the whole rule set with rules coming from the rule store.
    ///
    /// Accepts `RuleInput` or `Option<RuleInput>` items; `None` entries are
    /// dropped.
    pub fn update_rules<I>(&self, rules: I)
    where
        I: IntoIterator,
        I::Item: Into<Option<RuleInput>>,
    {
        let rules: Vec<Rule> = rules
            .into_iter()
            .filter_map(|item| -> Option<RuleInput> { item.into() })
            .map(Rule::from)
            .collect();
        self.replace_rules(rules);
    }

    /// Replace the whole rule set with already-validated rules.
    pub fn replace_rules(&self, rules: Vec<Rule>) {
        let active: Vec<ActiveRule> = rules
            .into_iter()
            .map(|rule| {
                if let RuleMatcher::Unrecognized { raw } = &rule.matcher {
                    warn!("Rule [{}] has unrecognized match type {:?}, it will never match", rule.id, raw);
                }
                ActiveRule::new(rule, &self.normalizer)
            })
            .collect();

        info!("Installing {} mock rules", active.len());
        *self.rules.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(active);
    }

    /// Apply the master switch to every active rule.
    pub fn set_global_enabled(&self, enabled: bool) {
        let rules = self
            .rules()
            .into_iter()
            .map(|mut rule| {
                rule.global_enabled = enabled;
                rule
            })
            .collect();
        self.replace_rules(rules);
    }

    /// Copy of the active rules, in evaluation order.
    pub fn rules(&self) -> Vec<Rule> {
        self.snapshot().iter().map(|active| active.rule.clone()).collect()
    }

    fn snapshot(&self) -> Arc<Vec<ActiveRule>> {
        self.rules
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// First matching rule for `url` and its captures. Emits nothing.
    pub fn find_match(&self, url: &str) -> Option<(Rule, Vec<String>)> {
        let target = self.normalizer.normalize(url);
        self.snapshot().iter().find_map(|active| {
            let outcome = active.matches(&target);
            outcome.ok.then(|| (active.rule.clone(), outcome.captures))
        })
    }

    /// Resolve a request URL to a synthetic response.
    ///
    /// Returns `None` when no rule matches; the caller must then use the real
    /// network. A match emits a [`RuleHit`].
    pub fn resolve(&self, url: &str) -> Option<Resolution> {
        let target = self.normalizer.normalize(url);
        let rules = self.snapshot();
        let active = rules.iter().find(|active| active.matches(&target).ok)?;
        let rule = &active.rule;

        debug!("Rule [{}] matched {}", rule.id, target);
        self.notify_hit(&rule.id, &target);

        let spec = active
            .pattern
            .as_ref()
            .and_then(|pattern| variant::select_compiled(rule, pattern, &target))
            .unwrap_or_else(|| ResponseSpec::from(&rule.response));

        Some(Resolution {
            rule_id: rule.id.clone(),
            response: response::build(&spec, &target),
            url: target,
        })
    }

    fn notify_hit(&self, rule_id: &str, url: &str) {
        let Some(sender) = &self.hit_sender else {
            return;
        };
        let hit = RuleHit {
            rule_id: rule_id.to_string(),
            url: url.to_string(),
        };
        if let Err(e) = sender.try_send(hit) {
            warn!("Failed to deliver hit for rule [{}]: {}", rule_id, e);
        }
    }

    /// Install the XHR interceptor on top of `transport`.
    ///
    /// While an interceptor returned by a previous call is alive, this is a
    /// no-op that returns the existing interceptor; `transport` and
    /// `scheduler` are then dropped.
    pub fn patch_xhr(
        self: &Arc<Self>,
        transport: Arc<dyn XhrTransport>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Arc<XhrInterceptor> {
        let mut slot = self
            .xhr_patch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = slot.upgrade() {
            debug!("XHR interceptor already installed, skipping");
            return existing;
        }

        let interceptor = Arc::new(XhrInterceptor::new(self.clone(), transport, scheduler));
        *slot = Arc::downgrade(&interceptor);
        interceptor
    }
}
