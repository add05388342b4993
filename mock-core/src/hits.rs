//! Rule hit notifications and per-origin hit counting

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Emitted once per intercepted-and-matched call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleHit {
    pub rule_id: String,
    pub url: String,
}

/// Hit statistics for one rule on one origin
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitRecord {
    pub count: u64,
    pub last_url: Option<String>,
    pub last_at: Option<DateTime<Utc>>,
}

/// Counts rule hits grouped by the origin of the intercepted URL.
#[derive(Debug, Clone, Default)]
pub struct HitCounter {
    by_origin: Arc<DashMap<String, HashMap<String, HitRecord>>>,
}

/// Origin key of a URL; URLs that do not parse are grouped under themselves.
pub fn origin_of(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => url.to_string(),
    }
}

impl HitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, hit: &RuleHit) {
        if hit.rule_id.is_empty() {
            debug!("Ignoring hit without rule id for {}", hit.url);
            return;
        }
        let mut rules = self.by_origin.entry(origin_of(&hit.url)).or_default();
        let record = rules.entry(hit.rule_id.clone()).or_insert(HitRecord {
            count: 0,
            last_url: None,
            last_at: None,
        });
        record.count += 1;
        record.last_url = Some(hit.url.clone());
        record.last_at = Some(Utc::now());
    }

    /// Hits recorded for one origin, keyed by rule id.
    pub fn hits_for(&self, origin: &str) -> HashMap<String, HitRecord> {
        self.by_origin
            .get(origin)
            .map(|rules| rules.clone())
            .unwrap_or_default()
    }

    /// Whether any rule fired on the origin.
    pub fn has_hits(&self, origin: &str) -> bool {
        self.by_origin
            .get(origin)
            .map(|rules| rules.values().any(|record| record.count > 0))
            .unwrap_or(false)
    }

    pub fn clear(&self, origin: &str) {
        self.by_origin.insert(origin.to_string(), HashMap::new());
    }

    pub fn snapshot(&self) -> HashMap<String, HashMap<String, HitRecord>> {
        self.by_origin
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Consume hit notifications until every sender is dropped.
    pub fn spawn_collector(&self, mut rx: mpsc::Receiver<RuleHit>) -> JoinHandle<()> {
        let counter = self.clone();
        tokio::spawn(async move {
            while let Some(hit) = rx.recv().await {
                info!("Rule [{}] hit {}", hit.rule_id, hit.url);
                counter.record(&hit);
            }
            debug!("Hit channel closed, collector exiting");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(rule_id: &str, url: &str) -> RuleHit {
        RuleHit {
            rule_id: rule_id.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_hits_grouped_by_origin_and_rule() {
        let counter = HitCounter::new();
        counter.record(&hit("a", "https://api.example.com/users/1"));
        counter.record(&hit("a", "https://api.example.com/users/2"));
        counter.record(&hit("b", "https://api.example.com/orders"));
        counter.record(&hit("a", "http://localhost:3000/users/1"));

        let api = counter.hits_for("https://api.example.com");
        assert_eq!(api["a"].count, 2);
        assert_eq!(api["a"].last_url.as_deref(), Some("https://api.example.com/users/2"));
        assert!(api["a"].last_at.is_some());
        assert_eq!(api["b"].count, 1);

        assert_eq!(counter.hits_for("http://localhost:3000")["a"].count, 1);
        assert_eq!(counter.snapshot().len(), 2);
    }

    #[test]
    fn test_clear_resets_one_origin() {
        let counter = HitCounter::new();
        counter.record(&hit("a", "https://one.test/x"));
        counter.record(&hit("a", "https://two.test/x"));

        counter.clear("https://one.test");
        assert!(!counter.has_hits("https://one.test"));
        assert!(counter.has_hits("https://two.test"));
    }

    #[test]
    fn test_hits_without_rule_id_are_ignored() {
        let counter = HitCounter::new();
        counter.record(&hit("", "https://one.test/x"));
        assert!(counter.snapshot().is_empty());
    }

    #[test]
    fn test_origin_of() {
        assert_eq!(origin_of("https://a.test:8443/x?y"), "https://a.test:8443");
        assert_eq!(origin_of("http://a.test:80/"), "http://a.test");
        assert_eq!(origin_of("not a url"), "not a url");
    }

    #[tokio::test]
    async fn test_collector_drains_channel() {
        let counter = HitCounter::new();
        let (tx, rx) = mpsc::channel(8);
        let handle = counter.spawn_collector(rx);

        tx.send(hit("a", "https://a.test/1")).await.unwrap();
        tx.send(hit("a", "https://a.test/2")).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(counter.hits_for("https://a.test")["a"].count, 2);
    }
}
