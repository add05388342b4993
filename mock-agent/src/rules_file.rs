//! Rules loaded from a JSON file on disk
//!
//! The file holds the same list the rule store would deliver: an array of
//! rule objects, where `null` entries are ignored. The file is polled for
//! modification and every change replaces the engine's whole rule set.

use mock_core::{InterceptionEngine, Result, RuleInput};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Parse a rules list and stamp every rule with the master switch.
pub fn parse_rules(json: &str, global_enabled: bool) -> Result<Vec<Option<RuleInput>>> {
    let mut rules = RuleInput::list_from_json(json)?;
    for rule in rules.iter_mut().flatten() {
        rule.global_enabled = Some(global_enabled);
    }
    Ok(rules)
}

pub struct RulesFile {
    path: PathBuf,
    global_enabled: bool,
    modified: Option<SystemTime>,
}

impl RulesFile {
    pub fn new(path: impl Into<PathBuf>, global_enabled: bool) -> Self {
        Self {
            path: path.into(),
            global_enabled,
            modified: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file, remembering its modification time.
    pub fn load(&mut self) -> Result<Vec<Option<RuleInput>>> {
        let modified = fs::metadata(&self.path)?.modified().ok();
        let contents = fs::read_to_string(&self.path)?;
        let rules = parse_rules(&contents, self.global_enabled)?;
        self.modified = modified;

        info!("Loaded {} rules from {}", rules.len(), self.path.display());
        Ok(rules)
    }

    /// Reload only when the modification time moved since the last load.
    pub fn reload_if_changed(&mut self) -> Result<Option<Vec<Option<RuleInput>>>> {
        let modified = fs::metadata(&self.path)?.modified().ok();
        if modified.is_some() && modified == self.modified {
            return Ok(None);
        }
        self.load().map(Some)
    }

    /// Poll the file every `interval` and push changes into `engine`.
    ///
    /// A file that fails to read or parse keeps the previous rules installed.
    pub fn spawn_watcher(mut self, engine: Arc<InterceptionEngine>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            debug!("Watching {} every {:?}", self.path.display(), interval);

            loop {
                ticker.tick().await;
                match self.reload_if_changed() {
                    Ok(Some(rules)) => {
                        info!("Rules file {} changed, reloading", self.path.display());
                        engine.update_rules(rules);
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Failed to reload rules from {}: {}", self.path.display(), e),
                }
            }
        })
    }
}
