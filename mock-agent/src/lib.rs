//! Mock Agent
//!
//! Standalone executable that serves mocked HTTP responses through a MITM
//! proxy. Rules come from a JSON file that is reloaded when it changes.

use clap::Parser;
use mock_core::{CertificateAuthority, HitCounter, InterceptionEngine, MockConfig, MockProxy};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub mod logging;
pub mod rules_file;

use rules_file::RulesFile;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON config file; command line flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to listen on for HTTP/HTTPS traffic [default: 127.0.0.1]
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// Port to listen on for HTTP/HTTPS traffic [default: 8080]
    #[arg(long)]
    pub listen_port: Option<u16>,

    /// Port to expose the Admin API (health/metrics/rules/hits) [default: 9091]
    #[arg(long)]
    pub admin_port: Option<u16>,

    /// Base URL relative patterns resolve against [default: http://localhost/]
    #[arg(long)]
    pub base_href: Option<String>,

    /// Directory holding mock-ca.pem and mock-ca.key [default: ./certs]
    #[arg(long)]
    pub ca_dir: Option<PathBuf>,

    /// JSON file with the rule list
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// How often to check the rules file for changes; 0 disables reloading
    #[arg(long, default_value_t = 1000)]
    pub reload_interval_ms: u64,

    /// Start with every rule switched off
    #[arg(long)]
    pub disabled: bool,

    /// Log level or filter directives; RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

/// Merge the config file (if any) with command line overrides.
pub fn build_config(args: &Args) -> mock_core::Result<MockConfig> {
    let mut config = match &args.config {
        Some(path) => MockConfig::from_file(path)?,
        None => MockConfig::default(),
    };

    if let Some(addr) = &args.listen_addr {
        config.listen_address = addr.clone();
    }
    if let Some(port) = args.listen_port {
        config.listen_port = port;
    }
    if let Some(port) = args.admin_port {
        config.admin_port = port;
    }
    if let Some(base_href) = &args.base_href {
        config.base_href = base_href.clone();
    }
    if let Some(ca_dir) = &args.ca_dir {
        config.ca_dir = ca_dir.clone();
    }
    Ok(config)
}

pub async fn run_agent(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Logging should be initialized by the caller (main or test)
    let config = build_config(&args)?;

    tracing::info!("Starting Mock Agent...");
    tracing::info!("  Listen: {}:{}", config.listen_address, config.listen_port);
    tracing::info!("  Admin:  127.0.0.1:{}", config.admin_port);
    tracing::info!("  Base:   {}", config.base_href);

    // channel for rule hits
    let (tx, rx) = mpsc::channel(config.hit_channel_capacity.max(1));
    let hits = HitCounter::new();
    hits.spawn_collector(rx);

    let engine = Arc::new(InterceptionEngine::new(&config.base_href).with_hit_sender(tx));

    match &args.rules {
        Some(path) => {
            let mut rules_file = RulesFile::new(path, !args.disabled);
            engine.update_rules(rules_file.load()?);

            if args.reload_interval_ms > 0 {
                rules_file.spawn_watcher(engine.clone(), Duration::from_millis(args.reload_interval_ms));
            }
        }
        None => tracing::warn!("No rules file given, all traffic passes through"),
    }
    if args.disabled {
        tracing::info!("Mocking is globally disabled");
    }

    let ca = CertificateAuthority::load_or_generate(&config.ca_dir)?;
    let (cert_path, _) = CertificateAuthority::paths(&config.ca_dir);
    tracing::info!("Trust {} to mock HTTPS traffic", cert_path.display());

    let proxy = MockProxy::new(config, ca, engine).with_hit_counter(hits);

    tracing::info!("Starting mock proxy...");
    proxy
        .run(std::future::pending::<()>())
        .await
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
}
