//! Mock Agent Binary Entry Point

use clap::Parser;
use mock_agent::{logging::init_logging, run_agent, Args};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_json)?;

    tokio::select! {
        result = run_agent(args) => {
            if let Err(e) = result {
                tracing::error!("Mock agent failed: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping mock agent...");
        }
    }

    Ok(())
}
