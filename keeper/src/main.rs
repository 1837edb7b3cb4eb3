//! Ollama Model Keeper Entry Point

use ollama_keeper::shutdown::shutdown_signal;
use ollama_keeper::{logging, ModelKeeper, OllamaClient};
use ollama_keeper_common::config::KeeperConfig;
use ollama_keeper_common::error::KeeperResult;
use tracing::info;

fn main() {
    let config = match KeeperConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(config.log_level) {
        eprintln!("Error: failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to build Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(config)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: KeeperConfig) -> KeeperResult<()> {
    info!(
        target_model = %config.target_model,
        ollama_uri = %config.ollama_uri,
        cycle_interval_secs = config.cycle_interval.as_secs(),
        monitor_interval_secs = config.monitor_interval.as_secs(),
        context_length = config.context_length,
        log_level = %config.log_level,
        poll_timeout_secs = config.poll_timeout.as_secs(),
        "Starting Ollama model keeper"
    );

    let client = OllamaClient::new(&config.ollama_uri, config.poll_timeout)?;
    let keeper = ModelKeeper::new(client, config);

    keeper.run(shutdown_signal()).await;

    info!("Ollama model keeper stopped");
    Ok(())
}
