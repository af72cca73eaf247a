//! Chatwire command-line entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatwire_core::config::{Config, data_dir};
use chatwire_core::provider::{EngineEventSender, NoopEngine};
use chatwire_core::store::JsonlEventStore;
use chatwire_gateway::relay::start_event_relay;
use chatwire_gateway::server::start_gateway;
use chatwire_gateway::state::GatewayState;

#[derive(Parser)]
#[command(name = "chatwire", version, about = "Real-time chat command/event gateway")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the WebSocket gateway server
    Gateway {
        /// Override the configured listen port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the effective configuration
    Config,
    /// Show data directory and store contents summary
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
    let mut config = Config::load(&Config::config_path())?;

    match cli.command {
        Command::Gateway { port } => {
            if let Some(port) = port {
                let gateway = config.gateway.get_or_insert_default();
                gateway.port = port;
            }

            let store = Arc::new(JsonlEventStore::new(config.store_dir())?);
            let state = GatewayState::new(config, Arc::new(NoopEngine), store);

            // Engine adapters hand their event stream to the relay; with no
            // adapter wired in, the channel just stays idle.
            let (_engine_tx, engine_rx): (EngineEventSender, _) =
                tokio::sync::mpsc::unbounded_channel();
            start_event_relay(state.clone(), engine_rx);

            info!(port = state.config.gateway_port(), "starting gateway");
            start_gateway(state).await
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Status => {
            let store = JsonlEventStore::new(config.store_dir())?;
            println!("data dir:  {}", data_dir().display());
            println!("store dir: {}", store.path().display());
            println!("messages:  {}", store.messages()?.len());
            println!("calls:     {}", store.calls()?.len());
            Ok(())
        }
    }
}
