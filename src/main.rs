#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use wordchain_server::config;
use wordchain_server::dictionary::MerriamWebsterClient;
use wordchain_server::http::{create_router, AppState};
use wordchain_server::logging;
use wordchain_server::server::{GameServer, ServerSettings};
use wordchain_server::store::{GameStore, PgStore};

/// Wordchain -- multiplayer real-time word-chain game server
#[derive(Parser, Debug)]
#[command(name = "wordchain-server")]
#[command(about = "Multiplayer real-time word-chain game server")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON, secrets omitted)
    /// and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            std::process::exit(1);
        }
    };

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|err| anyhow::anyhow!("Failed to serialize config: {err}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate(&cfg);
    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Lobby id: {}", cfg.root.lobby_id);
                println!("  Auth cookie: {}", cfg.auth.cookie_name);
                println!("  Reaper interval: {}s", cfg.reaper.interval_secs);
                println!("  Reaper delay: {}s", cfg.reaper.delay_secs);
                return Ok(());
            }
            Err(err) => {
                eprintln!("Configuration validation failed:\n{err}");
                std::process::exit(1);
            }
        }
    }
    validation_result.map_err(|err| anyhow::anyhow!(err))?;

    logging::init_with_config(&cfg.logging);

    let store = PgStore::connect(&cfg.database_uri, cfg.root.clone()).await?;
    store.initialize().await?;
    let store: Arc<dyn GameStore> = Arc::new(store);

    let dictionary = Arc::new(MerriamWebsterClient::new(&cfg.dictionary)?);

    let server = GameServer::new(ServerSettings::from(&cfg), store, dictionary);

    // The reaper is the only long-running task outside per-room game loops.
    let reaper = Arc::clone(&server);
    tokio::spawn(async move {
        reaper.reaper_task().await;
    });

    let state = AppState {
        server,
        auth: cfg.auth.clone(),
    };
    let app = create_router(state, &cfg.cors_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, cors_origins = %cfg.cors_origins, "Starting wordchain server");

    axum::serve(listener, app).await?;

    Ok(())
}
