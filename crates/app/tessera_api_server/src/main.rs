//! Tessera API server binary.
//!
//! Loads configuration from the environment (and `.env`), connects to
//! PostgreSQL with bounded backoff, runs migrations and serves the auth API.

use std::sync::Arc;

use clap::Parser;
use tessera_api::config::ApiConfig;
use tessera_core::store::{MemoryProfileStore, PgProfileStore, ProfileStore};
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "tessera_api_server", about = "Tessera session and credential API")]
struct Args {
    /// Port to listen on; overrides the port in `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep profiles in process memory instead of PostgreSQL. Development only.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,tessera_api=debug,tessera_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map_or("127.0.0.1", |(host, _)| host);
        config.bind_addr = format!("{host}:{port}");
    }
    if args.database_url.is_some() {
        config.database_url = args.database_url;
    }

    info!(
        bind_addr = %config.bind_addr,
        production = config.production,
        github = config.github.is_some(),
        "starting tessera_api_server"
    );

    let store: Arc<dyn ProfileStore> = if args.in_memory {
        warn!("using the in-memory profile store; all profiles are lost on exit");
        Arc::new(MemoryProfileStore::new())
    } else {
        let url = config
            .database_url
            .as_deref()
            .ok_or("DATABASE_URL is required unless --in-memory is set")?;
        info!(max_connections = args.max_connections, "connecting to PostgreSQL");
        let pool = tessera_core::db::bootstrap(url, args.max_connections).await?;
        Arc::new(PgProfileStore::new(pool))
    };

    let providers = tessera_api::providers_from_config(&config)?;
    let bind_addr = config.bind_addr.clone();
    let state = tessera_api::AppState::new(config, store, providers);
    let cleanup = state.oauth_state.spawn_cleanup_task();

    let app = tessera_api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    cleanup.abort();
    Ok(())
}
