use anyhow::Context;
use clap::Parser;
use notes_server::{
    build_app,
    cli::{Cli, Commands},
    config::ServerConfig,
    state::{ServerState, Stores},
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notes_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::from_env()?;

    let in_memory = matches!(cli.command, Some(Commands::Serve { in_memory: true }));
    let stores = if in_memory {
        Stores::in_memory()
    } else {
        let database_url = config.require_database_url()?;
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Stores::postgres(pool).await?
    };

    match cli.command {
        Some(Commands::User(cmd)) => return cmd.execute(stores.users).await,
        Some(Commands::Sessions(cmd)) => {
            let state = ServerState::new(config, stores)?;
            return cmd.execute(&state.session_manager).await;
        }
        Some(Commands::Serve { .. }) | None => {}
    }

    info!("Starting Notes Server v{}", VERSION);
    info!("Configuration loaded:");
    info!("   Port: {}", config.port);
    info!("   Bind address: {}", config.bind_addr);
    info!("   Session timeout: {}s", config.session_timeout_seconds);
    info!("   Secure cookies: {}", config.cookie_secure);
    info!("   CORS origins: {:?}", config.cors_origins);
    if in_memory {
        warn!("Running with in-memory storage; all data is lost on exit");
    } else {
        info!("Database connected and schema initialized");
    }

    let state = Arc::new(ServerState::new(config.clone(), stores)?);

    // Spawn background task to purge expired sessions
    {
        let session_manager = state.session_manager.clone();
        let every = Duration::from_secs(config.session_cleanup_interval_seconds.max(1));
        tokio::spawn(async move {
            let mut interval = time::interval(every);
            loop {
                interval.tick().await;
                match session_manager.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => info!("Purged {} expired sessions", purged),
                    Err(e) => warn!("Session purge failed: {}", e),
                }
            }
        });
    }

    let app = build_app(state);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .context("Invalid bind address")?;
    info!("Listening on http://{}", addr);
    info!("Health endpoint: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
