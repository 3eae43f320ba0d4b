//! notedeck-api - HTTP API server for notedeck

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notedeck_api::{build_router, AppConfig, AppState, AuthMode};
use notedeck_db::{Database, ObjectStoreGateway, S3Backend, S3Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "notedeck_api=debug,notedeck_db=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notedeck_api=debug,notedeck_db=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("notedeck-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files by default
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = AppConfig::from_env()?;
    info!(
        bind = %config.server.bind_addr(),
        storage = ?config.storage,
        missing_note_policy = ?config.missing_note_policy,
        auth_mode = %config.auth.mode,
        "Configuration loaded"
    );

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&config.database.url, &config.database.pool).await?;
    info!("Database connected");

    if config.database.run_migrations {
        info!("Running database migrations...");
        db.migrate().await?;
        info!("Database migrations complete");
    }

    // Object store
    let s3_config = S3Config::from_parts(
        config.storage.endpoint.clone(),
        config.storage.access_key.clone(),
        config.storage.secret_key.clone(),
    )
    .region(config.storage.region.clone());
    let store = ObjectStoreGateway::new(
        S3Backend::new(&s3_config),
        config.storage.bucket.clone(),
        config.storage.url_ttl,
    );
    // Uploads create the bucket on demand, so an unreachable store is not fatal here.
    if let Err(e) = store.ensure_bucket().await {
        warn!(
            bucket = store.bucket(),
            error = %e,
            "Object store not ready, will retry on first upload"
        );
    }

    let mut state = AppState::new(
        Arc::new(db.notes.clone()),
        Arc::new(db.attachments.clone()),
        store,
        config.missing_note_policy,
    );
    if config.auth.mode == AuthMode::Enforce {
        if let Some(token) = config.auth.bot_token.as_deref() {
            state = state.with_auth(token)?;
        }
        info!("Init-data authentication enforced on mutating requests");
    }

    let app = build_router(state, &config.server);

    // Start server
    let addr: SocketAddr = config.server.bind_addr().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
