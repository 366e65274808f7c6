//! Resultify API server binary.
//!
//! Reads configuration from the environment (and `.env`), migrates the
//! database, seeds the super administrator and serves the REST API.

use std::sync::Arc;

use clap::Parser;
use resultify_api::config::ApiConfig;
use resultify_api::services::accounts::bootstrap_super_admin;
use resultify_api::{AppState, router};
use resultify_core::auth::queries::PgStore;
use resultify_core::mail::{LogMailer, Mailer, WebhookMailer};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use url::Url;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "resultify_server", about = "Resultify API server")]
struct Args {
    /// Port to listen on; overrides the port in `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/resultify"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

fn build_mailer(config: &ApiConfig) -> Arc<dyn Mailer> {
    match config.mail_webhook_url.as_deref().map(Url::parse) {
        Some(Ok(endpoint)) => {
            info!(endpoint = %endpoint, "mail delivery via webhook");
            Arc::new(WebhookMailer::new(endpoint))
        }
        Some(Err(e)) => {
            warn!(error = %e, "MAIL_WEBHOOK_URL is not a valid URL, mail will only be logged");
            Arc::new(LogMailer)
        }
        None => {
            info!("MAIL_WEBHOOK_URL unset, mail will only be logged");
            Arc::new(LogMailer)
        }
    }
}

fn bind_addr(config: &ApiConfig, port: Option<u16>) -> String {
    match port {
        Some(port) => {
            let host = config
                .bind_addr
                .rsplit_once(':')
                .map_or(config.bind_addr.as_str(), |(host, _)| host);
            format!("{host}:{port}")
        }
        None => config.bind_addr.clone(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,resultify_api=debug,resultify_core=debug",
                )
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    config.bind_addr = bind_addr(&config, args.port);
    config.pg_connection_url = args.database_url;

    info!(
        bind_addr = %config.bind_addr,
        max_connections = args.max_connections,
        algorithm = %config.jwt.algorithm,
        "starting resultify_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.pg_connection_url)
        .await?;

    info!("running database migrations");
    resultify_api::migrate(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let mailer = build_mailer(&config);
    let state = AppState::new(config, store.clone(), store, mailer)?;

    if let Some(admin) = bootstrap_super_admin(&state).await? {
        info!(email = %admin.email, "super admin created");
    }

    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
