//! Bookstore HTTP server.
//!
//! Wires PostgreSQL, the Redis session store, email delivery and the
//! Prometheus recorder into the router, then serves until Ctrl+C or SIGTERM.

use bookstore::config::Config;
use bookstore::metrics::{install_recorder, register_business_metrics};
use bookstore::server::{
    AppState, AuthProviders, CookieSettings, PostgresProbe, RedisProbe, Stores, build_router,
};
use bookstore_auth::SessionManager;
use bookstore_auth::providers::{
    Argon2Hasher, ConsoleEmailSender, EmailSender, SmtpEmailSender,
};
use bookstore_auth::stores::RedisSessionStore;
use bookstore_core::environment::SystemClock;
use bookstore_postgres::PostgresStore;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        // A missing .env file is normal outside development.
        if !e.not_found() {
            return Err(e.into());
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookstore=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bookstore server");

    let config = Config::from_env();
    info!(
        host = %config.server.host,
        port = config.server.port,
        smtp = config.email.smtp.is_some(),
        "Configuration loaded"
    );

    let metrics = install_recorder()?;
    register_business_metrics();

    info!("Connecting to PostgreSQL...");
    let postgres =
        PostgresStore::connect(&config.postgres.url, config.postgres.max_connections).await?;
    postgres.migrate().await?;
    info!("PostgreSQL ready, migrations applied");

    info!("Connecting to Redis...");
    let sessions = RedisSessionStore::new(&config.redis.url).await?;
    info!("Redis session store ready");

    let email: Arc<dyn EmailSender> = match &config.email.smtp {
        Some(smtp) => Arc::new(SmtpEmailSender::new(
            smtp.host.clone(),
            smtp.port,
            smtp.username.clone(),
            smtp.password.clone(),
            config.email.from_email.clone(),
            config.email.from_name.clone(),
        )),
        None => {
            warn!("SMTP_HOST not set, verification codes are printed to the console");
            Arc::new(ConsoleEmailSender::new())
        }
    };

    let auth = AuthProviders {
        sessions: SessionManager::new(Arc::new(sessions.clone()), config.session.lifetimes()),
        hasher: Arc::new(Argon2Hasher::new()),
        email,
    };
    let cookies = CookieSettings {
        secure: config.session.cookie_secure,
    };

    let state = AppState::new(
        Stores::shared(postgres.clone()),
        auth,
        Arc::new(SystemClock),
        cookies,
    )
    .with_probe(Arc::new(PostgresProbe(postgres)))
    .with_probe(Arc::new(RedisProbe(sessions)))
    .with_metrics(metrics);

    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (on Unix)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
