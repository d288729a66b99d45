use api::ws::ws_routes;
use api::{ApiSettings, ApiState};
use migration::{Migrator, MigratorTrait};
use services::SessionService;
use std::{net::SocketAddr, time::Duration};
use tracing_appender::rolling;
use util::config;

const SESSION_PURGE_EVERY: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() {
    // Load configuration and initialize logging
    let _log_guard = init_logging(&config::log_file(), &config::log_level());

    let db = db::connect().await;
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let state = ApiState::build(db, &ApiSettings::from_config()).await;
    spawn_session_purger(state.sessions.clone());

    let app = ws_routes(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config::host(), config::port())
        .parse()
        .expect("Invalid address");

    tracing::info!(
        "Starting {} ({}) on ws://{}/ws",
        config::project_name(),
        config::env(),
        addr
    );

    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server crashed");
}

/// Daily-rolling file log under `logs/`, plus stdout when `LOG_TO_STDOUT=true`.
/// `LOG_LEVEL` is an `EnvFilter` directive.
fn init_logging(log_file: &str, log_level: &str) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    std::fs::create_dir_all("logs").ok();
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::daily("logs", log_file));

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("api=info"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = config::log_to_stdout().then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_thread_ids(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    guard
}

fn spawn_session_purger(sessions: SessionService) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SESSION_PURGE_EVERY).await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(purged = n, "expired sessions removed"),
                Err(err) => tracing::warn!(error = %err, "session purge failed"),
            }
        }
    });
}
