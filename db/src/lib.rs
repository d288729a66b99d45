pub mod models;
pub mod test_utils;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use util::config;

pub async fn connect() -> DatabaseConnection {
    let path_or_url = config::database_path();
    // Already a DSN: use as-is. Otherwise treat it as a SQLite file path.
    let url = if path_or_url.starts_with("sqlite:") {
        path_or_url
    } else {
        // SQLite won't create intermediate dirs.
        if let Some(parent) = Path::new(&path_or_url).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    // One connection: SQLite has a single writer, and transactions queue for it.
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(1)
        .acquire_timeout(config::query_timeout())
        .sqlx_logging(false);

    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to database");
    tracing::info!("database connected");
    db
}
