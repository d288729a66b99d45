use colored::*;
use std::{env, fs, path::Path};
use util::config;

mod runner;

/// `migration [up|fresh|clean]`; no argument means `up`.
enum Command {
    Up,
    Fresh,
    Clean,
}

impl Command {
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg {
            None | Some("up") => Some(Command::Up),
            Some("fresh") => Some(Command::Fresh),
            Some("clean") => Some(Command::Clean),
            Some(_) => None,
        }
    }
}

#[tokio::main]
async fn main() {
    let db_path = config::database_path();
    let arg = env::args().nth(1);

    let Some(command) = Command::parse(arg.as_deref()) else {
        eprintln!("usage: migration [up|fresh|clean]");
        std::process::exit(2);
    };

    if matches!(command, Command::Fresh | Command::Clean) {
        remove_database(&db_path);
    }
    if matches!(command, Command::Up | Command::Fresh) {
        runner::run_all_migrations(&sqlite_url(&db_path)).await;
    }
}

/// A DSN is used as is; a bare path becomes a file-backed SQLite URL.
fn sqlite_url(path_or_url: &str) -> String {
    if path_or_url.starts_with("sqlite:") {
        return path_or_url.to_owned();
    }
    if let Some(parent) = Path::new(path_or_url).parent() {
        fs::create_dir_all(parent).expect("Failed to create DB directory");
    }
    format!("sqlite://{path_or_url}?mode=rwc")
}

fn remove_database(path: &str) {
    let file = Path::new(path);
    if path.starts_with("sqlite:") || !file.exists() {
        println!("{} {}", "nothing to remove at".dimmed(), path);
        return;
    }
    fs::remove_file(file).expect("Failed to delete DB file");
    println!("{} {}", "removed".yellow(), file.display());
}
