pub mod calendar;
mod cli;
pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod rollup;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

const APP_DIR_NAME: &str = "pnl-journal";
const DB_FILE_NAME: &str = "journal.db";

pub fn default_db_path() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join(APP_DIR_NAME).join(DB_FILE_NAME)
    } else {
        PathBuf::from(".pnl-journal").join(DB_FILE_NAME)
    }
}

fn init_logging(verbose: bool) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    let _ = builder.try_init();
}

fn print_recovery_steps(db_path: &std::path::Path, error: &dyn std::fmt::Display) {
    let backups_dir = db_path
        .parent()
        .map(|dir| dir.join("backups"))
        .unwrap_or_else(|| PathBuf::from("backups"));

    eprintln!("❌ Database initialization failed: {}", error);
    eprintln!();
    eprintln!("This might be due to a failed migration or database corruption.");
    eprintln!();
    eprintln!("Your database backups are located at:");
    eprintln!("  {:?}", backups_dir);
    eprintln!();
    eprintln!("Recovery steps:");
    eprintln!("  1. Locate the most recent backup in the backups folder");
    eprintln!("  2. Replace {:?} with the backup", db_path);
    eprintln!("  3. Run the command again");
    eprintln!();
    eprintln!("If the problem persists, please report this issue with");
    eprintln!("the error message shown above.");
}

pub fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_logging(cli.verbose);

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => default_db_path(),
    };
    if let Some(dir) = db_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
    }
    log::debug!("Database path: {:?}", db_path);

    let db_path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {:?}", db_path))?;

    let database = match db::Database::new(db_path_str) {
        Ok(db) => db,
        Err(e) => {
            print_recovery_steps(&db_path, &e);
            return Err(anyhow::anyhow!("Database initialization failed: {}", e));
        }
    };

    cli::execute(cli, &database)
}
