mod accounts;
mod budgets;
mod categories;
mod categorizer;
mod cli;
mod db;
mod error;
mod fmt;
mod identity;
mod import_config;
mod importer;
mod keywords;
mod ledger;
mod models;
mod parser;
mod period;
mod reports;
mod settings;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use cli::{Cli, Prompt, Session};
use period::YearMonth;

fn log_filter(verbose: u8) -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
        .to_string()
    })
}

fn start(args: &Cli) -> anyhow::Result<Session> {
    let settings = settings::load_settings(&args.settings)
        .with_context(|| format!("loading settings from {}", args.settings.display()))?;
    let db_path = settings.database_path();
    let conn = db::open_ledger(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    match budgets::roll_forward(&conn, YearMonth::current()) {
        Ok(created) => info!(db = %db_path.display(), rolled_forward = created, "ledger ready"),
        Err(e) => warn!(db = %db_path.display(), error = %e, "budget roll-forward failed"),
    }

    Ok(Session {
        conn,
        settings,
        settings_path: args.settings.clone(),
        prompt: Prompt::stdin(),
    })
}

fn main() {
    let args = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_filter(args.verbose)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = start(&args).and_then(|mut session| cli::run(&mut session).map_err(anyhow::Error::from));

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
