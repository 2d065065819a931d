use colored::Colorize;
use tracing::info;

use super::Session;
use crate::budgets::roll_forward;
use crate::db::open_ledger;
use crate::error::{FortifiError, Result};
use crate::period::YearMonth;
use crate::settings::{expand_home, normalize_db_path, save_settings};

/// Switches to another database file. The current connection is kept unless
/// the new one opens and initialises cleanly.
pub fn change(session: &mut Session) -> Result<()> {
    println!("Current database: {}", session.settings.database_path);
    let input = session.prompt.input("New database path: ")?;
    let db_path = normalize_db_path(&input)
        .ok_or_else(|| FortifiError::Validation("database path cannot be empty".to_string()))?;

    let conn = open_ledger(std::path::Path::new(&expand_home(&db_path)))?;
    roll_forward(&conn, YearMonth::current())?;

    session.conn = conn;
    session.settings.database_path = db_path;
    save_settings(&session.settings_path, &session.settings)?;
    info!(path = %session.settings.database_path, "switched database");
    println!(
        "{}",
        format!("Now using {}.", session.settings.database_path).green()
    );
    Ok(())
}
