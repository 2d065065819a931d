use colored::Colorize;

use super::{select_category, Session};
use crate::categories::{delete_category, DeleteCategoryMode, UNCATEGORIZED};
use crate::error::{FortifiError, Result};

pub fn delete(session: &mut Session) -> Result<()> {
    let (category_id, name) = select_category(session, false)?;

    println!("\n1. Delete '{name}' and all of its transactions");
    println!("2. Move its transactions to {UNCATEGORIZED}, then delete it");
    let mode = match session.prompt.input("Choice: ")?.as_str() {
        "1" => DeleteCategoryMode::DeleteTransactions,
        "2" => DeleteCategoryMode::MoveToUncategorized,
        other => return Err(FortifiError::Validation(format!("'{other}' is not an option"))),
    };

    let warning = match mode {
        DeleteCategoryMode::DeleteTransactions => format!("Permanently delete '{name}' and its transactions?"),
        DeleteCategoryMode::MoveToUncategorized => format!("Delete '{name}'?"),
    };
    if !session.prompt.confirm(&warning)? {
        println!("Cancelled.");
        return Ok(());
    }

    let affected = delete_category(&session.conn, category_id, mode)?;
    match mode {
        DeleteCategoryMode::DeleteTransactions => {
            println!("{}", format!("Deleted '{name}' and {affected} transaction(s).").green());
        }
        DeleteCategoryMode::MoveToUncategorized => {
            println!(
                "{}",
                format!("Deleted '{name}'; moved {affected} transaction(s) to {UNCATEGORIZED}.").green()
            );
        }
    }
    Ok(())
}
