use rusqlite::{Connection, OptionalExtension};

use crate::error::{FortifiError, Result};
use crate::models::Category;

pub const UNCATEGORIZED: &str = "Uncategorized";

pub fn find_category(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row("SELECT id FROM categories WHERE name = ?1", [name.trim()], |r| r.get(0))
        .optional()?;
    Ok(id)
}

pub fn get_or_create_category(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FortifiError::Validation("category name cannot be empty".to_string()));
    }
    if let Some(id) = find_category(conn, name)? {
        return Ok(id);
    }
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn category_name(conn: &Connection, id: i64) -> Result<String> {
    conn.query_row("SELECT name FROM categories WHERE id = ?1", [id], |r| r.get(0))
        .optional()?
        .ok_or_else(|| FortifiError::NotFound(format!("category #{id}")))
}

/// All categories ordered by name, each with its transaction count.
pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, COUNT(t.id)
         FROM categories c
         LEFT JOIN transactions t ON t.category_id = c.id
         GROUP BY c.id, c.name
         ORDER BY c.name",
    )?;
    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                transaction_count: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(categories)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteCategoryMode {
    /// Remove the category together with every transaction filed under it.
    DeleteTransactions,
    /// Refile its transactions under Uncategorized, then remove the category.
    MoveToUncategorized,
}

/// Deletes a category atomically. Refused while it is the last category of
/// some budget. Returns how many transactions were deleted or moved.
pub fn delete_category(conn: &Connection, id: i64, mode: DeleteCategoryMode) -> Result<usize> {
    let name = category_name(conn, id)?;
    if mode == DeleteCategoryMode::MoveToUncategorized && name == UNCATEGORIZED {
        return Err(FortifiError::Validation(format!(
            "cannot move transactions out of '{UNCATEGORIZED}' into itself"
        )));
    }

    let tx = conn.unchecked_transaction()?;
    let sole_category_of: Option<String> = tx
        .query_row(
            "SELECT d.name FROM budget_definitions d
             JOIN budget_definition_categories l ON l.budget_definition_id = d.id
             WHERE l.category_id = ?1
               AND (SELECT count(*) FROM budget_definition_categories
                    WHERE budget_definition_id = d.id) = 1
             ORDER BY d.name LIMIT 1",
            [id],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(budget) = sole_category_of {
        return Err(FortifiError::Validation(format!(
            "'{name}' is the only category of budget '{budget}'; change that budget first"
        )));
    }
    let affected = match mode {
        DeleteCategoryMode::DeleteTransactions => {
            tx.execute("DELETE FROM transactions WHERE category_id = ?1", [id])?
        }
        DeleteCategoryMode::MoveToUncategorized => {
            let target = get_or_create_category(&tx, UNCATEGORIZED)?;
            tx.execute(
                "UPDATE transactions SET category_id = ?1 WHERE category_id = ?2",
                [target, id],
            )?
        }
    };
    tx.execute("DELETE FROM categories WHERE id = ?1", [id])?;
    tx.commit()?;
    Ok(affected)
}
