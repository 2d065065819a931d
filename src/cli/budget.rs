use colored::Colorize;

use super::{pick, print_numbered, select_budget, select_category, Session};
use crate::budgets::{
    add_budget_category, create_budget, definition_categories, delete_budget, remove_budget_category,
    roll_forward, set_instance_amount, BudgetDeleteMode,
};
use crate::categories::{get_or_create_category, list_categories};
use crate::error::{FortifiError, Result};
use crate::fmt::money;
use crate::period::YearMonth;

fn positive_amount(session: &mut Session, label: &str) -> Result<f64> {
    let amount: f64 = session.prompt.parse(label)?;
    if amount <= 0.0 || !amount.is_finite() {
        return Err(FortifiError::Validation("budget amount must be greater than zero".to_string()));
    }
    Ok(amount)
}

/// Reads a comma-separated list of category numbers or names. Unknown names
/// become new categories.
fn select_categories(session: &mut Session) -> Result<Vec<i64>> {
    let categories = list_categories(&session.conn)?;
    print_numbered(&categories.iter().map(|c| c.name.clone()).collect::<Vec<_>>());
    let input = session
        .prompt
        .input("\nCategories (comma-separated names or numbers): ")?;

    let mut ids = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = match pick(&categories, |c| c.name.as_str(), part) {
            Some(cat) => cat.id,
            None if part.parse::<usize>().is_ok() => {
                return Err(FortifiError::NotFound(format!("category #{part}")));
            }
            None => get_or_create_category(&session.conn, part)?,
        };
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(FortifiError::Validation("a budget needs at least one category".to_string()));
    }
    Ok(ids)
}

pub fn create(session: &mut Session) -> Result<()> {
    let name = session.prompt.input("Budget name: ")?;
    let description = session.prompt.input("Description (optional): ")?;
    let category_ids = select_categories(session)?;
    let amount = positive_amount(session, "Monthly amount: ")?;
    let start = session.prompt.month("Starting month (YYYY-MM)")?;

    create_budget(&session.conn, &name, &description, &category_ids, start, amount)?;
    let filled = roll_forward(&session.conn, YearMonth::current())?;
    println!(
        "{}",
        format!("Created budget '{}' at {} per month from {}.", name.trim(), money(amount), start.label()).green()
    );
    if filled > 0 {
        println!("Carried the amount forward into {filled} later month(s).");
    }
    Ok(())
}

pub fn delete(session: &mut Session) -> Result<()> {
    let definition = select_budget(session)?;
    println!("\n1. Delete the budget and all monthly amounts");
    println!("2. Delete monthly amounts only");
    println!("3. Delete the budget definition only (must have no monthly amounts)");
    let mode = match session.prompt.input("Choice: ")?.as_str() {
        "1" => BudgetDeleteMode::Everything,
        "2" => BudgetDeleteMode::InstancesOnly,
        "3" => BudgetDeleteMode::DefinitionOnly,
        other => return Err(FortifiError::Validation(format!("'{other}' is not an option"))),
    };
    if !session
        .prompt
        .confirm(&format!("Really delete from budget '{}'?", definition.name))?
    {
        println!("Cancelled.");
        return Ok(());
    }

    let summary = delete_budget(&session.conn, definition.id, mode)?;
    if summary.definition_deleted {
        println!(
            "{}",
            format!(
                "Deleted budget '{}' ({} monthly amount(s) removed).",
                definition.name, summary.instances_deleted
            )
            .green()
        );
    } else {
        println!(
            "{}",
            format!("Removed {} monthly amount(s) from '{}'.", summary.instances_deleted, definition.name).green()
        );
    }
    Ok(())
}

pub fn update_amount(session: &mut Session) -> Result<()> {
    let definition = select_budget(session)?;
    let month = session.prompt.month("Month (YYYY-MM)")?;
    let amount = positive_amount(session, "New amount: ")?;
    match set_instance_amount(&session.conn, definition.id, month, amount)? {
        Some(previous) => println!(
            "{}",
            format!(
                "{} for {}: {} \u{2192} {}",
                definition.name,
                month.label(),
                money(previous),
                money(amount)
            )
            .green()
        ),
        None => println!(
            "{}",
            format!("Set {} for {} to {}.", definition.name, month.label(), money(amount)).green()
        ),
    }
    Ok(())
}

pub fn change_categories(session: &mut Session) -> Result<()> {
    let definition = select_budget(session)?;
    let current = definition_categories(&session.conn, definition.id)?;
    println!(
        "\n'{}' covers: {}",
        definition.name,
        current.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    println!("1. Add a category");
    println!("2. Remove a category");
    match session.prompt.input("Choice: ")?.as_str() {
        "1" => {
            let (category_id, name) = select_category(session, true)?;
            add_budget_category(&session.conn, definition.id, category_id)?;
            println!("{}", format!("Added {name} to '{}'.", definition.name).green());
        }
        "2" => {
            print_numbered(&current.iter().map(|c| c.name.clone()).collect::<Vec<_>>());
            let input = session.prompt.input("\nCategory to remove: ")?;
            let category = pick(&current, |c| c.name.as_str(), &input)
                .ok_or_else(|| FortifiError::NotFound(format!("category '{input}' in this budget")))?;
            remove_budget_category(&session.conn, definition.id, category.id)?;
            println!("{}", format!("Removed {} from '{}'.", category.name, definition.name).green());
        }
        other => return Err(FortifiError::Validation(format!("'{other}' is not an option"))),
    }
    Ok(())
}
