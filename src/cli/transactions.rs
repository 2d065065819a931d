use chrono::NaiveDate;
use colored::Colorize;

use super::{select_account, select_category, select_transaction, Session};
use crate::error::{FortifiError, Result};
use crate::fmt::money;
use crate::ledger::{
    add_manual_transaction, change_category as set_category, delete_transaction,
    delete_transactions_in_category, split_transaction, transactions_in_category, NewTransaction,
};

pub fn add(session: &mut Session) -> Result<()> {
    let date_input = session.prompt.input("Date (YYYY-MM-DD): ")?;
    let date = NaiveDate::parse_from_str(&date_input, "%Y-%m-%d")
        .map_err(|_| FortifiError::Validation(format!("'{date_input}' is not a YYYY-MM-DD date")))?;
    let description = session.prompt.input("Description: ")?;
    if description.is_empty() {
        return Err(FortifiError::Validation("description cannot be empty".to_string()));
    }
    let amount: f64 = session.prompt.parse("Amount (negative for spending): ")?;
    let (account_id, account) = select_account(session)?;
    let (category_id, category) = select_category(session, true)?;

    let id = add_manual_transaction(
        &session.conn,
        &NewTransaction {
            date,
            description,
            amount,
            account_id,
            category_id,
        },
    )?;
    println!(
        "{}",
        format!("Added {} ({}) to {account} under {category}.", &id[..8], money(amount)).green()
    );
    Ok(())
}

pub fn change_category(session: &mut Session) -> Result<()> {
    let txn = select_transaction(session)?;
    let (category_id, category) = select_category(session, true)?;
    if set_category(&session.conn, &txn.id, category_id)? {
        println!(
            "{}",
            format!("Moved {} from {} to {category}.", txn.short_id(), txn.category_name).green()
        );
    } else {
        println!("{} is already in {category}.", txn.short_id());
    }
    Ok(())
}

pub fn delete(session: &mut Session) -> Result<()> {
    println!("1. Delete one transaction by ID");
    println!("2. Delete every transaction in a category");
    match session.prompt.input("Choice: ")?.as_str() {
        "1" => {
            let txn = select_transaction(session)?;
            if !session.prompt.confirm("Delete this transaction?")? {
                println!("Cancelled.");
                return Ok(());
            }
            delete_transaction(&session.conn, &txn.id)?;
            println!("{}", format!("Deleted {}.", txn.short_id()).green());
        }
        "2" => {
            let (category_id, category) = select_category(session, false)?;
            let count = transactions_in_category(&session.conn, category_id)?.len();
            if count == 0 {
                println!("No transactions in {category}.");
                return Ok(());
            }
            if !session
                .prompt
                .confirm(&format!("Delete all {count} transaction(s) in {category}?"))?
            {
                println!("Cancelled.");
                return Ok(());
            }
            let deleted = delete_transactions_in_category(&session.conn, category_id)?;
            println!("{}", format!("Deleted {deleted} transaction(s) from {category}.").green());
        }
        other => return Err(FortifiError::Validation(format!("'{other}' is not an option"))),
    }
    Ok(())
}

pub fn split(session: &mut Session) -> Result<()> {
    let txn = select_transaction(session)?;
    let amount: f64 = session.prompt.parse(&format!(
        "Amount to split off (less than {}): ",
        money(txn.amount.abs())
    ))?;
    let (category_id, category) = select_category(session, true)?;
    let note = session.prompt.input("Note for the new transaction (optional): ")?;
    if !session.prompt.confirm(&format!(
        "Split {} into {category}?",
        money(amount.abs())
    ))? {
        println!("Cancelled.");
        return Ok(());
    }

    let outcome = split_transaction(&session.conn, &txn.id, amount, category_id, Some(&note))?;
    if outcome.sign_flipped {
        println!("Note: the split amount takes the sign of the original transaction.");
    }
    println!(
        "{}",
        format!(
            "Created {} for {} in {category}; {} keeps {}.",
            &outcome.new_id[..8],
            money(outcome.split_amount),
            txn.short_id(),
            money(outcome.remaining)
        )
        .green()
    );
    Ok(())
}
