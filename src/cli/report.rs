use colored::Colorize;
use comfy_table::{Cell, Color, Table};

use super::{amount_cell, pick, print_numbered, print_transactions, select_budget, select_category, Session};
use crate::accounts::latest_balances;
use crate::budgets::{self, BudgetStatus};
use crate::error::{FortifiError, Result};
use crate::fmt::{delta, money};
use crate::period::YearMonth;
use crate::reports;

/// Startup summary: latest balances and this month's budgets.
pub fn overview(session: &mut Session) -> Result<()> {
    println!("{}", "Welcome to FortiFi".bold());

    let balances = latest_balances(&session.conn)?;
    if !balances.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Account", "Balance", "As of"]);
        for (name, balance, time) in &balances {
            table.add_row(vec![
                Cell::new(name),
                amount_cell(*balance),
                Cell::new(time.split(' ').next().unwrap_or(time)),
            ]);
        }
        println!("{table}");
    }

    let month = YearMonth::current();
    let statuses = budgets::budget_status(&session.conn, month)?;
    if !statuses.is_empty() {
        println!("\nBudgets for {}:", month.label());
        print_budget_table(&statuses);
    }
    Ok(())
}

pub fn breakdown(session: &mut Session) -> Result<()> {
    let month = session.prompt.month("Month (YYYY-MM)")?;
    let report = reports::month_breakdown(&session.conn, month)?;
    if report.transactions.is_empty() {
        println!("No transactions for {}.", month.label());
        return Ok(());
    }

    println!("\n{}", format!("Transactions for {}", report.month.label()).bold());
    print_transactions(&report.transactions);

    let mut table = Table::new();
    table.set_header(vec!["Category", "Total"]);
    for (name, total) in &report.category_totals {
        table.add_row(vec![Cell::new(name), amount_cell(*total)]);
    }
    println!("{table}");

    println!("Income:    {}", money(report.income).green());
    println!("Spending:  {}", money(report.spend).red());
    println!("Net:       {}", crate::fmt::amount(report.net()));
    Ok(())
}

pub fn stats(session: &mut Session) -> Result<()> {
    let current = YearMonth::current().year.to_string();
    let input = session.prompt.input_or("Year (or 'all')", &current)?;
    let year = if input.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(
            input
                .parse::<i32>()
                .map_err(|_| FortifiError::Validation(format!("'{input}' is not a year")))?,
        )
    };
    let label = year.map_or_else(|| "all time".to_string(), |y| y.to_string());

    let Some(stats) = reports::stats(&session.conn, year)? else {
        println!("No transactions for {label}.");
        return Ok(());
    };

    println!("\n{}", format!("Statistics for {label} ({} months with data)", stats.months).bold());
    println!("Total income:           {}", money(stats.total_income).green());
    println!("Total spending:         {}", money(stats.total_spend).red());
    println!("Average monthly income: {}", money(stats.average_income()).green());
    println!("Average monthly spend:  {}", money(stats.average_spend()).red());

    let mut table = Table::new();
    table.set_header(vec!["Category", "Monthly average"]);
    for (name, avg) in &stats.category_monthly_average {
        table.add_row(vec![Cell::new(name), amount_cell(*avg)]);
    }
    println!("{table}");
    Ok(())
}

pub fn timeline(session: &mut Session) -> Result<()> {
    let (category_id, name) = select_category(session, false)?;
    let timeline = reports::category_timeline(&session.conn, category_id)?;
    if timeline.entries.is_empty() {
        println!("No transactions in {name}.");
        return Ok(());
    }

    println!("\n{}", format!("Timeline for {name}").bold());
    let mut table = Table::new();
    table.set_header(vec!["Month", "Total", "vs. previous", "vs. average"]);
    for entry in &timeline.entries {
        table.add_row(vec![
            Cell::new(&entry.month),
            amount_cell(entry.total),
            Cell::new(entry.vs_previous.map_or_else(|| "-".to_string(), |d| delta(d).to_string())),
            Cell::new(delta(entry.vs_average).to_string()),
        ]);
    }
    println!("{table}");
    println!("Monthly average: {}", crate::fmt::amount(timeline.average));
    Ok(())
}

pub fn budget_status(session: &mut Session) -> Result<()> {
    let month = session.prompt.month("Month (YYYY-MM)")?;
    let statuses = budgets::budget_status(&session.conn, month)?;
    if statuses.is_empty() {
        println!("No budgets defined. Use cbu to create one.");
        return Ok(());
    }
    println!("\n{}", format!("Budget status for {}", month.label()).bold());
    print_budget_table(&statuses);
    Ok(())
}

fn print_budget_table(statuses: &[BudgetStatus]) {
    let mut table = Table::new();
    table.set_header(vec!["Budget", "Categories", "Budgeted", "Spent", "Remaining", "Used"]);
    for status in statuses {
        let (budgeted, remaining, used) = match status.amount {
            Some(amount) => {
                let pct = status.percent_used().unwrap_or(0.0);
                let color = if status.within_budget().unwrap_or(true) { Color::Green } else { Color::Red };
                (
                    Cell::new(money(amount)),
                    Cell::new(money(status.remaining().unwrap_or(0.0))).fg(color),
                    Cell::new(format!("{pct:.1}%")).fg(color),
                )
            }
            None => (Cell::new("not set"), Cell::new("-"), Cell::new("-")),
        };
        table.add_row(vec![
            Cell::new(&status.definition.name),
            Cell::new(status.categories.join(", ")),
            budgeted,
            Cell::new(money(status.spent.abs())),
            remaining,
            used,
        ]);
    }
    println!("{table}");
}

pub fn budget_history(session: &mut Session) -> Result<()> {
    let definition = select_budget(session)?;
    let (entries, summary) = budgets::budget_history(&session.conn, definition.id)?;
    if entries.is_empty() {
        println!("{} has no monthly amounts yet.", definition.name);
        return Ok(());
    }

    println!("\n{}", format!("History for {}", definition.name).bold());
    let mut table = Table::new();
    table.set_header(vec!["Month", "Budgeted", "Spent", "Used", "Status"]);
    for entry in &entries {
        let (status, color) = if entry.within_budget {
            ("within", Color::Green)
        } else {
            ("over", Color::Red)
        };
        table.add_row(vec![
            Cell::new(&entry.month),
            Cell::new(money(entry.amount)),
            Cell::new(money(entry.spent.abs())),
            Cell::new(format!("{:.1}%", entry.percent)),
            Cell::new(status).fg(color),
        ]);
    }
    println!("{table}");
    println!(
        "{} months: {} within budget, {} over. Average spent {} ({:.1}%).",
        summary.months,
        summary.within_budget.to_string().green(),
        summary.over_budget.to_string().red(),
        money(summary.average_spent),
        summary.average_percent
    );
    Ok(())
}

pub fn balance_history(session: &mut Session) -> Result<()> {
    let accounts = reports::accounts_with_balances(&session.conn)?;
    if accounts.is_empty() {
        println!("No account has balance snapshots yet. Import a statement with a balance column.");
        return Ok(());
    }
    print_numbered(&accounts.iter().map(|(_, n)| n.clone()).collect::<Vec<_>>());
    let input = session.prompt.input("\nAccount name or number: ")?;
    let (account_id, name) = pick(&accounts, |(_, n)| n.as_str(), &input)
        .cloned()
        .ok_or_else(|| FortifiError::NotFound(format!("account '{input}'")))?;
    let history = reports::balance_history(&session.conn, account_id)?;
    if history.months.is_empty() {
        println!("{name} has no balance snapshots.");
        return Ok(());
    }

    println!("\n{}", format!("Balance history for {name}").bold());
    let mut table = Table::new();
    table.set_header(vec!["Month", "Starting", "Ending", "Change"]);
    for month in &history.months {
        table.add_row(vec![
            Cell::new(&month.month),
            amount_cell(month.starting),
            amount_cell(month.ending),
            Cell::new(month.change.map_or_else(|| "-".to_string(), |c| delta(c).to_string())),
        ]);
    }
    println!("{table}");
    if let (Some(total), Some(avg)) = (history.total_change(), history.average_monthly_change()) {
        println!("Total change: {}  Average per month: {}", delta(total), delta(avg));
    }
    Ok(())
}
