pub mod budget;
pub mod categories;
pub mod database;
pub mod ingest;
pub mod report;
pub mod rules;
pub mod transactions;

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use colored::Colorize;
use comfy_table::{Cell, Color, Table};
use rusqlite::Connection;

use crate::accounts::{get_or_create_account, list_accounts};
use crate::budgets::list_definitions;
use crate::categories::{get_or_create_category, list_categories};
use crate::error::{FortifiError, Result};
use crate::fmt::{money, truncate};
use crate::ledger::resolve_short_id;
use crate::models::{BudgetDefinition, Transaction};
use crate::period::YearMonth;
use crate::settings::{Settings, DEFAULT_SETTINGS_FILE};

#[derive(Parser)]
#[command(name = "fortifi", about = "Personal finance ledger: import statements, categorize, budget.")]
pub struct Cli {
    /// Settings file holding the database path
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// Line-oriented input. End of input surfaces as `FortifiError::InputClosed`.
pub struct Prompt {
    reader: Box<dyn BufRead>,
}

impl Prompt {
    pub fn stdin() -> Self {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()))
    }

    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    pub fn input(&mut self, label: &str) -> Result<String> {
        print!("{label}");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(FortifiError::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    pub fn input_or(&mut self, label: &str, default: &str) -> Result<String> {
        let value = self.input(&format!("{label} [{default}]: "))?;
        Ok(if value.is_empty() { default.to_string() } else { value })
    }

    pub fn parse<T: FromStr>(&mut self, label: &str) -> Result<T> {
        let value = self.input(label)?;
        value
            .parse()
            .map_err(|_| FortifiError::Validation(format!("'{value}' is not a valid number")))
    }

    /// Accepts `y` or `yes`, case-insensitive.
    pub fn confirm(&mut self, label: &str) -> Result<bool> {
        let answer = self.input(&format!("{label} (yes/no): "))?.to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }

    pub fn month(&mut self, label: &str) -> Result<YearMonth> {
        let current = YearMonth::current().to_string();
        self.input_or(label, &current)?.parse()
    }
}

// ---------------------------------------------------------------------------
// Session and command table
// ---------------------------------------------------------------------------

pub struct Session {
    pub conn: Connection,
    pub settings: Settings,
    pub settings_path: PathBuf,
    pub prompt: Prompt,
}

pub type Handler = fn(&mut Session) -> Result<()>;

/// A menu entry. `handler` is `None` only for the entry that leaves the menu.
pub struct Command {
    pub tag: &'static str,
    pub name: &'static str,
    pub handler: Option<Handler>,
}

pub const COMMANDS: &[Command] = &[
    Command { tag: "hlp", name: "Show this command list", handler: Some(help) },
    Command { tag: "brk", name: "Monthly breakdown", handler: Some(report::breakdown) },
    Command { tag: "sts", name: "Statistics for a year or all time", handler: Some(report::stats) },
    Command { tag: "tim", name: "Category timeline", handler: Some(report::timeline) },
    Command { tag: "bst", name: "Budget status for a month", handler: Some(report::budget_status) },
    Command { tag: "bhi", name: "Budget history", handler: Some(report::budget_history) },
    Command { tag: "abh", name: "Account balance history", handler: Some(report::balance_history) },
    Command { tag: "ade", name: "Teach exact description rule", handler: Some(rules::teach_exact) },
    Command { tag: "adi", name: "Teach description-contains rule", handler: Some(rules::teach_includes) },
    Command { tag: "rls", name: "List learned rules", handler: Some(rules::list) },
    Command { tag: "dca", name: "Delete category", handler: Some(categories::delete) },
    Command { tag: "cbu", name: "Create budget", handler: Some(budget::create) },
    Command { tag: "dbu", name: "Delete budget", handler: Some(budget::delete) },
    Command { tag: "ubu", name: "Update budget amount", handler: Some(budget::update_amount) },
    Command { tag: "cbc", name: "Change budget categories", handler: Some(budget::change_categories) },
    Command { tag: "add", name: "Add transaction manually", handler: Some(transactions::add) },
    Command { tag: "chg", name: "Change transaction category", handler: Some(transactions::change_category) },
    Command { tag: "del", name: "Delete transactions", handler: Some(transactions::delete) },
    Command { tag: "spl", name: "Split transaction", handler: Some(transactions::split) },
    Command { tag: "ing", name: "Ingest statement file or raw directory", handler: Some(ingest::run) },
    Command { tag: "cdb", name: "Change database", handler: Some(database::change) },
    Command { tag: "ext", name: "Exit", handler: None },
];

fn help(_session: &mut Session) -> Result<()> {
    println!("\n{}", "Available commands:".bold());
    for cmd in COMMANDS {
        println!("  {:<7}{}", format!("({})", cmd.tag), cmd.name);
    }
    Ok(())
}

fn interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stdin().is_terminal()
}

fn clear_screen() {
    if interactive() {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::Clear(crossterm::terminal::ClearType::All),
            crossterm::cursor::MoveTo(0, 0)
        );
    }
}

/// The menu loop. Returns when the user exits or input ends.
pub fn run(session: &mut Session) -> Result<()> {
    clear_screen();
    if let Err(e) = report::overview(session) {
        print_error("showing overview", &e);
    }
    help(session)?;

    loop {
        let tag = match session.prompt.input("\nEnter command: ") {
            Ok(tag) => tag.to_lowercase(),
            Err(FortifiError::InputClosed) => return Ok(()),
            Err(e) => return Err(e),
        };
        if tag.is_empty() {
            continue;
        }
        let Some(cmd) = COMMANDS.iter().find(|c| c.tag == tag) else {
            println!("{}", format!("Unknown command '{tag}'. Type hlp for the list.").red());
            continue;
        };
        let Some(handler) = cmd.handler else {
            println!("Goodbye.");
            return Ok(());
        };
        match handler(session) {
            Ok(()) => {}
            Err(FortifiError::InputClosed) => return Ok(()),
            Err(e) => print_error(&format!("in {}", cmd.name.to_lowercase()), &e),
        }
        if interactive() {
            if let Err(FortifiError::InputClosed) = session.prompt.input("\nPress Enter to continue...") {
                return Ok(());
            }
            clear_screen();
            help(session)?;
        }
    }
}

// ---------------------------------------------------------------------------
// Shared output and selection helpers
// ---------------------------------------------------------------------------

pub fn print_error(context: &str, err: &FortifiError) {
    println!("{}", format!("Error {context}: {err}").red());
}

pub fn amount_cell(value: f64) -> Cell {
    Cell::new(money(value)).fg(if value < 0.0 { Color::Red } else { Color::Green })
}

pub fn print_transactions(transactions: &[Transaction]) {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Category", "Description", "Txn ID", "Amount"]);
    for t in transactions {
        let category = Cell::new(&t.category_name);
        let category = if t.category_name == crate::categories::UNCATEGORIZED {
            category.fg(Color::Blue)
        } else {
            category
        };
        table.add_row(vec![
            Cell::new(&t.date),
            category,
            Cell::new(truncate(&t.description, 30)),
            Cell::new(t.short_id()),
            amount_cell(t.amount),
        ]);
    }
    println!("{table}");
}

fn print_numbered(names: &[String]) {
    let columns = 3;
    let rows = names.len().div_ceil(columns);
    let width = names
        .iter()
        .enumerate()
        .map(|(i, n)| format!("{}. {n}", i + 1).chars().count())
        .max()
        .unwrap_or(0)
        + 3;
    for row in 0..rows {
        let mut line = String::new();
        for col in 0..columns {
            let index = col * rows + row;
            if let Some(name) = names.get(index) {
                line.push_str(&format!("{:<width$}", format!("{}. {name}", index + 1)));
            }
        }
        println!("{}", line.trim_end());
    }
}

/// Picks an entry by 1-based number or by case-insensitive name.
fn pick<'a, T>(items: &'a [T], name_of: impl Fn(&T) -> &str, input: &str) -> Option<&'a T> {
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| items.get(i));
    }
    items.iter().find(|item| name_of(item).eq_ignore_ascii_case(input))
}

/// Lists categories and reads a choice. With `allow_create`, an unknown name
/// creates a new category.
pub fn select_category(session: &mut Session, allow_create: bool) -> Result<(i64, String)> {
    let categories = list_categories(&session.conn)?;
    if categories.is_empty() && !allow_create {
        return Err(FortifiError::NotFound("no categories exist yet".to_string()));
    }
    print_numbered(
        &categories
            .iter()
            .map(|c| format!("{} ({})", c.name, c.transaction_count))
            .collect::<Vec<_>>(),
    );
    let input = session.prompt.input("\nCategory name or number: ")?;
    if let Some(cat) = pick(&categories, |c| c.name.as_str(), &input) {
        return Ok((cat.id, cat.name.clone()));
    }
    if allow_create && input.parse::<usize>().is_err() && !input.is_empty() {
        println!("Creating new category: {input}");
        let id = get_or_create_category(&session.conn, &input)?;
        return Ok((id, input));
    }
    Err(FortifiError::NotFound(format!("category '{input}'")))
}

/// Lists accounts and reads a choice; an unknown name creates a new account.
pub fn select_account(session: &mut Session) -> Result<(i64, String)> {
    let accounts = list_accounts(&session.conn)?;
    print_numbered(
        &accounts
            .iter()
            .map(|a| format!("{} ({})", a.name, money(a.balance)))
            .collect::<Vec<_>>(),
    );
    let input = session.prompt.input("\nAccount name or number (new name creates it): ")?;
    if let Some(acct) = pick(&accounts, |a| a.name.as_str(), &input) {
        return Ok((acct.id, acct.name.clone()));
    }
    if input.parse::<usize>().is_ok() {
        return Err(FortifiError::NotFound(format!("account #{input}")));
    }
    let id = get_or_create_account(&session.conn, &input)?;
    Ok((id, input))
}

pub fn select_budget(session: &mut Session) -> Result<BudgetDefinition> {
    let definitions = list_definitions(&session.conn)?;
    if definitions.is_empty() {
        return Err(FortifiError::NotFound("no budgets defined".to_string()));
    }
    for (i, d) in definitions.iter().enumerate() {
        if d.description.is_empty() {
            println!("{}. {}", i + 1, d.name);
        } else {
            println!("{}. {} - {}", i + 1, d.name, d.description.dimmed());
        }
    }
    let input = session.prompt.input("\nBudget number: ")?;
    pick(&definitions, |d| d.name.as_str(), &input)
        .cloned()
        .ok_or_else(|| FortifiError::NotFound(format!("budget '{input}'")))
}

/// Reads an 8-character transaction ID and shows the matching transaction.
pub fn select_transaction(session: &mut Session) -> Result<Transaction> {
    let input = session.prompt.input("Transaction ID (first 8 characters): ")?;
    let txn = resolve_short_id(&session.conn, &input)?;
    print_transactions(std::slice::from_ref(&txn));
    Ok(txn)
}
