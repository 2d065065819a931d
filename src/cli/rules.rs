use comfy_table::{Cell, Table};

use super::{select_category, Session};
use crate::error::{FortifiError, Result};
use crate::keywords::{count_matches, list_rules, teach_rule, KeywordKind};

pub fn teach_exact(session: &mut Session) -> Result<()> {
    teach(session, KeywordKind::Exact, "Full description to match exactly: ")
}

pub fn teach_includes(session: &mut Session) -> Result<()> {
    teach(session, KeywordKind::Includes, "Text the description must contain (case-sensitive): ")
}

fn teach(session: &mut Session, kind: KeywordKind, label: &str) -> Result<()> {
    let keyword = session.prompt.input(label)?;
    if keyword.is_empty() {
        return Err(FortifiError::Validation("keyword cannot be empty".to_string()));
    }
    let (category_id, category) = select_category(session, true)?;
    let matching = count_matches(&session.conn, kind, &keyword)?;
    if matching > 0
        && !session.prompt.confirm(&format!(
            "This will move {matching} existing transaction(s) to {category}. Continue?"
        ))?
    {
        println!("Cancelled.");
        return Ok(());
    }
    let updated = teach_rule(&session.conn, kind, &keyword, category_id)?;
    println!("Added {} rule: '{keyword}' \u{2192} {category}", kind.label());
    println!("Re-categorized {updated} existing transaction(s).");
    Ok(())
}

pub fn list(session: &mut Session) -> Result<()> {
    let rules = list_rules(&session.conn)?;
    if rules.is_empty() {
        println!("No rules learned yet. Use ade or adi to teach one.");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Type", "Keyword", "Category"]);
    for rule in rules {
        table.add_row(vec![
            Cell::new(rule.kind.label()),
            Cell::new(rule.keyword),
            Cell::new(rule.category_name),
        ]);
    }
    println!("{table}");
    Ok(())
}
