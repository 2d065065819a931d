use rusqlite::Connection;

use crate::categories::{get_or_create_category, UNCATEGORIZED};
use crate::error::Result;
use crate::identity::amounts_match;
use crate::import_config::{ImportFormat, SpecialRule};
use crate::keywords::{load_keyword_rules, KeywordRules};

/// Which rule decided a record's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    Special,
    Exact,
    Includes,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Categorization {
    pub category_id: i64,
    pub source: RuleSource,
}

fn special_matches(rule: &SpecialRule, description: &str, amount: f64) -> bool {
    rule.description_exact == description
        && rule.amount_exact.map_or(true, |expected| amounts_match(amount, expected))
}

/// Precedence: format special rules, then learned exact keywords, then learned
/// substring keywords in insertion order, then Uncategorized.
pub struct RuleEngine<'a> {
    special_rules: &'a [SpecialRule],
    keywords: KeywordRules,
}

impl<'a> RuleEngine<'a> {
    pub fn new(special_rules: &'a [SpecialRule], keywords: KeywordRules) -> Self {
        Self {
            special_rules,
            keywords,
        }
    }

    /// Snapshots the learned rules once; call per file, not per record.
    pub fn load(conn: &Connection, format: &'a ImportFormat) -> Result<Self> {
        Ok(Self::new(&format.special_rules, load_keyword_rules(conn)?))
    }

    pub fn categorize(&self, conn: &Connection, description: &str, amount: f64) -> Result<Categorization> {
        if let Some(rule) = self
            .special_rules
            .iter()
            .find(|r| special_matches(r, description, amount))
        {
            return Ok(Categorization {
                category_id: get_or_create_category(conn, &rule.force_category)?,
                source: RuleSource::Special,
            });
        }

        if let Some(&category_id) = self.keywords.exact.get(description) {
            return Ok(Categorization {
                category_id,
                source: RuleSource::Exact,
            });
        }

        if let Some((_, category_id)) = self
            .keywords
            .includes
            .iter()
            .find(|(keyword, _)| description.contains(keyword.as_str()))
        {
            return Ok(Categorization {
                category_id: *category_id,
                source: RuleSource::Includes,
            });
        }

        Ok(Categorization {
            category_id: get_or_create_category(conn, UNCATEGORIZED)?,
            source: RuleSource::Default,
        })
    }
}
