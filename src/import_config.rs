use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FortifiError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub import_formats: Vec<ImportFormat>,
}

/// How to read one source's statement export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportFormat {
    pub identifier: String,
    pub account_name: String,
    pub column_mapping: ColumnMapping,
    pub date_format: String,
    #[serde(default = "default_multiplier")]
    pub amount_multiplier: f64,
    #[serde(default)]
    pub track_balance: bool,
    #[serde(default)]
    pub blacklist_exact: Vec<String>,
    #[serde(default)]
    pub blacklist_contains: Vec<String>,
    #[serde(default)]
    pub special_rules: Vec<SpecialRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date: String,
    pub description: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialRule {
    pub description_exact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_exact: Option<f64>,
    pub force_category: String,
}

fn default_multiplier() -> f64 {
    1.0
}

impl ImportConfig {
    /// First declared format whose identifier occurs in the filename, ignoring case.
    pub fn find_format(&self, filename: &str) -> Option<&ImportFormat> {
        let lower = filename.to_lowercase();
        self.import_formats
            .iter()
            .find(|f| !f.identifier.is_empty() && lower.contains(&f.identifier.to_lowercase()))
    }
}

impl ImportFormat {
    pub fn is_blacklisted(&self, description: &str) -> bool {
        self.blacklist_exact.iter().any(|b| b == description)
            || self
                .blacklist_contains
                .iter()
                .any(|b| !b.is_empty() && description.contains(b.as_str()))
    }
}

pub fn load_import_config(path: &Path) -> Result<ImportConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        FortifiError::Config(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| FortifiError::Config(format!("{}: {e}", path.display())))
}
