//! The catalog item and the raw fields read from its detail view.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*").expect("digit pattern"));

/// Collapse every run of whitespace into a single space and trim.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One catalog entry, keyed by its business identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    pub source_url: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_path: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub stock: Option<StockQuantity>,
    #[serde(default)]
    pub datasheet_url: Option<String>,
    #[serde(default)]
    pub error_note: Option<String>,
}

impl Item {
    pub fn new<K: Into<String>, U: Into<String>>(key: K, source_url: U) -> Self {
        Self {
            key: key.into(),
            source_url: source_url.into(),
            package: String::new(),
            description: String::new(),
            category_path: String::new(),
            kind: String::new(),
            stock: None,
            datasheet_url: None,
            error_note: None,
        }
    }

    /// An item counts as enriched when it carries no error note and both
    /// mandatory text fields were found.
    pub fn is_enriched(&self) -> bool {
        self.error_note.is_none() && !self.package.is_empty() && !self.description.is_empty()
    }

    /// Copy extracted fields onto the item. Empty values never clear a
    /// field that is already set.
    pub fn populate(&mut self, fields: &DetailFields) {
        fill(&mut self.package, &fields.package);
        fill(&mut self.description, &fields.description);
        fill(&mut self.category_path, &fields.category_path);
        fill(&mut self.kind, &fields.kind);
        if let Some(stock) = StockQuantity::parse(&fields.stock) {
            self.stock = Some(stock);
        }
        let datasheet = normalize(&fields.datasheet);
        if !datasheet.is_empty() {
            self.datasheet_url = Some(datasheet);
        }
    }
}

fn fill(target: &mut String, value: &str) {
    if !value.is_empty() {
        *target = value.to_string();
    }
}

/// Stock as shown on the detail view: a count when the text holds digits,
/// otherwise the trimmed text as it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StockQuantity {
    Count(u64),
    Raw(String),
}

impl StockQuantity {
    /// Parse leniently: the first run of digits and commas wins, commas are
    /// dropped. Returns `None` for blank text.
    pub fn parse(text: &str) -> Option<Self> {
        let raw = normalize(text);
        if raw.is_empty() {
            return None;
        }
        // a run of digits too long for u64 saturates
        let count = DIGITS
            .find(&raw)
            .map(|m| m.as_str().replace(',', ""))
            .map(|digits| digits.parse::<u64>().unwrap_or(u64::MAX));
        Some(match count {
            Some(count) => StockQuantity::Count(count),
            None => StockQuantity::Raw(raw),
        })
    }
}

impl fmt::Display for StockQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockQuantity::Count(count) => write!(f, "{count}"),
            StockQuantity::Raw(raw) => f.write_str(raw),
        }
    }
}

/// A single read of the detail view. Empty strings mean "not rendered yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailFields {
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stock: String,
    #[serde(default)]
    pub category_path: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub datasheet: String,
}

impl DetailFields {
    pub fn normalized(self) -> Self {
        Self {
            package: normalize(&self.package),
            description: normalize(&self.description),
            stock: normalize(&self.stock),
            category_path: normalize(&self.category_path),
            kind: normalize(&self.kind),
            datasheet: normalize(&self.datasheet),
        }
    }

    /// Package, description and stock text are all present.
    pub fn mandatory_complete(&self) -> bool {
        !self.package.is_empty() && !self.description.is_empty() && !self.stock.is_empty()
    }

    pub fn has_category(&self) -> bool {
        !self.category_path.is_empty() || !self.kind.is_empty()
    }

    /// Category information and datasheet reference are both present.
    pub fn secondary_complete(&self) -> bool {
        self.has_category() && !self.datasheet.is_empty()
    }

    /// Merge a newer read into this one. Only empty fields are filled; a
    /// value once seen is kept.
    pub fn fill_gaps(&mut self, newer: DetailFields) {
        let newer = newer.normalized();
        let newer_has_category = newer.has_category();
        fill_empty(&mut self.package, newer.package);
        fill_empty(&mut self.description, newer.description);
        fill_empty(&mut self.stock, newer.stock);
        // path and type come from the same breadcrumb, keep them together
        if !self.has_category() && newer_has_category {
            self.category_path = newer.category_path;
            self.kind = newer.kind;
        }
        fill_empty(&mut self.datasheet, newer.datasheet);
    }
}

fn fill_empty(target: &mut String, value: String) {
    if target.is_empty() && !value.is_empty() {
        *target = value;
    }
}
