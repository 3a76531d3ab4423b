//! Snapshot loading
//!
//! A snapshot is the immutable set of categories and transactions that
//! every report runs against. Two formats are read:
//!
//! - JSON: `{ "categories": [...], "transactions": [...] }`
//! - CSV export: `Date,Amount,Category,Description,Payment Method,Tags`,
//!   where `Category` is a path such as `Food > Groceries` and the category
//!   tree is derived from the paths

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::categories::{CategoryTree, PATH_SEPARATOR};
use crate::error::{Error, Result};
use crate::models::{Category, Transaction};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Snapshot {
    pub fn new(categories: Vec<Category>, transactions: Vec<Transaction>) -> Self {
        Self {
            categories,
            transactions,
        }
    }

    /// Load a snapshot file, choosing the format by extension (`.csv` or JSON)
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        let snapshot = if is_csv {
            Self::from_csv_reader(reader)?
        } else {
            Self::from_json_reader(reader)?
        };

        debug!(
            path = %path.display(),
            categories = snapshot.categories.len(),
            transactions = snapshot.transactions.len(),
            "Snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Parse a CSV export; transaction ids follow row order starting at 1
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let columns = Columns::from_headers(&headers)?;
        let mut paths = PathRegistry::default();
        let mut transactions = Vec::new();

        for (index, result) in rdr.records().enumerate() {
            let record = result?;
            let row = index + 2;
            let id = index as i64 + 1;

            let date = parse_date(field(&record, Some(columns.date)), row)?;
            let amount = parse_amount(field(&record, Some(columns.amount)), row)?;
            let category_id = paths.resolve(field(&record, columns.category));

            let mut tx = Transaction::new(id, date, amount, category_id)
                .with_note(field(&record, columns.description))
                .with_tags(
                    field(&record, columns.tags)
                        .split(',')
                        .map(str::trim)
                        .filter(|tag| !tag.is_empty()),
                );
            let payment = field(&record, columns.payment_method);
            if !payment.is_empty() {
                tx.payment_method = Some(payment.to_string());
            }
            transactions.push(tx);
        }

        let snapshot = Self::new(paths.into_categories(), transactions);
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Build the category tree
    pub fn tree(&self) -> Result<CategoryTree> {
        CategoryTree::new(self.categories.clone())
    }

    /// Check the tree and every transaction; ids must be unique
    pub fn validate(&self) -> Result<()> {
        self.tree()?;
        let mut seen = HashSet::with_capacity(self.transactions.len());
        for tx in &self.transactions {
            tx.validate()?;
            if !seen.insert(tx.id) {
                return Err(Error::InvalidData(format!(
                    "duplicate transaction id {}",
                    tx.id
                )));
            }
        }
        Ok(())
    }
}

/// Column positions of a CSV export
struct Columns {
    date: usize,
    amount: usize,
    category: Option<usize>,
    description: Option<usize>,
    payment_method: Option<usize>,
    tags: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| Error::InvalidData(format!("CSV is missing the '{}' column", name)))
        };

        Ok(Self {
            date: required("Date")?,
            amount: required("Amount")?,
            category: find("Category"),
            description: find("Description"),
            payment_method: find("Payment Method"),
            tags: find("Tags"),
        })
    }
}

fn field(record: &StringRecord, column: Option<usize>) -> &str {
    column.and_then(|i| record.get(i)).unwrap_or("")
}

/// Assigns ids to category paths, creating parents on first sight
#[derive(Default)]
struct PathRegistry {
    ids: HashMap<String, i64>,
    categories: Vec<Category>,
}

impl PathRegistry {
    /// Id of the deepest segment; None for a path with no segments
    fn resolve(&mut self, path: &str) -> Option<i64> {
        let mut parent = None;
        let mut key = String::new();
        let separator = PATH_SEPARATOR.trim();

        for segment in path.split(separator).map(str::trim).filter(|s| !s.is_empty()) {
            if !key.is_empty() {
                key.push_str(PATH_SEPARATOR);
            }
            key.push_str(&segment.to_lowercase());

            let id = match self.ids.get(&key) {
                Some(id) => *id,
                None => {
                    let id = self.categories.len() as i64 + 1;
                    self.categories.push(Category::new(id, segment, parent));
                    self.ids.insert(key.clone(), id);
                    id
                }
            };
            parent = Some(id);
        }

        parent
    }

    fn into_categories(self) -> Vec<Category> {
        self.categories
    }
}

/// Parse a date in ISO or US format
fn parse_date(s: &str, row: usize) -> Result<NaiveDate> {
    let formats = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .ok_or_else(|| Error::InvalidData(format!("row {}: unable to parse date '{}'", row, s)))
}

/// Parse an amount, handling currency symbols, commas and parentheses
fn parse_amount(s: &str, row: usize) -> Result<f64> {
    let cleaned: String = s
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::InvalidData(format!("row {}: unable to parse amount '{}'", row, s)))
}
