//! Snapshot container and file handling.
//!
//! A snapshot is one human-readable text blob holding every exported
//! business table as a CSV section. This module owns the in-memory
//! representation and file loading (with transparent gzip); the
//! line-level format lives in [`parser`] and [`writer`].

pub mod parser;
pub mod writer;

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// One data row: display column name -> raw string value.
///
/// No type information survives serialization. Numeric, boolean and date
/// interpretation happens at restore time, per destination column.
pub type Row = BTreeMap<String, String>;

/// Display table names in the order sections are written to a snapshot.
/// Parents precede the tables that reference them, so a file read top to
/// bottom is also a valid restore order.
pub const SECTION_ORDER: &[&str] = &[
    "Areas",
    "Packages",
    "Customers",
    "PPPoE Accounts",
    "Payments",
    "Billing Records",
    "Invoices",
    "Invoice Items",
    "Transactions",
    "Support Tickets",
    "Call Records",
    "Reminder Logs",
    "Resellers",
];

/// Parsed snapshot: display table name -> ordered rows.
#[derive(Debug, Clone, Default)]
pub struct SnapshotData {
    pub tables: BTreeMap<String, Vec<Row>>,
}

impl SnapshotData {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// Parse snapshot text into table sections.
    pub fn parse(text: &str) -> Self {
        parser::parse(text)
    }

    /// Load a snapshot from a file (plain text or gzip).
    pub fn from_file(path: &Path) -> Result<Self> {
        use std::fs::File;
        use std::io::{BufReader, Read};

        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        // Check for gzip magic bytes
        let mut magic = [0u8; 2];
        reader.read_exact(&mut magic)?;

        // Reset to start
        drop(reader);
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut text = String::new();
        if magic == [0x1f, 0x8b] {
            let mut decoder = flate2::read::GzDecoder::new(reader);
            decoder.read_to_string(&mut text)?;
        } else {
            reader.read_to_string(&mut text)?;
        }

        Ok(parser::parse(&text))
    }

    /// Rows for a specific table, if present.
    pub fn get_table(&self, name: &str) -> Option<&Vec<Row>> {
        self.tables.get(name)
    }

    /// Names of the tables present in this snapshot.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    /// Total data rows across all sections.
    pub fn total_rows(&self) -> usize {
        self.tables.values().map(|rows| rows.len()).sum()
    }

    /// True when no section was recognized. Callers must refuse to
    /// restore such input.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
