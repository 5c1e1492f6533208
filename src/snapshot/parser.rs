//! Line-level snapshot parsing.
//!
//! Turns one serialized text blob into table sections. Pure and
//! synchronous; the caller decides what an empty result means.
//!
//! Recognized lines:
//! - `=== <TableName> (<N> records) ===` opens a new section. The declared
//!   count is informational only and is not enforced.
//! - Preamble (`=== FULL SYSTEM BACKUP`, `Generated: ...`,
//!   `Total Records: ...`, `<Label>: <n> records`) is discarded.
//! - The first other line inside a section is the CSV header row; every
//!   following line is a data row zipped positionally against the headers.
//!
//! Rows shorter than the header are padded with empty strings; excess
//! trailing fields are dropped. Blank lines and lines before any section
//! marker are ignored.

use super::{Row, SnapshotData};
use regex_lite::Regex;

/// Parse snapshot text into table sections.
pub fn parse(text: &str) -> SnapshotData {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let Ok(section_re) = Regex::new(r"^=== (.+) \((\d+) records\) ===\s*$") else {
        return SnapshotData::new();
    };
    let Ok(manifest_re) = Regex::new(r"^[^,]+: \d+ records\s*$") else {
        return SnapshotData::new();
    };

    let mut data = SnapshotData::new();
    let mut current: Option<String> = None;
    let mut headers: Option<Vec<String>> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        // Section markers take precedence over every other pattern.
        if let Some(caps) = section_re.captures(line) {
            let name = caps[1].to_string();
            data.tables.entry(name.clone()).or_default();
            current = Some(name);
            headers = None;
            continue;
        }

        if line.starts_with("=== FULL SYSTEM BACKUP")
            || line.starts_with("Generated: ")
            || line.starts_with("Total Records: ")
            || manifest_re.is_match(line)
        {
            continue;
        }

        let Some(table) = &current else {
            continue;
        };

        let fields = split_line(line);
        match &headers {
            None => headers = Some(fields),
            Some(cols) => {
                let mut row = Row::new();
                for (i, col) in cols.iter().enumerate() {
                    row.insert(col.clone(), fields.get(i).cloned().unwrap_or_default());
                }
                if let Some(rows) = data.tables.get_mut(table) {
                    rows.push(row);
                }
            }
        }
    }

    data
}

/// Split one line into CSV fields: comma separation, double-quote
/// delimited fields with embedded commas, doubled quotes inside quoted
/// fields. A line the reader cannot split is kept as a single field.
fn split_line(line: &str) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(|field| field.to_string()).collect(),
        _ => vec![line.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_section() {
        let data = parse("=== Areas (1 records) ===\nName,Description\nZone A,North district\n");
        let rows = data.get_table("Areas").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Name"], "Zone A");
        assert_eq!(rows[0]["Description"], "North district");
    }

    #[test]
    fn test_preamble_skipped() {
        let text = "=== FULL SYSTEM BACKUP ===\n\
                    Generated: 2025-06-01T10:00:00+00:00\n\
                    Total Records: 2\n\
                    \n\
                    Areas: 2 records\n\
                    \n\
                    === Areas (2 records) ===\n\
                    Name,Description\n\
                    Zone A,North\n\
                    Zone B,South\n";
        let data = parse(text);
        assert_eq!(data.table_names(), vec!["Areas"]);
        assert_eq!(data.get_table("Areas").unwrap().len(), 2);
    }

    #[test]
    fn test_quoted_fields() {
        let text = "=== Customers (1 records) ===\n\
                    User ID,Name,Address\n\
                    ISP00001,\"Doe, Jane\",\"12 \"\"Lake\"\" Rd\"\n";
        let data = parse(text);
        let row = &data.get_table("Customers").unwrap()[0];
        assert_eq!(row["Name"], "Doe, Jane");
        assert_eq!(row["Address"], "12 \"Lake\" Rd");
    }

    #[test]
    fn test_short_rows_padded() {
        let text = "=== Areas (1 records) ===\nName,Description\nZone A\n";
        let data = parse(text);
        let row = &data.get_table("Areas").unwrap()[0];
        assert_eq!(row["Name"], "Zone A");
        assert_eq!(row["Description"], "");
    }

    #[test]
    fn test_excess_fields_dropped() {
        let text = "=== Areas (1 records) ===\nName\nZone A,extra,fields\n";
        let data = parse(text);
        let row = &data.get_table("Areas").unwrap()[0];
        assert_eq!(row.len(), 1);
        assert_eq!(row["Name"], "Zone A");
    }

    #[test]
    fn test_bom_stripped() {
        let text = "\u{feff}=== Areas (1 records) ===\nName\nZone A\n";
        let data = parse(text);
        assert_eq!(data.get_table("Areas").unwrap().len(), 1);
    }

    #[test]
    fn test_lines_before_section_ignored() {
        let text = "junk line\nmore junk\n=== Areas (1 records) ===\nName\nZone A\n";
        let data = parse(text);
        assert_eq!(data.table_names(), vec!["Areas"]);
        assert_eq!(data.get_table("Areas").unwrap().len(), 1);
    }

    #[test]
    fn test_headers_reset_per_section() {
        let text = "=== Areas (1 records) ===\n\
                    Name,Description\n\
                    Zone A,North\n\
                    === Packages (1 records) ===\n\
                    Name,Speed\n\
                    Home 10M,10 Mbps\n";
        let data = parse(text);
        let pkg = &data.get_table("Packages").unwrap()[0];
        assert_eq!(pkg["Speed"], "10 Mbps");
        assert!(!pkg.contains_key("Description"));
    }

    #[test]
    fn test_declared_count_not_authoritative() {
        let text = "=== Areas (99 records) ===\nName\nZone A\n";
        let data = parse(text);
        assert_eq!(data.get_table("Areas").unwrap().len(), 1);
    }

    #[test]
    fn test_no_sections_yields_empty() {
        let data = parse("Generated: 2025-06-01\nTotal Records: 0\nrandom text\n");
        assert!(data.is_empty());
    }

    #[test]
    fn test_empty_section_kept() {
        let data = parse("=== Areas (0 records) ===\nName,Description\n");
        assert_eq!(data.get_table("Areas").unwrap().len(), 0);
        assert!(!data.is_empty());
    }

    #[test]
    fn test_crlf_lines() {
        let text = "=== Areas (1 records) ===\r\nName,Description\r\nZone A,North\r\n";
        let data = parse(text);
        assert_eq!(data.get_table("Areas").unwrap()[0]["Name"], "Zone A");
    }
}
