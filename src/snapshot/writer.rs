//! Snapshot serialization.
//!
//! Emits the text format the parser consumes: a preamble, a per-table
//! manifest, then one CSV section per table. Section order and the header
//! row of every table are a fixed wire contract; restore looks fields up
//! by these exact display names.

use super::{Row, SECTION_ORDER, SnapshotData};
use anyhow::Result;

/// Header row for each section. The order here is the column order on
/// disk and must not change: existing snapshots in blob storage depend
/// on it.
pub fn section_headers(table: &str) -> &'static [&'static str] {
    match table {
        "Areas" => &["Name", "Description"],
        "Packages" => &["Name", "Speed", "Monthly Fee", "Description"],
        "Customers" => &[
            "User ID",
            "Name",
            "Phone",
            "Address",
            "Area",
            "Package",
            "Status",
            "Monthly Fee",
            "Balance",
            "Joined",
        ],
        "PPPoE Accounts" => &["User ID", "Username", "Profile", "Status"],
        "Payments" => &["User ID", "Amount", "Method", "Date", "Reference", "Notes"],
        "Billing Records" => &["User ID", "Billing Month", "Amount", "Status", "Generated"],
        "Invoices" => &["Invoice Number", "User ID", "Total", "Status", "Issued"],
        "Invoice Items" => &[
            "Invoice Number",
            "Description",
            "Quantity",
            "Unit Price",
            "Amount",
        ],
        "Transactions" => &["Category", "Type", "Amount", "Date", "Notes"],
        "Support Tickets" => &[
            "Ticket Number",
            "User ID",
            "Subject",
            "Status",
            "Priority",
            "Opened",
        ],
        "Call Records" => &["User ID", "Direction", "Duration", "Called At", "Notes"],
        "Reminder Logs" => &["User ID", "Channel", "Message", "Sent At"],
        "Resellers" => &["Code", "Name", "Phone", "Email", "Commission Rate"],
        _ => &[],
    }
}

/// Serialize a snapshot to text.
///
/// Tables not in [`SECTION_ORDER`] are skipped; the wire format only
/// carries the known sections.
pub fn write(data: &SnapshotData) -> Result<String> {
    let mut out = String::new();

    out.push_str("=== FULL SYSTEM BACKUP ===\n");
    out.push_str(&format!("Generated: {}\n", chrono::Utc::now().to_rfc3339()));
    out.push_str(&format!("Total Records: {}\n\n", data.total_rows()));

    for name in SECTION_ORDER {
        if let Some(rows) = data.get_table(name) {
            out.push_str(&format!("{}: {} records\n", name, rows.len()));
        }
    }
    out.push('\n');

    for name in SECTION_ORDER {
        let Some(rows) = data.get_table(name) else {
            continue;
        };
        out.push_str(&format!("=== {} ({} records) ===\n", name, rows.len()));
        out.push_str(&csv_section(section_headers(name), rows)?);
        out.push('\n');
    }

    Ok(out)
}

/// Render one section's header and data rows as CSV. The parser is
/// line-oriented, so embedded newlines in values are flattened to spaces
/// before quoting.
fn csv_section(headers: &[&str], rows: &[Row]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;

    for row in rows {
        let record: Vec<String> = headers
            .iter()
            .map(|h| {
                row.get(*h)
                    .map(|v| v.replace(['\r', '\n'], " "))
                    .unwrap_or_default()
            })
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("csv flush failed: {}", e))?;
    Ok(String::from_utf8(bytes)?)
}
