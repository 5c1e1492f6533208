//! Snapshot export queries.
//!
//! Each table family is read with its surrogate ids joined back out to
//! natural keys, so sections carry user IDs, area names and invoice
//! numbers instead of rowids. Queries order by natural key (or by rowid
//! for the event logs) to keep output deterministic.

use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;

use super::Database;
use crate::snapshot::{Row, SECTION_ORDER, SnapshotData};

impl Database {
    /// Export every snapshot-carried table family.
    ///
    /// All sections are always present, empty ones included; the section
    /// list and column headers are a fixed wire contract.
    pub fn export_snapshot(&self) -> Result<SnapshotData> {
        self.with_conn(|conn| {
            let mut data = SnapshotData::new();

            for table in SECTION_ORDER {
                let rows = match *table {
                    "Areas" => export_areas(conn)?,
                    "Packages" => export_packages(conn)?,
                    "Customers" => export_customers(conn)?,
                    "PPPoE Accounts" => export_pppoe_accounts(conn)?,
                    "Payments" => export_payments(conn)?,
                    "Billing Records" => export_billing_records(conn)?,
                    "Invoices" => export_invoices(conn)?,
                    "Invoice Items" => export_invoice_items(conn)?,
                    "Transactions" => export_transactions(conn)?,
                    "Support Tickets" => export_support_tickets(conn)?,
                    "Call Records" => export_call_records(conn)?,
                    "Reminder Logs" => export_reminder_logs(conn)?,
                    "Resellers" => export_resellers(conn)?,
                    _ => continue,
                };
                debug!(table = *table, rows = rows.len(), "Exported table");
                data.tables.insert(table.to_string(), rows);
            }

            Ok(data)
        })
    }
}

fn export_areas(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT name, COALESCE(description, '') FROM areas ORDER BY name",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("Name", r.get::<_, String>(0)?),
                ("Description", r.get::<_, String>(1)?),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn export_packages(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT name, COALESCE(speed, ''), monthly_fee, COALESCE(description, '')
         FROM packages ORDER BY name",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("Name", r.get::<_, String>(0)?),
                ("Speed", r.get::<_, String>(1)?),
                ("Monthly Fee", r.get::<_, f64>(2)?.to_string()),
                ("Description", r.get::<_, String>(3)?),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn export_customers(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT c.user_id, c.name, c.phone, c.address,
                COALESCE(a.name, ''), COALESCE(p.name, ''),
                c.status, c.monthly_fee, c.balance, COALESCE(c.joined_on, '')
         FROM customers c
         LEFT JOIN areas a ON a.id = c.area_id
         LEFT JOIN packages p ON p.id = c.package_id
         ORDER BY c.user_id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("User ID", r.get::<_, String>(0)?),
                ("Name", r.get::<_, String>(1)?),
                ("Phone", r.get::<_, String>(2)?),
                ("Address", r.get::<_, String>(3)?),
                ("Area", r.get::<_, String>(4)?),
                ("Package", r.get::<_, String>(5)?),
                ("Status", r.get::<_, String>(6)?),
                ("Monthly Fee", r.get::<_, f64>(7)?.to_string()),
                ("Balance", r.get::<_, f64>(8)?.to_string()),
                ("Joined", r.get::<_, String>(9)?),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn export_pppoe_accounts(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT c.user_id, p.username, COALESCE(p.profile, ''), p.status
         FROM pppoe_accounts p
         JOIN customers c ON c.id = p.customer_id
         ORDER BY c.user_id, p.username",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("User ID", r.get::<_, String>(0)?),
                ("Username", r.get::<_, String>(1)?),
                ("Profile", r.get::<_, String>(2)?),
                ("Status", r.get::<_, String>(3)?),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn export_payments(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT c.user_id, p.amount, p.method, p.paid_on,
                COALESCE(p.reference, ''), COALESCE(p.notes, '')
         FROM payments p
         JOIN customers c ON c.id = p.customer_id
         ORDER BY p.id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("User ID", r.get::<_, String>(0)?),
                ("Amount", r.get::<_, f64>(1)?.to_string()),
                ("Method", r.get::<_, String>(2)?),
                ("Date", r.get::<_, String>(3)?),
                ("Reference", r.get::<_, String>(4)?),
                ("Notes", r.get::<_, String>(5)?),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn export_billing_records(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT c.user_id, b.billing_month, b.amount, b.status, COALESCE(b.generated_on, '')
         FROM billing_records b
         JOIN customers c ON c.id = b.customer_id
         ORDER BY b.id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("User ID", r.get::<_, String>(0)?),
                ("Billing Month", r.get::<_, String>(1)?),
                ("Amount", r.get::<_, f64>(2)?.to_string()),
                ("Status", r.get::<_, String>(3)?),
                ("Generated", r.get::<_, String>(4)?),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn export_invoices(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT i.invoice_number, c.user_id, i.total, i.status, COALESCE(i.issued_on, '')
         FROM invoices i
         JOIN customers c ON c.id = i.customer_id
         ORDER BY i.invoice_number",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("Invoice Number", r.get::<_, String>(0)?),
                ("User ID", r.get::<_, String>(1)?),
                ("Total", r.get::<_, f64>(2)?.to_string()),
                ("Status", r.get::<_, String>(3)?),
                ("Issued", r.get::<_, String>(4)?),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn export_invoice_items(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT i.invoice_number, t.description, t.quantity, t.unit_price, t.amount
         FROM invoice_items t
         JOIN invoices i ON i.id = t.invoice_id
         ORDER BY i.invoice_number, t.id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("Invoice Number", r.get::<_, String>(0)?),
                ("Description", r.get::<_, String>(1)?),
                ("Quantity", r.get::<_, f64>(2)?.to_string()),
                ("Unit Price", r.get::<_, f64>(3)?.to_string()),
                ("Amount", r.get::<_, f64>(4)?.to_string()),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn export_transactions(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT COALESCE(g.name, ''), t.kind, t.amount, t.entry_date, COALESCE(t.notes, '')
         FROM transactions t
         LEFT JOIN transaction_categories g ON g.id = t.category_id
         ORDER BY t.id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("Category", r.get::<_, String>(0)?),
                ("Type", r.get::<_, String>(1)?),
                ("Amount", r.get::<_, f64>(2)?.to_string()),
                ("Date", r.get::<_, String>(3)?),
                ("Notes", r.get::<_, String>(4)?),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn export_support_tickets(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT t.ticket_number, c.user_id, t.subject, t.status, t.priority,
                COALESCE(t.opened_at, '')
         FROM support_tickets t
         JOIN customers c ON c.id = t.customer_id
         ORDER BY t.ticket_number",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("Ticket Number", r.get::<_, String>(0)?),
                ("User ID", r.get::<_, String>(1)?),
                ("Subject", r.get::<_, String>(2)?),
                ("Status", r.get::<_, String>(3)?),
                ("Priority", r.get::<_, String>(4)?),
                ("Opened", r.get::<_, String>(5)?),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn export_call_records(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT c.user_id, l.direction, l.duration_secs, COALESCE(l.called_at, ''),
                COALESCE(l.notes, '')
         FROM call_records l
         JOIN customers c ON c.id = l.customer_id
         ORDER BY l.id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("User ID", r.get::<_, String>(0)?),
                ("Direction", r.get::<_, String>(1)?),
                ("Duration", r.get::<_, i64>(2)?.to_string()),
                ("Called At", r.get::<_, String>(3)?),
                ("Notes", r.get::<_, String>(4)?),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn export_reminder_logs(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT c.user_id, l.channel, COALESCE(l.message, ''), COALESCE(l.sent_at, '')
         FROM reminder_logs l
         JOIN customers c ON c.id = l.customer_id
         ORDER BY l.id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("User ID", r.get::<_, String>(0)?),
                ("Channel", r.get::<_, String>(1)?),
                ("Message", r.get::<_, String>(2)?),
                ("Sent At", r.get::<_, String>(3)?),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn export_resellers(conn: &Connection) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(
        "SELECT code, name, COALESCE(phone, ''), COALESCE(email, ''), commission_rate
         FROM resellers ORDER BY code",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(make_row(&[
                ("Code", r.get::<_, String>(0)?),
                ("Name", r.get::<_, String>(1)?),
                ("Phone", r.get::<_, String>(2)?),
                ("Email", r.get::<_, String>(3)?),
                ("Commission Rate", r.get::<_, f64>(4)?.to_string()),
            ]))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn make_row(fields: &[(&str, String)]) -> Row {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn seed_minimal(db: &Database) {
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO areas (name, description, created_at) VALUES ('Zone A', 'North', 0)",
                [],
            )?;
            conn.execute(
                "INSERT INTO packages (name, speed, monthly_fee, created_at)
                 VALUES ('Basic 10M', '10 Mbps', 500.0, 0)",
                [],
            )?;
            conn.execute(
                "INSERT INTO customers (user_id, name, phone, address, area_id, package_id,
                                        status, monthly_fee, balance, password_hash, created_at)
                 VALUES ('ISP00001', 'Rahim Uddin', '8801712345678', 'N/A', 1, 1,
                         'active', 500.0, 0.0, 'x', 0)",
                [],
            )?;
            conn.execute(
                "INSERT INTO payments (customer_id, amount, method, paid_on, created_at)
                 VALUES (1, 500.0, 'cash', '2025-01-05', 0)",
                params![],
            )?;
            Ok(())
        })
        .expect("seed failed");
    }

    #[test]
    fn test_export_has_all_sections() {
        let db = Database::open_in_memory().unwrap();
        let data = db.export_snapshot().unwrap();
        for table in SECTION_ORDER {
            assert!(data.tables.contains_key(*table), "missing section {}", table);
        }
    }

    #[test]
    fn test_export_joins_natural_keys() {
        let db = Database::open_in_memory().unwrap();
        seed_minimal(&db);

        let data = db.export_snapshot().unwrap();

        let customers = data.get_table("Customers").unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0]["User ID"], "ISP00001");
        assert_eq!(customers[0]["Area"], "Zone A");
        assert_eq!(customers[0]["Package"], "Basic 10M");
        assert_eq!(customers[0]["Monthly Fee"], "500");

        let payments = data.get_table("Payments").unwrap();
        assert_eq!(payments[0]["User ID"], "ISP00001");
        assert_eq!(payments[0]["Method"], "cash");
    }

    #[test]
    fn test_export_orders_by_natural_key() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute("INSERT INTO areas (name, created_at) VALUES ('Zone B', 0)", [])?;
            conn.execute("INSERT INTO areas (name, created_at) VALUES ('Zone A', 0)", [])?;
            Ok(())
        })
        .unwrap();

        let data = db.export_snapshot().unwrap();
        let areas = data.get_table("Areas").unwrap();
        assert_eq!(areas[0]["Name"], "Zone A");
        assert_eq!(areas[1]["Name"], "Zone B");
    }
}
