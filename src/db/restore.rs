//! Dependency-ordered snapshot restore.
//!
//! Rebuilds the dataset from parsed snapshot sections:
//! - optional destructive wipe, children deleted strictly before parents
//! - table families restored in forward dependency order, anchors first
//! - natural keys resolved to surrogate rowids through per-run key maps
//!   passed explicitly from pass to pass
//! - idempotent upserts for dedup-keyed tables, plain appends for the
//!   event-log tables
//! - per-row fault isolation: a failed row lands in that table's error
//!   list and the loop moves on
//!
//! The whole run is a single-threaded blocking sequence. Rows within a
//! family execute one at a time so natural-key checks observe earlier
//! inserts; there is no wrapping transaction, every statement commits
//! independently.

use anyhow::Result;
use rusqlite::{Connection, params};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::resolve::{self, KeyMap};
use super::{Database, now_ms, today};
use crate::credentials::CredentialHasher;
use crate::error::SnapshotError;
use crate::snapshot::{Row, SnapshotData};

/// Placeholder written into restored PPPoE password columns. Network
/// credentials are a separate domain from the portal password hash and
/// are never carried in snapshots.
pub const PPPOE_PASSWORD_PLACEHOLDER: &str = "RESET_REQUIRED";

/// Tables cleared by a destructive restore, children strictly before the
/// tables they reference by foreign key. Hand-maintained rather than
/// derived; foreign keys stay enforced during the wipe, so this order is
/// load-bearing. `transactions` and `transaction_categories` are
/// deliberately absent: ledger entries survive operational reloads.
pub const WIPE_ORDER: &[&str] = &[
    "invoice_items",
    "invoices",
    "payments",
    "billing_records",
    "reseller_commissions",
    "reseller_customers",
    "ticket_comments",
    "support_tickets",
    "service_tasks",
    "stock_movements",
    "usage_logs",
    "asset_assignments",
    "inventory_items",
    "leave_requests",
    "call_records",
    "reminder_logs",
    "pppoe_accounts",
    "customers",
    "resellers",
    "packages",
    "areas",
];

/// Options controlling restore behavior.
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Wipe all operational data (in [`WIPE_ORDER`]) before restoring.
    pub clean_existing: bool,
    /// Turn unresolved references into row errors instead of silent
    /// skips. Off by default: snapshots legitimately contain partial and
    /// legacy rows.
    pub strict_references: bool,
    /// Plaintext handed to the credential collaborator once per run; the
    /// resulting hash is assigned to every restored customer and
    /// reseller account.
    pub seed_password: String,
    /// Country prefix for phone normalization.
    pub country_prefix: String,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            clean_existing: false,
            strict_references: false,
            seed_password: "changeme123".to_string(),
            country_prefix: "880".to_string(),
        }
    }
}

impl RestoreOptions {
    /// Wipe existing data before restoring (builder pattern).
    pub fn with_clean(mut self) -> Self {
        self.clean_existing = true;
        self
    }

    /// Report unresolved references as row errors (builder pattern).
    pub fn with_strict_references(mut self) -> Self {
        self.strict_references = true;
        self
    }

    /// Set the seed password for replacement credentials (builder pattern).
    pub fn with_seed_password(mut self, password: impl Into<String>) -> Self {
        self.seed_password = password.into();
        self
    }
}

/// Per-table restore outcome.
///
/// `success` counts rows newly inserted or matched existing rows by
/// natural key. `skipped` counts rows omitted for a missing natural key
/// or an unresolved reference; they are neither successes nor errors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableOutcome {
    pub success: usize,
    pub errors: Vec<String>,
    pub skipped: usize,
}

/// Result of a restore run.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    /// True whenever the run completed; row errors do not flip it.
    pub success: bool,
    pub total_restored: usize,
    pub total_errors: usize,
    /// Per-table breakdown, keyed by display table name.
    pub details: BTreeMap<String, TableOutcome>,
}

impl RestoreReport {
    fn from_details(details: BTreeMap<String, TableOutcome>) -> Self {
        let total_restored = details.values().map(|o| o.success).sum();
        let total_errors = details.values().map(|o| o.errors.len()).sum();
        Self {
            success: true,
            total_restored,
            total_errors,
            details,
        }
    }

    /// Total rows omitted across all tables.
    pub fn total_skipped(&self) -> usize {
        self.details.values().map(|o| o.skipped).sum()
    }
}

impl Database {
    /// Restore a parsed snapshot into the store.
    ///
    /// Runs the fixed pass sequence: optional wipe, credential seeding,
    /// anchors (areas, packages), customers, then every customer-scoped
    /// family, invoices before their items, and resellers last. Key maps
    /// built by each pass flow forward as plain values.
    ///
    /// The only hard failures are an empty table map and a credential
    /// seeding error; everything else is reported in the returned
    /// [`RestoreReport`].
    pub fn restore_snapshot(
        &self,
        data: &SnapshotData,
        options: &RestoreOptions,
        hasher: &dyn CredentialHasher,
    ) -> Result<RestoreReport> {
        // Exclusive for the whole invocation, wipe included. The
        // connection mutex only serializes single statements.
        let _gate = self.lock_restore();

        if data.is_empty() {
            return Err(SnapshotError::NoDataSections.into());
        }

        info!(
            tables = data.tables.len(),
            total_rows = data.total_rows(),
            clean = options.clean_existing,
            "Starting snapshot restore"
        );

        if options.clean_existing {
            let cleared = self.wipe_all_data()?;
            info!(tables_cleared = cleared.len(), "Existing data wiped");
        }

        // One replacement hash for every restored account; plaintext
        // credentials never appear in a snapshot.
        let seeded_hash = hasher
            .hash(&options.seed_password)
            .map_err(|e| SnapshotError::CredentialSeed(e.to_string()))?;

        let details = self.with_conn(|conn| {
            let mut details: BTreeMap<String, TableOutcome> = BTreeMap::new();

            let area_map = restore_areas(conn, data, &mut details)?;
            let package_map = restore_packages(conn, data, &mut details)?;
            let customer_map = restore_customers(
                conn,
                data,
                options,
                &seeded_hash,
                &area_map,
                &package_map,
                &mut details,
            )?;

            restore_pppoe_accounts(conn, data, options, &customer_map, &mut details)?;
            restore_payments(conn, data, options, &customer_map, &mut details)?;
            restore_billing_records(conn, data, options, &customer_map, &mut details)?;

            let invoice_map = restore_invoices(conn, data, options, &customer_map, &mut details)?;
            restore_invoice_items(conn, data, options, &invoice_map, &mut details)?;

            restore_transactions(conn, data, options, &mut details)?;

            let _ticket_map =
                restore_support_tickets(conn, data, options, &customer_map, &mut details)?;
            restore_call_records(conn, data, options, &customer_map, &mut details)?;
            restore_reminder_logs(conn, data, options, &customer_map, &mut details)?;

            restore_resellers(conn, data, &seeded_hash, &mut details)?;

            Ok(details)
        })?;

        let report = RestoreReport::from_details(details);
        info!(
            total_restored = report.total_restored,
            total_errors = report.total_errors,
            total_skipped = report.total_skipped(),
            "Restore complete"
        );
        Ok(report)
    }

    /// Delete all rows from every table in [`WIPE_ORDER`].
    ///
    /// Best-effort: a failed DELETE is logged and the wipe continues to
    /// the next table. Each statement commits on its own.
    ///
    /// Returns rows deleted per table.
    pub fn wipe_all_data(&self) -> Result<BTreeMap<String, usize>> {
        self.with_conn(|conn| {
            let mut deleted = BTreeMap::new();

            for table in WIPE_ORDER {
                match conn.execute(&format!("DELETE FROM {}", table), []) {
                    Ok(count) => {
                        if count > 0 {
                            deleted.insert(table.to_string(), count);
                        }
                    }
                    Err(e) => {
                        warn!(table = *table, error = %e, "Wipe failed for table, continuing");
                    }
                }
            }

            Ok(deleted)
        })
    }
}

/// Restore the Areas anchor table. Returns the complete name -> id map,
/// pre-existing rows included.
fn restore_areas(
    conn: &Connection,
    data: &SnapshotData,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<KeyMap> {
    if let Some(rows) = data.get_table("Areas") {
        let mut outcome = TableOutcome::default();

        for row in rows {
            let name = field(row, "Name");
            if name.is_empty() {
                outcome.skipped += 1;
                continue;
            }

            match ensure_area(conn, &name, row) {
                Ok(_) => outcome.success += 1,
                Err(e) => outcome.errors.push(format!("{}: {}", name, e)),
            }
        }

        record(details, "Areas", outcome);
    }

    resolve::load_key_map(conn, "areas", "name")
}

fn ensure_area(conn: &Connection, name: &str, row: &Row) -> Result<i64> {
    if let Some(id) = resolve::lookup_id(conn, "areas", "name", name)? {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO areas (name, description, created_at) VALUES (?1, ?2, ?3)",
        params![name, opt_text(field(row, "Description")), now_ms()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Restore the Packages anchor table. Same pattern as Areas.
fn restore_packages(
    conn: &Connection,
    data: &SnapshotData,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<KeyMap> {
    if let Some(rows) = data.get_table("Packages") {
        let mut outcome = TableOutcome::default();

        for row in rows {
            let name = field(row, "Name");
            if name.is_empty() {
                outcome.skipped += 1;
                continue;
            }

            match ensure_package(conn, &name, row) {
                Ok(_) => outcome.success += 1,
                Err(e) => outcome.errors.push(format!("{}: {}", name, e)),
            }
        }

        record(details, "Packages", outcome);
    }

    resolve::load_key_map(conn, "packages", "name")
}

fn ensure_package(conn: &Connection, name: &str, row: &Row) -> Result<i64> {
    if let Some(id) = resolve::lookup_id(conn, "packages", "name", name)? {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO packages (name, speed, monthly_fee, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            name,
            opt_text(field(row, "Speed")),
            num_or(&field(row, "Monthly Fee"), 0.0),
            opt_text(field(row, "Description")),
            now_ms(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Restore Customers, keyed by external user ID.
///
/// Existing user IDs are reused untouched. New rows get a normalized
/// phone, placeholder contact fields where the snapshot is silent, area
/// and package references resolved through the anchor maps, and the
/// seeded credential. Rows without a user ID or name are skipped.
fn restore_customers(
    conn: &Connection,
    data: &SnapshotData,
    options: &RestoreOptions,
    seeded_hash: &str,
    area_map: &KeyMap,
    package_map: &KeyMap,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<KeyMap> {
    let mut map = KeyMap::new();

    if let Some(rows) = data.get_table("Customers") {
        let mut outcome = TableOutcome::default();
        let mut insert = conn.prepare(
            "INSERT INTO customers (user_id, name, phone, address, area_id, package_id,
                                    status, monthly_fee, balance, password_hash, joined_on,
                                    created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;

        for row in rows {
            let user_id = field(row, "User ID");
            let name = field(row, "Name");
            if user_id.is_empty() || name.is_empty() {
                outcome.skipped += 1;
                continue;
            }

            // Idempotent path: reuse the existing row, never overwrite.
            match resolve::lookup_id(conn, "customers", "user_id", &user_id) {
                Ok(Some(id)) => {
                    map.insert(user_id, id);
                    outcome.success += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    outcome.errors.push(format!("{}: {}", user_id, e));
                    continue;
                }
            }

            let area_id = match resolve_ref(area_map, &field(row, "Area"), options, "area") {
                Ok(id) => id,
                Err(msg) => {
                    outcome.errors.push(format!("{}: {}", user_id, msg));
                    continue;
                }
            };
            let package_id =
                match resolve_ref(package_map, &field(row, "Package"), options, "package") {
                    Ok(id) => id,
                    Err(msg) => {
                        outcome.errors.push(format!("{}: {}", user_id, msg));
                        continue;
                    }
                };

            let phone = text_or(
                normalize_phone(&field(row, "Phone"), &options.country_prefix),
                "N/A",
            );
            let address = text_or(field(row, "Address"), "N/A");

            let inserted = insert.execute(params![
                user_id,
                name,
                phone,
                address,
                area_id,
                package_id,
                text_or(field(row, "Status"), "active"),
                num_or(&field(row, "Monthly Fee"), 0.0),
                num_or(&field(row, "Balance"), 0.0),
                seeded_hash,
                opt_text(field(row, "Joined")),
                now_ms(),
            ]);
            match inserted {
                Ok(_) => {
                    map.insert(user_id, conn.last_insert_rowid());
                    outcome.success += 1;
                }
                Err(e) => outcome.errors.push(format!("{}: {}", user_id, e)),
            }
        }

        record(details, "Customers", outcome);
    }

    // Merge a full re-read: covers rows matched inside the loop and any
    // customers that predate this run.
    for (user_id, id) in resolve::load_key_map(conn, "customers", "user_id")? {
        map.entry(user_id).or_insert(id);
    }
    Ok(map)
}

/// Restore PPPoE accounts, deduplicated by (customer, username).
/// The password column gets a fixed placeholder, not the seeded hash.
fn restore_pppoe_accounts(
    conn: &Connection,
    data: &SnapshotData,
    options: &RestoreOptions,
    customer_map: &KeyMap,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<()> {
    let Some(rows) = data.get_table("PPPoE Accounts") else {
        return Ok(());
    };

    let mut outcome = TableOutcome::default();
    let mut insert = conn.prepare(
        "INSERT INTO pppoe_accounts (customer_id, username, password, profile, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for row in rows {
        let username = field(row, "Username");
        if username.is_empty() {
            outcome.skipped += 1;
            continue;
        }

        let customer_id =
            match resolve_ref(customer_map, &field(row, "User ID"), options, "customer") {
                Ok(Some(id)) => id,
                Ok(None) => {
                    outcome.skipped += 1;
                    continue;
                }
                Err(msg) => {
                    outcome.errors.push(format!("{}: {}", username, msg));
                    continue;
                }
            };

        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM pppoe_accounts WHERE customer_id = ?1 AND username = ?2",
                params![customer_id, &username],
                |_| Ok(true),
            )
            .unwrap_or(false);
        if exists {
            outcome.success += 1;
            continue;
        }

        let inserted = insert.execute(params![
            customer_id,
            username,
            PPPOE_PASSWORD_PLACEHOLDER,
            opt_text(field(row, "Profile")),
            text_or(field(row, "Status"), "active"),
            now_ms(),
        ]);
        match inserted {
            Ok(_) => outcome.success += 1,
            Err(e) => outcome.errors.push(format!("{}: {}", username, e)),
        }
    }

    record(details, "PPPoE Accounts", outcome);
    Ok(())
}

/// Restore Payments. Event log: always inserted, no dedup key.
fn restore_payments(
    conn: &Connection,
    data: &SnapshotData,
    options: &RestoreOptions,
    customer_map: &KeyMap,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<()> {
    let Some(rows) = data.get_table("Payments") else {
        return Ok(());
    };

    let mut outcome = TableOutcome::default();
    let mut insert = conn.prepare(
        "INSERT INTO payments (customer_id, amount, method, paid_on, reference, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    for row in rows {
        let user_id = field(row, "User ID");
        let customer_id = match resolve_ref(customer_map, &user_id, options, "customer") {
            Ok(Some(id)) => id,
            Ok(None) => {
                outcome.skipped += 1;
                continue;
            }
            Err(msg) => {
                outcome.errors.push(format!("{}: {}", user_id, msg));
                continue;
            }
        };

        let method = text_or(field(row, "Method").to_lowercase(), "cash");
        let paid_on = text_or(field(row, "Date"), &today());

        let inserted = insert.execute(params![
            customer_id,
            num_or(&field(row, "Amount"), 0.0),
            method,
            paid_on,
            opt_text(field(row, "Reference")),
            opt_text(field(row, "Notes")),
            now_ms(),
        ]);
        match inserted {
            Ok(_) => outcome.success += 1,
            Err(e) => outcome.errors.push(format!("{}: {}", user_id, e)),
        }
    }

    record(details, "Payments", outcome);
    Ok(())
}

/// Restore Billing Records. Event log: always inserted.
fn restore_billing_records(
    conn: &Connection,
    data: &SnapshotData,
    options: &RestoreOptions,
    customer_map: &KeyMap,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<()> {
    let Some(rows) = data.get_table("Billing Records") else {
        return Ok(());
    };

    let mut outcome = TableOutcome::default();
    let mut insert = conn.prepare(
        "INSERT INTO billing_records (customer_id, billing_month, amount, status, generated_on,
                                      created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for row in rows {
        let user_id = field(row, "User ID");
        let customer_id = match resolve_ref(customer_map, &user_id, options, "customer") {
            Ok(Some(id)) => id,
            Ok(None) => {
                outcome.skipped += 1;
                continue;
            }
            Err(msg) => {
                outcome.errors.push(format!("{}: {}", user_id, msg));
                continue;
            }
        };

        let inserted = insert.execute(params![
            customer_id,
            field(row, "Billing Month"),
            num_or(&field(row, "Amount"), 0.0),
            text_or(field(row, "Status"), "unpaid"),
            opt_text(field(row, "Generated")),
            now_ms(),
        ]);
        match inserted {
            Ok(_) => outcome.success += 1,
            Err(e) => outcome.errors.push(format!("{}: {}", user_id, e)),
        }
    }

    record(details, "Billing Records", outcome);
    Ok(())
}

/// Restore Invoices, deduplicated by invoice number. Returns the
/// invoice number -> id map as a union of this pass and every invoice
/// already in the store.
fn restore_invoices(
    conn: &Connection,
    data: &SnapshotData,
    options: &RestoreOptions,
    customer_map: &KeyMap,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<KeyMap> {
    let mut map = KeyMap::new();

    if let Some(rows) = data.get_table("Invoices") {
        let mut outcome = TableOutcome::default();
        let mut insert = conn.prepare(
            "INSERT INTO invoices (invoice_number, customer_id, total, status, issued_on,
                                   created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;

        for row in rows {
            let number = field(row, "Invoice Number");
            if number.is_empty() {
                outcome.skipped += 1;
                continue;
            }

            match resolve::lookup_id(conn, "invoices", "invoice_number", &number) {
                Ok(Some(id)) => {
                    map.insert(number, id);
                    outcome.success += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    outcome.errors.push(format!("{}: {}", number, e));
                    continue;
                }
            }

            let customer_id =
                match resolve_ref(customer_map, &field(row, "User ID"), options, "customer") {
                    Ok(Some(id)) => id,
                    Ok(None) => {
                        outcome.skipped += 1;
                        continue;
                    }
                    Err(msg) => {
                        outcome.errors.push(format!("{}: {}", number, msg));
                        continue;
                    }
                };

            let inserted = insert.execute(params![
                number,
                customer_id,
                num_or(&field(row, "Total"), 0.0),
                text_or(field(row, "Status"), "unpaid"),
                opt_text(field(row, "Issued")),
                now_ms(),
            ]);
            match inserted {
                Ok(_) => {
                    map.insert(number, conn.last_insert_rowid());
                    outcome.success += 1;
                }
                Err(e) => outcome.errors.push(format!("{}: {}", number, e)),
            }
        }

        record(details, "Invoices", outcome);
    }

    for (number, id) in resolve::load_key_map(conn, "invoices", "invoice_number")? {
        map.entry(number).or_insert(id);
    }
    Ok(map)
}

/// Restore Invoice Items against the invoice-number map.
fn restore_invoice_items(
    conn: &Connection,
    data: &SnapshotData,
    options: &RestoreOptions,
    invoice_map: &KeyMap,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<()> {
    let Some(rows) = data.get_table("Invoice Items") else {
        return Ok(());
    };

    let mut outcome = TableOutcome::default();
    let mut insert = conn.prepare(
        "INSERT INTO invoice_items (invoice_id, description, quantity, unit_price, amount)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    for row in rows {
        let number = field(row, "Invoice Number");
        let invoice_id = match resolve_ref(invoice_map, &number, options, "invoice") {
            Ok(Some(id)) => id,
            Ok(None) => {
                outcome.skipped += 1;
                continue;
            }
            Err(msg) => {
                outcome.errors.push(format!("{}: {}", number, msg));
                continue;
            }
        };

        let inserted = insert.execute(params![
            invoice_id,
            field(row, "Description"),
            num_or(&field(row, "Quantity"), 1.0),
            num_or(&field(row, "Unit Price"), 0.0),
            num_or(&field(row, "Amount"), 0.0),
        ]);
        match inserted {
            Ok(_) => outcome.success += 1,
            Err(e) => outcome.errors.push(format!("{}: {}", number, e)),
        }
    }

    record(details, "Invoice Items", outcome);
    Ok(())
}

/// Restore Transactions. Categories are managed by the accounting module
/// and only referenced here; rows with an unknown category are skipped.
fn restore_transactions(
    conn: &Connection,
    data: &SnapshotData,
    options: &RestoreOptions,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<()> {
    let Some(rows) = data.get_table("Transactions") else {
        return Ok(());
    };

    let category_map = resolve::load_key_map(conn, "transaction_categories", "name")?;

    let mut outcome = TableOutcome::default();
    let mut insert = conn.prepare(
        "INSERT INTO transactions (category_id, kind, amount, entry_date, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for row in rows {
        let category = field(row, "Category");
        let category_id = match resolve_ref(&category_map, &category, options, "category") {
            Ok(Some(id)) => id,
            Ok(None) => {
                outcome.skipped += 1;
                continue;
            }
            Err(msg) => {
                outcome.errors.push(format!("{}: {}", category, msg));
                continue;
            }
        };

        let inserted = insert.execute(params![
            category_id,
            text_or(field(row, "Type"), "income"),
            num_or(&field(row, "Amount"), 0.0),
            field(row, "Date"),
            opt_text(field(row, "Notes")),
            now_ms(),
        ]);
        match inserted {
            Ok(_) => outcome.success += 1,
            Err(e) => outcome.errors.push(format!("{}: {}", category, e)),
        }
    }

    record(details, "Transactions", outcome);
    Ok(())
}

/// Restore Support Tickets, deduplicated by ticket number. Returns the
/// ticket number -> id map for parity with the other dedup-keyed passes.
fn restore_support_tickets(
    conn: &Connection,
    data: &SnapshotData,
    options: &RestoreOptions,
    customer_map: &KeyMap,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<KeyMap> {
    let mut map = KeyMap::new();

    if let Some(rows) = data.get_table("Support Tickets") {
        let mut outcome = TableOutcome::default();
        let mut insert = conn.prepare(
            "INSERT INTO support_tickets (ticket_number, customer_id, subject, status, priority,
                                          opened_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for row in rows {
            let number = field(row, "Ticket Number");
            if number.is_empty() {
                outcome.skipped += 1;
                continue;
            }

            match resolve::lookup_id(conn, "support_tickets", "ticket_number", &number) {
                Ok(Some(id)) => {
                    map.insert(number, id);
                    outcome.success += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    outcome.errors.push(format!("{}: {}", number, e));
                    continue;
                }
            }

            let customer_id =
                match resolve_ref(customer_map, &field(row, "User ID"), options, "customer") {
                    Ok(Some(id)) => id,
                    Ok(None) => {
                        outcome.skipped += 1;
                        continue;
                    }
                    Err(msg) => {
                        outcome.errors.push(format!("{}: {}", number, msg));
                        continue;
                    }
                };

            let inserted = insert.execute(params![
                number,
                customer_id,
                field(row, "Subject"),
                text_or(field(row, "Status"), "open"),
                text_or(field(row, "Priority"), "normal"),
                opt_text(field(row, "Opened")),
                now_ms(),
            ]);
            match inserted {
                Ok(_) => {
                    map.insert(number, conn.last_insert_rowid());
                    outcome.success += 1;
                }
                Err(e) => outcome.errors.push(format!("{}: {}", number, e)),
            }
        }

        record(details, "Support Tickets", outcome);
    }

    for (number, id) in resolve::load_key_map(conn, "support_tickets", "ticket_number")? {
        map.entry(number).or_insert(id);
    }
    Ok(map)
}

/// Restore Call Records. Event log: always inserted.
fn restore_call_records(
    conn: &Connection,
    data: &SnapshotData,
    options: &RestoreOptions,
    customer_map: &KeyMap,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<()> {
    let Some(rows) = data.get_table("Call Records") else {
        return Ok(());
    };

    let mut outcome = TableOutcome::default();
    let mut insert = conn.prepare(
        "INSERT INTO call_records (customer_id, direction, duration_secs, called_at, notes,
                                   created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for row in rows {
        let user_id = field(row, "User ID");
        let customer_id = match resolve_ref(customer_map, &user_id, options, "customer") {
            Ok(Some(id)) => id,
            Ok(None) => {
                outcome.skipped += 1;
                continue;
            }
            Err(msg) => {
                outcome.errors.push(format!("{}: {}", user_id, msg));
                continue;
            }
        };

        let inserted = insert.execute(params![
            customer_id,
            text_or(field(row, "Direction"), "outgoing"),
            int_or(&field(row, "Duration"), 0),
            opt_text(field(row, "Called At")),
            opt_text(field(row, "Notes")),
            now_ms(),
        ]);
        match inserted {
            Ok(_) => outcome.success += 1,
            Err(e) => outcome.errors.push(format!("{}: {}", user_id, e)),
        }
    }

    record(details, "Call Records", outcome);
    Ok(())
}

/// Restore Reminder Logs. Event log: always inserted.
fn restore_reminder_logs(
    conn: &Connection,
    data: &SnapshotData,
    options: &RestoreOptions,
    customer_map: &KeyMap,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<()> {
    let Some(rows) = data.get_table("Reminder Logs") else {
        return Ok(());
    };

    let mut outcome = TableOutcome::default();
    let mut insert = conn.prepare(
        "INSERT INTO reminder_logs (customer_id, channel, message, sent_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    for row in rows {
        let user_id = field(row, "User ID");
        let customer_id = match resolve_ref(customer_map, &user_id, options, "customer") {
            Ok(Some(id)) => id,
            Ok(None) => {
                outcome.skipped += 1;
                continue;
            }
            Err(msg) => {
                outcome.errors.push(format!("{}: {}", user_id, msg));
                continue;
            }
        };

        let inserted = insert.execute(params![
            customer_id,
            text_or(field(row, "Channel"), "sms"),
            opt_text(field(row, "Message")),
            opt_text(field(row, "Sent At")),
            now_ms(),
        ]);
        match inserted {
            Ok(_) => outcome.success += 1,
            Err(e) => outcome.errors.push(format!("{}: {}", user_id, e)),
        }
    }

    record(details, "Reminder Logs", outcome);
    Ok(())
}

/// Restore Resellers, deduplicated by code. Assigned the same seeded
/// credential as customers.
fn restore_resellers(
    conn: &Connection,
    data: &SnapshotData,
    seeded_hash: &str,
    details: &mut BTreeMap<String, TableOutcome>,
) -> Result<()> {
    let Some(rows) = data.get_table("Resellers") else {
        return Ok(());
    };

    let mut outcome = TableOutcome::default();
    let mut insert = conn.prepare(
        "INSERT INTO resellers (code, name, phone, email, commission_rate, password_hash,
                                created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    for row in rows {
        let code = field(row, "Code");
        if code.is_empty() {
            outcome.skipped += 1;
            continue;
        }

        match resolve::lookup_id(conn, "resellers", "code", &code) {
            Ok(Some(_)) => {
                outcome.success += 1;
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                outcome.errors.push(format!("{}: {}", code, e));
                continue;
            }
        }

        let inserted = insert.execute(params![
            code,
            text_or(field(row, "Name"), &code),
            opt_text(field(row, "Phone")),
            opt_text(field(row, "Email")),
            num_or(&field(row, "Commission Rate"), 0.0),
            seeded_hash,
            now_ms(),
        ]);
        match inserted {
            Ok(_) => outcome.success += 1,
            Err(e) => outcome.errors.push(format!("{}: {}", code, e)),
        }
    }

    record(details, "Resellers", outcome);
    Ok(())
}

// ============================================================================
// Row field helpers
// ============================================================================

/// Fetch a display column's value, empty string when absent.
fn field(row: &Row, name: &str) -> String {
    row.get(name).cloned().unwrap_or_default()
}

/// Trimmed value, or the default when blank.
fn text_or(value: String, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Trimmed value, or None when blank.
fn opt_text(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Lenient numeric parse; snapshots carry everything as strings.
fn num_or(value: &str, default: f64) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default
    } else {
        trimmed.parse().unwrap_or(default)
    }
}

/// Integer counterpart of `num_or`, for duration-style fields.
fn int_or(value: &str, default: i64) -> i64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default
    } else {
        trimmed.parse().unwrap_or(default)
    }
}

/// Resolve a natural-key reference through a key map.
///
/// Blank names resolve to `Ok(None)`. Unknown names resolve to `Ok(None)`
/// by default (the caller decides between "no reference" and "skip row"),
/// or to a row error message under strict references.
fn resolve_ref(
    map: &KeyMap,
    name: &str,
    options: &RestoreOptions,
    what: &str,
) -> std::result::Result<Option<i64>, String> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    match map.get(name) {
        Some(id) => Ok(Some(*id)),
        None if options.strict_references => Err(format!("unresolved {} '{}'", what, name)),
        None => Ok(None),
    }
}

/// Normalize a phone number to the national format with country prefix.
///
/// Strips non-digits; an 11-digit number with a single leading zero has
/// the zero replaced by the prefix, a 10-digit number gets the prefix
/// prepended, anything else is kept as its digits.
pub fn normalize_phone(raw: &str, country_prefix: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 11 && digits.starts_with('0') && !digits[1..].starts_with('0') {
        format!("{}{}", country_prefix, &digits[1..])
    } else if digits.len() == 10 {
        format!("{}{}", country_prefix, digits)
    } else {
        digits
    }
}

fn record(details: &mut BTreeMap<String, TableOutcome>, name: &str, outcome: TableOutcome) {
    debug!(
        table = name,
        success = outcome.success,
        errors = outcome.errors.len(),
        skipped = outcome.skipped,
        "Table restore pass finished"
    );
    details.insert(name.to_string(), outcome);
}
