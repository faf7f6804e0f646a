//! # Invoice Repository
//!
//! Read access to the invoice ledger, plus the connection-level writes the
//! commit transaction uses. Records are immutable: there is no update or
//! delete.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use billbook_core::InvoiceRecord;

use super::{decimal_text, parse_column};
use crate::error::{DbError, DbResult};

const INVOICE_COLUMNS: &str =
    "id, invoice_number, invoice_date, customer_name, grand_total, document_ref, created_at";

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    invoice_number: String,
    invoice_date: NaiveDate,
    customer_name: String,
    grand_total: String,
    document_ref: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for InvoiceRecord {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> DbResult<Self> {
        Ok(InvoiceRecord {
            grand_total: parse_column("invoices.grand_total", &row.grand_total)?,
            id: row.id,
            invoice_number: row.invoice_number,
            invoice_date: row.invoice_date,
            customer_name: row.customer_name,
            document_ref: row.document_ref,
            created_at: row.created_at,
        })
    }
}

/// Repository for the invoice ledger.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Lists all invoices, newest invoice date first.
    pub async fn list(&self) -> DbResult<Vec<InvoiceRecord>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices ORDER BY invoice_date DESC, created_at DESC",
            INVOICE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded invoice ledger");
        rows.into_iter().map(InvoiceRecord::try_from).collect()
    }

    /// Finds an invoice by number.
    ///
    /// Numbers are only unique when the commit enforces it; otherwise the
    /// most recently created match is returned.
    pub async fn find_by_number(&self, number: &str) -> DbResult<Option<InvoiceRecord>> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE invoice_number = ?1 ORDER BY created_at DESC LIMIT 1",
            INVOICE_COLUMNS
        ))
        .bind(number.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(InvoiceRecord::try_from).transpose()
    }

    /// Gets an invoice by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InvoiceRecord>> {
        let row: Option<InvoiceRow> =
            sqlx::query_as(&format!("SELECT {} FROM invoices WHERE id = ?1", INVOICE_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(InvoiceRecord::try_from).transpose()
    }

    /// Counts ledger entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (used inside the commit transaction)
// =============================================================================

/// Whether any record already carries `number`.
pub(crate) async fn number_exists(conn: &mut SqliteConnection, number: &str) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE invoice_number = ?1")
        .bind(number)
        .fetch_one(&mut *conn)
        .await?;

    Ok(count > 0)
}

/// Appends a record to the ledger.
pub(crate) async fn insert_record(conn: &mut SqliteConnection, record: &InvoiceRecord) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, invoice_number, invoice_date, customer_name,
            grand_total, document_ref, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&record.id)
    .bind(&record.invoice_number)
    .bind(record.invoice_date)
    .bind(&record.customer_name)
    .bind(decimal_text(record.grand_total.amount()))
    .bind(&record.document_ref)
    .bind(record.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
