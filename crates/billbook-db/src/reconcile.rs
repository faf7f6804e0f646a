//! # Stock Reconciliation
//!
//! Commits an invoice: decrements stock for every line and appends the
//! invoice record, as ONE unit.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit(lines, meta, totals, document_ref)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  acquire write lock  (one commit or restock at a time, in-process)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   ├── [unique_invoice_numbers] number already used? ──► Err, ROLLBACK  │
//! │   ├── for each line, in line order:                                    │
//! │   │     SELECT stock            missing row? ──────────► Err, ROLLBACK │
//! │   │     after = stock - qty     out of range? ─────────► Err, ROLLBACK │
//! │   │     [RejectNegative] after < 0? ─────────────────► Err, ROLLBACK   │
//! │   │     UPDATE stock = after                                           │
//! │   ├── INSERT invoice record     write failed? ─────────► Err, ROLLBACK │
//! │  COMMIT                                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CommitReceipt { record, deltas }                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every early return drops the open `Transaction`, which rolls it back. A
//! writer in another process holding the database makes SQLite report busy;
//! that also surfaces as an error with nothing applied.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use billbook_core::invoice::InvoiceTotals;
use billbook_core::{CoreError, InvoiceMeta, InvoiceRecord, LineItem, StockDelta, StockPolicy};

use crate::error::{DbError, DbResult};
use crate::pool::WriteLock;
use crate::repository::{invoice, product};

/// Hardening switches for the commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// What to do when a line would drive stock below zero.
    pub stock_policy: StockPolicy,

    /// Reject an invoice whose number is already in the ledger.
    pub unique_invoice_numbers: bool,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitReceipt {
    pub record: InvoiceRecord,
    /// One entry per line, in line order.
    pub deltas: Vec<StockDelta>,
}

/// Applies stock decrements and the invoice record atomically.
#[derive(Debug, Clone)]
pub struct StockReconciler {
    pool: SqlitePool,
    write_lock: WriteLock,
    options: ReconcileOptions,
}

impl StockReconciler {
    pub fn new(pool: SqlitePool, write_lock: WriteLock, options: ReconcileOptions) -> Self {
        StockReconciler {
            pool,
            write_lock,
            options,
        }
    }

    pub fn options(&self) -> ReconcileOptions {
        self.options
    }

    /// Commits one invoice.
    ///
    /// ## Returns
    /// * `Ok(CommitReceipt)` - Stock decremented and record written
    /// * `Err(DbError::Core(InsufficientStock))` - Hardened policy rejected a line
    /// * `Err(DbError::Core(DuplicateInvoiceNumber))` - Number already used
    /// * `Err(DbError::NotFound)` - A line's product no longer exists
    /// * `Err(_)` - Any other persistence failure
    ///
    /// In every error case nothing was applied.
    pub async fn commit(
        &self,
        lines: &[LineItem],
        meta: &InvoiceMeta,
        totals: &InvoiceTotals,
        document_ref: &str,
    ) -> DbResult<CommitReceipt> {
        let _guard = self.write_lock.lock().await;

        debug!(
            invoice_number = %meta.number,
            lines = lines.len(),
            "Starting invoice commit"
        );

        let result = self.commit_locked(lines, meta, totals, document_ref).await;

        match &result {
            Ok(receipt) => {
                for delta in &receipt.deltas {
                    debug!(
                        product_id = %delta.product_id,
                        code = %delta.code,
                        quantity = %delta.quantity,
                        before = %delta.before,
                        after = %delta.after,
                        "Stock decremented"
                    );
                }
                info!(
                    invoice_number = %receipt.record.invoice_number,
                    grand_total = %receipt.record.grand_total,
                    lines = receipt.deltas.len(),
                    "Invoice committed"
                );
            }
            Err(err) => {
                warn!(
                    invoice_number = %meta.number,
                    error = %err,
                    "Invoice commit rolled back"
                );
            }
        }

        result
    }

    async fn commit_locked(
        &self,
        lines: &[LineItem],
        meta: &InvoiceMeta,
        totals: &InvoiceTotals,
        document_ref: &str,
    ) -> DbResult<CommitReceipt> {
        let mut tx = self.pool.begin().await?;

        if self.options.unique_invoice_numbers && invoice::number_exists(&mut tx, &meta.number).await? {
            return Err(CoreError::DuplicateInvoiceNumber(meta.number.clone()).into());
        }

        let now = Utc::now();
        let mut deltas = Vec::with_capacity(lines.len());

        for line in lines {
            let (code, before) = product::stock_for_update(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", &line.product_id))?;
            let after = before
                .checked_sub(line.quantity)
                .ok_or_else(|| CoreError::out_of_range(format!("Stock for {}", code)))?;

            if self.options.stock_policy == StockPolicy::RejectNegative && after.is_negative() {
                return Err(CoreError::InsufficientStock {
                    code,
                    available: before,
                    requested: line.quantity,
                }
                .into());
            }

            product::set_stock(&mut tx, &line.product_id, after, now).await?;

            deltas.push(StockDelta {
                product_id: line.product_id.clone(),
                code,
                quantity: line.quantity,
                before,
                after,
            });
        }

        let record = InvoiceRecord {
            id: Uuid::new_v4().to_string(),
            invoice_number: meta.number.clone(),
            invoice_date: meta.date,
            customer_name: meta.customer_name.clone(),
            grand_total: totals.grand_total.round_currency(),
            document_ref: document_ref.to_string(),
            created_at: now,
        };
        invoice::insert_record(&mut tx, &record).await?;

        tx.commit().await?;

        Ok(CommitReceipt { record, deltas })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
