//! # Billbook Application Library
//!
//! Orchestration layer for the invoicing workflow. The `billbook` binary is a
//! thin command line on top of this.
//!
//! ## Module Organization
//! ```text
//! billbook_app/
//! ├── lib.rs          ◄─── You are here (tracing setup, exports)
//! ├── config.rs       ◄─── BillbookConfig: file + environment layering
//! ├── error.rs        ◄─── AppError with machine-readable codes
//! ├── document.rs     ◄─── DocumentRenderer / DocumentStore collaborators
//! └── service.rs      ◄─── InvoiceService: create_invoice + administration
//! ```
//!
//! ## Invoice Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      create_invoice(request)                            │
//! │                                                                         │
//! │  1. Validate meta ──────────► ValidationError (nothing written)        │
//! │  2. Catalog + line builder ─► LineItem[] (permissive or strict)        │
//! │  3. Aggregate ──────────────► InvoiceTotals + InvoiceDocument          │
//! │  4. Commit ─────────────────► stock decrements + ledger record         │
//! │                               (one transaction, all or nothing)        │
//! │  5. Render + store ─────────► Delivery::Stored | Delivery::Failed      │
//! │                               (never rolls back step 4)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod service;

use tracing_subscriber::EnvFilter;

pub use config::BillbookConfig;
pub use error::{AppError, AppResult, ErrorCode};
pub use service::{Delivery, DeliveryStage, InvoiceOutcome, InvoiceRequest, InvoiceService};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,billbook=debug,billbook_app=debug,billbook_db=debug,sqlx=warn";

/// Initializes the tracing subscriber.
///
/// Logs go to stderr so command output on stdout stays clean.
/// Call once, at the start of `main`.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
