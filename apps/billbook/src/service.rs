//! # Invoice Service
//!
//! Orchestrates invoice creation and catalog/ledger administration.
//!
//! ## create_invoice
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  InvoiceRequest                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  parse_invoice_meta ────────────── ValidationError ──► Err (no writes)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  catalog (creation order) + raw quantities                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  line builder ── permissive: skip + report ── strict: first error ──►Err│
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  empty? ── reject_empty_invoices ──────────── EmptyInvoice ──► Err      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  aggregate ──► InvoiceDocument (view model, name = {number}.{ext})     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StockReconciler::commit ─────── any failure ──► Err (rolled back)      │
//! │       │                                                                 │
//! │       ▼  committed                                                      │
//! │  render ──► store ──► Delivery::Stored                                  │
//! │     └── either fails ──► Delivery::Failed (commit stays)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use billbook_core::invoice::{document_name, InvoiceAggregator, InvoiceDocument, InvoiceTotals, SupplierDetails};
use billbook_core::lines::{build_lines_strict, evaluate_lines, unknown_products, LineOutcome};
use billbook_core::tax::TaxSplitCalculator;
use billbook_core::validation::{parse_invoice_meta, validate_new_product, validate_restock_quantity};
use billbook_core::{CoreError, InvoiceRecord, LineItem, NewProduct, Product, Quantity, StockDelta};
use billbook_db::{Database, ReconcileOptions, StockReconciler};

use crate::config::{BillbookConfig, DocumentFormat, PolicySettings};
use crate::document::{DocumentRenderer, DocumentStore, FsDocumentStore, JsonRenderer, TextRenderer};
use crate::error::{AppError, AppResult};

// =============================================================================
// Request / Outcome
// =============================================================================

/// Inbound invoice request, exactly as the caller typed it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub number: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub customer_name: String,
    pub customer_jurisdiction: String,
    /// Product id → requested quantity. Products not listed are not sold.
    pub quantities: HashMap<String, String>,
}

/// A requested quantity that was ignored in permissive mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    pub product_id: String,
    pub code: String,
    pub reason: String,
}

/// Where post-commit document handling failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStage {
    Render,
    Store,
}

/// What happened to the rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Delivery {
    Stored { location: PathBuf },
    /// The invoice is committed regardless.
    Failed { stage: DeliveryStage, reason: String },
}

impl Delivery {
    pub fn is_stored(&self) -> bool {
        matches!(self, Delivery::Stored { .. })
    }
}

/// Result of a committed invoice.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceOutcome {
    pub record: InvoiceRecord,
    pub totals: InvoiceTotals,
    pub document: InvoiceDocument,
    /// Stock changes, in line order.
    pub deltas: Vec<StockDelta>,
    pub skipped: Vec<SkippedLine>,
    /// Requested product ids that are not in the catalog.
    pub unknown_products: Vec<String>,
    pub delivery: Delivery,
}

// =============================================================================
// Service
// =============================================================================

/// The invoicing workflow over one database.
///
/// Cloning is cheap; clones share the pool, the write lock and the
/// document collaborators.
#[derive(Clone)]
pub struct InvoiceService {
    db: Database,
    aggregator: InvoiceAggregator,
    supplier: SupplierDetails,
    policy: PolicySettings,
    options: ReconcileOptions,
    renderer: Arc<dyn DocumentRenderer>,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for InvoiceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvoiceService")
            .field("db", &self.db)
            .field("supplier", &self.supplier)
            .field("policy", &self.policy)
            .field("extension", &self.renderer.extension())
            .finish_non_exhaustive()
    }
}

impl InvoiceService {
    /// Creates a service with explicit document collaborators.
    pub fn new(
        db: Database,
        config: &BillbookConfig,
        renderer: Arc<dyn DocumentRenderer>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        InvoiceService {
            db,
            aggregator: InvoiceAggregator::new(TaxSplitCalculator::new(config.tax_config())),
            supplier: config.supplier_details(),
            policy: config.policy,
            options: config.reconcile_options(),
            renderer,
            store,
        }
    }

    /// Creates a service with the renderer and store the config names.
    pub fn from_config(db: Database, config: &BillbookConfig) -> Self {
        let renderer: Arc<dyn DocumentRenderer> = match config.documents.format {
            DocumentFormat::Text => Arc::new(TextRenderer),
            DocumentFormat::Json => Arc::new(JsonRenderer),
        };
        let store = Arc::new(FsDocumentStore::new(config.documents_dir()));

        InvoiceService::new(db, config, renderer, store)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn policy(&self) -> PolicySettings {
        self.policy
    }

    fn reconciler(&self) -> StockReconciler {
        self.db.reconciler(self.options)
    }

    // =========================================================================
    // Invoice Creation
    // =========================================================================

    /// Creates, commits and delivers one invoice.
    ///
    /// ## Returns
    /// * `Ok(InvoiceOutcome)` - Stock decremented and record written; check
    ///   `delivery` for the document
    /// * `Err(AppError)` - Nothing was written
    pub async fn create_invoice(&self, request: InvoiceRequest) -> AppResult<InvoiceOutcome> {
        let meta = parse_invoice_meta(
            &request.number,
            &request.date,
            &request.customer_name,
            &request.customer_jurisdiction,
        )?;

        info!(
            invoice_number = %meta.number,
            customer = %meta.customer_name,
            requested = request.quantities.len(),
            "Creating invoice"
        );

        let catalog = self.db.products().list().await?;

        let unknown = unknown_products(&catalog, &request.quantities);
        if !unknown.is_empty() {
            warn!(
                invoice_number = %meta.number,
                unknown = ?unknown,
                "Ignoring quantities for products not in the catalog"
            );
        }

        let (lines, skipped) = self.build_lines(&catalog, &request.quantities)?;
        for skip in &skipped {
            warn!(
                invoice_number = %meta.number,
                code = %skip.code,
                reason = %skip.reason,
                "Skipping line"
            );
        }

        if lines.is_empty() && self.policy.reject_empty_invoices {
            return Err(CoreError::EmptyInvoice.into());
        }

        let calculator = self.aggregator.calculator();
        let is_same_origin = calculator.is_same_origin(&meta.customer_jurisdiction);
        let totals = self.aggregator.aggregate(&lines, is_same_origin)?;

        debug!(
            invoice_number = %meta.number,
            lines = lines.len(),
            same_origin = is_same_origin,
            subtotal = %totals.subtotal,
            grand_total = %totals.grand_total,
            "Invoice aggregated"
        );

        let name = document_name(&meta.number, self.renderer.extension());
        let document = InvoiceDocument::build(
            self.supplier.clone(),
            &meta,
            lines,
            &totals,
            is_same_origin,
            name.clone(),
            Utc::now(),
        );

        let receipt = self
            .reconciler()
            .commit(&document.lines, &meta, &totals, &name)
            .await?;

        let delivery = self.deliver(&document);

        info!(
            invoice_number = %receipt.record.invoice_number,
            grand_total = %receipt.record.grand_total,
            document = %name,
            stored = delivery.is_stored(),
            "Invoice created"
        );

        Ok(InvoiceOutcome {
            record: receipt.record,
            totals,
            document,
            deltas: receipt.deltas,
            skipped,
            unknown_products: unknown,
            delivery,
        })
    }

    fn build_lines(
        &self,
        catalog: &[Product],
        quantities: &HashMap<String, String>,
    ) -> AppResult<(Vec<LineItem>, Vec<SkippedLine>)> {
        if self.policy.strict_quantities {
            return Ok((build_lines_strict(catalog, quantities)?, Vec::new()));
        }

        let mut lines = Vec::new();
        let mut skipped = Vec::new();
        for (product, outcome) in evaluate_lines(catalog, quantities) {
            match outcome {
                LineOutcome::Included(line) => lines.push(line),
                LineOutcome::SkippedAbsent => {}
                LineOutcome::SkippedInvalid(err) => skipped.push(SkippedLine {
                    product_id: product.id.clone(),
                    code: product.code.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        Ok((lines, skipped))
    }

    /// Renders and stores the document. Never fails the invoice.
    fn deliver(&self, document: &InvoiceDocument) -> Delivery {
        let bytes = match self.renderer.render(document) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(
                    invoice_number = %document.invoice_number,
                    error = %err,
                    "Invoice committed but document rendering failed"
                );
                return Delivery::Failed {
                    stage: DeliveryStage::Render,
                    reason: err.to_string(),
                };
            }
        };

        match self.store.store(&document.document_name, &bytes) {
            Ok(location) => Delivery::Stored { location },
            Err(err) => {
                warn!(
                    invoice_number = %document.invoice_number,
                    error = %err,
                    "Invoice committed but document storage failed"
                );
                Delivery::Failed {
                    stage: DeliveryStage::Store,
                    reason: err.to_string(),
                }
            }
        }
    }

    // =========================================================================
    // Catalog Administration
    // =========================================================================

    /// Adds a product to the end of the catalog.
    pub async fn add_product(&self, new_product: NewProduct) -> AppResult<Product> {
        validate_new_product(&new_product)?;
        Ok(self.db.products().insert(&new_product).await?)
    }

    /// Adds a positive quantity to a product's stock.
    pub async fn restock(&self, product_id: &str, quantity: Quantity) -> AppResult<StockDelta> {
        validate_restock_quantity(quantity)?;
        Ok(self.db.products().restock(product_id, quantity).await?)
    }

    /// The catalog in creation order.
    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        Ok(self.db.products().list().await?)
    }

    pub async fn find_product_by_code(&self, code: &str) -> AppResult<Product> {
        self.db
            .products()
            .get_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found("Product", code))
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    /// The ledger, newest invoice date first.
    pub async fn list_invoices(&self) -> AppResult<Vec<InvoiceRecord>> {
        Ok(self.db.invoices().list().await?)
    }

    pub async fn find_invoice(&self, number: &str) -> AppResult<InvoiceRecord> {
        self.db
            .invoices()
            .find_by_number(number)
            .await?
            .ok_or_else(|| AppError::not_found("Invoice", number))
    }

    /// Resolves a stored document for download.
    pub fn document_path(&self, name: &str) -> AppResult<PathBuf> {
        Ok(self.store.locate(name)?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentError, DocumentResult};
    use crate::error::ErrorCode;
    use billbook_core::{Money, StockPolicy};
    use billbook_db::DbConfig;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    struct Fixture {
        service: InvoiceService,
        dir: TempDir,
    }

    async fn fixture_with(policy: PolicySettings) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BillbookConfig::default();
        config.supplier.name = "Sri Lakshmi Stores".into();
        config.policy = policy;
        config.documents.output_dir = Some(dir.path().to_path_buf());

        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Fixture {
            service: InvoiceService::from_config(db, &config),
            dir,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(PolicySettings::default()).await
    }

    async fn add(service: &InvoiceService, code: &str, rate: Money, stock: Quantity) -> Product {
        service
            .add_product(NewProduct {
                code: code.into(),
                name: format!("{} item", code),
                hsn: "1006".into(),
                uom: "NOS".into(),
                rate,
                opening_stock: stock,
            })
            .await
            .unwrap()
    }

    fn request(number: &str, jurisdiction: &str, quantities: &[(&str, &str)]) -> InvoiceRequest {
        InvoiceRequest {
            number: number.into(),
            date: "2024-04-01".into(),
            customer_name: "Sri Traders".into(),
            customer_jurisdiction: jurisdiction.into(),
            quantities: quantities
                .iter()
                .map(|(id, qty)| (id.to_string(), qty.to_string()))
                .collect(),
        }
    }

    async fn stock_of(service: &InvoiceService, id: &str) -> Quantity {
        service
            .database()
            .products()
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    async fn ledger_len(service: &InvoiceService) -> usize {
        service.list_invoices().await.unwrap().len()
    }

    struct BrokenRenderer;

    impl DocumentRenderer for BrokenRenderer {
        fn render(&self, _document: &InvoiceDocument) -> DocumentResult<Vec<u8>> {
            Err(DocumentError::Render("font missing".into()))
        }
    }

    struct BrokenStore;

    impl DocumentStore for BrokenStore {
        fn store(&self, _name: &str, _bytes: &[u8]) -> DocumentResult<PathBuf> {
            Err(DocumentError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }

        fn locate(&self, name: &str) -> DocumentResult<PathBuf> {
            Err(DocumentError::NotFound(name.to_string()))
        }
    }

    #[tokio::test]
    async fn test_single_line_decrements_stock() {
        let Fixture { service, dir } = fixture().await;
        let p = add(&service, "P", Money::from_major(50), Quantity::from_units(10)).await;
        let q = add(&service, "Q", Money::from_major(20), Quantity::from_units(4)).await;

        let outcome = service
            .create_invoice(request("INV-001", "37", &[(&p.id, "3"), (&q.id, "0")]))
            .await
            .unwrap();

        assert_eq!(outcome.document.lines.len(), 1);
        let line = &outcome.document.lines[0];
        assert_eq!(line.product_id, p.id);
        assert_eq!(line.quantity, Quantity::from_units(3));
        assert_eq!(line.amount, Money::from_major(150));

        assert_eq!(stock_of(&service, &p.id).await, Quantity::from_units(7));
        assert_eq!(stock_of(&service, &q.id).await, Quantity::from_units(4));

        assert_eq!(outcome.record.grand_total, Money::from_major(150));
        assert_eq!(outcome.record.document_ref, "INV-001.txt");
        assert_eq!(outcome.deltas.len(), 1);
        assert!(outcome.skipped.is_empty());

        let stored = dir.path().join("INV-001.txt");
        assert_eq!(
            outcome.delivery,
            Delivery::Stored {
                location: stored.clone()
            }
        );
        assert_eq!(service.document_path("INV-001.txt").unwrap(), stored);
    }

    #[tokio::test]
    async fn test_same_origin_customer_gets_pair() {
        let Fixture { service, dir: _dir } = fixture().await;
        let p = add(&service, "RICE-25", Money::from_major(1180), Quantity::from_units(5)).await;

        let outcome = service
            .create_invoice(request("INV-A", "37", &[(&p.id, "1")]))
            .await
            .unwrap();

        assert_eq!(outcome.totals.taxable_base, Money::from_major(1000));
        assert_eq!(outcome.document.cgst, Money::from_major(90));
        assert_eq!(outcome.document.sgst, Money::from_major(90));
        assert_eq!(outcome.document.igst, Money::ZERO);
        assert_eq!(outcome.document.grand_total, Money::from_major(1180));
        assert_eq!(
            outcome.document.amount_in_words,
            "One Thousand, One Hundred And Eighty Only"
        );
    }

    #[tokio::test]
    async fn test_cross_origin_customer_gets_single_component() {
        let Fixture { service, dir: _dir } = fixture().await;
        let p = add(&service, "RICE-25", Money::from_major(1180), Quantity::from_units(5)).await;

        let outcome = service
            .create_invoice(request("INV-B", " 36 ", &[(&p.id, "1")]))
            .await
            .unwrap();

        assert_eq!(outcome.document.taxable_value, Money::from_major(1000));
        assert_eq!(outcome.document.cgst, Money::ZERO);
        assert_eq!(outcome.document.sgst, Money::ZERO);
        assert_eq!(outcome.document.igst, Money::from_major(180));
    }

    #[tokio::test]
    async fn test_empty_invoice_is_recorded_by_default() {
        let Fixture { service, dir: _dir } = fixture().await;
        let p = add(&service, "P", Money::from_major(50), Quantity::from_units(10)).await;

        let outcome = service
            .create_invoice(request("INV-D", "37", &[(&p.id, "0")]))
            .await
            .unwrap();

        assert!(outcome.document.lines.is_empty());
        assert_eq!(outcome.totals, InvoiceTotals::default());
        assert_eq!(outcome.record.grand_total, Money::ZERO);
        assert_eq!(outcome.record.grand_total.to_string(), "0.00");
        assert_eq!(ledger_len(&service).await, 1);
        assert_eq!(stock_of(&service, &p.id).await, Quantity::from_units(10));
    }

    #[tokio::test]
    async fn test_empty_invoice_rejected_by_policy() {
        let Fixture { service, dir: _dir } = fixture_with(PolicySettings {
            reject_empty_invoices: true,
            ..PolicySettings::default()
        })
        .await;

        let err = service
            .create_invoice(request("INV-D", "37", &[]))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::EmptyInvoice);
        assert_eq!(ledger_len(&service).await, 0);
    }

    #[tokio::test]
    async fn test_oversell_allowed_by_default() {
        let Fixture { service, dir: _dir } = fixture().await;
        let p = add(&service, "DAL-1", Money::from_major(120), Quantity::from_units(2)).await;

        service
            .create_invoice(request("INV-E", "37", &[(&p.id, "5")]))
            .await
            .unwrap();

        assert_eq!(stock_of(&service, &p.id).await, Quantity::from_units(-3));
    }

    #[tokio::test]
    async fn test_oversell_rejected_when_hardened() {
        let Fixture { service, dir } = fixture_with(PolicySettings {
            stock_policy: StockPolicy::RejectNegative,
            ..PolicySettings::default()
        })
        .await;
        let ok = add(&service, "RICE-25", Money::from_major(50), Quantity::from_units(10)).await;
        let short = add(&service, "DAL-1", Money::from_major(120), Quantity::from_units(2)).await;

        let err = service
            .create_invoice(request("INV-E", "37", &[(&ok.id, "1"), (&short.id, "5")]))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("DAL-1"));
        assert_eq!(stock_of(&service, &ok.id).await, Quantity::from_units(10));
        assert_eq!(stock_of(&service, &short.id).await, Quantity::from_units(2));
        assert_eq!(ledger_len(&service).await, 0);
        assert!(!dir.path().join("INV-E.txt").exists());
    }

    #[tokio::test]
    async fn test_invalid_meta_writes_nothing() {
        let Fixture { service, dir: _dir } = fixture().await;
        let p = add(&service, "P", Money::from_major(50), Quantity::from_units(10)).await;

        let mut bad_number = request("INV/001", "37", &[(&p.id, "1")]);
        let err = service.create_invoice(bad_number.clone()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        bad_number.number = "INV-001".into();
        bad_number.date = "01/04/2024".into();
        let err = service.create_invoice(bad_number.clone()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        bad_number.date = "2024-04-01".into();
        bad_number.customer_name = "   ".into();
        let err = service.create_invoice(bad_number).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        assert_eq!(ledger_len(&service).await, 0);
        assert_eq!(stock_of(&service, &p.id).await, Quantity::from_units(10));
    }

    #[tokio::test]
    async fn test_permissive_skips_and_reports_bad_quantities() {
        let Fixture { service, dir: _dir } = fixture().await;
        let good = add(&service, "RICE-25", Money::from_major(50), Quantity::from_units(10)).await;
        let bad = add(&service, "DAL-1", Money::from_major(120), Quantity::from_units(10)).await;

        let outcome = service
            .create_invoice(request(
                "INV-P",
                "37",
                &[(&good.id, "2.5"), (&bad.id, "two"), ("ghost", "1")],
            ))
            .await
            .unwrap();

        assert_eq!(outcome.document.lines.len(), 1);
        assert_eq!(outcome.totals.grand_total, Money::new(dec!(125.00)));
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].code, "DAL-1");
        assert_eq!(outcome.unknown_products, vec!["ghost".to_string()]);
        assert_eq!(stock_of(&service, &good.id).await, Quantity::new(dec!(7.5)));
        assert_eq!(stock_of(&service, &bad.id).await, Quantity::from_units(10));
    }

    #[tokio::test]
    async fn test_oversized_quantity_is_skipped_and_reported() {
        let Fixture { service, dir: _dir } = fixture().await;
        let rice = add(&service, "RICE-25", Money::from_major(50), Quantity::from_units(10)).await;
        let dal = add(&service, "DAL-1", Money::from_major(120), Quantity::from_units(10)).await;

        let outcome = service
            .create_invoice(request(
                "INV-BIG",
                "37",
                &[(&rice.id, "79228162514264337593543950335"), (&dal.id, "1")],
            ))
            .await
            .unwrap();

        assert_eq!(outcome.document.lines.len(), 1);
        assert_eq!(outcome.totals.grand_total, Money::from_major(120));
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].code, "RICE-25");
        assert_eq!(stock_of(&service, &rice.id).await, Quantity::from_units(10));
        assert_eq!(stock_of(&service, &dal.id).await, Quantity::from_units(9));
    }

    #[tokio::test]
    async fn test_strict_rejects_bad_quantity() {
        let Fixture { service, dir: _dir } = fixture_with(PolicySettings {
            strict_quantities: true,
            ..PolicySettings::default()
        })
        .await;
        let good = add(&service, "RICE-25", Money::from_major(50), Quantity::from_units(10)).await;
        let bad = add(&service, "DAL-1", Money::from_major(120), Quantity::from_units(10)).await;

        let err = service
            .create_invoice(request("INV-S", "37", &[(&good.id, "1"), (&bad.id, "-2")]))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("DAL-1"));
        assert_eq!(stock_of(&service, &good.id).await, Quantity::from_units(10));
        assert_eq!(ledger_len(&service).await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_number_rejected_when_unique() {
        let Fixture { service, dir: _dir } = fixture_with(PolicySettings {
            unique_invoice_numbers: true,
            ..PolicySettings::default()
        })
        .await;
        let p = add(&service, "P", Money::from_major(50), Quantity::from_units(10)).await;

        service
            .create_invoice(request("INV-1", "37", &[(&p.id, "1")]))
            .await
            .unwrap();
        let err = service
            .create_invoice(request("INV-1", "37", &[(&p.id, "1")]))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::DuplicateInvoice);
        assert_eq!(stock_of(&service, &p.id).await, Quantity::from_units(9));
        assert_eq!(ledger_len(&service).await, 1);
    }

    #[tokio::test]
    async fn test_render_failure_keeps_commit() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service = InvoiceService::new(
            db,
            &BillbookConfig::default(),
            Arc::new(BrokenRenderer),
            Arc::new(FsDocumentStore::new(dir.path())),
        );
        let p = add(&service, "P", Money::from_major(50), Quantity::from_units(10)).await;

        let outcome = service
            .create_invoice(request("INV-R", "37", &[(&p.id, "2")]))
            .await
            .unwrap();

        assert!(matches!(
            outcome.delivery,
            Delivery::Failed {
                stage: DeliveryStage::Render,
                ..
            }
        ));
        // Default extension when a renderer does not name one
        assert_eq!(outcome.record.document_ref, "INV-R.pdf");
        assert_eq!(stock_of(&service, &p.id).await, Quantity::from_units(8));
        assert_eq!(service.find_invoice("INV-R").await.unwrap().id, outcome.record.id);
    }

    #[tokio::test]
    async fn test_store_failure_keeps_commit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service = InvoiceService::new(
            db,
            &BillbookConfig::default(),
            Arc::new(TextRenderer),
            Arc::new(BrokenStore),
        );
        let p = add(&service, "P", Money::from_major(50), Quantity::from_units(10)).await;

        let outcome = service
            .create_invoice(request("INV-W", "37", &[(&p.id, "2")]))
            .await
            .unwrap();

        match outcome.delivery {
            Delivery::Failed { stage, reason } => {
                assert_eq!(stage, DeliveryStage::Store);
                assert!(reason.contains("disk full"));
            }
            other => panic!("expected store failure, got {:?}", other),
        }
        assert_eq!(stock_of(&service, &p.id).await, Quantity::from_units(8));
        assert_eq!(ledger_len(&service).await, 1);
    }

    #[tokio::test]
    async fn test_json_format_names_document_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BillbookConfig::default();
        config.documents.output_dir = Some(dir.path().to_path_buf());
        config.documents.format = DocumentFormat::Json;
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service = InvoiceService::from_config(db, &config);

        let outcome = service
            .create_invoice(request("INV-J", "37", &[]))
            .await
            .unwrap();

        assert_eq!(outcome.record.document_ref, "INV-J.json");
        let bytes = std::fs::read(dir.path().join("INV-J.json")).unwrap();
        let parsed: InvoiceDocument = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.invoice_number, "INV-J");
    }

    #[tokio::test]
    async fn test_product_administration() {
        let Fixture { service, dir: _dir } = fixture().await;

        let err = service
            .add_product(NewProduct {
                code: "OIL-5".into(),
                name: "Sunflower Oil".into(),
                hsn: "1512".into(),
                uom: "LTR".into(),
                rate: Money::from_major(-1),
                opening_stock: Quantity::ZERO,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let oil = add(&service, "OIL-5", Money::from_major(800), Quantity::ZERO).await;
        let dup = service
            .add_product(NewProduct {
                code: "OIL-5".into(),
                name: "Other".into(),
                hsn: "1512".into(),
                uom: "LTR".into(),
                rate: Money::from_major(900),
                opening_stock: Quantity::ZERO,
            })
            .await
            .unwrap_err();
        assert_eq!(dup.code, ErrorCode::Conflict);

        let err = service.restock(&oil.id, Quantity::ZERO).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let delta = service
            .restock(&oil.id, Quantity::new(dec!(2.5)))
            .await
            .unwrap();
        assert_eq!(delta.after, Quantity::new(dec!(2.5)));

        let err = service
            .restock("missing", Quantity::from_units(1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        assert_eq!(service.find_product_by_code("OIL-5").await.unwrap().id, oil.id);
        assert_eq!(service.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ledger_lookups() {
        let Fixture { service, dir: _dir } = fixture().await;

        let err = service.find_invoice("INV-404").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = service.document_path("INV-404.txt").unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = service.document_path("../billbook.db").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
