//! # Invoice Documents
//!
//! Rendering and storage collaborators for the printed invoice.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  InvoiceDocument ──► DocumentRenderer ──► bytes ──► DocumentStore       │
//! │  (view model)        TextRenderer                    FsDocumentStore    │
//! │                      JsonRenderer                    {dir}/{name}       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both run after the invoice commit. Renderers only format what the view
//! model already holds; they never recompute amounts.

use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use billbook_core::invoice::{InvoiceDocument, TaxOrigin};
use billbook_core::DEFAULT_DOCUMENT_EXTENSION;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Render failed: {0}")]
    Render(String),

    #[error("Invalid document name: '{0}'")]
    InvalidName(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Turns the view model into document bytes.
pub trait DocumentRenderer: Send + Sync {
    /// File extension of the produced document, without the dot.
    fn extension(&self) -> &str {
        DEFAULT_DOCUMENT_EXTENSION
    }

    fn render(&self, document: &InvoiceDocument) -> DocumentResult<Vec<u8>>;
}

/// Keeps rendered documents, keyed by document name.
pub trait DocumentStore: Send + Sync {
    /// Stores `bytes` under `name`, replacing any previous document.
    fn store(&self, name: &str, bytes: &[u8]) -> DocumentResult<PathBuf>;

    /// Resolves a stored document for download.
    fn locate(&self, name: &str) -> DocumentResult<PathBuf>;
}

// =============================================================================
// Text Renderer
// =============================================================================

const PAGE_WIDTH: usize = 78;
const DESCRIPTION_WIDTH: usize = 24;

/// Fixed-width plain text invoice.
#[derive(Debug, Clone, Default)]
pub struct TextRenderer;

impl DocumentRenderer for TextRenderer {
    fn extension(&self) -> &str {
        "txt"
    }

    fn render(&self, document: &InvoiceDocument) -> DocumentResult<Vec<u8>> {
        let mut out = String::new();
        write_text(document, &mut out).map_err(|e| DocumentError::Render(e.to_string()))?;
        Ok(out.into_bytes())
    }
}

fn write_text(doc: &InvoiceDocument, out: &mut String) -> std::fmt::Result {
    let rule = "-".repeat(PAGE_WIDTH);

    writeln!(out, "{:^width$}", "TAX INVOICE", width = PAGE_WIDTH)?;
    if !doc.supplier.name.is_empty() {
        writeln!(out, "{}", doc.supplier.name)?;
    }
    if !doc.supplier.address.is_empty() {
        writeln!(out, "{}", doc.supplier.address)?;
    }
    writeln!(
        out,
        "GSTIN: {:<30} State Code: {}",
        doc.supplier.gstin, doc.supplier.jurisdiction
    )?;
    writeln!(out, "{}", rule)?;

    writeln!(
        out,
        "Invoice No: {:<26} Date: {}  Time: {}",
        doc.invoice_number,
        doc.invoice_date.format("%d-%m-%Y"),
        doc.invoice_time
    )?;
    writeln!(
        out,
        "Bill To:    {:<26} State Code: {}",
        doc.customer_name, doc.customer_jurisdiction
    )?;
    writeln!(out, "{}", rule)?;

    writeln!(
        out,
        "{:>3} {:<10} {:<w$} {:<8} {:>7} {:<4} {:>8} {:>9}",
        "#",
        "Code",
        "Description",
        "HSN",
        "Qty",
        "UOM",
        "Rate",
        "Amount",
        w = DESCRIPTION_WIDTH
    )?;
    for (index, line) in doc.lines.iter().enumerate() {
        writeln!(
            out,
            "{:>3} {:<10} {:<w$} {:<8} {:>7} {:<4} {:>8} {:>9}",
            index + 1,
            clip(&line.code, 10),
            clip(&line.name, DESCRIPTION_WIDTH),
            clip(&line.hsn, 8),
            line.quantity,
            clip(&line.uom, 4),
            line.rate,
            line.amount,
            w = DESCRIPTION_WIDTH
        )?;
    }
    writeln!(out, "{}", rule)?;

    total_row(out, "Taxable Value", &doc.taxable_value.to_string())?;
    match doc.origin {
        TaxOrigin::SameOrigin => {
            total_row(out, "CGST", &doc.cgst.to_string())?;
            total_row(out, "SGST", &doc.sgst.to_string())?;
        }
        TaxOrigin::CrossOrigin => {
            total_row(out, "IGST", &doc.igst.to_string())?;
        }
    }
    total_row(out, "Grand Total", &doc.grand_total.to_string())?;
    writeln!(out, "{}", rule)?;

    writeln!(out, "Amount in words: {}", doc.amount_in_words)?;
    writeln!(out)?;
    writeln!(out, "{:>width$}", "Authorised Signatory", width = PAGE_WIDTH)?;

    Ok(())
}

fn total_row(out: &mut String, label: &str, value: &str) -> std::fmt::Result {
    writeln!(out, "{:>64}: {:>12}", label, value)
}

/// First `max` characters of `text`.
fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

// =============================================================================
// JSON Renderer
// =============================================================================

/// The view model as pretty JSON, for an external renderer to lay out.
#[derive(Debug, Clone, Default)]
pub struct JsonRenderer;

impl DocumentRenderer for JsonRenderer {
    fn extension(&self) -> &str {
        "json"
    }

    fn render(&self, document: &InvoiceDocument) -> DocumentResult<Vec<u8>> {
        serde_json::to_vec_pretty(document).map_err(|e| DocumentError::Render(e.to_string()))
    }
}

// =============================================================================
// Filesystem Store
// =============================================================================

/// Stores documents as files in one directory.
///
/// Names must be a single plain file name; anything that could resolve
/// outside the directory is rejected.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsDocumentStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> DocumentResult<PathBuf> {
        check_name(name)?;
        Ok(self.root.join(name))
    }
}

impl DocumentStore for FsDocumentStore {
    fn store(&self, name: &str, bytes: &[u8]) -> DocumentResult<PathBuf> {
        let path = self.path_for(name)?;
        std::fs::create_dir_all(&self.root)?;

        // Write beside the target, then rename, so a reader never sees half a file
        let partial = self.root.join(format!(".{}.partial", name));
        std::fs::write(&partial, bytes)?;
        std::fs::rename(&partial, &path)?;

        debug!(path = %path.display(), bytes = bytes.len(), "Document stored");
        Ok(path)
    }

    fn locate(&self, name: &str) -> DocumentResult<PathBuf> {
        let path = self.path_for(name)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(DocumentError::NotFound(name.to_string()))
        }
    }
}

/// Accepts only a single normal path component.
fn check_name(name: &str) -> DocumentResult<()> {
    let invalid = || DocumentError::InvalidName(name.to_string());

    if name.trim().is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(invalid());
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_core::invoice::{InvoiceTotals, SupplierDetails};
    use billbook_core::tax::TaxSplit;
    use billbook_core::{InvoiceMeta, LineItem, Money, Quantity};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn document(same_origin: bool) -> InvoiceDocument {
        let line = LineItem {
            product_id: "p-1".into(),
            code: "RICE-25".into(),
            name: "Sona Masoori Rice 25kg Premium Bag".into(),
            hsn: "1006".into(),
            uom: "BAG".into(),
            quantity: Quantity::from_units(1),
            rate: Money::from_major(1180),
            amount: Money::from_major(1180),
        };
        let tax = if same_origin {
            TaxSplit {
                taxable_base: Money::from_major(1000),
                same_origin_half: Money::from_major(90),
                cross_origin: Money::ZERO,
            }
        } else {
            TaxSplit {
                taxable_base: Money::from_major(1000),
                same_origin_half: Money::ZERO,
                cross_origin: Money::from_major(180),
            }
        };
        let totals = InvoiceTotals {
            subtotal: Money::from_major(1180),
            taxable_base: Money::from_major(1000),
            tax,
            grand_total: Money::from_major(1180),
        };
        let meta = InvoiceMeta {
            number: "INV-001".into(),
            date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            customer_name: "Sri Traders".into(),
            customer_jurisdiction: if same_origin { "37" } else { "36" }.into(),
        };
        let supplier = SupplierDetails {
            name: "Sri Lakshmi Stores".into(),
            address: "12 Main Road, Guntur".into(),
            jurisdiction: "37".into(),
            gstin: "37ABCDE1234F1Z5".into(),
        };

        InvoiceDocument::build(
            supplier,
            &meta,
            vec![line],
            &totals,
            same_origin,
            "INV-001.txt".into(),
            Utc.with_ymd_and_hms(2024, 4, 1, 9, 5, 7).unwrap(),
        )
    }

    #[test]
    fn test_text_same_origin_shows_pair() {
        let bytes = TextRenderer.render(&document(true)).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("TAX INVOICE"));
        assert!(text.contains("Invoice No: INV-001"));
        assert!(text.contains("01-04-2024"));
        assert!(text.contains("09:05:07"));
        assert!(text.contains("CGST:        90.00"));
        assert!(text.contains("SGST:        90.00"));
        assert!(!text.contains("IGST"));
        assert!(text.contains("Grand Total:      1180.00"));
        assert!(text.contains("One Thousand, One Hundred And Eighty Only"));
        // Long names are clipped to the column
        assert!(text.contains("Sona Masoori Rice 25kg P "));
    }

    #[test]
    fn test_text_cross_origin_shows_single_component() {
        let text = String::from_utf8(TextRenderer.render(&document(false)).unwrap()).unwrap();

        assert!(text.contains("IGST:       180.00"));
        assert!(!text.contains("CGST"));
        assert!(!text.contains("SGST"));
    }

    #[test]
    fn test_json_renderer_round_trips_view_model() {
        let doc = document(true);
        let bytes = JsonRenderer.render(&doc).unwrap();
        let parsed: InvoiceDocument = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(parsed, doc);
        assert_eq!(JsonRenderer.extension(), "json");
    }

    #[test]
    fn test_fs_store_writes_and_locates() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().join("invoices"));

        let path = store.store("INV-001.txt", b"hello").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert_eq!(store.locate("INV-001.txt").unwrap(), path);

        // Same name replaces the previous document
        store.store("INV-001.txt", b"again").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"again");
        assert!(!dir.path().join("invoices").join(".INV-001.txt.partial").exists());
    }

    #[test]
    fn test_fs_store_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());

        assert!(matches!(
            store.locate("INV-404.txt"),
            Err(DocumentError::NotFound(_))
        ));
    }

    #[test]
    fn test_fs_store_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());

        for name in ["", "  ", "../secret.txt", "a/b.txt", "a\\b.txt", "..", "/etc/passwd"] {
            assert!(
                matches!(store.locate(name), Err(DocumentError::InvalidName(_))),
                "accepted {:?}",
                name
            );
            assert!(matches!(
                store.store(name, b"x"),
                Err(DocumentError::InvalidName(_))
            ));
        }
    }
}
