//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - List the catalog in creation order (the invoice line order)
//! - Add a product
//! - Restock (add quantity) under the write lock
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Stock is decimal TEXT, so SQLite cannot do `stock = stock - ?`     │
//! │  exactly. Every stock change is read-modify-write:                  │
//! │                                                                     │
//! │   write lock ──► BEGIN ──► SELECT stock ──► compute in Rust         │
//! │              ──► UPDATE stock = ? ──► COMMIT ──► release lock       │
//! │                                                                     │
//! │  The lock is shared with the invoice commit, so a restock and a     │
//! │  sale can never interleave and lose an update.                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use billbook_core::{CoreError, NewProduct, Product, Quantity, StockDelta};

use super::{decimal_text, parse_column};
use crate::error::{DbError, DbResult};
use crate::pool::WriteLock;

const PRODUCT_COLUMNS: &str = "id, code, name, hsn, uom, rate, stock, created_at, updated_at";

/// Raw `products` row; decimals still TEXT.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    code: String,
    name: String,
    hsn: String,
    uom: String,
    rate: String,
    stock: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        Ok(Product {
            rate: parse_column("products.rate", &row.rate)?,
            stock: parse_column("products.stock", &row.stock)?,
            id: row.id,
            code: row.code,
            name: row.name,
            hsn: row.hsn,
            uom: row.uom,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Repository for catalog operations.
///
/// ## Usage
/// ```rust,ignore
/// let catalog = db.products().list().await?;
/// let delta = db.products().restock(&id, Quantity::from_units(5)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    write_lock: WriteLock,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, write_lock: WriteLock) -> Self {
        ProductRepository { pool, write_lock }
    }

    /// Lists the whole catalog in creation order.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> =
            sqlx::query_as(&format!("SELECT {} FROM products ORDER BY seq", PRODUCT_COLUMNS))
                .fetch_all(&self.pool)
                .await?;

        debug!(count = rows.len(), "Loaded catalog");
        into_products(rows)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Product::try_from).transpose()
    }

    /// Gets a product by its code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE code = ?1",
            PRODUCT_COLUMNS
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Inserts a new product with a fresh UUID.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn insert(&self, new_product: &NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            code: new_product.code.trim().to_string(),
            name: new_product.name.trim().to_string(),
            hsn: new_product.hsn.trim().to_string(),
            uom: new_product.uom.trim().to_string(),
            rate: new_product.rate,
            stock: new_product.opening_stock,
            created_at: now,
            updated_at: now,
        };

        debug!(code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, hsn, uom, rate, stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.hsn)
        .bind(&product.uom)
        .bind(decimal_text(product.rate.amount()))
        .bind(decimal_text(product.stock.value().normalize()))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.code.clone(),
            },
            other => other,
        })?;

        info!(id = %product.id, code = %product.code, "Product added");
        Ok(product)
    }

    /// Adds `quantity` to a product's on-hand stock.
    ///
    /// The caller validates that `quantity` is positive.
    pub async fn restock(&self, id: &str, quantity: Quantity) -> DbResult<StockDelta> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let (code, before) = stock_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;
        let after = before
            .checked_add(quantity)
            .ok_or_else(|| CoreError::out_of_range(format!("Stock for {}", code)))?;

        set_stock(&mut tx, id, after, Utc::now()).await?;
        tx.commit().await?;

        info!(
            id = %id,
            code = %code,
            before = %before,
            after = %after,
            "Product restocked"
        );

        Ok(StockDelta {
            product_id: id.to_string(),
            code,
            quantity,
            before,
            after,
        })
    }

    /// Counts catalog products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (used inside transactions)
// =============================================================================

/// Reads `(code, stock)` for a product on an open connection.
pub(crate) async fn stock_for_update(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<(String, Quantity)>> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT code, stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    match row {
        Some((code, stock)) => Ok(Some((code, parse_column("products.stock", &stock)?))),
        None => Ok(None),
    }
}

/// Writes an absolute stock value on an open connection.
///
/// Fails with `NotFound` when no row was updated.
pub(crate) async fn set_stock(
    conn: &mut SqliteConnection,
    id: &str,
    stock: Quantity,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(decimal_text(stock.value().normalize()))
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
