//! # Seed Data Generator
//!
//! Populates the database with a development catalog.
//!
//! ## Usage
//! ```bash
//! # Seed the default catalog into ./billbook_dev.db
//! cargo run -p billbook-db --bin seed
//!
//! # Limit the number of products
//! cargo run -p billbook-db --bin seed -- --count 10
//!
//! # Specify database path
//! cargo run -p billbook-db --bin seed -- --db ./data/billbook.db
//! ```
//!
//! Each product gets a code `{CATEGORY}-{NNN}`, an HSN code, a unit of
//! measure, a tax-inclusive rate and an opening stock. Weighed goods get
//! fractional stock so invoices can exercise decimal quantities.

use anyhow::Context;
use clap::Parser;
use rust_decimal::Decimal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use billbook_core::{Money, NewProduct, Quantity};
use billbook_db::{Database, DbConfig};

#[derive(Debug, Parser)]
#[command(about = "Seed a development product catalog", long_about = None)]
struct Options {
    /// Maximum number of products (default: the whole catalog)
    #[arg(short, long)]
    count: Option<usize>,

    /// Database file path
    #[arg(short, long, value_name = "PATH", default_value = "./billbook_dev.db")]
    db: String,
}

/// (category code, HSN, unit of measure, names)
const CATEGORIES: &[(&str, &str, &str, &[&str])] = &[
    (
        "GRN",
        "1006",
        "KG",
        &["Sona Masoori Rice", "Basmati Rice", "Wheat Atta", "Ragi Flour", "Rava"],
    ),
    (
        "PLS",
        "0713",
        "KG",
        &["Toor Dal", "Moong Dal", "Chana Dal", "Urad Dal", "Masoor Dal"],
    ),
    (
        "OIL",
        "1512",
        "LTR",
        &["Sunflower Oil", "Groundnut Oil", "Mustard Oil", "Rice Bran Oil"],
    ),
    (
        "SPC",
        "0910",
        "NOS",
        &["Turmeric 100g", "Chilli Powder 200g", "Coriander 100g", "Garam Masala 50g"],
    ),
    (
        "BEV",
        "0902",
        "NOS",
        &["Tea 250g", "Filter Coffee 500g", "Green Tea 100g"],
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = Options::parse();
    let limit = opts.count.unwrap_or(usize::MAX);

    let db = Database::new(DbConfig::new(&opts.db))
        .await
        .with_context(|| format!("opening {}", opts.db))?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, path = %opts.db, "Catalog already seeded, delete the file to regenerate");
        return Ok(());
    }

    let mut generated = 0;
    'outer: for (category, hsn, uom, names) in CATEGORIES {
        for name in names.iter() {
            if generated >= limit {
                break 'outer;
            }

            let product = generate_product(category, hsn, uom, name, generated);
            match db.products().insert(&product).await {
                Ok(stored) => {
                    println!(
                        "  {:<8} {:<22} {:>9} x {}",
                        stored.code, stored.name, stored.rate, stored.stock
                    );
                    generated += 1;
                }
                Err(e) => warn!(code = %product.code, error = %e, "Insert failed"),
            }
        }
    }

    info!(generated, path = %opts.db, "Seeded catalog");
    db.close().await;
    Ok(())
}

/// Builds one catalog entry from deterministic pseudo-random values.
fn generate_product(category: &str, hsn: &str, uom: &str, name: &str, seed: usize) -> NewProduct {
    let seed = seed as i64;

    // 20.00 - 519.50 in steps of 0.50
    let rate = Money::from_minor(2000 + (seed * 3719 % 1000) * 50);

    // Weighed goods get a half-unit remainder
    let whole = 5 + (seed * 17) % 95;
    let opening_stock = if uom == "NOS" {
        Quantity::from_units(whole)
    } else {
        Quantity::new(Decimal::new(whole * 10 + 5, 1))
    };

    NewProduct {
        code: format!("{}-{:03}", category, seed + 1),
        name: name.to_string(),
        hsn: hsn.to_string(),
        uom: uom.to_string(),
        rate,
        opening_stock,
    }
}
