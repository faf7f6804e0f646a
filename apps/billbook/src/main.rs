//! # Billbook CLI
//!
//! ```bash
//! billbook init
//! billbook add-product --code RICE-25 --name "Sona Masoori Rice" --hsn 1006 \
//!     --uom KG --rate 48.50 --stock 100
//! billbook invoice --number INV-001 --date 2024-04-01 --customer "Sri Traders" \
//!     --jurisdiction 37 --qty RICE-25=2.5
//! billbook invoices
//! ```
//!
//! Configuration comes from `--config` (or the platform default path) plus
//! `BILLBOOK_*` environment variables. Logs go to stderr; `RUST_LOG`
//! overrides the filter.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};

use billbook_app::config::BillbookConfig;
use billbook_app::service::{Delivery, InvoiceRequest, InvoiceService};
use billbook_core::{Money, NewProduct, Product, Quantity};
use billbook_db::{Database, DbConfig};

#[derive(Debug, Parser)]
#[command(name = "billbook", about = "Tax invoices with stock reconciliation", version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Add a product to the catalog
    AddProduct {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        hsn: String,
        #[arg(long, default_value = "NOS")]
        uom: String,
        /// Tax-inclusive unit rate
        #[arg(long)]
        rate: String,
        /// Opening stock
        #[arg(long, default_value = "0")]
        stock: String,
    },

    /// Add stock to a product
    Restock {
        /// Product code or id
        product: String,
        quantity: String,
    },

    /// Show the catalog with stock on hand
    Stock,

    /// Create an invoice
    Invoice {
        #[arg(long)]
        number: String,
        /// Invoice date, YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long)]
        customer: String,
        /// Customer jurisdiction (state) code
        #[arg(long)]
        jurisdiction: String,
        /// Requested quantity, repeatable
        #[arg(long = "qty", value_name = "PRODUCT=QTY")]
        quantities: Vec<String>,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List invoices, newest first
    Invoices,

    /// Show one invoice and its document
    Show { number: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    billbook_app::init_tracing();
    let cli = Cli::parse();

    let config = BillbookConfig::load(cli.config.clone()).context("loading configuration")?;

    if let Command::Init { force } = cli.command {
        return init(&config, cli.config, force).await;
    }

    let service = InvoiceService::from_config(open_database(&config).await?, &config);

    match cli.command {
        Command::Init { .. } => bail!("init runs before the database is opened"),
        Command::AddProduct {
            code,
            name,
            hsn,
            uom,
            rate,
            stock,
        } => {
            let rate: Money = rate
                .trim()
                .parse()
                .with_context(|| format!("rate '{}' is not a number", rate))?;
            let opening_stock = Quantity::parse_input("stock", &stock)?.unwrap_or(Quantity::ZERO);

            let product = service
                .add_product(NewProduct {
                    code,
                    name,
                    hsn,
                    uom,
                    rate,
                    opening_stock,
                })
                .await?;
            println!("Added {} ({})", product.code, product.id);
        }
        Command::Restock { product, quantity } => {
            let quantity = Quantity::parse_input("quantity", &quantity)?
                .ok_or_else(|| anyhow!("quantity is required"))?;
            let target = resolve_product(&service, &product).await?;

            let delta = service.restock(&target.id, quantity).await?;
            println!("{}: {} -> {}", delta.code, delta.before, delta.after);
        }
        Command::Stock => {
            let products = service.list_products().await?;
            println!(
                "{:<12} {:<28} {:<8} {:<5} {:>10} {:>10}",
                "CODE", "NAME", "HSN", "UOM", "RATE", "STOCK"
            );
            for p in products {
                println!(
                    "{:<12} {:<28} {:<8} {:<5} {:>10} {:>10}",
                    p.code, p.name, p.hsn, p.uom, p.rate, p.stock
                );
            }
        }
        Command::Invoice {
            number,
            date,
            customer,
            jurisdiction,
            quantities,
            json,
        } => {
            let quantities = parse_quantities(&service, &quantities).await?;
            let outcome = service
                .create_invoice(InvoiceRequest {
                    number,
                    date,
                    customer_name: customer,
                    customer_jurisdiction: jurisdiction,
                    quantities,
                })
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(());
            }

            let doc = &outcome.document;
            println!("Invoice {} committed", outcome.record.invoice_number);
            println!("  Lines:         {}", doc.lines.len());
            println!("  Taxable value: {}", doc.taxable_value);
            println!("  Tax:           {}", doc.total_tax());
            println!("  Grand total:   {}", doc.grand_total);
            println!("  In words:      {}", doc.amount_in_words);
            for skip in &outcome.skipped {
                println!("  Skipped {}: {}", skip.code, skip.reason);
            }
            for id in &outcome.unknown_products {
                println!("  Unknown product: {}", id);
            }
            match &outcome.delivery {
                Delivery::Stored { location } => println!("  Document:      {}", location.display()),
                Delivery::Failed { stage, reason } => {
                    println!("  Document NOT delivered ({:?}): {}", stage, reason)
                }
            }
        }
        Command::Invoices => {
            let records = service.list_invoices().await?;
            println!(
                "{:<16} {:<10} {:<28} {:>12}",
                "NUMBER", "DATE", "CUSTOMER", "TOTAL"
            );
            for r in records {
                println!(
                    "{:<16} {:<10} {:<28} {:>12}",
                    r.invoice_number, r.invoice_date, r.customer_name, r.grand_total
                );
            }
        }
        Command::Show { number } => {
            let record = service.find_invoice(&number).await?;
            println!("Invoice:  {}", record.invoice_number);
            println!("Date:     {}", record.invoice_date);
            println!("Customer: {}", record.customer_name);
            println!("Total:    {}", record.grand_total);
            match service.document_path(&record.document_ref) {
                Ok(path) => println!("Document: {}", path.display()),
                Err(e) => println!("Document: {} ({})", record.document_ref, e.message),
            }
        }
    }

    Ok(())
}

async fn init(config: &BillbookConfig, path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let target = path
        .or_else(BillbookConfig::default_config_path)
        .ok_or_else(|| anyhow!("no config path available; pass --config"))?;

    if target.exists() && !force {
        println!("Config already exists at {}", target.display());
    } else {
        let mut written = config.clone();
        written.database.path = Some(config.database_path());
        written.documents.output_dir = Some(config.documents_dir());
        written.save(Some(target.clone()))?;
        println!("Wrote {}", target.display());
    }

    let db = open_database(config).await?;
    let status = db.migration_status().await?;
    println!(
        "Database ready at {} ({} of {} migrations applied)",
        config.database_path().display(),
        status.applied,
        status.embedded
    );
    db.close().await;
    Ok(())
}

async fn open_database(config: &BillbookConfig) -> anyhow::Result<Database> {
    let path = config.database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let db = Database::new(DbConfig::new(&path).pool_size(config.database.pool_size))
        .await
        .with_context(|| format!("opening database {}", path.display()))?;
    Ok(db)
}

/// Accepts a product code or id.
async fn resolve_product(service: &InvoiceService, key: &str) -> anyhow::Result<Product> {
    let catalog = service.list_products().await?;
    catalog
        .into_iter()
        .find(|p| p.code == key.trim() || p.id == key.trim())
        .ok_or_else(|| anyhow!("no product with code or id '{}'", key))
}

/// Parses repeated `PRODUCT=QTY` flags into the id-keyed request map.
///
/// Codes are translated to ids; anything else is passed through so the
/// service reports it as unknown.
async fn parse_quantities(
    service: &InvoiceService,
    raw: &[String],
) -> anyhow::Result<HashMap<String, String>> {
    let catalog = service.list_products().await?;
    let mut quantities = HashMap::new();

    for entry in raw {
        let Some((key, qty)) = entry.split_once('=') else {
            bail!("expected PRODUCT=QTY, got '{}'", entry);
        };
        let key = key.trim();
        let id = catalog
            .iter()
            .find(|p| p.code == key || p.id == key)
            .map(|p| p.id.clone())
            .unwrap_or_else(|| key.to_string());
        quantities.insert(id, qty.to_string());
    }

    Ok(quantities)
}
