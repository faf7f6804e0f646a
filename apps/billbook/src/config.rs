//! # Billbook Configuration
//!
//! Configuration for the invoicing service.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BILLBOOK_SUPPLIER_JURISDICTION=37                                  │
//! │     BILLBOOK_DB_PATH=/srv/billbook/billbook.db                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/billbook/billbook.toml (Linux)                           │
//! │     ~/Library/Application Support/com.billbook.billbook/ (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     18% tax, supplier jurisdiction 37, permissive policies             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # billbook.toml
//! [supplier]
//! name = "Sri Lakshmi Stores"
//! address = "12 Main Road, Guntur"
//! jurisdiction = "37"
//! gstin = "37ABCDE1234F1Z5"
//!
//! [tax]
//! rate_bps = 1800  # 18.00%
//!
//! [database]
//! path = "/srv/billbook/billbook.db"
//! pool_size = 5
//!
//! [documents]
//! output_dir = "/srv/billbook/invoices"
//! format = "text"  # text | json
//!
//! [policy]
//! stock_policy = "allow_negative"  # allow_negative | reject_negative
//! unique_invoice_numbers = false
//! strict_quantities = false
//! reject_empty_invoices = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use billbook_core::invoice::SupplierDetails;
use billbook_core::tax::{TaxConfig, TaxRate};
use billbook_core::{StockPolicy, DEFAULT_SUPPLIER_JURISDICTION, DEFAULT_TAX_RATE_BPS};
use billbook_db::ReconcileOptions;

/// Highest accepted tax rate (100.00%).
const MAX_RATE_BPS: u32 = 10_000;

// =============================================================================
// Config Error
// =============================================================================

/// Errors loading, validating or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Supplier Settings
// =============================================================================

/// Who issues the invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierSettings {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub address: String,

    /// Jurisdiction (state) code compared against each customer's.
    #[serde(default = "default_jurisdiction")]
    pub jurisdiction: String,

    #[serde(default)]
    pub gstin: String,
}

fn default_jurisdiction() -> String {
    DEFAULT_SUPPLIER_JURISDICTION.to_string()
}

impl Default for SupplierSettings {
    fn default() -> Self {
        SupplierSettings {
            name: String::new(),
            address: String::new(),
            jurisdiction: default_jurisdiction(),
            gstin: String::new(),
        }
    }
}

// =============================================================================
// Tax Settings
// =============================================================================

/// Tax rate, in basis points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSettings {
    #[serde(default = "default_rate_bps")]
    pub rate_bps: u32,
}

fn default_rate_bps() -> u32 {
    DEFAULT_TAX_RATE_BPS
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            rate_bps: default_rate_bps(),
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// Where the catalog and ledger live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_pool_size() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            pool_size: default_pool_size(),
        }
    }
}

// =============================================================================
// Document Settings
// =============================================================================

/// Which renderer produces invoice documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Fixed-width plain text.
    #[default]
    Text,
    /// The view model as pretty JSON, for an external renderer.
    Json,
}

impl std::str::FromStr for DocumentFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" => Ok(DocumentFormat::Text),
            "json" => Ok(DocumentFormat::Json),
            other => Err(ConfigError::Invalid(format!(
                "Unknown document format: '{}'. Valid options: text, json",
                other
            ))),
        }
    }
}

/// Where rendered invoices are stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentSettings {
    /// Output directory. Defaults to `invoices/` under the data directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub format: DocumentFormat,
}

// =============================================================================
// Policy Settings
// =============================================================================

/// Behavioral switches for invoice creation.
///
/// Every switch defaults to the permissive behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Whether a sale may drive stock below zero.
    #[serde(default)]
    pub stock_policy: StockPolicy,

    /// Reject an invoice whose number is already in the ledger.
    #[serde(default)]
    pub unique_invoice_numbers: bool,

    /// Fail on the first malformed quantity instead of skipping it.
    #[serde(default)]
    pub strict_quantities: bool,

    /// Refuse to commit an invoice with no lines.
    #[serde(default)]
    pub reject_empty_invoices: bool,
}

// =============================================================================
// Billbook Config
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BillbookConfig {
    #[serde(default)]
    pub supplier: SupplierSettings,

    #[serde(default)]
    pub tax: TaxSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub documents: DocumentSettings,

    #[serde(default)]
    pub policy: PolicySettings,
}

impl BillbookConfig {
    /// Loads configuration from file and environment.
    ///
    /// ## Loading Order
    /// 1. Start with defaults
    /// 2. Load from config file (if exists)
    /// 3. Override with environment variables
    /// 4. Validate
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(path)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.supplier.jurisdiction.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "supplier.jurisdiction must not be empty".into(),
            ));
        }

        if self.tax.rate_bps > MAX_RATE_BPS {
            return Err(ConfigError::Invalid(format!(
                "tax.rate_bps must be at most {}, got {}",
                MAX_RATE_BPS, self.tax.rate_bps
            )));
        }

        if self.database.pool_size == 0 {
            return Err(ConfigError::Invalid(
                "database.pool_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `BILLBOOK_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("BILLBOOK_SUPPLIER_NAME") {
            self.supplier.name = name;
        }

        if let Some(address) = lookup("BILLBOOK_SUPPLIER_ADDRESS") {
            self.supplier.address = address;
        }

        if let Some(code) = lookup("BILLBOOK_SUPPLIER_JURISDICTION") {
            debug!(jurisdiction = %code, "Overriding supplier jurisdiction from environment");
            self.supplier.jurisdiction = code;
        }

        if let Some(gstin) = lookup("BILLBOOK_SUPPLIER_GSTIN") {
            self.supplier.gstin = gstin;
        }

        if let Some(rate) = lookup("BILLBOOK_TAX_RATE_BPS") {
            match rate.trim().parse::<u32>() {
                Ok(bps) => self.tax.rate_bps = bps,
                Err(_) => warn!(value = %rate, "Ignoring invalid BILLBOOK_TAX_RATE_BPS"),
            }
        }

        if let Some(path) = lookup("BILLBOOK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(dir) = lookup("BILLBOOK_DOCUMENTS_DIR") {
            self.documents.output_dir = Some(PathBuf::from(dir));
        }

        if let Some(format) = lookup("BILLBOOK_DOCUMENT_FORMAT") {
            match format.parse() {
                Ok(parsed) => self.documents.format = parsed,
                Err(e) => warn!(error = %e, "Ignoring invalid BILLBOOK_DOCUMENT_FORMAT"),
            }
        }

        if let Some(policy) = lookup("BILLBOOK_STOCK_POLICY") {
            match policy.trim().to_lowercase().as_str() {
                "allow_negative" => self.policy.stock_policy = StockPolicy::AllowNegative,
                "reject_negative" => self.policy.stock_policy = StockPolicy::RejectNegative,
                _ => warn!(value = %policy, "Ignoring invalid BILLBOOK_STOCK_POLICY"),
            }
        }

        override_flag(
            &lookup,
            "BILLBOOK_UNIQUE_INVOICE_NUMBERS",
            &mut self.policy.unique_invoice_numbers,
        );
        override_flag(
            &lookup,
            "BILLBOOK_STRICT_QUANTITIES",
            &mut self.policy.strict_quantities,
        );
        override_flag(
            &lookup,
            "BILLBOOK_REJECT_EMPTY_INVOICES",
            &mut self.policy.reject_empty_invoices,
        );
    }

    /// Default config file location for this platform.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("billbook.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Database file to open: configured path, else the platform data dir.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| data_dir().join("billbook.db"))
    }

    /// Directory rendered documents are written to.
    pub fn documents_dir(&self) -> PathBuf {
        self.documents
            .output_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("invoices"))
    }

    /// Tax configuration for the calculator.
    pub fn tax_config(&self) -> TaxConfig {
        TaxConfig {
            rate: TaxRate::from_bps(self.tax.rate_bps),
            supplier_jurisdiction: self.supplier.jurisdiction.trim().to_string(),
        }
    }

    /// Supplier block printed on every invoice.
    pub fn supplier_details(&self) -> SupplierDetails {
        SupplierDetails {
            name: self.supplier.name.clone(),
            address: self.supplier.address.clone(),
            jurisdiction: self.supplier.jurisdiction.trim().to_string(),
            gstin: self.supplier.gstin.clone(),
        }
    }

    /// Options for the stock reconciliation commit.
    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            stock_policy: self.policy.stock_policy,
            unique_invoice_numbers: self.policy.unique_invoice_numbers,
        }
    }
}

fn override_flag<F>(lookup: &F, key: &str, target: &mut bool)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => *target = true,
            "0" | "false" | "no" | "off" => *target = false,
            _ => warn!(key = key, value = %raw, "Ignoring invalid boolean override"),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "billbook", "billbook")
}

fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

// =============================================================================
// Unit Tests
// =============================================================================
