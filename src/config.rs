//! Runtime configuration from the environment (and `.env` when present).

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::env;
use thiserror::Error;

use crate::logging::LogFormat;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// No URL means positions live in memory for the lifetime of the process.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Initial marks for the static price source.
    pub mark_prices: HashMap<String, Decimal>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: None,
            database_max_connections: 5,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            mark_prices: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        let database_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                reason: format!("'{}' is not a positive integer", v),
            })?,
            Err(_) => defaults.database_max_connections,
        };
        let log_format = match env::var("LOG_FORMAT") {
            Ok(v) => v.parse().map_err(|reason| ConfigError::InvalidValue {
                field: "LOG_FORMAT",
                reason,
            })?,
            Err(_) => defaults.log_format,
        };
        let mark_prices = match env::var("MARK_PRICES") {
            Ok(v) => parse_mark_prices(&v)?,
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            database_max_connections,
            log_level: env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            mark_prices,
        })
    }
}

/// Parse `SYMBOL=price` pairs separated by commas, e.g. `NIFTY=22000.5,BANKNIFTY=48000`.
pub fn parse_mark_prices(raw: &str) -> Result<HashMap<String, Decimal>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let invalid = |reason: String| ConfigError::InvalidValue {
                field: "MARK_PRICES",
                reason,
            };
            let (symbol, price) = pair
                .split_once('=')
                .ok_or_else(|| invalid(format!("'{}' is not SYMBOL=price", pair)))?;
            let price: Decimal = price
                .trim()
                .parse()
                .map_err(|_| invalid(format!("'{}' is not a price", price.trim())))?;
            if price <= Decimal::ZERO {
                return Err(invalid(format!("price for {} must be positive", symbol.trim())));
            }
            Ok((symbol.trim().to_uppercase(), price))
        })
        .collect()
}
