//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs before any connection is attempted
//! - Validate value ranges (timeouts > 0, multipliers >= 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::AppConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `rpc.url`.
    pub field: String,
    /// Human readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = url::Url::parse(&config.rpc.url) {
        errors.push(ValidationError::new("rpc.url", format!("invalid URL: {}", e)));
    }
    for (i, failover) in config.rpc.failover_urls.iter().enumerate() {
        if let Err(e) = url::Url::parse(failover) {
            errors.push(ValidationError::new(
                &format!("rpc.failover_urls[{}]", i),
                format!("invalid URL: {}", e),
            ));
        }
    }
    if config.rpc.timeout_secs == 0 {
        errors.push(ValidationError::new("rpc.timeout_secs", "must be greater than 0"));
    }

    let tx = &config.transactions;
    if tx.receipt_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "transactions.receipt_timeout_secs",
            "must be greater than 0",
        ));
    }
    if tx.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "transactions.poll_interval_ms",
            "must be greater than 0",
        ));
    }
    if tx.max_retries == 0 {
        errors.push(ValidationError::new("transactions.max_retries", "must be at least 1"));
    }
    if tx.gas_price_multiplier.is_nan() || tx.gas_price_multiplier < 1.0 {
        errors.push(ValidationError::new(
            "transactions.gas_price_multiplier",
            "must be at least 1.0",
        ));
    }
    if tx.cancel_gas_price_multiplier == 0 {
        errors.push(ValidationError::new(
            "transactions.cancel_gas_price_multiplier",
            "must be at least 1",
        ));
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "logging.level",
            format!("unknown level '{}'", config.logging.level),
        ));
    }

    if let Some(grafana_url) = &config.grafana.url {
        if let Err(e) = url::Url::parse(grafana_url) {
            errors.push(ValidationError::new("grafana.url", format!("invalid URL: {}", e)));
        }
    }
    if config.grafana.timeout_secs == 0 {
        errors.push(ValidationError::new("grafana.timeout_secs", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
