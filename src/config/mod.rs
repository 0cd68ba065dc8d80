//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! chainops.toml (optional, --config or CHAINOPS_CONFIG)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → command-line flags override individual values per subcommand
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so the file itself is optional
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets are not expected in the file; they come from flags or env vars

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AppConfig, GrafanaConfig, LoggingConfig, RpcConfig, SlackConfig, TransactionConfig,
};
