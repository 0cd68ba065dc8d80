//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (rpc_url, tx_hash, nonce, ...)
//!
//! Consumers (logging.rs):
//!     → console layer, filtered by RUST_LOG or the configured level
//!     → optional file layer, always at DEBUG, no ANSI colours
//! ```
//!
//! # Design Decisions
//! - Command results go to stdout; diagnostics go through tracing
//! - Private keys are never attached to events

pub mod logging;

pub use logging::init_logging;
