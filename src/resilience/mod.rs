//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Transaction submission fails:
//!     → retries.rs (classify the node's error message)
//!     → backoff.rs (delay before the next attempt)
//!     → caller refreshes the nonce or waits for the known hash
//! ```
//!
//! # Design Decisions
//! - Classification is by message text; nodes do not agree on error codes
//! - Attempts are bounded by `transactions.max_retries`

pub mod backoff;
pub mod retries;

pub use backoff::calculate_backoff;
pub use retries::{classify_error, is_nonce_collision, RetryClass};
