//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     Ctrl-C → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every concurrent run stops before its next start
//!     → in-flight child processes are killed
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
