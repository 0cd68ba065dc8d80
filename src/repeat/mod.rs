//! Run an external command repeatedly.
//!
//! # Data Flow
//! ```text
//! "<command string>"
//!     → template.rs (shell-style split, {REPLACE} + nonce source detection)
//!     → runner.rs
//!         sequential: run, delay, prompt on failure
//!         concurrent: staggered starts, semaphore, captured output,
//!                     retry on nonce collisions, Ctrl-C cancels the rest
//!     → RunSummary
//! ```

pub mod runner;
pub mod template;

use thiserror::Error;

use crate::blockchain::BlockchainError;

pub use runner::{run_concurrent, run_sequential, NonceFetcher, RunSummary, RunnerConfig};
pub use template::{CommandTemplate, NonceSource, PLACEHOLDER};

#[derive(Debug, Error)]
pub enum RepeatError {
    #[error("Cannot parse command: {0}")]
    InvalidCommand(String),

    #[error("{{REPLACE}} found but couldn't extract --private-key and --rpc-url from command")]
    MissingNonceSource,

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),
}

pub type RepeatResult<T> = Result<T, RepeatError>;
