//! Retry classification for transaction submission.
//!
//! # Responsibilities
//! - Decide what a failed submission means for the next attempt
//! - Recognise the nonce errors that repeated command runs retry on

/// What a failed submission tells us about the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// The nonce was already used; fetch a fresh one.
    NonceTooLow,
    /// The node already has this exact transaction; wait for it instead.
    AlreadyKnown,
    /// Anything else; back off and try again with a fresh nonce.
    Other,
}

/// Classify an error message returned by a node.
pub fn classify_error(message: &str) -> RetryClass {
    let lower = message.to_lowercase();
    if lower.contains("nonce too low") {
        RetryClass::NonceTooLow
    } else if lower.contains("already known") || lower.contains("known transaction") {
        RetryClass::AlreadyKnown
    } else {
        RetryClass::Other
    }
}

/// Whether the output of a failed command run indicates a nonce collision.
pub fn is_nonce_collision(output: &str) -> bool {
    output.contains("nonce too low") || output.contains("ALREADY_EXISTS")
}
