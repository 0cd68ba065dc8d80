//! Command templates with nonce substitution.

use crate::repeat::{RepeatError, RepeatResult};

/// Replaced with the account's pending nonce before every run.
pub const PLACEHOLDER: &str = "{REPLACE}";

/// Account whose nonce fills the placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceSource {
    pub private_key: String,
    pub rpc_url: String,
}

/// A parsed command line.
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    args: Vec<String>,
    nonce_source: Option<NonceSource>,
}

impl CommandTemplate {
    /// Split `command` shell-style and look for the nonce source.
    ///
    /// The placeholder requires both `--private-key` and `--rpc-url` to be
    /// present in the command, either as `--flag value` or `--flag=value`.
    pub fn parse(command: &str) -> RepeatResult<Self> {
        let normalized = command.replace("\\\n", " ").replace(['\n', '\r'], " ");
        let args = shlex::split(&normalized)
            .ok_or_else(|| RepeatError::InvalidCommand("unbalanced quotes".to_string()))?;
        if args.is_empty() {
            return Err(RepeatError::InvalidCommand("empty command".to_string()));
        }

        let nonce_source = if args.iter().any(|a| a.contains(PLACEHOLDER)) {
            let private_key = flag_value(&args, "--private-key");
            let rpc_url = flag_value(&args, "--rpc-url");
            match (private_key, rpc_url) {
                (Some(private_key), Some(rpc_url)) => Some(NonceSource {
                    private_key,
                    rpc_url,
                }),
                _ => return Err(RepeatError::MissingNonceSource),
            }
        } else {
            None
        };

        Ok(Self { args, nonce_source })
    }

    pub fn nonce_source(&self) -> Option<&NonceSource> {
        self.nonce_source.as_ref()
    }

    /// Argument vector with the placeholder replaced by `nonce`.
    pub fn render(&self, nonce: Option<u64>) -> Vec<String> {
        match nonce {
            Some(nonce) => {
                let nonce = nonce.to_string();
                self.args
                    .iter()
                    .map(|a| a.replace(PLACEHOLDER, &nonce))
                    .collect()
            }
            None => self.args.clone(),
        }
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{}=", flag);
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            return iter.next().cloned();
        }
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
    }
    None
}

/// Render an argument vector for display, quoting where needed. The value
/// of `--private-key` is masked.
pub fn display_args(args: &[String]) -> String {
    let mut masked = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        if hide_next {
            masked.push("***".to_string());
            hide_next = false;
        } else if arg == "--private-key" {
            masked.push(arg.clone());
            hide_next = true;
        } else if arg.starts_with("--private-key=") {
            masked.push("--private-key=***".to_string());
        } else {
            masked.push(arg.clone());
        }
    }
    shlex::try_join(masked.iter().map(String::as_str)).unwrap_or_else(|_| masked.join(" "))
}
