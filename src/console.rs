//! Interactive prompts.
//!
//! Every prompt has a flag that answers it up front (`--yes`,
//! `--cancel-pending`, `--keep-going`) so commands can run unattended.

use std::io::{self, BufRead, Write};

/// Ask a yes/no question on stderr and read the answer from stdin.
///
/// Returns `true` immediately when `assume_yes` is set. Only `y` and `yes`
/// (any case) count as consent; EOF counts as no.
pub fn confirm(prompt: &str, assume_yes: bool) -> io::Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let answer = prompt_line(&format!("{} (y/n): ", prompt))?;
    Ok(is_yes(&answer))
}

/// Print `prompt` and read one line from stdin, without the trailing newline.
pub fn prompt_line(prompt: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", prompt)?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Print `prompt` and read a secret from the terminal without echoing it.
pub fn prompt_password(prompt: &str) -> io::Result<String> {
    rpassword::prompt_password(prompt)
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
