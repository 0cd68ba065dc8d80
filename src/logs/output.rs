//! Writing downloaded entries to disk and to the console.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::logs::{LogEntry, LogsError, LogsResult};

const PREVIEW_WIDTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed array of entries with labels.
    #[default]
    Json,
    /// `datetime | log` per line.
    Txt,
}

pub fn save_logs(entries: &[LogEntry], path: &Path, format: OutputFormat) -> LogsResult<()> {
    let io_err = |source| LogsError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, entries)?;
            writeln!(out).map_err(io_err)?;
        }
        OutputFormat::Txt => {
            for entry in entries {
                writeln!(out, "{} | {}", entry.datetime, entry.log).map_err(io_err)?;
            }
        }
    }
    out.flush().map_err(io_err)?;

    tracing::info!(count = entries.len(), path = %path.display(), "Saved log entries");
    Ok(())
}

/// First `count` entries as numbered console lines.
pub fn preview(entries: &[LogEntry], count: usize) -> Vec<String> {
    let mut lines: Vec<String> = entries
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, entry)| {
            let log: String = entry.log.chars().take(PREVIEW_WIDTH).collect();
            format!("{}. {}: {}...", i + 1, entry.datetime, log)
        })
        .collect();
    if entries.len() > count {
        lines.push(format!("... and {} more entries", entries.len() - count));
    }
    lines
}
