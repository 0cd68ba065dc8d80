//! Top-level comparison of two YAML configuration files.
//!
//! # Data Flow
//! ```text
//! a.yaml, b.yaml
//!     → load_yaml (must be mappings)
//!     → compare (union of top-level keys, sorted, differing entries only)
//!     → to_markdown / write_csv
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Rendered in place of a key absent from one file.
pub const NOT_PRESENT: &str = "Not Present";

pub const DEFAULT_MARKDOWN_OUTPUT: &str = "differences.md";
pub const DEFAULT_CSV_OUTPUT: &str = "differences.csv";

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{0} is not a YAML mapping")]
    NotAMapping(PathBuf),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

pub type DiffResult<T> = Result<T, DiffError>;

/// One differing parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    pub parameter: String,
    pub left: String,
    pub right: String,
}

pub fn load_yaml(path: &Path) -> DiffResult<Mapping> {
    let content = fs::read_to_string(path).map_err(|source| DiffError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_yaml(&content, path)
}

fn parse_yaml(content: &str, path: &Path) -> DiffResult<Mapping> {
    let value: Value = serde_yaml::from_str(content).map_err(|source| DiffError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        // An empty document has no keys.
        Value::Null => Ok(Mapping::new()),
        _ => Err(DiffError::NotAMapping(path.to_path_buf())),
    }
}

/// Entries whose top-level values differ, sorted by key.
pub fn compare(left: &Mapping, right: &Mapping) -> Vec<Difference> {
    let mut keys: BTreeMap<String, &Value> = BTreeMap::new();
    for key in left.keys().chain(right.keys()) {
        keys.entry(render_value(key)).or_insert(key);
    }

    keys.into_iter()
        .filter_map(|(parameter, key)| {
            let l = left.get(key);
            let r = right.get(key);
            if l == r {
                return None;
            }
            Some(Difference {
                parameter,
                left: l.map_or_else(|| NOT_PRESENT.to_string(), render_value),
                right: r.map_or_else(|| NOT_PRESENT.to_string(), render_value),
            })
        })
        .collect()
}

/// Compare two files.
pub fn compare_files(left: &Path, right: &Path) -> DiffResult<Vec<Difference>> {
    Ok(compare(&load_yaml(left)?, &load_yaml(right)?))
}

/// Scalars as plain text, collections as inline JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => render_value(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => serde_json::to_string(value)
            .unwrap_or_else(|_| serde_yaml::to_string(value).unwrap_or_default().trim().to_string()),
    }
}

pub fn to_markdown(differences: &[Difference], left_name: &str, right_name: &str) -> String {
    let mut out = format!("# Differences Between `{}` and `{}`\n\n", left_name, right_name);
    out.push_str(&format!(
        "| Parameter | {} Value | {} Value |\n",
        left_name, right_name
    ));
    out.push_str("|-----------|-------------|-------------|\n");
    for diff in differences {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            escape_cell(&diff.parameter),
            escape_cell(&diff.left),
            escape_cell(&diff.right)
        ));
    }
    out
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

/// CSV with header `Parameter,File1,File2`.
pub fn write_csv<W: io::Write>(differences: &[Difference], writer: W) -> DiffResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Parameter", "File1", "File2"])?;
    for diff in differences {
        csv.write_record([&diff.parameter, &diff.left, &diff.right])?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write both reports.
pub fn write_reports(
    differences: &[Difference],
    left_name: &str,
    right_name: &str,
    markdown_path: &Path,
    csv_path: &Path,
) -> DiffResult<()> {
    fs::write(markdown_path, to_markdown(differences, left_name, right_name)).map_err(|source| {
        DiffError::Io {
            path: markdown_path.to_path_buf(),
            source,
        }
    })?;
    let file = fs::File::create(csv_path).map_err(|source| DiffError::Io {
        path: csv_path.to_path_buf(),
        source,
    })?;
    write_csv(differences, file)?;
    tracing::debug!(
        differences = differences.len(),
        markdown = %markdown_path.display(),
        csv = %csv_path.display(),
        "Reports written"
    );
    Ok(())
}
