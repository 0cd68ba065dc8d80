//! `chainops config-diff`

use std::path::PathBuf;

use clap::Args;

use crate::config_diff::{compare_files, write_reports, DEFAULT_CSV_OUTPUT, DEFAULT_MARKDOWN_OUTPUT};
use crate::error::Result;

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// First YAML file
    pub file1: PathBuf,

    /// Second YAML file
    pub file2: PathBuf,

    /// CSV output
    #[arg(long, alias = "output_csv", default_value = DEFAULT_CSV_OUTPUT)]
    pub output_csv: PathBuf,

    /// Markdown output
    #[arg(long, alias = "output_md", default_value = DEFAULT_MARKDOWN_OUTPUT)]
    pub output_md: PathBuf,
}

pub fn run(args: DiffArgs) -> Result<()> {
    let differences = compare_files(&args.file1, &args.file2)?;
    write_reports(
        &differences,
        &args.file1.display().to_string(),
        &args.file2.display().to_string(),
        &args.output_md,
        &args.output_csv,
    )?;

    println!("Found {} differing parameter(s)", differences.len());
    println!("Comparison complete. Differences saved to:");
    println!("- CSV: {}", args.output_csv.display());
    println!("- Markdown: {}", args.output_md.display());
    Ok(())
}
