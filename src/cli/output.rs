use anyhow::Result;
use clap::ValueEnum;
use tracing::info;

use crate::cli::config::PathSettings;
use crate::crawler::{Mode, Table};
use crate::storage::results::save_results;

/// How results are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Bordered text table
    Pretty,
    /// CSV file in the results directory
    File,
}

/// Hand the rows of a finished mode to the selected output
pub fn control_output(table: &Table, output: Option<OutputMode>, mode: Mode, paths: &PathSettings) -> Result<()> {
    match output {
        Some(OutputMode::Pretty) => print!("{}", pretty_table(table)),
        Some(OutputMode::File) => {
            let path = save_results(table, mode, &paths.results_dir)?;
            info!("Results saved to: {}", path.display());
        }
        None => print!("{}", plain_rows(table)),
    }
    Ok(())
}

/// One line per row, cells separated by spaces
pub fn plain_rows(table: &Table) -> String {
    table
        .rows()
        .iter()
        .map(|row| format!("{}\n", row.join(" ")))
        .collect()
}

/// Left-aligned table with borders around the header and the body
pub fn pretty_table(table: &Table) -> String {
    let widths: Vec<usize> = (0..table.width())
        .map(|col| {
            table
                .rows()
                .iter()
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let border: String = widths
        .iter()
        .map(|width| format!("+{}", "-".repeat(width + 2)))
        .chain(std::iter::once("+\n".to_string()))
        .collect();

    let line = |row: &[String]| -> String {
        let cells: String = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("| {:<width$} ", cell, width = *width))
            .collect();
        format!("{}|\n", cells)
    };

    let mut out = String::new();
    out.push_str(&border);
    out.push_str(&line(table.header()));
    out.push_str(&border);
    for row in table.body() {
        out.push_str(&line(row.as_slice()));
    }
    out.push_str(&border);
    out
}
