use anyhow::{Result, Context};
use chrono::{DateTime, Local};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::crawler::{Mode, Table};

/// File name for a result file: `<mode>_<YYYY-mm-dd_HH-MM-SS>.csv`
pub fn results_filename(mode: Mode, now: DateTime<Local>) -> String {
    format!("{}_{}.csv", mode, now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Quote a CSV field, doubling embedded quotes
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Write the table as CSV, every field quoted, header first
pub fn write_csv<W: Write>(table: &Table, mut out: W) -> Result<()> {
    for row in table.rows() {
        let line: Vec<String> = row.iter().map(|value| csv_field(value)).collect();
        writeln!(out, "{}", line.join(","))
            .context("Failed to write CSV row")?;
    }
    out.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Save the table into `results_dir`, returning the new file's path
pub fn save_results(table: &Table, mode: Mode, results_dir: &Path) -> Result<PathBuf> {
    // Create the results directory if it doesn't exist
    if !results_dir.exists() {
        fs::create_dir_all(results_dir)
            .context(format!("Failed to create directory: {}", results_dir.display()))?;
    }

    let file_path = results_dir.join(results_filename(mode, Local::now()));
    let file = fs::File::create(&file_path)
        .context(format!("Failed to create output file: {}", file_path.display()))?;

    write_csv(table, std::io::BufWriter::new(file))?;
    debug!("Exported {} rows to CSV file: {}", table.body().len(), file_path.display());

    Ok(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn table() -> Table {
        let mut table = Table::with_header(["Link to article", "Title", "Editor, Author"]);
        table.push([
            "https://docs.python.org/3/whatsnew/3.12.html".to_string(),
            "What's New In Python 3.12".to_string(),
            "Editor: Adam \"AA\" Turner".to_string(),
        ]);
        table
    }

    #[test]
    fn test_csv_quotes_every_field() {
        let mut out = Vec::new();
        write_csv(&table(), &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"Link to article\",\"Title\",\"Editor, Author\"\n\
             \"https://docs.python.org/3/whatsnew/3.12.html\",\"What's New In Python 3.12\",\"Editor: Adam \"\"AA\"\" Turner\"\n"
        );
    }

    #[test]
    fn test_results_filename() {
        let now = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(results_filename(Mode::LatestVersions, now), "latest-versions_2024-03-05_14-07-09.csv");
    }

    #[test]
    fn test_save_results_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let results_dir = dir.path().join("results");

        let path = save_results(&table(), Mode::WhatsNew, &results_dir).unwrap();

        assert!(path.starts_with(&results_dir));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("whats-new_"));
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }
}
