//! Aggregation of per-repository CK output into the consolidated report.

use anyhow::{Context, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

pub const REPORT_SHEET: &str = "Metrics";

#[derive(Debug, Clone, Copy)]
pub struct ReportSummary {
    pub files_read: usize,
    pub rows_appended: usize,
}

/// Walk `results_dir` for CSV files at any depth and merge their rows into
/// the spreadsheet at `report_path`.
///
/// On a fresh report the header row (taken from the first CSV encountered)
/// is written first; when the report already exists its rows are carried
/// over unchanged and only data rows are appended, so the header appears
/// exactly once no matter how many runs accumulate. Column consistency
/// across files and runs is the caller's responsibility.
pub fn aggregate_results(results_dir: &Path, report_path: &Path) -> Result<ReportSummary> {
    let mut header: Option<Vec<String>> = None;
    let mut data_rows: Vec<Vec<String>> = Vec::new();
    let mut files_read = 0;

    // Sorted walk keeps repeated runs deterministic; cross-repository row
    // order is walk order, not star rank.
    for entry in WalkDir::new(results_dir).sort_by_file_name() {
        let entry = entry.with_context(|| {
            format!("Failed to walk results directory {}", results_dir.display())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|ext| ext.to_str()) != Some("csv") {
            continue;
        }

        debug!("Reading {}", entry.path().display());
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(entry.path())
            .with_context(|| format!("Failed to open {}", entry.path().display()))?;

        if header.is_none() {
            let headers = reader
                .headers()
                .with_context(|| format!("Failed to read header of {}", entry.path().display()))?;
            header = Some(headers.iter().map(str::to_string).collect());
        }
        for record in reader.records() {
            let record = record
                .with_context(|| format!("Failed to read row in {}", entry.path().display()))?;
            data_rows.push(record.iter().map(str::to_string).collect());
        }
        files_read += 1;
    }

    let rows_appended = data_rows.len();
    let mut all_rows: Vec<Vec<String>> = Vec::new();
    if report_path.exists() {
        all_rows = read_existing_rows(report_path)?;
        info!(
            "Appending {} rows to existing report {}",
            rows_appended,
            report_path.display()
        );
    } else if let Some(header) = header {
        all_rows.push(header);
    }
    all_rows.extend(data_rows);

    write_report(report_path, &all_rows)?;
    Ok(ReportSummary {
        files_read,
        rows_appended,
    })
}

fn read_existing_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open existing report {}", path.display()))?;
    let range = workbook
        .worksheet_range(REPORT_SHEET)
        .with_context(|| format!("Report {} has no {} sheet", path.display(), REPORT_SHEET))?;

    let mut rows = Vec::with_capacity(range.height());
    for row in range.rows() {
        rows.push(row.iter().map(cell_to_string).collect());
    }
    Ok(rows)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn write_report(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(REPORT_SHEET)?;

    for (row_index, row) in rows.iter().enumerate() {
        for (col_index, value) in row.iter().enumerate() {
            let row_index = row_index as u32;
            let col_index = col_index as u16;
            // Numeric metric values stay numbers in the sheet; everything
            // else (class names, headers, paths) is written as text.
            if row_index > 0 && !value.is_empty() {
                if let Ok(number) = value.parse::<f64>() {
                    worksheet.write_number(row_index, col_index, number)?;
                    continue;
                }
            }
            worksheet.write_string(row_index, col_index, value)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    Ok(())
}
