//! The XLSX report: one header row, one row per extracted policy.
//!
//! Every append rereads the whole workbook, adds the new row and writes the
//! whole workbook back; nothing is streamed. Styling is a separate,
//! best-effort second pass over the file that was just written, so a
//! styling failure can never cost the data.
//!
//! Reading uses calamine, writing uses rust_xlsxwriter. All cells are
//! written as text.

use crate::config::{ExtractorConfig, LoadFailurePolicy};
use crate::error::ExtractError;
use crate::record::PolicyRecord;
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Columns holding long prose: wrapped, and capped at [`MAX_WRAPPED_WIDTH`].
pub const WRAP_COLUMNS: [&str; 5] = [
    "brief_summary",
    "service_summary",
    "reimbursement_detail",
    "non_reimbursement_detail",
    "notes",
];

/// Width cap for wrapped columns, in character units.
pub const MAX_WRAPPED_WIDTH: f64 = 70.0;

/// Padding added to the longest cell when sizing a column.
pub const WIDTH_PADDING: usize = 2;

/// Excel's column limit.
const MAX_COLUMNS: usize = 16_384;

/// In-memory copy of the report worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTable {
    pub headers: Vec<String>,
    /// Data rows, each exactly `headers.len()` cells wide.
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    /// Load the first worksheet of an existing workbook.
    pub fn load(path: &Path) -> Result<Self, ExtractError> {
        let read_error = |detail: String| ExtractError::ReportReadFailed {
            path: path.to_path_buf(),
            detail,
        };

        let mut workbook = open_workbook::<Xlsx<_>, _>(path).map_err(|e| read_error(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| read_error("workbook has no worksheets".into()))?
            .map_err(|e| read_error(e.to_string()))?;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row.iter().map(cell_text).collect(),
            None => Vec::new(),
        };
        let rows: Vec<Vec<String>> = rows
            .map(|row| {
                let mut cells: Vec<String> = row.iter().map(cell_text).collect();
                cells.resize(headers.len(), String::new());
                cells
            })
            .collect();

        debug!(
            "Loaded report '{}': {} columns, {} rows",
            path.display(),
            headers.len(),
            rows.len()
        );
        Ok(Self { headers, rows })
    }

    /// Append one row of `(column, cell)` pairs, aligning by column name.
    ///
    /// The first row fixes the column order. Later rows fill known columns
    /// by name, leave absent ones blank, and add unseen names as trailing
    /// columns (blank in earlier rows).
    pub fn append_row(&mut self, cells: Vec<(String, String)>) {
        let mut row = vec![String::new(); self.headers.len()];
        for (column, value) in cells {
            match self.headers.iter().position(|h| *h == column) {
                Some(idx) => row[idx] = value,
                None => {
                    self.headers.push(column);
                    for existing in &mut self.rows {
                        existing.push(String::new());
                    }
                    row.push(value);
                }
            }
        }
        self.rows.push(row);
    }

    /// Cell at `row` under `column`, if both exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// Write the table, optionally with styling, replacing `path`.
    fn write(&self, path: &Path, styles: Option<&[ColumnStyle]>) -> Result<(), String> {
        if self.headers.len() > MAX_COLUMNS {
            return Err(format!(
                "{} columns exceed the worksheet limit of {}",
                self.headers.len(),
                MAX_COLUMNS
            ));
        }

        let mut workbook = Workbook::new();
        fill_worksheet(&mut workbook, self, styles).map_err(|e| e.to_string())?;

        // Write beside the target and rename, so a failed save leaves the old file intact.
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let tmp_path = tmp_path_for(path);
        workbook.save(&tmp_path).map_err(|e| e.to_string())?;
        std::fs::rename(&tmp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            e.to_string()
        })
    }
}

fn fill_worksheet(
    workbook: &mut Workbook,
    table: &ReportTable,
    styles: Option<&[ColumnStyle]>,
) -> Result<(), XlsxError> {
    let worksheet = workbook.add_worksheet();
    let header_format = Format::new().set_bold();
    let header_wrap_format = Format::new().set_bold().set_text_wrap();
    let wrap_format = Format::new().set_text_wrap();
    let wraps = |col: usize| styles.is_some_and(|s| s.get(col).is_some_and(|c| c.wrap));

    for (col, header) in table.headers.iter().enumerate() {
        let c = col as u16;
        match styles {
            None => worksheet.write_string(0, c, header)?,
            Some(_) if wraps(col) => worksheet.write_string_with_format(0, c, header, &header_wrap_format)?,
            Some(_) => worksheet.write_string_with_format(0, c, header, &header_format)?,
        };
    }

    for (r, row) in table.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            if wraps(col) {
                worksheet.write_string_with_format(r, col as u16, cell, &wrap_format)?;
            } else {
                worksheet.write_string(r, col as u16, cell)?;
            }
        }
    }

    if let Some(styles) = styles {
        for (col, style) in styles.iter().enumerate() {
            worksheet.set_column_width(col as u16, style.width)?;
        }
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Layout applied to one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStyle {
    pub wrap: bool,
    /// Column width in character units.
    pub width: f64,
}

/// Header key used to match [`WRAP_COLUMNS`]: lower-cased, spaces to underscores.
pub fn normalise_header(header: &str) -> String {
    header.to_lowercase().replace(' ', "_")
}

/// Compute the style of every column.
///
/// Width is the longest cell (header included) plus [`WIDTH_PADDING`];
/// wrapped columns are capped at [`MAX_WRAPPED_WIDTH`].
pub fn column_styles(table: &ReportTable) -> Vec<ColumnStyle> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            let longest = std::iter::once(header.as_str())
                .chain(table.rows.iter().map(|row| row[col].as_str()))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            let wrap = WRAP_COLUMNS.contains(&normalise_header(header).as_str());
            let mut width = (longest + WIDTH_PADDING) as f64;
            if wrap {
                width = width.min(MAX_WRAPPED_WIDTH);
            }
            ColumnStyle { wrap, width }
        })
        .collect()
}

/// Result of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Data rows now in the report.
    pub rows: usize,
    /// The existing report was unreadable and has been replaced by the new row.
    pub replaced_unreadable: bool,
    /// Styling was applied.
    pub styled: bool,
}

/// Appends records to the report file.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    path: PathBuf,
    on_load_failure: LoadFailurePolicy,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>, on_load_failure: LoadFailurePolicy) -> Self {
        Self {
            path: path.into(),
            on_load_failure,
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(config.report_path.clone(), config.on_load_failure)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record` as a new row, then restyle the workbook.
    pub fn append(&self, record: &PolicyRecord) -> Result<AppendOutcome, ExtractError> {
        self.append_then_style(record, Self::apply_styling)
    }

    /// Append, then run `style` over the written file. A styling error is
    /// logged and reported in the outcome; the data write stands.
    fn append_then_style<S>(&self, record: &PolicyRecord, style: S) -> Result<AppendOutcome, ExtractError>
    where
        S: FnOnce(&Self) -> Result<(), ExtractError>,
    {
        let (mut table, replaced_unreadable) = self.load_existing()?;
        table.append_row(record.to_row());

        table
            .write(&self.path, None)
            .map_err(|detail| ExtractError::ReportWriteFailed {
                path: self.path.clone(),
                detail,
            })?;
        info!(
            "Updated {} with new policy data ({} rows)",
            self.path.display(),
            table.rows.len()
        );

        let styled = match style(self) {
            Ok(()) => true,
            Err(e) => {
                warn!("{}", e);
                false
            }
        };

        Ok(AppendOutcome {
            rows: table.rows.len(),
            replaced_unreadable,
            styled,
        })
    }

    /// Reopen the report and apply bold headers, wrapping and column widths.
    pub fn apply_styling(&self) -> Result<(), ExtractError> {
        let styling_error = |detail: String| ExtractError::StylingFailed {
            path: self.path.clone(),
            detail,
        };
        let table = ReportTable::load(&self.path).map_err(|e| styling_error(e.to_string()))?;
        let styles = column_styles(&table);
        table.write(&self.path, Some(&styles)).map_err(styling_error)?;
        debug!("Applied styling to {}", self.path.display());
        Ok(())
    }

    fn load_existing(&self) -> Result<(ReportTable, bool), ExtractError> {
        if !self.path.exists() {
            info!("No existing report found, creating {}", self.path.display());
            return Ok((ReportTable::default(), false));
        }

        info!("Existing report found: {}", self.path.display());
        match ReportTable::load(&self.path) {
            Ok(table) => Ok((table, false)),
            Err(e) => match self.on_load_failure {
                LoadFailurePolicy::ReplaceTable => {
                    warn!("{}; the new row will replace the existing table", e);
                    Ok((ReportTable::default(), true))
                }
                LoadFailurePolicy::Abort => Err(e),
            },
        }
    }
}
