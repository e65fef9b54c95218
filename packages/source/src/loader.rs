//! Workbook discovery and sheet loading.
//!
//! Failures are contained at the smallest possible scope: a workbook that
//! cannot be opened is skipped, a sheet that cannot be read is skipped,
//! and the remaining files and sheets are still loaded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bo_etl_occurrence_models::{CellValue, RawRecord, RawTable};
use calamine::{Data, Range, Reader, open_workbook_auto};

use crate::SourceError;
use crate::progress::ProgressCallback;
use crate::sheet_rules::{SheetClass, SheetRules, SheetTypeRule};

/// Rows and headers of one classified sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSheet {
    /// Sheet name as it appears in the workbook.
    pub name: String,
    /// Header names, in column order.
    pub columns: Vec<String>,
    /// Data rows, tagged with the sheet's record type.
    pub records: Vec<RawRecord>,
}

/// Lists the files matching a glob pattern, sorted by path.
///
/// Entries that cannot be read are logged and skipped.
///
/// # Errors
///
/// Returns [`SourceError::Pattern`] if the pattern is malformed.
pub fn discover_files(pattern: &str) -> Result<Vec<PathBuf>, SourceError> {
    let mut files = Vec::new();

    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("Cannot read path matching '{pattern}': {e}"),
        }
    }

    files.sort();
    Ok(files)
}

/// Loads every classified sheet from every workbook matching `pattern`.
///
/// Returns `Ok(None)` when no file matches or no sheet could be
/// classified; callers treat that as "no data".
///
/// # Errors
///
/// Returns [`SourceError::Pattern`] if the pattern is malformed. Errors in
/// individual workbooks are logged, not returned.
pub fn load_workbooks(
    pattern: &str,
    rules: &SheetRules,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Option<RawTable>, SourceError> {
    let files = discover_files(pattern)?;

    if files.is_empty() {
        log::warn!("No files found matching pattern: {pattern}");
        return Ok(None);
    }

    progress.set_total(files.len() as u64);

    let mut table = RawTable::default();
    let mut sheet_count = 0usize;

    for path in &files {
        progress.set_message(path.display().to_string());

        match load_workbook(path, rules) {
            Ok(sheets) => {
                for sheet in sheets {
                    log::info!(
                        "Loaded {} rows from '{}', sheet '{}'",
                        sheet.records.len(),
                        path.display(),
                        sheet.name
                    );
                    table.append(&sheet.columns, sheet.records);
                    sheet_count += 1;
                }
            }
            Err(e) => log::warn!("Skipping file '{}': {e}", path.display()),
        }

        progress.inc(1);
    }

    progress.finish(format!(
        "Loaded {} rows from {sheet_count} sheets",
        table.len()
    ));

    if sheet_count == 0 {
        log::warn!("No valid sheets were processed");
        return Ok(None);
    }

    Ok(Some(table))
}

/// Opens one workbook and loads its classified sheets.
///
/// Excluded and unmapped sheets are skipped; so is any classified sheet
/// that cannot be read or lacks its description column.
///
/// # Errors
///
/// Returns [`SourceError::Workbook`] if the workbook cannot be opened.
pub fn load_workbook(path: &Path, rules: &SheetRules) -> Result<Vec<LoadedSheet>, SourceError> {
    let mut workbook = open_workbook_auto(path)?;
    let mut sheets = Vec::new();

    for sheet_name in workbook.sheet_names() {
        let rule = match rules.classify(&sheet_name) {
            SheetClass::Excluded => {
                log::debug!("Excluded sheet '{sheet_name}' in '{}'", path.display());
                continue;
            }
            SheetClass::Unmapped => {
                log::info!(
                    "Ignoring sheet '{sheet_name}' in '{}' (unmapped type)",
                    path.display()
                );
                continue;
            }
            SheetClass::Typed(rule) => rule,
        };

        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(e) => {
                log::warn!(
                    "Skipping sheet '{sheet_name}' in '{}': {e}",
                    path.display()
                );
                continue;
            }
        };

        match sheet_records(&sheet_name, &range, rule) {
            Ok(sheet) => sheets.push(sheet),
            Err(e) => log::warn!("Skipping sheet in '{}': {e}", path.display()),
        }
    }

    Ok(sheets)
}

/// Converts a sheet's cell range into tagged raw records.
///
/// The first row holds the headers. Blank header cells are named
/// `Unnamed: <index>` and repeated headers get a `.1`, `.2`, … suffix.
/// Rows whose cells are all empty are dropped.
///
/// # Errors
///
/// Returns [`SourceError::MissingColumn`] if the rule's description
/// column is not among the headers.
pub fn sheet_records(
    sheet_name: &str,
    range: &Range<Data>,
    rule: &SheetTypeRule,
) -> Result<LoadedSheet, SourceError> {
    let mut rows = range.rows();

    let columns = rows.next().map(header_names).unwrap_or_default();

    if !columns.iter().any(|c| c == &rule.description_column) {
        return Err(SourceError::MissingColumn {
            sheet: sheet_name.to_string(),
            column: rule.description_column.clone(),
        });
    }

    let records = rows
        .filter_map(|row| {
            let fields: BTreeMap<String, CellValue> = columns
                .iter()
                .zip(row.iter().map(cell_value))
                .filter(|(_, value)| !value.is_null())
                .map(|(column, value)| (column.clone(), value))
                .collect();

            if fields.is_empty() {
                return None;
            }

            let type_description = fields
                .get(&rule.description_column)
                .cloned()
                .unwrap_or_default();

            Some(RawRecord {
                record_type: rule.record_type,
                type_description,
                fields,
            })
        })
        .collect();

    Ok(LoadedSheet {
        name: sheet_name.to_string(),
        columns,
        records,
    })
}

fn header_names(row: &[Data]) -> Vec<String> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();

    row.iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = cell_value(cell)
                .as_text()
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| format!("Unnamed: {idx}"));

            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

/// Converts a `calamine` cell into a [`CellValue`].
#[must_use]
pub fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::String(s) | Data::DurationIso(s) => CellValue::text(s.clone()),
        Data::DateTimeIso(s) => CellValue::text(s.replace('T', " ")),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt.as_datetime().map_or(CellValue::Null, CellValue::DateTime),
    }
}
