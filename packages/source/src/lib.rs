#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Spreadsheet discovery, sheet classification, and raw record loading.
//!
//! Each workbook matching the input pattern is opened with `calamine`;
//! every sheet is classified by keyword against the ordered rules in
//! [`sheet_rules`], and the rows of classified sheets are concatenated
//! into one [`RawTable`](bo_etl_occurrence_models::RawTable).
//!
//! Unreadable workbooks and unmapped sheets are logged and skipped; only
//! the total absence of usable data is reported to the caller, as
//! `Ok(None)`.

pub mod loader;
pub mod progress;
pub mod sheet_rules;

/// Errors that can occur while loading source spreadsheets.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Workbook could not be opened or a sheet could not be read.
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// The input glob pattern is malformed.
    #[error("Invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Sheet rule configuration could not be parsed.
    #[error("Sheet rule config error: {0}")]
    Config(#[from] toml::de::Error),

    /// A classified sheet lacks the column its rule copies the type
    /// description from.
    #[error("Sheet '{sheet}' has no '{column}' column")]
    MissingColumn {
        /// Sheet name.
        sheet: String,
        /// Expected column name.
        column: String,
    },
}
