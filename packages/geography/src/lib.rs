#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Municipal reference data and occurrence enrichment.
//!
//! Two static datasets are joined onto the occurrence table:
//!
//! 1. **Population estimates** (IBGE spreadsheet), keyed by normalized
//!    city name. Occurrences whose city has no match in the state are
//!    dropped.
//! 2. **Municipal boundaries** (IBGE shapefile or GeoJSON), keyed by municipality
//!    code. Occurrences without a match keep a null area.
//!
//! Both joins index the reference side in a map and look each occurrence
//! up by key; they differ only in what happens on a miss.

pub mod boundaries;
pub mod population;

use thiserror::Error;

/// Errors that can occur while loading reference data.
#[derive(Debug, Error)]
pub enum GeoError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Spreadsheet could not be opened or the sheet could not be read.
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Shapefile (`.shp` + `.dbf`) could not be read.
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column is missing from the reference data.
    #[error("Missing column '{column}' in {dataset}")]
    MissingColumn {
        /// Dataset being read.
        dataset: &'static str,
        /// Expected column name.
        column: String,
    },
}
