#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Record types shared across the police-report (BO) consolidation
//! pipeline.
//!
//! Raw spreadsheet rows are loaded as [`RawRecord`]s tagged with a
//! [`RecordType`]. The aggregator collapses every group of raw rows that
//! share an [`OccurrenceKey`] into one canonical [`Occurrence`], which the
//! enrichment and geocoding stages then extend with reference data.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Token written in place of a missing street number.
pub const NO_NUMBER_TOKEN: &str = "S/N";

/// Record category assigned to a sheet by keyword classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    /// Robbery (theft with violence or threat).
    Roubo,
    /// Theft without violence.
    Furto,
    /// Robbery followed by death.
    Latrocinio,
}

impl RecordType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Roubo, Self::Furto, Self::Latrocinio]
    }
}

/// A single spreadsheet cell after loading.
///
/// Empty cells, error cells, and whitespace-only strings all load as
/// [`CellValue::Null`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    /// No value.
    #[default]
    Null,
    /// Free text.
    Text(String),
    /// Integer number.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Date/time value decoded from the spreadsheet.
    DateTime(NaiveDateTime),
}

static NULL_CELL: CellValue = CellValue::Null;

/// Accepted textual date formats, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Accepted textual date-time formats, tried in order.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

impl CellValue {
    /// Builds a text cell, mapping blank strings to [`CellValue::Null`].
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self::Null
        } else {
            Self::Text(value)
        }
    }

    /// Whether this cell holds no value.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Renders the cell as a string, or `None` for null cells.
    ///
    /// Whole floats render without a fractional part so that numeric
    /// identifiers read from spreadsheets (`123.0`) compare equal to their
    /// integer form.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(format_float(*f)),
            Self::Bool(b) => Some(b.to_string()),
            Self::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    /// Interprets the cell as a float.
    ///
    /// Text cells accept a comma as decimal separator.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) if f.is_finite() => Some(*f),
            Self::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Interprets the cell as an integer, truncating floats.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.replace(',', ".")
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
            }
            _ => None,
        }
    }

    /// Interprets the cell as a calendar date.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::DateTime(dt) => Some(dt.date()),
            Self::Text(s) => parse_date(s.trim()),
            _ => None,
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[allow(clippy::float_cmp)]
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}

/// One row from one classified sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Category assigned by the sheet classifier.
    pub record_type: RecordType,
    /// Copy of the sheet's type-specific description column.
    pub type_description: CellValue,
    /// Spreadsheet columns by header name.
    pub fields: BTreeMap<String, CellValue>,
}

impl RawRecord {
    /// Returns the value of `column`, or [`CellValue::Null`] when the
    /// column is absent from this row's sheet.
    #[must_use]
    pub fn get(&self, column: &str) -> &CellValue {
        self.fields.get(column).unwrap_or(&NULL_CELL)
    }
}

/// All classified sheets concatenated into one table.
///
/// `columns` is the ordered union of every sheet's headers; a record
/// whose sheet lacked a column reads it as null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Union of column names, in first-seen order.
    pub columns: Vec<String>,
    /// Rows in load order.
    pub records: Vec<RawRecord>,
}

impl RawTable {
    /// Appends the rows of one sheet, extending the column union.
    pub fn append(&mut self, columns: &[String], records: Vec<RawRecord>) {
        for column in columns {
            if !self.columns.contains(column) {
                self.columns.push(column.clone());
            }
        }
        self.records.extend(records);
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Natural key identifying one real-world occurrence across duplicated
/// source rows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OccurrenceKey {
    /// Police station that registered the report.
    pub station: String,
    /// Year the report was filed.
    pub report_year: i64,
    /// Report number within the station and year.
    pub report_number: String,
    /// Sheet classification.
    pub record_type: RecordType,
    /// Type-specific description.
    pub type_description: String,
}

/// Street number of an occurrence address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreetNumber {
    /// A numeric street number.
    Numbered(i64),
    /// No number recorded; rendered as [`NO_NUMBER_TOKEN`].
    Unnumbered,
}

impl std::fmt::Display for StreetNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numbered(n) => write!(f, "{n}"),
            Self::Unnumbered => f.write_str(NO_NUMBER_TOKEN),
        }
    }
}

/// A canonical occurrence built from every raw row sharing one key.
///
/// Created by the aggregator; the population and boundary enrichers fill
/// `municipality_code`, `estimated_population` and `area_km2`, and the
/// geocoding backfiller fills missing coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    /// Natural key.
    pub key: OccurrenceKey,
    /// Date of the occurrence.
    pub occurred_on: Option<NaiveDate>,
    /// City as written in the source.
    pub city: Option<String>,
    /// Neighborhood.
    pub neighborhood: Option<String>,
    /// Street name.
    pub street: Option<String>,
    /// Street number.
    pub street_number: StreetNumber,
    /// Vehicle brand, for vehicle-related reports.
    pub vehicle_brand: Option<String>,
    /// Vehicle occurrence description, for vehicle-related reports.
    pub vehicle_description: Option<String>,
    /// Latitude (WGS84). Never `0`.
    pub latitude: Option<f64>,
    /// Longitude (WGS84). Never `0`.
    pub longitude: Option<f64>,
    /// City name normalized for joins.
    pub normalized_city: String,
    /// Address string used for geocoding lookups.
    pub full_address: Option<String>,
    /// Municipality code from the population reference.
    pub municipality_code: Option<String>,
    /// Estimated municipal population.
    pub estimated_population: Option<u64>,
    /// Municipal area in square kilometers.
    pub area_km2: Option<f64>,
}

impl Occurrence {
    /// Whether latitude or longitude is missing.
    #[must_use]
    pub const fn is_missing_coordinates(&self) -> bool {
        self.latitude.is_none() || self.longitude.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn record_type_round_trips_through_strings() {
        for t in RecordType::all() {
            assert_eq!(RecordType::from_str(t.as_ref()).unwrap(), *t);
        }
        assert_eq!(RecordType::Latrocinio.to_string(), "LATROCINIO");
    }

    #[test]
    fn blank_text_is_null() {
        assert_eq!(CellValue::text("   "), CellValue::Null);
        assert_eq!(CellValue::text("X"), CellValue::Text("X".to_string()));
    }

    #[test]
    fn whole_floats_render_as_integers() {
        assert_eq!(CellValue::Float(123.0).as_text().as_deref(), Some("123"));
        assert_eq!(CellValue::Float(1.5).as_text().as_deref(), Some("1.5"));
    }

    #[test]
    fn parses_comma_decimal_coordinates() {
        let cell = CellValue::Text("-23,5505".to_string());
        assert!((cell.as_f64().unwrap() - -23.5505).abs() < 1e-9);
    }

    #[test]
    fn truncates_float_street_numbers() {
        assert_eq!(CellValue::Float(120.0).as_i64(), Some(120));
        assert_eq!(CellValue::Text("45".to_string()).as_i64(), Some(45));
        assert_eq!(CellValue::Text("KM 23".to_string()).as_i64(), None);
    }

    #[test]
    fn parses_textual_dates() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 9);
        assert_eq!(CellValue::text("2025-03-09").as_date(), expected);
        assert_eq!(CellValue::text("09/03/2025").as_date(), expected);
        assert_eq!(CellValue::text("2025-03-09 14:30:00").as_date(), expected);
        assert_eq!(CellValue::text("not a date").as_date(), None);
    }

    #[test]
    fn parses_date_times_with_fractional_seconds() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert_eq!(CellValue::text("2025-03-01 10:00:00.000").as_date(), expected);
        assert_eq!(CellValue::text("2025-03-01T10:00:00.250").as_date(), expected);
    }

    #[test]
    fn missing_columns_read_as_null() {
        let record = RawRecord {
            record_type: RecordType::Roubo,
            type_description: CellValue::Null,
            fields: BTreeMap::new(),
        };
        assert!(record.get("CIDADE").is_null());
    }

    #[test]
    fn append_keeps_column_union_in_first_seen_order() {
        let mut table = RawTable::default();
        table.append(&["A".to_string(), "B".to_string()], vec![]);
        table.append(&["B".to_string(), "C".to_string()], vec![]);
        assert_eq!(table.columns, vec!["A", "B", "C"]);
    }

    #[test]
    fn unnumbered_renders_token() {
        assert_eq!(StreetNumber::Unnumbered.to_string(), "S/N");
        assert_eq!(StreetNumber::Numbered(12).to_string(), "12");
    }
}
