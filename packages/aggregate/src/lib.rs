#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Occurrence aggregation.
//!
//! The police-report exports repeat one report across several rows (one
//! per involved object, vehicle or person). [`aggregate`] groups raw rows
//! by [`OccurrenceKey`] and folds each group into a single
//! [`Occurrence`], taking the first non-null value of every descriptive
//! column in load order. The result is then filtered to the requested
//! date range and cleaned up for the downstream joins and geocoding.

pub mod address;
pub mod columns;

use std::collections::BTreeMap;

use bo_etl_normalize::normalize_city;
use bo_etl_occurrence_models::{
    CellValue, Occurrence, OccurrenceKey, RawRecord, RawTable, StreetNumber,
};
use chrono::NaiveDate;

use crate::address::build_full_address;

static NULL_CELL: CellValue = CellValue::Null;

/// First non-null value per descriptive column, in load order.
#[derive(Debug, Default)]
struct FirstNonNull {
    values: [CellValue; columns::DESCRIPTIVE.len()],
}

impl FirstNonNull {
    fn absorb(&mut self, record: &RawRecord) {
        for (slot, column) in self.values.iter_mut().zip(columns::DESCRIPTIVE) {
            if slot.is_null() {
                let value = record.get(column);
                if !value.is_null() {
                    *slot = value.clone();
                }
            }
        }
    }

    fn get(&self, column: &str) -> &CellValue {
        columns::DESCRIPTIVE
            .iter()
            .position(|c| *c == column)
            .map_or(&NULL_CELL, |idx| &self.values[idx])
    }
}

/// Builds the grouping key of a raw row.
///
/// Returns `None` when any key component is missing; such rows cannot be
/// attributed to an occurrence and are excluded from grouping.
#[must_use]
pub fn occurrence_key(record: &RawRecord) -> Option<OccurrenceKey> {
    Some(OccurrenceKey {
        station: record.get(columns::STATION).as_text()?,
        report_year: record.get(columns::REPORT_YEAR).as_i64()?,
        report_number: record.get(columns::REPORT_NUMBER).as_text()?,
        record_type: record.record_type,
        type_description: record.type_description.as_text()?,
    })
}

/// Groups raw rows by key and reduces every group to one occurrence,
/// without date filtering.
///
/// Groups are returned in key order. Within a group, each descriptive
/// field is the first non-null value in the table's row order.
#[must_use]
pub fn reduce(raw: &RawTable) -> Vec<Occurrence> {
    let mut groups: BTreeMap<OccurrenceKey, FirstNonNull> = BTreeMap::new();
    let mut unkeyed = 0usize;

    for record in &raw.records {
        let Some(key) = occurrence_key(record) else {
            unkeyed += 1;
            continue;
        };
        groups.entry(key).or_default().absorb(record);
    }

    if unkeyed > 0 {
        log::info!("Excluded {unkeyed} rows with an incomplete report key");
    }

    groups
        .into_iter()
        .map(|(key, first)| canonicalize(key, &first))
        .collect()
}

/// Aggregates raw rows into canonical occurrences dated within
/// `start..=end`.
///
/// Besides the reduction (see [`reduce`]):
/// - rows whose date is missing or unparseable fall outside the range
/// - a latitude or longitude of exactly `0` becomes `None`
/// - a missing street number becomes [`StreetNumber::Unnumbered`]
/// - `normalized_city` and `full_address` are derived
#[must_use]
pub fn aggregate(raw: &RawTable, start: NaiveDate, end: NaiveDate) -> Vec<Occurrence> {
    let reduced = reduce(raw);
    let total = reduced.len();

    let occurrences: Vec<Occurrence> = reduced
        .into_iter()
        .filter(|o| in_range(o.occurred_on, start, end))
        .collect();

    log::info!(
        "Aggregated {} raw rows into {total} occurrences, {} within {start}..={end}",
        raw.len(),
        occurrences.len()
    );

    occurrences
}

/// Inclusive date-range check; a missing date is never in range.
#[must_use]
pub fn in_range(date: Option<NaiveDate>, start: NaiveDate, end: NaiveDate) -> bool {
    date.is_some_and(|d| (start..=end).contains(&d))
}

/// Treats a coordinate of exactly zero as missing.
fn coordinate(cell: &CellValue) -> Option<f64> {
    cell.as_f64().filter(|v| *v != 0.0 && v.is_finite())
}

fn canonicalize(key: OccurrenceKey, first: &FirstNonNull) -> Occurrence {
    let city = first.get(columns::CITY).as_text();
    let neighborhood = first.get(columns::NEIGHBORHOOD).as_text();
    let street = first.get(columns::STREET).as_text();
    let street_number = first
        .get(columns::STREET_NUMBER)
        .as_i64()
        .map_or(StreetNumber::Unnumbered, StreetNumber::Numbered);

    let normalized_city = normalize_city(city.as_deref());
    let full_address = build_full_address(
        street.as_deref(),
        street_number,
        neighborhood.as_deref(),
        &normalized_city,
    );

    Occurrence {
        key,
        occurred_on: first.get(columns::OCCURRENCE_DATE).as_date(),
        city,
        neighborhood,
        street,
        street_number,
        vehicle_brand: first.get(columns::VEHICLE_BRAND).as_text(),
        vehicle_description: first.get(columns::VEHICLE_DESCRIPTION).as_text(),
        latitude: coordinate(first.get(columns::LATITUDE)),
        longitude: coordinate(first.get(columns::LONGITUDE)),
        normalized_city,
        full_address: Some(full_address),
        municipality_code: None,
        estimated_population: None,
        area_km2: None,
    }
}
