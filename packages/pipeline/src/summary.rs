//! End-of-run report.

use bo_etl_geocoder::backfill::BackfillStats;
use bo_etl_occurrence_models::Occurrence;
use chrono::NaiveDate;

use crate::output::OutputRow;

/// Date range, size and per-column null ratio of the final table.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Number of occurrences written.
    pub records: usize,
    /// Earliest occurrence date.
    pub first_date: Option<NaiveDate>,
    /// Latest occurrence date.
    pub last_date: Option<NaiveDate>,
    /// Share of null values per output column, in column order.
    pub null_ratios: Vec<(&'static str, f64)>,
    /// Geocoding counters, when the backfill ran.
    pub geocoding: Option<BackfillStats>,
}

impl RunSummary {
    /// Computes the summary of a final table. An empty table has a null
    /// ratio of `0` everywhere.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_occurrences(occurrences: &[Occurrence]) -> Self {
        let mut null_counts = [0usize; OutputRow::COLUMNS.len()];

        for occurrence in occurrences {
            let row = OutputRow::from(occurrence);
            for (count, null) in null_counts.iter_mut().zip(row.nulls()) {
                *count += usize::from(null);
            }
        }

        let records = occurrences.len();
        let null_ratios = OutputRow::COLUMNS
            .iter()
            .zip(null_counts)
            .map(|(column, count)| {
                let ratio = if records == 0 {
                    0.0
                } else {
                    count as f64 / records as f64
                };
                (*column, ratio)
            })
            .collect();

        let dates = occurrences.iter().filter_map(|o| o.occurred_on);

        Self {
            records,
            first_date: dates.clone().min(),
            last_date: dates.max(),
            null_ratios,
            geocoding: None,
        }
    }

    /// Ratio of null values in one column.
    #[must_use]
    pub fn null_ratio(&self, column: &str) -> Option<f64> {
        self.null_ratios
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, ratio)| *ratio)
    }

    /// Logs the summary at `info` level.
    pub fn log(&self) {
        let date = |d: Option<NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());

        log::info!(
            "Processed data for {} to {}",
            date(self.first_date),
            date(self.last_date)
        );
        log::info!("Total records: {}", self.records);
        log::info!("Null ratio per column:");
        for (column, ratio) in &self.null_ratios {
            log::info!("  {column:<26} {ratio:.4}");
        }

        if let Some(stats) = &self.geocoding {
            log::info!(
                "Geocoding: {}/{} addresses resolved ({} lookups, {} cache hits)",
                stats.resolved,
                stats.unique_addresses,
                stats.lookups,
                stats.cache_hits
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use bo_etl_occurrence_models::{OccurrenceKey, RecordType, StreetNumber};

    use super::*;

    fn occurrence(day: Option<u32>, latitude: Option<f64>) -> Occurrence {
        Occurrence {
            key: OccurrenceKey {
                station: "X".to_string(),
                report_year: 2025,
                report_number: format!("{day:?}"),
                record_type: RecordType::Furto,
                type_description: "FURTO".to_string(),
            },
            occurred_on: day.and_then(|d| NaiveDate::from_ymd_opt(2025, 2, d)),
            city: Some("Santos".to_string()),
            neighborhood: None,
            street: None,
            street_number: StreetNumber::Numbered(10),
            vehicle_brand: None,
            vehicle_description: None,
            latitude,
            longitude: latitude,
            normalized_city: "SANTOS".to_string(),
            full_address: Some("10, SANTOS - SP".to_string()),
            municipality_code: Some("48500".to_string()),
            estimated_population: Some(440_404),
            area_km2: Some(281.0),
        }
    }

    #[test]
    fn reports_date_range_and_count() {
        let summary = RunSummary::from_occurrences(&[
            occurrence(Some(10), None),
            occurrence(Some(3), None),
            occurrence(Some(27), None),
        ]);

        assert_eq!(summary.records, 3);
        assert_eq!(summary.first_date, NaiveDate::from_ymd_opt(2025, 2, 3));
        assert_eq!(summary.last_date, NaiveDate::from_ymd_opt(2025, 2, 27));
    }

    #[test]
    fn computes_null_ratios() {
        let summary = RunSummary::from_occurrences(&[
            occurrence(Some(1), Some(-23.9)),
            occurrence(Some(2), None),
            occurrence(Some(3), None),
            occurrence(Some(4), None),
        ]);

        assert_eq!(summary.null_ratio("latitude"), Some(0.75));
        assert_eq!(summary.null_ratio("bairro"), Some(1.0));
        assert_eq!(summary.null_ratio("cidade"), Some(0.0));
        assert_eq!(summary.null_ratio("unknown"), None);
        assert_eq!(summary.null_ratios.len(), OutputRow::COLUMNS.len());
    }

    #[test]
    fn empty_table_has_no_dates() {
        let summary = RunSummary::from_occurrences(&[]);
        assert_eq!(summary.records, 0);
        assert_eq!(summary.first_date, None);
        assert_eq!(summary.null_ratio("latitude"), Some(0.0));
    }
}
