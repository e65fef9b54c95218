//! Population-by-municipality reference and join.
//!
//! The IBGE estimate spreadsheet has a title row, then a header row with
//! `UF`, `COD. MUNIC`, `NOME DO MUNICÍPIO` and `POPULAÇÃO ESTIMADA`
//! columns. Trailing footnote rows leave most columns empty and are
//! skipped.

use std::collections::BTreeMap;
use std::path::Path;

use bo_etl_geography_models::{MunicipalityEntry, StateScope};
use bo_etl_normalize::normalize_text;
use bo_etl_occurrence_models::{CellValue, Occurrence};
use bo_etl_source::loader::cell_value;
use calamine::{Data, Range, Reader, open_workbook_auto};

use crate::GeoError;

/// Default sheet holding the municipal estimates.
pub const DEFAULT_SHEET: &str = "Municípios";

const DATASET: &str = "population reference";

const STATE_COLUMN: &str = "UF";
const CODE_COLUMN: &str = "COD. MUNIC";
const NAME_COLUMN: &str = "NOME DO MUNICÍPIO";
const POPULATION_COLUMN: &str = "POPULAÇÃO ESTIMADA";

/// Municipal code width, without the state prefix.
const CODE_WIDTH: usize = 5;

/// Population reference for one state, indexed by normalized city name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MunicipalityReference {
    by_name: BTreeMap<String, MunicipalityEntry>,
}

impl MunicipalityReference {
    /// Indexes the entries belonging to `scope`. When two entries share a
    /// normalized name, the first one is kept.
    #[must_use]
    pub fn from_entries(
        entries: impl IntoIterator<Item = MunicipalityEntry>,
        scope: &StateScope,
    ) -> Self {
        let mut by_name = BTreeMap::new();

        for entry in entries {
            if !entry.state.eq_ignore_ascii_case(&scope.abbreviation) {
                continue;
            }
            if by_name.contains_key(&entry.normalized_name) {
                log::debug!(
                    "Duplicate municipality name '{}' ({}), keeping the first",
                    entry.normalized_name,
                    entry.code
                );
                continue;
            }
            by_name.insert(entry.normalized_name.clone(), entry);
        }

        Self { by_name }
    }

    /// Loads the reference from the estimate spreadsheet.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the workbook or sheet cannot be read or a
    /// required column is missing.
    pub fn load(path: &Path, sheet: &str, scope: &StateScope) -> Result<Self, GeoError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook.worksheet_range(sheet)?;
        let reference = Self::from_range(&range, scope)?;

        log::info!(
            "Loaded {} {} municipalities from '{}'",
            reference.len(),
            scope.abbreviation,
            path.display()
        );

        Ok(reference)
    }

    /// Parses the sheet range: the first row is skipped, the second holds
    /// the headers.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::MissingColumn`] if a required header is absent.
    pub fn from_range(range: &Range<Data>, scope: &StateScope) -> Result<Self, GeoError> {
        let mut rows = range.rows().skip(1);

        let headers: Vec<String> = rows
            .next()
            .map(|row| {
                row.iter()
                    .map(|cell| normalize_text(&cell_value(cell).as_text().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default();

        let column = |name: &str| {
            let wanted = normalize_text(name);
            headers
                .iter()
                .position(|h| *h == wanted)
                .ok_or_else(|| GeoError::MissingColumn {
                    dataset: DATASET,
                    column: name.to_string(),
                })
        };

        let state_idx = column(STATE_COLUMN)?;
        let code_idx = column(CODE_COLUMN)?;
        let name_idx = column(NAME_COLUMN)?;
        let population_idx = column(POPULATION_COLUMN)?;

        let entries = rows.filter_map(|row| {
            let cell = |idx: usize| row.get(idx).map(cell_value).unwrap_or_default();

            let state = cell(state_idx).as_text()?;
            let code = municipality_code(&cell(code_idx))?;
            let name = cell(name_idx).as_text()?;
            let estimated_population = population(&cell(population_idx))?;

            Some(MunicipalityEntry {
                code,
                normalized_name: normalize_text(&name),
                name,
                state: state.trim().to_string(),
                estimated_population,
            })
        });

        Ok(Self::from_entries(entries, scope))
    }

    /// Looks up a municipality by normalized city name.
    #[must_use]
    pub fn get(&self, normalized_city: &str) -> Option<&MunicipalityEntry> {
        self.by_name.get(normalized_city)
    }

    /// Number of indexed municipalities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no municipality is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Left-joins population data by normalized city, then drops every
/// occurrence that matched no municipality.
#[must_use]
pub fn enrich_population(
    occurrences: Vec<Occurrence>,
    reference: &MunicipalityReference,
) -> Vec<Occurrence> {
    let total = occurrences.len();

    let enriched: Vec<Occurrence> = occurrences
        .into_iter()
        .filter_map(|mut occurrence| {
            let Some(entry) = reference.get(&occurrence.normalized_city) else {
                log::debug!(
                    "No municipality for city '{}' ({:?})",
                    occurrence.normalized_city,
                    occurrence.key
                );
                return None;
            };
            occurrence.municipality_code = Some(entry.code.clone());
            occurrence.estimated_population = Some(entry.estimated_population);
            Some(occurrence)
        })
        .collect();

    log::info!(
        "Population join: {} of {total} occurrences matched a municipality ({} dropped)",
        enriched.len(),
        total - enriched.len()
    );

    enriched
}

/// Reads a municipality code, left-padding numeric codes that lost their
/// leading zeros.
fn municipality_code(cell: &CellValue) -> Option<String> {
    let code = cell.as_text()?.trim().to_string();
    if code.is_empty() {
        return None;
    }
    if code.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("{code:0>CODE_WIDTH$}"));
    }
    Some(code)
}

/// Reads a population count, ignoring thousands separators and footnote
/// markers such as `"12.345(1)"`.
fn population(cell: &CellValue) -> Option<u64> {
    match cell {
        CellValue::Int(_) | CellValue::Float(_) => {
            cell.as_i64().and_then(|n| u64::try_from(n).ok())
        }
        _ => {
            let text = cell.as_text()?;
            let before_note = text.split('(').next().unwrap_or_default();
            let digits: String = before_note.chars().filter(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
    }
}
