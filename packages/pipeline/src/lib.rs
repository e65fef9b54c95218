#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Police-report ETL pipeline.
//!
//! Stages run strictly in sequence, each consuming the previous stage's
//! complete table:
//!
//! 1. Load and classify every workbook matching the input pattern
//! 2. Aggregate duplicated rows into occurrences within the date range
//! 3. Join population data, dropping occurrences outside the state
//! 4. Re-export the state's municipal boundaries and join their area
//! 5. Backfill missing coordinates through the geocoder (optional)
//! 6. Write the output table
//!
//! Finding no input at all ends the run early with `Ok(None)`.

pub mod output;
pub mod summary;

use std::path::PathBuf;
use std::sync::Arc;

use bo_etl_aggregate::aggregate;
use bo_etl_geocoder::backfill::{BackfillOptions, geocode_missing};
use bo_etl_geocoder::cache::GeocodeCache;
use bo_etl_geocoder::{AddressResolver, GeocodeError};
use bo_etl_geography::GeoError;
use bo_etl_geography::boundaries::{BoundaryReference, enrich_boundaries};
use bo_etl_geography::population::{MunicipalityReference, enrich_population};
use bo_etl_geography_models::StateScope;
use bo_etl_occurrence_models::RawTable;
use bo_etl_source::SourceError;
use bo_etl_source::loader::load_workbooks;
use bo_etl_source::progress::{ProgressCallback, null_progress};
use bo_etl_source::sheet_rules::SheetRules;
use chrono::NaiveDate;
use thiserror::Error;

use crate::output::write_output;
use crate::summary::RunSummary;

/// Environment variable overriding the default input pattern.
pub const INPUT_PATTERN_ENV: &str = "BO_ETL_INPUT_PATTERN";

/// Input pattern used when neither the flag nor the environment sets one.
pub const DEFAULT_INPUT_PATTERN: &str = "data/external/*.xlsx";

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading source workbooks failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Reference data could not be loaded or exported.
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// Geocoder setup or cache access failed.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// Output table could not be written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The date range is empty.
    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },
}

/// Geocoding backfill settings.
#[derive(Debug, Clone)]
pub struct GeocodeSettings {
    /// Lookup pacing.
    pub options: BackfillOptions,
    /// Persistent cache file, if any.
    pub cache_path: Option<PathBuf>,
}

/// Everything a run needs besides the resolver.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Glob pattern of source workbooks.
    pub input_pattern: String,
    /// First occurrence date kept.
    pub start_date: NaiveDate,
    /// Last occurrence date kept.
    pub end_date: NaiveDate,
    /// Sheet classification rules.
    pub sheet_rules: SheetRules,
    /// State both reference joins are restricted to.
    pub scope: StateScope,
    /// Population estimate workbook.
    pub population_path: PathBuf,
    /// Sheet of the population workbook.
    pub population_sheet: String,
    /// Municipal boundaries (shapefile or `GeoJSON`).
    pub boundaries_path: PathBuf,
    /// Where the filtered boundaries are re-exported.
    pub boundaries_output: PathBuf,
    /// Output CSV.
    pub output_path: PathBuf,
    /// Backfill settings; `None` skips geocoding.
    pub geocode: Option<GeocodeSettings>,
}

/// Resolves the input pattern: the explicit value, else
/// [`INPUT_PATTERN_ENV`], else [`DEFAULT_INPUT_PATTERN`].
#[must_use]
pub fn resolve_input_pattern(cli_pattern: Option<String>) -> String {
    cli_pattern
        .or_else(|| std::env::var(INPUT_PATTERN_ENV).ok())
        .unwrap_or_else(|| DEFAULT_INPUT_PATTERN.to_string())
}

/// Progress sinks for the two long-running stages.
#[derive(Clone)]
pub struct PipelineProgress {
    /// One step per workbook.
    pub loading: Arc<dyn ProgressCallback>,
    /// One step per unique address.
    pub geocoding: Arc<dyn ProgressCallback>,
}

impl Default for PipelineProgress {
    fn default() -> Self {
        Self {
            loading: null_progress(),
            geocoding: null_progress(),
        }
    }
}

/// The static reference datasets, restricted to one state.
#[derive(Debug, Clone)]
pub struct References {
    /// Population estimates by normalized city.
    pub population: MunicipalityReference,
    /// Boundaries and area by municipality code.
    pub boundaries: BoundaryReference,
}

impl References {
    /// Loads both datasets from the configured paths.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if either dataset cannot be read.
    pub fn load(config: &PipelineConfig) -> Result<Self, GeoError> {
        Ok(Self {
            population: MunicipalityReference::load(
                &config.population_path,
                &config.population_sheet,
                &config.scope,
            )?,
            boundaries: BoundaryReference::load(&config.boundaries_path, &config.scope)?,
        })
    }
}

fn check_date_range(config: &PipelineConfig) -> Result<(), PipelineError> {
    if config.start_date > config.end_date {
        return Err(PipelineError::InvalidDateRange {
            start: config.start_date,
            end: config.end_date,
        });
    }
    Ok(())
}

/// Runs the whole pipeline.
///
/// Returns `Ok(None)` without writing anything when no workbook matches
/// or no sheet could be classified.
///
/// # Errors
///
/// Returns [`PipelineError`] if the date range is empty, reference data
/// cannot be loaded, or an output file cannot be written.
pub async fn run(
    config: &PipelineConfig,
    resolver: &dyn AddressResolver,
    progress: &PipelineProgress,
) -> Result<Option<RunSummary>, PipelineError> {
    check_date_range(config)?;

    log::info!("Loading workbooks matching '{}'", config.input_pattern);
    let Some(raw) = load_workbooks(&config.input_pattern, &config.sheet_rules, &progress.loading)?
    else {
        log::warn!("No data loaded from '{}'", config.input_pattern);
        progress.geocoding.finish_and_clear();
        return Ok(None);
    };

    let references = References::load(config)?;

    process(&raw, &references, config, resolver, progress)
        .await
        .map(Some)
}

/// Runs every stage after loading on an in-memory raw table.
///
/// # Errors
///
/// Returns [`PipelineError`] if the date range is empty or an output file
/// cannot be written.
pub async fn process(
    raw: &RawTable,
    references: &References,
    config: &PipelineConfig,
    resolver: &dyn AddressResolver,
    progress: &PipelineProgress,
) -> Result<RunSummary, PipelineError> {
    check_date_range(config)?;

    let occurrences = aggregate(raw, config.start_date, config.end_date);

    log::info!("Adding population estimates");
    let occurrences = enrich_population(occurrences, &references.population);

    log::info!("Exporting {} boundaries", config.scope.abbreviation);
    references.boundaries.export(&config.boundaries_output)?;
    let occurrences = enrich_boundaries(occurrences, &references.boundaries);

    let (occurrences, geocoding) = match &config.geocode {
        Some(settings) => {
            log::info!("Filling missing coordinates");
            let mut cache = match &settings.cache_path {
                Some(path) => GeocodeCache::load(path)?,
                None => GeocodeCache::in_memory(),
            };

            let (occurrences, stats) = geocode_missing(
                occurrences,
                resolver,
                &settings.options,
                &mut cache,
                &progress.geocoding,
            )
            .await;

            if let Err(e) = cache.save() {
                log::warn!("Failed to save geocode cache: {e}");
            }

            (occurrences, Some(stats))
        }
        None => {
            log::info!("Skipping geocoding");
            progress.geocoding.finish_and_clear();
            (occurrences, None)
        }
    };

    write_output(&config.output_path, &occurrences)?;

    let mut summary = RunSummary::from_occurrences(&occurrences);
    summary.geocoding = geocoding;

    Ok(summary)
}
