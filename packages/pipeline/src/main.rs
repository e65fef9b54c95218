#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the police-report ETL.

use std::path::PathBuf;
use std::time::Instant;

use bo_etl_cli_utils::{IndicatifProgress, init_logger};
use bo_etl_geocoder::backfill::BackfillOptions;
use bo_etl_geocoder::nominatim::NominatimResolver;
use bo_etl_geocoder::service_registry::nominatim_config;
use bo_etl_geography::population::DEFAULT_SHEET;
use bo_etl_geography_models::StateScope;
use bo_etl_pipeline::{
    GeocodeSettings, PipelineConfig, PipelineProgress, resolve_input_pattern, run,
};
use bo_etl_source::sheet_rules::SheetRules;
use chrono::NaiveDate;
use clap::Parser;

/// Nominatim's public usage policy allows one request per second.
const NOMINATIM_MIN_DELAY_MS: u64 = 1000;

#[derive(Parser)]
#[command(
    name = "bo_etl",
    about = "Consolidates police-report spreadsheets into one geocoded occurrence table"
)]
struct Cli {
    /// Glob pattern of source workbooks (overrides `BO_ETL_INPUT_PATTERN`)
    #[arg(long)]
    input_pattern: Option<String>,
    /// First occurrence date to keep (inclusive)
    #[arg(long, default_value = "2025-01-01")]
    start_date: NaiveDate,
    /// Last occurrence date to keep (inclusive)
    #[arg(long, default_value = "2025-06-30")]
    end_date: NaiveDate,
    /// State both reference joins are restricted to (two-letter abbreviation)
    #[arg(long, default_value = "SP")]
    state: StateScope,
    /// TOML file replacing the built-in sheet classification rules
    #[arg(long)]
    sheet_rules: Option<PathBuf>,
    /// IBGE population estimate workbook
    #[arg(long, default_value = "data/external/estimativa_dou_2025.xls")]
    population_path: PathBuf,
    /// Sheet of the population workbook holding municipal estimates
    #[arg(long, default_value = DEFAULT_SHEET)]
    population_sheet: String,
    /// Municipal boundaries (`.shp` shapefile, or a `GeoJSON` feature collection)
    #[arg(long, default_value = "data/external/shape_sp/SP_Municipios_2024.shp")]
    boundaries_path: PathBuf,
    /// Where the state's boundaries are re-exported
    #[arg(long, default_value = "data/processed/SP_Municipios_2024.geojson")]
    boundaries_output: PathBuf,
    /// Output CSV
    #[arg(long, default_value = "data/processed/ocorrencias_2025_1sem.csv")]
    output: PathBuf,
    /// JSON file caching geocoding results between runs
    #[arg(long)]
    geocode_cache: Option<PathBuf>,
    /// Leave missing coordinates empty instead of geocoding
    #[arg(long)]
    skip_geocode: bool,
    /// Nominatim search endpoint (e.g., a self-hosted instance)
    #[arg(long)]
    nominatim_url: Option<String>,
    /// Minimum delay between geocoding requests in milliseconds
    #[arg(long)]
    min_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();
    let started = Instant::now();

    let sheet_rules = match &cli.sheet_rules {
        Some(path) => SheetRules::from_path(path)?,
        None => SheetRules::embedded(),
    };

    let mut nominatim = nominatim_config();
    if let Some(url) = cli.nominatim_url {
        nominatim.base_url = url;
    }
    if let Some(ms) = cli.min_delay_ms {
        if ms < NOMINATIM_MIN_DELAY_MS {
            log::warn!(
                "--min-delay-ms {ms} is below the public Nominatim limit of {NOMINATIM_MIN_DELAY_MS} ms"
            );
        }
        nominatim.rate_limit_ms = ms;
    }

    let geocode = (!cli.skip_geocode).then(|| GeocodeSettings {
        options: BackfillOptions::from(&nominatim),
        cache_path: cli.geocode_cache,
    });

    let config = PipelineConfig {
        input_pattern: resolve_input_pattern(cli.input_pattern),
        start_date: cli.start_date,
        end_date: cli.end_date,
        sheet_rules,
        scope: cli.state,
        population_path: cli.population_path,
        population_sheet: cli.population_sheet,
        boundaries_path: cli.boundaries_path,
        boundaries_output: cli.boundaries_output,
        output_path: cli.output,
        geocode,
    };

    let resolver = NominatimResolver::new(nominatim)?;
    let progress = PipelineProgress {
        loading: IndicatifProgress::steps_bar(&multi, "Loading workbooks"),
        geocoding: IndicatifProgress::batch_bar(&multi, "Geocoding addresses"),
    };

    match run(&config, &resolver, &progress).await? {
        Some(summary) => summary.log(),
        None => log::warn!("No data to process, nothing written"),
    }

    log::info!("Finished in {:.1}s", started.elapsed().as_secs_f64());

    Ok(())
}
