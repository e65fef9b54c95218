//! Final CSV table.

use std::path::Path;

use bo_etl_occurrence_models::{Occurrence, RecordType};
use serde::Serialize;

use crate::PipelineError;

/// One output row. Field order is column order; nothing outside this
/// struct reaches the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    /// Police station that registered the report.
    pub nome_delegacia: String,
    /// Report year.
    pub ano_bo: i64,
    /// Report number within the station and year.
    pub num_bo: String,
    /// Record type assigned from the sheet name.
    pub tipo: RecordType,
    /// Type description taken from the sheet's description column.
    pub descr_tipo: String,
    /// Occurrence date (`YYYY-MM-DD`).
    pub data_ocorrencia_bo: Option<String>,
    /// City as reported.
    pub cidade: Option<String>,
    /// Normalized city used for the population join.
    pub norm_cidade: String,
    /// Neighborhood.
    pub bairro: Option<String>,
    /// Street.
    pub logradouro: Option<String>,
    /// Street number, or `S/N` when unnumbered.
    pub numero_logradouro: String,
    /// Vehicle brand.
    pub descr_marca_veiculo: Option<String>,
    /// Vehicle occurrence description.
    pub descr_ocorrencia_veiculo: Option<String>,
    /// Address sent to the geocoder.
    pub endereco_completo: Option<String>,
    /// Latitude, reported or geocoded.
    pub latitude: Option<f64>,
    /// Longitude, reported or geocoded.
    pub longitude: Option<f64>,
    /// Five-digit municipality code.
    pub cod_municipio: Option<String>,
    /// Estimated municipal population.
    pub populacao_estimada: Option<u64>,
    /// Municipal area in square kilometers.
    pub area_km2: Option<f64>,
}

impl OutputRow {
    /// Header names, in file order.
    pub const COLUMNS: [&'static str; 19] = [
        "nome_delegacia",
        "ano_bo",
        "num_bo",
        "tipo",
        "descr_tipo",
        "data_ocorrencia_bo",
        "cidade",
        "norm_cidade",
        "bairro",
        "logradouro",
        "numero_logradouro",
        "descr_marca_veiculo",
        "descr_ocorrencia_veiculo",
        "endereco_completo",
        "latitude",
        "longitude",
        "cod_municipio",
        "populacao_estimada",
        "area_km2",
    ];

    /// Null flag per column, aligned with [`Self::COLUMNS`]. Empty
    /// strings count as null.
    #[must_use]
    pub fn nulls(&self) -> [bool; 19] {
        let text = |s: &str| s.is_empty();
        let opt = |s: Option<&str>| s.is_none_or(str::is_empty);

        [
            text(&self.nome_delegacia),
            false,
            text(&self.num_bo),
            false,
            text(&self.descr_tipo),
            self.data_ocorrencia_bo.is_none(),
            opt(self.cidade.as_deref()),
            text(&self.norm_cidade),
            opt(self.bairro.as_deref()),
            opt(self.logradouro.as_deref()),
            text(&self.numero_logradouro),
            opt(self.descr_marca_veiculo.as_deref()),
            opt(self.descr_ocorrencia_veiculo.as_deref()),
            opt(self.endereco_completo.as_deref()),
            self.latitude.is_none(),
            self.longitude.is_none(),
            opt(self.cod_municipio.as_deref()),
            self.populacao_estimada.is_none(),
            self.area_km2.is_none(),
        ]
    }
}

impl From<&Occurrence> for OutputRow {
    fn from(o: &Occurrence) -> Self {
        Self {
            nome_delegacia: o.key.station.clone(),
            ano_bo: o.key.report_year,
            num_bo: o.key.report_number.clone(),
            tipo: o.key.record_type,
            descr_tipo: o.key.type_description.clone(),
            data_ocorrencia_bo: o.occurred_on.map(|d| d.format("%Y-%m-%d").to_string()),
            cidade: o.city.clone(),
            norm_cidade: o.normalized_city.clone(),
            bairro: o.neighborhood.clone(),
            logradouro: o.street.clone(),
            numero_logradouro: o.street_number.to_string(),
            descr_marca_veiculo: o.vehicle_brand.clone(),
            descr_ocorrencia_veiculo: o.vehicle_description.clone(),
            endereco_completo: o.full_address.clone(),
            latitude: o.latitude,
            longitude: o.longitude,
            cod_municipio: o.municipality_code.clone(),
            populacao_estimada: o.estimated_population,
            area_km2: o.area_km2,
        }
    }
}

/// Writes the occurrence table as CSV with a header row, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns [`PipelineError`] if the file cannot be created or written.
pub fn write_output(path: &Path, occurrences: &[Occurrence]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;

    if occurrences.is_empty() {
        writer.write_record(OutputRow::COLUMNS)?;
    }
    for occurrence in occurrences {
        writer.serialize(OutputRow::from(occurrence))?;
    }
    writer.flush()?;

    log::info!(
        "Wrote {} occurrences to '{}'",
        occurrences.len(),
        path.display()
    );

    Ok(())
}
