//! Source column names in the police-report exports.

/// Police station name.
pub const STATION: &str = "NOME_DELEGACIA";
/// Report year.
pub const REPORT_YEAR: &str = "ANO_BO";
/// Report number.
pub const REPORT_NUMBER: &str = "NUM_BO";
/// Occurrence date.
pub const OCCURRENCE_DATE: &str = "DATA_OCORRENCIA_BO";
/// City.
pub const CITY: &str = "CIDADE";
/// Neighborhood.
pub const NEIGHBORHOOD: &str = "BAIRRO";
/// Street name.
pub const STREET: &str = "LOGRADOURO";
/// Street number.
pub const STREET_NUMBER: &str = "NUMERO_LOGRADOURO";
/// Vehicle brand.
pub const VEHICLE_BRAND: &str = "DESCR_MARCA_VEICULO";
/// Vehicle occurrence description.
pub const VEHICLE_DESCRIPTION: &str = "DESCR_OCORRENCIA_VEICULO";
/// Latitude.
pub const LATITUDE: &str = "LATITUDE";
/// Longitude.
pub const LONGITUDE: &str = "LONGITUDE";

/// Columns reduced with "first non-null wins", in accumulator order.
pub const DESCRIPTIVE: [&str; 9] = [
    OCCURRENCE_DATE,
    CITY,
    NEIGHBORHOOD,
    STREET,
    STREET_NUMBER,
    VEHICLE_BRAND,
    VEHICLE_DESCRIPTION,
    LATITUDE,
    LONGITUDE,
];
