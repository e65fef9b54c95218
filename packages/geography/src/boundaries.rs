//! Municipal boundary reference: area lookup and `GeoJSON` export.
//!
//! The boundaries are read from an ESRI shapefile (`.shp` with its `.dbf`
//! attribute table alongside) or from a `GeoJSON` feature collection,
//! chosen by file extension. Features carry the IBGE properties `CD_UF` (state code), `CD_MUN`
//! (seven-digit municipality code, state prefix included) and `AREA_KM2`.
//! Loading keeps the features of one state and rewrites `CD_MUN` to the
//! five-digit form used by the population reference.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use bo_etl_geography_models::StateScope;
use bo_etl_occurrence_models::Occurrence;
use geojson::{
    Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, PolygonType, Value,
};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{Polygon, PolygonRing};

use crate::GeoError;

const STATE_PROPERTY: &str = "CD_UF";
const CODE_PROPERTY: &str = "CD_MUN";
const AREA_PROPERTY: &str = "AREA_KM2";

/// Leading characters of `CD_MUN` that repeat the state code.
const STATE_PREFIX_LEN: usize = 2;

/// Boundary features for one state, plus an area index by municipality
/// code.
#[derive(Debug, Clone, Default)]
pub struct BoundaryReference {
    features: Vec<Feature>,
    area_by_code: BTreeMap<String, f64>,
}

impl BoundaryReference {
    /// Reads a shapefile (`.shp`) or a `GeoJSON` feature collection (any
    /// other extension) and restricts it to `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the file cannot be read, or is neither a
    /// polygon shapefile nor a `GeoJSON` feature collection.
    pub fn load(path: &Path, scope: &StateScope) -> Result<Self, GeoError> {
        let collection = if is_shapefile(path) {
            read_shapefile(path)?
        } else {
            read_geojson(path)?
        };

        let reference = Self::from_feature_collection(collection, scope);

        log::info!(
            "Loaded {} {} municipal boundaries from '{}' ({} with area)",
            reference.len(),
            scope.abbreviation,
            path.display(),
            reference.area_by_code.len()
        );

        Ok(reference)
    }

    /// Keeps the features whose `CD_UF` matches the scope and strips the
    /// state prefix from their `CD_MUN`.
    #[must_use]
    pub fn from_feature_collection(collection: FeatureCollection, scope: &StateScope) -> Self {
        let mut features = Vec::new();
        let mut area_by_code = BTreeMap::new();

        for mut feature in collection.features {
            let in_state = feature
                .property(STATE_PROPERTY)
                .and_then(property_text)
                .is_some_and(|code| code == scope.ibge_code);

            if !in_state {
                continue;
            }

            let code = feature
                .property(CODE_PROPERTY)
                .and_then(property_text)
                .map(|full| full.chars().skip(STATE_PREFIX_LEN).collect::<String>());

            if let Some(code) = code {
                if let Some(area) = feature.property(AREA_PROPERTY).and_then(property_number) {
                    area_by_code.entry(code.clone()).or_insert(area);
                }
                feature.set_property(CODE_PROPERTY, code);
            } else {
                log::debug!("Boundary feature without {CODE_PROPERTY}");
            }

            features.push(feature);
        }

        Self {
            features,
            area_by_code,
        }
    }

    /// Area in square kilometers for a five-digit municipality code.
    #[must_use]
    pub fn area_km2(&self, municipality_code: &str) -> Option<f64> {
        self.area_by_code.get(municipality_code).copied()
    }

    /// Number of features kept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether no feature was kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Writes the filtered features as a `GeoJSON` feature collection,
    /// creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the file cannot be created or written.
    pub fn export(&self, path: &Path) -> Result<(), GeoError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let collection = FeatureCollection {
            bbox: None,
            features: self.features.clone(),
            foreign_members: None,
        };

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &collection)?;

        log::info!(
            "Wrote {} boundaries to '{}'",
            self.features.len(),
            path.display()
        );

        Ok(())
    }
}

/// Left-joins municipal area by municipality code. Occurrences without a
/// code or without a matching boundary keep a null area.
#[must_use]
pub fn enrich_boundaries(
    mut occurrences: Vec<Occurrence>,
    reference: &BoundaryReference,
) -> Vec<Occurrence> {
    let mut missing = 0usize;

    for occurrence in &mut occurrences {
        occurrence.area_km2 = occurrence
            .municipality_code
            .as_deref()
            .and_then(|code| reference.area_km2(code));

        if occurrence.area_km2.is_none() {
            missing += 1;
        }
    }

    if missing > 0 {
        log::warn!(
            "{missing} of {} occurrences have no municipal area",
            occurrences.len()
        );
    }

    occurrences
}

fn is_shapefile(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"))
}

fn read_geojson(path: &Path) -> Result<FeatureCollection, GeoError> {
    let contents = std::fs::read_to_string(path)?;
    let geojson: GeoJson = contents.parse()?;
    Ok(FeatureCollection::try_from(geojson)?)
}

/// Converts each polygon and its attribute row into a `GeoJSON` feature.
fn read_shapefile(path: &Path) -> Result<FeatureCollection, GeoError> {
    let shapes = shapefile::read_as::<_, Polygon, Record>(path)?;

    let features = shapes
        .into_iter()
        .map(|(polygon, record)| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::MultiPolygon(polygon_coordinates(
                &polygon,
            )))),
            id: None,
            properties: Some(record_properties(record)),
            foreign_members: None,
        })
        .collect();

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Groups shapefile rings into polygons: each outer ring starts a new
/// polygon and the inner rings after it are its holes.
fn polygon_coordinates(polygon: &Polygon) -> Vec<PolygonType> {
    let mut polygons: Vec<PolygonType> = Vec::new();

    for ring in polygon.rings() {
        let positions: Vec<Vec<f64>> = ring.points().iter().map(|p| vec![p.x, p.y]).collect();
        match (ring, polygons.last_mut()) {
            (PolygonRing::Inner(_), Some(holes)) => holes.push(positions),
            _ => polygons.push(vec![positions]),
        }
    }

    polygons
}

fn record_properties(record: Record) -> JsonObject {
    HashMap::<String, FieldValue>::from(record)
        .into_iter()
        .filter_map(|(name, value)| field_json(&value).map(|json| (name, json)))
        .collect()
}

fn field_json(value: &FieldValue) -> Option<JsonValue> {
    match value {
        FieldValue::Character(Some(s)) => Some(JsonValue::String(s.trim().to_string())),
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) => {
            serde_json::Number::from_f64(*n).map(JsonValue::Number)
        }
        FieldValue::Float(Some(n)) => {
            serde_json::Number::from_f64(f64::from(*n)).map(JsonValue::Number)
        }
        FieldValue::Integer(n) => Some(JsonValue::from(*n)),
        _ => None,
    }
}

fn property_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn property_number(value: &JsonValue) -> Option<f64> {
    let area: Option<f64> = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    };
    area.filter(|a| a.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": null,
                "properties": {"CD_MUN": "3550308", "NM_MUN": "São Paulo", "CD_UF": "35", "AREA_KM2": 1521.202}
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": {"CD_MUN": "3509502", "NM_MUN": "Campinas", "CD_UF": 35, "AREA_KM2": "794,571"}
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": {"CD_MUN": "3304557", "NM_MUN": "Rio de Janeiro", "CD_UF": "33", "AREA_KM2": 1200.329}
            }
        ]
    }"#;

    fn collection() -> FeatureCollection {
        FeatureCollection::try_from(COLLECTION.parse::<GeoJson>().unwrap()).unwrap()
    }

    fn occurrence(code: Option<&str>) -> Occurrence {
        use bo_etl_occurrence_models::{OccurrenceKey, RecordType, StreetNumber};

        Occurrence {
            key: OccurrenceKey {
                station: "X".to_string(),
                report_year: 2025,
                report_number: code.unwrap_or("none").to_string(),
                record_type: RecordType::Furto,
                type_description: "FURTO".to_string(),
            },
            occurred_on: None,
            city: None,
            neighborhood: None,
            street: None,
            street_number: StreetNumber::Unnumbered,
            vehicle_brand: None,
            vehicle_description: None,
            latitude: None,
            longitude: None,
            normalized_city: String::new(),
            full_address: None,
            municipality_code: code.map(str::to_string),
            estimated_population: None,
            area_km2: None,
        }
    }

    #[test]
    fn keeps_state_features_and_strips_prefix() {
        let reference =
            BoundaryReference::from_feature_collection(collection(), &StateScope::default());

        assert_eq!(reference.len(), 2);
        assert_eq!(reference.area_km2("50308"), Some(1521.202));
        assert_eq!(reference.area_km2("09502"), Some(794.571));
        assert_eq!(reference.area_km2("04557"), None);
    }

    #[test]
    fn left_join_keeps_unmatched_occurrences() {
        let reference =
            BoundaryReference::from_feature_collection(collection(), &StateScope::default());

        let enriched = enrich_boundaries(
            vec![
                occurrence(Some("50308")),
                occurrence(Some("99999")),
                occurrence(None),
            ],
            &reference,
        );

        assert_eq!(enriched.len(), 3);
        assert_eq!(enriched[0].area_km2, Some(1521.202));
        assert_eq!(enriched[1].area_km2, None);
        assert_eq!(enriched[2].area_km2, None);
    }

    #[test]
    fn exports_filtered_collection() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("BR_Municipios.geojson");
        std::fs::write(&input, COLLECTION).unwrap();
        let output = dir.path().join("interim").join("sp.geojson");

        let reference = BoundaryReference::load(&input, &StateScope::default()).unwrap();
        reference.export(&output).unwrap();

        let written = FeatureCollection::try_from(
            std::fs::read_to_string(&output)
                .unwrap()
                .parse::<GeoJson>()
                .unwrap(),
        )
        .unwrap();

        assert_eq!(written.features.len(), 2);
        assert_eq!(
            written.features[0].property("CD_MUN"),
            Some(&JsonValue::String("50308".to_string()))
        );
    }

    fn field(name: &str) -> shapefile::dbase::FieldName {
        name.try_into().unwrap()
    }

    fn write_shapefile(path: &Path) {
        use shapefile::Point;
        use shapefile::dbase::TableWriterBuilder;

        let table = TableWriterBuilder::new()
            .add_character_field(field("CD_MUN"), 7)
            .add_character_field(field("NM_MUN"), 40)
            .add_character_field(field("CD_UF"), 2)
            .add_numeric_field(field("AREA_KM2"), 12, 3);

        let square = |x: f64| {
            Polygon::new(PolygonRing::Outer(vec![
                Point::new(x, 0.0),
                Point::new(x, 1.0),
                Point::new(x + 1.0, 1.0),
                Point::new(x + 1.0, 0.0),
                Point::new(x, 0.0),
            ]))
        };
        let record = |code: &str, name: &str, state: &str, area: f64| {
            let mut record = Record::default();
            record.insert("CD_MUN".to_string(), FieldValue::Character(Some(code.to_string())));
            record.insert("NM_MUN".to_string(), FieldValue::Character(Some(name.to_string())));
            record.insert("CD_UF".to_string(), FieldValue::Character(Some(state.to_string())));
            record.insert("AREA_KM2".to_string(), FieldValue::Numeric(Some(area)));
            record
        };

        let mut writer = shapefile::Writer::from_path(path, table).unwrap();
        writer
            .write_shape_and_record(&square(0.0), &record("3550308", "Sao Paulo", "35", 1521.202))
            .unwrap();
        writer
            .write_shape_and_record(&square(5.0), &record("3304557", "Rio de Janeiro", "33", 1200.329))
            .unwrap();
    }

    #[test]
    fn loads_shapefile_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("SP_Municipios_2024.shp");
        write_shapefile(&input);

        let reference = BoundaryReference::load(&input, &StateScope::default()).unwrap();

        assert_eq!(reference.len(), 1);
        assert_eq!(reference.area_km2("50308"), Some(1521.202));
        assert_eq!(reference.area_km2("04557"), None);

        let feature = &reference.features[0];
        assert_eq!(
            feature.property("NM_MUN"),
            Some(&JsonValue::String("Sao Paulo".to_string()))
        );
        let Some(Value::MultiPolygon(polygons)) = feature.geometry.as_ref().map(|g| &g.value)
        else {
            panic!("expected a multipolygon");
        };
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].len(), 1);
        assert_eq!(polygons[0][0].len(), 5);
    }

    #[test]
    fn groups_holes_with_their_outer_ring() {
        use shapefile::Point;

        let ring = |points: &[(f64, f64)]| -> Vec<Point> {
            points.iter().map(|&(x, y)| Point::new(x, y)).collect()
        };
        let polygon = Polygon::with_rings(vec![
            PolygonRing::Outer(ring(&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0), (0.0, 0.0)])),
            PolygonRing::Inner(ring(&[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)])),
            PolygonRing::Outer(ring(&[(5.0, 0.0), (5.0, 1.0), (6.0, 1.0), (6.0, 0.0), (5.0, 0.0)])),
        ]);

        let polygons = polygon_coordinates(&polygon);

        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].len(), 2);
        assert_eq!(polygons[1].len(), 1);
    }

    #[test]
    fn rejects_non_collection_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("point.geojson");
        std::fs::write(&input, r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#).unwrap();

        assert!(matches!(
            BoundaryReference::load(&input, &StateScope::default()),
            Err(GeoError::GeoJson(_))
        ));
    }
}
