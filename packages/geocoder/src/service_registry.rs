//! Compile-time embedded geocoding service configuration.
//!
//! The Nominatim settings live in `services/nominatim.toml` and are
//! embedded at compile time. The pipeline overrides individual fields
//! from the command line.

use crate::nominatim::NominatimConfig;

const NOMINATIM_TOML: &str = include_str!("../services/nominatim.toml");

/// Returns the embedded Nominatim configuration.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (a compile-time guarantee,
/// verified by tests).
#[must_use]
pub fn nominatim_config() -> NominatimConfig {
    toml::de::from_str(NOMINATIM_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded nominatim.toml: {e}"))
}
