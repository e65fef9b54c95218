#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding backfill for occurrences missing coordinates.
//!
//! Addresses are resolved through the Nominatim / `OpenStreetMap` search
//! API, configured via the TOML files in `services/`. The public instance
//! allows at most one request per second, so lookups run one at a time
//! behind a [`throttle::Throttle`], each bounded by its own timeout.
//!
//! The [`backfill`] stage looks every unique address up at most once,
//! absorbs lookup failures as "no coordinates", and only ever fills
//! coordinates that are missing. An optional [`cache::GeocodeCache`]
//! persists results between runs.

pub mod backfill;
pub mod cache;
pub mod nominatim;
pub mod service_registry;
pub mod throttle;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A resolved coordinate pair (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
}

/// Resolves a one-line address to coordinates.
///
/// `Ok(None)` means the service answered but found no match.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Looks up a single address.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the lookup could not be completed.
    async fn resolve(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The lookup did not complete within the per-request timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error (cache file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache file (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
