//! Nominatim / OpenStreetMap geocoder client.
//!
//! Nominatim has strict rate limits: **1 request per second** maximum,
//! and every request must identify the application with a `User-Agent`.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{AddressResolver, Coordinates, GeocodeError};

/// Connection and usage-policy settings for a Nominatim instance.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimConfig {
    /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
    pub base_url: String,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// ISO country code results are restricted to.
    pub country_code: String,
    /// Minimum delay between requests in milliseconds.
    pub rate_limit_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Extra wait after the service answers HTTP 429, in seconds.
    pub rate_limited_cooldown_secs: u64,
}

impl NominatimConfig {
    /// Minimum delay between requests.
    #[must_use]
    pub const fn min_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Wait imposed after a rate-limit response.
    #[must_use]
    pub const fn rate_limited_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limited_cooldown_secs)
    }
}

/// [`AddressResolver`] backed by a Nominatim instance.
///
/// Rate limiting is the caller's job (see [`crate::throttle::Throttle`]).
pub struct NominatimResolver {
    client: reqwest::Client,
    config: NominatimConfig,
}

impl NominatimResolver {
    /// Builds an HTTP client with the configured user agent and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the client cannot be built.
    pub fn new(config: NominatimConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;

        Ok(Self { client, config })
    }

    /// The settings this resolver was built with.
    #[must_use]
    pub const fn config(&self) -> &NominatimConfig {
        &self.config
    }
}

#[async_trait]
impl AddressResolver for NominatimResolver {
    async fn resolve(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        geocode_freeform(
            &self.client,
            &self.config.base_url,
            &self.config.country_code,
            address,
        )
        .await
        .map_err(|e| match e {
            GeocodeError::Http(e) if e.is_timeout() => GeocodeError::Timeout(self.config.timeout()),
            other => other,
        })
    }
}

/// Geocodes a free-form address query using Nominatim.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails,
/// or [`GeocodeError::RateLimited`] on HTTP 429.
pub async fn geocode_freeform(
    client: &reqwest::Client,
    base_url: &str,
    country_code: &str,
    query: &str,
) -> Result<Option<Coordinates>, GeocodeError> {
    let resp = client
        .get(base_url)
        .query(&[
            ("q", query),
            ("countrycodes", country_code),
            ("format", "jsonv2"),
            ("limit", "1"),
        ])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let body: serde_json::Value = resp.error_for_status()?.json().await?;
    parse_response(&body)
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<Coordinates>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let latitude = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let longitude = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    Ok(Some(Coordinates {
        latitude,
        longitude,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "-23.5505",
            "lon": "-46.6333",
            "display_name": "Praça da Sé, Sé, São Paulo, Região Imediata de São Paulo, Brasil"
        }]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - -23.5505).abs() < 1e-4);
        assert!((result.longitude - -46.6333).abs() < 1e-4);
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_non_array_body() {
        let body = serde_json::json!({"error": "Unable to geocode"});
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_result_without_coordinates() {
        let body = serde_json::json!([{"display_name": "Somewhere"}]);
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
