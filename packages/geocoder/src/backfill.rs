//! Coordinate backfill for occurrences missing latitude or longitude.
//!
//! Every address moves from pending to resolved or unresolved exactly
//! once per run; there are no retries. Lookups are sequential and
//! throttled.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use bo_etl_occurrence_models::Occurrence;
use bo_etl_source::progress::ProgressCallback;

use crate::cache::GeocodeCache;
use crate::nominatim::NominatimConfig;
use crate::throttle::Throttle;
use crate::{AddressResolver, Coordinates, GeocodeError};

/// Pacing of external lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillOptions {
    /// Minimum time between the starts of two lookups.
    pub min_delay: Duration,
    /// Upper bound for a single lookup.
    pub request_timeout: Duration,
    /// Extra wait after a rate-limit response.
    pub rate_limited_cooldown: Duration,
}

impl From<&NominatimConfig> for BackfillOptions {
    fn from(config: &NominatimConfig) -> Self {
        Self {
            min_delay: config.min_delay(),
            request_timeout: config.timeout(),
            rate_limited_cooldown: config.rate_limited_cooldown(),
        }
    }
}

/// Counters reported after a backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillStats {
    /// Distinct addresses shared by occurrences missing coordinates.
    pub unique_addresses: usize,
    /// Addresses answered from the cache.
    pub cache_hits: usize,
    /// Addresses sent to the resolver.
    pub lookups: usize,
    /// Addresses that ended with coordinates.
    pub resolved: usize,
    /// Addresses that ended without coordinates.
    pub unresolved: usize,
    /// Occurrences that received at least one coordinate.
    pub filled_occurrences: usize,
}

/// Fills missing coordinates by looking up each distinct `full_address`
/// once.
///
/// Only addresses of occurrences missing latitude or longitude are looked
/// up. Lookup failures leave the address unresolved. Existing
/// coordinates are never overwritten.
pub async fn geocode_missing(
    mut occurrences: Vec<Occurrence>,
    resolver: &dyn AddressResolver,
    options: &BackfillOptions,
    cache: &mut GeocodeCache,
    progress: &Arc<dyn ProgressCallback>,
) -> (Vec<Occurrence>, BackfillStats) {
    let pending = pending_addresses(&occurrences);
    let mut stats = BackfillStats {
        unique_addresses: pending.len(),
        ..BackfillStats::default()
    };

    log::info!(
        "{} unique addresses need geocoding ({} cached results available)",
        pending.len(),
        cache.len()
    );

    progress.set_total(pending.len() as u64);

    let mut throttle = Throttle::new(options.min_delay, options.rate_limited_cooldown);
    let mut resolved: BTreeMap<String, Coordinates> = BTreeMap::new();

    for address in pending {
        let result = if let Some(cached) = cache.get(&address) {
            stats.cache_hits += 1;
            cached
        } else {
            stats.lookups += 1;
            throttle.wait().await;

            match lookup(resolver, &address, options.request_timeout).await {
                Ok(result) => {
                    if result.is_none() {
                        log::debug!("No match for '{address}'");
                    }
                    cache.insert(address.clone(), result);
                    result
                }
                Err(GeocodeError::RateLimited) => {
                    log::warn!("Rate limited while geocoding '{address}'");
                    throttle.back_off();
                    None
                }
                Err(e) => {
                    log::warn!("Geocoding '{address}' failed: {e}");
                    None
                }
            }
        };

        match result {
            Some(coordinates) => {
                stats.resolved += 1;
                resolved.insert(address, coordinates);
            }
            None => stats.unresolved += 1,
        }

        progress.inc(1);
    }

    stats.filled_occurrences = merge(&mut occurrences, &resolved);

    progress.finish(format!(
        "Geocoded {}/{} addresses",
        stats.resolved, stats.unique_addresses
    ));

    log::info!(
        "Geocoding: {} resolved, {} unresolved, {} lookups, {} cache hits, {} occurrences filled",
        stats.resolved,
        stats.unresolved,
        stats.lookups,
        stats.cache_hits,
        stats.filled_occurrences
    );

    (occurrences, stats)
}

/// Distinct addresses of occurrences missing a coordinate, in first-seen
/// order.
fn pending_addresses(occurrences: &[Occurrence]) -> Vec<String> {
    let mut seen = BTreeSet::new();

    occurrences
        .iter()
        .filter(|o| o.is_missing_coordinates())
        .filter_map(|o| o.full_address.as_deref())
        .filter(|address| seen.insert(*address))
        .map(str::to_string)
        .collect()
}

async fn lookup(
    resolver: &dyn AddressResolver,
    address: &str,
    timeout: Duration,
) -> Result<Option<Coordinates>, GeocodeError> {
    tokio::time::timeout(timeout, resolver.resolve(address))
        .await
        .map_err(|_| GeocodeError::Timeout(timeout))?
}

/// Fills null coordinates from the resolved map, field by field.
fn merge(occurrences: &mut [Occurrence], resolved: &BTreeMap<String, Coordinates>) -> usize {
    let mut filled = 0;

    for occurrence in occurrences.iter_mut() {
        if !occurrence.is_missing_coordinates() {
            continue;
        }
        let Some(coordinates) = occurrence
            .full_address
            .as_deref()
            .and_then(|address| resolved.get(address))
        else {
            continue;
        };

        occurrence.latitude.get_or_insert(coordinates.latitude);
        occurrence.longitude.get_or_insert(coordinates.longitude);
        filled += 1;
    }

    filled
}
