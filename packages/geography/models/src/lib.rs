#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! State scope and municipal reference types.
//!
//! The reference datasets cover the whole country; every join in the
//! pipeline is restricted to one state, identified both by its
//! abbreviation (population spreadsheet) and its IBGE code (boundary
//! dataset).

pub mod ibge;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The state the pipeline is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateScope {
    /// Two-letter abbreviation (e.g. `"SP"`).
    pub abbreviation: String,
    /// Two-digit IBGE state code (e.g. `"35"`).
    pub ibge_code: String,
}

impl StateScope {
    /// Builds a scope from a state abbreviation.
    ///
    /// Returns `None` for unknown abbreviations.
    #[must_use]
    pub fn from_abbreviation(abbr: &str) -> Option<Self> {
        ibge::state_code(abbr).map(|code| Self {
            abbreviation: ibge::state_abbr(code).to_string(),
            ibge_code: code.to_string(),
        })
    }
}

impl FromStr for StateScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_abbreviation(s).ok_or_else(|| format!("Unknown state abbreviation: '{s}'"))
    }
}

impl Default for StateScope {
    /// São Paulo.
    fn default() -> Self {
        Self {
            abbreviation: "SP".to_string(),
            ibge_code: "35".to_string(),
        }
    }
}

/// One municipality from the population reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MunicipalityEntry {
    /// Five-digit municipality code, without the state prefix.
    pub code: String,
    /// Municipality name as published.
    pub name: String,
    /// Join key (see `bo_etl_normalize::normalize_text`).
    pub normalized_name: String,
    /// State abbreviation.
    pub state: String,
    /// Estimated population.
    pub estimated_population: u64,
}
