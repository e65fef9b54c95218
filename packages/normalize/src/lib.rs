#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Text normalization for join and grouping keys.
//!
//! [`normalize_text`] is the canonical form used everywhere two free-text
//! values must compare equal: accents are decomposed and dropped, the
//! result is upper-cased and whitespace is collapsed. [`normalize_city`]
//! layers the known city-name corrections on top of it so that police
//! report cities line up with the IBGE reference names.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

/// Abbreviated "S." (São/Santo) at the start of a word.
static SAO_ABBREVIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bS\.\s*").expect("valid regex"));

/// Region-name corrections embedded at compile time.
const CITY_OVERRIDES_TOML: &str = include_str!("../city_overrides.toml");

#[derive(Debug, Deserialize)]
struct CityOverrides {
    overrides: BTreeMap<String, String>,
}

static CITY_OVERRIDES: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    toml::de::from_str::<CityOverrides>(CITY_OVERRIDES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse city_overrides.toml: {e}"))
        .overrides
});

/// Normalizes a free-text string.
///
/// 1. Unicode compatibility decomposition (NFKD)
/// 2. Drop every non-ASCII remainder (combining accents, symbols)
/// 3. Uppercase
/// 4. Collapse whitespace runs and trim
///
/// Idempotent: `normalize_text(&normalize_text(x)) == normalize_text(x)`.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let ascii: String = text
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_ascii_uppercase();

    ascii.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`normalize_text`] for optional input; `None` yields an empty string.
#[must_use]
pub fn normalize_optional(text: Option<&str>) -> String {
    text.map_or_else(String::new, normalize_text)
}

/// Normalizes a city name into its join key.
///
/// Applies [`normalize_text`], expands the abbreviated `S.` prefix to
/// `SAO`, then substitutes the embedded region-name corrections.
#[must_use]
pub fn normalize_city(city: Option<&str>) -> String {
    let normalized = normalize_optional(city);
    if normalized.is_empty() {
        return normalized;
    }

    let expanded = SAO_ABBREVIATION_RE.replace_all(&normalized, "SAO ");
    let collapsed = normalize_text(&expanded);

    match CITY_OVERRIDES.get(&collapsed) {
        Some(corrected) => corrected.clone(),
        None => collapsed,
    }
}

/// Returns the embedded region-name corrections.
#[must_use]
pub fn city_overrides() -> &'static BTreeMap<String, String> {
    &CITY_OVERRIDES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_uppercases() {
        assert_eq!(normalize_text("São Paulo"), "SAO PAULO");
        assert_eq!(normalize_text("Ribeirão Preto"), "RIBEIRAO PRETO");
        assert_eq!(normalize_text("açaí"), "ACAI");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_text("  a   b  "), "A B");
        assert_eq!(normalize_text("a\t\nb"), "A B");
    }

    #[test]
    fn empty_and_missing_input_yield_empty_string() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_optional(None), "");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn drops_non_ascii_symbols() {
        assert_eq!(normalize_text("Mogi–Mirim ✓"), "MOGIMIRIM");
    }

    #[test]
    fn is_idempotent() {
        for input in [
            "São Paulo",
            "  Santa Bárbara d'Oeste ",
            "Embu-Guaçu",
            "ﬁ ligature",
            "",
        ] {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn expands_sao_abbreviation() {
        assert_eq!(normalize_city(Some("S.Paulo")), "SAO PAULO");
        assert_eq!(normalize_city(Some("S. José dos Campos")), "SAO JOSE DOS CAMPOS");
    }

    #[test]
    fn does_not_expand_s_inside_words() {
        assert_eq!(normalize_city(Some("Assis.")), "ASSIS.");
    }

    #[test]
    fn applies_region_overrides() {
        assert_eq!(normalize_city(Some("Moji Mirim")), "MOGI MIRIM");
        assert_eq!(normalize_city(Some("Embu")), "EMBU DAS ARTES");
    }

    #[test]
    fn missing_city_normalizes_to_empty() {
        assert_eq!(normalize_city(None), "");
    }

    #[test]
    fn override_targets_are_fixed_points() {
        for target in city_overrides().values() {
            assert_eq!(&normalize_city(Some(target)), target);
        }
    }
}
