//! Full-address construction for geocoding queries.
//!
//! Police-report addresses arrive split across street, number,
//! neighborhood and city columns, and some rows carry placeholders
//! instead of real values:
//! - Legal redaction: `"VEDAÇÃO DA DIVULGAÇÃO DOS DADOS RELATIVOS"`
//! - Missing number: `"S/N"`
//!
//! Both are stripped so they never reach the geocoder.

use bo_etl_occurrence_models::{NO_NUMBER_TOKEN, StreetNumber};

/// State suffix appended to every address.
pub const STATE_SUFFIX: &str = "SP";

/// Redaction notice written in place of a withheld street, followed by
/// its separator.
pub const REDACTION_PLACEHOLDER: &str = "VEDAÇÃO DA DIVULGAÇÃO DOS DADOS RELATIVOS,";

/// Substrings removed from the assembled address.
fn placeholders() -> [String; 2] {
    [
        REDACTION_PLACEHOLDER.to_string(),
        format!("{NO_NUMBER_TOKEN},"),
    ]
}

/// Builds the one-line address used as the geocoding query and cache key.
///
/// Assembles `"{street}, {number}, {neighborhood}, {city} - SP"`, strips
/// the placeholders, then drops empty comma-separated segments left by
/// missing components and collapses whitespace.
#[must_use]
pub fn build_full_address(
    street: Option<&str>,
    number: StreetNumber,
    neighborhood: Option<&str>,
    normalized_city: &str,
) -> String {
    let raw = format!(
        "{}, {number}, {}, {normalized_city} - {STATE_SUFFIX}",
        street.unwrap_or_default(),
        neighborhood.unwrap_or_default(),
    );

    let stripped = placeholders()
        .iter()
        .fold(raw, |acc, placeholder| acc.replace(placeholder.as_str(), ""));

    stripped
        .split(',')
        .map(|segment| segment.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_complete_address() {
        assert_eq!(
            build_full_address(
                Some("RUA DAS FLORES"),
                StreetNumber::Numbered(120),
                Some("CENTRO"),
                "SAO PAULO"
            ),
            "RUA DAS FLORES, 120, CENTRO, SAO PAULO - SP"
        );
    }

    #[test]
    fn strips_no_number_token() {
        assert_eq!(
            build_full_address(
                Some("RUA DAS FLORES"),
                StreetNumber::Unnumbered,
                Some("CENTRO"),
                "SAO PAULO"
            ),
            "RUA DAS FLORES, CENTRO, SAO PAULO - SP"
        );
    }

    #[test]
    fn strips_redaction_notice() {
        assert_eq!(
            build_full_address(
                Some("VEDAÇÃO DA DIVULGAÇÃO DOS DADOS RELATIVOS"),
                StreetNumber::Unnumbered,
                Some("JARDIM AMERICA"),
                "SOROCABA"
            ),
            "JARDIM AMERICA, SOROCABA - SP"
        );
    }

    #[test]
    fn skips_missing_components() {
        assert_eq!(
            build_full_address(None, StreetNumber::Numbered(5), None, "CAMPINAS"),
            "5, CAMPINAS - SP"
        );
    }

    #[test]
    fn never_contains_placeholders() {
        let address = build_full_address(
            Some("VEDAÇÃO DA DIVULGAÇÃO DOS DADOS RELATIVOS"),
            StreetNumber::Unnumbered,
            None,
            "SANTOS",
        );
        assert!(!address.contains("S/N"));
        assert!(!address.contains("VEDAÇÃO"));
        assert_eq!(address, "SANTOS - SP");
    }
}
