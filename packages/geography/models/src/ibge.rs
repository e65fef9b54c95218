//! IBGE state code utilities.
//!
//! Maps between two-digit IBGE state codes (the prefix of every
//! seven-digit municipality code) and two-letter state abbreviations for
//! the 26 states + DF.

/// IBGE state codes for the 26 states + DF.
pub const STATE_CODES: &[&str] = &[
    "11", "12", "13", "14", "15", "16", "17", "21", "22", "23", "24", "25", "26", "27", "28", "29",
    "31", "32", "33", "35", "41", "42", "43", "50", "51", "52", "53",
];

/// Maps a two-digit IBGE state code to the state abbreviation.
///
/// Returns `"??"` for unrecognized codes.
#[must_use]
pub fn state_abbr(code: &str) -> &'static str {
    match code {
        "11" => "RO",
        "12" => "AC",
        "13" => "AM",
        "14" => "RR",
        "15" => "PA",
        "16" => "AP",
        "17" => "TO",
        "21" => "MA",
        "22" => "PI",
        "23" => "CE",
        "24" => "RN",
        "25" => "PB",
        "26" => "PE",
        "27" => "AL",
        "28" => "SE",
        "29" => "BA",
        "31" => "MG",
        "32" => "ES",
        "33" => "RJ",
        "35" => "SP",
        "41" => "PR",
        "42" => "SC",
        "43" => "RS",
        "50" => "MS",
        "51" => "MT",
        "52" => "GO",
        "53" => "DF",
        _ => "??",
    }
}

/// Maps a state abbreviation (case-insensitive) to its IBGE code.
#[must_use]
pub fn state_code(abbr: &str) -> Option<&'static str> {
    let upper = abbr.trim().to_uppercase();
    STATE_CODES
        .iter()
        .copied()
        .find(|code| state_abbr(code) == upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_has_an_abbreviation() {
        for code in STATE_CODES {
            assert_ne!(state_abbr(code), "??", "code {code}");
        }
    }

    #[test]
    fn round_trips_abbreviations() {
        for code in STATE_CODES {
            assert_eq!(state_code(state_abbr(code)), Some(*code));
        }
    }

    #[test]
    fn resolves_sao_paulo() {
        assert_eq!(state_code("sp"), Some("35"));
        assert_eq!(state_abbr("35"), "SP");
        assert_eq!(state_code("XX"), None);
    }
}
