//! Keyword rules mapping sheet names to record types.
//!
//! The default rules are embedded from `sheets.toml` at compile time. A
//! rule set is an ordered list evaluated top to bottom, so the first
//! keyword contained in the upper-cased sheet name decides the type.

use std::collections::BTreeSet;
use std::path::Path;

use bo_etl_occurrence_models::RecordType;
use serde::Deserialize;

use crate::SourceError;

const DEFAULT_SHEETS_TOML: &str = include_str!("../sheets.toml");

/// Maps a sheet-name keyword to a record type and the column holding the
/// type description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SheetTypeRule {
    /// Upper-case keyword searched for in the sheet name.
    pub keyword: String,
    /// Record type assigned to matching sheets.
    pub record_type: RecordType,
    /// Column whose value becomes each row's type description.
    pub description_column: String,
}

#[derive(Debug, Deserialize)]
struct SheetRulesFile {
    #[serde(default)]
    excluded_sheets: Vec<String>,
    #[serde(rename = "rule", default)]
    rules: Vec<SheetTypeRule>,
}

/// Ordered classification rules plus the sheet exclusion set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRules {
    rules: Vec<SheetTypeRule>,
    excluded: BTreeSet<String>,
}

/// Outcome of classifying one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetClass<'a> {
    /// The sheet name is in the exclusion set.
    Excluded,
    /// No keyword matched.
    Unmapped,
    /// The first matching rule.
    Typed(&'a SheetTypeRule),
}

impl SheetRules {
    /// Builds a rule set. Keywords and exclusions are upper-cased.
    #[must_use]
    pub fn new(rules: Vec<SheetTypeRule>, excluded_sheets: &[String]) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| SheetTypeRule {
                keyword: r.keyword.to_uppercase(),
                ..r
            })
            .collect();
        let excluded = excluded_sheets.iter().map(|s| s.to_uppercase()).collect();
        Self { rules, excluded }
    }

    /// Parses a rule set from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> Result<Self, SourceError> {
        let file: SheetRulesFile = toml::de::from_str(toml_str)?;
        Ok(Self::new(file.rules, &file.excluded_sheets))
    }

    /// Reads a rule set from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Returns the rules embedded from `sheets.toml`.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (a compile-time
    /// guarantee, verified by tests).
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml(DEFAULT_SHEETS_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded sheets.toml: {e}"))
    }

    /// The rules, in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[SheetTypeRule] {
        &self.rules
    }

    /// Classifies a sheet by name.
    #[must_use]
    pub fn classify(&self, sheet_name: &str) -> SheetClass<'_> {
        let upper = sheet_name.to_uppercase();

        if self.excluded.contains(&upper) {
            return SheetClass::Excluded;
        }

        self.rules
            .iter()
            .find(|r| upper.contains(&r.keyword))
            .map_or(SheetClass::Unmapped, SheetClass::Typed)
    }
}

impl Default for SheetRules {
    fn default() -> Self {
        Self::embedded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(keyword: &str, record_type: RecordType) -> SheetTypeRule {
        SheetTypeRule {
            keyword: keyword.to_string(),
            record_type,
            description_column: "RUBRICA".to_string(),
        }
    }

    #[test]
    fn embedded_rules_parse() {
        let rules = SheetRules::embedded();
        assert!(!rules.rules().is_empty());
    }

    #[test]
    fn matches_case_insensitively() {
        let rules = SheetRules::embedded();
        let SheetClass::Typed(r) = rules.classify("Roubo_Veiculo_2025") else {
            panic!("expected a typed sheet");
        };
        assert_eq!(r.record_type, RecordType::Roubo);
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = SheetRules::new(
            vec![rule("FURTO", RecordType::Furto), rule("ROUBO", RecordType::Roubo)],
            &[],
        );
        let SheetClass::Typed(r) = rules.classify("ROUBO E FURTO") else {
            panic!("expected a typed sheet");
        };
        assert_eq!(r.record_type, RecordType::Furto);
    }

    #[test]
    fn latrocinio_precedes_roubo_in_embedded_rules() {
        let rules = SheetRules::embedded();
        let SheetClass::Typed(r) = rules.classify("LATROCÍNIO (ROUBO SEGUIDO DE MORTE)") else {
            panic!("expected a typed sheet");
        };
        assert_eq!(r.record_type, RecordType::Latrocinio);
        assert_eq!(r.description_column, "NATUREZA_APURADA");
    }

    #[test]
    fn unmatched_sheet_is_unmapped() {
        assert_eq!(SheetRules::embedded().classify("RESUMO"), SheetClass::Unmapped);
    }

    #[test]
    fn excluded_sheet_is_dropped_even_if_keyword_matches() {
        let rules = SheetRules::new(
            vec![rule("ROUBO", RecordType::Roubo)],
            &["Notas Roubo".to_string()],
        );
        assert_eq!(rules.classify("NOTAS ROUBO"), SheetClass::Excluded);
        assert_eq!(rules.classify("notas roubo"), SheetClass::Excluded);
    }

    #[test]
    fn embedded_exclusions_apply() {
        assert_eq!(
            SheetRules::embedded().classify("Metodologia"),
            SheetClass::Excluded
        );
    }

    #[test]
    fn rejects_unknown_record_type() {
        let toml_str = r#"
            [[rule]]
            keyword = "X"
            record_type = "HOMICIDIO"
            description_column = "RUBRICA"
        "#;
        assert!(SheetRules::from_toml(toml_str).is_err());
    }
}
