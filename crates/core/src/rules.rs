//! Condition rule table and direct emergency phrase list.
//!
//! The scorer is driven entirely by data held in a [`RuleTable`]. A built-in table ships with
//! the crate ([`RuleTable::default`]) and an alternative table can be supplied as YAML at startup
//! (see [`RuleTable::load`]). Once constructed, a table is never mutated; callers share it behind
//! an `Arc`.
//!
//! Responsibilities:
//! - Define the public domain-level rule types
//! - Define a strict wire model for YAML rule files
//! - Validate tables (non-empty tags, non-blank keywords, unique tags, positive weights)
//! - Normalise keywords to lowercase so matching is case-insensitive
//!
//! YAML layout:
//!
//! ```yaml
//! conditions:
//!   - tag: chest_pain
//!     weight: 9
//!     keywords: [crushing, severe, radiating, shortness of breath]
//! direct_phrases: [call 911, emergency]
//! direct_phrase_weight: 10
//! ```

use crate::constants::DIRECT_PHRASE_WEIGHT;
use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ============================================================================
// Public domain-level types
// ============================================================================

/// One entry of the condition table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct ConditionRule {
    /// Condition identifier, for example `chest_pain`.
    pub condition_tag: String,
    /// Weight added to the score for every keyword of this condition found in the text.
    pub severity_weight: u32,
    /// Lowercase substrings that signal this condition, in match order.
    pub keywords: Vec<String>,
}

/// Immutable scoring table: condition rules followed by direct emergency phrases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct RuleTable {
    conditions: Vec<ConditionRule>,
    direct_phrases: Vec<String>,
    direct_phrase_weight: u32,
}

const DEFAULT_CONDITIONS: &[(&str, u32, &[&str])] = &[
    (
        "chest_pain",
        9,
        &["crushing", "severe", "radiating", "shortness of breath"],
    ),
    (
        "difficulty_breathing",
        9,
        &["can't breathe", "gasping", "suffocating"],
    ),
    ("severe_headache", 8, &["worst headache", "sudden", "thunderclap"]),
    (
        "stroke_symptoms",
        10,
        &["face drooping", "arm weakness", "speech difficulty"],
    ),
    (
        "allergic_reaction",
        9,
        &["swelling", "difficulty breathing", "hives", "anaphylaxis"],
    ),
    (
        "severe_bleeding",
        9,
        &["bleeding heavily", "won't stop", "spurting"],
    ),
    (
        "loss_of_consciousness",
        10,
        &["passed out", "unconscious", "fainted"],
    ),
    ("severe_abdominal_pain", 8, &["stabbing", "sudden", "severe"]),
    ("poisoning", 9, &["poisoned", "overdose", "toxic"]),
    (
        "severe_burn",
        8,
        &["severe burn", "large area", "chemical burn"],
    ),
];

const DEFAULT_DIRECT_PHRASES: &[&str] = &[
    "call 911",
    "emergency",
    "ambulance",
    "can't breathe",
    "heart attack",
    "stroke",
    "unconscious",
    "severe pain",
    "bleeding heavily",
    "overdose",
    "poisoning",
];

impl Default for RuleTable {
    fn default() -> Self {
        let conditions = DEFAULT_CONDITIONS
            .iter()
            .map(|(tag, weight, keywords)| ConditionRule {
                condition_tag: (*tag).to_owned(),
                severity_weight: *weight,
                keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
            })
            .collect();

        Self {
            conditions,
            direct_phrases: DEFAULT_DIRECT_PHRASES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
            direct_phrase_weight: DIRECT_PHRASE_WEIGHT,
        }
    }
}

impl RuleTable {
    /// Build a validated table from domain values.
    ///
    /// Keywords and phrases are lowercased. Validation rules are the same as for
    /// [`RuleTable::parse`].
    pub fn new(
        conditions: Vec<ConditionRule>,
        direct_phrases: Vec<String>,
        direct_phrase_weight: u32,
    ) -> TriageResult<Self> {
        let mut seen = HashSet::new();
        let mut normalised = Vec::with_capacity(conditions.len());

        for rule in conditions {
            let tag = rule.condition_tag.trim();
            if tag.is_empty() {
                return Err(TriageError::InvalidRuleTable(
                    "condition tag cannot be empty".into(),
                ));
            }
            if !seen.insert(tag.to_owned()) {
                return Err(TriageError::InvalidRuleTable(format!(
                    "duplicate condition tag: {tag}"
                )));
            }
            if rule.severity_weight == 0 {
                return Err(TriageError::InvalidRuleTable(format!(
                    "condition {tag} must have a positive weight"
                )));
            }
            if rule.keywords.is_empty() {
                return Err(TriageError::InvalidRuleTable(format!(
                    "condition {tag} has no keywords"
                )));
            }

            normalised.push(ConditionRule {
                condition_tag: tag.to_owned(),
                severity_weight: rule.severity_weight,
                keywords: normalise_phrases(&rule.keywords, tag)?,
            });
        }

        if direct_phrase_weight == 0 && !direct_phrases.is_empty() {
            return Err(TriageError::InvalidRuleTable(
                "direct_phrase_weight must be positive".into(),
            ));
        }

        Ok(Self {
            conditions: normalised,
            direct_phrases: normalise_phrases(&direct_phrases, "direct_phrases")?,
            direct_phrase_weight,
        })
    }

    pub fn conditions(&self) -> &[ConditionRule] {
        &self.conditions
    }

    pub fn direct_phrases(&self) -> &[String] {
        &self.direct_phrases
    }

    pub fn direct_phrase_weight(&self) -> u32 {
        self.direct_phrase_weight
    }

    /// Look up a condition rule by tag.
    pub fn condition(&self, tag: &str) -> Option<&ConditionRule> {
        self.conditions.iter().find(|c| c.condition_tag == tag)
    }

    /// Parse a rule table from YAML text.
    ///
    /// This uses `serde_path_to_error` so a schema mismatch names the failing field
    /// (for example `conditions[2].weight`).
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidRuleTable`] if:
    /// - the YAML does not match the rule file schema,
    /// - any unknown keys are present,
    /// - a tag is empty or duplicated, a weight is zero, or a keyword list is empty or blank.
    pub fn parse(yaml_text: &str) -> TriageResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, RuleTableWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(TriageError::InvalidRuleTable(format!(
                    "rule table schema mismatch at {path}: {source}"
                )));
            }
        };

        wire_to_domain(wire)
    }

    /// Read and parse a YAML rule table from disk.
    pub fn load(path: &Path) -> TriageResult<Self> {
        let text = std::fs::read_to_string(path).map_err(TriageError::RuleTableRead)?;
        let table = Self::parse(&text)?;
        tracing::info!(
            "loaded rule table from {} ({} conditions, {} direct phrases)",
            path.display(),
            table.conditions.len(),
            table.direct_phrases.len()
        );
        Ok(table)
    }

    /// Render the table as YAML text in the same layout [`RuleTable::parse`] accepts.
    pub fn render(&self) -> TriageResult<String> {
        serde_yaml::to_string(&domain_to_wire(self)).map_err(TriageError::RuleTableRender)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct RuleTableWire {
    conditions: Vec<ConditionWire>,
    #[serde(default)]
    direct_phrases: Vec<String>,
    #[serde(default = "default_direct_phrase_weight")]
    direct_phrase_weight: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct ConditionWire {
    tag: String,
    weight: u32,
    keywords: Vec<String>,
}

fn default_direct_phrase_weight() -> u32 {
    DIRECT_PHRASE_WEIGHT
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: RuleTableWire) -> TriageResult<RuleTable> {
    let conditions = wire
        .conditions
        .into_iter()
        .map(|c| ConditionRule {
            condition_tag: c.tag,
            severity_weight: c.weight,
            keywords: c.keywords,
        })
        .collect();

    RuleTable::new(conditions, wire.direct_phrases, wire.direct_phrase_weight)
}

fn domain_to_wire(table: &RuleTable) -> RuleTableWire {
    RuleTableWire {
        conditions: table
            .conditions
            .iter()
            .map(|c| ConditionWire {
                tag: c.condition_tag.clone(),
                weight: c.severity_weight,
                keywords: c.keywords.clone(),
            })
            .collect(),
        direct_phrases: table.direct_phrases.clone(),
        direct_phrase_weight: table.direct_phrase_weight,
    }
}

fn normalise_phrases(phrases: &[String], owner: &str) -> TriageResult<Vec<String>> {
    phrases
        .iter()
        .map(|p| {
            let p = p.trim().to_lowercase();
            if p.is_empty() {
                Err(TriageError::InvalidRuleTable(format!(
                    "{owner} contains a blank keyword"
                )))
            } else {
                Ok(p)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_ten_conditions_and_eleven_phrases() {
        let table = RuleTable::default();
        assert_eq!(table.conditions().len(), 10);
        assert_eq!(table.direct_phrases().len(), 11);
        assert_eq!(table.direct_phrase_weight(), 10);

        let stroke = table.condition("stroke_symptoms").expect("stroke rule");
        assert_eq!(stroke.severity_weight, 10);
        assert_eq!(
            stroke.keywords,
            vec!["face drooping", "arm weakness", "speech difficulty"]
        );
    }

    #[test]
    fn default_table_survives_render_and_parse() {
        let table = RuleTable::default();
        let yaml = table.render().expect("render");
        let reparsed = RuleTable::parse(&yaml).expect("parse");
        assert_eq!(table, reparsed);
    }

    #[test]
    fn parse_lowercases_keywords_and_defaults_phrase_weight() {
        let input = r#"conditions:
  - tag: fever
    weight: 4
    keywords: ["High Fever", "  Chills "]
direct_phrases: ["CALL 911"]
"#;

        let table = RuleTable::parse(input).expect("parse");
        assert_eq!(table.conditions()[0].keywords, vec!["high fever", "chills"]);
        assert_eq!(table.direct_phrases(), &["call 911".to_string()]);
        assert_eq!(table.direct_phrase_weight(), DIRECT_PHRASE_WEIGHT);
    }

    #[test]
    fn strict_validation_rejects_unknown_keys() {
        let input = r#"conditions:
  - tag: fever
    weight: 4
    keywords: [fever]
    colour: red
"#;

        let err = RuleTable::parse(input).expect_err("should reject unknown key");
        match err {
            TriageError::InvalidRuleTable(msg) => assert!(msg.contains("colour")),
            other => panic!("expected InvalidRuleTable error, got {other:?}"),
        }
    }

    #[test]
    fn strict_validation_rejects_wrong_types() {
        let input = r#"conditions:
  - tag: fever
    weight: "heavy"
    keywords: [fever]
"#;

        let err = RuleTable::parse(input).expect_err("should reject wrong type");
        match err {
            TriageError::InvalidRuleTable(msg) => assert!(msg.contains("weight")),
            other => panic!("expected InvalidRuleTable error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_tags() {
        let input = r#"conditions:
  - tag: fever
    weight: 4
    keywords: [fever]
  - tag: fever
    weight: 5
    keywords: [chills]
"#;

        let err = RuleTable::parse(input).expect_err("should reject duplicate tag");
        assert!(err.to_string().contains("duplicate condition tag"));
    }

    #[test]
    fn rejects_blank_keywords_and_empty_lists() {
        let blank = r#"conditions:
  - tag: fever
    weight: 4
    keywords: ["   "]
"#;
        assert!(RuleTable::parse(blank).is_err());

        let empty = r#"conditions:
  - tag: fever
    weight: 4
    keywords: []
"#;
        assert!(RuleTable::parse(empty).is_err());
    }

    #[test]
    fn load_reads_yaml_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rules.yaml");
        std::fs::write(
            &path,
            "conditions:\n  - tag: rash\n    weight: 3\n    keywords: [rash]\n",
        )
        .expect("write rules");

        let table = RuleTable::load(&path).expect("load");
        assert_eq!(table.conditions()[0].condition_tag, "rash");
        assert!(table.direct_phrases().is_empty());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = RuleTable::load(&dir.path().join("missing.yaml")).expect_err("missing file");
        assert!(matches!(err, TriageError::RuleTableRead(_)));
    }
}
