//! Keyword severity scoring.
//!
//! [`SeverityAssessor::assess`] is a pure function of its input, the shared [`RuleTable`] and the
//! optional classifier:
//!
//! 1. symptom text and additional info are joined with a space and lowercased;
//! 2. every condition keyword found adds its condition weight;
//! 3. every direct emergency phrase found adds the flat phrase weight;
//! 4. a classifier answering `requires_emergency` raises the score to at least
//!    [`CLASSIFIER_EMERGENCY_FLOOR`];
//! 5. the score picks the recommendation tier.
//!
//! Steps 2 and 3 are independent, so text such as "unconscious" is counted by both the
//! `loss_of_consciousness` rule and the direct phrase list.

use crate::classifier::{ClassifierOpinion, SymptomClassifier};
use crate::constants::{CLASSIFIER_EMERGENCY_FLOOR, DIRECT_EMERGENCY_TAG, EMERGENCY_THRESHOLD};
use crate::recommendation::{Recommendation, SeverityLevel};
use crate::rules::RuleTable;
use crate::TriageError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Self-reported urgency from the intake form. Recorded, not scored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyHint {
    LifeThreatening,
    VeryUrgent,
    Urgent,
    CanWait,
}

impl UrgencyHint {
    pub const ALL: [UrgencyHint; 4] = [
        Self::LifeThreatening,
        Self::VeryUrgent,
        Self::Urgent,
        Self::CanWait,
    ];

    /// Label shown on the intake form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LifeThreatening => "Life-threatening emergency",
            Self::VeryUrgent => "Very urgent",
            Self::Urgent => "Urgent",
            Self::CanWait => "Can wait for care",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::LifeThreatening => "life-threatening",
            Self::VeryUrgent => "very-urgent",
            Self::Urgent => "urgent",
            Self::CanWait => "can-wait",
        }
    }
}

impl FromStr for UrgencyHint {
    type Err = TriageError;

    /// Accepts the kebab-case code (`very-urgent`), the wire name (`VERY_URGENT`) or the form
    /// label (`Very urgent`), ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|hint| hint.code() == wanted || hint.label().to_lowercase() == wanted)
            .ok_or_else(|| TriageError::InvalidInput(format!("unknown urgency: {s}")))
    }
}

/// Input to a single assessment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AssessmentInput {
    pub symptom_text: String,
    #[serde(default)]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub urgency_hint: Option<UrgencyHint>,
}

impl AssessmentInput {
    pub fn new(symptom_text: impl Into<String>) -> Self {
        Self {
            symptom_text: symptom_text.into(),
            ..Self::default()
        }
    }

    pub fn with_additional_info(mut self, info: impl Into<String>) -> Self {
        self.additional_info = Some(info.into());
        self
    }

    pub fn with_urgency(mut self, hint: UrgencyHint) -> Self {
        self.urgency_hint = Some(hint);
        self
    }

    /// Text the rules are matched against.
    pub fn normalised_text(&self) -> String {
        format!(
            "{} {}",
            self.symptom_text,
            self.additional_info.as_deref().unwrap_or("")
        )
        .to_lowercase()
    }
}

/// One keyword hit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DetectedMatch {
    pub condition_tag: String,
    pub severity_weight: u32,
    pub matched_keyword: String,
}

/// Result of scoring one input.
#[derive(Clone, Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct Assessment {
    pub total_score: u32,
    pub is_emergency: bool,
    pub matches: Vec<DetectedMatch>,
    pub recommendation: Recommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency_hint: Option<UrgencyHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_opinion: Option<ClassifierOpinion>,
}

impl Assessment {
    pub fn level(&self) -> SeverityLevel {
        self.recommendation.level
    }

    /// Tag of the first match, used to pick first-aid instructions.
    pub fn primary_condition(&self) -> Option<&str> {
        self.matches.first().map(|m| m.condition_tag.as_str())
    }

    /// Distinct condition tags in first-seen order.
    pub fn condition_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        for m in &self.matches {
            if !tags.contains(&m.condition_tag.as_str()) {
                tags.push(&m.condition_tag);
            }
        }
        tags
    }
}

/// Scores symptom text against a shared rule table.
#[derive(Clone)]
pub struct SeverityAssessor {
    rules: Arc<RuleTable>,
    classifier: Option<Arc<dyn SymptomClassifier>>,
}

impl Default for SeverityAssessor {
    fn default() -> Self {
        Self::new(Arc::new(RuleTable::default()))
    }
}

impl std::fmt::Debug for SeverityAssessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeverityAssessor")
            .field("conditions", &self.rules.conditions().len())
            .field("classifier", &self.classifier.is_some())
            .finish()
    }
}

impl SeverityAssessor {
    pub fn new(rules: Arc<RuleTable>) -> Self {
        Self {
            rules,
            classifier: None,
        }
    }

    /// Attach an external classifier consulted once per assessment.
    pub fn with_classifier(mut self, classifier: Arc<dyn SymptomClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// Shorthand for scoring plain text with optional additional info.
    pub fn assess_text(&self, symptom_text: &str, additional_info: Option<&str>) -> Assessment {
        self.assess(&AssessmentInput {
            symptom_text: symptom_text.to_owned(),
            additional_info: additional_info.map(str::to_owned),
            urgency_hint: None,
        })
    }

    /// Score an input. Never fails; an unusable classifier is ignored.
    pub fn assess(&self, input: &AssessmentInput) -> Assessment {
        let text = input.normalised_text();
        let mut total_score: u32 = 0;
        let mut matches = Vec::new();

        for rule in self.rules.conditions() {
            for keyword in &rule.keywords {
                if text.contains(keyword.as_str()) {
                    total_score = total_score.saturating_add(rule.severity_weight);
                    matches.push(DetectedMatch {
                        condition_tag: rule.condition_tag.clone(),
                        severity_weight: rule.severity_weight,
                        matched_keyword: keyword.clone(),
                    });
                }
            }
        }

        let phrase_weight = self.rules.direct_phrase_weight();
        for phrase in self.rules.direct_phrases() {
            if text.contains(phrase.as_str()) {
                total_score = total_score.saturating_add(phrase_weight);
                matches.push(DetectedMatch {
                    condition_tag: DIRECT_EMERGENCY_TAG.into(),
                    severity_weight: phrase_weight,
                    matched_keyword: phrase.clone(),
                });
            }
        }

        let classifier_opinion = self.consult_classifier(&text);
        if classifier_opinion.is_some_and(|o| o.requires_emergency) {
            total_score = total_score.max(CLASSIFIER_EMERGENCY_FLOOR);
        }

        let recommendation = Recommendation::for_score(total_score);
        tracing::debug!(
            total_score,
            matches = matches.len(),
            level = %recommendation.level,
            "symptom assessment complete"
        );

        Assessment {
            total_score,
            is_emergency: total_score >= EMERGENCY_THRESHOLD,
            matches,
            recommendation,
            urgency_hint: input.urgency_hint,
            classifier_opinion,
        }
    }

    fn consult_classifier(&self, text: &str) -> Option<ClassifierOpinion> {
        let classifier = self.classifier.as_ref()?;
        match classifier.classify(text) {
            Ok(opinion) => Some(opinion),
            Err(e) => {
                tracing::warn!("classifier unavailable, using rule-based score only: {e}");
                None
            }
        }
    }
}
