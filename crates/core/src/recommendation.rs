//! Severity tiers and the recommendation attached to each.
//!
//! The mapping from score to tier is evaluated from the highest threshold down; the first
//! threshold the score reaches wins.

use crate::constants::{CONCERNING_THRESHOLD, CRITICAL_THRESHOLD, URGENT_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Four-tier severity scale, lowest first.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityLevel {
    Monitor,
    Concerning,
    Urgent,
    Critical,
}

impl SeverityLevel {
    /// Map a total score to its tier.
    pub fn from_score(score: u32) -> Self {
        if score >= CRITICAL_THRESHOLD {
            Self::Critical
        } else if score >= URGENT_THRESHOLD {
            Self::Urgent
        } else if score >= CONCERNING_THRESHOLD {
            Self::Concerning
        } else {
            Self::Monitor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monitor => "MONITOR",
            Self::Concerning => "CONCERNING",
            Self::Urgent => "URGENT",
            Self::Critical => "CRITICAL",
        }
    }

    /// Banner tone used by the presentation layer.
    pub fn tone(&self) -> Tone {
        match self {
            Self::Critical | Self::Urgent => Tone::Error,
            Self::Concerning => Tone::Warning,
            Self::Monitor => Tone::Info,
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation tone for a recommendation banner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Info,
    Warning,
    Error,
}

/// What the user should do, derived only from the total score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Recommendation {
    pub level: SeverityLevel,
    pub action: String,
    pub message: String,
    pub tone: Tone,
}

impl Recommendation {
    pub fn for_score(score: u32) -> Self {
        Self::for_level(SeverityLevel::from_score(score))
    }

    pub fn for_level(level: SeverityLevel) -> Self {
        let (action, message) = match level {
            SeverityLevel::Critical => (
                "CALL 911 IMMEDIATELY",
                "Critical emergency detected. Call emergency services now!",
            ),
            SeverityLevel::Urgent => (
                "SEEK IMMEDIATE MEDICAL ATTENTION",
                "Urgent medical attention required. Go to emergency room or call 911.",
            ),
            SeverityLevel::Concerning => (
                "CONTACT HEALTHCARE PROVIDER",
                "Concerning symptoms. Contact your doctor or urgent care.",
            ),
            SeverityLevel::Monitor => (
                "MONITOR SYMPTOMS",
                "Monitor symptoms and seek care if they worsen.",
            ),
        };

        Self {
            level,
            action: action.into(),
            message: message.into(),
            tone: level.tone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        assert_eq!(SeverityLevel::from_score(0), SeverityLevel::Monitor);
        assert_eq!(SeverityLevel::from_score(4), SeverityLevel::Monitor);
        assert_eq!(SeverityLevel::from_score(5), SeverityLevel::Concerning);
        assert_eq!(SeverityLevel::from_score(7), SeverityLevel::Concerning);
        assert_eq!(SeverityLevel::from_score(8), SeverityLevel::Urgent);
        assert_eq!(SeverityLevel::from_score(9), SeverityLevel::Urgent);
        assert_eq!(SeverityLevel::from_score(10), SeverityLevel::Critical);
        assert_eq!(SeverityLevel::from_score(50), SeverityLevel::Critical);
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(SeverityLevel::Monitor < SeverityLevel::Concerning);
        assert!(SeverityLevel::Concerning < SeverityLevel::Urgent);
        assert!(SeverityLevel::Urgent < SeverityLevel::Critical);
    }

    #[test]
    fn critical_recommendation_text() {
        let rec = Recommendation::for_score(20);
        assert_eq!(rec.level, SeverityLevel::Critical);
        assert_eq!(rec.action, "CALL 911 IMMEDIATELY");
        assert_eq!(rec.tone, Tone::Error);
    }

    #[test]
    fn monitor_recommendation_uses_info_tone() {
        let rec = Recommendation::for_score(0);
        assert_eq!(rec.action, "MONITOR SYMPTOMS");
        assert_eq!(rec.tone, Tone::Info);
    }

    #[test]
    fn level_serialises_in_upper_case() {
        let json = serde_json::to_string(&SeverityLevel::Concerning).expect("serialize");
        assert_eq!(json, "\"CONCERNING\"");
    }
}
