//! Request-scoped context.
//!
//! Each request builds its own [`RequestContext`]; handlers receive it explicitly. Emergency
//! mode is a field on the context rather than process-wide state.

use crate::assessor::Assessment;
use crate::constants::ANONYMOUS_SUBJECT;
use crate::records::validate_path_component;
use crate::TriageResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    subject_id: String,
    emergency_mode: bool,
}

/// Log entry written when emergency mode is switched off.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmergencyDeactivation {
    pub timestamp: DateTime<Utc>,
    pub subject_id: String,
}

/// Log entry written when emergency mode is switched on.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmergencyActivation {
    pub timestamp: DateTime<Utc>,
    pub subject_id: String,
    pub severity_assessment: Assessment,
    pub auto_activated: bool,
}

impl RequestContext {
    /// Context for a known subject.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TriageError::InvalidInput`] if the subject id is not a valid path
    /// component (see [`validate_path_component`]).
    pub fn new(subject_id: impl Into<String>) -> TriageResult<Self> {
        let subject_id = subject_id.into();
        validate_path_component("subject_id", &subject_id)?;
        Ok(Self {
            subject_id,
            emergency_mode: false,
        })
    }

    /// Context for a known subject whose emergency mode was established by an earlier request.
    pub fn resume(subject_id: impl Into<String>, emergency_mode: bool) -> TriageResult<Self> {
        let mut ctx = Self::new(subject_id)?;
        ctx.emergency_mode = emergency_mode;
        Ok(ctx)
    }

    /// Context for a request that carries no identity.
    pub fn anonymous() -> Self {
        Self {
            subject_id: ANONYMOUS_SUBJECT.into(),
            emergency_mode: false,
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn emergency_mode(&self) -> bool {
        self.emergency_mode
    }

    /// Switch emergency mode on because of `assessment`.
    pub fn activate_emergency_mode(&mut self, assessment: &Assessment) -> EmergencyActivation {
        self.emergency_mode = true;
        tracing::warn!(
            subject = %self.subject_id,
            score = assessment.total_score,
            level = %assessment.level(),
            "emergency mode activated"
        );

        EmergencyActivation {
            timestamp: Utc::now(),
            subject_id: self.subject_id.clone(),
            severity_assessment: assessment.clone(),
            auto_activated: true,
        }
    }

    /// Switch emergency mode off, returning the log entry to store.
    pub fn clear_emergency_mode(&mut self) -> EmergencyDeactivation {
        self.emergency_mode = false;
        tracing::info!(subject = %self.subject_id, "emergency mode deactivated");

        EmergencyDeactivation {
            timestamp: Utc::now(),
            subject_id: self.subject_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SeverityAssessor;

    #[test]
    fn new_context_is_not_in_emergency_mode() {
        let ctx = RequestContext::new("alice").expect("context");
        assert_eq!(ctx.subject_id(), "alice");
        assert!(!ctx.emergency_mode());
    }

    #[test]
    fn invalid_subject_is_rejected() {
        assert!(RequestContext::new("").is_err());
        assert!(RequestContext::new("a/b").is_err());
    }

    #[test]
    fn anonymous_context_uses_placeholder_subject() {
        assert_eq!(RequestContext::anonymous().subject_id(), ANONYMOUS_SUBJECT);
    }

    #[test]
    fn activation_sets_and_clear_resets_the_flag() {
        let assessment = SeverityAssessor::default().assess_text("call 911", None);
        let mut ctx = RequestContext::new("alice").expect("context");

        let log = ctx.activate_emergency_mode(&assessment);
        assert!(ctx.emergency_mode());
        assert!(log.auto_activated);
        assert_eq!(log.subject_id, "alice");
        assert_eq!(log.severity_assessment, assessment);

        let off = ctx.clear_emergency_mode();
        assert!(!ctx.emergency_mode());
        assert_eq!(off.subject_id, "alice");
        assert!(off.timestamp >= log.timestamp);
    }

    #[test]
    fn resumed_context_keeps_the_given_mode() {
        let ctx = RequestContext::resume("alice", true).expect("context");
        assert!(ctx.emergency_mode());
        assert!(RequestContext::resume("../alice", true).is_err());
    }
}
