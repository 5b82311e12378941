//! Triage service tying the assessor to its collaborators.
//!
//! The service owns the shared, read-only pieces (assessor, record store, notification sink) and
//! is cheap to clone. Per-request state lives in the [`RequestContext`] passed to each call.

use crate::assessor::{Assessment, AssessmentInput, SeverityAssessor};
use crate::constants::{
    AMBULANCE_CALL_RECORD_TYPE, ASSESSMENT_RECORD_TYPE, EMERGENCY_ACTIVATION_RECORD_TYPE,
    EMERGENCY_CALL_SEVERITY, EMERGENCY_DEACTIVATION_RECORD_TYPE,
};
use crate::context::RequestContext;
use crate::first_aid;
use crate::notification::{
    notify_contacts, AlertLocation, DispatchResult, EmergencyAlert, EmergencyContact,
    NotificationSink,
};
use crate::records::{RecordStore, StoredRecord};
use crate::{TriageError, TriageResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Log entry written when emergency services are called.
#[derive(Clone, Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct EmergencyCall {
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,
    pub subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<AlertLocation>,
    pub status: String,
}

#[derive(Clone)]
pub struct TriageService {
    assessor: SeverityAssessor,
    records: Arc<dyn RecordStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for TriageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriageService")
            .field("assessor", &self.assessor)
            .finish_non_exhaustive()
    }
}

impl TriageService {
    pub fn new(
        assessor: SeverityAssessor,
        records: Arc<dyn RecordStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            assessor,
            records,
            notifier,
        }
    }

    pub fn assessor(&self) -> &SeverityAssessor {
        &self.assessor
    }

    /// Assess `input` for the subject in `ctx`.
    ///
    /// The assessment is stored as a `symptom_assessment` record. When it is an emergency, the
    /// context is switched into emergency mode and the activation is stored as well. Storage
    /// failures are logged and do not affect the returned assessment.
    pub fn assess(&self, ctx: &mut RequestContext, input: &AssessmentInput) -> Assessment {
        let assessment = self.assessor.assess(input);
        self.store(ctx.subject_id(), ASSESSMENT_RECORD_TYPE, &assessment);

        if assessment.is_emergency {
            let activation = ctx.activate_emergency_mode(&assessment);
            self.store(
                ctx.subject_id(),
                EMERGENCY_ACTIVATION_RECORD_TYPE,
                &activation,
            );
        }

        assessment
    }

    /// Context for a request, with emergency mode restored for known subjects.
    ///
    /// A subject is in emergency mode when its newest activation record is newer than its newest
    /// deactivation record. Requests without a subject get a fresh anonymous context.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] for an invalid subject id, or a storage error if the
    /// subject's records cannot be read.
    pub fn resume_context(&self, subject_id: Option<&str>) -> TriageResult<RequestContext> {
        let Some(subject_id) = subject_id else {
            return Ok(RequestContext::anonymous());
        };
        let ctx = RequestContext::new(subject_id)?;

        let newest = |record_type| -> TriageResult<Option<StoredRecord>> {
            Ok(self
                .records
                .list_records(ctx.subject_id(), Some(record_type), Some(1))?
                .into_iter()
                .next())
        };
        let active = match (
            newest(EMERGENCY_ACTIVATION_RECORD_TYPE)?,
            newest(EMERGENCY_DEACTIVATION_RECORD_TYPE)?,
        ) {
            (Some(on), Some(off)) => on.id > off.id,
            (Some(_), None) => true,
            (None, _) => false,
        };

        RequestContext::resume(subject_id, active)
    }

    /// Switch emergency mode off for the subject in `ctx` and store the deactivation.
    ///
    /// Returns `false` if the context was not in emergency mode. Unlike assessments, a
    /// deactivation that cannot be stored is an error: the subject would otherwise come back in
    /// emergency mode on the next request.
    pub fn deactivate_emergency(&self, ctx: &mut RequestContext) -> TriageResult<bool> {
        if !ctx.emergency_mode() {
            return Ok(false);
        }
        let entry = ctx.clear_emergency_mode();
        let payload = serde_json::to_value(&entry).map_err(TriageError::Serialization)?;
        self.records
            .append_record(ctx.subject_id(), EMERGENCY_DEACTIVATION_RECORD_TYPE, payload)?;
        Ok(true)
    }

    /// Call emergency services for the subject in `ctx`.
    ///
    /// Stores an `ambulance_call` record and sends every contact the full alert naming the
    /// subject, time and location. Storage failures are logged; the contacts are alerted
    /// regardless.
    pub fn call_emergency_services(
        &self,
        ctx: &RequestContext,
        contacts: &[EmergencyContact],
        location: Option<AlertLocation>,
    ) -> (EmergencyCall, Vec<DispatchResult>) {
        let call = EmergencyCall {
            timestamp: Utc::now(),
            subject_id: ctx.subject_id().to_owned(),
            location,
            status: "dispatched".into(),
        };
        tracing::warn!(subject = %ctx.subject_id(), "emergency services called");
        self.store(ctx.subject_id(), AMBULANCE_CALL_RECORD_TYPE, &call);

        let alert = EmergencyAlert::compose(
            ctx.subject_id(),
            AMBULANCE_CALL_RECORD_TYPE,
            call.location.as_ref(),
            EMERGENCY_CALL_SEVERITY,
            call.timestamp,
        );
        let results = notify_contacts(self.notifier.as_ref(), contacts, &alert);
        (call, results)
    }

    /// Alert the subject's contacts about an assessment's level.
    pub fn alert_contacts(
        &self,
        ctx: &RequestContext,
        contacts: &[EmergencyContact],
        assessment: &Assessment,
    ) -> Vec<DispatchResult> {
        let alert = EmergencyAlert::short(&format!(
            "Emergency assessment: {}",
            assessment.level()
        ));
        tracing::info!(
            subject = %ctx.subject_id(),
            contacts = contacts.len(),
            "alerting emergency contacts"
        );
        notify_contacts(self.notifier.as_ref(), contacts, &alert)
    }

    /// Stored records for the subject in `ctx`, newest first.
    pub fn history(
        &self,
        ctx: &RequestContext,
        record_type: Option<&str>,
        limit: Option<usize>,
    ) -> TriageResult<Vec<StoredRecord>> {
        self.records
            .list_records(ctx.subject_id(), record_type, limit)
    }

    /// First-aid steps for an assessment's primary condition.
    pub fn first_aid(&self, assessment: &Assessment) -> Vec<String> {
        first_aid::instructions_for_assessment(assessment)
            .map(|steps| steps.iter().map(|s| (*s).to_owned()).collect())
            .unwrap_or_default()
    }

    fn store<T: Serialize>(&self, subject_id: &str, record_type: &str, value: &T) {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("failed to serialize {record_type} record: {e}");
                return;
            }
        };
        if let Err(e) = self.records.append_record(subject_id, record_type, payload) {
            tracing::error!("failed to store {record_type} record for {subject_id}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{Channel, RecordingNotificationSink};
    use crate::records::MemoryRecordStore;
    use crate::SeverityLevel;

    struct FailingStore;

    impl RecordStore for FailingStore {
        fn append_record(
            &self,
            _subject_id: &str,
            _record_type: &str,
            _payload: serde_json::Value,
        ) -> TriageResult<StoredRecord> {
            Err(TriageError::StorePoisoned)
        }

        fn list_records(
            &self,
            _subject_id: &str,
            _record_type: Option<&str>,
            _limit: Option<usize>,
        ) -> TriageResult<Vec<StoredRecord>> {
            Err(TriageError::StorePoisoned)
        }
    }

    fn service_with(
        records: Arc<dyn RecordStore>,
    ) -> (TriageService, Arc<RecordingNotificationSink>) {
        let sink = Arc::new(RecordingNotificationSink::new());
        let service = TriageService::new(SeverityAssessor::default(), records, sink.clone());
        (service, sink)
    }

    #[test]
    fn non_emergency_is_stored_without_activation() {
        let store = Arc::new(MemoryRecordStore::new());
        let (service, _) = service_with(store.clone());
        let mut ctx = RequestContext::new("alice").expect("context");

        let assessment = service.assess(&mut ctx, &AssessmentInput::new("a sore knee"));
        assert_eq!(assessment.level(), SeverityLevel::Monitor);
        assert!(!ctx.emergency_mode());

        let history = service.history(&ctx, None, None).expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].record_type, ASSESSMENT_RECORD_TYPE);
        assert_eq!(history[0].payload["total_score"], 0);
    }

    #[test]
    fn emergency_activates_mode_and_stores_activation() {
        let store = Arc::new(MemoryRecordStore::new());
        let (service, _) = service_with(store.clone());
        let mut ctx = RequestContext::new("alice").expect("context");

        let assessment = service.assess(&mut ctx, &AssessmentInput::new("she fainted"));
        assert!(assessment.is_emergency);
        assert!(ctx.emergency_mode());

        let activations = service
            .history(&ctx, Some(EMERGENCY_ACTIVATION_RECORD_TYPE), None)
            .expect("history");
        assert_eq!(activations.len(), 1);
        assert_eq!(activations[0].payload["auto_activated"], true);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn storage_failure_does_not_fail_assessment() {
        let (service, _) = service_with(Arc::new(FailingStore));
        let mut ctx = RequestContext::new("alice").expect("context");

        let assessment = service.assess(&mut ctx, &AssessmentInput::new("overdose"));
        assert_eq!(assessment.total_score, 19);
        assert!(ctx.emergency_mode());
        assert!(service.history(&ctx, None, None).is_err());
    }

    #[test]
    fn alert_contacts_sends_level_message() {
        let (service, sink) = service_with(Arc::new(MemoryRecordStore::new()));
        let ctx = RequestContext::new("alice").expect("context");
        let assessment = service.assessor().assess_text("arm weakness", None);

        let contacts = vec![EmergencyContact {
            name: "Sam".into(),
            phone: Some("+15550100".into()),
            email: None,
            relation: Some("sibling".into()),
        }];
        let results = service.alert_contacts(&ctx, &contacts, &assessment);

        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        let sent = sink.sent();
        assert_eq!(sent[0].channel, Channel::Sms);
        assert_eq!(
            sent[0].message,
            "EMERGENCY ALERT: Emergency assessment: CRITICAL - Sam"
        );
    }

    #[test]
    fn emergency_mode_survives_until_deactivated() {
        let (service, _) = service_with(Arc::new(MemoryRecordStore::new()));
        let mut ctx = service.resume_context(Some("alice")).expect("context");
        assert!(!ctx.emergency_mode());
        service.assess(&mut ctx, &AssessmentInput::new("he passed out"));

        let mut resumed = service.resume_context(Some("alice")).expect("context");
        assert!(resumed.emergency_mode());
        assert!(service.deactivate_emergency(&mut resumed).expect("deactivate"));
        assert!(!resumed.emergency_mode());
        assert!(!service.deactivate_emergency(&mut resumed).expect("deactivate"));

        let after = service.resume_context(Some("alice")).expect("context");
        assert!(!after.emergency_mode());

        // A new emergency switches it back on.
        let mut ctx = after;
        service.assess(&mut ctx, &AssessmentInput::new("overdose"));
        assert!(service.resume_context(Some("alice")).expect("context").emergency_mode());
    }

    #[test]
    fn resume_context_without_subject_is_anonymous() {
        let (service, _) = service_with(Arc::new(FailingStore));
        let ctx = service.resume_context(None).expect("context");
        assert_eq!(ctx.subject_id(), crate::ANONYMOUS_SUBJECT);
        assert!(service.resume_context(Some("bob")).is_err());
        assert!(service.resume_context(Some("a/b")).is_err());
    }

    #[test]
    fn failed_deactivation_is_reported() {
        let (service, _) = service_with(Arc::new(FailingStore));
        let mut ctx = RequestContext::resume("alice", true).expect("context");
        assert!(service.deactivate_emergency(&mut ctx).is_err());
    }

    #[test]
    fn calling_emergency_services_stores_call_and_alerts_contacts() {
        let store = Arc::new(MemoryRecordStore::new());
        let (service, sink) = service_with(store.clone());
        let ctx = RequestContext::new("alice").expect("context");
        let location = AlertLocation {
            address: Some("1 High St".into()),
            lat: None,
            lng: None,
        };
        let contacts = vec![EmergencyContact {
            name: "Sam".into(),
            phone: Some("+15550100".into()),
            email: Some("sam@example.com".into()),
            relation: None,
        }];

        let (call, results) = service.call_emergency_services(&ctx, &contacts, Some(location));
        assert_eq!(call.status, "dispatched");
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));

        let stored = service
            .history(&ctx, Some(AMBULANCE_CALL_RECORD_TYPE), None)
            .expect("history");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].payload["location"]["address"], "1 High St");

        let sent = sink.sent();
        assert!(sent[0].message.contains("User: alice\n"));
        assert!(sent[0].message.contains("Location: 1 High St\n"));
        assert!(sent[0].message.contains("Severity: HIGH\n"));
        assert!(!sent[0].message.ends_with("- Sam"));
        assert_eq!(
            sent[1].subject.as_deref(),
            Some("🚨 EMERGENCY ALERT - ambulance_call")
        );
    }

    #[test]
    fn first_aid_follows_primary_condition() {
        let (service, _) = service_with(Arc::new(MemoryRecordStore::new()));
        let assessment = service.assessor().assess_text("face drooping", None);
        let steps = service.first_aid(&assessment);
        assert_eq!(steps.len(), 5);
        assert_eq!(steps[0], "Call 911 immediately - Note the time");

        let none = service.assessor().assess_text("fine", None);
        assert!(service.first_aid(&none).is_empty());
    }
}
