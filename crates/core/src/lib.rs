//! # Triage Core
//!
//! Core business logic for symptom severity triage.
//!
//! This crate contains the scorer and the small collaborators around it:
//! - Keyword severity scoring against a data-driven rule table ([`SeverityAssessor`])
//! - Optional external classifier strategy with a timeout guard
//! - First-aid instruction lookup and emergency facility data
//! - Emergency contact alerting behind a [`NotificationSink`]
//! - Append-only record storage behind a [`RecordStore`]
//! - Request-scoped emergency mode ([`RequestContext`])
//!
//! **No API concerns**: HTTP servers and request/response types belong in `api-rest` and
//! `api-shared`.

pub mod assessor;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod facilities;
pub mod first_aid;
pub mod notification;
pub mod recommendation;
pub mod records;
pub mod rules;
pub mod service;

pub use assessor::{Assessment, AssessmentInput, DetectedMatch, SeverityAssessor, UrgencyHint};
pub use classifier::{
    ClassifierError, ClassifierOpinion, KeywordClassifier, SymptomClassifier, TimeoutClassifier,
};
pub use config::{ClassifierKind, CoreConfig};
pub use constants::*;
pub use context::{EmergencyActivation, EmergencyDeactivation, RequestContext};
pub use error::{TriageError, TriageResult};
pub use facilities::Facility;
pub use notification::{
    AlertLocation, DispatchResult, EmergencyAlert, EmergencyContact, LogNotificationSink,
    NotificationSink,
};
pub use recommendation::{Recommendation, SeverityLevel, Tone};
pub use records::{FileRecordStore, MemoryRecordStore, RecordStore, StoredRecord};
pub use rules::{ConditionRule, RuleTable};
pub use service::{EmergencyCall, TriageService};
