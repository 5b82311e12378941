//! Constants used throughout the triage core crate.
//!
//! Scoring thresholds live here so the assessor, the recommendation mapping and the tests agree
//! on a single set of numbers.

/// Minimum total score at which an assessment is flagged as an emergency.
pub const EMERGENCY_THRESHOLD: u32 = 8;

/// Minimum total score for the CRITICAL tier.
pub const CRITICAL_THRESHOLD: u32 = 10;

/// Minimum total score for the URGENT tier.
pub const URGENT_THRESHOLD: u32 = 8;

/// Minimum total score for the CONCERNING tier.
pub const CONCERNING_THRESHOLD: u32 = 5;

/// Score floor applied when an external classifier says the case requires emergency care.
pub const CLASSIFIER_EMERGENCY_FLOOR: u32 = 50;

/// Flat weight added for every direct emergency phrase found in the text.
pub const DIRECT_PHRASE_WEIGHT: u32 = 10;

/// Condition tag emitted for direct emergency phrase matches.
pub const DIRECT_EMERGENCY_TAG: &str = "direct_emergency_request";

/// Default directory for stored assessment records.
pub const DEFAULT_DATA_DIR: &str = "triage_data";

/// Default upper bound for an external classifier call, in milliseconds.
pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 2_000;

/// Record type used when persisting an assessment.
pub const ASSESSMENT_RECORD_TYPE: &str = "symptom_assessment";

/// Record type used when persisting an emergency-mode activation.
pub const EMERGENCY_ACTIVATION_RECORD_TYPE: &str = "emergency_activation";

/// Record type used when emergency mode is switched off.
pub const EMERGENCY_DEACTIVATION_RECORD_TYPE: &str = "emergency_deactivation";

/// Record type, and alert emergency type, used when emergency services are called.
pub const AMBULANCE_CALL_RECORD_TYPE: &str = "ambulance_call";

/// Severity printed on the alert sent when emergency services are called.
pub const EMERGENCY_CALL_SEVERITY: &str = "high";

/// Subject id used when a request carries no identity.
pub const ANONYMOUS_SUBJECT: &str = "emergency_user";
