//! Error type for the triage core.
//!
//! Scoring itself never fails; these errors come from rule table loading, record storage and
//! input validation. Classifier and notification failures have their own types and are handled
//! where they occur.

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    /// A caller-supplied value (subject id, config value, urgency) was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A rule table failed schema or content validation.
    #[error("invalid rule table: {0}")]
    InvalidRuleTable(String),
    #[error("failed to serialize rule table YAML: {0}")]
    RuleTableRender(serde_yaml::Error),
    #[error("failed to read rule table file: {0}")]
    RuleTableRead(std::io::Error),
    #[error("failed to create record directory: {0}")]
    RecordDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    RecordWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    RecordRead(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    /// The in-memory store's lock was poisoned by a panicking writer.
    #[error("record store lock poisoned")]
    StorePoisoned,
}

pub type TriageResult<T> = std::result::Result<T, TriageError>;
