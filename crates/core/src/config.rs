//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Binaries read environment variables and hand the raw values to
//! the `*_from_env_value` helpers here; nothing in the core reads the environment during request
//! handling.

use crate::assessor::SeverityAssessor;
use crate::classifier::{KeywordClassifier, TimeoutClassifier};
use crate::constants::{DEFAULT_CLASSIFIER_TIMEOUT_MS, DEFAULT_DATA_DIR};
use crate::rules::RuleTable;
use crate::{TriageError, TriageResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Which external classifier, if any, the assessor consults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClassifierKind {
    #[default]
    Disabled,
    Keyword,
}

impl FromStr for ClassifierKind {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "off" | "disabled" => Ok(Self::Disabled),
            "keyword" => Ok(Self::Keyword),
            other => Err(TriageError::InvalidInput(format!(
                "unknown classifier: {other} (expected 'keyword' or 'none')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    rules_file: Option<PathBuf>,
    classifier: ClassifierKind,
    classifier_timeout: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] if the classifier timeout is zero or the rules file
    /// override does not point at a file.
    pub fn new(
        data_dir: PathBuf,
        rules_file: Option<PathBuf>,
        classifier: ClassifierKind,
        classifier_timeout: Duration,
    ) -> TriageResult<Self> {
        if classifier_timeout.is_zero() {
            return Err(TriageError::InvalidInput(
                "classifier timeout must be greater than zero".into(),
            ));
        }
        if let Some(path) = &rules_file {
            if !path.is_file() {
                return Err(TriageError::InvalidInput(format!(
                    "rules file override is not a file: {}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            data_dir,
            rules_file,
            classifier,
            classifier_timeout,
        })
    }

    /// Build a `CoreConfig` from raw environment values.
    ///
    /// Arguments are the values of `TRIAGE_DATA_DIR`, `TRIAGE_RULES_FILE`, `TRIAGE_CLASSIFIER`
    /// and `TRIAGE_CLASSIFIER_TIMEOUT_MS`, in that order. Unset or blank values fall back to the
    /// defaults.
    pub fn from_env_values(
        data_dir: Option<String>,
        rules_file: Option<String>,
        classifier: Option<String>,
        classifier_timeout_ms: Option<String>,
    ) -> TriageResult<Self> {
        let data_dir = non_blank(data_dir).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        Self::new(
            PathBuf::from(data_dir),
            rules_file_from_env_value(rules_file),
            classifier_kind_from_env_value(classifier)?,
            classifier_timeout_from_env_value(classifier_timeout_ms)?,
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn rules_file(&self) -> Option<&Path> {
        self.rules_file.as_deref()
    }

    pub fn classifier(&self) -> ClassifierKind {
        self.classifier
    }

    pub fn classifier_timeout(&self) -> Duration {
        self.classifier_timeout
    }

    /// Load the configured rule table, or the built-in one when no override is set.
    pub fn load_rules(&self) -> TriageResult<RuleTable> {
        match &self.rules_file {
            Some(path) => RuleTable::load(path),
            None => Ok(RuleTable::default()),
        }
    }

    /// Build an assessor from this configuration.
    pub fn build_assessor(&self) -> TriageResult<SeverityAssessor> {
        let assessor = SeverityAssessor::new(Arc::new(self.load_rules()?));
        Ok(match self.classifier {
            ClassifierKind::Disabled => assessor,
            ClassifierKind::Keyword => assessor.with_classifier(Arc::new(TimeoutClassifier::new(
                Arc::new(KeywordClassifier::new()),
                self.classifier_timeout,
            ))),
        })
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            rules_file: None,
            classifier: ClassifierKind::Disabled,
            classifier_timeout: Duration::from_millis(DEFAULT_CLASSIFIER_TIMEOUT_MS),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the classifier choice from an optional string value.
///
/// If `value` is `None` or empty/whitespace, the classifier is disabled.
pub fn classifier_kind_from_env_value(value: Option<String>) -> TriageResult<ClassifierKind> {
    Ok(non_blank(value)
        .map(|v| v.parse::<ClassifierKind>())
        .transpose()?
        .unwrap_or_default())
}

/// Parse a classifier timeout in milliseconds from an optional string value.
///
/// If `value` is `None` or empty/whitespace, the default timeout is used.
pub fn classifier_timeout_from_env_value(value: Option<String>) -> TriageResult<Duration> {
    let millis = match non_blank(value) {
        Some(v) => v.parse::<u64>().map_err(|e| {
            TriageError::InvalidInput(format!("invalid classifier timeout '{v}': {e}"))
        })?,
        None => DEFAULT_CLASSIFIER_TIMEOUT_MS,
    };
    Ok(Duration::from_millis(millis))
}

/// Resolve an optional rules file override; blank values mean "use the built-in table".
pub fn rules_file_from_env_value(value: Option<String>) -> Option<PathBuf> {
    non_blank(value).map(PathBuf::from)
}
