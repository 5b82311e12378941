//! Optional external symptom classifier.
//!
//! The assessor accepts an injected [`SymptomClassifier`] and consults it at most once per
//! assessment. Any error, including a timeout, is treated as "no opinion": the rule-based score
//! stands on its own.
//!
//! Two implementations ship with the crate:
//! - [`KeywordClassifier`], an offline phrase heuristic usable when no model endpoint exists.
//! - [`TimeoutClassifier`], which wraps another classifier and bounds how long a call may take.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// A classifier's verdict on a piece of symptom text.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ClassifierOpinion {
    pub requires_emergency: bool,
    pub confidence: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error("classifier timed out after {0:?}")]
    Timeout(Duration),
    #[error("classifier failed: {0}")]
    Failed(String),
}

pub type ClassifierResult<T> = std::result::Result<T, ClassifierError>;

/// Strategy interface for an external severity classifier.
pub trait SymptomClassifier: Send + Sync {
    /// Classify normalised (lowercase) symptom text.
    fn classify(&self, text: &str) -> ClassifierResult<ClassifierOpinion>;
}

const CRITICAL_PHRASES: &[&str] = &[
    "chest pain",
    "heart attack",
    "can't breathe",
    "difficulty breathing",
    "severe bleeding",
    "unconscious",
    "stroke",
    "seizure",
    "overdose",
];

const MODERATE_PHRASES: &[&str] = &[
    "severe pain",
    "high fever",
    "persistent vomiting",
    "severe headache",
    "vision problems",
    "severe allergic",
];

/// Phrase heuristic used when no model endpoint is configured.
///
/// Critical phrases yield `requires_emergency` with confidence 0.95, moderate phrases yield a
/// non-emergency opinion with confidence 0.7, and anything else 0.6.
#[derive(Clone, Debug, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl SymptomClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> ClassifierResult<ClassifierOpinion> {
        let text = text.to_lowercase();

        if CRITICAL_PHRASES.iter().any(|p| text.contains(p)) {
            return Ok(ClassifierOpinion {
                requires_emergency: true,
                confidence: 0.95,
            });
        }

        let confidence = if MODERATE_PHRASES.iter().any(|p| text.contains(p)) {
            0.7
        } else {
            0.6
        };

        Ok(ClassifierOpinion {
            requires_emergency: false,
            confidence,
        })
    }
}

/// Default cap on helper threads a [`TimeoutClassifier`] keeps alive at once.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Bounds another classifier's call time.
///
/// The wrapped call runs on a helper thread. If it does not answer within the timeout the
/// helper is abandoned and [`ClassifierError::Timeout`] is returned; a panicking classifier is
/// reported as [`ClassifierError::Unavailable`].
///
/// An abandoned helper keeps running until the inner call returns. At most `max_in_flight`
/// helpers exist at a time; once the cap is reached, calls fail fast with
/// [`ClassifierError::Unavailable`] instead of spawning another thread.
pub struct TimeoutClassifier {
    inner: Arc<dyn SymptomClassifier>,
    timeout: Duration,
    max_in_flight: usize,
    in_flight: Arc<AtomicUsize>,
}

impl TimeoutClassifier {
    pub fn new(inner: Arc<dyn SymptomClassifier>, timeout: Duration) -> Self {
        Self::with_max_in_flight(inner, timeout, DEFAULT_MAX_IN_FLIGHT)
    }

    pub fn with_max_in_flight(
        inner: Arc<dyn SymptomClassifier>,
        timeout: Duration,
        max_in_flight: usize,
    ) -> Self {
        Self {
            inner,
            timeout,
            max_in_flight: max_in_flight.max(1),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Helper threads currently running, including abandoned ones.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn reserve_slot(&self) -> Option<InFlightSlot> {
        self.in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_in_flight).then_some(n + 1)
            })
            .ok()
            .map(|_| InFlightSlot(Arc::clone(&self.in_flight)))
    }
}

/// Releases its helper slot when the helper thread finishes (or unwinds).
struct InFlightSlot(Arc<AtomicUsize>);

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for TimeoutClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutClassifier")
            .field("timeout", &self.timeout)
            .field("max_in_flight", &self.max_in_flight)
            .finish_non_exhaustive()
    }
}

impl SymptomClassifier for TimeoutClassifier {
    fn classify(&self, text: &str) -> ClassifierResult<ClassifierOpinion> {
        let slot = self.reserve_slot().ok_or_else(|| {
            ClassifierError::Unavailable(format!(
                "{} classifier calls still running",
                self.max_in_flight
            ))
        })?;
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let text = text.to_owned();

        std::thread::Builder::new()
            .name("triage-classifier".into())
            .spawn(move || {
                let _slot = slot;
                // The receiver may already have given up; nothing to do then.
                let _ = tx.send(inner.classify(&text));
            })
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ClassifierError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ClassifierError::Unavailable(
                "classifier exited without an answer".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowClassifier(Duration);

    impl SymptomClassifier for SlowClassifier {
        fn classify(&self, _text: &str) -> ClassifierResult<ClassifierOpinion> {
            std::thread::sleep(self.0);
            Ok(ClassifierOpinion {
                requires_emergency: true,
                confidence: 1.0,
            })
        }
    }

    struct PanickingClassifier;

    impl SymptomClassifier for PanickingClassifier {
        fn classify(&self, _text: &str) -> ClassifierResult<ClassifierOpinion> {
            panic!("model crashed");
        }
    }

    #[test]
    fn keyword_classifier_flags_critical_phrases() {
        let opinion = KeywordClassifier::new()
            .classify("he had a seizure at lunch")
            .expect("classify");
        assert!(opinion.requires_emergency);
        assert_eq!(opinion.confidence, 0.95);
    }

    #[test]
    fn keyword_classifier_moderate_and_mild() {
        let moderate = KeywordClassifier::new()
            .classify("high fever since yesterday")
            .expect("classify");
        assert!(!moderate.requires_emergency);
        assert_eq!(moderate.confidence, 0.7);

        let mild = KeywordClassifier::new()
            .classify("slight sniffles")
            .expect("classify");
        assert!(!mild.requires_emergency);
        assert_eq!(mild.confidence, 0.6);
    }

    #[test]
    fn keyword_classifier_ignores_case() {
        let opinion = KeywordClassifier::new()
            .classify("CHEST PAIN")
            .expect("classify");
        assert!(opinion.requires_emergency);
    }

    #[test]
    fn timeout_classifier_passes_through_fast_answers() {
        let classifier =
            TimeoutClassifier::new(Arc::new(KeywordClassifier::new()), Duration::from_secs(5));
        let opinion = classifier.classify("stroke").expect("classify");
        assert!(opinion.requires_emergency);
    }

    #[test]
    fn timeout_classifier_gives_up_on_slow_answers() {
        let classifier = TimeoutClassifier::new(
            Arc::new(SlowClassifier(Duration::from_millis(500))),
            Duration::from_millis(20),
        );
        let err = classifier.classify("anything").expect_err("should time out");
        assert!(matches!(err, ClassifierError::Timeout(_)));
    }

    #[test]
    fn timeout_classifier_caps_abandoned_helpers() {
        let classifier = TimeoutClassifier::with_max_in_flight(
            Arc::new(SlowClassifier(Duration::from_millis(300))),
            Duration::from_millis(10),
            1,
        );

        let first = classifier.classify("anything").expect_err("should time out");
        assert!(matches!(first, ClassifierError::Timeout(_)));
        assert_eq!(classifier.in_flight(), 1);

        let second = classifier.classify("anything").expect_err("should be refused");
        assert!(matches!(second, ClassifierError::Unavailable(_)));

        // The abandoned helper frees its slot once the slow call returns.
        std::thread::sleep(Duration::from_millis(600));
        assert_eq!(classifier.in_flight(), 0);
        let third = classifier.classify("anything").expect_err("should time out again");
        assert!(matches!(third, ClassifierError::Timeout(_)));
    }

    #[test]
    fn timeout_classifier_reports_panics_as_unavailable() {
        let classifier =
            TimeoutClassifier::new(Arc::new(PanickingClassifier), Duration::from_secs(5));
        let err = classifier.classify("anything").expect_err("should fail");
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }
}
