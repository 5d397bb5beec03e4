//! Intent classifier contract and policy.
//!
//! # Responsibility
//! - Define the opaque `IntentClassifier` capability.
//! - Validate label distributions and pick the arg-max label.
//! - Apply confidence gating and label generalization (`gate`).
//!
//! # Invariants
//! - Classifier instances are immutable after construction and shared by all
//!   in-flight requests (`Send + Sync`).
//! - A distribution that reaches the gate is non-empty, finite and within
//!   `[0, 1]` for every entry.

use crate::model::intent::ClassificationResult;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod gate;
pub mod pattern;
pub mod remote;

pub use gate::{ConfidenceGate, GateDecision, DEFAULT_CONFIDENCE_THRESHOLD};
pub use pattern::PatternClassifier;
pub use remote::HttpClassifier;

pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Classification failures. None of these are recoverable by the caller.
#[derive(Debug)]
pub enum ClassifierError {
    /// Backing model or service could not produce a distribution.
    Unavailable(String),
    /// Classifier artifacts could not be loaded.
    InvalidModel(String),
    /// Distribution had no entries.
    EmptyDistribution,
    /// A probability was non-finite or outside `[0, 1]`.
    InvalidProbability { label: String, value: f64 },
    /// Arg-max label is not part of the routed vocabulary.
    UnknownLabel(String),
}

impl Display for ClassifierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "classifier unavailable: {message}"),
            Self::InvalidModel(message) => write!(f, "invalid classifier model: {message}"),
            Self::EmptyDistribution => write!(f, "classifier returned an empty distribution"),
            Self::InvalidProbability { label, value } => {
                write!(f, "classifier returned invalid probability {value} for `{label}`")
            }
            Self::UnknownLabel(label) => write!(f, "classifier returned unknown label `{label}`"),
        }
    }
}

impl Error for ClassifierError {}

/// Probability per label, in classifier output order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelDistribution {
    entries: Vec<(String, f64)>,
}

impl LabelDistribution {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self { entries }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(label, probability)| (label.to_string(), probability))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries
            .iter()
            .map(|(label, probability)| (label.as_str(), *probability))
    }

    /// Validates every entry and returns the arg-max label.
    ///
    /// Ties go to the earliest entry.
    pub fn top(&self) -> ClassifierResult<ClassificationResult> {
        let mut best: Option<(&str, f64)> = None;
        for (label, probability) in self.iter() {
            if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
                return Err(ClassifierError::InvalidProbability {
                    label: label.to_string(),
                    value: probability,
                });
            }
            match best {
                Some((_, current)) if current >= probability => {}
                _ => best = Some((label, probability)),
            }
        }

        best.map(|(label, confidence)| ClassificationResult {
            label: label.to_string(),
            confidence,
        })
        .ok_or(ClassifierError::EmptyDistribution)
    }
}

/// Opaque text classifier.
///
/// Implementations may be statistical, rule based or remote; the dispatcher
/// only relies on this single operation.
pub trait IntentClassifier: Send + Sync {
    /// Returns a probability distribution over intent labels.
    fn classify(&self, text: &str) -> ClassifierResult<LabelDistribution>;
}

impl<T: IntentClassifier + ?Sized> IntentClassifier for Box<T> {
    fn classify(&self, text: &str) -> ClassifierResult<LabelDistribution> {
        (**self).classify(text)
    }
}

impl<T: IntentClassifier + ?Sized> IntentClassifier for std::sync::Arc<T> {
    fn classify(&self, text: &str) -> ClassifierResult<LabelDistribution> {
        (**self).classify(text)
    }
}
