//! Confidence gating and label generalization.
//!
//! # Invariants
//! - Below-threshold results are rejected before the label is even parsed.
//! - Day-specialized create labels carry their own target; every other label
//!   falls back to keyword detection on the original utterance.

use super::{ClassifierError, ClassifierResult};
use crate::model::intent::{ClassificationResult, Intent, IntentLabel, SectionTarget};

/// Minimum probability required to act on a classified label.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.85;

/// Outcome of gating one classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// Confidence too low; the request routes to `Intent::None`.
    Rejected { confidence: f64 },
    /// Label accepted and generalized.
    Routed {
        label: IntentLabel,
        intent: Intent,
        target: Option<SectionTarget>,
        confidence: f64,
    },
}

/// Threshold policy wrapped around an opaque classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    threshold: f64,
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl ConfidenceGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Applies the threshold, then maps the label onto an intent and target.
    ///
    /// # Errors
    /// - `UnknownLabel` when an above-threshold label is outside the routed
    ///   vocabulary.
    pub fn decide(
        &self,
        utterance: &str,
        result: &ClassificationResult,
    ) -> ClassifierResult<GateDecision> {
        if result.confidence < self.threshold {
            return Ok(GateDecision::Rejected {
                confidence: result.confidence,
            });
        }

        let label = IntentLabel::parse(result.label.as_str())
            .ok_or_else(|| ClassifierError::UnknownLabel(result.label.clone()))?;
        let target = label
            .native_target()
            .or_else(|| SectionTarget::detect_in(utterance));

        Ok(GateDecision::Routed {
            label,
            intent: label.intent(),
            target,
            confidence: result.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfidenceGate, GateDecision};
    use crate::classifier::ClassifierError;
    use crate::model::intent::{ClassificationResult, Intent, IntentLabel, SectionTarget};

    fn classified(label: &str, confidence: f64) -> ClassificationResult {
        ClassificationResult {
            label: label.to_string(),
            confidence,
        }
    }

    #[test]
    fn rejects_below_threshold_even_for_unknown_labels() {
        let gate = ConfidenceGate::default();
        let decision = gate
            .decide("add todo today", &classified("create_todo", 0.4))
            .expect("gate decision");
        assert_eq!(decision, GateDecision::Rejected { confidence: 0.4 });

        let decision = gate
            .decide("hi", &classified("weather", 0.2))
            .expect("gate decision");
        assert!(matches!(decision, GateDecision::Rejected { .. }));
    }

    #[test]
    fn threshold_is_inclusive() {
        let gate = ConfidenceGate::new(0.85);
        let decision = gate
            .decide("hi", &classified("greeting", 0.85))
            .expect("gate decision");
        assert!(matches!(
            decision,
            GateDecision::Routed {
                intent: Intent::Greeting,
                ..
            }
        ));
    }

    #[test]
    fn native_target_wins_over_keywords() {
        let gate = ConfidenceGate::default();
        let decision = gate
            .decide(
                "remind me to do this today",
                &classified("create_todo_tomorrow", 0.97),
            )
            .expect("gate decision");
        assert_eq!(
            decision,
            GateDecision::Routed {
                label: IntentLabel::CreateTodoTomorrow,
                intent: Intent::CreateTodo,
                target: Some(SectionTarget::Tomorrow),
                confidence: 0.97,
            }
        );
    }

    #[test]
    fn keyword_fallback_for_generic_labels() {
        let gate = ConfidenceGate::default();
        let decision = gate
            .decide("Add a todo for TOMORROW", &classified("create_todo", 0.9))
            .expect("gate decision");
        assert!(matches!(
            decision,
            GateDecision::Routed {
                intent: Intent::CreateTodo,
                target: Some(SectionTarget::Tomorrow),
                ..
            }
        ));

        let decision = gate
            .decide("who are you", &classified("about", 0.99))
            .expect("gate decision");
        assert!(matches!(
            decision,
            GateDecision::Routed {
                intent: Intent::About,
                target: None,
                ..
            }
        ));
    }

    #[test]
    fn unknown_label_above_threshold_fails() {
        let err = ConfidenceGate::default()
            .decide("what's the weather", &classified("weather", 0.95))
            .expect_err("unknown label must fail");
        assert!(matches!(err, ClassifierError::UnknownLabel(label) if label == "weather"));
    }
}
