//! Core domain logic for the Luna task assistant.
//!
//! Turns a free-text utterance into a routed intent, resolves the task
//! document section it refers to and reads or appends checklist items there.

pub mod classifier;
pub mod config;
pub mod db;
pub mod deadline;
pub mod document;
pub mod logging;
pub mod model;
pub mod section;
pub mod service;
pub mod text;

pub use classifier::{
    ClassifierError, ConfidenceGate, GateDecision, HttpClassifier, IntentClassifier,
    LabelDistribution, PatternClassifier, DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use config::{AssistantConfig, ConfigError};
pub use deadline::Deadline;
pub use document::{
    DocumentAdapter, DocumentError, MemoryDocument, NotionDocument, RetryPolicy, SqliteDocument,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::block::{Block, BlockDraft, BlockId, BlockKind, TodoItem};
pub use model::intent::{
    ClassificationResult, DispatchResult, Intent, IntentLabel, SectionTarget,
};
pub use section::{SectionError, SectionLocator, DEFAULT_MAX_SECTION_DEPTH};
pub use service::{
    CreatedTodo, DispatchContext, DispatchError, DispatchOutcome, DispatchSettings, Dispatcher,
    TodoService,
};
pub use text::normalize_task_text;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
