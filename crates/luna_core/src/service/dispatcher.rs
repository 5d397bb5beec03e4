//! Intent dispatch.
//!
//! # Responsibility
//! - Run classification, confidence gating, normalization and section
//!   lookups for one utterance and produce a `DispatchResult`.
//! - Expose the explicit creation and reading paths over the same lookup.
//!
//! # Invariants
//! - Every dispatch runs under its own `Deadline`.
//! - The classification path never appends to the document.
//! - Utterance and task text never reach the logs, only their lengths.

use crate::classifier::{ClassifierError, ConfidenceGate, GateDecision, IntentClassifier};
use crate::deadline::Deadline;
use crate::document::{DocumentAdapter, DocumentError};
use crate::model::block::{BlockId, TodoItem};
use crate::model::intent::{DispatchResult, Intent, SectionTarget};
use crate::section::{SectionError, DEFAULT_MAX_SECTION_DEPTH};
use crate::service::todo_service::{CreatedTodo, TodoService};
use crate::text::normalize_task_text;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const ABOUT_RESPONSE: &str =
    "I am Luna, an AI agent for Kareem. I help manage his Notion tasks.";
pub const GREETING_RESPONSE: &str = "Hi! How are you doing today?";

pub type DispatchOutcome<T> = Result<T, DispatchError>;

/// Errors surfaced by dispatch operations.
#[derive(Debug)]
pub enum DispatchError {
    /// Classifier could not produce a usable label.
    Classification(ClassifierError),
    /// Section heading does not exist in the document.
    SectionNotFound(SectionTarget),
    /// Document nesting exceeded the configured limit.
    DepthExceeded { max_depth: usize, block_id: BlockId },
    /// Document adapter failure.
    Collaborator(DocumentError),
    /// Request budget elapsed.
    Timeout { elapsed_ms: u128 },
}

impl DispatchError {
    /// HTTP-equivalent status class of this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SectionNotFound(_) => 404,
            Self::Timeout { .. } => 504,
            Self::Classification(_) | Self::DepthExceeded { .. } | Self::Collaborator(_) => 500,
        }
    }

    /// Stable short name used in logs and CLI output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Classification(_) => "classification_failure",
            Self::SectionNotFound(_) => "section_not_found",
            Self::DepthExceeded { .. } => "depth_exceeded",
            Self::Collaborator(_) => "collaborator_error",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Maps a section lookup failure, turning adapter timeouts into `Timeout`.
    pub fn from_section(err: SectionError, deadline: &Deadline) -> Self {
        match err {
            SectionError::NotFound(target) => Self::SectionNotFound(target),
            SectionError::DepthExceeded {
                max_depth,
                block_id,
            } => Self::DepthExceeded {
                max_depth,
                block_id,
            },
            SectionError::Document(err) => Self::from_document(err, deadline),
        }
    }

    fn from_document(err: DocumentError, deadline: &Deadline) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                elapsed_ms: deadline.elapsed().as_millis(),
            }
        } else {
            Self::Collaborator(err)
        }
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classification(err) => write!(f, "{err}"),
            Self::SectionNotFound(target) => write!(f, "Section not found: {target}"),
            Self::DepthExceeded {
                max_depth,
                block_id,
            } => write!(
                f,
                "document nested deeper than {max_depth} levels below block {block_id}"
            ),
            Self::Collaborator(err) => write!(f, "{err}"),
            Self::Timeout { elapsed_ms } => write!(f, "request timed out after {elapsed_ms} ms"),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Classification(err) => Some(err),
            Self::Collaborator(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ClassifierError> for DispatchError {
    fn from(value: ClassifierError) -> Self {
        Self::Classification(value)
    }
}

/// Tunables shared by every dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchSettings {
    pub confidence_threshold: f64,
    pub max_section_depth: usize,
    /// `None` disables the request budget.
    pub request_timeout: Option<Duration>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: crate::classifier::DEFAULT_CONFIDENCE_THRESHOLD,
            max_section_depth: DEFAULT_MAX_SECTION_DEPTH,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Everything a dispatcher needs, constructed by the caller.
pub struct DispatchContext<C, D> {
    pub classifier: C,
    pub document: D,
    pub root_id: BlockId,
    pub settings: DispatchSettings,
}

/// Routes utterances to intents and section operations.
pub struct Dispatcher<C: IntentClassifier, D: DocumentAdapter> {
    classifier: C,
    gate: ConfidenceGate,
    todos: TodoService<D>,
    request_timeout: Option<Duration>,
}

impl<C: IntentClassifier, D: DocumentAdapter> Dispatcher<C, D> {
    pub fn new(context: DispatchContext<C, D>) -> Self {
        let DispatchContext {
            classifier,
            document,
            root_id,
            settings,
        } = context;
        Self {
            classifier,
            gate: ConfidenceGate::new(settings.confidence_threshold),
            todos: TodoService::with_max_depth(document, root_id, settings.max_section_depth),
            request_timeout: settings.request_timeout,
        }
    }

    fn deadline(&self) -> Deadline {
        self.request_timeout
            .map(Deadline::after)
            .unwrap_or_else(Deadline::unbounded)
    }

    /// Classifies `text` and produces the structured result for it.
    ///
    /// # Contract
    /// - Below-threshold confidence yields `Intent::None` with empty
    ///   `task_text`, without any document call.
    /// - `about`/`greeting` never touch the document.
    /// - `create_todo` with a target verifies the section exists but does not
    ///   append; without a target the response stays empty.
    ///
    /// # Errors
    /// - `Classification` for classifier failures and unknown labels.
    /// - `SectionNotFound`, `DepthExceeded`, `Collaborator`, `Timeout` from
    ///   section lookups.
    pub fn classify_and_dispatch(&self, text: &str) -> DispatchOutcome<DispatchResult> {
        let deadline = self.deadline();
        info!(
            "event=dispatch module=service status=start text_len={}",
            text.chars().count()
        );
        let result = self.dispatch_inner(text, &deadline);
        match &result {
            Ok(result) => info!(
                "event=dispatch module=service status=ok intent={} target={} confidence={:.3} duration_ms={}",
                result.intent,
                result.target.map(SectionTarget::name).unwrap_or("none"),
                result.confidence,
                deadline.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=dispatch module=service status=error error_code={} status_code={} duration_ms={} error={}",
                err.error_code(),
                err.status_code(),
                deadline.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn dispatch_inner(&self, text: &str, deadline: &Deadline) -> DispatchOutcome<DispatchResult> {
        let distribution = self.classifier.classify(text)?;
        let top = distribution.top()?;
        if deadline.is_expired() {
            return Err(DispatchError::Timeout {
                elapsed_ms: deadline.elapsed().as_millis(),
            });
        }

        let (intent, target, confidence) = match self.gate.decide(text, &top)? {
            GateDecision::Rejected { confidence } => {
                return Ok(DispatchResult::none(confidence));
            }
            GateDecision::Routed {
                intent,
                target,
                confidence,
                ..
            } => (intent, target, confidence),
        };

        let mut task_text = text.to_string();
        let response = match intent {
            Intent::None => return Ok(DispatchResult::none(confidence)),
            Intent::About => ABOUT_RESPONSE.to_string(),
            Intent::Greeting => GREETING_RESPONSE.to_string(),
            Intent::CreateTodo => {
                task_text = normalize_task_text(text);
                match target {
                    Some(section) => {
                        self.todos
                            .locate_section(section, deadline)
                            .map_err(|err| DispatchError::from_section(err, deadline))?;
                        create_response(section)
                    }
                    None => String::new(),
                }
            }
            Intent::ReadTodosToday => self.summarize_section(SectionTarget::Today, deadline)?,
            Intent::ReadTodosTomorrow => self.summarize_section(SectionTarget::Tomorrow, deadline)?,
        };

        Ok(DispatchResult {
            intent,
            target,
            confidence,
            task_text,
            response,
        })
    }

    fn summarize_section(&self, section: SectionTarget, deadline: &Deadline) -> DispatchOutcome<String> {
        let todos = self
            .todos
            .read_todos(section, deadline)
            .map_err(|err| DispatchError::from_section(err, deadline))?;
        Ok(read_response(section, &todos))
    }

    /// Appends `content` to `section` after normalizing it.
    ///
    /// Nothing is appended when the section cannot be resolved.
    pub fn create_todo(&self, content: &str, section: SectionTarget) -> DispatchOutcome<CreatedTodo> {
        let deadline = self.deadline();
        let result = self
            .todos
            .create_todo(content, section, &deadline)
            .map_err(|err| DispatchError::from_section(err, &deadline));
        if let Err(err) = &result {
            error!(
                "event=todo_create module=service status=error section={} error_code={} status_code={} error={}",
                section,
                err.error_code(),
                err.status_code(),
                err
            );
        }
        result
    }

    /// Checklist items of `section`.
    pub fn read_todos(&self, section: SectionTarget) -> DispatchOutcome<Vec<TodoItem>> {
        let deadline = self.deadline();
        self.todos
            .read_todos(section, &deadline)
            .map_err(|err| DispatchError::from_section(err, &deadline))
    }
}

/// Confirmation for a created item.
pub fn create_response(section: SectionTarget) -> String {
    format!("Got it. I've added that to your {} to-do list.", section.name())
}

/// Spoken summary of a section's checklist.
pub fn read_response(section: SectionTarget, todos: &[TodoItem]) -> String {
    if todos.is_empty() {
        return format!("You have no tasks for {}.", section.period());
    }
    let texts: Vec<&str> = todos.iter().map(|item| item.text.as_str()).collect();
    format!(
        "You have {} tasks for {}: {}",
        todos.len(),
        section.period(),
        texts.join(", ")
    )
}
