//! Intent, section target and dispatch result model.
//!
//! # Responsibility
//! - Name every intent the dispatcher routes and every label the classifier
//!   may emit.
//! - Define the single externally observable output, `DispatchResult`.
//!
//! # Invariants
//! - `DispatchResult::confidence` is always within `[0, 1]`.
//! - A `none` result carries no target and an empty `task_text`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Named section of the task document, located by its toggle heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionTarget {
    Today,
    Tomorrow,
}

impl SectionTarget {
    /// Heading text that marks this section.
    pub fn name(self) -> &'static str {
        match self {
            Self::Today => "TODAY",
            Self::Tomorrow => "TOMORROW",
        }
    }

    /// Lower-case period word used in responses.
    pub fn period(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
        }
    }

    /// Parses a caller-supplied section name.
    ///
    /// `today` (any case, surrounding whitespace ignored) selects `Today`;
    /// every other value selects `Tomorrow`.
    pub fn from_section_name(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("today") {
            Self::Today
        } else {
            Self::Tomorrow
        }
    }

    /// Keyword fallback: `today` wins over `tomorrow` when both appear.
    pub fn detect_in(utterance: &str) -> Option<Self> {
        let lowered = utterance.to_lowercase();
        if lowered.contains("today") {
            Some(Self::Today)
        } else if lowered.contains("tomorrow") {
            Some(Self::Tomorrow)
        } else {
            None
        }
    }
}

impl Display for SectionTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Routed intent after confidence gating and label generalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    About,
    Greeting,
    CreateTodo,
    ReadTodosToday,
    ReadTodosTomorrow,
    None,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::About => "about",
            Self::Greeting => "greeting",
            Self::CreateTodo => "create_todo",
            Self::ReadTodosToday => "read_todos_today",
            Self::ReadTodosTomorrow => "read_todos_tomorrow",
            Self::None => "none",
        }
    }
}

impl Display for Intent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw label vocabulary of the classifier.
///
/// The two `CreateTodo*` day variants carry their own section; every other
/// label relies on keyword detection for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentLabel {
    About,
    Greeting,
    CreateTodo,
    CreateTodoToday,
    CreateTodoTomorrow,
    ReadTodosToday,
    ReadTodosTomorrow,
}

impl IntentLabel {
    pub const ALL: [IntentLabel; 7] = [
        Self::About,
        Self::Greeting,
        Self::CreateTodo,
        Self::CreateTodoToday,
        Self::CreateTodoTomorrow,
        Self::ReadTodosToday,
        Self::ReadTodosTomorrow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::About => "about",
            Self::Greeting => "greeting",
            Self::CreateTodo => "create_todo",
            Self::CreateTodoToday => "create_todo_today",
            Self::CreateTodoTomorrow => "create_todo_tomorrow",
            Self::ReadTodosToday => "read_todos_today",
            Self::ReadTodosTomorrow => "read_todos_tomorrow",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|label| label.as_str() == value)
    }

    /// Generalized intent for this label.
    pub fn intent(self) -> Intent {
        match self {
            Self::About => Intent::About,
            Self::Greeting => Intent::Greeting,
            Self::CreateTodo | Self::CreateTodoToday | Self::CreateTodoTomorrow => {
                Intent::CreateTodo
            }
            Self::ReadTodosToday => Intent::ReadTodosToday,
            Self::ReadTodosTomorrow => Intent::ReadTodosTomorrow,
        }
    }

    /// Section the model itself encodes in the label, if any.
    pub fn native_target(self) -> Option<SectionTarget> {
        match self {
            Self::CreateTodoToday => Some(SectionTarget::Today),
            Self::CreateTodoTomorrow => Some(SectionTarget::Tomorrow),
            _ => None,
        }
    }
}

/// Arg-max label and its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    pub confidence: f64,
}

/// Final structured output of one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub intent: Intent,
    pub target: Option<SectionTarget>,
    pub confidence: f64,
    pub task_text: String,
    pub response: String,
}

impl DispatchResult {
    /// Result for an utterance rejected by the confidence gate.
    pub fn none(confidence: f64) -> Self {
        Self {
            intent: Intent::None,
            target: None,
            confidence,
            task_text: String::new(),
            response: String::new(),
        }
    }

    /// `create_todo` without any resolvable section.
    ///
    /// The response stays empty in this case; callers that want to ask a
    /// follow-up question key off this flag.
    pub fn needs_clarification(&self) -> bool {
        self.intent == Intent::CreateTodo && self.target.is_none()
    }
}
