//! Document block model.
//!
//! # Responsibility
//! - Mirror the subset of the remote block shape the core reads.
//! - Provide derived views (`plain_text`, `TodoItem`) used by section lookup
//!   and todo listing.
//!
//! # Invariants
//! - `text` keeps the remote text-run order.
//! - `checked` is only meaningful for `BlockKind::ToDo`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Stable identifier of one block in the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Block type as far as the core cares.
///
/// Every remote type outside headings and checklist items collapses into
/// `Other`; such blocks are still traversed when they have children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    #[serde(rename = "heading_1")]
    Heading1,
    #[serde(rename = "heading_2")]
    Heading2,
    #[serde(rename = "heading_3")]
    Heading3,
    #[serde(rename = "to_do")]
    ToDo,
    #[serde(rename = "other")]
    Other,
}

impl BlockKind {
    /// Wire name used by the remote API and the local store.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heading1 => "heading_1",
            Self::Heading2 => "heading_2",
            Self::Heading3 => "heading_3",
            Self::ToDo => "to_do",
            Self::Other => "other",
        }
    }

    /// Maps a wire type name onto a kind. Unknown names become `Other`.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "heading_1" => Self::Heading1,
            "heading_2" => Self::Heading2,
            "heading_3" => Self::Heading3,
            "to_do" => Self::ToDo,
            _ => Self::Other,
        }
    }

    pub fn is_heading(self) -> bool {
        matches!(self, Self::Heading1 | Self::Heading2 | Self::Heading3)
    }
}

/// One node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Ordered plain-text runs.
    pub text: Vec<String>,
    /// Collapsible heading marker.
    pub is_toggleable: bool,
    pub has_children: bool,
    pub checked: bool,
}

impl Block {
    /// Creates a leaf block with a single text run.
    pub fn new(id: impl Into<BlockId>, kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            text: vec![text.into()],
            is_toggleable: false,
            has_children: false,
            checked: false,
        }
    }

    /// Creates a collapsible heading-1 block.
    pub fn toggle_heading(id: impl Into<BlockId>, text: impl Into<String>) -> Self {
        Self::new(id, BlockKind::Heading1, text).toggleable()
    }

    /// Creates an unchecked checklist item.
    pub fn todo(id: impl Into<BlockId>, text: impl Into<String>) -> Self {
        Self::new(id, BlockKind::ToDo, text)
    }

    pub fn toggleable(mut self) -> Self {
        self.is_toggleable = true;
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    /// Concatenation of all text runs.
    pub fn plain_text(&self) -> String {
        self.text.concat()
    }

    pub fn first_text(&self) -> Option<&str> {
        self.text.first().map(String::as_str)
    }

    /// Checklist view of this block.
    ///
    /// Returns `None` for non-`to_do` blocks and for `to_do` blocks without
    /// any text run.
    pub fn to_todo(&self) -> Option<TodoItem> {
        if self.kind != BlockKind::ToDo {
            return None;
        }
        self.first_text().map(|text| TodoItem {
            text: text.to_string(),
            checked: self.checked,
        })
    }
}

/// Checklist item derived from a `to_do` block's first text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub text: String,
    pub checked: bool,
}

/// Block payload for append operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDraft {
    pub kind: BlockKind,
    pub text: String,
    pub is_toggleable: bool,
    pub checked: bool,
}

impl BlockDraft {
    /// Unchecked checklist item, the only shape the creation path appends.
    pub fn todo(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::ToDo,
            text: text.into(),
            is_toggleable: false,
            checked: false,
        }
    }

    /// Collapsible heading used to seed section markers.
    pub fn section_heading(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Heading1,
            text: text.into(),
            is_toggleable: true,
            checked: false,
        }
    }
}
