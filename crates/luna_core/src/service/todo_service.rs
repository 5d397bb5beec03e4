//! Section-scoped checklist use cases.
//!
//! # Responsibility
//! - Read the checklist items of a section.
//! - Append a normalized checklist item to a section.
//!
//! # Invariants
//! - `append_block` is only called after the section heading was resolved.
//! - Appends are never retried.

use crate::deadline::Deadline;
use crate::document::DocumentAdapter;
use crate::model::block::{BlockDraft, BlockId, TodoItem};
use crate::model::intent::SectionTarget;
use crate::section::{SectionLocator, SectionResult, DEFAULT_MAX_SECTION_DEPTH};
use crate::text::normalize_task_text;
use log::info;

/// Item appended by `TodoService::create_todo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTodo {
    pub section: SectionTarget,
    pub heading_id: BlockId,
    /// Normalized text that was appended.
    pub text: String,
}

/// Checklist operations on one task page.
pub struct TodoService<D: DocumentAdapter> {
    document: D,
    root_id: BlockId,
    max_section_depth: usize,
}

impl<D: DocumentAdapter> TodoService<D> {
    pub fn new(document: D, root_id: BlockId) -> Self {
        Self::with_max_depth(document, root_id, DEFAULT_MAX_SECTION_DEPTH)
    }

    pub fn with_max_depth(document: D, root_id: BlockId, max_section_depth: usize) -> Self {
        Self {
            document,
            root_id,
            max_section_depth,
        }
    }

    /// Resolves the heading block of `section`.
    pub fn locate_section(
        &self,
        section: SectionTarget,
        deadline: &Deadline,
    ) -> SectionResult<BlockId> {
        SectionLocator::with_max_depth(&self.document, self.max_section_depth).locate(
            &self.root_id,
            section,
            deadline,
        )
    }

    /// Checklist items directly under the section heading, in document order.
    ///
    /// `to_do` blocks without any text run are skipped.
    pub fn read_todos(
        &self,
        section: SectionTarget,
        deadline: &Deadline,
    ) -> SectionResult<Vec<TodoItem>> {
        let heading_id = self.locate_section(section, deadline)?;
        let children = self.document.fetch_children(&heading_id, deadline)?;
        let todos: Vec<TodoItem> = children.iter().filter_map(|block| block.to_todo()).collect();
        info!(
            "event=todos_read module=service status=ok section={} heading_id={} count={}",
            section,
            heading_id,
            todos.len()
        );
        Ok(todos)
    }

    /// Normalizes `content` and appends it as an unchecked item to `section`.
    ///
    /// # Errors
    /// - `NotFound` when the section heading does not exist; nothing is
    ///   appended in that case.
    /// - `Document` when the lookup or the append fails.
    pub fn create_todo(
        &self,
        content: &str,
        section: SectionTarget,
        deadline: &Deadline,
    ) -> SectionResult<CreatedTodo> {
        let text = normalize_task_text(content);
        let heading_id = self.locate_section(section, deadline)?;
        self.document
            .append_block(&heading_id, &BlockDraft::todo(text.as_str()), deadline)?;
        info!(
            "event=todo_create module=service status=ok section={} heading_id={} text_len={}",
            section,
            heading_id,
            text.chars().count()
        );
        Ok(CreatedTodo {
            section,
            heading_id,
            text,
        })
    }
}
