//! Pre-order search for a section's toggle heading.
//!
//! # Invariants
//! - Children are examined in adapter order; the first match in pre-order
//!   wins and traversal stops immediately.
//! - A subtree is searched completely before the next sibling.
//! - No block is fetched twice within one search.
//! - The deadline is checked before every fetch.

use super::{SectionError, SectionResult};
use crate::deadline::Deadline;
use crate::document::{DocumentAdapter, DocumentError};
use crate::model::block::{Block, BlockId};
use crate::model::intent::SectionTarget;
use log::{debug, info};
use std::collections::HashSet;
use std::time::Instant;

/// Default nesting limit for section searches.
pub const DEFAULT_MAX_SECTION_DEPTH: usize = 32;

struct Frame {
    children: std::vec::IntoIter<Block>,
    depth: usize,
}

/// Locates section headings through a document adapter.
pub struct SectionLocator<'a, D: DocumentAdapter + ?Sized> {
    document: &'a D,
    max_depth: usize,
}

impl<'a, D: DocumentAdapter + ?Sized> SectionLocator<'a, D> {
    pub fn new(document: &'a D) -> Self {
        Self::with_max_depth(document, DEFAULT_MAX_SECTION_DEPTH)
    }

    /// `max_depth` counts levels below the root; values below 1 are raised
    /// to 1.
    pub fn with_max_depth(document: &'a D, max_depth: usize) -> Self {
        Self {
            document,
            max_depth: max_depth.max(1),
        }
    }

    /// Returns the id of the first toggle heading named `target` below `root`.
    ///
    /// # Errors
    /// - `NotFound` when the whole reachable tree was searched without a match.
    /// - `DepthExceeded` when a block nested deeper than `max_depth` has
    ///   children that would need to be searched.
    /// - `Document` when any fetch fails or the deadline expires.
    pub fn locate(
        &self,
        root: &BlockId,
        target: SectionTarget,
        deadline: &Deadline,
    ) -> SectionResult<BlockId> {
        let started_at = Instant::now();
        let mut visited: HashSet<BlockId> = HashSet::new();
        let mut fetches = 0usize;

        visited.insert(root.clone());
        let root_children = self.fetch(root, deadline, &mut fetches)?;
        let mut stack = vec![Frame {
            children: root_children.into_iter(),
            depth: 1,
        }];

        while let Some(frame) = stack.last_mut() {
            let depth = frame.depth;
            let Some(child) = frame.children.next() else {
                stack.pop();
                continue;
            };

            if is_section_heading(&child, target) {
                info!(
                    "event=section_locate module=section status=ok target={} block_id={} fetches={} duration_ms={}",
                    target,
                    child.id,
                    fetches,
                    started_at.elapsed().as_millis()
                );
                return Ok(child.id);
            }

            if !child.has_children || !visited.insert(child.id.clone()) {
                continue;
            }
            if depth >= self.max_depth {
                info!(
                    "event=section_locate module=section status=error target={} reason=depth_exceeded max_depth={} block_id={}",
                    target, self.max_depth, child.id
                );
                return Err(SectionError::DepthExceeded {
                    max_depth: self.max_depth,
                    block_id: child.id,
                });
            }

            let grandchildren = self.fetch(&child.id, deadline, &mut fetches)?;
            stack.push(Frame {
                children: grandchildren.into_iter(),
                depth: depth + 1,
            });
        }

        info!(
            "event=section_locate module=section status=not_found target={} fetches={} duration_ms={}",
            target,
            fetches,
            started_at.elapsed().as_millis()
        );
        Err(SectionError::NotFound(target))
    }

    fn fetch(
        &self,
        block_id: &BlockId,
        deadline: &Deadline,
        fetches: &mut usize,
    ) -> SectionResult<Vec<Block>> {
        if deadline.is_expired() {
            return Err(SectionError::Document(DocumentError::Timeout {
                block_id: block_id.clone(),
            }));
        }
        *fetches += 1;
        let children = self.document.fetch_children(block_id, deadline)?;
        debug!(
            "event=section_fetch module=section status=ok block_id={} children={}",
            block_id,
            children.len()
        );
        Ok(children)
    }
}

/// Toggleable heading whose trimmed text equals the section name, ignoring case.
pub fn is_section_heading(block: &Block, target: SectionTarget) -> bool {
    block.kind.is_heading()
        && block.is_toggleable
        && block.plain_text().trim().to_uppercase() == target.name()
}
