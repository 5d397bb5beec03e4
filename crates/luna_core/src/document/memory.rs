//! In-process document tree.
//!
//! Used as a test double and for demos. Supports failure injection per block
//! id and records every fetch so traversal order can be asserted.

use super::{DocumentAdapter, DocumentError, DocumentResult};
use crate::deadline::Deadline;
use crate::model::block::{Block, BlockDraft, BlockId};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryTree {
    blocks: HashMap<BlockId, Block>,
    children: HashMap<BlockId, Vec<BlockId>>,
    failing: HashSet<BlockId>,
    fetch_log: Vec<BlockId>,
}

/// Mutable in-memory block tree rooted at one page id.
#[derive(Debug)]
pub struct MemoryDocument {
    root: BlockId,
    tree: Mutex<MemoryTree>,
}

impl MemoryDocument {
    pub fn new(root: impl Into<BlockId>) -> Self {
        Self {
            root: root.into(),
            tree: Mutex::new(MemoryTree::default()),
        }
    }

    pub fn root(&self) -> &BlockId {
        &self.root
    }

    /// Inserts `block` as the last child of `parent` and returns its id.
    ///
    /// `has_children` is derived from the tree on fetch; the flag on the
    /// inserted block is kept only as a floor.
    pub fn insert(&self, parent: &BlockId, block: Block) -> BlockId {
        let mut tree = self.lock();
        let id = block.id.clone();
        tree.children
            .entry(parent.clone())
            .or_default()
            .push(id.clone());
        tree.blocks.insert(id.clone(), block);
        id
    }

    /// Links an already inserted block under a second parent.
    ///
    /// Only useful to build corrupted trees (shared subtrees, cycles).
    pub fn link(&self, parent: &BlockId, child: &BlockId) {
        self.lock()
            .children
            .entry(parent.clone())
            .or_default()
            .push(child.clone());
    }

    /// Makes every later call touching `block_id` fail with a transport error.
    pub fn fail_on(&self, block_id: &BlockId) {
        self.lock().failing.insert(block_id.clone());
    }

    /// Ids passed to `fetch_children`, in call order.
    pub fn fetched_ids(&self) -> Vec<BlockId> {
        self.lock().fetch_log.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.lock().fetch_log.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryTree> {
        self.tree
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentAdapter for MemoryDocument {
    fn fetch_children(
        &self,
        block_id: &BlockId,
        deadline: &Deadline,
    ) -> DocumentResult<Vec<Block>> {
        let mut tree = self.lock();
        tree.fetch_log.push(block_id.clone());
        if deadline.is_expired() {
            return Err(DocumentError::Timeout {
                block_id: block_id.clone(),
            });
        }
        if tree.failing.contains(block_id) {
            return Err(DocumentError::Status {
                block_id: block_id.clone(),
                status: 500,
                message: "injected failure".to_string(),
            });
        }

        let child_ids = tree.children.get(block_id).cloned().unwrap_or_default();
        let mut children = Vec::with_capacity(child_ids.len());
        for child_id in child_ids {
            if let Some(block) = tree.blocks.get(&child_id) {
                let mut block = block.clone();
                block.has_children = block.has_children
                    || tree
                        .children
                        .get(&child_id)
                        .is_some_and(|ids| !ids.is_empty());
                children.push(block);
            }
        }
        Ok(children)
    }

    fn append_block(
        &self,
        parent_id: &BlockId,
        block: &BlockDraft,
        deadline: &Deadline,
    ) -> DocumentResult<()> {
        if deadline.is_expired() {
            return Err(DocumentError::Timeout {
                block_id: parent_id.clone(),
            });
        }
        {
            let tree = self.lock();
            if tree.failing.contains(parent_id) {
                return Err(DocumentError::Status {
                    block_id: parent_id.clone(),
                    status: 500,
                    message: "injected failure".to_string(),
                });
            }
            if *parent_id != self.root && !tree.blocks.contains_key(parent_id) {
                return Err(DocumentError::UnknownBlock(parent_id.clone()));
            }
        }

        let created = Block {
            id: BlockId::new(Uuid::new_v4().to_string()),
            kind: block.kind,
            text: vec![block.text.clone()],
            is_toggleable: block.is_toggleable,
            has_children: false,
            checked: block.checked,
        };
        self.insert(parent_id, created);
        Ok(())
    }
}
