//! Document adapter contract and implementations.
//!
//! # Responsibility
//! - Define the two collaborator operations the core needs from a block
//!   store: ordered child listing and single-block append.
//! - Provide remote (Notion), local (SQLite) and in-memory adapters.
//!
//! # Invariants
//! - `fetch_children` returns children in document order.
//! - Every error names the block id the failing call was about.
//! - Adapters never cache tree state across calls.

use crate::db::DbError;
use crate::deadline::Deadline;
use crate::model::block::{Block, BlockDraft, BlockId};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod notion;
pub mod sqlite;

pub use memory::MemoryDocument;
pub use notion::{NotionDocument, RetryPolicy};
pub use sqlite::SqliteDocument;

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Collaborator failures. All of them are internal errors for the caller.
#[derive(Debug)]
pub enum DocumentError {
    /// Request never produced a response (connection, DNS, TLS, ...).
    Transport { block_id: BlockId, message: String },
    /// Remote answered with a non-success status.
    Status {
        block_id: BlockId,
        status: u16,
        message: String,
    },
    /// Response body could not be decoded into blocks.
    Decode { block_id: BlockId, message: String },
    /// Request deadline elapsed before or during the call.
    Timeout { block_id: BlockId },
    /// Block id does not exist in a local store.
    UnknownBlock(BlockId),
    /// Local store failure.
    Store { block_id: BlockId, source: DbError },
}

impl DocumentError {
    /// Block id the failing call was about.
    pub fn block_id(&self) -> &BlockId {
        match self {
            Self::Transport { block_id, .. }
            | Self::Status { block_id, .. }
            | Self::Decode { block_id, .. }
            | Self::Timeout { block_id }
            | Self::UnknownBlock(block_id)
            | Self::Store { block_id, .. } => block_id,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether repeating an idempotent read may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { block_id, message } => {
                write!(f, "request for block {block_id} failed: {message}")
            }
            Self::Status {
                block_id,
                status,
                message,
            } => write!(
                f,
                "document store returned HTTP {status} for block {block_id}: {message}"
            ),
            Self::Decode { block_id, message } => {
                write!(f, "invalid children payload for block {block_id}: {message}")
            }
            Self::Timeout { block_id } => write!(f, "request for block {block_id} timed out"),
            Self::UnknownBlock(block_id) => write!(f, "block not found: {block_id}"),
            Self::Store { block_id, source } => {
                write!(f, "local store failed for block {block_id}: {source}")
            }
        }
    }
}

impl Error for DocumentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Hierarchical block store consumed by the core.
pub trait DocumentAdapter {
    /// Lists direct children of `block_id` in document order.
    fn fetch_children(&self, block_id: &BlockId, deadline: &Deadline)
        -> DocumentResult<Vec<Block>>;

    /// Appends one block as the last child of `parent_id`.
    ///
    /// Not idempotent; callers must not retry it blindly.
    fn append_block(
        &self,
        parent_id: &BlockId,
        block: &BlockDraft,
        deadline: &Deadline,
    ) -> DocumentResult<()>;
}

impl<T: DocumentAdapter + ?Sized> DocumentAdapter for &T {
    fn fetch_children(
        &self,
        block_id: &BlockId,
        deadline: &Deadline,
    ) -> DocumentResult<Vec<Block>> {
        (**self).fetch_children(block_id, deadline)
    }

    fn append_block(
        &self,
        parent_id: &BlockId,
        block: &BlockDraft,
        deadline: &Deadline,
    ) -> DocumentResult<()> {
        (**self).append_block(parent_id, block, deadline)
    }
}

impl<T: DocumentAdapter + ?Sized> DocumentAdapter for Box<T> {
    fn fetch_children(
        &self,
        block_id: &BlockId,
        deadline: &Deadline,
    ) -> DocumentResult<Vec<Block>> {
        (**self).fetch_children(block_id, deadline)
    }

    fn append_block(
        &self,
        parent_id: &BlockId,
        block: &BlockDraft,
        deadline: &Deadline,
    ) -> DocumentResult<()> {
        (**self).append_block(parent_id, block, deadline)
    }
}
