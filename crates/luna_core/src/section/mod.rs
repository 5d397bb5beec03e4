//! Section resolution over a block tree.
//!
//! # Responsibility
//! - Find the toggle heading that marks a `SectionTarget`.
//! - Keep "section does not exist" distinct from collaborator failures.
//!
//! # See also
//! - `document` for the collaborator contract the locator walks.

use crate::document::DocumentError;
use crate::model::block::BlockId;
use crate::model::intent::SectionTarget;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod locator;

pub use locator::{SectionLocator, DEFAULT_MAX_SECTION_DEPTH};

pub type SectionResult<T> = Result<T, SectionError>;

/// Section lookup failures.
#[derive(Debug)]
pub enum SectionError {
    /// Traversal finished without a matching heading.
    NotFound(SectionTarget),
    /// Tree is nested deeper than the configured limit below `block_id`.
    DepthExceeded { max_depth: usize, block_id: BlockId },
    /// Collaborator failure, including deadline expiry.
    Document(DocumentError),
}

impl SectionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for SectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(target) => write!(f, "section not found: {target}"),
            Self::DepthExceeded {
                max_depth,
                block_id,
            } => write!(
                f,
                "section search exceeded max depth {max_depth} below block {block_id}"
            ),
            Self::Document(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Document(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DocumentError> for SectionError {
    fn from(value: DocumentError) -> Self {
        Self::Document(value)
    }
}
