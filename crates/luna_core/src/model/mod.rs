//! Request-scoped domain model for intent dispatch.
//!
//! # Responsibility
//! - Define the block shape consumed from the remote document store.
//! - Define intents, section targets and the externally visible dispatch result.
//!
//! # Invariants
//! - Blocks are transient read-only copies; nothing here caches tree state.
//! - Intents and section targets are closed enums, never free strings.

pub mod block;
pub mod intent;
