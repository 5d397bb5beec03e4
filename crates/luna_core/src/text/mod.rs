//! Utterance text processing.
//!
//! Pure, allocation-light helpers with no I/O. Nothing in this module can fail.

pub mod normalize;

pub use normalize::normalize_task_text;
