//! Core use-case services.
//!
//! # Responsibility
//! - Turn classifier output and document lookups into dispatch results.
//! - Keep CLI and HTTP layers decoupled from classifier and storage details.

pub mod dispatcher;
pub mod todo_service;

pub use dispatcher::{
    DispatchContext, DispatchError, DispatchOutcome, DispatchSettings, Dispatcher,
};
pub use todo_service::{CreatedTodo, TodoService};
