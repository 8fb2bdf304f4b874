//! Workflow execution engine.
//!
//! Takes a validated workflow definition and an event payload, walks
//! the node graph depth-first, resolves `{{path}}` placeholders
//! against upstream outputs, routes condition branches, and records
//! every step through a log store. [`dispatch::TriggerDispatcher`]
//! sits in front and fans one fired trigger out to every published
//! workflow listening for it.

pub mod condition;
pub mod context;
pub mod dispatch;
pub mod executor;
pub mod handlers;
pub mod resolver;
pub mod validate;

pub use context::ExecutionContext;
pub use dispatch::{trigger_matches, DispatchOutcome, TriggerDispatcher};
pub use executor::Executor;
pub use validate::validate_workflow;
