pub mod chat;
pub mod config;
pub mod error;
pub mod execution;
pub mod merge;
pub mod traits;
pub mod workflow;

pub use config::WeftConfig;
pub use error::{Result, WeftError};
pub use execution::{Execution, ExecutionPatch, ExecutionStatus, NodeLog, NodeRunStatus};
pub use merge::deep_merge;
pub use traits::{ChatClient, DefinitionStore, LogStore, Unit};
pub use workflow::{Edge, MatchType, Node, NodeKind, NodeSpec, TriggerFilter, Workflow, WorkflowStatus};
