//! SQLite persistence for workflow definitions, executions, and
//! per-node logs.

pub mod store;

pub use store::SqliteStore;
