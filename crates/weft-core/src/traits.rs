use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::chat::{ChatRequest, ChatResponse};
use crate::error::Result;
use crate::execution::{Execution, ExecutionPatch, NodeLog};
use crate::merge::deep_merge;
use crate::workflow::Workflow;

/// Chat client — multi-provider, single-turn.
pub trait ChatClient: std::fmt::Debug + Send + Sync + 'static {
    /// Send a chat request and receive the complete response.
    fn chat(&self, request: ChatRequest) -> BoxFuture<'_, Result<ChatResponse>>;
}

/// Unit — a pluggable node behavior (agent or action).
pub trait Unit: Send + Sync + 'static {
    /// Unit id (matched against `agent_id` / `tool_id` in definitions).
    fn id(&self) -> &str;

    /// Base configuration, merged under node-level overrides.
    fn base_config(&self) -> Value {
        Value::Null
    }

    /// Deep-merge node-level overrides over this unit's base config.
    fn merge_config(&self, overrides: &Map<String, Value>) -> Value {
        if overrides.is_empty() {
            return self.base_config();
        }
        deep_merge(&self.base_config(), &Value::Object(overrides.clone()))
    }

    /// Run the unit with resolved inputs and merged config.
    fn execute(&self, inputs: Value, config: Value) -> BoxFuture<'_, Result<Value>>;

    /// Timeout in seconds for this unit.
    fn timeout_secs(&self) -> u64 {
        30
    }
}

/// Workflow definition store — persistence for saved automations.
pub trait DefinitionStore: Send + Sync + 'static {
    /// Load one workflow by id.
    fn workflow(&self, id: &str) -> BoxFuture<'_, Result<Option<Workflow>>>;

    /// Published workflows whose trigger listens for the given type.
    fn workflows_by_trigger(&self, trigger_type: &str) -> BoxFuture<'_, Result<Vec<Workflow>>>;

    /// Insert or replace a workflow definition.
    fn save_workflow(&self, workflow: &Workflow) -> BoxFuture<'_, Result<()>>;

    /// All stored workflows, ordered by id.
    fn list_workflows(&self) -> BoxFuture<'_, Result<Vec<Workflow>>>;
}

/// Log store — execution records and per-node logs.
pub trait LogStore: Send + Sync + 'static {
    /// Open an execution record (written before any node runs).
    fn record_execution(&self, execution: &Execution) -> BoxFuture<'_, Result<()>>;

    /// Patch an execution to its terminal status.
    fn update_execution(&self, id: &str, patch: &ExecutionPatch) -> BoxFuture<'_, Result<()>>;

    /// Append one node log row.
    fn record_node_log(&self, log: &NodeLog) -> BoxFuture<'_, Result<()>>;

    /// Load one execution by id.
    fn execution(&self, id: &str) -> BoxFuture<'_, Result<Option<Execution>>>;

    /// Node log rows for an execution, in write order.
    fn node_logs(&self, execution_id: &str) -> BoxFuture<'_, Result<Vec<NodeLog>>>;

    /// Most recent executions across all workflows.
    fn recent_executions(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Execution>>>;
}
