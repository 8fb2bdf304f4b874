use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::workflow::NodeKind;

/// Terminal and in-flight states of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(ExecutionStatus::Running),
            "success" => Some(ExecutionStatus::Success),
            "failed" => Some(ExecutionStatus::Failed),
            "cancelled" => Some(ExecutionStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run of a workflow, created the moment a trigger fires.
///
/// The record is written with status `Running` before any node executes
/// and patched to a terminal status when traversal ends, so a crash
/// leaves a visible half-open row rather than nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    /// Event payload that fired the trigger.
    pub trigger_data: Value,
    /// Snapshot of all node outputs at the end of the run.
    pub result_data: Option<Value>,
    /// First error seen during the run, truncated for storage.
    pub error_message: Option<String>,
}

impl Execution {
    /// Open a new running execution for the given workflow and event.
    pub fn begin(workflow_id: impl Into<String>, trigger_data: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            trigger_data,
            result_data: None,
            error_message: None,
        }
    }
}

/// Fields updated when an execution reaches a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPatch {
    pub status: ExecutionStatus,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub result_data: Option<Value>,
    pub error_message: Option<String>,
}

impl ExecutionPatch {
    pub fn finish(status: ExecutionStatus, duration_ms: u64) -> Self {
        Self {
            status,
            completed_at: Utc::now(),
            duration_ms,
            result_data: None,
            error_message: None,
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result_data = Some(result);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Apply this patch to an in-memory execution record.
    pub fn apply(&self, execution: &mut Execution) {
        execution.status = self.status;
        execution.completed_at = Some(self.completed_at);
        execution.duration_ms = Some(self.duration_ms);
        if self.result_data.is_some() {
            execution.result_data = self.result_data.clone();
        }
        if self.error_message.is_some() {
            execution.error_message = self.error_message.clone();
        }
    }
}

/// Per-visit node state: `Pending → Running → {Success, Failed, Skipped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRunStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl NodeRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRunStatus::Pending => "pending",
            NodeRunStatus::Running => "running",
            NodeRunStatus::Success => "success",
            NodeRunStatus::Failed => "failed",
            NodeRunStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(NodeRunStatus::Pending),
            "running" => Some(NodeRunStatus::Running),
            "success" => Some(NodeRunStatus::Success),
            "failed" => Some(NodeRunStatus::Failed),
            "skipped" => Some(NodeRunStatus::Skipped),
            _ => None,
        }
    }
}

impl fmt::Display for NodeRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row per node visited during an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLog {
    pub execution_id: String,
    pub node_id: String,
    pub node_type: NodeKind,
    pub status: NodeRunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    /// Inputs after placeholder resolution, as fed to the node.
    pub input_data: Option<Value>,
    pub output_data: Option<Value>,
    pub error_message: Option<String>,
}

impl NodeLog {
    pub fn success(
        execution_id: impl Into<String>,
        node_id: impl Into<String>,
        node_type: NodeKind,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            node_id: node_id.into(),
            node_type,
            status: NodeRunStatus::Success,
            started_at,
            completed_at: Some(Utc::now()),
            duration_ms: Some(duration_ms),
            input_data: None,
            output_data: None,
            error_message: None,
        }
    }

    pub fn failed(
        execution_id: impl Into<String>,
        node_id: impl Into<String>,
        node_type: NodeKind,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            node_id: node_id.into(),
            node_type,
            status: NodeRunStatus::Failed,
            started_at,
            completed_at: Some(Utc::now()),
            duration_ms: Some(duration_ms),
            input_data: None,
            output_data: None,
            error_message: Some(error.into()),
        }
    }

    /// A node never reached because its ancestors failed or routed away.
    pub fn skipped(
        execution_id: impl Into<String>,
        node_id: impl Into<String>,
        node_type: NodeKind,
    ) -> Self {
        let now = Utc::now();
        Self {
            execution_id: execution_id.into(),
            node_id: node_id.into(),
            node_type,
            status: NodeRunStatus::Skipped,
            started_at: now,
            completed_at: Some(now),
            duration_ms: Some(0),
            input_data: None,
            output_data: None,
            error_message: None,
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input_data = Some(input);
        self
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output_data = Some(output);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_begin_opens_running_execution() {
        let exec = Execution::begin("wf1", json!({"action": "created"}));
        assert_eq!(exec.workflow_id, "wf1");
        assert_eq!(exec.status, ExecutionStatus::Running);
        assert!(!exec.status.is_terminal());
        assert!(exec.completed_at.is_none());
        assert!(exec.result_data.is_none());
    }

    #[test]
    fn test_patch_apply() {
        let mut exec = Execution::begin("wf1", json!({}));
        let patch = ExecutionPatch::finish(ExecutionStatus::Failed, 42)
            .with_result(json!({"n1": "out"}))
            .with_error("boom");

        patch.apply(&mut exec);
        assert_eq!(exec.status, ExecutionStatus::Failed);
        assert!(exec.status.is_terminal());
        assert_eq!(exec.duration_ms, Some(42));
        assert_eq!(exec.error_message.as_deref(), Some("boom"));
        assert_eq!(exec.result_data, Some(json!({"n1": "out"})));
    }

    #[test]
    fn test_skipped_log_has_zero_duration() {
        let log = NodeLog::skipped("ex1", "n3", NodeKind::Action);
        assert_eq!(log.status, NodeRunStatus::Skipped);
        assert_eq!(log.duration_ms, Some(0));
        assert!(log.error_message.is_none());
    }

    #[test]
    fn test_status_text_roundtrip() {
        for status in [
            NodeRunStatus::Pending,
            NodeRunStatus::Running,
            NodeRunStatus::Success,
            NodeRunStatus::Failed,
            NodeRunStatus::Skipped,
        ] {
            assert_eq!(NodeRunStatus::parse(status.as_str()), Some(status));
        }
        for status in [
            ExecutionStatus::Running,
            ExecutionStatus::Success,
            ExecutionStatus::Failed,
            ExecutionStatus::Cancelled,
        ] {
            assert_eq!(ExecutionStatus::parse(status.as_str()), Some(status));
        }
    }
}
