//! Test doubles shared across weft crates: scriptable units, a canned
//! chat client, and in-memory definition/log stores so engine tests
//! run without a database or network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;

use weft_core::chat::{ChatRequest, ChatResponse};
use weft_core::error::{Result, WeftError};
use weft_core::execution::{Execution, ExecutionPatch, NodeLog, NodeRunStatus};
use weft_core::traits::{ChatClient, DefinitionStore, LogStore, Unit};
use weft_core::workflow::{Workflow, WorkflowStatus};

/// Scriptable unit: returns a canned value or error, optionally after
/// a delay, and records every call it receives.
pub struct MockUnit {
    id: String,
    outcome: std::result::Result<Value, String>,
    delay: Option<Duration>,
    timeout_secs: u64,
    base: Value,
    calls: Arc<Mutex<Vec<(Value, Value)>>>,
}

impl MockUnit {
    pub fn returning(id: impl Into<String>, output: Value) -> Self {
        Self {
            id: id.into(),
            outcome: Ok(output),
            delay: None,
            timeout_secs: 30,
            base: Value::Null,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(id: impl Into<String>, message: impl Into<String>) -> Self {
        let mut unit = Self::returning(id, Value::Null);
        unit.outcome = Err(message.into());
        unit
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_base_config(mut self, base: Value) -> Self {
        self.base = base;
        self
    }

    /// Handle onto the recorded `(inputs, config)` pairs.
    pub fn calls(&self) -> Arc<Mutex<Vec<(Value, Value)>>> {
        Arc::clone(&self.calls)
    }
}

impl Unit for MockUnit {
    fn id(&self) -> &str {
        &self.id
    }

    fn base_config(&self) -> Value {
        self.base.clone()
    }

    fn execute(&self, inputs: Value, config: Value) -> BoxFuture<'_, Result<Value>> {
        let outcome = self.outcome.clone();
        let delay = self.delay;
        let unit = self.id.clone();
        let calls = Arc::clone(&self.calls);
        Box::pin(async move {
            if let Ok(mut log) = calls.lock() {
                log.push((inputs, config));
            }
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome.map_err(|message| WeftError::UnitExecution { unit, message })
        })
    }

    fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

/// Chat client that always answers with the same text.
#[derive(Debug)]
pub struct MockChatClient {
    response: String,
    model: String,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockChatClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            model: "mock-model".into(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Handle onto the requests the client has seen.
    pub fn requests(&self) -> Arc<Mutex<Vec<ChatRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl ChatClient for MockChatClient {
    fn chat(&self, request: ChatRequest) -> BoxFuture<'_, Result<ChatResponse>> {
        let response = ChatResponse {
            response: self.response.clone(),
            model_used: self.model.clone(),
            tokens_used: 0,
        };
        let requests = Arc::clone(&self.requests);
        Box::pin(async move {
            if let Ok(mut seen) = requests.lock() {
                seen.push(request);
            }
            Ok(response)
        })
    }
}

/// Definition store backed by a mutex-guarded map.
#[derive(Default)]
pub struct MemoryDefinitions {
    workflows: Mutex<HashMap<String, Workflow>>,
}

impl MemoryDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow(self, workflow: Workflow) -> Self {
        self.insert(workflow);
        self
    }

    pub fn insert(&self, workflow: Workflow) {
        if let Ok(mut map) = self.workflows.lock() {
            map.insert(workflow.id.clone(), workflow);
        }
    }
}

impl DefinitionStore for MemoryDefinitions {
    fn workflow(&self, id: &str) -> BoxFuture<'_, Result<Option<Workflow>>> {
        let id = id.to_string();
        Box::pin(async move {
            let map = self
                .workflows
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;
            Ok(map.get(&id).cloned())
        })
    }

    fn workflows_by_trigger(&self, trigger_type: &str) -> BoxFuture<'_, Result<Vec<Workflow>>> {
        let trigger_type = trigger_type.to_string();
        Box::pin(async move {
            let map = self
                .workflows
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;
            let mut matches: Vec<Workflow> = map
                .values()
                .filter(|wf| {
                    wf.status == WorkflowStatus::Published
                        && wf
                            .trigger()
                            .and_then(|t| t.type_ref())
                            .map(|t| t == trigger_type)
                            .unwrap_or(false)
                })
                .cloned()
                .collect();
            // Deterministic order for assertions.
            matches.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(matches)
        })
    }

    fn save_workflow(&self, workflow: &Workflow) -> BoxFuture<'_, Result<()>> {
        let workflow = workflow.clone();
        Box::pin(async move {
            self.workflows
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?
                .insert(workflow.id.clone(), workflow);
            Ok(())
        })
    }

    fn list_workflows(&self) -> BoxFuture<'_, Result<Vec<Workflow>>> {
        Box::pin(async move {
            let map = self
                .workflows
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;
            let mut all: Vec<Workflow> = map.values().cloned().collect();
            all.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(all)
        })
    }
}

/// Log store that appends to vectors, with helpers for asserting on
/// what the engine wrote.
#[derive(Default)]
pub struct MemoryLogs {
    executions: Mutex<Vec<Execution>>,
    node_logs: Mutex<Vec<NodeLog>>,
}

impl MemoryLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node `(id, status)` pairs for one execution, in write order.
    pub fn statuses(&self, execution_id: &str) -> Vec<(String, NodeRunStatus)> {
        self.node_logs
            .lock()
            .map(|logs| {
                logs.iter()
                    .filter(|l| l.execution_id == execution_id)
                    .map(|l| (l.node_id.clone(), l.status))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Last log row written for a node, which is its final word when a
    /// node was first marked skipped and later executed.
    pub fn log_for(&self, execution_id: &str, node_id: &str) -> Option<NodeLog> {
        self.node_logs.lock().ok().and_then(|logs| {
            logs.iter()
                .rev()
                .find(|l| l.execution_id == execution_id && l.node_id == node_id)
                .cloned()
        })
    }
}

impl LogStore for MemoryLogs {
    fn record_execution(&self, execution: &Execution) -> BoxFuture<'_, Result<()>> {
        let execution = execution.clone();
        Box::pin(async move {
            self.executions
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?
                .push(execution);
            Ok(())
        })
    }

    fn update_execution(&self, id: &str, patch: &ExecutionPatch) -> BoxFuture<'_, Result<()>> {
        let id = id.to_string();
        let patch = patch.clone();
        Box::pin(async move {
            let mut executions = self
                .executions
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;
            let execution = executions
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| WeftError::Database(format!("execution '{id}' not found")))?;
            patch.apply(execution);
            Ok(())
        })
    }

    fn record_node_log(&self, log: &NodeLog) -> BoxFuture<'_, Result<()>> {
        let log = log.clone();
        Box::pin(async move {
            self.node_logs
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?
                .push(log);
            Ok(())
        })
    }

    fn execution(&self, id: &str) -> BoxFuture<'_, Result<Option<Execution>>> {
        let id = id.to_string();
        Box::pin(async move {
            let executions = self
                .executions
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;
            Ok(executions.iter().find(|e| e.id == id).cloned())
        })
    }

    fn node_logs(&self, execution_id: &str) -> BoxFuture<'_, Result<Vec<NodeLog>>> {
        let execution_id = execution_id.to_string();
        Box::pin(async move {
            let logs = self
                .node_logs
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;
            Ok(logs
                .iter()
                .filter(|l| l.execution_id == execution_id)
                .cloned()
                .collect())
        })
    }

    fn recent_executions(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Execution>>> {
        Box::pin(async move {
            let executions = self
                .executions
                .lock()
                .map_err(|e| WeftError::Database(e.to_string()))?;
            Ok(executions.iter().rev().take(limit).cloned().collect())
        })
    }
}
