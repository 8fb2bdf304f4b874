//! Fan a fired trigger out to every published workflow listening for
//! that trigger type, applying each trigger node's optional field
//! filter before starting an execution.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use weft_core::error::Result;
use weft_core::execution::ExecutionStatus;
use weft_core::traits::DefinitionStore;
use weft_core::workflow::{MatchType, NodeSpec, TriggerFilter, Workflow, WorkflowStatus};

use crate::executor::Executor;
use crate::resolver;

pub struct TriggerDispatcher {
    definitions: Arc<dyn DefinitionStore>,
    executor: Arc<Executor>,
}

/// What happened to one workflow during a dispatch pass.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub workflow_id: String,
    pub execution_id: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub error: Option<String>,
}

impl TriggerDispatcher {
    pub fn new(definitions: Arc<dyn DefinitionStore>, executor: Arc<Executor>) -> Self {
        Self {
            definitions,
            executor,
        }
    }

    /// Run every published workflow whose trigger matches the event.
    ///
    /// Workflows are isolated from each other: a failure in one is
    /// captured in its outcome and the loop moves on to the next.
    pub async fn dispatch(&self, trigger_id: &str, event: Value) -> Result<Vec<DispatchOutcome>> {
        let candidates = self.definitions.workflows_by_trigger(trigger_id).await?;
        info!(trigger_id, candidates = candidates.len(), "trigger fired");

        let mut outcomes = Vec::new();
        for workflow in &candidates {
            if !trigger_matches(workflow, trigger_id, &event) {
                debug!(workflow_id = %workflow.id, "trigger filter did not match");
                continue;
            }
            match self.executor.execute(workflow, event.clone()).await {
                Ok(execution) => {
                    outcomes.push(DispatchOutcome {
                        workflow_id: workflow.id.clone(),
                        execution_id: Some(execution.id),
                        status: Some(execution.status),
                        error: execution.error_message,
                    });
                }
                Err(failure) => {
                    error!(workflow_id = %workflow.id, error = %failure, "dispatch failed");
                    outcomes.push(DispatchOutcome {
                        workflow_id: workflow.id.clone(),
                        execution_id: None,
                        status: None,
                        error: Some(failure.to_string()),
                    });
                }
            }
        }
        Ok(outcomes)
    }
}

/// A workflow matches when it is published, its trigger node listens
/// for this trigger type, and the trigger's field filter (if any)
/// accepts the event.
///
/// Exposed so hosts can pre-filter events without dispatching.
pub fn trigger_matches(workflow: &Workflow, trigger_id: &str, event: &Value) -> bool {
    if workflow.status != WorkflowStatus::Published {
        return false;
    }
    let trigger = match workflow.trigger() {
        Some(node) => node,
        None => return false,
    };
    match &trigger.spec {
        NodeSpec::Trigger {
            trigger_type,
            filter,
        } => {
            if trigger_type != trigger_id {
                return false;
            }
            match filter {
                Some(filter) => filter_matches(filter, event),
                None => true,
            }
        }
        _ => false,
    }
}

fn filter_matches(filter: &TriggerFilter, event: &Value) -> bool {
    if !filter.enabled {
        return true;
    }
    let value = resolver::lookup(event, &filter.field);
    if value.is_null() {
        return false;
    }
    let text = resolver::stringify(&value);
    match filter.match_type {
        MatchType::Exact => text == filter.value,
        MatchType::Contains => text.contains(&filter.value),
    }
}
