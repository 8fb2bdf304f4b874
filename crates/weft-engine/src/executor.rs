//! Depth-first graph traversal over a workflow definition.
//!
//! One executor call runs one execution: the trigger output is seeded
//! from the event payload, successors run in edge order, condition
//! nodes choose which edges to follow, and every node visit leaves a
//! log row. A failing node never takes its siblings down with it; the
//! failure is absorbed into the execution outcome and traversal moves
//! on to the next branch.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use weft_core::config::EngineConfig;
use weft_core::error::{Result, WeftError};
use weft_core::execution::{Execution, ExecutionPatch, ExecutionStatus, NodeLog};
use weft_core::traits::LogStore;
use weft_core::workflow::{Edge, Node, NodeKind, Workflow};
use weft_units::UnitRegistry;

use crate::context::ExecutionContext;
use crate::handlers;
use crate::validate::validate_workflow;

/// Runs workflow executions against a unit registry, persisting the
/// execution and per-node rows through a [`LogStore`].
pub struct Executor {
    units: Arc<UnitRegistry>,
    logs: Arc<dyn LogStore>,
    config: EngineConfig,
}

/// Mutable state threaded through one traversal.
struct TraversalState {
    execution_id: String,
    ctx: ExecutionContext,
    has_errors: bool,
    first_error: Option<String>,
    /// Nodes already logged as skipped, so fan-out failures do not
    /// write duplicate rows.
    skip_marked: HashSet<String>,
    /// Nodes that ran and failed. Failures leave no context entry, so
    /// the fan-in guard needs its own record of them.
    failed: HashSet<String>,
}

impl Executor {
    pub fn new(units: Arc<UnitRegistry>, logs: Arc<dyn LogStore>) -> Self {
        Self {
            units,
            logs,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one execution of `workflow` for `event`.
    ///
    /// Structural problems fail fast: no execution row is written. Unit
    /// failures during traversal do not surface as `Err` — they end up
    /// in the returned execution's status and error message.
    pub async fn execute(&self, workflow: &Workflow, event: Value) -> Result<Execution> {
        validate_workflow(workflow, &self.units)?;
        let trigger = workflow
            .trigger()
            .ok_or_else(|| WeftError::Structural("workflow has no trigger node".into()))?;

        let mut execution = Execution::begin(workflow.id.as_str(), event.clone());
        self.logs.record_execution(&execution).await?;
        info!(
            execution_id = %execution.id,
            workflow_id = %workflow.id,
            "execution started"
        );

        let clock = Instant::now();
        let mut state = TraversalState {
            execution_id: execution.id.clone(),
            ctx: ExecutionContext::new(event.clone()),
            has_errors: false,
            first_error: None,
            skip_marked: HashSet::new(),
            failed: HashSet::new(),
        };

        // The fired trigger succeeds by definition; its output is the
        // event payload itself.
        state.ctx.record(trigger.id.as_str(), NodeKind::Trigger, event.clone());
        let trigger_log = NodeLog::success(
            execution.id.as_str(),
            trigger.id.as_str(),
            NodeKind::Trigger,
            Utc::now(),
            0,
        )
        .with_input(event.clone())
        .with_output(event);
        self.logs.record_node_log(&trigger_log).await?;

        for edge in workflow.edges_from(&trigger.id) {
            if let Some(child) = workflow.node(&edge.to) {
                self.visit(workflow, child, &mut state).await?;
            }
        }

        let duration_ms = clock.elapsed().as_millis() as u64;
        let status = if state.has_errors {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Success
        };
        let mut patch = ExecutionPatch::finish(status, duration_ms).with_result(state.ctx.snapshot());
        if let Some(error) = state.first_error {
            patch = patch.with_error(error);
        }
        self.logs.update_execution(&execution.id, &patch).await?;
        patch.apply(&mut execution);

        info!(
            execution_id = %execution.id,
            status = %execution.status,
            duration_ms,
            "execution finished"
        );
        Ok(execution)
    }

    /// Visit one node: run its handler, log the outcome, and recurse
    /// into whichever outgoing edges apply.
    ///
    /// Returns `Err` only for log-store failures. Handler errors are
    /// folded into the traversal state.
    fn visit<'a>(
        &'a self,
        workflow: &'a Workflow,
        node: &'a Node,
        state: &'a mut TraversalState,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            // Fan-in: the same node reachable over several edges runs
            // once, whether its first run succeeded or failed.
            if state.ctx.has(&node.id) || state.failed.contains(&node.id) {
                debug!(node_id = %node.id, "node already executed this run");
                return Ok(());
            }

            let started_at = Utc::now();
            let clock = Instant::now();
            let run = handlers::run_node(&self.units, node, &state.ctx).await;
            let duration_ms = clock.elapsed().as_millis() as u64;
            let kind = node.kind();

            match run.result {
                Ok(mut output) => {
                    let followed = if kind == NodeKind::Condition {
                        Some(self.route_condition(workflow, node, &mut output))
                    } else {
                        None
                    };

                    state.ctx.record(node.id.as_str(), kind, output.clone());
                    let log = NodeLog::success(
                        state.execution_id.as_str(),
                        node.id.as_str(),
                        kind,
                        started_at,
                        duration_ms,
                    )
                    .with_input(run.inputs)
                    .with_output(output);
                    self.logs.record_node_log(&log).await?;

                    match followed {
                        Some(edges) => {
                            // Branches routing left behind show as skipped.
                            let chosen: HashSet<&str> =
                                edges.iter().map(|e| e.to.as_str()).collect();
                            let bypassed: Vec<String> = workflow
                                .edges_from(&node.id)
                                .iter()
                                .filter(|e| !chosen.contains(e.to.as_str()))
                                .map(|e| e.to.clone())
                                .collect();
                            self.mark_skipped(workflow, &bypassed, &mut *state).await?;

                            for edge in edges {
                                if let Some(child) = workflow.node(&edge.to) {
                                    self.visit(workflow, child, &mut *state).await?;
                                }
                            }
                        }
                        None => {
                            for edge in workflow.edges_from(&node.id) {
                                if let Some(child) = workflow.node(&edge.to) {
                                    self.visit(workflow, child, &mut *state).await?;
                                }
                            }
                        }
                    }
                }
                Err(failure) => {
                    let message =
                        truncate_chars(&failure.to_string(), self.config.max_error_chars);
                    error!(node_id = %node.id, error = %message, "node failed");

                    state.has_errors = true;
                    state.failed.insert(node.id.clone());
                    if state.first_error.is_none() {
                        state.first_error = Some(message.clone());
                    }

                    let log = NodeLog::failed(
                        state.execution_id.as_str(),
                        node.id.as_str(),
                        kind,
                        started_at,
                        duration_ms,
                        message,
                    )
                    .with_input(run.inputs);
                    self.logs.record_node_log(&log).await?;

                    // The failed branch ends here; siblings keep going.
                    let children: Vec<String> = workflow
                        .edges_from(&node.id)
                        .iter()
                        .map(|e| e.to.clone())
                        .collect();
                    self.mark_skipped(workflow, &children, &mut *state).await?;
                }
            }
            Ok(())
        })
    }

    /// Decide which outgoing edges of a condition node to follow.
    ///
    /// A handle of `"true"`/`"false"` follows its matching result; a
    /// missing handle always follows. When edges exist but none match,
    /// a warning naming the available handles is attached to the
    /// node's output and traversal simply continues elsewhere.
    fn route_condition<'w>(
        &self,
        workflow: &'w Workflow,
        node: &Node,
        output: &mut Value,
    ) -> Vec<&'w Edge> {
        let result = output
            .get("result")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let outgoing = workflow.edges_from(&node.id);
        let followed: Vec<&Edge> = outgoing
            .iter()
            .copied()
            .filter(|edge| follow_edge(edge, result))
            .collect();

        if followed.is_empty() && !outgoing.is_empty() {
            let handles: Vec<String> = outgoing
                .iter()
                .map(|e| e.source_handle.clone().unwrap_or_else(|| "null".into()))
                .collect();
            let warning = format!(
                "no outgoing edge matched result={result}; available handles: [{}]",
                handles.join(", ")
            );
            warn!(node_id = %node.id, %warning, "condition routing miss");
            if let Some(map) = output.as_object_mut() {
                map.insert("warning".into(), Value::String(warning));
            }
        }
        followed
    }

    /// Write skipped rows for nodes cut off by a failure or an
    /// untaken branch. Nodes that already ran — including ones whose
    /// run failed — or were already marked, are left alone.
    async fn mark_skipped(
        &self,
        workflow: &Workflow,
        node_ids: &[String],
        state: &mut TraversalState,
    ) -> Result<()> {
        for node_id in node_ids {
            if state.ctx.has(node_id)
                || state.failed.contains(node_id)
                || !state.skip_marked.insert(node_id.clone())
            {
                continue;
            }
            let kind = match workflow.node(node_id) {
                Some(node) => node.kind(),
                None => continue,
            };
            debug!(node_id = %node_id, "node skipped");
            let log = NodeLog::skipped(state.execution_id.as_str(), node_id.as_str(), kind);
            self.logs.record_node_log(&log).await?;
        }
        Ok(())
    }
}

fn follow_edge(edge: &Edge, result: bool) -> bool {
    match edge.source_handle.as_deref() {
        None => true,
        Some("true") => result,
        Some("false") => !result,
        Some(_) => false,
    }
}

fn truncate_chars(message: &str, limit: usize) -> String {
    message.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use weft_core::execution::NodeRunStatus;
    use weft_core::workflow::{Edge, Node, Workflow};
    use weft_test_utils::{MemoryLogs, MockUnit};

    fn executor(units: UnitRegistry) -> (Executor, Arc<MemoryLogs>) {
        let logs = Arc::new(MemoryLogs::new());
        let executor = Executor::new(Arc::new(units), logs.clone());
        (executor, logs)
    }

    fn linear_workflow() -> Workflow {
        Workflow::new("wf-linear", "Linear")
            .with_node(Node::trigger("start", "ticket.created"))
            .with_node(
                Node::agent("classify", "triage")
                    .with_input("text", json!("{{trigger_data.body}}")),
            )
            .with_node(
                Node::action("notify", "webhook")
                    .with_input("verdict", json!("{{classify.verdict}}")),
            )
            .with_edge(Edge::new("start", "classify"))
            .with_edge(Edge::new("classify", "notify"))
    }

    #[tokio::test]
    async fn test_linear_flow_success() {
        let mut units = UnitRegistry::new();
        units.register(MockUnit::returning("triage", json!({ "verdict": "spam" })));
        let webhook = MockUnit::returning("webhook", json!({ "sent": true }));
        let webhook_calls = webhook.calls();
        units.register(webhook);

        let (executor, logs) = executor(units);
        let execution = executor
            .execute(&linear_workflow(), json!({ "body": "buy now" }))
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Success);
        assert!(execution.error_message.is_none());
        let result = execution.result_data.unwrap();
        assert_eq!(result["classify"]["verdict"], json!("spam"));
        assert_eq!(result["notify"]["sent"], json!(true));

        assert_eq!(
            logs.statuses(&execution.id),
            vec![
                ("start".to_string(), NodeRunStatus::Success),
                ("classify".to_string(), NodeRunStatus::Success),
                ("notify".to_string(), NodeRunStatus::Success),
            ]
        );

        // The action saw the agent's resolved output.
        let calls = webhook_calls.lock().unwrap();
        assert_eq!(calls[0].0["verdict"], json!("spam"));

        // Stored execution row was patched to the same terminal state.
        let stored = logs.execution(&execution.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ExecutionStatus::Success);
        assert!(stored.duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_trigger_log_row_carries_event() {
        let mut units = UnitRegistry::new();
        units.register(MockUnit::returning("triage", json!({})));
        units.register(MockUnit::returning("webhook", json!({})));

        let (executor, logs) = executor(units);
        let event = json!({ "body": "hello" });
        let execution = executor
            .execute(&linear_workflow(), event.clone())
            .await
            .unwrap();

        let row = logs.log_for(&execution.id, "start").unwrap();
        assert_eq!(row.status, NodeRunStatus::Success);
        assert_eq!(row.input_data, Some(event.clone()));
        assert_eq!(row.output_data, Some(event));
        assert_eq!(row.duration_ms, Some(0));
    }

    fn branching_workflow(true_handle: Option<&str>, false_handle: Option<&str>) -> Workflow {
        let yes_edge = match true_handle {
            Some(handle) => Edge::with_handle("gate", "yes", handle),
            None => Edge::new("gate", "yes"),
        };
        let no_edge = match false_handle {
            Some(handle) => Edge::with_handle("gate", "no", handle),
            None => Edge::new("gate", "no"),
        };
        Workflow::new("wf-branch", "Branch")
            .with_node(Node::trigger("start", "ticket.created"))
            .with_node(Node::condition(
                "gate",
                r#"{{trigger_data.kind}} == "spam""#,
            ))
            .with_node(Node::action("yes", "left"))
            .with_node(Node::action("no", "right"))
            .with_edge(Edge::new("start", "gate"))
            .with_edge(yes_edge)
            .with_edge(no_edge)
    }

    fn branch_units() -> (UnitRegistry, Arc<std::sync::Mutex<Vec<(Value, Value)>>>, Arc<std::sync::Mutex<Vec<(Value, Value)>>>) {
        let mut units = UnitRegistry::new();
        let left = MockUnit::returning("left", json!({ "took": "yes" }));
        let right = MockUnit::returning("right", json!({ "took": "no" }));
        let left_calls = left.calls();
        let right_calls = right.calls();
        units.register(left);
        units.register(right);
        (units, left_calls, right_calls)
    }

    #[tokio::test]
    async fn test_condition_routes_true_branch_only() {
        let (units, left_calls, right_calls) = branch_units();
        let (executor, logs) = executor(units);

        let workflow = branching_workflow(Some("true"), Some("false"));
        let execution = executor
            .execute(&workflow, json!({ "kind": "spam" }))
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Success);
        assert_eq!(left_calls.lock().unwrap().len(), 1);
        assert_eq!(right_calls.lock().unwrap().len(), 0);

        let row = logs.log_for(&execution.id, "no").unwrap();
        assert_eq!(row.status, NodeRunStatus::Skipped);
        let row = logs.log_for(&execution.id, "gate").unwrap();
        assert_eq!(row.output_data, Some(json!({ "result": true })));
    }

    #[tokio::test]
    async fn test_condition_routes_false_branch_only() {
        let (units, left_calls, right_calls) = branch_units();
        let (executor, _logs) = executor(units);

        let workflow = branching_workflow(Some("true"), Some("false"));
        executor
            .execute(&workflow, json!({ "kind": "ham" }))
            .await
            .unwrap();

        assert_eq!(left_calls.lock().unwrap().len(), 0);
        assert_eq!(right_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_condition_null_handle_always_followed() {
        let (units, left_calls, right_calls) = branch_units();
        let (executor, _logs) = executor(units);

        // Legacy graph: undifferentiated edges route to all children.
        let workflow = branching_workflow(None, None);
        executor
            .execute(&workflow, json!({ "kind": "ham" }))
            .await
            .unwrap();

        assert_eq!(left_calls.lock().unwrap().len(), 1);
        assert_eq!(right_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_routing_miss_warns_and_continues() {
        let mut units = UnitRegistry::new();
        let right = MockUnit::returning("right", json!({}));
        let right_calls = right.calls();
        units.register(right);

        // Only a "false" edge exists; result is true, so nothing routes.
        let workflow = Workflow::new("wf-miss", "Miss")
            .with_node(Node::trigger("start", "ticket.created"))
            .with_node(Node::condition("gate", r#"{{trigger_data.kind}} == "spam""#))
            .with_node(Node::action("no", "right"))
            .with_edge(Edge::new("start", "gate"))
            .with_edge(Edge::with_handle("gate", "no", "false"));

        let (executor, logs) = executor(units);
        let execution = executor
            .execute(&workflow, json!({ "kind": "spam" }))
            .await
            .unwrap();

        // Non-fatal: the execution still succeeds, nothing ran downstream.
        assert_eq!(execution.status, ExecutionStatus::Success);
        assert_eq!(right_calls.lock().unwrap().len(), 0);

        let row = logs.log_for(&execution.id, "gate").unwrap();
        assert_eq!(row.status, NodeRunStatus::Success);
        let output = row.output_data.unwrap();
        assert_eq!(output["result"], json!(true));
        let warning = output["warning"].as_str().unwrap();
        assert!(warning.contains("false"), "warning lists handles: {warning}");

        let row = logs.log_for(&execution.id, "no").unwrap();
        assert_eq!(row.status, NodeRunStatus::Skipped);
    }

    #[tokio::test]
    async fn test_failing_branch_does_not_stop_sibling() {
        let mut units = UnitRegistry::new();
        units.register(MockUnit::failing("flaky", "backend exploded"));
        let fine = MockUnit::returning("fine", json!({ "ok": true }));
        let fine_calls = fine.calls();
        units.register(fine);
        let downstream = MockUnit::returning("downstream", json!({}));
        let downstream_calls = downstream.calls();
        units.register(downstream);

        // start fans out to a failing branch (with a child) and a healthy one.
        let workflow = Workflow::new("wf-fanout", "Fanout")
            .with_node(Node::trigger("start", "ticket.created"))
            .with_node(Node::action("broken", "flaky"))
            .with_node(Node::action("after_broken", "downstream"))
            .with_node(Node::action("healthy", "fine"))
            .with_edge(Edge::new("start", "broken"))
            .with_edge(Edge::new("broken", "after_broken"))
            .with_edge(Edge::new("start", "healthy"));

        let (executor, logs) = executor(units);
        let execution = executor
            .execute(&workflow, json!({}))
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        let error = execution.error_message.unwrap();
        assert!(error.contains("backend exploded"), "got: {error}");

        // The sibling ran; the failed node's child did not.
        assert_eq!(fine_calls.lock().unwrap().len(), 1);
        assert_eq!(downstream_calls.lock().unwrap().len(), 0);

        let row = logs.log_for(&execution.id, "broken").unwrap();
        assert_eq!(row.status, NodeRunStatus::Failed);
        let row = logs.log_for(&execution.id, "after_broken").unwrap();
        assert_eq!(row.status, NodeRunStatus::Skipped);
        let row = logs.log_for(&execution.id, "healthy").unwrap();
        assert_eq!(row.status, NodeRunStatus::Success);
    }

    #[tokio::test]
    async fn test_diamond_join_runs_once() {
        let mut units = UnitRegistry::new();
        units.register(MockUnit::returning("pass", json!({})));
        let join = MockUnit::returning("join_unit", json!({ "joined": true }));
        let join_calls = join.calls();
        units.register(join);

        let workflow = Workflow::new("wf-diamond", "Diamond")
            .with_node(Node::trigger("start", "ticket.created"))
            .with_node(Node::action("left", "pass"))
            .with_node(Node::action("right", "pass"))
            .with_node(Node::action("join", "join_unit"))
            .with_edge(Edge::new("start", "left"))
            .with_edge(Edge::new("start", "right"))
            .with_edge(Edge::new("left", "join"))
            .with_edge(Edge::new("right", "join"));

        let (executor, logs) = executor(units);
        let execution = executor.execute(&workflow, json!({})).await.unwrap();

        assert_eq!(execution.status, ExecutionStatus::Success);
        assert_eq!(join_calls.lock().unwrap().len(), 1);
        let join_rows: Vec<_> = logs
            .statuses(&execution.id)
            .into_iter()
            .filter(|(id, _)| id == "join")
            .collect();
        assert_eq!(join_rows, vec![("join".to_string(), NodeRunStatus::Success)]);
    }

    #[tokio::test]
    async fn test_skip_marked_node_still_runs_via_healthy_parent() {
        let mut units = UnitRegistry::new();
        units.register(MockUnit::failing("flaky", "boom"));
        units.register(MockUnit::returning("pass", json!({})));
        let join = MockUnit::returning("join_unit", json!({}));
        let join_calls = join.calls();
        units.register(join);

        // Diamond where one arm fails: the join is first marked skipped
        // by the failing arm, then reached through the healthy one.
        let workflow = Workflow::new("wf-halfdiamond", "HalfDiamond")
            .with_node(Node::trigger("start", "ticket.created"))
            .with_node(Node::action("broken", "flaky"))
            .with_node(Node::action("healthy", "pass"))
            .with_node(Node::action("join", "join_unit"))
            .with_edge(Edge::new("start", "broken"))
            .with_edge(Edge::new("start", "healthy"))
            .with_edge(Edge::new("broken", "join"))
            .with_edge(Edge::new("healthy", "join"));

        let (executor, logs) = executor(units);
        let execution = executor.execute(&workflow, json!({})).await.unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(join_calls.lock().unwrap().len(), 1);

        // Both rows exist; the later one wins.
        let join_rows: Vec<_> = logs
            .statuses(&execution.id)
            .into_iter()
            .filter(|(id, _)| id == "join")
            .map(|(_, status)| status)
            .collect();
        assert_eq!(join_rows, vec![NodeRunStatus::Skipped, NodeRunStatus::Success]);
        let row = logs.log_for(&execution.id, "join").unwrap();
        assert_eq!(row.status, NodeRunStatus::Success);
    }

    #[tokio::test]
    async fn test_failing_join_runs_once() {
        let mut units = UnitRegistry::new();
        units.register(MockUnit::returning("pass", json!({})));
        let join = MockUnit::failing("join_unit", "join exploded");
        let join_calls = join.calls();
        units.register(join);

        // Diamond whose join fails: the second arm must not run it again.
        let workflow = Workflow::new("wf-diamond-fail", "DiamondFail")
            .with_node(Node::trigger("start", "ticket.created"))
            .with_node(Node::action("left", "pass"))
            .with_node(Node::action("right", "pass"))
            .with_node(Node::action("join", "join_unit"))
            .with_edge(Edge::new("start", "left"))
            .with_edge(Edge::new("start", "right"))
            .with_edge(Edge::new("left", "join"))
            .with_edge(Edge::new("right", "join"));

        let (executor, logs) = executor(units);
        let execution = executor.execute(&workflow, json!({})).await.unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.error_message.unwrap().contains("join exploded"));
        assert_eq!(join_calls.lock().unwrap().len(), 1);

        // Exactly one Failed row for the join; the second arm still ran.
        assert_eq!(
            logs.statuses(&execution.id),
            vec![
                ("start".to_string(), NodeRunStatus::Success),
                ("left".to_string(), NodeRunStatus::Success),
                ("join".to_string(), NodeRunStatus::Failed),
                ("right".to_string(), NodeRunStatus::Success),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_node_not_reskipped_by_failing_parent() {
        let mut units = UnitRegistry::new();
        units.register(MockUnit::returning("pass", json!({})));
        units.register(MockUnit::failing("flaky", "parent broke"));
        let join = MockUnit::failing("join_unit", "join broke");
        let join_calls = join.calls();
        units.register(join);

        // The join fails via the healthy arm; when the other arm then
        // fails too, its child marking must leave the Failed row as the
        // join's final word.
        let workflow = Workflow::new("wf-doublefail", "DoubleFail")
            .with_node(Node::trigger("start", "ticket.created"))
            .with_node(Node::action("left", "pass"))
            .with_node(Node::action("broken", "flaky"))
            .with_node(Node::action("join", "join_unit"))
            .with_edge(Edge::new("start", "left"))
            .with_edge(Edge::new("start", "broken"))
            .with_edge(Edge::new("left", "join"))
            .with_edge(Edge::new("broken", "join"));

        let (executor, logs) = executor(units);
        let execution = executor.execute(&workflow, json!({})).await.unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(join_calls.lock().unwrap().len(), 1);

        let join_rows: Vec<_> = logs
            .statuses(&execution.id)
            .into_iter()
            .filter(|(id, _)| id == "join")
            .map(|(_, status)| status)
            .collect();
        assert_eq!(join_rows, vec![NodeRunStatus::Failed]);
        let row = logs.log_for(&execution.id, "join").unwrap();
        assert_eq!(row.status, NodeRunStatus::Failed);
    }

    #[tokio::test]
    async fn test_structural_failure_writes_no_rows() {
        let units = UnitRegistry::new();
        let (executor, logs) = executor(units);

        // "triage"/"webhook" are not registered.
        let err = executor
            .execute(&linear_workflow(), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, WeftError::Structural(_)));
        assert!(logs.recent_executions(10).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_timeout_fails_the_node() {
        let mut units = UnitRegistry::new();
        units.register(
            MockUnit::returning("slow", json!({}))
                .with_delay(Duration::from_secs(120))
                .with_timeout(1),
        );

        let workflow = Workflow::new("wf-slow", "Slow")
            .with_node(Node::trigger("start", "ticket.created"))
            .with_node(Node::action("stall", "slow"))
            .with_edge(Edge::new("start", "stall"));

        let (executor, logs) = executor(units);
        let execution = executor.execute(&workflow, json!({})).await.unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        let error = execution.error_message.unwrap();
        assert!(error.contains("Unit timeout after 1s"), "got: {error}");
        let row = logs.log_for(&execution.id, "stall").unwrap();
        assert_eq!(row.status, NodeRunStatus::Failed);
    }

    #[tokio::test]
    async fn test_error_message_truncated() {
        let mut units = UnitRegistry::new();
        units.register(MockUnit::failing("flaky", "x".repeat(2000)));

        let workflow = Workflow::new("wf-longerr", "LongErr")
            .with_node(Node::trigger("start", "ticket.created"))
            .with_node(Node::action("broken", "flaky"))
            .with_edge(Edge::new("start", "broken"));

        let logs = Arc::new(MemoryLogs::new());
        let executor = Executor::new(Arc::new(units), logs.clone()).with_config(EngineConfig {
            unit_timeout_secs: 30,
            max_error_chars: 40,
        });

        let execution = executor.execute(&workflow, json!({})).await.unwrap();
        assert_eq!(execution.error_message.unwrap().chars().count(), 40);
        let row = logs.log_for(&execution.id, "broken").unwrap();
        assert_eq!(row.error_message.unwrap().chars().count(), 40);
    }
}
