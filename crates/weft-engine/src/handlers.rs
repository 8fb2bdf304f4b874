//! Per-kind node behavior: resolve inputs against the execution
//! context, invoke the backing unit (or evaluate the expression), and
//! hand back both for logging.

use serde_json::{json, Map, Value};
use tracing::debug;

use weft_core::error::{Result, WeftError};
use weft_core::merge::deep_merge;
use weft_core::workflow::{Node, NodeSpec};
use weft_units::UnitRegistry;

use crate::condition;
use crate::context::ExecutionContext;
use crate::resolver::{
    is_single_placeholder, parse_path, resolve_template, resolve_value, scan_template, stringify,
    TemplatePart,
};

/// Outcome of one handler invocation: the inputs as the handler saw
/// them (persisted in the node log) and the handler result.
pub struct NodeRun {
    pub inputs: Value,
    pub result: Result<Value>,
}

impl NodeRun {
    fn ok(inputs: Value, output: Value) -> Self {
        Self {
            inputs,
            result: Ok(output),
        }
    }

    fn err(inputs: Value, error: WeftError) -> Self {
        Self {
            inputs,
            result: Err(error),
        }
    }
}

/// Invoke the behavior for a node's kind.
///
/// Triggers never run here: the executor seeds the trigger output from
/// the event payload, so reaching one mid-graph means the definition
/// is malformed.
pub async fn run_node(units: &UnitRegistry, node: &Node, ctx: &ExecutionContext) -> NodeRun {
    match &node.spec {
        NodeSpec::Trigger { .. } => NodeRun::err(
            Value::Null,
            WeftError::Structural(format!(
                "trigger node '{}' cannot appear mid-graph",
                node.id
            )),
        ),
        NodeSpec::Agent {
            agent_id,
            overrides,
        } => run_agent(units, node, agent_id, overrides, ctx).await,
        NodeSpec::Action { tool_id, settings } => {
            run_action(units, node, tool_id, settings, ctx).await
        }
        NodeSpec::Condition { expression } => run_condition(&node.id, expression, ctx),
    }
}

async fn run_agent(
    units: &UnitRegistry,
    node: &Node,
    agent_id: &str,
    overrides: &Map<String, Value>,
    ctx: &ExecutionContext,
) -> NodeRun {
    let inputs = resolve_value(&Value::Object(node.inputs.clone()), ctx);
    let unit = match units.get(agent_id) {
        Some(unit) => unit,
        None => return NodeRun::err(inputs, WeftError::UnitNotFound(agent_id.to_string())),
    };
    let config = unit.merge_config(overrides);
    let result = units.execute(agent_id, inputs.clone(), config).await;
    NodeRun { inputs, result }
}

async fn run_action(
    units: &UnitRegistry,
    node: &Node,
    tool_id: &str,
    settings: &Map<String, Value>,
    ctx: &ExecutionContext,
) -> NodeRun {
    let resolved = resolve_action_inputs(&node.inputs, ctx);
    // Static settings are the base layer; resolved inputs win on conflict.
    let payload = deep_merge(
        &Value::Object(settings.clone()),
        &Value::Object(resolved),
    );
    let result = units.execute(tool_id, payload.clone(), Value::Null).await;
    NodeRun {
        inputs: payload,
        result,
    }
}

fn run_condition(node_id: &str, expression: &str, ctx: &ExecutionContext) -> NodeRun {
    let resolved = resolve_template(expression, ctx);
    let text = match &resolved {
        Value::String(s) => s.clone(),
        other => stringify(other),
    };
    let result = condition::evaluate(&text);
    debug!(node_id, expression = %text, result, "condition evaluated");
    NodeRun::ok(json!({ "expression": text }), json!({ "result": result }))
}

fn resolve_action_inputs(inputs: &Map<String, Value>, ctx: &ExecutionContext) -> Map<String, Value> {
    let mut resolved = Map::new();
    for (key, raw) in inputs {
        let mut value = resolve_value(raw, ctx);
        if value.is_null() {
            if let Some(found) = fallback_lookup(raw, ctx) {
                value = found;
            }
        }
        resolved.insert(key.clone(), value);
    }
    resolved
}

/// When a single-placeholder input resolves to null, scan the whole
/// context for the path's final key. `{{approve.btn_yes}}` still finds
/// a `btn_yes` emitted under a different node id.
fn fallback_lookup(raw: &Value, ctx: &ExecutionContext) -> Option<Value> {
    let text = raw.as_str()?;
    let parts = scan_template(text);
    if !is_single_placeholder(&parts) {
        return None;
    }
    let path = match parts.first() {
        Some(TemplatePart::Placeholder(path)) => path,
        _ => return None,
    };
    let segments = parse_path(path)?;
    let last = segments.last()?;
    ctx.find_key(&last.key).cloned()
}
