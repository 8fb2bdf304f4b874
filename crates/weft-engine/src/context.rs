use std::collections::HashMap;

use serde_json::{Map, Value};

use weft_core::workflow::NodeKind;

/// Shared context for passing data between workflow nodes.
///
/// Every executed node records its output here under its node id, in
/// execution order. The resolver reads from this structure; nothing is
/// ever removed during a run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Event payload that fired the trigger.
    trigger_data: Value,
    /// Node outputs in execution order.
    entries: Vec<ContextEntry>,
    /// node_id -> position in `entries`.
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone)]
struct ContextEntry {
    node_id: String,
    kind: NodeKind,
    output: Value,
}

impl ExecutionContext {
    pub fn new(trigger_data: Value) -> Self {
        Self {
            trigger_data,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn trigger_data(&self) -> &Value {
        &self.trigger_data
    }

    /// Record a node's output. Re-recording the same node overwrites
    /// its output but keeps its original position.
    pub fn record(&mut self, node_id: impl Into<String>, kind: NodeKind, output: Value) {
        let node_id = node_id.into();
        match self.index.get(&node_id) {
            Some(&pos) => {
                self.entries[pos].output = output;
                self.entries[pos].kind = kind;
            }
            None => {
                self.index.insert(node_id.clone(), self.entries.len());
                self.entries.push(ContextEntry {
                    node_id,
                    kind,
                    output,
                });
            }
        }
    }

    /// Output of a node, if it has executed.
    pub fn get(&self, node_id: &str) -> Option<&Value> {
        self.index.get(node_id).map(|&pos| &self.entries[pos].output)
    }

    pub fn has(&self, node_id: &str) -> bool {
        self.index.contains_key(node_id)
    }

    /// Outputs of all nodes of one kind, most recently executed first.
    pub fn outputs_of_kind_newest_first(&self, kind: NodeKind) -> impl Iterator<Item = &Value> {
        self.entries
            .iter()
            .rev()
            .filter(move |e| e.kind == kind)
            .map(|e| &e.output)
    }

    /// Newest-first scan for a non-null `key` inside any recorded
    /// object output. Used as a last-resort input fallback.
    pub fn find_key(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .filter_map(|e| e.output.as_object())
            .filter_map(|obj| obj.get(key))
            .find(|v| !v.is_null())
    }

    /// All recorded outputs keyed by node id, for result snapshots.
    pub fn snapshot(&self) -> Value {
        let mut map = Map::new();
        for entry in &self.entries {
            map.insert(entry.node_id.clone(), entry.output.clone());
        }
        Value::Object(map)
    }

    /// Number of recorded node outputs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_and_get() {
        let mut ctx = ExecutionContext::new(json!({"action": "created"}));
        ctx.record("agent1", NodeKind::Agent, json!({"response": "hi"}));

        assert_eq!(ctx.trigger_data()["action"], "created");
        assert_eq!(ctx.get("agent1").unwrap()["response"], "hi");
        assert!(ctx.get("missing").is_none());
        assert!(ctx.has("agent1"));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_re_record_keeps_position() {
        let mut ctx = ExecutionContext::new(Value::Null);
        ctx.record("a", NodeKind::Action, json!(1));
        ctx.record("b", NodeKind::Action, json!(2));
        ctx.record("a", NodeKind::Action, json!(3));

        assert_eq!(ctx.get("a"), Some(&json!(3)));
        assert_eq!(ctx.len(), 2);
        // "b" is still newest
        let newest: Vec<&Value> = ctx.outputs_of_kind_newest_first(NodeKind::Action).collect();
        assert_eq!(newest, vec![&json!(2), &json!(3)]);
    }

    #[test]
    fn test_outputs_of_kind_newest_first() {
        let mut ctx = ExecutionContext::new(Value::Null);
        ctx.record("first", NodeKind::Agent, json!({"n": 1}));
        ctx.record("act", NodeKind::Action, json!({"n": 2}));
        ctx.record("second", NodeKind::Agent, json!({"n": 3}));

        let agents: Vec<&Value> = ctx.outputs_of_kind_newest_first(NodeKind::Agent).collect();
        assert_eq!(agents, vec![&json!({"n": 3}), &json!({"n": 1})]);
    }

    #[test]
    fn test_find_key_prefers_newest_non_null() {
        let mut ctx = ExecutionContext::new(Value::Null);
        ctx.record("old", NodeKind::Action, json!({"ticket": "T-1"}));
        ctx.record("mid", NodeKind::Action, json!({"ticket": null}));
        ctx.record("new", NodeKind::Action, json!({"other": true}));

        assert_eq!(ctx.find_key("ticket"), Some(&json!("T-1")));
        assert_eq!(ctx.find_key("nowhere"), None);
    }

    #[test]
    fn test_snapshot_contains_all_outputs() {
        let mut ctx = ExecutionContext::new(Value::Null);
        ctx.record("a", NodeKind::Trigger, json!({"x": 1}));
        ctx.record("b", NodeKind::Agent, json!({"y": 2}));

        let snap = ctx.snapshot();
        assert_eq!(snap["a"]["x"], 1);
        assert_eq!(snap["b"]["y"], 2);
    }
}
