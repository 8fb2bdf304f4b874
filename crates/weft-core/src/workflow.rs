use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle status of a stored workflow definition.
///
/// Only `Published` workflows are eligible for trigger dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Published,
    Paused,
    Archived,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::Published => "published",
            WorkflowStatus::Paused => "paused",
            WorkflowStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(WorkflowStatus::Draft),
            "published" => Some(WorkflowStatus::Published),
            "paused" => Some(WorkflowStatus::Paused),
            "archived" => Some(WorkflowStatus::Archived),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A saved automation: nodes connected by directed edges, entered
/// through a single trigger node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier for this workflow.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Workflow {
    /// Create an empty draft workflow.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: WorkflowStatus::Draft,
            nodes: vec![],
            edges: vec![],
        }
    }

    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The single trigger node, if the definition has one.
    pub fn trigger(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind() == NodeKind::Trigger)
    }

    /// Edges leaving the given node, in definition order.
    pub fn edges_from(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.from == node_id).collect()
    }

    /// Edges arriving at the given node, in definition order.
    pub fn edges_into(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.to == node_id).collect()
    }
}

/// Discriminant for the four node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Trigger,
    Agent,
    Action,
    Condition,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Agent => "agent",
            NodeKind::Action => "action",
            NodeKind::Condition => "condition",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trigger" => Some(NodeKind::Trigger),
            "agent" => Some(NodeKind::Agent),
            "action" => Some(NodeKind::Action),
            "condition" => Some(NodeKind::Condition),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific configuration of a node.
///
/// Serialized with a `kind` tag so definitions read naturally as JSON:
/// `{"kind": "agent", "agent_id": "triage", ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeSpec {
    /// Entry point. Matched against incoming events, never executed
    /// during traversal.
    Trigger {
        /// External event type this workflow listens for.
        trigger_type: String,
        /// Optional event filter. Absent or disabled matches everything.
        #[serde(default)]
        filter: Option<TriggerFilter>,
    },
    /// Chat-model step backed by a configured agent profile.
    Agent {
        agent_id: String,
        /// Node-level config merged over the agent's base config.
        #[serde(default)]
        overrides: Map<String, Value>,
    },
    /// Deterministic side-effect step backed by a registered tool unit.
    Action {
        tool_id: String,
        /// Static settings merged with resolved inputs at execution time.
        #[serde(default)]
        settings: Map<String, Value>,
    },
    /// Boolean branch point. The expression may contain `{{path}}`
    /// placeholders and is resolved before evaluation.
    Condition { expression: String },
}

/// A node in a workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the workflow. Also the key under which
    /// this node's output is recorded in the execution context.
    pub id: String,
    #[serde(flatten)]
    pub spec: NodeSpec,
    /// Configured inputs. String values may contain `{{path}}`
    /// placeholders resolved against the execution context.
    #[serde(default)]
    pub inputs: Map<String, Value>,
}

impl Node {
    /// Create a trigger node.
    pub fn trigger(id: impl Into<String>, trigger_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            spec: NodeSpec::Trigger {
                trigger_type: trigger_type.into(),
                filter: None,
            },
            inputs: Map::new(),
        }
    }

    /// Create an agent node.
    pub fn agent(id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            spec: NodeSpec::Agent {
                agent_id: agent_id.into(),
                overrides: Map::new(),
            },
            inputs: Map::new(),
        }
    }

    /// Create an action node.
    pub fn action(id: impl Into<String>, tool_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            spec: NodeSpec::Action {
                tool_id: tool_id.into(),
                settings: Map::new(),
            },
            inputs: Map::new(),
        }
    }

    /// Create a condition node.
    pub fn condition(id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            spec: NodeSpec::Condition {
                expression: expression.into(),
            },
            inputs: Map::new(),
        }
    }

    /// Add a configured input.
    pub fn with_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }

    /// Attach a trigger filter. No-op for non-trigger nodes.
    pub fn with_filter(mut self, f: TriggerFilter) -> Self {
        if let NodeSpec::Trigger { filter, .. } = &mut self.spec {
            *filter = Some(f);
        }
        self
    }

    /// Add an agent config override. No-op for non-agent nodes.
    pub fn with_override(mut self, key: impl Into<String>, value: Value) -> Self {
        if let NodeSpec::Agent { overrides, .. } = &mut self.spec {
            overrides.insert(key.into(), value);
        }
        self
    }

    /// Add an action setting. No-op for non-action nodes.
    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        if let NodeSpec::Action { settings, .. } = &mut self.spec {
            settings.insert(key.into(), value);
        }
        self
    }

    pub fn kind(&self) -> NodeKind {
        match self.spec {
            NodeSpec::Trigger { .. } => NodeKind::Trigger,
            NodeSpec::Agent { .. } => NodeKind::Agent,
            NodeSpec::Action { .. } => NodeKind::Action,
            NodeSpec::Condition { .. } => NodeKind::Condition,
        }
    }

    /// The external identifier this node is bound to: trigger type,
    /// agent id, or tool id. Conditions have none.
    pub fn type_ref(&self) -> Option<&str> {
        match &self.spec {
            NodeSpec::Trigger { trigger_type, .. } => Some(trigger_type),
            NodeSpec::Agent { agent_id, .. } => Some(agent_id),
            NodeSpec::Action { tool_id, .. } => Some(tool_id),
            NodeSpec::Condition { .. } => None,
        }
    }
}

/// An edge connecting two nodes in a workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id.
    pub from: String,
    /// Target node id.
    pub to: String,
    /// Branch label on edges leaving a condition node: `"true"`,
    /// `"false"`, or absent (followed regardless of the outcome).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
}

impl Edge {
    /// Create an unlabeled edge.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            source_handle: None,
        }
    }

    /// Create a labeled branch edge.
    pub fn with_handle(
        from: impl Into<String>,
        to: impl Into<String>,
        handle: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            source_handle: Some(handle.into()),
        }
    }
}

/// Event filter attached to a trigger node.
///
/// Compares one field of the incoming event payload against a fixed
/// value. A disabled filter matches every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerFilter {
    #[serde(default = "default_filter_enabled")]
    pub enabled: bool,
    /// Dot path into the event payload, e.g. `issue.labels[0]`.
    pub field: String,
    #[serde(default)]
    pub match_type: MatchType,
    /// Value the field is compared against, as text.
    pub value: String,
}

fn default_filter_enabled() -> bool {
    true
}

impl TriggerFilter {
    pub fn exact(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            enabled: true,
            field: field.into(),
            match_type: MatchType::Exact,
            value: value.into(),
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            enabled: true,
            field: field.into(),
            match_type: MatchType::Contains,
            value: value.into(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// How a trigger filter compares the extracted field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Exact,
    Contains,
}
