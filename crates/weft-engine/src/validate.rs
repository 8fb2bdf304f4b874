use std::collections::{HashMap, HashSet};

use weft_core::error::{Result, WeftError};
use weft_core::workflow::{NodeKind, Workflow};
use weft_units::UnitRegistry;

/// Context roots that node ids may not shadow.
const RESERVED_IDS: &[&str] = &["trigger_data", "parents"];

/// Check a workflow definition before any execution state is created.
///
/// Rejects duplicate or reserved node ids, graphs without exactly one
/// trigger, edges referencing unknown nodes, agent/action nodes bound
/// to unregistered units, and cycles. A failing workflow produces no
/// execution record at all.
pub fn validate_workflow(workflow: &Workflow, units: &UnitRegistry) -> Result<()> {
    let mut seen = HashSet::new();
    for node in &workflow.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(WeftError::Structural(format!(
                "duplicate node id '{}'",
                node.id
            )));
        }
        if RESERVED_IDS.contains(&node.id.as_str()) {
            return Err(WeftError::Structural(format!(
                "node id '{}' shadows a reserved context root",
                node.id
            )));
        }
    }

    let triggers: Vec<_> = workflow
        .nodes
        .iter()
        .filter(|n| n.kind() == NodeKind::Trigger)
        .collect();
    match triggers.len() {
        0 => return Err(WeftError::Structural("workflow has no trigger node".into())),
        1 => {}
        n => {
            return Err(WeftError::Structural(format!(
                "workflow has {} trigger nodes, expected exactly one",
                n
            )))
        }
    }

    for edge in &workflow.edges {
        for endpoint in [&edge.from, &edge.to] {
            if !seen.contains(endpoint.as_str()) {
                return Err(WeftError::Structural(format!(
                    "edge {} -> {} references unknown node '{}'",
                    edge.from, edge.to, endpoint
                )));
            }
        }
    }

    for node in &workflow.nodes {
        let needs_unit = matches!(node.kind(), NodeKind::Agent | NodeKind::Action);
        if needs_unit {
            // type_ref is always Some for agent/action nodes
            let unit_id = node.type_ref().unwrap_or_default();
            if !units.contains(unit_id) {
                return Err(WeftError::Structural(format!(
                    "node '{}' references unknown {} '{}'",
                    node.id,
                    node.kind(),
                    unit_id
                )));
            }
        }
    }

    detect_cycle(workflow)?;
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color DFS over the edge list, iterative with an explicit
/// stack so graph depth never touches the call stack. Reaching a node
/// that is still on the current path (gray) means the graph has a
/// cycle.
fn detect_cycle(workflow: &Workflow) -> Result<()> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &workflow.edges {
        adjacency
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
    }

    let mut colors: HashMap<&str, Color> = HashMap::new();
    for node in &workflow.nodes {
        let root = node.id.as_str();
        if colors.get(root).copied().unwrap_or(Color::White) != Color::White {
            continue;
        }

        // Each frame is a node plus the index of its next child.
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        colors.insert(root, Color::Gray);
        while let Some(frame) = stack.last_mut() {
            let (current, cursor) = *frame;
            let child = adjacency
                .get(current)
                .and_then(|children| children.get(cursor))
                .copied();
            if child.is_some() {
                frame.1 += 1;
            }
            match child {
                None => {
                    colors.insert(current, Color::Black);
                    stack.pop();
                }
                Some(child) => match colors.get(child).copied().unwrap_or(Color::White) {
                    Color::Gray => {
                        return Err(WeftError::Structural(format!(
                            "cycle detected through node '{child}'"
                        )));
                    }
                    Color::White => {
                        colors.insert(child, Color::Gray);
                        stack.push((child, 0));
                    }
                    Color::Black => {}
                },
            }
        }
    }
    Ok(())
}
