//! `{{path}}` placeholder resolution against the execution context.
//!
//! Three roots are recognized: `trigger_data.*` reads the event
//! payload, `parents.<kind>.<field>` scans prior outputs of one node
//! kind newest-first, and any other leading identifier is a node id.
//! Missing data always resolves to null, never an error.

mod path;
mod template;

pub use path::{parse_path, PathSegment};
pub use template::{is_single_placeholder, scan_template, TemplatePart};

use serde_json::Value;

use weft_core::workflow::NodeKind;

use crate::context::ExecutionContext;

/// Resolve a configured input value, recursing into objects and arrays.
pub fn resolve_value(value: &Value, ctx: &ExecutionContext) -> Value {
    match value {
        Value::String(s) => resolve_template(s, ctx),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, ctx)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, ctx)).collect()),
        other => other.clone(),
    }
}

/// Resolve a template string.
///
/// A string that is exactly one placeholder yields the native value at
/// that path. Anything containing literal text or several placeholders
/// becomes a string, with each resolved value stringified in place.
pub fn resolve_template(input: &str, ctx: &ExecutionContext) -> Value {
    let parts = scan_template(input);
    if is_single_placeholder(&parts) {
        let TemplatePart::Placeholder(p) = &parts[0] else {
            unreachable!()
        };
        return resolve_path(p, ctx);
    }
    if !parts.iter().any(|p| matches!(p, TemplatePart::Placeholder(_))) {
        return Value::String(input.to_string());
    }

    let mut out = String::new();
    for part in &parts {
        match part {
            TemplatePart::Text(t) => out.push_str(t),
            TemplatePart::Placeholder(p) => out.push_str(&stringify(&resolve_path(p, ctx))),
        }
    }
    Value::String(out)
}

/// Resolve one path expression to its native value.
pub fn resolve_path(path: &str, ctx: &ExecutionContext) -> Value {
    match parse_path(path) {
        Some(segments) => eval_segments(&segments, ctx),
        None => Value::Null,
    }
}

fn eval_segments(segments: &[PathSegment], ctx: &ExecutionContext) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return Value::Null;
    };

    match head.key.as_str() {
        "trigger_data" => descend(ctx.trigger_data(), head.index, rest),
        "parents" => {
            // parents.<kind>.<field...> — a namespace, so neither the
            // root nor the kind segment takes an index
            let Some((kind_seg, field)) = rest.split_first() else {
                return Value::Null;
            };
            let Some(kind) = NodeKind::parse(&kind_seg.key) else {
                return Value::Null;
            };
            if head.index.is_some() || kind_seg.index.is_some() || field.is_empty() {
                return Value::Null;
            }
            for output in ctx.outputs_of_kind_newest_first(kind) {
                let found = descend(output, None, field);
                if !found.is_null() {
                    return found;
                }
            }
            Value::Null
        }
        node_id => match ctx.get(node_id) {
            Some(output) => descend(output, head.index, rest),
            None => Value::Null,
        },
    }
}

/// Walk `segments` down from `root`, applying an optional index to the
/// root itself first.
fn descend(root: &Value, root_index: Option<usize>, segments: &[PathSegment]) -> Value {
    let mut current = root;
    if let Some(i) = root_index {
        match current.get(i) {
            Some(v) => current = v,
            None => return Value::Null,
        }
    }
    for seg in segments {
        match current.get(seg.key.as_str()) {
            Some(v) => current = v,
            None => return Value::Null,
        }
        if let Some(i) = seg.index {
            match current.get(i) {
                Some(v) => current = v,
                None => return Value::Null,
            }
        }
    }
    current.clone()
}

/// Evaluate a dot path directly against a standalone JSON value.
/// Used by trigger filters, which address the raw event payload.
pub fn lookup(root: &Value, path: &str) -> Value {
    match parse_path(path) {
        // No context roots here; the whole path walks `root`
        Some(segments) => descend(root, None, &segments),
        None => Value::Null,
    }
}

/// Render a resolved value into a template string.
///
/// Strings insert verbatim, null becomes empty, scalars use their
/// display form, and containers serialize to compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
