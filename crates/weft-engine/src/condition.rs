//! Boolean evaluation of resolved condition expressions.
//!
//! Expressions arrive with placeholders already substituted, so the
//! evaluator only sees literal text like `urgent == "urgent"` or
//! `7 > 5`. Comparisons are string-based unless both sides parse as
//! numbers. Anything unparseable evaluates to false.

/// Evaluate a resolved condition expression.
///
/// Supported forms:
/// - `left == right`, `left != right` (numeric when both sides parse)
/// - `left contains right` — substring match
/// - `left > right`, `>=`, `<`, `<=` — numeric only
/// - a bare value — truthiness (`""`, `"false"`, `"0"`, `"null"` are false)
pub fn evaluate(expr: &str) -> bool {
    let expr = expr.trim();

    if let Some((left, right)) = split_operator(expr, " contains ") {
        return left.contains(right);
    }
    if let Some((left, right)) = split_operator(expr, "!=") {
        return !values_equal(left, right);
    }
    if let Some((left, right)) = split_operator(expr, "==") {
        return values_equal(left, right);
    }
    if let Some((left, right)) = split_operator(expr, ">=") {
        return numeric_cmp(left, right, |a, b| a >= b);
    }
    if let Some((left, right)) = split_operator(expr, "<=") {
        return numeric_cmp(left, right, |a, b| a <= b);
    }
    if let Some((left, right)) = split_operator(expr, ">") {
        return numeric_cmp(left, right, |a, b| a > b);
    }
    if let Some((left, right)) = split_operator(expr, "<") {
        return numeric_cmp(left, right, |a, b| a < b);
    }

    // No operator: bare truthiness for a single token or a quoted
    // string, false for anything else
    let bare = unquote(expr);
    if expr.starts_with('"') || !bare.contains(char::is_whitespace) {
        return is_truthy(bare);
    }
    false
}

/// Split `left OP right`, trimming whitespace and surrounding quotes.
fn split_operator<'a>(expr: &'a str, op: &str) -> Option<(&'a str, &'a str)> {
    let parts: Vec<&str> = expr.splitn(2, op).collect();
    if parts.len() != 2 {
        return None;
    }
    Some((unquote(parts[0].trim()), unquote(parts[1].trim())))
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn values_equal(left: &str, right: &str) -> bool {
    if let (Ok(a), Ok(b)) = (left.parse::<f64>(), right.parse::<f64>()) {
        return a == b;
    }
    left == right
}

fn numeric_cmp(left: &str, right: &str, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(a), Ok(b)) => cmp(a, b),
        _ => false,
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(value, "" | "false" | "0" | "null")
}
