//! Action/guard mini-language.
//!
//! Trigger blocks look like:
//!
//! ```text
//! go[cnt.value > 3]/
//! cnt.reset()
//! imp.impulseA(1, {2,3})
//! ```
//!
//! one or more blank-line-separated event blocks, each a header line
//! (`event[guard]/`) followed by zero or more `component.method(args)` action
//! lines. No teacher analogue exists for this grammar (SCXML's `cond`/`expr`
//! stay opaque ECMAScript strings in `harel`), so the parser below is a small
//! hand-rolled recursive-descent reader in the same allocation-light style as
//! `harel`'s `parse_executables`/`parse_single_executable`.

use thiserror::Error;

use crate::component::{Instances, Value};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("guard evaluation failed: {0}")]
    GuardEvaluation(String),
    #[error("action binding error: {0}")]
    ActionBinding(String),
}

/// An argument expression as it appears inside `component.method(...)`,
/// before components are consulted to resolve attribute reads.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgExpr {
    Number(f64),
    Ident(String),
    DottedAttr(String, String),
    NestedSet(Vec<ArgExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionCall {
    pub component: String,
    pub method: String,
    pub args: Vec<ArgExpr>,
}

/// One `event[guard]/` header plus the action lines beneath it. `guard ==
/// Some("else")` marks the fallback branch: first guard to pass wins, else
/// is the catch-all.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBlock {
    pub event_name: String,
    pub guard: Option<String>,
    pub actions: Vec<ActionCall>,
}

/// Splits `text` on blank lines and parses each paragraph as one event block.
pub fn parse_action_block(text: &str) -> Result<Vec<EventBlock>, EvalError> {
    let mut blocks = Vec::new();
    for paragraph in split_paragraphs(text) {
        let mut lines = paragraph.lines().map(str::trim).filter(|l| !l.is_empty());
        let header = lines
            .next()
            .ok_or_else(|| EvalError::ActionBinding("empty event block".to_string()))?;
        let (event_name, guard) = parse_header(header)?;
        let actions = lines.map(parse_action_line).collect::<Result<Vec<_>, _>>()?;
        blocks.push(EventBlock { event_name, guard, actions });
    }
    Ok(blocks)
}

fn split_paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.trim().is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim().is_empty() {
        out.push(current);
    }
    out
}

/// `header := event_name [ '[' guard_expr ']' ] '/'`
fn parse_header(line: &str) -> Result<(String, Option<String>), EvalError> {
    let slash = line
        .find('/')
        .ok_or_else(|| EvalError::ActionBinding(format!("event header missing '/': {line}")))?;
    let before = line[..slash].trim();
    match before.find('[') {
        Some(open) => {
            let close = before.rfind(']').ok_or_else(|| {
                EvalError::ActionBinding(format!("event header missing closing ']': {line}"))
            })?;
            let event_name = before[..open].trim().to_string();
            let guard = before[open + 1..close].trim().to_string();
            Ok((event_name, if guard.is_empty() { None } else { Some(guard) }))
        }
        None => Ok((before.to_string(), None)),
    }
}

/// `action_line := component '.' method '(' args? ')'`
fn parse_action_line(line: &str) -> Result<ActionCall, EvalError> {
    let dot = line
        .find('.')
        .ok_or_else(|| EvalError::ActionBinding(format!("action line missing '.': {line}")))?;
    let component = line[..dot].trim().to_string();
    let rest = line[dot + 1..].trim();

    let open = rest
        .find('(')
        .ok_or_else(|| EvalError::ActionBinding(format!("action line missing '(': {line}")))?;
    let method = rest[..open].trim().to_string();
    let call = rest[open..].trim();
    if !call.starts_with('(') || !call.ends_with(')') {
        return Err(EvalError::ActionBinding(format!("unbalanced parens: {line}")));
    }
    let args = parse_args(&call[1..call.len() - 1])?;
    Ok(ActionCall { component, method, args })
}

fn parse_args(s: &str) -> Result<Vec<ArgExpr>, EvalError> {
    split_top_level(s, ',')
        .into_iter()
        .filter(|tok| !tok.is_empty())
        .map(|tok| parse_arg(&tok))
        .collect()
}

fn parse_arg(tok: &str) -> Result<ArgExpr, EvalError> {
    let tok = tok.trim();
    if let Some(inner) = tok.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        return Ok(ArgExpr::NestedSet(parse_args(inner)?));
    }
    if let Ok(n) = tok.parse::<f64>() {
        return Ok(ArgExpr::Number(n));
    }
    if let Some((component, attr)) = tok.split_once('.') {
        return Ok(ArgExpr::DottedAttr(component.trim().to_string(), attr.trim().to_string()));
    }
    Ok(ArgExpr::Ident(tok.to_string()))
}

/// Splits on `sep` at brace-nesting depth zero — the `nested_set` rule means
/// commas inside `{...}` never separate arguments.
fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                current.push(c);
            }
            c if c == sep && depth == 0 => {
                out.push(std::mem::take(&mut current).trim().to_string());
            }
            c => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

fn resolve_arg(arg: &ArgExpr, components: &Instances) -> Result<Value, EvalError> {
    match arg {
        ArgExpr::Number(n) => Ok(numeric_value(*n)),
        ArgExpr::NestedSet(items) => Ok(Value::List(
            items.iter().map(|a| resolve_arg(a, components)).collect::<Result<_, _>>()?,
        )),
        ArgExpr::DottedAttr(component, attr) => components
            .get_attribute(component, attr)
            .ok_or_else(|| EvalError::ActionBinding(format!("{component}.{attr} not found"))),
        ArgExpr::Ident(tok) => Ok(resolve_literal(tok)),
    }
}

fn numeric_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Int(n as i64)
    } else {
        Value::Float(n)
    }
}

fn resolve_literal(tok: &str) -> Value {
    if let Ok(i) = tok.parse::<i64>() {
        Value::Int(i)
    } else if let Ok(f) = tok.parse::<f64>() {
        Value::Float(f)
    } else {
        Value::Str(tok.to_string())
    }
}

/// Resolves every argument, then invokes `component.method(args)`.
pub fn execute_action(
    call: &ActionCall,
    components: &mut Instances,
) -> Result<Vec<crate::component::PostedEvent>, EvalError> {
    let args: Vec<Value> = call
        .args
        .iter()
        .map(|a| resolve_arg(a, components))
        .collect::<Result<_, _>>()?;
    components
        .call_method(&call.component, &call.method, &args)
        .map_err(|e| EvalError::ActionBinding(e.to_string()))
}

/// Evaluates `lhs OP rhs`; `None` or an empty string is vacuously true.
/// `"else"` is the fallback marker and is never passed here directly —
/// callers check for it before invoking this function.
pub fn evaluate_guard(guard: Option<&str>, components: &Instances) -> Result<bool, EvalError> {
    let Some(expr) = guard.map(str::trim) else {
        return Ok(true);
    };
    if expr.is_empty() {
        return Ok(true);
    }
    let (op, idx, op_len) = find_operator(expr)
        .ok_or_else(|| EvalError::GuardEvaluation(format!("no comparison operator in guard: {expr}")))?;
    let lhs_s = expr[..idx].trim();
    let rhs_s = expr[idx + op_len..].trim();
    let lhs = resolve_operand(lhs_s, components)?;
    let rhs = resolve_operand(rhs_s, components)?;
    compare(op, &lhs, &rhs)
}

fn resolve_operand(tok: &str, components: &Instances) -> Result<Value, EvalError> {
    if let Ok(i) = tok.parse::<i64>() {
        return Ok(Value::Int(i));
    }
    if let Ok(f) = tok.parse::<f64>() {
        return Ok(Value::Float(f));
    }
    if let Some((component, attr)) = tok.split_once('.') {
        return components
            .get_attribute(component.trim(), attr.trim())
            .ok_or_else(|| EvalError::GuardEvaluation(format!("{tok} not found")));
    }
    let unquoted = tok.trim_matches('"').trim_matches('\'');
    Ok(Value::Str(unquoted.to_string()))
}

const OPERATORS: &[&str] = &[">=", "<=", "==", "!=", ">", "<"];

fn find_operator(expr: &str) -> Option<(&'static str, usize, usize)> {
    OPERATORS
        .iter()
        .filter_map(|op| expr.find(op).map(|idx| (*op, idx, op.len())))
        .min_by_key(|(_, idx, _)| *idx)
}

fn compare(op: &str, lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    match op {
        "==" => Ok(values_equal(lhs, rhs)),
        "!=" => Ok(!values_equal(lhs, rhs)),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(l), Some(r)) => Ok(match op {
                ">" => l > r,
                "<" => l < r,
                ">=" => l >= r,
                "<=" => l <= r,
                _ => unreachable!(),
            }),
            _ => Err(EvalError::GuardEvaluation(format!(
                "cannot order non-numeric operands with {op}"
            ))),
        },
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => lhs.to_string() == rhs.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ActionError, Component, ComponentError, ComponentInstance, PostedEvent};
    use std::collections::HashMap;

    struct Fixture {
        value: i64,
    }

    impl Component for Fixture {
        fn init_from_options(&mut self, _options: &HashMap<String, Value>) -> Result<(), ComponentError> {
            Ok(())
        }

        fn get_attribute(&self, name: &str) -> Option<Value> {
            match name {
                "value" => Some(Value::Int(self.value)),
                _ => None,
            }
        }

        fn call_method(&mut self, name: &str, args: &[Value]) -> Result<Vec<PostedEvent>, ActionError> {
            match name {
                "bump" => {
                    self.value += 1;
                    Ok(vec![PostedEvent::called("bumped")])
                }
                "set" => {
                    if let Some(v) = args.first().and_then(Value::as_f64) {
                        self.value = v as i64;
                    }
                    Ok(vec![])
                }
                _ => Err(ActionError::NotCallable(name.to_string())),
            }
        }
    }

    fn fixture(value: i64) -> Instances {
        let mut map = std::collections::HashMap::new();
        map.insert(
            "cnt".to_string(),
            ComponentInstance {
                id: "cnt".to_string(),
                type_name: "Fixture".to_string(),
                object: Box::new(Fixture { value }),
            },
        );
        Instances(map)
    }

    #[test]
    fn parses_header_and_action_lines() {
        let blocks = parse_action_block("go[cnt.value > 3]/\ncnt.bump()\ncnt.set(5)").unwrap();
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.event_name, "go");
        assert_eq!(block.guard.as_deref(), Some("cnt.value > 3"));
        assert_eq!(block.actions.len(), 2);
        assert_eq!(block.actions[0].method, "bump");
        assert_eq!(block.actions[1].args, vec![ArgExpr::Number(5.0)]);
    }

    #[test]
    fn multiple_blocks_separated_by_blank_lines() {
        let blocks = parse_action_block("a/\ncnt.bump()\n\nb[else]/\ncnt.bump()").unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].guard.as_deref(), Some("else"));
    }

    #[test]
    fn nested_braces_are_not_split_on_comma() {
        let blocks = parse_action_block("go/\ncnt.set({1,2,3})").unwrap();
        let args = &blocks[0].actions[0].args;
        assert_eq!(args.len(), 1);
        assert!(matches!(&args[0], ArgExpr::NestedSet(items) if items.len() == 3));
    }

    #[test]
    fn empty_guard_is_vacuously_true() {
        let components = fixture(0);
        assert!(evaluate_guard(None, &components).unwrap());
        assert!(evaluate_guard(Some(""), &components).unwrap());
    }

    #[test]
    fn guard_resolves_component_attribute() {
        let components = fixture(4);
        assert!(evaluate_guard(Some("cnt.value > 3"), &components).unwrap());
        assert!(!evaluate_guard(Some("cnt.value < 3"), &components).unwrap());
    }

    #[test]
    fn ordering_non_numeric_operands_is_an_error() {
        let components = fixture(0);
        assert!(evaluate_guard(Some("a > b"), &components).is_err());
    }

    #[test]
    fn execute_action_invokes_method_and_returns_posted_events() {
        let mut components = fixture(0);
        let call = ActionCall {
            component: "cnt".to_string(),
            method: "bump".to_string(),
            args: vec![],
        };
        let posted = execute_action(&call, &mut components).unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].name, "bumped");
        assert_eq!(components.get_attribute("cnt", "value"), Some(Value::Int(1)));
    }

    #[test]
    fn dotted_attr_argument_resolves_through_components() {
        let mut components = fixture(7);
        let call = ActionCall {
            component: "cnt".to_string(),
            method: "set".to_string(),
            args: vec![ArgExpr::DottedAttr("cnt".to_string(), "value".to_string())],
        };
        execute_action(&call, &mut components).unwrap();
        assert_eq!(components.get_attribute("cnt", "value"), Some(Value::Int(7)));
    }
}
