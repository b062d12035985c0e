//! Test/check harness: small, composable assertions over a finished
//! [`crate::driver::RunResult`], in the style of `harel`'s own test
//! helpers — compare structured results field-by-field and return a
//! human-readable reason, rather than panicking or diffing a snapshot.
//!
//! Both checks refuse outright on a timed-out run: a trace that happens to
//! match *after* the deadline cut the run short is not a pass.

use crate::component::Value;
use crate::driver::RunResult;

/// Compares the observed `called_events` trace against what a scenario
/// expects, in order.
pub fn check_called_events(trace: &RunResult, expected: &[String]) -> (String, bool) {
    if trace.timed_out {
        return ("run timed out before producing the expected trace".to_string(), false);
    }
    if trace.called_events == expected {
        ("called events matched the expected trace".to_string(), true)
    } else {
        (
            format!("called events mismatch: got {:?}, expected {expected:?}", trace.called_events),
            false,
        )
    }
}

/// Compares a `Gardener` device's `field` (and, if given, `(x, y)` position)
/// against expected values from a gardener round-trip scenario. `world` is
/// the component's declared id within the run.
pub fn check_gardener(
    trace: &RunResult,
    world: &str,
    expected_field: &[Vec<i64>],
    expected_position: Option<(i64, i64)>,
) -> (String, bool) {
    if trace.timed_out {
        return ("run timed out before the gardener finished its program".to_string(), false);
    }
    let Some(attrs) = trace.components.get(world) else {
        return (format!("no component named {world:?} in this run"), false);
    };
    let Some(Value::List(rows)) = attrs.get("field") else {
        return (format!("{world} has no readable field attribute"), false);
    };
    if rows.len() != expected_field.len() {
        return (
            format!("{world} field has {} rows, expected {}", rows.len(), expected_field.len()),
            false,
        );
    }
    for (y, (row, expected_row)) in rows.iter().zip(expected_field).enumerate() {
        let Value::List(cells) = row else {
            return (format!("{world} field row {y} is not a row of cells"), false);
        };
        if cells.len() != expected_row.len() {
            return (
                format!("{world} field row {y} has {} cells, expected {}", cells.len(), expected_row.len()),
                false,
            );
        }
        for (x, (cell, &expected_cell)) in cells.iter().zip(expected_row).enumerate() {
            if cell.as_f64() != Some(expected_cell as f64) {
                return (
                    format!("{world} field[{y}][{x}] = {cell:?}, expected {expected_cell}"),
                    false,
                );
            }
        }
    }

    if let Some((expected_x, expected_y)) = expected_position {
        let x = attrs.get("x").and_then(Value::as_f64);
        let y = attrs.get("y").and_then(Value::as_f64);
        if x != Some(expected_x as f64) || y != Some(expected_y as f64) {
            return (
                format!("{world} position ({x:?}, {y:?}), expected ({expected_x}, {expected_y})"),
                false,
            );
        }
    }

    (format!("{world} matched the expected field and position"), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn result(called_events: Vec<String>, timed_out: bool) -> RunResult {
        RunResult { timed_out, events: Vec::new(), called_events, components: HashMap::new() }
    }

    #[test]
    fn called_events_check_reports_mismatch_contents() {
        let (reason, ok) = check_called_events(&result(vec!["a".to_string()], false), &["a".to_string(), "b".to_string()]);
        assert!(!ok);
        assert!(reason.contains("mismatch"));
    }

    #[test]
    fn called_events_check_passes_on_exact_match() {
        let (_, ok) = check_called_events(&result(vec!["a".to_string()], false), &["a".to_string()]);
        assert!(ok);
    }

    #[test]
    fn called_events_check_refuses_a_timed_out_run_even_on_a_matching_trace() {
        let (reason, ok) = check_called_events(&result(vec!["a".to_string()], true), &["a".to_string()]);
        assert!(!ok);
        assert!(reason.contains("timed out"));
    }

    #[test]
    fn gardener_check_refuses_a_timed_out_run() {
        let mut components = HashMap::new();
        components.insert("g".to_string(), HashMap::new());
        let trace = RunResult { timed_out: true, events: Vec::new(), called_events: Vec::new(), components };
        let (reason, ok) = check_gardener(&trace, "g", &[vec![0]], None);
        assert!(!ok);
        assert!(reason.contains("timed out"));
    }

    #[test]
    fn gardener_check_compares_every_cell_and_the_optional_position() {
        let mut attrs = HashMap::new();
        attrs.insert(
            "field".to_string(),
            Value::List(vec![
                Value::List(vec![Value::Int(0), Value::Int(1), Value::Int(0)]),
                Value::List(vec![Value::Int(0), Value::Int(0), Value::Int(0)]),
                Value::List(vec![Value::Int(0), Value::Int(0), Value::Int(0)]),
            ]),
        );
        attrs.insert("x".to_string(), Value::Int(1));
        attrs.insert("y".to_string(), Value::Int(0));
        let mut components = HashMap::new();
        components.insert("g".to_string(), attrs);
        let trace = RunResult { timed_out: false, events: Vec::new(), called_events: Vec::new(), components };

        let expected = vec![vec![0, 1, 0], vec![0, 0, 0], vec![0, 0, 0]];
        let (reason, ok) = check_gardener(&trace, "g", &expected, Some((1, 0)));
        assert!(ok, "{reason}");

        let (reason, ok) = check_gardener(&trace, "g", &expected, Some((0, 0)));
        assert!(!ok);
        assert!(reason.contains("position"));
    }
}
