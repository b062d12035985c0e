//! `CyberBear` — a 5x7 brightness-LED matrix with two RGBK eyes, grounded in
//! `original_source/.../visualizers/CyberBear.py:70-92`: `left_eye`/
//! `right_eye` are `(r, g, b, k)` 0-255 tuples, and each matrix cell is a
//! 0-100 brightness value (`get_matrix_pixel` is scaled by `2.55` there to
//! turn it into an 8-bit grayscale channel).
//!
//! When a drawn matrix does not match the requested pattern, `check_pattern`
//! emits *both* a pattern-specific mismatch event and a generic `"unknown
//! pattern"` event, rather than picking one (see DESIGN.md).

use std::collections::HashMap;

use crate::component::{ActionError, Component, ComponentError, PostedEvent, Value};

const ROWS: usize = 5;
const COLS: usize = 7;

type Rgbk = (u8, u8, u8, u8);

fn known_pattern(name: &str) -> Option<[[bool; COLS]; ROWS]> {
    match name {
        "heart" => Some([
            [false, true, false, false, false, true, false],
            [true, true, true, false, true, true, true],
            [true, true, true, true, true, true, true],
            [false, true, true, true, true, true, false],
            [false, false, true, true, true, false, false],
        ]),
        "smile" => Some([
            [false, true, false, false, false, true, false],
            [false, true, false, false, false, true, false],
            [false, false, false, false, false, false, false],
            [true, false, false, false, false, false, true],
            [false, true, true, true, true, true, false],
        ]),
        _ => None,
    }
}

fn eye_value((r, g, b, k): Rgbk) -> Value {
    Value::List(vec![Value::Int(r.into()), Value::Int(g.into()), Value::Int(b.into()), Value::Int(k.into())])
}

fn arg_u8(args: &[Value], index: usize) -> u8 {
    args.get(index).and_then(Value::as_f64).unwrap_or(0.0).clamp(0.0, 255.0) as u8
}

#[derive(Debug)]
pub struct CyberBear {
    matrix: [[u8; COLS]; ROWS],
    left_eye: Rgbk,
    right_eye: Rgbk,
}

impl Default for CyberBear {
    fn default() -> Self {
        CyberBear { matrix: [[0; COLS]; ROWS], left_eye: (0, 0, 0, 0), right_eye: (0, 0, 0, 0) }
    }
}

impl Component for CyberBear {
    fn init_from_options(&mut self, _options: &HashMap<String, Value>) -> Result<(), ComponentError> {
        Ok(())
    }

    fn get_attribute(&self, name: &str) -> Option<Value> {
        match name {
            "left_eye" => Some(eye_value(self.left_eye)),
            "right_eye" => Some(eye_value(self.right_eye)),
            _ => None,
        }
    }

    fn attribute_names(&self) -> &'static [&'static str] {
        &["left_eye", "right_eye"]
    }

    fn call_method(&mut self, name: &str, args: &[Value]) -> Result<Vec<PostedEvent>, ActionError> {
        match name {
            "set_eye" => {
                let which = args.first().and_then(Value::as_str).unwrap_or("");
                let rgbk = (arg_u8(args, 1), arg_u8(args, 2), arg_u8(args, 3), arg_u8(args, 4));
                match which {
                    "left" => self.left_eye = rgbk,
                    "right" => self.right_eye = rgbk,
                    other => return Err(ActionError::NotCallable(format!("set_eye({other})"))),
                }
                Ok(vec![])
            }
            "set_matrix_pixel" => {
                let row = args.first().and_then(Value::as_f64).unwrap_or(0.0) as usize;
                let col = args.get(1).and_then(Value::as_f64).unwrap_or(0.0) as usize;
                let brightness = args.get(2).and_then(Value::as_f64).unwrap_or(0.0).clamp(0.0, 100.0) as u8;
                if row >= ROWS || col >= COLS {
                    return Err(ActionError::DeviceFault(format!("matrix pixel ({row}, {col}) is out of range")));
                }
                self.matrix[row][col] = brightness;
                Ok(vec![])
            }
            "check_pattern" => {
                let pattern_name = args.first().and_then(Value::as_str).unwrap_or("");
                match known_pattern(pattern_name) {
                    Some(expected) if lit_matches(&expected, &self.matrix) => {
                        Ok(vec![PostedEvent::called(pattern_name.to_string())])
                    }
                    _ => Ok(vec![
                        PostedEvent::called(format!("{pattern_name} mismatch")),
                        PostedEvent::called("unknown pattern"),
                    ]),
                }
            }
            _ => Err(ActionError::NotCallable(name.to_string())),
        }
    }
}

fn lit_matches(expected: &[[bool; COLS]; ROWS], matrix: &[[u8; COLS]; ROWS]) -> bool {
    (0..ROWS).all(|r| (0..COLS).all(|c| expected[r][c] == (matrix[r][c] > 0)))
}
