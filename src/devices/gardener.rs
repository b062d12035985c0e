//! `Gardener` — a grid-walking device grounded in
//! `original_source/.../visualizers/JuniorGardener.py`'s numeric field model:
//! a bounded grid of cells (`0` empty, `-1` wall, positive the planted
//! flower kind), a facing direction, and `step`/`plant` actions that move
//! through and mark it.

use std::collections::HashMap;

use crate::component::{ActionError, Component, ComponentError, PostedEvent, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    North,
    East,
    South,
    West,
}

impl Orientation {
    fn delta(self) -> (i64, i64) {
        match self {
            Orientation::North => (0, -1),
            Orientation::East => (1, 0),
            Orientation::South => (0, 1),
            Orientation::West => (-1, 0),
        }
    }

    fn right(self) -> Self {
        match self {
            Orientation::North => Orientation::East,
            Orientation::East => Orientation::South,
            Orientation::South => Orientation::West,
            Orientation::West => Orientation::North,
        }
    }

    fn left(self) -> Self {
        match self {
            Orientation::North => Orientation::West,
            Orientation::West => Orientation::South,
            Orientation::South => Orientation::East,
            Orientation::East => Orientation::North,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Orientation::North => "NORTH",
            Orientation::East => "EAST",
            Orientation::South => "SOUTH",
            Orientation::West => "WEST",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NORTH" => Some(Orientation::North),
            "EAST" => Some(Orientation::East),
            "SOUTH" => Some(Orientation::South),
            "WEST" => Some(Orientation::West),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Gardener {
    width: i64,
    height: i64,
    x: i64,
    y: i64,
    orientation: Orientation,
    field: Vec<Vec<i64>>,
}

impl Default for Gardener {
    fn default() -> Self {
        let width = 5;
        let height = 5;
        Gardener {
            width,
            height,
            x: 0,
            y: 0,
            orientation: Orientation::North,
            field: vec![vec![0; width as usize]; height as usize],
        }
    }
}

impl Gardener {
    fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    fn field_value(&self) -> Value {
        Value::List(
            self.field
                .iter()
                .map(|row| Value::List(row.iter().map(|&cell| Value::Int(cell)).collect()))
                .collect(),
        )
    }
}

impl Component for Gardener {
    fn init_from_options(&mut self, options: &HashMap<String, Value>) -> Result<(), ComponentError> {
        if let Some(w) = options.get("width").and_then(Value::as_f64) {
            self.width = w as i64;
        }
        if let Some(h) = options.get("height").and_then(Value::as_f64) {
            self.height = h as i64;
        }
        self.field = vec![vec![0; self.width as usize]; self.height as usize];
        if let Some(x) = options.get("x").and_then(Value::as_f64) {
            self.x = x as i64;
        }
        if let Some(y) = options.get("y").and_then(Value::as_f64) {
            self.y = y as i64;
        }
        if let Some(orientation) = options.get("orientation").and_then(Value::as_str) {
            self.orientation = Orientation::parse(orientation)
                .ok_or_else(|| ComponentError::Config(format!("unknown orientation: {orientation}")))?;
        }
        Ok(())
    }

    fn get_attribute(&self, name: &str) -> Option<Value> {
        match name {
            "x" => Some(Value::Int(self.x)),
            "y" => Some(Value::Int(self.y)),
            "orientation" => Some(Value::Str(self.orientation.as_str().to_string())),
            "field" => Some(self.field_value()),
            _ => None,
        }
    }

    fn attribute_names(&self) -> &'static [&'static str] {
        &["x", "y", "orientation", "field"]
    }

    fn call_method(&mut self, name: &str, args: &[Value]) -> Result<Vec<PostedEvent>, ActionError> {
        match name {
            "turn_left" => {
                self.orientation = self.orientation.left();
                Ok(vec![])
            }
            "turn_right" => {
                self.orientation = self.orientation.right();
                Ok(vec![])
            }
            "step" => {
                let (dx, dy) = self.orientation.delta();
                let (nx, ny) = (self.x + dx, self.y + dy);
                if !self.in_bounds(nx, ny) || self.field[ny as usize][nx as usize] == -1 {
                    return Err(ActionError::DeviceFault(format!("gardener walked into a wall at ({nx}, {ny})")));
                }
                self.x = nx;
                self.y = ny;
                Ok(vec![])
            }
            "plant" => {
                let kind = args.first().and_then(Value::as_f64).unwrap_or(1.0) as i64;
                let cell = &mut self.field[self.y as usize][self.x as usize];
                if *cell != 0 {
                    return Err(ActionError::DeviceFault(format!(
                        "cell ({}, {}) is already planted",
                        self.x, self.y
                    )));
                }
                *cell = kind;
                Ok(vec![])
            }
            _ => Err(ActionError::NotCallable(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gardener_with(width: i64, height: i64) -> Gardener {
        let mut gardener = Gardener::default();
        let mut options = HashMap::new();
        options.insert("width".to_string(), Value::Int(width));
        options.insert("height".to_string(), Value::Int(height));
        gardener.init_from_options(&options).unwrap();
        gardener
    }

    #[test]
    fn turning_right_then_stepping_then_planting_moves_and_marks_the_cell() {
        let mut gardener = gardener_with(3, 3);
        gardener.call_method("turn_right", &[]).unwrap();
        gardener.call_method("step", &[]).unwrap();
        gardener.call_method("plant", &[Value::Int(1)]).unwrap();
        assert_eq!(gardener.get_attribute("x"), Some(Value::Int(1)));
        assert_eq!(gardener.get_attribute("y"), Some(Value::Int(0)));
        assert_eq!(
            gardener.get_attribute("field"),
            Some(Value::List(vec![
                Value::List(vec![Value::Int(0), Value::Int(1), Value::Int(0)]),
                Value::List(vec![Value::Int(0), Value::Int(0), Value::Int(0)]),
                Value::List(vec![Value::Int(0), Value::Int(0), Value::Int(0)]),
            ]))
        );
    }

    #[test]
    fn stepping_into_a_wall_is_a_device_fault() {
        let mut gardener = gardener_with(3, 3);
        gardener.field[0][1] = -1;
        gardener.call_method("turn_right", &[]).unwrap();
        assert!(matches!(gardener.call_method("step", &[]), Err(ActionError::DeviceFault(_))));
    }

    #[test]
    fn planting_an_already_planted_cell_is_a_device_fault() {
        let mut gardener = gardener_with(3, 3);
        gardener.call_method("plant", &[Value::Int(1)]).unwrap();
        assert!(matches!(gardener.call_method("plant", &[Value::Int(2)]), Err(ActionError::DeviceFault(_))));
    }

    #[test]
    fn turning_cycles_through_all_four_orientations() {
        let mut gardener = gardener_with(3, 3);
        assert_eq!(gardener.get_attribute("orientation"), Some(Value::Str("NORTH".to_string())));
        gardener.call_method("turn_right", &[]).unwrap();
        assert_eq!(gardener.get_attribute("orientation"), Some(Value::Str("EAST".to_string())));
    }
}
