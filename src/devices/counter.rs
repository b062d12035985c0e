//! `Counter` — an integer accumulator, commonly used for guarded self-loops
//! that tally how many times an event has fired.

use std::collections::HashMap;

use crate::component::{ActionError, Component, ComponentError, PostedEvent, Value};

#[derive(Debug, Default)]
pub struct Counter {
    value: i64,
}

impl Component for Counter {
    fn init_from_options(&mut self, options: &HashMap<String, Value>) -> Result<(), ComponentError> {
        if let Some(start) = options.get("start").and_then(Value::as_f64) {
            self.value = start as i64;
        }
        Ok(())
    }

    fn get_attribute(&self, name: &str) -> Option<Value> {
        match name {
            "value" => Some(Value::Int(self.value)),
            _ => None,
        }
    }

    fn attribute_names(&self) -> &'static [&'static str] {
        &["value"]
    }

    fn call_method(&mut self, name: &str, args: &[Value]) -> Result<Vec<PostedEvent>, ActionError> {
        match name {
            "add" => {
                self.value += args.first().and_then(Value::as_f64).unwrap_or(1.0) as i64;
                Ok(vec![])
            }
            "sub" => {
                self.value -= args.first().and_then(Value::as_f64).unwrap_or(1.0) as i64;
                Ok(vec![])
            }
            "reset" => {
                self.value = 0;
                Ok(vec![])
            }
            _ => Err(ActionError::NotCallable(name.to_string())),
        }
    }
}
