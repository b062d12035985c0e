//! `Timer` — a host-driven wall clock. It posts nothing on its own; a host
//! feeds elapsed wall-clock milliseconds into `init_from_options` as they
//! pass, and a trigger block reads `elapsed_ms` in a guard (e.g. against
//! `duration_ms`) to decide when time is up, the same way a guarded
//! self-loop reads a `Counter`'s `value`.

use std::collections::HashMap;

use crate::component::{ActionError, Component, ComponentError, PostedEvent, Value};

#[derive(Debug)]
pub struct Timer {
    duration_ms: i64,
    elapsed_ms: i64,
    running: bool,
}

impl Default for Timer {
    fn default() -> Self {
        Timer { duration_ms: 1, elapsed_ms: 0, running: false }
    }
}

impl Component for Timer {
    fn init_from_options(&mut self, options: &HashMap<String, Value>) -> Result<(), ComponentError> {
        if let Some(duration) = options.get("duration").and_then(Value::as_f64) {
            self.duration_ms = duration as i64;
        }
        if let Some(delta) = options.get("delta_ms").and_then(Value::as_f64) {
            self.elapsed_ms += delta as i64;
        }
        Ok(())
    }

    fn get_attribute(&self, name: &str) -> Option<Value> {
        match name {
            "elapsed_ms" => Some(Value::Int(self.elapsed_ms)),
            "duration_ms" => Some(Value::Int(self.duration_ms)),
            "running" => Some(Value::Int(i64::from(self.running))),
            _ => None,
        }
    }

    fn attribute_names(&self) -> &'static [&'static str] {
        &["elapsed_ms", "duration_ms", "running"]
    }

    fn call_method(&mut self, name: &str, _args: &[Value]) -> Result<Vec<PostedEvent>, ActionError> {
        match name {
            "start" => {
                self.running = true;
                self.elapsed_ms = 0;
                Ok(vec![])
            }
            "stop" => {
                self.running = false;
                Ok(vec![])
            }
            "reset" => {
                self.elapsed_ms = 0;
                Ok(vec![])
            }
            _ => Err(ActionError::NotCallable(name.to_string())),
        }
    }

    fn is_active(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_ms_option_accumulates_elapsed_ms() {
        let mut timer = Timer { duration_ms: 2, elapsed_ms: 0, running: true };
        let mut options = HashMap::new();
        options.insert("delta_ms".to_string(), Value::Int(1));
        timer.init_from_options(&options).unwrap();
        timer.init_from_options(&options).unwrap();
        assert_eq!(timer.get_attribute("elapsed_ms"), Some(Value::Int(2)));
    }

    #[test]
    fn loop_actions_posts_nothing_on_its_own() {
        let mut timer = Timer::default();
        timer.call_method("start", &[]).unwrap();
        assert!(timer.loop_actions().is_empty());
    }

    #[test]
    fn stopped_timer_is_not_active() {
        let mut timer = Timer::default();
        assert!(!timer.is_active());
        timer.call_method("start", &[]).unwrap();
        assert!(timer.is_active());
        timer.call_method("stop", &[]).unwrap();
        assert!(!timer.is_active());
    }

    #[test]
    fn reset_zeroes_elapsed_ms() {
        let mut timer = Timer { duration_ms: 10, elapsed_ms: 7, running: true };
        timer.call_method("reset", &[]).unwrap();
        assert_eq!(timer.get_attribute("elapsed_ms"), Some(Value::Int(0)));
    }
}
