//! `Reader` — reads a configured message one character at a time, grounded
//! in `original_source/.../visualizers/JuniorReader.py`'s message/speed
//! parameters and character-at-a-time reading loop.

use std::collections::HashMap;

use crate::component::{ActionError, Component, ComponentError, PostedEvent, Value};

#[derive(Debug, Default)]
pub struct Reader {
    message: Vec<char>,
    position: usize,
    chars_per_tick: usize,
    running: bool,
}

impl Component for Reader {
    fn init_from_options(&mut self, options: &HashMap<String, Value>) -> Result<(), ComponentError> {
        if let Some(message) = options.get("message").and_then(Value::as_str) {
            self.message = message.chars().collect();
        }
        self.chars_per_tick = options
            .get("speed")
            .and_then(Value::as_f64)
            .map(|v| v as usize)
            .unwrap_or(1)
            .max(1);
        Ok(())
    }

    fn get_attribute(&self, name: &str) -> Option<Value> {
        match name {
            "position" => Some(Value::Int(self.position as i64)),
            "current_char" => Some(Value::Str(self.message.get(self.position).map(|c| c.to_string()).unwrap_or_default())),
            "done" => Some(Value::Int(i64::from(self.position >= self.message.len()))),
            _ => None,
        }
    }

    fn call_method(&mut self, name: &str, _args: &[Value]) -> Result<Vec<PostedEvent>, ActionError> {
        match name {
            "start" => {
                self.position = 0;
                self.running = true;
                Ok(vec![])
            }
            "stop" => {
                self.running = false;
                Ok(vec![])
            }
            "next_char" => Ok(self.advance()),
            _ => Err(ActionError::NotCallable(name.to_string())),
        }
    }

    fn loop_actions(&mut self) -> Vec<PostedEvent> {
        if !self.running || self.position >= self.message.len() {
            return Vec::new();
        }
        self.advance()
    }

    fn is_active(&self) -> bool {
        self.running
    }

    fn attribute_names(&self) -> &'static [&'static str] {
        &["position", "current_char", "done"]
    }
}

impl Reader {
    /// Advances one tick's worth of characters and reports `char_read`
    /// (followed by `done` on the tick that exhausts the message), whether
    /// driven by `loop_actions` or called directly.
    fn advance(&mut self) -> Vec<PostedEvent> {
        if self.position >= self.message.len() {
            return Vec::new();
        }
        self.position = (self.position + self.chars_per_tick).min(self.message.len());
        if self.position >= self.message.len() {
            self.running = false;
            vec![PostedEvent::called("char_read"), PostedEvent::called("done")]
        } else {
            vec![PostedEvent::called("char_read")]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_with(message: &str, speed: i64) -> Reader {
        let mut reader = Reader::default();
        let mut options = HashMap::new();
        options.insert("message".to_string(), Value::Str(message.to_string()));
        options.insert("speed".to_string(), Value::Int(speed));
        reader.init_from_options(&options).unwrap();
        reader
    }

    #[test]
    fn reads_one_character_per_tick_by_default() {
        let mut reader = reader_with("hi", 1);
        reader.call_method("start", &[]).unwrap();
        reader.loop_actions();
        assert_eq!(reader.get_attribute("position"), Some(Value::Int(1)));
        assert_eq!(reader.get_attribute("current_char"), Some(Value::Str("i".to_string())));
    }

    #[test]
    fn posts_done_on_the_final_tick() {
        let mut reader = reader_with("hi", 2);
        reader.call_method("start", &[]).unwrap();
        let posted = reader.loop_actions();
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[1].name, "done");
        assert_eq!(reader.get_attribute("done"), Some(Value::Int(1)));
    }

    #[test]
    fn next_char_advances_and_reports_char_read_directly() {
        let mut reader = reader_with("hi", 1);
        reader.call_method("start", &[]).unwrap();
        let posted = reader.call_method("next_char", &[]).unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].name, "char_read");
        assert_eq!(reader.get_attribute("position"), Some(Value::Int(1)));
    }
}
