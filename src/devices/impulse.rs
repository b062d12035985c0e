//! `Impulse` — a device whose only behavior is marking one of its named
//! methods as an observable "called" event: `imp.impulseB()` yields
//! `called_events = ["impulseB"]`.

use std::collections::HashMap;

use crate::component::{ActionError, Component, ComponentError, PostedEvent, Value};

#[derive(Debug, Default)]
pub struct Impulse;

impl Component for Impulse {
    fn init_from_options(&mut self, _options: &HashMap<String, Value>) -> Result<(), ComponentError> {
        Ok(())
    }

    fn get_attribute(&self, _name: &str) -> Option<Value> {
        None
    }

    fn call_method(&mut self, name: &str, _args: &[Value]) -> Result<Vec<PostedEvent>, ActionError> {
        if name.starts_with("impulse") {
            Ok(vec![PostedEvent::called(name.to_string())])
        } else {
            Err(ActionError::NotCallable(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_methods_post_themselves_as_called_events() {
        let mut impulse = Impulse;
        let posted = impulse.call_method("impulseB", &[]).unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].name, "impulseB");
        assert!(posted[0].is_called);
    }

    #[test]
    fn unrelated_methods_are_rejected() {
        let mut impulse = Impulse;
        assert!(matches!(impulse.call_method("reset", &[]), Err(ActionError::NotCallable(_))));
    }
}
