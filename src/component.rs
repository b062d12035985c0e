//! Component protocol and the device instances a running
//! machine owns for the duration of one run.
//!
//! No reflection: just a trait every device implements directly, the same
//! way `harel`'s executable-content enum dispatches on a known, closed set
//! of tags rather than reflecting over arbitrary SCXML elements.

use std::collections::HashMap;

use thiserror::Error;

/// The argument/attribute value type passed across the component boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// An event a component asks the driver to post on its behalf, e.g. a
/// device method marking itself as an observable "called" signal
/// (`imp.impulseB()` yields `called_events = ["impulseB"]`).
#[derive(Debug, Clone)]
pub struct PostedEvent {
    pub name: String,
    pub is_called: bool,
}

impl PostedEvent {
    pub fn called(name: impl Into<String>) -> Self {
        PostedEvent { name: name.into(), is_called: true }
    }

    pub fn internal(name: impl Into<String>) -> Self {
        PostedEvent { name: name.into(), is_called: false }
    }
}

/// Errors a component implementation can raise.
#[derive(Debug, Error, Clone)]
pub enum ComponentError {
    #[error("unknown component type: {0}")]
    UnknownType(String),
    #[error("component configuration error: {0}")]
    Config(String),
}

/// Errors raised while invoking an action (`component.method(args)`).
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    #[error("{0} is not a callable method on this component")]
    NotCallable(String),
    #[error("device fault: {0}")]
    DeviceFault(String),
}

/// The contract every virtual device satisfies.
pub trait Component {
    /// One-shot binding of collaborator objects/parameters shared across
    /// the whole machine run.
    fn init_from_options(&mut self, options: &HashMap<String, Value>) -> Result<(), ComponentError>;

    /// Reads a public attribute by name, for use in guards/arguments.
    fn get_attribute(&self, name: &str) -> Option<Value>;

    /// Invokes a public method positionally; may return events the device
    /// wants posted as a result (e.g. marking itself as "called").
    fn call_method(&mut self, name: &str, args: &[Value]) -> Result<Vec<PostedEvent>, ActionError>;

    /// Optional periodic hook, called once per outer-loop iteration before
    /// the next event is fetched.
    fn loop_actions(&mut self) -> Vec<PostedEvent> {
        Vec::new()
    }

    /// Whether this device might still post events on its own (e.g. a
    /// running timer). The driver uses this to decide whether an empty
    /// event queue means the run is done, or just waiting on a device tick.
    fn is_active(&self) -> bool {
        false
    }

    /// Names of the public attributes [`Component::get_attribute`] answers
    /// for, used to take a read-only snapshot of a finished run without
    /// requiring a generic reflection mechanism.
    fn attribute_names(&self) -> &'static [&'static str] {
        &[]
    }
}

/// A factory that knows how to construct one device type.
pub type ComponentFactory =
    Box<dyn Fn(&str, &HashMap<String, String>) -> Box<dyn Component>>;

/// Maps declared component type names to constructors, resolved through an
/// explicit registry the caller populates rather than any reflection over
/// type names (see DESIGN.md).
#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, ComponentFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_name: impl Into<String>, factory: ComponentFactory) {
        self.factories.insert(type_name.into(), factory);
    }

    pub fn instantiate(
        &self,
        type_name: &str,
        id: &str,
        parameters: &HashMap<String, String>,
    ) -> Result<Box<dyn Component>, ComponentError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| ComponentError::UnknownType(type_name.to_string()))?;
        Ok(factory(id, parameters))
    }
}

/// A live device bound to its declared id and type name.
pub struct ComponentInstance {
    pub id: String,
    pub type_name: String,
    pub object: Box<dyn Component>,
}

/// The set of component instances owned by one run, keyed by declared id.
#[derive(Default)]
pub struct Instances(pub HashMap<String, ComponentInstance>);

impl Instances {
    pub fn get_attribute(&self, component_id: &str, attr: &str) -> Option<Value> {
        self.0.get(component_id)?.object.get_attribute(attr)
    }

    pub fn call_method(
        &mut self,
        component_id: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Vec<PostedEvent>, ActionError> {
        match self.0.get_mut(component_id) {
            Some(instance) => instance.object.call_method(method, args),
            None => Err(ActionError::NotCallable(format!("{component_id}.{method}"))),
        }
    }

    pub fn poll_loop_actions(&mut self) -> Vec<PostedEvent> {
        let mut out = Vec::new();
        for instance in self.0.values_mut() {
            out.extend(instance.object.loop_actions());
        }
        out
    }

    pub fn any_active(&self) -> bool {
        self.0.values().any(|instance| instance.object.is_active())
    }

    /// A read-only, owned snapshot of every instance's public attributes,
    /// keyed by declared id — the shape `driver::RunResult` hands back once
    /// a run is over, since the live `Box<dyn Component>` objects themselves
    /// cannot outlive the `Runtime` that owns them.
    pub fn snapshot(&self) -> HashMap<String, HashMap<String, Value>> {
        self.0
            .iter()
            .map(|(id, instance)| {
                let attrs = instance
                    .object
                    .attribute_names()
                    .iter()
                    .filter_map(|&name| Some((name.to_string(), instance.object.get_attribute(name)?)))
                    .collect();
                (id.clone(), attrs)
            })
            .collect()
    }
}
