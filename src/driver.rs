//! State-machine driver: owns everything one run needs —
//! the state arena, the event loop, the live component instances — and
//! drives the outer loop that feeds events to the HSM until it finishes,
//! times out, or drains dry.
//!
//! `Runtime`/`RunOptions` follow `harel::Scxml`/`ParseOptions`'s
//! plain-struct-with-`Default` shape rather than a builder.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::component::{ActionError, ComponentError, ComponentInstance, Instances, Registry, Value};
use crate::event_loop::EventLoop;
use crate::hsm::{self, Arena, QHsm};
use crate::lang::EvalError;
use crate::model::StateMachine;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Hsm(#[from] hsm::BuildError),
    #[error("unknown component type: {0}")]
    UnknownComponentType(String),
    #[error("component configuration error: {0}")]
    ComponentConfigError(String),
    #[error("guard evaluation failed: {0}")]
    GuardEvaluationError(String),
    #[error("action binding error: {0}")]
    ActionBindingError(String),
    #[error("device fault: {0}")]
    DeviceFault(String),
}

impl From<ComponentError> for BuildError {
    fn from(e: ComponentError) -> Self {
        match e {
            ComponentError::UnknownType(t) => BuildError::UnknownComponentType(t),
            ComponentError::Config(msg) => BuildError::ComponentConfigError(msg),
        }
    }
}

impl From<EvalError> for BuildError {
    fn from(e: EvalError) -> Self {
        match e {
            EvalError::GuardEvaluation(msg) => BuildError::GuardEvaluationError(msg),
            EvalError::ActionBinding(msg) => BuildError::ActionBindingError(msg),
        }
    }
}

impl From<ActionError> for BuildError {
    fn from(e: ActionError) -> Self {
        match e {
            ActionError::NotCallable(msg) => BuildError::ActionBindingError(msg),
            ActionError::DeviceFault(msg) => BuildError::DeviceFault(msg),
        }
    }
}

/// A non-fatal build-time anomaly: an initial vertex with zero or more than
/// one outgoing transition is surfaced, not silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildWarning(pub String);

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub timeout: Duration,
    pub infinite: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions { timeout: Duration::from_secs(5), infinite: false }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunResult {
    pub timed_out: bool,
    pub events: Vec<String>,
    pub called_events: Vec<String>,
    /// A read-only snapshot of every component's public attributes, taken
    /// the moment the run ended — since `Runtime` keeps its live
    /// `Box<dyn Component>` instances for as long as the caller wants to
    /// keep running it, the result carries an owned copy rather than a
    /// borrow tied to `Runtime`'s lifetime.
    pub components: HashMap<String, HashMap<String, Value>>,
}

/// One built, live instance of a machine: the state arena, the running
/// `QHsm`, its component instances, and its event queue.
pub struct Runtime {
    arena: Arena,
    machine: QHsm,
    components: Instances,
    events: EventLoop,
    pub warnings: Vec<BuildWarning>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("current_state", &self.current_state())
            .field("finished", &self.machine.finished)
            .field("warnings", &self.warnings)
            .finish()
    }
}

impl Runtime {
    pub fn current_state(&self) -> &str {
        &self.arena.states[self.machine.current].model_id
    }

    pub fn component_attribute(&self, component_id: &str, attr: &str) -> Option<Value> {
        self.components.get_attribute(component_id, attr)
    }

    pub fn post(&mut self, event: impl Into<String>, is_called: bool) {
        self.events.post(event, is_called);
    }

    pub fn is_finished(&self) -> bool {
        self.machine.finished
    }
}

fn coerce_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        Value::Int(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        Value::Float(f)
    } else {
        Value::Str(raw.to_string())
    }
}

/// Instantiates every declared component, binds `parameters` into each of
/// them, builds the state arena, and runs the initial entry chain.
pub fn build(
    sm: &StateMachine,
    parameters: HashMap<String, Value>,
    registry: &Registry,
) -> Result<Runtime, BuildError> {
    let arena = hsm::build(sm)?;

    let mut instances = HashMap::new();
    for decl in sm.components.values() {
        let mut object = registry.instantiate(&decl.type_name, &decl.id, &decl.parameters)?;
        // The document's own per-component parameters take priority over the
        // caller's shared options, since they're the more specific binding.
        let mut options = parameters.clone();
        for (key, value) in &decl.parameters {
            options.insert(key.clone(), coerce_value(value));
        }
        object.init_from_options(&options)?;
        instances.insert(
            decl.id.clone(),
            ComponentInstance { id: decl.id.clone(), type_name: decl.type_name.clone(), object },
        );
    }
    let mut components = Instances(instances);

    let (machine, _posted_during_init) = QHsm::init(&arena, &mut components)?;

    let warnings = arena.warnings.iter().cloned().map(BuildWarning).collect();

    Ok(Runtime { arena, machine, components, events: EventLoop::new(), warnings })
}

/// Runs `runtime` until it finishes (reaches a terminate vertex), its event
/// queue drains dry, a `"break"` event is dispatched, or `options.timeout`
/// elapses (ignored entirely when `options.infinite` is set).
pub fn run(
    runtime: &mut Runtime,
    pre_posted: Vec<String>,
    options: RunOptions,
) -> Result<RunResult, BuildError> {
    for name in pre_posted {
        runtime.events.post(name, true);
    }

    let deadline = Instant::now() + options.timeout;
    let mut timed_out = false;
    let mut dispatched = Vec::new();

    loop {
        if runtime.machine.finished {
            break;
        }
        if !options.infinite && Instant::now() >= deadline {
            timed_out = true;
            break;
        }

        for posted in runtime.components.poll_loop_actions() {
            runtime.events.post(posted.name, posted.is_called);
        }

        match runtime.events.next() {
            Some(event) if event.name == "break" => break,
            Some(event) => {
                dispatched.push(event.name.clone());
                let posted = runtime.machine.dispatch(&runtime.arena, &event.name, &mut runtime.components)?;
                for p in posted {
                    runtime.events.post(p.name, p.is_called);
                }
            }
            // An empty queue ends the run unless some device is still
            // active (e.g. a running `Timer`) and the run has a deadline
            // left to wait it out against.
            None if options.infinite || !runtime.components.any_active() => break,
            None => {}
        }
    }

    Ok(RunResult {
        timed_out,
        events: dispatched,
        called_events: runtime.events.called_events().to_vec(),
        components: runtime.components.snapshot(),
    })
}
