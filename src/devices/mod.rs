//! Reference device library: concrete [`crate::component::Component`]
//! implementations a host application can register, or copy as a starting
//! point for its own devices.

pub mod counter;
pub mod cyber_bear;
pub mod gardener;
pub mod impulse;
pub mod reader;
pub mod timer;

use crate::component::{Component, Registry};

/// A [`Registry`] with every device in this module registered under its
/// CGML type name. Convenience for callers who don't need a custom set.
pub fn standard_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register("Counter", Box::new(|_id, _params| Box::new(counter::Counter::default()) as Box<dyn Component>));
    registry.register("Impulse", Box::new(|_id, _params| Box::new(impulse::Impulse) as Box<dyn Component>));
    registry.register("Timer", Box::new(|_id, _params| Box::new(timer::Timer::default()) as Box<dyn Component>));
    registry.register("Gardener", Box::new(|_id, _params| Box::new(gardener::Gardener::default()) as Box<dyn Component>));
    registry.register("CyberBear", Box::new(|_id, _params| Box::new(cyber_bear::CyberBear::default()) as Box<dyn Component>));
    registry.register("Reader", Box::new(|_id, _params| Box::new(reader::Reader::default()) as Box<dyn Component>));
    registry
}
