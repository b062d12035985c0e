//! CGML typed model.
//!
//! Schema-accurate containers for the state-machine graph. No parsing
//! logic lives here — only the types
//! that [`crate::parser`] fills in, in the spirit of `harel`'s `Scxml`/
//! `State`/`Transition` structs: plain public fields, `Option<T>` for data
//! that may be absent, `Vec`/`HashMap` for repeated children.

use std::collections::HashMap;

/// A textual identifier as it appears in the CGML document (a GraphML
/// `node`/`edge` `id` attribute, or a component's declared logical id).
pub type Id = String;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The machine-wide `CGML_META` note. `id` is the underlying graph node id
/// of the note itself (used to recognize and discard component-anchor
/// transitions); `values` holds the parsed key/value pairs.
#[derive(Debug, Clone, Default)]
pub struct Meta {
    pub id: Id,
    pub values: HashMap<String, String>,
}

/// A user-declared component (device), produced from a formal
/// `CGML_COMPONENT` note. `id` and `type_name` are pulled out of the note's
/// `key/value` parameter block and removed from `parameters`.
#[derive(Debug, Clone)]
pub struct ComponentDecl {
    pub id: Id,
    pub type_name: String,
    pub parameters: HashMap<String, String>,
}

/// An ordinary composite state: may contain nested substates reachable
/// through a child initial vertex.
#[derive(Debug, Clone)]
pub struct State {
    pub id: Id,
    pub name: Option<String>,
    pub actions_block: String,
    pub parent_id: Option<Id>,
    pub bounds: Option<Rect>,
    pub color: Option<String>,
}

/// A transition edge. `seq` records the document order in which the edge
/// was declared — needed so that "first guard to pass wins" has a
/// well-defined order once transitions are grouped by source state into a
/// map.
#[derive(Debug, Clone)]
pub struct Transition {
    pub id: Id,
    pub source_id: Id,
    pub target_id: Id,
    pub trigger_block: String,
    pub waypoints: Vec<Point>,
    pub label_position: Option<Point>,
    pub color: Option<String>,
    pub seq: usize,
}

#[derive(Debug, Clone)]
pub struct InitialVertex {
    pub id: Id,
    pub parent_id: Option<Id>,
}

#[derive(Debug, Clone)]
pub struct ChoiceVertex {
    pub id: Id,
    pub parent_id: Option<Id>,
}

#[derive(Debug, Clone)]
pub struct FinalVertex {
    pub id: Id,
    pub parent_id: Option<Id>,
}

#[derive(Debug, Clone)]
pub struct TerminateVertex {
    pub id: Id,
    pub parent_id: Option<Id>,
}

#[derive(Debug, Clone)]
pub struct ShallowHistoryVertex {
    pub id: Id,
    pub parent_id: Option<Id>,
}

/// A pseudo-vertex whose `dVertex` subtype the parser does not recognize.
/// Retained rather than rejected; a transition targeting one fails at
/// build time with `UnresolvedTarget`.
#[derive(Debug, Clone)]
pub struct UnknownVertex {
    pub id: Id,
    pub parent_id: Option<Id>,
    pub subtype: String,
}

/// An informal note retained only for inspection (never a meta/component).
#[derive(Debug, Clone)]
pub struct Note {
    pub id: Id,
    pub parent_id: Option<Id>,
    pub name: Option<String>,
    pub text: String,
}

/// The immutable, parsed state-machine graph.
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    pub platform: String,
    pub standard_version: String,
    pub meta: Meta,
    pub name: Option<String>,
    pub states: HashMap<Id, State>,
    pub transitions: HashMap<Id, Transition>,
    pub components: HashMap<Id, ComponentDecl>,
    pub initials: HashMap<Id, InitialVertex>,
    pub choices: HashMap<Id, ChoiceVertex>,
    pub finals: HashMap<Id, FinalVertex>,
    pub terminates: HashMap<Id, TerminateVertex>,
    pub shallow_history: HashMap<Id, ShallowHistoryVertex>,
    pub unknown_vertices: HashMap<Id, UnknownVertex>,
    pub notes: Vec<Note>,
}

impl StateMachine {
    /// Every transition whose `source_id` equals this id, in document order.
    pub fn transitions_from<'a>(&'a self, source_id: &'a str) -> Vec<&'a Transition> {
        let mut out: Vec<&Transition> = self
            .transitions
            .values()
            .filter(|t| t.source_id == source_id)
            .collect();
        out.sort_by_key(|t| t.seq);
        out
    }

    /// True if `id` names a state or any pseudo-vertex in this machine.
    pub fn resolves(&self, id: &str) -> bool {
        self.states.contains_key(id)
            || self.initials.contains_key(id)
            || self.choices.contains_key(id)
            || self.finals.contains_key(id)
            || self.terminates.contains_key(id)
            || self.shallow_history.contains_key(id)
            || self.unknown_vertices.contains_key(id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub machines: Vec<StateMachine>,
}
