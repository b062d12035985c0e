//! Hierarchical state machine runtime — a "quantum HSM" in
//! the Miro Samek sense: one active leaf state, dispatch bubbles an
//! unhandled event up through ancestors, and a matched transition unwinds
//! to the least common ancestor (LCA) of the current and target state before
//! entering back down.
//!
//! No teacher analogue exists for the dispatch algorithm itself (`harel` has
//! no runtime, only a parsed tree); the arena shape — states addressed by a
//! small integer id rather than `Rc<RefCell<..>>` — follows the Design
//! Notes' guidance for breaking the cyclic super-state/substate graph, and
//! `harel::StateLike`'s tagged-enum-over-inheritance idiom informs
//! [`RuntimeKind`].

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::component::{Instances, PostedEvent};
use crate::lang::{self, ActionCall, EvalError};
use crate::model::StateMachine;

pub type StateId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Composite,
    Initial,
    Choice,
    Final,
    Terminate,
    ShallowHistory,
}

#[derive(Debug, Clone)]
pub struct RuntimeState {
    pub id: StateId,
    pub model_id: String,
    pub parent: Option<StateId>,
    pub kind: RuntimeKind,
    /// For `Composite` only: the resolved target of its (exactly one)
    /// initial vertex, or `None` if none could be resolved; surfaced as a
    /// build warning rather than silently dropped.
    pub initial_child: Option<StateId>,
    pub entry: Option<Vec<ActionCall>>,
    pub exit: Option<Vec<ActionCall>>,
}

#[derive(Debug, Clone)]
pub struct ParsedTransition {
    pub source: StateId,
    pub target: StateId,
    pub event: String,
    pub guard: Option<String>,
    pub actions: Vec<ActionCall>,
    pub seq: usize,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("transition {0} targets an unresolved vertex {1}")]
    UnresolvedTarget(String, String),
    #[error("no initial vertex with exactly one outgoing transition was found for the top-level machine")]
    NoInitialState,
    #[error("trigger block on {0} failed to parse: {1}")]
    MalformedTrigger(String, EvalError),
}

/// The state tree plus the flattened, pre-parsed transition table. Built
/// once by [`build`] and read-only for the lifetime of a run.
pub struct Arena {
    pub states: Vec<RuntimeState>,
    pub by_model_id: HashMap<String, StateId>,
    pub root: StateId,
    pub transitions: Vec<ParsedTransition>,
    pub warnings: Vec<String>,
}

impl Arena {
    pub fn ancestors(&self, id: StateId) -> Vec<StateId> {
        let mut out = vec![id];
        let mut cursor = id;
        while let Some(parent) = self.states[cursor].parent {
            out.push(parent);
            cursor = parent;
        }
        out
    }

    pub fn lca(&self, a: StateId, b: StateId) -> StateId {
        let ancestors_a: HashSet<StateId> = self.ancestors(a).into_iter().collect();
        self.ancestors(b)
            .into_iter()
            .find(|anc| ancestors_a.contains(anc))
            .unwrap_or(self.root)
    }

    /// Outgoing transitions of `source`, in document order — "first guard
    /// to pass wins" needs a stable order to mean anything.
    pub fn transitions_from(&self, source: StateId) -> Vec<&ParsedTransition> {
        let mut out: Vec<&ParsedTransition> =
            self.transitions.iter().filter(|t| t.source == source).collect();
        out.sort_by_key(|t| t.seq);
        out
    }
}

fn push_vertex(
    states: &mut Vec<RuntimeState>,
    by_model_id: &mut HashMap<String, StateId>,
    parent_of: &mut HashMap<StateId, Option<String>>,
    model_id: &str,
    parent_id: &Option<String>,
    kind: RuntimeKind,
) -> StateId {
    let arena_id = states.len();
    states.push(RuntimeState {
        id: arena_id,
        model_id: model_id.to_string(),
        parent: None,
        kind,
        initial_child: None,
        entry: None,
        exit: None,
    });
    by_model_id.insert(model_id.to_string(), arena_id);
    parent_of.insert(arena_id, parent_id.clone());
    arena_id
}

/// Builds the state arena and transition table from a parsed [`StateMachine`].
pub fn build(sm: &StateMachine) -> Result<Arena, BuildError> {
    let mut states = vec![RuntimeState {
        id: 0,
        model_id: String::new(),
        parent: None,
        kind: RuntimeKind::Composite,
        initial_child: None,
        entry: None,
        exit: None,
    }];
    let mut by_model_id = HashMap::new();
    let mut parent_of: HashMap<StateId, Option<String>> = HashMap::new();

    for (id, state) in &sm.states {
        let blocks = lang::parse_action_block(&state.actions_block)
            .map_err(|e| BuildError::MalformedTrigger(id.clone(), e))?;
        let entry = blocks.iter().find(|b| b.event_name == "entry").map(|b| b.actions.clone());
        let exit = blocks.iter().find(|b| b.event_name == "exit").map(|b| b.actions.clone());
        let arena_id = push_vertex(
            &mut states,
            &mut by_model_id,
            &mut parent_of,
            id,
            &state.parent_id,
            RuntimeKind::Composite,
        );
        states[arena_id].entry = entry;
        states[arena_id].exit = exit;
    }
    for (id, v) in &sm.initials {
        push_vertex(&mut states, &mut by_model_id, &mut parent_of, id, &v.parent_id, RuntimeKind::Initial);
    }
    for (id, v) in &sm.choices {
        push_vertex(&mut states, &mut by_model_id, &mut parent_of, id, &v.parent_id, RuntimeKind::Choice);
    }
    for (id, v) in &sm.finals {
        push_vertex(&mut states, &mut by_model_id, &mut parent_of, id, &v.parent_id, RuntimeKind::Final);
    }
    for (id, v) in &sm.terminates {
        push_vertex(&mut states, &mut by_model_id, &mut parent_of, id, &v.parent_id, RuntimeKind::Terminate);
    }
    for (id, v) in &sm.shallow_history {
        push_vertex(
            &mut states,
            &mut by_model_id,
            &mut parent_of,
            id,
            &v.parent_id,
            RuntimeKind::ShallowHistory,
        );
    }

    for (arena_id, parent_model_id) in &parent_of {
        let resolved = match parent_model_id {
            Some(pid) => by_model_id.get(pid).copied().unwrap_or(0),
            None => 0,
        };
        states[*arena_id].parent = Some(resolved);
    }

    let mut transitions = Vec::new();
    for t in sm.transitions.values() {
        let Some(&source) = by_model_id.get(&t.source_id) else {
            continue; // source is a component/unknown node; not a reachable vertex
        };
        let Some(&target) = by_model_id.get(&t.target_id) else {
            return Err(BuildError::UnresolvedTarget(t.id.clone(), t.target_id.clone()));
        };
        let blocks = lang::parse_action_block(&t.trigger_block)
            .map_err(|e| BuildError::MalformedTrigger(t.id.clone(), e))?;
        for block in blocks {
            transitions.push(ParsedTransition {
                source,
                target,
                event: block.event_name,
                guard: block.guard,
                actions: block.actions,
                seq: t.seq,
            });
        }
    }

    let mut arena = Arena { states, by_model_id, root: 0, transitions, warnings: Vec::new() };

    let composite_ids: Vec<StateId> = arena
        .states
        .iter()
        .filter(|s| s.kind == RuntimeKind::Composite)
        .map(|s| s.id)
        .collect();
    for composite_id in composite_ids {
        let initial_vertices: Vec<StateId> = arena
            .states
            .iter()
            .filter(|s| s.kind == RuntimeKind::Initial && s.parent == Some(composite_id))
            .map(|s| s.id)
            .collect();
        let mut resolved = None;
        for init_id in initial_vertices {
            let outgoing = arena.transitions_from(init_id);
            if outgoing.len() == 1 {
                resolved = Some(outgoing[0].target);
            } else {
                arena.warnings.push(format!(
                    "initial vertex {} has {} outgoing transitions, expected exactly 1",
                    arena.states[init_id].model_id,
                    outgoing.len()
                ));
            }
        }
        arena.states[composite_id].initial_child = resolved;
    }

    if arena.states[arena.root].initial_child.is_none() {
        return Err(BuildError::NoInitialState);
    }

    Ok(arena)
}

/// One running instance of the machine. `current` is always a concrete leaf
/// (never a pseudo-vertex); `effective`/`target` from the bubble-search and
/// LCA walk are scratch registers local to [`QHsm::dispatch`], not persisted
/// between calls — keeping stale search state around between events would
/// be meaningless once the active configuration has changed.
pub struct QHsm {
    pub current: StateId,
    history: HashMap<StateId, StateId>,
    pub finished: bool,
}

impl QHsm {
    /// Enters the arena's root initial chain, running every entry action
    /// from the top down to the resolved leaf — the `Q_INIT_SIG` sequence.
    pub fn init(arena: &Arena, components: &mut Instances) -> Result<(Self, Vec<PostedEvent>), EvalError> {
        let mut machine = QHsm { current: arena.root, history: HashMap::new(), finished: false };
        let mut posted = Vec::new();
        let start = arena.states[arena.root]
            .initial_child
            .expect("build() guarantees the root resolves an initial vertex");
        let leaf = machine.enter_and_resolve(arena, start, components, &mut posted)?;
        machine.current = leaf;
        Ok((machine, posted))
    }

    /// Dispatches one event, bubbling up the ancestor chain from `current`
    /// until some ancestor declares a matching, guard-passing transition (or
    /// none do, in which case the event is ignored).
    pub fn dispatch(
        &mut self,
        arena: &Arena,
        event: &str,
        components: &mut Instances,
    ) -> Result<Vec<PostedEvent>, EvalError> {
        if self.finished {
            return Ok(Vec::new());
        }
        let mut posted = Vec::new();
        let mut effective = self.current;
        loop {
            if let Some((target, actions)) = self.select_transition(arena, effective, event, components)? {
                self.do_transition(arena, target, &actions, components, &mut posted)?;
                return Ok(posted);
            }
            match arena.states[effective].parent {
                Some(parent) => effective = parent,
                None => return Ok(posted), // unhandled at the root: ignored
            }
        }
    }

    /// Picks the first guard-passing transition out of `source` matching
    /// `event` (an `else`-guarded one only if nothing else matches), and
    /// returns its target plus the action list to run while transitioning.
    fn select_transition(
        &self,
        arena: &Arena,
        source: StateId,
        event: &str,
        components: &Instances,
    ) -> Result<Option<(StateId, Vec<ActionCall>)>, EvalError> {
        let candidates = arena.transitions_from(source);
        let mut fallback = None;
        for t in &candidates {
            if t.event != event {
                continue;
            }
            if t.guard.as_deref() == Some("else") {
                fallback.get_or_insert(*t);
                continue;
            }
            if lang::evaluate_guard(t.guard.as_deref(), components)? {
                return Ok(Some((t.target, t.actions.clone())));
            }
        }
        Ok(fallback.map(|t| (t.target, t.actions.clone())))
    }

    fn do_transition(
        &mut self,
        arena: &Arena,
        target: StateId,
        actions: &[ActionCall],
        components: &mut Instances,
        posted: &mut Vec<PostedEvent>,
    ) -> Result<(), EvalError> {
        let lca = if self.current == target {
            arena.states[self.current].parent.unwrap_or(self.current)
        } else {
            arena.lca(self.current, target)
        };

        // The transition's own action runs as part of resolving the match
        // that produced this transition, before anything exits — the same
        // handler call that returned TRAN already fired it.
        for action in actions {
            posted.extend(lang::execute_action(action, components)?);
        }

        let mut exit_id = self.current;
        while exit_id != lca {
            let state = &arena.states[exit_id];
            if let Some(exit_actions) = &state.exit {
                for action in exit_actions {
                    posted.extend(lang::execute_action(action, components)?);
                }
            }
            if let Some(parent) = state.parent {
                self.history.insert(parent, exit_id);
                exit_id = parent;
            } else {
                break;
            }
        }

        let mut enter_path = Vec::new();
        let mut cursor = target;
        while cursor != lca {
            enter_path.push(cursor);
            match arena.states[cursor].parent {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        enter_path.reverse();
        for id in &enter_path {
            if let Some(entry_actions) = &arena.states[*id].entry {
                for action in entry_actions {
                    posted.extend(lang::execute_action(action, components)?);
                }
            }
        }

        self.current = self.resolve_into_leaf(arena, target, components, posted)?;
        Ok(())
    }

    fn enter_and_resolve(
        &mut self,
        arena: &Arena,
        id: StateId,
        components: &mut Instances,
        posted: &mut Vec<PostedEvent>,
    ) -> Result<StateId, EvalError> {
        if let Some(entry) = &arena.states[id].entry {
            for action in entry {
                posted.extend(lang::execute_action(action, components)?);
            }
        }
        self.resolve_into_leaf(arena, id, components, posted)
    }

    /// Walks down through composite/choice/history pseudo-vertices until a
    /// concrete leaf (a real state, final, or terminate vertex) is reached,
    /// running entry actions along the way.
    fn resolve_into_leaf(
        &mut self,
        arena: &Arena,
        id: StateId,
        components: &mut Instances,
        posted: &mut Vec<PostedEvent>,
    ) -> Result<StateId, EvalError> {
        match arena.states[id].kind {
            RuntimeKind::Composite => match arena.states[id].initial_child {
                Some(child) => self.enter_and_resolve(arena, child, components, posted),
                None => Ok(id),
            },
            RuntimeKind::Initial => match arena.transitions_from(id).into_iter().next() {
                Some(t) => self.enter_and_resolve(arena, t.target, components, posted),
                None => Ok(id),
            },
            RuntimeKind::Choice => {
                let target = self.evaluate_choice(arena, id, components)?;
                self.enter_and_resolve(arena, target, components, posted)
            }
            RuntimeKind::ShallowHistory => {
                let parent = arena.states[id].parent.unwrap_or(id);
                match self.history.get(&parent).copied() {
                    Some(previous) => self.enter_and_resolve(arena, previous, components, posted),
                    None => self.resolve_into_leaf(arena, parent, components, posted),
                }
            }
            RuntimeKind::Terminate => {
                self.finished = true;
                Ok(id)
            }
            RuntimeKind::Final => Ok(id),
        }
    }

    fn evaluate_choice(
        &self,
        arena: &Arena,
        choice_id: StateId,
        components: &Instances,
    ) -> Result<StateId, EvalError> {
        let candidates = arena.transitions_from(choice_id);
        let mut fallback = None;
        for t in &candidates {
            if t.guard.as_deref() == Some("else") {
                fallback.get_or_insert(t.target);
                continue;
            }
            if lang::evaluate_guard(t.guard.as_deref(), components)? {
                return Ok(t.target);
            }
        }
        fallback.ok_or_else(|| {
            EvalError::GuardEvaluation(format!(
                "choice vertex {} has no passing guard and no else branch",
                arena.states[choice_id].model_id
            ))
        })
    }
}
