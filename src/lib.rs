//! Interpreter for hierarchical state machines described in the CyberiadaML
//! (CGML) dialect: a GraphML-based XML format for statecharts drawn by the
//! Cyberiada graph editor.
//!
//! The pipeline mirrors `harel`'s own shape — read XML, build a typed model,
//! run it — split across a handful of modules:
//!
//! - [`xml`] — generic XML attribute/child tree reader
//! - [`model`] — CGML typed model
//! - [`parser`] — semantic parser turning generic nodes into states,
//!   pseudo-vertices, notes and components
//! - [`lang`] — the action/guard mini-language embedded in trigger text
//! - [`hsm`] — the hierarchical state machine runtime
//! - [`event_loop`] — the FIFO event queue a run dispatches from
//! - [`component`] — the device contract (`Component`) and instance registry
//! - [`driver`] — ties the above together into `build`/`run`
//! - [`checks`] — small assertions over a finished run
//!
//! [`devices`] supplies a handful of ready-made `Component` implementations.

pub mod checks;
pub mod component;
pub mod devices;
pub mod driver;
pub mod event_loop;
pub mod hsm;
pub mod lang;
pub mod model;
pub mod parser;
pub mod xml;

pub use component::{Component, ComponentError, Registry, Value};
pub use driver::{build, run, BuildError, BuildWarning, Runtime, RunOptions, RunResult};
pub use model::{Model, StateMachine};

use thiserror::Error;

/// Any failure from parsing CGML text through to building a runnable
/// machine, unified at this crate's public boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] parser::ModelError),
    #[error(transparent)]
    Build(#[from] driver::BuildError),
    #[error("document declares {0} state machines, expected exactly one")]
    ExpectedSingleMachine(usize),
}

/// Parses CGML text into its full document model. A CGML document may
/// declare more than one top-level state-machine graph, so this returns the
/// whole collection; see [`parse_single`] for the common one-machine case.
pub fn parse(text: &str) -> Result<Model, parser::ModelError> {
    parser::parse(text)
}

/// Parses `text` and requires it to contain exactly one state machine.
pub fn parse_single(text: &str) -> Result<StateMachine, Error> {
    let mut model = parse(text)?;
    if model.machines.len() != 1 {
        return Err(Error::ExpectedSingleMachine(model.machines.len()));
    }
    Ok(model.machines.remove(0))
}
