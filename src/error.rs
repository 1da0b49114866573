//! Error handling for session setup, configuration loading and the control loop

use std::io;
use thiserror::Error;

use crate::goal::InputSource;

/// Unified error of the teleoperation pipeline.
#[derive(Debug, Error)]
pub enum TeleopError {
    /// A resource required to start the session (solver configuration, robot description)
    /// cannot be found. Fatal for the session.
    #[error("Missing resource {resource}: {path}")]
    MissingResource { resource: String, path: String },

    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse Error: {0}")]
    Parse(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Solver Error: {0}")]
    Solver(String),

    /// Another input producer currently owns the goal.
    #[error("Input {requested:?} cannot engage while {active:?} is active")]
    InputBusy { requested: InputSource, active: InputSource },

    #[error("Invalid joint count: expected {expected}, found {found}")]
    JointCount { expected: usize, found: usize },
}
