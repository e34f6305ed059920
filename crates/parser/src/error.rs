use common::SourceLoc;
use thiserror::Error;

/// Error raised by a stack action. Raising one aborts the whole parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{0}")]
    Message(String),

    #[error("lookback of {lookback} exceeds stack size {size}")]
    Lookback { lookback: usize, size: usize },

    #[error("{action} action needs {needed} input")]
    WrongInput { action: &'static str, needed: &'static str },
}

impl ActionError {
    pub fn new(msg: impl Into<String>) -> Self {
        ActionError::Message(msg.into())
    }
}

/// Parse failure with location and context information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub msg: String,
    pub loc: SourceLoc,
    pub source_line: String,
}
