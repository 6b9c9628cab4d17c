//! Error types for engine communication, launching, and matches.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;
use uci::ParseError;

/// Errors that can occur when talking to a running engine.
///
/// Variants fall into two classes: I/O errors ([`EngineError::is_io`]) mean
/// the process or its pipes are gone; protocol errors
/// ([`EngineError::is_protocol`]) mean the engine rejected a command or
/// wrote something that does not parse.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Reading from or writing to the engine failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The engine's output stream reached end of file.
    #[error("Engine process exited unexpectedly")]
    Closed,
    /// The engine answered with `No such option:` or `Unknown command:`.
    #[error("Engine rejected command: {0}")]
    Rejected(String),
    /// A search line did not match the expected grammar.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// The operation is not valid in the handle's current state.
    #[error("Engine not ready (state: {0:?})")]
    NotReady(crate::driver::EngineState),
    /// An earlier failure left the handle unusable.
    #[error("Engine is faulted")]
    Faulted,
    /// The channel's cancel token was triggered.
    #[error("Read cancelled")]
    Cancelled,
}

impl EngineError {
    /// Stream closed, process exited, or read/write failure.
    pub fn is_io(&self) -> bool {
        matches!(self, EngineError::Io(_) | EngineError::Closed)
    }

    /// Rejected command or unparseable engine output.
    pub fn is_protocol(&self) -> bool {
        matches!(self, EngineError::Rejected(_) | EngineError::Parse(_))
    }

    /// Whether this error leaves the handle in an unknown state.
    pub(crate) fn faults_handle(&self) -> bool {
        !matches!(self, EngineError::NotReady(_) | EngineError::Faulted)
    }
}

/// Errors that can occur while starting an engine.
///
/// A failed launch never yields a handle; the child process, if one was
/// started, is killed.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The engine configuration is invalid.
    #[error("Invalid engine configuration: {0}")]
    Config(#[from] ConfigError),
    /// The executable could not be started.
    #[error("Failed to spawn engine {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The child process was started without the named pipe.
    #[error("Engine process has no {0} pipe")]
    MissingPipe(&'static str),
    /// Identification or option setup failed.
    #[error("Engine setup failed: {0}")]
    Setup(#[from] EngineError),
}

/// Errors that can occur while playing a match.
#[derive(Error, Debug)]
pub enum MatchError {
    /// The named player's engine failed.
    #[error("Engine error for {player}: {source}")]
    Engine {
        player: String,
        source: EngineError,
    },
    /// An opening move does not have the lexical form of a UCI move.
    #[error("Invalid opening move: {0}")]
    InvalidOpeningMove(String),
}
