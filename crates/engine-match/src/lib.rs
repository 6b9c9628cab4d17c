//! Drive UCI chess engines as child processes and play them against each other.
//!
//! - [`channel`]: newline-delimited text exchange with an engine process
//! - [`driver`]: one engine's UCI conversation, with a readiness handshake
//!   after every command
//! - [`orchestrator`]: a match between two engines, alternating turns until
//!   mate, no reply, or the ply ceiling
//! - [`config`]: engine and match settings, loadable from TOML

pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod orchestrator;

pub use channel::{CancelToken, LineChannel};
pub use config::{
    ConfigError, ContemptRange, EngineConfig, EngineOptions, MatchConfig, BASE_OPTIONS,
    DEFAULT_DEPTH, DEFAULT_MAX_MOVES,
};
pub use driver::{Engine, EngineState, ProcessEngine};
pub use error::{EngineError, LaunchError, MatchError};
pub use orchestrator::{Match, MatchReport, MatchState, Player, Side, Termination};
