//! UCI (Universal Chess Interface) protocol library, controller side.
//!
//! This crate formats the commands a controller sends to a chess engine and
//! classifies the lines an engine writes back.
//!
//! # Outbound Commands
//!
//! - `uci` - Identify as a UCI controller
//! - `isready` / `readyok` - Synchronization
//! - `setoption name <name> value <value>` - Configure the engine
//! - `ucinewgame` - Reset for a new game
//! - `position startpos moves <move>...` / `position fen <fen>` - Set position
//! - `go depth <d>` - Start a depth-bounded search
//! - `quit` - Exit engine
//!
//! # Inbound Lines
//!
//! - `info ...` - Search evaluation, see [`parse_info_line`]
//! - `bestmove <move> [ponder <move>]` - Search result, see [`parse_best_move_line`]
//! - `No such option: ...` / `Unknown command: ...` - Rejection diagnostics

mod bestmove;
mod command;
mod info;

pub use bestmove::{parse_best_move_line, BestMove, NO_MOVE, NULL_MOVE};
pub use command::GuiCommand;
pub use info::{
    is_no_move_report, parse_info_line, Bound, EvaluationInfo, InfoLine, Score, REQUIRED_FIELDS,
};

use thiserror::Error;

/// Substrings that mark a line as the engine rejecting a command or option.
pub const REJECTION_MARKERS: [&str; 2] = ["No such option:", "Unknown command:"];

/// Errors produced while parsing engine output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid number for {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Invalid score kind: '{0}'")]
    InvalidScore(String),
    #[error("Invalid move token: '{0}'")]
    InvalidMove(String),
    #[error("No move found in bestmove line")]
    MissingMove,
    #[error("Expected '{expected}', got '{found}'")]
    UnexpectedKeyword {
        expected: &'static str,
        found: String,
    },
}

/// Messages received from an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id {
        name: Option<String>,
        author: Option<String>,
    },
    /// UCI identification complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// The engine rejected the previous command; carries the full line.
    Rejected(String),
    /// Search information.
    Info(InfoLine),
    /// Best move found.
    BestMove(BestMove),
    /// Anything else (option declarations, copyright banners, ...).
    Other(String),
}

impl EngineMessage {
    /// Classify and parse one line of engine output.
    ///
    /// Only `info` and `bestmove` lines can fail: a malformed search report
    /// means the engine speaks a dialect this crate does not understand.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if is_rejection(line) {
            return Ok(EngineMessage::Rejected(line.to_string()));
        }

        let mut parts = line.split_whitespace();
        match parts.next().unwrap_or("") {
            "readyok" => Ok(EngineMessage::ReadyOk),
            "uciok" => Ok(EngineMessage::UciOk),
            "info" => parse_info_line(line).map(EngineMessage::Info),
            "bestmove" => parse_best_move_line(line).map(EngineMessage::BestMove),
            "id" => {
                let rest: Vec<&str> = parts.collect();
                match rest.split_first() {
                    Some((&"name", value)) => Ok(EngineMessage::Id {
                        name: Some(value.join(" ")),
                        author: None,
                    }),
                    Some((&"author", value)) => Ok(EngineMessage::Id {
                        name: None,
                        author: Some(value.join(" ")),
                    }),
                    _ => Ok(EngineMessage::Other(line.to_string())),
                }
            }
            _ => Ok(EngineMessage::Other(line.to_string())),
        }
    }
}

/// Whether the line is a rejection diagnostic (`No such option:` / `Unknown command:`).
pub fn is_rejection(line: &str) -> bool {
    REJECTION_MARKERS.iter().any(|marker| line.contains(marker))
}

/// Whether the line is search output: an `info` or `bestmove` line.
pub fn is_search_output(line: &str) -> bool {
    matches!(line.split_whitespace().next(), Some("info") | Some("bestmove"))
}

/// Whether `token` has the lexical form of a UCI move: file, rank, file,
/// rank, and an optional promotion piece (`e2e4`, `e7e8q`).
///
/// Legality is not checked.
pub fn is_move_token(token: &str) -> bool {
    let bytes = token.as_bytes();
    let is_file = |b: u8| (b'a'..=b'h').contains(&b);
    let square = |f: u8, r: u8| is_file(f) && r.is_ascii_digit();

    match bytes {
        [f1, r1, f2, r2] => square(*f1, *r1) && square(*f2, *r2),
        [f1, r1, f2, r2, promo] => {
            square(*f1, *r1) && square(*f2, *r2) && matches!(*promo, b'q' | b'r' | b'n' | b'b')
        }
        _ => false,
    }
}
