//! UCI bestmove line parsing.

use crate::{is_move_token, EvaluationInfo, ParseError};
use serde::{Deserialize, Serialize};

/// Move token an engine reports when it has no move or no ponder reply.
pub const NO_MOVE: &str = "(none)";

/// Null move token some engines report instead of [`NO_MOVE`].
pub const NULL_MOVE: &str = "0000";

/// Result of a search: the move to play, the expected reply, and the last
/// evaluation reported before the terminal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestMove {
    /// The move to play in UCI notation.
    pub mv: String,
    /// The reply the engine expects, if reported.
    pub ponder: Option<String>,
    /// The most recent evaluation; `None` if the engine sent no `info` line.
    pub info: Option<EvaluationInfo>,
}

impl BestMove {
    /// Parse a `bestmove <move> [ponder <move>]` line.
    ///
    /// The `info` field is left empty; the caller attaches the evaluation it
    /// retained while reading the search output.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts.first() {
            Some(&"bestmove") => {}
            other => {
                return Err(ParseError::UnexpectedKeyword {
                    expected: "bestmove",
                    found: other.map(|t| t.to_string()).unwrap_or_default(),
                })
            }
        }

        let mv = parts.get(1).ok_or(ParseError::MissingMove)?;
        check_move(mv)?;

        let ponder = match parts.get(3) {
            Some(p) => {
                check_move(p)?;
                Some(p.to_string())
            }
            None => None,
        };

        Ok(BestMove {
            mv: mv.to_string(),
            ponder,
            info: None,
        })
    }

    /// Whether the engine reported that it has no move to play.
    pub fn is_no_move(&self) -> bool {
        self.mv == NO_MOVE || self.mv == NULL_MOVE
    }

    /// `false` only when the ponder move is the explicit `(none)` marker,
    /// meaning the opponent has no reply.
    pub fn has_ponder_reply(&self) -> bool {
        self.ponder.as_deref() != Some(NO_MOVE)
    }

    /// Format as a UCI bestmove line.
    pub fn to_uci(&self) -> String {
        match &self.ponder {
            Some(p) => format!("bestmove {} ponder {}", self.mv, p),
            None => format!("bestmove {}", self.mv),
        }
    }
}

fn check_move(token: &str) -> Result<(), ParseError> {
    if token == NO_MOVE || token == NULL_MOVE || is_move_token(token) {
        Ok(())
    } else {
        Err(ParseError::InvalidMove(token.to_string()))
    }
}

/// Parse a UCI `bestmove` line. See [`BestMove::parse`].
pub fn parse_best_move_line(line: &str) -> Result<BestMove, ParseError> {
    BestMove::parse(line)
}
