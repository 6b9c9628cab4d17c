//! Match orchestration between two engines.
//!
//! A [`Match`] owns both engines and the [`MatchState`]. Turns alternate by
//! the parity of the move history: even length means white to move. Each
//! turn sends the full history to the side to move, asks it for a move and
//! appends the answer.
//!
//! A match ends when:
//! - the history reaches the ply ceiling (no winner),
//! - the side to move reports a mate score (positive: it wins, negative: the
//!   opponent wins, zero: no winner),
//! - the engine reports `(none)` as its ponder move, meaning the opponent has
//!   no reply (no winner),
//! - the engine reports no move at all (no winner).

use crate::driver::Engine;
use crate::error::{EngineError, MatchError};
use rand::Rng;
use serde::Serialize;
use std::cmp::Ordering;
use std::io::{BufRead, Write};
use uci::{BestMove, Score};

/// A side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// The side to move after `plies` half-moves from the start position.
    pub fn to_move(plies: usize) -> Side {
        if plies % 2 == 0 {
            Side::White
        } else {
            Side::Black
        }
    }

    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The side to move reported a forced mate.
    ForcedMate,
    /// The ply ceiling was reached.
    MoveLimit,
    /// The ponder move was `(none)`: the opponent has no reply.
    NoReply,
    /// The engine had no move to play.
    NoLegalMove,
}

/// A named engine taking part in a match.
pub struct Player<R: BufRead, W: Write> {
    pub id: String,
    pub engine: Engine<R, W>,
}

impl<R: BufRead, W: Write> Player<R, W> {
    pub fn new(id: impl Into<String>, engine: Engine<R, W>) -> Self {
        Self {
            id: id.into(),
            engine,
        }
    }
}

/// Side assignment, move history and outcome of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchState {
    white: String,
    black: String,
    moves: Vec<String>,
    winner: Option<Side>,
    termination: Option<Termination>,
    max_moves: usize,
}

impl MatchState {
    fn new(white: String, black: String, max_moves: usize) -> Self {
        Self {
            white,
            black,
            moves: Vec::new(),
            winner: None,
            termination: None,
            max_moves,
        }
    }

    /// Player id assigned to `side`.
    pub fn player(&self, side: Side) -> &str {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    /// Moves played so far, in order.
    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn side_to_move(&self) -> Side {
        Side::to_move(self.moves.len())
    }

    pub fn winning_side(&self) -> Option<Side> {
        self.winner
    }

    /// Id of the winning player, `None` while playing or for a draw.
    pub fn winner(&self) -> Option<&str> {
        self.winner.map(|side| self.player(side))
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn max_moves(&self) -> usize {
        self.max_moves
    }

    pub fn is_over(&self) -> bool {
        self.termination.is_some()
    }

    fn finish(&mut self, termination: Termination, winner: Option<Side>) {
        self.termination = Some(termination);
        self.winner = winner;
        tracing::info!(
            ?termination,
            winner = self.winner().unwrap_or("none"),
            plies = self.moves.len(),
            "Match finished"
        );
    }
}

/// Summary of a match, suitable for JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub white: String,
    pub black: String,
    pub moves: Vec<String>,
    pub winner: Option<String>,
    pub termination: Option<Termination>,
}

impl From<&MatchState> for MatchReport {
    fn from(state: &MatchState) -> Self {
        Self {
            white: state.white.clone(),
            black: state.black.clone(),
            moves: state.moves.clone(),
            winner: state.winner().map(str::to_string),
            termination: state.termination,
        }
    }
}

/// A match between two engines.
pub struct Match<R: BufRead, W: Write> {
    white: Engine<R, W>,
    black: Engine<R, W>,
    state: MatchState,
}

impl<R: BufRead, W: Write> Match<R, W> {
    /// Creates a match, assigning colours at random.
    ///
    /// Both engines receive `ucinewgame`.
    pub fn new(a: Player<R, W>, b: Player<R, W>, max_moves: usize) -> Result<Self, MatchError> {
        Self::with_rng(a, b, max_moves, &mut rand::thread_rng())
    }

    /// Like [`Match::new`], drawing the colour assignment from `rng`.
    pub fn with_rng<G: Rng + ?Sized>(
        a: Player<R, W>,
        b: Player<R, W>,
        max_moves: usize,
        rng: &mut G,
    ) -> Result<Self, MatchError> {
        if rng.gen_bool(0.5) {
            Self::with_sides(a, b, max_moves)
        } else {
            Self::with_sides(b, a, max_moves)
        }
    }

    /// Creates a match with a fixed colour assignment.
    pub fn with_sides(
        white: Player<R, W>,
        black: Player<R, W>,
        max_moves: usize,
    ) -> Result<Self, MatchError> {
        let Player {
            id: white_id,
            engine: mut white_engine,
        } = white;
        let Player {
            id: black_id,
            engine: mut black_engine,
        } = black;

        white_engine
            .new_game()
            .map_err(|source| engine_error(&white_id, source))?;
        black_engine
            .new_game()
            .map_err(|source| engine_error(&black_id, source))?;

        tracing::info!(white = %white_id, black = %black_id, max_moves, "Match created");

        Ok(Self {
            white: white_engine,
            black: black_engine,
            state: MatchState::new(white_id, black_id, max_moves),
        })
    }

    /// Seeds the history with moves played from the start position.
    ///
    /// The side to move afterwards follows from the number of moves.
    pub fn with_opening(mut self, moves: Vec<String>) -> Result<Self, MatchError> {
        if let Some(bad) = moves.iter().find(|m| !uci::is_move_token(m)) {
            return Err(MatchError::InvalidOpeningMove(bad.clone()));
        }
        self.state.moves = moves;
        Ok(self)
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn report(&self) -> MatchReport {
        MatchReport::from(&self.state)
    }

    /// Plays one ply. Returns `false` once the match is over.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Engine`] naming the player whose engine failed.
    /// The state is left unchanged.
    pub fn advance(&mut self) -> Result<bool, MatchError> {
        if self.state.is_over() {
            return Ok(false);
        }
        if self.state.moves.len() >= self.state.max_moves {
            self.state.finish(Termination::MoveLimit, None);
            return Ok(false);
        }

        let side = self.state.side_to_move();
        let engine = match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        };
        let best = play_turn(engine, &self.state.moves)
            .map_err(|source| engine_error(self.state.player(side), source))?;

        tracing::debug!(?side, mv = %best.mv, ponder = ?best.ponder, "Move played");

        if best.is_no_move() {
            self.state.finish(Termination::NoLegalMove, None);
            return Ok(false);
        }
        self.state.moves.push(best.mv.clone());

        if let Some(Score::Mate(n)) = best.info.as_ref().map(|info| info.score) {
            let winner = match n.cmp(&0) {
                Ordering::Greater => Some(side),
                Ordering::Less => Some(side.opponent()),
                // Mate 0 has no defined winner.
                Ordering::Equal => None,
            };
            self.state.finish(Termination::ForcedMate, winner);
            return Ok(false);
        }

        if !best.has_ponder_reply() {
            self.state.finish(Termination::NoReply, None);
            return Ok(false);
        }

        Ok(true)
    }

    /// Plays until the match is over and returns the winner's id, or `None`
    /// for a draw.
    pub fn run(&mut self) -> Result<Option<String>, MatchError> {
        while self.advance()? {}
        Ok(self.state.winner().map(str::to_string))
    }

    /// Ends the match and hands back the engines as `(white, black)`.
    pub fn into_players(self) -> (Player<R, W>, Player<R, W>) {
        let Match {
            white,
            black,
            state,
        } = self;
        (
            Player::new(state.white, white),
            Player::new(state.black, black),
        )
    }
}

fn play_turn<R: BufRead, W: Write>(
    engine: &mut Engine<R, W>,
    moves: &[String],
) -> Result<BestMove, EngineError> {
    engine.set_position(moves)?;
    engine.compute_best_move()
}

fn engine_error(player: &str, source: EngineError) -> MatchError {
    MatchError::Engine {
        player: player.to_string(),
        source,
    }
}
