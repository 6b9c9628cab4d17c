//! UCI info line types and parsing.

use crate::{is_move_token, ParseError};
use serde::{Deserialize, Serialize};

/// The integer fields every evaluation line must carry, in the order they
/// are checked.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "depth", "seldepth", "multipv", "nodes", "nps", "tbhits", "time",
];

/// Score in centipawns or mate distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = side to move mates, negative = side to move is mated).
    Mate(i32),
}

impl Default for Score {
    fn default() -> Self {
        Score::Cp(0)
    }
}

impl Score {
    /// The mate distance, if this is a mate score.
    pub fn mate(&self) -> Option<i32> {
        match self {
            Score::Mate(n) => Some(*n),
            Score::Cp(_) => None,
        }
    }
}

/// Marks a score reported from a fail-high or fail-low search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    Lower,
    Upper,
}

/// One parsed evaluation line.
///
/// The `Default` value is the empty evaluation returned for diagnostic
/// notices by [`InfoLine::into_evaluation`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvaluationInfo {
    /// Search depth in plies.
    pub depth: u32,
    /// Selective search depth.
    pub seldepth: u32,
    /// Index of this line when several principal variations are searched.
    pub multipv: u32,
    /// Score evaluation from the side to move's point of view.
    pub score: Score,
    /// Set when the score is only a bound.
    pub bound: Option<Bound>,
    /// Nodes searched.
    pub nodes: u64,
    /// Nodes per second.
    pub nps: u64,
    /// Endgame tablebase hits.
    pub tbhits: u64,
    /// Time spent in milliseconds.
    pub time: u64,
    /// Principal variation (best line found).
    pub pv: Vec<String>,
}

impl EvaluationInfo {
    /// Whether this is the empty evaluation.
    pub fn is_empty(&self) -> bool {
        *self == EvaluationInfo::default()
    }

    /// Format as a UCI info line.
    pub fn to_uci(&self) -> String {
        let score = match self.score {
            Score::Cp(cp) => format!("score cp {}", cp),
            Score::Mate(m) => format!("score mate {}", m),
        };
        let bound = match self.bound {
            Some(Bound::Lower) => " lowerbound",
            Some(Bound::Upper) => " upperbound",
            None => "",
        };

        format!(
            "info depth {} seldepth {} multipv {} {}{} nodes {} nps {} tbhits {} time {} pv {}",
            self.depth,
            self.seldepth,
            self.multipv,
            score,
            bound,
            self.nodes,
            self.nps,
            self.tbhits,
            self.time,
            self.pv.join(" ")
        )
    }
}

/// Result of parsing an `info` line.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoLine {
    /// A full search evaluation.
    Evaluation(EvaluationInfo),
    /// Free-form diagnostic text, e.g.
    /// `info string NNUE evaluation using nn-82215d0fd0df.nnue enabled`.
    Notice(String),
}

impl InfoLine {
    /// The evaluation, or the empty evaluation for a notice.
    pub fn into_evaluation(self) -> EvaluationInfo {
        match self {
            InfoLine::Evaluation(info) => info,
            InfoLine::Notice(_) => EvaluationInfo::default(),
        }
    }
}

/// Whitespace tokenizer that remembers where each token starts, so the
/// principal variation can be taken verbatim from the rest of the line.
#[derive(Clone)]
struct Tokens<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.line[self.pos..];
        let start = self.pos + (rest.len() - rest.trim_start().len());
        let tail = &self.line[start..];
        if tail.is_empty() {
            self.pos = self.line.len();
            return None;
        }
        let len = tail.find(char::is_whitespace).unwrap_or(tail.len());
        self.pos = start + len;
        Some((start, &self.line[start..start + len]))
    }
}

#[derive(Default)]
struct Fields {
    numbers: [Option<u64>; 7],
    score: Option<Score>,
    bound: Option<Bound>,
    pv: Option<Vec<String>>,
}

fn parse_number(field: &'static str, token: Option<(usize, &str)>) -> Result<u64, ParseError> {
    let value = token.map(|(_, t)| t).unwrap_or("");
    value.parse().map_err(|_| ParseError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn narrow(field: &'static str, value: u64) -> Result<u32, ParseError> {
    u32::try_from(value).map_err(|_| ParseError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Parse a UCI `info` line.
///
/// Lines whose first key is `string`, or that report neither a `score` nor a
/// `pv` (progress reports such as `currmove`), are returned as
/// [`InfoLine::Notice`]. Every other line must carry all of
/// [`REQUIRED_FIELDS`], a `score cp|mate <n>` field and a trailing
/// `pv <move>...`; the first missing one is reported by name.
///
/// # Example
///
/// ```
/// use uci::{parse_info_line, InfoLine, Score};
///
/// let line = "info depth 2 seldepth 3 multipv 1 score cp -656 nodes 43 nps 43000 tbhits 0 time 1 pv g7g6 h3g3 g6f7";
/// match parse_info_line(line).unwrap() {
///     InfoLine::Evaluation(info) => {
///         assert_eq!(info.score, Score::Cp(-656));
///         assert_eq!(info.pv, vec!["g7g6", "h3g3", "g6f7"]);
///     }
///     InfoLine::Notice(_) => unreachable!(),
/// }
/// ```
pub fn parse_info_line(line: &str) -> Result<InfoLine, ParseError> {
    let line = line.trim();
    let mut tokens = Tokens::new(line);

    match tokens.next() {
        Some((_, "info")) => {}
        other => {
            return Err(ParseError::UnexpectedKeyword {
                expected: "info",
                found: other.map(|(_, t)| t.to_string()).unwrap_or_default(),
            })
        }
    }

    if let Some((start, "string")) = tokens.clone().next() {
        let text = line[start + "string".len()..].trim();
        return Ok(InfoLine::Notice(text.to_string()));
    }

    let mut fields = Fields::default();
    while let Some((start, token)) = tokens.next() {
        if let Some(idx) = REQUIRED_FIELDS.iter().position(|f| *f == token) {
            let value = parse_number(REQUIRED_FIELDS[idx], tokens.next())?;
            // First occurrence wins.
            fields.numbers[idx].get_or_insert(value);
            continue;
        }

        match token {
            "score" => {
                let kind = tokens.next().map(|(_, t)| t).unwrap_or("");
                let value = tokens.next().map(|(_, t)| t).unwrap_or("");
                let value: i32 = value.parse().map_err(|_| ParseError::InvalidNumber {
                    field: "score",
                    value: value.to_string(),
                })?;
                let score = match kind {
                    "cp" => Score::Cp(value),
                    "mate" => Score::Mate(value),
                    other => return Err(ParseError::InvalidScore(other.to_string())),
                };
                fields.score.get_or_insert(score);
            }
            "lowerbound" => fields.bound = Some(Bound::Lower),
            "upperbound" => fields.bound = Some(Bound::Upper),
            "pv" => {
                // The rest of the line is the move list, whatever it looks like.
                let moves = line[start + "pv".len()..].trim();
                let moves: Vec<String> = moves.split_whitespace().map(str::to_string).collect();
                if let Some(bad) = moves.iter().find(|m| !is_move_token(m)) {
                    return Err(ParseError::InvalidMove(bad.clone()));
                }
                fields.pv = Some(moves);
                break;
            }
            _ => {}
        }
    }

    if fields.score.is_none() && fields.pv.is_none() {
        return Ok(InfoLine::Notice(line["info".len()..].trim().to_string()));
    }

    let mut numbers = [0u64; 7];
    for (idx, field) in REQUIRED_FIELDS.into_iter().enumerate() {
        numbers[idx] = fields.numbers[idx].ok_or(ParseError::MissingField(field))?;
    }
    let score = fields.score.ok_or(ParseError::MissingField("score"))?;
    let pv = match fields.pv {
        Some(pv) if !pv.is_empty() => pv,
        _ => return Err(ParseError::MissingField("pv")),
    };

    Ok(InfoLine::Evaluation(EvaluationInfo {
        depth: narrow("depth", numbers[0])?,
        seldepth: narrow("seldepth", numbers[1])?,
        multipv: narrow("multipv", numbers[2])?,
        score,
        bound: fields.bound,
        nodes: numbers[3],
        nps: numbers[4],
        tbhits: numbers[5],
        time: numbers[6],
        pv,
    }))
}

/// Whether the line is the short report an engine sends before
/// `bestmove (none)` when the side to move has no legal move, such as
/// `info depth 0 score mate 0` or `info depth 0 score cp 0`.
///
/// Such a line has `depth 0` and no `pv`, so [`parse_info_line`] rejects it.
pub fn is_no_move_report(line: &str) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens.first() == Some(&"info")
        && tokens.get(1) != Some(&"string")
        && tokens.windows(2).any(|w| w[0] == "depth" && w[1] == "0")
        && !tokens.contains(&"pv")
}
