//! UCI command formatting.

/// Commands sent from the controller to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// Set a named engine option.
    SetOption { name: String, value: String },
    /// The next search belongs to a different game.
    UciNewGame,
    /// Set up the start position followed by the given moves.
    Position { moves: Vec<String> },
    /// Set up a position given in FEN, passed through verbatim.
    PositionFen(String),
    /// Search to a fixed depth.
    GoDepth(u32),
    /// Quit the engine.
    Quit,
}

impl GuiCommand {
    /// Format the command as a single protocol line (without newline).
    pub fn to_uci(&self) -> String {
        match self {
            GuiCommand::Uci => "uci".to_string(),
            GuiCommand::IsReady => "isready".to_string(),
            GuiCommand::SetOption { name, value } => {
                format!("setoption name {} value {}", name, value)
            }
            GuiCommand::UciNewGame => "ucinewgame".to_string(),
            GuiCommand::Position { moves } => {
                format!("position startpos moves {}", moves.join(" "))
            }
            GuiCommand::PositionFen(fen) => format!("position fen {}", fen),
            GuiCommand::GoDepth(depth) => format!("go depth {}", depth),
            GuiCommand::Quit => "quit".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_simple_commands() {
        assert_eq!(GuiCommand::Uci.to_uci(), "uci");
        assert_eq!(GuiCommand::IsReady.to_uci(), "isready");
        assert_eq!(GuiCommand::UciNewGame.to_uci(), "ucinewgame");
        assert_eq!(GuiCommand::Quit.to_uci(), "quit");
        assert_eq!(GuiCommand::GoDepth(12).to_uci(), "go depth 12");
    }

    #[test]
    fn format_setoption_with_spaces_in_name() {
        let cmd = GuiCommand::SetOption {
            name: "Skill Level".to_string(),
            value: "20".to_string(),
        };
        assert_eq!(cmd.to_uci(), "setoption name Skill Level value 20");
    }

    #[test]
    fn format_position_startpos() {
        let cmd = GuiCommand::Position { moves: vec![] };
        assert_eq!(cmd.to_uci(), "position startpos moves ");
    }

    #[test]
    fn format_position_startpos_with_moves() {
        let cmd = GuiCommand::Position {
            moves: vec!["e2e4".to_string(), "e7e5".to_string()],
        };
        assert_eq!(cmd.to_uci(), "position startpos moves e2e4 e7e5");
    }

    #[test]
    fn format_position_fen() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        assert_eq!(
            GuiCommand::PositionFen(fen.to_string()).to_uci(),
            format!("position fen {}", fen)
        );
    }
}
