//! Tests against real child processes, using small shell scripts as engines.
#![cfg(unix)]

use engine_match::{
    CancelToken, EngineConfig, EngineError, EngineState, LaunchError, Match, MatchError, Player, ProcessEngine,
    Side, Termination,
};
use std::io::BufReader;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{ChildStdin, ChildStdout};
use std::sync::OnceLock;
use tempfile::TempDir;

const MATING: &str = r#"#!/bin/sh
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "id name MateMock"; echo "id author test"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go)
      echo "info string searching"
      echo "info depth 1 seldepth 1 multipv 1 score mate 1 nodes 20 nps 2000 tbhits 0 time 10 pv d8h4"
      echo "bestmove d8h4 ponder (none)"
      ;;
    quit) exit 0 ;;
  esac
done
"#;

const SHUFFLING: &str = r#"#!/bin/sh
n=0
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "id name ShuffleMock"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go)
      if [ $((n % 2)) -eq 0 ]; then mv=g1f3; reply=g8f6; else mv=f3g1; reply=f6g8; fi
      n=$((n + 1))
      echo "info depth 1 seldepth 1 multipv 1 score cp 0 nodes 20 nps 2000 tbhits 0 time 10 pv $mv $reply"
      echo "bestmove $mv ponder $reply"
      ;;
    quit) exit 0 ;;
  esac
done
"#;

const REJECTING: &str = r#"#!/bin/sh
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "id name PickyMock"; echo "uciok" ;;
    isready) echo "readyok" ;;
    setoption) echo "No such option: $rest" ;;
    quit) exit 0 ;;
  esac
done
"#;

const STALEMATED: &str = r#"#!/bin/sh
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "id name StalemateMock"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go)
      echo "info depth 0 score cp 0"
      echo "bestmove (none)"
      ;;
    quit) exit 0 ;;
  esac
done
"#;

const CRASHING: &str = r#"#!/bin/sh
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "id name CrashMock"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go) exit 1 ;;
  esac
done
"#;

/// Writes every script once, before any test spawns a process.
fn mocks() -> &'static Path {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = tempfile::Builder::new()
            .prefix("engine-match-mocks")
            .tempdir()
            .unwrap();
        for (name, script) in [
            ("mating.sh", MATING),
            ("shuffling.sh", SHUFFLING),
            ("rejecting.sh", REJECTING),
            ("stalemated.sh", STALEMATED),
            ("crashing.sh", CRASHING),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        dir
    })
    .path()
}

fn config(script: &str) -> EngineConfig {
    EngineConfig::new(mocks().join(script))
}

fn player(id: &str, script: &str) -> Player<BufReader<ChildStdout>, ChildStdin> {
    let engine = ProcessEngine::launch_with(&config(script)).expect("Failed to launch mock");
    Player::new(id, engine)
}

#[test]
fn test_launch_identifies_engine() {
    let engine = ProcessEngine::launch_with(&config("mating.sh")).unwrap();
    assert_eq!(engine.name(), "MateMock");
    assert_eq!(engine.state(), EngineState::Ready);
    assert_eq!(engine.options().get("Ponder").map(String::as_str), Some("false"));
    assert_eq!(engine.options().get("Threads").map(String::as_str), Some("1"));
}

#[test]
fn test_best_move_from_process() {
    let mut engine = ProcessEngine::launch_with(&config("mating.sh")).unwrap();
    engine.new_game().unwrap();
    let moves: Vec<String> = ["f2f3", "e7e5", "g2g4"].iter().map(|m| m.to_string()).collect();
    engine.set_position(&moves).unwrap();

    let best = engine.compute_best_move().unwrap();
    assert_eq!(best.mv, "d8h4");
    assert!(!best.has_ponder_reply());
    let info = best.info.expect("Expected evaluation");
    assert_eq!(info.score.mate(), Some(1));
    assert_eq!(info.pv, vec!["d8h4"]);

    engine.quit().unwrap();
}

#[test]
fn test_mating_engine_wins_as_white() {
    let mut game =
        Match::new(player("one", "mating.sh"), player("two", "mating.sh"), 500).unwrap();

    let winner = game.run().unwrap();
    let state = game.state();
    assert_eq!(winner.as_deref(), Some(state.player(Side::White)));
    assert_eq!(state.termination(), Some(Termination::ForcedMate));
    assert_eq!(state.moves(), ["d8h4"]);
}

#[test]
fn test_shuffling_engines_hit_move_limit() {
    let mut game =
        Match::with_sides(player("w", "shuffling.sh"), player("b", "shuffling.sh"), 6).unwrap();

    assert_eq!(game.run().unwrap(), None);
    assert_eq!(game.state().termination(), Some(Termination::MoveLimit));
    assert_eq!(
        game.state().moves(),
        ["g1f3", "g1f3", "f3g1", "f3g1", "g1f3", "g1f3"]
    );
}

#[test]
fn test_rejected_option_fails_launch() {
    match ProcessEngine::launch_with(&config("rejecting.sh")) {
        Err(LaunchError::Setup(EngineError::Rejected(line))) => {
            assert_eq!(line, "No such option: name Ponder value false");
        }
        Err(other) => panic!("Expected rejected setup, got {:?}", other),
        Ok(_) => panic!("Expected launch to fail"),
    }
}

#[test]
fn test_crash_during_search_names_player() {
    let mut game =
        Match::with_sides(player("w", "crashing.sh"), player("b", "mating.sh"), 500).unwrap();

    match game.advance() {
        Err(MatchError::Engine { player, source }) => {
            assert_eq!(player, "w");
            assert!(source.is_io(), "got {:?}", source);
        }
        other => panic!("Expected engine error, got {:?}", other),
    }
    assert!(game.state().moves().is_empty());
}

#[test]
fn test_stalemated_engine_ends_match_without_move() {
    let mut game =
        Match::with_sides(player("w", "shuffling.sh"), player("b", "stalemated.sh"), 500).unwrap();

    assert_eq!(game.run().unwrap(), None);
    assert_eq!(game.state().termination(), Some(Termination::NoLegalMove));
    assert_eq!(game.state().moves(), ["g1f3"]);
}

#[test]
fn test_cancel_launched_engine_between_searches() {
    let mut engine = ProcessEngine::launch_with(&config("shuffling.sh")).unwrap();
    let token = CancelToken::new();
    engine.set_cancel(token.clone());

    assert_eq!(engine.compute_best_move().unwrap().mv, "g1f3");
    token.cancel();

    assert!(matches!(
        engine.compute_best_move(),
        Err(EngineError::Cancelled)
    ));
    assert_eq!(engine.state(), EngineState::Faulted);
    assert!(matches!(engine.new_game(), Err(EngineError::Faulted)));
}
