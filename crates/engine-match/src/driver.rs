//! Engine driver: synchronous UCI conversation with one engine.
//!
//! Every operation writes its command(s) and blocks until the engine
//! acknowledges. Acknowledgement is the readiness handshake: `isready` is
//! sent and lines are read until `readyok` (success) or a `No such option:`
//! / `Unknown command:` diagnostic (failure). Anything else read during the
//! handshake is discarded.
//!
//! # Example
//!
//! ```no_run
//! use engine_match::Engine;
//! use std::collections::BTreeMap;
//!
//! let mut engine = Engine::launch("stockfish", 8, false, &BTreeMap::new(), false, -10, 10)?;
//! engine.set_position(&["e2e4".to_string(), "e7e5".to_string()])?;
//! let best = engine.compute_best_move()?;
//! println!("best move: {}", best.mv);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::channel::{CancelToken, LineChannel};
use crate::config::{EngineConfig, EngineOptions};
use crate::error::{EngineError, LaunchError};
use std::collections::{BTreeMap, VecDeque};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};
use uci::{BestMove, EngineMessage, EvaluationInfo, GuiCommand, InfoLine};

/// How long [`Drop`] waits for the engine to exit after `quit` before killing it.
const QUIT_GRACE: Duration = Duration::from_millis(300);

/// An engine running as a child process.
pub type ProcessEngine = Engine<BufReader<ChildStdout>, ChildStdin>;

/// Lifecycle of an engine handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created, identification and option setup not yet done.
    Uninitialized,
    /// Idle and synchronized with the engine.
    Ready,
    /// A search was started; its `bestmove` has not been read yet.
    AwaitingMove,
    /// A command failed. No further operation succeeds.
    Faulted,
}

/// Driver for a single UCI engine.
///
/// One exchange is in flight at a time; the handle must not be shared
/// between threads while an operation is running.
pub struct Engine<R: BufRead, W: Write> {
    channel: LineChannel<R, W>,
    process: Option<Child>,
    name: String,
    depth: u32,
    ponder: bool,
    options: BTreeMap<String, String>,
    state: EngineState,
    /// Search output read during the post-`go` handshake, replayed to
    /// [`Engine::wait_best_move`].
    pending: VecDeque<String>,
    last_info: Option<EvaluationInfo>,
}

impl ProcessEngine {
    /// Launches and configures an engine.
    ///
    /// Starts `path` with no arguments, sends `uci`, disables pondering if
    /// `ponder` is `false`, then sends every option from the base defaults
    /// layered with `options`. With `randomize_contempt`, `Contempt` is drawn
    /// uniformly from `[rand_min, rand_max)` before `options` apply.
    ///
    /// # Errors
    ///
    /// - [`LaunchError::Config`] for a zero depth or an empty contempt range
    /// - [`LaunchError::Spawn`] if the process cannot be started
    /// - [`LaunchError::Setup`] if identification or any option fails
    pub fn launch<P: AsRef<Path>>(
        path: P,
        depth: u32,
        ponder: bool,
        options: &BTreeMap<String, String>,
        randomize_contempt: bool,
        rand_min: i32,
        rand_max: i32,
    ) -> Result<Self, LaunchError> {
        let config = EngineConfig {
            path: path.as_ref().to_path_buf(),
            depth,
            ponder,
            options: options.clone(),
            contempt: randomize_contempt.then_some(crate::config::ContemptRange {
                min: rand_min,
                max: rand_max,
            }),
        };
        Self::launch_with(&config)
    }

    /// Launches and configures an engine described by `config`.
    pub fn launch_with(config: &EngineConfig) -> Result<Self, LaunchError> {
        let options = config.resolve(&mut rand::thread_rng())?;

        // stderr is left to the parent.
        let mut process = Command::new(&config.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                path: config.path.clone(),
                source,
            })?;

        let stdin = process.stdin.take();
        let stdout = process.stdout.take();
        let (stdin, stdout) = match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            (None, _) => {
                let _ = process.kill();
                return Err(LaunchError::MissingPipe("stdin"));
            }
            (_, None) => {
                let _ = process.kill();
                return Err(LaunchError::MissingPipe("stdout"));
            }
        };

        let channel = LineChannel::new(BufReader::new(stdout), stdin);
        let mut engine = Engine::new(channel, config.depth, config.ponder);
        engine.process = Some(process);

        tracing::info!(path = %config.path.display(), depth = config.depth, "Launching engine");
        // On failure the engine is dropped here, which reaps the process.
        engine.initialize(&options)?;
        tracing::info!(name = %engine.name, "Engine ready");
        Ok(engine)
    }
}

impl<R: BufRead, W: Write> Engine<R, W> {
    /// Wraps an existing channel. The handle starts
    /// [`EngineState::Uninitialized`]; call [`Engine::initialize`] next.
    pub fn new(channel: LineChannel<R, W>, depth: u32, ponder: bool) -> Self {
        Self {
            channel,
            process: None,
            name: String::new(),
            depth,
            ponder,
            options: BTreeMap::new(),
            state: EngineState::Uninitialized,
            pending: VecDeque::new(),
            last_info: None,
        }
    }

    /// Identifies with `uci` and applies the option set.
    ///
    /// Reads until `uciok`, capturing `id name`. If pondering is disabled,
    /// `Ponder` is set to `false` first; then every option is sent, each
    /// acknowledged before the next.
    ///
    /// Only valid on an [`EngineState::Uninitialized`] handle.
    pub fn initialize(&mut self, options: &EngineOptions) -> Result<(), EngineError> {
        if self.state != EngineState::Uninitialized {
            return Err(self.unusable());
        }
        let result = self.identify();
        self.guard(result)?;

        if !self.ponder {
            self.apply_option("Ponder", "false")?;
        }
        for (name, value) in options.iter() {
            self.apply_option(name, value)?;
        }

        self.state = EngineState::Ready;
        Ok(())
    }

    fn identify(&mut self) -> Result<(), EngineError> {
        self.send(GuiCommand::Uci)?;
        loop {
            let line = self.channel.read_line()?;
            match EngineMessage::parse(&line) {
                Ok(EngineMessage::Id {
                    name: Some(name), ..
                }) => self.name = name,
                Ok(EngineMessage::UciOk) => return Ok(()),
                _ => {}
            }
        }
    }

    /// Sends `setoption name <name> value <value>` and waits for the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Rejected`] with the engine's diagnostic line if
    /// the option is unknown.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.apply_option(name, value)
    }

    fn apply_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        let result = self
            .send(GuiCommand::SetOption {
                name: name.to_string(),
                value: value.to_string(),
            })
            .and_then(|()| self.sync_ready(false));
        self.guard(result)?;
        self.options.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Sends `ucinewgame` and waits for the handshake.
    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.command(GuiCommand::UciNewGame)
    }

    /// Sets the start position followed by `moves` and waits for the handshake.
    ///
    /// An empty slice resets to the start position.
    pub fn set_position(&mut self, moves: &[String]) -> Result<(), EngineError> {
        self.command(GuiCommand::Position {
            moves: moves.to_vec(),
        })
    }

    /// Sets a FEN position, passed through unvalidated, and waits for the handshake.
    pub fn set_position_fen(&mut self, fen: &str) -> Result<(), EngineError> {
        self.command(GuiCommand::PositionFen(fen.to_string()))
    }

    /// Sends `go depth <depth>` and waits for the handshake.
    ///
    /// Relies on the engine answering `isready` while it searches. Search
    /// output that arrives before `readyok` is kept for
    /// [`Engine::wait_best_move`].
    pub fn start_search(&mut self) -> Result<(), EngineError> {
        if self.state != EngineState::Ready {
            return Err(self.unusable());
        }
        self.pending.clear();
        self.last_info = None;

        let result = self
            .send(GuiCommand::GoDepth(self.depth))
            .and_then(|()| self.sync_ready(true));
        self.guard(result)?;
        self.state = EngineState::AwaitingMove;
        Ok(())
    }

    /// Starts a search and blocks until its `bestmove` line.
    ///
    /// The result carries the last evaluation reported before the terminal
    /// line, or `None` if there was none.
    ///
    /// # Errors
    ///
    /// A malformed `info` or `bestmove` line is returned immediately as
    /// [`EngineError::Parse`]; the handle is faulted.
    pub fn compute_best_move(&mut self) -> Result<BestMove, EngineError> {
        self.start_search()?;
        self.wait_best_move()
    }

    /// Reads the output of a search started with [`Engine::start_search`].
    pub fn wait_best_move(&mut self) -> Result<BestMove, EngineError> {
        if self.state != EngineState::AwaitingMove {
            return Err(self.unusable());
        }
        let result = self.read_search_output();
        let best = self.guard(result)?;
        self.state = EngineState::Ready;
        Ok(best)
    }

    fn read_search_output(&mut self) -> Result<BestMove, EngineError> {
        let mut no_move_report = None;
        loop {
            let line = match self.pending.pop_front() {
                Some(line) => line,
                None => self.channel.read_line()?,
            };

            // Held back: only valid when the search ends without a move.
            if uci::is_no_move_report(&line) {
                no_move_report = Some(line);
                continue;
            }

            match EngineMessage::parse(&line)? {
                EngineMessage::Info(InfoLine::Evaluation(info)) => self.last_info = Some(info),
                EngineMessage::Info(InfoLine::Notice(text)) => {
                    tracing::trace!(engine = %self.name, "Notice: {}", text);
                }
                EngineMessage::BestMove(mut best) => {
                    if let Some(report) = no_move_report.take() {
                        if best.is_no_move() {
                            tracing::debug!(engine = %self.name, "No legal move: {}", report);
                        } else {
                            uci::parse_info_line(&report)?;
                        }
                    }
                    best.info = self.last_info.take();
                    return Ok(best);
                }
                _ => {}
            }
        }
    }

    /// Sends `quit` and waits for the process to exit.
    pub fn quit(mut self) -> Result<(), EngineError> {
        self.channel.write_line(&GuiCommand::Quit.to_uci())?;
        if let Some(mut process) = self.process.take() {
            process.wait()?;
        }
        Ok(())
    }

    /// The engine's name from `id name`, empty if it sent none.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Depth used by the next search.
    pub fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
    }

    pub fn ponder(&self) -> bool {
        self.ponder
    }

    /// Options acknowledged by the engine so far.
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn channel(&self) -> &LineChannel<R, W> {
        &self.channel
    }

    /// Makes every later read fail with [`EngineError::Cancelled`] once
    /// `token` is cancelled.
    pub fn set_cancel(&mut self, token: CancelToken) {
        self.channel.set_cancel(token);
    }

    fn command(&mut self, command: GuiCommand) -> Result<(), EngineError> {
        self.ensure_idle()?;
        let result = self.send(command).and_then(|()| self.sync_ready(false));
        self.guard(result)
    }

    fn send(&mut self, command: GuiCommand) -> Result<(), EngineError> {
        self.channel.write_line(&command.to_uci())
    }

    /// The readiness handshake. With `retain_search_output`, `info` and
    /// `bestmove` lines are queued instead of discarded.
    fn sync_ready(&mut self, retain_search_output: bool) -> Result<(), EngineError> {
        self.send(GuiCommand::IsReady)?;
        loop {
            let line = self.channel.read_line()?;
            if line == "readyok" {
                return Ok(());
            }
            if uci::is_rejection(&line) {
                return Err(EngineError::Rejected(line));
            }
            if retain_search_output && uci::is_search_output(&line) {
                self.pending.push_back(line);
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), EngineError> {
        match self.state {
            EngineState::Ready => Ok(()),
            _ => Err(self.unusable()),
        }
    }

    fn unusable(&self) -> EngineError {
        match self.state {
            EngineState::Faulted => EngineError::Faulted,
            state => EngineError::NotReady(state),
        }
    }

    /// Faults the handle on any error that leaves the conversation out of step.
    fn guard<T>(&mut self, result: Result<T, EngineError>) -> Result<T, EngineError> {
        if let Err(err) = &result {
            if err.faults_handle() {
                tracing::warn!(engine = %self.name, "Engine faulted: {}", err);
                self.state = EngineState::Faulted;
            }
        }
        result
    }
}

impl<R: BufRead, W: Write> Drop for Engine<R, W> {
    /// Sends `quit`, then kills the process if it has not exited in time.
    fn drop(&mut self) {
        let Some(mut process) = self.process.take() else {
            return;
        };
        let _ = self.channel.write_line(&GuiCommand::Quit.to_uci());
        // A plain `wait` would hang on an engine that ignores `quit`
        // mid-search, so poll until the grace period runs out.
        let deadline = Instant::now() + QUIT_GRACE;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = process.try_wait() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let _ = process.kill();
        let _ = process.wait();
    }
}
