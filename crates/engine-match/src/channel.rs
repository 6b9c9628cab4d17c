//! Line-oriented text channel to an engine process.
//!
//! A [`LineChannel`] writes newline-terminated commands to the engine and
//! reads its output one trimmed line at a time, in arrival order. Reads
//! block; a [`CancelToken`] attached with [`LineChannel::with_cancel`] is
//! checked before each one.

use crate::error::EngineError;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a channel and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next read on every channel holding this token fail with
    /// [`EngineError::Cancelled`].
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bidirectional line channel over a reader and a writer.
pub struct LineChannel<R: BufRead, W: Write> {
    reader: R,
    writer: W,
    cancel: Option<CancelToken>,
}

impl<R: BufRead, W: Write> LineChannel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            cancel: None,
        }
    }

    /// Attach a cancel token, checked before every read.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.set_cancel(token);
        self
    }

    /// Replaces the cancel token of a channel already in use.
    pub fn set_cancel(&mut self, token: CancelToken) {
        self.cancel = Some(token);
    }

    /// Writes the text followed by a newline and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the engine's input is closed.
    pub fn write_line(&mut self, text: &str) -> Result<(), EngineError> {
        tracing::debug!("> {}", text);
        writeln!(self.writer, "{}", text)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Reads the next line, trimmed of surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] at end of stream,
    /// [`EngineError::Io`] if reading fails, and [`EngineError::Cancelled`]
    /// if the cancel token was triggered.
    pub fn read_line(&mut self) -> Result<String, EngineError> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(EngineError::Cancelled);
        }

        let mut line = String::new();
        let bytes = self.reader.read_line(&mut line)?;
        if bytes == 0 {
            return Err(EngineError::Closed);
        }
        let line = line.trim().to_string();
        tracing::trace!("< {}", line);
        Ok(line)
    }

    /// Reads lines until one satisfies `pred`, discarding the rest.
    pub fn read_until<F>(&mut self, mut pred: F) -> Result<String, EngineError>
    where
        F: FnMut(&str) -> bool,
    {
        loop {
            let line = self.read_line()?;
            if pred(&line) {
                return Ok(line);
            }
        }
    }

    /// The underlying writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }
}
