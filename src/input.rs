//! Abstract interactive input.
//!
//! The engine is driven through [`InputSource`] so the same state machine can
//! run against a real terminal or a scripted sequence in tests. A source
//! returns `None` once its stream is exhausted; the engine treats that as an
//! exit (block reads) or a cancellation (selection reads).

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

pub trait InputSource {
    /// Read a free-text block terminated by end-of-input. `None` when the
    /// underlying stream is exhausted.
    fn read_block(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Read a single line of input. `None` when the stream is exhausted.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Real stdin. Block input runs until end-of-input (Ctrl+D on a terminal);
/// on a pipe the end-of-stream condition is sticky and subsequent reads
/// return `None`.
pub struct StdinSource {
    exhausted: bool,
}

impl StdinSource {
    pub fn new() -> Self {
        Self { exhausted: false }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for StdinSource {
    fn read_block(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if self.exhausted {
            return Ok(None);
        }
        println!("{}", prompt);
        println!("(paste the block, then end the input: Ctrl+D)");
        io::stdout().flush()?;

        let mut block = String::new();
        let mut line = String::new();
        let stdin = io::stdin();
        let mut handle = stdin.lock();
        loop {
            line.clear();
            let read = handle.read_line(&mut line)?;
            if read == 0 {
                break;
            }
            block.push_str(&line);
        }
        if block.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        Ok(Some(block))
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if self.exhausted {
            return Ok(None);
        }
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            self.exhausted = true;
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Scripted input for tests: fixed queues of blocks and lines.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    blocks: VecDeque<String>,
    lines: VecDeque<String>,
}

impl ScriptedSource {
    pub fn new(
        blocks: impl IntoIterator<Item = impl Into<String>>,
        lines: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            blocks: blocks.into_iter().map(Into::into).collect(),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl InputSource for ScriptedSource {
    fn read_block(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.blocks.pop_front())
    }

    fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}
