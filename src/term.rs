use std::io::{self, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use log::warn;

use crate::logs::source::LogLine;
use crate::logs::tail::{KeySource, TailRenderer};
use crate::render::format_log_line;

/// Raw terminal mode, restored on drop no matter how the session ends.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = terminal::disable_raw_mode() {
            warn!("failed to restore terminal mode: {err}");
        }
    }
}

/// Keyboard input via crossterm. Control-C and Esc are folded into their
/// ASCII forms so the session sees plain characters.
pub struct CrosstermKeys;

impl KeySource for CrosstermKeys {
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<char>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) => {
                Ok(match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        Some('\x03')
                    }
                    KeyCode::Char(c) => Some(c),
                    KeyCode::Esc => Some('\x1b'),
                    _ => None,
                })
            }
            _ => Ok(None),
        }
    }
}

/// Tail output on stdout. Lines end in `\r\n` because the session runs in
/// raw mode; the filter prompt temporarily leaves raw mode so the user
/// gets normal line editing back.
pub struct ConsoleRenderer;

impl TailRenderer for ConsoleRenderer {
    fn line(&mut self, line: &LogLine) {
        print!("{}\r\n", format_log_line(line));
        let _ = io::stdout().flush();
    }

    fn notice(&mut self, message: &str) {
        print!("{message}\r\n");
        let _ = io::stdout().flush();
    }

    fn prompt_filter(&mut self) -> io::Result<String> {
        terminal::disable_raw_mode()?;
        print!("Filter pattern (empty for none): ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        terminal::enable_raw_mode()?;
        Ok(input.trim().to_string())
    }
}
