use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::ResetColor,
    terminal::disable_raw_mode,
};
use log::debug;
use std::io::{self, stdout, Stdout, Write};
use std::ops::{Deref, DerefMut};

/// Terminal capabilities needed for playback
///
/// Rows and columns are 1-based. Every call may block.
pub trait TerminalAdapter {
    fn hide_cursor(&mut self) -> io::Result<()>;

    /// Current cursor position as `(row, col)`
    fn get_cursor_position(&mut self) -> io::Result<(u16, u16)>;

    fn set_cursor_position(&mut self, row: u16, col: u16) -> io::Result<()>;

    /// Terminal size as `(lines, cols)`
    fn get_terminal_size(&mut self) -> io::Result<(u16, u16)>;

    /// Show the cursor, drop styling and leave raw mode
    fn reset_terminal_modes(&mut self) -> io::Result<()>;

    fn write_and_flush(&mut self, text: &str) -> io::Result<()>;
}

/// Terminal adapter over stdout using crossterm
pub struct CrosstermTerminal {
    stdout: Stdout,
}

impl CrosstermTerminal {
    pub fn new() -> Self {
        Self { stdout: stdout() }
    }
}

impl Default for CrosstermTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalAdapter for CrosstermTerminal {
    fn hide_cursor(&mut self) -> io::Result<()> {
        execute!(self.stdout, Hide)
    }

    fn get_cursor_position(&mut self) -> io::Result<(u16, u16)> {
        let (col, row) = crossterm::cursor::position()?;
        Ok((row + 1, col + 1))
    }

    fn set_cursor_position(&mut self, row: u16, col: u16) -> io::Result<()> {
        execute!(
            self.stdout,
            MoveTo(col.saturating_sub(1), row.saturating_sub(1))
        )
    }

    fn get_terminal_size(&mut self) -> io::Result<(u16, u16)> {
        let (cols, lines) = crossterm::terminal::size()?;
        Ok((lines, cols))
    }

    fn reset_terminal_modes(&mut self) -> io::Result<()> {
        execute!(self.stdout, ResetColor, Show)?;
        disable_raw_mode()?;
        debug!("Terminal restored to normal state");
        Ok(())
    }

    fn write_and_flush(&mut self, text: &str) -> io::Result<()> {
        self.stdout.write_all(text.as_bytes())?;
        self.stdout.flush()
    }
}

/// Hidden-cursor scope over a terminal
///
/// Modes are reset exactly once, either by [`TerminalSession::release`] or
/// when the session is dropped.
pub struct TerminalSession<'a, T: TerminalAdapter + ?Sized> {
    terminal: &'a mut T,
    released: bool,
}

impl<'a, T: TerminalAdapter + ?Sized> TerminalSession<'a, T> {
    /// Hide the cursor and start the scope
    pub fn begin(terminal: &'a mut T) -> io::Result<Self> {
        terminal.hide_cursor()?;
        Ok(Self {
            terminal,
            released: false,
        })
    }

    /// Reset terminal modes if that has not happened yet
    pub fn release(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.terminal.reset_terminal_modes()
    }
}

impl<T: TerminalAdapter + ?Sized> Deref for TerminalSession<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.terminal
    }
}

impl<T: TerminalAdapter + ?Sized> DerefMut for TerminalSession<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.terminal
    }
}

impl<T: TerminalAdapter + ?Sized> Drop for TerminalSession<'_, T> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
