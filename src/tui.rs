//! Terminal setup and the input/tick event source.

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, time::Duration};

/// Smallest terminal the screens are laid out for.
pub const MIN_WIDTH: u16 = 100;
pub const MIN_HEIGHT: u16 = 34;

#[derive(Debug, Clone)]
pub enum Event {
    Input(event::Event),
    Tick,
}

pub type Frame<'a> = ratatui::Frame<'a>;

pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    /// Ticks per second while no input arrives.
    tick_rate: f64,
}

impl Tui {
    pub fn new(terminal: Terminal<CrosstermBackend<io::Stdout>>, tick_rate: f64) -> Self {
        let tick_rate = if tick_rate.is_finite() && tick_rate > 0.0 {
            tick_rate
        } else {
            tracing::warn!(tick_rate, "invalid tick rate, using 30");
            30.0
        };
        Self {
            terminal,
            tick_rate,
        }
    }

    pub fn init(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        self.set_min_size(MIN_WIDTH, MIN_HEIGHT)?;
        tracing::debug!(tick_rate = self.tick_rate, "terminal ready");
        Ok(())
    }

    pub fn set_min_size(&self, width: u16, height: u16) -> Result<()> {
        let (current_width, current_height) = terminal::size()?;
        if current_width < width || current_height < height {
            io::stdout().execute(terminal::SetSize(
                width.max(current_width),
                height.max(current_height),
            ))?;
        }
        Ok(())
    }

    pub fn exit(&mut self) -> Result<()> {
        self.terminal.show_cursor()?;
        terminal::disable_raw_mode()?;
        crossterm::execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
        Ok(())
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame)) -> Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }

    /// Waits up to one tick for input.
    pub fn next_event(&self) -> Result<Event> {
        let timeout = Duration::from_secs_f64(1.0 / self.tick_rate);
        if event::poll(timeout)? {
            return Ok(Event::Input(event::read()?));
        }
        Ok(Event::Tick)
    }
}
