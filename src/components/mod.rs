//! Screens and the pieces they share.

use crate::auth::{Credentials, SignupRequest};
use crate::routes::Route;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, Paragraph, TableState},
};
use std::time::{Duration, Instant};

pub mod access;
pub mod appointments;
pub mod dashboard;
pub mod enquiries;
pub mod forgot_password;
pub mod form;
pub mod login;
pub mod patients;
pub mod register;
pub mod services;
pub mod users;

/// What a screen asks the app to do after handling a key.
#[derive(Debug, Clone)]
pub enum Transition {
    Go(Route),
    SignIn(Credentials),
    SignUp(SignupRequest),
    Logout,
    Quit,
}

pub trait Component {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<Transition>>;
    fn render(&self, frame: &mut Frame);

    /// Runs on every tick: drains background work and expires notices.
    fn tick(&mut self) {}

    /// Shows a notice produced outside the screen, e.g. a failed login.
    fn set_notice(&mut self, _notice: Notice) {}
}

pub mod theme {
    use ratatui::style::Color;

    pub const BG: Color = Color::Rgb(16, 16, 28);
    pub const PANEL_BG: Color = Color::Rgb(22, 22, 35);
    pub const HEADER_BG: Color = Color::Rgb(26, 26, 36);
    pub const DIALOG_BG: Color = Color::Rgb(30, 30, 46);
    pub const BORDER: Color = Color::Rgb(75, 75, 120);
    pub const BORDER_IDLE: Color = Color::Rgb(140, 140, 200);
    pub const TITLE: Color = Color::Rgb(230, 230, 250);
    pub const TEXT: Color = Color::Rgb(200, 200, 220);
    pub const MUTED: Color = Color::Rgb(180, 180, 200);
    pub const HELP: Color = Color::Rgb(140, 140, 170);
    pub const FOCUS: Color = Color::Rgb(250, 250, 110);
    pub const ACCENT: Color = Color::Rgb(129, 199, 245);
    pub const SUCCESS: Color = Color::Rgb(140, 219, 140);
    pub const DANGER: Color = Color::Rgb(255, 100, 100);
    pub const ROW_HIGHLIGHT: Color = Color::Rgb(40, 40, 65);
}

const NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
}

/// A status line that disappears after five seconds.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    shown_at: Instant,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
            shown_at: Instant::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
            shown_at: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at.elapsed() >= NOTICE_TTL
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

/// Holder for the notice of one screen.
#[derive(Debug, Default)]
pub struct StatusLine {
    current: Option<Notice>,
}

impl StatusLine {
    pub fn set(&mut self, notice: Notice) {
        self.current = Some(notice);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.set(Notice::error(message));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.set(Notice::success(message));
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref()
    }

    pub fn expire(&mut self) {
        if self.current.as_ref().is_some_and(Notice::is_expired) {
            self.current = None;
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let Some(notice) = &self.current else {
            return;
        };
        let color = if notice.is_error() {
            Color::Red
        } else {
            theme::SUCCESS
        };
        let paragraph = Paragraph::new(notice.message.as_str())
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }
}

/// Yes/No confirmation. "No" is preselected.
#[derive(Debug, Default)]
pub struct ConfirmDialog {
    open: bool,
    yes_selected: bool,
}

impl ConfirmDialog {
    pub fn open(&mut self) {
        self.open = true;
        self.yes_selected = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// `Some(true)` when confirmed, `Some(false)` when dismissed.
    pub fn handle_input(&mut self, key: KeyEvent) -> Option<bool> {
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                self.yes_selected = !self.yes_selected;
                None
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.open = false;
                Some(true)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.open = false;
                Some(false)
            }
            KeyCode::Enter => {
                self.open = false;
                Some(self.yes_selected)
            }
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, title: &str, message: &str) {
        if !self.open {
            return;
        }
        let area = frame.area();
        let width = 50.min(area.width);
        let height = 8.min(area.height);
        let dialog_area = Rect::new(
            area.x + (area.width.saturating_sub(width)) / 2,
            area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, dialog_area);

        let block = Block::default()
            .title(format!(" {title} "))
            .title_style(Style::default().fg(theme::TITLE).add_modifier(Modifier::BOLD))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme::BORDER_IDLE))
            .style(Style::default().bg(theme::DIALOG_BG));
        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(inner);
        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(theme::TEXT).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center),
            rows[0],
        );

        let buttons = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);
        let (yes, yes_style) = if self.yes_selected {
            ("► Yes ◄", Style::default().fg(theme::SUCCESS).add_modifier(Modifier::BOLD))
        } else {
            ("  Yes  ", Style::default().fg(theme::MUTED))
        };
        let (no, no_style) = if self.yes_selected {
            ("  No  ", Style::default().fg(theme::MUTED))
        } else {
            ("► No ◄", Style::default().fg(theme::DANGER).add_modifier(Modifier::BOLD))
        };
        frame.render_widget(
            Paragraph::new(yes).style(yes_style).alignment(Alignment::Center),
            buttons[0],
        );
        frame.render_widget(
            Paragraph::new(no).style(no_style).alignment(Alignment::Center),
            buttons[1],
        );
    }
}

/// Fills the frame with the screen background.
pub fn render_background(frame: &mut Frame) {
    frame.render_widget(
        Block::default().style(Style::default().bg(theme::BG)),
        frame.area(),
    );
}

/// Title bar with a bottom border.
pub fn render_header(frame: &mut Frame, area: Rect, title: &str) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(theme::BORDER))
        .style(Style::default().bg(theme::BG));
    frame.render_widget(block, area);
    frame.render_widget(
        Paragraph::new(title)
            .style(Style::default().fg(theme::TITLE).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        area,
    );
}

pub fn render_help(frame: &mut Frame, area: Rect, text: &str) {
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().fg(theme::HELP))
            .alignment(Alignment::Center),
        area,
    );
}

pub fn render_back_button(frame: &mut Frame, area: Rect, focused: bool) {
    let (text, style) = if focused {
        ("► Back ◄", Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD))
    } else {
        ("  Back  ", Style::default().fg(theme::MUTED))
    };
    frame.render_widget(
        Paragraph::new(text).style(style).alignment(Alignment::Center),
        area,
    );
}

/// Rounded panel used for tables and detail views.
pub fn panel(title: &str, focused: bool) -> Block<'static> {
    Block::default()
        .title(format!(" {title} "))
        .title_alignment(Alignment::Center)
        .title_style(Style::default().fg(theme::TITLE).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if focused { theme::FOCUS } else { theme::BORDER }))
        .style(Style::default().bg(theme::PANEL_BG))
}

/// Moves the selection down, wrapping to the first row.
pub fn select_next(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let next = match state.selected() {
        Some(i) if i + 1 < len => i + 1,
        _ => 0,
    };
    state.select(Some(next));
}

/// Moves the selection up, wrapping to the last row.
pub fn select_previous(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let previous = match state.selected() {
        Some(0) | None => len - 1,
        Some(i) => (i - 1).min(len - 1),
    };
    state.select(Some(previous));
}

/// Keeps the selection inside `len` rows after the data changed.
pub fn clamp_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else {
        state.select(Some(state.selected().unwrap_or(0).min(len - 1)));
    }
}

/// Horizontally centered slice of `area`, `percent` wide.
pub fn centered_columns(area: Rect, percent: u16) -> Rect {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent) / 2),
            Constraint::Percentage(percent),
            Constraint::Percentage((100 - percent) / 2),
        ])
        .split(area)[1]
}

/// Centered rectangle taking the given percentages of `r`.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}


#[cfg(test)]
mod tests {
    use super::testing::key;
    use super::*;

    #[test]
    fn selection_wraps_both_ways() {
        let mut state = TableState::default();
        select_next(&mut state, 3);
        assert_eq!(state.selected(), Some(0));
        select_previous(&mut state, 3);
        assert_eq!(state.selected(), Some(2));
        select_next(&mut state, 3);
        assert_eq!(state.selected(), Some(0));
        select_next(&mut state, 0);
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn clamp_after_shrink() {
        let mut state = TableState::default();
        state.select(Some(5));
        clamp_selection(&mut state, 2);
        assert_eq!(state.selected(), Some(1));
    }

    #[test]
    fn confirm_dialog_defaults_to_no() {
        let mut dialog = ConfirmDialog::default();
        dialog.open();
        assert_eq!(dialog.handle_input(key(KeyCode::Enter)), Some(false));
        assert!(!dialog.is_open());

        dialog.open();
        assert_eq!(dialog.handle_input(key(KeyCode::Left)), None);
        assert_eq!(dialog.handle_input(key(KeyCode::Enter)), Some(true));
    }

    #[test]
    fn fresh_notice_is_not_expired() {
        let mut status = StatusLine::default();
        status.error("Boom");
        status.expire();
        assert_eq!(status.current().map(|n| n.message.as_str()), Some("Boom"));
        assert!(status.current().is_some_and(Notice::is_error));
    }
}
