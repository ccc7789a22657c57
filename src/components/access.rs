//! Shown when the signed-in role may not open any screen it was sent to.

use crate::components::{
    centered_rect, panel, render_background, render_help, theme, Component, Transition,
};
use crate::routes::Route;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::Paragraph};

pub struct AccessNotice {
    route: Route,
}

impl AccessNotice {
    pub fn new(route: Route) -> Self {
        Self { route }
    }
}

impl Component for AccessNotice {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<Transition>> {
        Ok(match key.code {
            KeyCode::Char('l') | KeyCode::Char('L') => Some(Transition::Logout),
            KeyCode::Esc | KeyCode::Char('q') => Some(Transition::Quit),
            _ => None,
        })
    }

    fn render(&self, frame: &mut Frame) {
        render_background(frame);
        let area = centered_rect(60, 40, frame.area());
        let block = panel("Access Denied", true);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(inner);
        let text = vec![
            Line::from(Span::styled(
                format!("You do not have access to {}.", self.route.title()),
                Style::default().fg(theme::DANGER).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Ask an administrator to review your role.",
                Style::default().fg(theme::TEXT),
            )),
        ];
        frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), rows[0]);
        render_help(frame, rows[1], "L: Logout | ESC: Quit");
    }
}
