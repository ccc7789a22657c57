//! Login screen.

use crate::components::form::{Field, Form};
use crate::components::{
    centered_columns, render_background, theme, Component, ConfirmDialog, Notice, StatusLine,
    Transition,
};
use crate::config::APP_NAME;
use crate::routes::Route;
use crate::tui::Frame;
use crate::validation::LoginForm;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::Paragraph};

const BANNER: [&str; 5] = [
    "█  █  ███  ████ ████  █  █ ████",
    "█  █ █   █ █    █   █ █  █ █   ",
    "████ █   █ ████ ████  █  █ ████",
    "█  █ █   █    █ █     █  █    █",
    "█  █  ███  ████ █      ██  ████",
];

/// Links below the form, in focus order.
const LINKS: [&str; 3] = ["Create an account", "Forgot password?", "Exit"];
const LINK_SIGNUP: usize = 0;
const LINK_FORGOT: usize = 1;
const LINK_EXIT: usize = 2;

pub struct Login {
    form: Form,
    /// Index into `LINKS` while the focus is below the form.
    link: Option<usize>,
    status: StatusLine,
    exit_dialog: ConfirmDialog,
}

impl Login {
    pub fn new() -> Self {
        Self {
            form: Form::new(vec![
                Field::text("email", "Email"),
                Field::secret("password", "Password"),
            ]),
            link: None,
            status: StatusLine::default(),
            exit_dialog: ConfirmDialog::default(),
        }
    }

    fn stops(&self) -> usize {
        self.form.len() + LINKS.len()
    }

    fn position(&self) -> usize {
        match self.link {
            Some(link) => self.form.len() + link,
            None => self.form.focus_index().unwrap_or(0),
        }
    }

    fn move_to(&mut self, position: usize) {
        if position < self.form.len() {
            self.link = None;
            self.form.set_focus(position);
        } else {
            self.link = Some(position - self.form.len());
            self.form.blur();
        }
    }

    fn submit(&mut self) -> Option<Transition> {
        let form = LoginForm {
            email: self.form.string("email"),
            password: self.form.string("password"),
        };
        match form.validate() {
            Ok(credentials) => {
                self.status.clear();
                Some(Transition::SignIn(credentials))
            }
            Err(errors) => {
                if let Some((_, message)) = errors.first() {
                    self.status.error(message);
                }
                self.form.set_errors(errors);
                self.link = None;
                None
            }
        }
    }
}

impl Default for Login {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Login {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<Transition>> {
        self.status.expire();

        if self.exit_dialog.is_open() {
            return Ok(match self.exit_dialog.handle_input(key) {
                Some(true) => Some(Transition::Quit),
                _ => None,
            });
        }

        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                let next = (self.position() + 1) % self.stops();
                self.move_to(next);
            }
            KeyCode::BackTab | KeyCode::Up => {
                let previous = (self.position() + self.stops() - 1) % self.stops();
                self.move_to(previous);
            }
            KeyCode::Esc => self.exit_dialog.open(),
            KeyCode::Enter => match self.link {
                Some(LINK_SIGNUP) => return Ok(Some(Transition::Go(Route::Signup))),
                Some(LINK_FORGOT) => return Ok(Some(Transition::Go(Route::ForgotPassword))),
                Some(LINK_EXIT) => self.exit_dialog.open(),
                _ => return Ok(self.submit()),
            },
            _ if self.link.is_none() => self.form.edit(key),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        render_background(frame);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Length(1),
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(self.form.height()),
                Constraint::Length(2),
                Constraint::Length(LINKS.len() as u16),
                Constraint::Min(0),
            ])
            .margin(1)
            .split(frame.area());

        let banner: Vec<Line> = BANNER.iter().map(|row| Line::from(*row)).collect();
        frame.render_widget(
            Paragraph::new(banner)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Cyan)),
            layout[0],
        );

        frame.render_widget(
            Paragraph::new(Span::styled(
                "Hospital administration, appointments and patient care",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center),
            layout[1],
        );

        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("Login to {APP_NAME}"),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            layout[3],
        );

        let form_area = centered_columns(layout[5], 60);
        self.form.render(frame, form_area);
        self.status.render(frame, layout[6]);

        let links: Vec<Line> = LINKS
            .iter()
            .enumerate()
            .map(|(index, label)| {
                let style = if self.link == Some(index) {
                    Style::default().fg(theme::FOCUS).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                Line::from(Span::styled(*label, style))
            })
            .collect();
        frame.render_widget(Paragraph::new(links).alignment(Alignment::Center), layout[7]);

        self.exit_dialog
            .render(frame, "Confirm Exit", "Are you sure you want to quit?");
    }

    fn tick(&mut self) {
        self.status.expire();
    }

    fn set_notice(&mut self, notice: Notice) {
        self.status.set(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::testing::{key, render_to_string, type_text};

    #[test]
    fn invalid_credentials_never_leave_the_screen() {
        let mut login = Login::new();
        type_text(&mut login, "not-an-email");
        login.handle_input(key(KeyCode::Tab)).unwrap();
        type_text(&mut login, "short");
        let outcome = login.handle_input(key(KeyCode::Enter)).unwrap();
        assert!(outcome.is_none());
        assert!(render_to_string(&login).contains("Enter a valid email address."));
    }

    #[test]
    fn valid_credentials_request_sign_in() {
        let mut login = Login::new();
        type_text(&mut login, "nurse@hospus.com");
        login.handle_input(key(KeyCode::Down)).unwrap();
        type_text(&mut login, "12345678");
        match login.handle_input(key(KeyCode::Enter)).unwrap() {
            Some(Transition::SignIn(credentials)) => {
                assert_eq!(credentials.email, "nurse@hospus.com");
                assert_eq!(credentials.password, "12345678");
            }
            other => panic!("unexpected transition: {other:?}"),
        }
    }

    #[test]
    fn links_navigate() {
        let mut login = Login::new();
        login.handle_input(key(KeyCode::Tab)).unwrap();
        login.handle_input(key(KeyCode::Tab)).unwrap();
        assert!(matches!(
            login.handle_input(key(KeyCode::Enter)).unwrap(),
            Some(Transition::Go(Route::Signup))
        ));
        login.handle_input(key(KeyCode::Tab)).unwrap();
        assert!(matches!(
            login.handle_input(key(KeyCode::Enter)).unwrap(),
            Some(Transition::Go(Route::ForgotPassword))
        ));
    }

    #[test]
    fn esc_then_yes_quits() {
        let mut login = Login::new();
        login.handle_input(key(KeyCode::Esc)).unwrap();
        assert!(matches!(
            login.handle_input(key(KeyCode::Char('y'))).unwrap(),
            Some(Transition::Quit)
        ));
    }

    #[test]
    fn typing_on_links_does_not_edit_fields() {
        let mut login = Login::new();
        login.handle_input(key(KeyCode::Up)).unwrap();
        type_text(&mut login, "abc");
        assert_eq!(login.form.value("email"), "");
        assert_eq!(login.form.value("password"), "");
    }
}
