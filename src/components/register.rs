//! Signup screen.

use crate::components::form::{Field, Form};
use crate::components::{
    centered_rect, render_background, render_help, theme, Component, Notice, StatusLine,
    Transition,
};
use crate::routes::Route;
use crate::tui::Frame;
use crate::validation::SignupForm;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph},
};

pub struct Register {
    form: Form,
    /// Focus is on "Back to Login" instead of the form.
    back_focused: bool,
    status: StatusLine,
}

impl Register {
    pub fn new() -> Self {
        Self {
            form: Form::new(vec![
                Field::text("firstName", "First Name"),
                Field::text("lastName", "Last Name"),
                Field::text("email", "Email"),
                Field::text("idNumber", "ID Number"),
                Field::secret("password", "Password"),
                Field::secret("confirmPassword", "Confirm Password"),
            ]),
            back_focused: false,
            status: StatusLine::default(),
        }
    }

    fn focus_next(&mut self) {
        match self.form.focus_index() {
            _ if self.back_focused => {
                self.back_focused = false;
                self.form.set_focus(0);
            }
            Some(index) if index + 1 < self.form.len() => self.form.set_focus(index + 1),
            _ => {
                self.back_focused = true;
                self.form.blur();
            }
        }
    }

    fn focus_previous(&mut self) {
        let last = self.form.len() - 1;
        match self.form.focus_index() {
            _ if self.back_focused => {
                self.back_focused = false;
                self.form.set_focus(last);
            }
            Some(0) | None => {
                self.back_focused = true;
                self.form.blur();
            }
            Some(index) => self.form.set_focus(index - 1),
        }
    }

    fn submit(&mut self) -> Option<Transition> {
        let form = SignupForm {
            first_name: self.form.string("firstName"),
            last_name: self.form.string("lastName"),
            email: self.form.string("email"),
            id_number: self.form.string("idNumber"),
            password: self.form.string("password"),
            confirm_password: self.form.string("confirmPassword"),
        };
        match form.validate() {
            Ok(request) => Some(Transition::SignUp(request)),
            Err(errors) => {
                if let Some((_, message)) = errors.first() {
                    self.status.error(message);
                }
                self.form.set_errors(errors);
                None
            }
        }
    }
}

impl Default for Register {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Register {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<Transition>> {
        self.status.expire();

        match key.code {
            KeyCode::Esc => return Ok(Some(Transition::Go(Route::Login))),
            KeyCode::Tab | KeyCode::Down => self.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.focus_previous(),
            KeyCode::Enter if self.back_focused => {
                return Ok(Some(Transition::Go(Route::Login)));
            }
            KeyCode::Enter => return Ok(self.submit()),
            _ => self.form.edit(key),
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        render_background(frame);

        let container = centered_rect(70, 90, frame.area());
        let container_block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme::BORDER))
            .style(Style::default().bg(theme::PANEL_BG));
        let inner = container_block.inner(container);
        frame.render_widget(container_block, container);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(self.form.height()),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .margin(1)
            .split(inner);

        frame.render_widget(
            Paragraph::new("Create Account")
                .style(Style::default().fg(theme::TITLE).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center),
            layout[0],
        );

        self.form.render(frame, layout[1]);
        self.status.render(frame, layout[2]);

        let (back_text, back_style) = if self.back_focused {
            (
                "► Back to Login ◄",
                Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD),
            )
        } else {
            ("  Back to Login  ", Style::default().fg(theme::MUTED))
        };
        frame.render_widget(
            Paragraph::new(back_text)
                .style(back_style)
                .alignment(Alignment::Center),
            layout[3],
        );

        render_help(
            frame,
            layout[4],
            "TAB/Arrow Keys: Navigate | ENTER: Submit | ESC: Back to Login",
        );
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

    fn fill(register: &mut Register, values: [&str; 6]) {
        for (index, value) in values.iter().enumerate() {
            if index > 0 {
                register.handle_input(key(KeyCode::Tab)).unwrap();
            }
            type_text(register, value);
        }
    }

    #[test]
    fn mismatched_passwords_cite_confirmation() {
        let mut register = Register::new();
        fill(
            &mut register,
            ["Janet", "Abigail", "janet@hospus.com", "9001", "password1", "password2"],
        );
        assert!(register.handle_input(key(KeyCode::Enter)).unwrap().is_none());
        assert_eq!(register.form.focused_key(), Some("confirmPassword"));
        assert!(render_to_string(&register).contains("Passwords do not match."));
    }

    #[test]
    fn complete_form_requests_signup() {
        let mut register = Register::new();
        fill(
            &mut register,
            ["Janet", "Abigail", "janet@hospus.com", "9001", "password1", "password1"],
        );
        match register.handle_input(key(KeyCode::Enter)).unwrap() {
            Some(Transition::SignUp(request)) => assert_eq!(request.id_number, "9001"),
            other => panic!("unexpected transition: {other:?}"),
        }
    }

    #[test]
    fn back_link_returns_to_login() {
        let mut register = Register::new();
        register.handle_input(key(KeyCode::Up)).unwrap();
        assert!(matches!(
            register.handle_input(key(KeyCode::Enter)).unwrap(),
            Some(Transition::Go(Route::Login))
        ));
    }
}
