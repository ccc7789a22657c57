//! Forgot-password screen. The reset request is only acknowledged locally.

use crate::components::form::{Field, Form, FormAction};
use crate::components::{
    centered_columns, render_background, render_header, render_help, Component, StatusLine,
    Transition,
};
use crate::routes::Route;
use crate::tui::Frame;
use crate::validation::ForgotPasswordForm;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

pub struct ForgotPassword {
    form: Form,
    status: StatusLine,
}

impl ForgotPassword {
    pub fn new() -> Self {
        Self {
            form: Form::new(vec![Field::text("email", "Email")]),
            status: StatusLine::default(),
        }
    }

    fn submit(&mut self) {
        let form = ForgotPasswordForm {
            email: self.form.string("email"),
        };
        match form.validate() {
            Ok(email) => {
                tracing::info!("password reset requested");
                self.status
                    .success(format!("Password reset link sent to {email}."));
            }
            Err(errors) => {
                if let Some((_, message)) = errors.first() {
                    self.status.error(message);
                }
                self.form.set_errors(errors);
            }
        }
    }
}

impl Default for ForgotPassword {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ForgotPassword {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<Transition>> {
        self.status.expire();
        match self.form.handle_input(key) {
            Some(FormAction::Cancel) => Ok(Some(Transition::Go(Route::Login))),
            Some(FormAction::Submit) => {
                self.submit();
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn render(&self, frame: &mut Frame) {
        render_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Length(self.form.height()),
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .margin(1)
            .split(frame.area());

        render_header(frame, layout[0], "FORGOT PASSWORD");
        render_help(
            frame,
            layout[1],
            "Enter the email address of your account to receive a reset link.",
        );
        self.form.render(frame, centered_columns(layout[2], 60));
        self.status.render(frame, layout[3]);
        render_help(frame, layout[4], "ENTER: Send link | ESC: Back to Login");
    }

    fn tick(&mut self) {
        self.status.expire();
    }
}
