//! Keyboard-driven input form shared by every screen that collects data.

use super::theme;
use crate::tui::Frame;
use crate::validation::FieldErrors;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph},
};

#[derive(Debug, Clone)]
enum Kind {
    Text,
    Secret,
    Choice {
        options: Vec<&'static str>,
        index: usize,
    },
}

#[derive(Debug, Clone)]
pub struct Field {
    /// Key used by `FieldErrors` for this field.
    pub key: &'static str,
    pub label: &'static str,
    value: String,
    kind: Kind,
}

impl Field {
    pub fn text(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            value: String::new(),
            kind: Kind::Text,
        }
    }

    pub fn secret(key: &'static str, label: &'static str) -> Self {
        Self {
            kind: Kind::Secret,
            ..Self::text(key, label)
        }
    }

    /// A field cycled with Left/Right through `options`.
    pub fn choice(key: &'static str, label: &'static str, options: Vec<&'static str>) -> Self {
        Self {
            kind: Kind::Choice { options, index: 0 },
            ..Self::text(key, label)
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if let Kind::Choice { options, index } = &mut self.kind {
            if let Some(found) = options.iter().position(|option| *option == value) {
                *index = found;
            }
        } else {
            self.value = value;
        }
        self
    }

    pub fn value(&self) -> &str {
        match &self.kind {
            Kind::Choice { options, index } => options.get(*index).copied().unwrap_or_default(),
            _ => &self.value,
        }
    }

    fn shown(&self) -> String {
        match &self.kind {
            Kind::Text => self.value.clone(),
            Kind::Secret => "•".repeat(self.value.chars().count()),
            Kind::Choice { .. } => format!("◄ {} ►", self.value()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    Submit,
    Cancel,
}

#[derive(Debug, Clone)]
pub struct Form {
    fields: Vec<Field>,
    focus: usize,
    active: bool,
    errors: FieldErrors,
}

impl Form {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            focus: 0,
            active: true,
            errors: FieldErrors::new(),
        }
    }

    /// Value of the field with `key`; empty when there is no such field.
    pub fn value(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .map(Field::value)
            .unwrap_or_default()
    }

    /// Owned copy of [`Form::value`].
    pub fn string(&self, key: &str) -> String {
        self.value(key).to_string()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[cfg(test)]
    pub fn focused_key(&self) -> Option<&'static str> {
        self.focus_index()
            .and_then(|index| self.fields.get(index))
            .map(|field| field.key)
    }

    /// Index of the focused field; `None` while the focus is elsewhere on
    /// the screen.
    pub fn focus_index(&self) -> Option<usize> {
        self.active.then_some(self.focus)
    }

    pub fn set_focus(&mut self, index: usize) {
        self.focus = index.min(self.fields.len().saturating_sub(1));
        self.active = true;
    }

    pub fn blur(&mut self) {
        self.active = false;
    }

    pub fn set_errors(&mut self, errors: FieldErrors) {
        if let Some(index) = errors
            .first()
            .and_then(|(key, _)| self.fields.iter().position(|field| field.key == key))
        {
            self.focus = index;
            self.active = true;
        }
        self.errors = errors;
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Rows needed by [`Form::render`].
    pub fn height(&self) -> u16 {
        self.fields.len() as u16 * 3
    }

    /// Enter submits, Esc cancels, Tab and the arrows move between fields.
    pub fn handle_input(&mut self, key: KeyEvent) -> Option<FormAction> {
        let count = self.fields.len();
        match key.code {
            KeyCode::Esc => return Some(FormAction::Cancel),
            KeyCode::Enter => return Some(FormAction::Submit),
            KeyCode::Tab | KeyCode::Down if count > 0 => {
                self.set_focus((self.focus + 1) % count);
            }
            KeyCode::BackTab | KeyCode::Up if count > 0 => {
                self.set_focus((self.focus + count - 1) % count);
            }
            _ => self.edit(key),
        }
        None
    }

    /// Applies a character, Backspace or a choice change to the focused
    /// field. Navigation keys are left to the caller.
    pub fn edit(&mut self, key: KeyEvent) {
        if !self.active {
            return;
        }
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        match (key.code, &mut field.kind) {
            (KeyCode::Left | KeyCode::Right, Kind::Choice { options, index }) => {
                let len = options.len().max(1);
                *index = if key.code == KeyCode::Right {
                    (*index + 1) % len
                } else {
                    (*index + len - 1) % len
                };
            }
            (KeyCode::Char(c), Kind::Text | Kind::Secret) => {
                field.value.push(c);
                self.errors = FieldErrors::new();
            }
            (KeyCode::Backspace, Kind::Text | Kind::Secret) => {
                field.value.pop();
                self.errors = FieldErrors::new();
            }
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                self.fields
                    .iter()
                    .map(|_| Constraint::Length(3))
                    .chain(std::iter::once(Constraint::Min(0))),
            )
            .split(area);

        for (index, field) in self.fields.iter().enumerate() {
            let focused = self.active && index == self.focus;
            let error = self.errors.get(field.key);
            let (title, border) = match error {
                Some(message) => (format!(" {}: {} ", field.label, message), Color::Red),
                None if focused => (format!(" {} ", field.label), theme::FOCUS),
                None => (format!(" {} ", field.label), theme::BORDER),
            };
            let block = Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border))
                .style(Style::default().bg(theme::PANEL_BG));
            let text_style = if focused {
                Style::default().fg(theme::TITLE).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme::TEXT)
            };
            frame.render_widget(
                Paragraph::new(field.shown()).style(text_style).block(block),
                rows[index],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::testing::key;

    fn form() -> Form {
        Form::new(vec![
            Field::text("email", "Email"),
            Field::secret("password", "Password"),
            Field::choice("role", "Role", vec!["admin", "staff", "doctor", "patient"])
                .with_value("patient"),
        ])
    }

    #[test]
    fn typing_goes_to_focused_field() {
        let mut form = form();
        for c in "ab".chars() {
            form.handle_input(key(KeyCode::Char(c)));
        }
        form.handle_input(key(KeyCode::Tab));
        form.handle_input(key(KeyCode::Char('x')));
        form.handle_input(key(KeyCode::Backspace));
        form.handle_input(key(KeyCode::Char('y')));
        assert_eq!(form.value("email"), "ab");
        assert_eq!(form.value("password"), "y");
    }

    #[test]
    fn choice_cycles_and_ignores_typing() {
        let mut form = form();
        form.handle_input(key(KeyCode::Up));
        assert_eq!(form.focused_key(), Some("role"));
        form.handle_input(key(KeyCode::Char('z')));
        assert_eq!(form.value("role"), "patient");
        form.handle_input(key(KeyCode::Right));
        assert_eq!(form.value("role"), "admin");
        form.handle_input(key(KeyCode::Left));
        assert_eq!(form.value("role"), "patient");
    }

    #[test]
    fn errors_move_focus_to_first_bad_field() {
        let mut form = form();
        let mut errors = FieldErrors::new();
        errors.add("password", "Too short");
        form.set_errors(errors);
        assert_eq!(form.focused_key(), Some("password"));
        form.handle_input(key(KeyCode::Char('a')));
        assert!(form.errors().is_empty());
    }

    #[test]
    fn enter_and_esc_are_actions() {
        let mut form = form();
        assert_eq!(form.handle_input(key(KeyCode::Enter)), Some(FormAction::Submit));
        assert_eq!(form.handle_input(key(KeyCode::Esc)), Some(FormAction::Cancel));
    }
}
