//! User management with optimistic create, edit and delete.
//!
//! Every change is applied to the local [`UserDirectory`] first and the
//! request runs on a worker thread. Results come back over a channel that
//! `tick` drains; a failure rolls the local change back and shows a notice.
//! Rows created locally carry a `tmp-` id until the server answers.

use crate::api::{self, ApiClient};
use crate::components::form::{Field, Form, FormAction};
use crate::components::{
    centered_rect, clamp_selection, panel, render_background, render_header, render_help,
    select_next, select_previous, theme, Component, ConfirmDialog, StatusLine, Transition,
};
use crate::error::ApiError;
use crate::models::{NewUser, Role, User, UserPatch};
use crate::routes::Route;
use crate::tui::Frame;
use crate::validation::{UserEditForm, UserForm};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Cell, Clear, Paragraph, Row, Table, TableState},
};
use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

pub const TEMP_PREFIX: &str = "tmp-";

const MSG_WAIT_FOR_CREATE: &str = "Please wait for user creation to finish before editing.";
const MSG_WAIT_FOR_UPDATE: &str = "Please wait for the previous change to this user to finish.";
const ACTIVE_OPTIONS: [&str; 2] = ["Active", "Inactive"];

/// Local copy of the user list.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: Vec<User>,
    next_temp: u64,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users,
            next_temp: 0,
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&User> {
        self.users.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.users.iter().position(|user| user.id == id)
    }

    pub fn is_temporary(id: &str) -> bool {
        id.starts_with(TEMP_PREFIX)
    }

    /// Appends a placeholder row for `draft` and returns its temporary id.
    pub fn insert_temporary(&mut self, draft: &NewUser) -> String {
        self.next_temp += 1;
        let id = format!("{TEMP_PREFIX}{}", self.next_temp);
        self.users.push(User {
            id: id.clone(),
            name: draft.name.clone(),
            email: draft.email.clone(),
            role: draft.role,
            active: draft.active,
        });
        id
    }

    /// Replaces the placeholder `temp_id` with the saved user. `false` when
    /// the placeholder is gone.
    pub fn reconcile(&mut self, temp_id: &str, saved: User) -> bool {
        match self.position(temp_id) {
            Some(index) => {
                self.users[index] = saved;
                true
            }
            None => false,
        }
    }

    /// Removes the row with `id`, returning it with its former position.
    pub fn remove(&mut self, id: &str) -> Option<(usize, User)> {
        let index = self.position(id)?;
        Some((index, self.users.remove(index)))
    }

    /// Puts back a row taken out by [`UserDirectory::remove`].
    pub fn restore(&mut self, (index, user): (usize, User)) {
        let index = index.min(self.users.len());
        self.users.insert(index, user);
    }

    /// Overwrites the row with the same id, returning the previous version.
    pub fn replace(&mut self, user: User) -> Option<User> {
        let index = self.position(&user.id)?;
        Some(std::mem::replace(&mut self.users[index], user))
    }
}

/// Outcome of a background request, with what is needed to roll back.
#[derive(Debug)]
pub enum UserEvent {
    Created {
        temp_id: String,
        result: Result<User, ApiError>,
    },
    Deleted {
        previous: (usize, User),
        result: Result<(), ApiError>,
    },
    Updated {
        previous: User,
        result: Result<User, ApiError>,
    },
}

enum Editor {
    Create(Form),
    Edit { id: String, form: Form },
}

impl Editor {
    fn form_mut(&mut self) -> &mut Form {
        match self {
            Editor::Create(form) => form,
            Editor::Edit { form, .. } => form,
        }
    }

    fn form(&self) -> &Form {
        match self {
            Editor::Create(form) => form,
            Editor::Edit { form, .. } => form,
        }
    }
}

fn role_options() -> Vec<&'static str> {
    Role::ALL.iter().map(|role| role.as_str()).collect()
}

pub struct Users {
    client: ApiClient,
    directory: UserDirectory,
    state: TableState,
    editor: Option<Editor>,
    delete_dialog: ConfirmDialog,
    status: StatusLine,
    events_tx: Sender<UserEvent>,
    events_rx: Receiver<UserEvent>,
    in_flight: usize,
    /// Rows with an update still running; their rollback snapshot is live.
    updating: HashSet<String>,
}

impl Users {
    pub fn new(client: ApiClient) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let mut screen = Self {
            client,
            directory: UserDirectory::default(),
            state: TableState::default(),
            editor: None,
            delete_dialog: ConfirmDialog::default(),
            status: StatusLine::default(),
            events_tx,
            events_rx,
            in_flight: 0,
            updating: HashSet::new(),
        };
        screen.refresh();
        screen
    }

    fn refresh(&mut self) {
        if self.in_flight > 0 {
            self.status.error("Please wait for pending changes to finish.");
            return;
        }
        match api::users::get_all(&self.client) {
            Ok(users) => {
                self.directory = UserDirectory::new(users);
                clamp_selection(&mut self.state, self.directory.len());
            }
            Err(err) => {
                tracing::warn!(error = %err, "loading users failed");
                self.status.error(err.user_message());
            }
        }
    }

    fn selected(&self) -> Option<&User> {
        self.state.selected().and_then(|i| self.directory.get(i))
    }

    fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce(&ApiClient) -> UserEvent + Send + 'static,
    {
        let client = self.client.clone();
        let events = self.events_tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            // The screen may be gone by the time the request finishes.
            let _ = events.send(job(&client));
        });
    }

    fn apply_event(&mut self, event: UserEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match event {
            UserEvent::Created {
                temp_id,
                result: Ok(user),
            } => {
                tracing::info!(user_id = %user.id, "user created");
                if !self.directory.reconcile(&temp_id, user) {
                    tracing::debug!(%temp_id, "placeholder removed before creation finished");
                }
                self.status.success("User created.");
            }
            UserEvent::Created {
                temp_id,
                result: Err(err),
            } => {
                tracing::warn!(error = %err, "user creation failed");
                self.directory.remove(&temp_id);
                self.status
                    .error(format!("Failed to create user: {}", err.user_message()));
            }
            UserEvent::Deleted { result: Ok(()), .. } => {
                self.status.success("User deleted.");
            }
            UserEvent::Deleted {
                previous,
                result: Err(err),
            } => {
                tracing::warn!(error = %err, user_id = %previous.1.id, "user deletion failed");
                self.directory.restore(previous);
                self.status
                    .error(format!("Failed to delete user: {}", err.user_message()));
            }
            UserEvent::Updated {
                result: Ok(user), ..
            } => {
                self.updating.remove(&user.id);
                self.directory.replace(user);
                self.status.success("User updated.");
            }
            UserEvent::Updated {
                previous,
                result: Err(err),
            } => {
                tracing::warn!(error = %err, user_id = %previous.id, "user update failed");
                self.updating.remove(&previous.id);
                self.directory.replace(previous);
                self.status
                    .error(format!("Failed to update user: {}", err.user_message()));
            }
        }
        clamp_selection(&mut self.state, self.directory.len());
    }

    fn open_create(&mut self) {
        self.editor = Some(Editor::Create(Form::new(vec![
            Field::text("name", "Name"),
            Field::text("email", "Email"),
            Field::choice("role", "Role", role_options()).with_value(Role::Patient.as_str()),
        ])));
    }

    fn open_edit(&mut self) {
        let Some(user) = self.selected().cloned() else {
            return;
        };
        if UserDirectory::is_temporary(&user.id) {
            self.status.error(MSG_WAIT_FOR_CREATE);
            return;
        }
        if self.updating.contains(&user.id) {
            self.status.error(MSG_WAIT_FOR_UPDATE);
            return;
        }
        let active = if user.active { ACTIVE_OPTIONS[0] } else { ACTIVE_OPTIONS[1] };
        self.editor = Some(Editor::Edit {
            id: user.id.clone(),
            form: Form::new(vec![
                Field::text("name", "Name").with_value(user.name.clone()),
                Field::choice("role", "Role", role_options()).with_value(user.role.as_str()),
                Field::choice("active", "Status", ACTIVE_OPTIONS.to_vec()).with_value(active),
            ]),
        });
    }

    fn submit_editor(&mut self) {
        let Some(editor) = self.editor.take() else {
            return;
        };
        match editor {
            Editor::Create(mut form) => {
                let input = UserForm {
                    name: form.string("name"),
                    email: form.string("email"),
                    role: Role::parse(form.value("role")).unwrap_or(Role::Patient),
                };
                match input.validate() {
                    Ok(draft) => self.create(draft),
                    Err(errors) => {
                        form.set_errors(errors);
                        self.editor = Some(Editor::Create(form));
                    }
                }
            }
            Editor::Edit { id, mut form } => {
                let input = UserEditForm {
                    name: form.string("name"),
                    role: Role::parse(form.value("role")).unwrap_or(Role::Patient),
                    active: form.value("active") == ACTIVE_OPTIONS[0],
                };
                match input.validate() {
                    Ok(patch) => self.update(&id, patch),
                    Err(errors) => {
                        form.set_errors(errors);
                        self.editor = Some(Editor::Edit { id, form });
                    }
                }
            }
        }
    }

    fn create(&mut self, draft: NewUser) {
        let temp_id = self.directory.insert_temporary(&draft);
        self.state.select(self.directory.position(&temp_id));
        self.spawn(move |client| UserEvent::Created {
            result: api::users::create(client, &draft),
            temp_id,
        });
    }

    fn update(&mut self, id: &str, patch: UserPatch) {
        let Some(current) = self.directory.position(id).and_then(|i| self.directory.get(i))
        else {
            return;
        };
        let mut local = current.clone();
        if let Some(name) = &patch.name {
            local.name = name.clone();
        }
        if let Some(role) = patch.role {
            local.role = role;
        }
        if let Some(active) = patch.active {
            local.active = active;
        }
        let Some(previous) = self.directory.replace(local) else {
            return;
        };
        let id = id.to_string();
        self.updating.insert(id.clone());
        self.spawn(move |client| UserEvent::Updated {
            result: api::users::update(client, &id, &patch),
            previous,
        });
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected().map(|user| user.id.clone()) else {
            return;
        };
        let Some(previous) = self.directory.remove(&id) else {
            return;
        };
        clamp_selection(&mut self.state, self.directory.len());
        if UserDirectory::is_temporary(&id) {
            self.status.success("User removed.");
            return;
        }
        self.spawn(move |client| UserEvent::Deleted {
            result: api::users::delete(client, &id),
            previous,
        });
    }

    /// Blocks until every background request has reported back.
    #[cfg(test)]
    fn settle(&mut self) {
        while self.in_flight > 0 {
            let event = self
                .events_rx
                .recv_timeout(std::time::Duration::from_secs(5))
                .expect("worker reported back");
            self.apply_event(event);
        }
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let header = Row::new(["Name", "Email", "Role", "Status"])
            .style(
                Style::default()
                    .fg(theme::TITLE)
                    .bg(theme::HEADER_BG)
                    .add_modifier(Modifier::BOLD),
            )
            .height(1);
        let rows: Vec<Row> = self
            .directory
            .users()
            .iter()
            .map(|user| {
                let pending = UserDirectory::is_temporary(&user.id);
                let status = if pending {
                    "Saving…"
                } else if user.active {
                    "Active"
                } else {
                    "Inactive"
                };
                let style = if pending {
                    Style::default().fg(theme::MUTED).add_modifier(Modifier::ITALIC)
                } else {
                    Style::default().fg(theme::TEXT)
                };
                Row::new(vec![
                    Cell::from(user.display_name().to_string()),
                    Cell::from(user.email.clone()),
                    Cell::from(user.role.as_str()),
                    Cell::from(status),
                ])
                .style(style)
            })
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(28),
                Constraint::Percentage(38),
                Constraint::Percentage(16),
                Constraint::Percentage(18),
            ],
        )
        .header(header)
        .block(panel("Users", self.editor.is_none()))
        .row_highlight_style(
            Style::default()
                .bg(theme::ROW_HIGHLIGHT)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, area, &mut self.state.clone());
    }

    fn render_editor(&self, frame: &mut Frame, editor: &Editor) {
        let title = match editor {
            Editor::Create(_) => "New User",
            Editor::Edit { .. } => "Edit User",
        };
        let form = editor.form();
        let area = centered_rect(50, 50, frame.area());
        frame.render_widget(Clear, area);
        let block = panel(title, true).style(Style::default().bg(theme::DIALOG_BG));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(form.height()),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);
        form.render(frame, rows[0]);
        render_help(frame, rows[1], "ENTER: Save | ←/→: Change option | ESC: Cancel");
    }
}

impl Component for Users {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<Transition>> {
        self.status.expire();

        if self.delete_dialog.is_open() {
            if self.delete_dialog.handle_input(key) == Some(true) {
                self.delete_selected();
            }
            return Ok(None);
        }

        if let Some(editor) = self.editor.as_mut() {
            match editor.form_mut().handle_input(key) {
                Some(FormAction::Cancel) => self.editor = None,
                Some(FormAction::Submit) => self.submit_editor(),
                None => {}
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Down => select_next(&mut self.state, self.directory.len()),
            KeyCode::Up => select_previous(&mut self.state, self.directory.len()),
            KeyCode::Char('a') | KeyCode::Char('A') => self.open_create(),
            KeyCode::Char('e') | KeyCode::Char('E') | KeyCode::Enter => self.open_edit(),
            KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => {
                let busy = self.selected().map(|user| self.updating.contains(&user.id));
                match busy {
                    Some(true) => self.status.error(MSG_WAIT_FOR_UPDATE),
                    Some(false) => self.delete_dialog.open(),
                    None => {}
                }
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.refresh(),
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('B') => {
                return Ok(Some(Transition::Go(Route::Dashboard)));
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        render_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(2),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(frame.area());

        render_header(frame, layout[0], "USER MANAGEMENT");
        if self.directory.is_empty() {
            frame.render_widget(
                Paragraph::new("No users yet. Press A to add one.")
                    .style(Style::default().fg(theme::MUTED))
                    .alignment(Alignment::Center)
                    .block(panel("Users", true)),
                layout[1],
            );
        } else {
            self.render_table(frame, layout[1]);
        }
        self.status.render(frame, layout[2]);
        render_help(
            frame,
            layout[3],
            "↑/↓: Select | A: Add | E: Edit | D: Delete | R: Refresh | ESC: Back",
        );

        if let Some(editor) = &self.editor {
            self.render_editor(frame, editor);
        }
        self.delete_dialog
            .render(frame, "Delete User", "Delete the selected user?");
    }

    fn tick(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }
        self.status.expire();
    }
}
