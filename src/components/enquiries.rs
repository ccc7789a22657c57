//! Enquiry threads: list, messages, replies and new enquiries.

use crate::api::enquiries::DEFAULT_PAGE_SIZE;
use crate::api::envelope::Page;
use crate::api::{self, ApiClient};
use crate::components::form::{Field, Form, FormAction};
use crate::components::{
    centered_rect, clamp_selection, panel, render_background, render_header, render_help,
    select_next, select_previous, theme, Component, Notice, StatusLine, Transition,
};
use crate::models::{Enquiry, EnquiryStatus, Sender, User};
use crate::routes::{Capability, Route};
use crate::tui::Frame;
use crate::validation::{EnquiryForm, ReplyForm};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Threads,
    Reply,
}

/// Whether another page follows `page` (1-based) of `limit` rows.
fn has_more<T>(listing: &Page<T>, page: u32, limit: u32) -> bool {
    match listing.meta.and_then(|meta| meta.total) {
        Some(total) => u64::from(page) * u64::from(limit) < total,
        None => listing.items.len() as u64 >= u64::from(limit),
    }
}

fn sender_name(thread: &Enquiry, from: Sender) -> String {
    match from {
        Sender::Admin => "Admin".to_string(),
        Sender::User => thread
            .from_name
            .clone()
            .unwrap_or_else(|| "User".to_string()),
    }
}

fn reply_form() -> Form {
    Form::new(vec![Field::text("message", "Reply")])
}

fn compose_form() -> Form {
    Form::new(vec![
        Field::text("subject", "Subject"),
        Field::text("message", "Message"),
    ])
}

pub struct Enquiries {
    client: ApiClient,
    user: User,
    home: Route,
    threads: Vec<Enquiry>,
    state: TableState,
    page: u32,
    has_next: bool,
    focus: Focus,
    reply: Form,
    compose: Option<Form>,
    status: StatusLine,
}

impl Enquiries {
    pub fn new(client: ApiClient, user: &User) -> Self {
        let mut reply = reply_form();
        reply.blur();
        let mut screen = Self {
            client,
            user: user.clone(),
            home: user.role.default_route(),
            threads: Vec::new(),
            state: TableState::default(),
            page: 1,
            has_next: false,
            focus: Focus::Threads,
            reply,
            compose: None,
            status: StatusLine::default(),
        };
        screen.refresh();
        screen
    }

    fn selected(&self) -> Option<&Enquiry> {
        self.state.selected().and_then(|i| self.threads.get(i))
    }

    /// Reloads the current page, keeping the selected thread when it is
    /// still listed.
    fn refresh(&mut self) {
        let keep = self.selected().map(|thread| thread.id.clone());
        self.load(self.page, keep.as_deref());
    }

    /// Loads `page` and makes it current. On failure the shown page and its
    /// rows stay as they were.
    fn load(&mut self, page: u32, select: Option<&str>) -> bool {
        match api::enquiries::list(&self.client, page, DEFAULT_PAGE_SIZE) {
            Ok(listing) => {
                self.page = page;
                self.has_next = has_more(&listing, page, DEFAULT_PAGE_SIZE);
                self.threads = api::enquiries::visible_to(listing.items, &self.user);
                tracing::debug!(page = self.page, shown = self.threads.len(), "enquiries loaded");
                match select.and_then(|id| self.threads.iter().position(|t| t.id == id)) {
                    Some(index) => self.state.select(Some(index)),
                    None => clamp_selection(&mut self.state, self.threads.len()),
                }
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, page, "loading enquiries failed");
                self.status
                    .error(format!("Failed to load enquiries: {}", err.user_message()));
                false
            }
        }
    }

    fn next_page(&mut self) {
        if !self.has_next {
            self.status.error("No more enquiries.");
            return;
        }
        if self.load(self.page + 1, None) {
            self.state.select(Some(0));
            clamp_selection(&mut self.state, self.threads.len());
        }
    }

    fn previous_page(&mut self) {
        if self.page <= 1 {
            self.status.error("Already on the first page.");
            return;
        }
        if self.load(self.page - 1, None) {
            self.state.select(Some(0));
            clamp_selection(&mut self.state, self.threads.len());
        }
    }

    fn open_compose(&mut self) {
        if self.user.role.can(Capability::OpenEnquiry) {
            self.compose = Some(compose_form());
        } else {
            self.status.error("Only patients can open a new enquiry.");
        }
    }

    fn submit_compose(&mut self) {
        let Some(form) = self.compose.as_mut() else {
            return;
        };
        let input = EnquiryForm {
            subject: form.string("subject"),
            message: form.string("message"),
        };
        let enquiry = match input.validate() {
            Ok(enquiry) => enquiry,
            Err(errors) => {
                if let Some((_, message)) = errors.first() {
                    self.status.error(message);
                }
                form.set_errors(errors);
                return;
            }
        };
        match api::enquiries::create(&self.client, &enquiry) {
            Ok(created) => {
                tracing::info!(id = %created.id, "enquiry opened");
                self.compose = None;
                self.load(1, Some(&created.id));
                self.status.success("Enquiry submitted.");
            }
            Err(err) => self
                .status
                .error(format!("Failed to submit enquiry: {}", err.user_message())),
        }
    }

    fn send_reply(&mut self) {
        let Some(thread_id) = self.selected().map(|thread| thread.id.clone()) else {
            self.status.error("Select a conversation first.");
            return;
        };
        let input = ReplyForm {
            message: self.reply.string("message"),
        };
        let message = match input.validate() {
            Ok(message) => message,
            Err(errors) => {
                self.reply.set_errors(errors);
                return;
            }
        };
        match api::enquiries::reply(&self.client, &thread_id, &message) {
            Ok(_) => {
                tracing::info!(id = %thread_id, "reply posted");
                self.reply = reply_form();
                self.refresh();
                self.status.success("Reply sent.");
            }
            Err(err) => self
                .status
                .error(format!("Failed to send reply: {}", err.user_message())),
        }
    }

    fn focus_threads(&mut self) {
        self.focus = Focus::Threads;
        self.reply.blur();
    }

    fn focus_reply(&mut self) {
        self.focus = Focus::Reply;
        self.reply.set_focus(0);
    }

    fn render_threads(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Threads && self.compose.is_none();
        let title = format!("Conversations (page {})", self.page);
        if self.threads.is_empty() {
            frame.render_widget(
                Paragraph::new("No enquiries yet.")
                    .style(Style::default().fg(theme::MUTED))
                    .alignment(Alignment::Center)
                    .block(panel(&title, focused)),
                area,
            );
            return;
        }

        let rows = self.threads.iter().map(|thread| {
            let (label, color) = match thread.status {
                EnquiryStatus::Open => ("open", theme::SUCCESS),
                EnquiryStatus::Closed => ("closed", theme::MUTED),
            };
            Row::new(vec![
                Cell::from(thread.subject.clone()).style(Style::default().fg(theme::TEXT)),
                Cell::from(label).style(Style::default().fg(color)),
            ])
        });
        let table = Table::new(rows, [Constraint::Min(10), Constraint::Length(7)])
            .block(panel(&title, focused))
            .row_highlight_style(
                Style::default()
                    .bg(theme::ROW_HIGHLIGHT)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("► ");
        frame.render_stateful_widget(table, area, &mut self.state.clone());
    }

    fn render_messages(&self, frame: &mut Frame, area: Rect) {
        let Some(thread) = self.selected() else {
            frame.render_widget(
                Paragraph::new("Select a conversation to view messages.")
                    .style(Style::default().fg(theme::MUTED))
                    .alignment(Alignment::Center)
                    .block(panel("Messages", false)),
                area,
            );
            return;
        };

        let mut lines = vec![
            Line::from(Span::styled(
                thread.subject.clone(),
                Style::default()
                    .fg(theme::TITLE)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!(
                    "From: {} • {}",
                    thread.from_name.as_deref().unwrap_or("-"),
                    thread.created_at.as_deref().unwrap_or("-")
                ),
                Style::default().fg(theme::MUTED),
            )),
            Line::from(""),
        ];
        for reply in &thread.messages {
            let color = match reply.from {
                Sender::Admin => theme::ACCENT,
                Sender::User => theme::FOCUS,
            };
            let mut heading = sender_name(thread, reply.from);
            if let Some(date) = &reply.date {
                heading.push_str(&format!(" • {date}"));
            }
            lines.push(Line::from(Span::styled(heading, Style::default().fg(color))));
            lines.push(Line::from(Span::styled(
                reply.message.clone(),
                Style::default().fg(theme::TEXT),
            )));
        }
        let status = match thread.status {
            EnquiryStatus::Open => "open",
            EnquiryStatus::Closed => "closed",
        };
        frame.render_widget(
            Paragraph::new(lines)
                .block(panel(&format!("Messages (status: {status})"), false))
                .wrap(Wrap { trim: false }),
            area,
        );
    }

    fn render_compose(&self, form: &Form, frame: &mut Frame) {
        let area = centered_rect(60, 40, frame.area());
        frame.render_widget(Clear, area);
        let block = panel("New Enquiry", true).style(Style::default().bg(theme::DIALOG_BG));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(form.height()),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .margin(1)
            .split(inner);
        form.render(frame, rows[0]);
        render_help(frame, rows[1], "ENTER: Submit | TAB: Next field | ESC: Cancel");
    }
}

impl Component for Enquiries {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<Transition>> {
        self.status.expire();

        if let Some(form) = self.compose.as_mut() {
            match form.handle_input(key) {
                Some(FormAction::Cancel) => self.compose = None,
                Some(FormAction::Submit) => self.submit_compose(),
                None => {}
            }
            return Ok(None);
        }

        if self.focus == Focus::Reply {
            match key.code {
                KeyCode::Tab | KeyCode::BackTab => self.focus_threads(),
                _ => match self.reply.handle_input(key) {
                    Some(FormAction::Cancel) => self.focus_threads(),
                    Some(FormAction::Submit) => self.send_reply(),
                    None => {}
                },
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Down => select_next(&mut self.state, self.threads.len()),
            KeyCode::Up => select_previous(&mut self.state, self.threads.len()),
            KeyCode::Tab | KeyCode::Enter => self.focus_reply(),
            KeyCode::Char('n') | KeyCode::Char('N') => self.open_compose(),
            KeyCode::Char(']') | KeyCode::PageDown => self.next_page(),
            KeyCode::Char('[') | KeyCode::PageUp => self.previous_page(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.refresh(),
            KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('B') => {
                return Ok(Some(Transition::Go(self.home)));
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
                Constraint::Min(10),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(frame.area());
        render_header(frame, layout[0], "MESSAGES & ENQUIRIES");

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .spacing(1)
            .split(layout[1]);
        self.render_threads(frame, columns[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(self.reply.height())])
            .split(columns[1]);
        self.render_messages(frame, right[0]);
        self.reply.render(frame, right[1]);

        self.status.render(frame, layout[2]);
        let help = match (self.focus, self.user.role.can(Capability::OpenEnquiry)) {
            (Focus::Reply, _) => "ENTER: Send reply | TAB/ESC: Back to conversations",
            (Focus::Threads, true) => {
                "↑/↓: Select | TAB: Reply | N: New enquiry | [/]: Page | R: Refresh | ESC: Back"
            }
            (Focus::Threads, false) => {
                "↑/↓: Select | TAB: Reply | [/]: Page | R: Refresh | ESC: Back"
            }
        };
        render_help(frame, layout[3], help);

        if let Some(form) = &self.compose {
            self.render_compose(form, frame);
        }
    }

    fn tick(&mut self) {
        self.status.expire();
    }

    fn set_notice(&mut self, notice: Notice) {
        self.status.set(notice);
    }
}
