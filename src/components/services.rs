//! Service catalog. Patients can book a service from here; admins browse.

use crate::api::{self, ApiClient};
use crate::components::form::{Field, Form, FormAction};
use crate::components::{
    centered_rect, clamp_selection, panel, render_background, render_header, render_help,
    select_next, select_previous, theme, Component, Notice, StatusLine, Transition,
};
use crate::error::ApiError;
use crate::models::{Service, User};
use crate::routes::{Capability, Route};
use crate::tui::Frame;
use crate::validation::ScheduleForm;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

pub const MSG_BOOKED: &str = "Booking request submitted. You will be notified when confirmed.";

fn describe(service: &Service) -> String {
    let mut parts = Vec::new();
    if let Some(department) = &service.department {
        parts.push(department.clone());
    }
    if let Some(minutes) = service.duration_minutes {
        parts.push(format!("{minutes} mins"));
    }
    if let Some(price) = service.price {
        parts.push(format!("R{price:.2}"));
    }
    parts.join(" • ")
}

/// Booking overlay for one service.
struct Booking {
    service: Service,
    form: Form,
}

impl Booking {
    fn new(service: Service) -> Self {
        Self {
            service,
            form: Form::new(vec![
                Field::text("date", "Date (YYYY-MM-DD)"),
                Field::text("time", "Time (HH:MM)"),
                Field::text("notes", "Notes (optional)"),
            ]),
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = centered_rect(60, 50, frame.area());
        frame.render_widget(Clear, area);
        let block = panel(&format!("Book {}", self.service.name), true)
            .style(Style::default().bg(theme::DIALOG_BG));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(self.form.height()),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .margin(1)
            .split(inner);
        frame.render_widget(
            Paragraph::new(describe(&self.service)).style(Style::default().fg(theme::MUTED)),
            rows[0],
        );
        self.form.render(frame, rows[1]);
        render_help(frame, rows[2], "ENTER: Submit booking | TAB: Next field | ESC: Cancel");
    }
}

pub struct Services {
    client: ApiClient,
    home: Route,
    can_book: bool,
    services: Vec<Service>,
    state: TableState,
    booking: Option<Booking>,
    status: StatusLine,
}

impl Services {
    pub fn new(client: ApiClient, user: &User) -> Self {
        let mut screen = Self {
            client,
            home: user.role.default_route(),
            can_book: user.role.can(Capability::BookServices),
            services: Vec::new(),
            state: TableState::default(),
            booking: None,
            status: StatusLine::default(),
        };
        screen.refresh();
        screen
    }

    fn refresh(&mut self) {
        match api::services::list(&self.client) {
            Ok(services) => {
                tracing::debug!(count = services.len(), "service catalog loaded");
                self.services = services;
                clamp_selection(&mut self.state, self.services.len());
            }
            Err(err) => {
                tracing::warn!(error = %err, "loading services failed");
                self.status
                    .error(format!("Failed to load services: {}", err.user_message()));
            }
        }
    }

    fn selected(&self) -> Option<&Service> {
        self.state.selected().and_then(|i| self.services.get(i))
    }

    fn open_booking(&mut self) {
        if !self.can_book {
            self.status.error("Only patients can book services.");
            return;
        }
        match self.selected().cloned() {
            Some(service) => self.booking = Some(Booking::new(service)),
            None => self.status.error("Please select a service."),
        }
    }

    fn submit_booking(&mut self) {
        let Some(booking) = self.booking.as_mut() else {
            return;
        };
        let form = ScheduleForm {
            date: booking.form.string("date"),
            time: booking.form.string("time"),
        };
        let (date, time) = match form.validate() {
            Ok(slot) => slot,
            Err(errors) => {
                if let Some((_, message)) = errors.first() {
                    self.status.error(message);
                }
                booking.form.set_errors(errors);
                return;
            }
        };
        let notes = booking.form.string("notes");
        match api::appointments::book(&self.client, &booking.service, &date, &time, &notes) {
            Ok(appointment) => {
                tracing::info!(id = %appointment.id, service = %booking.service.id, "service booked");
                self.booking = None;
                self.status.success(MSG_BOOKED);
            }
            Err(err) => {
                tracing::warn!(error = %err, "booking failed");
                let message = match &err {
                    ApiError::Status { .. } => err.user_message(),
                    _ => format!("Failed to submit booking: {}", err.user_message()),
                };
                self.status.error(message);
            }
        }
    }

    fn render_catalog(&self, frame: &mut Frame, area: Rect) {
        if self.services.is_empty() {
            frame.render_widget(
                Paragraph::new("No services available.")
                    .style(Style::default().fg(theme::MUTED))
                    .alignment(Alignment::Center)
                    .block(panel("Available Services", true)),
                area,
            );
            return;
        }

        let header = Row::new(["Service", "Department", "Duration", "Price"])
            .style(
                Style::default()
                    .fg(theme::TITLE)
                    .bg(theme::HEADER_BG)
                    .add_modifier(Modifier::BOLD),
            )
            .height(1)
            .bottom_margin(1);
        let rows = self.services.iter().map(|service| {
            Row::new(vec![
                Cell::from(service.name.clone()),
                Cell::from(service.department.clone().unwrap_or_default()),
                Cell::from(
                    service
                        .duration_minutes
                        .map(|m| format!("{m} mins"))
                        .unwrap_or_default(),
                ),
                Cell::from(service.price.map(|p| format!("R{p:.2}")).unwrap_or_default()),
            ])
            .style(Style::default().fg(theme::TEXT))
        });
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(35),
                Constraint::Percentage(30),
                Constraint::Percentage(15),
                Constraint::Percentage(20),
            ],
        )
        .header(header)
        .block(panel("Available Services", self.booking.is_none()))
        .row_highlight_style(
            Style::default()
                .bg(theme::ROW_HIGHLIGHT)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, area, &mut self.state.clone());
    }
}

impl Component for Services {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<Transition>> {
        self.status.expire();

        if let Some(booking) = self.booking.as_mut() {
            match booking.form.handle_input(key) {
                Some(FormAction::Cancel) => self.booking = None,
                Some(FormAction::Submit) => self.submit_booking(),
                None => {}
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Down => select_next(&mut self.state, self.services.len()),
            KeyCode::Up => select_previous(&mut self.state, self.services.len()),
            KeyCode::Enter => self.open_booking(),
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
                Constraint::Min(8),
                Constraint::Length(5),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(frame.area());

        render_header(
            frame,
            layout[0],
            if self.can_book { "BOOK A SERVICE" } else { "SERVICES" },
        );
        self.render_catalog(frame, layout[1]);

        let details = self
            .selected()
            .map(|service| {
                let summary = describe(service);
                match &service.description {
                    Some(description) => format!("{summary}\n{description}"),
                    None => summary,
                }
            })
            .unwrap_or_default();
        frame.render_widget(
            Paragraph::new(details)
                .style(Style::default().fg(theme::TEXT))
                .block(panel("Details", false))
                .wrap(Wrap { trim: true }),
            layout[2],
        );

        self.status.render(frame, layout[3]);
        render_help(
            frame,
            layout[4],
            if self.can_book {
                "↑/↓: Select | ENTER: Book | R: Refresh | ESC: Back"
            } else {
                "↑/↓: Select | R: Refresh | ESC: Back"
            },
        );

        if let Some(booking) = &self.booking {
            booking.render(frame);
        }
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
    use crate::api::mock::{client_with, MockTransport};
    use crate::api::Method;
    use crate::components::testing::{key, render_to_string, type_text};
    use crate::models::Role;
    use serde_json::json;

    fn user(role: Role) -> User {
        User {
            id: "u1".into(),
            name: "Lerato".into(),
            email: "lerato@hospus.com".into(),
            role,
            active: true,
        }
    }

    fn catalog() -> MockTransport {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/services",
            200,
            json!({"success": true, "data": {"items": [
                {"id": "s1", "name": "General Consultation", "department": "General Medicine",
                 "durationMinutes": 30, "price": 200.0},
                {"id": "s3", "name": "Blood Test", "department": "Pathology"}
            ]}}),
        );
        mock
    }

    fn fill_slot(screen: &mut Services, date: &str, time: &str, notes: &str) {
        type_text(screen, date);
        screen.handle_input(key(KeyCode::Tab)).unwrap();
        type_text(screen, time);
        screen.handle_input(key(KeyCode::Tab)).unwrap();
        type_text(screen, notes);
    }

    #[test]
    fn patient_books_selected_service() {
        let mock = catalog();
        mock.on(
            Method::Post,
            "/appointments",
            201,
            json!({"success": true, "data": {"id": "a9", "service": "Blood Test",
                   "date": "2030-02-01", "time": "09:30", "status": "Pending"}}),
        );
        let mut screen = Services::new(client_with(&mock), &user(Role::Patient));
        screen.handle_input(key(KeyCode::Down)).unwrap();
        screen.handle_input(key(KeyCode::Enter)).unwrap();
        assert!(render_to_string(&screen).contains("Book Blood Test"));

        fill_slot(&mut screen, "2030-02-01", "09:30", "fasting");
        screen.handle_input(key(KeyCode::Enter)).unwrap();

        assert!(screen.booking.is_none());
        assert_eq!(
            screen.status.current().map(|n| n.message.as_str()),
            Some(MSG_BOOKED)
        );
        assert_eq!(
            mock.requests_to(Method::Post, "/appointments")[0].body,
            Some(json!({"serviceId": "s3", "service": "Blood Test", "date": "2030-02-01",
                        "time": "09:30", "notes": "fasting", "status": "Pending"}))
        );
    }

    #[test]
    fn failed_booking_is_reported_not_faked() {
        let mock = catalog();
        mock.fail(Method::Post, "/appointments", "connection refused");
        let mut screen = Services::new(client_with(&mock), &user(Role::Patient));
        screen.handle_input(key(KeyCode::Enter)).unwrap();
        fill_slot(&mut screen, "2030-02-01", "09:30", "");
        screen.handle_input(key(KeyCode::Enter)).unwrap();

        assert!(screen.booking.is_some());
        let notice = screen.status.current().unwrap();
        assert!(notice.is_error());
        assert!(notice.message.starts_with("Failed to submit booking"));
    }

    #[test]
    fn server_message_is_shown_on_rejection() {
        let mock = catalog();
        mock.on(
            Method::Post,
            "/appointments",
            409,
            json!({"success": false, "message": "Slot already taken"}),
        );
        let mut screen = Services::new(client_with(&mock), &user(Role::Patient));
        screen.handle_input(key(KeyCode::Enter)).unwrap();
        fill_slot(&mut screen, "2030-02-01", "09:30", "");
        screen.handle_input(key(KeyCode::Enter)).unwrap();
        assert_eq!(
            screen.status.current().map(|n| n.message.as_str()),
            Some("Slot already taken")
        );
    }

    #[test]
    fn missing_slot_sends_nothing() {
        let mock = catalog();
        let mut screen = Services::new(client_with(&mock), &user(Role::Patient));
        screen.handle_input(key(KeyCode::Enter)).unwrap();
        screen.handle_input(key(KeyCode::Enter)).unwrap();
        assert_eq!(
            screen.status.current().map(|n| n.message.as_str()),
            Some("Please choose a date and time.")
        );
        assert!(mock.requests_to(Method::Post, "/appointments").is_empty());
    }

    #[test]
    fn admin_browses_without_booking() {
        let mock = catalog();
        let mut screen = Services::new(client_with(&mock), &user(Role::Admin));
        screen.handle_input(key(KeyCode::Enter)).unwrap();
        assert!(screen.booking.is_none());
        let shown = render_to_string(&screen);
        assert!(shown.contains("General Consultation"));
        assert!(shown.contains("General Medicine • 30 mins • R200.00"));
        assert!(matches!(
            screen.handle_input(key(KeyCode::Esc)).unwrap(),
            Some(Transition::Go(Route::Dashboard))
        ));
    }
}
