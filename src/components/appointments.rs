//! Appointments screen: upcoming and past tables, cancel and reschedule.

use crate::api::{self, ApiClient};
use crate::components::form::{Field, Form, FormAction};
use crate::components::{
    centered_rect, clamp_selection, panel, render_background, render_header, render_help,
    select_next, select_previous, theme, Component, ConfirmDialog, StatusLine, Transition,
};
use crate::models::{local_now, parse_date, Appointment, AppointmentStatus, User};
use crate::routes::Route;
use crate::tui::Frame;
use crate::validation::ScheduleForm;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{
        calendar::{CalendarEventStore, Monthly},
        Cell, Clear, Paragraph, Row, Table, TableState, Tabs,
    },
};
use std::cmp::Reverse;
use time::PrimitiveDateTime;

/// Splits into `(upcoming, past)`.
///
/// Upcoming holds appointments that are not cancelled and start at or after
/// `now`, soonest first. Everything else is past, most recent first, with
/// unreadable dates at the end.
pub fn split_appointments(
    appointments: Vec<Appointment>,
    now: PrimitiveDateTime,
) -> (Vec<Appointment>, Vec<Appointment>) {
    let (mut upcoming, mut past): (Vec<_>, Vec<_>) = appointments
        .into_iter()
        .partition(|appointment| appointment.is_upcoming(now));
    upcoming.sort_by_key(Appointment::starts_at);
    past.sort_by_key(|appointment| Reverse(appointment.starts_at()));
    (upcoming, past)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Upcoming,
    Past,
}

struct Reschedule {
    target: Appointment,
    form: Form,
}

impl Reschedule {
    fn new(target: Appointment) -> Self {
        let form = Form::new(vec![
            Field::text("date", "Date (YYYY-MM-DD)").with_value(target.date.clone()),
            Field::text("time", "Time (HH:MM)").with_value(target.time.clone()),
        ]);
        Self { target, form }
    }

    fn render(&self, frame: &mut Frame) {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let block = panel(&format!("Reschedule {}", self.target.service), true)
            .style(Style::default().bg(theme::DIALOG_BG));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .margin(1)
            .spacing(2)
            .split(inner);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(self.form.height()),
                Constraint::Length(2),
                Constraint::Min(0),
            ])
            .split(columns[0]);
        self.form.render(frame, left[0]);
        render_help(frame, left[1], "ENTER: Save | TAB: Next field | ESC: Cancel");

        let shown = parse_date(self.form.value("date"))
            .or_else(|| parse_date(&self.target.date))
            .unwrap_or_else(|| local_now().date());
        let mut events = CalendarEventStore::default();
        events.add(
            local_now().date(),
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        );
        if let Some(chosen) = parse_date(self.form.value("date")) {
            events.add(
                chosen,
                Style::default()
                    .fg(Color::Rgb(16, 16, 28))
                    .bg(theme::FOCUS)
                    .add_modifier(Modifier::BOLD),
            );
        }
        let month = Monthly::new(shown, events)
            .block(panel(&format!("{} {}", shown.month(), shown.year()), false))
            .show_month_header(
                Style::default()
                    .fg(theme::TITLE)
                    .bg(Color::Rgb(60, 60, 100))
                    .add_modifier(Modifier::BOLD),
            )
            .show_weekdays_header(
                Style::default()
                    .fg(Color::Rgb(180, 180, 250))
                    .bg(Color::Rgb(40, 40, 60))
                    .add_modifier(Modifier::BOLD),
            )
            .default_style(Style::default().fg(theme::TEXT));
        frame.render_widget(month, columns[1]);
    }
}

pub struct Appointments {
    client: ApiClient,
    home: Route,
    upcoming: Vec<Appointment>,
    past: Vec<Appointment>,
    tab: Tab,
    upcoming_state: TableState,
    past_state: TableState,
    cancel_dialog: ConfirmDialog,
    reschedule: Option<Reschedule>,
    status: StatusLine,
}

impl Appointments {
    pub fn new(client: ApiClient, user: &User) -> Self {
        let mut screen = Self {
            client,
            home: user.role.default_route(),
            upcoming: Vec::new(),
            past: Vec::new(),
            tab: Tab::Upcoming,
            upcoming_state: TableState::default(),
            past_state: TableState::default(),
            cancel_dialog: ConfirmDialog::default(),
            reschedule: None,
            status: StatusLine::default(),
        };
        screen.refresh();
        screen
    }

    fn refresh(&mut self) {
        match api::appointments::list(&self.client) {
            Ok(appointments) => self.set_appointments(appointments),
            Err(err) => {
                tracing::warn!(error = %err, "loading appointments failed");
                self.status.error(err.user_message());
            }
        }
    }

    fn set_appointments(&mut self, appointments: Vec<Appointment>) {
        let (upcoming, past) = split_appointments(appointments, local_now());
        self.upcoming = upcoming;
        self.past = past;
        clamp_selection(&mut self.upcoming_state, self.upcoming.len());
        clamp_selection(&mut self.past_state, self.past.len());
    }

    /// Swaps in the server's copy of an appointment and re-splits.
    fn apply(&mut self, updated: Appointment) {
        let mut all = std::mem::take(&mut self.upcoming);
        all.append(&mut self.past);
        if let Some(slot) = all.iter_mut().find(|a| a.id == updated.id) {
            *slot = updated;
        }
        self.set_appointments(all);
    }

    fn selected(&self) -> Option<&Appointment> {
        match self.tab {
            Tab::Upcoming => self.upcoming_state.selected().and_then(|i| self.upcoming.get(i)),
            Tab::Past => self.past_state.selected().and_then(|i| self.past.get(i)),
        }
    }

    fn request_cancel(&mut self) {
        match self.selected().map(|a| a.status) {
            None => {}
            Some(status) if !status.can_cancel() || self.tab == Tab::Past => {
                self.status.error("This appointment can no longer be cancelled.");
            }
            Some(_) => self.cancel_dialog.open(),
        }
    }

    fn cancel_selected(&mut self) {
        let Some(appointment) = self.selected().cloned() else {
            return;
        };
        match api::appointments::cancel(&self.client, &appointment) {
            Ok(Some(updated)) => {
                tracing::info!(id = %updated.id, "appointment cancelled");
                self.apply(updated);
                self.status.success("Appointment cancelled.");
            }
            Ok(None) => self.status.error("This appointment can no longer be cancelled."),
            Err(err) => self.status.error(err.user_message()),
        }
    }

    fn request_reschedule(&mut self) {
        match self.selected().cloned() {
            None => {}
            Some(appointment)
                if !appointment.status.can_reschedule() || self.tab == Tab::Past =>
            {
                self.status.error("This appointment can no longer be rescheduled.");
            }
            Some(appointment) => self.reschedule = Some(Reschedule::new(appointment)),
        }
    }

    fn submit_reschedule(&mut self) {
        let Some(reschedule) = self.reschedule.as_mut() else {
            return;
        };
        let form = ScheduleForm {
            date: reschedule.form.string("date"),
            time: reschedule.form.string("time"),
        };
        let (date, time) = match form.validate() {
            Ok(slot) => slot,
            Err(errors) => {
                if let Some((_, message)) = errors.first() {
                    self.status.error(message);
                }
                reschedule.form.set_errors(errors);
                return;
            }
        };
        match api::appointments::reschedule(&self.client, &reschedule.target, &date, &time) {
            Ok(Some(updated)) => {
                tracing::info!(id = %updated.id, "appointment rescheduled");
                self.reschedule = None;
                self.apply(updated);
                self.status
                    .success(format!("Appointment moved to {date} at {time}."));
            }
            Ok(None) => {
                self.reschedule = None;
                self.status.error("This appointment can no longer be rescheduled.");
            }
            Err(err) => self.status.error(err.user_message()),
        }
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let (appointments, state, title, empty) = match self.tab {
            Tab::Upcoming => (
                &self.upcoming,
                &self.upcoming_state,
                "Upcoming Appointments",
                "No upcoming appointments.",
            ),
            Tab::Past => (
                &self.past,
                &self.past_state,
                "Past Appointments",
                "No past appointments.",
            ),
        };

        if appointments.is_empty() {
            frame.render_widget(
                Paragraph::new(empty)
                    .style(Style::default().fg(theme::MUTED))
                    .alignment(Alignment::Center)
                    .block(panel(title, true)),
                area,
            );
            return;
        }

        let header = Row::new(["Service", "Date", "Time", "Doctor", "Status"])
            .style(
                Style::default()
                    .fg(theme::TITLE)
                    .bg(theme::HEADER_BG)
                    .add_modifier(Modifier::BOLD),
            )
            .height(1);
        let rows: Vec<Row> = appointments
            .iter()
            .map(|a| {
                let status_color = match a.status {
                    AppointmentStatus::Cancelled => theme::DANGER,
                    AppointmentStatus::Approved => theme::SUCCESS,
                    AppointmentStatus::Pending => theme::FOCUS,
                    AppointmentStatus::Completed => theme::MUTED,
                };
                Row::new(vec![
                    Cell::from(a.service.clone()),
                    Cell::from(a.date.clone()),
                    Cell::from(a.time.clone()),
                    Cell::from(a.doctor.clone().unwrap_or_else(|| "-".into())),
                    Cell::from(a.status.as_str()).style(Style::default().fg(status_color)),
                ])
                .style(Style::default().fg(theme::TEXT))
            })
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(30),
                Constraint::Percentage(16),
                Constraint::Percentage(10),
                Constraint::Percentage(26),
                Constraint::Percentage(18),
            ],
        )
        .header(header)
        .block(panel(title, true))
        .row_highlight_style(
            Style::default()
                .bg(theme::ROW_HIGHLIGHT)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, area, &mut state.clone());
    }
}

impl Component for Appointments {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<Transition>> {
        self.status.expire();

        if self.cancel_dialog.is_open() {
            if self.cancel_dialog.handle_input(key) == Some(true) {
                self.cancel_selected();
            }
            return Ok(None);
        }

        if let Some(reschedule) = self.reschedule.as_mut() {
            match reschedule.form.handle_input(key) {
                Some(FormAction::Cancel) => self.reschedule = None,
                Some(FormAction::Submit) => self.submit_reschedule(),
                None => {}
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.tab = match self.tab {
                    Tab::Upcoming => Tab::Past,
                    Tab::Past => Tab::Upcoming,
                };
            }
            KeyCode::Down => match self.tab {
                Tab::Upcoming => select_next(&mut self.upcoming_state, self.upcoming.len()),
                Tab::Past => select_next(&mut self.past_state, self.past.len()),
            },
            KeyCode::Up => match self.tab {
                Tab::Upcoming => select_previous(&mut self.upcoming_state, self.upcoming.len()),
                Tab::Past => select_previous(&mut self.past_state, self.past.len()),
            },
            KeyCode::Char('c') | KeyCode::Char('C') => self.request_cancel(),
            KeyCode::Char('s') | KeyCode::Char('S') => self.request_reschedule(),
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
                Constraint::Length(2),
                Constraint::Min(8),
                Constraint::Length(2),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(frame.area());

        render_header(frame, layout[0], "APPOINTMENTS");

        let selected_tab = match self.tab {
            Tab::Upcoming => 0,
            Tab::Past => 1,
        };
        let tabs = Tabs::new(vec![
            format!("Upcoming ({})", self.upcoming.len()),
            format!("Past ({})", self.past.len()),
        ])
        .select(selected_tab)
        .style(Style::default().fg(theme::MUTED))
        .highlight_style(Style::default().fg(theme::FOCUS).add_modifier(Modifier::BOLD))
        .divider(" | ");
        frame.render_widget(tabs, layout[1]);

        self.render_table(frame, layout[2]);
        self.status.render(frame, layout[3]);
        render_help(
            frame,
            layout[4],
            "TAB: Upcoming/Past | ↑/↓: Select | C: Cancel | S: Reschedule | R: Refresh | ESC: Back",
        );

        if let Some(reschedule) = &self.reschedule {
            reschedule.render(frame);
        }
        self.cancel_dialog.render(
            frame,
            "Cancel Appointment",
            "Cancel the selected appointment?",
        );
    }

    fn tick(&mut self) {
        self.status.expire();
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
    use time::macros::datetime;

    fn appointment(id: &str, date: &str, time: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: id.into(),
            service: "Dental Checkup".into(),
            date: date.into(),
            time: time.into(),
            doctor: None,
            status,
        }
    }

    fn patient() -> User {
        User {
            id: "u1".into(),
            name: "Janet".into(),
            email: "janet@hospus.com".into(),
            role: Role::Patient,
            active: true,
        }
    }

    fn screen(items: serde_json::Value) -> (MockTransport, Appointments) {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/appointments",
            200,
            json!({"success": true, "data": {"items": items}}),
        );
        let screen = Appointments::new(client_with(&mock), &patient());
        (mock, screen)
    }

    #[test]
    fn split_orders_both_sides() {
        let now = datetime!(2026-03-01 12:00);
        let (upcoming, past) = split_appointments(
            vec![
                appointment("late", "2026-03-09", "10:00", AppointmentStatus::Pending),
                appointment("soon", "2026-03-01", "12:00", AppointmentStatus::Approved),
                appointment("gone", "2026-03-05", "10:00", AppointmentStatus::Cancelled),
                appointment("old", "2026-01-10", "09:00", AppointmentStatus::Completed),
                appointment("bad", "soon-ish", "09:00", AppointmentStatus::Pending),
            ],
            now,
        );
        let ids = |list: &[Appointment]| list.iter().map(|a| a.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&upcoming), ["soon", "late"]);
        assert_eq!(ids(&past), ["gone", "old", "bad"]);
    }

    #[test]
    fn completed_appointment_cannot_be_cancelled() {
        let (mock, mut screen) = screen(json!([
            {"id": "a1", "service": "Dental Checkup", "date": "2999-01-10", "time": "09:00", "status": "Completed"}
        ]));
        screen.handle_input(key(KeyCode::Char('c'))).unwrap();
        assert!(!screen.cancel_dialog.is_open());
        assert!(render_to_string(&screen).contains("This appointment can no longer be cancelled."));
        assert!(mock.requests_to(Method::Put, "/appointments/a1").is_empty());
    }

    #[test]
    fn confirmed_cancel_moves_row_to_past() {
        let (mock, mut screen) = screen(json!([
            {"id": "a1", "service": "Dental Checkup", "date": "2999-01-10", "time": "09:00", "status": "Pending"}
        ]));
        mock.on(
            Method::Put,
            "/appointments/a1",
            200,
            json!({"success": true, "data":
                {"id": "a1", "service": "Dental Checkup", "date": "2999-01-10", "time": "09:00", "status": "Cancelled"}
            }),
        );
        screen.handle_input(key(KeyCode::Char('c'))).unwrap();
        assert!(screen.cancel_dialog.is_open());
        screen.handle_input(key(KeyCode::Char('y'))).unwrap();

        let sent = mock.requests_to(Method::Put, "/appointments/a1");
        assert_eq!(sent[0].body, Some(json!({"status": "Cancelled"})));
        assert!(screen.upcoming.is_empty());
        assert_eq!(screen.past[0].status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn reschedule_sends_new_slot_as_pending() {
        let (mock, mut screen) = screen(json!([
            {"id": "a1", "service": "Dental Checkup", "date": "2999-01-10", "time": "09:00", "status": "Approved"}
        ]));
        mock.on(
            Method::Put,
            "/appointments/a1",
            200,
            json!({"success": true, "data":
                {"id": "a1", "service": "Dental Checkup", "date": "2999-03-01", "time": "11:45", "status": "Pending"}
            }),
        );
        screen.handle_input(key(KeyCode::Char('s'))).unwrap();
        assert!(render_to_string(&screen).contains("Reschedule Dental Checkup"));
        for _ in 0.."2999-01-10".len() {
            screen.handle_input(key(KeyCode::Backspace)).unwrap();
        }
        type_text(&mut screen, "2999-03-01");
        screen.handle_input(key(KeyCode::Tab)).unwrap();
        for _ in 0.."09:00".len() {
            screen.handle_input(key(KeyCode::Backspace)).unwrap();
        }
        type_text(&mut screen, "11:45");
        screen.handle_input(key(KeyCode::Enter)).unwrap();

        let sent = mock.requests_to(Method::Put, "/appointments/a1");
        assert_eq!(
            sent[0].body,
            Some(json!({"date": "2999-03-01", "time": "11:45", "status": "Pending"}))
        );
        assert!(screen.reschedule.is_none());
        assert_eq!(screen.upcoming[0].date, "2999-03-01");
    }

    #[test]
    fn reschedule_rejects_bad_time_without_request() {
        let (mock, mut screen) = screen(json!([
            {"id": "a1", "service": "Dental Checkup", "date": "2999-01-10", "time": "09:00", "status": "Pending"}
        ]));
        screen.handle_input(key(KeyCode::Char('s'))).unwrap();
        screen.handle_input(key(KeyCode::Tab)).unwrap();
        type_text(&mut screen, "9");
        screen.handle_input(key(KeyCode::Enter)).unwrap();
        assert!(screen.reschedule.is_some());
        assert!(mock.requests_to(Method::Put, "/appointments/a1").is_empty());
    }

    #[test]
    fn cancelled_appointment_cannot_be_rescheduled() {
        let (_mock, mut screen) = screen(json!([
            {"id": "a1", "service": "Dental Checkup", "date": "2999-01-10", "time": "09:00", "status": "Cancelled"}
        ]));
        screen.handle_input(key(KeyCode::Tab)).unwrap();
        screen.handle_input(key(KeyCode::Char('s'))).unwrap();
        assert!(screen.reschedule.is_none());
        assert_eq!(
            screen.status.current().map(|n| n.message.as_str()),
            Some("This appointment can no longer be rescheduled.")
        );
    }

    #[test]
    fn esc_returns_to_role_home() {
        let (_mock, mut screen) = screen(json!([]));
        assert!(render_to_string(&screen).contains("No upcoming appointments."));
        assert!(matches!(
            screen.handle_input(key(KeyCode::Esc)).unwrap(),
            Some(Transition::Go(Route::UserDashboard))
        ));
    }
}
