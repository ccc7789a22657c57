//! Admin and personal dashboards, both with the role-filtered navigation menu.

use crate::api::{self, ApiClient};
use crate::components::appointments::split_appointments;
use crate::components::{
    panel, render_background, render_help, theme, Component, ConfirmDialog, StatusLine,
    Transition,
};
use crate::error::ApiError;
use crate::models::{local_now, Appointment, AppointmentStatus, EnquiryStatus, Role, User};
use crate::routes::{Capability, Route};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Cell, List, ListItem, Padding, Paragraph, Row, Table},
};
use std::thread;
use time::PrimitiveDateTime;

/// Screens reachable from a dashboard plus a trailing "Logout" entry.
pub struct NavMenu {
    routes: Vec<Route>,
    selected: usize,
    logout_dialog: ConfirmDialog,
}

impl NavMenu {
    /// Menu for `role`, without the screen it is shown on.
    pub fn for_role(role: Role, current: Route) -> Self {
        Self {
            routes: role
                .menu()
                .into_iter()
                .filter(|route| *route != current)
                .collect(),
            selected: 0,
            logout_dialog: ConfirmDialog::default(),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    fn len(&self) -> usize {
        self.routes.len() + 1
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<Transition> {
        if self.logout_dialog.is_open() {
            return match self.logout_dialog.handle_input(key) {
                Some(true) => Some(Transition::Logout),
                _ => None,
            };
        }
        match key.code {
            KeyCode::Down | KeyCode::Tab => self.selected = (self.selected + 1) % self.len(),
            KeyCode::Up | KeyCode::BackTab => {
                self.selected = (self.selected + self.len() - 1) % self.len();
            }
            KeyCode::Enter => match self.routes.get(self.selected) {
                Some(route) => return Some(Transition::Go(*route)),
                None => self.logout_dialog.open(),
            },
            KeyCode::Esc => self.logout_dialog.open(),
            _ => {}
        }
        None
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = panel("Navigation", true);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let labels = self
            .routes
            .iter()
            .map(|route| route.title())
            .chain(std::iter::once("Logout"));
        let items: Vec<ListItem> = labels
            .enumerate()
            .map(|(index, label)| {
                let (prefix, style) = if index == self.selected {
                    (
                        " ► ",
                        Style::default().fg(theme::FOCUS).add_modifier(Modifier::BOLD),
                    )
                } else {
                    ("   ", Style::default().fg(theme::TEXT))
                };
                ListItem::new(Line::from(Span::styled(format!("{prefix}{label}"), style)))
            })
            .collect();
        frame.render_widget(
            List::new(items).block(Block::default().padding(Padding::new(1, 1, 1, 0))),
            inner,
        );
    }

    pub fn render_dialog(&self, frame: &mut Frame) {
        self.logout_dialog
            .render(frame, "Confirm Logout", "Are you sure you want to logout?");
    }
}

fn render_welcome(frame: &mut Frame, area: Rect, name: &str, subtitle: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme::BORDER))
        .style(Style::default().bg(Color::Rgb(24, 24, 40)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text = vec![
        Line::from(vec![
            Span::styled(
                "Welcome to Hospus, ",
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                name.to_string(),
                Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            subtitle.to_string(),
            Style::default().fg(Color::Rgb(180, 190, 254)),
        )),
    ];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), inner);
}

/// Headline numbers of the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub users: u64,
    pub patients: u64,
    pub appointments: u64,
    pub pending: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overview {
    pub stats: Stats,
    pub upcoming: Vec<Appointment>,
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

/// Fetches the three dashboard sources side by side.
pub fn fetch_overview(client: &ApiClient, now: PrimitiveDateTime) -> Result<Overview, ApiError> {
    let (users, patients, appointments) = thread::scope(|scope| {
        let users = scope.spawn(|| api::users::count(client));
        let patients = scope.spawn(|| api::patients::count(client));
        let appointments = api::appointments::list(client);
        (join(users), join(patients), appointments)
    });
    let appointments = appointments?;

    let stats = Stats {
        users: users?,
        patients: patients?,
        appointments: appointments.len() as u64,
        pending: appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Pending)
            .count() as u64,
    };
    let (upcoming, _) = split_appointments(appointments, now);
    Ok(Overview { stats, upcoming })
}

pub struct AdminDashboard {
    client: ApiClient,
    name: String,
    overview: Option<Overview>,
    menu: NavMenu,
    status: StatusLine,
}

impl AdminDashboard {
    pub fn new(client: ApiClient, user: &User) -> Self {
        let mut dashboard = Self {
            client,
            name: user.display_name().to_string(),
            overview: None,
            menu: NavMenu::for_role(user.role, Route::Dashboard),
            status: StatusLine::default(),
        };
        dashboard.refresh();
        dashboard
    }

    fn refresh(&mut self) {
        match fetch_overview(&self.client, local_now()) {
            Ok(overview) => self.overview = Some(overview),
            Err(err) => {
                tracing::warn!(error = %err, "dashboard load failed");
                self.status.error(err.user_message());
            }
        }
    }

    fn render_stats(&self, frame: &mut Frame, area: Rect) {
        let stats = self.overview.as_ref().map(|o| o.stats);
        let cards = [
            ("Users", stats.map(|s| s.users)),
            ("Patients", stats.map(|s| s.patients)),
            ("Appointments", stats.map(|s| s.appointments)),
            ("Pending", stats.map(|s| s.pending)),
        ];
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(area);
        for ((label, value), column) in cards.into_iter().zip(columns.iter()) {
            let text = value.map_or_else(|| "-".to_string(), |v| v.to_string());
            frame.render_widget(
                Paragraph::new(Span::styled(
                    text,
                    Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Center)
                .block(panel(label, false)),
                *column,
            );
        }
    }

    fn render_upcoming(&self, frame: &mut Frame, area: Rect) {
        let header = Row::new(["Service", "Date", "Time", "Doctor", "Status"])
            .style(
                Style::default()
                    .fg(theme::TITLE)
                    .bg(theme::HEADER_BG)
                    .add_modifier(Modifier::BOLD),
            )
            .height(1);
        let rows: Vec<Row> = self
            .overview
            .iter()
            .flat_map(|o| o.upcoming.iter())
            .map(|a| {
                Row::new(vec![
                    Cell::from(a.service.clone()),
                    Cell::from(a.date.clone()),
                    Cell::from(a.time.clone()),
                    Cell::from(a.doctor.clone().unwrap_or_else(|| "-".into())),
                    Cell::from(a.status.as_str()),
                ])
                .style(Style::default().fg(theme::TEXT))
            })
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(30),
                Constraint::Percentage(18),
                Constraint::Percentage(12),
                Constraint::Percentage(25),
                Constraint::Percentage(15),
            ],
        )
        .header(header)
        .block(panel("Upcoming Appointments", false));
        frame.render_widget(table, area);
    }
}

impl Component for AdminDashboard {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<Transition>> {
        self.status.expire();
        if let KeyCode::Char('r') | KeyCode::Char('R') = key.code {
            self.refresh();
            return Ok(None);
        }
        Ok(self.menu.handle_input(key))
    }

    fn render(&self, frame: &mut Frame) {
        render_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(10),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(frame.area());

        render_welcome(frame, layout[0], &self.name, "Administration overview");

        let content = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
            .spacing(1)
            .split(layout[1]);
        self.menu.render(frame, content[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(5)])
            .split(content[1]);
        self.render_stats(frame, right[0]);
        self.render_upcoming(frame, right[1]);

        self.status.render(frame, layout[2]);
        render_help(
            frame,
            layout[3],
            "↑/↓: Navigate | ENTER: Open | R: Refresh | ESC: Logout | CTRL+Q: Quit",
        );
        self.menu.render_dialog(frame);
    }

    fn tick(&mut self) {
        self.status.expire();
    }
}

pub struct UserDashboard {
    client: ApiClient,
    user: User,
    next_appointment: Option<Appointment>,
    open_enquiries: Option<usize>,
    /// The count covers only the first page of a longer listing.
    enquiries_truncated: bool,
    menu: NavMenu,
    status: StatusLine,
}

impl UserDashboard {
    pub fn new(client: ApiClient, user: &User) -> Self {
        let mut dashboard = Self {
            client,
            user: user.clone(),
            next_appointment: None,
            open_enquiries: None,
            enquiries_truncated: false,
            menu: NavMenu::for_role(user.role, Route::UserDashboard),
            status: StatusLine::default(),
        };
        dashboard.refresh();
        dashboard
    }

    fn refresh(&mut self) {
        if let Err(err) = self.load() {
            tracing::warn!(error = %err, "dashboard load failed");
            self.status.error(err.user_message());
        }
    }

    fn load(&mut self) -> Result<(), ApiError> {
        let role = self.user.role;
        if role.can(Capability::ViewAppointments) {
            let (upcoming, _) =
                split_appointments(api::appointments::list(&self.client)?, local_now());
            self.next_appointment = upcoming.into_iter().next();
        }
        if role.can(Capability::UseEnquiries) {
            let page =
                api::enquiries::list(&self.client, 1, api::enquiries::DEFAULT_PAGE_SIZE)?;
            self.enquiries_truncated = page.total() > page.items.len() as u64;
            let open = api::enquiries::visible_to(page.items, &self.user)
                .iter()
                .filter(|e| e.status == EnquiryStatus::Open)
                .count();
            self.open_enquiries = Some(open);
        }
        Ok(())
    }

    fn summary(&self) -> Vec<Line<'static>> {
        let label = Style::default().fg(theme::MUTED);
        let value = Style::default().fg(theme::TITLE).add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Role: ", label),
                Span::styled(self.user.role.to_string(), value),
            ]),
            Line::from(vec![
                Span::styled("Email: ", label),
                Span::styled(self.user.email.clone(), value),
            ]),
            Line::from(""),
        ];
        if self.user.role.can(Capability::ViewAppointments) {
            let next = match &self.next_appointment {
                Some(a) => format!("{} on {} at {} ({})", a.service, a.date, a.time, a.status),
                None => "No upcoming appointments".to_string(),
            };
            lines.push(Line::from(vec![
                Span::styled("Next appointment: ", label),
                Span::styled(next, value),
            ]));
        }
        if let Some(open) = self.open_enquiries {
            let mut count = vec![
                Span::styled("Open enquiries: ", label),
                Span::styled(open.to_string(), value),
            ];
            if self.enquiries_truncated {
                count.push(Span::styled(
                    format!(" (latest {} threads)", api::enquiries::DEFAULT_PAGE_SIZE),
                    label,
                ));
            }
            lines.push(Line::from(count));
        }
        lines
    }
}

impl Component for UserDashboard {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<Transition>> {
        self.status.expire();
        if let KeyCode::Char('r') | KeyCode::Char('R') = key.code {
            self.refresh();
            return Ok(None);
        }
        Ok(self.menu.handle_input(key))
    }

    fn render(&self, frame: &mut Frame) {
        render_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(10),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(frame.area());

        render_welcome(
            frame,
            layout[0],
            self.user.display_name(),
            "Please select a task:",
        );

        let content = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .spacing(1)
            .split(layout[1]);
        self.menu.render(frame, content[0]);
        frame.render_widget(
            Paragraph::new(self.summary())
                .block(panel("Overview", false).padding(Padding::new(2, 2, 1, 0))),
            content[1],
        );

        self.status.render(frame, layout[2]);
        render_help(
            frame,
            layout[3],
            "↑/↓: Navigate | ENTER: Open | R: Refresh | ESC: Logout | CTRL+Q: Quit",
        );
        self.menu.render_dialog(frame);
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
    use crate::components::testing::{key, render_to_string};
    use serde_json::json;
    use time::macros::datetime;

    fn user(role: Role) -> User {
        User {
            id: "u1".into(),
            name: "Janet".into(),
            email: "janet@hospus.com".into(),
            role,
            active: true,
        }
    }

    fn appointments() -> serde_json::Value {
        json!({"success": true, "data": {"items": [
            {"id": "a1", "service": "Dental Checkup", "date": "2999-01-10", "time": "09:00", "status": "Pending"},
            {"id": "a2", "service": "Physiotherapy", "date": "2999-01-05", "time": "14:30", "status": "Approved"},
            {"id": "a3", "service": "Blood Test", "date": "2000-01-01", "time": "08:00", "status": "Completed"},
            {"id": "a4", "service": "X-Ray", "date": "2999-02-01", "time": "10:00", "status": "Cancelled"}
        ]}})
    }

    fn admin_mock(patients_status: u16) -> MockTransport {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/users",
            200,
            json!({"success": true, "data": {"items": [], "meta": {"total": 12}}}),
        );
        let patients = if patients_status == 200 {
            json!({"success": true, "data": {"items": [], "meta": {"total": 48}}})
        } else {
            json!({"success": false, "message": "Database offline"})
        };
        mock.on(Method::Get, "/patients", patients_status, patients);
        mock.on(Method::Get, "/appointments", 200, appointments());
        mock
    }

    #[test]
    fn overview_counts_and_upcoming() {
        let mock = admin_mock(200);
        let overview = fetch_overview(&client_with(&mock), datetime!(2026-01-01 00:00)).unwrap();
        assert_eq!(
            overview.stats,
            Stats {
                users: 12,
                patients: 48,
                appointments: 4,
                pending: 1
            }
        );
        let ids: Vec<&str> = overview.upcoming.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["a2", "a1"]);
    }

    #[test]
    fn overview_fails_when_any_source_fails() {
        let mock = admin_mock(500);
        let err = fetch_overview(&client_with(&mock), datetime!(2026-01-01 00:00)).unwrap_err();
        assert_eq!(err.user_message(), "Database offline");
    }

    #[test]
    fn admin_dashboard_renders_counts() {
        let mock = admin_mock(200);
        let dashboard = AdminDashboard::new(client_with(&mock), &user(Role::Admin));
        let screen = render_to_string(&dashboard);
        assert!(screen.contains("48"));
        assert!(screen.contains("Physiotherapy"));
        assert!(!screen.contains("Blood Test"));
    }

    #[test]
    fn menu_is_role_filtered_and_ends_with_logout() {
        let menu = NavMenu::for_role(Role::Admin, Route::Dashboard);
        assert_eq!(
            menu.routes(),
            [
                Route::Appointments,
                Route::Users,
                Route::Patients,
                Route::Services,
                Route::Enquiries
            ]
        );
        let menu = NavMenu::for_role(Role::Staff, Route::UserDashboard);
        assert_eq!(menu.routes(), [Route::Patients]);
    }

    #[test]
    fn logout_needs_confirmation() {
        let mut menu = NavMenu::for_role(Role::Staff, Route::UserDashboard);
        menu.handle_input(key(KeyCode::Down));
        assert!(menu.handle_input(key(KeyCode::Enter)).is_none());
        assert!(matches!(
            menu.handle_input(key(KeyCode::Char('y'))),
            Some(Transition::Logout)
        ));
    }

    #[test]
    fn patient_dashboard_shows_next_appointment_and_open_enquiries() {
        let mock = MockTransport::new();
        mock.on(Method::Get, "/appointments", 200, appointments());
        mock.on(
            Method::Get,
            "/enquiries",
            200,
            json!({"success": true, "data": {"items": [
                {"id": "e1", "userId": "u1", "subject": "Billing", "status": "open"},
                {"id": "e2", "userId": "u1", "subject": "Parking", "status": "closed"},
                {"id": "e3", "userId": "u9", "subject": "Other", "status": "open"}
            ]}}),
        );
        let dashboard = UserDashboard::new(client_with(&mock), &user(Role::Patient));
        assert_eq!(
            dashboard.next_appointment.as_ref().map(|a| a.id.as_str()),
            Some("a2")
        );
        assert_eq!(dashboard.open_enquiries, Some(1));
        assert!(render_to_string(&dashboard).contains("Physiotherapy on 2999-01-05 at 14:30"));
    }

    #[test]
    fn staff_dashboard_makes_no_requests() {
        let mock = MockTransport::new();
        let dashboard = UserDashboard::new(client_with(&mock), &user(Role::Doctor));
        assert!(mock.requests().is_empty());
        assert!(dashboard.open_enquiries.is_none());
    }

    #[test]
    fn open_enquiry_count_is_labelled_when_partial() {
        let mock = MockTransport::new();
        mock.on(Method::Get, "/appointments", 200, json!({"success": true, "data": {"items": []}}));
        mock.on(
            Method::Get,
            "/enquiries",
            200,
            json!({"success": true, "data": {
                "items": [{"id": "e1", "userId": "u1", "subject": "Billing", "status": "open"}],
                "meta": {"total": 45, "page": 1, "limit": 20}
            }}),
        );
        let dashboard = UserDashboard::new(client_with(&mock), &user(Role::Patient));
        assert!(dashboard.enquiries_truncated);
        assert!(render_to_string(&dashboard).contains("Open enquiries: 1 (latest 20 threads)"));
    }
}
