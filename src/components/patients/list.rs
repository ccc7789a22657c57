//! Patient table with a details pane and delete confirmation.

use crate::api::{self, ApiClient};
use crate::components::patients::PatientAction;
use crate::components::{
    clamp_selection, panel, render_back_button, render_background, render_header, render_help,
    select_next, select_previous, theme, ConfirmDialog, Notice, StatusLine,
};
use crate::models::Patient;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

const PATIENT_LIST: usize = 0;
const BACK_BUTTON: usize = 1;

pub struct ListPatients {
    client: ApiClient,
    patients: Vec<Patient>,
    state: TableState,
    show_details: bool,
    focus_index: usize,
    delete_dialog: ConfirmDialog,
    status: StatusLine,
}

impl ListPatients {
    pub fn new(client: ApiClient) -> Self {
        let mut list = Self {
            client,
            patients: Vec::new(),
            state: TableState::default(),
            show_details: false,
            focus_index: PATIENT_LIST,
            delete_dialog: ConfirmDialog::default(),
            status: StatusLine::default(),
        };
        list.fetch_patients();
        list
    }

    /// Reloads the table. Failures are shown, not returned.
    pub fn fetch_patients(&mut self) {
        match api::patients::list(&self.client) {
            Ok(patients) => {
                self.patients = patients;
                clamp_selection(&mut self.state, self.patients.len());
            }
            Err(err) => {
                tracing::warn!(error = %err, "loading patients failed");
                self.status
                    .error(format!("Failed to fetch patients: {}", err.user_message()));
            }
        }
    }

    /// Adds a freshly created record and selects it.
    pub fn insert(&mut self, patient: Patient) {
        self.patients.push(patient);
        self.state.select(Some(self.patients.len() - 1));
        self.status.success("Patient added.");
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.status.set(notice);
    }

    pub fn tick(&mut self) {
        self.status.expire();
    }

    fn selected_patient(&self) -> Option<&Patient> {
        self.state.selected().and_then(|i| self.patients.get(i))
    }

    fn toggle_details(&mut self) {
        if self.selected_patient().is_some() {
            self.show_details = !self.show_details;
        }
    }

    fn delete_selected(&mut self) {
        let Some(patient) = self.selected_patient().cloned() else {
            return;
        };
        match api::patients::delete(&self.client, &patient.id) {
            Ok(()) => {
                tracing::info!(patient_id = %patient.id, "patient deleted");
                self.patients.retain(|p| p.id != patient.id);
                clamp_selection(&mut self.state, self.patients.len());
                self.show_details = false;
                self.status
                    .success(format!("Deleted {}.", patient.full_name()));
            }
            Err(err) => self
                .status
                .error(format!("Failed to delete patient: {}", err.user_message())),
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<PatientAction>> {
        self.status.expire();

        if self.delete_dialog.is_open() {
            if self.delete_dialog.handle_input(key) == Some(true) {
                self.delete_selected();
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Tab | KeyCode::BackTab => self.focus_index = 1 - self.focus_index,
            KeyCode::Down if self.focus_index == PATIENT_LIST => {
                select_next(&mut self.state, self.patients.len());
            }
            KeyCode::Up if self.focus_index == PATIENT_LIST => {
                select_previous(&mut self.state, self.patients.len());
            }
            KeyCode::Enter if self.focus_index == BACK_BUTTON => {
                return Ok(Some(PatientAction::BackToHome));
            }
            KeyCode::Enter => self.toggle_details(),
            KeyCode::Char('a') | KeyCode::Char('A') => return Ok(Some(PatientAction::OpenAdd)),
            KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => {
                if self.selected_patient().is_some() {
                    self.delete_dialog.open();
                }
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.fetch_patients(),
            KeyCode::Char('b') | KeyCode::Char('B') => return Ok(Some(PatientAction::BackToHome)),
            KeyCode::Esc if self.show_details => self.show_details = false,
            KeyCode::Esc => return Ok(Some(PatientAction::BackToHome)),
            _ => {}
        }
        Ok(None)
    }

    fn details(patient: &Patient) -> String {
        let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
        format!(
            "{}: born {}, gender {}, email {}, phone {}, address {}, MRN {}",
            patient.full_name(),
            or_dash(&patient.dob),
            patient.gender.map_or("-", |g| g.as_str()),
            or_dash(&patient.email),
            or_dash(&patient.phone),
            or_dash(&patient.address),
            or_dash(&patient.medical_record_number),
        )
    }

    pub fn render(&self, frame: &mut Frame) {
        render_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(4),
                Constraint::Length(2),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(frame.area());

        render_header(frame, layout[0], "PATIENT RECORDS");

        let header = Row::new(
            ["First Name", "Last Name", "Date of Birth", "Gender", "Phone", "MRN"]
                .iter()
                .map(|h| Cell::from(*h).style(Style::default().fg(theme::TITLE))),
        )
        .style(Style::default().bg(theme::HEADER_BG))
        .height(1)
        .bottom_margin(1);

        let rows = self.patients.iter().map(|patient| {
            Row::new(vec![
                Cell::from(patient.first_name.clone()),
                Cell::from(patient.last_name.clone()),
                Cell::from(patient.dob.clone().unwrap_or_default()),
                Cell::from(patient.gender.map_or("", |g| g.as_str())),
                Cell::from(patient.phone.clone().unwrap_or_default()),
                Cell::from(patient.medical_record_number.clone().unwrap_or_default()),
            ])
            .style(Style::default().fg(theme::TEXT))
        });

        let focused = self.focus_index == PATIENT_LIST;
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(18),
                Constraint::Percentage(18),
                Constraint::Percentage(16),
                Constraint::Percentage(12),
                Constraint::Percentage(18),
                Constraint::Percentage(18),
            ],
        )
        .header(header)
        .block(panel("Patients", focused))
        .row_highlight_style(
            Style::default()
                .bg(if focused {
                    theme::ROW_HIGHLIGHT
                } else {
                    Color::Rgb(30, 30, 45)
                })
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(if focused { "► " } else { "  " });
        frame.render_stateful_widget(table, layout[1], &mut self.state.clone());

        match self.selected_patient() {
            Some(patient) if self.show_details => {
                frame.render_widget(
                    Paragraph::new(Self::details(patient))
                        .style(Style::default().fg(theme::TEXT))
                        .block(panel("Patient Details", false))
                        .wrap(Wrap { trim: true }),
                    layout[2],
                );
            }
            _ => render_help(
                frame,
                layout[2],
                "↑↓: Navigate | Enter: Details | A: Add | D: Delete | R: Refresh | Tab: Focus",
            ),
        }

        render_back_button(frame, layout[3], self.focus_index == BACK_BUTTON);
        self.status.render(frame, layout[4]);

        self.delete_dialog.render(
            frame,
            "Delete Patient",
            "Delete this patient record permanently?",
        );
    }
}
