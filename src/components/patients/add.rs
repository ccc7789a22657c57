//! New patient form.

use crate::api::{self, ApiClient};
use crate::components::form::{Field, Form, FormAction};
use crate::components::patients::PatientAction;
use crate::components::{
    centered_columns, render_background, render_header, render_help, StatusLine,
};
use crate::models::Gender;
use crate::tui::Frame;
use crate::validation::PatientForm;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

const GENDER_OPTIONS: [&str; 4] = ["Not specified", "Male", "Female", "Other"];

fn gender_from(value: &str) -> Option<Gender> {
    match value {
        "Male" => Some(Gender::Male),
        "Female" => Some(Gender::Female),
        "Other" => Some(Gender::Other),
        _ => None,
    }
}

pub struct AddPatient {
    client: ApiClient,
    form: Form,
    status: StatusLine,
}

impl AddPatient {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            form: Form::new(vec![
                Field::text("firstName", "First Name"),
                Field::text("lastName", "Last Name"),
                Field::text("dob", "Date of Birth (YYYY-MM-DD)"),
                Field::choice("gender", "Gender", GENDER_OPTIONS.to_vec()),
                Field::text("email", "Email"),
                Field::text("phone", "Phone"),
                Field::text("address", "Address"),
                Field::text("medicalRecordNumber", "Medical Record Number"),
            ]),
            status: StatusLine::default(),
        }
    }

    fn submit(&mut self) -> Option<PatientAction> {
        let input = PatientForm {
            first_name: self.form.string("firstName"),
            last_name: self.form.string("lastName"),
            dob: self.form.string("dob"),
            gender: gender_from(self.form.value("gender")),
            email: self.form.string("email"),
            phone: self.form.string("phone"),
            address: self.form.string("address"),
            medical_record_number: self.form.string("medicalRecordNumber"),
        };
        let draft = match input.validate() {
            Ok(draft) => draft,
            Err(errors) => {
                if let Some((_, message)) = errors.first() {
                    self.status.error(message);
                }
                self.form.set_errors(errors);
                return None;
            }
        };
        match api::patients::create(&self.client, &draft) {
            Ok(patient) => {
                tracing::info!(patient_id = %patient.id, "patient created");
                Some(PatientAction::Created(patient))
            }
            Err(err) => {
                self.status
                    .error(format!("Failed to add patient: {}", err.user_message()));
                None
            }
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<PatientAction>> {
        self.status.expire();
        Ok(match self.form.handle_input(key) {
            Some(FormAction::Cancel) => Some(PatientAction::BackToList),
            Some(FormAction::Submit) => self.submit(),
            None => None,
        })
    }

    pub fn render(&self, frame: &mut Frame) {
        render_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(self.form.height()),
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .margin(1)
            .split(frame.area());

        render_header(frame, layout[0], "ADD PATIENT");
        self.form.render(frame, centered_columns(layout[1], 70));
        self.status.render(frame, layout[2]);
        render_help(
            frame,
            layout[3],
            "TAB/↑↓: Fields | ←/→: Gender | ENTER: Save | ESC: Back to list",
        );
    }

    pub fn tick(&mut self) {
        self.status.expire();
    }
}
