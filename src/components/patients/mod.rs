//! Clinical patient records: list, details, add and delete.

use crate::api::ApiClient;
use crate::components::patients::add::AddPatient;
use crate::components::patients::list::ListPatients;
use crate::components::{Component, Notice, Transition};
use crate::models::{Patient, User};
use crate::routes::Route;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;

pub mod add;
pub mod list;

/// What a patient sub-screen asks its parent to do.
#[derive(Debug, Clone, PartialEq)]
pub enum PatientAction {
    BackToHome,
    BackToList,
    OpenAdd,
    Created(Patient),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientsState {
    List,
    Add,
}

pub struct Patients {
    client: ApiClient,
    home: Route,
    list: ListPatients,
    add: Option<AddPatient>,
    state: PatientsState,
}

impl Patients {
    pub fn new(client: ApiClient, user: &User) -> Self {
        Self {
            list: ListPatients::new(client.clone()),
            client,
            home: user.role.default_route(),
            add: None,
            state: PatientsState::List,
        }
    }

    fn dispatch(&mut self, action: PatientAction) -> Option<Transition> {
        match action {
            PatientAction::BackToHome => return Some(Transition::Go(self.home)),
            PatientAction::BackToList => {
                self.add = None;
                self.state = PatientsState::List;
            }
            PatientAction::OpenAdd => {
                self.add = Some(AddPatient::new(self.client.clone()));
                self.state = PatientsState::Add;
            }
            PatientAction::Created(patient) => {
                self.add = None;
                self.state = PatientsState::List;
                self.list.insert(patient);
            }
        }
        None
    }
}

impl Component for Patients {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<Transition>> {
        let action = match (self.state, self.add.as_mut()) {
            (PatientsState::Add, Some(add)) => add.handle_input(event)?,
            _ => self.list.handle_input(event)?,
        };
        Ok(action.and_then(|action| self.dispatch(action)))
    }

    fn render(&self, frame: &mut Frame) {
        match (self.state, &self.add) {
            (PatientsState::Add, Some(add)) => add.render(frame),
            _ => self.list.render(frame),
        }
    }

    fn set_notice(&mut self, notice: Notice) {
        self.list.set_notice(notice);
    }

    fn tick(&mut self) {
        self.list.tick();
        if let Some(add) = self.add.as_mut() {
            add.tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{client_with, MockTransport};
    use crate::api::Method;
    use crate::components::testing::{key, render_to_string, type_text};
    use crate::models::Role;
    use crossterm::event::KeyCode;
    use serde_json::json;

    fn doctor() -> User {
        User {
            id: "d1".into(),
            name: "Dr Nkosi".into(),
            email: "nkosi@hospus.com".into(),
            role: Role::Doctor,
            active: true,
        }
    }

    #[test]
    fn added_patient_appears_in_list() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/patients",
            200,
            json!({"success": true, "data": {"items": []}}),
        );
        mock.on(
            Method::Post,
            "/patients",
            201,
            json!({"success": true, "data": {"id": "p1", "firstName": "Mary", "lastName": "Jane"}}),
        );
        let mut screen = Patients::new(client_with(&mock), &doctor());
        screen.handle_input(key(KeyCode::Char('a'))).unwrap();
        assert_eq!(screen.state, PatientsState::Add);

        type_text(&mut screen, "Mary");
        screen.handle_input(key(KeyCode::Tab)).unwrap();
        type_text(&mut screen, "Jane");
        screen.handle_input(key(KeyCode::Enter)).unwrap();

        assert_eq!(screen.state, PatientsState::List);
        let shown = render_to_string(&screen);
        assert!(shown.contains("Mary"));
        assert!(shown.contains("Patient added."));
        assert_eq!(
            mock.requests_to(Method::Post, "/patients")[0].body,
            Some(json!({"firstName": "Mary", "lastName": "Jane"}))
        );
    }

    #[test]
    fn esc_goes_home() {
        let mock = MockTransport::new();
        let mut screen = Patients::new(client_with(&mock), &doctor());
        assert!(matches!(
            screen.handle_input(key(KeyCode::Esc)).unwrap(),
            Some(Transition::Go(Route::UserDashboard))
        ));
    }

    #[test]
    fn every_clinical_role_can_open_the_add_form() {
        for role in [Role::Admin, Role::Staff, Role::Doctor] {
            let mock = MockTransport::new();
            let mut user = doctor();
            user.role = role;
            let mut screen = Patients::new(client_with(&mock), &user);
            screen.handle_input(key(KeyCode::Char('a'))).unwrap();
            assert_eq!(screen.state, PatientsState::Add, "{role}");
        }
    }

    #[test]
    fn notices_show_on_the_list() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/patients",
            200,
            json!({"success": true, "data": {"items": []}}),
        );
        let mut screen = Patients::new(client_with(&mock), &doctor());
        screen.set_notice(Notice::error("Backend unreachable."));
        assert!(render_to_string(&screen).contains("Backend unreachable."));
    }
}
