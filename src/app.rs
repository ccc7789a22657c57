//! The application loop: the session, the current route and the screen
//! that renders it.
//!
//! Screens never change the route themselves. They hand back a
//! [`Transition`] and the app resolves it through the route guard, so every
//! navigation (including the forced return to login after a 401) goes
//! through one place.

use crate::auth::Session;
use crate::components::access::AccessNotice;
use crate::components::appointments::Appointments;
use crate::components::dashboard::{AdminDashboard, UserDashboard};
use crate::components::enquiries::Enquiries;
use crate::components::forgot_password::ForgotPassword;
use crate::components::login::Login;
use crate::components::patients::Patients;
use crate::components::register::Register;
use crate::components::services::Services;
use crate::components::users::Users;
use crate::components::{Component, Notice, Transition};
use crate::routes::{self, GuardDecision, Route};
use crate::tui::{self, Frame, Tui};
use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub const MSG_SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";
pub const MSG_NO_BACKEND: &str = "No backend configured. Set HOSPUS_API_URL and restart.";
pub const MSG_LOGGED_OUT: &str = "You have been logged out.";

pub struct App {
    session: Session,
    route: Route,
    screen: Box<dyn Component>,
    pub should_quit: bool,
}

impl App {
    /// Restores the stored session if that has not happened yet, then opens
    /// the role's default route or the login screen.
    pub fn new(mut session: Session) -> Self {
        if session.is_loading() {
            if let Err(err) = session.hydrate() {
                tracing::warn!(error = %err, "starting signed out");
            }
        }
        let start = session
            .role()
            .map_or(Route::Login, |role| role.default_route());
        let mut app = Self {
            session,
            route: Route::Login,
            screen: Box::new(Login::new()),
            should_quit: false,
        };
        app.navigate(start);
        if app.session.client().base_url().is_none() {
            app.screen.set_notice(Notice::error(MSG_NO_BACKEND));
        }
        app.check_session();
        app
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn run(&mut self, tui: &mut Tui) -> Result<()> {
        while !self.should_quit {
            tui.draw(|frame| self.render(frame))?;
            match tui.next_event()? {
                tui::Event::Input(CrosstermEvent::Key(key)) => self.handle_key(key)?,
                tui::Event::Input(_) => {}
                tui::Event::Tick => self.tick(),
            }
        }
        tracing::info!("quitting");
        Ok(())
    }

    pub fn render(&self, frame: &mut Frame) {
        self.screen.render(frame);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        // Ctrl+Q quits from anywhere.
        if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Ok(());
        }
        if let Some(transition) = self.screen.handle_input(key)? {
            self.apply(transition);
        }
        self.check_session();
        Ok(())
    }

    pub fn tick(&mut self) {
        self.screen.tick();
        self.check_session();
    }

    /// Resolves `requested` through the guard and builds the screen for
    /// wherever it lands.
    pub fn navigate(&mut self, requested: Route) {
        let (route, decision) = routes::resolve(requested, self.session.current_user());
        if route != requested {
            tracing::debug!(from = requested.path(), to = route.path(), "redirected");
        }
        self.screen = match decision {
            GuardDecision::Forbidden => {
                tracing::warn!(route = route.path(), "no accessible route for this role");
                Box::new(AccessNotice::new(route))
            }
            _ => self.build(route),
        };
        self.route = route;
    }

    fn build(&self, route: Route) -> Box<dyn Component> {
        let client = self.session.client().clone();
        match (route, self.session.current_user()) {
            (Route::Signup, _) => Box::new(Register::new()),
            (Route::ForgotPassword, _) => Box::new(ForgotPassword::new()),
            (Route::Dashboard, Some(user)) => Box::new(AdminDashboard::new(client, user)),
            (Route::UserDashboard, Some(user)) => Box::new(UserDashboard::new(client, user)),
            (Route::Appointments, Some(user)) => Box::new(Appointments::new(client, user)),
            (Route::Users, Some(_)) => Box::new(Users::new(client)),
            (Route::Patients, Some(user)) => Box::new(Patients::new(client, user)),
            (Route::Services, Some(user)) => Box::new(Services::new(client, user)),
            (Route::Enquiries, Some(user)) => Box::new(Enquiries::new(client, user)),
            (Route::Login, _) | (_, None) => Box::new(Login::new()),
        }
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Go(route) => self.navigate(route),
            Transition::SignIn(credentials) => {
                let result = self.session.login(&credentials).map(|user| user.role);
                match result {
                    Ok(role) => self.navigate(role.default_route()),
                    Err(err) => {
                        tracing::warn!(error = %err, "login failed");
                        self.screen.set_notice(Notice::error(err.user_message()));
                    }
                }
            }
            Transition::SignUp(request) => {
                let result = self.session.signup(&request).map(|user| user.role);
                match result {
                    Ok(role) => self.navigate(role.default_route()),
                    Err(err) => {
                        tracing::warn!(error = %err, "signup failed");
                        self.screen.set_notice(Notice::error(err.user_message()));
                    }
                }
            }
            Transition::Logout => {
                if let Err(err) = self.session.logout() {
                    tracing::warn!(error = %err, "failed to clear the stored session");
                }
                self.navigate(Route::Login);
                self.screen.set_notice(Notice::success(MSG_LOGGED_OUT));
            }
            Transition::Quit => self.should_quit = true,
        }
    }

    /// Sends the user back to login once after the server rejected the
    /// token. Nothing happens when login is already showing.
    fn check_session(&mut self) {
        if !self.session.client().take_session_expired() {
            return;
        }
        self.session.expire();
        if self.route != Route::Login {
            tracing::info!(from = self.route.path(), "session expired, returning to login");
            self.navigate(Route::Login);
            self.screen.set_notice(Notice::error(MSG_SESSION_EXPIRED));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{client_with, MockTransport};
    use crate::api::{ApiClient, Method};
    use crate::auth::TokenStore;
    use crate::components::testing::key;
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;
    use std::sync::Arc;

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    fn auth_ok(role: &str) -> serde_json::Value {
        json!({
            "success": true,
            "data": {
                "user": {"id": "u1", "name": "Janet", "email": "janet@hospus.com", "role": role},
                "tokens": {"accessToken": "access-1"}
            }
        })
    }

    fn sign_in(app: &mut App) {
        app.apply(Transition::SignIn(crate::auth::Credentials {
            email: "janet@hospus.com".into(),
            password: "password1".into(),
        }));
    }

    #[test]
    fn starts_on_login_without_a_session() {
        let mock = MockTransport::new();
        let app = App::new(Session::new(client_with(&mock)));
        assert_eq!(app.route(), Route::Login);
        assert!(!screen_text(&app).contains(MSG_NO_BACKEND));
    }

    #[test]
    fn missing_backend_is_announced_on_login() {
        let client = ApiClient::new(
            None,
            Arc::new(MockTransport::new()),
            TokenStore::in_memory().unwrap(),
        );
        let app = App::new(Session::new(client));
        assert!(screen_text(&app).contains(MSG_NO_BACKEND));
    }

    #[test]
    fn sign_in_opens_the_role_home() {
        let mock = MockTransport::new();
        mock.on(Method::Post, "/auth/login", 200, auth_ok("patient"));
        let mut app = App::new(Session::new(client_with(&mock)));
        sign_in(&mut app);
        assert_eq!(app.route(), Route::UserDashboard);

        app.navigate(Route::Users);
        assert_eq!(app.route(), Route::UserDashboard);
        app.navigate(Route::Signup);
        assert_eq!(app.route(), Route::UserDashboard);
    }

    #[test]
    fn failed_sign_in_stays_on_login_with_notice() {
        let mock = MockTransport::new();
        mock.on(Method::Post, "/auth/login", 401, json!({"message": "Unauthorized"}));
        let mut app = App::new(Session::new(client_with(&mock)));
        sign_in(&mut app);
        app.check_session();
        assert_eq!(app.route(), Route::Login);
        let text = screen_text(&app);
        assert!(text.contains("Invalid email or password."));
        assert!(!text.contains(MSG_SESSION_EXPIRED));
    }

    #[test]
    fn unauthorized_response_returns_to_login_once() {
        let mock = MockTransport::new();
        mock.on(Method::Post, "/auth/login", 200, auth_ok("admin"));
        mock.on(Method::Get, "/users", 401, json!({"message": "jwt expired"}));
        let mut app = App::new(Session::new(client_with(&mock)));
        sign_in(&mut app);
        // The dashboard's first fetch was rejected.
        app.check_session();

        assert_eq!(app.route(), Route::Login);
        assert!(!app.session.client().tokens().has_token());
        assert!(app.session.current_user().is_none());
        assert!(screen_text(&app).contains(MSG_SESSION_EXPIRED));

        app.tick();
        assert_eq!(app.route(), Route::Login);
    }

    #[test]
    fn unauthorized_on_login_does_not_navigate() {
        let mock = MockTransport::new();
        mock.on(Method::Get, "/users", 401, json!({}));
        let mut app = App::new(Session::new(client_with(&mock)));
        let _ = app
            .session
            .client()
            .get::<serde_json::Value>("/users", &[]);
        app.tick();
        assert_eq!(app.route(), Route::Login);
        assert!(!screen_text(&app).contains(MSG_SESSION_EXPIRED));
    }

    #[test]
    fn logout_clears_tokens() {
        let mock = MockTransport::new();
        mock.on(Method::Post, "/auth/login", 200, auth_ok("patient"));
        let mut app = App::new(Session::new(client_with(&mock)));
        sign_in(&mut app);
        assert!(app.session.client().tokens().has_token());

        app.apply(Transition::Logout);
        assert_eq!(app.route(), Route::Login);
        assert!(!app.session.client().tokens().has_token());
        assert!(screen_text(&app).contains(MSG_LOGGED_OUT));
    }

    #[test]
    fn ctrl_q_quits() {
        let mock = MockTransport::new();
        let mut app = App::new(Session::new(client_with(&mock)));
        app.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL))
            .unwrap();
        assert!(app.should_quit);
        app.should_quit = false;
        app.handle_key(key(KeyCode::Char('q'))).unwrap();
        assert!(!app.should_quit);
    }
}
