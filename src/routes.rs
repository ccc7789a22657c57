//! Routes, role capabilities and the route guard.

use crate::models::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Signup,
    ForgotPassword,
    Dashboard,
    UserDashboard,
    Appointments,
    Users,
    Patients,
    Services,
    Enquiries,
}

impl Route {
    pub const ALL: [Route; 10] = [
        Route::Login,
        Route::Signup,
        Route::ForgotPassword,
        Route::Dashboard,
        Route::UserDashboard,
        Route::Appointments,
        Route::Users,
        Route::Patients,
        Route::Services,
        Route::Enquiries,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Signup => "/signup",
            Route::ForgotPassword => "/forgot-password",
            Route::Dashboard => "/dashboard",
            Route::UserDashboard => "/user-dashboard",
            Route::Appointments => "/appointments",
            Route::Users => "/users",
            Route::Patients => "/patients",
            Route::Services => "/services",
            Route::Enquiries => "/enquiries",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Signup => "Sign Up",
            Route::ForgotPassword => "Forgot Password",
            Route::Dashboard => "Admin Dashboard",
            Route::UserDashboard => "My Dashboard",
            Route::Appointments => "Appointments",
            Route::Users => "User Management",
            Route::Patients => "Patient Records",
            Route::Services => "Services",
            Route::Enquiries => "Enquiries",
        }
    }

    /// Reachable without a session.
    pub fn is_public(self) -> bool {
        matches!(self, Route::Login | Route::Signup | Route::ForgotPassword)
    }

    /// Capability needed to open the route; `None` for public routes.
    pub fn capability(self) -> Option<Capability> {
        match self {
            Route::Login | Route::Signup | Route::ForgotPassword => None,
            Route::Dashboard => Some(Capability::ViewAdminDashboard),
            Route::UserDashboard => Some(Capability::ViewPersonalDashboard),
            Route::Appointments => Some(Capability::ViewAppointments),
            Route::Users => Some(Capability::ManageUsers),
            Route::Patients => Some(Capability::ViewPatientRecords),
            Route::Services => Some(Capability::BrowseServices),
            Route::Enquiries => Some(Capability::UseEnquiries),
        }
    }
}

/// Things a role may do. Screens check these instead of comparing roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ViewAdminDashboard,
    ViewPersonalDashboard,
    ViewAppointments,
    ManageUsers,
    ViewPatientRecords,
    BrowseServices,
    BookServices,
    UseEnquiries,
    OpenEnquiry,
    SeeAllEnquiries,
}

impl Role {
    pub fn can(self, capability: Capability) -> bool {
        use Capability::*;
        match capability {
            ViewAdminDashboard | ManageUsers | SeeAllEnquiries => self == Role::Admin,
            ViewPersonalDashboard => self != Role::Admin,
            ViewAppointments | BrowseServices | UseEnquiries => {
                matches!(self, Role::Admin | Role::Patient)
            }
            ViewPatientRecords => {
                matches!(self, Role::Admin | Role::Staff | Role::Doctor)
            }
            BookServices | OpenEnquiry => self == Role::Patient,
        }
    }

    pub fn default_route(self) -> Route {
        match self {
            Role::Admin => Route::Dashboard,
            Role::Staff | Role::Doctor | Role::Patient => Route::UserDashboard,
        }
    }

    pub fn can_open(self, route: Route) -> bool {
        route
            .capability()
            .map_or(true, |capability| self.can(capability))
    }

    /// Protected routes offered in this role's navigation menu.
    pub fn menu(self) -> Vec<Route> {
        Route::ALL
            .into_iter()
            .filter(|route| !route.is_public() && self.can_open(*route))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    Redirect(Route),
    /// The role's own default route is closed to it; show a notice instead
    /// of redirecting again.
    Forbidden,
}

/// Decides what happens when `route` is requested.
///
/// `user` is `None` both when signed out and while the session is still
/// being hydrated; either way protected routes send the visitor to login.
pub fn guard(route: Route, user: Option<&User>) -> GuardDecision {
    let Some(user) = user else {
        return if route.is_public() {
            GuardDecision::Render
        } else {
            GuardDecision::Redirect(Route::Login)
        };
    };

    let home = user.role.default_route();
    if route.is_public() {
        return GuardDecision::Redirect(home);
    }
    if user.role.can_open(route) {
        GuardDecision::Render
    } else if route == home || !user.role.can_open(home) {
        GuardDecision::Forbidden
    } else {
        GuardDecision::Redirect(home)
    }
}

/// Follows redirects until a route renders or is forbidden.
pub fn resolve(route: Route, user: Option<&User>) -> (Route, GuardDecision) {
    let mut current = route;
    // Every redirect targets login or the role's home, so this settles in two hops.
    for _ in 0..3 {
        match guard(current, user) {
            GuardDecision::Redirect(next) if next != current => current = next,
            GuardDecision::Redirect(_) => return (current, GuardDecision::Forbidden),
            decision => return (current, decision),
        }
    }
    (current, GuardDecision::Forbidden)
}
