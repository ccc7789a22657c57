//! Form checks that run before anything is sent to the server.
//!
//! Each form exposes a `validate` that either yields the request payload or a
//! set of per-field messages. Only the first problem per field is kept, which
//! is what the forms display.

use crate::auth::{Credentials, SignupRequest};
use crate::models::{
    parse_date, parse_time, Gender, NewEnquiry, NewUser, PatientDraft, Role, UserPatch,
};
use regex::Regex;
use std::sync::LazyLock;

pub const MIN_PASSWORD_LEN: usize = 8;

pub const MSG_EMAIL: &str = "Enter a valid email address.";
pub const MSG_PASSWORD_LEN: &str = "Password must be at least 8 characters.";
pub const MSG_PASSWORD_MATCH: &str = "Passwords do not match.";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9_'+\-]+(\.[A-Za-z0-9_'+\-]+)*@([A-Za-z0-9]([A-Za-z0-9\-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
    )
    .expect("email pattern is valid")
});

/// Whether `value` has the shape `local@domain.tld`.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Per-field validation messages, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` for `field` unless the field already has one.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.0.push((field, message.into()));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The first message found, for forms with a single error line.
    pub fn first(&self) -> Option<(&'static str, &str)> {
        self.0.first().map(|(field, message)| (*field, message.as_str()))
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn check_email(errors: &mut FieldErrors, field: &'static str, value: &str) {
    if !is_valid_email(value.trim()) {
        errors.add(field, MSG_EMAIL);
    }
}

fn check_required(errors: &mut FieldErrors, field: &'static str, value: &str, label: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("{label} is required."));
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, "email", &self.email);
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password", MSG_PASSWORD_LEN);
        }
        errors.into_result(Credentials {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub id_number: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<SignupRequest, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_required(&mut errors, "firstName", &self.first_name, "First name");
        check_required(&mut errors, "lastName", &self.last_name, "Last name");
        check_email(&mut errors, "email", &self.email);
        check_required(&mut errors, "idNumber", &self.id_number, "ID number");
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password", MSG_PASSWORD_LEN);
        }
        if self.confirm_password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("confirmPassword", MSG_PASSWORD_LEN);
        }
        if self.password != self.confirm_password {
            errors.add("confirmPassword", MSG_PASSWORD_MATCH);
        }
        errors.into_result(SignupRequest {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            id_number: self.id_number.trim().to_string(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl ForgotPasswordForm {
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, "email", &self.email);
        errors.into_result(self.email.trim().to_string())
    }
}

/// New-account form of the user management screen.
#[derive(Debug, Clone)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Default for UserForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            role: Role::Patient,
        }
    }
}

impl UserForm {
    pub fn validate(&self) -> Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_required(&mut errors, "name", &self.name, "Name");
        check_email(&mut errors, "email", &self.email);
        errors.into_result(NewUser {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            role: self.role,
            active: true,
        })
    }
}

/// Inline edit of an existing account.
#[derive(Debug, Clone)]
pub struct UserEditForm {
    pub name: String,
    pub role: Role,
    pub active: bool,
}

impl UserEditForm {
    pub fn validate(&self) -> Result<UserPatch, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_required(&mut errors, "name", &self.name, "Name");
        errors.into_result(UserPatch {
            name: Some(self.name.trim().to_string()),
            role: Some(self.role),
            active: Some(self.active),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatientForm {
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub gender: Option<Gender>,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub medical_record_number: String,
}

impl PatientForm {
    pub fn validate(&self) -> Result<PatientDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_required(&mut errors, "firstName", &self.first_name, "First name");
        check_required(&mut errors, "lastName", &self.last_name, "Last name");
        if !self.dob.trim().is_empty() && parse_date(&self.dob).is_none() {
            errors.add("dob", "Date of birth must be YYYY-MM-DD.");
        }
        if !self.email.trim().is_empty() {
            check_email(&mut errors, "email", &self.email);
        }
        errors.into_result(PatientDraft {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            dob: optional(&self.dob),
            gender: self.gender,
            email: optional(&self.email),
            phone: optional(&self.phone),
            address: optional(&self.address),
            medical_record_number: optional(&self.medical_record_number),
        })
    }
}

/// Date and time entered for a booking or a reschedule.
#[derive(Debug, Clone, Default)]
pub struct ScheduleForm {
    pub date: String,
    pub time: String,
}

impl ScheduleForm {
    /// Yields the trimmed `(date, time)` pair.
    pub fn validate(&self) -> Result<(String, String), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.date.trim().is_empty() || self.time.trim().is_empty() {
            errors.add("date", "Please choose a date and time.");
        } else {
            if parse_date(&self.date).is_none() {
                errors.add("date", "Date must be YYYY-MM-DD.");
            }
            if parse_time(&self.time).is_none() {
                errors.add("time", "Time must be HH:MM.");
            }
        }
        errors.into_result((self.date.trim().to_string(), self.time.trim().to_string()))
    }
}

/// New support thread opened by a patient.
#[derive(Debug, Clone, Default)]
pub struct EnquiryForm {
    pub subject: String,
    pub message: String,
}

impl EnquiryForm {
    pub fn validate(&self) -> Result<NewEnquiry, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_required(&mut errors, "subject", &self.subject, "Subject");
        check_required(&mut errors, "message", &self.message, "Message");
        errors.into_result(NewEnquiry {
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
        })
    }
}

/// Reply typed under an enquiry thread.
#[derive(Debug, Clone, Default)]
pub struct ReplyForm {
    pub message: String,
}

impl ReplyForm {
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        check_required(&mut errors, "message", &self.message, "Message");
        errors.into_result(self.message.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("john@hospus.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("john@"));
        assert!(!is_valid_email("john.hospus.com"));
        assert!(!is_valid_email("john@hospus"));
        assert!(!is_valid_email(".john@hospus.com"));
        assert!(!is_valid_email("jo..hn@hospus.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn login_rejects_bad_email_and_short_password() {
        let form = LoginForm {
            email: "not-an-email".into(),
            password: "short".into(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("email"), Some(MSG_EMAIL));
        assert_eq!(errors.get("password"), Some(MSG_PASSWORD_LEN));
    }

    #[test]
    fn login_accepts_exactly_eight_characters() {
        let form = LoginForm {
            email: " nurse@hospus.com ".into(),
            password: "12345678".into(),
        };
        let credentials = form.validate().unwrap();
        assert_eq!(credentials.email, "nurse@hospus.com");
    }

    fn signup() -> SignupForm {
        SignupForm {
            first_name: "Janet".into(),
            last_name: "Abigail".into(),
            email: "janet@hospus.com".into(),
            id_number: "9001015009087".into(),
            password: "correct horse".into(),
            confirm_password: "correct horse".into(),
        }
    }

    #[test]
    fn signup_mismatch_cites_confirmation_field() {
        let mut form = signup();
        form.confirm_password = "correct horse!".into();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("confirmPassword"), Some(MSG_PASSWORD_MATCH));
        assert_eq!(errors.get("password"), None);
    }

    #[test]
    fn signup_requires_names_and_id() {
        let mut form = signup();
        form.first_name.clear();
        form.id_number = "   ".into();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("firstName"), Some("First name is required."));
        assert_eq!(errors.get("idNumber"), Some("ID number is required."));
    }

    #[test]
    fn signup_valid_form_yields_request() {
        let request = signup().validate().unwrap();
        assert_eq!(request.email, "janet@hospus.com");
        assert_eq!(request.confirm_password, request.password);
    }

    #[test]
    fn only_first_error_per_field_is_kept() {
        let mut errors = FieldErrors::new();
        errors.add("email", "first");
        errors.add("email", "second");
        assert_eq!(errors.get("email"), Some("first"));
        assert_eq!(errors.first(), Some(("email", "first")));
    }

    #[test]
    fn patient_form_checks_optional_fields_only_when_present() {
        let form = PatientForm {
            first_name: "Mary".into(),
            last_name: "Jane".into(),
            ..Default::default()
        };
        let draft = form.validate().unwrap();
        assert_eq!(draft.dob, None);
        assert_eq!(draft.email, None);

        let form = PatientForm {
            first_name: "Mary".into(),
            last_name: "Jane".into(),
            dob: "07/03/1990".into(),
            email: "mary@".into(),
            ..Default::default()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("dob").is_some());
        assert_eq!(errors.get("email"), Some(MSG_EMAIL));
    }

    #[test]
    fn schedule_form_requires_both_parts() {
        let form = ScheduleForm {
            date: "2026-03-01".into(),
            time: String::new(),
        };
        assert_eq!(
            form.validate().unwrap_err().get("date"),
            Some("Please choose a date and time.")
        );
        let form = ScheduleForm {
            date: "2026-03-01".into(),
            time: "25:00".into(),
        };
        assert_eq!(form.validate().unwrap_err().get("time"), Some("Time must be HH:MM."));
        let form = ScheduleForm {
            date: " 2026-03-01 ".into(),
            time: "09:15".into(),
        };
        assert_eq!(
            form.validate().unwrap(),
            ("2026-03-01".to_string(), "09:15".to_string())
        );
    }

    #[test]
    fn user_form_builds_active_account() {
        let form = UserForm {
            name: "Dr. Lee".into(),
            email: "lee@hospus.com".into(),
            role: Role::Doctor,
        };
        let user = form.validate().unwrap();
        assert!(user.active);
        assert_eq!(user.role, Role::Doctor);
    }

    #[test]
    fn user_edit_requires_name() {
        let form = UserEditForm {
            name: "  ".into(),
            role: Role::Staff,
            active: false,
        };
        assert_eq!(form.validate().unwrap_err().get("name"), Some("Name is required."));
    }

    #[test]
    fn enquiry_needs_subject_and_message() {
        let errors = EnquiryForm {
            subject: " ".into(),
            message: String::new(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("subject"), Some("Subject is required."));
        assert_eq!(errors.get("message"), Some("Message is required."));
        assert!(ReplyForm::default().validate().is_err());
    }
}
