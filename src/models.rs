//! Data models for Hospus.
//!
//! These are the records exchanged with the backend. Field names follow the
//! server's camelCase JSON; the only behaviour living here is the appointment
//! status rules and date/time parsing, which several screens share.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

/// The closed set of roles the backend hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Doctor,
    Patient,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Staff, Role::Doctor, Role::Patient];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }

    /// Inverse of [`Role::as_str`].
    pub fn parse(value: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// An account known to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl User {
    /// Name to greet the user with; falls back to the email address.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// Body of `POST /users`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
}

/// Body of `PUT /users/:id`. Absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Lifecycle of an appointment. Transitions are owned by the server; the
/// client only decides which actions to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Approved => "Approved",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    /// Completed and already-cancelled appointments cannot be cancelled.
    pub fn can_cancel(self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Approved)
    }

    /// Completed and cancelled appointments cannot be moved.
    pub fn can_reschedule(self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Approved)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub service: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<String>,
    pub status: AppointmentStatus,
}

impl Appointment {
    /// The scheduled start, or `None` when the server sent a malformed
    /// date or time.
    pub fn starts_at(&self) -> Option<PrimitiveDateTime> {
        let date = parse_date(&self.date)?;
        let time = parse_time(&self.time)?;
        Some(PrimitiveDateTime::new(date, time))
    }

    /// Upcoming means not cancelled and starting at or after `now`.
    /// Appointments with an unreadable date never count as upcoming.
    pub fn is_upcoming(&self, now: PrimitiveDateTime) -> bool {
        self.status != AppointmentStatus::Cancelled
            && self.starts_at().is_some_and(|start| start >= now)
    }
}

/// Body of `PUT /appointments/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
}

/// Body of `POST /appointments` when a patient books a service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub service_id: String,
    pub service: String,
    pub date: String,
    pub time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

/// Admin-facing patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_record_number: Option<String>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Body of `POST /patients`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDraft {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_record_number: Option<String>,
}

/// An entry of the service catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnquiryStatus {
    #[default]
    Open,
    Closed,
}

/// Which side of the conversation wrote a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default)]
    pub id: Option<String>,
    pub from: Sender,
    #[serde(default)]
    pub from_name: Option<String>,
    pub message: String,
    #[serde(default)]
    pub date: Option<String>,
}

/// A support thread opened by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enquiry {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub status: EnquiryStatus,
    /// Oldest first, as sent by the server.
    #[serde(default)]
    pub messages: Vec<Reply>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body of `POST /enquiries`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEnquiry {
    pub subject: String,
    pub message: String,
}

/// Body of `POST /enquiries/:id/replies`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReply {
    pub message: String,
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Parses an `HH:MM` time.
pub fn parse_time(value: &str) -> Option<Time> {
    Time::parse(value.trim(), format_description!("[hour]:[minute]")).ok()
}

/// Wall-clock time in the local offset, or UTC when the offset is unknown.
pub fn local_now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    PrimitiveDateTime::new(now.date(), now.time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn appointment(date: &str, time: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: "a1".into(),
            service: "General Consultation".into(),
            date: date.into(),
            time: time.into(),
            doctor: Some("Dr. Nkosi".into()),
            status,
        }
    }

    #[test]
    fn completed_appointments_cannot_be_cancelled_or_moved() {
        assert!(!AppointmentStatus::Completed.can_cancel());
        assert!(!AppointmentStatus::Completed.can_reschedule());
        assert!(!AppointmentStatus::Cancelled.can_reschedule());
        assert!(AppointmentStatus::Pending.can_cancel());
        assert!(AppointmentStatus::Approved.can_reschedule());
    }

    #[test]
    fn starts_at_parses_date_and_time() {
        let a = appointment("2026-02-10", "10:30", AppointmentStatus::Approved);
        assert_eq!(a.starts_at(), Some(datetime!(2026-02-10 10:30)));
        let bad = appointment("10/02/2026", "10:30", AppointmentStatus::Approved);
        assert_eq!(bad.starts_at(), None);
    }

    #[test]
    fn upcoming_excludes_cancelled_and_past() {
        let now = datetime!(2026-02-05 12:00);
        assert!(appointment("2026-02-10", "10:30", AppointmentStatus::Approved).is_upcoming(now));
        assert!(!appointment("2026-02-10", "10:30", AppointmentStatus::Cancelled).is_upcoming(now));
        assert!(!appointment("2026-02-01", "09:00", AppointmentStatus::Pending).is_upcoming(now));
        assert!(appointment("2026-02-05", "12:00", AppointmentStatus::Pending).is_upcoming(now));
    }

    #[test]
    fn user_defaults_active_and_displays_email_without_name() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "email": "jane@hospus.com",
            "role": "patient"
        }))
        .unwrap();
        assert!(user.active);
        assert_eq!(user.display_name(), "jane@hospus.com");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result: Result<User, _> = serde_json::from_value(json!({
            "id": "u1",
            "email": "x@hospus.com",
            "role": "janitor"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn patches_omit_untouched_fields() {
        let patch = AppointmentPatch {
            status: Some(AppointmentStatus::Cancelled),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"status": "Cancelled"}));

        let patch = UserPatch {
            name: Some("Jane".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"name": "Jane"}));
    }

    #[test]
    fn enquiry_decodes_with_thread() {
        let enquiry: Enquiry = serde_json::from_value(json!({
            "id": "e1",
            "userId": "u7",
            "fromName": "Janet",
            "subject": "Billing question",
            "status": "open",
            "messages": [
                {"id": "m1", "from": "user", "message": "Hello", "date": "2026-01-02T10:00:00Z"},
                {"id": "m2", "from": "admin", "fromName": "Front desk", "message": "Hi Janet"}
            ]
        }))
        .unwrap();
        assert_eq!(enquiry.messages.len(), 2);
        assert_eq!(enquiry.messages[1].from, Sender::Admin);
        assert_eq!(enquiry.status, EnquiryStatus::Open);
    }

    #[test]
    fn role_parses_its_own_names() {
        assert_eq!(Role::parse("doctor"), Some(Role::Doctor));
        assert_eq!(Role::parse("Doctor"), None);
    }
}
