//! `/appointments` CRUD plus the cancel / reschedule / book actions.
//!
//! Status rules live on [`AppointmentStatus`]; the actions here refuse to send
//! anything the rules forbid, so a disabled action never reaches the server.

use super::ApiClient;
use crate::error::ApiError;
use crate::models::{Appointment, AppointmentPatch, AppointmentStatus, NewAppointment, Service};

const RESOURCE: &str = "appointments";

pub fn list(client: &ApiClient) -> Result<Vec<Appointment>, ApiError> {
    client.list::<Appointment>(RESOURCE, &[]).map(|page| page.items)
}

pub fn create(client: &ApiClient, appointment: &NewAppointment) -> Result<Appointment, ApiError> {
    client.create(RESOURCE, appointment)
}

pub fn update(
    client: &ApiClient,
    id: &str,
    patch: &AppointmentPatch,
) -> Result<Appointment, ApiError> {
    client.update(RESOURCE, id, patch)
}

/// Sets the status to `Cancelled`.
///
/// Returns `Ok(None)` without a request when the appointment can no longer be
/// cancelled.
pub fn cancel(client: &ApiClient, appointment: &Appointment) -> Result<Option<Appointment>, ApiError> {
    if !appointment.status.can_cancel() {
        tracing::debug!(id = %appointment.id, status = %appointment.status, "cancel refused");
        return Ok(None);
    }
    let patch = AppointmentPatch {
        status: Some(AppointmentStatus::Cancelled),
        ..AppointmentPatch::default()
    };
    update(client, &appointment.id, &patch).map(Some)
}

/// Moves the appointment and resets its status to `Pending`.
///
/// Returns `Ok(None)` without a request for completed or cancelled
/// appointments.
pub fn reschedule(
    client: &ApiClient,
    appointment: &Appointment,
    date: &str,
    time: &str,
) -> Result<Option<Appointment>, ApiError> {
    if !appointment.status.can_reschedule() {
        tracing::debug!(id = %appointment.id, status = %appointment.status, "reschedule refused");
        return Ok(None);
    }
    let patch = AppointmentPatch {
        date: Some(date.to_string()),
        time: Some(time.to_string()),
        status: Some(AppointmentStatus::Pending),
    };
    update(client, &appointment.id, &patch).map(Some)
}

/// Books `service` for the signed-in patient. Failures are returned as-is.
pub fn book(
    client: &ApiClient,
    service: &Service,
    date: &str,
    time: &str,
    notes: &str,
) -> Result<Appointment, ApiError> {
    let request = NewAppointment {
        service_id: service.id.clone(),
        service: service.name.clone(),
        date: date.to_string(),
        time: time.to_string(),
        notes: notes.trim().to_string(),
        status: AppointmentStatus::Pending,
    };
    create(client, &request)
}
