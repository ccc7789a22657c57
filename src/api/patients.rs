//! `/patients` CRUD.

use super::ApiClient;
use crate::error::ApiError;
use crate::models::{Patient, PatientDraft};

const RESOURCE: &str = "patients";

pub fn list(client: &ApiClient) -> Result<Vec<Patient>, ApiError> {
    client.list::<Patient>(RESOURCE, &[]).map(|page| page.items)
}

pub fn create(client: &ApiClient, draft: &PatientDraft) -> Result<Patient, ApiError> {
    client.create(RESOURCE, draft)
}

pub fn delete(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client.remove(RESOURCE, id)
}

pub fn count(client: &ApiClient) -> Result<u64, ApiError> {
    client.list::<Patient>(RESOURCE, &[]).map(|page| page.total())
}
