//! `/services` catalog.

use super::ApiClient;
use crate::error::ApiError;
use crate::models::Service;

const RESOURCE: &str = "services";

pub fn list(client: &ApiClient) -> Result<Vec<Service>, ApiError> {
    client.list::<Service>(RESOURCE, &[]).map(|page| page.items)
}
