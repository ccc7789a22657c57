//! `/users` CRUD.

use super::envelope::Page;
use super::ApiClient;
use crate::error::ApiError;
use crate::models::{NewUser, User, UserPatch};

const RESOURCE: &str = "users";

pub fn get_all(client: &ApiClient) -> Result<Vec<User>, ApiError> {
    client
        .list::<User>(RESOURCE, &[])
        .map(|page: Page<User>| page.items)
}

pub fn create(client: &ApiClient, user: &NewUser) -> Result<User, ApiError> {
    client.create(RESOURCE, user)
}

pub fn update(client: &ApiClient, id: &str, patch: &UserPatch) -> Result<User, ApiError> {
    client.update(RESOURCE, id, patch)
}

pub fn delete(client: &ApiClient, id: &str) -> Result<(), ApiError> {
    client.remove(RESOURCE, id)
}

/// Server-side total, used by the admin dashboard.
pub fn count(client: &ApiClient) -> Result<u64, ApiError> {
    client.list::<User>(RESOURCE, &[]).map(|page| page.total())
}
