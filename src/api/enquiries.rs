//! `/enquiries` threads and replies.

use super::envelope::Page;
use super::ApiClient;
use crate::error::ApiError;
use crate::models::{Enquiry, NewEnquiry, NewReply, Role, User};
use serde::Deserialize;

const RESOURCE: &str = "enquiries";

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
struct Created {
    enquiry: Enquiry,
}

/// One page of threads. `page` is 1-based.
pub fn list(client: &ApiClient, page: u32, limit: u32) -> Result<Page<Enquiry>, ApiError> {
    client.list(
        RESOURCE,
        &[("page", page.max(1).to_string()), ("limit", limit.to_string())],
    )
}

pub fn create(client: &ApiClient, enquiry: &NewEnquiry) -> Result<Enquiry, ApiError> {
    client
        .create::<_, Created>(RESOURCE, enquiry)
        .map(|created| created.enquiry)
}

/// Appends a reply. The server answers with the updated thread.
pub fn reply(client: &ApiClient, id: &str, message: &str) -> Result<Enquiry, ApiError> {
    client.post(
        &format!("/{RESOURCE}/{id}/replies"),
        &NewReply {
            message: message.trim().to_string(),
        },
    )
}

/// Admins see every thread, everyone else only their own.
pub fn visible_to(enquiries: Vec<Enquiry>, user: &User) -> Vec<Enquiry> {
    if user.role == Role::Admin {
        return enquiries;
    }
    enquiries
        .into_iter()
        .filter(|enquiry| enquiry.user_id.as_deref() == Some(user.id.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{client_with, MockTransport};
    use crate::api::Method;
    use crate::models::EnquiryStatus;
    use serde_json::json;

    fn enquiry(id: &str, user_id: Option<&str>) -> Enquiry {
        Enquiry {
            id: id.into(),
            user_id: user_id.map(Into::into),
            from_name: None,
            subject: "Hello".into(),
            status: EnquiryStatus::Open,
            messages: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.into(),
            name: String::new(),
            email: format!("{id}@hospus.com"),
            role,
            active: true,
        }
    }

    #[test]
    fn list_sends_page_and_limit() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            "/enquiries",
            200,
            json!({"success": true, "data": {"items": [], "meta": {"total": 41, "page": 3, "limit": 20}}}),
        );
        let page = list(&client_with(&mock), 3, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(page.total(), 41);
        assert_eq!(
            mock.requests()[0].query,
            vec![
                ("page".to_string(), "3".to_string()),
                ("limit".to_string(), "20".to_string())
            ]
        );
    }

    #[test]
    fn create_unwraps_enquiry() {
        let mock = MockTransport::new();
        mock.on(
            Method::Post,
            "/enquiries",
            201,
            json!({"success": true, "data": {"enquiry": {"id": "e9", "subject": "Parking", "messages": [
                {"from": "user", "message": "Where do I park?"}
            ]}}}),
        );
        let created = create(
            &client_with(&mock),
            &NewEnquiry {
                subject: "Parking".into(),
                message: "Where do I park?".into(),
            },
        )
        .unwrap();
        assert_eq!(created.id, "e9");
        assert_eq!(created.messages.len(), 1);
    }

    #[test]
    fn reply_posts_to_thread() {
        let mock = MockTransport::new();
        mock.on(
            Method::Post,
            "/enquiries/e1/replies",
            200,
            json!({"success": true, "data": {"id": "e1", "messages": []}}),
        );
        reply(&client_with(&mock), "e1", " Thanks! ").unwrap();
        assert_eq!(mock.requests()[0].body, Some(json!({"message": "Thanks!"})));
    }

    #[test]
    fn non_admins_only_see_their_threads() {
        let all = vec![enquiry("1", Some("u1")), enquiry("2", Some("u2")), enquiry("3", None)];
        let mine = visible_to(all.clone(), &user("u1", Role::Patient));
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "1");
        assert_eq!(visible_to(all, &user("root", Role::Admin)).len(), 3);
    }
}
