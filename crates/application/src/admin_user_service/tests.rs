use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use tokio::sync::Mutex;

use agora_core::{AppError, AppResult, Principal, PrincipalId};
use agora_domain::AdminRole;

use super::{AdminUserAction, AdminUserService, EMAIL_LOOKUP_MAX_PAGES, EMAIL_LOOKUP_PAGE_SIZE};
use crate::test_support::{FakeAdminRoleRepository, RecordingAuditRepository, assignment, context_for};
use crate::{ActionHandler, AuditRecorder, IdentityProvider};

struct PagedIdentityProvider {
    principals: Vec<Principal>,
    pages_requested: Mutex<Vec<u32>>,
}

impl PagedIdentityProvider {
    fn new(principals: Vec<Principal>) -> Self {
        Self {
            principals,
            pages_requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl IdentityProvider for PagedIdentityProvider {
    async fn resolve_bearer(&self, _token: &str) -> AppResult<Principal> {
        Err(AppError::Unauthorized("invalid token".to_owned()))
    }

    async fn list_principals(&self, page: u32, per_page: u32) -> AppResult<Vec<Principal>> {
        self.pages_requested.lock().await.push(page);
        let per_page = per_page as usize;
        let start = (page as usize - 1) * per_page;
        Ok(self
            .principals
            .iter()
            .skip(start)
            .take(per_page)
            .cloned()
            .collect())
    }
}

fn members(count: usize) -> Vec<Principal> {
    (0..count)
        .map(|index| Principal::new(PrincipalId::new(), Some(format!("member{index}@example.com"))))
        .collect()
}

struct Fixture {
    service: AdminUserService,
    roles: Arc<FakeAdminRoleRepository>,
    identity: Arc<PagedIdentityProvider>,
    audit: Arc<RecordingAuditRepository>,
}

fn fixture(principals: Vec<Principal>) -> Fixture {
    let roles = Arc::new(FakeAdminRoleRepository::default());
    let identity = Arc::new(PagedIdentityProvider::new(principals));
    let audit = Arc::new(RecordingAuditRepository::default());
    Fixture {
        service: AdminUserService::new(
            roles.clone(),
            identity.clone(),
            AuditRecorder::new(audit.clone()),
        ),
        roles,
        identity,
        audit,
    }
}

fn add_admin(email: &str, role: AdminRole) -> AdminUserAction {
    AdminUserAction::AddAdmin {
        email: email.to_owned(),
        role,
    }
}

#[tokio::test]
async fn add_admin_twice_keeps_one_row_with_latest_role() {
    let principals = members(3);
    let target = principals[1].id();
    let fixture = fixture(principals);
    let context = context_for(AdminRole::SuperAdmin);

    let first = fixture
        .service
        .handle(&context, add_admin("member1@example.com", AdminRole::Support))
        .await;
    assert!(matches!(first, Ok(ref row) if row["role"] == json!("support")));

    let second = fixture
        .service
        .handle(&context, add_admin("  MEMBER1@example.com ", AdminRole::Moderator))
        .await;
    let Ok(row) = second else {
        panic!("second add-admin should succeed");
    };
    assert_eq!(row["user_id"], json!(target.to_string()));
    assert_eq!(row["is_active"], json!(true));
    assert_eq!(row["dm_access_enabled"], json!(false));

    let assignments = fixture.roles.assignments.lock().await;
    assert_eq!(assignments.len(), 1);
    assert!(matches!(assignments.get(&target), Some(value) if value.role == AdminRole::Moderator));
    drop(assignments);

    let events = fixture.audit.events.lock().await;
    assert_eq!(events.len(), 2);
    assert!(events[0].before_json.is_none());
    assert_eq!(events[1].after_json, Some(json!({ "role": "moderator" })));
}

#[tokio::test]
async fn re_adding_admin_returns_stored_row() {
    let principals = members(2);
    let target = principals[0].id();
    let granted_at = Utc::now() - Duration::days(30);
    let mut existing = assignment(target, AdminRole::Support);
    existing.created_at = Some(granted_at);

    let roles = Arc::new(FakeAdminRoleRepository::with(vec![existing]));
    let service = AdminUserService::new(
        roles.clone(),
        Arc::new(PagedIdentityProvider::new(principals)),
        AuditRecorder::new(Arc::new(RecordingAuditRepository::default())),
    );

    let result = service
        .handle(
            &context_for(AdminRole::SuperAdmin),
            add_admin("member0@example.com", AdminRole::Moderator),
        )
        .await;
    let Ok(row) = result else {
        panic!("re-adding an admin should succeed");
    };
    assert_eq!(row["role"], json!("moderator"));
    assert_eq!(row["created_at"], json!(granted_at));
    assert!(matches!(
        roles.assignments.lock().await.get(&target),
        Some(stored) if stored.created_at == Some(granted_at)
    ));
}

#[tokio::test]
async fn email_lookup_walks_pages() {
    let principals = members(EMAIL_LOOKUP_PAGE_SIZE as usize + 5);
    let fixture = fixture(principals);
    let email = format!("member{}@example.com", EMAIL_LOOKUP_PAGE_SIZE + 2);

    let result = fixture
        .service
        .handle(
            &context_for(AdminRole::SuperAdmin),
            add_admin(&email, AdminRole::Support),
        )
        .await;
    assert!(result.is_ok());
    assert_eq!(*fixture.identity.pages_requested.lock().await, vec![1, 2]);
}

#[tokio::test]
async fn unknown_email_is_not_found_after_last_short_page() {
    let fixture = fixture(members(4));

    let result = fixture
        .service
        .handle(
            &context_for(AdminRole::SuperAdmin),
            add_admin("stranger@example.com", AdminRole::Support),
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(ref message)) if message == "user not found for that email"));
    assert_eq!(*fixture.identity.pages_requested.lock().await, vec![1]);
    assert!(fixture.audit.events.lock().await.is_empty());
}

#[tokio::test]
async fn email_lookup_stops_at_page_cap() {
    let principals = members((EMAIL_LOOKUP_MAX_PAGES * EMAIL_LOOKUP_PAGE_SIZE) as usize + 1);
    let fixture = fixture(principals);
    let email = format!(
        "member{}@example.com",
        EMAIL_LOOKUP_MAX_PAGES * EMAIL_LOOKUP_PAGE_SIZE
    );

    let result = fixture
        .service
        .handle(
            &context_for(AdminRole::SuperAdmin),
            add_admin(&email, AdminRole::Support),
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(
        fixture.identity.pages_requested.lock().await.len(),
        EMAIL_LOOKUP_MAX_PAGES as usize
    );
}

#[tokio::test]
async fn set_role_records_before_and_after() {
    let fixture = fixture(Vec::new());
    let admin_id = PrincipalId::new();
    fixture
        .roles
        .assignments
        .lock()
        .await
        .insert(admin_id, assignment(admin_id, AdminRole::Support));

    let result = fixture
        .service
        .handle(
            &context_for(AdminRole::SuperAdmin),
            AdminUserAction::SetRole {
                user_id: admin_id,
                role: AdminRole::SuperAdmin,
            },
        )
        .await;
    assert!(result.is_ok());

    let events = fixture.audit.events.lock().await;
    assert_eq!(events[0].action, "set-admin-role");
    assert_eq!(
        events[0].before_json.as_ref().map(|before| before["role"].clone()),
        Some(json!("support"))
    );
    assert_eq!(events[0].after_json, Some(json!({ "role": "super_admin" })));
}

#[tokio::test]
async fn deactivating_unknown_admin_is_not_found() {
    let fixture = fixture(Vec::new());

    let result = fixture
        .service
        .handle(
            &context_for(AdminRole::SuperAdmin),
            AdminUserAction::SetActive {
                user_id: PrincipalId::new(),
                is_active: false,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(fixture.audit.events.lock().await.is_empty());
}

#[test]
fn set_dm_access_parses_camel_case_fields() {
    let user_id = PrincipalId::new();
    let parsed: Result<AdminUserAction, _> = serde_json::from_value(json!({
        "action": "set-dm-access",
        "userId": user_id,
        "enabled": true,
    }));
    assert!(matches!(
        parsed,
        Ok(AdminUserAction::SetDmAccess { user_id: parsed_id, enabled: true }) if parsed_id == user_id
    ));
    let listed: Result<AdminUserAction, _> = serde_json::from_value(json!({ "action": "list" }));
    assert!(matches!(listed, Ok(AdminUserAction::List)));
}
