use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use agora_application::{
    AdminAssignmentPatch, AdminListing, AdminRoleRepository, AuditEvent, AuditLogEntry,
    AuditLogRepository, AuditRepository, BroadcastRecord, IdentityProvider,
};
use agora_core::{AppError, AppResult, Principal, PrincipalId};
use agora_domain::AdminRoleAssignment;

mod content;
mod operations;
mod platform;


type Row = Map<String, Value>;

#[derive(Debug, Default)]
struct StoreState {
    tokens: HashMap<String, Principal>,
    principals: Vec<Principal>,
    assignments: Vec<AdminRoleAssignment>,
    audit_entries: Vec<AuditLogEntry>,
    profiles: HashMap<String, Row>,
    posts: Vec<Row>,
    post_moderation: HashMap<String, Row>,
    trending_overrides: HashMap<String, Row>,
    reports: Vec<Row>,
    plans: Vec<Row>,
    settings: BTreeMap<String, Row>,
    storage: HashMap<String, BTreeSet<String>>,
    broadcasts: Vec<BroadcastRecord>,
    class_members: Vec<(String, PrincipalId)>,
    notifications: Vec<Value>,
    conversations: Vec<Row>,
    participants: HashMap<String, Vec<PrincipalId>>,
    messages: Vec<Row>,
}

/// In-memory implementation of every admin port.
///
/// Backs local runs without a database and the end-to-end HTTP tests. Rows
/// are kept as JSON objects shaped like their PostgreSQL counterparts.
#[derive(Debug, Default)]
pub struct InMemoryAdminStore {
    state: RwLock<StoreState>,
}

impl InMemoryAdminStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `token` resolve to `principal` and lists the principal in the user directory.
    pub async fn register_principal(&self, token: impl Into<String>, principal: Principal) {
        let mut state = self.state.write().await;
        if !state
            .principals
            .iter()
            .any(|existing| existing.id() == principal.id())
        {
            state.principals.push(principal.clone());
        }
        state.tokens.insert(token.into(), principal);
    }

    /// Seeds a member profile. The object must carry a string `id`.
    pub async fn insert_profile(&self, profile: Value) -> AppResult<()> {
        let row = keyed_row(profile, "profile")?;
        let id = row_id(&row).unwrap_or_default().to_owned();
        self.state.write().await.profiles.insert(id, row);
        Ok(())
    }

    /// Seeds a post row as exposed by the moderation view.
    pub async fn insert_post(&self, post: Value) -> AppResult<()> {
        let row = keyed_row(post, "post")?;
        self.state.write().await.posts.push(row);
        Ok(())
    }

    /// Seeds a user report.
    pub async fn insert_report(&self, report: Value) -> AppResult<()> {
        let row = keyed_row(report, "report")?;
        self.state.write().await.reports.push(row);
        Ok(())
    }

    /// Seeds an object in a storage bucket.
    pub async fn insert_storage_object(&self, bucket: &str, path: &str) {
        self.state
            .write()
            .await
            .storage
            .entry(bucket.to_owned())
            .or_default()
            .insert(path.to_owned());
    }

    /// Adds a member to a class.
    pub async fn insert_class_member(&self, class_id: &str, user_id: PrincipalId) {
        self.state
            .write()
            .await
            .class_members
            .push((class_id.to_owned(), user_id));
    }

    /// Seeds a conversation with its participants in join order.
    pub async fn insert_conversation(
        &self,
        conversation: Value,
        participants: Vec<PrincipalId>,
    ) -> AppResult<()> {
        let row = keyed_row(conversation, "conversation")?;
        let id = row_id(&row).unwrap_or_default().to_owned();
        let mut state = self.state.write().await;
        state.participants.insert(id, participants);
        state.conversations.push(row);
        Ok(())
    }

    /// Seeds a private message. The object must carry `conversation_id`.
    pub async fn insert_message(&self, message: Value) -> AppResult<()> {
        let row = keyed_row(message, "message")?;
        if row.get("conversation_id").and_then(Value::as_str).is_none() {
            return Err(AppError::Validation(
                "message conversation_id is required".to_owned(),
            ));
        }
        self.state.write().await.messages.push(row);
        Ok(())
    }

    /// Returns every notification created by broadcast fan-out.
    pub async fn notifications(&self) -> Vec<Value> {
        self.state.read().await.notifications.clone()
    }
}

fn keyed_row(value: Value, kind: &str) -> AppResult<Row> {
    let Value::Object(row) = value else {
        return Err(AppError::Validation(format!("{kind} must be an object")));
    };
    if row_id(&row).is_none() {
        return Err(AppError::Validation(format!("{kind} id is required")));
    }

    Ok(row)
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn row_time(row: &Row, column: &str) -> Option<DateTime<Utc>> {
    row.get(column)
        .and_then(Value::as_str)
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|value| value.with_timezone(&Utc))
}

fn newest_first(rows: &mut [Row], column: &str) {
    rows.sort_by(|left, right| row_time(right, column).cmp(&row_time(left, column)));
}

fn pick(row: &Row, columns: &[&str]) -> Value {
    Value::Object(
        columns
            .iter()
            .map(|column| {
                (
                    (*column).to_owned(),
                    row.get(*column).cloned().unwrap_or(Value::Null),
                )
            })
            .collect(),
    )
}

fn timestamp(value: DateTime<Utc>) -> Value {
    Value::String(value.to_rfc3339())
}

fn clamp_len(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

#[async_trait]
impl IdentityProvider for InMemoryAdminStore {
    async fn resolve_bearer(&self, token: &str) -> AppResult<Principal> {
        self.state
            .read()
            .await
            .tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("invalid token".to_owned()))
    }

    async fn list_principals(&self, page: u32, per_page: u32) -> AppResult<Vec<Principal>> {
        let per_page = usize::try_from(per_page).unwrap_or(usize::MAX);
        let skip = usize::try_from(page.saturating_sub(1))
            .unwrap_or(usize::MAX)
            .saturating_mul(per_page);

        Ok(self
            .state
            .read()
            .await
            .principals
            .iter()
            .skip(skip)
            .take(per_page)
            .cloned()
            .collect())
    }
}

const PROFILE_SUMMARY_COLUMNS: &[&str] = &["id", "handle", "full_name", "avatar_url"];

#[async_trait]
impl AdminRoleRepository for InMemoryAdminStore {
    async fn find_assignment(
        &self,
        principal_id: PrincipalId,
    ) -> AppResult<Option<AdminRoleAssignment>> {
        Ok(self
            .state
            .read()
            .await
            .assignments
            .iter()
            .find(|assignment| assignment.principal_id == principal_id)
            .cloned())
    }

    async fn list_assignments(&self) -> AppResult<Vec<AdminListing>> {
        let state = self.state.read().await;

        Ok(state
            .assignments
            .iter()
            .map(|assignment| AdminListing {
                assignment: assignment.clone(),
                profiles: state
                    .profiles
                    .get(&assignment.principal_id.to_string())
                    .map(|profile| pick(profile, PROFILE_SUMMARY_COLUMNS)),
            })
            .collect())
    }

    async fn upsert_assignment(&self, mut assignment: AdminRoleAssignment) -> AppResult<()> {
        let mut state = self.state.write().await;
        assignment.created_at = assignment.created_at.or_else(|| Some(Utc::now()));

        match state
            .assignments
            .iter()
            .position(|existing| existing.principal_id == assignment.principal_id)
        {
            Some(index) => {
                assignment.created_at = state.assignments[index].created_at;
                state.assignments[index] = assignment;
            }
            None => state.assignments.push(assignment),
        }

        Ok(())
    }

    async fn update_assignment(
        &self,
        principal_id: PrincipalId,
        patch: AdminAssignmentPatch,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let Some(assignment) = state
            .assignments
            .iter_mut()
            .find(|assignment| assignment.principal_id == principal_id)
        else {
            return Err(AppError::NotFound(format!(
                "admin user '{principal_id}' not found"
            )));
        };

        match patch {
            AdminAssignmentPatch::Role(role) => assignment.role = role,
            AdminAssignmentPatch::Active(is_active) => assignment.is_active = is_active,
            AdminAssignmentPatch::DmAccess(enabled) => assignment.dm_access_enabled = enabled,
        }

        Ok(())
    }

    async fn find_profile_summary(&self, principal_id: PrincipalId) -> AppResult<Option<Value>> {
        Ok(self
            .state
            .read()
            .await
            .profiles
            .get(&principal_id.to_string())
            .map(|profile| pick(profile, PROFILE_SUMMARY_COLUMNS)))
    }
}

#[async_trait]
impl AuditRepository for InMemoryAdminStore {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.state.write().await.audit_entries.push(AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            actor_user_id: event.actor_id,
            actor_role: event.actor_role,
            action: event.action,
            target_type: event.target_type,
            target_id: event.target_id,
            before_json: event.before_json,
            after_json: event.after_json,
            ip_address: event.ip_address,
            user_agent: event.user_agent,
            created_at: Utc::now(),
        });

        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAdminStore {
    async fn list_recent(&self, limit: i64) -> AppResult<Vec<AuditLogEntry>> {
        Ok(self
            .state
            .read()
            .await
            .audit_entries
            .iter()
            .rev()
            .take(clamp_len(limit))
            .cloned()
            .collect())
    }

    async fn list_for_target(
        &self,
        target_type: &str,
        target_id: &str,
        limit: i64,
    ) -> AppResult<Vec<AuditLogEntry>> {
        Ok(self
            .state
            .read()
            .await
            .audit_entries
            .iter()
            .rev()
            .filter(|entry| {
                entry.target_type.as_deref() == Some(target_type)
                    && entry.target_id.as_deref() == Some(target_id)
            })
            .take(clamp_len(limit))
            .cloned()
            .collect())
    }
}
