use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use agora_core::{AppError, AppResult, Principal, PrincipalId};
use agora_domain::{AdminRole, AdminRoleAssignment, TargetType};

use crate::{AuthorizationService, IdentityResolver};

/// Caller details copied into audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
}

/// Static declaration attached to every action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionPolicy {
    /// Wire tag of the action.
    pub name: &'static str,
    /// Minimum role allowed to run it.
    pub min_role: AdminRole,
    /// Kind of resource it touches.
    pub target_type: TargetType,
}

impl ActionPolicy {
    /// Declares an action policy.
    #[must_use]
    pub const fn new(name: &'static str, min_role: AdminRole, target_type: TargetType) -> Self {
        Self {
            name,
            min_role,
            target_type,
        }
    }
}

/// Typed action payload of one functional area.
///
/// The policy is keyed by the wire tag alone so the gate runs before any
/// action field is deserialized.
pub trait AdminAction: DeserializeOwned + Send {
    /// Returns the policy of the action tagged `tag`, or `None` for an unrecognized tag.
    fn policy(tag: &str) -> Option<ActionPolicy>;
}

/// Authenticated and authorized caller of one action.
#[derive(Debug, Clone)]
pub struct ActionContext {
    principal: Principal,
    assignment: AdminRoleAssignment,
    metadata: RequestMetadata,
    policy: ActionPolicy,
}

impl ActionContext {
    /// Builds a context for a caller that passed the gate.
    #[must_use]
    pub fn new(
        principal: Principal,
        assignment: AdminRoleAssignment,
        metadata: RequestMetadata,
        policy: ActionPolicy,
    ) -> Self {
        Self {
            principal,
            assignment,
            metadata,
            policy,
        }
    }

    /// Returns the acting principal id.
    #[must_use]
    pub fn actor_id(&self) -> PrincipalId {
        self.principal.id()
    }

    /// Returns the actor's role as resolved by the gate.
    #[must_use]
    pub fn actor_role(&self) -> AdminRole {
        self.assignment.role
    }

    /// Returns the acting principal.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns request metadata.
    #[must_use]
    pub fn metadata(&self) -> &RequestMetadata {
        &self.metadata
    }

    /// Returns the policy the caller was authorized against.
    #[must_use]
    pub fn policy(&self) -> ActionPolicy {
        self.policy
    }
}

/// Handler of one functional area.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Area name used in endpoint paths and logs.
    const AREA: &'static str;

    /// Tagged action payload accepted by this area.
    type Action: AdminAction;

    /// Runs an authorized action and returns the `data` payload.
    async fn handle(&self, context: &ActionContext, action: Self::Action) -> AppResult<Value>;
}

/// Raw inbound request for an area endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionRequest {
    /// Token from the `Authorization: Bearer` header.
    pub bearer_token: Option<String>,
    /// JSON body.
    pub body: Vec<u8>,
    /// Caller metadata.
    pub metadata: RequestMetadata,
}

/// Object-safe view of an area router, used by transport layers.
#[async_trait]
pub trait AdminEndpoint: Send + Sync {
    /// Area name.
    fn area(&self) -> &'static str;

    /// Authenticates, authorizes, parses and runs one request.
    async fn dispatch(&self, request: ActionRequest) -> AppResult<Value>;
}

/// Per-area dispatcher: authenticate, read the tag, authorize, parse, handle.
pub struct ActionRouter<H> {
    identity: IdentityResolver,
    authorization: AuthorizationService,
    handler: H,
}

impl<H: ActionHandler> ActionRouter<H> {
    /// Creates a router for one area handler.
    #[must_use]
    pub fn new(identity: IdentityResolver, authorization: AuthorizationService, handler: H) -> Self {
        Self {
            identity,
            authorization,
            handler,
        }
    }

    /// Returns the wrapped handler.
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    async fn route(&self, request: ActionRequest) -> AppResult<Value> {
        let principal = self
            .identity
            .authenticate(request.bearer_token.as_deref())
            .await?;

        let tag = parse_tag(&request.body)?;
        let Some(policy) = H::Action::policy(tag.as_str()) else {
            return Err(AppError::Validation("unknown action".to_owned()));
        };

        let assignment = self
            .authorization
            .require_role(principal.id(), policy.min_role)
            .await
            .inspect_err(|error| {
                if matches!(error, AppError::Forbidden(_)) {
                    tracing::warn!(
                        area = H::AREA,
                        action = policy.name,
                        actor = %principal.id(),
                        reason = %error,
                        "admin action denied"
                    );
                }
            })?;

        tracing::info!(
            area = H::AREA,
            action = policy.name,
            actor = %principal.id(),
            role = assignment.role.as_str(),
            "dispatching admin action"
        );

        let action = parse_action::<H::Action>(&request.body)?;
        let context = ActionContext::new(principal, assignment, request.metadata, policy);
        self.handler
            .handle(&context, action)
            .await
            .inspect_err(|error| match error {
                AppError::Store(_) | AppError::Internal(_) => tracing::error!(
                    area = H::AREA,
                    action = policy.name,
                    error = %error,
                    "admin action failed"
                ),
                _ => tracing::warn!(
                    area = H::AREA,
                    action = policy.name,
                    error = %error,
                    "admin action rejected"
                ),
            })
    }
}

#[async_trait]
impl<H: ActionHandler> AdminEndpoint for ActionRouter<H> {
    fn area(&self) -> &'static str {
        H::AREA
    }

    async fn dispatch(&self, request: ActionRequest) -> AppResult<Value> {
        self.route(request).await
    }
}

#[derive(Deserialize)]
struct ActionTag {
    #[serde(default)]
    action: Option<String>,
}

fn parse_tag(body: &[u8]) -> AppResult<String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::Validation("request body is required".to_owned()));
    }

    let tag: ActionTag = serde_json::from_slice(body)
        .map_err(|error| AppError::Validation(format!("invalid request body: {error}")))?;
    Ok(tag.action.unwrap_or_default())
}

fn parse_action<A: AdminAction>(body: &[u8]) -> AppResult<A> {
    serde_json::from_slice(body)
        .map_err(|error| AppError::Validation(format!("invalid request body: {error}")))
}

/// Clamps an optional `limit` into `1..=max`, applying `default` when absent.
#[must_use]
pub fn bounded_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

/// Payload returned by mutations without a richer result.
#[must_use]
pub fn ok_payload() -> Value {
    serde_json::json!({ "ok": true })
}
