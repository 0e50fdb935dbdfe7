use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use agora_core::{AppError, AppResult, NonEmptyString};
use agora_domain::{AdminRole, AuditAction, TargetType};

use crate::{
    ActionContext, ActionHandler, ActionPolicy, AdminAction, AuditRecord, AuditRecorder, NewPlan,
    PlanPatch, PlanRepository, ok_payload,
};

/// Plan fields submitted by `create`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanInput {
    /// Unique plan code.
    #[serde(default)]
    pub code: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Usage limits object.
    #[serde(default)]
    pub limits: Option<Map<String, Value>>,
    /// Feature flags object.
    #[serde(default)]
    pub features: Option<Map<String, Value>>,
    /// Whether the plan is offered.
    #[serde(default)]
    pub is_active: bool,
}

/// Subscription plan actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum PlanAction {
    /// List plans.
    List,
    /// Insert a plan.
    Create {
        /// Plan fields.
        plan: PlanInput,
    },
    /// Patch a plan.
    Update {
        /// Plan code.
        code: String,
        /// Fields to change.
        patch: PlanPatch,
    },
    /// Delete a plan.
    Delete {
        /// Plan code.
        code: String,
    },
    /// Unrecognized tag.
    #[serde(other)]
    Unknown,
}

const PLAN_POLICIES: &[ActionPolicy] = &[
    ActionPolicy::new("list", AdminRole::SuperAdmin, TargetType::Plan),
    ActionPolicy::new("create", AdminRole::SuperAdmin, TargetType::Plan),
    ActionPolicy::new("update", AdminRole::SuperAdmin, TargetType::Plan),
    ActionPolicy::new("delete", AdminRole::SuperAdmin, TargetType::Plan),
];

impl AdminAction for PlanAction {
    fn policy(tag: &str) -> Option<ActionPolicy> {
        PLAN_POLICIES.iter().find(|policy| policy.name == tag).copied()
    }
}

fn plan_code(code: String) -> AppResult<NonEmptyString> {
    NonEmptyString::required("plan code", code)
}

fn normalize_patch(patch: PlanPatch) -> AppResult<PlanPatch> {
    let name = patch
        .name
        .map(|name| NonEmptyString::required("plan name", name).map(String::from))
        .transpose()?;
    let description = patch
        .description
        .map(|description| description.trim().to_owned());

    let patch = PlanPatch {
        name,
        description,
        ..patch
    };
    if patch.is_empty() {
        return Err(AppError::Validation("patch is required".to_owned()));
    }

    Ok(patch)
}

/// Application service for subscription plans.
#[derive(Clone)]
pub struct PlanAdminService {
    plans: Arc<dyn PlanRepository>,
    audit: AuditRecorder,
}

impl PlanAdminService {
    /// Creates the service.
    #[must_use]
    pub fn new(plans: Arc<dyn PlanRepository>, audit: AuditRecorder) -> Self {
        Self { plans, audit }
    }

    async fn create(&self, context: &ActionContext, input: PlanInput) -> AppResult<Value> {
        let plan = NewPlan {
            code: plan_code(input.code)?,
            name: NonEmptyString::required("plan name", input.name)?,
            description: input
                .description
                .map(|description| description.trim().to_owned())
                .filter(|description| !description.is_empty()),
            limits: Value::Object(input.limits.unwrap_or_default()),
            features: Value::Object(input.features.unwrap_or_default()),
            is_active: input.is_active,
        };
        let after = serde_json::to_value(&plan)
            .map_err(|error| AppError::Internal(format!("failed to encode plan: {error}")))?;
        let code = plan.code.clone();

        self.plans.create_plan(plan).await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::CreatePlan, TargetType::Plan)
                    .target_id(code)
                    .after(after),
            )
            .await?;

        Ok(ok_payload())
    }

    async fn update(
        &self,
        context: &ActionContext,
        code: String,
        patch: PlanPatch,
    ) -> AppResult<Value> {
        let code = plan_code(code)?;
        let patch = normalize_patch(patch)?;
        let after = serde_json::to_value(&patch)
            .map_err(|error| AppError::Internal(format!("failed to encode patch: {error}")))?;

        let before = self.plans.snapshot_plan(code.as_str()).await?;
        self.plans.update_plan(code.as_str(), &patch).await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::UpdatePlan, TargetType::Plan)
                    .target_id(code)
                    .before(before)
                    .after(after),
            )
            .await?;

        Ok(ok_payload())
    }

    async fn delete(&self, context: &ActionContext, code: String) -> AppResult<Value> {
        let code = plan_code(code)?;

        let before = self.plans.snapshot_plan(code.as_str()).await?;
        self.plans.delete_plan(code.as_str()).await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::DeletePlan, TargetType::Plan)
                    .target_id(code)
                    .before(before),
            )
            .await?;

        Ok(ok_payload())
    }
}

#[async_trait]
impl ActionHandler for PlanAdminService {
    const AREA: &'static str = "plans";
    type Action = PlanAction;

    async fn handle(&self, context: &ActionContext, action: PlanAction) -> AppResult<Value> {
        match action {
            PlanAction::List => Ok(Value::from(self.plans.list_plans().await?)),
            PlanAction::Create { plan } => self.create(context, plan).await,
            PlanAction::Update { code, patch } => self.update(context, code, patch).await,
            PlanAction::Delete { code } => self.delete(context, code).await,
            PlanAction::Unknown => Err(AppError::Validation("unknown action".to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::Mutex;

    use agora_core::{AppError, AppResult};
    use agora_domain::AdminRole;

    use super::{PlanAction, PlanAdminService, PlanInput};
    use crate::test_support::{RecordingAuditRepository, context_for};
    use crate::{ActionHandler, AuditRecorder, NewPlan, PlanPatch, PlanRepository};

    #[derive(Default)]
    struct FakePlanRepository {
        plans: Mutex<BTreeMap<String, Value>>,
    }

    #[async_trait]
    impl PlanRepository for FakePlanRepository {
        async fn list_plans(&self) -> AppResult<Vec<Value>> {
            Ok(self.plans.lock().await.values().cloned().collect())
        }

        async fn snapshot_plan(&self, code: &str) -> AppResult<Option<Value>> {
            Ok(self.plans.lock().await.get(code).cloned())
        }

        async fn create_plan(&self, plan: NewPlan) -> AppResult<()> {
            let mut plans = self.plans.lock().await;
            if plans.contains_key(plan.code.as_str()) {
                return Err(AppError::Store("duplicate key value violates unique constraint".to_owned()));
            }
            plans.insert(plan.code.to_string(), json!({ "code": plan.code, "name": plan.name }));
            Ok(())
        }

        async fn update_plan(&self, code: &str, _patch: &PlanPatch) -> AppResult<()> {
            if self.plans.lock().await.contains_key(code) {
                return Ok(());
            }
            Err(AppError::NotFound(format!("plan '{code}' not found")))
        }

        async fn delete_plan(&self, code: &str) -> AppResult<()> {
            self.plans
                .lock()
                .await
                .remove(code)
                .map(|_| ())
                .ok_or_else(|| AppError::NotFound(format!("plan '{code}' not found")))
        }
    }

    fn service() -> (PlanAdminService, Arc<FakePlanRepository>, Arc<RecordingAuditRepository>) {
        let plans = Arc::new(FakePlanRepository::default());
        let audit = Arc::new(RecordingAuditRepository::default());
        (
            PlanAdminService::new(plans.clone(), AuditRecorder::new(audit.clone())),
            plans,
            audit,
        )
    }

    fn create(code: &str, name: &str) -> PlanAction {
        PlanAction::Create {
            plan: PlanInput {
                code: code.to_owned(),
                name: name.to_owned(),
                ..PlanInput::default()
            },
        }
    }

    #[tokio::test]
    async fn create_trims_code_and_audits() {
        let (service, plans, audit) = service();
        let context = context_for(AdminRole::SuperAdmin);

        let result = service.handle(&context, create("  pro ", "Pro")).await;
        assert!(result.is_ok());
        assert!(plans.plans.lock().await.contains_key("pro"));
        assert_eq!(audit.actions().await, vec!["create-plan"]);
    }

    #[tokio::test]
    async fn create_requires_code_and_name() {
        let (service, _plans, audit) = service();
        let context = context_for(AdminRole::SuperAdmin);

        assert!(matches!(
            service.handle(&context, create(" ", "Pro")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.handle(&context, create("pro", "")).await,
            Err(AppError::Validation(_))
        ));
        assert!(audit.events.lock().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_code_surfaces_store_error_without_audit() {
        let (service, _plans, audit) = service();
        let context = context_for(AdminRole::SuperAdmin);

        assert!(service.handle(&context, create("pro", "Pro")).await.is_ok());
        let result = service.handle(&context, create("pro", "Pro again")).await;
        assert!(matches!(result, Err(AppError::Store(_))));
        assert_eq!(audit.actions().await, vec!["create-plan"]);
    }

    #[tokio::test]
    async fn delete_captures_before_state() {
        let (service, _plans, audit) = service();
        let context = context_for(AdminRole::SuperAdmin);
        assert!(service.handle(&context, create("pro", "Pro")).await.is_ok());

        let result = service
            .handle(&context, PlanAction::Delete { code: "pro".to_owned() })
            .await;
        assert!(result.is_ok());

        let events = audit.events.lock().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].action, "delete-plan");
        assert!(events[1].before_json.is_some());
        assert_eq!(events[1].after_json, None);
    }

    #[tokio::test]
    async fn empty_patch_is_rejected() {
        let (service, _plans, _audit) = service();

        let result = service
            .handle(
                &context_for(AdminRole::SuperAdmin),
                PlanAction::Update {
                    code: "pro".to_owned(),
                    patch: PlanPatch::default(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
