use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use agora_core::{AppError, AppResult, NonEmptyString};
use agora_domain::{
    AdminRole, AuditAction, ReportActionTaken, ReportStatus, TargetType,
};

use crate::{
    ActionContext, ActionHandler, ActionPolicy, AdminAction, AuditRecord, AuditRecorder,
    ReportRepository, ReportReview, bounded_limit, ok_payload,
};

/// User report actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ReportAction {
    /// List reports.
    List {
        /// Status filter, `all` or absent for every status.
        #[serde(default)]
        status: Option<String>,
        /// Row limit, default 100.
        #[serde(default)]
        limit: Option<i64>,
    },
    /// Move one report to a new status.
    UpdateStatus {
        /// Report id.
        #[serde(default)]
        report_id: String,
        /// New status.
        status: ReportStatus,
        /// Reviewer notes.
        #[serde(default)]
        resolution_notes: Option<String>,
        /// Outcome.
        #[serde(default)]
        action_taken: Option<ReportActionTaken>,
    },
    /// Dismiss several reports one by one.
    DismissMany {
        /// Report ids, processed in order.
        #[serde(default)]
        report_ids: Vec<String>,
    },
    /// Unrecognized tag.
    #[serde(other)]
    Unknown,
}

const REPORT_POLICIES: &[ActionPolicy] = &[
    ActionPolicy::new("list", AdminRole::Moderator, TargetType::Report),
    ActionPolicy::new("update-status", AdminRole::Moderator, TargetType::Report),
    ActionPolicy::new("dismiss-many", AdminRole::Moderator, TargetType::Report),
];

impl AdminAction for ReportAction {
    fn policy(tag: &str) -> Option<ActionPolicy> {
        REPORT_POLICIES.iter().find(|policy| policy.name == tag).copied()
    }
}

fn status_filter(status: Option<String>) -> AppResult<Option<ReportStatus>> {
    match status.as_deref().map(str::trim) {
        None | Some("" | "all") => Ok(None),
        Some(status) => ReportStatus::from_str(status).map(Some),
    }
}

/// Application service for user reports.
#[derive(Clone)]
pub struct ReportAdminService {
    reports: Arc<dyn ReportRepository>,
    audit: AuditRecorder,
}

impl ReportAdminService {
    /// Creates the service.
    #[must_use]
    pub fn new(reports: Arc<dyn ReportRepository>, audit: AuditRecorder) -> Self {
        Self { reports, audit }
    }

    async fn review(
        &self,
        context: &ActionContext,
        report_id: &NonEmptyString,
        status: ReportStatus,
        resolution_notes: Option<String>,
        action_taken: Option<ReportActionTaken>,
    ) -> AppResult<()> {
        let review = ReportReview {
            status,
            reviewed_by: context.actor_id(),
            reviewed_at: Utc::now(),
            resolution_notes: resolution_notes
                .map(|notes| notes.trim().to_owned())
                .filter(|notes| !notes.is_empty()),
            action_taken,
        };
        let after = serde_json::to_value(&review)
            .map_err(|error| AppError::Internal(format!("failed to encode review: {error}")))?;

        let before = self.reports.snapshot_report(report_id.as_str()).await?;
        self.reports
            .review_report(report_id.as_str(), review)
            .await?;
        self.audit
            .record(
                context,
                AuditRecord::new(AuditAction::ReportStatusChanged(status), TargetType::Report)
                    .target_id(report_id.as_str())
                    .before(before)
                    .after(after),
            )
            .await
    }

    async fn dismiss_many(
        &self,
        context: &ActionContext,
        report_ids: Vec<String>,
    ) -> AppResult<Value> {
        let report_ids = report_ids
            .into_iter()
            .map(|report_id| NonEmptyString::required("reportIds", report_id))
            .collect::<AppResult<Vec<_>>>()?;
        if report_ids.is_empty() {
            return Err(AppError::Validation("reportIds is required".to_owned()));
        }

        for report_id in &report_ids {
            self.review(
                context,
                report_id,
                ReportStatus::Dismissed,
                None,
                Some(ReportActionTaken::None),
            )
            .await?;
        }

        Ok(json!({ "ok": true, "dismissed": report_ids.len() }))
    }
}

#[async_trait]
impl ActionHandler for ReportAdminService {
    const AREA: &'static str = "reports";
    type Action = ReportAction;

    async fn handle(&self, context: &ActionContext, action: ReportAction) -> AppResult<Value> {
        match action {
            ReportAction::List { status, limit } => {
                let reports = self
                    .reports
                    .list_reports(status_filter(status)?, bounded_limit(limit, 100, 500))
                    .await?;
                Ok(Value::from(reports))
            }
            ReportAction::UpdateStatus {
                report_id,
                status,
                resolution_notes,
                action_taken,
            } => {
                let report_id = NonEmptyString::required("reportId", report_id)?;
                self.review(context, &report_id, status, resolution_notes, action_taken)
                    .await?;
                Ok(ok_payload())
            }
            ReportAction::DismissMany { report_ids } => {
                self.dismiss_many(context, report_ids).await
            }
            ReportAction::Unknown => Err(AppError::Validation("unknown action".to_owned())),
        }
    }
}
