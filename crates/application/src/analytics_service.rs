use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use agora_core::{AppError, AppResult};
use agora_domain::{AdminRole, TargetType};

use crate::{
    ActionContext, ActionHandler, ActionPolicy, AdminAction, AnalyticsRepository, bounded_limit,
};

/// Read-only platform analytics.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum AnalyticsAction {
    /// Headline counters.
    Stats,
    /// Highest-engagement posts.
    TopContent {
        /// Row limit, default 10.
        #[serde(default)]
        limit: Option<i64>,
    },
    /// Members with the most followers.
    TopUsers {
        /// Row limit, default 10.
        #[serde(default)]
        limit: Option<i64>,
    },
    /// Unrecognized tag.
    #[serde(other)]
    Unknown,
}

const ANALYTICS_POLICIES: &[ActionPolicy] = &[
    ActionPolicy::new("stats", AdminRole::Support, TargetType::System),
    ActionPolicy::new("top-content", AdminRole::Support, TargetType::System),
    ActionPolicy::new("top-users", AdminRole::Support, TargetType::System),
];

impl AdminAction for AnalyticsAction {
    fn policy(tag: &str) -> Option<ActionPolicy> {
        ANALYTICS_POLICIES.iter().find(|policy| policy.name == tag).copied()
    }
}

/// Analytics reads. Nothing here is audited.
#[derive(Clone)]
pub struct AnalyticsService {
    analytics: Arc<dyn AnalyticsRepository>,
}

impl AnalyticsService {
    /// Creates the service.
    #[must_use]
    pub fn new(analytics: Arc<dyn AnalyticsRepository>) -> Self {
        Self { analytics }
    }
}

#[async_trait]
impl ActionHandler for AnalyticsService {
    const AREA: &'static str = "analytics";
    type Action = AnalyticsAction;

    async fn handle(&self, _context: &ActionContext, action: AnalyticsAction) -> AppResult<Value> {
        match action {
            AnalyticsAction::Stats => {
                let stats = self.analytics.platform_stats().await?;
                serde_json::to_value(stats)
                    .map_err(|error| AppError::Internal(format!("failed to encode stats: {error}")))
            }
            AnalyticsAction::TopContent { limit } => Ok(Value::from(
                self.analytics
                    .top_content(bounded_limit(limit, 10, 100))
                    .await?,
            )),
            AnalyticsAction::TopUsers { limit } => Ok(Value::from(
                self.analytics
                    .top_users(bounded_limit(limit, 10, 100))
                    .await?,
            )),
            AnalyticsAction::Unknown => Err(AppError::Validation("unknown action".to_owned())),
        }
    }
}
