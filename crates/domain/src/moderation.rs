//! Moderation rules: boost ranges, removal policy and report lifecycle.

use std::str::FromStr;

use agora_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Settings key holding the post moderation policy.
pub const MODERATION_POSTS_SETTING_KEY: &str = "moderation.posts";

/// Settings key holding the trending ranking weights.
pub const TRENDING_SETTING_KEY: &str = "moderation.trending";

/// Reason recorded when the policy allows removal without one.
pub const DEFAULT_REMOVAL_REASON: &str = "Removed by admin";

/// Reach multiplier applied to a member, in `[1, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BoostMultiplier(f64);

impl BoostMultiplier {
    /// Smallest accepted value.
    pub const MIN: f64 = 1.0;
    /// Largest accepted value.
    pub const MAX: f64 = 5.0;

    /// Validates a user boost multiplier.
    pub fn new(value: f64) -> AppResult<Self> {
        if !value.is_finite() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(AppError::Validation(
                "multiplier must be between 1 and 5".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the multiplier value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

/// Trending override multiplier for a post, in `(0, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TrendingMultiplier(f64);

impl TrendingMultiplier {
    /// Largest accepted value.
    pub const MAX: f64 = 10.0;

    /// Validates a post trending multiplier.
    pub fn new(value: f64) -> AppResult<Self> {
        if !value.is_finite() || value <= 0.0 || value > Self::MAX {
            return Err(AppError::Validation(
                "multiplier must be > 0 and <= 10".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the multiplier value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

/// Post moderation policy stored under [`MODERATION_POSTS_SETTING_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModerationPostSettings {
    /// Whether removals must carry a reason.
    pub require_removal_reason: bool,
    /// Whether removed posts may be restored.
    pub allow_restore_post: bool,
    /// Reasons offered to moderators.
    pub default_removal_reasons: Vec<String>,
}

impl Default for ModerationPostSettings {
    fn default() -> Self {
        Self {
            require_removal_reason: true,
            allow_restore_post: true,
            default_removal_reasons: [
                "Spam",
                "Harassment / Hate",
                "Nudity / Sexual content",
                "Violence / Threats",
                "Impersonation",
                "Copyright / IP",
                "Other (see note)",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}

impl ModerationPostSettings {
    /// Builds the policy from a stored settings value.
    ///
    /// Missing keys and values of the wrong type fall back to defaults, so a
    /// partially written setting never disables the reason requirement by accident.
    #[must_use]
    pub fn from_setting_value(value: Option<&Value>) -> Self {
        let defaults = Self::default();
        let Some(object) = value.and_then(Value::as_object) else {
            return defaults;
        };

        let default_removal_reasons = object
            .get("default_removal_reasons")
            .and_then(Value::as_array)
            .map(|reasons| {
                reasons
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .filter(|reasons| !reasons.is_empty())
            .unwrap_or(defaults.default_removal_reasons);

        Self {
            require_removal_reason: object
                .get("require_removal_reason")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.require_removal_reason),
            allow_restore_post: object
                .get("allow_restore_post")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.allow_restore_post),
            default_removal_reasons,
        }
    }

    /// Applies the reason policy to a submitted removal reason.
    pub fn resolve_removal_reason(&self, reason: Option<&str>) -> AppResult<NonEmptyString> {
        match reason.map(NonEmptyString::new) {
            Some(Ok(reason)) => Ok(reason),
            _ if self.require_removal_reason => {
                Err(AppError::Validation("reason is required".to_owned()))
            }
            _ => NonEmptyString::new(DEFAULT_REMOVAL_REASON),
        }
    }
}

/// Ranking weights for the trending view, stored under [`TRENDING_SETTING_KEY`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendingWeights {
    /// Score per like.
    pub like_weight: f64,
    /// Score per repost.
    pub repost_weight: f64,
    /// Score per reply.
    pub reply_weight: f64,
    /// Score per bookmark.
    pub bookmark_weight: f64,
    /// Exponential decay constant in hours, at least 1.
    pub time_decay_hours: f64,
    /// Interactions a post needs before it can rank.
    pub min_interactions: f64,
    /// Newest public posts considered, in `50..=2000`.
    pub max_candidates: i64,
}

impl Default for TrendingWeights {
    fn default() -> Self {
        Self {
            like_weight: 1.0,
            repost_weight: 2.0,
            reply_weight: 1.5,
            bookmark_weight: 0.5,
            time_decay_hours: 24.0,
            min_interactions: 5.0,
            max_candidates: 500,
        }
    }
}

impl TrendingWeights {
    /// Builds weights from a stored settings value, clamping out-of-range numbers.
    #[must_use]
    pub fn from_setting_value(value: Option<&Value>) -> Self {
        let defaults = Self::default();
        let Some(object) = value.and_then(Value::as_object) else {
            return defaults;
        };
        let number = |key: &str, fallback: f64| {
            object
                .get(key)
                .and_then(Value::as_f64)
                .filter(|value| value.is_finite())
                .unwrap_or(fallback)
        };

        Self {
            like_weight: number("like_weight", defaults.like_weight),
            repost_weight: number("repost_weight", defaults.repost_weight),
            reply_weight: number("reply_weight", defaults.reply_weight),
            bookmark_weight: number("bookmark_weight", defaults.bookmark_weight),
            time_decay_hours: number("time_decay_hours", defaults.time_decay_hours).max(1.0),
            min_interactions: number("min_interactions", defaults.min_interactions).max(0.0),
            max_candidates: number("max_candidates", defaults.max_candidates as f64)
                .clamp(50.0, 2_000.0) as i64,
        }
    }

    /// Scores one post from its counters, override multiplier and age.
    #[must_use]
    pub fn score(&self, counters: [f64; 4], multiplier: Option<f64>, age_hours: f64) -> f64 {
        let [likes, reposts, replies, bookmarks] = counters;
        let base = likes * self.like_weight
            + reposts * self.repost_weight
            + replies * self.reply_weight
            + bookmarks * self.bookmark_weight;
        let multiplier = multiplier.unwrap_or(1.0).max(0.01);
        let decay = (-age_hours.max(0.0) / self.time_decay_hours).exp();

        base * multiplier * decay
    }
}

/// Review state of a user report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Awaiting review.
    Pending,
    /// Reviewed without further action.
    Reviewed,
    /// Dismissed as unfounded.
    Dismissed,
    /// Acted upon.
    Actioned,
}

impl ReportStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Dismissed => "dismissed",
            Self::Actioned => "actioned",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            "dismissed" => Ok(Self::Dismissed),
            "actioned" => Ok(Self::Actioned),
            _ => Err(AppError::Validation(format!(
                "unknown report status '{value}'"
            ))),
        }
    }
}

/// Outcome recorded on a reviewed report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportActionTaken {
    /// No action.
    None,
    /// Reported content removed.
    ContentRemoved,
    /// Author warned.
    WarningIssued,
    /// Author banned.
    UserBanned,
}

impl ReportActionTaken {
    /// Returns a stable storage value for this outcome.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ContentRemoved => "content_removed",
            Self::WarningIssued => "warning_issued",
            Self::UserBanned => "user_banned",
        }
    }
}
