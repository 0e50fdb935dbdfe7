//! Expiry choices offered to moderators, resolved to absolute timestamps.

use agora_core::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Length of one day preset in seconds.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Maximum custom verification window in days.
pub const MAX_VERIFICATION_DAYS: i64 = 3_650;

/// Maximum custom boost window in days.
pub const MAX_BOOST_DAYS: i64 = 365;

fn days_from(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::seconds(days * SECONDS_PER_DAY)
}

fn custom_days(now: DateTime<Utc>, days: i64, max_days: i64) -> AppResult<DateTime<Utc>> {
    if !(1..=max_days).contains(&days) {
        return Err(AppError::Validation(format!(
            "days must be between 1 and {max_days}"
        )));
    }

    Ok(days_from(now, days))
}

/// Ban or lock length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BanDuration {
    /// Never expires.
    #[serde(rename = "permanent")]
    Permanent,
    /// Seven days.
    #[serde(rename = "7d", alias = "7")]
    Days7,
    /// Thirty days.
    #[serde(rename = "30d", alias = "30")]
    Days30,
    /// Ninety days.
    #[serde(rename = "90d", alias = "90")]
    Days90,
}

impl BanDuration {
    /// Returns the preset length in days, or `None` when permanent.
    #[must_use]
    pub fn days(self) -> Option<i64> {
        match self {
            Self::Permanent => None,
            Self::Days7 => Some(7),
            Self::Days30 => Some(30),
            Self::Days90 => Some(90),
        }
    }

    /// Resolves the lock expiry relative to `now`.
    #[must_use]
    pub fn expires_at(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.days().map(|days| days_from(now, days))
    }
}

/// Verification preset lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationPreset {
    /// Thirty days.
    #[serde(rename = "30d")]
    Days30,
    /// Ninety days.
    #[serde(rename = "90d")]
    Days90,
    /// One year (365 days).
    #[serde(rename = "1y")]
    Year,
}

impl VerificationPreset {
    fn days(self) -> i64 {
        match self {
            Self::Days30 => 30,
            Self::Days90 => 90,
            Self::Year => 365,
        }
    }
}

/// Verification badge lifetime. Exactly one choice is active per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VerificationDuration {
    /// Badge never expires.
    Permanent,
    /// Preset window.
    Preset {
        /// Selected preset.
        preset: VerificationPreset,
    },
    /// Explicit day count in `1..=3650`.
    CustomDays {
        /// Number of days.
        days: i64,
    },
    /// Explicit end date and time.
    CustomDate {
        /// Expiry instant.
        #[serde(rename = "endsAt")]
        ends_at: DateTime<Utc>,
    },
}

impl VerificationDuration {
    /// Resolves the badge expiry relative to `now`.
    pub fn expires_at(self, now: DateTime<Utc>) -> AppResult<Option<DateTime<Utc>>> {
        match self {
            Self::Permanent => Ok(None),
            Self::Preset { preset } => Ok(Some(days_from(now, preset.days()))),
            Self::CustomDays { days } => custom_days(now, days, MAX_VERIFICATION_DAYS).map(Some),
            Self::CustomDate { ends_at } => Ok(Some(ends_at)),
        }
    }
}

/// Boost preset lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoostPreset {
    /// Seven days.
    #[serde(rename = "7d")]
    Days7,
    /// Thirty days.
    #[serde(rename = "30d")]
    Days30,
    /// Ninety days.
    #[serde(rename = "90d")]
    Days90,
}

impl BoostPreset {
    fn days(self) -> i64 {
        match self {
            Self::Days7 => 7,
            Self::Days30 => 30,
            Self::Days90 => 90,
        }
    }
}

/// Reach boost lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BoostDuration {
    /// Boost never expires.
    Permanent,
    /// Preset window.
    Preset {
        /// Selected preset.
        preset: BoostPreset,
    },
    /// Explicit day count in `1..=365`.
    CustomDays {
        /// Number of days.
        days: i64,
    },
    /// Explicit end date and time.
    CustomDate {
        /// Expiry instant.
        #[serde(rename = "endsAt")]
        ends_at: DateTime<Utc>,
    },
}

impl BoostDuration {
    /// Resolves the boost expiry relative to `now`.
    pub fn expires_at(self, now: DateTime<Utc>) -> AppResult<Option<DateTime<Utc>>> {
        match self {
            Self::Permanent => Ok(None),
            Self::Preset { preset } => Ok(Some(days_from(now, preset.days()))),
            Self::CustomDays { days } => custom_days(now, days, MAX_BOOST_DAYS).map(Some),
            Self::CustomDate { ends_at } => Ok(Some(ends_at)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use super::{
        BanDuration, BoostDuration, SECONDS_PER_DAY, VerificationDuration, VerificationPreset,
    };

    #[test]
    fn permanent_ban_has_no_expiry() {
        assert_eq!(BanDuration::Permanent.expires_at(Utc::now()), None);
    }

    #[test]
    fn thirty_day_ban_expires_thirty_days_of_seconds_later() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single();
        let Some(now) = now else {
            panic!("fixture timestamp should be valid");
        };
        let expires_at = BanDuration::Days30.expires_at(now);
        assert_eq!(
            expires_at,
            Some(now + Duration::seconds(30 * SECONDS_PER_DAY))
        );
    }

    #[test]
    fn ban_duration_parses_preset_labels() {
        let parsed: Result<BanDuration, _> = serde_json::from_str("\"30d\"");
        assert!(matches!(parsed, Ok(BanDuration::Days30)));
        let parsed: Result<BanDuration, _> = serde_json::from_str("\"14d\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn verification_preset_year_is_365_days() {
        let now = Utc::now();
        let expires_at = VerificationDuration::Preset {
            preset: VerificationPreset::Year,
        }
        .expires_at(now);
        assert!(matches!(expires_at, Ok(Some(value)) if value == now + Duration::days(365)));
    }

    #[test]
    fn verification_preset_requires_a_choice() {
        let parsed: Result<VerificationDuration, _> =
            serde_json::from_value(serde_json::json!({ "type": "preset" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn custom_date_is_used_verbatim() {
        let ends_at = Utc::now() + Duration::days(3);
        let parsed: Result<VerificationDuration, _> = serde_json::from_value(
            serde_json::json!({ "type": "custom-date", "endsAt": ends_at }),
        );
        let Ok(duration) = parsed else {
            panic!("custom-date payload should parse");
        };
        assert!(matches!(duration.expires_at(Utc::now()), Ok(Some(value)) if value == ends_at));
    }

    proptest! {
        #[test]
        fn verification_custom_days_accepts_only_1_to_3650(days in -50_i64..4_000) {
            let result = VerificationDuration::CustomDays { days }.expires_at(Utc::now());
            prop_assert_eq!(result.is_ok(), (1..=3650).contains(&days));
        }

        #[test]
        fn boost_custom_days_accepts_only_1_to_365(days in -50_i64..1_000) {
            let result = BoostDuration::CustomDays { days }.expires_at(Utc::now());
            prop_assert_eq!(result.is_ok(), (1..=365).contains(&days));
        }
    }
}
