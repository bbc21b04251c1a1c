//! Subscribers and their entitlement.
//!
//! The engine only needs a user's id, enrollment instant, timezone and plan.
//! Accounts, payment and authentication live elsewhere.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::TOTAL_WEEKS;
use crate::error::ValidationError;

/// Largest accepted UTC offset, in minutes (UTC+14 / UTC-14).
pub const MAX_TZ_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription plan. Decides how far into the syllabus a user can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    FreeTrial,
    BetaTrial,
    Monthly,
    Era,
    Full,
}

impl Plan {
    /// Highest week this plan may see.
    pub fn max_visible_week(self) -> u32 {
        match self {
            Plan::FreeTrial => 1,
            Plan::BetaTrial => 4,
            Plan::Monthly | Plan::Era | Plan::Full => TOTAL_WEEKS,
        }
    }

    pub fn allows_week(self, week: u32) -> bool {
        week >= 1 && week <= self.max_visible_week()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::FreeTrial => "free_trial",
            Plan::BetaTrial => "beta_trial",
            Plan::Monthly => "monthly",
            Plan::Era => "era",
            Plan::Full => "full",
        }
    }
}

impl std::str::FromStr for Plan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free_trial" => Ok(Plan::FreeTrial),
            "beta_trial" => Ok(Plan::BetaTrial),
            "monthly" => Ok(Plan::Monthly),
            "era" => Ok(Plan::Era),
            "full" => Ok(Plan::Full),
            other => Err(ValidationError::InvalidValue {
                field: "plan".into(),
                message: format!("unknown plan '{other}'"),
            }),
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub enrolled_at: DateTime<Utc>,
    /// Fixed offset from UTC, in minutes east.
    #[serde(default)]
    pub tz_offset_minutes: i32,
    #[serde(default)]
    pub plan: Plan,
}

impl User {
    pub fn new(id: UserId, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            id,
            enrolled_at,
            tz_offset_minutes: 0,
            plan: Plan::default(),
        }
    }

    pub fn with_tz_offset(mut self, minutes: i32) -> Self {
        self.tz_offset_minutes = minutes;
        self
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = plan;
        self
    }

    /// The user's local offset.
    ///
    /// # Errors
    /// Returns a validation error when the stored offset is outside +/-14h.
    pub fn timezone(&self) -> Result<FixedOffset, ValidationError> {
        if self.tz_offset_minutes.abs() > MAX_TZ_OFFSET_MINUTES {
            return Err(invalid_offset(self.tz_offset_minutes));
        }
        FixedOffset::east_opt(self.tz_offset_minutes * 60)
            .ok_or_else(|| invalid_offset(self.tz_offset_minutes))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.timezone().map(|_| ())
    }
}

fn invalid_offset(minutes: i32) -> ValidationError {
    ValidationError::InvalidValue {
        field: "tz_offset_minutes".into(),
        message: format!("{minutes} is outside +/-{MAX_TZ_OFFSET_MINUTES}"),
    }
}
