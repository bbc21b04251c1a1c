//! Release clock: when each slot becomes time-eligible for a user.
//!
//! Week 1's opener is anchored to the first Sunday 08:00 (user's local time)
//! at or after enrollment. Every other slot is a fixed offset from that
//! anchor: Wednesday 18:00 and Friday 15:00 of the same week, with weeks
//! advancing by seven days. Nothing here reads the wall clock; `now` is
//! always passed in.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

use crate::catalog::{SlotKey, SlotKind, TOTAL_WEEKS};
use crate::error::ValidationError;
use crate::user::User;

/// Offset of a slot from its week's Sunday 08:00.
fn slot_offset(kind: SlotKind) -> Duration {
    let (hour, minute) = kind.release_time();
    let (open_hour, open_minute) = SlotKind::Opener.release_time();
    Duration::days(kind.weekday().num_days_from_sunday() as i64)
        + Duration::hours(hour as i64 - open_hour as i64)
        + Duration::minutes(minute as i64 - open_minute as i64)
}

/// First Sunday 08:00 local at or after `enrolled_at`.
fn anchor_for(enrolled_at: DateTime<Utc>, tz: FixedOffset) -> Result<DateTime<Utc>, ValidationError> {
    let local = enrolled_at.with_timezone(&tz);
    let days_until_sunday = (7 - local.weekday().num_days_from_sunday()) % 7;
    let (hour, minute) = SlotKind::Opener.release_time();
    let open = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| ValidationError::InvalidValue {
        field: "release_time".into(),
        message: format!("{hour:02}:{minute:02}"),
    })?;
    let sunday = local.date_naive() + Duration::days(days_until_sunday as i64);
    let candidate = tz
        .from_local_datetime(&sunday.and_time(open))
        .single()
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "enrolled_at".into(),
            message: format!("no local Sunday opening after {enrolled_at}"),
        })?;
    let candidate = if candidate < local {
        candidate + Duration::days(7)
    } else {
        candidate
    };
    Ok(candidate.with_timezone(&Utc))
}

/// Per-user release schedule. Cheap to build; derived only from the user's
/// enrollment instant and timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseSchedule {
    anchor: DateTime<Utc>,
}

impl ReleaseSchedule {
    /// # Errors
    /// Fails when the user's timezone offset is invalid.
    pub fn for_user(user: &User) -> Result<Self, ValidationError> {
        let tz = user.timezone()?;
        Ok(Self {
            anchor: anchor_for(user.enrolled_at, tz)?,
        })
    }

    /// Week 1 opener release instant.
    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    pub fn release_instant(&self, key: SlotKey) -> DateTime<Utc> {
        self.anchor + Duration::days(7 * (key.week.max(1) as i64 - 1)) + slot_offset(key.kind)
    }

    pub fn is_eligible(&self, key: SlotKey, now: DateTime<Utc>) -> bool {
        now >= self.release_instant(key)
    }

    /// Highest week whose opener has released at `now` (0 before the anchor).
    pub fn latest_released_week(&self, now: DateTime<Utc>) -> u32 {
        if now < self.anchor {
            return 0;
        }
        let weeks = (now - self.anchor).num_days() / 7 + 1;
        (weeks as u32).min(TOTAL_WEEKS)
    }

    /// The first slot releasing strictly after `now`, if the syllabus has one.
    pub fn next_release(&self, now: DateTime<Utc>) -> Option<(SlotKey, DateTime<Utc>)> {
        let start = self.latest_released_week(now).max(1);
        (start..=TOTAL_WEEKS)
            .flat_map(|week| SlotKind::ALL.into_iter().map(move |kind| SlotKey::new(week, kind)))
            .map(|key| (key, self.release_instant(key)))
            .find(|(_, at)| *at > now)
    }

    /// Slots whose release instant falls in `(since, until]`, in order.
    pub fn releases_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Vec<(SlotKey, DateTime<Utc>)> {
        if until <= since {
            return Vec::new();
        }
        let first = self.latest_released_week(since).max(1);
        let last = self.latest_released_week(until);
        (first..=last)
            .flat_map(|week| SlotKind::ALL.into_iter().map(move |kind| SlotKey::new(week, kind)))
            .map(|key| (key, self.release_instant(key)))
            .filter(|(_, at)| *at > since && *at <= until)
            .collect()
    }
}

/// Release instant for one slot. See [`ReleaseSchedule`].
pub fn release_instant(user: &User, key: SlotKey) -> Result<DateTime<Utc>, ValidationError> {
    Ok(ReleaseSchedule::for_user(user)?.release_instant(key))
}

/// `now >= release_instant`. An invalid user timezone is never eligible.
pub fn is_eligible(user: &User, key: SlotKey, now: DateTime<Utc>) -> bool {
    ReleaseSchedule::for_user(user)
        .map(|s| s.is_eligible(key, now))
        .unwrap_or(false)
}
