use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::cipher::CipherType;
use crate::error::CatalogError;

/// Number of weeks in the syllabus.
pub const TOTAL_WEEKS: u32 = 91;
/// Slots delivered each week.
pub const SLOTS_PER_WEEK: u32 = 3;
/// Total slots in the syllabus.
pub const TOTAL_SLOTS: u32 = TOTAL_WEEKS * SLOTS_PER_WEEK;

/// One of the three weekly delivery points.
///
/// Variant order is the day rank, so the derived `Ord` matches delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    /// Sunday 08:00
    Opener,
    /// Wednesday 18:00
    Midweek,
    /// Friday 15:00
    Closer,
}

impl SlotKind {
    pub const ALL: [SlotKind; 3] = [SlotKind::Opener, SlotKind::Midweek, SlotKind::Closer];

    /// Position within the week (0 = opener). Also the API's `puzzle_index`.
    pub fn day_rank(self) -> u32 {
        match self {
            SlotKind::Opener => 0,
            SlotKind::Midweek => 1,
            SlotKind::Closer => 2,
        }
    }

    pub fn from_index(index: u32) -> Result<Self, CatalogError> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(CatalogError::UnknownPuzzleIndex { index })
    }

    pub fn weekday(self) -> Weekday {
        match self {
            SlotKind::Opener => Weekday::Sun,
            SlotKind::Midweek => Weekday::Wed,
            SlotKind::Closer => Weekday::Fri,
        }
    }

    /// English day name, as the frontend renders it.
    pub fn day_name(self) -> &'static str {
        match self {
            SlotKind::Opener => "Sunday",
            SlotKind::Midweek => "Wednesday",
            SlotKind::Closer => "Friday",
        }
    }

    /// Local wall-clock release time as (hour, minute).
    pub fn release_time(self) -> (u32, u32) {
        match self {
            SlotKind::Opener => (8, 0),
            SlotKind::Midweek => (18, 0),
            SlotKind::Closer => (15, 0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SlotKind::Opener => "opener",
            SlotKind::Midweek => "midweek",
            SlotKind::Closer => "closer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "opener" | "sunday" | "sun" => Some(SlotKind::Opener),
            "midweek" | "wednesday" | "wed" => Some(SlotKind::Midweek),
            "closer" | "friday" | "fri" => Some(SlotKind::Closer),
            _ => None,
        }
    }
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natural key of a slot. Ordering is the global syllabus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub week: u32,
    pub kind: SlotKind,
}

impl SlotKey {
    pub fn new(week: u32, kind: SlotKind) -> Self {
        Self { week, kind }
    }

    /// 1-based position in global order (1..=273 for valid keys).
    pub fn ordinal(self) -> u32 {
        (self.week.saturating_sub(1)) * SLOTS_PER_WEEK + self.kind.day_rank() + 1
    }

    pub fn from_ordinal(ordinal: u32) -> Result<Self, CatalogError> {
        if ordinal == 0 || ordinal > TOTAL_SLOTS {
            return Err(CatalogError::UnknownOrdinal { ordinal });
        }
        let zero = ordinal - 1;
        let kind = SlotKind::from_index(zero % SLOTS_PER_WEEK)?;
        Ok(Self::new(zero / SLOTS_PER_WEEK + 1, kind))
    }

    /// The slot delivered just before this one, if any.
    pub fn previous(self) -> Option<Self> {
        Self::from_ordinal(self.ordinal().checked_sub(1)?).ok()
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}-{}", self.week, self.kind)
    }
}

/// Normalize an answer for comparison: trimmed and case-folded.
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Immutable puzzle content attached to a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    pub cipher_type: CipherType,
    pub title: String,
    /// Text shown to the solver, including the ciphertext.
    pub prompt: String,
    /// Stored normalized; see [`normalize_answer`].
    pub expected_answer: String,
    #[serde(default)]
    pub hint: String,
}

impl Puzzle {
    pub fn accepts(&self, raw_answer: &str) -> bool {
        normalize_answer(raw_answer) == self.expected_answer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub week: u32,
    pub kind: SlotKind,
    pub difficulty_level: u8,
    pub reward_points: u32,
    pub puzzle: Puzzle,
}

impl Slot {
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.week, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_order_by_day_rank() {
        assert!(SlotKind::Opener < SlotKind::Midweek);
        assert!(SlotKind::Midweek < SlotKind::Closer);
        assert_eq!(SlotKind::from_index(2).unwrap(), SlotKind::Closer);
        assert!(SlotKind::from_index(3).is_err());
    }

    #[test]
    fn ordinal_covers_syllabus() {
        assert_eq!(SlotKey::new(1, SlotKind::Opener).ordinal(), 1);
        assert_eq!(SlotKey::new(91, SlotKind::Closer).ordinal(), TOTAL_SLOTS);
        for ordinal in [1, 2, 3, 4, 150, 273] {
            assert_eq!(SlotKey::from_ordinal(ordinal).unwrap().ordinal(), ordinal);
        }
        assert!(SlotKey::from_ordinal(0).is_err());
        assert!(SlotKey::from_ordinal(274).is_err());
    }

    #[test]
    fn previous_crosses_week_boundary() {
        let key = SlotKey::new(2, SlotKind::Opener);
        assert_eq!(key.previous(), Some(SlotKey::new(1, SlotKind::Closer)));
        assert_eq!(SlotKey::new(1, SlotKind::Opener).previous(), None);
    }

    #[test]
    fn keys_sort_in_delivery_order() {
        let mut keys = vec![
            SlotKey::new(2, SlotKind::Opener),
            SlotKey::new(1, SlotKind::Closer),
            SlotKey::new(1, SlotKind::Opener),
        ];
        keys.sort();
        assert_eq!(keys[0], SlotKey::new(1, SlotKind::Opener));
        assert_eq!(keys[2], SlotKey::new(2, SlotKind::Opener));
    }

    #[test]
    fn answers_compare_trimmed_and_case_folded() {
        let puzzle = Puzzle {
            cipher_type: CipherType::Caesar,
            title: "t".into(),
            prompt: "p".into(),
            expected_answer: normalize_answer("Legion"),
            hint: String::new(),
        };
        assert!(puzzle.accepts("  legion\n"));
        assert!(puzzle.accepts("LEGION"));
        assert!(!puzzle.accepts("legions"));
        assert!(!puzzle.accepts("leg ion"));
    }
}
