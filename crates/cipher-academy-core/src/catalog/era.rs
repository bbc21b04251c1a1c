use serde::{Deserialize, Serialize};

/// A contiguous block of weeks sharing a historical theme and difficulty band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Era {
    pub id: String,
    pub title: String,
    pub ordinal: u32,
    /// First week of the era (inclusive).
    pub first_week: u32,
    /// Last week of the era (inclusive).
    pub last_week: u32,
    pub min_difficulty: u8,
    pub max_difficulty: u8,
    #[serde(default)]
    pub timespan: String,
    #[serde(default)]
    pub description: String,
}

impl Era {
    pub fn contains_week(&self, week: u32) -> bool {
        (self.first_week..=self.last_week).contains(&week)
    }

    pub fn contains_difficulty(&self, level: u8) -> bool {
        (self.min_difficulty..=self.max_difficulty).contains(&level)
    }

    /// Difficulty for a week, interpolated linearly across the era's band.
    pub fn difficulty_for_week(&self, week: u32) -> u8 {
        let span = self.last_week.saturating_sub(self.first_week);
        if span == 0 {
            return self.min_difficulty;
        }
        let pos = week.clamp(self.first_week, self.last_week) - self.first_week;
        let band = (self.max_difficulty - self.min_difficulty) as u32;
        // Round to nearest.
        let step = (band * pos * 2 + span) / (span * 2);
        self.min_difficulty + step as u8
    }
}
