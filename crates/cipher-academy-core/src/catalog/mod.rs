//! Curriculum catalog: eras, weeks and the three weekly slots.
//!
//! The catalog is loaded once (built-in syllabus or a TOML definition),
//! validated, and never mutated afterwards. Every lookup is by natural key
//! `(week, kind)` or by global ordinal.

pub mod cipher;
mod era;
mod slot;
mod syllabus;

pub use cipher::CipherType;
pub use era::Era;
pub use slot::{
    normalize_answer, Puzzle, Slot, SlotKey, SlotKind, SLOTS_PER_WEEK, TOTAL_SLOTS, TOTAL_WEEKS,
};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Serializable catalog definition (the TOML file format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDefinition {
    pub eras: Vec<Era>,
    pub slots: Vec<Slot>,
}

/// Validated, immutable curriculum.
#[derive(Debug, Clone)]
pub struct Catalog {
    eras: Vec<Era>,
    /// Indexed by `ordinal - 1`.
    slots: Vec<Slot>,
}

impl Catalog {
    /// The built-in five-era syllabus.
    pub fn builtin() -> Self {
        let eras = syllabus::builtin_eras();
        let slots = syllabus::builtin_slots(&eras);
        Self { eras, slots }
    }

    /// Validate a definition and build a catalog from it.
    ///
    /// # Errors
    /// Returns `CatalogError::Invalid` if eras do not partition weeks 1-91
    /// contiguously, if any week lacks exactly three slots, or if a slot's
    /// difficulty falls outside 1-20 or its era's band.
    pub fn from_definition(def: CatalogDefinition) -> Result<Self, CatalogError> {
        let CatalogDefinition { mut eras, mut slots } = def;
        eras.sort_by_key(|e| e.ordinal);
        validate_eras(&eras)?;

        for slot in &mut slots {
            slot.puzzle.expected_answer = normalize_answer(&slot.puzzle.expected_answer);
        }
        slots.sort_by_key(Slot::key);
        validate_slots(&eras, &slots)?;

        Ok(Self { eras, slots })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let def: CatalogDefinition =
            toml::from_str(content).map_err(|e| CatalogError::Invalid(e.to_string()))?;
        Self::from_definition(def)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Invalid(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn to_definition(&self) -> CatalogDefinition {
        CatalogDefinition {
            eras: self.eras.clone(),
            slots: self.slots.clone(),
        }
    }

    /// Eras ordered by ordinal.
    pub fn list_eras(&self) -> &[Era] {
        &self.eras
    }

    pub fn get_slot(&self, week: u32, kind: SlotKind) -> Result<&Slot, CatalogError> {
        if !(1..=TOTAL_WEEKS).contains(&week) {
            return Err(CatalogError::WeekOutOfRange { week });
        }
        let key = SlotKey::new(week, kind);
        self.slots
            .get((key.ordinal() - 1) as usize)
            .filter(|s| s.key() == key)
            .ok_or(CatalogError::UnknownSlot { week, kind })
    }

    pub fn slot(&self, key: SlotKey) -> Result<&Slot, CatalogError> {
        self.get_slot(key.week, key.kind)
    }

    pub fn slot_by_ordinal(&self, ordinal: u32) -> Result<&Slot, CatalogError> {
        self.slot(SlotKey::from_ordinal(ordinal)?)
    }

    /// The three slots of a week in day order.
    pub fn week(&self, week: u32) -> Result<[&Slot; 3], CatalogError> {
        Ok([
            self.get_slot(week, SlotKind::Opener)?,
            self.get_slot(week, SlotKind::Midweek)?,
            self.get_slot(week, SlotKind::Closer)?,
        ])
    }

    /// All slots in global order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn era_for_week(&self, week: u32) -> Result<&Era, CatalogError> {
        self.eras
            .iter()
            .find(|e| e.contains_week(week))
            .ok_or(CatalogError::WeekOutOfRange { week })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate_eras(eras: &[Era]) -> Result<(), CatalogError> {
    let mut next_week = 1;
    for (i, era) in eras.iter().enumerate() {
        if era.ordinal != i as u32 + 1 {
            return Err(CatalogError::Invalid(format!(
                "era '{}' has ordinal {}, expected {}",
                era.id,
                era.ordinal,
                i + 1
            )));
        }
        if era.first_week != next_week || era.last_week < era.first_week {
            return Err(CatalogError::Invalid(format!(
                "era '{}' covers weeks {}-{}, expected to start at week {next_week}",
                era.id, era.first_week, era.last_week
            )));
        }
        if era.min_difficulty < 1 || era.max_difficulty > 20 || era.min_difficulty > era.max_difficulty {
            return Err(CatalogError::Invalid(format!(
                "era '{}' has difficulty band {}-{}",
                era.id, era.min_difficulty, era.max_difficulty
            )));
        }
        next_week = era.last_week + 1;
    }
    if next_week != TOTAL_WEEKS + 1 {
        return Err(CatalogError::Invalid(format!(
            "eras end at week {}, expected {TOTAL_WEEKS}",
            next_week - 1
        )));
    }
    Ok(())
}

/// Expects `slots` sorted by key.
fn validate_slots(eras: &[Era], slots: &[Slot]) -> Result<(), CatalogError> {
    if slots.len() != TOTAL_SLOTS as usize {
        return Err(CatalogError::Invalid(format!(
            "expected {TOTAL_SLOTS} slots, found {}",
            slots.len()
        )));
    }
    for (i, slot) in slots.iter().enumerate() {
        let expected = SlotKey::from_ordinal(i as u32 + 1)?;
        if slot.key() != expected {
            return Err(CatalogError::Invalid(format!(
                "missing or duplicate slot near {expected} (found {})",
                slot.key()
            )));
        }
        let era = eras
            .iter()
            .find(|e| e.contains_week(slot.week))
            .ok_or(CatalogError::WeekOutOfRange { week: slot.week })?;
        if !era.contains_difficulty(slot.difficulty_level) {
            return Err(CatalogError::Invalid(format!(
                "slot {} difficulty {} outside era '{}' band {}-{}",
                slot.key(),
                slot.difficulty_level,
                era.id,
                era.min_difficulty,
                era.max_difficulty
            )));
        }
        if slot.puzzle.expected_answer.is_empty() {
            return Err(CatalogError::Invalid(format!(
                "slot {} has an empty expected answer",
                slot.key()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin();
        let validated = Catalog::from_definition(catalog.to_definition()).unwrap();
        assert_eq!(validated.slots().len(), TOTAL_SLOTS as usize);
        assert_eq!(validated.list_eras().len(), 5);
    }

    #[test]
    fn get_slot_rejects_out_of_range_weeks() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.get_slot(0, SlotKind::Opener).unwrap_err(),
            CatalogError::WeekOutOfRange { week: 0 }
        );
        assert_eq!(
            catalog.get_slot(92, SlotKind::Closer).unwrap_err(),
            CatalogError::WeekOutOfRange { week: 92 }
        );
        let slot = catalog.get_slot(91, SlotKind::Closer).unwrap();
        assert_eq!(slot.key(), SlotKey::new(91, SlotKind::Closer));
    }

    #[test]
    fn week_returns_slots_in_day_order() {
        let catalog = Catalog::builtin();
        let week = catalog.week(7).unwrap();
        let kinds: Vec<SlotKind> = week.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, SlotKind::ALL.to_vec());
    }

    #[test]
    fn era_lookup_matches_syllabus_boundaries() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.era_for_week(12).unwrap().id, "ancient");
        assert_eq!(catalog.era_for_week(13).unwrap().id, "renaissance");
        assert_eq!(catalog.era_for_week(91).unwrap().id, "digital");
        assert!(catalog.era_for_week(92).is_err());
    }

    #[test]
    fn definition_with_gap_is_rejected() {
        let mut def = Catalog::builtin().to_definition();
        def.eras[1].first_week += 1;
        assert!(matches!(
            Catalog::from_definition(def),
            Err(CatalogError::Invalid(_))
        ));
    }

    #[test]
    fn definition_missing_slot_is_rejected() {
        let mut def = Catalog::builtin().to_definition();
        def.slots.remove(40);
        assert!(Catalog::from_definition(def).is_err());
    }

    #[test]
    fn definition_with_out_of_band_difficulty_is_rejected() {
        let mut def = Catalog::builtin().to_definition();
        def.slots[0].difficulty_level = 20;
        assert!(Catalog::from_definition(def).is_err());
    }

    #[test]
    fn toml_definition_normalizes_answers() {
        let mut def = Catalog::builtin().to_definition();
        def.slots[0].puzzle.expected_answer = "  spartan ".into();
        let content = toml::to_string(&def).unwrap();
        let catalog = Catalog::from_toml_str(&content).unwrap();
        assert_eq!(
            catalog.get_slot(1, SlotKind::Opener).unwrap().puzzle.expected_answer,
            "SPARTAN"
        );
    }
}
