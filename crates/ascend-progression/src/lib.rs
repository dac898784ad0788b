//! # Ascend Progression
//!
//! Character progression for RPG gameplay.
//!
//! This crate provides:
//! - XP progression curves
//! - Stat definitions (base, secondary, skill) and per-character stat state
//! - Character XP, level and HP
//! - Abilities and ability modifiers
//! - A read-only catalog of authored data, loaded from RON files
//! - Binary save/load of character state
//! - Event bus for progression notifications

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod ability;
pub mod catalog;
pub mod catalog_file;
pub mod character;
pub mod curve;
pub mod error;
pub mod events;
pub mod save;
pub mod stat;
pub mod stat_instance;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::ability::*;
    pub use crate::catalog::*;
    pub use crate::catalog_file::*;
    pub use crate::character::*;
    pub use crate::curve::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::save::*;
    pub use crate::stat::*;
    pub use crate::stat_instance::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const CATALOG: &str = r#"
        (
            curves: [
                (name: "Normal", level_multiplier: 10.0, old_threshold_multiplier: 1.0, base_threshold: 100),
            ],
            stats: [
                (name: "Strength", kind: Base),
                (name: "Agility", kind: Base),
                (name: "Might", kind: Secondary, sources: [(stat: "Strength", weight: 60.0), (stat: "Agility", weight: 40.0)]),
                (name: "Swordplay", kind: Skill, absolute_maximum: 10, sources: [(stat: "Might", weight: 100.0)]),
            ],
            abilities: [(name: "Cleave", modifiers: [(name: "Sweep")])],
        )
    "#;

    #[test]
    fn test_catalog_to_character() {
        let catalog = CatalogFile::from_ron_str(CATALOG)
            .and_then(CatalogFile::into_catalog)
            .expect("valid catalog");
        let curve = catalog.curve_by_name("Normal").expect("curve");

        let mut character = CharacterProgression::builder("Knight", Arc::clone(curve))
            .stats(catalog.stats().cloned())
            .ability(Arc::clone(catalog.ability_by_name("Cleave").expect("ability")))
            .build()
            .expect("valid character");

        character.grant_stat_xp("Strength", 100).expect("base stat");
        character.grant_stat_xp("Agility", 210).expect("base stat");

        // Might = 0.6 * 1 + 0.4 * 2
        let might = character.final_points("Might").expect("resolvable");
        assert!((might - 1.4).abs() < 1e-5);
        let swordplay = character.final_points("Swordplay").expect("resolvable");
        assert!((swordplay - might).abs() < 1e-5);
    }

    #[test]
    fn test_level_up_events() {
        let curve = Arc::new(ProgressionCurve::new("Normal", 10.0, 1.0, 100).expect("valid curve"));
        let bus = EventBus::default();
        let mut character = CharacterProgression::builder("Knight", curve)
            .events(bus.publisher())
            .build()
            .expect("valid character");

        assert_eq!(character.add_xp_and_settle(100), 1);
        assert!(character.remove_hp(500));

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.character() == character.id()));
    }
}
