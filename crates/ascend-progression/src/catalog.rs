//! Read-only collection of authored progression data.
//!
//! A [`Catalog`] is built once (usually from catalog files, see
//! [`crate::catalog_file`]) and then passed by reference wherever definitions
//! are resolved: building characters, rebinding loaded saves, the sandbox.
//! Entries are shared through `Arc`, so characters hold the same definition
//! objects the catalog does.

use std::hash::Hash;
use std::sync::Arc;

use ahash::AHashMap;
use ascend_common::{AbilityId, CurveId, StatId};
use tracing::debug;

use crate::ability::AbilityDefinition;
use crate::curve::ProgressionCurve;
use crate::error::{ProgressionError, ProgressionResult};
use crate::stat::StatDefinition;

// ============================================================================
// Entries
// ============================================================================

/// Category of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Progression curve.
    Curve,
    /// Stat definition of any kind.
    Stat,
    /// Ability definition.
    Ability,
}

impl EntryKind {
    /// Get display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Curve => "curve",
            Self::Stat => "stat",
            Self::Ability => "ability",
        }
    }
}

/// One authored entry to insert into a catalog.
#[derive(Debug, Clone)]
pub enum CatalogEntry {
    /// Progression curve.
    Curve(ProgressionCurve),
    /// Stat definition.
    Stat(StatDefinition),
    /// Ability definition.
    Ability(AbilityDefinition),
}

impl CatalogEntry {
    /// Category of the entry.
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Curve(_) => EntryKind::Curve,
            Self::Stat(_) => EntryKind::Stat,
            Self::Ability(_) => EntryKind::Ability,
        }
    }

    /// Name of the entry.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Curve(c) => c.name(),
            Self::Stat(s) => s.name(),
            Self::Ability(a) => a.name(),
        }
    }
}

impl From<ProgressionCurve> for CatalogEntry {
    fn from(curve: ProgressionCurve) -> Self {
        Self::Curve(curve)
    }
}

impl From<StatDefinition> for CatalogEntry {
    fn from(stat: StatDefinition) -> Self {
        Self::Stat(stat)
    }
}

impl From<AbilityDefinition> for CatalogEntry {
    fn from(ability: AbilityDefinition) -> Self {
        Self::Ability(ability)
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Entries of one category, indexed by ID and by name, in insertion order.
#[derive(Debug, Clone)]
struct Table<I, T> {
    entries: Vec<Arc<T>>,
    by_id: AHashMap<I, usize>,
    by_name: AHashMap<String, usize>,
}

impl<I, T> Default for Table<I, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_id: AHashMap::new(),
            by_name: AHashMap::new(),
        }
    }
}

impl<I: Copy + Eq + Hash, T> Table<I, T> {
    fn insert(&mut self, kind: EntryKind, id: I, name: &str, entry: T) -> ProgressionResult<()> {
        if self.by_id.contains_key(&id) || self.by_name.contains_key(name) {
            return Err(ProgressionError::DuplicateEntry {
                kind: kind.display_name(),
                name: name.to_string(),
            });
        }
        let index = self.entries.len();
        self.by_id.insert(id, index);
        self.by_name.insert(name.to_string(), index);
        self.entries.push(Arc::new(entry));
        Ok(())
    }

    fn by_id(&self, id: I) -> Option<&Arc<T>> {
        self.by_id.get(&id).map(|&i| &self.entries[i])
    }

    fn by_name(&self, name: &str) -> Option<&Arc<T>> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Read-only collection of curves, stats and abilities.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    curves: Table<CurveId, ProgressionCurve>,
    stats: Table<StatId, StatDefinition>,
    abilities: Table<AbilityId, AbilityDefinition>,
}

impl Catalog {
    /// Create new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry. Fails if its category already holds an entry with
    /// the same ID or name.
    pub fn insert(&mut self, entry: impl Into<CatalogEntry>) -> ProgressionResult<()> {
        let entry = entry.into();
        debug!("Catalog insert {} '{}'", entry.kind().display_name(), entry.name());
        match entry {
            CatalogEntry::Curve(curve) => {
                let (id, name) = (curve.id(), curve.name().to_string());
                self.curves.insert(EntryKind::Curve, id, &name, curve)
            },
            CatalogEntry::Stat(stat) => {
                let (id, name) = (stat.id(), stat.name().to_string());
                self.stats.insert(EntryKind::Stat, id, &name, stat)
            },
            CatalogEntry::Ability(ability) => {
                let (id, name) = (ability.id(), ability.name().to_string());
                self.abilities.insert(EntryKind::Ability, id, &name, ability)
            },
        }
    }

    /// Inserts several entries, stopping at the first failure.
    pub fn extend<E: Into<CatalogEntry>>(
        &mut self,
        entries: impl IntoIterator<Item = E>,
    ) -> ProgressionResult<()> {
        for entry in entries {
            self.insert(entry)?;
        }
        Ok(())
    }

    // === Curves ===

    /// Curve by ID.
    pub fn curve(&self, id: CurveId) -> ProgressionResult<&Arc<ProgressionCurve>> {
        self.curves
            .by_id(id)
            .ok_or(ProgressionError::CurveIdNotFound(id))
    }

    /// Curve by name.
    pub fn curve_by_name(&self, name: &str) -> ProgressionResult<&Arc<ProgressionCurve>> {
        self.curves
            .by_name(name)
            .ok_or_else(|| ProgressionError::CurveNotFound(name.to_string()))
    }

    /// All curves, in insertion order.
    pub fn curves(&self) -> impl Iterator<Item = &Arc<ProgressionCurve>> {
        self.curves.entries.iter()
    }

    // === Stats ===

    /// Stat by ID.
    pub fn stat(&self, id: StatId) -> ProgressionResult<&Arc<StatDefinition>> {
        self.stats
            .by_id(id)
            .ok_or(ProgressionError::StatIdNotFound(id))
    }

    /// Stat by name.
    pub fn stat_by_name(&self, name: &str) -> ProgressionResult<&Arc<StatDefinition>> {
        self.stats
            .by_name(name)
            .ok_or_else(|| ProgressionError::StatNotFound(name.to_string()))
    }

    /// All stats, in insertion order.
    pub fn stats(&self) -> impl Iterator<Item = &Arc<StatDefinition>> {
        self.stats.entries.iter()
    }

    // === Abilities ===

    /// Ability by ID.
    pub fn ability(&self, id: AbilityId) -> ProgressionResult<&Arc<AbilityDefinition>> {
        self.abilities
            .by_id(id)
            .ok_or(ProgressionError::AbilityIdNotFound(id))
    }

    /// Ability by name.
    pub fn ability_by_name(&self, name: &str) -> ProgressionResult<&Arc<AbilityDefinition>> {
        self.abilities
            .by_name(name)
            .ok_or_else(|| ProgressionError::AbilityNotFound(name.to_string()))
    }

    /// All abilities, in insertion order.
    pub fn abilities(&self) -> impl Iterator<Item = &Arc<AbilityDefinition>> {
        self.abilities.entries.iter()
    }

    // === Counts ===

    /// Number of entries in one category.
    #[must_use]
    pub fn len_of(&self, kind: EntryKind) -> usize {
        match kind {
            EntryKind::Curve => self.curves.entries.len(),
            EntryKind::Stat => self.stats.entries.len(),
            EntryKind::Ability => self.abilities.entries.len(),
        }
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.curves.entries.len() + self.stats.entries.len() + self.abilities.entries.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // === Validation ===

    /// Checks that every derived stat's sources are in the catalog and that
    /// no stat depends on itself through its sources.
    pub fn validate(&self) -> ProgressionResult<()> {
        for stat in self.stats() {
            for source in stat.sources() {
                if self.stats.by_id(source.stat).is_none() {
                    return Err(ProgressionError::SourceStatMissing {
                        stat: stat.name().to_string(),
                        source_id: source.stat,
                    });
                }
            }
        }

        // Depth-first walk; a stat reached again while still on the path
        // closes a cycle.
        let mut state = vec![Visit::New; self.stats.entries.len()];
        for start in 0..self.stats.entries.len() {
            self.visit(start, &mut state)?;
        }
        Ok(())
    }

    fn visit(&self, index: usize, state: &mut [Visit]) -> ProgressionResult<()> {
        match state[index] {
            Visit::Done => return Ok(()),
            Visit::OnPath => {
                return Err(ProgressionError::CyclicStatDependency(
                    self.stats.entries[index].name().to_string(),
                ));
            },
            Visit::New => {},
        }

        state[index] = Visit::OnPath;
        for source in self.stats.entries[index].sources() {
            if let Some(&next) = self.stats.by_id.get(&source.stat) {
                self.visit(next, state)?;
            }
        }
        state[index] = Visit::Done;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnPath,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::AbilityModifier;
    use crate::stat::StatSource;

    fn sample() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .insert(ProgressionCurve::new("Normal", 10.0, 1.0, 100).expect("valid curve"))
            .expect("new curve");
        catalog
            .insert(StatDefinition::base("Strength").expect("valid stat"))
            .expect("new stat");
        catalog
            .insert(
                StatDefinition::secondary(
                    "Might",
                    [StatSource::new(StatId::from_name("Strength"), 100.0)],
                )
                .expect("valid stat"),
            )
            .expect("new stat");
        catalog
            .insert(AbilityDefinition::new("Fireball").with_modifier(AbilityModifier::new("Burn")))
            .expect("new ability");
        catalog
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let catalog = sample();
        let strength = catalog.stat_by_name("Strength").expect("present");
        let by_id = catalog.stat(strength.id()).expect("present");
        assert!(Arc::ptr_eq(strength, by_id));

        assert_eq!(
            catalog.curve_by_name("Normal").map(|c| c.id()),
            Ok(CurveId::from_name("Normal"))
        );
        assert!(catalog.ability(AbilityId::from_name("Fireball")).is_ok());
    }

    #[test]
    fn test_missing_entries_are_errors() {
        let catalog = sample();
        assert_eq!(
            catalog.stat_by_name("Charisma").map(|_| ()),
            Err(ProgressionError::StatNotFound("Charisma".to_string()))
        );
        assert!(matches!(
            catalog.curve(CurveId::new()),
            Err(ProgressionError::CurveIdNotFound(_))
        ));
        assert!(catalog
            .ability_by_name("Icebolt")
            .is_err_and(|e| e.is_lookup_failure()));
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut catalog = sample();
        let err = catalog
            .insert(StatDefinition::base("Strength").expect("valid stat"))
            .unwrap_err();
        assert!(err.is_duplicate());

        // Same ID under a different name is still a duplicate.
        let renamed = StatDefinition::builder("Brawn", crate::stat::StatKind::Base)
            .id(StatId::from_name("Strength"))
            .build()
            .expect("valid stat");
        assert!(catalog.insert(renamed).is_err());

        // Names are unique per category only.
        assert!(catalog
            .insert(AbilityDefinition::new("Strength"))
            .is_ok());
    }

    #[test]
    fn test_counts() {
        let catalog = sample();
        assert_eq!(catalog.len_of(EntryKind::Curve), 1);
        assert_eq!(catalog.len_of(EntryKind::Stat), 2);
        assert_eq!(catalog.len_of(EntryKind::Ability), 1);
        assert_eq!(catalog.len(), 4);
        assert!(Catalog::new().is_empty());
    }

    #[test]
    fn test_validate_accepts_resolved_sources() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_dangling_source() {
        let mut catalog = Catalog::new();
        catalog
            .insert(
                StatDefinition::secondary(
                    "Might",
                    [StatSource::new(StatId::from_name("Strength"), 100.0)],
                )
                .expect("valid stat"),
            )
            .expect("new stat");
        assert!(matches!(
            catalog.validate(),
            Err(ProgressionError::SourceStatMissing { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_cycle() {
        let mut catalog = Catalog::new();
        catalog
            .extend([
                StatDefinition::secondary("A", [StatSource::new(StatId::from_name("B"), 50.0)])
                    .expect("valid stat"),
                StatDefinition::skill("B", [StatSource::new(StatId::from_name("C"), 50.0)])
                    .expect("valid stat"),
                StatDefinition::skill("C", [StatSource::new(StatId::from_name("A"), 50.0)])
                    .expect("valid stat"),
            ])
            .expect("new stats");
        assert!(matches!(
            catalog.validate(),
            Err(ProgressionError::CyclicStatDependency(_))
        ));
    }
}
