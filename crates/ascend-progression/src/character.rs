//! Character progression state.
//!
//! This module provides:
//! - Overall XP and level, advanced one level per call
//! - HP with a base maximum and a replaceable bonus
//! - The character's stat instances, unique by name, in insertion order
//! - Granted abilities
//! - A serializable snapshot of every derived value

use std::sync::Arc;

use ahash::AHashMap;
use ascend_common::{CharacterId, StatId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ability::{AbilityDefinition, AbilityInstance};
use crate::curve::{ProgressionCurve, MAX_LEVEL};
use crate::error::{ProgressionError, ProgressionResult};
use crate::events::{EventPublisher, ProgressionEvent};
use crate::stat::{StatDefinition, StatKind};
use crate::stat_instance::{StatInstance, StatLookup};

/// Turns a caller-supplied delta into a magnitude.
///
/// Negative deltas are flipped rather than rejected, matching how callers of
/// the XP/HP operations have always behaved.
fn normalize(amount: i32, what: &str) -> u32 {
    if amount < 0 {
        debug!("Negative {} delta {} treated as {}", what, amount, amount.unsigned_abs());
    }
    amount.unsigned_abs()
}

// ============================================================================
// Character
// ============================================================================

/// Progression state of one character.
#[derive(Debug, Clone)]
pub struct CharacterProgression {
    id: CharacterId,
    name: String,
    hp: u32,
    maximum_hp: u32,
    additional_max_hp: u32,
    xp_pool: u64,
    level: u32,
    curve: Arc<ProgressionCurve>,
    stats: Vec<StatInstance>,
    stat_index: AHashMap<String, usize>,
    abilities: Vec<AbilityInstance>,
    events: Option<EventPublisher>,
}

impl CharacterProgression {
    /// Create a character at level 0 with no stats.
    ///
    /// `hp` is clamped to `maximum_hp`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        curve: Arc<ProgressionCurve>,
        hp: u32,
        maximum_hp: u32,
    ) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            hp: hp.min(maximum_hp),
            maximum_hp,
            additional_max_hp: 0,
            xp_pool: 0,
            level: 0,
            curve,
            stats: Vec::new(),
            stat_index: AHashMap::new(),
            abilities: Vec::new(),
            events: None,
        }
    }

    /// Start building a character.
    #[must_use]
    pub fn builder(name: impl Into<String>, curve: Arc<ProgressionCurve>) -> CharacterBuilder {
        CharacterBuilder::new(name, curve)
    }

    /// Publish events for this character through `publisher`.
    pub fn attach_events(&mut self, publisher: EventPublisher) {
        self.events = Some(publisher);
    }

    /// Stop publishing events.
    pub fn detach_events(&mut self) {
        self.events = None;
    }

    fn publish(&self, event: ProgressionEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    // === Identity ===

    /// Character ID.
    #[must_use]
    pub fn id(&self) -> CharacterId {
        self.id
    }

    /// Character name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the character.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Progression curve shared with other characters.
    #[must_use]
    pub fn progression_curve(&self) -> &Arc<ProgressionCurve> {
        &self.curve
    }

    // === XP and level ===

    /// Total XP earned.
    #[must_use]
    pub fn xp(&self) -> u64 {
        self.xp_pool
    }

    /// Current level.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// XP still missing before the next level (0 while level-ups are pending).
    #[must_use]
    pub fn xp_to_next_level(&self) -> u64 {
        if self.level >= MAX_LEVEL {
            return 0;
        }
        self.curve
            .cumulative_xp_for_level(self.level + 1)
            .saturating_sub(self.xp_pool)
    }

    /// Levels the XP pool affords beyond the current level.
    #[must_use]
    pub fn pending_level_ups(&self) -> u32 {
        self.curve
            .level_for_xp(self.xp_pool)
            .level
            .saturating_sub(self.level)
    }

    /// Adds XP and advances at most one level. Returns whether a level was
    /// gained.
    ///
    /// Negative amounts are treated as their absolute value. When one grant
    /// covers several levels, call `add_xp(0)` until it returns false to
    /// take them one at a time.
    pub fn add_xp(&mut self, amount: i32) -> bool {
        let amount = normalize(amount, "XP");
        self.xp_pool = self.xp_pool.saturating_add(u64::from(amount));

        if self.level >= MAX_LEVEL
            || self.xp_pool < self.curve.cumulative_xp_for_level(self.level + 1)
        {
            return false;
        }

        self.level += 1;
        debug!("{} reached level {}", self.name, self.level);
        self.publish(ProgressionEvent::LeveledUp {
            character: self.id,
            level: self.level,
        });
        true
    }

    /// Adds XP and takes every level-up it affords. Returns the number of
    /// levels gained.
    pub fn add_xp_and_settle(&mut self, amount: i32) -> u32 {
        let mut gained = 0;
        let mut leveled = self.add_xp(amount);
        while leveled {
            gained += 1;
            leveled = self.add_xp(0);
        }
        gained
    }

    // === HP ===

    /// Current HP.
    #[must_use]
    pub fn hp(&self) -> u32 {
        self.hp
    }

    /// Base maximum HP.
    #[must_use]
    pub fn maximum_hp(&self) -> u32 {
        self.maximum_hp
    }

    /// Bonus added to the base maximum HP.
    #[must_use]
    pub fn additional_max_hp(&self) -> u32 {
        self.additional_max_hp
    }

    /// HP cap: base maximum plus bonus.
    #[must_use]
    pub fn maximum_hp_total(&self) -> u32 {
        self.maximum_hp.saturating_add(self.additional_max_hp)
    }

    /// Check if HP is above 0.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Adds HP up to the cap. Returns true if the character was at 0 HP and
    /// now has some.
    pub fn add_hp(&mut self, amount: i32) -> bool {
        let amount = normalize(amount, "HP");
        let was_down = self.hp == 0;
        self.hp = self
            .hp
            .saturating_add(amount)
            .min(self.maximum_hp_total());

        let revived = was_down && self.hp > 0;
        if revived {
            self.publish(ProgressionEvent::Revived {
                character: self.id,
                hp: self.hp,
            });
        }
        revived
    }

    /// Removes HP down to 0. Returns true if the character had HP and now
    /// has none.
    pub fn remove_hp(&mut self, amount: i32) -> bool {
        let amount = normalize(amount, "HP");
        let was_up = self.hp > 0;
        self.hp = self.hp.saturating_sub(amount);

        let defeated = was_up && self.hp == 0;
        if defeated {
            self.publish(ProgressionEvent::Defeated { character: self.id });
        }
        defeated
    }

    /// Replaces the bonus maximum HP, clamping current HP to the new cap.
    pub fn set_additional_max_hp(&mut self, amount: i32) {
        self.additional_max_hp = normalize(amount, "bonus max HP");
        let cap = self.maximum_hp_total();
        if self.hp > cap {
            debug!("{} HP clamped from {} to {}", self.name, self.hp, cap);
            self.hp = cap;
        }
    }

    // === Stats ===

    /// Adds a stat. Fails if a stat with the same name or ID is present.
    pub fn add_stat(&mut self, definition: Arc<StatDefinition>) -> ProgressionResult<()> {
        if self.stat_index.contains_key(definition.name())
            || self.stats.iter().any(|s| s.id() == definition.id())
        {
            return Err(ProgressionError::DuplicateStat(
                definition.name().to_string(),
            ));
        }

        let stat = definition.id();
        self.stat_index
            .insert(definition.name().to_string(), self.stats.len());
        self.stats.push(StatInstance::new(definition));
        self.publish(ProgressionEvent::StatAdded {
            character: self.id,
            stat,
        });
        Ok(())
    }

    /// Removes a stat by name. Removing an absent stat does nothing and
    /// returns false.
    pub fn remove_stat(&mut self, name: &str) -> bool {
        let Some(index) = self.stat_index.remove(name) else {
            return false;
        };
        let removed = self.stats.remove(index);
        for slot in self.stat_index.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        self.publish(ProgressionEvent::StatRemoved {
            character: self.id,
            stat: removed.id(),
        });
        true
    }

    /// Finds a stat by name.
    #[must_use]
    pub fn stat(&self, name: &str) -> Option<&StatInstance> {
        self.stat_index.get(name).map(|&i| &self.stats[i])
    }

    /// Finds a stat by name, failing if absent.
    pub fn require_stat(&self, name: &str) -> ProgressionResult<&StatInstance> {
        self.stat(name)
            .ok_or_else(|| ProgressionError::StatNotFound(name.to_string()))
    }

    pub(crate) fn stat_mut(&mut self, name: &str) -> Option<&mut StatInstance> {
        let index = *self.stat_index.get(name)?;
        self.stats.get_mut(index)
    }

    /// Check if a stat is present.
    #[must_use]
    pub fn has_stat(&self, name: &str) -> bool {
        self.stat_index.contains_key(name)
    }

    /// Stats in insertion order.
    pub fn stats(&self) -> impl Iterator<Item = &StatInstance> {
        self.stats.iter()
    }

    /// Stats of one kind, in insertion order.
    pub fn stats_of_kind(&self, kind: StatKind) -> impl Iterator<Item = &StatInstance> {
        self.stats.iter().filter(move |s| s.kind() == kind)
    }

    /// Number of stats.
    #[must_use]
    pub fn stat_count(&self) -> usize {
        self.stats.len()
    }

    /// Adds XP to a base stat. Returns the number of levels it gained.
    pub fn grant_stat_xp(&mut self, name: &str, amount: i32) -> ProgressionResult<u32> {
        let curve = Arc::clone(&self.curve);
        let character = self.id;
        let stat = self
            .stat_mut(name)
            .ok_or_else(|| ProgressionError::StatNotFound(name.to_string()))?;
        let gained = stat.add_xp(amount, &curve)?;
        if gained > 0 {
            let event = ProgressionEvent::StatLeveledUp {
                character,
                stat: stat.id(),
                level: stat.level(&curve),
            };
            self.publish(event);
        }
        Ok(gained)
    }

    /// Level of a stat.
    pub fn stat_level(&self, name: &str) -> ProgressionResult<u32> {
        Ok(self.require_stat(name)?.level(&self.curve))
    }

    /// Raw points of a stat.
    pub fn raw_points(&self, name: &str) -> ProgressionResult<f32> {
        self.require_stat(name)?.raw_points(self)
    }

    /// Final points of a stat.
    pub fn final_points(&self, name: &str) -> ProgressionResult<f32> {
        self.require_stat(name)?.final_points(self)
    }

    /// Sum of every stat's final points.
    pub fn total_final_points(&self) -> ProgressionResult<f32> {
        self.stats
            .iter()
            .map(|s| s.final_points(self))
            .sum()
    }

    /// Checks that every derived stat resolves on this character.
    pub fn check_sources(&self) -> ProgressionResult<()> {
        for stat in self.stats.iter().filter(|s| s.kind().is_derived()) {
            stat.raw_points(self)?;
        }
        Ok(())
    }

    // === Abilities ===

    /// Grants an ability. Fails if an ability with the same name or ID is
    /// present.
    pub fn grant_ability(&mut self, definition: Arc<AbilityDefinition>) -> ProgressionResult<()> {
        if self
            .abilities
            .iter()
            .any(|a| a.name() == definition.name() || a.id() == definition.id())
        {
            return Err(ProgressionError::DuplicateAbility(
                definition.name().to_string(),
            ));
        }

        let ability = definition.id();
        self.abilities
            .push(AbilityInstance::new(definition, self.id));
        self.publish(ProgressionEvent::AbilityGranted {
            character: self.id,
            ability,
        });
        Ok(())
    }

    /// Revokes an ability, unapplying it first. Returns false if the
    /// character does not have it.
    pub fn revoke_ability(&mut self, name: &str) -> bool {
        let Some(index) = self.abilities.iter().position(|a| a.name() == name) else {
            return false;
        };
        let mut removed = self.abilities.remove(index);
        removed.unapply();
        self.publish(ProgressionEvent::AbilityRevoked {
            character: self.id,
            ability: removed.id(),
        });
        true
    }

    /// Finds an ability by name.
    #[must_use]
    pub fn ability(&self, name: &str) -> Option<&AbilityInstance> {
        self.abilities.iter().find(|a| a.name() == name)
    }

    fn ability_mut(&mut self, name: &str) -> ProgressionResult<&mut AbilityInstance> {
        self.abilities
            .iter_mut()
            .find(|a| a.name() == name)
            .ok_or_else(|| ProgressionError::AbilityNotFound(name.to_string()))
    }

    /// Granted abilities, in grant order.
    #[must_use]
    pub fn abilities(&self) -> &[AbilityInstance] {
        &self.abilities
    }

    /// Applies an ability. Returns false if it was already applied.
    pub fn apply_ability(&mut self, name: &str) -> ProgressionResult<bool> {
        Ok(self.ability_mut(name)?.apply())
    }

    /// Unapplies an ability. Returns false if it was not applied.
    pub fn unapply_ability(&mut self, name: &str) -> ProgressionResult<bool> {
        Ok(self.ability_mut(name)?.unapply())
    }

    // === Restore support ===

    pub(crate) fn restore_state(
        &mut self,
        id: CharacterId,
        hp: u32,
        additional_max_hp: u32,
        xp_pool: u64,
        level: u32,
    ) {
        self.id = id;
        self.additional_max_hp = additional_max_hp;
        self.hp = hp.min(self.maximum_hp_total());
        self.xp_pool = xp_pool;
        self.level = level.min(self.curve.level_for_xp(xp_pool).level);
    }

    // === Snapshot ===

    /// Computes every derived value into a serializable view.
    pub fn snapshot(&self) -> ProgressionResult<CharacterSnapshot> {
        let stats = self
            .stats
            .iter()
            .map(|stat| self.stat_snapshot(stat))
            .collect::<ProgressionResult<Vec<_>>>()?;

        let abilities = self
            .abilities
            .iter()
            .map(|ability| AbilitySnapshot {
                name: ability.name().to_string(),
                applied: ability.is_applied(),
                modifiers: ability
                    .definition()
                    .modifiers()
                    .iter()
                    .map(|m| m.name.clone())
                    .collect(),
            })
            .collect();

        Ok(CharacterSnapshot {
            id: self.id,
            name: self.name.clone(),
            hp: self.hp,
            maximum_hp: self.maximum_hp,
            additional_max_hp: self.additional_max_hp,
            maximum_hp_total: self.maximum_hp_total(),
            xp: self.xp_pool,
            level: self.level,
            xp_to_next_level: self.xp_to_next_level(),
            pending_level_ups: self.pending_level_ups(),
            curve: self.curve.name().to_string(),
            curve_equation: self.curve.equation(),
            stats,
            abilities,
        })
    }

    fn stat_snapshot(&self, stat: &StatInstance) -> ProgressionResult<StatSnapshot> {
        let definition = stat.definition();
        let progress = stat.progress(&self.curve);
        let sources = definition
            .sources()
            .iter()
            .map(|source| SourceSnapshot {
                stat: self
                    .stat_by_id(source.stat)
                    .map_or_else(|| source.stat.to_string(), |s| s.name().to_string()),
                weight_percent: source.weight_percent,
            })
            .collect();

        Ok(StatSnapshot {
            id: stat.id(),
            name: stat.name().to_string(),
            kind: stat.kind(),
            level: progress.level,
            local_xp_pool: stat.local_xp_pool(),
            xp_to_next_level: progress.xp_to_next_level,
            raw_points: stat.raw_points(self)?,
            final_points: stat.final_points(self)?,
            absolute_maximum: definition.absolute_maximum(),
            use_factor: definition.use_factor(),
            sources,
        })
    }
}

impl StatLookup for CharacterProgression {
    fn curve(&self) -> &ProgressionCurve {
        &self.curve
    }

    fn stat_by_id(&self, id: StatId) -> Option<&StatInstance> {
        self.stats.iter().find(|s| s.id() == id)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`CharacterProgression`].
#[derive(Debug)]
pub struct CharacterBuilder {
    id: Option<CharacterId>,
    name: String,
    curve: Arc<ProgressionCurve>,
    hp: u32,
    maximum_hp: u32,
    stats: Vec<Arc<StatDefinition>>,
    abilities: Vec<Arc<AbilityDefinition>>,
    events: Option<EventPublisher>,
}

impl CharacterBuilder {
    /// Start a character with 100/100 HP.
    #[must_use]
    pub fn new(name: impl Into<String>, curve: Arc<ProgressionCurve>) -> Self {
        Self {
            id: None,
            name: name.into(),
            curve,
            hp: 100,
            maximum_hp: 100,
            stats: Vec::new(),
            abilities: Vec::new(),
            events: None,
        }
    }

    /// Set an explicit ID.
    #[must_use]
    pub fn id(mut self, id: CharacterId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set current and base maximum HP.
    #[must_use]
    pub fn hp(mut self, hp: u32, maximum_hp: u32) -> Self {
        self.hp = hp;
        self.maximum_hp = maximum_hp;
        self
    }

    /// Add a stat.
    #[must_use]
    pub fn stat(mut self, definition: Arc<StatDefinition>) -> Self {
        self.stats.push(definition);
        self
    }

    /// Add several stats.
    #[must_use]
    pub fn stats(mut self, definitions: impl IntoIterator<Item = Arc<StatDefinition>>) -> Self {
        self.stats.extend(definitions);
        self
    }

    /// Grant an ability.
    #[must_use]
    pub fn ability(mut self, definition: Arc<AbilityDefinition>) -> Self {
        self.abilities.push(definition);
        self
    }

    /// Publish events through `publisher`.
    #[must_use]
    pub fn events(mut self, publisher: EventPublisher) -> Self {
        self.events = Some(publisher);
        self
    }

    /// Build the character. Fails on duplicate stats or abilities.
    pub fn build(self) -> ProgressionResult<CharacterProgression> {
        let mut character =
            CharacterProgression::new(self.name, self.curve, self.hp, self.maximum_hp);
        if let Some(id) = self.id {
            character.id = id;
        }
        for stat in self.stats {
            character.add_stat(stat)?;
        }
        for ability in self.abilities {
            character.grant_ability(ability)?;
        }
        character.events = self.events;
        Ok(character)
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Weighted source of a derived stat, by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    /// Source stat name (or ID if the stat is not on the character).
    pub stat: String,
    /// Weight in percent.
    pub weight_percent: f32,
}

/// Derived values of one stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    /// Stat ID.
    pub id: StatId,
    /// Stat name.
    pub name: String,
    /// Stat kind.
    pub kind: StatKind,
    /// Level (0 for derived stats).
    pub level: u32,
    /// XP pool.
    pub local_xp_pool: u64,
    /// XP missing before the next level.
    pub xp_to_next_level: u64,
    /// Points before bounds and use factor.
    pub raw_points: f32,
    /// Points after bounds and use factor.
    pub final_points: f32,
    /// Upper bound on raw points (0 = unbounded).
    pub absolute_maximum: u32,
    /// Use factor.
    pub use_factor: f32,
    /// Sources of derived stats.
    pub sources: Vec<SourceSnapshot>,
}

/// State of one granted ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySnapshot {
    /// Ability name.
    pub name: String,
    /// Whether it is applied.
    pub applied: bool,
    /// Modifier names.
    pub modifiers: Vec<String>,
}

/// Serializable view of a character and every derived value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    /// Character ID.
    pub id: CharacterId,
    /// Character name.
    pub name: String,
    /// Current HP.
    pub hp: u32,
    /// Base maximum HP.
    pub maximum_hp: u32,
    /// Bonus maximum HP.
    pub additional_max_hp: u32,
    /// HP cap.
    pub maximum_hp_total: u32,
    /// Total XP.
    pub xp: u64,
    /// Current level.
    pub level: u32,
    /// XP missing before the next level.
    pub xp_to_next_level: u64,
    /// Level-ups not yet taken.
    pub pending_level_ups: u32,
    /// Progression curve name.
    pub curve: String,
    /// Progression curve recurrence.
    pub curve_equation: String,
    /// Stats in insertion order.
    pub stats: Vec<StatSnapshot>,
    /// Abilities in grant order.
    pub abilities: Vec<AbilitySnapshot>,
}
