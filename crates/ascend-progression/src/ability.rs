//! Abilities and ability modifiers.
//!
//! An [`AbilityDefinition`] is authored data. Granting it to a character
//! creates an [`AbilityInstance`] holding one [`AbilityModifierInstance`] per
//! modifier on the definition. Applying and unapplying an ability runs each
//! modifier through the [`ModifierHook`] extension point; the default hooks
//! do nothing, so new effect types only need a new hook implementation.

use std::sync::Arc;

use ascend_common::{AbilityId, CharacterId};
use serde::{Deserialize, Serialize};

// ============================================================================
// Definitions
// ============================================================================

/// One authored modifier of an ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityModifier {
    /// Modifier name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

impl AbilityModifier {
    /// Create a new modifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }

    /// Set description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Immutable authored ability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityDefinition {
    id: AbilityId,
    name: String,
    description: String,
    modifiers: Vec<AbilityModifier>,
}

impl AbilityDefinition {
    /// Create an ability with an ID derived from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: AbilityId::from_name(&name),
            name,
            description: String::new(),
            modifiers: Vec::new(),
        }
    }

    /// Set an explicit ID.
    #[must_use]
    pub fn with_id(mut self, id: AbilityId) -> Self {
        self.id = id;
        self
    }

    /// Set description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: AbilityModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Ability ID.
    #[must_use]
    pub fn id(&self) -> AbilityId {
        self.id
    }

    /// Ability name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Authored modifiers, in order.
    #[must_use]
    pub fn modifiers(&self) -> &[AbilityModifier] {
        &self.modifiers
    }
}

// ============================================================================
// Hooks
// ============================================================================

/// Extension point for modifier effects.
///
/// Contract for implementors: `apply` is called at most once between two
/// `unapply` calls, and `unapply` must undo everything `apply` introduced.
pub trait ModifierHook {
    /// Introduce the modifier's effect.
    fn apply(&mut self) {}

    /// Remove the modifier's effect.
    fn unapply(&mut self) {}
}

// ============================================================================
// Instances
// ============================================================================

/// Per-character instance of one ability modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityModifierInstance {
    modifier_index: usize,
    ability: AbilityId,
    owner: CharacterId,
    active: bool,
}

impl AbilityModifierInstance {
    /// Index of the modifier on its ability definition.
    #[must_use]
    pub fn modifier_index(&self) -> usize {
        self.modifier_index
    }

    /// Ability this modifier belongs to.
    #[must_use]
    pub fn ability(&self) -> AbilityId {
        self.ability
    }

    /// Character exhibiting the modifier.
    #[must_use]
    pub fn owner(&self) -> CharacterId {
        self.owner
    }

    /// Check if the modifier's effect is in place.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl ModifierHook for AbilityModifierInstance {}

/// Per-character instance of an ability.
#[derive(Debug, Clone)]
pub struct AbilityInstance {
    definition: Arc<AbilityDefinition>,
    owner: CharacterId,
    modifiers: Vec<AbilityModifierInstance>,
    applied: bool,
}

impl AbilityInstance {
    /// Instantiate an ability for a character, with one modifier instance
    /// per authored modifier.
    #[must_use]
    pub fn new(definition: Arc<AbilityDefinition>, owner: CharacterId) -> Self {
        let modifiers = (0..definition.modifiers().len())
            .map(|modifier_index| AbilityModifierInstance {
                modifier_index,
                ability: definition.id(),
                owner,
                active: false,
            })
            .collect();

        Self {
            definition,
            owner,
            modifiers,
            applied: false,
        }
    }

    /// Shared authored definition.
    #[must_use]
    pub fn definition(&self) -> &Arc<AbilityDefinition> {
        &self.definition
    }

    /// Ability ID.
    #[must_use]
    pub fn id(&self) -> AbilityId {
        self.definition.id()
    }

    /// Ability name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Character exhibiting the ability.
    #[must_use]
    pub fn owner(&self) -> CharacterId {
        self.owner
    }

    /// Modifier instances, in authored order.
    #[must_use]
    pub fn modifiers(&self) -> &[AbilityModifierInstance] {
        &self.modifiers
    }

    /// Authored modifier behind a modifier instance.
    #[must_use]
    pub fn modifier_definition(&self, instance: &AbilityModifierInstance) -> Option<&AbilityModifier> {
        self.definition.modifiers().get(instance.modifier_index)
    }

    /// Check if the ability is applied.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Apply every modifier. Returns false if already applied.
    pub fn apply(&mut self) -> bool {
        if self.applied {
            return false;
        }
        for modifier in &mut self.modifiers {
            modifier.apply();
            modifier.active = true;
        }
        self.applied = true;
        true
    }

    /// Undo every modifier, last first. Returns false if not applied.
    pub fn unapply(&mut self) -> bool {
        if !self.applied {
            return false;
        }
        for modifier in self.modifiers.iter_mut().rev() {
            modifier.unapply();
            modifier.active = false;
        }
        self.applied = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fireball() -> Arc<AbilityDefinition> {
        Arc::new(
            AbilityDefinition::new("Fireball")
                .with_description("Hurls a ball of fire")
                .with_modifier(AbilityModifier::new("Burn"))
                .with_modifier(AbilityModifier::new("Knockback")),
        )
    }

    #[test]
    fn test_instance_builds_modifiers_eagerly() {
        let owner = CharacterId::new();
        let ability = AbilityInstance::new(fireball(), owner);

        assert_eq!(ability.name(), "Fireball");
        assert_eq!(ability.modifiers().len(), 2);
        for (i, modifier) in ability.modifiers().iter().enumerate() {
            assert_eq!(modifier.modifier_index(), i);
            assert_eq!(modifier.owner(), owner);
            assert_eq!(modifier.ability(), ability.id());
            assert!(!modifier.is_active());
        }
        let second = &ability.modifiers()[1];
        assert_eq!(
            ability.modifier_definition(second).map(|m| m.name.as_str()),
            Some("Knockback")
        );
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut ability = AbilityInstance::new(fireball(), CharacterId::new());
        assert!(ability.apply());
        assert!(!ability.apply());
        assert!(ability.is_applied());
        assert!(ability.modifiers().iter().all(AbilityModifierInstance::is_active));
    }

    #[test]
    fn test_unapply_reverses_apply() {
        let mut ability = AbilityInstance::new(fireball(), CharacterId::new());
        assert!(!ability.unapply());

        ability.apply();
        assert!(ability.unapply());
        assert!(!ability.is_applied());
        assert!(ability.modifiers().iter().all(|m| !m.is_active()));

        // Can be applied again after being undone.
        assert!(ability.apply());
    }

    #[test]
    fn test_ability_without_modifiers() {
        let def = Arc::new(AbilityDefinition::new("Meditate"));
        let mut ability = AbilityInstance::new(def, CharacterId::new());
        assert!(ability.modifiers().is_empty());
        assert!(ability.apply());
    }
}
