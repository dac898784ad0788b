//! Error types for progression operations.

use ascend_common::{AbilityId, CurveId, StatId};
use thiserror::Error;

/// Errors raised by curves, stats, characters and the catalog.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgressionError {
    // === Precondition violations ===
    /// A level query was made with a negative level.
    #[error("Level must be non-negative, got {0}")]
    NegativeLevel(i32),

    /// A progression curve was authored with unusable parameters.
    #[error("Invalid progression curve '{curve}': {reason}")]
    InvalidCurve {
        /// Curve name
        curve: String,
        /// What is wrong with it
        reason: String,
    },

    /// A stat's source list does not fit its kind.
    #[error("Malformed sources for stat '{stat}': {reason}")]
    MalformedSources {
        /// Stat name
        stat: String,
        /// What is wrong with the list
        reason: String,
    },

    /// A definition field is out of range.
    #[error("Invalid definition '{name}': {reason}")]
    InvalidDefinition {
        /// Definition name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// XP was granted to a stat that derives its value from other stats.
    #[error("Stat '{0}' is derived and cannot receive XP")]
    NotLevelable(String),

    // === Lookup failures ===
    /// No stat with this name on the character.
    #[error("Stat not found: {0}")]
    StatNotFound(String),

    /// No stat with this ID in the catalog.
    #[error("Stat not found: {0}")]
    StatIdNotFound(StatId),

    /// A derived stat references a source stat the character does not have.
    #[error("Stat '{stat}' depends on stat {source_id}, which is not present")]
    SourceStatMissing {
        /// Derived stat name
        stat: String,
        /// Missing source ID
        source_id: StatId,
    },

    /// Derived stats reference each other in a loop.
    #[error("Stat '{0}' depends on itself through its sources")]
    CyclicStatDependency(String),

    /// No ability with this name.
    #[error("Ability not found: {0}")]
    AbilityNotFound(String),

    /// No ability with this ID in the catalog.
    #[error("Ability not found: {0}")]
    AbilityIdNotFound(AbilityId),

    /// No progression curve with this name.
    #[error("Progression curve not found: {0}")]
    CurveNotFound(String),

    /// No progression curve with this ID in the catalog.
    #[error("Progression curve not found: {0}")]
    CurveIdNotFound(CurveId),

    // === Duplicate entries ===
    /// The character already has a stat with this name.
    #[error("Character already has stat '{0}'")]
    DuplicateStat(String),

    /// The character already has an ability with this name.
    #[error("Character already has ability '{0}'")]
    DuplicateAbility(String),

    /// The catalog already holds an entry with this ID or name.
    #[error("Duplicate {kind} entry '{name}'")]
    DuplicateEntry {
        /// Entry category
        kind: &'static str,
        /// Entry name
        name: String,
    },
}

impl ProgressionError {
    /// Returns true for lookup failures (something referenced was not found).
    #[must_use]
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Self::StatNotFound(_)
                | Self::StatIdNotFound(_)
                | Self::SourceStatMissing { .. }
                | Self::CyclicStatDependency(_)
                | Self::AbilityNotFound(_)
                | Self::AbilityIdNotFound(_)
                | Self::CurveNotFound(_)
                | Self::CurveIdNotFound(_)
        )
    }

    /// Returns true for precondition violations (bad input or authored data).
    #[must_use]
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            Self::NegativeLevel(_)
                | Self::InvalidCurve { .. }
                | Self::MalformedSources { .. }
                | Self::InvalidDefinition { .. }
                | Self::NotLevelable(_)
        )
    }

    /// Returns true for rejected duplicate entries.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Self::DuplicateStat(_) | Self::DuplicateAbility(_) | Self::DuplicateEntry { .. }
        )
    }
}

/// Result type alias for progression operations.
pub type ProgressionResult<T> = Result<T, ProgressionError>;
