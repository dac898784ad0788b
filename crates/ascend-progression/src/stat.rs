//! Authored stat definitions.
//!
//! This module provides:
//! - Stat kinds (base, secondary, skill)
//! - Weighted source lists for derived stats
//! - Validation of authored definitions

use ascend_common::StatId;
use serde::{Deserialize, Serialize};

use crate::error::{ProgressionError, ProgressionResult};

// ============================================================================
// Stat Kinds
// ============================================================================

/// How a stat obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    /// Levels from its own XP pool.
    Base,
    /// Weighted combination of other stats.
    Secondary,
    /// Weighted combination of other stats, usually secondary ones.
    Skill,
}

impl StatKind {
    /// Check if values come from other stats.
    #[must_use]
    pub fn is_derived(&self) -> bool {
        matches!(self, Self::Secondary | Self::Skill)
    }

    /// Get display name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Base => "Base",
            Self::Secondary => "Secondary",
            Self::Skill => "Skill",
        }
    }
}

impl std::fmt::Display for StatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Stat Sources
// ============================================================================

/// One weighted input of a derived stat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSource {
    /// Stat contributing to the value.
    pub stat: StatId,
    /// Share of the source's final points, in percent.
    pub weight_percent: f32,
}

impl StatSource {
    /// Create a new source.
    #[must_use]
    pub fn new(stat: StatId, weight_percent: f32) -> Self {
        Self {
            stat,
            weight_percent,
        }
    }

    /// Contribution of a source value under this weight.
    #[must_use]
    pub fn contribution(&self, source_points: f32) -> f32 {
        source_points * self.weight_percent / 100.0
    }
}

// ============================================================================
// Stat Definitions
// ============================================================================

/// Immutable authored description of a stat.
#[derive(Debug, Clone, PartialEq)]
pub struct StatDefinition {
    id: StatId,
    name: String,
    description: String,
    kind: StatKind,
    absolute_maximum: u32,
    use_factor: f32,
    sources: Vec<StatSource>,
}

impl StatDefinition {
    /// Create a base stat.
    pub fn base(name: impl Into<String>) -> ProgressionResult<Self> {
        StatDefinitionBuilder::new(name, StatKind::Base).build()
    }

    /// Create a secondary stat from weighted sources.
    pub fn secondary(
        name: impl Into<String>,
        sources: impl IntoIterator<Item = StatSource>,
    ) -> ProgressionResult<Self> {
        StatDefinitionBuilder::new(name, StatKind::Secondary)
            .sources(sources)
            .build()
    }

    /// Create a skill stat from weighted sources.
    pub fn skill(
        name: impl Into<String>,
        sources: impl IntoIterator<Item = StatSource>,
    ) -> ProgressionResult<Self> {
        StatDefinitionBuilder::new(name, StatKind::Skill)
            .sources(sources)
            .build()
    }

    /// Start building a definition.
    #[must_use]
    pub fn builder(name: impl Into<String>, kind: StatKind) -> StatDefinitionBuilder {
        StatDefinitionBuilder::new(name, kind)
    }

    /// Stat ID.
    #[must_use]
    pub fn id(&self) -> StatId {
        self.id
    }

    /// Stat name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Stat kind.
    #[must_use]
    pub fn kind(&self) -> StatKind {
        self.kind
    }

    /// Upper bound on raw points (0 = unbounded).
    #[must_use]
    pub fn absolute_maximum(&self) -> u32 {
        self.absolute_maximum
    }

    /// Check if raw points are clamped.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.absolute_maximum != 0
    }

    /// Multiplier applied after clamping.
    #[must_use]
    pub fn use_factor(&self) -> f32 {
        self.use_factor
    }

    /// Weighted sources (empty for base stats).
    #[must_use]
    pub fn sources(&self) -> &[StatSource] {
        &self.sources
    }

    /// Sum of source weights in percent.
    #[must_use]
    pub fn total_weight(&self) -> f32 {
        self.sources.iter().map(|s| s.weight_percent).sum()
    }

    /// Applies the bound and use factor to raw points.
    #[must_use]
    pub fn finalize(&self, raw_points: f32) -> f32 {
        let bounded = if self.is_bounded() {
            raw_points.clamp(0.0, self.absolute_maximum as f32)
        } else {
            raw_points
        };
        bounded * self.use_factor
    }

    /// Checks the definition against its kind.
    pub fn validate(&self) -> ProgressionResult<()> {
        if self.name.trim().is_empty() {
            return Err(ProgressionError::InvalidDefinition {
                name: self.name.clone(),
                reason: "name is empty".to_string(),
            });
        }

        if !self.use_factor.is_finite() {
            return Err(ProgressionError::InvalidDefinition {
                name: self.name.clone(),
                reason: format!("use factor {} is not finite", self.use_factor),
            });
        }

        let malformed = |reason: String| ProgressionError::MalformedSources {
            stat: self.name.clone(),
            reason,
        };

        match (self.kind.is_derived(), self.sources.is_empty()) {
            (false, false) => {
                return Err(malformed("base stats cannot have sources".to_string()));
            },
            (true, true) => {
                return Err(malformed(format!(
                    "{} stats need at least one source",
                    self.kind.display_name().to_lowercase()
                )));
            },
            _ => {},
        }

        for (i, source) in self.sources.iter().enumerate() {
            if !source.weight_percent.is_finite() || source.weight_percent < 0.0 {
                return Err(malformed(format!(
                    "source {i} has invalid weight {}",
                    source.weight_percent
                )));
            }
            if source.stat == self.id {
                return Err(malformed("stat lists itself as a source".to_string()));
            }
            if self.sources[..i].iter().any(|s| s.stat == source.stat) {
                return Err(malformed(format!("source {} is listed twice", source.stat)));
            }
        }

        Ok(())
    }
}

/// Builder for [`StatDefinition`].
#[derive(Debug, Clone)]
pub struct StatDefinitionBuilder {
    definition: StatDefinition,
}

impl StatDefinitionBuilder {
    /// Start a definition with an ID derived from the name.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StatKind) -> Self {
        let name = name.into();
        Self {
            definition: StatDefinition {
                id: StatId::from_name(&name),
                name,
                description: String::new(),
                kind,
                absolute_maximum: 0,
                use_factor: 1.0,
                sources: Vec::new(),
            },
        }
    }

    /// Set an explicit ID.
    #[must_use]
    pub fn id(mut self, id: StatId) -> Self {
        self.definition.id = id;
        self
    }

    /// Set description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.definition.description = description.into();
        self
    }

    /// Set the absolute maximum (0 = unbounded).
    #[must_use]
    pub fn absolute_maximum(mut self, maximum: u32) -> Self {
        self.definition.absolute_maximum = maximum;
        self
    }

    /// Set the use factor.
    #[must_use]
    pub fn use_factor(mut self, factor: f32) -> Self {
        self.definition.use_factor = factor;
        self
    }

    /// Add one weighted source.
    #[must_use]
    pub fn source(mut self, stat: StatId, weight_percent: f32) -> Self {
        self.definition
            .sources
            .push(StatSource::new(stat, weight_percent));
        self
    }

    /// Add several weighted sources.
    #[must_use]
    pub fn sources(mut self, sources: impl IntoIterator<Item = StatSource>) -> Self {
        self.definition.sources.extend(sources);
        self
    }

    /// Validate and finish.
    pub fn build(self) -> ProgressionResult<StatDefinition> {
        self.definition.validate()?;
        Ok(self.definition)
    }
}
