//! XP progression curves.
//!
//! A curve maps a level to the amount of XP needed to advance from that level
//! to the next one. Thresholds follow a recurrence seeded by a level-0 value:
//!
//! ```text
//! t(0) = base_threshold
//! t(n) = round(level_multiplier * n + old_threshold_multiplier * t(n - 1))
//! ```
//!
//! Levels are a pure function of the total XP pool, so granting XP in one
//! large amount or in many small ones always lands on the same level.

use ascend_common::CurveId;

use crate::error::{ProgressionError, ProgressionResult};

/// Highest level any curve will report.
pub const MAX_LEVEL: u32 = 9_999;

/// Where an XP pool sits on a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    /// Level reached.
    pub level: u32,
    /// XP accumulated since reaching `level`.
    pub xp_into_level: u64,
    /// XP still missing before the next level (0 at `MAX_LEVEL`).
    pub xp_to_next_level: u64,
}

/// Authored XP curve shared by every character that uses it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionCurve {
    id: CurveId,
    name: String,
    level_multiplier: f32,
    old_threshold_multiplier: f32,
    base_threshold: u64,
}

impl ProgressionCurve {
    /// Creates a curve with an ID derived from its name.
    pub fn new(
        name: impl Into<String>,
        level_multiplier: f32,
        old_threshold_multiplier: f32,
        base_threshold: u64,
    ) -> ProgressionResult<Self> {
        let name = name.into();
        let curve = Self {
            id: CurveId::from_name(&name),
            name,
            level_multiplier,
            old_threshold_multiplier,
            base_threshold,
        };
        curve.validate()?;
        Ok(curve)
    }

    /// Overrides the curve ID.
    #[must_use]
    pub fn with_id(mut self, id: CurveId) -> Self {
        self.id = id;
        self
    }

    fn validate(&self) -> ProgressionResult<()> {
        let invalid = |reason: &str| ProgressionError::InvalidCurve {
            curve: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if !self.level_multiplier.is_finite() || self.level_multiplier < 0.0 {
            return Err(invalid("level multiplier must be finite and non-negative"));
        }
        if !self.old_threshold_multiplier.is_finite() || self.old_threshold_multiplier < 0.0 {
            return Err(invalid(
                "old threshold multiplier must be finite and non-negative",
            ));
        }
        if self.base_threshold == 0 {
            return Err(invalid("base threshold must be greater than zero"));
        }
        Ok(())
    }

    /// Curve ID.
    #[must_use]
    pub fn id(&self) -> CurveId {
        self.id
    }

    /// Curve name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Weight of the level number in each threshold.
    #[must_use]
    pub fn level_multiplier(&self) -> f32 {
        self.level_multiplier
    }

    /// Weight of the previous threshold in each threshold.
    #[must_use]
    pub fn old_threshold_multiplier(&self) -> f32 {
        self.old_threshold_multiplier
    }

    /// Threshold at level 0.
    #[must_use]
    pub fn base_threshold(&self) -> u64 {
        self.base_threshold
    }

    /// Human readable form of the recurrence.
    #[must_use]
    pub fn equation(&self) -> String {
        format!(
            "next = {} * level + {} * previous (level 0 = {})",
            self.level_multiplier, self.old_threshold_multiplier, self.base_threshold
        )
    }

    fn next_threshold(&self, level: u32, previous: u64) -> u64 {
        let value = f64::from(self.level_multiplier) * f64::from(level)
            + f64::from(self.old_threshold_multiplier) * previous as f64;
        // Float to int casts saturate; the floor keeps leveling finite.
        (value.round() as u64).max(1)
    }

    /// Iterates thresholds for level 0, 1, 2, ...
    pub fn thresholds(&self) -> impl Iterator<Item = u64> + '_ {
        let mut state: Option<(u32, u64)> = None;
        std::iter::from_fn(move || {
            let next = match state {
                None => (0, self.base_threshold),
                Some((level, previous)) => {
                    let level = level.checked_add(1)?;
                    (level, self.next_threshold(level, previous))
                },
            };
            state = Some(next);
            Some(next.1)
        })
    }

    /// XP needed to go from `current_level` to the level after it.
    pub fn xp_to_next_level(&self, current_level: i32) -> ProgressionResult<u64> {
        let level =
            u32::try_from(current_level).map_err(|_| ProgressionError::NegativeLevel(current_level))?;
        Ok(self.threshold_at(level))
    }

    fn threshold_at(&self, level: u32) -> u64 {
        self.thresholds()
            .nth(level as usize)
            .unwrap_or(u64::MAX)
    }

    /// Total XP needed to reach `level` starting from level 0.
    #[must_use]
    pub fn cumulative_xp_for_level(&self, level: u32) -> u64 {
        self.thresholds()
            .take(level as usize)
            .fold(0u64, u64::saturating_add)
    }

    /// Resolves a total XP pool into a level, cascading through every level
    /// the pool affords.
    #[must_use]
    pub fn level_for_xp(&self, pool: u64) -> LevelProgress {
        let mut level = 0;
        let mut floor = 0u64;
        for threshold in self.thresholds() {
            if level >= MAX_LEVEL {
                break;
            }
            let next = floor.saturating_add(threshold);
            if pool < next {
                return LevelProgress {
                    level,
                    xp_into_level: pool - floor,
                    xp_to_next_level: next - pool,
                };
            }
            floor = next;
            level += 1;
        }
        LevelProgress {
            level,
            xp_into_level: pool.saturating_sub(floor),
            xp_to_next_level: 0,
        }
    }
}
