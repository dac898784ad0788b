//! Per-character stat state and value derivation.
//!
//! A [`StatInstance`] only stores an XP pool. Everything else is computed on
//! read: level and XP-to-next-level from the owner's progression curve, raw
//! points from the level (base stats) or from the owner's other stats
//! (derived stats). Nothing is cached.

use std::sync::Arc;

use ascend_common::StatId;

use crate::curve::{LevelProgress, ProgressionCurve};
use crate::error::{ProgressionError, ProgressionResult};
use crate::stat::{StatDefinition, StatKind};

/// Read access an owner gives its stats while they evaluate.
pub trait StatLookup {
    /// Curve used to level base stats.
    fn curve(&self) -> &ProgressionCurve;

    /// Finds a stat on the owner by ID.
    fn stat_by_id(&self, id: StatId) -> Option<&StatInstance>;
}

/// One stat definition instantiated on a character.
#[derive(Debug, Clone)]
pub struct StatInstance {
    definition: Arc<StatDefinition>,
    local_xp_pool: u64,
}

impl StatInstance {
    /// Instantiate a stat with an empty XP pool.
    #[must_use]
    pub fn new(definition: Arc<StatDefinition>) -> Self {
        Self {
            definition,
            local_xp_pool: 0,
        }
    }

    /// Shared authored definition.
    #[must_use]
    pub fn definition(&self) -> &Arc<StatDefinition> {
        &self.definition
    }

    /// Stat ID.
    #[must_use]
    pub fn id(&self) -> StatId {
        self.definition.id()
    }

    /// Stat name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Stat kind.
    #[must_use]
    pub fn kind(&self) -> StatKind {
        self.definition.kind()
    }

    /// XP accumulated by this stat.
    #[must_use]
    pub fn local_xp_pool(&self) -> u64 {
        self.local_xp_pool
    }

    pub(crate) fn set_local_xp_pool(&mut self, pool: u64) {
        self.local_xp_pool = pool;
    }

    /// Position on the curve. Derived stats never level and report level 0.
    #[must_use]
    pub fn progress(&self, curve: &ProgressionCurve) -> LevelProgress {
        if self.kind().is_derived() {
            LevelProgress {
                level: 0,
                xp_into_level: 0,
                xp_to_next_level: 0,
            }
        } else {
            curve.level_for_xp(self.local_xp_pool)
        }
    }

    /// Current level.
    #[must_use]
    pub fn level(&self, curve: &ProgressionCurve) -> u32 {
        self.progress(curve).level
    }

    /// XP still missing before the next level.
    #[must_use]
    pub fn xp_to_next_level(&self, curve: &ProgressionCurve) -> u64 {
        self.progress(curve).xp_to_next_level
    }

    /// Adds XP to a base stat and returns the number of levels gained.
    ///
    /// Negative amounts are treated as their absolute value. Several levels
    /// can be gained at once.
    pub fn add_xp(&mut self, amount: i32, curve: &ProgressionCurve) -> ProgressionResult<u32> {
        if self.kind().is_derived() {
            return Err(ProgressionError::NotLevelable(self.name().to_string()));
        }
        let before = self.level(curve);
        self.local_xp_pool = self
            .local_xp_pool
            .saturating_add(u64::from(amount.unsigned_abs()));
        Ok(self.level(curve) - before)
    }

    /// Points before bounds and use factor.
    ///
    /// Base stats yield their level; derived stats yield the weighted sum of
    /// their sources' final points, looked up on `owner`.
    pub fn raw_points<L: StatLookup + ?Sized>(&self, owner: &L) -> ProgressionResult<f32> {
        self.evaluate_raw(owner, &mut Vec::new())
    }

    /// Points after clamping to the absolute maximum and scaling by the use
    /// factor.
    pub fn final_points<L: StatLookup + ?Sized>(&self, owner: &L) -> ProgressionResult<f32> {
        let raw = self.raw_points(owner)?;
        Ok(self.definition.finalize(raw))
    }

    fn evaluate_raw<L: StatLookup + ?Sized>(
        &self,
        owner: &L,
        visiting: &mut Vec<StatId>,
    ) -> ProgressionResult<f32> {
        if !self.kind().is_derived() {
            return Ok(self.level(owner.curve()) as f32);
        }

        if visiting.contains(&self.id()) {
            return Err(ProgressionError::CyclicStatDependency(
                self.name().to_string(),
            ));
        }
        visiting.push(self.id());

        let mut total = 0.0;
        for source in self.definition.sources() {
            let stat =
                owner
                    .stat_by_id(source.stat)
                    .ok_or_else(|| ProgressionError::SourceStatMissing {
                        stat: self.name().to_string(),
                        source_id: source.stat,
                    })?;
            let source_final = stat
                .definition
                .finalize(stat.evaluate_raw(owner, visiting)?);
            total += source.contribution(source_final);
        }

        visiting.pop();
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat::StatSource;

    struct Owner {
        curve: ProgressionCurve,
        stats: Vec<StatInstance>,
    }

    impl StatLookup for Owner {
        fn curve(&self) -> &ProgressionCurve {
            &self.curve
        }

        fn stat_by_id(&self, id: StatId) -> Option<&StatInstance> {
            self.stats.iter().find(|s| s.id() == id)
        }
    }

    fn curve() -> ProgressionCurve {
        ProgressionCurve::new("Normal", 10.0, 1.0, 100).expect("valid curve")
    }

    fn base(name: &str, xp: u64) -> StatInstance {
        let mut stat = StatInstance::new(Arc::new(StatDefinition::base(name).expect("valid stat")));
        stat.set_local_xp_pool(xp);
        stat
    }

    #[test]
    fn test_base_stat_levels_from_pool() {
        let curve = curve();
        let mut stat = base("Strength", 0);
        assert_eq!(stat.level(&curve), 0);
        assert_eq!(stat.xp_to_next_level(&curve), 100);

        assert_eq!(stat.add_xp(250, &curve), Ok(2));
        assert_eq!(stat.level(&curve), 2);
        assert_eq!(stat.xp_to_next_level(&curve), 90);
    }

    #[test]
    fn test_add_xp_normalizes_negative() {
        let curve = curve();
        let mut stat = base("Strength", 0);
        assert_eq!(stat.add_xp(-100, &curve), Ok(1));
        assert_eq!(stat.local_xp_pool(), 100);
    }

    #[test]
    fn test_single_grant_matches_incremental() {
        let curve = curve();
        let mut once = base("Strength", 0);
        once.add_xp(250, &curve).expect("base stat");

        let mut stepwise = base("Strength", 0);
        for amount in [100, 75, 75] {
            stepwise.add_xp(amount, &curve).expect("base stat");
        }
        assert_eq!(once.level(&curve), stepwise.level(&curve));
        assert_eq!(once.local_xp_pool(), stepwise.local_xp_pool());
    }

    #[test]
    fn test_weighted_sum_of_sources() {
        // Strength at level 10 and Agility at level 20 via unit-threshold curve.
        let flat = ProgressionCurve::new("Flat", 0.0, 0.0, 1).expect("valid curve");
        let strength = base("Strength", 10);
        let agility = base("Agility", 20);
        let might = StatInstance::new(Arc::new(
            StatDefinition::secondary(
                "Might",
                [
                    StatSource::new(strength.id(), 50.0),
                    StatSource::new(agility.id(), 50.0),
                ],
            )
            .expect("valid stat"),
        ));
        let owner = Owner {
            curve: flat,
            stats: vec![strength, agility, might.clone()],
        };

        assert_eq!(might.raw_points(&owner), Ok(15.0));
        assert_eq!(might.level(owner.curve()), 0);
    }

    #[test]
    fn test_derived_stat_rejects_xp() {
        let curve = curve();
        let mut might = StatInstance::new(Arc::new(
            StatDefinition::secondary("Might", [StatSource::new(StatId::from_name("Strength"), 100.0)])
                .expect("valid stat"),
        ));
        assert_eq!(
            might.add_xp(10, &curve),
            Err(ProgressionError::NotLevelable("Might".to_string()))
        );
    }

    #[test]
    fn test_missing_source_is_reported() {
        let might = StatInstance::new(Arc::new(
            StatDefinition::secondary("Might", [StatSource::new(StatId::from_name("Strength"), 100.0)])
                .expect("valid stat"),
        ));
        let owner = Owner {
            curve: curve(),
            stats: vec![might.clone()],
        };
        let err = might.final_points(&owner).unwrap_err();
        assert!(matches!(err, ProgressionError::SourceStatMissing { .. }));
        assert!(err.is_lookup_failure());
    }

    #[test]
    fn test_cycle_is_reported() {
        let a = StatInstance::new(Arc::new(
            StatDefinition::secondary("A", [StatSource::new(StatId::from_name("B"), 100.0)])
                .expect("valid stat"),
        ));
        let b = StatInstance::new(Arc::new(
            StatDefinition::secondary("B", [StatSource::new(StatId::from_name("A"), 100.0)])
                .expect("valid stat"),
        ));
        let owner = Owner {
            curve: curve(),
            stats: vec![a.clone(), b],
        };
        assert!(matches!(
            a.raw_points(&owner),
            Err(ProgressionError::CyclicStatDependency(_))
        ));
    }

    #[test]
    fn test_final_points_bounded_and_scaled() {
        let flat = ProgressionCurve::new("Flat", 0.0, 0.0, 1).expect("valid curve");
        let mut luck = StatInstance::new(Arc::new(
            StatDefinition::builder("Luck", StatKind::Base)
                .absolute_maximum(5)
                .use_factor(3.0)
                .build()
                .expect("valid stat"),
        ));
        luck.add_xp(12, &flat).expect("base stat");
        let owner = Owner {
            curve: flat,
            stats: vec![luck.clone()],
        };
        assert_eq!(luck.raw_points(&owner), Ok(12.0));
        assert_eq!(luck.final_points(&owner), Ok(15.0));
    }
}
