//! Text report of a character snapshot.

use std::fmt::Write;

use ascend_progression::{CharacterSnapshot, StatSnapshot};

/// Renders a snapshot as a human-readable report.
pub fn render(snapshot: &CharacterSnapshot) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, snapshot);
    out
}

fn write_report(out: &mut String, s: &CharacterSnapshot) -> std::fmt::Result {
    writeln!(out, "Name:        {}", s.name)?;
    writeln!(out, "Id:          {}", s.id)?;
    writeln!(out, "HP:          {}", s.hp)?;
    writeln!(
        out,
        "Max HP:      {} ({} + {} bonus)",
        s.maximum_hp_total, s.maximum_hp, s.additional_max_hp
    )?;
    writeln!(out, "XP:          {}", s.xp)?;
    writeln!(out, "XP to next:  {}", s.xp_to_next_level)?;
    if s.pending_level_ups > 0 {
        writeln!(out, "Level:       {} (+{} pending)", s.level, s.pending_level_ups)?;
    } else {
        writeln!(out, "Level:       {}", s.level)?;
    }
    writeln!(out, "Curve:       {}", s.curve)?;
    writeln!(out, "             {}", s.curve_equation)?;

    writeln!(out)?;
    if s.stats.is_empty() {
        writeln!(out, "Stats:       none")?;
    } else {
        writeln!(out, "Stats:")?;
        for stat in &s.stats {
            write_stat(out, stat)?;
        }
    }

    writeln!(out)?;
    if s.abilities.is_empty() {
        writeln!(out, "Abilities:   none")?;
    } else {
        writeln!(out, "Abilities:")?;
        for ability in &s.abilities {
            let state = if ability.applied { "applied" } else { "idle" };
            if ability.modifiers.is_empty() {
                writeln!(out, "  {} ({state})", ability.name)?;
            } else {
                writeln!(
                    out,
                    "  {} ({state}) modifiers: {}",
                    ability.name,
                    ability.modifiers.join(", ")
                )?;
            }
        }
    }
    Ok(())
}

fn write_stat(out: &mut String, stat: &StatSnapshot) -> std::fmt::Result {
    let maximum = if stat.absolute_maximum == 0 {
        "-".to_string()
    } else {
        stat.absolute_maximum.to_string()
    };

    write!(out, "  {:<14} {:<9}", stat.name, stat.kind.display_name())?;
    if stat.kind.is_derived() {
        write!(out, " {:>8}", "")?;
    } else {
        write!(out, " lv {:>5}", stat.level)?;
    }
    writeln!(
        out,
        "  raw {:>8.2}  final {:>8.2} / {:<6} use x{:.2}",
        stat.raw_points, stat.final_points, maximum, stat.use_factor
    )?;

    if !stat.kind.is_derived() {
        writeln!(
            out,
            "  {:<24} xp {} (next in {})",
            "", stat.local_xp_pool, stat.xp_to_next_level
        )?;
    }
    for source in &stat.sources {
        writeln!(out, "  {:<24} <- {} {}%", "", source.stat, source.weight_percent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ascend_progression::prelude::*;

    fn snapshot() -> CharacterSnapshot {
        let curve = Arc::new(ProgressionCurve::new("Normal", 10.0, 1.0, 100).expect("valid curve"));
        let strength = Arc::new(StatDefinition::base("Strength").expect("valid stat"));
        let might = Arc::new(
            StatDefinition::secondary("Might", [StatSource::new(strength.id(), 50.0)])
                .expect("valid stat"),
        );
        let mut character = CharacterProgression::builder("Aria", curve)
            .hp(70, 100)
            .stats([strength, might])
            .ability(Arc::new(
                AbilityDefinition::new("Fireball").with_modifier(AbilityModifier::new("Burn")),
            ))
            .build()
            .expect("valid character");
        character.add_xp(250);
        character.set_additional_max_hp(20);
        character.grant_stat_xp("Strength", 100).expect("base stat");
        character.apply_ability("Fireball").expect("granted");
        character.snapshot().expect("resolvable")
    }

    #[test]
    fn test_report_lists_core_values() {
        let report = render(&snapshot());
        assert!(report.contains("Name:        Aria"));
        assert!(report.contains("HP:          70"));
        assert!(report.contains("Max HP:      120 (100 + 20 bonus)"));
        assert!(report.contains("Level:       1 (+1 pending)"));
        assert!(report.contains("next = 10 * level + 1 * previous"));
    }

    #[test]
    fn test_report_lists_stats_and_abilities() {
        let report = render(&snapshot());
        assert!(report.contains("Strength"));
        assert!(report.contains("<- Strength 50%"));
        assert!(report.contains("Fireball (applied) modifiers: Burn"));
    }

    #[test]
    fn test_report_without_stats() {
        let curve = Arc::new(ProgressionCurve::new("Normal", 10.0, 1.0, 100).expect("valid curve"));
        let character = CharacterProgression::new("Empty", curve, 1, 1);
        let report = render(&character.snapshot().expect("resolvable"));
        assert!(report.contains("Stats:       none"));
        assert!(report.contains("Abilities:   none"));
    }
}
