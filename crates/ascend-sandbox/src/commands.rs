//! Sandbox commands.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::{info, warn};

use crate::config::SandboxConfig;
use crate::report;
use crate::session::Session;

/// One sandbox action.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Write a default config file if none exists
    Init,

    /// Create a new character from the config, replacing any save
    New {
        /// Character name (overrides the config)
        #[arg(long)]
        name: Option<String>,
    },

    /// Print the character
    Show {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Add XP to the character, taking every level-up it affords
    AddXp {
        /// Amount (negative amounts count as positive)
        #[arg(allow_hyphen_values = true)]
        amount: i32,
    },

    /// Heal the character
    AddHp {
        /// Amount (negative amounts count as positive)
        #[arg(allow_hyphen_values = true)]
        amount: i32,
    },

    /// Damage the character
    RemoveHp {
        /// Amount (negative amounts count as positive)
        #[arg(allow_hyphen_values = true)]
        amount: i32,
    },

    /// Replace the bonus maximum HP
    SetBonusHp {
        /// Bonus (negative amounts count as positive)
        #[arg(allow_hyphen_values = true)]
        amount: i32,
    },

    /// Add a catalog stat to the character
    AddStat {
        /// Stat name
        name: String,
    },

    /// Remove a stat from the character
    RemoveStat {
        /// Stat name
        name: String,
    },

    /// Add XP to a base stat
    StatXp {
        /// Stat name
        name: String,
        /// Amount (negative amounts count as positive)
        #[arg(allow_hyphen_values = true)]
        amount: i32,
    },

    /// Grant a catalog ability to the character
    Grant {
        /// Ability name
        name: String,
    },

    /// Revoke an ability from the character
    Revoke {
        /// Ability name
        name: String,
    },

    /// Apply a granted ability
    Apply {
        /// Ability name
        name: String,
    },

    /// Unapply a granted ability
    Unapply {
        /// Ability name
        name: String,
    },
}

impl Command {
    /// Whether the command changes the character.
    #[must_use]
    pub fn mutates(&self) -> bool {
        !matches!(self, Self::Init | Self::Show { .. })
    }
}

/// Writes a default config to `path` unless one is already there.
pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        warn!("Config {} already exists, leaving it alone", path.display());
        return Ok(());
    }
    SandboxConfig::default()
        .save_to(path)
        .with_context(|| format!("writing {}", path.display()))
}

/// Runs a character command, saving afterwards if it changed anything.
pub fn run(command: &Command, session: &Session, out: &mut impl Write) -> Result<()> {
    let mut character = match command {
        Command::Init => bail!("init does not operate on a character"),
        Command::New { name } => {
            let mut character = session.create_character()?;
            if let Some(name) = name {
                character.set_name(name.clone());
            }
            character
        },
        _ => session.load_or_create()?,
    };

    match command {
        Command::Init | Command::New { .. } => {},
        Command::Show { json } => {
            let snapshot = character.snapshot().context("computing character values")?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&snapshot)?)?;
            } else {
                write!(out, "{}", report::render(&snapshot))?;
            }
        },
        Command::AddXp { amount } => {
            let gained = character.add_xp_and_settle(*amount);
            info!("Added {} XP, {} level(s) gained", amount.unsigned_abs(), gained);
        },
        Command::AddHp { amount } => {
            if character.add_hp(*amount) {
                info!("{} was revived", character.name());
            }
        },
        Command::RemoveHp { amount } => {
            if character.remove_hp(*amount) {
                info!("{} was defeated", character.name());
            }
        },
        Command::SetBonusHp { amount } => character.set_additional_max_hp(*amount),
        Command::AddStat { name } => {
            let stat = session.catalog().stat_by_name(name)?;
            character.add_stat(Arc::clone(stat))?;
        },
        Command::RemoveStat { name } => {
            if !character.remove_stat(name) {
                warn!("{} has no stat '{}'", character.name(), name);
            }
        },
        Command::StatXp { name, amount } => {
            let gained = character.grant_stat_xp(name, *amount)?;
            info!("{name} gained {gained} level(s)");
        },
        Command::Grant { name } => {
            let ability = session.catalog().ability_by_name(name)?;
            character.grant_ability(Arc::clone(ability))?;
        },
        Command::Revoke { name } => {
            if !character.revoke_ability(name) {
                warn!("{} has no ability '{}'", character.name(), name);
            }
        },
        Command::Apply { name } => {
            if !character.apply_ability(name)? {
                info!("{name} is already applied");
            }
        },
        Command::Unapply { name } => {
            if !character.unapply_ability(name)? {
                info!("{name} is not applied");
            }
        },
    }

    session.flush_events();

    if command.mutates() {
        if let Err(e) = character.check_sources() {
            warn!("Some stats no longer resolve: {e}");
        }
        session.save(&character)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::config;
    use ascend_progression::prelude::*;
    use tempfile::TempDir;

    fn run_ok(session: &Session, command: Command) -> String {
        let mut out = Vec::new();
        run(&command, session, &mut out).expect("command should succeed");
        String::from_utf8(out).expect("utf-8 output")
    }

    fn show(session: &Session) -> CharacterSnapshot {
        let json = run_ok(session, Command::Show { json: true });
        serde_json::from_str(&json).expect("snapshot json")
    }

    #[test]
    fn test_new_then_show() {
        let dir = TempDir::new().expect("temp dir");
        let session = Session::open(config(&dir)).expect("open");

        run_ok(&session, Command::New { name: Some("Aria".to_string()) });
        let snapshot = show(&session);
        assert_eq!(snapshot.name, "Aria");
        assert_eq!(snapshot.level, 2);
        assert_eq!(snapshot.stats.len(), 3);

        let text = run_ok(&session, Command::Show { json: false });
        assert!(text.contains("Name:        Aria"));
    }

    #[test]
    fn test_changes_persist_between_commands() {
        let dir = TempDir::new().expect("temp dir");
        let session = Session::open(config(&dir)).expect("open");
        run_ok(&session, Command::New { name: None });

        run_ok(&session, Command::AddXp { amount: -130 });
        run_ok(&session, Command::SetBonusHp { amount: 50 });
        run_ok(&session, Command::AddHp { amount: 25 });
        run_ok(&session, Command::StatXp { name: "Strength".to_string(), amount: 100 });
        run_ok(&session, Command::Apply { name: "Fireball".to_string() });

        let snapshot = show(&session);
        assert_eq!(snapshot.xp, 380);
        assert_eq!(snapshot.level, 3);
        assert_eq!(snapshot.hp, 125);
        assert_eq!(snapshot.maximum_hp_total, 150);
        assert_eq!(snapshot.stats[0].level, 1);
        assert!(snapshot.abilities[0].applied);
    }

    #[test]
    fn test_stat_commands() {
        let dir = TempDir::new().expect("temp dir");
        let session = Session::open(config(&dir)).expect("open");
        run_ok(&session, Command::New { name: None });

        run_ok(&session, Command::AddStat { name: "Charisma".to_string() });
        run_ok(&session, Command::RemoveStat { name: "Might".to_string() });
        // Removing twice is a no-op.
        run_ok(&session, Command::RemoveStat { name: "Might".to_string() });

        let names: Vec<String> = show(&session).stats.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Strength", "Agility", "Charisma"]);
    }

    #[test]
    fn test_failing_commands_do_not_save() {
        let dir = TempDir::new().expect("temp dir");
        let session = Session::open(config(&dir)).expect("open");
        run_ok(&session, Command::New { name: None });

        let mut out = Vec::new();
        let duplicate = Command::AddStat { name: "Strength".to_string() };
        assert!(run(&duplicate, &session, &mut out).is_err());
        let unknown = Command::Grant { name: "Icebolt".to_string() };
        assert!(run(&unknown, &session, &mut out).is_err());
        let derived = Command::StatXp { name: "Might".to_string(), amount: 5 };
        assert!(run(&derived, &session, &mut out).is_err());

        assert_eq!(show(&session).stats.len(), 3);
    }

    #[test]
    fn test_defeat_and_revive() {
        let dir = TempDir::new().expect("temp dir");
        let session = Session::open(config(&dir)).expect("open");
        run_ok(&session, Command::New { name: None });

        run_ok(&session, Command::RemoveHp { amount: 500 });
        assert_eq!(show(&session).hp, 0);
        run_ok(&session, Command::AddHp { amount: 10 });
        assert_eq!(show(&session).hp, 10);
    }

    #[test]
    fn test_init_writes_config_once() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("ascend.toml");
        init_config(&path).expect("init");
        assert_eq!(SandboxConfig::load_from(&path), SandboxConfig::default());

        std::fs::write(&path, "character_name = \"Kept\"").expect("write");
        init_config(&path).expect("init");
        assert_eq!(SandboxConfig::load_from(&path).character_name, "Kept");
    }
}
