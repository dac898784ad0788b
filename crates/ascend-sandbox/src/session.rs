//! Sandbox session: catalog, save store and event bus for one run.

use std::sync::Arc;

use anyhow::{Context, Result};
use ascend_progression::prelude::*;
use tracing::{info, warn};

use crate::config::SandboxConfig;

/// Everything a command needs besides the character itself.
pub struct Session {
    config: SandboxConfig,
    catalog: Catalog,
    store: SaveStore,
    bus: EventBus,
}

impl Session {
    /// Loads the catalog named by the config.
    pub fn open(config: SandboxConfig) -> Result<Self> {
        let catalog = CatalogFile::load_dir(&config.catalog_dir)
            .and_then(CatalogFile::into_catalog)
            .with_context(|| format!("loading catalog from {}", config.catalog_dir.display()))?;
        info!(
            "Catalog ready: {} curves, {} stats, {} abilities",
            catalog.len_of(EntryKind::Curve),
            catalog.len_of(EntryKind::Stat),
            catalog.len_of(EntryKind::Ability)
        );

        let store = SaveStore::new(&config.save_dir);
        let bus = EventBus::new(config.event_capacity);
        Ok(Self {
            config,
            catalog,
            store,
            bus,
        })
    }

    /// Loaded catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Builds a fresh character from the config.
    pub fn create_character(&self) -> Result<CharacterProgression> {
        let config = &self.config;
        let curve = self
            .catalog
            .curve_by_name(&config.curve)
            .with_context(|| format!("config curve '{}'", config.curve))?;

        let mut builder = CharacterProgression::builder(&config.character_name, Arc::clone(curve))
            .hp(config.starting_hp, config.maximum_hp)
            .events(self.bus.publisher());
        for name in &config.stats {
            let stat = self
                .catalog
                .stat_by_name(name)
                .with_context(|| format!("config stat '{name}'"))?;
            builder = builder.stat(Arc::clone(stat));
        }
        for name in &config.abilities {
            let ability = self
                .catalog
                .ability_by_name(name)
                .with_context(|| format!("config ability '{name}'"))?;
            builder = builder.ability(Arc::clone(ability));
        }

        let mut character = builder.build().context("building character")?;
        character
            .check_sources()
            .context("config stats do not resolve")?;

        let starting_xp = i32::try_from(config.starting_xp).unwrap_or(i32::MAX);
        character.add_xp_and_settle(starting_xp);
        info!(
            "Created {} ({}) at level {}",
            character.name(),
            character.id(),
            character.level()
        );
        Ok(character)
    }

    /// Loads the saved character, or creates one if there is no save.
    pub fn load_or_create(&self) -> Result<CharacterProgression> {
        let name = &self.config.save_name;
        if !self.store.exists(name) {
            warn!("No save named '{}', creating a new character", name);
            return self.create_character();
        }

        let mut character: CharacterProgression = self
            .store
            .load(name, &self.catalog)
            .with_context(|| format!("loading save '{name}'"))?;
        character.attach_events(self.bus.publisher());
        Ok(character)
    }

    /// Saves the character under the configured name.
    pub fn save(&self, character: &CharacterProgression) -> Result<()> {
        let name = &self.config.save_name;
        self.store
            .save(name, character)
            .with_context(|| format!("saving '{name}'"))
    }

    /// Logs and drains pending events.
    pub fn flush_events(&self) -> Vec<ProgressionEvent> {
        let events = self.bus.drain();
        for event in &events {
            match event {
                ProgressionEvent::LeveledUp { level, .. } => info!("LEVEL UP! Now level {level}"),
                ProgressionEvent::StatLeveledUp { stat, level, .. } => {
                    let name = self
                        .catalog
                        .stat(*stat)
                        .map_or_else(|_| stat.to_string(), |s| s.name().to_string());
                    info!("{name} reached level {level}");
                },
                ProgressionEvent::Revived { hp, .. } => info!("Revived with {hp} HP"),
                ProgressionEvent::Defeated { .. } => info!("Defeated"),
                other => info!("{other:?}"),
            }
        }
        events
    }
}
