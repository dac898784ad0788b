//! Save/Load of progression state.
//!
//! This module provides:
//! - The [`DataSaveable`] hooks a type implements to be persisted
//! - A framed binary codec: magic bytes, schema version, bincode record
//! - [`SaveStore`], a directory of save files written atomically
//! - The persisted form of a [`CharacterProgression`]
//!
//! Records store IDs, never definitions. Loading rebinds every ID against a
//! [`Catalog`], so a save only stays loadable while the catalog still has
//! the entries it references.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ascend_common::{AbilityId, CharacterId, CurveId, MagicBytes, SchemaVersion, StatId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::character::CharacterProgression;
use crate::error::ProgressionError;

/// Default file extension of save files.
pub const SAVE_EXTENSION: &str = "sav";

/// Errors that can occur during save/load operations.
#[derive(Debug, Error)]
pub enum SaveError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Data does not start with the expected magic bytes
    #[error("Invalid save format: expected {expected} record")]
    InvalidFormat {
        /// Expected record type
        expected: MagicBytes,
    },

    /// Data was written by an incompatible schema version
    #[error("Incompatible save version: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version this build reads
        expected: SchemaVersion,
        /// Version found in the data
        found: SchemaVersion,
    },

    /// Save file not found
    #[error("Save not found: {0}")]
    NotFound(String),

    /// Save file corrupted
    #[error("Save file corrupted: {0}")]
    Corrupted(String),

    /// Loaded record references something the catalog cannot provide
    #[error("Failed to rebind save: {0}")]
    Rebind(#[from] ProgressionError),
}

/// Result type for save operations.
pub type SaveResult<T> = Result<T, SaveError>;

// ============================================================================
// Saveable types
// ============================================================================

/// Hooks for types that persist through the save codec.
pub trait DataSaveable: Sized {
    /// Magic bytes identifying the record type.
    const TYPE_ID: MagicBytes;

    /// Schema version written with new records.
    const SCHEMA: SchemaVersion;

    /// Plain data written to disk.
    type Record: Serialize + DeserializeOwned;

    /// Captures the state to persist.
    fn before_save(&self) -> Self::Record;

    /// Rebuilds a value from a record, resolving definitions in `catalog`.
    fn after_load(record: Self::Record, catalog: &Catalog) -> SaveResult<Self>;
}

/// Serializes a value: magic bytes, schema version, record.
pub fn encode<T: DataSaveable>(value: &T) -> SaveResult<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(T::TYPE_ID.as_bytes());

    let record = value.before_save();
    bincode::serialize_into(&mut buffer, &T::SCHEMA)
        .and_then(|()| bincode::serialize_into(&mut buffer, &record))
        .map_err(|e| SaveError::Serialization(e.to_string()))?;

    Ok(buffer)
}

/// Deserializes a value written by [`encode`] and rebinds it.
pub fn decode<T: DataSaveable>(bytes: &[u8], catalog: &Catalog) -> SaveResult<T> {
    if !T::TYPE_ID.matches(bytes) {
        return Err(SaveError::InvalidFormat {
            expected: T::TYPE_ID,
        });
    }

    let mut reader = &bytes[4..];
    let found: SchemaVersion = bincode::deserialize_from(&mut reader)
        .map_err(|e| SaveError::Corrupted(e.to_string()))?;
    if !T::SCHEMA.can_read(&found) {
        return Err(SaveError::VersionMismatch {
            expected: T::SCHEMA,
            found,
        });
    }

    let record: T::Record = bincode::deserialize_from(&mut reader)
        .map_err(|e| SaveError::Corrupted(e.to_string()))?;
    T::after_load(record, catalog)
}

// ============================================================================
// Save store
// ============================================================================

/// Directory of named save files.
#[derive(Debug, Clone)]
pub struct SaveStore {
    /// Directory for save files
    save_dir: PathBuf,
    /// File extension, without the dot
    extension: String,
}

impl SaveStore {
    /// Creates a store over the given directory.
    #[must_use]
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            extension: SAVE_EXTENSION.to_string(),
        }
    }

    /// Uses a different file extension.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Gets the save directory path.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Ensures the save directory exists.
    pub fn ensure_dir(&self) -> SaveResult<()> {
        fs::create_dir_all(&self.save_dir)?;
        Ok(())
    }

    fn save_path(&self, name: &str) -> PathBuf {
        self.save_dir.join(format!("{name}.{}", self.extension))
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.save_dir.join(format!("{name}.{}.tmp", self.extension))
    }

    /// Writes a value, replacing any save with the same name.
    ///
    /// The file is written next to the target and renamed into place, so a
    /// failed write never leaves a truncated save behind.
    pub fn save<T: DataSaveable>(&self, name: &str, value: &T) -> SaveResult<()> {
        self.ensure_dir()?;

        let bytes = encode(value)?;
        let temp_path = self.temp_path(name);
        let final_path = self.save_path(name);

        let mut file = fs::File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &final_path)?;
        debug!("Saved {} ({} bytes) to {:?}", name, bytes.len(), final_path);

        Ok(())
    }

    /// Reads and rebinds a value.
    pub fn load<T: DataSaveable>(&self, name: &str, catalog: &Catalog) -> SaveResult<T> {
        let path = self.save_path(name);
        if !path.exists() {
            return Err(SaveError::NotFound(name.to_string()));
        }

        let bytes = fs::read(&path)?;
        let value = decode(&bytes, catalog)?;
        info!("Loaded {} from {:?}", name, path);
        Ok(value)
    }

    /// Checks if a save exists.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.save_path(name).exists()
    }

    /// Deletes a save file.
    pub fn delete(&self, name: &str) -> SaveResult<()> {
        let path = self.save_path(name);
        if !path.exists() {
            return Err(SaveError::NotFound(name.to_string()));
        }
        fs::remove_file(&path)?;
        Ok(())
    }

    /// Names of every save in the directory, sorted.
    pub fn list(&self) -> SaveResult<Vec<String>> {
        if !self.save_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = fs::read_dir(&self.save_dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == self.extension.as_str()))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }
}

// ============================================================================
// Character records
// ============================================================================

/// Persisted stat state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    /// Stat definition ID
    pub id: StatId,
    /// XP pool
    pub local_xp_pool: u64,
}

/// Persisted ability state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityRecord {
    /// Ability definition ID
    pub id: AbilityId,
    /// Whether the ability was applied
    pub applied: bool,
}

/// Persisted form of a [`CharacterProgression`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRecord {
    /// Character ID
    pub id: CharacterId,
    /// Character name
    pub name: String,
    /// Progression curve ID
    pub curve: CurveId,
    /// Current HP
    pub hp: u32,
    /// Base maximum HP
    pub maximum_hp: u32,
    /// Bonus maximum HP
    pub additional_max_hp: u32,
    /// Total XP
    pub xp_pool: u64,
    /// Settled level
    pub level: u32,
    /// Stats in insertion order
    pub stats: Vec<StatRecord>,
    /// Abilities in grant order
    pub abilities: Vec<AbilityRecord>,
}

impl DataSaveable for CharacterProgression {
    const TYPE_ID: MagicBytes = MagicBytes::CHARACTER;
    const SCHEMA: SchemaVersion = SchemaVersion::CHARACTER_RECORD;
    type Record = CharacterRecord;

    fn before_save(&self) -> CharacterRecord {
        CharacterRecord {
            id: self.id(),
            name: self.name().to_string(),
            curve: self.progression_curve().id(),
            hp: self.hp(),
            maximum_hp: self.maximum_hp(),
            additional_max_hp: self.additional_max_hp(),
            xp_pool: self.xp(),
            level: self.level(),
            stats: self
                .stats()
                .map(|stat| StatRecord {
                    id: stat.id(),
                    local_xp_pool: stat.local_xp_pool(),
                })
                .collect(),
            abilities: self
                .abilities()
                .iter()
                .map(|ability| AbilityRecord {
                    id: ability.id(),
                    applied: ability.is_applied(),
                })
                .collect(),
        }
    }

    fn after_load(record: CharacterRecord, catalog: &Catalog) -> SaveResult<Self> {
        let curve = Arc::clone(catalog.curve(record.curve)?);
        let mut character = CharacterProgression::new(record.name, curve, 0, record.maximum_hp);
        character.restore_state(
            record.id,
            record.hp,
            record.additional_max_hp,
            record.xp_pool,
            record.level,
        );

        for saved in record.stats {
            let definition = Arc::clone(catalog.stat(saved.id)?);
            let name = definition.name().to_string();
            character.add_stat(definition)?;
            if let Some(stat) = character.stat_mut(&name) {
                stat.set_local_xp_pool(saved.local_xp_pool);
            }
        }

        for saved in record.abilities {
            let definition = Arc::clone(catalog.ability(saved.id)?);
            let name = definition.name().to_string();
            character.grant_ability(definition)?;
            if saved.applied {
                character.apply_ability(&name)?;
            }
        }

        Ok(character)
    }
}
