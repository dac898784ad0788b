//! Catalog authoring format.
//!
//! This module provides:
//! - RON catalog files (`assets/progression/*.ron`)
//! - Name-based source references, resolved to stat IDs on load
//! - Merging every file of a directory into one [`Catalog`]
//!
//! A catalog file looks like:
//!
//! ```ron
//! (
//!     version: "1.0.0",
//!     curves: [
//!         (name: "Normal", level_multiplier: 10.0, old_threshold_multiplier: 1.0, base_threshold: 100),
//!     ],
//!     stats: [
//!         (name: "Strength", kind: Base),
//!         (name: "Might", kind: Secondary, sources: [(stat: "Strength", weight: 100.0)]),
//!     ],
//!     abilities: [
//!         (name: "Fireball", modifiers: [(name: "Burn")]),
//!     ],
//! )
//! ```
//!
//! Entries without an explicit `id` get one derived from their name, so the
//! same file always produces the same IDs and saved characters keep
//! resolving after a reload.

use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use ascend_common::{AbilityId, CurveId, SchemaVersion, StatId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ability::{AbilityDefinition, AbilityModifier};
use crate::catalog::Catalog;
use crate::curve::ProgressionCurve;
use crate::error::ProgressionError;
use crate::stat::{StatDefinition, StatKind, StatSource};

/// Default asset path for catalog files.
pub const DEFAULT_CATALOG_PATH: &str = "assets/progression";

/// File extension of catalog files.
pub const CATALOG_EXTENSION: &str = "ron";

/// Errors that can occur during catalog loading.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    /// File or directory not found.
    #[error("Catalog path not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read catalog file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse RON.
    #[error("Failed to parse catalog RON: {0}")]
    ParseError(#[from] ron::error::SpannedError),

    /// File content is unusable.
    #[error("Catalog validation error: {0}")]
    ValidationError(String),

    /// An entry was rejected by the catalog.
    #[error("Catalog entry rejected: {0}")]
    Progression(#[from] ProgressionError),
}

/// Result type for catalog loading operations.
pub type CatalogLoadResult<T> = Result<T, CatalogLoadError>;

// ============================================================================
// File entries
// ============================================================================

/// Progression curve as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveEntry {
    /// Explicit ID (derived from the name if absent).
    #[serde(default)]
    pub id: Option<CurveId>,
    /// Curve name.
    pub name: String,
    /// Weight of the level number in each threshold.
    pub level_multiplier: f32,
    /// Weight of the previous threshold in each threshold.
    pub old_threshold_multiplier: f32,
    /// Threshold at level 0.
    pub base_threshold: u64,
}

/// Weighted source of a derived stat, referencing the source by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Source stat name.
    pub stat: String,
    /// Weight in percent.
    pub weight: f32,
}

/// Stat definition as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatEntry {
    /// Explicit ID (derived from the name if absent).
    #[serde(default)]
    pub id: Option<StatId>,
    /// Stat name.
    pub name: String,
    /// Stat kind.
    pub kind: StatKind,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Upper bound on raw points (0 = unbounded).
    #[serde(default)]
    pub absolute_maximum: u32,
    /// Multiplier applied after clamping.
    #[serde(default = "default_use_factor")]
    pub use_factor: f32,
    /// Weighted sources (derived stats only).
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

const fn default_use_factor() -> f32 {
    1.0
}

/// Ability definition as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityEntry {
    /// Explicit ID (derived from the name if absent).
    #[serde(default)]
    pub id: Option<AbilityId>,
    /// Ability name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Modifiers, in order.
    #[serde(default)]
    pub modifiers: Vec<AbilityModifier>,
}

/// A collection of authored entries from one or more files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    /// File format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Progression curves.
    #[serde(default)]
    pub curves: Vec<CurveEntry>,
    /// Stat definitions.
    #[serde(default)]
    pub stats: Vec<StatEntry>,
    /// Ability definitions.
    #[serde(default)]
    pub abilities: Vec<AbilityEntry>,
}

fn default_version() -> String {
    SchemaVersion::CATALOG_FILE.to_string()
}

impl Default for CatalogFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            curves: Vec::new(),
            stats: Vec::new(),
            abilities: Vec::new(),
        }
    }
}

impl CatalogFile {
    /// Parses a catalog file from RON text.
    pub fn from_ron_str(content: &str) -> CatalogLoadResult<Self> {
        let file: Self = ron::from_str(content)?;
        file.check_version()?;
        Ok(file)
    }

    /// Loads one catalog file.
    pub fn load_file(path: &Path) -> CatalogLoadResult<Self> {
        debug!("Loading catalog file: {:?}", path);
        if !path.exists() {
            return Err(CatalogLoadError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let file = Self::from_ron_str(&content)?;
        debug!(
            "Loaded {} curves, {} stats, {} abilities from {:?}",
            file.curves.len(),
            file.stats.len(),
            file.abilities.len(),
            path
        );
        Ok(file)
    }

    /// Loads and merges every `.ron` file in a directory, in file name
    /// order.
    pub fn load_dir(dir: &Path) -> CatalogLoadResult<Self> {
        if !dir.is_dir() {
            return Err(CatalogLoadError::NotFound(dir.to_path_buf()));
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == CATALOG_EXTENSION))
            .collect();
        paths.sort();

        if paths.is_empty() {
            warn!("No catalog files in {:?}", dir);
        }

        let mut merged = Self::default();
        for path in &paths {
            let file = Self::load_file(path).map_err(|e| {
                warn!("Failed to load catalog file {:?}: {}", path, e);
                e
            })?;
            merged.merge(file);
        }

        info!(
            "Loaded {} curves, {} stats, {} abilities from {} files",
            merged.curves.len(),
            merged.stats.len(),
            merged.abilities.len(),
            paths.len()
        );
        Ok(merged)
    }

    /// Appends another file's entries.
    pub fn merge(&mut self, other: Self) {
        self.curves.extend(other.curves);
        self.stats.extend(other.stats);
        self.abilities.extend(other.abilities);
    }

    fn check_version(&self) -> CatalogLoadResult<()> {
        let version: SchemaVersion = self
            .version
            .parse()
            .map_err(CatalogLoadError::ValidationError)?;
        if !SchemaVersion::CATALOG_FILE.can_read(&version) {
            return Err(CatalogLoadError::ValidationError(format!(
                "unsupported catalog version {version} (supported: {})",
                SchemaVersion::CATALOG_FILE
            )));
        }
        Ok(())
    }

    /// Builds and validates a catalog from the entries.
    pub fn into_catalog(self) -> CatalogLoadResult<Catalog> {
        // Explicit IDs win over name-derived ones when resolving sources.
        let stat_ids: AHashMap<&str, StatId> = self
            .stats
            .iter()
            .map(|s| (s.name.as_str(), s.id.unwrap_or_else(|| StatId::from_name(&s.name))))
            .collect();

        let mut catalog = Catalog::new();

        for entry in &self.curves {
            let mut curve = ProgressionCurve::new(
                entry.name.clone(),
                entry.level_multiplier,
                entry.old_threshold_multiplier,
                entry.base_threshold,
            )?;
            if let Some(id) = entry.id {
                curve = curve.with_id(id);
            }
            catalog.insert(curve)?;
        }

        for entry in &self.stats {
            let sources = entry
                .sources
                .iter()
                .map(|source| {
                    let id = stat_ids
                        .get(source.stat.as_str())
                        .copied()
                        .ok_or_else(|| ProgressionError::SourceStatMissing {
                            stat: entry.name.clone(),
                            source_id: StatId::from_name(&source.stat),
                        })?;
                    Ok(StatSource::new(id, source.weight))
                })
                .collect::<Result<Vec<_>, ProgressionError>>()?;

            let mut builder = StatDefinition::builder(entry.name.clone(), entry.kind)
                .description(entry.description.clone())
                .absolute_maximum(entry.absolute_maximum)
                .use_factor(entry.use_factor)
                .sources(sources);
            if let Some(id) = entry.id {
                builder = builder.id(id);
            }
            catalog.insert(builder.build()?)?;
        }

        for entry in self.abilities {
            let mut ability = AbilityDefinition::new(entry.name).with_description(entry.description);
            if let Some(id) = entry.id {
                ability = ability.with_id(id);
            }
            for modifier in entry.modifiers {
                ability = ability.with_modifier(modifier);
            }
            catalog.insert(ability)?;
        }

        catalog.validate()?;
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EntryKind;

    const CORE: &str = r#"
        (
            version: "1.0.0",
            curves: [
                (name: "Normal", level_multiplier: 10.0, old_threshold_multiplier: 1.0, base_threshold: 100),
            ],
            stats: [
                (name: "Strength", kind: Base),
                (name: "Agility", kind: Base, absolute_maximum: 50),
                (
                    name: "Might",
                    kind: Secondary,
                    use_factor: 2.0,
                    sources: [(stat: "Strength", weight: 75.0), (stat: "Agility", weight: 25.0)],
                ),
            ],
            abilities: [
                (name: "Fireball", description: "Hurls fire", modifiers: [(name: "Burn")]),
            ],
        )
    "#;

    #[test]
    fn test_parse_and_build() {
        let catalog = CatalogFile::from_ron_str(CORE)
            .and_then(CatalogFile::into_catalog)
            .expect("valid catalog");

        assert_eq!(catalog.len_of(EntryKind::Curve), 1);
        assert_eq!(catalog.len_of(EntryKind::Stat), 3);
        assert_eq!(catalog.len_of(EntryKind::Ability), 1);

        let might = catalog.stat_by_name("Might").expect("present");
        assert_eq!(might.kind(), StatKind::Secondary);
        assert_eq!(might.sources()[0].stat, StatId::from_name("Strength"));
        assert!((might.use_factor() - 2.0).abs() < f32::EPSILON);

        let fireball = catalog.ability_by_name("Fireball").expect("present");
        assert_eq!(fireball.modifiers().len(), 1);
    }

    #[test]
    fn test_ids_are_stable_across_loads() {
        let first = CatalogFile::from_ron_str(CORE)
            .and_then(CatalogFile::into_catalog)
            .expect("valid catalog");
        let second = CatalogFile::from_ron_str(CORE)
            .and_then(CatalogFile::into_catalog)
            .expect("valid catalog");
        let ids = |c: &Catalog| c.stats().map(|s| s.id()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_explicit_id_used_for_sources() {
        let id = StatId::new();
        let file = CatalogFile {
            stats: vec![
                StatEntry {
                    id: Some(id),
                    name: "Strength".to_string(),
                    kind: StatKind::Base,
                    description: String::new(),
                    absolute_maximum: 0,
                    use_factor: 1.0,
                    sources: Vec::new(),
                },
                StatEntry {
                    id: None,
                    name: "Might".to_string(),
                    kind: StatKind::Secondary,
                    description: String::new(),
                    absolute_maximum: 0,
                    use_factor: 1.0,
                    sources: vec![SourceEntry {
                        stat: "Strength".to_string(),
                        weight: 100.0,
                    }],
                },
            ],
            ..CatalogFile::default()
        };
        let catalog = file.into_catalog().expect("valid catalog");
        let might = catalog.stat_by_name("Might").expect("present");
        assert_eq!(might.sources()[0].stat, id);
    }

    #[test]
    fn test_unknown_source_rejected() {
        let content = r#"(stats: [(name: "Might", kind: Secondary, sources: [(stat: "Ghost", weight: 10.0)])])"#;
        let result = CatalogFile::from_ron_str(content).and_then(CatalogFile::into_catalog);
        assert!(matches!(
            result,
            Err(CatalogLoadError::Progression(ProgressionError::SourceStatMissing { .. }))
        ));
    }

    #[test]
    fn test_invalid_entries_rejected() {
        let bad_curve = r#"(curves: [(name: "Zero", level_multiplier: 1.0, old_threshold_multiplier: 1.0, base_threshold: 0)])"#;
        assert!(CatalogFile::from_ron_str(bad_curve)
            .and_then(CatalogFile::into_catalog)
            .is_err());

        let base_with_sources = r#"(stats: [
            (name: "Strength", kind: Base),
            (name: "Odd", kind: Base, sources: [(stat: "Strength", weight: 10.0)]),
        ])"#;
        assert!(CatalogFile::from_ron_str(base_with_sources)
            .and_then(CatalogFile::into_catalog)
            .is_err());

        assert!(matches!(
            CatalogFile::from_ron_str("(stats: [(name: \"Strength\")])"),
            Err(CatalogLoadError::ParseError(_))
        ));
    }

    #[test]
    fn test_newer_major_version_rejected() {
        assert!(matches!(
            CatalogFile::from_ron_str(r#"(version: "2.0.0")"#),
            Err(CatalogLoadError::ValidationError(_))
        ));
        assert!(CatalogFile::from_ron_str(r#"(version: "1.4.0")"#).is_ok());
    }

    #[test]
    fn test_load_dir_merges_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join("a_stats.ron"),
            r#"(stats: [(name: "Strength", kind: Base)])"#,
        )
        .expect("write");
        fs::write(
            dir.path().join("b_skills.ron"),
            r#"(stats: [(name: "Swordplay", kind: Skill, sources: [(stat: "Strength", weight: 50.0)])])"#,
        )
        .expect("write");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let catalog = CatalogFile::load_dir(dir.path())
            .and_then(CatalogFile::into_catalog)
            .expect("valid catalog");
        assert_eq!(catalog.len_of(EntryKind::Stat), 2);
        assert!(catalog.stat_by_name("Swordplay").is_ok());
    }

    #[test]
    fn test_shipped_catalog_loads() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .join(DEFAULT_CATALOG_PATH);
        let catalog = CatalogFile::load_dir(&dir)
            .and_then(CatalogFile::into_catalog)
            .expect("shipped catalog is valid");
        assert!(catalog.curve_by_name("Normal").is_ok());
        assert!(catalog.stat_by_name("Swordplay").is_ok());
        assert!(catalog.ability_by_name("Fireball").is_ok());
    }

    #[test]
    fn test_load_missing_paths() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(matches!(
            CatalogFile::load_dir(&dir.path().join("absent")),
            Err(CatalogLoadError::NotFound(_))
        ));
        assert!(matches!(
            CatalogFile::load_file(&dir.path().join("absent.ron")),
            Err(CatalogLoadError::NotFound(_))
        ));
    }
}
