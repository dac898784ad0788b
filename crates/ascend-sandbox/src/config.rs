//! Sandbox configuration.
//!
//! Names the catalog and save locations and describes the character `new`
//! creates. Loaded from `ascend.toml`; every field has a default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use ascend_progression::catalog_file::DEFAULT_CATALOG_PATH;

/// Configuration file name.
pub const CONFIG_FILE: &str = "ascend.toml";

/// Sandbox configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    // === Data Locations ===
    /// Directory of catalog `.ron` files
    pub catalog_dir: PathBuf,
    /// Directory of save files
    pub save_dir: PathBuf,
    /// Save name of the sandbox character
    pub save_name: String,

    // === New Character ===
    /// Character name
    pub character_name: String,
    /// Progression curve name
    pub curve: String,
    /// Starting HP
    pub starting_hp: u32,
    /// Base maximum HP
    pub maximum_hp: u32,
    /// XP granted at creation (settled into levels)
    pub starting_xp: u32,
    /// Stat names, in order
    pub stats: Vec<String>,
    /// Ability names, in order
    pub abilities: Vec<String>,

    // === Events ===
    /// Event bus capacity
    pub event_capacity: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            catalog_dir: PathBuf::from(DEFAULT_CATALOG_PATH),
            save_dir: PathBuf::from("saves"),
            save_name: "sandbox".to_string(),

            character_name: "Tester".to_string(),
            curve: "Normal".to_string(),
            starting_hp: 100,
            maximum_hp: 100,
            starting_xp: 0,
            stats: Vec::new(),
            abilities: Vec::new(),

            event_capacity: 256,
        }
    }
}

impl SandboxConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                info!("Loaded config from {}", path.display());
                config.validate();
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp values into usable ranges.
    pub fn validate(&mut self) {
        self.maximum_hp = self.maximum_hp.max(1);
        self.starting_hp = self.starting_hp.min(self.maximum_hp);
        self.event_capacity = self.event_capacity.max(1);
        if self.save_name.trim().is_empty() {
            warn!("Empty save name in config, using default");
            self.save_name = Self::default().save_name;
        }
    }
}
