use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default polling interval between two energy calculations
pub const DEFAULT_INTERVAL_MS: u64 = 500;

/// Default name of the shared energy segment
#[cfg(windows)]
pub const DEFAULT_SEGMENT_NAME: &str = "Local\\EcoFlocEnergy";
#[cfg(not(windows))]
pub const DEFAULT_SEGMENT_NAME: &str = "/ecofloc_energy";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Rated processor figures used by the capacitance model
    #[serde(default)]
    pub cpu: Option<CpuProfile>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub shared_memory: SharedMemoryConfig,
}

/// Rated processor characteristics.
///
/// `clock_speed` uses the same unit as the clocks returned by the sensor
/// provider (Hz for the bundled providers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuProfile {
    pub tdp: f64,
    pub clock_speed: f64,
    pub voltage: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Drop cached counters for processes no longer monitored.
    /// Off by default: the cache grows with every instance ever seen.
    #[serde(default)]
    pub evict_stale_counters: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedMemoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_segment_name")]
    pub name: String,
}

impl Default for SharedMemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: default_segment_name(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            cpu: None,
            storage: StorageConfig::default(),
            shared_memory: SharedMemoryConfig::default(),
        }
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_true() -> bool {
    true
}

fn default_segment_name() -> String {
    DEFAULT_SEGMENT_NAME.to_string()
}

impl CpuProfile {
    /// True when every rated figure can feed the capacitance model
    pub fn is_usable(&self) -> bool {
        [self.tdp, self.clock_speed, self.voltage]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

impl Config {
    /// Load the configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load the configuration from an explicit path.
    ///
    /// A missing or empty file yields the defaults.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            log::debug!("No config at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        let data = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        if data.trim().is_empty() {
            return Ok(Config::default());
        }

        let config: Config = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        if config.interval_ms == 0 {
            anyhow::bail!("interval_ms must be greater than zero in {:?}", config_path);
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(config_path, data)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("ecofloc").join("config.json"))
    }

    /// The processor profile, if it is complete enough for the derived power model
    pub fn usable_cpu_profile(&self) -> Option<CpuProfile> {
        self.cpu.filter(CpuProfile::is_usable)
    }
}
