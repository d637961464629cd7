use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_starting_lives")]
    pub starting_lives: u8,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_stats_interval_ms")]
    pub stats_interval_ms: u64,
    #[serde(default = "default_quest_settle_ms")]
    pub quest_settle_ms: u64,
    #[serde(default = "default_oracle_timeout_secs")]
    pub oracle_timeout_secs: u64,
    /// Artificial delay of the built-in oracle, so loading states are visible.
    #[serde(default = "default_oracle_latency_ms")]
    pub oracle_latency_ms: u64,
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_starting_lives() -> u8 {
    3
}
fn default_theme() -> String {
    "catppuccin-mocha".to_string()
}
fn default_stats_interval_ms() -> u64 {
    1000
}
fn default_quest_settle_ms() -> u64 {
    100
}
fn default_oracle_timeout_secs() -> u64 {
    30
}
fn default_oracle_latency_ms() -> u64 {
    350
}
fn default_tick_rate_ms() -> u64 {
    100
}
fn default_log_file() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taletype")
        .join("taletype.log")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            starting_lives: default_starting_lives(),
            theme: default_theme(),
            stats_interval_ms: default_stats_interval_ms(),
            quest_settle_ms: default_quest_settle_ms(),
            oracle_timeout_secs: default_oracle_timeout_secs(),
            oracle_latency_ms: default_oracle_latency_ms(),
            tick_rate_ms: default_tick_rate_ms(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("taletype")
            .join("config.toml")
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms.max(1))
    }

    pub fn quest_settle_delay(&self) -> Duration {
        Duration::from_millis(self.quest_settle_ms.max(1))
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs.max(1))
    }

    pub fn oracle_latency(&self) -> Duration {
        Duration::from_millis(self.oracle_latency_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(10))
    }
}
