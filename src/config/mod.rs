//! # Configuration Management Module
//!
//! Wildcard reads one application config (`config.toml`) and three game documents it points
//! at. All of them are loaded and validated at startup; a malformed document stops the
//! process instead of being patched up with defaults.
//!
//! ## Documents
//!
//! - [`Config`] - application settings: document paths, session timing, rotation windows,
//!   logging
//! - [`Ranges`] - reward and penalty ranges (`ranges.toml`)
//! - weights - one integer weight per outcome kind (`weights.toml`), see [`parse_weights`]
//! - content - text templates, jokes, media links and trivia (`content.json`), see
//!   [`crate::game::content::ContentDocument`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wildcard::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let documents = config.load_documents().await?;
//!     println!("jackpot pays {}", documents.ranges.jackpot.amount);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [engine]
//! ranges_file = "ranges.toml"
//! weights_file = "weights.toml"
//! content_file = "content.json"
//! data_dir = "./data"
//!
//! [session]
//! timeout_secs = 60
//! suspense_delay_ms = 1500
//! retention_secs = 600
//!
//! [logging]
//! level = "info"
//! file = "wildcard.log"
//! ```

mod error;
pub mod ranges;
pub mod weights;

pub use error::ConfigError;
pub use ranges::{AmountRange, Ranges};
pub use weights::{parse_weights, validate_weights, weights_to_toml};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

use crate::game::content::ContentDocument;
use crate::game::outcome::OutcomeWeights;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub ranges_file: String,
    pub weights_file: String,
    pub content_file: String,
    /// Directory for the JSON ledger used by the console host.
    pub data_dir: String,
    /// Fixed RNG seed for reproducible runs. Unset means seeded from entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Balance granted to a subject the file ledger has never seen.
    #[serde(default = "default_starting_balance")]
    pub starting_balance: i64,
}

fn default_starting_balance() -> i64 {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long an interactive outcome waits for its owner.
    pub timeout_secs: u64,
    /// Interim "suspense" message lifetime before a coin flip or steal result. 0 disables it.
    #[serde(default)]
    pub suspense_delay_ms: u64,
    /// How long resolved/expired sessions are remembered to reject late clicks.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

fn default_retention_secs() -> u64 {
    600
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
    pub fn suspense_delay(&self) -> Duration {
        Duration::from_millis(self.suspense_delay_ms)
    }
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            suspense_delay_ms: 1500,
            retention_secs: default_retention_secs(),
        }
    }
}

/// Recency window capacity per content pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    pub jokes: usize,
    pub media: usize,
    pub trivia: usize,
    /// Applied to each text template set.
    pub templates: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            jokes: 150,
            media: 20,
            trivia: 50,
            templates: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    pub logging: LoggingConfig,
}

/// The three validated game documents.
#[derive(Debug, Clone)]
pub struct GameDocuments {
    pub ranges: Ranges,
    pub weights: OutcomeWeights,
    pub content: ContentDocument,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        if config.session.timeout_secs == 0 {
            return Err(anyhow!(
                "Invalid config file {}: session.timeout_secs must be positive",
                path
            ));
        }
        Ok(config)
    }

    /// Read and validate the ranges, weights and content documents.
    pub async fn load_documents(&self) -> Result<GameDocuments> {
        let ranges_text = read_document(&self.engine.ranges_file).await?;
        let ranges = Ranges::parse(&ranges_text)
            .map_err(|e| anyhow!("{}: {}", self.engine.ranges_file, e))?;

        let weights_text = read_document(&self.engine.weights_file).await?;
        let weights = parse_weights(&weights_text)
            .map_err(|e| anyhow!("{}: {}", self.engine.weights_file, e))?;

        let content_text = read_document(&self.engine.content_file).await?;
        let content = ContentDocument::parse(&content_text)
            .map_err(|e| anyhow!("{}: {}", self.engine.content_file, e))?;

        Ok(GameDocuments {
            ranges,
            weights,
            content,
        })
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Write stock ranges, weights and content documents to the configured paths.
    pub async fn create_default_documents(&self) -> Result<()> {
        let ranges = Ranges::default()
            .to_toml()
            .map_err(|e| anyhow!("Failed to serialize default ranges: {}", e))?;
        write_document(&self.engine.ranges_file, ranges).await?;
        write_document(
            &self.engine.weights_file,
            weights_to_toml(&OutcomeWeights::default()),
        )
        .await?;
        let content = serde_json::to_string_pretty(&ContentDocument::default())
            .map_err(|e| anyhow!("Failed to serialize default content: {}", e))?;
        write_document(&self.engine.content_file, content).await
    }
}

async fn read_document(path: &str) -> Result<String> {
    fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("Failed to read {}: {}", path, e))
}

async fn write_document(path: &str, content: String) -> Result<()> {
    fs::write(path, content)
        .await
        .map_err(|e| anyhow!("Failed to write {}: {}", path, e))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            engine: EngineConfig {
                ranges_file: "ranges.toml".to_string(),
                weights_file: "weights.toml".to_string(),
                content_file: "content.json".to_string(),
                data_dir: "./data".to_string(),
                seed: None,
                starting_balance: default_starting_balance(),
            },
            session: SessionConfig::default(),
            rotation: RotationConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("wildcard.log".to_string()),
            },
        }
    }
}
