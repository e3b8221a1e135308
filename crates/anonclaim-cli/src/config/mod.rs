mod logging;
mod prover;
mod registry;

pub use logging::{LogLevel, LoggingConfig};
pub use prover::{BackendKind, ProverConfig};
pub use registry::{PollConfig, RegistryConfig};

use anonclaim_types::{ClaimError, ClaimResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_FILE: &str = "config.toml";
const MAX_POLL_DELAY_MS: u64 = 60_000;

pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".anonclaim"))
        .unwrap_or_else(|| PathBuf::from(".anonclaim"))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimConfig {
    pub data_dir: PathBuf,
    pub registry: RegistryConfig,
    pub prover: ProverConfig,
    pub poll: PollConfig,
    pub logging: LoggingConfig,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            registry: RegistryConfig::default(),
            prover: ProverConfig::default(),
            poll: PollConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClaimConfig {
    pub fn load(path: impl AsRef<Path>) -> ClaimResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ClaimError::Config(format!("Failed to read config: {}", e)))?;
            toml::from_str(&contents)
                .map_err(|e| ClaimError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ClaimResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ClaimError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClaimError::Config(format!("Failed to create config dir: {}", e)))?;
        }
        std::fs::write(path.as_ref(), contents)
            .map_err(|e| ClaimError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> ClaimResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> ClaimResult<()> {
        if let Some(dir) = var("ANONCLAIM_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(backend) = var("ANONCLAIM_BACKEND") {
            match backend.to_lowercase().as_str() {
                "groth16" => self.prover.backend = BackendKind::Groth16,
                "dev" => self.prover.backend = BackendKind::Dev,
                other => {
                    return Err(ClaimError::Config(format!(
                        "unknown ANONCLAIM_BACKEND {:?}",
                        other
                    )))
                }
            }
        }

        if let Some(price) = var("ANONCLAIM_UNIT_PRICE") {
            if let Ok(p) = price.parse() {
                self.registry.unit_price = p;
            }
        }

        if let Some(attempts) = var("ANONCLAIM_POLL_ATTEMPTS") {
            if let Ok(n) = attempts.parse() {
                self.poll.attempts = n;
            }
        }

        if let Some(delay) = var("ANONCLAIM_POLL_DELAY_MS") {
            if let Ok(ms) = delay.parse() {
                self.poll.delay_ms = ms;
            }
        }

        if let Some(level) = var("ANONCLAIM_LOG_LEVEL") {
            self.logging.level = LogLevel::parse(&level).unwrap_or_default();
        }

        if var("ANONCLAIM_LOG_JSON").is_some() {
            self.logging.json = true;
        }
        Ok(())
    }

    pub fn validate(&self) -> ClaimResult<()> {
        if self.poll.attempts == 0 {
            return Err(ClaimError::Config("poll.attempts must be at least 1".into()));
        }
        if self.poll.delay_ms > MAX_POLL_DELAY_MS {
            return Err(ClaimError::Config(format!(
                "poll.delay_ms cannot exceed {}",
                MAX_POLL_DELAY_MS
            )));
        }

        let paths = [
            ("registry.store", &self.registry.store),
            ("prover.proving_key", &self.prover.proving_key),
            ("prover.verifying_key", &self.prover.verifying_key),
            ("prover.dev_key", &self.prover.dev_key),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(ClaimError::Config(format!("{} cannot be empty", name)));
            }
        }
        Ok(())
    }

    /// Resolves a configured path against the data directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}
