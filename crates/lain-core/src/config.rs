//! Configuration.
//!
//! Values come from defaults, then an optional TOML file, then environment
//! variables. The CLI applies its own flags last.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{LainError, LainResult};
use crate::prompts::default_prompts;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "lain-tv.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LainConfig {
    pub server: ServerConfig,
    pub broadcast: BroadcastConfig,
    pub inference: InferenceConfig,
    pub speech: SpeechConfig,
    pub viewer: ViewerConfig,
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Delay before the first tick, so early viewers can connect.
    pub warmup_secs: u64,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    pub history_capacity: usize,
    /// Per-session outbound buffer, in messages.
    pub session_buffer: usize,
    pub prompts: Vec<String>,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            warmup_secs: 5,
            min_interval_secs: 15,
            max_interval_secs: 30,
            history_capacity: 50,
            session_buffer: 32,
            prompts: default_prompts(),
        }
    }
}

impl BroadcastConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8001".to_string(),
            timeout_secs: 30,
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub url: String,
    pub voice_id: String,
    pub speed: f32,
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8002".to_string(),
            voice_id: "p225".to_string(),
            speed: 1.0,
            timeout_secs: 20,
        }
    }
}

impl SpeechConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub server_url: String,
    pub dedup_capacity: usize,
    /// Pause between two spoken lines.
    pub pause_ms: u64,
    pub reconnect_secs: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:3030/ws".to_string(),
            dedup_capacity: 256,
            pause_ms: 500,
            reconnect_secs: 3,
        }
    }
}

impl ViewerConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_secs)
    }
}

impl LainConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `lain-tv.toml` in the
    /// working directory is used when present. Environment overrides are
    /// applied afterwards and the result is validated.
    pub fn load(path: Option<&Path>) -> LainResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file.
    pub fn from_file(path: &Path) -> LainResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&raw)
            .map_err(|e| LainError::config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Parse TOML text.
    pub fn from_toml(raw: &str) -> LainResult<Self> {
        toml::from_str(raw).map_err(|e| LainError::config(e.to_string()))
    }

    /// Apply overrides looked up by variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> LainResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LAIN_INFERENCE_URL") {
            self.inference.url = url;
        }
        if let Some(url) = lookup("LAIN_SPEECH_URL") {
            self.speech.url = url;
        }
        if let Some(url) = lookup("REDIS_URL") {
            self.redis_url = Some(url);
        }
        if let Some(host) = lookup("LAIN_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("LAIN_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| LainError::config(format!("LAIN_PORT is not a port: {}", port)))?;
        }
        Ok(())
    }

    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> LainResult<()> {
        let b = &self.broadcast;
        if b.min_interval_secs == 0 {
            return Err(LainError::config("broadcast.min_interval_secs must be positive"));
        }
        if b.min_interval_secs > b.max_interval_secs {
            return Err(LainError::config(format!(
                "broadcast interval range is inverted: {} > {}",
                b.min_interval_secs, b.max_interval_secs
            )));
        }
        if b.history_capacity == 0 {
            return Err(LainError::config("broadcast.history_capacity must be positive"));
        }
        if b.session_buffer == 0 {
            return Err(LainError::config("broadcast.session_buffer must be positive"));
        }
        if b.prompts.iter().all(|p| p.trim().is_empty()) {
            return Err(LainError::config("broadcast.prompts is empty"));
        }
        if self.inference.timeout_secs == 0 || self.speech.timeout_secs == 0 {
            return Err(LainError::config("service timeouts must be positive"));
        }
        if self.speech.speed.is_nan() || self.speech.speed <= 0.0 {
            return Err(LainError::config("speech.speed must be positive"));
        }
        if self.viewer.dedup_capacity == 0 {
            return Err(LainError::config("viewer.dedup_capacity must be positive"));
        }
        Ok(())
    }
}
