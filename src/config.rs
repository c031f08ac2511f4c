use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::Path};

const MIN_IDLE_INTERVAL_MS: u64 = 1;
const MIN_JOIN_TIMEOUT_MS: u64 = 10;
const MIN_CAPTURE_START_TIMEOUT_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default = "default_idle_interval")]
    pub idle_interval_ms: u64,
    #[serde(default = "default_join_timeout")]
    pub join_timeout_ms: u64,
    #[serde(default = "default_capture_start_timeout")]
    pub capture_start_timeout_ms: u64,
    #[serde(default = "default_action_duration")]
    pub action_duration_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_idle_interval() -> u64 {
    1
}
fn default_join_timeout() -> u64 {
    500
}
fn default_capture_start_timeout() -> u64 {
    1000
}
fn default_action_duration() -> u64 {
    250
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            idle_interval_ms: default_idle_interval(),
            join_timeout_ms: default_join_timeout(),
            capture_start_timeout_ms: default_capture_start_timeout(),
            action_duration_ms: default_action_duration(),
            log_level: default_log_level(),
        }
    }
}

impl InputConfig {
    /// Load config from file, or create default if not exists
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if !path.as_ref().exists() {
            let default_config = Self::default();
            default_config.save_to_file(&path)?;
            return Ok(default_config);
        }
        Self::load_from_file(path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: InputConfig = toml::from_str(&content)?;
        Ok(config.validate())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let commented = format!(
            "idle_interval_ms = {}           # Consumer wait when the buffer is empty (ms, >= 1)\n\
             join_timeout_ms = {}           # Max wait for worker threads on shutdown (ms, >= 10)\n\
             capture_start_timeout_ms = {} # Max wait for the capture hook to register (ms, >= 10)\n\
             action_duration_ms = {}        # How long a key press stays claimable (ms)\n\
             log_level = \"{}\"             # error, warn, info, debug or trace (RUST_LOG overrides)\n",
            self.idle_interval_ms,
            self.join_timeout_ms,
            self.capture_start_timeout_ms,
            self.action_duration_ms,
            self.log_level,
        );

        fs::write(path, commented)?;
        Ok(())
    }

    /// Clamps every timing to its minimum.
    pub fn validate(mut self) -> Self {
        self.idle_interval_ms = self.idle_interval_ms.max(MIN_IDLE_INTERVAL_MS);
        self.join_timeout_ms = self.join_timeout_ms.max(MIN_JOIN_TIMEOUT_MS);
        self.capture_start_timeout_ms = self
            .capture_start_timeout_ms
            .max(MIN_CAPTURE_START_TIMEOUT_MS);
        self
    }

    #[inline(always)]
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    #[inline(always)]
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    #[inline(always)]
    pub fn capture_start_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_start_timeout_ms)
    }

    #[inline(always)]
    pub fn action_duration(&self) -> Duration {
        Duration::from_millis(self.action_duration_ms)
    }
}
