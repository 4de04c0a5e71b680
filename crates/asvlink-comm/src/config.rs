//! Line and controller configuration.
//!
//! The controller reads its module table from YAML:
//!
//! ```yaml
//! modules:
//!   depth_meter:
//!     enabled: true
//!     listener:
//!       port: /dev/ttySC0
//!       baudrate: 921600
//!       timeout: 500ms
//!       sync: true
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use asvlink_frame::ModuleId;
use asvlink_transport::{SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
use serde::{Deserialize, Serialize};

use crate::error::{CommError, Result};
use crate::retry::RetryPolicy;

/// Image bytes per chunk when the config leaves it unset.
pub const DEFAULT_CHUNK_SIZE: usize = 250;

/// Receive attempts per message when the config leaves it unset.
pub const DEFAULT_RETRIES_LIMIT: usize = 10;

/// Parse `"500ms"`, `"5s"` or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CommError::Config("duration must not be empty".to_string()));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CommError::Config(format!("invalid duration value: {input}")))?;

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Settings for one module line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub port: String,
    #[serde(default = "default_baud_rate", alias = "baudrate")]
    pub baud_rate: u32,
    #[serde(default = "default_timeout", with = "duration_text")]
    pub timeout: Duration,
    /// Acknowledge every message (controller) or wait for the acknowledgement
    /// (module).
    #[serde(default = "default_ack", alias = "sync")]
    pub ack: bool,
    #[serde(default)]
    pub chunk_size: usize,
    #[serde(default)]
    pub retries_limit: usize,
}

impl LinkConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_READ_TIMEOUT,
            ack: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retries_limit: DEFAULT_RETRIES_LIMIT,
        }
    }

    /// Replace zero chunk size and retry limit with the defaults.
    pub fn apply_defaults(&mut self) {
        if self.chunk_size == 0 {
            self.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        if self.retries_limit == 0 {
            self.retries_limit = DEFAULT_RETRIES_LIMIT;
        }
    }

    pub fn serial(&self) -> SerialConfig {
        SerialConfig::new(self.port.clone())
            .with_baud_rate(self.baud_rate)
            .with_timeout(self.timeout)
    }

    /// Receive retry policy for this line (no pause between attempts).
    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries_limit, Duration::ZERO)
    }
}

/// One entry of the controller's module table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConnectionConfig {
    pub listener: LinkConfig,
    #[serde(default)]
    pub enabled: bool,
}

/// Controller module table, keyed by module name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConnectionConfig>,
}

impl ControllerConfig {
    /// Parse a YAML module table and fill in defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let mut config: ControllerConfig = serde_yaml::from_str(text)
            .map_err(|err| CommError::Config(format!("failed to parse config: {err}")))?;
        for entry in config.modules.values_mut() {
            entry.listener.apply_defaults();
        }
        Ok(config)
    }

    /// Load a `.yaml`/`.yml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        if !is_yaml {
            return Err(CommError::Config(format!(
                "config file must be yaml: {}",
                path.display()
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|err| {
            CommError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Enabled modules with their resolved ids, in name order.
    ///
    /// An enabled entry whose name is not a known module is an error.
    pub fn enabled_modules(&self) -> Result<Vec<(ModuleId, &LinkConfig)>> {
        self.modules
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(name, entry)| {
                ModuleId::from_name(name)
                    .map(|module| (module, &entry.listener))
                    .ok_or_else(|| CommError::Config(format!("unknown module: {name}")))
            })
            .collect()
    }
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_timeout() -> Duration {
    DEFAULT_READ_TIMEOUT
}

fn default_ack() -> bool {
    true
}

mod duration_text {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}ms", value.as_millis()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => super::parse_duration(&text).map_err(de::Error::custom),
        }
    }
}
