use std::path::Path;

use serde::Deserialize;

use crate::logger::MessageLogMode;
use crate::types::TemperatureUnit;
use crate::{Error, Result};

pub const DEFAULT_SETPOINT_OFFSET: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageLogConfig {
    pub mode: MessageLogMode,
    pub path: String,
}

/// Settings for one climate entity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub username: String,
    pub password: String,
    /// Display name; the vendor's system name is used when empty.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub system: usize,
    #[serde(default)]
    pub zone: usize,
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Gap kept between the two setpoints when only one is given.
    #[serde(default = "default_setpoint_offset")]
    pub setpoint_offset: f64,
    #[serde(default)]
    pub message_log: Option<MessageLogConfig>,
}

fn default_setpoint_offset() -> f64 {
    DEFAULT_SETPOINT_OFFSET
}

impl Config {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            name: String::new(),
            system: 0,
            zone: 0,
            temperature_unit: TemperatureUnit::default(),
            base_url: None,
            setpoint_offset: DEFAULT_SETPOINT_OFFSET,
            message_log: None,
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(s)
            .map_err(|e| Error::Validation(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Read `ICOMFORT_USERNAME` and `ICOMFORT_PASSWORD`, plus the optional
    /// `ICOMFORT_NAME`, `ICOMFORT_SYSTEM`, `ICOMFORT_ZONE` and `ICOMFORT_UNIT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| Error::Validation(format!("{key} is not set")))
        };
        let index = |key: &str| -> Result<usize> {
            match lookup(key) {
                Some(v) => v
                    .trim()
                    .parse()
                    .map_err(|_| Error::Validation(format!("{key} is not an index: {v:?}"))),
                None => Ok(0),
            }
        };

        let mut config = Config::new(
            required("ICOMFORT_USERNAME")?,
            required("ICOMFORT_PASSWORD")?,
        );
        config.name = lookup("ICOMFORT_NAME").unwrap_or_default();
        config.system = index("ICOMFORT_SYSTEM")?;
        config.zone = index("ICOMFORT_ZONE")?;
        if let Some(unit) = lookup("ICOMFORT_UNIT") {
            config.temperature_unit = TemperatureUnit::from_host_unit(&unit)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(Error::Validation("username must not be empty".into()));
        }
        if !self.setpoint_offset.is_finite() || self.setpoint_offset < 0.0 {
            return Err(Error::Validation(format!(
                "setpoint_offset must be a non-negative number, got {}",
                self.setpoint_offset
            )));
        }
        Ok(())
    }
}
