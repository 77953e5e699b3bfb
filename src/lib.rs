mod climate;
mod client;
mod config;
mod diff;
mod error;
mod logger;
mod protocol;
mod types;

pub use climate::{
    Climate, Feature, STATE_OFF, SUPPORTED_FEATURES, TemperatureRequest, resolve_setpoints,
};
pub use client::{IComfortClient, IComfortClientBuilder};
pub use config::{Config, DEFAULT_SETPOINT_OFFSET, MessageLogConfig};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use protocol::{DEFAULT_BASE_URL, settings_accepted};
pub use types::*;
