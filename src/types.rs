use std::fmt;

use serde::Deserialize;

use crate::{Error, Result};

/// A vendor enumeration backed by a static `(variant, code, label)` table.
///
/// The table is the single source for both directions of translation:
/// vendor code to variant (decoding poll responses) and host label to
/// variant (parsing host commands).
pub trait VendorEnum: Sized + Copy + PartialEq + fmt::Debug + 'static {
    const KIND: &'static str;
    const TABLE: &'static [(Self, i64, &'static str)];

    fn code(self) -> i64 {
        self.entry().1
    }

    fn label(self) -> &'static str {
        self.entry().2
    }

    fn from_code(code: i64) -> Option<Self> {
        Self::TABLE.iter().find(|(_, c, _)| *c == code).map(|(v, _, _)| *v)
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::TABLE.iter().find(|(_, _, l)| *l == label).map(|(v, _, _)| *v)
    }

    fn decode(code: i64) -> Result<Self> {
        Self::from_code(code)
            .ok_or_else(|| Error::Validation(format!("unknown {} code {code}", Self::KIND)))
    }

    fn parse_label(label: &str) -> Result<Self> {
        Self::from_label(label)
            .ok_or_else(|| Error::Validation(format!("unknown {} {label:?}", Self::KIND)))
    }

    fn all() -> impl Iterator<Item = Self> {
        Self::TABLE.iter().map(|(v, _, _)| *v)
    }

    fn labels() -> Vec<&'static str> {
        Self::TABLE.iter().map(|(_, _, l)| *l).collect()
    }

    fn entry(self) -> &'static (Self, i64, &'static str) {
        Self::TABLE
            .iter()
            .find(|(v, _, _)| *v == self)
            .expect("every variant has a table entry")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    #[serde(alias = "°F", alias = "F")]
    Fahrenheit,
    #[serde(alias = "°C", alias = "C")]
    Celsius,
}

impl VendorEnum for TemperatureUnit {
    const KIND: &'static str = "temperature unit";
    const TABLE: &'static [(Self, i64, &'static str)] = &[
        (TemperatureUnit::Fahrenheit, 0, "°F"),
        (TemperatureUnit::Celsius, 1, "°C"),
    ];
}

impl TemperatureUnit {
    /// Map the host's unit symbol (`°C`, `°F`, or the bare letter).
    pub fn from_host_unit(unit: &str) -> Result<Self> {
        match unit.trim() {
            "°F" | "F" => Ok(TemperatureUnit::Fahrenheit),
            "°C" | "C" => Ok(TemperatureUnit::Celsius),
            other => Err(Error::Validation(format!("unknown temperature unit {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    Off,
    Heat,
    Cool,
    Auto,
    EmergencyHeat,
}

impl VendorEnum for OperatingMode {
    const KIND: &'static str = "operating mode";
    const TABLE: &'static [(Self, i64, &'static str)] = &[
        (OperatingMode::Off, 0, "off"),
        (OperatingMode::Heat, 1, "heat"),
        (OperatingMode::Cool, 2, "cool"),
        (OperatingMode::Auto, 3, "auto"),
        (OperatingMode::EmergencyHeat, 4, "emergency heat"),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanMode {
    Auto,
    On,
    Circulate,
}

impl VendorEnum for FanMode {
    const KIND: &'static str = "fan mode";
    const TABLE: &'static [(Self, i64, &'static str)] = &[
        (FanMode::Auto, 0, "auto"),
        (FanMode::On, 1, "on"),
        (FanMode::Circulate, 2, "circulate"),
    ];
}

/// What the equipment is doing right now, as opposed to what it was told to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    Idle,
    Heating,
    Cooling,
    Waiting,
    Emergency,
}

impl VendorEnum for SystemStatus {
    const KIND: &'static str = "system status";
    const TABLE: &'static [(Self, i64, &'static str)] = &[
        (SystemStatus::Idle, 0, "idle"),
        (SystemStatus::Heating, 1, "heating"),
        (SystemStatus::Cooling, 2, "cooling"),
        (SystemStatus::Waiting, 3, "waiting"),
        (SystemStatus::Emergency, 4, "emergency"),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramMode {
    Manual,
    Scheduled,
}

impl VendorEnum for ProgramMode {
    const KIND: &'static str = "program mode";
    const TABLE: &'static [(Self, i64, &'static str)] = &[
        (ProgramMode::Manual, 0, "manual"),
        (ProgramMode::Scheduled, 1, "scheduled"),
    ];
}

/// Either manual control or an index into the account's program list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramSelection {
    Manual,
    Program(u32),
}

pub const MANUAL_PROGRAM_NAME: &str = "Manual";

/// Vendor string tables available from the lookup endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    OperationMode,
    SystemStatus,
    FanMode,
}

impl LookupKind {
    pub fn as_vendor_str(&self) -> &'static str {
        match self {
            LookupKind::OperationMode => "Operation_Mode",
            LookupKind::SystemStatus => "System_Status",
            LookupKind::FanMode => "Fan_Mode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub serial: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub number: u32,
    pub name: String,
}

/// Last-polled thermostat state. Temperatures are in `unit`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub unit: TemperatureUnit,
    pub temperature: f64,
    pub humidity: f64,
    pub status: SystemStatus,
    pub operating_mode: OperatingMode,
    pub fan_mode: FanMode,
    pub away: bool,
    pub heat_setpoint: f64,
    pub cool_setpoint: f64,
    pub program_mode: ProgramMode,
    pub program_selection: u32,
}

impl Snapshot {
    pub fn program(&self) -> ProgramSelection {
        match self.program_mode {
            ProgramMode::Manual => ProgramSelection::Manual,
            ProgramMode::Scheduled => ProgramSelection::Program(self.program_selection),
        }
    }
}

/// Events emitted when a new snapshot differs from the previous one.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TemperatureChanged { temperature: f64 },
    HumidityChanged { humidity: f64 },
    StatusChanged { status: SystemStatus },
    OperatingModeChanged { mode: OperatingMode },
    FanModeChanged { mode: FanMode },
    AwayModeChanged { away: bool },
    SetpointsChanged { heat: f64, cool: f64 },
    ProgramChanged { program: ProgramSelection },
}
