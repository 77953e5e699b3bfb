use tracing::debug;

use crate::client::IComfortClient;
use crate::config::{Config, DEFAULT_SETPOINT_OFFSET};
use crate::types::*;
use crate::{Error, Result};

/// Host-visible state labels beyond the operating-mode vocabulary.
pub const STATE_OFF: &str = "off";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    TargetTemperature,
    TargetTemperatureRange,
    AwayMode,
    FanMode,
    OperationMode,
    OnOff,
}

pub const SUPPORTED_FEATURES: &[Feature] = &[
    Feature::TargetTemperature,
    Feature::TargetTemperatureRange,
    Feature::AwayMode,
    Feature::FanMode,
    Feature::OperationMode,
    Feature::OnOff,
];

/// A host "set temperature" call. Single-setpoint modes read `temperature`;
/// auto mode reads the low/high pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TemperatureRequest {
    pub temperature: Option<f64>,
    pub target_low: Option<f64>,
    pub target_high: Option<f64>,
}

impl TemperatureRequest {
    pub fn single(temperature: f64) -> Self {
        Self {
            temperature: Some(temperature),
            ..Default::default()
        }
    }

    pub fn range(low: f64, high: f64) -> Self {
        Self {
            target_low: Some(low),
            target_high: Some(high),
            ..Default::default()
        }
    }
}

/// Work out the `(heat, cool)` setpoints for a request in `mode`.
///
/// In heat or cool mode the other setpoint is placed `offset` away from the
/// requested one. Both results must be finite.
pub fn resolve_setpoints(
    mode: OperatingMode,
    request: &TemperatureRequest,
    offset: f64,
) -> Result<(f64, f64)> {
    let (heat, cool) = setpoints_for(mode, request, offset)?;
    if !heat.is_finite() || !cool.is_finite() {
        return Err(Error::Validation(format!(
            "setpoints must be finite, got heat {heat} cool {cool}"
        )));
    }
    Ok((heat, cool))
}

fn setpoints_for(
    mode: OperatingMode,
    request: &TemperatureRequest,
    offset: f64,
) -> Result<(f64, f64)> {
    match (mode, request.temperature) {
        (OperatingMode::Auto, _) => match (request.target_low, request.target_high) {
            (Some(low), Some(high)) => Ok((low, high)),
            _ => Err(Error::Validation(
                "auto mode needs both a low and a high target".into(),
            )),
        },
        (OperatingMode::Heat, Some(t)) => Ok((t, t + offset)),
        (OperatingMode::Cool, Some(t)) => Ok((t - offset, t)),
        (OperatingMode::Heat | OperatingMode::Cool, None) => Err(Error::Validation(format!(
            "{} mode needs a single target temperature",
            mode.label()
        ))),
        (OperatingMode::Off | OperatingMode::EmergencyHeat, _) => Err(Error::Validation(
            format!("cannot set a target temperature in {} mode", mode.label()),
        )),
    }
}

/// Climate entity backed by one iComfort thermostat zone.
///
/// Getters read the client's last snapshot and return `None` until one
/// exists. Every mutation goes through the client and surfaces its error.
pub struct Climate {
    name: String,
    client: IComfortClient,
    setpoint_offset: f64,
}

impl Climate {
    /// Build the client from `config`, connect, and take the first snapshot.
    pub async fn setup(config: &Config) -> Result<Self> {
        debug!(
            system = config.system,
            zone = config.zone,
            unit = ?config.temperature_unit,
            "initializing iComfort climate"
        );

        let mut builder = IComfortClient::builder(&config.username, &config.password);
        if let Some(ref url) = config.base_url {
            builder = builder.base_url(url);
        }
        if let Some(ref log) = config.message_log {
            builder = builder.message_log(log.mode, &log.path);
        }

        let mut client = builder.build()?;
        client
            .connect(config.system, config.zone, config.temperature_unit)
            .await?;

        let mut climate = Self::new(&config.name, client);
        climate.setpoint_offset = config.setpoint_offset;
        Ok(climate)
    }

    /// Wrap an already connected client. An empty `name` falls back to the
    /// vendor's system name.
    pub fn new(name: &str, client: IComfortClient) -> Self {
        let name = if name.is_empty() {
            client
                .system()
                .map(|s| s.name.clone())
                .unwrap_or_default()
        } else {
            name.to_string()
        };
        Self {
            name,
            client,
            setpoint_offset: DEFAULT_SETPOINT_OFFSET,
        }
    }

    pub fn with_setpoint_offset(mut self, offset: f64) -> Self {
        self.setpoint_offset = offset;
        self
    }

    pub fn client(&self) -> &IComfortClient {
        &self.client
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supported_features(&self) -> &'static [Feature] {
        SUPPORTED_FEATURES
    }

    pub fn temperature_unit(&self) -> Option<&'static str> {
        self.client.temperature_unit().map(|u| u.label())
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.snapshot().map(|s| s.temperature)
    }

    pub fn current_humidity(&self) -> Option<f64> {
        self.snapshot().map(|s| s.humidity)
    }

    /// `"off"` when switched off, otherwise what the equipment is doing.
    pub fn state(&self) -> Option<&'static str> {
        self.snapshot().map(|s| match s.operating_mode {
            OperatingMode::Off => STATE_OFF,
            _ => s.status.label(),
        })
    }

    pub fn current_operation(&self) -> Option<&'static str> {
        self.snapshot().map(|s| s.operating_mode.label())
    }

    pub fn operation_list(&self) -> Vec<&'static str> {
        OperatingMode::labels()
    }

    pub fn current_fan_mode(&self) -> Option<&'static str> {
        self.snapshot().map(|s| s.fan_mode.label())
    }

    pub fn fan_list(&self) -> Vec<&'static str> {
        FanMode::labels()
    }

    pub fn is_away_mode_on(&self) -> Option<bool> {
        self.snapshot().map(|s| s.away)
    }

    pub fn is_on(&self) -> Option<bool> {
        self.snapshot().map(|s| s.operating_mode != OperatingMode::Off)
    }

    /// Heat setpoint in heat mode, cool setpoint in cool mode, nothing otherwise.
    pub fn target_temperature(&self) -> Option<f64> {
        let s = self.snapshot()?;
        match s.operating_mode {
            OperatingMode::Heat => Some(s.heat_setpoint),
            OperatingMode::Cool => Some(s.cool_setpoint),
            _ => None,
        }
    }

    pub fn target_temperature_low(&self) -> Option<f64> {
        self.snapshot().map(|s| s.heat_setpoint)
    }

    pub fn target_temperature_high(&self) -> Option<f64> {
        self.snapshot().map(|s| s.cool_setpoint)
    }

    pub fn current_program(&self) -> Option<&str> {
        self.client.program_name()
    }

    pub async fn update(&mut self) -> Result<()> {
        debug!(name = %self.name, "updating state");
        self.client.refresh().await?;
        Ok(())
    }

    pub async fn set_temperature(&mut self, request: TemperatureRequest) -> Result<()> {
        let mode = self.require_snapshot()?.operating_mode;
        let (heat, cool) = resolve_setpoints(mode, &request, self.setpoint_offset)?;
        debug!(heat, cool, "setting target temperature");
        self.client.set_setpoints(heat, cool).await
    }

    pub async fn set_fan_mode(&mut self, fan: &str) -> Result<()> {
        let mode = FanMode::parse_label(fan)?;
        self.client.set_fan_mode(mode).await
    }

    pub async fn set_operation_mode(&mut self, operation: &str) -> Result<()> {
        let mode = OperatingMode::parse_label(operation)?;
        self.client.set_operating_mode(mode).await
    }

    pub async fn turn_away_mode_on(&mut self) -> Result<()> {
        self.client.set_away_mode(true).await?;
        Ok(())
    }

    pub async fn turn_away_mode_off(&mut self) -> Result<()> {
        self.client.set_away_mode(false).await?;
        Ok(())
    }

    pub async fn turn_on(&mut self) -> Result<()> {
        self.client.set_operating_mode(OperatingMode::Auto).await
    }

    pub async fn turn_off(&mut self) -> Result<()> {
        self.client.set_operating_mode(OperatingMode::Off).await
    }

    fn snapshot(&self) -> Option<&Snapshot> {
        self.client.snapshot()
    }

    fn require_snapshot(&self) -> Result<&Snapshot> {
        self.snapshot().ok_or(Error::NoSnapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_mode_adds_offset_above() {
        let sp = resolve_setpoints(OperatingMode::Heat, &TemperatureRequest::single(70.0), 10.0);
        assert_eq!(sp.unwrap(), (70.0, 80.0));
    }

    #[test]
    fn cool_mode_subtracts_offset_below() {
        let sp = resolve_setpoints(OperatingMode::Cool, &TemperatureRequest::single(76.0), 10.0);
        assert_eq!(sp.unwrap(), (66.0, 76.0));
    }

    #[test]
    fn auto_mode_uses_range_verbatim() {
        let sp = resolve_setpoints(
            OperatingMode::Auto,
            &TemperatureRequest::range(68.0, 76.0),
            10.0,
        );
        assert_eq!(sp.unwrap(), (68.0, 76.0));
    }

    #[test]
    fn auto_mode_ignores_single_temperature() {
        let request = TemperatureRequest {
            temperature: Some(70.0),
            target_low: Some(68.0),
            target_high: None,
        };
        let err = resolve_setpoints(OperatingMode::Auto, &request, 10.0).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn offset_is_configurable() {
        let sp = resolve_setpoints(OperatingMode::Heat, &TemperatureRequest::single(20.0), 2.0);
        assert_eq!(sp.unwrap(), (20.0, 22.0));
    }

    #[test]
    fn off_and_emergency_reject_targets() {
        for mode in [OperatingMode::Off, OperatingMode::EmergencyHeat] {
            let err = resolve_setpoints(mode, &TemperatureRequest::single(70.0), 10.0).unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
    }

    #[test]
    fn non_finite_values_rejected() {
        let cases = [
            (OperatingMode::Heat, TemperatureRequest::single(f64::NAN), 10.0),
            (OperatingMode::Cool, TemperatureRequest::single(f64::INFINITY), 10.0),
            (OperatingMode::Auto, TemperatureRequest::range(68.0, f64::NAN), 10.0),
            (OperatingMode::Heat, TemperatureRequest::single(70.0), f64::NAN),
        ];
        for (mode, request, offset) in cases {
            let err = resolve_setpoints(mode, &request, offset).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{mode:?} {request:?}");
        }
    }

    #[test]
    fn heat_mode_needs_single_temperature() {
        let err = resolve_setpoints(
            OperatingMode::Heat,
            &TemperatureRequest::range(68.0, 76.0),
            10.0,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
