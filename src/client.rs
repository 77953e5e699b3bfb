use std::collections::BTreeMap;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::diff::snapshot_events;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{
    DEFAULT_BASE_URL, GET_LOOKUP_STRINGS, GET_SCHEDULES, GET_SYSTEMS, GET_THERMOSTAT,
    LookupResponse, SET_AWAY, SET_PROGRAM, SET_THERMOSTAT, SchedulesResponse, SetProgramRequest,
    SetThermostatRequest, SystemsResponse, TStatInfoResponse, VALIDATE_USER, away_query,
    decode_envelope, login_accepted, programs_from, select_zone, settings_accepted,
};
use crate::types::*;
use crate::{Error, Result};

type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;
type SnapshotCallback = Box<dyn Fn(&Snapshot) + Send + Sync>;
type Query = [(&'static str, String)];

pub struct IComfortClientBuilder {
    username: String,
    password: String,
    base_url: String,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl IComfortClientBuilder {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            event_callbacks: Vec::new(),
            snapshot_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.event_callbacks.push(Box::new(f));
        self
    }

    pub fn on_snapshot(mut self, f: impl Fn(&Snapshot) + Send + Sync + 'static) -> Self {
        self.snapshot_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<IComfortClient> {
        let http = reqwest::Client::builder().build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        Ok(IComfortClient {
            http,
            base_url: self.base_url,
            username: self.username,
            password: self.password,
            authenticated: false,
            system: None,
            programs: Vec::new(),
            target: None,
            snapshot: None,
            event_callbacks: self.event_callbacks,
            snapshot_callbacks: self.snapshot_callbacks,
            logger,
        })
    }
}

/// The thermostat that commands are aimed at, fixed by the last poll.
#[derive(Debug, Clone)]
struct Target {
    serial: String,
    zone: usize,
    unit: TemperatureUnit,
}

/// Session against the iComfort cloud service for one account.
///
/// Every operation is a single request/response exchange except
/// [`set_operating_mode`](Self::set_operating_mode), which needs two. The
/// client keeps the last snapshot it saw; commands are sent to the
/// thermostat that snapshot came from.
pub struct IComfortClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    authenticated: bool,
    system: Option<SystemInfo>,
    programs: Vec<Program>,
    target: Option<Target>,
    snapshot: Option<Snapshot>,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    logger: Option<MessageLogger>,
}

impl IComfortClient {
    pub fn builder(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> IComfortClientBuilder {
        IComfortClientBuilder::new(username, password)
    }

    /// Authenticate, resolve the system serial, load the program list and
    /// take the first snapshot.
    pub async fn connect(
        &mut self,
        system_index: usize,
        zone: usize,
        unit: TemperatureUnit,
    ) -> Result<()> {
        self.authenticate().await?;
        let serial = self.fetch_system_serial(system_index).await?.serial.clone();
        self.fetch_programs(&serial).await?;
        self.poll(&serial, zone, unit).await?;
        debug!(serial = %serial, zone, "connected to iComfort thermostat");
        Ok(())
    }

    pub async fn authenticate(&mut self) -> Result<()> {
        let query = [("username", self.username.clone())];
        let (status, body) = self.send(Method::PUT, VALIDATE_USER, &query, None).await?;

        if !login_accepted(status, &body) {
            self.authenticated = false;
            return Err(Error::Authentication(self.username.clone()));
        }

        debug!(user = %self.username, "authenticated");
        self.authenticated = true;
        Ok(())
    }

    pub async fn fetch_system_serial(&mut self, system_index: usize) -> Result<&SystemInfo> {
        let query = [("userid", self.username.clone())];
        let resp: SystemsResponse = self
            .request_envelope(Method::GET, GET_SYSTEMS, &query, None)
            .await?;

        let systems = resp.systems.unwrap_or_default();
        let len = systems.len();
        let raw = systems
            .into_iter()
            .nth(system_index)
            .ok_or(Error::NotFound {
                kind: "system",
                index: system_index,
                len,
            })?;

        debug!(serial = %raw.gateway_sn, name = %raw.system_name, "found system");
        Ok(self.system.insert(SystemInfo {
            serial: raw.gateway_sn,
            name: raw.system_name,
        }))
    }

    /// Program names for a system, ordered by schedule number. Kept for the
    /// lifetime of the client; renames on the vendor side need a new client.
    pub async fn fetch_programs(&mut self, serial: &str) -> Result<&[Program]> {
        let query = [("gatewaysn", serial.to_string())];
        let resp: SchedulesResponse = self
            .request_envelope(Method::GET, GET_SCHEDULES, &query, None)
            .await?;

        self.programs = programs_from(resp)?;
        debug!(count = self.programs.len(), "loaded programs");
        Ok(&self.programs)
    }

    /// Vendor display strings for one of the coded fields, keyed by code.
    pub async fn fetch_lookup_strings(
        &mut self,
        kind: LookupKind,
    ) -> Result<BTreeMap<i64, String>> {
        let query = [
            ("name", kind.as_vendor_str().to_string()),
            ("langnumber", "0".to_string()),
        ];
        let resp: LookupResponse = self
            .request_envelope(Method::GET, GET_LOOKUP_STRINGS, &query, None)
            .await?;

        Ok(resp
            .entries
            .into_iter()
            .map(|e| (e.value, e.description))
            .collect())
    }

    /// Fetch `zone` of system `serial` and replace the snapshot with it.
    pub async fn poll(
        &mut self,
        serial: &str,
        zone: usize,
        unit: TemperatureUnit,
    ) -> Result<&Snapshot> {
        let query = [
            ("gatewaysn", serial.to_string()),
            ("tempunit", unit.code().to_string()),
        ];
        let resp: TStatInfoResponse = self
            .request_envelope(Method::GET, GET_THERMOSTAT, &query, None)
            .await?;
        let snapshot = select_zone(resp, zone, unit)?;

        self.target = Some(Target {
            serial: serial.to_string(),
            zone,
            unit,
        });
        Ok(self.replace_snapshot(snapshot))
    }

    /// Poll the thermostat the current snapshot came from.
    pub async fn refresh(&mut self) -> Result<&Snapshot> {
        let target = self.target()?;
        self.poll(&target.serial, target.zone, target.unit).await
    }

    /// Send setpoints, fan mode and operating mode from `settings`.
    ///
    /// The response carries no state, so on success the snapshot takes the
    /// applied values until the next poll.
    pub async fn apply_settings(&mut self, settings: &Snapshot) -> Result<()> {
        let target = self.target()?;
        if !settings.heat_setpoint.is_finite() || !settings.cool_setpoint.is_finite() {
            return Err(Error::Validation(format!(
                "setpoints must be finite, got heat {} cool {}",
                settings.heat_setpoint, settings.cool_setpoint
            )));
        }
        let body = serde_json::to_value(SetThermostatRequest::new(
            &target.serial,
            target.zone,
            target.unit,
            settings,
        ))?;

        let (status, text) = self.send(Method::PUT, SET_THERMOSTAT, &[], Some(body)).await?;
        if !(200..300).contains(&status) || !settings_accepted(&text) {
            return Err(Error::Communication(format!(
                "{SET_THERMOSTAT}: settings rejected (HTTP {status}, body {text:?})"
            )));
        }

        let mut applied = self.current()?.clone();
        applied.heat_setpoint = settings.heat_setpoint;
        applied.cool_setpoint = settings.cool_setpoint;
        applied.fan_mode = settings.fan_mode;
        applied.operating_mode = settings.operating_mode;
        self.replace_snapshot(applied);
        Ok(())
    }

    pub async fn set_away_mode(&mut self, away: bool) -> Result<&Snapshot> {
        let target = self.target()?;
        let query = away_query(&target.serial, target.zone, away, target.unit);
        let resp: TStatInfoResponse = self
            .request_envelope(Method::PUT, SET_AWAY, &query, None)
            .await?;

        let snapshot = select_zone(resp, target.zone, target.unit)?;
        Ok(self.replace_snapshot(snapshot))
    }

    pub async fn set_program(&mut self, selection: ProgramSelection) -> Result<&Snapshot> {
        let target = self.target()?;
        let current_selection = self.current()?.program_selection;

        if let ProgramSelection::Program(number) = selection
            && !self.programs.iter().any(|p| p.number == number)
        {
            return Err(Error::NotFound {
                kind: "program",
                index: number as usize,
                len: self.programs.len(),
            });
        }

        let body = serde_json::to_value(SetProgramRequest::new(
            &target.serial,
            target.zone,
            target.unit,
            selection,
            current_selection,
        ))?;
        let resp: TStatInfoResponse = self
            .request_envelope(Method::PUT, SET_PROGRAM, &[], Some(body))
            .await?;

        let snapshot = select_zone(resp, target.zone, target.unit)?;
        Ok(self.replace_snapshot(snapshot))
    }

    /// The service ignores a mode change while a program is driving the
    /// thermostat, so manual mode is forced first.
    pub async fn set_operating_mode(&mut self, mode: OperatingMode) -> Result<()> {
        self.set_program(ProgramSelection::Manual).await?;
        let mut settings = self.settings()?;
        settings.operating_mode = mode;
        self.apply_settings(&settings).await
    }

    pub async fn set_fan_mode(&mut self, mode: FanMode) -> Result<()> {
        let mut settings = self.settings()?;
        settings.fan_mode = mode;
        self.apply_settings(&settings).await
    }

    pub async fn set_setpoints(&mut self, heat: f64, cool: f64) -> Result<()> {
        let mut settings = self.settings()?;
        settings.heat_setpoint = heat;
        settings.cool_setpoint = cool;
        self.apply_settings(&settings).await
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn system(&self) -> Option<&SystemInfo> {
        self.system.as_ref()
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn temperature_unit(&self) -> Option<TemperatureUnit> {
        self.target.as_ref().map(|t| t.unit)
    }

    /// `"Manual"` or the name of the active program, if known.
    pub fn program_name(&self) -> Option<&str> {
        match self.snapshot.as_ref()?.program() {
            ProgramSelection::Manual => Some(MANUAL_PROGRAM_NAME),
            ProgramSelection::Program(number) => self
                .programs
                .iter()
                .find(|p| p.number == number)
                .map(|p| p.name.as_str()),
        }
    }

    // -- Helpers --

    fn target(&self) -> Result<Target> {
        if !self.authenticated {
            return Err(Error::NotAuthenticated);
        }
        self.target.clone().ok_or(Error::NoSnapshot)
    }

    fn current(&self) -> Result<&Snapshot> {
        self.snapshot.as_ref().ok_or(Error::NoSnapshot)
    }

    /// A copy of the current snapshot to edit and send back.
    fn settings(&self) -> Result<Snapshot> {
        self.target()?;
        self.current().cloned()
    }

    fn replace_snapshot(&mut self, snapshot: Snapshot) -> &Snapshot {
        for event in snapshot_events(self.snapshot.as_ref(), &snapshot) {
            debug!(?event, "thermostat state changed");
            for cb in &self.event_callbacks {
                cb(&event);
            }
        }
        for cb in &self.snapshot_callbacks {
            cb(&snapshot);
        }
        self.snapshot.insert(snapshot)
    }

    async fn request_envelope<T: DeserializeOwned>(
        &mut self,
        method: Method,
        endpoint: &str,
        query: &Query,
        body: Option<Value>,
    ) -> Result<T> {
        if !self.authenticated {
            return Err(Error::NotAuthenticated);
        }
        let (status, text) = self.send(method, endpoint, query, body).await?;
        if !(200..300).contains(&status) {
            return Err(Error::Communication(format!("{endpoint}: HTTP {status}")));
        }
        decode_envelope(endpoint, &text)
    }

    async fn send(
        &mut self,
        method: Method,
        endpoint: &str,
        query: &Query,
        body: Option<Value>,
    ) -> Result<(u16, String)> {
        let url = format!("{}{endpoint}", self.base_url);
        debug!(%method, url = %url, "sending request");

        if let Some(ref mut logger) = self.logger {
            logger.log_request(method.as_str(), endpoint, query, body.as_ref());
        }

        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password))
            .query(query);
        if let Some(ref body) = body {
            request = request.json(body);
        }

        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        trace!(endpoint, status, body = %text, "response");

        if let Some(ref mut logger) = self.logger {
            logger.log_response(endpoint, status, &text);
        }
        Ok((status, text))
    }
}
