use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::*;
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://services.myicomfort.com/DBAcessService.svc";

pub const VALIDATE_USER: &str = "/ValidateUser";
pub const GET_LOOKUP_STRINGS: &str = "/GetTstatLookupInfo";
pub const GET_SYSTEMS: &str = "/GetSystemsInfo";
pub const GET_SCHEDULES: &str = "/GetTStatScheduleInfo";
pub const GET_THERMOSTAT: &str = "/GetTStatInfoList";
pub const SET_THERMOSTAT: &str = "/SetTStatInfo";
pub const SET_AWAY: &str = "/SetAwayModeNew";
pub const SET_PROGRAM: &str = "/SetProgramInfoNew";

const RETURN_STATUS_OK: &[&str] = &["SUCCESS", "1"];
const LOGIN_OK: &str = "SUCCESS";

/// Accept a JSON number or a numeric string; the service sends both.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<i64, D::Error> {
    match Lenient::deserialize(d)? {
        Lenient::Int(n) => Ok(n),
        Lenient::Float(f) if f.fract() == 0.0 => Ok(f as i64),
        Lenient::Float(f) => Err(D::Error::custom(format!("expected integer, got {f}"))),
        Lenient::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected integer, got {s:?}"))),
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    match Lenient::deserialize(d)? {
        Lenient::Int(n) => Ok(n as f64),
        Lenient::Float(f) => Ok(f),
        Lenient::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected number, got {s:?}"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub msg_code: Option<String>,
}

pub fn login_accepted(status: u16, body: &str) -> bool {
    if !(200..300).contains(&status) {
        return false;
    }
    serde_json::from_str::<LoginResponse>(body)
        .ok()
        .and_then(|r| r.msg_code)
        .is_some_and(|code| code == LOGIN_OK)
}

#[derive(Debug, Deserialize)]
pub struct LookupEntry {
    #[serde(deserialize_with = "lenient_i64")]
    pub value: i64,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct LookupResponse {
    #[serde(rename = "tStatlookupInfo", default)]
    pub entries: Vec<LookupEntry>,
}

#[derive(Debug, Deserialize)]
pub struct RawSystem {
    #[serde(rename = "Gateway_SN")]
    pub gateway_sn: String,
    #[serde(rename = "System_Name", default)]
    pub system_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SystemsResponse {
    #[serde(rename = "Systems", default)]
    pub systems: Option<Vec<RawSystem>>,
}

#[derive(Debug, Deserialize)]
pub struct RawSchedule {
    #[serde(rename = "Schedule_Number", deserialize_with = "lenient_i64")]
    pub number: i64,
    #[serde(rename = "Schedule_Name")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SchedulesResponse {
    #[serde(rename = "tStatScheduleInfo", default)]
    pub schedules: Vec<RawSchedule>,
}

/// One zone's entry in a `tStatInfo` list.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTStatInfo {
    #[serde(rename = "System_Status", deserialize_with = "lenient_i64")]
    pub system_status: i64,
    #[serde(rename = "Operation_Mode", deserialize_with = "lenient_i64")]
    pub operation_mode: i64,
    #[serde(rename = "Fan_Mode", deserialize_with = "lenient_i64")]
    pub fan_mode: i64,
    #[serde(rename = "Away_Mode", deserialize_with = "lenient_i64")]
    pub away_mode: i64,
    #[serde(rename = "Indoor_Temp", deserialize_with = "lenient_f64")]
    pub indoor_temp: f64,
    #[serde(rename = "Indoor_Humidity", deserialize_with = "lenient_f64")]
    pub indoor_humidity: f64,
    #[serde(rename = "Heat_Set_Point", deserialize_with = "lenient_f64")]
    pub heat_set_point: f64,
    #[serde(rename = "Cool_Set_Point", deserialize_with = "lenient_f64")]
    pub cool_set_point: f64,
    #[serde(rename = "Program_Schedule_Mode", deserialize_with = "lenient_i64")]
    pub program_schedule_mode: i64,
    #[serde(rename = "Program_Schedule_Selection", deserialize_with = "lenient_i64")]
    pub program_schedule_selection: i64,
}

#[derive(Debug, Deserialize)]
pub struct TStatInfoResponse {
    #[serde(rename = "tStatInfo", default)]
    pub info: Vec<RawTStatInfo>,
}

impl RawTStatInfo {
    pub fn into_snapshot(self, unit: TemperatureUnit) -> Result<Snapshot> {
        let program_selection = u32::try_from(self.program_schedule_selection).map_err(|_| {
            Error::Validation(format!(
                "invalid program selection {}",
                self.program_schedule_selection
            ))
        })?;
        Ok(Snapshot {
            unit,
            temperature: self.indoor_temp,
            humidity: self.indoor_humidity,
            status: SystemStatus::decode(self.system_status)?,
            operating_mode: OperatingMode::decode(self.operation_mode)?,
            fan_mode: FanMode::decode(self.fan_mode)?,
            away: self.away_mode != 0,
            heat_setpoint: self.heat_set_point,
            cool_setpoint: self.cool_set_point,
            program_mode: ProgramMode::decode(self.program_schedule_mode)?,
            program_selection,
        })
    }
}

/// Pick a zone out of a `tStatInfo` list and decode it.
pub fn select_zone(
    response: TStatInfoResponse,
    zone: usize,
    unit: TemperatureUnit,
) -> Result<Snapshot> {
    let len = response.info.len();
    response
        .info
        .into_iter()
        .nth(zone)
        .ok_or(Error::NotFound {
            kind: "zone",
            index: zone,
            len,
        })?
        .into_snapshot(unit)
}

#[derive(Debug, Serialize)]
pub struct SetThermostatRequest<'a> {
    #[serde(rename = "Cool_Set_Point")]
    pub cool_set_point: f64,
    #[serde(rename = "Heat_Set_Point")]
    pub heat_set_point: f64,
    #[serde(rename = "Fan_Mode")]
    pub fan_mode: i64,
    #[serde(rename = "Operation_Mode")]
    pub operation_mode: i64,
    #[serde(rename = "Pref_Temp_Units")]
    pub pref_temp_units: i64,
    #[serde(rename = "GatewaySN")]
    pub gateway_sn: &'a str,
    #[serde(rename = "Zone_Number")]
    pub zone_number: usize,
}

impl<'a> SetThermostatRequest<'a> {
    pub fn new(serial: &'a str, zone: usize, unit: TemperatureUnit, settings: &Snapshot) -> Self {
        Self {
            cool_set_point: settings.cool_setpoint,
            heat_set_point: settings.heat_setpoint,
            fan_mode: settings.fan_mode.code(),
            operation_mode: settings.operating_mode.code(),
            pref_temp_units: unit.code(),
            gateway_sn: serial,
            zone_number: zone,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SetProgramRequest<'a> {
    #[serde(rename = "Pref_Temp_Units")]
    pub pref_temp_units: i64,
    #[serde(rename = "Zone_Number")]
    pub zone_number: usize,
    #[serde(rename = "GatewaySN")]
    pub gateway_sn: &'a str,
    #[serde(rename = "Program_Schedule_Mode")]
    pub program_schedule_mode: i64,
    #[serde(rename = "Program_Schedule_Selection")]
    pub program_schedule_selection: u32,
}

impl<'a> SetProgramRequest<'a> {
    /// `current_selection` is resent unchanged when switching to manual.
    pub fn new(
        serial: &'a str,
        zone: usize,
        unit: TemperatureUnit,
        selection: ProgramSelection,
        current_selection: u32,
    ) -> Self {
        let (mode, program) = match selection {
            ProgramSelection::Manual => (ProgramMode::Manual, current_selection),
            ProgramSelection::Program(index) => (ProgramMode::Scheduled, index),
        };
        Self {
            pref_temp_units: unit.code(),
            zone_number: zone,
            gateway_sn: serial,
            program_schedule_mode: mode.code(),
            program_schedule_selection: program,
        }
    }
}

pub fn away_query(
    serial: &str,
    zone: usize,
    away: bool,
    unit: TemperatureUnit,
) -> Vec<(&'static str, String)> {
    vec![
        ("gatewaysn", serial.to_string()),
        ("zonenumber", zone.to_string()),
        ("awaymode", u8::from(away).to_string()),
        ("tempscale", unit.code().to_string()),
    ]
}

/// The set-thermostat endpoint answers with a bare `0` on success instead of
/// the usual `ReturnStatus` envelope.
pub fn settings_accepted(body: &str) -> bool {
    body == "0"
}

/// Parse a response body, check its `ReturnStatus`, and decode the payload.
///
/// A body that is not JSON or carries a failing status is a communication
/// error; a successful envelope with missing or malformed fields is a
/// validation error.
pub fn decode_envelope<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::Communication(format!("{endpoint}: body is not JSON: {e}")))?;
    match value.get("ReturnStatus").and_then(|v| v.as_str()) {
        Some(status) if RETURN_STATUS_OK.contains(&status) => {}
        Some(status) => {
            return Err(Error::Communication(format!(
                "{endpoint}: ReturnStatus {status:?}"
            )));
        }
        None => {
            return Err(Error::Communication(format!(
                "{endpoint}: missing ReturnStatus"
            )));
        }
    }
    serde_json::from_value(value)
        .map_err(|e| Error::Validation(format!("{endpoint}: malformed response: {e}")))
}

pub fn programs_from(response: SchedulesResponse) -> Result<Vec<Program>> {
    let mut programs = response
        .schedules
        .into_iter()
        .map(|s| {
            let number = u32::try_from(s.number).map_err(|_| {
                Error::Validation(format!("invalid schedule number {}", s.number))
            })?;
            Ok(Program {
                number,
                name: s.name,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    programs.sort_by_key(|p| p.number);
    Ok(programs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(overrides: Value) -> Value {
        let mut base = json!({
            "System_Status": 1,
            "Operation_Mode": 1,
            "Fan_Mode": 0,
            "Away_Mode": 0,
            "Indoor_Temp": 68.0,
            "Indoor_Humidity": 40.0,
            "Heat_Set_Point": 70.0,
            "Cool_Set_Point": 78.0,
            "Program_Schedule_Mode": 0,
            "Program_Schedule_Selection": 2
        });
        if let (Value::Object(b), Value::Object(o)) = (&mut base, overrides) {
            b.extend(o);
        }
        base
    }

    #[test]
    fn settings_body_zero_is_success() {
        assert!(settings_accepted("0"));
        assert!(!settings_accepted("1"));
        assert!(!settings_accepted(""));
        assert!(!settings_accepted("\"0\""));
    }

    #[test]
    fn envelope_accepts_success_and_one() {
        for status in ["SUCCESS", "1"] {
            let body = json!({"ReturnStatus": status, "tStatInfo": [info(json!({}))]});
            let resp: TStatInfoResponse =
                decode_envelope(GET_THERMOSTAT, &body.to_string()).unwrap();
            assert_eq!(resp.info.len(), 1);
        }
    }

    #[test]
    fn envelope_failure_is_communication_error() {
        let body = json!({"ReturnStatus": "FAILURE"}).to_string();
        let err = decode_envelope::<TStatInfoResponse>(GET_THERMOSTAT, &body).unwrap_err();
        assert!(matches!(err, Error::Communication(_)), "got {err:?}");

        let err = decode_envelope::<TStatInfoResponse>(GET_THERMOSTAT, "<html>").unwrap_err();
        assert!(matches!(err, Error::Communication(_)), "got {err:?}");
    }

    #[test]
    fn missing_field_is_validation_error() {
        let mut entry = info(json!({}));
        entry.as_object_mut().unwrap().remove("Fan_Mode");
        let body = json!({"ReturnStatus": "SUCCESS", "tStatInfo": [entry]}).to_string();
        let err = decode_envelope::<TStatInfoResponse>(GET_THERMOSTAT, &body).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "got {err:?}");
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let entry = info(json!({"Operation_Mode": "3", "Indoor_Temp": "71.5"}));
        let raw: RawTStatInfo = serde_json::from_value(entry).unwrap();
        let snap = raw.into_snapshot(TemperatureUnit::Fahrenheit).unwrap();
        assert_eq!(snap.operating_mode, OperatingMode::Auto);
        assert_eq!(snap.temperature, 71.5);
    }

    #[test]
    fn unknown_code_is_validation_error() {
        let raw: RawTStatInfo = serde_json::from_value(info(json!({"Fan_Mode": 9}))).unwrap();
        let err = raw.into_snapshot(TemperatureUnit::Fahrenheit).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "got {err:?}");
    }

    #[test]
    fn zone_out_of_range() {
        let resp = TStatInfoResponse {
            info: vec![serde_json::from_value(info(json!({}))).unwrap()],
        };
        let err = select_zone(resp, 1, TemperatureUnit::Fahrenheit).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                kind: "zone",
                index: 1,
                len: 1
            }
        ));
    }

    #[test]
    fn manual_program_request_keeps_selection() {
        let req = SetProgramRequest::new(
            "SN1",
            0,
            TemperatureUnit::Celsius,
            ProgramSelection::Manual,
            3,
        );
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["Program_Schedule_Mode"], 0);
        assert_eq!(v["Program_Schedule_Selection"], 3);
        assert_eq!(v["Pref_Temp_Units"], 1);
        assert_eq!(v["GatewaySN"], "SN1");
    }

    #[test]
    fn programs_sorted_by_number() {
        let resp = SchedulesResponse {
            schedules: vec![
                RawSchedule { number: 1, name: "Winter".into() },
                RawSchedule { number: 0, name: "Summer".into() },
            ],
        };
        let programs = programs_from(resp).unwrap();
        assert_eq!(programs[0].name, "Summer");
        assert_eq!(programs[1].name, "Winter");
    }

    #[test]
    fn login_requires_success_code() {
        assert!(login_accepted(200, r#"{"msg_code":"SUCCESS"}"#));
        assert!(!login_accepted(200, r#"{"msg_code":"INVALID_USER"}"#));
        assert!(!login_accepted(401, r#"{"msg_code":"SUCCESS"}"#));
        assert!(!login_accepted(200, "not json"));
    }
}
