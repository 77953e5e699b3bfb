#![allow(dead_code)]

use lennox_icomfort::{IComfortClient, TemperatureUnit};
use serde_json::{Value, json};
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER: &str = "alice";
pub const PASSWORD: &str = "hunter2";
pub const SERIAL: &str = "WS12345678";

/// One zone entry as the service returns it: numbers arrive as strings.
pub fn tstat_info(operation_mode: i64) -> Value {
    json!({
        "System_Status": "0",
        "Operation_Mode": operation_mode.to_string(),
        "Fan_Mode": "0",
        "Away_Mode": "0",
        "Indoor_Temp": "71",
        "Indoor_Humidity": "42",
        "Heat_Set_Point": "68",
        "Cool_Set_Point": "76",
        "Program_Schedule_Mode": "1",
        "Program_Schedule_Selection": "0",
        "Zone_Number": 0,
        "GatewaySN": SERIAL
    })
}

pub fn with(mut info: Value, overrides: Value) -> Value {
    if let (Value::Object(base), Value::Object(extra)) = (&mut info, overrides) {
        base.extend(extra);
    }
    info
}

pub fn envelope(infos: Vec<Value>) -> Value {
    json!({ "ReturnStatus": "SUCCESS", "tStatInfo": infos })
}

pub fn login_mock() -> Mock {
    Mock::given(method("PUT"))
        .and(path("/ValidateUser"))
        .and(query_param("username", USER))
        .and(basic_auth(USER, PASSWORD))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "msg_code": "SUCCESS",
            "msgDesc": null
        })))
}

pub fn systems_mock() -> Mock {
    Mock::given(method("GET"))
        .and(path("/GetSystemsInfo"))
        .and(query_param("userid", USER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ReturnStatus": "SUCCESS",
            "Systems": [
                { "Gateway_SN": SERIAL, "System_Name": "Downstairs" },
                { "Gateway_SN": "WS87654321", "System_Name": "Upstairs" }
            ]
        })))
}

pub fn schedules_mock() -> Mock {
    Mock::given(method("GET"))
        .and(path("/GetTStatScheduleInfo"))
        .and(query_param("gatewaysn", SERIAL))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ReturnStatus": "SUCCESS",
            "tStatScheduleInfo": [
                { "Schedule_Number": "1", "Schedule_Name": "Winter" },
                { "Schedule_Number": "0", "Schedule_Name": "Summer" }
            ]
        })))
}

pub fn thermostat_mock(info: Value) -> Mock {
    Mock::given(method("GET"))
        .and(path("/GetTStatInfoList"))
        .and(query_param("gatewaysn", SERIAL))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(vec![info])))
}

pub async fn mount_startup(server: &MockServer, info: Value) {
    login_mock().mount(server).await;
    systems_mock().mount(server).await;
    schedules_mock().mount(server).await;
    thermostat_mock(info).up_to_n_times(1).mount(server).await;
}

pub fn client(server: &MockServer) -> IComfortClient {
    IComfortClient::builder(USER, PASSWORD)
        .base_url(server.uri())
        .build()
        .expect("client should build")
}

pub async fn connected_client(server: &MockServer, info: Value) -> IComfortClient {
    mount_startup(server, info).await;
    let mut client = client(server);
    client
        .connect(0, 0, TemperatureUnit::Fahrenheit)
        .await
        .expect("connect should succeed");
    client
}

pub fn settings_ok_mock() -> Mock {
    Mock::given(method("PUT"))
        .and(path("/SetTStatInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("0"))
}

pub fn set_program_mock(info: Value) -> Mock {
    Mock::given(method("PUT"))
        .and(path("/SetProgramInfoNew"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(vec![info])))
}

pub async fn request_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}
