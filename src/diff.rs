use serde_json::Value;

use crate::types::*;

/// Collect `(path, old, new)` for every leaf in `current` that differs from
/// `previous`. Keys only present in `previous` are reported with a `null` new
/// value.
pub(crate) fn diff_json(
    previous: &Value,
    current: &Value,
    path_prefix: &str,
    changes: &mut Vec<(String, Value, Value)>,
) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = if path_prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{path_prefix}.{key}")
                };
                match prev_map.get(key) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None => {
                        if curr_val.is_object() {
                            diff_json(
                                &Value::Object(serde_json::Map::new()),
                                curr_val,
                                &path,
                                changes,
                            );
                        } else {
                            changes.push((path, Value::Null, curr_val.clone()));
                        }
                    }
                }
            }
            for (key, prev_val) in prev_map {
                if !curr_map.contains_key(key) {
                    let path = if path_prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{path_prefix}.{key}")
                    };
                    changes.push((path, prev_val.clone(), Value::Null));
                }
            }
        }
        (Value::Array(prev_arr), Value::Array(curr_arr)) if prev_arr.len() == curr_arr.len() => {
            for (i, (prev_val, curr_val)) in prev_arr.iter().zip(curr_arr).enumerate() {
                let path = if path_prefix.is_empty() {
                    i.to_string()
                } else {
                    format!("{path_prefix}.{i}")
                };
                diff_json(prev_val, curr_val, &path, changes);
            }
        }
        (prev, curr) if prev != curr => {
            changes.push((path_prefix.to_string(), prev.clone(), curr.clone()));
        }
        _ => {}
    }
}

/// Typed events for every field that changed between two snapshots.
/// With no previous snapshot every field is reported.
pub(crate) fn snapshot_events(previous: Option<&Snapshot>, current: &Snapshot) -> Vec<Event> {
    let mut events = Vec::new();

    if previous.is_none_or(|p| p.temperature != current.temperature) {
        events.push(Event::TemperatureChanged {
            temperature: current.temperature,
        });
    }
    if previous.is_none_or(|p| p.humidity != current.humidity) {
        events.push(Event::HumidityChanged {
            humidity: current.humidity,
        });
    }
    if previous.is_none_or(|p| p.status != current.status) {
        events.push(Event::StatusChanged {
            status: current.status,
        });
    }
    if previous.is_none_or(|p| p.operating_mode != current.operating_mode) {
        events.push(Event::OperatingModeChanged {
            mode: current.operating_mode,
        });
    }
    if previous.is_none_or(|p| p.fan_mode != current.fan_mode) {
        events.push(Event::FanModeChanged {
            mode: current.fan_mode,
        });
    }
    if previous.is_none_or(|p| p.away != current.away) {
        events.push(Event::AwayModeChanged { away: current.away });
    }
    if previous.is_none_or(|p| {
        p.heat_setpoint != current.heat_setpoint || p.cool_setpoint != current.cool_setpoint
    }) {
        events.push(Event::SetpointsChanged {
            heat: current.heat_setpoint,
            cool: current.cool_setpoint,
        });
    }
    if previous.is_none_or(|p| p.program() != current.program()) {
        events.push(Event::ProgramChanged {
            program: current.program(),
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        Snapshot {
            unit: TemperatureUnit::Fahrenheit,
            temperature: 70.0,
            humidity: 40.0,
            status: SystemStatus::Idle,
            operating_mode: OperatingMode::Heat,
            fan_mode: FanMode::Auto,
            away: false,
            heat_setpoint: 68.0,
            cool_setpoint: 78.0,
            program_mode: ProgramMode::Manual,
            program_selection: 0,
        }
    }

    #[test]
    fn diff_detects_leaf_change() {
        let prev = json!({"tStatInfo": [{"Indoor_Temp": "71"}]});
        let curr = json!({"tStatInfo": [{"Indoor_Temp": "72"}]});
        let mut changes = vec![];
        diff_json(&prev, &curr, "", &mut changes);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, "tStatInfo.0.Indoor_Temp");
        assert_eq!(changes[0].1, json!("71"));
        assert_eq!(changes[0].2, json!("72"));
    }

    #[test]
    fn diff_ignores_unchanged() {
        let val = json!({"ReturnStatus": "SUCCESS", "tStatInfo": [{"Fan_Mode": 0}]});
        let mut changes = vec![];
        diff_json(&val, &val, "", &mut changes);
        assert!(changes.is_empty());
    }

    #[test]
    fn diff_detects_new_key() {
        let prev = json!({"ReturnStatus": "SUCCESS"});
        let curr = json!({"ReturnStatus": "SUCCESS", "Systems": null});
        let mut changes = vec![];
        diff_json(&prev, &curr, "", &mut changes);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, "Systems");
    }

    #[test]
    fn diff_reports_removed_key() {
        let prev = json!({"ReturnStatus": "SUCCESS", "tStatInfo": [{"Fan_Mode": 0}]});
        let curr = json!({"ReturnStatus": "SUCCESS"});
        let mut changes = vec![];
        diff_json(&prev, &curr, "", &mut changes);
        assert_eq!(
            changes,
            vec![(
                "tStatInfo".to_string(),
                json!([{"Fan_Mode": 0}]),
                Value::Null
            )]
        );
    }

    #[test]
    fn diff_reports_resized_array_whole() {
        let prev = json!({"tStatInfo": [1]});
        let curr = json!({"tStatInfo": [1, 2]});
        let mut changes = vec![];
        diff_json(&prev, &curr, "", &mut changes);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, "tStatInfo");
    }

    #[test]
    fn first_snapshot_reports_everything() {
        let events = snapshot_events(None, &snapshot());
        assert_eq!(events.len(), 8);
    }

    #[test]
    fn unchanged_snapshot_reports_nothing() {
        let s = snapshot();
        assert!(snapshot_events(Some(&s), &s).is_empty());
    }

    #[test]
    fn setpoint_and_away_changes() {
        let prev = snapshot();
        let mut curr = snapshot();
        curr.cool_setpoint = 80.0;
        curr.away = true;
        let events = snapshot_events(Some(&prev), &curr);
        assert_eq!(
            events,
            vec![
                Event::AwayModeChanged { away: true },
                Event::SetpointsChanged {
                    heat: 68.0,
                    cool: 80.0
                },
            ]
        );
    }

    #[test]
    fn program_change_reported() {
        let prev = snapshot();
        let mut curr = snapshot();
        curr.program_mode = ProgramMode::Scheduled;
        curr.program_selection = 2;
        let events = snapshot_events(Some(&prev), &curr);
        assert_eq!(
            events,
            vec![Event::ProgramChanged {
                program: ProgramSelection::Program(2)
            }]
        );
    }
}
