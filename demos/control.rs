use lennox_icomfort::{Climate, Config, MessageLogConfig, MessageLogMode, TemperatureRequest};
use std::env;

const USAGE: &str =
    "usage: control [status | mode LABEL | fan LABEL | away on|off | temp T | range LOW HIGH | on | off] [--log]";

/// Send one command to the thermostat and print the resulting state.
///
/// Credentials and target come from the `ICOMFORT_*` environment variables.
/// With `--log` every exchange is written to `logs/control_<timestamp>.ndjson`.
#[tokio::main]
async fn main() -> lennox_icomfort::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().skip(1).filter(|a| a != "--log").collect();
    let log = env::args().any(|a| a == "--log");

    let mut config = Config::from_env()?;
    if log {
        let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = format!("logs/control_{ts}.ndjson");
        std::fs::create_dir_all("logs")?;
        println!("Logging all requests/responses to {path}");
        config.message_log = Some(MessageLogConfig {
            mode: MessageLogMode::Full,
            path,
        });
    }

    let mut climate = Climate::setup(&config).await?;
    println!("Connected to {}", climate.name());

    let arg = |i: usize| args.get(i).map(String::as_str);
    let number = |i: usize| -> lennox_icomfort::Result<f64> {
        arg(i)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| lennox_icomfort::Error::Validation(USAGE.into()))
    };

    match (arg(0), arg(1)) {
        (Some("status") | None, _) => {}
        (Some("mode"), Some(label)) => climate.set_operation_mode(label).await?,
        (Some("fan"), Some(label)) => climate.set_fan_mode(label).await?,
        (Some("away"), Some("on")) => climate.turn_away_mode_on().await?,
        (Some("away"), Some("off")) => climate.turn_away_mode_off().await?,
        (Some("temp"), Some(_)) => {
            climate
                .set_temperature(TemperatureRequest::single(number(1)?))
                .await?
        }
        (Some("range"), Some(_)) => {
            climate
                .set_temperature(TemperatureRequest::range(number(1)?, number(2)?))
                .await?
        }
        (Some("on"), _) => climate.turn_on().await?,
        (Some("off"), _) => climate.turn_off().await?,
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    print_state(&climate);
    Ok(())
}

fn print_state(climate: &Climate) {
    let unit = climate.temperature_unit().unwrap_or("");
    let fmt = |t: Option<f64>| {
        t.map(|t| format!("{t:.0}{unit}"))
            .unwrap_or_else(|| "-".into())
    };
    println!("  state:   {}", climate.state().unwrap_or("-"));
    println!(
        "  indoor:  {} / {:.0}%",
        fmt(climate.current_temperature()),
        climate.current_humidity().unwrap_or_default()
    );
    println!(
        "  mode:    {} (fan {})",
        climate.current_operation().unwrap_or("-"),
        climate.current_fan_mode().unwrap_or("-")
    );
    println!(
        "  target:  {} | low {} | high {}",
        fmt(climate.target_temperature()),
        fmt(climate.target_temperature_low()),
        fmt(climate.target_temperature_high())
    );
    println!("  program: {}", climate.current_program().unwrap_or("-"));
    println!("  away:    {}", climate.is_away_mode_on().unwrap_or_default());
}
