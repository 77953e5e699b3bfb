use lennox_icomfort::{Climate, Config, IComfortClient, VendorEnum};
use std::env;
use std::time::Duration;

/// Polls one thermostat and prints every change.
///
/// Credentials come from `ICOMFORT_USERNAME` / `ICOMFORT_PASSWORD`; the
/// optional first argument is the poll interval in seconds.
#[tokio::main]
async fn main() -> lennox_icomfort::Result<()> {
    tracing_subscriber::fmt::init();

    let interval: u64 = env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    let config = Config::from_env()?;

    let mut builder = IComfortClient::builder(&config.username, &config.password)
        .on_event(|event| {
            println!("{event:?}");
        })
        .on_snapshot(|s| {
            println!(
                "{:.1}{} {:.0}% | {} | mode: {} | fan: {} | heat {:.0} / cool {:.0}{}",
                s.temperature,
                s.unit.label(),
                s.humidity,
                s.status.label(),
                s.operating_mode.label(),
                s.fan_mode.label(),
                s.heat_setpoint,
                s.cool_setpoint,
                if s.away { " | AWAY" } else { "" },
            );
        });
    if let Some(ref url) = config.base_url {
        builder = builder.base_url(url);
    }

    let mut client = builder.build()?;
    println!("Connecting as {}...", config.username);
    client
        .connect(config.system, config.zone, config.temperature_unit)
        .await?;

    let mut climate = Climate::new(&config.name, client);
    println!(
        "Connected to {} (program: {})",
        climate.name(),
        climate.current_program().unwrap_or("-")
    );

    loop {
        tokio::time::sleep(Duration::from_secs(interval)).await;
        if let Err(e) = climate.update().await {
            eprintln!("Poll error: {e}");
        }
    }
}
