use std::time::Duration;

use anyhow::{bail, Context, Result};
use runtime_guard::{boundary, SecurityLevel};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn parse_args() -> Result<(Duration, Option<SecurityLevel>)> {
    let mut duration = Duration::from_millis(1500);
    let mut level = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--duration-ms" => {
                if let Some(val) = args.next() {
                    let ms = val
                        .parse::<u64>()
                        .with_context(|| format!("invalid --duration-ms value {val}"))?;
                    duration = Duration::from_millis(ms.max(100));
                }
            }
            "--level" => {
                if let Some(val) = args.next() {
                    let raw = val
                        .parse::<i64>()
                        .with_context(|| format!("invalid --level value {val}"))?;
                    match SecurityLevel::from_raw(raw) {
                        Some(parsed) => level = Some(parsed),
                        None => bail!("--level must be 1, 2 or 3 (got {raw})"),
                    }
                }
            }
            _ => {}
        }
    }

    Ok((duration, level))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (duration, level) = parse_args()?;

    boundary::initialize_security();
    if let Some(level) = level {
        boundary::set_security_level(level.as_raw().into());
    }

    info!(
        analyzed = boundary::is_being_analyzed(),
        emulator = boundary::is_running_in_emulator(),
        hooks = boundary::has_hook_framework(),
        "initial probe results"
    );

    if !boundary::on_library_load() {
        bail!("runtime monitor failed to start");
    }
    std::thread::sleep(duration);
    let iterations = boundary::shutdown();
    info!(iterations, "smoke run finished");

    let status = boundary::status_json().context("serialize security status")?;
    println!("{status}");
    Ok(())
}
