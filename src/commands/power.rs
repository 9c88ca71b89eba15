use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::telemetry::{
    resolve_binary, PowerLimitController, PowerLimitRequest,
};
use crate::core::Config;
use crate::error::PowerLimitError;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("get", sub_matches)) => get(sub_matches),
        Some(("set", sub_matches)) => set(sub_matches),
        _ => {
            println!("Use 'gpumon power --help' for more information.");
            Ok(())
        }
    }
}

fn controller(config: &Config) -> Result<PowerLimitController> {
    let binary = resolve_binary(config.binary_name())
        .context("could not resolve the vendor utility")?;
    PowerLimitController::new(binary, config.query_timeout(), &config.power)
}

fn get(matches: &ArgMatches) -> Result<()> {
    let device = *matches.get_one::<u32>("device").unwrap_or(&0);
    let config = Config::load()?;
    let caps = controller(&config)?
        .query_capabilities(device)
        .with_context(|| format!("could not query power limits of device {device}"))?;

    println!("{} {}", "Device:".white(), device.to_string().cyan().bold());
    println!(
        "{} {}",
        "Current limit:".white(),
        format_watts(caps.current_watts).cyan().bold()
    );
    println!(
        "{} {} - {}",
        "Supported range:".white(),
        format_watts(caps.min_watts).cyan(),
        format_watts(caps.max_watts).cyan()
    );
    Ok(())
}

fn set(matches: &ArgMatches) -> Result<()> {
    let device = *matches.get_one::<u32>("device").unwrap_or(&0);
    let watts = *matches
        .get_one::<f64>("watts")
        .context("a wattage value is required")?;
    let config = Config::load()?;

    let request = PowerLimitRequest {
        device_index: device,
        watts,
    };

    match controller(&config)?.apply(&request) {
        Ok(applied) => {
            println!(
                "{} {} W on device {}",
                "Power limit set to".green().bold(),
                applied.watts,
                applied.device_index
            );
            if !applied.message.is_empty() {
                println!("{}", applied.message.dimmed());
            }
            Ok(())
        }
        Err(PowerLimitError::OutOfRange {
            requested,
            min,
            max,
        }) => {
            anyhow::bail!("{requested} W is outside the supported range {min} W - {max} W")
        }
        Err(PowerLimitError::PermissionDenied { detail }) => {
            println!("{}", "Changing the power limit needs elevated privileges.".yellow());
            anyhow::bail!("permission denied: {detail}")
        }
        Err(err) => Err(err.into()),
    }
}

fn format_watts(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1} W"))
        .unwrap_or_else(|| "unknown".to_string())
}
