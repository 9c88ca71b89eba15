use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::telemetry::{
    classify, evaluate_alerts, export_csv, export_json, AlertTracker, GpuSnapshot, MetricKind,
    SampleHistory, SampleOutcome, SamplerRuntime,
};
use crate::core::Config;
use crate::ui::{format_memory, format_percent, format_power, format_temperature, paint};

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(interval) = matches.get_one::<f64>("interval") {
        config.monitor.refresh_interval_ms = (interval * 1000.0) as u64;
        config.normalize();
    }

    let mut runtime = SamplerRuntime::start(config.sampler_config()?)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("failed to install Ctrl-C handler")?;
    }

    let mut history = SampleHistory::with_capacity(config.monitor.history_capacity);
    let mut tracker = AlertTracker::new(Duration::from_secs(config.alerts.cooldown_secs));
    let mut gpu_name = String::new();

    println!("{}", "Press Ctrl-C to stop.".dimmed());

    while !stop.load(Ordering::SeqCst) {
        let Some(result) = runtime.next_result(Duration::from_millis(250)) else {
            continue;
        };

        match &result.outcome {
            SampleOutcome::Snapshots(sample) => {
                history.record(sample);
                for warning in &sample.warnings {
                    log::warn!("report warning: {warning}");
                }
                if gpu_name.is_empty() {
                    if let Some(primary) = sample.primary() {
                        gpu_name = primary.name.clone();
                    }
                }

                for snapshot in &sample.snapshots {
                    print_reading(snapshot, &config);
                    for alert in tracker.filter(evaluate_alerts(snapshot, &config.alerts)) {
                        println!("  {} {}", "ALERT".red().bold(), alert.message.red());
                    }
                }
            }
            SampleOutcome::Failed { detail, .. } => {
                println!("{} {}", "sampling failed:".red().bold(), detail);
            }
        }
    }

    runtime.shutdown();

    if let Some(path) = matches.get_one::<String>("export-csv") {
        export_csv(&history, Path::new(path))?;
        println!("History exported to {path}");
    }
    if let Some(path) = matches.get_one::<String>("export-json") {
        export_json(&history, &gpu_name, Path::new(path))?;
        println!("History exported to {path}");
    }

    Ok(())
}

fn print_reading(snapshot: &GpuSnapshot, config: &Config) {
    let thresholds = &config.thresholds;
    let util = classify(
        MetricKind::Utilization,
        snapshot.utilization_percent,
        thresholds,
    );
    let mem = classify(MetricKind::MemoryPercent, snapshot.memory_percent(), thresholds);
    let temp = classify(
        MetricKind::Temperature,
        snapshot.temperature_celsius.map(|v| v as f64),
        thresholds,
    );
    let power = classify(MetricKind::PowerRatio, snapshot.power_ratio(), thresholds);

    let clock = chrono::Local::now().format("%H:%M:%S").to_string();
    println!(
        "{} gpu{}  util {}  mem {}  temp {}  power {}",
        clock.dimmed(),
        snapshot.index,
        paint(&format_percent(snapshot.utilization_percent), util.severity),
        paint(
            &format_memory(snapshot.memory_used_mib, snapshot.memory_total_mib),
            mem.severity
        ),
        paint(&format_temperature(snapshot.temperature_celsius), temp.severity),
        paint(
            &format_power(snapshot.power_draw_watts, snapshot.power_limit_watts),
            power.severity
        ),
    );
}
