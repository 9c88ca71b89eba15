use anyhow::Result;
use clap::ArgMatches;
use colored::Colorize;

use crate::core::telemetry::{
    classify, GpuSnapshot, MetricKind, SampleOutcome, TelemetrySampler,
};
use crate::core::Config;
use crate::ui::{
    format_memory, format_percent, format_power, format_process_memory, format_temperature, paint,
};

pub fn execute(_matches: &ArgMatches) -> Result<()> {
    let config = Config::load()?;
    let mut sampler = TelemetrySampler::new(config.sampler_config()?);

    let result = sampler.sample_once();
    match &result.outcome {
        SampleOutcome::Snapshots(sample) => {
            for warning in &sample.warnings {
                println!("{} {}", "warning:".yellow(), warning);
            }
            if sample.snapshots.is_empty() {
                println!("{}", "No GPU devices reported.".yellow());
                return Ok(());
            }
            for snapshot in &sample.snapshots {
                print_device(snapshot, &config);
            }
            Ok(())
        }
        SampleOutcome::Failed { detail, .. } => {
            anyhow::bail!("sampling failed: {detail}")
        }
    }
}

fn print_device(snapshot: &GpuSnapshot, config: &Config) {
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

    println!(
        "{} {}",
        format!("GPU {}", snapshot.index).white().bold(),
        snapshot.name.cyan().bold()
    );
    println!(
        "  Utilization : {}",
        paint(&format_percent(snapshot.utilization_percent), util.severity)
    );
    println!(
        "  Memory      : {}",
        paint(
            &format_memory(snapshot.memory_used_mib, snapshot.memory_total_mib),
            mem.severity
        )
    );
    println!(
        "  Temperature : {}",
        paint(&format_temperature(snapshot.temperature_celsius), temp.severity)
    );
    println!(
        "  Power       : {}",
        paint(
            &format_power(snapshot.power_draw_watts, snapshot.power_limit_watts),
            power.severity
        )
    );
    if let Some(fan) = snapshot.fan_speed_percent {
        println!("  Fan         : {fan:.0}%");
    }
    if let (Some(gr), Some(mem_clock)) = (snapshot.clock_graphics_mhz, snapshot.clock_memory_mhz) {
        println!("  Clocks      : {gr} MHz core / {mem_clock} MHz memory");
    }

    if !snapshot.processes.is_empty() {
        println!();
        println!(
            "  {:<10} {:<30} {}",
            "PID".white().bold(),
            "NAME".white().bold(),
            "VRAM".white().bold()
        );
        for process in &snapshot.processes {
            println!(
                "  {:<10} {:<30} {}",
                process.pid,
                process.name,
                format_process_memory(process.memory_mib)
            );
        }
    }
    println!();
}
