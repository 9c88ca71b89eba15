use colored::{Color, ColoredString, Colorize};

use crate::core::telemetry::Severity;

/// Format used/total VRAM: GiB once the total crosses 1024 MiB, MiB below.
pub fn format_memory(used_mib: Option<u64>, total_mib: Option<u64>) -> String {
    match (used_mib, total_mib) {
        (Some(used), Some(total)) if total > 0 => {
            let percent = used as f64 / total as f64 * 100.0;
            if total >= 1024 {
                format!(
                    "{:.1} GB / {:.1} GB ({:.1}%)",
                    used as f64 / 1024.0,
                    total as f64 / 1024.0,
                    percent
                )
            } else {
                format!("{used} MB / {total} MB ({percent:.1}%)")
            }
        }
        _ => "N/A".to_string(),
    }
}

/// Format a single process's VRAM usage from MiB.
pub fn format_process_memory(memory_mib: Option<u64>) -> String {
    match memory_mib {
        Some(mib) if mib >= 1024 => format!("{:.1} GB", mib as f64 / 1024.0),
        Some(mib) => format!("{mib} MB"),
        None => "N/A".to_string(),
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}%"),
        None => "N/A".to_string(),
    }
}

pub fn format_temperature(value: Option<i64>) -> String {
    match value {
        Some(v) => format!("{v}°C"),
        None => "N/A".to_string(),
    }
}

pub fn format_power(draw_watts: Option<f64>, limit_watts: Option<f64>) -> String {
    let draw = draw_watts
        .map(|v| format!("{v:.1} W"))
        .unwrap_or_else(|| "N/A".to_string());
    let limit = limit_watts
        .map(|v| format!("{v:.1} W"))
        .unwrap_or_else(|| "N/A".to_string());
    format!("{draw} / {limit}")
}

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Normal => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Critical => Color::Red,
        Severity::Unknown => Color::BrightBlack,
    }
}

pub fn paint(text: &str, severity: Severity) -> ColoredString {
    text.color(severity_color(severity))
}
