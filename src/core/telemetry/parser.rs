use std::fmt;

use super::snapshot::{GpuSnapshot, ProcessEntry};
use crate::error::ParseError;

/// Required columns of the device table:
/// index, name, utilization.gpu, memory.used, memory.total, temperature.gpu,
/// power.draw, power.limit. Fan speed and the two clocks may trail as
/// optional columns.
pub const DEVICE_FIELDS: usize = 8;

/// Required columns of the process table: pid, process_name, used_memory.
pub const PROCESS_FIELDS: usize = 3;

/// A non-fatal irregularity found while parsing: the offending value was
/// clamped to the nearest valid bound instead of aborting the whole report.
#[derive(Debug, Clone)]
pub struct ParseWarning {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Default)]
pub struct DeviceReport {
    /// Snapshots ordered by ascending device index
    pub snapshots: Vec<GpuSnapshot>,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Default)]
pub struct ProcessReport {
    /// Entries ordered by descending memory usage, ties by ascending PID
    pub entries: Vec<ProcessEntry>,
    pub warnings: Vec<ParseWarning>,
}

/// Parse the device table of the vendor report.
///
/// One line per device, comma-separated, as produced by
/// `--format=csv,noheader,nounits`. Blank lines are ignored.
pub fn parse_devices(raw: &str) -> Result<DeviceReport, ParseError> {
    let mut report = DeviceReport::default();

    for (i, line) in raw.lines().enumerate() {
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < DEVICE_FIELDS {
            return Err(ParseError::TooFewFields {
                line: line_no,
                expected: DEVICE_FIELDS,
                found: fields.len(),
            });
        }

        let warnings = &mut report.warnings;

        let index = required_number(fields[0], line_no, "index")?;
        let index = if index < 0.0 {
            warnings.push(ParseWarning {
                line: line_no,
                message: format!("negative device index {index} clamped to 0"),
            });
            0
        } else {
            index.round() as u32
        };

        let utilization_percent = optional_number(fields[2], line_no, "utilization.gpu")?
            .map(|v| clamp_percent(v, line_no, "utilization.gpu", warnings));

        let memory_used = optional_number(fields[3], line_no, "memory.used")?
            .map(|v| clamp_non_negative(v, line_no, "memory.used", warnings) as u64);
        let memory_total = optional_number(fields[4], line_no, "memory.total")?
            .map(|v| clamp_non_negative(v, line_no, "memory.total", warnings) as u64);

        // used ≤ total must hold; an inverted pair is a report glitch, not
        // a reason to drop the sample.
        let memory_used = match (memory_used, memory_total) {
            (Some(used), Some(total)) if used > total => {
                warnings.push(ParseWarning {
                    line: line_no,
                    message: format!("memory.used {used} MiB exceeds total {total} MiB, clamped"),
                });
                Some(total)
            }
            (used, _) => used,
        };

        let temperature_celsius = optional_number(fields[5], line_no, "temperature.gpu")?
            .map(|v| v.round() as i64);

        let power_draw_watts = optional_number(fields[6], line_no, "power.draw")?
            .map(|v| clamp_non_negative(v, line_no, "power.draw", warnings));
        let power_limit_watts = optional_number(fields[7], line_no, "power.limit")?
            .map(|v| clamp_non_negative(v, line_no, "power.limit", warnings));

        let fan_speed_percent = match fields.get(8) {
            Some(raw) => optional_number(raw, line_no, "fan.speed")?
                .map(|v| clamp_percent(v, line_no, "fan.speed", warnings)),
            None => None,
        };
        let clock_graphics_mhz = match fields.get(9) {
            Some(raw) => {
                optional_number(raw, line_no, "clocks.gr")?.map(|v| v.max(0.0).round() as u64)
            }
            None => None,
        };
        let clock_memory_mhz = match fields.get(10) {
            Some(raw) => {
                optional_number(raw, line_no, "clocks.mem")?.map(|v| v.max(0.0).round() as u64)
            }
            None => None,
        };

        report.snapshots.push(GpuSnapshot {
            index,
            name: fields[1].to_string(),
            utilization_percent,
            memory_used_mib: memory_used,
            memory_total_mib: memory_total,
            temperature_celsius,
            power_draw_watts,
            power_limit_watts,
            fan_speed_percent,
            clock_graphics_mhz,
            clock_memory_mhz,
            processes: Vec::new(),
        });
    }

    report.snapshots.sort_by_key(|s| s.index);
    Ok(report)
}

/// Parse the process table of the vendor report.
///
/// Process names may themselves contain commas; everything between the PID
/// and the trailing memory column is taken as the name.
pub fn parse_processes(raw: &str) -> Result<ProcessReport, ParseError> {
    let mut report = ProcessReport::default();

    for (i, line) in raw.lines().enumerate() {
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < PROCESS_FIELDS {
            return Err(ParseError::TooFewFields {
                line: line_no,
                expected: PROCESS_FIELDS,
                found: fields.len(),
            });
        }

        let pid_raw = fields[0];
        let pid = pid_raw
            .parse::<u32>()
            .map_err(|_| ParseError::MalformedField {
                line: line_no,
                field: "pid",
                value: pid_raw.to_string(),
            })?;
        if pid == 0 {
            report.warnings.push(ParseWarning {
                line: line_no,
                message: "process entry with pid 0 dropped".to_string(),
            });
            continue;
        }

        let last = fields.len() - 1;
        let name_raw = fields[1..last].join(", ");
        let name = if is_absent(&name_raw) {
            "unknown".to_string()
        } else {
            name_raw
        };

        let memory_mib = optional_number(fields[last], line_no, "used_memory")?
            .map(|v| clamp_non_negative(v, line_no, "used_memory", &mut report.warnings) as u64);

        report.entries.push(ProcessEntry {
            pid,
            name,
            memory_mib,
        });
    }

    report.entries.sort_by(|a, b| {
        b.memory_mib
            .unwrap_or(0)
            .cmp(&a.memory_mib.unwrap_or(0))
            .then(a.pid.cmp(&b.pid))
    });
    Ok(report)
}

/// Sentinels the vendor utility emits for values it cannot report.
fn is_absent(field: &str) -> bool {
    if field.is_empty() {
        return true;
    }
    const SENTINELS: [&str; 4] = ["n/a", "[n/a]", "[not supported]", "[unknown error]"];
    let lowered = field.to_ascii_lowercase();
    SENTINELS.contains(&lowered.as_str())
}

fn required_number(raw: &str, line: usize, field: &'static str) -> Result<f64, ParseError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::MalformedField {
            line,
            field,
            value: raw.to_string(),
        })
}

fn optional_number(
    raw: &str,
    line: usize,
    field: &'static str,
) -> Result<Option<f64>, ParseError> {
    if is_absent(raw) {
        return Ok(None);
    }
    required_number(raw, line, field).map(Some)
}

fn clamp_percent(
    value: f64,
    line: usize,
    field: &'static str,
    warnings: &mut Vec<ParseWarning>,
) -> f64 {
    if !(0.0..=100.0).contains(&value) {
        let clamped = value.clamp(0.0, 100.0);
        warnings.push(ParseWarning {
            line,
            message: format!("{field} {value} out of range, clamped to {clamped}"),
        });
        clamped
    } else {
        value
    }
}

fn clamp_non_negative(
    value: f64,
    line: usize,
    field: &'static str,
    warnings: &mut Vec<ParseWarning>,
) -> f64 {
    if value < 0.0 {
        warnings.push(ParseWarning {
            line,
            message: format!("negative {field} {value} clamped to 0"),
        });
        0.0
    } else {
        value
    }
}
