use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::history::SampleHistory;

/// Write the retained history as CSV with a fixed header row.
pub fn export_csv(history: &SampleHistory, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create export file {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "timestamp,utilization_percent,temperature_celsius,power_draw_watts,memory_percent"
    )?;
    for point in history.iter() {
        writeln!(
            writer,
            "{},{},{},{},{}",
            point.timestamp,
            csv_cell_f64(point.utilization_percent),
            point
                .temperature_celsius
                .map(|v| v.to_string())
                .unwrap_or_default(),
            csv_cell_f64(point.power_draw_watts),
            csv_cell_f64(point.memory_percent),
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonExport<'a> {
    export_time: String,
    gpu_name: &'a str,
    data: Vec<&'a super::history::HistoryPoint>,
}

/// Write the retained history as a JSON document, mirroring the CSV content
/// plus the device name and export time.
pub fn export_json(history: &SampleHistory, gpu_name: &str, path: &Path) -> Result<()> {
    let doc = JsonExport {
        export_time: chrono::Utc::now().to_rfc3339(),
        gpu_name,
        data: history.iter().collect(),
    };

    let file = File::create(path)
        .with_context(|| format!("failed to create export file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &doc)
        .with_context(|| "failed to serialize history")?;
    Ok(())
}

fn csv_cell_f64(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_default()
}
