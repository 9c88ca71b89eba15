//! GPU telemetry sampling pipeline.
//!
//! This module owns the path from the vendor utility's raw report to typed,
//! severity-classified snapshots: subprocess invocation, parsing, the
//! interval-driven sampler with backoff, and power-limit control.

pub mod alerts;
pub mod export;
pub mod history;
pub mod parser;
pub mod power;
pub mod runner;
pub mod sampler;
pub mod severity;
pub mod snapshot;

pub use alerts::{evaluate_alerts, Alert, AlertKind, AlertSettings, AlertTracker};
pub use export::{export_csv, export_json};
pub use history::{HistoryPoint, SampleHistory};
pub use parser::{parse_devices, parse_processes, DeviceReport, ParseWarning, ProcessReport};
pub use power::{
    parse_power_capabilities, AppliedPowerLimit, PowerCapabilities, PowerLimitController,
    PowerLimitRequest, PowerSettings,
};
pub use runner::{resolve_binary, Outcome};
pub use sampler::{
    backoff_delay, SamplerConfig, SamplerRuntime, SamplerState, TelemetrySampler,
};
pub use severity::{classify, MetricKind, Severity, SeverityBand, SeverityThresholds};
pub use snapshot::{GpuSnapshot, ProcessEntry, Sample, SampleOutcome, SampleResult, SharedResult};
