use serde::{Deserialize, Serialize};

/// Which metric a value was measured for. Thresholds are metric-specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    Utilization,
    MemoryPercent,
    Temperature,
    PowerRatio,
}

/// Discrete display band for a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Normal,
    Warning,
    Critical,
    /// The sensor did not report a value
    Unknown,
}

/// A classified value: the band together with the metric kind it was
/// computed for. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityBand {
    pub kind: MetricKind,
    pub severity: Severity,
}

/// Warning/critical cut-offs per metric kind.
///
/// Bands are inclusive on the lower bound of the higher band: a value equal
/// to `warning` is Warning, equal to `critical` is Critical. Utilization and
/// memory share a percent scale, temperature is in °C, power is the
/// draw/limit ratio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub utilization_warning: f64,
    pub utilization_critical: f64,
    pub memory_warning: f64,
    pub memory_critical: f64,
    pub temperature_warning: f64,
    pub temperature_critical: f64,
    pub power_ratio_warning: f64,
    pub power_ratio_critical: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            utilization_warning: 70.0,
            utilization_critical: 90.0,
            memory_warning: 70.0,
            memory_critical: 90.0,
            temperature_warning: 70.0,
            temperature_critical: 85.0,
            power_ratio_warning: 0.8,
            power_ratio_critical: 0.95,
        }
    }
}

impl SeverityThresholds {
    fn cutoffs(&self, kind: MetricKind) -> (f64, f64) {
        match kind {
            MetricKind::Utilization => (self.utilization_warning, self.utilization_critical),
            MetricKind::MemoryPercent => (self.memory_warning, self.memory_critical),
            MetricKind::Temperature => (self.temperature_warning, self.temperature_critical),
            MetricKind::PowerRatio => (self.power_ratio_warning, self.power_ratio_critical),
        }
    }
}

/// Classify a metric value into its severity band.
///
/// Total over every representable input: an absent value maps to Unknown,
/// not Normal, and the three numeric bands partition the whole line.
pub fn classify(
    kind: MetricKind,
    value: Option<f64>,
    thresholds: &SeverityThresholds,
) -> SeverityBand {
    let severity = match value {
        None => Severity::Unknown,
        Some(v) => {
            let (warning, critical) = thresholds.cutoffs(kind);
            if v >= critical {
                Severity::Critical
            } else if v >= warning {
                Severity::Warning
            } else {
                Severity::Normal
            }
        }
    };
    SeverityBand { kind, severity }
}
