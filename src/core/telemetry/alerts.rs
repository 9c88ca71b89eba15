use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::snapshot::GpuSnapshot;

/// Alerting thresholds and cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSettings {
    pub enabled: bool,
    pub temperature_celsius: i64,
    pub utilization_percent: f64,
    /// Minimum gap between repeats of the same alert kind
    pub cooldown_secs: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            temperature_celsius: 80,
            utilization_percent: 90.0,
            cooldown_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Temperature,
    Utilization,
}

/// An individual threshold crossing worth telling the user about.
#[derive(Debug, Clone)]
pub struct Alert {
    pub kind: AlertKind,
    pub device_index: u32,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
}

/// Evaluate one device snapshot against the alert thresholds.
pub fn evaluate_alerts(snapshot: &GpuSnapshot, settings: &AlertSettings) -> Vec<Alert> {
    if !settings.enabled {
        return Vec::new();
    }

    let mut alerts = Vec::new();

    if let Some(temp) = snapshot.temperature_celsius {
        if temp >= settings.temperature_celsius {
            alerts.push(Alert {
                kind: AlertKind::Temperature,
                device_index: snapshot.index,
                message: format!(
                    "GPU {} temperature is {}°C (threshold: {}°C)",
                    snapshot.index, temp, settings.temperature_celsius
                ),
                value: temp as f64,
                threshold: settings.temperature_celsius as f64,
            });
        }
    }

    if let Some(util) = snapshot.utilization_percent {
        if util >= settings.utilization_percent {
            alerts.push(Alert {
                kind: AlertKind::Utilization,
                device_index: snapshot.index,
                message: format!(
                    "GPU {} utilization is {:.0}% (threshold: {:.0}%)",
                    snapshot.index, util, settings.utilization_percent
                ),
                value: util,
                threshold: settings.utilization_percent,
            });
        }
    }

    alerts
}

/// Suppresses repeats of the same alert kind within the cooldown window.
#[derive(Debug)]
pub struct AlertTracker {
    cooldown: Duration,
    last_emitted: HashMap<(AlertKind, u32), Instant>,
}

impl AlertTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_emitted: HashMap::new(),
        }
    }

    /// Keep only the alerts whose kind has not fired within the cooldown.
    pub fn filter(&mut self, alerts: Vec<Alert>) -> Vec<Alert> {
        let now = Instant::now();
        alerts
            .into_iter()
            .filter(|alert| {
                let key = (alert.kind, alert.device_index);
                match self.last_emitted.get(&key) {
                    Some(last) if now.duration_since(*last) < self.cooldown => false,
                    _ => {
                        self.last_emitted.insert(key, now);
                        true
                    }
                }
            })
            .collect()
    }
}
