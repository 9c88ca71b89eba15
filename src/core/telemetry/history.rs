use std::collections::VecDeque;

use serde::Serialize;

use super::snapshot::Sample;

const DEFAULT_HISTORY_CAPACITY: usize = 300;

/// One retained reading of the primary device, reduced to the metrics worth
/// graphing or exporting.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    pub timestamp: i64,
    pub utilization_percent: Option<f64>,
    pub temperature_celsius: Option<i64>,
    pub power_draw_watts: Option<f64>,
    pub memory_percent: Option<f64>,
}

/// Capacity-bounded ring buffer of readings.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    capacity: usize,
    points: VecDeque<HistoryPoint>,
}

impl SampleHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            points: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Record the primary device of a successful cycle. Failed cycles leave
    /// the history untouched rather than recording gaps.
    pub fn record(&mut self, sample: &Sample) {
        let Some(primary) = sample.primary() else {
            return;
        };
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(HistoryPoint {
            timestamp: sample.captured_at,
            utilization_percent: primary.utilization_percent,
            temperature_celsius: primary.temperature_celsius,
            power_draw_watts: primary.power_draw_watts,
            memory_percent: primary.memory_percent(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Default for SampleHistory {
    fn default() -> Self {
        Self::new()
    }
}
