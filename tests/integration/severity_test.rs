use gpumon::telemetry::{classify, MetricKind, Severity, SeverityThresholds};

const KINDS: [MetricKind; 4] = [
    MetricKind::Utilization,
    MetricKind::MemoryPercent,
    MetricKind::Temperature,
    MetricKind::PowerRatio,
];

#[test]
fn classification_is_total_over_odd_inputs() {
    let thresholds = SeverityThresholds::default();
    for kind in KINDS {
        for value in [
            Some(f64::MIN),
            Some(-0.0),
            Some(f64::MAX),
            Some(f64::INFINITY),
            Some(f64::NEG_INFINITY),
            None,
        ] {
            // Must produce a band for every representable input.
            let _ = classify(kind, value, &thresholds);
        }
        assert_eq!(classify(kind, None, &thresholds).severity, Severity::Unknown);
    }
}

#[test]
fn every_value_lands_in_exactly_one_band() {
    let thresholds = SeverityThresholds::default();
    for kind in KINDS {
        let mut value = -10.0_f64;
        while value < 200.0 {
            let severity = classify(kind, Some(value), &thresholds).severity;
            let matches = [Severity::Normal, Severity::Warning, Severity::Critical]
                .iter()
                .filter(|s| **s == severity)
                .count();
            assert_eq!(matches, 1, "kind {kind:?} value {value}");
            value += 0.25;
        }
    }
}

#[test]
fn band_carries_the_metric_kind_it_was_computed_for() {
    let thresholds = SeverityThresholds::default();
    let band = classify(MetricKind::Temperature, Some(90.0), &thresholds);
    assert_eq!(band.kind, MetricKind::Temperature);
    assert_eq!(band.severity, Severity::Critical);
}
