use gpumon::telemetry::{
    classify, parse_devices, parse_processes, MetricKind, Severity, SeverityThresholds,
};

const SCENARIO_A: &str = "0, Test GPU, 45, 2048, 8192, 62, 150.5, 250.0";

#[test]
fn scenario_a_parses_and_classifies_all_normal() {
    let report = parse_devices(SCENARIO_A).unwrap();
    assert!(report.warnings.is_empty());

    let snap = &report.snapshots[0];
    assert_eq!(snap.index, 0);
    assert_eq!(snap.name, "Test GPU");

    let thresholds = SeverityThresholds::default();
    assert_eq!(
        classify(MetricKind::Utilization, snap.utilization_percent, &thresholds).severity,
        Severity::Normal
    );
    assert_eq!(
        classify(MetricKind::MemoryPercent, snap.memory_percent(), &thresholds).severity,
        Severity::Normal
    );
    assert_eq!(
        classify(
            MetricKind::Temperature,
            snap.temperature_celsius.map(|v| v as f64),
            &thresholds
        )
        .severity,
        Severity::Normal
    );
    assert_eq!(
        classify(MetricKind::PowerRatio, snap.power_ratio(), &thresholds).severity,
        Severity::Normal
    );
}

#[test]
fn scenario_b_absent_utilization_classifies_unknown() {
    let line = "0, Test GPU, N/A, 2048, 8192, 62, 150.5, 250.0";
    let report = parse_devices(line).unwrap();

    let snap = &report.snapshots[0];
    assert_eq!(snap.utilization_percent, None);

    let band = classify(
        MetricKind::Utilization,
        snap.utilization_percent,
        &SeverityThresholds::default(),
    );
    assert_eq!(band.severity, Severity::Unknown);
}

#[test]
fn device_order_is_independent_of_input_order() {
    let forward = "\
0, GPU A, 10, 0, 8192, 40, 50, 250\n\
1, GPU B, 10, 0, 8192, 40, 50, 250";
    let shuffled = "\
1, GPU B, 10, 0, 8192, 40, 50, 250\n\
0, GPU A, 10, 0, 8192, 40, 50, 250";

    let a = parse_devices(forward).unwrap();
    let b = parse_devices(shuffled).unwrap();

    let names_a: Vec<&str> = a.snapshots.iter().map(|s| s.name.as_str()).collect();
    let names_b: Vec<&str> = b.snapshots.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names_a, names_b);
}

#[test]
fn process_order_is_deterministic_with_memory_ties() {
    let raw = "\
300, b-proc, 512\n\
100, a-proc, 512\n\
200, c-proc, 1024";
    let report = parse_processes(raw).unwrap();
    let pids: Vec<u32> = report.entries.iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![200, 100, 300]);
}

#[test]
fn byte_identical_reports_classify_identically() {
    let thresholds = SeverityThresholds::default();

    let first = parse_devices(SCENARIO_A).unwrap();
    let second = parse_devices(SCENARIO_A).unwrap();

    for (a, b) in first.snapshots.iter().zip(second.snapshots.iter()) {
        for kind in [MetricKind::Utilization, MetricKind::MemoryPercent] {
            let value_a = match kind {
                MetricKind::Utilization => a.utilization_percent,
                _ => a.memory_percent(),
            };
            let value_b = match kind {
                MetricKind::Utilization => b.utilization_percent,
                _ => b.memory_percent(),
            };
            assert_eq!(
                classify(kind, value_a, &thresholds).severity,
                classify(kind, value_b, &thresholds).severity
            );
        }
    }
}
