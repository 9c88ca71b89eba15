#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use gpumon::telemetry::{SampleOutcome, SamplerConfig, SamplerRuntime, TelemetrySampler};
use gpumon::{ExecutionError, TelemetryError};

fn fake_smi(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("fake-smi");
    std::fs::write(
        &path,
        "#!/bin/sh\n\
         case \"$1\" in\n\
         *compute-apps*) echo '4021, python3, 512' ;;\n\
         *) echo '0, Test GPU, 45, 2048, 8192, 62, 150.5, 250.0' ;;\n\
         esac\n",
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn config(binary: PathBuf, interval: Duration) -> SamplerConfig {
    SamplerConfig {
        binary,
        interval,
        backoff_ceiling: Duration::from_secs(30),
        query_timeout: Duration::from_secs(5),
    }
}

#[test]
fn runtime_publishes_an_initial_sample_and_honors_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = SamplerRuntime::start(config(fake_smi(&dir), Duration::from_secs(60)))
        .expect("runtime should start");

    let first = runtime
        .next_result(Duration::from_secs(5))
        .expect("initial sample should be published");
    assert!(first.is_ok());
    assert_eq!(first.cycle, 1);

    // The interval is a minute out; only the out-of-band refresh can
    // produce the second cycle this quickly.
    runtime.request_refresh();
    let second = runtime
        .next_result(Duration::from_secs(5))
        .expect("refresh should publish a new result");
    assert_eq!(second.cycle, 2);

    runtime.shutdown();
}

#[test]
fn scenario_d_missing_binary_backs_off_with_doubling_delays() {
    let mut sampler = TelemetrySampler::new(config(
        PathBuf::from("/nonexistent/vendor-smi"),
        Duration::from_secs(2),
    ));

    let result = sampler.sample_once();
    match &result.outcome {
        SampleOutcome::Failed { error, .. } => {
            assert!(matches!(
                error,
                TelemetryError::Execution(ExecutionError::NotFound { .. })
            ));
        }
        other => panic!("expected NotFound failure, got {other:?}"),
    }

    // Next attempt after the base interval, then doubling per failure.
    assert_eq!(sampler.next_delay(), Duration::from_secs(2));
    sampler.sample_once();
    assert_eq!(sampler.next_delay(), Duration::from_secs(4));
    sampler.sample_once();
    assert_eq!(sampler.next_delay(), Duration::from_secs(8));
}

#[test]
fn consumers_observe_whole_results_in_cycle_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut sampler = TelemetrySampler::new(config(fake_smi(&dir), Duration::from_secs(2)));
    let rx = sampler.subscribe();

    let mut last_cycle = 0;
    for _ in 0..3 {
        sampler.sample_once();
        let published = rx.borrow().clone().expect("slot should hold a result");
        assert!(published.cycle > last_cycle, "cycle went backwards");
        last_cycle = published.cycle;

        let sample = published.sample().expect("cycle should succeed");
        // A complete result: device data and its process table together.
        assert_eq!(sample.snapshots.len(), 1);
        assert_eq!(sample.snapshots[0].processes.len(), 1);
    }
}

#[test]
fn malformed_report_becomes_a_failed_result_not_a_crash() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake-smi");
    std::fs::write(
        &path,
        "#!/bin/sh\necho '0, Broken GPU, not-a-number, 2048, 8192, 62, 150.5, 250.0'\n",
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut sampler = TelemetrySampler::new(config(path, Duration::from_secs(2)));
    let result = sampler.sample_once();
    match &result.outcome {
        SampleOutcome::Failed { error, detail } => {
            assert!(matches!(error, TelemetryError::Parse(_)));
            assert!(detail.contains("utilization.gpu"));
        }
        other => panic!("expected parse failure, got {other:?}"),
    }
}
