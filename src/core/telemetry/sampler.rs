use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};

use super::parser;
use super::runner;
use super::snapshot::{Sample, SampleOutcome, SampleResult, SharedResult};
use crate::error::Result;

/// Fixed argument set for the device table query.
pub const DEVICE_QUERY: &[&str] = &[
    "--query-gpu=index,name,utilization.gpu,memory.used,memory.total,temperature.gpu,power.draw,power.limit,fan.speed,clocks.gr,clocks.mem",
    "--format=csv,noheader,nounits",
];

/// Fixed argument set for the process table query.
pub const PROCESS_QUERY: &[&str] = &[
    "--query-compute-apps=pid,process_name,used_memory",
    "--format=csv,noheader,nounits",
];

/// Tuning for the sampling loop.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Resolved path of the vendor utility
    pub binary: PathBuf,
    /// Base interval between samples
    pub interval: Duration,
    /// Upper bound on the backoff delay after consecutive failures
    pub backoff_ceiling: Duration,
    /// Per-invocation timeout for read-only queries
    pub query_timeout: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("nvidia-smi"),
            interval: Duration::from_secs(2),
            backoff_ceiling: Duration::from_secs(30),
            query_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Sampling,
    Backoff,
}

/// Delay before the next attempt after `consecutive_failures` failures.
///
/// The first failure retries after the base interval; each further
/// consecutive failure doubles the delay up to `ceiling`. Any success resets
/// the count to zero and with it the delay to base.
pub fn backoff_delay(base: Duration, consecutive_failures: u32, ceiling: Duration) -> Duration {
    if consecutive_failures <= 1 {
        return base;
    }
    let exponent = (consecutive_failures - 1).min(16);
    base.saturating_mul(1u32 << exponent).min(ceiling)
}

/// Drives ProcessRunner + SnapshotParser on a fixed interval and publishes
/// the latest outcome through a single-slot, last-write-wins watch channel.
///
/// The sampling step runs inline in the one driver task, so at most one
/// attempt is ever in flight; a tick that would land mid-sample simply does
/// not exist in this scheme, matching the drop-not-queue rule.
pub struct TelemetrySampler {
    config: SamplerConfig,
    state: SamplerState,
    consecutive_failures: u32,
    cycle: u64,
    results_tx: watch::Sender<Option<SharedResult>>,
}

impl TelemetrySampler {
    pub fn new(config: SamplerConfig) -> Self {
        let (results_tx, _) = watch::channel(None);
        Self {
            config,
            state: SamplerState::Idle,
            consecutive_failures: 0,
            cycle: 0,
            results_tx,
        }
    }

    /// Receiver for published results. Consumers only ever observe a
    /// complete result; the slot is replaced wholesale each cycle.
    pub fn subscribe(&self) -> watch::Receiver<Option<SharedResult>> {
        self.results_tx.subscribe()
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Effective delay before the next scheduled attempt.
    pub fn next_delay(&self) -> Duration {
        backoff_delay(
            self.config.interval,
            self.consecutive_failures,
            self.config.backoff_ceiling,
        )
    }

    /// Run one sampling cycle synchronously and publish its result.
    pub fn sample_once(&mut self) -> SharedResult {
        self.state = SamplerState::Sampling;
        self.cycle += 1;

        let result = match self.collect() {
            Ok(sample) => {
                self.consecutive_failures = 0;
                self.state = SamplerState::Idle;
                SampleResult {
                    cycle: self.cycle,
                    outcome: SampleOutcome::Snapshots(sample),
                }
            }
            Err(error) => {
                self.consecutive_failures += 1;
                self.state = SamplerState::Backoff;
                log::warn!(
                    "sampling cycle {} failed ({}), {} consecutive failure(s), next attempt in {:?}: {}",
                    self.cycle,
                    error.kind(),
                    self.consecutive_failures,
                    self.next_delay(),
                    error
                );
                let detail = error.to_string();
                SampleResult {
                    cycle: self.cycle,
                    outcome: SampleOutcome::Failed { error, detail },
                }
            }
        };

        let shared = Arc::new(result);
        self.results_tx.send_replace(Some(shared.clone()));
        shared
    }

    fn collect(&self) -> Result<Sample> {
        let device_out = runner::run(&self.config.binary, DEVICE_QUERY, self.config.query_timeout)?;
        let devices = parser::parse_devices(&device_out.stdout)?;

        let process_out =
            runner::run(&self.config.binary, PROCESS_QUERY, self.config.query_timeout)?;
        let processes = parser::parse_processes(&process_out.stdout)?;

        let mut warnings: Vec<String> =
            devices.warnings.iter().map(ToString::to_string).collect();
        warnings.extend(processes.warnings.iter().map(ToString::to_string));

        let mut snapshots = devices.snapshots;
        // The process table carries no device column; it belongs to the
        // lowest-index device, the upstream tool's primary-GPU view.
        if let Some(first) = snapshots.first_mut() {
            first.processes = processes.entries;
        }

        Ok(Sample {
            captured_at: chrono::Utc::now().timestamp(),
            snapshots,
            warnings,
        })
    }

    /// Drive the sampling loop until the shutdown signal fires.
    ///
    /// Out-of-band refresh requests share this loop with the timer, which is
    /// what serializes them against scheduled samples.
    pub async fn run(
        mut self,
        mut refresh_rx: mpsc::Receiver<()>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        log::info!(
            "telemetry sampler started (interval {:?}, backoff ceiling {:?})",
            self.config.interval,
            self.config.backoff_ceiling
        );

        self.sample_once();

        loop {
            let delay = self.next_delay();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    self.sample_once();
                }
                Some(()) = refresh_rx.recv() => {
                    log::debug!("out-of-band refresh requested");
                    self.sample_once();
                }
                _ = shutdown.recv() => {
                    log::info!("telemetry sampler shutting down");
                    break;
                }
            }
        }
    }
}

/// Owns the Tokio runtime driving a [`TelemetrySampler`] and the channels
/// into it, so synchronous callers get a clean start/observe/shutdown
/// surface.
pub struct SamplerRuntime {
    results_rx: watch::Receiver<Option<SharedResult>>,
    refresh_tx: mpsc::Sender<()>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_grace: Duration,
    runtime: tokio::runtime::Runtime,
}

impl SamplerRuntime {
    /// Build the runtime and spawn the sampling task.
    pub fn start(config: SamplerConfig) -> anyhow::Result<Self> {
        let shutdown_grace = config.query_timeout + Duration::from_secs(1);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("telemetry-worker")
            .build()?;

        let sampler = TelemetrySampler::new(config);
        let results_rx = sampler.subscribe();
        let (refresh_tx, refresh_rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        runtime.spawn(sampler.run(refresh_rx, shutdown_rx));

        Ok(Self {
            results_rx,
            refresh_tx,
            shutdown_tx,
            shutdown_grace,
            runtime,
        })
    }

    /// The most recently published result, if any cycle has completed.
    pub fn latest(&self) -> Option<SharedResult> {
        self.results_rx.borrow().clone()
    }

    /// Block until a new result is published or `timeout` elapses.
    pub fn next_result(&mut self, timeout: Duration) -> Option<SharedResult> {
        let rx = &mut self.results_rx;
        let changed = self
            .runtime
            .block_on(async { tokio::time::timeout(timeout, rx.changed()).await });
        match changed {
            Ok(Ok(())) => rx.borrow_and_update().clone(),
            _ => None,
        }
    }

    /// Sender a collaborator can hold to trigger out-of-cycle refreshes.
    pub fn refresh_sender(&self) -> mpsc::Sender<()> {
        self.refresh_tx.clone()
    }

    pub fn request_refresh(&self) {
        let _ = self.refresh_tx.try_send(());
    }

    /// Stop the timer and wait for the worker, bounded by the query timeout
    /// so an in-flight subprocess is reaped rather than orphaned.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        self.runtime.shutdown_timeout(self.shutdown_grace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExecutionError, TelemetryError};

    fn test_config(binary: PathBuf) -> SamplerConfig {
        SamplerConfig {
            binary,
            interval: Duration::from_secs(2),
            backoff_ceiling: Duration::from_secs(30),
            query_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_secs(2);
        let ceiling = Duration::from_secs(30);
        assert_eq!(backoff_delay(base, 0, ceiling), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 1, ceiling), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2, ceiling), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 3, ceiling), Duration::from_secs(8));
        assert_eq!(backoff_delay(base, 4, ceiling), Duration::from_secs(16));
        assert_eq!(backoff_delay(base, 5, ceiling), Duration::from_secs(30));
        assert_eq!(backoff_delay(base, 12, ceiling), Duration::from_secs(30));
    }

    #[test]
    fn backoff_is_monotonic_in_failure_count() {
        let base = Duration::from_secs(2);
        let ceiling = Duration::from_secs(30);
        let mut previous = Duration::ZERO;
        for failures in 1..20 {
            let delay = backoff_delay(base, failures, ceiling);
            assert!(delay >= previous, "delay shrank at failure {failures}");
            assert!(delay <= ceiling);
            previous = delay;
        }
    }

    #[test]
    fn missing_binary_publishes_failed_not_found() {
        let mut sampler =
            TelemetrySampler::new(test_config(PathBuf::from("/nonexistent/vendor-smi")));
        let rx = sampler.subscribe();

        let result = sampler.sample_once();
        assert_eq!(result.cycle, 1);
        match &result.outcome {
            SampleOutcome::Failed { error, detail } => {
                assert!(matches!(
                    error,
                    TelemetryError::Execution(ExecutionError::NotFound { .. })
                ));
                assert!(!detail.is_empty());
            }
            other => panic!("expected failure, got {other:?}"),
        }

        // First failure retries after the base interval, then doubles.
        assert_eq!(sampler.state(), SamplerState::Backoff);
        assert_eq!(sampler.next_delay(), Duration::from_secs(2));
        sampler.sample_once();
        assert_eq!(sampler.next_delay(), Duration::from_secs(4));
        sampler.sample_once();
        assert_eq!(sampler.next_delay(), Duration::from_secs(8));

        // The slot holds the newest result only.
        let latest = rx.borrow().clone().unwrap();
        assert_eq!(latest.cycle, 3);
    }

    #[cfg(unix)]
    fn fake_smi(dir: &tempfile::TempDir) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("fake-smi");
        std::fs::write(
            &path,
            "#!/bin/sh\n\
             case \"$1\" in\n\
             *compute-apps*) echo '4021, python3, 512'; echo '1200, Xorg, 2048' ;;\n\
             *) echo '0, Fake GPU, 45, 2048, 8192, 62, 150.5, 250.0' ;;\n\
             esac\n",
        )
        .unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn successful_cycle_attaches_processes_to_primary_device() {
        let dir = tempfile::tempdir().unwrap();
        let mut sampler = TelemetrySampler::new(test_config(fake_smi(&dir)));

        let result = sampler.sample_once();
        let sample = result.sample().expect("cycle should succeed");
        assert_eq!(sample.snapshots.len(), 1);

        let primary = sample.primary().unwrap();
        assert_eq!(primary.name, "Fake GPU");
        assert_eq!(primary.processes.len(), 2);
        // Descending memory: Xorg (2048) before python3 (512).
        assert_eq!(primary.processes[0].pid, 1200);
        assert_eq!(sampler.state(), SamplerState::Idle);
    }

    #[cfg(unix)]
    #[test]
    fn success_resets_backoff_to_base() {
        let dir = tempfile::tempdir().unwrap();
        let mut sampler =
            TelemetrySampler::new(test_config(PathBuf::from("/nonexistent/vendor-smi")));

        sampler.sample_once();
        sampler.sample_once();
        sampler.sample_once();
        assert_eq!(sampler.next_delay(), Duration::from_secs(8));

        sampler.config.binary = fake_smi(&dir);
        let result = sampler.sample_once();
        assert!(result.is_ok());
        assert_eq!(sampler.consecutive_failures(), 0);
        assert_eq!(sampler.next_delay(), Duration::from_secs(2));
    }

    #[test]
    fn cycle_counter_is_monotonic() {
        let mut sampler =
            TelemetrySampler::new(test_config(PathBuf::from("/nonexistent/vendor-smi")));
        let first = sampler.sample_once();
        let second = sampler.sample_once();
        assert!(second.cycle > first.cycle);
    }
}
