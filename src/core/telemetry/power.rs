use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::runner;
use crate::error::{ExecutionError, PowerLimitError};
use crate::platform::is_elevated;

static CURRENT_LIMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Power Limit\s*:\s*([0-9.]+) W").unwrap());
static MIN_LIMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Min Power Limit\s*:\s*([0-9.]+) W").unwrap());
static MAX_LIMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Max Power Limit\s*:\s*([0-9.]+) W").unwrap());

/// A requested power-limit change. Validated, dispatched, never persisted.
#[derive(Debug, Clone, Copy)]
pub struct PowerLimitRequest {
    pub device_index: u32,
    pub watts: f64,
}

/// Device-reported power-limit bounds from the capability query.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerCapabilities {
    pub current_watts: Option<f64>,
    pub min_watts: Option<f64>,
    pub max_watts: Option<f64>,
}

/// Confirmation of an applied change.
#[derive(Debug, Clone)]
pub struct AppliedPowerLimit {
    pub device_index: u32,
    pub watts: f64,
    /// Whatever the utility printed on success, trimmed
    pub message: String,
}

/// Settings for the mutation path. The exact stderr phrasings that mean
/// "needs privileges" vary by platform and driver version, so both lists are
/// configuration, not constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerSettings {
    pub mutation_timeout_secs: u64,
    pub permission_patterns: Vec<String>,
    pub busy_patterns: Vec<String>,
}

impl Default for PowerSettings {
    fn default() -> Self {
        Self {
            mutation_timeout_secs: 10,
            permission_patterns: vec![
                "insufficient permissions".to_string(),
                "permission denied".to_string(),
                "requires root".to_string(),
                "access denied".to_string(),
                "not authorized".to_string(),
            ],
            busy_patterns: vec![
                "currently in use".to_string(),
                "device is busy".to_string(),
                "in use by another client".to_string(),
            ],
        }
    }
}

/// Validates and applies power-limit changes through the vendor utility.
pub struct PowerLimitController {
    binary: PathBuf,
    query_timeout: Duration,
    mutation_timeout: Duration,
    permission_matcher: RegexSet,
    busy_matcher: RegexSet,
    refresh: Option<mpsc::Sender<()>>,
}

impl PowerLimitController {
    pub fn new(
        binary: PathBuf,
        query_timeout: Duration,
        settings: &PowerSettings,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            binary,
            query_timeout,
            mutation_timeout: Duration::from_secs(settings.mutation_timeout_secs),
            permission_matcher: case_insensitive_set(&settings.permission_patterns)?,
            busy_matcher: case_insensitive_set(&settings.busy_patterns)?,
            refresh: None,
        })
    }

    /// Attach the sampler's refresh sender so a successful change shows up
    /// without waiting for the next timer tick.
    pub fn with_refresh_notifier(mut self, refresh: mpsc::Sender<()>) -> Self {
        self.refresh = Some(refresh);
        self
    }

    /// Query the device's current/min/max power limits (`-q -d POWER`).
    pub fn query_capabilities(
        &self,
        device_index: u32,
    ) -> Result<PowerCapabilities, PowerLimitError> {
        let index = device_index.to_string();
        let args = ["-q", "-d", "POWER", "-i", index.as_str()];
        let out = runner::run(&self.binary, &args, self.query_timeout)
            .map_err(|err| self.classify_execution(err))?;
        Ok(parse_power_capabilities(&out.stdout))
    }

    /// Check a request against device-reported bounds. Pure; a rejected
    /// request never reaches the subprocess layer.
    pub fn validate(
        request: &PowerLimitRequest,
        caps: &PowerCapabilities,
    ) -> Result<(), PowerLimitError> {
        if !request.watts.is_finite() || request.watts <= 0.0 {
            return Err(PowerLimitError::OutOfRange {
                requested: request.watts,
                min: caps.min_watts.unwrap_or(0.0),
                max: caps.max_watts.unwrap_or(0.0),
            });
        }
        if let (Some(min), Some(max)) = (caps.min_watts, caps.max_watts) {
            if request.watts < min || request.watts > max {
                return Err(PowerLimitError::OutOfRange {
                    requested: request.watts,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Validate against a fresh capability query, then apply.
    pub fn apply(&self, request: &PowerLimitRequest) -> Result<AppliedPowerLimit, PowerLimitError> {
        let caps = self.query_capabilities(request.device_index)?;
        self.apply_with_capabilities(request, &caps)
    }

    /// Apply against already-known bounds.
    pub fn apply_with_capabilities(
        &self,
        request: &PowerLimitRequest,
        caps: &PowerCapabilities,
    ) -> Result<AppliedPowerLimit, PowerLimitError> {
        Self::validate(request, caps)?;

        let index = request.device_index.to_string();
        let watts = format!("{}", request.watts);
        let args = ["-i", index.as_str(), "-pl", watts.as_str()];

        log::info!(
            "setting power limit of device {} to {} W",
            request.device_index,
            request.watts
        );
        let out = runner::run(&self.binary, &args, self.mutation_timeout)
            .map_err(|err| self.classify_execution(err))?;

        if let Some(refresh) = &self.refresh {
            let _ = refresh.try_send(());
        }

        Ok(AppliedPowerLimit {
            device_index: request.device_index,
            watts: request.watts,
            message: out.stdout.trim().to_string(),
        })
    }

    fn classify_execution(&self, err: ExecutionError) -> PowerLimitError {
        match err {
            ExecutionError::NonZeroExit { stderr, .. } => self.classify_stderr(&stderr),
            other => PowerLimitError::Underlying {
                detail: other.to_string(),
            },
        }
    }

    fn classify_stderr(&self, stderr: &str) -> PowerLimitError {
        if self.permission_matcher.is_match(stderr) {
            let mut detail = stderr.to_string();
            if !is_elevated() {
                detail.push_str("; run with elevated privileges");
            }
            PowerLimitError::PermissionDenied { detail }
        } else if self.busy_matcher.is_match(stderr) {
            PowerLimitError::DeviceBusy {
                detail: stderr.to_string(),
            }
        } else {
            PowerLimitError::Underlying {
                detail: stderr.to_string(),
            }
        }
    }
}

/// Pull current/min/max limits out of the `-q -d POWER` block.
///
/// Lines are trimmed and matched anchored, so "Min Power Limit" never feeds
/// the plain "Power Limit" capture.
pub fn parse_power_capabilities(raw: &str) -> PowerCapabilities {
    let mut caps = PowerCapabilities::default();
    for line in raw.lines() {
        let line = line.trim();
        if let Some(m) = CURRENT_LIMIT_RE.captures(line) {
            caps.current_watts = m[1].parse().ok();
        } else if let Some(m) = MIN_LIMIT_RE.captures(line) {
            caps.min_watts = m[1].parse().ok();
        } else if let Some(m) = MAX_LIMIT_RE.captures(line) {
            caps.max_watts = m[1].parse().ok();
        }
    }
    caps
}

fn case_insensitive_set(patterns: &[String]) -> anyhow::Result<RegexSet> {
    let wrapped: Vec<String> = patterns.iter().map(|p| format!("(?i){p}")).collect();
    RegexSet::new(&wrapped).map_err(|err| anyhow::anyhow!("invalid stderr pattern: {err}"))
}
