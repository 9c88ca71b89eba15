use gpumon::telemetry::{AlertSettings, PowerSettings, SeverityThresholds};
use gpumon::Config;

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.monitor.refresh_interval_ms, 2000);
    assert_eq!(config.monitor.backoff_ceiling_secs, 30);
    assert_eq!(config.monitor.query_timeout_secs, 5);
    assert_eq!(config.monitor.history_capacity, 300);
    assert_eq!(config.binary_name(), "nvidia-smi");
}

#[test]
fn threshold_defaults_follow_the_metric_kinds() {
    let thresholds = SeverityThresholds::default();
    assert_eq!(thresholds.utilization_warning, 70.0);
    assert_eq!(thresholds.utilization_critical, 90.0);
    assert_eq!(thresholds.temperature_warning, 70.0);
    assert_eq!(thresholds.temperature_critical, 85.0);
    assert_eq!(thresholds.power_ratio_warning, 0.8);
    assert_eq!(thresholds.power_ratio_critical, 0.95);
}

#[test]
fn power_defaults_include_privilege_patterns() {
    let settings = PowerSettings::default();
    assert_eq!(settings.mutation_timeout_secs, 10);
    assert!(!settings.permission_patterns.is_empty());
    assert!(!settings.busy_patterns.is_empty());
}

#[test]
fn alert_defaults_are_enabled_with_cooldown() {
    let settings = AlertSettings::default();
    assert!(settings.enabled);
    assert_eq!(settings.cooldown_secs, 300);
}

#[test]
fn partial_document_fills_missing_sections_with_defaults() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config.monitor.refresh_interval_ms, 2000);
    assert_eq!(config.thresholds.memory_critical, 90.0);
}

#[test]
fn overridden_thresholds_survive_a_round_trip() {
    let mut config = Config::default();
    config.thresholds.temperature_warning = 60.0;
    config.power.permission_patterns.push("custom phrase".to_string());

    let json = serde_json::to_string_pretty(&config).unwrap();
    let restored: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.thresholds.temperature_warning, 60.0);
    assert!(restored
        .power
        .permission_patterns
        .iter()
        .any(|p| p == "custom phrase"));
}
