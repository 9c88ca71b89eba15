use std::path::PathBuf;
use std::time::Duration;

use gpumon::telemetry::{
    parse_power_capabilities, PowerCapabilities, PowerLimitController, PowerLimitRequest,
    PowerSettings,
};
use gpumon::PowerLimitError;

fn controller() -> PowerLimitController {
    // A binary that does not exist: any test that reaches the subprocess
    // layer will fail with Underlying, not OutOfRange.
    PowerLimitController::new(
        PathBuf::from("/nonexistent/vendor-smi"),
        Duration::from_secs(5),
        &PowerSettings::default(),
    )
    .unwrap()
}

#[test]
fn scenario_c_out_of_range_never_reaches_the_subprocess() {
    let caps = PowerCapabilities {
        current_watts: Some(250.0),
        min_watts: Some(100.0),
        max_watts: Some(300.0),
    };
    let request = PowerLimitRequest {
        device_index: 0,
        watts: 400.0,
    };

    let err = controller()
        .apply_with_capabilities(&request, &caps)
        .unwrap_err();
    assert!(matches!(err, PowerLimitError::OutOfRange { .. }));
}

#[test]
fn in_range_request_passes_validation() {
    let caps = PowerCapabilities {
        current_watts: Some(250.0),
        min_watts: Some(100.0),
        max_watts: Some(300.0),
    };
    let request = PowerLimitRequest {
        device_index: 0,
        watts: 250.0,
    };
    assert!(PowerLimitController::validate(&request, &caps).is_ok());
}

#[test]
fn capability_parse_survives_surrounding_noise() {
    let block = "\
    GPU Power Readings\n\
        Power Draw                        : 87.01 W\n\
        Power Limit                       : 220.00 W\n\
        Default Power Limit               : 250.00 W\n\
        Min Power Limit                   : 125.00 W\n\
        Max Power Limit                   : 280.00 W\n";
    let caps = parse_power_capabilities(block);
    assert_eq!(caps.current_watts, Some(220.0));
    assert_eq!(caps.min_watts, Some(125.0));
    assert_eq!(caps.max_watts, Some(280.0));
}

#[test]
fn missing_capability_lines_leave_bounds_unknown() {
    let caps = parse_power_capabilities("No power information available\n");
    assert_eq!(caps.current_watts, None);
    assert_eq!(caps.min_watts, None);
    assert_eq!(caps.max_watts, None);
}
