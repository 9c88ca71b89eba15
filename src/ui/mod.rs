pub mod formatters;

pub use formatters::{
    format_memory, format_percent, format_power, format_process_memory, format_temperature,
    paint, severity_color,
};
