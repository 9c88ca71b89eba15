use anyhow::Result;
use clap::{Arg, Command};

use gpumon::commands;

fn main() -> Result<()> {
    gpumon::init_logging();

    let matches = Command::new("gpumon")
        .version(env!("CARGO_PKG_VERSION"))
        .about("GPU telemetry monitor built on the vendor nvidia-smi utility")
        .subcommand(Command::new("show").about("Take one sample and print it"))
        .subcommand(
            Command::new("watch")
                .about("Sample on an interval and print each reading")
                .arg(
                    Arg::new("interval")
                        .short('n')
                        .long("interval")
                        .value_name("SECONDS")
                        .help("Refresh interval in seconds (0.5-60)")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("export-csv")
                        .long("export-csv")
                        .value_name("PATH")
                        .help("Write the retained history as CSV on exit"),
                )
                .arg(
                    Arg::new("export-json")
                        .long("export-json")
                        .value_name("PATH")
                        .help("Write the retained history as JSON on exit"),
                ),
        )
        .subcommand(
            Command::new("power")
                .about("Inspect or change a device's power limit")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("get")
                        .about("Show the current and supported power limits")
                        .arg(device_arg()),
                )
                .subcommand(
                    Command::new("set")
                        .about("Apply a new power limit")
                        .arg(
                            Arg::new("watts")
                                .value_name("WATTS")
                                .help("New power limit in watts")
                                .required(true)
                                .index(1)
                                .value_parser(clap::value_parser!(f64)),
                        )
                        .arg(device_arg()),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Configuration helpers")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("path").about("Print the config file location"))
                .subcommand(
                    Command::new("init").about("Write the current (or default) settings to disk"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("show", sub_matches)) => commands::show::execute(sub_matches),
        Some(("watch", sub_matches)) => commands::watch::execute(sub_matches),
        Some(("power", sub_matches)) => commands::power::execute(sub_matches),
        Some(("config", sub_matches)) => commands::config::execute(sub_matches),
        _ => {
            println!("Use 'gpumon --help' for more information.");
            Ok(())
        }
    }
}

fn device_arg() -> Arg {
    Arg::new("device")
        .short('i')
        .long("device")
        .value_name("INDEX")
        .help("Target device index")
        .default_value("0")
        .value_parser(clap::value_parser!(u32))
}
