use anyhow::Result;
use clap::ArgMatches;
use colored::Colorize;

use crate::core::Config;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("path", _)) => {
            println!("{}", Config::path()?.display());
            Ok(())
        }
        Some(("init", _)) => {
            let config = Config::load()?;
            config.save()?;
            println!(
                "{} {}",
                "Settings written to".green(),
                Config::path()?.display().to_string().cyan().bold()
            );
            Ok(())
        }
        _ => {
            println!("Use 'gpumon config --help' for more information.");
            Ok(())
        }
    }
}
