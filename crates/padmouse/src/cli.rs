use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    /// Map the gamepad to the mouse and keyboard until Ctrl+C.
    Run {
        /// YAML mapping file. Built-in bindings are used when omitted.
        #[clap(short, long)]
        config: Option<PathBuf>,
        /// Update loop frequency in Hz, overrides the config file.
        #[clap(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        frequency: Option<u32>,
    },
    /// Print the effective mapping as YAML.
    DumpConfig {
        /// YAML mapping file to resolve.
        #[clap(short, long)]
        config: Option<PathBuf>,
    },
}

/// Drive the mouse and keyboard from a game controller.
#[derive(Parser)]
#[command(name = "padmouse", version, about, long_about = None)]
pub struct Cli {
    /// Turn debugging information on
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// The command to run
    #[clap(subcommand)]
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::try_parse_from(["padmouse", "-v", "run", "-c", "pad.yaml", "-f", "120"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            Command::Run {
                config: Some(PathBuf::from("pad.yaml")),
                frequency: Some(120),
            }
        );
    }

    #[test]
    fn rejects_zero_frequency() {
        assert!(Cli::try_parse_from(["padmouse", "run", "--frequency", "0"]).is_err());
        assert!(Cli::try_parse_from(["padmouse", "run", "--frequency", "-5"]).is_err());
    }

    #[test]
    fn dump_config_without_file() {
        let cli = Cli::try_parse_from(["padmouse", "--no-color", "dump-config"]).unwrap();
        assert!(cli.no_color);
        assert_eq!(cli.command, Command::DumpConfig { config: None });
    }
}
