use clap::{Args, Subcommand};
use std::path::PathBuf;

use serialmq_frame::{DEFAULT_ETX, DEFAULT_STX};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod config;
pub mod encode;
pub mod ports;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bridge until interrupted.
    Run(RunArgs),
    /// Load, validate and print the effective configuration.
    Config(ConfigArgs),
    /// List serial ports visible on this machine.
    Ports(PortsArgs),
    /// Print the wire bytes for a message.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args),
        Command::Config(args) => config::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the YAML configuration file.
    #[arg(long, short = 'c', env = "SERIALMQ_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to the YAML configuration file.
    #[arg(long, short = 'c', env = "SERIALMQ_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Message to frame.
    pub message: String,
    /// Start-of-frame byte.
    #[arg(long, default_value_t = DEFAULT_STX)]
    pub stx: u8,
    /// End-of-frame byte.
    #[arg(long, default_value_t = DEFAULT_ETX)]
    pub etx: u8,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
