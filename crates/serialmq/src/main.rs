mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "serialmq", version, about = "Serial to MQTT command bridge")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Also write debug-level logs to this file.
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_logging(cli.log_format, cli.log_level, cli.log_file.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(err.code);
    }

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_subcommand() {
        let cli = Cli::try_parse_from(["serialmq", "run", "--config", "/etc/serialmq.yaml"])
            .expect("run args should parse");

        match cli.command {
            Command::Run(args) => assert_eq!(args.config, PathBuf::from("/etc/serialmq.yaml")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_encode_with_delimiters() {
        let cli = Cli::try_parse_from(["serialmq", "encode", "M1", "--stx", "1", "--etx", "4"])
            .expect("encode args should parse");

        match cli.command {
            Command::Encode(args) => {
                assert_eq!(args.message, "M1");
                assert_eq!((args.stx, args.etx), (1, 4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_delimiter() {
        let err = Cli::try_parse_from(["serialmq", "encode", "M1", "--stx", "300"])
            .expect_err("delimiter above 255 should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn log_file_is_global() {
        let cli = Cli::try_parse_from(["serialmq", "ports", "--log-file", "/tmp/serialmq.log"])
            .expect("global flag should parse after subcommand");

        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/serialmq.log")));
    }
}
