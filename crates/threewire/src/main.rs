mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "threewire", version, about = "Three-wire (H5) UART transport CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr). THREEWIRE_LOG directives take precedence.
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

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
    fn parses_encode_subcommand() {
        let cli = Cli::try_parse_from([
            "threewire", "encode", "--type", "acl", "--seq", "3", "--hex", "010203",
        ])
        .expect("encode args should parse");

        assert!(matches!(cli.command, Command::Encode(_)));
    }

    #[test]
    fn rejects_out_of_range_sequence_number() {
        let err = Cli::try_parse_from(["threewire", "encode", "--seq", "8"])
            .expect_err("seq 8 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "threewire", "encode", "--hex", "01", "--link", "sync-req",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_attach_subcommand() {
        let cli = Cli::try_parse_from([
            "threewire", "attach", "/dev/ttyUSB0", "--baud", "921600", "--timeout", "3s",
        ])
        .expect("attach args should parse");
        match cli.command {
            Command::Attach(args) => {
                assert_eq!(args.device, "/dev/ttyUSB0");
                assert_eq!(args.baud, 921_600);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
