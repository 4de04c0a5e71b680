mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "asvlink", version, about = "USV onboard link layer CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "ASVLINK_LOG_LEVEL",
        global = true
    )]
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
    use crate::cmd::ModuleKind;

    #[test]
    fn parses_module_check_subcommand() {
        let cli = Cli::try_parse_from([
            "asvlink",
            "module",
            "check",
            "--port",
            "/dev/ttyUSB0",
            "--transmitting-disabled",
            "--count",
            "3",
        ])
        .expect("module check args should parse");

        match cli.command {
            Command::Module(ModuleKind::Check(args)) => {
                assert_eq!(args.module.line.port, "/dev/ttyUSB0");
                assert!(args.module.transmitting_disabled);
                assert_eq!(args.module.count, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn image_requires_file() {
        let err = Cli::try_parse_from(["asvlink", "module", "image"])
            .expect_err("missing --file should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_controller_subcommand() {
        let cli = Cli::try_parse_from([
            "asvlink",
            "controller",
            "--config",
            "controller.yaml",
            "--images",
            "/var/lib/asv/images",
        ])
        .expect("controller args should parse");
        assert!(matches!(cli.command, Command::Controller(_)));
    }

    #[test]
    fn parses_registrar_subcommand() {
        let cli = Cli::try_parse_from(["asvlink", "registrar", "-c", "registrar.yml"])
            .expect("registrar args should parse");
        match cli.command {
            Command::Registrar(args) => {
                assert_eq!(args.config, std::path::PathBuf::from("registrar.yml"));
                assert_eq!(args.reply_delay, "1s");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_listen_with_baudrate_alias() {
        let cli = Cli::try_parse_from(["asvlink", "listen", "--baud-rate", "115200", "--count", "1"])
            .expect("listen args should parse");
        match cli.command {
            Command::Listen(args) => assert_eq!(args.line.baudrate, 115_200),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
