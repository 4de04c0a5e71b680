use std::path::PathBuf;

use asvlink_frame::ModuleId;
use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod controller;
pub mod listen;
pub mod module;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receive from every enabled module line in a config file.
    Controller(ControllerArgs),
    /// Same as `controller`, answering as the registrar (module 0xFF).
    Registrar(ControllerArgs),
    /// Run a module: sync the time origin, then send measurements.
    #[command(subcommand)]
    Module(ModuleKind),
    /// Serve one line and print every message received on it.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Controller(args) => controller::run(args, ModuleId::Control, format),
        Command::Registrar(args) => controller::run(args, ModuleId::Registrar, format),
        Command::Module(kind) => module::run(kind, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial line flags shared by every command that opens one line.
#[derive(Args, Debug, Clone)]
pub struct LineArgs {
    /// Serial device.
    #[arg(long, default_value = "/dev/ttySC0")]
    pub port: String,
    /// Line speed in bit/s.
    #[arg(long, alias = "baud-rate", default_value_t = asvlink_transport::DEFAULT_BAUD_RATE)]
    pub baudrate: u32,
    /// Read timeout (e.g. 500ms, 2s).
    #[arg(long, default_value = "500ms")]
    pub timeout: String,
}

impl LineArgs {
    pub fn serial(&self) -> CliResult<asvlink_transport::SerialConfig> {
        Ok(asvlink_transport::SerialConfig::new(self.port.clone())
            .with_baud_rate(self.baudrate)
            .with_timeout(parse_duration(&self.timeout)?))
    }
}

#[derive(Args, Debug)]
pub struct ControllerArgs {
    /// YAML module table.
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: PathBuf,
    /// Directory for reassembled camera images.
    #[arg(long, value_name = "DIR", default_value = "images")]
    pub images: PathBuf,
    /// Pause before each sync response (e.g. 1s, 0).
    #[arg(long, default_value = "1s")]
    pub reply_delay: String,
}

#[derive(Subcommand, Debug)]
pub enum ModuleKind {
    /// Send an incrementing check counter.
    Check(CheckArgs),
    /// Send an image file as chunked camera frames.
    Image(ImageArgs),
}

/// Flags for the module side of a line.
#[derive(Args, Debug, Clone)]
pub struct ModuleArgs {
    #[command(flatten)]
    pub line: LineArgs,
    /// Do not open the line; log what would be sent.
    #[arg(long)]
    pub transmitting_disabled: bool,
    /// Do not wait for acknowledgements.
    #[arg(long)]
    pub no_ack: bool,
    /// Attempts per frame, including the first.
    #[arg(long, default_value_t = asvlink_comm::sender::DEFAULT_SEND_ATTEMPTS)]
    pub retries_limit: usize,
    /// Image bytes per chunked frame.
    #[arg(long, default_value_t = asvlink_comm::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Pause after every delivered payload (e.g. 100ms).
    #[arg(long, default_value = "0")]
    pub sleep: String,
    /// Time between measurements (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub period: String,
    /// Stop after N measurements.
    #[arg(long)]
    pub count: Option<usize>,
    /// Fallback time origin in Unix seconds.
    #[arg(long, env = asvlink_comm::START_STAMP_ENV)]
    pub start_stamp: Option<u32>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub module: ModuleArgs,
}

#[derive(Args, Debug)]
pub struct ImageArgs {
    #[command(flatten)]
    pub module: ModuleArgs,
    /// Image file sent on every measurement.
    #[arg(long, value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub line: LineArgs,
    /// Do not acknowledge received frames.
    #[arg(long)]
    pub no_ack: bool,
    /// Pause before each sync response (e.g. 1s, 0).
    #[arg(long, default_value = "1s")]
    pub reply_delay: String,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
    asvlink_comm::parse_duration(input).map_err(|err| CliError::new(USAGE, err.to_string()))
}

pub fn install_ctrlc_handler(
    shutdown: std::sync::Arc<std::sync::atomic::AtomicBool>,
) -> CliResult<()> {
    ctrlc::set_handler(move || {
        shutdown.store(true, std::sync::atomic::Ordering::Release);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parse_duration_maps_to_usage() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("nope").unwrap_err().code, USAGE);
    }

    #[test]
    fn line_args_build_serial_config() {
        let line = LineArgs {
            port: "/dev/ttyUSB1".to_string(),
            baudrate: 115_200,
            timeout: "2s".to_string(),
        };
        let serial = line.serial().unwrap();
        assert_eq!(serial.port, "/dev/ttyUSB1");
        assert_eq!(serial.baud_rate, 115_200);
        assert_eq!(serial.timeout, Duration::from_secs(2));
    }
}
