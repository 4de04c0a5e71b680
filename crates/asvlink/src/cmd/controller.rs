use std::sync::Arc;

use asvlink_comm::{Controller, ControllerConfig, DirectorySink};
use asvlink_frame::{ModuleId, TimeOrigin};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, parse_duration, ControllerArgs};
use crate::exit::{comm_error, CliError, CliResult, CONFIG, SUCCESS};
use crate::output::{print_reports, OutputFormat};

/// Serve every enabled line, acknowledging and answering syncs as `responder`.
pub fn run(args: ControllerArgs, responder: ModuleId, format: OutputFormat) -> CliResult<i32> {
    let config = ControllerConfig::load(&args.config)
        .map_err(|err| comm_error("cannot load controller config", err))?;
    let reply_delay = parse_duration(&args.reply_delay)?;

    // The controller's origin is the reference every module syncs to; it never moves.
    let origin = TimeOrigin::starting_now();
    info!(origin_ms = origin.get_origin(), %responder, "controller time origin");

    let sink = Arc::new(DirectorySink::new(&args.images));
    let controller = Controller::from_config(&config, responder, origin.handle(), sink)
        .map_err(|err| comm_error("cannot start controller", err))?
        .with_reply_delay(reply_delay);
    if controller.is_empty() {
        return Err(CliError::new(CONFIG, "no enabled modules in config"));
    }

    install_ctrlc_handler(controller.shutdown_flag())?;
    let reports = controller.run();
    print_reports(&reports, format);
    Ok(SUCCESS)
}
