use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use asvlink_comm::{Link, Receiver, Syncer};
use asvlink_frame::{MessageId, ModuleId, TimeOrigin};
use tracing::{debug, warn};

use crate::cmd::{install_ctrlc_handler, parse_duration, ListenArgs};
use crate::exit::{comm_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let serial = args.line.serial()?;
    let reply_delay = parse_duration(&args.reply_delay)?;
    let origin = TimeOrigin::starting_now();

    let link = Link::open(&serial, origin.handle())
        .map_err(|err| comm_error("cannot open serial line", err))?;
    let mut receiver = Receiver::from_link(ModuleId::Control, link).with_ack(!args.no_ack);
    let syncer: Syncer<()> = Syncer::new(ModuleId::Control, None).with_reply_delay(reply_delay);

    let shutdown = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(Arc::clone(&shutdown))?;

    let mut printed = 0usize;
    while !shutdown.load(Ordering::Acquire) {
        let msg = match receiver.receive() {
            Ok(msg) => msg,
            Err(err) if err.is_disconnected() => {
                receiver.close();
                return Err(comm_error("line closed", err));
            }
            Err(err) if err.is_timeout() => {
                debug!("no traffic");
                continue;
            }
            Err(err) => {
                warn!(error = %err, "receive failed");
                continue;
            }
        };

        print_message(&msg, &serial.port, format);
        if msg.msg_id == MessageId::SyncRequest {
            if let Err(err) = syncer.respond(&msg, receiver.writer_mut()) {
                warn!(error = %err, "cannot answer sync request");
            }
        }

        printed = printed.saturating_add(1);
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    receiver.close();
    Ok(SUCCESS)
}
