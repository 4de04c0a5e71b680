use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use asvlink_comm::{
    CommError, Link, MeasureError, MeasurementSource, RetryPolicy, Sender, SyncSource, Syncer,
};
use asvlink_frame::{CameraData, CheckData, ImageChunk, MessageId, ModuleId, Payload, TimeOrigin};
use asvlink_transport::LinkStream;
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, parse_duration, ModuleArgs, ModuleKind};
use crate::exit::{comm_error, CliResult, SUCCESS};
use crate::output::{print_module_summary, OutputFormat};

type SerialLink = Link<LinkStream, LinkStream>;

pub fn run(kind: ModuleKind, format: OutputFormat) -> CliResult<i32> {
    match kind {
        ModuleKind::Check(args) => {
            let period = parse_duration(&args.module.period)?;
            let mut source = CheckSource::new(period, args.module.count);
            run_module(&args.module, ModuleId::Check, MessageId::WritingModeA, &mut source, format)
        }
        ModuleKind::Image(args) => {
            let period = parse_duration(&args.module.period)?;
            let mut source = ImageFileSource::new(args.file.clone(), period, args.module.count);
            run_module(&args.module, ModuleId::Camera, MessageId::WritingModeB, &mut source, format)
        }
    }
}

fn run_module(
    args: &ModuleArgs,
    module: ModuleId,
    mode: MessageId,
    source: &mut dyn MeasurementSource,
    format: OutputFormat,
) -> CliResult<i32> {
    let throttle = parse_duration(&args.sleep)?;
    let mut origin = TimeOrigin::starting_now();

    let link = if args.transmitting_disabled {
        info!(%module, "transmitting disabled");
        None
    } else {
        let serial = args.line.serial()?;
        Some(
            SerialLink::open(&serial, origin.handle())
                .map_err(|err| comm_error("cannot open serial line", err))?,
        )
    };

    let mut syncer = Syncer::new(module, link).with_epoch_override(args.start_stamp);
    let synced = match syncer.sync(&mut origin) {
        Ok(source) => source,
        Err(CommError::SyncTimeout { attempts }) => {
            warn!(attempts, "continuing with local time origin");
            if args.start_stamp.is_some() {
                SyncSource::EnvOverride
            } else {
                SyncSource::ProcessStart
            }
        }
        Err(err) => return Err(comm_error("time sync failed", err)),
    };

    let mut sender = Sender::new(module, mode, origin.handle())
        .with_ack(!args.no_ack)
        .with_retry(RetryPolicy::new(args.retries_limit, Duration::ZERO))
        .with_chunk_size(args.chunk_size)
        .with_throttle(throttle);
    if let Some(link) = syncer.into_transport() {
        sender = sender.with_link(link);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(Arc::clone(&shutdown))?;

    let delivered = sender
        .run(source, &shutdown)
        .map_err(|err| comm_error("sender stopped", err))?;
    print_module_summary(module, synced, delivered, sender.is_dry_run(), format);
    Ok(SUCCESS)
}

/// Produces `CheckData` with an incrementing value.
struct CheckSource {
    next: u32,
    period: Duration,
    remaining: Option<usize>,
}

impl CheckSource {
    fn new(period: Duration, count: Option<usize>) -> Self {
        Self {
            next: 0,
            period,
            remaining: count,
        }
    }
}

impl MeasurementSource for CheckSource {
    fn measure(&mut self) -> Result<Payload, MeasureError> {
        take_one(&mut self.remaining, self.next > 0, self.period)?;
        let value = self.next;
        self.next = self.next.wrapping_add(1);
        Ok(Payload::Check(CheckData { value }))
    }
}

/// Re-reads one image file per measurement.
struct ImageFileSource {
    path: PathBuf,
    period: Duration,
    remaining: Option<usize>,
    taken: usize,
}

impl ImageFileSource {
    fn new(path: PathBuf, period: Duration, count: Option<usize>) -> Self {
        Self {
            path,
            period,
            remaining: count,
            taken: 0,
        }
    }
}

impl MeasurementSource for ImageFileSource {
    fn measure(&mut self) -> Result<Payload, MeasureError> {
        take_one(&mut self.remaining, self.taken > 0, self.period)?;
        self.taken += 1;
        let raw = std::fs::read(&self.path)?;
        Ok(Payload::Camera(CameraData::Image(ImageChunk::single(raw))))
    }
}

// Counts down the optional budget and sleeps between measurements.
fn take_one(
    remaining: &mut Option<usize>,
    wait: bool,
    period: Duration,
) -> Result<(), MeasureError> {
    if let Some(left) = remaining {
        if *left == 0 {
            return Err(MeasureError::Exhausted);
        }
        *left -= 1;
    }
    if wait && !period.is_zero() {
        thread::sleep(period);
    }
    Ok(())
}
