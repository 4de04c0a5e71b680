use std::io::{IsTerminal, Write};

use asvlink_comm::{SyncSource, WorkerReport};
use asvlink_frame::{Message, ModuleId};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    port: &'a str,
    module: &'static str,
    module_id: u8,
    msg: &'static str,
    msg_id: u8,
    system_time: u32,
    payload_size: u8,
    payload_kind: &'static str,
    payload: String,
    checksum: u8,
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    module: &'a str,
    messages: usize,
    images: usize,
    syncs: usize,
    errors: usize,
    disconnected: bool,
}

pub fn print_message(msg: &Message, port: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                port,
                module: msg.module.name(),
                module_id: msg.module.as_u8(),
                msg: msg.msg_id.name(),
                msg_id: msg.msg_id.as_u8(),
                system_time: msg.system_time,
                payload_size: msg.payload_size,
                payload_kind: msg.payload.kind(),
                payload: msg.payload.to_string(),
                checksum: msg.checksum,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MODULE", "MSG", "TIME", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    msg.module.to_string(),
                    msg.msg_id.to_string(),
                    msg.system_time.to_string(),
                    msg.payload_size.to_string(),
                    msg.payload.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("port={port} {msg}");
        }
        OutputFormat::Raw => match msg.payload.image_chunk() {
            Some(chunk) => print_raw(&chunk.raw_bytes),
            None => println!("{msg}"),
        },
    }
}

pub fn print_reports(reports: &[WorkerReport], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            for report in reports {
                let out = ReportOutput {
                    module: &report.name,
                    messages: report.messages,
                    images: report.images,
                    syncs: report.syncs,
                    errors: report.errors,
                    disconnected: report.disconnected,
                };
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MODULE", "MESSAGES", "IMAGES", "SYNCS", "ERRORS", "LINE"]);
            for report in reports {
                table.add_row(vec![
                    report.name.clone(),
                    report.messages.to_string(),
                    report.images.to_string(),
                    report.syncs.to_string(),
                    report.errors.to_string(),
                    if report.disconnected { "closed" } else { "open" }.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for report in reports {
                println!(
                    "module={} messages={} images={} syncs={} errors={} disconnected={}",
                    report.name,
                    report.messages,
                    report.images,
                    report.syncs,
                    report.errors,
                    report.disconnected
                );
            }
        }
    }
}

#[derive(Serialize)]
struct ModuleSummary {
    module: &'static str,
    time_source: &'static str,
    delivered: usize,
    dry_run: bool,
}

pub fn print_module_summary(
    module: ModuleId,
    synced: SyncSource,
    delivered: usize,
    dry_run: bool,
    format: OutputFormat,
) {
    let out = ModuleSummary {
        module: module.name(),
        time_source: sync_source_name(synced),
        delivered,
        dry_run,
    };
    match format {
        OutputFormat::Json | OutputFormat::Raw => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MODULE", "TIME SOURCE", "DELIVERED", "DRY RUN"])
                .add_row(vec![
                    out.module.to_string(),
                    out.time_source.to_string(),
                    out.delivered.to_string(),
                    out.dry_run.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "module={} time_source={} delivered={} dry_run={}",
            out.module, out.time_source, out.delivered, out.dry_run
        ),
    }
}

pub fn sync_source_name(source: SyncSource) -> &'static str {
    match source {
        SyncSource::Remote => "remote",
        SyncSource::EnvOverride => "start_stamp",
        SyncSource::ProcessStart => "process_start",
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}
