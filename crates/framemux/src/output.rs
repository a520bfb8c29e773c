use std::fmt::Write as _;
use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use framemux_dispatch::DispatchStats;
use framemux_frame::{id_name, Frame};
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
struct ReplyOutput<'a> {
    kind: &'static str,
    id: u8,
    id_name: &'a str,
    seq: u8,
    ack: u8,
    payload_hex: String,
    payload_text: Option<String>,
    timestamp: String,
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    kind: &'static str,
    peers: usize,
    #[serde(flatten)]
    stats: &'a DispatchStats,
}

pub fn print_reply<const N: usize>(frame: &Frame<N>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                kind: "reply",
                id: frame.id(),
                id_name: id_name(frame.id()),
                seq: frame.seq(),
                ack: frame.ack(),
                payload_hex: hex(frame.payload()),
                payload_text: text_preview(frame.payload()),
                timestamp: now_unix_seconds(),
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
                .set_header(vec!["ID", "SEQ", "ACK", "PAYLOAD"])
                .add_row(vec![
                    format!("{} ({})", frame.id(), id_name(frame.id())),
                    frame.seq().to_string(),
                    frame.ack().to_string(),
                    payload_cell(frame.payload()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "id={} ({}) seq={} ack={} payload={}",
                frame.id(),
                id_name(frame.id()),
                frame.seq(),
                frame.ack(),
                payload_cell(frame.payload())
            );
        }
        OutputFormat::Raw => print_raw(frame.as_bytes()),
    }
}

pub fn print_stats(stats: &DispatchStats, peers: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            let out = StatsOutput {
                kind: "stats",
                peers,
                stats,
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
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in stat_rows(stats, peers) {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line = stat_rows(stats, peers)
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
        }
    }
}

fn stat_rows(stats: &DispatchStats, peers: usize) -> [(&'static str, u64); 9] {
    [
        ("peers", peers as u64),
        ("frames_received", stats.frames_received),
        ("accepted", stats.accepted),
        ("duplicates", stats.duplicates),
        ("unreliable", stats.unreliable),
        ("unknown", stats.unknown),
        ("handler_errors", stats.handler_errors),
        ("transport_errors", stats.transport_errors),
        ("session_resets", stats.session_resets),
    ]
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Lowercase hex without separators.
pub fn hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Payload as UTF-8 with trailing zero padding removed, if it is text.
fn text_preview(payload: &[u8]) -> Option<String> {
    let end = payload
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    let trimmed = &payload[..end];
    if trimmed.is_empty() {
        return None;
    }
    std::str::from_utf8(trimmed)
        .ok()
        .filter(|text| !text.chars().any(char::is_control))
        .map(str::to_string)
}

fn payload_cell(payload: &[u8]) -> String {
    match text_preview(payload) {
        Some(text) => text,
        None if payload.iter().all(|&b| b == 0) => "<zero>".to_string(),
        None => hex(payload),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
