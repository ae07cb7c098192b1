use std::fmt::Write as _;
use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use threewire_frame::{Frame, LinkMessage, PacketType};
use threewire_link::{LinkStats, Packet};

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

/// One entry of a decoded byte stream.
#[derive(Debug, Serialize)]
pub struct FrameRecord {
    pub offset: usize,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reliable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crc_present: Option<bool>,
    pub length: usize,
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrameRecord {
    pub fn frame(offset: usize, frame: &Frame) -> Self {
        let header = frame.header();
        let payload = frame.payload();
        let link = (header.packet_type == PacketType::LinkControl)
            .then(|| LinkMessage::parse(&payload).map(|msg| describe_link(&msg)))
            .flatten();
        Self {
            offset,
            status: "ok",
            packet_type: Some(header.packet_type.to_string()),
            seq: Some(header.seq.get()),
            ack: Some(header.ack.get()),
            reliable: Some(header.reliable),
            crc_present: Some(header.crc_present),
            length: payload.len(),
            payload: to_hex(&payload),
            link,
            error: None,
        }
    }

    pub fn skipped(offset: usize, status: &'static str, bytes: &[u8], error: Option<String>) -> Self {
        Self {
            offset,
            status,
            packet_type: None,
            seq: None,
            ack: None,
            reliable: None,
            crc_present: None,
            length: bytes.len(),
            payload: to_hex(bytes),
            link: None,
            error,
        }
    }
}

pub fn describe_link(msg: &LinkMessage) -> String {
    match msg {
        LinkMessage::ConfigReq { window } => format!("{msg} window={window}"),
        LinkMessage::ConfigResp { window: Some(window) } => format!("{msg} window={window}"),
        other => other.to_string(),
    }
}

pub fn print_records(records: &[FrameRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(records).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OFFSET", "STATUS", "TYPE", "SEQ", "ACK", "REL", "LEN", "PAYLOAD"]);
            for record in records {
                table.add_row(vec![
                    record.offset.to_string(),
                    record.status.to_string(),
                    record.packet_type.clone().unwrap_or_default(),
                    opt(record.seq),
                    opt(record.ack),
                    opt(record.reliable),
                    record.length.to_string(),
                    record
                        .link
                        .clone()
                        .or_else(|| record.error.clone())
                        .unwrap_or_else(|| record.payload.clone()),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                match &record.packet_type {
                    Some(packet_type) => println!(
                        "@{} {} seq={} ack={} reliable={} len={} {}",
                        record.offset,
                        packet_type,
                        opt(record.seq),
                        opt(record.ack),
                        opt(record.reliable),
                        record.length,
                        record.link.as_deref().unwrap_or(&record.payload)
                    ),
                    None => println!(
                        "@{} {} len={} {}",
                        record.offset,
                        record.status,
                        record.length,
                        record.error.as_deref().unwrap_or(&record.payload)
                    ),
                }
            }
        }
        OutputFormat::Raw => {
            for record in records.iter().filter(|r| r.status == "ok") {
                println!("{}", record.payload);
            }
        }
    }
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    packet_type: String,
    code: u8,
    payload_size: usize,
    payload: String,
    source: &'a str,
    timestamp: String,
}

pub fn print_packet(packet: &Packet, source: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                packet_type: packet.packet_type.to_string(),
                code: packet.packet_type.code(),
                payload_size: packet.payload.len(),
                payload: to_hex(&packet.payload),
                source,
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
                .set_header(vec!["TYPE", "SIZE", "SOURCE", "PAYLOAD"])
                .add_row(vec![
                    packet.packet_type.to_string(),
                    packet.payload.len().to_string(),
                    source.to_string(),
                    to_hex(&packet.payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={} ({}) size={} source={} payload={}",
                packet.packet_type,
                packet.packet_type.code(),
                packet.payload.len(),
                source,
                to_hex(&packet.payload)
            );
        }
        OutputFormat::Raw => {
            print_raw(&packet.payload);
        }
    }
}

pub fn print_stats(stats: &LinkStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(stats).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            let value = serde_json::to_value(stats).unwrap_or_default();
            let Some(fields) = value.as_object() else {
                return;
            };
            if matches!(format, OutputFormat::Table) {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL).set_header(vec!["COUNTER", "VALUE"]);
                for (name, count) in fields {
                    table.add_row(vec![name.clone(), count.to_string()]);
                }
                println!("{table}");
            } else {
                let line: Vec<String> = fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
                println!("{}", line.join(" "));
            }
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Space-separated uppercase hex, as bytes are usually written in traces.
pub fn to_spaced_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_helpers() {
        assert_eq!(to_hex(&[0xC0, 0x01, 0xdb]), "c001db");
        assert_eq!(to_spaced_hex(&[0xC0, 0x01]), "C0 01");
        assert_eq!(to_hex(&[]), "");
    }

    #[test]
    fn link_descriptions_include_window() {
        assert_eq!(
            describe_link(&LinkMessage::ConfigReq { window: 4 }),
            "CONFIG_REQ window=4"
        );
        assert_eq!(describe_link(&LinkMessage::SyncReq), "SYNC_REQ");
    }
}
