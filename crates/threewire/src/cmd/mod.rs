use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use threewire_frame::{LinkMessage, PacketType};

use crate::exit::{CliError, CliResult, DATA_INVALID, USAGE};
use crate::output::OutputFormat;

pub mod attach;
pub mod decode;
pub mod encode;
#[cfg(unix)]
pub mod loopback;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one frame and print its wire bytes.
    Encode(EncodeArgs),
    /// Decode a captured byte stream into frames.
    Decode(DecodeArgs),
    /// Run two engines over a local socket pair and exchange packets.
    #[cfg(unix)]
    Loopback(LoopbackArgs),
    /// Handshake over a serial device and print received packets.
    Attach(AttachArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        #[cfg(unix)]
        Command::Loopback(args) => loopback::run(args, format),
        Command::Attach(args) => attach::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PacketKind {
    Ack,
    Cmd,
    Acl,
    Sco,
    Event,
    Iso,
    Vendor,
    Link,
}

impl From<PacketKind> for PacketType {
    fn from(kind: PacketKind) -> Self {
        match kind {
            PacketKind::Ack => PacketType::Ack,
            PacketKind::Cmd => PacketType::Command,
            PacketKind::Acl => PacketType::Acl,
            PacketKind::Sco => PacketType::Sco,
            PacketKind::Event => PacketType::Event,
            PacketKind::Iso => PacketType::Iso,
            PacketKind::Vendor => PacketType::Vendor,
            PacketKind::Link => PacketType::LinkControl,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LinkKind {
    SyncReq,
    SyncResp,
    ConfigReq,
    ConfigResp,
    SleepReq,
    WokenReq,
    WakeupReq,
}

impl LinkKind {
    pub fn message(self, window: Option<u8>) -> LinkMessage {
        match self {
            LinkKind::SyncReq => LinkMessage::SyncReq,
            LinkKind::SyncResp => LinkMessage::SyncResp,
            LinkKind::ConfigReq => LinkMessage::ConfigReq {
                window: window.unwrap_or(threewire_link::config::DEFAULT_TX_WINDOW),
            },
            LinkKind::ConfigResp => LinkMessage::ConfigResp { window },
            LinkKind::SleepReq => LinkMessage::SleepReq,
            LinkKind::WokenReq => LinkMessage::WokenReq,
            LinkKind::WakeupReq => LinkMessage::WakeupReq,
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Packet type.
    #[arg(long = "type", short = 't', value_name = "TYPE", default_value = "acl")]
    pub kind: PacketKind,
    /// Sequence number (0-7).
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=7))]
    pub seq: u8,
    /// Acknowledgment number (0-7).
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=7))]
    pub ack: u8,
    /// Force the reliable bit on. Command and ACL are reliable by default.
    #[arg(long, conflicts_with = "unreliable")]
    pub reliable: bool,
    /// Force the reliable bit off.
    #[arg(long)]
    pub unreliable: bool,
    /// Payload as hex.
    #[arg(long, conflicts_with = "link")]
    pub hex: Option<String>,
    /// Emit a link-control message instead of a raw payload.
    #[arg(long, value_name = "MESSAGE")]
    pub link: Option<LinkKind>,
    /// Window carried by CONFIG_REQ / CONFIG_RESP.
    #[arg(long, requires = "link", value_parser = clap::value_parser!(u8).range(0..=7))]
    pub window: Option<u8>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire bytes as hex; whitespace, ':' and ',' separators are ignored.
    #[arg(required_unless_present = "file")]
    pub hex: Option<String>,
    /// Read raw wire bytes from a file instead.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LoopbackArgs {
    /// Number of ACL packets to send once the link is up.
    #[arg(long, default_value = "1")]
    pub count: usize,
    /// Payload as hex.
    #[arg(long, default_value = "010203")]
    pub hex: String,
    /// Window advertised by both ends (1-7).
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u8).range(1..=7))]
    pub window: u8,
    /// Maximum time for the handshake and for each delivery (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Print link counters of the receiving end at the end.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct AttachArgs {
    /// Serial device path (e.g. /dev/ttyUSB0).
    #[arg(env = "THREEWIRE_DEVICE")]
    pub device: String,
    /// Baud rate.
    #[arg(long, default_value = "115200", env = "THREEWIRE_BAUD")]
    pub baud: u32,
    /// Window advertised in CONFIG_REQ (1-7).
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u8).range(1..=7))]
    pub window: u8,
    /// Maximum time to wait for the handshake (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Exit after receiving N packets.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse hex bytes, ignoring whitespace, `:`, `,` and `0x` prefixes.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let mut digits = String::with_capacity(input.len());
    for token in input.split(|c: char| c.is_whitespace() || c == ':' || c == ',') {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        digits.push_str(token);
    }

    if !digits.is_ascii() {
        return Err(CliError::new(DATA_INVALID, "hex input contains non-ASCII characters"));
    }
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("hex input has an odd number of digits ({})", digits.len()),
        ));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| {
                CliError::new(
                    DATA_INVALID,
                    format!("invalid hex byte '{}'", &digits[i..i + 2]),
                )
            })
        })
        .collect()
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
