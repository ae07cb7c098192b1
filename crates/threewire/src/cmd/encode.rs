use bytes::BytesMut;
use serde::Serialize;
use threewire_frame::{encode_frame, Header, PacketType, SeqNum, MAX_PAYLOAD};

use crate::cmd::{parse_hex, EncodeArgs};
use crate::exit::{frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{describe_link, print_raw, to_hex, to_spaced_hex, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput {
    packet_type: String,
    seq: u8,
    ack: u8,
    reliable: bool,
    length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<String>,
    header: String,
    wire: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let (packet_type, payload, link) = match args.link {
        Some(kind) => {
            let msg = kind.message(args.window);
            (PacketType::LinkControl, msg.to_bytes(), Some(describe_link(&msg)))
        }
        None => {
            let payload = match &args.hex {
                Some(hex) => parse_hex(hex)?,
                None => Vec::new(),
            };
            (PacketType::from(args.kind), payload, None)
        }
    };

    if payload.len() > MAX_PAYLOAD {
        return Err(CliError::new(
            USAGE,
            format!("payload too large ({} bytes, max {MAX_PAYLOAD})", payload.len()),
        ));
    }

    let reliable = if args.reliable {
        true
    } else if args.unreliable {
        false
    } else {
        packet_type.is_reliable()
    };
    let header = Header::new(
        packet_type,
        reliable,
        SeqNum::wrapping(args.seq),
        SeqNum::wrapping(args.ack),
        payload.len(),
    );

    let mut wire = BytesMut::new();
    encode_frame(&header, &payload, &mut wire).map_err(|err| frame_error("encode failed", err))?;

    match format {
        OutputFormat::Json => {
            let out = EncodeOutput {
                packet_type: packet_type.to_string(),
                seq: args.seq,
                ack: args.ack,
                reliable,
                length: payload.len(),
                link,
                header: to_hex(&header.encode()),
                wire: to_hex(&wire),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", to_spaced_hex(&wire)),
        OutputFormat::Raw => print_raw(&wire),
    }

    Ok(SUCCESS)
}
