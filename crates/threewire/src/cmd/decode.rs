use threewire_frame::slip::DELIMITER;
use threewire_frame::{decode_frame, Decoded, SlipDecoder};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_records, FrameRecord, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let stream = match (&args.file, &args.hex) {
        (Some(path), _) => std::fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        (None, Some(hex)) => parse_hex(hex)?,
        (None, None) => Vec::new(),
    };

    let records = decode_stream(&stream);
    print_records(&records, format);

    let clean = records.iter().all(|r| r.status == "ok" || r.status == "noise");
    Ok(if clean { SUCCESS } else { DATA_INVALID })
}

/// Walk a captured stream the way the engine's intake does.
pub fn decode_stream(stream: &[u8]) -> Vec<FrameRecord> {
    let mut slip = SlipDecoder::new();
    let mut records = Vec::new();
    let mut offset = 0usize;

    while offset < stream.len() {
        let rest = &stream[offset..];
        match decode_frame(rest, &mut slip) {
            Decoded::Incomplete if rest.iter().all(|&b| b == DELIMITER) => break,
            Decoded::Incomplete => {
                records.push(FrameRecord::skipped(
                    offset,
                    "incomplete",
                    rest,
                    Some("no closing delimiter".to_string()),
                ));
                break;
            }
            Decoded::Noise(n) => {
                records.push(FrameRecord::skipped(offset, "noise", &rest[..n], None));
                offset += n;
            }
            Decoded::Invalid { error, consumed } => {
                records.push(FrameRecord::skipped(
                    offset,
                    "invalid",
                    &rest[..consumed],
                    Some(error.to_string()),
                ));
                offset += consumed;
            }
            Decoded::Frame { frame, consumed } => {
                records.push(FrameRecord::frame(offset, &frame));
                offset += consumed;
            }
        }
    }
    records
}
