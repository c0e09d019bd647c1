use serde::Serialize;
use serialmq_bridge::BridgeError;
use serialmq_frame::{frame_bytes, Delimiters};

use crate::cmd::EncodeArgs;
use crate::exit::{bridge_error, frame_error, CliResult, SUCCESS};
use crate::output::{hex, new_table, print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput<'a> {
    message: &'a str,
    stx: u8,
    etx: u8,
    length: usize,
    hex: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let delimiters =
        Delimiters::new(args.stx, args.etx).map_err(|err| frame_error("invalid delimiters", err))?;

    if let Some(byte) = delimiters.collides_with(args.message.as_bytes()) {
        return Err(bridge_error(
            "cannot encode message",
            BridgeError::DelimiterInPayload(byte),
        ));
    }

    let frame = frame_bytes(delimiters, &args.message);
    match format {
        OutputFormat::Json => print_json(&EncodeOutput {
            message: &args.message,
            stx: delimiters.stx,
            etx: delimiters.etx,
            length: frame.len(),
            hex: hex(&frame),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["MESSAGE", "LENGTH", "BYTES"]);
            table.add_row(vec![args.message.clone(), frame.len().to_string(), hex(&frame)]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", hex(&frame)),
        OutputFormat::Raw => print_raw(&frame),
    }
    Ok(SUCCESS)
}
