use std::io::Read;

use tracing::debug;
use ubjwire_codec::decode_with;

use crate::cmd::DecodeArgs;
use crate::exit::{codec_error, io_error, CliResult, SUCCESS};
use crate::json::from_hex;
use crate::output::{print_value, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = match (&args.hex, &args.file) {
        (Some(hex), _) => from_hex(hex)?,
        (None, Some(path)) => std::fs::read(path).map_err(|err| io_error("read failed", err))?,
        (None, None) => {
            let mut bytes = Vec::new();
            std::io::stdin()
                .read_to_end(&mut bytes)
                .map_err(|err| io_error("read stdin failed", err))?;
            bytes
        }
    };
    debug!(len = bytes.len(), "decoding");

    let value = decode_with(&bytes, args.floats.codec_config())
        .map_err(|err| codec_error("decode failed", err))?;
    print_value(&value, &bytes, format);
    Ok(SUCCESS)
}
