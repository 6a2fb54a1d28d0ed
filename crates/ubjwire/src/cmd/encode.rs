use std::io::Read;

use ubjwire_codec::encode_with;

use crate::cmd::EncodeArgs;
use crate::exit::{codec_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::json::{to_value, IntWidth};
use crate::output::{print_bytes, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let text = match (&args.json, &args.file) {
        (Some(json), _) => json.clone(),
        (None, Some(path)) => {
            std::fs::read_to_string(path).map_err(|err| io_error("read failed", err))?
        }
        (None, None) => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|err| io_error("read stdin failed", err))?;
            text
        }
    };

    let json: serde_json::Value = serde_json::from_str(&text)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid JSON: {err}")))?;
    let width = if args.compact_ints {
        IntWidth::Compact
    } else {
        IntWidth::Int64
    };
    let value = to_value(&json, width)?;
    let bytes = encode_with(&value, args.floats.codec_config())
        .map_err(|err| codec_error("encode failed", err))?;

    print_bytes(&bytes, format);
    Ok(SUCCESS)
}
