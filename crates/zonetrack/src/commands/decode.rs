//! `decode`: run the reader frame decoder on a payload.

use serde::Serialize;
use zonetrack_wire::{FrameKind, decode_frame};

use crate::cli::DecodeArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Debug, Serialize)]
struct DecodeReport {
    tag_id: String,
    kind: FrameKind,
    bytes: usize,
}

/// Parse a hex string (whitespace and colons allowed) into raw bytes.
fn hex_bytes(raw: &str) -> Result<Vec<u8>, CliError> {
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let invalid = |reason: String| CliError::Validation {
        field: "payload".into(),
        reason,
    };
    if digits.len() % 2 != 0 {
        return Err(invalid("odd number of hex digits".into()));
    }
    digits
        .as_bytes()
        .chunks_exact(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| invalid(format!("'{}' is not a hex byte", String::from_utf8_lossy(pair))))
        })
        .collect()
}

pub fn handle(args: &DecodeArgs, ctx: &Context) -> Result<(), CliError> {
    let bytes = if args.hex {
        hex_bytes(&args.payload)?
    } else {
        args.payload.clone().into_bytes()
    };

    let decoded = decode_frame(&bytes).ok_or(CliError::Undecodable)?;
    tracing::debug!(kind = %decoded.kind, tag_id = %decoded.tag_id, "decoded payload");

    let report = DecodeReport {
        tag_id: decoded.tag_id,
        kind: decoded.kind,
        bytes: bytes.len(),
    };
    let out = output::render_single(
        ctx.format,
        &report,
        |r| format!("Tag:   {}\nShape: {}\nBytes: {}", r.tag_id, r.kind, r.bytes),
        |r| r.tag_id.clone(),
    );
    ctx.print(&out);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hex_bytes_accepts_separators() {
        assert_eq!(hex_bytes("41:42 43").unwrap(), b"ABC".to_vec());
        assert!(hex_bytes("414").is_err());
        assert!(hex_bytes("4G").is_err());
    }

    #[test]
    fn binary_payload_goes_through_hex_rule() {
        let mut raw = b"\xff".to_vec();
        raw.extend_from_slice(b"E2801160600002084A7D1B23\r\n");
        let decoded = decode_frame(&raw).unwrap();
        assert_eq!(decoded.kind, FrameKind::Hex);
        assert_eq!(decoded.tag_id, "E2801160600002084A7D1B23");

        assert!(decode_frame(b"\xffTAG1").is_none());
    }
}
