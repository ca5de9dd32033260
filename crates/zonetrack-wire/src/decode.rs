//! Frame decoder for zone reader payloads.
//!
//! Readers on the same physical link speak more than one dialect: some
//! send JSON objects, some send hex dumps with separators, and older
//! firmware just writes the tag id. Each read buffer is decoded on its
//! own; frame boundaries are not part of the protocol.
//!
//! Shapes are tried in a fixed order and the first one that yields a tag
//! wins:
//!
//! 1. **Hex with separators** -- hex digits, whitespace and colons only,
//!    with at least one space. Decoded to printable ASCII, then either a
//!    JSON `rfid_tag` field or the first 24-character EPC run is taken.
//!    If neither is present the frame is dropped.
//! 2. **JSON** -- text starting with `{`; the first of `rfid_tag`,
//!    `tagId`, `tag_id`, `epc` wins.
//! 3. **Raw** -- anything else is the tag id itself.
//!
//! Chunks that are not valid UTF-8 are rendered as space-separated hex
//! pairs and go through rule 1 only.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Field names probed in JSON payloads, highest priority first.
const JSON_TAG_FIELDS: [&str; 4] = ["rfid_tag", "tagId", "tag_id", "epc"];

/// Marker that makes decoded hex text a JSON candidate.
const HEX_JSON_MARKER: &str = "rfid_tag";

static HEX_PAYLOAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Fa-f\s:]+$").expect("static hex payload pattern"));

static EPC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9A-F]{24}").expect("static EPC pattern"));

// ── Public API ───────────────────────────────────────────────────────

/// Which payload shape produced a tag id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FrameKind {
    Hex,
    Json,
    Raw,
}

/// A successfully decoded frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub tag_id: String,
    pub kind: FrameKind,
}

/// Decode a raw read buffer into a tag id.
///
/// Pure: the same bytes always produce the same result. Never panics on
/// malformed input; anything unusable yields `None`.
pub fn decode(raw: &[u8]) -> Option<String> {
    decode_frame(raw).map(|d| d.tag_id)
}

/// Like [`decode`], but also reports which payload shape matched.
pub fn decode_frame(raw: &[u8]) -> Option<Decoded> {
    let decoded = match std::str::from_utf8(raw) {
        Ok(text) => decode_text(text),
        Err(_) => decode_hex(&render_hex(raw)).map(|tag_id| Decoded {
            tag_id,
            kind: FrameKind::Hex,
        }),
    };

    decoded.filter(|d| !d.tag_id.is_empty())
}

/// Convert a separator-delimited hex dump to the printable ASCII it
/// encodes.
///
/// Spaces, colons, CR and LF are stripped; the remainder is walked in
/// two-character pairs. Pairs that are not valid hex, bytes outside
/// `32..=126`, and a trailing odd character are skipped.
pub fn printable_ascii_from_hex(hex: &str) -> String {
    let digits: Vec<char> = hex
        .chars()
        .filter(|c| !matches!(c, ' ' | ':' | '\r' | '\n'))
        .collect();

    let mut text = String::with_capacity(digits.len() / 2);
    for pair in digits.chunks_exact(2) {
        let pair: String = pair.iter().collect();
        if let Ok(byte) = u8::from_str_radix(&pair, 16) {
            if (32..=126).contains(&byte) {
                text.push(char::from(byte));
            }
        }
    }
    text
}

/// Render bytes as uppercase hex pairs separated by single spaces.
pub fn render_hex(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len() * 3);
    for (i, byte) in raw.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02X}");
    }
    out
}

// ── Rule dispatch ────────────────────────────────────────────────────

fn decode_text(text: &str) -> Option<Decoded> {
    if is_hex_payload(text) {
        // A hex dump that carries no tag is dropped; it never falls
        // through to the JSON or raw rules.
        return decode_hex(text).map(|tag_id| Decoded {
            tag_id,
            kind: FrameKind::Hex,
        });
    }

    if text.starts_with('{') {
        if let Some(tag_id) = tag_from_json(text) {
            return Some(Decoded {
                tag_id,
                kind: FrameKind::Json,
            });
        }
    }

    Some(Decoded {
        tag_id: text.to_owned(),
        kind: FrameKind::Raw,
    })
}

fn is_hex_payload(text: &str) -> bool {
    text.contains(' ') && HEX_PAYLOAD.is_match(text)
}

/// Rule 1: hex dump → ASCII → JSON `rfid_tag` or embedded EPC.
fn decode_hex(hex: &str) -> Option<String> {
    let ascii = printable_ascii_from_hex(hex);

    if ascii.contains(HEX_JSON_MARKER) {
        if let Some(tag) = json_field(&ascii, HEX_JSON_MARKER) {
            return Some(tag);
        }
    }

    EPC.find(&ascii).map(|m| m.as_str().to_owned())
}

/// Rule 2: probe the known tag fields in priority order.
fn tag_from_json(text: &str) -> Option<String> {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            tracing::trace!(error = %e, "payload looks like JSON but does not parse");
            return None;
        }
    };
    let object = value.as_object()?;

    JSON_TAG_FIELDS
        .iter()
        .find_map(|field| object.get(*field).and_then(scalar_to_string))
}

fn json_field(text: &str, field: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    value.as_object()?.get(field).and_then(scalar_to_string)
}

/// Strings are taken as-is, numbers by their JSON text. Null, booleans,
/// arrays and objects do not count as a present field.
fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EPC_TAG: &str = "E20034120000001D00000000";

    fn hex_of(text: &str) -> String {
        render_hex(text.as_bytes())
    }

    #[test]
    fn hex_round_trip_recovers_printable_text() {
        let text = "Pea Ridge {zone: 3} ~ OK!";
        assert_eq!(printable_ascii_from_hex(&hex_of(text)), text);
    }

    #[test]
    fn hex_with_colons_and_line_breaks() {
        let hex = "48:69\r\n 21";
        assert_eq!(printable_ascii_from_hex(hex), "Hi!");
    }

    #[test]
    fn hex_drops_non_printable_bytes_and_odd_tail() {
        assert_eq!(printable_ascii_from_hex("41 00 42 7F 43 1"), "ABC");
    }

    #[test]
    fn hex_epc_extracted_from_surrounding_text() {
        let text = format!("...XX rfid_tag not here {EPC_TAG} trailing");
        assert_eq!(decode(hex_of(&text).as_bytes()).as_deref(), Some(EPC_TAG));
    }

    #[test]
    fn hex_json_rfid_tag_field() {
        let payload = r#"{"timestamp":"2025-01-01T10:00:00","rfid_tag":"TAG-42","zone":3}"#;
        let decoded = decode_frame(hex_of(payload).as_bytes()).unwrap();
        assert_eq!(decoded.tag_id, "TAG-42");
        assert_eq!(decoded.kind, FrameKind::Hex);
    }

    #[test]
    fn hex_without_tag_is_dropped() {
        assert_eq!(decode(hex_of("hello world").as_bytes()), None);
    }

    #[test]
    fn hex_requires_a_space() {
        // No separator: not a hex dump, so it is a raw tag id.
        let decoded = decode_frame(b"E20034120000001D00000000").unwrap();
        assert_eq!(decoded.kind, FrameKind::Raw);
        assert_eq!(decoded.tag_id, EPC_TAG);
    }

    #[test]
    fn lowercase_epc_is_not_an_epc() {
        let text = "tag e20034120000001d00000000";
        assert_eq!(decode(hex_of(text).as_bytes()), None);
    }

    #[test]
    fn json_priority_order() {
        assert_eq!(decode(br#"{"tagId":"A","epc":"B"}"#).as_deref(), Some("A"));
        assert_eq!(
            decode(br#"{"epc":"B","tag_id":"C","rfid_tag":"D"}"#).as_deref(),
            Some("D")
        );
        assert_eq!(decode(br#"{"epc":"B"}"#).as_deref(), Some("B"));
    }

    #[test]
    fn json_numeric_tag() {
        assert_eq!(decode(br#"{"tag_id": 1234}"#).as_deref(), Some("1234"));
    }

    #[test]
    fn json_null_field_falls_to_next_key() {
        assert_eq!(
            decode(br#"{"rfid_tag": null, "epc": "B"}"#).as_deref(),
            Some("B")
        );
    }

    #[test]
    fn json_without_known_field_passes_through() {
        let payload = br#"{"zone":4}"#;
        let decoded = decode_frame(payload).unwrap();
        assert_eq!(decoded.kind, FrameKind::Raw);
        assert_eq!(decoded.tag_id, r#"{"zone":4}"#);
    }

    #[test]
    fn malformed_json_passes_through_as_raw() {
        let decoded = decode_frame(b"{not json").unwrap();
        assert_eq!(decoded.kind, FrameKind::Raw);
        assert_eq!(decoded.tag_id, "{not json");
    }

    #[test]
    fn raw_payload_is_returned_unmodified() {
        assert_eq!(decode(b"TAG-0001\r\n").as_deref(), Some("TAG-0001\r\n"));
    }

    #[test]
    fn empty_payload_yields_nothing() {
        assert_eq!(decode(b""), None);
        assert_eq!(decode(br#"{"rfid_tag":""}"#), None);
    }

    #[test]
    fn binary_chunk_with_embedded_epc() {
        let mut raw = vec![0xFF, 0x11, 0x00];
        raw.extend_from_slice(EPC_TAG.as_bytes());
        raw.push(0x9C);
        assert_eq!(decode(&raw).as_deref(), Some(EPC_TAG));
    }

    #[test]
    fn binary_garbage_is_dropped() {
        assert_eq!(decode(&[0xFF, 0x02, 0x61, 0x00, 0x01, 0x9C, 0x7E]), None);
    }

    #[test]
    fn decoding_is_deterministic() {
        let payloads: [&[u8]; 4] = [
            b"{\"tagId\":\"A\"}",
            b"45 32 30 30",
            b"plain",
            &[0xC3, 0x28, 0x41],
        ];
        for payload in payloads {
            assert_eq!(decode_frame(payload), decode_frame(payload));
        }
    }

    #[test]
    fn render_hex_format() {
        assert_eq!(render_hex(&[0x0A, 0xFF, 0x41]), "0A FF 41");
        assert_eq!(render_hex(&[]), "");
    }
}
