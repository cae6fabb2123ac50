//! xfer wire format — the text payloads carried by each QR code.
//!
//! These literals ARE the protocol. A transfer is the sequence
//!
//! ```text
//! -----BEGIN XFER MESSAGE-----
//! -----BEGIN XFER HEADER-----
//! LEN:<chunk count>
//! HASH:<lowercase hex digest>
//! -----END XFER HEADER-----
//! 0000000000:<base64>
//! 0000000001:<base64>
//! ...
//! -----END XFER MESSAGE-----
//! ```
//!
//! one payload per code. No marker starts with a run of ten digits, so a
//! marker can never be mistaken for a data message.

use std::fmt;

// ── Markers ──────────────────────────────────────────────────────────────────

pub const BEGIN_MARKER: &str = "-----BEGIN XFER MESSAGE-----";
pub const END_MARKER: &str = "-----END XFER MESSAGE-----";
pub const HEADER_BEGIN_MARKER: &str = "-----BEGIN XFER HEADER-----";
pub const HEADER_END_MARKER: &str = "-----END XFER HEADER-----";

pub const LEN_PREFIX: &str = "LEN:";
pub const HASH_PREFIX: &str = "HASH:";

// ── Constants ────────────────────────────────────────────────────────────────

/// Width of the zero-padded decimal sequence number in a data message.
pub const SEQUENCE_WIDTH: usize = 10;

/// Largest sequence number that fits in `SEQUENCE_WIDTH` digits.
pub const MAX_SEQUENCE: u64 = 9_999_999_999;

/// Separator between the sequence number and the payload.
pub const SEQUENCE_DELIMITER: char = ':';

// ── Messages ─────────────────────────────────────────────────────────────────

/// One sequence-numbered, base64-encoded span of the original buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub sequence: u64,
    /// Base64 text exactly as it appeared on the wire.
    pub payload: String,
}

/// Which header line a `HeaderField` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    /// `LEN:` — number of data chunks in the transfer.
    Len,
    /// `HASH:` — hex digest of the whole buffer.
    Hash,
}

impl HeaderField {
    pub fn prefix(self) -> &'static str {
        match self {
            HeaderField::Len => LEN_PREFIX,
            HeaderField::Hash => HASH_PREFIX,
        }
    }
}

/// A classified payload.
///
/// Classification is stateless: the same text always yields the same
/// message, whatever was scanned before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    TransferBegin,
    HeaderBegin,
    HeaderField { field: HeaderField, value: String },
    HeaderEnd,
    DataChunk(Chunk),
    TransferEnd,
    /// Anything else — a misread, or an unrelated QR code in view.
    Unrecognized,
}

impl Message {
    /// Short name for logs and the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::TransferBegin => "transfer-begin",
            Message::HeaderBegin => "header-begin",
            Message::HeaderField { field: HeaderField::Len, .. } => "header-len",
            Message::HeaderField { field: HeaderField::Hash, .. } => "header-hash",
            Message::HeaderEnd => "header-end",
            Message::DataChunk(_) => "data-chunk",
            Message::TransferEnd => "transfer-end",
            Message::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::HeaderField { field, value } => write!(f, "{}{}", field.prefix(), value),
            Message::DataChunk(chunk) => write!(
                f,
                "data-chunk #{} ({} payload chars)",
                chunk.sequence,
                chunk.payload.len()
            ),
            other => f.write_str(other.kind()),
        }
    }
}

// ── Classification ───────────────────────────────────────────────────────────

/// Classify one scanned payload. Never fails: unknown text is
/// `Message::Unrecognized`.
///
/// Markers are matched first, then header prefixes, then the data message
/// pattern (exactly ten ASCII digits, a colon, at least one more character).
pub fn classify(text: &str) -> Message {
    match text {
        BEGIN_MARKER => return Message::TransferBegin,
        END_MARKER => return Message::TransferEnd,
        HEADER_BEGIN_MARKER => return Message::HeaderBegin,
        HEADER_END_MARKER => return Message::HeaderEnd,
        _ => {}
    }

    if let Some(value) = text.strip_prefix(LEN_PREFIX) {
        return Message::HeaderField {
            field: HeaderField::Len,
            value: value.to_string(),
        };
    }
    if let Some(value) = text.strip_prefix(HASH_PREFIX) {
        return Message::HeaderField {
            field: HeaderField::Hash,
            value: value.to_string(),
        };
    }

    match parse_data_message(text) {
        Some(chunk) => Message::DataChunk(chunk),
        None => Message::Unrecognized,
    }
}

fn parse_data_message(text: &str) -> Option<Chunk> {
    let bytes = text.as_bytes();
    if bytes.len() <= SEQUENCE_WIDTH + 1 {
        return None;
    }
    let (digits, rest) = bytes.split_at(SEQUENCE_WIDTH);
    if !digits.iter().all(u8::is_ascii_digit) || rest[0] != SEQUENCE_DELIMITER as u8 {
        return None;
    }
    // Ten ASCII digits always fit in a u64.
    let sequence = digits
        .iter()
        .fold(0u64, |acc, d| acc * 10 + u64::from(d - b'0'));
    Some(Chunk {
        sequence,
        payload: text[SEQUENCE_WIDTH + 1..].to_string(),
    })
}

// ── Tests ────────────────────────────────────────────────────────────────────
