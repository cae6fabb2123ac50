//! Payload text encoding for chunk messages.
//!
//! Each chunk is encoded on its own, so chunk boundaries are byte
//! boundaries and any chunk decodes without its neighbours. Standard
//! alphabet with padding; the alphabet never contains `:`, which keeps the
//! data message delimiter unambiguous.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid base64 payload: {0}")]
pub struct CodecError(#[from] pub base64::DecodeError);

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    Ok(STANDARD.decode(text)?)
}

/// Decode `text` and append the bytes to `out`.
///
/// On error `out` may hold a partially written tail; callers that need
/// all-or-nothing output must discard it.
pub fn decode_into(text: &str, out: &mut Vec<u8>) -> Result<(), CodecError> {
    STANDARD.decode_vec(text, out)?;
    Ok(())
}
