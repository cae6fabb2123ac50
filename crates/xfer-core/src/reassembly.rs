//! Ordering, decoding and verifying received chunks.

use crate::codec::{self, CodecError};
use crate::digest::Digest;
use crate::wire::Chunk;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReassemblyError {
    #[error("chunk {sequence} failed to decode: {source}")]
    Decode {
        sequence: u64,
        #[source]
        source: CodecError,
    },
}

/// Order `chunks` by sequence, decode each and concatenate.
///
/// Any decode failure fails the whole reconstruction; no partial buffer
/// is returned. No chunks reassemble to an empty buffer.
pub fn reassemble(mut chunks: Vec<Chunk>) -> Result<Vec<u8>, ReassemblyError> {
    chunks.sort_unstable_by_key(|c| c.sequence);

    // Base64 inflates by 4/3; this is an upper bound on the decoded size.
    let estimate: usize = chunks.iter().map(|c| c.payload.len() / 4 * 3).sum();
    let mut buffer = Vec::with_capacity(estimate);
    for chunk in &chunks {
        codec::decode_into(&chunk.payload, &mut buffer).map_err(|source| {
            ReassemblyError::Decode {
                sequence: chunk.sequence,
                source,
            }
        })?;
    }
    Ok(buffer)
}

/// Recompute the digest of `buffer` and compare with `expected_hex`,
/// ignoring ASCII case on both sides.
pub fn verify(buffer: &[u8], expected_hex: &str, digest: &dyn Digest) -> bool {
    let actual = digest.hex_digest(buffer).to_ascii_lowercase();
    actual == expected_hex.trim().to_ascii_lowercase()
}
