//! Sender side — chunking a buffer and framing it as text payloads.

use crate::codec;
use crate::digest::{Digest, DigestAlgorithm};
use crate::wire::{
    BEGIN_MARKER, END_MARKER, HASH_PREFIX, HEADER_BEGIN_MARKER, HEADER_END_MARKER, LEN_PREFIX,
    MAX_SEQUENCE, SEQUENCE_DELIMITER, SEQUENCE_WIDTH,
};

/// Default raw bytes per chunk. 512 bytes become 684 base64 characters,
/// which scans reliably at medium QR error correction.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("chunk size must be at least 1 byte")]
    ZeroChunkSize,

    #[error("sequence number {0} does not fit in {} digits", SEQUENCE_WIDTH)]
    SequenceOverflow(u64),
}

/// Split `buffer` into spans of at most `chunk_size` bytes and base64-encode
/// each one independently. An empty buffer yields no chunks.
pub fn chunk_data(buffer: &[u8], chunk_size: usize) -> Result<Vec<String>, FrameError> {
    if chunk_size == 0 {
        return Err(FrameError::ZeroChunkSize);
    }
    Ok(buffer.chunks(chunk_size).map(codec::encode).collect())
}

/// The five header payloads that open every transfer.
pub fn create_header(chunk_count: u64, digest_hex: &str) -> [String; 5] {
    [
        BEGIN_MARKER.to_string(),
        HEADER_BEGIN_MARKER.to_string(),
        format!("{LEN_PREFIX}{chunk_count}"),
        format!("{HASH_PREFIX}{digest_hex}"),
        HEADER_END_MARKER.to_string(),
    ]
}

/// One data payload: ten-digit zero-padded sequence, a colon, the payload.
pub fn create_data_message(sequence: u64, payload: &str) -> Result<String, FrameError> {
    if sequence > MAX_SEQUENCE {
        return Err(FrameError::SequenceOverflow(sequence));
    }
    Ok(format!(
        "{sequence:0width$}{SEQUENCE_DELIMITER}{payload}",
        width = SEQUENCE_WIDTH
    ))
}

/// Full payload sequence for `buffer` using the default digest.
pub fn build_message_sequence(buffer: &[u8], chunk_size: usize) -> Result<Vec<String>, FrameError> {
    Framer::new(chunk_size).frame(buffer)
}

/// Frames buffers with a fixed chunk size and digest.
pub struct Framer {
    chunk_size: usize,
    digest: Box<dyn Digest>,
}

impl Framer {
    pub fn new(chunk_size: usize) -> Self {
        Self::with_digest(chunk_size, Box::new(DigestAlgorithm::default()))
    }

    pub fn with_digest(chunk_size: usize, digest: Box<dyn Digest>) -> Self {
        Self { chunk_size, digest }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// `[begin, header-begin, LEN, HASH, header-end, chunk_0 .. chunk_n-1, end]`
    pub fn frame(&self, buffer: &[u8]) -> Result<Vec<String>, FrameError> {
        let chunks = chunk_data(buffer, self.chunk_size)?;
        let digest_hex = self.digest.hex_digest(buffer);

        let mut messages = Vec::with_capacity(chunks.len() + 6);
        messages.extend(create_header(chunks.len() as u64, &digest_hex));
        for (sequence, payload) in chunks.iter().enumerate() {
            messages.push(create_data_message(sequence as u64, payload)?);
        }
        messages.push(END_MARKER.to_string());

        tracing::debug!(
            bytes = buffer.len(),
            chunks = chunks.len(),
            chunk_size = self.chunk_size,
            digest = self.digest.name(),
            "buffer framed"
        );

        Ok(messages)
    }
}
