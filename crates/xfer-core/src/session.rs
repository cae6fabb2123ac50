//! Receiver side: the transfer session state machine.
//!
//! ```text
//! Idle ──begin──▶ HeaderCollect ──header end──▶ Transferring ──end──▶ Completed
//!                       │                            │                  Failed
//!                       └──── incomplete header ─────┴──────────────────▶ Failed
//! ```
//!
//! A begin marker restarts the session from any state, discarding whatever
//! was collected. Unrecognized payloads never change anything. Failures are
//! terminal states with a reason, never errors returned from `feed`, so the
//! session stays usable after any of them.

use bytes::Bytes;
use serde::Serialize;

use crate::chunk_store::{ChunkStore, Insert};
use crate::digest::{Digest, DigestAlgorithm};
use crate::reassembly::{reassemble, verify, ReassemblyError};
use crate::wire::{classify, Chunk, HeaderField, Message, MAX_SEQUENCE};

/// Largest `LEN` a session accepts unless configured otherwise.
pub const DEFAULT_MAX_CHUNKS: u64 = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    HeaderCollect,
    Transferring,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

/// The header block of one transfer, fixed once accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub chunk_count: u64,
    pub digest: String,
}

/// Why a session ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("header ended incomplete (length {}, digest {})", presence(.has_len), presence(.has_digest))]
    IncompleteHeader { has_len: bool, has_digest: bool },

    #[error("transfer ended with no chunks received")]
    NoData,

    #[error("reassembly failed: {0}")]
    Reassembly(#[from] ReassemblyError),

    #[error("digest mismatch: header says {expected}, reassembled buffer is {actual}")]
    DigestMismatch { expected: String, actual: String },
}

fn presence(present: &bool) -> &'static str {
    if *present {
        "present"
    } else {
        "missing"
    }
}

/// What a terminal session hands to its caller.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// Reassembled buffer. Present on success and on digest mismatch.
    pub data: Option<Bytes>,
    /// True only when the buffer matched the header digest.
    pub verified: bool,
    pub failure: Option<FailureReason>,
}

impl TransferOutcome {
    pub fn into_data(self) -> Option<Bytes> {
        self.data
    }
}

/// Point-in-time view of a session, cheap enough to take after every scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub state: SessionState,
    pub total_chunks: Option<u64>,
    pub received_chunks: usize,
    /// Sequences in `[0, total_chunks)` not yet received, ascending.
    pub missing_chunks: Vec<u64>,
    pub out_of_range_chunks: usize,
    pub duplicate_chunks: usize,
    /// Sequence of the most recently stored chunk.
    pub current_chunk: Option<u64>,
    pub is_complete: bool,
    pub digest: Option<String>,
    pub failure: Option<String>,
}

impl Progress {
    /// Fraction of declared chunks received, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        match self.total_chunks {
            Some(0) | None => {
                if self.is_complete {
                    1.0
                } else {
                    0.0
                }
            }
            Some(total) => {
                let in_range = total.saturating_sub(self.missing_chunks.len() as u64);
                in_range as f64 / total as f64
            }
        }
    }
}

/// One in-progress or completed transfer on the receiving side.
pub struct TransferSession {
    state: SessionState,
    digest: Box<dyn Digest>,
    /// Declared counts above this are rejected like an unusable `LEN`.
    max_chunks: u64,
    pending_len: Option<u64>,
    pending_digest: Option<String>,
    header: Option<Header>,
    chunks: ChunkStore,
    duplicates: usize,
    outcome: Option<TransferOutcome>,
    /// Frozen view once reassembly has consumed the chunk store.
    terminal: Option<Progress>,
}

impl Default for TransferSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferSession {
    pub fn new() -> Self {
        Self::with_digest(Box::new(DigestAlgorithm::default()))
    }

    pub fn with_digest(digest: Box<dyn Digest>) -> Self {
        Self {
            state: SessionState::Idle,
            digest,
            max_chunks: DEFAULT_MAX_CHUNKS,
            pending_len: None,
            pending_digest: None,
            header: None,
            chunks: ChunkStore::new(),
            duplicates: 0,
            outcome: None,
            terminal: None,
        }
    }

    /// Cap the chunk count a header may declare. Clamped to the largest
    /// count the sequence field can address.
    pub fn with_max_chunks(mut self, max_chunks: u64) -> Self {
        self.max_chunks = max_chunks.min(MAX_SEQUENCE + 1);
        self
    }

    pub fn max_chunks(&self) -> u64 {
        self.max_chunks
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Classify one scanned payload, apply it and return the new progress.
    pub fn feed(&mut self, text: &str) -> Progress {
        self.apply(classify(text));
        self.progress()
    }

    /// Apply an already classified message.
    pub fn apply(&mut self, message: Message) -> SessionState {
        match (self.state, message) {
            (_, Message::TransferBegin) => self.restart(),

            (_, Message::Unrecognized) => {
                tracing::trace!(state = ?self.state, "ignoring unrecognized payload");
            }

            (SessionState::HeaderCollect, Message::HeaderField { field, value }) => {
                self.collect_header_field(field, &value);
            }

            (SessionState::HeaderCollect, Message::HeaderEnd) => self.finish_header(),

            (SessionState::HeaderCollect | SessionState::Transferring, Message::DataChunk(chunk)) => {
                self.store_chunk(chunk);
            }

            (SessionState::Transferring, Message::TransferEnd) => self.finish_transfer(),

            (state, message) => {
                tracing::trace!(?state, kind = message.kind(), "message ignored in this state");
            }
        }
        self.state
    }

    /// Discard everything and start collecting a new header.
    pub fn restart(&mut self) {
        if self.state != SessionState::Idle {
            tracing::debug!(from = ?self.state, "transfer restarted");
        }
        self.clear();
        self.state = SessionState::HeaderCollect;
    }

    /// Discard everything and go back to waiting for a begin marker.
    pub fn reset(&mut self) {
        self.clear();
        self.state = SessionState::Idle;
    }

    fn clear(&mut self) {
        self.pending_len = None;
        self.pending_digest = None;
        self.header = None;
        self.chunks.clear();
        self.duplicates = 0;
        self.outcome = None;
        self.terminal = None;
    }

    fn collect_header_field(&mut self, field: HeaderField, value: &str) {
        let value = value.trim();
        match field {
            HeaderField::Len => {
                let count = match value.parse::<u64>() {
                    Ok(count) if count <= self.max_chunks => count,
                    Ok(count) => {
                        tracing::warn!(
                            count,
                            max_chunks = self.max_chunks,
                            "LEN header above receiver limit, ignoring"
                        );
                        return;
                    }
                    Err(_) => {
                        tracing::warn!(value, "unusable LEN header value, ignoring");
                        return;
                    }
                };
                match self.pending_len {
                    None => self.pending_len = Some(count),
                    Some(existing) if existing != count => {
                        tracing::warn!(existing, ignored = count, "conflicting LEN header, keeping first");
                    }
                    Some(_) => {}
                }
            }
            HeaderField::Hash => {
                if value.is_empty() {
                    tracing::warn!("empty HASH header value, ignoring");
                    return;
                }
                let value = value.to_ascii_lowercase();
                match &self.pending_digest {
                    None => self.pending_digest = Some(value),
                    Some(existing) if *existing != value => {
                        tracing::warn!(existing = %existing, ignored = %value, "conflicting HASH header, keeping first");
                    }
                    Some(_) => {}
                }
            }
        }
    }

    fn finish_header(&mut self) {
        let (Some(chunk_count), Some(digest)) = (self.pending_len, self.pending_digest.clone()) else {
            let reason = FailureReason::IncompleteHeader {
                has_len: self.pending_len.is_some(),
                has_digest: self.pending_digest.is_some(),
            };
            // Without a length nothing buffered so far can be placed.
            self.chunks.clear();
            self.fail(reason, None);
            return;
        };

        if digest.len() != self.digest.hex_len() {
            tracing::warn!(
                digest_len = digest.len(),
                expected_len = self.digest.hex_len(),
                algorithm = self.digest.name(),
                detected = ?DigestAlgorithm::from_hex_len(digest.len()),
                "header digest length does not match the configured algorithm"
            );
        }

        self.chunks.set_declared_count(chunk_count);
        tracing::debug!(
            chunk_count,
            digest = %digest,
            buffered = self.chunks.len(),
            "header complete, transferring"
        );
        self.header = Some(Header {
            chunk_count,
            digest,
        });
        self.state = SessionState::Transferring;
    }

    fn store_chunk(&mut self, chunk: Chunk) {
        let sequence = chunk.sequence;
        match self.chunks.insert(chunk) {
            Insert::Inserted => {
                if let Some(header) = &self.header {
                    if sequence >= header.chunk_count {
                        tracing::debug!(
                            sequence,
                            chunk_count = header.chunk_count,
                            "chunk beyond declared count"
                        );
                    }
                }
                tracing::trace!(sequence, received = self.chunks.len(), "chunk stored");
            }
            Insert::Duplicate { conflicting } => {
                self.duplicates += 1;
                if conflicting {
                    tracing::warn!(sequence, "duplicate chunk with different payload, keeping first");
                } else {
                    tracing::trace!(sequence, "duplicate chunk suppressed");
                }
            }
        }
    }

    fn finish_transfer(&mut self) {
        if self.chunks.is_empty() {
            self.fail(FailureReason::NoData, None);
            return;
        }
        let Some(expected) = self.header.as_ref().map(|h| h.digest.clone()) else {
            // Transferring is only entered with a header in place.
            self.fail(FailureReason::NoData, None);
            return;
        };

        let missing = self.chunks.missing().len();
        if missing > 0 {
            tracing::warn!(missing, "transfer ended short, attempting reassembly anyway");
        }

        let snapshot = self.progress();
        let chunks = std::mem::take(&mut self.chunks).into_sorted();
        let buffer = match reassemble(chunks) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.terminal = Some(snapshot);
                self.fail(FailureReason::from(e), None);
                return;
            }
        };

        if verify(&buffer, &expected, self.digest.as_ref()) {
            tracing::info!(
                bytes = buffer.len(),
                chunks = snapshot.received_chunks,
                "transfer complete, digest verified"
            );
            self.terminal = Some(snapshot);
            self.state = SessionState::Completed;
            self.outcome = Some(TransferOutcome {
                data: Some(Bytes::from(buffer)),
                verified: true,
                failure: None,
            });
            self.freeze();
        } else {
            let actual = self.digest.hex_digest(&buffer);
            self.terminal = Some(snapshot);
            self.fail(
                FailureReason::DigestMismatch { expected, actual },
                Some(Bytes::from(buffer)),
            );
        }
    }

    fn fail(&mut self, reason: FailureReason, data: Option<Bytes>) {
        tracing::warn!(reason = %reason, "transfer failed");
        self.state = SessionState::Failed;
        self.outcome = Some(TransferOutcome {
            data,
            verified: false,
            failure: Some(reason),
        });
        self.freeze();
    }

    /// Pin the terminal view so later queries do not depend on the
    /// consumed chunk store.
    fn freeze(&mut self) {
        let mut view = match self.terminal.take() {
            Some(view) => view,
            None => self.live_progress(),
        };
        view.state = self.state;
        view.is_complete = self.state == SessionState::Completed;
        view.failure = self
            .outcome
            .as_ref()
            .and_then(|o| o.failure.as_ref())
            .map(ToString::to_string);
        self.terminal = Some(view);
    }

    /// Current progress snapshot.
    pub fn progress(&self) -> Progress {
        match &self.terminal {
            Some(view) if self.state.is_terminal() => view.clone(),
            _ => self.live_progress(),
        }
    }

    fn live_progress(&self) -> Progress {
        Progress {
            state: self.state,
            total_chunks: self
                .header
                .as_ref()
                .map(|h| h.chunk_count)
                .or(self.pending_len),
            received_chunks: self.chunks.len(),
            missing_chunks: self.chunks.missing(),
            out_of_range_chunks: self.chunks.out_of_range(),
            duplicate_chunks: self.duplicates,
            current_chunk: self.chunks.last_inserted(),
            is_complete: self.state == SessionState::Completed,
            digest: self
                .header
                .as_ref()
                .map(|h| h.digest.clone())
                .or_else(|| self.pending_digest.clone()),
            failure: None,
        }
    }

    /// The outcome once the session is terminal; `None` while pending.
    pub fn final_result(&self) -> Option<&TransferOutcome> {
        if self.state.is_terminal() {
            self.outcome.as_ref()
        } else {
            None
        }
    }

    /// Take the outcome, leaving the session idle.
    pub fn take_result(&mut self) -> Option<TransferOutcome> {
        if !self.state.is_terminal() {
            return None;
        }
        let outcome = self.outcome.take();
        self.reset();
        outcome
    }
}
