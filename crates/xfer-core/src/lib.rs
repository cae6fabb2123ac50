//! xfer-core — the transfer protocol engine for moving a byte buffer over a
//! one-way channel of short text payloads (QR codes).
//!
//! Sender side: [`framer::build_message_sequence`] turns a buffer into the
//! ordered payload list. Receiver side: every scanned payload goes through
//! [`session::TransferSession::feed`], which classifies it, tracks progress
//! and reassembles the buffer once the end marker arrives.

pub mod chunk_store;
pub mod codec;
pub mod config;
pub mod digest;
pub mod framer;
pub mod reassembly;
pub mod session;
pub mod wire;

pub use digest::{Digest, DigestAlgorithm};
pub use framer::build_message_sequence;
pub use session::{FailureReason, Progress, SessionState, TransferOutcome, TransferSession};
pub use wire::{classify, Chunk, HeaderField, Message};
