//! xfer integration test harness.
//!
//! Drives the sender and receiver halves of the engine against each other
//! through plain strings, the same way a QR display and scanner would.
//!
//!   cargo test --test integration

mod properties;
mod scenarios;

use xfer_core::{build_message_sequence, Progress, TransferSession};

// ── Harness ───────────────────────────────────────────────────────────────────

pub const HELLO: &[u8] = b"Hello, World!";

/// A framed transfer split into its three parts.
pub struct Framed {
    pub header: Vec<String>,
    pub data: Vec<String>,
    pub end: String,
}

/// Frame `buffer` and split the payload list into header, data and end.
pub fn frame(buffer: &[u8], chunk_size: usize) -> Framed {
    let mut messages = build_message_sequence(buffer, chunk_size).expect("framing should succeed");
    let end = messages.pop().expect("sequence always ends with a marker");
    let data = messages.split_off(5);
    Framed {
        header: messages,
        data,
        end,
    }
}

/// Feed every payload in order, returning the last progress snapshot.
pub fn feed_all<'a, I>(session: &mut TransferSession, payloads: I) -> Progress
where
    I: IntoIterator<Item = &'a String>,
{
    let mut last = session.progress();
    for p in payloads {
        last = session.feed(p);
    }
    last
}

/// Deterministic permutation so failures are reproducible without a RNG.
pub fn scramble<T: Clone>(items: &[T], seed: u64) -> Vec<T> {
    let mut out = items.to_vec();
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    for i in (1..out.len()).rev() {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let j = (state >> 33) as usize % (i + 1);
        out.swap(i, j);
    }
    out
}

#[test]
fn test_frame_helper_splits_sequence() {
    let framed = frame(HELLO, 10);
    assert_eq!(framed.header.len(), 5);
    assert_eq!(framed.data.len(), 2);
    assert_eq!(framed.end, xfer_core::wire::END_MARKER);
}

#[test]
fn test_scramble_is_a_permutation() {
    let items: Vec<u32> = (0..50).collect();
    let mut shuffled = scramble(&items, 7);
    assert_ne!(shuffled, items);
    shuffled.sort_unstable();
    assert_eq!(shuffled, items);
}
