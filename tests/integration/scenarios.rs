use crate::*;

use xfer_core::digest::digest;
use xfer_core::wire::{BEGIN_MARKER, END_MARKER, HEADER_BEGIN_MARKER, HEADER_END_MARKER};
use xfer_core::{FailureReason, SessionState};

/// "Hello, World!" in 10-byte chunks arrives in either order and verifies.
#[test]
fn test_hello_world_both_orders() {
    let framed = frame(HELLO, 10);
    assert_eq!(framed.header[2], "LEN:2");

    for data in [framed.data.clone(), scramble(&framed.data, 1), {
        let mut d = framed.data.clone();
        d.reverse();
        d
    }] {
        let mut session = TransferSession::new();
        feed_all(&mut session, &framed.header);
        feed_all(&mut session, &data);
        let progress = session.feed(&framed.end);

        assert!(progress.is_complete, "progress: {progress:?}");
        let result = session.final_result().unwrap();
        assert!(result.verified);
        assert_eq!(result.data.as_deref(), Some(HELLO));
        assert_eq!(result.data.as_ref().unwrap().len(), 13);
    }
}

/// LEN:3 with chunks 1, 1, 0 and then the end marker: reassembly is
/// attempted on what arrived and the digest check fails it.
#[test]
fn test_short_transfer_fails_on_digest() {
    let original = b"abcdefghi";
    let framed = frame(original, 3);
    assert_eq!(framed.data.len(), 3);

    let mut session = TransferSession::new();
    session.feed(BEGIN_MARKER);
    session.feed("LEN:3");
    session.feed(&format!("HASH:{}", digest(original)));
    session.feed(HEADER_END_MARKER);
    session.feed(&framed.data[1]);
    let dup = session.feed(&framed.data[1]);
    assert_eq!(dup.received_chunks, 1);
    let before_end = session.feed(&framed.data[0]);
    assert_eq!(before_end.missing_chunks, vec![2]);

    let progress = session.feed(END_MARKER);
    assert_eq!(progress.state, SessionState::Failed);
    assert_eq!(progress.missing_chunks, vec![2]);

    let result = session.final_result().unwrap();
    assert!(!result.verified);
    assert_eq!(result.data.as_deref(), Some(&b"abcdef"[..]));
    assert!(matches!(
        result.failure,
        Some(FailureReason::DigestMismatch { .. })
    ));
}

/// Garbage is inert in every state.
#[test]
fn test_garbage_changes_nothing_in_any_state() {
    let framed = frame(HELLO, 5);
    let garbage = "not a real message";

    let mut session = TransferSession::new();
    let check = |session: &mut TransferSession| {
        let before = session.progress();
        let after = session.feed(garbage);
        assert_eq!(before, after, "garbage changed state {:?}", before.state);
    };

    check(&mut session); // Idle
    session.feed(BEGIN_MARKER);
    check(&mut session); // HeaderCollect
    session.feed(HEADER_BEGIN_MARKER);
    session.feed(&framed.header[2]);
    check(&mut session);
    session.feed(&framed.header[3]);
    session.feed(HEADER_END_MARKER);
    check(&mut session); // Transferring
    session.feed(&framed.data[0]);
    check(&mut session);
    feed_all(&mut session, &framed.data);
    session.feed(&framed.end);
    check(&mut session); // Completed

    assert!(session.final_result().unwrap().verified);
}

/// Tampered bytes: unverified, failed, but the buffer is still handed back.
#[test]
fn test_tampered_buffer_is_retrievable() {
    let original = b"the quick brown fox";
    let framed = frame(original, 4);

    let mut tampered = framed.data.clone();
    // Replace chunk 1 with a valid chunk carrying different bytes.
    tampered[1] = xfer_core::framer::create_data_message(1, "WFhYWA==").unwrap();

    let mut session = TransferSession::new();
    feed_all(&mut session, &framed.header);
    feed_all(&mut session, &tampered);
    let progress = session.feed(&framed.end);

    assert_eq!(progress.state, SessionState::Failed);
    assert!(!progress.is_complete);
    assert!(progress.failure.as_deref().unwrap().contains("digest mismatch"));

    let result = session.final_result().unwrap().clone();
    assert!(!result.verified);
    let data = result.into_data().expect("mismatched buffer is kept");
    assert_eq!(&data[..], b"the XXXXk brown fox");
}

/// Sender restarted mid-transfer with a different file: receiver follows.
#[test]
fn test_restart_mid_transfer_discards_old_chunks() {
    let first = frame(b"first file contents", 4);
    let second = frame(b"second", 4);

    let mut session = TransferSession::new();
    feed_all(&mut session, &first.header);
    feed_all(&mut session, &first.data[..3]);
    assert_eq!(session.progress().received_chunks, 3);

    feed_all(&mut session, &second.header);
    let progress = session.progress();
    assert_eq!(progress.total_chunks, Some(2));
    assert_eq!(progress.received_chunks, 0);

    // Stale chunk 3 from the first file is out of range for the second.
    session.feed(&first.data[3]);
    feed_all(&mut session, &second.data);
    let progress = session.feed(&second.end);
    assert_eq!(progress.out_of_range_chunks, 1);

    // The stale chunk is concatenated after the real ones, so the digest
    // check catches it.
    assert_eq!(progress.state, SessionState::Failed);
}

#[test]
fn test_empty_buffer_transfer_fails_as_no_data() {
    let framed = frame(b"", 10);
    assert!(framed.data.is_empty());
    assert_eq!(framed.header[2], "LEN:0");

    let mut session = TransferSession::new();
    feed_all(&mut session, &framed.header);
    assert!(session.progress().missing_chunks.is_empty());
    session.feed(&framed.end);
    assert_eq!(
        session.final_result().unwrap().failure,
        Some(FailureReason::NoData)
    );
}

#[test]
fn test_progress_json_shape() {
    let framed = frame(HELLO, 5);
    let mut session = TransferSession::new();
    feed_all(&mut session, &framed.header);
    session.feed(&framed.data[2]);

    let json = serde_json::to_value(session.progress()).unwrap();
    assert_eq!(json["total_chunks"], 3);
    assert_eq!(json["received_chunks"], 1);
    assert_eq!(json["missing_chunks"], serde_json::json!([0, 1]));
    assert_eq!(json["is_complete"], false);
    assert_eq!(json["digest"], digest(HELLO));
}
