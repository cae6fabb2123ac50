use crate::*;

use proptest::prelude::*;

use xfer_core::digest::digest;
use xfer_core::framer::chunk_data;
use xfer_core::reassembly::{reassemble, verify};
use xfer_core::wire::Chunk;
use xfer_core::DigestAlgorithm;

fn numbered(payloads: Vec<String>) -> Vec<Chunk> {
    payloads
        .into_iter()
        .enumerate()
        .map(|(i, payload)| Chunk {
            sequence: i as u64,
            payload,
        })
        .collect()
}

/// Buffer, chunk size, and a shuffled order of its chunks.
fn buffer_and_order() -> impl Strategy<Value = (Vec<u8>, usize, Vec<usize>)> {
    (proptest::collection::vec(any::<u8>(), 0..2048), 1usize..300).prop_flat_map(|(buf, size)| {
        let n = buf.len().div_ceil(size);
        let order = Just((0..n).collect::<Vec<usize>>()).prop_shuffle();
        (Just(buf), Just(size), order)
    })
}

proptest! {
    #[test]
    fn prop_reassemble_any_permutation((buf, size, order) in buffer_and_order()) {
        let chunks = numbered(chunk_data(&buf, size).unwrap());
        let permuted: Vec<Chunk> = order.iter().map(|&i| chunks[i].clone()).collect();

        let out = reassemble(permuted).unwrap();
        prop_assert_eq!(&out, &buf);
        prop_assert!(verify(&out, &digest(&buf), &DigestAlgorithm::Sha1));
    }

    #[test]
    fn prop_session_is_order_independent((buf, size, order) in buffer_and_order()) {
        // A zero-chunk transfer ends as NoData; covered in scenarios.
        prop_assume!(!buf.is_empty());
        let framed = frame(&buf, size);
        let shuffled: Vec<String> = order.iter().map(|&i| framed.data[i].clone()).collect();

        let mut in_order = TransferSession::new();
        feed_all(&mut in_order, &framed.header);
        feed_all(&mut in_order, &framed.data);
        in_order.feed(&framed.end);

        let mut out_of_order = TransferSession::new();
        feed_all(&mut out_of_order, &framed.header);
        feed_all(&mut out_of_order, &shuffled);
        out_of_order.feed(&framed.end);

        let a = in_order.final_result().unwrap();
        let b = out_of_order.final_result().unwrap();
        prop_assert!(a.verified && b.verified);
        prop_assert_eq!(&a.data, &b.data);
        prop_assert_eq!(a.data.as_deref(), Some(buf.as_slice()));
    }

    #[test]
    fn prop_duplicate_delivery_is_idempotent(
        (buf, size, order) in buffer_and_order(),
        repeat in 1usize..4,
    ) {
        let framed = frame(&buf, size);
        let mut once = TransferSession::new();
        let mut many = TransferSession::new();
        feed_all(&mut once, &framed.header);
        feed_all(&mut many, &framed.header);

        for &i in &order {
            once.feed(&framed.data[i]);
            for _ in 0..=repeat {
                many.feed(&framed.data[i]);
            }
        }
        let p1 = once.progress();
        let p2 = many.progress();
        prop_assert_eq!(p1.received_chunks, p2.received_chunks);
        prop_assert_eq!(&p1.missing_chunks, &p2.missing_chunks);
        prop_assert_eq!(p2.duplicate_chunks, framed.data.len() * repeat);
    }

    #[test]
    fn prop_missing_set_matches_received(
        total in 1u64..200,
        received in proptest::collection::btree_set(0u64..200, 0..100),
    ) {
        let mut session = TransferSession::new();
        session.feed(xfer_core::wire::BEGIN_MARKER);
        session.feed(&format!("LEN:{total}"));
        session.feed(&format!("HASH:{}", digest(b"")));
        session.feed(xfer_core::wire::HEADER_END_MARKER);
        for &seq in &received {
            session.feed(&xfer_core::framer::create_data_message(seq, "AA==").unwrap());
        }

        let progress = session.progress();
        let expected: Vec<u64> = (0..total).filter(|s| !received.contains(s)).collect();
        prop_assert_eq!(progress.missing_chunks, expected);
        prop_assert_eq!(progress.received_chunks, received.len());
        prop_assert_eq!(
            progress.out_of_range_chunks,
            received.iter().filter(|&&s| s >= total).count()
        );
    }

    #[test]
    fn prop_classify_never_panics(text in ".{0,64}") {
        let _ = xfer_core::classify(&text);
    }
}

#[test]
fn test_chunk_count_boundaries() {
    assert!(chunk_data(b"", 10).unwrap().is_empty());
    assert_eq!(chunk_data(&[7u8; 10], 10).unwrap().len(), 1);
    assert_eq!(chunk_data(&[7u8; 11], 10).unwrap().len(), 2);
    assert_eq!(chunk_data(&[7u8; 10], 1).unwrap().len(), 10);
}
