//! Received-chunk storage keyed by sequence number.
//!
//! Once the declared chunk count is known, in-range chunks live in a dense
//! arena indexed by sequence. Chunks seen before the header, chunks beyond
//! the declared count, and everything for oversized declarations go in a
//! sparse ordered map. Map membership is the only duplicate record.

use std::collections::BTreeMap;

use crate::wire::Chunk;

/// Declared counts above this stay sparse instead of pre-allocating.
pub const MAX_DENSE_CHUNKS: u64 = 1 << 20;

/// Result of offering a chunk to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    Inserted,
    /// Sequence already present; the stored payload is kept.
    Duplicate { conflicting: bool },
}

#[derive(Debug, Default)]
pub struct ChunkStore {
    declared: Option<u64>,
    dense: Vec<Option<String>>,
    sparse: BTreeMap<u64, String>,
    len: usize,
    last_inserted: Option<u64>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the declared chunk count and move buffered in-range chunks into
    /// the arena. Only the first declaration takes effect.
    pub fn set_declared_count(&mut self, count: u64) {
        if self.declared.is_some() {
            return;
        }
        self.declared = Some(count);
        if count > MAX_DENSE_CHUNKS {
            return;
        }

        self.dense = vec![None; count as usize];
        let in_range: Vec<u64> = self.sparse.range(..count).map(|(seq, _)| *seq).collect();
        for seq in in_range {
            if let Some(payload) = self.sparse.remove(&seq) {
                self.dense[seq as usize] = Some(payload);
            }
        }
    }

    pub fn declared_count(&self) -> Option<u64> {
        self.declared
    }

    pub fn insert(&mut self, chunk: Chunk) -> Insert {
        let Chunk { sequence, payload } = chunk;

        let slot = match self.dense_slot(sequence) {
            Some(slot) => slot,
            None => {
                if let Some(existing) = self.sparse.get(&sequence) {
                    return Insert::Duplicate {
                        conflicting: *existing != payload,
                    };
                }
                self.sparse.insert(sequence, payload);
                self.len += 1;
                self.last_inserted = Some(sequence);
                return Insert::Inserted;
            }
        };

        if let Some(existing) = &self.dense[slot] {
            return Insert::Duplicate {
                conflicting: *existing != payload,
            };
        }
        self.dense[slot] = Some(payload);
        self.len += 1;
        self.last_inserted = Some(sequence);
        Insert::Inserted
    }

    fn dense_slot(&self, sequence: u64) -> Option<usize> {
        if sequence < self.dense.len() as u64 {
            Some(sequence as usize)
        } else {
            None
        }
    }

    pub fn contains(&self, sequence: u64) -> bool {
        match self.dense_slot(sequence) {
            Some(slot) => self.dense[slot].is_some(),
            None => self.sparse.contains_key(&sequence),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last_inserted(&self) -> Option<u64> {
        self.last_inserted
    }

    /// Chunks whose sequence is at or beyond the declared count.
    pub fn out_of_range(&self) -> usize {
        match self.declared {
            Some(count) => self.sparse.range(count..).count(),
            None => 0,
        }
    }

    /// Sequences in `[0, declared)` not yet received, ascending.
    ///
    /// Computed from the stored set on every call.
    pub fn missing(&self) -> Vec<u64> {
        let Some(count) = self.declared else {
            return Vec::new();
        };

        if !self.dense.is_empty() || count == 0 {
            return self
                .dense
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_none())
                .map(|(seq, _)| seq as u64)
                .collect();
        }

        // Sparse walk for oversized declarations: emit the gaps between keys.
        let mut missing = Vec::new();
        let mut next = 0u64;
        for &seq in self.sparse.range(..count).map(|(seq, _)| seq) {
            missing.extend(next..seq);
            next = seq + 1;
        }
        missing.extend(next..count);
        missing
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Consume the store, yielding every chunk in ascending sequence order.
    pub fn into_sorted(self) -> Vec<Chunk> {
        let mut chunks = Vec::with_capacity(self.len);
        chunks.extend(
            self.dense
                .into_iter()
                .enumerate()
                .filter_map(|(seq, slot)| {
                    slot.map(|payload| Chunk {
                        sequence: seq as u64,
                        payload,
                    })
                }),
        );
        chunks.extend(
            self.sparse
                .into_iter()
                .map(|(sequence, payload)| Chunk { sequence, payload }),
        );
        chunks
    }
}
