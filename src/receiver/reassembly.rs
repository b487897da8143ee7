//! The in-order reassembly buffer (spec.md §3, §4.3).

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

use crate::seq;

/// Buffers DATA payloads that arrived ahead of `expected_seq` and drains
/// them into the output stream as soon as they become contiguous.
#[derive(Debug, Default)]
pub struct Reassembly {
    /// `seq -> payload`, for segments received but not yet delivered.
    buffer: HashMap<u16, Vec<u8>>,
    /// `seq -> (seq + len) mod 65535`, recorded for every seq ever seen
    /// (spec.md §4.3: "this is how the receiver computes the cumulative
    /// ACK without tracking chunk ordinals").
    next_after: HashMap<u16, u16>,
    /// Every `seq` ever recorded, kept independent of `buffer` and never
    /// cleared -- `buffer` entries are removed on delivery in
    /// `drain_into`, so gating the dedup check on `buffer` alone lets a
    /// retransmit of an already-delivered segment get re-buffered (and,
    /// once the sequence space wraps, re-drained at the wrong offset).
    /// Mirrors `original_source/receiver.py`'s persistent `all_rev_seqno`
    /// set.
    seen: HashSet<u16>,
}

impl Reassembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an incoming DATA segment. Returns `true` if this is the
    /// first time `seq` has ever been seen (i.e. it was actually stored);
    /// duplicates -- including retransmits of segments already delivered
    /// and removed from `buffer` -- are discarded but still drive
    /// `next_after`, so a stale retransmit doesn't corrupt cumulative-ACK
    /// bookkeeping.
    pub fn record(&mut self, seq_no: u16, payload: Vec<u8>) -> bool {
        let next = seq::advance(seq_no, payload.len());
        self.next_after.insert(seq_no, next);
        if self.seen.insert(seq_no) {
            self.buffer.insert(seq_no, payload);
            true
        } else {
            false
        }
    }

    /// Drains every contiguous entry starting at `*expected_seq` into
    /// `out`, advancing `*expected_seq` past each one (spec.md §4.3).
    pub fn drain_into<W: Write>(&mut self, expected_seq: &mut u16, out: &mut W) -> io::Result<()> {
        while let Some(payload) = self.buffer.remove(expected_seq) {
            out.write_all(&payload)?;
            *expected_seq = self
                .next_after
                .remove(expected_seq)
                .expect("next_after recorded alongside every buffered payload");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_delivery_drains_immediately() {
        let mut r = Reassembly::new();
        let mut out = Vec::new();
        let mut expected = 1u16;

        assert!(r.record(1, b"AAA".to_vec()));
        r.drain_into(&mut expected, &mut out).unwrap();
        assert_eq!(out, b"AAA");
        assert_eq!(expected, 4);
    }

    #[test]
    fn out_of_order_buffers_then_flushes_in_order() {
        // Scenario 3 of spec.md §8: B then A then C.
        let mut r = Reassembly::new();
        let mut out = Vec::new();
        let mut expected = 1u16;

        assert!(r.record(4, b"BB".to_vec()));
        r.drain_into(&mut expected, &mut out).unwrap();
        assert_eq!(out, b"");
        assert_eq!(expected, 1);

        assert!(r.record(1, b"AAA".to_vec()));
        r.drain_into(&mut expected, &mut out).unwrap();
        assert_eq!(out, b"AAABB");
        assert_eq!(expected, 6);

        assert!(r.record(6, b"C".to_vec()));
        r.drain_into(&mut expected, &mut out).unwrap();
        assert_eq!(out, b"AAABBC");
        assert_eq!(expected, 7);
    }

    #[test]
    fn duplicate_data_is_idempotent() {
        let mut r = Reassembly::new();
        let mut out = Vec::new();
        let mut expected = 1u16;

        assert!(r.record(1, b"AAA".to_vec()));
        assert!(!r.record(1, b"AAA".to_vec()));
        r.drain_into(&mut expected, &mut out).unwrap();
        assert_eq!(out, b"AAA");
    }

    #[test]
    fn retransmit_after_delivery_is_not_rebuffered() {
        // Scenario 5 of spec.md §8: an ACK is lost, the sender retransmits
        // DATA the receiver already delivered and removed from `buffer`.
        // The dedup guard must still catch it.
        let mut r = Reassembly::new();
        let mut out = Vec::new();
        let mut expected = 1u16;

        assert!(r.record(1, b"AAA".to_vec()));
        r.drain_into(&mut expected, &mut out).unwrap();
        assert_eq!(out, b"AAA");
        assert_eq!(expected, 4);

        // Stale retransmit of the already-delivered segment.
        assert!(!r.record(1, b"AAA".to_vec()));
        r.drain_into(&mut expected, &mut out).unwrap();
        assert_eq!(out, b"AAA");
        assert_eq!(expected, 4);
    }
}
