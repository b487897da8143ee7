//! Bernoulli loss injection, applied only at the receiver (spec.md §4.4).
//!
//! The sender applies no loss on its own side; the receiver drops inbound
//! SYN/DATA/FIN with probability `flp` and drops outbound ACKs with
//! probability `rlp`. A drop is silent to the peer but logged locally at
//! `debug` level.

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct LossFilter {
    flp: f64,
    rlp: f64,
}

impl LossFilter {
    pub fn new(flp: f64, rlp: f64) -> Self {
        LossFilter { flp, rlp }
    }

    /// Should an inbound SYN/DATA/FIN be dropped before it's handled?
    pub fn drop_inbound<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen_bool(self.flp)
    }

    /// Should an outbound ACK be dropped before it's sent?
    pub fn drop_outbound<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen_bool(self.rlp)
    }
}
