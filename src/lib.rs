//! PTP (Practical Transport Protocol): a reliable file transport over an
//! unreliable datagram substrate. See spec.md / SPEC_FULL.md for the
//! full protocol description; this crate implements the wire codec, the
//! sender and receiver finite state machines, the sliding-batch window,
//! retransmission timers, and the Bernoulli loss filter.

pub mod config;
pub mod error;
pub mod eventlog;
pub mod loss;
pub mod receiver;
pub mod segment;
pub mod sender;
pub mod seq;

pub use error::{Error, Result};
