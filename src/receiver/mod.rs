//! The Receiver FSM (spec.md §4.3): passive open, in-order delivery to
//! the output file, passive close. Runs as a single, serially-processing
//! receive loop (spec.md §5), so no synchronization primitives are
//! needed beyond the plain local state below.

mod reassembly;

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::{SocketAddr, UdpSocket};
use std::time::Instant;

use rand::rngs::ThreadRng;

use crate::config::ReceiverConfig;
use crate::error::Result;
use crate::eventlog::{Direction, EventLog};
use crate::loss::LossFilter;
use crate::segment::{SegType, Segment, MAX_SEGMENT_LEN};
use crate::seq;

use reassembly::Reassembly;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Listen,
    Established,
}

struct Ctx {
    socket: UdpSocket,
    peer: SocketAddr,
    event_log: EventLog,
    loss: LossFilter,
    rng: ThreadRng,
    output: File,
}

impl Ctx {
    fn send_ack(&mut self, ack: u16) {
        if self.loss.drop_outbound(&mut self.rng) {
            log::debug!("dropped outbound ACK({ack})");
            return;
        }
        let segment = Segment::control(SegType::Ack, ack);
        if let Err(err) = self.socket.send_to(&segment.encode(), self.peer) {
            log::warn!("failed to send ACK: {err}");
            return;
        }
        self.event_log.control(Direction::Snd, Instant::now(), SegType::Ack, ack);
    }
}

/// Runs a full receiver lifecycle: accept one connection, write its
/// payload verbatim to `cfg.output_file`, close. Returns `Err` only for
/// an I/O problem that prevented the attempt; a FIN or RESET is a clean
/// (non-error) termination, matching spec.md §6.
pub fn run(cfg: ReceiverConfig) -> Result<()> {
    let peer = SocketAddr::from(([127, 0, 0, 1], cfg.sender_port));
    let socket = UdpSocket::bind(("127.0.0.1", cfg.receiver_port))?;

    // Created eagerly so a connection that never completes a data
    // transfer still leaves a zero-byte file on disk (spec.md §8
    // "Boundary behaviors"; SPEC_FULL.md §C.5).
    let output = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&cfg.output_file)?;

    let event_log = EventLog::create(format!("{}.log", cfg.output_file))?;
    let loss = LossFilter::new(cfg.flp, cfg.rlp);

    let mut ctx = Ctx {
        socket,
        peer,
        event_log,
        loss,
        rng: rand::thread_rng(),
        output,
    };

    let mut state = State::Listen;
    let mut expected_seq: u16 = 0;
    let mut reassembly = Reassembly::new();
    let mut buf = [0u8; MAX_SEGMENT_LEN];

    loop {
        let (n, _src) = ctx.socket.recv_from(&mut buf)?;
        let Some(seg) = Segment::decode(&buf[..n]) else {
            continue;
        };

        match seg.kind {
            SegType::Syn => {
                if ctx.loss.drop_inbound(&mut ctx.rng) {
                    log::debug!("dropped inbound SYN(seq={})", seg.seq);
                    continue;
                }
                let now = Instant::now();
                ctx.event_log.anchor_at(now);
                ctx.event_log.control(Direction::Rcv, now, SegType::Syn, seg.seq);

                if state == State::Listen {
                    expected_seq = seq::advance(seg.seq, 1);
                    state = State::Established;
                    log::info!("connection established, expecting seq {expected_seq}");
                }
                ctx.send_ack(seq::advance(seg.seq, 1));
            }
            SegType::Data if state == State::Established => {
                if ctx.loss.drop_inbound(&mut ctx.rng) {
                    log::debug!("dropped inbound DATA(seq={})", seg.seq);
                    continue;
                }
                ctx.event_log
                    .data(Direction::Rcv, Instant::now(), seg.seq, seg.len());

                reassembly.record(seg.seq, seg.payload);
                reassembly.drain_into(&mut expected_seq, &mut ctx.output)?;
                ctx.output.flush()?;

                ctx.send_ack(expected_seq);
            }
            SegType::Fin if state == State::Established => {
                if ctx.loss.drop_inbound(&mut ctx.rng) {
                    log::debug!("dropped inbound FIN(seq={})", seg.seq);
                    continue;
                }
                ctx.event_log.control(Direction::Rcv, Instant::now(), SegType::Fin, seg.seq);
                ctx.send_ack(seq::advance(seg.seq, 1));
                log::info!("connection closed by FIN");
                return Ok(());
            }
            SegType::Reset => {
                ctx.event_log.control(Direction::Rcv, Instant::now(), SegType::Reset, seg.seq);
                log::warn!("connection reset by peer");
                return Ok(());
            }
            SegType::Data | SegType::Fin | SegType::Ack => {
                // DATA/FIN before ESTABLISHED, or an ACK (the receiver
                // never expects one): not part of this protocol's
                // accept path, ignored.
            }
        }
    }
}
