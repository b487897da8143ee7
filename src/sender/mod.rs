//! The Sender FSM (spec.md §4.2): active open, windowed data transfer,
//! active close.
//!
//! Concurrency follows the Design Notes' redesign guidance (spec.md §9
//! "Concurrency restructuring") rather than the reference source's racier
//! per-task recv: a single demultiplexer thread owns the socket's read
//! side for the whole connection and posts matching ACKs to per-segment
//! notification slots (`AckSlot`); every other thread -- the SYN/FIN wait
//! and each batch's per-chunk sender -- only ever waits on its own slot or
//! writes to the socket through a shared send lock.

mod chunk;

use std::collections::HashMap;
use std::fs;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::SenderConfig;
use crate::error::{Error, Result};
use crate::eventlog::{Direction, EventLog};
use crate::segment::{SegType, Segment};
use crate::seq;

use chunk::{chunk_file, Chunk};

/// `SYN` is ordinal "before" every data chunk; `FIN`'s ordinal is one past
/// the last chunk. Data chunks keep the zero-based ordinal spec.md §3
/// defines. A signed type lets `SYN` sit below ordinal `0`.
type Ordinal = i64;
const SYN_ORDINAL: Ordinal = -1;

const TIME_WAIT_LINGER: Duration = Duration::from_secs(2);
const MAX_TRANSMISSIONS: u32 = 3;
/// How often the demultiplexer thread wakes to check for shutdown even
/// with no inbound traffic.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
enum WireLog {
    Control,
    Data,
}

/// A per-in-flight-segment notification slot (spec.md §4.5, §5).
struct AckSlot {
    acked: Mutex<bool>,
    cv: Condvar,
}

impl AckSlot {
    fn new() -> Self {
        AckSlot {
            acked: Mutex::new(false),
            cv: Condvar::new(),
        }
    }
}

struct SharedCtx {
    socket: UdpSocket,
    peer: SocketAddr,
    rot: Duration,
    /// Maps a segment's expected ACK value to its ordinal, across SYN,
    /// every data chunk, and FIN -- built once from the whole file before
    /// any segment is sent, so `ordinal(A)` (spec.md §4.2 "ACK matching")
    /// is a plain lookup.
    expected_ack_to_ordinal: HashMap<u16, Ordinal>,
    /// `(fin_seq + 1) mod 65535`: the defensive end-of-transfer ACK check
    /// of spec.md §4.2/§9.
    fin_target_ack: u16,
    registry: Mutex<HashMap<Ordinal, Arc<AckSlot>>>,
    event_log: Mutex<EventLog>,
    send_lock: Mutex<()>,
    /// Set once the connection is tearing down, whether cleanly or via
    /// RESET; wakes every waiting `retry_send` call and stops the
    /// demultiplexer thread.
    done: AtomicBool,
    peer_reset: AtomicBool,
}

impl SharedCtx {
    fn log_send(&self, now: Instant, segment: &Segment, wire_log: WireLog) {
        let mut log = self.event_log.lock().unwrap();
        match wire_log {
            WireLog::Control => log.control(Direction::Snd, now, segment.kind, segment.seq),
            WireLog::Data => log.data(Direction::Snd, now, segment.seq, segment.len()),
        }
    }

    fn handle_ack(&self, ack: u16) {
        let ordinal_of_ack = self.expected_ack_to_ordinal.get(&ack).copied();
        let fin_area = seq::advance(ack, 1) == self.fin_target_ack;
        let registry = self.registry.lock().unwrap();
        for (&ordinal, slot) in registry.iter() {
            let matches = match ordinal_of_ack {
                Some(oa) => oa >= ordinal,
                None => false,
            } || fin_area;
            if matches {
                *slot.acked.lock().unwrap() = true;
                slot.cv.notify_all();
            }
        }
    }

    fn wake_all(&self) {
        let registry = self.registry.lock().unwrap();
        for slot in registry.values() {
            slot.cv.notify_all();
        }
    }
}

enum ConnectionOutcome {
    Completed,
    Reset,
}

/// Runs a full sender lifecycle: connect, transfer `cfg.input_file`,
/// close. Returns `Err` only for a usage/IO problem that prevented the
/// attempt (e.g. the input file can't be opened); a mid-transfer RESET is
/// a clean (non-error) outcome, matching spec.md §6's "exit code 0 on
/// clean termination (after FIN or RESET)".
pub fn run(cfg: SenderConfig) -> Result<()> {
    let input_bytes = fs::read(&cfg.input_file)?;
    let window = cfg.window_chunks().max(1);

    let peer = SocketAddr::from(([127, 0, 0, 1], cfg.receiver_port));
    let socket = UdpSocket::bind(("127.0.0.1", cfg.sender_port))?;
    socket.set_read_timeout(Some(POLL_INTERVAL))?;

    let isn: u16 = rand::thread_rng().gen_range(0..=65535u32) as u16;
    let first_data_seq = seq::advance(isn, 1);
    let chunks = chunk_file(&input_bytes, first_data_seq);
    let fin_seq = chunks.last().map(|c| c.expected_ack).unwrap_or(first_data_seq);
    let fin_target_ack = seq::advance(fin_seq, 1);
    let fin_ordinal: Ordinal = chunks.len() as Ordinal;

    let mut expected_ack_to_ordinal = HashMap::new();
    expected_ack_to_ordinal.insert(first_data_seq, SYN_ORDINAL);
    for c in &chunks {
        expected_ack_to_ordinal.insert(c.expected_ack, c.ordinal as Ordinal);
    }
    expected_ack_to_ordinal.insert(fin_target_ack, fin_ordinal);

    let log_path = format!("{}.log", cfg.input_file);
    let event_log = EventLog::create(&log_path)?;

    let ctx = Arc::new(SharedCtx {
        socket,
        peer,
        rot: Duration::from_millis(cfg.rot),
        expected_ack_to_ordinal,
        fin_target_ack,
        registry: Mutex::new(HashMap::new()),
        event_log: Mutex::new(event_log),
        send_lock: Mutex::new(()),
        done: AtomicBool::new(false),
        peer_reset: AtomicBool::new(false),
    });
    ctx.event_log.lock().unwrap().anchor_at(Instant::now());

    let demux_ctx = ctx.clone();
    let demux_handle = thread::spawn(move || demux_loop(demux_ctx));

    let outcome = run_connection(&ctx, &chunks, isn, fin_seq, fin_ordinal, window);

    ctx.done.store(true, Ordering::Release);
    let _ = demux_handle.join();

    match outcome {
        ConnectionOutcome::Completed => log::info!("transfer of {} complete", cfg.input_file),
        ConnectionOutcome::Reset => log::warn!("transfer of {} aborted by RESET", cfg.input_file),
    }
    Ok(())
}

fn run_connection(
    ctx: &Arc<SharedCtx>,
    chunks: &[Chunk],
    isn: u16,
    fin_seq: u16,
    fin_ordinal: Ordinal,
    window: usize,
) -> ConnectionOutcome {
    if let Err(err) = retry_send(ctx, SYN_ORDINAL, Segment::control(SegType::Syn, isn), WireLog::Control) {
        return finish_with_error(ctx, err);
    }
    log::debug!("established, sending {} chunk(s) in batches of {window}", chunks.len());

    for batch in chunks.chunks(window) {
        let handles: Vec<_> = batch
            .iter()
            .cloned()
            .map(|chunk| {
                let ctx = ctx.clone();
                thread::spawn(move || {
                    let ordinal = chunk.ordinal as Ordinal;
                    let segment = Segment::data(chunk.seq, chunk.payload);
                    retry_send(&ctx, ordinal, segment, WireLog::Data)
                })
            })
            .collect();

        let mut first_err = None;
        for handle in handles {
            if let Ok(Err(err)) = handle.join() {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        if let Some(err) = first_err {
            return finish_with_error(ctx, err);
        }
    }

    if let Err(err) = retry_send(ctx, fin_ordinal, Segment::control(SegType::Fin, fin_seq), WireLog::Control) {
        return finish_with_error(ctx, err);
    }

    thread::sleep(TIME_WAIT_LINGER);
    ConnectionOutcome::Completed
}

fn finish_with_error(ctx: &Arc<SharedCtx>, err: Error) -> ConnectionOutcome {
    if let Error::RetransmitExhausted(seq) = err {
        if !ctx.peer_reset.load(Ordering::Acquire) {
            send_reset(ctx, seq);
        }
    }
    ctx.done.store(true, Ordering::Release);
    ConnectionOutcome::Reset
}

fn send_reset(ctx: &Arc<SharedCtx>, seq: u16) {
    log::warn!("seq={seq} exhausted retransmissions, sending RESET");
    let segment = Segment::control(SegType::Reset, 0);
    {
        let _guard = ctx.send_lock.lock().unwrap();
        if let Err(err) = ctx.socket.send_to(&segment.encode(), ctx.peer) {
            log::warn!("failed to send RESET: {err}");
        }
    }
    ctx.log_send(Instant::now(), &segment, WireLog::Control);
}

/// Sends `segment` and waits for its matching ACK, retransmitting on
/// timeout up to `MAX_TRANSMISSIONS` total attempts (spec.md §4.2, §4.5).
fn retry_send(ctx: &Arc<SharedCtx>, ordinal: Ordinal, segment: Segment, wire_log: WireLog) -> Result<()> {
    let slot = Arc::new(AckSlot::new());
    ctx.registry.lock().unwrap().insert(ordinal, slot.clone());

    let outcome = (|| -> Result<()> {
        let mut transmissions = 0u32;
        loop {
            {
                let _guard = ctx.send_lock.lock().unwrap();
                ctx.socket.send_to(&segment.encode(), ctx.peer)?;
            }
            transmissions += 1;
            ctx.log_send(Instant::now(), &segment, wire_log);

            let guard = slot.acked.lock().unwrap();
            let (guard, _timeout) = slot
                .cv
                .wait_timeout_while(guard, ctx.rot, |acked| !*acked && !ctx.done.load(Ordering::Acquire))
                .unwrap();
            let acked = *guard;
            drop(guard);

            if acked {
                return Ok(());
            }
            if ctx.done.load(Ordering::Acquire) {
                return Err(Error::ChannelClosed(ctx.peer));
            }
            if transmissions >= MAX_TRANSMISSIONS {
                return Err(Error::RetransmitExhausted(segment.seq));
            }
        }
    })();

    ctx.registry.lock().unwrap().remove(&ordinal);
    outcome
}

fn demux_loop(ctx: Arc<SharedCtx>) {
    let mut buf = [0u8; crate::segment::MAX_SEGMENT_LEN];
    loop {
        if ctx.done.load(Ordering::Acquire) {
            return;
        }
        match ctx.socket.recv_from(&mut buf) {
            Ok((n, _src)) => {
                let Some(seg) = Segment::decode(&buf[..n]) else {
                    continue;
                };
                let now = Instant::now();
                {
                    let mut log = ctx.event_log.lock().unwrap();
                    match seg.kind {
                        SegType::Data => log.data(Direction::Rcv, now, seg.seq, seg.len()),
                        _ => log.control(Direction::Rcv, now, seg.kind, seg.seq),
                    }
                }
                match seg.kind {
                    SegType::Ack => ctx.handle_ack(seg.seq),
                    SegType::Reset => {
                        ctx.peer_reset.store(true, Ordering::Release);
                        ctx.done.store(true, Ordering::Release);
                        ctx.wake_all();
                        return;
                    }
                    SegType::Syn | SegType::Fin | SegType::Data => {
                        // A peer doesn't open/close toward the sender in
                        // this protocol; ignore.
                    }
                }
            }
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(err) => {
                log::warn!("sender socket error: {err}");
                ctx.done.store(true, Ordering::Release);
                return;
            }
        }
    }
}
