//! The protocol-mandated wire-event log (spec.md §6 "Log output").
//!
//! One line per segment sent or received:
//!
//! ```text
//! <dir>\t<t_ms>\t<type>\t<seq_or_ack>\t<length>
//! ```
//!
//! `t_ms` is milliseconds since the first SYN transmit (sender) or the
//! first received, non-dropped SYN (receiver), rounded to 2 decimals; the
//! very first line uses `t_ms = 0` exactly. This is a wire-format
//! contract, not a diagnostic, so it bypasses `log`/`env_logger`
//! entirely (see SPEC_FULL.md §B.1).

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use crate::segment::SegType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Snd,
    Rcv,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Snd => "snd",
            Direction::Rcv => "rcv",
        }
    }
}

pub struct EventLog {
    file: File,
    anchor: Option<Instant>,
    first_line: bool,
}

impl EventLog {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(EventLog {
            file,
            anchor: None,
            first_line: true,
        })
    }

    /// Anchors `t=0` at `instant`. Only the first call takes effect
    /// (spec.md §9 "Initial-time convention": later, dropped SYNs do not
    /// reset the anchor).
    pub fn anchor_at(&mut self, instant: Instant) {
        if self.anchor.is_none() {
            self.anchor = Some(instant);
        }
    }

    fn t_ms(&self, now: Instant) -> f64 {
        if self.first_line {
            return 0.0;
        }
        match self.anchor {
            Some(anchor) => round2(now.saturating_duration_since(anchor).as_secs_f64() * 1000.0),
            None => 0.0,
        }
    }

    /// Appends a control-segment event line (SYN/ACK/FIN/RESET).
    pub fn control(&mut self, dir: Direction, now: Instant, kind: SegType, seq_or_ack: u16) {
        let t_ms = self.t_ms(now);
        let line = format!(
            "{}\t{}\t{}\t{}\t{}\n",
            dir.as_str(),
            fmt_t(t_ms),
            kind,
            seq_or_ack,
            0
        );
        self.write_line(&line);
    }

    /// Appends a DATA event line. Sender lines concatenate `type` and
    /// `seq` into one token (the historical quirk preserved by spec.md
    /// §9 "Log-line format quirk"); receiver lines keep the separating
    /// tab.
    pub fn data(&mut self, dir: Direction, now: Instant, seq: u16, length: usize) {
        let t_ms = self.t_ms(now);
        let line = match dir {
            Direction::Snd => format!("snd\t{}\tDATA{}\t{}\n", fmt_t(t_ms), seq, length),
            Direction::Rcv => format!("rcv\t{}\tDATA\t{}\t{}\n", fmt_t(t_ms), seq, length),
        };
        self.write_line(&line);
    }

    fn write_line(&mut self, line: &str) {
        self.first_line = false;
        if let Err(err) = self.file.write_all(line.as_bytes()) {
            log::warn!("failed to append event log line: {err}");
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn fmt_t(t_ms: f64) -> String {
    if t_ms == 0.0 {
        "0".to_string()
    } else {
        format!("{t_ms:.2}")
    }
}
