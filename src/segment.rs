//! Wire codec: a 4-byte fixed header plus an optional DATA payload.
//!
//! ```text
//! offset  size  field
//! 0       2     type (big-endian, 0..=4)
//! 2       2     seq / ack (big-endian)
//! 4       0..=1000 payload (DATA only)
//! ```

use std::fmt;

/// Largest payload a single DATA segment may carry.
pub const MAX_PAYLOAD: usize = 1000;

/// Size of the fixed header shared by every segment type.
pub const HEADER_LEN: usize = 4;

/// Largest a whole segment (header + payload) may be on the wire.
pub const MAX_SEGMENT_LEN: usize = HEADER_LEN + MAX_PAYLOAD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegType {
    Data,
    Ack,
    Syn,
    Fin,
    Reset,
}

impl SegType {
    fn to_u16(self) -> u16 {
        match self {
            SegType::Data => 0,
            SegType::Ack => 1,
            SegType::Syn => 2,
            SegType::Fin => 3,
            SegType::Reset => 4,
        }
    }

    fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(SegType::Data),
            1 => Some(SegType::Ack),
            2 => Some(SegType::Syn),
            3 => Some(SegType::Fin),
            4 => Some(SegType::Reset),
            _ => None,
        }
    }
}

impl fmt::Display for SegType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SegType::Data => "DATA",
            SegType::Ack => "ACK",
            SegType::Syn => "SYN",
            SegType::Fin => "FIN",
            SegType::Reset => "RESET",
        };
        f.write_str(name)
    }
}

/// A decoded segment. `payload` is always empty for non-DATA segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegType,
    pub seq: u16,
    pub payload: Vec<u8>,
}

impl Segment {
    pub fn control(kind: SegType, seq: u16) -> Self {
        debug_assert!(kind != SegType::Data, "control() is for non-DATA segments");
        Segment {
            kind,
            seq,
            payload: Vec::new(),
        }
    }

    pub fn data(seq: u16, payload: Vec<u8>) -> Self {
        debug_assert!(!payload.is_empty() && payload.len() <= MAX_PAYLOAD);
        Segment {
            kind: SegType::Data,
            seq,
            payload,
        }
    }

    /// The trailing payload length; 0 for control segments.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&self.kind.to_u16().to_be_bytes());
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Decodes a raw datagram. Returns `None` for inputs shorter than the
    /// fixed header or whose `type` field is outside `0..=4`; per spec.md
    /// §4.1 these are discarded silently by the caller.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let type_field = u16::from_be_bytes([bytes[0], bytes[1]]);
        let kind = SegType::from_u16(type_field)?;
        let seq = u16::from_be_bytes([bytes[2], bytes[3]]);
        let payload = if kind == SegType::Data {
            bytes[HEADER_LEN..].to_vec()
        } else {
            Vec::new()
        };
        Some(Segment { kind, seq, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_control_segment() {
        let seg = Segment::control(SegType::Syn, 100);
        assert_eq!(seg.encode(), vec![0, 2, 0, 100]);
    }

    #[test]
    fn encodes_data_segment() {
        let seg = Segment::data(101, b"hello".to_vec());
        let wire = seg.encode();
        assert_eq!(&wire[..4], &[0, 0, 0, 101]);
        assert_eq!(&wire[4..], b"hello");
    }

    #[test]
    fn round_trips() {
        let seg = Segment::data(65000, vec![7u8; 1000]);
        let wire = seg.encode();
        assert_eq!(wire.len(), MAX_SEGMENT_LEN);
        let decoded = Segment::decode(&wire).unwrap();
        assert_eq!(decoded, seg);
    }

    #[test]
    fn rejects_short_input() {
        assert!(Segment::decode(&[0, 1, 0]).is_none());
        assert!(Segment::decode(&[]).is_none());
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(Segment::decode(&[0, 5, 0, 0]).is_none());
    }

    #[test]
    fn control_segment_has_no_payload() {
        let seg = Segment::decode(&[0, 1, 0, 42]).unwrap();
        assert_eq!(seg.kind, SegType::Ack);
        assert_eq!(seg.len(), 0);
    }
}
