//! CLI argument parsing and validation for both peers (spec.md §6 "CLI
//! surface"). Hand-rolled over `std::env::args()`: argument parsing is an
//! external collaborator "mentioned only by interface" in spec.md §1, so
//! this stays thin rather than pulling in a general-purpose parser (see
//! SPEC_FULL.md §B.3 and DESIGN.md).

use crate::error::Error;

#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub receiver_port: u16,
    pub sender_port: u16,
    pub output_file: String,
    pub flp: f64,
    pub rlp: f64,
}

impl ReceiverConfig {
    pub const USAGE: &'static str =
        "usage: receiver <receiver_port> <sender_port> <output_file> <flp> <rlp>";

    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, Error> {
        let args: Vec<String> = args.into_iter().collect();
        if args.len() != 5 {
            return Err(Error::UsageError(Self::USAGE.to_string()));
        }
        let receiver_port = parse_port(&args[0])?;
        let sender_port = parse_port(&args[1])?;
        let output_file = args[2].clone();
        let flp = parse_probability(&args[3])?;
        let rlp = parse_probability(&args[4])?;
        Ok(ReceiverConfig {
            receiver_port,
            sender_port,
            output_file,
            flp,
            rlp,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub sender_port: u16,
    pub receiver_port: u16,
    pub input_file: String,
    pub max_win: u32,
    pub rot: u64,
}

impl SenderConfig {
    pub const USAGE: &'static str =
        "usage: sender <sender_port> <receiver_port> <input_file> <max_win> <rot>";

    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, Error> {
        let args: Vec<String> = args.into_iter().collect();
        if args.len() != 5 {
            return Err(Error::UsageError(Self::USAGE.to_string()));
        }
        let sender_port = parse_port(&args[0])?;
        let receiver_port = parse_port(&args[1])?;
        let input_file = args[2].clone();
        let max_win = parse_max_win(&args[3])?;
        let rot: u64 = args[4]
            .parse()
            .map_err(|_| Error::UsageError(format!("rot must be an unsigned integer: {}", args[4])))?;
        Ok(SenderConfig {
            sender_port,
            receiver_port,
            input_file,
            max_win,
            rot,
        })
    }

    /// `W = floor(max_win / 1000)` chunks per batch (spec.md §4.2, glossary).
    pub fn window_chunks(&self) -> usize {
        (self.max_win / 1000) as usize
    }
}

fn parse_port(raw: &str) -> Result<u16, Error> {
    raw.parse()
        .map_err(|_| Error::UsageError(format!("invalid port: {raw}")))
}

fn parse_probability(raw: &str) -> Result<f64, Error> {
    let value: f64 = raw
        .parse()
        .map_err(|_| Error::UsageError(format!("invalid probability: {raw}")))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::UsageError(format!(
            "probability must be within [0.0, 1.0]: {raw}"
        )));
    }
    Ok(value)
}

fn parse_max_win(raw: &str) -> Result<u32, Error> {
    let value: u32 = raw
        .parse()
        .map_err(|_| Error::UsageError(format!("invalid max_win: {raw}")))?;
    if value < 1000 || value % 1000 != 0 {
        return Err(Error::UsageError(format!(
            "max_win must be a multiple of 1000 >= 1000: {raw}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_valid_receiver_config() {
        let cfg = ReceiverConfig::from_args(args(&["8080", "8081", "out.txt", "0.1", "0.2"]))
            .unwrap();
        assert_eq!(cfg.receiver_port, 8080);
        assert_eq!(cfg.sender_port, 8081);
        assert_eq!(cfg.output_file, "out.txt");
        assert!((cfg.flp - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(ReceiverConfig::from_args(args(&["8080"])).is_err());
        assert!(SenderConfig::from_args(args(&["1", "2", "3"])).is_err());
    }

    #[test]
    fn rejects_out_of_range_probability() {
        assert!(ReceiverConfig::from_args(args(&["8080", "8081", "out.txt", "1.5", "0.0"]))
            .is_err());
    }

    #[test]
    fn rejects_non_multiple_max_win() {
        assert!(SenderConfig::from_args(args(&["1", "2", "in.txt", "1500", "100"])).is_err());
    }

    #[test]
    fn window_chunks_floors() {
        let cfg = SenderConfig::from_args(args(&["1", "2", "in.txt", "3000", "100"])).unwrap();
        assert_eq!(cfg.window_chunks(), 3);
    }
}
