//! End-to-end loopback exercises of the full sender/receiver pair,
//! covering the round-trip laws and boundary behaviors of spec.md §8.

use std::fs;
use std::thread;
use std::time::Duration;

use ptp::config::{ReceiverConfig, SenderConfig};

fn run_transfer(
    sender_port: u16,
    receiver_port: u16,
    input: &std::path::Path,
    output: &std::path::Path,
    max_win: u32,
    rot: u64,
    flp: f64,
    rlp: f64,
) {
    let receiver_cfg = ReceiverConfig {
        receiver_port,
        sender_port,
        output_file: output.to_string_lossy().into_owned(),
        flp,
        rlp,
    };
    let sender_cfg = SenderConfig {
        sender_port,
        receiver_port,
        input_file: input.to_string_lossy().into_owned(),
        max_win,
        rot,
    };

    let receiver_handle = thread::spawn(move || ptp::receiver::run(receiver_cfg).unwrap());
    // Give the receiver a moment to bind before the sender starts.
    thread::sleep(Duration::from_millis(50));
    let sender_handle = thread::spawn(move || ptp::sender::run(sender_cfg).unwrap());

    sender_handle.join().unwrap();
    receiver_handle.join().unwrap();
}

fn scratch_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("ptp-loopback-{tag}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn clean_transfer_is_byte_identical() {
    let dir = scratch_dir("clean");
    let input = dir.join("in.txt");
    let output = dir.join("out.txt");
    fs::write(&input, b"hello, reliable world").unwrap();

    run_transfer(19001, 19002, &input, &output, 1000, 200, 0.0, 0.0);

    assert_eq!(fs::read(&input).unwrap(), fs::read(&output).unwrap());
}

#[test]
fn empty_file_produces_empty_output() {
    let dir = scratch_dir("empty");
    let input = dir.join("in.txt");
    let output = dir.join("out.txt");
    fs::write(&input, b"").unwrap();

    run_transfer(19003, 19004, &input, &output, 1000, 200, 0.0, 0.0);

    assert_eq!(fs::read(&output).unwrap(), Vec::<u8>::new());
}

#[test]
fn multi_batch_transfer_survives_moderate_loss() {
    let dir = scratch_dir("lossy");
    let input = dir.join("in.txt");
    let output = dir.join("out.txt");
    let payload: Vec<u8> = (0..4500u32).map(|i| (i % 251) as u8).collect();
    fs::write(&input, &payload).unwrap();

    // Two chunks per batch, a slice of forward/reverse loss. spec.md §8's
    // round-trip law permits either full delivery (loss absorbed by
    // retransmission) or a RESET leaving a strict prefix of the input on
    // disk -- never silent corruption -- so both outcomes are accepted
    // rather than asserting byte-identity outright (which would make this
    // test flaky under real loss).
    run_transfer(19005, 19006, &input, &output, 2000, 150, 0.1, 0.1);

    let input_bytes = fs::read(&input).unwrap();
    let output_bytes = fs::read(&output).unwrap();
    assert!(
        output_bytes == input_bytes || input_bytes.starts_with(&output_bytes),
        "output must equal the input or be a strict prefix of it"
    );
}

#[test]
fn sequence_wrap_is_handled() {
    let dir = scratch_dir("wrap");
    let input = dir.join("in.txt");
    let output = dir.join("out.txt");
    // Large enough that, for most random ISNs, at least one chunk's seq
    // computation wraps past 65535; correctness must hold regardless.
    let payload: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(&input, &payload).unwrap();

    run_transfer(19007, 19008, &input, &output, 5000, 150, 0.0, 0.0);

    assert_eq!(fs::read(&input).unwrap(), fs::read(&output).unwrap());
}
