//! End-to-end session runs against temp-file logs.

use neuro_clinical_logger::config::{Config, ProtocolConfig};
use neuro_clinical_logger::core::{Orchestrator, SessionEvent, SharedState, StageKind};
use neuro_clinical_logger::device::{pump, ChannelExit, DeviceChannel, Sample};
use neuro_clinical_logger::record::{LogSummary, SessionLog};
use std::io::{self, Cursor, ErrorKind, Read};
use std::path::PathBuf;
use std::time::Duration;

fn temp_log() -> PathBuf {
    std::env::temp_dir().join(format!("neuro-session-test-{}.csv", uuid::Uuid::new_v4()))
}

fn instant_config(max_sessions: u32, log_path: PathBuf) -> Config {
    Config {
        max_sessions,
        log_path,
        protocol: ProtocolConfig::instant(),
        ..Config::default()
    }
}

fn read_lines(path: &PathBuf) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Serves one chunk of bytes, then behaves like an idle serial port.
struct IdlePort {
    pending: Option<Vec<u8>>,
}

impl Read for IdlePort {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        match self.pending.take() {
            Some(bytes) => {
                out[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            None => {
                std::thread::sleep(Duration::from_millis(2));
                Err(io::Error::new(ErrorKind::TimedOut, "no data"))
            }
        }
    }
}

#[test]
fn test_single_session_with_sample() {
    let path = temp_log();
    let config = instant_config(1, path.clone());
    let log = SessionLog::open(&path).unwrap();

    let mut events = Vec::new();
    let summary = {
        let mut orchestrator =
            Orchestrator::new(&config, log, |e: &SessionEvent| events.push(e.clone()));
        orchestrator
            .shared()
            .publish_sample(Sample::new(0.002, 0.8, 5.0, 0.9));
        orchestrator.run().unwrap()
    };

    assert_eq!(summary.sessions_saved, 1);
    assert!(!summary.cancelled);

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "timestamp,session_id,tremor,grip,tapping,alternation");
    assert!(lines[1].ends_with(",1,0.002,0.8,5.0,0.9"));

    let finished: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Finished(s) => Some(s.sessions_saved),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![1]);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_no_sample_records_nothing() {
    let path = temp_log();
    let config = instant_config(2, path.clone());
    let log = SessionLog::open(&path).unwrap();

    let mut no_data = 0;
    let mut attempts = 0;
    {
        let shared = SharedState::new();
        let stopper = shared.clone();
        let mut orchestrator = Orchestrator::with_shared(
            &config,
            log,
            |e: &SessionEvent| match e {
                SessionEvent::NoData => no_data += 1,
                SessionEvent::SessionStarted { attempt } => {
                    attempts = *attempt;
                    // Without a sample the run never reaches its maximum.
                    if *attempt > 2 {
                        stopper.request_stop();
                    }
                }
                _ => {}
            },
            shared,
        );
        let summary = orchestrator.run().unwrap();
        assert_eq!(summary.sessions_saved, 0);
        assert_eq!(summary.skipped, 2);
    }

    assert_eq!(no_data, 2);
    assert_eq!(attempts, 3);
    assert_eq!(read_lines(&path).len(), 1);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_cancel_mid_session_keeps_completed_rows() {
    let path = temp_log();
    let config = instant_config(3, path.clone());
    let log = SessionLog::open(&path).unwrap();

    let shared = SharedState::new();
    shared.publish_sample(Sample::new(0.01, 0.5, 4.0, 0.7));
    let stopper = shared.clone();
    let mut attempt = 0;
    let mut cancelled_events = 0;
    let mut finished_events = 0;

    let summary = {
        let mut orchestrator = Orchestrator::with_shared(
            &config,
            log,
            |e: &SessionEvent| match e {
                SessionEvent::SessionStarted { attempt: n } => attempt = *n,
                SessionEvent::StageStarted(StageKind::Grip) if attempt == 2 => {
                    stopper.request_stop();
                }
                SessionEvent::Cancelled => cancelled_events += 1,
                SessionEvent::Finished(_) => finished_events += 1,
                _ => {}
            },
            shared,
        );
        orchestrator.run().unwrap()
    };

    assert!(summary.cancelled);
    assert_eq!(summary.sessions_saved, 1);
    assert_eq!(summary.attempts, 2);
    assert_eq!(cancelled_events, 1);
    assert_eq!(finished_events, 1);

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains(",1,0.01,0.5,4.0,0.7"));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_malformed_line_then_valid_line() {
    let state = SharedState::new();
    let input = "not valid data\n{\"tremor\":0.002,\"grip\":0.8,\"tapping\":5.0,\"alternation\":0.9}\n";

    let exit = pump(Cursor::new(input), &state);

    assert_eq!(exit, ChannelExit::Disconnected);
    assert_eq!(state.latest_sample(), Some(Sample::new(0.002, 0.8, 5.0, 0.9)));
    assert_eq!(state.stats().snapshot().decode_failures, 1);
}

#[test]
fn test_device_channel_feeds_session() {
    let path = temp_log();
    let mut config = instant_config(1, path.clone());
    config.protocol.unit = Duration::from_millis(1);

    let log = SessionLog::open(&path).unwrap();
    let mut orchestrator = Orchestrator::new(&config, log, |_: &SessionEvent| {});

    let port = IdlePort {
        pending: Some(b"garbage\n{\"tremor\":0.3,\"grip\":0.6,\"tapping\":7.5,\"alternation\":0.95}\n".to_vec()),
    };
    let channel = DeviceChannel::spawn(port, orchestrator.shared().clone(), "idle-port");
    orchestrator.attach_channel(channel);

    // The protocol lasts ~33 ms; wait for the reader first so the test is
    // not timing dependent.
    while orchestrator.shared().latest_sample().is_none() {
        std::thread::sleep(Duration::from_millis(1));
    }

    let summary = orchestrator.run().unwrap();
    assert_eq!(summary.sessions_saved, 1);
    assert_eq!(orchestrator.channel_exit(), Some(&ChannelExit::Stopped));

    let summary = LogSummary::read(&path).unwrap();
    assert_eq!(summary.runs(), 1);
    assert_eq!(summary.data_rows, 1);
    let last = summary.last_record.unwrap();
    assert_eq!(last.session_id, 1);
    assert_eq!(last.sample(), Sample::new(0.3, 0.6, 7.5, 0.95));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_disconnected_device_degrades_to_no_data() {
    let path = temp_log();
    let config = instant_config(1, path.clone());
    let log = SessionLog::open(&path).unwrap();

    let shared = SharedState::new();
    let stopper = shared.clone();
    let mut orchestrator = Orchestrator::with_shared(
        &config,
        log,
        move |e: &SessionEvent| {
            if let SessionEvent::NoData = e {
                stopper.request_stop();
            }
        },
        shared,
    );

    // One good line, then the stream ends as if the board were unplugged.
    let channel = DeviceChannel::spawn(
        Cursor::new(b"{\"tremor\":1,\"grip\":1,\"tapping\":1,\"alternation\":1}\n".to_vec()),
        orchestrator.shared().clone(),
        "unplugged",
    );
    while !channel.is_finished() {
        std::thread::sleep(Duration::from_millis(1));
    }
    orchestrator.attach_channel(channel);

    let summary = orchestrator.run().unwrap();
    assert_eq!(summary.sessions_saved, 0);
    assert!(summary.cancelled);
    assert_eq!(orchestrator.channel_exit(), Some(&ChannelExit::Disconnected));
    assert_eq!(read_lines(&path).len(), 1);

    let _ = std::fs::remove_file(&path);
}
