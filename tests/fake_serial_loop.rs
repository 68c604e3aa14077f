use crossbeam::channel::{unbounded, Receiver};
use kicksense::{
    app::{
        Dashboard, Disposition, OperatingMode, PassiveFeed, SourceArbiter, StalenessTracker,
        Suppression,
    },
    payload::Channel,
    pipeline::Pipeline,
    reading::DEFAULT_MAX_RAW,
    serial::{fake::FakeSerialPort, spawn_reader, SerialEvent, SerialFailureKind, SerialOutcome},
    state::{ActivityThresholds, ConnectivityState},
};
use std::io;
use std::time::{Duration, Instant};

const LINK: u64 = 1;

/// A started dashboard that honours reader `LINK`.
fn dashboard(mode: OperatingMode) -> Dashboard<PassiveFeed> {
    let mut dash = Dashboard::new(
        Pipeline::new(DEFAULT_MAX_RAW, ActivityThresholds::default()),
        SourceArbiter::new(PassiveFeed::default(), mode),
        StalenessTracker::new(Duration::from_secs(10)),
    );
    let now = Instant::now();
    dash.start(now).unwrap();
    dash.serial_connected(LINK, now);
    dash
}

/// Drain reader events into the dashboard until the stream reports a disconnect.
fn pump(rx: &Receiver<SerialEvent>, dash: &mut Dashboard<PassiveFeed>) -> Vec<Disposition> {
    let mut out = Vec::new();
    loop {
        let event = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("reader went silent");
        let done = matches!(event.outcome, SerialOutcome::Disconnected(..));
        out.push(dash.handle_serial(event, Instant::now()));
        if done {
            return out;
        }
    }
}

#[test]
fn noisy_device_lines_feed_the_pipeline() {
    let mut dash = dashboard(OperatingMode::Automatic);
    let (tx, rx) = unbounded();
    let port = FakeSerialPort::from_chunks(&[
        "garbage{\"toe\":100}trailing\n",
        "not json at all\n",
        "{\"inside\":2",
        "00,\"heel\":40}\r\n",
    ]);
    let _reader = spawn_reader(port, LINK, tx).unwrap();

    let dispositions = pump(&rx, &mut dash);
    let accepted = dispositions
        .iter()
        .filter(|d| matches!(d, Disposition::Accepted(_)))
        .count();
    let dropped = dispositions
        .iter()
        .filter(|d| matches!(d, Disposition::Dropped(_)))
        .count();
    assert_eq!(accepted, 2);
    assert_eq!(dropped, 1);
    assert!(matches!(
        dispositions.last(),
        Some(Disposition::Disconnected(SerialFailureKind::EndOfStream, _))
    ));

    let reading = dash.pipeline().snapshot().reading;
    assert_eq!(reading.get(Channel::Inside), 200.0 / 800.0);
    assert_eq!(reading.get(Channel::Vrist2), 40.0 / 800.0);
    assert_eq!(dash.connectivity(), ConnectivityState::Off);
}

#[test]
fn manual_mode_ignores_device_records() {
    let mut dash = dashboard(OperatingMode::Manual);
    let (tx, rx) = unbounded();
    let _reader =
        spawn_reader(FakeSerialPort::from_chunks(&["{\"toe\":700}\n"]), LINK, tx).unwrap();
    let dispositions = pump(&rx, &mut dash);
    assert_eq!(dispositions[0], Disposition::Suppressed(Suppression::Manual));
    assert_eq!(dash.pipeline().snapshot().reading.get(Channel::Toe), 0.0);
}

#[test]
fn read_errors_are_classified_and_end_the_loop() {
    let mut dash = dashboard(OperatingMode::Automatic);
    let (tx, rx) = unbounded();
    let port = FakeSerialPort::new(vec![
        Ok(b"{\"laces\":300}\n".to_vec()),
        Err(io::Error::new(io::ErrorKind::TimedOut, "idle")),
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")),
        Ok(b"{\"laces\":10}\n".to_vec()),
    ]);
    let _reader = spawn_reader(port, LINK, tx).unwrap();
    let dispositions = pump(&rx, &mut dash);
    assert_eq!(
        dispositions[0],
        Disposition::Accepted(ConnectivityState::On)
    );
    assert!(matches!(
        dispositions.last(),
        Some(Disposition::Disconnected(SerialFailureKind::Disconnected, _))
    ));
    assert_eq!(dash.pipeline().snapshot().reading.get(Channel::Laces), 300.0 / 800.0);
    assert_eq!(dash.connectivity(), ConnectivityState::Off);
}

#[test]
fn replaced_reader_output_is_superseded() {
    let mut dash = dashboard(OperatingMode::Automatic);
    let (tx, rx) = unbounded();
    let _old = spawn_reader(FakeSerialPort::from_chunks(&["{\"toe\":700}\n"]), LINK, tx).unwrap();
    dash.serial_disconnected();
    dash.serial_connected(LINK + 1, Instant::now());

    let dispositions = pump(&rx, &mut dash);
    assert!(dispositions
        .iter()
        .all(|d| *d == Disposition::Suppressed(Suppression::Superseded)));
    assert_eq!(dash.serial_link(), Some(LINK + 1));
    assert_eq!(dash.pipeline().snapshot().reading.get(Channel::Toe), 0.0);
}

#[test]
fn cancelled_reader_stops_quietly() {
    let (tx, rx) = unbounded();
    let mut reader =
        spawn_reader(FakeSerialPort::from_chunks(&["{\"toe\":1}\n"]).hold_open(), LINK, tx)
            .unwrap();
    let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(first.link, LINK);
    assert!(matches!(first.outcome, SerialOutcome::Record(_)));
    reader.cancel();
    reader.cancel();
    assert!(!reader.is_running());
    assert!(rx.try_recv().is_err());
}
