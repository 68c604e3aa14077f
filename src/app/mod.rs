use crate::{
    cli::RunOptions,
    config::{Config, SourceKind},
    display::ConsolePresenter,
    payload::Channel,
    pipeline::Pipeline,
    serial::{classify_error, SerialEvent, SerialOptions},
    state::{ActivityThresholds, ConnectivityState},
    Error, Result,
};
use crossbeam::channel::{self, Receiver, Sender};
use std::{
    io::{self, Read},
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

pub mod arbiter;
pub mod connection;
pub mod dashboard;
pub mod demo;
pub mod input;
mod lifecycle;
pub mod logger;
pub mod polling;
pub mod watchdog;

pub use arbiter::{FeedControl, OperatingMode, PassiveFeed, SourceArbiter, Suppression};
pub use connection::{ConnectOutcome, SerialLink};
pub use dashboard::{Dashboard, Disposition, StatusReport, WatchdogTrip};
pub use input::{ConsoleCommand, ConsoleEvent};
pub use logger::{LogLevel, Logger};
pub use polling::{AutoFeed, PollEvent, PollOutcome, PollerFeed, SnapshotSource};
pub use watchdog::{Freshness, StalenessTracker};

use demo::{KickGenerator, RandomHits, KICK_TICK, SIMULATE_TICK};
use lifecycle::{create_shutdown_flag, render_shutdown};
use polling::{HttpSnapshotSource, SourceFactory};

/// How often the loop re-checks the shutdown flag when nothing else happens.
const SHUTDOWN_CHECK: Duration = Duration::from_millis(200);

/// Config for the daemon.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub source: SourceKind,
    pub endpoint: String,
    pub device: String,
    pub serial: SerialOptions,
    pub poll_interval_ms: u64,
    pub http_timeout_ms: u64,
    pub watchdog_interval_ms: u64,
    pub max_raw: u32,
    pub thresholds: ActivityThresholds,
    pub stale_timeout: Duration,
    pub start_manual: bool,
    pub channels: Vec<Channel>,
    pub log_level: LogLevel,
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        // defaults always validate
        Self::from_file(Config::default(), LogLevel::default(), None)
    }
}

impl AppConfig {
    /// Merge file values with CLI overrides and validate the result.
    pub fn from_sources(mut config: Config, opts: RunOptions) -> Result<Self> {
        if let Some(source) = opts.source {
            config.source = source;
        }
        if let Some(endpoint) = opts.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(device) = opts.device {
            config.device = device;
        }
        if let Some(baud) = opts.baud {
            config.baud = baud;
        }
        if let Some(interval) = opts.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        if let Some(max_raw) = opts.max_raw {
            config.max_raw = max_raw;
        }
        if opts.manual {
            config.start_manual = true;
        }
        crate::config::validate(&config)?;

        let log_level = match opts.log_level.as_deref() {
            Some(raw) => raw.parse().map_err(Error::InvalidArgs)?,
            None => LogLevel::default(),
        };
        Ok(Self::from_file(config, log_level, opts.log_file))
    }

    fn from_file(config: Config, log_level: LogLevel, log_file: Option<String>) -> Self {
        Self {
            source: config.source,
            endpoint: config.endpoint,
            device: config.device,
            serial: SerialOptions {
                baud: config.baud,
                timeout_ms: config.serial_timeout_ms,
            },
            poll_interval_ms: config.poll_interval_ms,
            http_timeout_ms: config.http_timeout_ms,
            watchdog_interval_ms: config.watchdog_interval_ms,
            max_raw: config.max_raw,
            thresholds: ActivityThresholds {
                active_shot: f64::from(config.active_shot_threshold),
                hold_window: config.hold_window,
                no_data_timeout: config.no_data_timeout,
            },
            stale_timeout: config.stale_timeout,
            start_manual: config.start_manual,
            channels: config.channels,
            log_level,
            log_file,
        }
    }

    pub fn initial_mode(&self) -> OperatingMode {
        if self.start_manual {
            OperatingMode::Manual
        } else {
            OperatingMode::Automatic
        }
    }

    /// Build the automatic feed for the configured source.
    pub fn build_feed(&self, tx: Sender<PollEvent>, running: Arc<AtomicBool>) -> AutoFeed {
        let max_raw = f64::from(self.max_raw);
        let (make_source, interval): (SourceFactory, Duration) = match self.source {
            SourceKind::Serial => return AutoFeed::Passive(PassiveFeed::default()),
            SourceKind::Poll => {
                let endpoint = self.endpoint.clone();
                let timeout = Duration::from_millis(self.http_timeout_ms);
                (
                    Box::new(move || -> Box<dyn SnapshotSource + Send> {
                        Box::new(HttpSnapshotSource::new(endpoint.clone(), timeout))
                    }),
                    Duration::from_millis(self.poll_interval_ms),
                )
            }
            SourceKind::Demo => (
                Box::new(move || -> Box<dyn SnapshotSource + Send> {
                    Box::new(KickGenerator::new(max_raw))
                }),
                KICK_TICK,
            ),
            SourceKind::Simulate => (
                Box::new(move || -> Box<dyn SnapshotSource + Send> {
                    Box::new(RandomHits::new(max_raw))
                }),
                SIMULATE_TICK,
            ),
        };
        AutoFeed::Polling(PollerFeed::new(make_source, interval, tx, running))
    }
}

pub struct App {
    config: AppConfig,
    logger: Logger,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let logger = Logger::new(config.log_level, config.log_file.clone())?;
        Ok(Self { config, logger })
    }

    pub fn from_options(opts: RunOptions) -> Result<Self> {
        let cfg_file = match opts.config_path.as_deref() {
            Some(path) => Config::load_from_path(Path::new(path))?,
            None => Config::load_or_default()?,
        };
        let merged = AppConfig::from_sources(cfg_file, opts)?;
        Self::new(merged)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Entry point for the daemon: wire the feed, the console and the
    /// watchdog into one event loop and run until ctrl-c or `quit`.
    pub fn run(&mut self) -> Result<()> {
        let running = create_shutdown_flag()?;
        let config = &self.config;

        let (poll_tx, poll_rx) = channel::unbounded();
        let (serial_tx, serial_rx) = channel::unbounded();
        let (console_tx, console_rx) = channel::unbounded();

        let mut pipeline = Pipeline::new(f64::from(config.max_raw), config.thresholds);
        pipeline.add_presenter(Box::new(ConsolePresenter::new(
            io::stdout(),
            config.channels.clone(),
        )));
        let dashboard = Dashboard::new(
            pipeline,
            SourceArbiter::new(
                config.build_feed(poll_tx, running.clone()),
                config.initial_mode(),
            ),
            StalenessTracker::new(config.stale_timeout),
        );
        let serial = SerialLink::new(config.device.clone(), config.serial);
        let mut event_loop = EventLoop::new(dashboard, serial, serial_tx, config.source, &self.logger);

        self.logger.info(format!(
            "daemon start (source={}, mode={}, max_raw={}, watchdog={}ms)",
            config.source,
            config.initial_mode(),
            config.max_raw,
            config.watchdog_interval_ms
        ));
        event_loop.startup(Instant::now())?;

        if let Err(err) = input::spawn_console_reader(console_tx) {
            self.logger
                .warn(format!("console unavailable: {err}; manual entry disabled"));
        }

        let ticker = channel::tick(Duration::from_millis(config.watchdog_interval_ms));
        let result = event_loop.run(&running, &poll_rx, &serial_rx, console_rx, &ticker);
        render_shutdown(&mut event_loop);
        result
    }
}

/// Whether the loop should keep going after a console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Owns the dashboard and the serial link; the only writer of pipeline state.
pub struct EventLoop<'a> {
    dashboard: Dashboard<AutoFeed>,
    serial: SerialLink,
    serial_tx: Sender<SerialEvent>,
    source: SourceKind,
    logger: &'a Logger,
    last_state: ConnectivityState,
    poll_failing: bool,
}

impl<'a> EventLoop<'a> {
    pub fn new(
        dashboard: Dashboard<AutoFeed>,
        serial: SerialLink,
        serial_tx: Sender<SerialEvent>,
        source: SourceKind,
        logger: &'a Logger,
    ) -> Self {
        let last_state = dashboard.connectivity();
        Self {
            dashboard,
            serial,
            serial_tx,
            source,
            logger,
            last_state,
            poll_failing: false,
        }
    }

    pub fn dashboard(&self) -> &Dashboard<AutoFeed> {
        &self.dashboard
    }

    pub fn serial(&self) -> &SerialLink {
        &self.serial
    }


    /// Start the system and, for the serial source, open the device once.
    pub fn startup(&mut self, now: Instant) -> Result<()> {
        self.dashboard.start(now)?;
        self.note_feed();
        if self.dashboard.mode() == OperatingMode::Manual {
            self.logger
                .info("manual mode: automatic feed held until `manual off`");
        }
        if self.source == SourceKind::Serial {
            self.connect_serial(now);
        }
        self.note_transition();
        Ok(())
    }

    fn run(
        &mut self,
        running: &AtomicBool,
        poll_rx: &Receiver<PollEvent>,
        serial_rx: &Receiver<SerialEvent>,
        console_rx: Receiver<ConsoleEvent>,
        ticker: &Receiver<Instant>,
    ) -> Result<()> {
        let closed = channel::never();
        let mut console_open = true;
        let mut flow = Flow::Continue;
        while flow == Flow::Continue && running.load(Ordering::SeqCst) {
            let console = if console_open { &console_rx } else { &closed };
            channel::select! {
                recv(poll_rx) -> msg => {
                    if let Ok(event) = msg {
                        self.on_poll(event, Instant::now());
                    }
                }
                recv(serial_rx) -> msg => {
                    if let Ok(event) = msg {
                        self.on_serial(event, Instant::now());
                    }
                }
                recv(console) -> msg => match msg {
                    Ok(event) => flow = self.on_console(event, Instant::now()),
                    Err(_) => console_open = false,
                },
                recv(ticker) -> _ => self.on_tick(Instant::now()),
                default(SHUTDOWN_CHECK) => {}
            }
        }
        Ok(())
    }

    pub fn on_poll(&mut self, event: PollEvent, now: Instant) {
        match self.dashboard.handle_poll(event, now) {
            Disposition::Failed(err) => {
                if !self.poll_failing {
                    self.logger.warn(format!("poll failed: {err}; skipping tick"));
                } else {
                    self.logger.debug(format!("poll failed: {err}"));
                }
                self.poll_failing = true;
            }
            Disposition::Stale { forced_off } => {
                self.poll_failing = false;
                if forced_off {
                    self.logger.warn(format!(
                        "remote feed stale: token unchanged for more than {}",
                        humantime::format_duration(self.dashboard.stale_timeout())
                    ));
                }
            }
            other => {
                if self.poll_failing {
                    self.logger.info("poll recovered");
                }
                self.poll_failing = false;
                self.trace_disposition("poll", &other);
            }
        }
        self.note_transition();
    }

    pub fn on_serial(&mut self, event: SerialEvent, now: Instant) {
        match self.dashboard.handle_serial(event, now) {
            Disposition::Disconnected(kind, detail) => {
                self.serial.release();
                self.logger.warn(format!(
                    "serial lost ({kind}): {detail}; {}",
                    kind.hint()
                ));
            }
            Disposition::Dropped(line) => {
                self.logger.debug(format!("serial: dropped line '{line}'"));
            }
            other => self.trace_disposition("serial", &other),
        }
        self.note_transition();
    }

    pub fn on_tick(&mut self, now: Instant) {
        match self.dashboard.tick(now) {
            Some(WatchdogTrip::NoData) => self.logger.warn(format!(
                "no sensor data for {}; connectivity off",
                humantime::format_duration(self.dashboard.pipeline().thresholds().no_data_timeout)
            )),
            Some(WatchdogTrip::Stale) => self.logger.warn(format!(
                "remote feed stale for {}; connectivity off",
                humantime::format_duration(self.dashboard.stale_timeout())
            )),
            None => {}
        }
        self.note_transition();
    }

    pub fn on_console(&mut self, event: ConsoleEvent, now: Instant) -> Flow {
        let flow = match event {
            ConsoleEvent::Command(cmd) => self.on_command(cmd, now),
            ConsoleEvent::Invalid(msg) => {
                self.logger.warn(format!("console: {msg}"));
                Flow::Continue
            }
            ConsoleEvent::Closed => {
                self.logger.debug("console: stdin closed");
                Flow::Continue
            }
        };
        self.note_transition();
        flow
    }

    fn on_command(&mut self, cmd: ConsoleCommand, now: Instant) -> Flow {
        match cmd {
            ConsoleCommand::Send(raw) => match self.dashboard.push_manual(&raw, now) {
                Ok(disposition) => self.trace_disposition("manual", &disposition),
                Err(err) => self.logger.warn(format!("manual entry failed: {err}")),
            },
            ConsoleCommand::Manual(manual) => match self.dashboard.set_manual_mode(manual, now) {
                Ok(true) => {
                    self.logger.info(format!("mode: {}", self.dashboard.mode()));
                    self.note_feed();
                }
                Ok(false) => self
                    .logger
                    .info(format!("mode already {}", self.dashboard.mode())),
                Err(err) => self.logger.warn(format!("mode switch failed: {err}")),
            },
            ConsoleCommand::Start => match self.dashboard.start(now) {
                Ok(true) => {
                    self.logger.info("system started");
                    self.note_feed();
                }
                Ok(false) => self.logger.info("system already running"),
                Err(err) => self.logger.warn(format!("start failed: {err}")),
            },
            ConsoleCommand::Stop => {
                if self.dashboard.stop() {
                    self.logger.info("system stopped");
                } else {
                    self.logger.info("system already stopped");
                }
            }
            ConsoleCommand::Connect => self.connect_serial(now),
            ConsoleCommand::Disconnect => {
                if self.serial.disconnect() {
                    self.dashboard.serial_disconnected();
                    self.logger.info("serial disconnected");
                } else {
                    self.logger.info("serial not connected");
                }
            }
            ConsoleCommand::Status => match self.status_json() {
                Ok(json) => println!("{json}"),
                Err(err) => self.logger.warn(format!("status failed: {err}")),
            },
            ConsoleCommand::Help => println!("{}", input::CONSOLE_HELP),
            ConsoleCommand::Quit => {
                self.logger.info("quit requested");
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    /// Snapshot, mode and link state as one JSON object.
    pub fn status_json(&self) -> Result<String> {
        let mut value = serde_json::to_value(self.dashboard.status())?;
        if let Some(map) = value.as_object_mut() {
            map.insert("source".into(), self.source.as_str().into());
            map.insert("serial_connected".into(), self.serial.is_connected().into());
        }
        Ok(serde_json::to_string(&value)?)
    }

    fn connect_serial(&mut self, now: Instant) {
        let outcome = self.serial.connect(self.serial_tx.clone());
        self.link_up(outcome, now);
    }

    /// Run the serial read loop over an already-open byte source.
    pub fn attach_serial<R>(&mut self, reader: R, now: Instant)
    where
        R: Read + Send + 'static,
    {
        let outcome = self.serial.attach(reader, self.serial_tx.clone());
        self.link_up(outcome, now);
        self.note_transition();
    }

    fn link_up(&mut self, outcome: Result<ConnectOutcome>, now: Instant) {
        match outcome {
            Ok(ConnectOutcome::Connected) => {
                self.logger
                    .info(format!("serial connected ({})", self.serial.device()));
                if let Some(link) = self.serial.link() {
                    self.dashboard.serial_connected(link, now);
                }
            }
            Ok(ConnectOutcome::AlreadyConnected) => self.logger.info("serial already connected"),
            Err(Error::Unsupported(msg)) => {
                self.logger.warn(format!("serial not supported here: {msg}"));
            }
            Err(err) => {
                let kind = classify_error(&err);
                self.logger.warn(format!(
                    "serial connect to {} failed ({kind}): {err}; {}",
                    self.serial.device(),
                    kind.hint()
                ));
            }
        }
    }

    fn shutdown(&mut self) {
        self.dashboard.stop();
        self.serial.disconnect();
        self.note_transition();
    }

    fn note_feed(&self) {
        let feed = self.dashboard.arbiter().feed();
        if feed.is_feeding() {
            self.logger.info(format!("feed: {}", feed.describe()));
        }
    }

    fn trace_disposition(&self, source: &str, disposition: &Disposition) {
        match disposition {
            Disposition::Suppressed(reason) => self
                .logger
                .trace(format!("{source}: suppressed ({})", reason.as_str())),
            other => self.logger.trace(format!("{source}: {other:?}")),
        }
    }

    fn note_transition(&mut self) {
        let state = self.dashboard.connectivity();
        if state != self.last_state {
            self.logger
                .info(format!("connectivity {} -> {}", self.last_state, state));
            self.last_state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::{fake::FakeSerialPort, SerialOutcome};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn cli_overrides_file_values() {
        let opts = RunOptions {
            source: Some(SourceKind::Serial),
            device: Some("/dev/ttyUSB1".into()),
            baud: Some(57_600),
            max_raw: Some(1023),
            manual: true,
            log_level: Some("debug".into()),
            ..RunOptions::default()
        };
        let cfg = AppConfig::from_sources(Config::default(), opts).unwrap();
        assert_eq!(cfg.source, SourceKind::Serial);
        assert_eq!(cfg.device, "/dev/ttyUSB1");
        assert_eq!(cfg.serial.baud, 57_600);
        assert_eq!(cfg.max_raw, 1023);
        assert_eq!(cfg.initial_mode(), OperatingMode::Manual);
        assert_eq!(cfg.log_level, LogLevel::Debug);
    }

    #[test]
    fn file_values_win_when_cli_silent() {
        let file = Config {
            device: "/dev/ttyS0".into(),
            baud: 9_600,
            active_shot_threshold: 75,
            hold_window: Duration::from_secs(4),
            ..Config::default()
        };
        let cfg = AppConfig::from_sources(file, RunOptions::default()).unwrap();
        assert_eq!(cfg.device, "/dev/ttyS0");
        assert_eq!(cfg.serial.baud, 9_600);
        assert_eq!(cfg.thresholds.active_shot, 75.0);
        assert_eq!(cfg.thresholds.hold_window, Duration::from_secs(4));
        assert_eq!(cfg.initial_mode(), OperatingMode::Automatic);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let opts = RunOptions {
            max_raw: Some(0),
            ..RunOptions::default()
        };
        assert!(AppConfig::from_sources(Config::default(), opts).is_err());

        let opts = RunOptions {
            log_level: Some("chatty".into()),
            ..RunOptions::default()
        };
        assert!(AppConfig::from_sources(Config::default(), opts).is_err());
    }

    #[test]
    fn app_reads_explicit_config_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kicksense.toml");
        fs::write(&path, "source = \"demo\"\nmax_raw = 1000\n").unwrap();
        let opts = RunOptions {
            config_path: Some(path.to_string_lossy().into_owned()),
            ..RunOptions::default()
        };
        let app = App::from_options(opts).unwrap();
        assert_eq!(app.config().source, SourceKind::Demo);
        assert_eq!(app.config().max_raw, 1000);
    }

    fn serial_loop(
        logger: &Logger,
        mode: OperatingMode,
    ) -> (EventLoop<'_>, Receiver<SerialEvent>) {
        let cfg = AppConfig {
            source: SourceKind::Serial,
            ..AppConfig::default()
        };
        let (poll_tx, _poll_rx) = channel::unbounded();
        let (serial_tx, serial_rx) = channel::unbounded();
        let feed = cfg.build_feed(poll_tx, Arc::new(AtomicBool::new(true)));
        let dashboard = Dashboard::new(
            Pipeline::new(f64::from(cfg.max_raw), cfg.thresholds),
            SourceArbiter::new(feed, mode),
            StalenessTracker::new(cfg.stale_timeout),
        );
        let ev = EventLoop::new(
            dashboard,
            SerialLink::new("/dev/fake", cfg.serial),
            serial_tx,
            SourceKind::Poll,
            logger,
        );
        (ev, serial_rx)
    }

    fn drain(ev: &mut EventLoop<'_>, rx: &Receiver<SerialEvent>) -> usize {
        let mut handled = 0;
        while let Ok(event) = rx.try_recv() {
            ev.on_serial(event, Instant::now());
            handled += 1;
        }
        handled
    }

    fn wait_for_queued(rx: &Receiver<SerialEvent>, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while rx.len() < count && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(rx.len() >= count, "reader never queued {count} events");
    }

    #[test]
    fn console_send_reaches_pipeline() {
        let logger = Logger::silent();
        let (mut ev, _rx) = serial_loop(&logger, OperatingMode::Manual);
        let now = Instant::now();
        let flow = ev.on_console(
            ConsoleEvent::Command("send 400 0 0".parse().unwrap()),
            now,
        );
        assert_eq!(flow, Flow::Continue);
        let snapshot = ev.dashboard().pipeline().snapshot();
        assert_eq!(snapshot.reading.get(Channel::Toe), 0.5);
        assert_eq!(snapshot.connectivity, ConnectivityState::On);
        assert_eq!(
            ev.on_console(ConsoleEvent::Command(ConsoleCommand::Quit), now),
            Flow::Quit
        );
    }

    #[test]
    fn serial_loss_releases_link_and_goes_off() {
        let logger = Logger::silent();
        let (mut ev, rx) = serial_loop(&logger, OperatingMode::Automatic);
        let now = Instant::now();
        ev.startup(now).unwrap();
        ev.attach_serial(FakeSerialPort::from_chunks(&["{\"toe\":300}\n"]), now);
        loop {
            let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            let last = matches!(event.outcome, SerialOutcome::Disconnected(..));
            ev.on_serial(event, Instant::now());
            if last {
                break;
            }
        }
        assert!(!ev.serial().is_connected());
        assert_eq!(ev.dashboard().connectivity(), ConnectivityState::Off);
        assert_eq!(
            ev.dashboard().pipeline().snapshot().reading.get(Channel::Toe),
            300.0 / 800.0
        );
    }

    #[test]
    fn records_queued_before_disconnect_are_ignored() {
        let logger = Logger::silent();
        let (mut ev, rx) = serial_loop(&logger, OperatingMode::Automatic);
        let now = Instant::now();
        ev.startup(now).unwrap();
        ev.attach_serial(
            FakeSerialPort::from_chunks(&["{\"toe\":300}\n", "{\"toe\":300}\n"]).hold_open(),
            now,
        );
        wait_for_queued(&rx, 2);

        ev.on_console(ConsoleEvent::Command(ConsoleCommand::Disconnect), now);
        assert_eq!(drain(&mut ev, &rx), 2);
        ev.on_tick(now + Duration::from_secs(60));

        assert!(!ev.serial().is_connected());
        assert_eq!(ev.dashboard().connectivity(), ConnectivityState::Off);
        assert_eq!(ev.dashboard().pipeline().snapshot().reading.get(Channel::Toe), 0.0);
    }

    #[test]
    fn old_reader_loss_does_not_drop_new_link() {
        let logger = Logger::silent();
        let (mut ev, rx) = serial_loop(&logger, OperatingMode::Automatic);
        let now = Instant::now();
        ev.startup(now).unwrap();
        // Ends straight away: one record, then end of stream.
        ev.attach_serial(FakeSerialPort::from_chunks(&["{\"toe\":300}\n"]), now);
        wait_for_queued(&rx, 2);

        ev.on_console(ConsoleEvent::Command(ConsoleCommand::Disconnect), now);
        ev.attach_serial(FakeSerialPort::from_chunks(&[]).hold_open(), now);
        drain(&mut ev, &rx);

        assert!(ev.serial().is_connected());
        assert_eq!(ev.dashboard().serial_link(), ev.serial().link());
    }

    #[test]
    fn status_json_includes_link_and_mode() {
        let logger = Logger::silent();
        let (mut ev, _rx) = serial_loop(&logger, OperatingMode::Manual);
        ev.startup(Instant::now()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&ev.status_json().unwrap()).unwrap();
        assert_eq!(json["mode"], "manual");
        assert_eq!(json["running"], true);
        assert_eq!(json["serial_connected"], false);
        assert_eq!(json["connectivity"], "off");
        assert_eq!(json["reading"]["toe"], 0.0);
    }
}
