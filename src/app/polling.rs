use crossbeam::channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::arbiter::{FeedControl, PassiveFeed};
use crate::{payload::SensorPayload, Error, Result};

/// Shortest slice the poller sleeps before re-checking its running flag.
const STOP_CHECK_MS: u64 = 25;

/// Something that can be asked for the latest snapshot once per tick.
pub trait SnapshotSource {
    /// `Ok(None)` means "no data yet"; it is not an error.
    fn fetch(&mut self) -> Result<Option<SensorPayload>>;

    fn describe(&self) -> String;
}

/// What one poll tick produced.
#[derive(Debug)]
pub enum PollOutcome {
    Snapshot(SensorPayload),
    Empty,
    Error(String),
}

/// Reports sent over the polling channel, stamped with the feed run that made them.
#[derive(Debug)]
pub struct PollEvent {
    pub generation: u64,
    pub outcome: PollOutcome,
}

/// Blocking HTTP GET against the remote store's "latest" endpoint.
pub struct HttpSnapshotSource {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpSnapshotSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn fetch(&mut self) -> Result<Option<SensorPayload>> {
        let response = self.agent.get(&self.endpoint).call().map_err(|err| match err {
            ureq::Error::Status(code, _) => {
                Error::Http(format!("{} answered with status {code}", self.endpoint))
            }
            ureq::Error::Transport(transport) => {
                Error::Http(format!("{}: {transport}", self.endpoint))
            }
        })?;
        let body = response.into_string()?;
        parse_snapshot_body(&body)
    }

    fn describe(&self) -> String {
        format!("http {}", self.endpoint)
    }
}

/// The store answers `null` or an empty body until the shoe has written once.
pub fn parse_snapshot_body(body: &str) -> Result<Option<SensorPayload>> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    SensorPayload::from_json_str(trimmed).map(Some)
}

/// Guard for one poller thread. Stopping flips the flag; the thread exits at
/// its next check and anything it still sends carries a dead generation.
pub struct PollingHandle {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
    generation: u64,
}

impl PollingHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Spawn the background poller that calls `source` roughly every `interval`.
pub fn start_polling(
    mut source: Box<dyn SnapshotSource + Send>,
    interval: Duration,
    generation: u64,
    tx: Sender<PollEvent>,
    app_running: Arc<AtomicBool>,
) -> Result<PollingHandle> {
    let interval = interval.max(Duration::from_millis(1));
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    let join = thread::Builder::new()
        .name(format!("kicksense-poller-{generation}"))
        .spawn(move || {
            let alive =
                || app_running.load(Ordering::SeqCst) && running_clone.load(Ordering::SeqCst);
            while alive() {
                let start = Instant::now();
                let outcome = match source.fetch() {
                    Ok(Some(payload)) => PollOutcome::Snapshot(payload),
                    Ok(None) => PollOutcome::Empty,
                    Err(err) => PollOutcome::Error(err.to_string()),
                };
                if !alive() || tx.send(PollEvent { generation, outcome }).is_err() {
                    break;
                }
                while alive() {
                    let elapsed = start.elapsed();
                    if elapsed >= interval {
                        break;
                    }
                    thread::sleep((interval - elapsed).min(Duration::from_millis(STOP_CHECK_MS)));
                }
            }
        })?;
    Ok(PollingHandle {
        running,
        join: Some(join),
        generation,
    })
}

pub type SourceFactory = Box<dyn FnMut() -> Box<dyn SnapshotSource + Send> + Send>;

/// Automatic feed backed by a poller thread. Each start builds a fresh source.
pub struct PollerFeed {
    make_source: SourceFactory,
    interval: Duration,
    tx: Sender<PollEvent>,
    app_running: Arc<AtomicBool>,
    handle: Option<PollingHandle>,
    generation: u64,
    description: Option<String>,
}

impl PollerFeed {
    pub fn new(
        make_source: SourceFactory,
        interval: Duration,
        tx: Sender<PollEvent>,
        app_running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            make_source,
            interval,
            tx,
            app_running,
            handle: None,
            generation: 0,
            description: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Source behind the most recent start, if the feed was ever started.
    pub fn describe(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl FeedControl for PollerFeed {
    fn start_feed(&mut self) -> Result<()> {
        self.stop_feed();
        self.generation += 1;
        let source = (self.make_source)();
        self.description = Some(source.describe());
        self.handle = Some(start_polling(
            source,
            self.interval,
            self.generation,
            self.tx.clone(),
            self.app_running.clone(),
        )?);
        Ok(())
    }

    fn stop_feed(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }

    fn is_feeding(&self) -> bool {
        self.handle.is_some()
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

/// The automatic feed the daemon was configured with.
pub enum AutoFeed {
    Polling(PollerFeed),
    Passive(PassiveFeed),
}

impl AutoFeed {
    pub fn describe(&self) -> String {
        match self {
            AutoFeed::Polling(feed) => {
                let source = feed.describe().unwrap_or("poller");
                format!("{source} every {}", humantime::format_duration(feed.interval()))
            }
            AutoFeed::Passive(_) => "serial link".into(),
        }
    }
}

impl FeedControl for AutoFeed {
    fn start_feed(&mut self) -> Result<()> {
        match self {
            AutoFeed::Polling(feed) => feed.start_feed(),
            AutoFeed::Passive(feed) => feed.start_feed(),
        }
    }

    fn stop_feed(&mut self) {
        match self {
            AutoFeed::Polling(feed) => feed.stop_feed(),
            AutoFeed::Passive(feed) => feed.stop_feed(),
        }
    }

    fn is_feeding(&self) -> bool {
        match self {
            AutoFeed::Polling(feed) => feed.is_feeding(),
            AutoFeed::Passive(feed) => feed.is_feeding(),
        }
    }

    fn generation(&self) -> u64 {
        match self {
            AutoFeed::Polling(feed) => feed.generation(),
            AutoFeed::Passive(feed) => feed.generation(),
        }
    }
}
