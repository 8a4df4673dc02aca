//! Line-oriented link to the microcontroller display.
//!
//! Inbound lines are button and liveness tags, outbound lines are plain
//! status or response text. A listener thread polls the port every
//! [`LISTEN_INTERVAL`]; a monitor thread ticks every [`MONITOR_INTERVAL`],
//! probes a quiet link with `PING` and reconnects after [`LINK_TIMEOUT`] of
//! silence.

use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::errors::{AgriError, AgriResult};

pub const LISTEN_INTERVAL: Duration = Duration::from_millis(100);
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(2);
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(8);
pub const LINK_TIMEOUT: Duration = Duration::from_secs(10);

const READ_CHUNK: usize = 256;
/// Longest unterminated input kept while waiting for a newline
const MAX_PENDING_BYTES: usize = 1024;
const READY_STATUS: &str = "AgriGrok ready";

/// A recognized inbound line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    ButtonPressed(String),
    ArduinoReady,
    ShieldMounted,
    Heartbeat,
    Pong,
    Unrecognized(String),
}

impl DeviceEvent {
    pub fn parse_line(line: &str) -> Self {
        let line = line.trim();
        if let Some(name) = line.strip_prefix("BUTTON_PRESSED:") {
            return DeviceEvent::ButtonPressed(name.trim().to_string());
        }
        match line {
            "ARDUINO_READY" => DeviceEvent::ArduinoReady,
            "SHIELD_MOUNTED" => DeviceEvent::ShieldMounted,
            "HEARTBEAT" => DeviceEvent::Heartbeat,
            "PONG" => DeviceEvent::Pong,
            other => DeviceEvent::Unrecognized(other.to_string()),
        }
    }
}

/// An outbound line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    Status(String),
    Response(String),
    Ping,
}

impl DeviceCommand {
    /// One newline-terminated line; embedded line breaks are flattened.
    pub fn encode(&self) -> String {
        let text = match self {
            DeviceCommand::Status(text) | DeviceCommand::Response(text) => flatten(text),
            DeviceCommand::Ping => "PING".to_string(),
        };
        format!("{}\n", text)
    }
}

fn flatten(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// What the bridge reports to the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    Connected,
    LinkDown,
    Device(DeviceEvent),
}

/// Splits a byte stream into complete lines.
///
/// Bytes are only decoded once a whole line is in, so a character split
/// across reads survives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\r', '\n']);
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
        }
        if self.pending.len() > MAX_PENDING_BYTES {
            warn!(
                "Dropping {} bytes of serial input with no line break",
                self.pending.len()
            );
            self.pending.clear();
        }
        lines
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Alive,
    /// Silent past the heartbeat interval; worth a probe
    Quiet,
    Down,
}

/// Loop periods and liveness thresholds of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeTiming {
    /// Listener poll period, also the port read timeout
    pub listen: Duration,
    /// Monitor tick period
    pub monitor: Duration,
    /// Silence after which the link is probed with `PING`
    pub heartbeat: Duration,
    /// Silence after which the link is declared down
    pub link_timeout: Duration,
}

impl Default for BridgeTiming {
    fn default() -> Self {
        Self {
            listen: LISTEN_INTERVAL,
            monitor: MONITOR_INTERVAL,
            heartbeat: HEARTBEAT_INTERVAL,
            link_timeout: LINK_TIMEOUT,
        }
    }
}

/// Tracks the last sign of life on the link
#[derive(Debug, Clone, Copy)]
pub struct LinkMonitor {
    last_seen: Instant,
    heartbeat: Duration,
    link_timeout: Duration,
}

impl LinkMonitor {
    pub fn new(now: Instant, timing: &BridgeTiming) -> Self {
        Self {
            last_seen: now,
            heartbeat: timing.heartbeat,
            link_timeout: timing.link_timeout,
        }
    }

    pub fn record(&mut self, now: Instant) {
        self.last_seen = now;
    }

    pub fn status(&self, now: Instant) -> LinkStatus {
        let silence = now.saturating_duration_since(self.last_seen);
        if silence >= self.link_timeout {
            LinkStatus::Down
        } else if silence > self.heartbeat {
            LinkStatus::Quiet
        } else {
            LinkStatus::Alive
        }
    }
}

/// Opens a fresh handle to the device on every (re)connect
pub type PortOpener = Box<dyn Fn() -> serialport::Result<Box<dyn SerialPort>> + Send + Sync>;

struct Shared {
    path: String,
    timing: BridgeTiming,
    opener: PortOpener,
    port: Mutex<Option<Box<dyn SerialPort>>>,
    monitor: Mutex<LinkMonitor>,
    running: AtomicBool,
    events: UnboundedSender<BridgeEvent>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn emit(&self, event: BridgeEvent) {
        if self.events.send(event).is_err() {
            debug!("Bridge event dropped: receiver closed");
        }
    }

    fn try_connect(&self) -> bool {
        match (self.opener)() {
            Ok(mut port) => {
                if let Err(e) = port.write_data_terminal_ready(true) {
                    debug!("Could not raise DTR on {}: {}", self.path, e);
                }
                *lock(&self.port) = Some(port);
                lock(&self.monitor).record(Instant::now());
                info!("Serial link open on {}", self.path);
                self.emit(BridgeEvent::Connected);
                true
            }
            Err(e) => {
                debug!("Could not open {}: {}", self.path, e);
                false
            }
        }
    }

    fn disconnect(&self) {
        if lock(&self.port).take().is_some() {
            self.emit(BridgeEvent::LinkDown);
        }
    }

    fn write_line(&self, command: &DeviceCommand) -> AgriResult<()> {
        let mut guard = lock(&self.port);
        let port = guard
            .as_mut()
            .ok_or_else(|| AgriError::SerialError(format!("{} is not connected", self.path)))?;

        let line = command.encode();
        let written = port
            .write_all(line.as_bytes())
            .and_then(|_| port.flush());
        if let Err(e) = written {
            *guard = None;
            drop(guard);
            self.emit(BridgeEvent::LinkDown);
            return Err(AgriError::SerialError(format!(
                "Failed to write to {}: {}",
                self.path, e
            )));
        }
        debug!("[serial out] {}", line.trim_end());
        Ok(())
    }

    fn handle_line(&self, line: &str) {
        lock(&self.monitor).record(Instant::now());
        let event = DeviceEvent::parse_line(line);
        match &event {
            DeviceEvent::Heartbeat | DeviceEvent::Pong => {
                debug!("[serial in] {}", line);
                return;
            }
            DeviceEvent::ArduinoReady => {
                info!("Device reports ready");
                if let Err(e) = self.write_line(&DeviceCommand::Status(READY_STATUS.to_string())) {
                    warn!("{}", e);
                }
            }
            DeviceEvent::ShieldMounted => info!("Display shield mounted"),
            DeviceEvent::ButtonPressed(name) => info!("Button pressed: {}", name),
            DeviceEvent::Unrecognized(text) => {
                warn!("Unrecognized serial line: {:?}", text);
                return;
            }
        }
        self.emit(BridgeEvent::Device(event));
    }

    /// Sleeps in short steps so shutdown is not delayed by a whole interval.
    fn pause(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while self.running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(self.timing.listen));
        }
    }
}

fn listen(shared: Arc<Shared>) {
    let mut buffer = LineBuffer::default();
    let mut chunk = [0_u8; READ_CHUNK];

    while shared.running() {
        let read = lock(&shared.port).as_mut().map(|port| port.read(&mut chunk));
        match read {
            None => {
                buffer.clear();
                thread::sleep(shared.timing.listen);
            }
            Some(Ok(0)) => {}
            Some(Ok(n)) => {
                for line in buffer.push(&chunk[..n]) {
                    shared.handle_line(&line);
                }
            }
            Some(Err(e)) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Some(Err(e)) => {
                warn!("Serial read error on {}: {}", shared.path, e);
                shared.disconnect();
            }
        }
    }
}

fn supervise(shared: Arc<Shared>) {
    while shared.running() {
        shared.pause(shared.timing.monitor);
        if !shared.running() {
            break;
        }

        if lock(&shared.port).is_none() {
            shared.try_connect();
            continue;
        }

        let status = lock(&shared.monitor).status(Instant::now());
        match status {
            LinkStatus::Alive => {}
            LinkStatus::Quiet => {
                if let Err(e) = shared.write_line(&DeviceCommand::Ping) {
                    warn!("{}", e);
                }
            }
            LinkStatus::Down => {
                warn!(
                    "No heartbeat from {} for {:?}, reconnecting",
                    shared.path, shared.timing.link_timeout
                );
                shared.disconnect();
                shared.try_connect();
            }
        }
    }
}

/// Handle to the running serial loops. Dropping it stops them.
pub struct SerialBridge {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl SerialBridge {
    /// Open the port (if possible) and start the listener and monitor loops.
    /// A missing device is not an error: the monitor keeps retrying.
    pub fn start(path: &str, baud: u32, events: UnboundedSender<BridgeEvent>) -> Self {
        let timing = BridgeTiming::default();
        let device = path.to_string();
        let opener: PortOpener = Box::new(move || {
            serialport::new(&device, baud)
                .timeout(timing.listen)
                .open()
        });
        debug!("Serial bridge for {} @ {} baud", path, baud);
        Self::start_with(path, timing, opener, events)
    }

    /// Start the loops over ports produced by `opener`. `label` names the
    /// link in logs and in [`SerialBridge::path`].
    pub fn start_with(
        label: &str,
        timing: BridgeTiming,
        opener: PortOpener,
        events: UnboundedSender<BridgeEvent>,
    ) -> Self {
        let shared = Arc::new(Shared {
            path: label.to_string(),
            timing,
            opener,
            port: Mutex::new(None),
            monitor: Mutex::new(LinkMonitor::new(Instant::now(), &timing)),
            running: AtomicBool::new(true),
            events,
        });

        if !shared.try_connect() {
            warn!("Serial device {} not available, will keep retrying", label);
        }

        let listener = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || listen(shared))
        };
        let monitor = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || supervise(shared))
        };

        Self {
            shared,
            threads: vec![listener, monitor],
        }
    }

    pub fn send(&self, command: DeviceCommand) -> AgriResult<()> {
        self.shared.write_line(&command)
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.shared.port).is_some()
    }

    pub fn path(&self) -> &str {
        &self.shared.path
    }
}

impl Drop for SerialBridge {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}
