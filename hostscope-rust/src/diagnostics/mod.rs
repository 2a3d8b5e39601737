//! Gated diagnostic logging
//!
//! Everything the core reports about the host goes through a
//! [`DiagnosticSink`]: two append-only line streams (general trace and call
//! stacks), each line stamped `[HH:MM:SS]` and flushed before the call
//! returns. Writes never fail the caller; an I/O problem is reported through
//! `tracing` and the line is lost.
//!
//! Repetition is gated two ways:
//! - **once**: a key is logged the first time it is seen, never again
//! - **cooldown**: a key is logged, then suppressed until its window elapses
//!
//! Both key sets live as long as the sink and are never pruned.

use crate::config::Config;
use crate::Result;
use chrono::{DateTime, Local, TimeDelta};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};

pub mod trace;

/// Banner separating nested causes in a rendered error chain
pub const INNER_BANNER: &str = "\n===========================================================================\n                              INNER EXCEPTION\n===========================================================================";

/// Cooldown applied by [`DiagnosticSink::log_error_with_cooldown`] callers that have no opinion
pub const DEFAULT_ERROR_COOLDOWN_SECS: u64 = 10;

/// Source of wall-clock time
pub trait Clock: Send {
    /// Current local time
    fn now(&self) -> DateTime<Local>;
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Trace,
    Methods,
}

/// Timestamped, gated log writer
pub struct DiagnosticSink {
    trace: Box<dyn Write + Send>,
    methods: Box<dyn Write + Send>,
    mirror_console: bool,
    seen: HashSet<String>,
    /// Next eligible time per key; `None` means suppressed for the sink's lifetime
    cooldowns: HashMap<String, Option<DateTime<Local>>>,
    clock: Box<dyn Clock>,
}

impl DiagnosticSink {
    /// Open (append) the trace and call-stack files named in `config`
    pub fn open(config: &Config) -> Result<Self> {
        fs::create_dir_all(&config.log_dir)?;
        let append = |path| OpenOptions::new().create(true).append(true).open(path);

        let sink = Self::from_writers(append(config.trace_path())?, append(config.methods_path())?)
            .mirror_console(config.mirror_console);
        Ok(sink)
    }

    /// Build a sink over arbitrary writers
    pub fn from_writers<T, M>(trace: T, methods: M) -> Self
    where
        T: Write + Send + 'static,
        M: Write + Send + 'static,
    {
        Self {
            trace: Box::new(trace),
            methods: Box::new(methods),
            mirror_console: false,
            seen: HashSet::new(),
            cooldowns: HashMap::new(),
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Also copy every line to stderr
    pub fn mirror_console(mut self, enabled: bool) -> Self {
        self.mirror_console = enabled;
        self
    }

    /// Write one line to the trace stream
    pub fn log(&mut self, text: &str) {
        self.write_line(Stream::Trace, text);
    }

    /// Log `text` only the first time `key` is seen
    ///
    /// Returns whether the line was written.
    pub fn log_once(&mut self, text: &str, key: &str) -> bool {
        if !self.seen.insert(key.to_string()) {
            return false;
        }
        self.log(text);
        true
    }

    /// Log `text` unless `key` is still cooling down from a previous line
    ///
    /// Suppressed lines are dropped. A window too large to represent never
    /// expires. Returns whether the line was written.
    pub fn log_with_cooldown(&mut self, text: &str, key: &str, cooldown_secs: u64) -> bool {
        if self.has_cooldown(key) {
            return false;
        }
        let next = i64::try_from(cooldown_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|window| self.clock.now().checked_add_signed(window));
        self.cooldowns.insert(key.to_string(), next);
        self.log(text);
        true
    }

    /// Whether `key` is inside its cooldown window
    pub fn has_cooldown(&self, key: &str) -> bool {
        self.cooldowns
            .get(key)
            .is_some_and(|next| next.map_or(true, |next| self.clock.now() < next))
    }

    /// Log an error with its full causal chain
    pub fn log_error(&mut self, error: &anyhow::Error) {
        let message = render_error_chain(error);
        self.log(&message);
    }

    /// Log an error chain unless `key` is cooling down
    ///
    /// The chain is only rendered when it will actually be written.
    pub fn log_error_with_cooldown(&mut self, error: &anyhow::Error, key: &str, cooldown_secs: u64) -> bool {
        if self.has_cooldown(key) {
            return false;
        }
        let message = render_error_chain(error);
        self.log_with_cooldown(&message, key, cooldown_secs)
    }

    /// Write the current call stack, innermost first, to the call-stack stream
    ///
    /// `skip` drops that many of the innermost caller frames.
    pub fn trace_calling_methods(&mut self, skip: usize) {
        let frames = trace::calling_frames(skip);
        self.write_line(Stream::Methods, &frames.join(" <- "));
    }

    fn write_line(&mut self, stream: Stream, text: &str) {
        let line = format!("[{}] {}", self.clock.now().format("%H:%M:%S"), text);

        let writer = match stream {
            Stream::Trace => &mut self.trace,
            Stream::Methods => &mut self.methods,
        };
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            tracing::warn!(?stream, error = %e, "failed to write diagnostic line");
        }

        if self.mirror_console {
            let stderr = io::stderr();
            let mut console = stderr.lock();
            let _ = writeln!(console, "{}", line);
            let _ = console.flush();
        }
    }
}

impl std::fmt::Debug for DiagnosticSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticSink")
            .field("mirror_console", &self.mirror_console)
            .field("seen", &self.seen.len())
            .field("cooldowns", &self.cooldowns.len())
            .finish_non_exhaustive()
    }
}

/// Leading identifier of a cause's debug form, e.g. `TypeNotFound` for `TypeNotFound("X")`
fn cause_kind(cause: &(dyn std::error::Error + 'static)) -> String {
    let debug = format!("{:?}", cause);
    let end = debug
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(debug.len());
    if end == 0 {
        "Error".to_string()
    } else {
        debug[..end].to_string()
    }
}

/// Render an error and its sources, outermost first
///
/// Each cause contributes its kind, message and call stack. Only the outermost
/// error carries a captured stack; inner causes are marked as not captured.
pub fn render_error_chain(error: &anyhow::Error) -> String {
    let mut out = String::new();
    let mut causes = error.chain().enumerate().peekable();

    while let Some((depth, cause)) = causes.next() {
        let _ = writeln!(out, "{}: {}\n", cause_kind(cause), cause);

        let backtrace = error.backtrace();
        if depth == 0 && backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(out, "{}", backtrace);
        } else {
            let _ = writeln!(out, "<call stack not captured>");
        }

        if causes.peek().is_some() {
            let _ = writeln!(out, "{}", INNER_BANNER);
        }
    }
    out
}

#[cfg(any(test, feature = "mock"))]
pub use self::capture::{CaptureBuffer, ManualClock};

#[cfg(any(test, feature = "mock"))]
mod capture {
    use super::Clock;
    use chrono::{DateTime, Duration, Local};
    use parking_lot::Mutex;
    use std::io::{self, Write};
    use std::sync::Arc;

    /// In-memory writer whose contents stay readable after it is handed to a sink
    #[derive(Debug, Clone, Default)]
    pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

    impl CaptureBuffer {
        /// Create an empty buffer
        pub fn new() -> Self {
            Self::default()
        }

        /// Everything written so far
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }

        /// Lines written so far
        pub fn lines(&self) -> Vec<String> {
            self.contents().lines().map(str::to_string).collect()
        }
    }

    impl Write for CaptureBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Clock that only moves when told to
    #[derive(Debug, Clone)]
    pub struct ManualClock(Arc<Mutex<DateTime<Local>>>);

    impl ManualClock {
        /// Start at `start`
        pub fn new(start: DateTime<Local>) -> Self {
            Self(Arc::new(Mutex::new(start)))
        }

        /// Move forward by `secs` seconds
        pub fn advance(&self, secs: i64) {
            *self.0.lock() += Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Local> {
            *self.0.lock()
        }
    }
}
