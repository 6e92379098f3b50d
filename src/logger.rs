//! Capture entry points tying snapshotter, formatter and sink together

use std::io::{self, Write};
use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::config::TraceConfig;
use crate::error::TraceError;
use crate::format::TraceFormatter;
use crate::frame::CallFrame;
use crate::native::NativeFrameSource;
use crate::sink::TraceSink;
use crate::snapshot::{FrameSource, StackSnapshotter};

/// Returned by [`StackTraceLogger::recent_logs`] when there is no log file
pub const LOG_NOT_FOUND: &str = "Log file not found.";

/// Number of lines [`StackTraceLogger::recent_logs`] callers usually ask for
pub const DEFAULT_RECENT_LINES: usize = 50;

/// Source of report timestamps
pub type Clock = fn() -> NaiveDateTime;

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Captures, renders and persists stack traces.
///
/// Every capture is taken once, in argument-preserving mode, so dispatch
/// frames are tagged with their event name in all three report variants.
/// The `skip` argument of each entry point hides that many additional
/// innermost frames on top of whatever the frame source already hides.
#[derive(Debug)]
pub struct StackTraceLogger<S = NativeFrameSource> {
    config: TraceConfig,
    snapshotter: StackSnapshotter<S>,
    formatter: TraceFormatter,
    sink: TraceSink,
    clock: Clock,
}

impl StackTraceLogger<NativeFrameSource> {
    /// Logger over the calling thread's native stack
    pub fn new(config: TraceConfig) -> Self {
        Self::with_source(config, NativeFrameSource::new())
    }
}

impl Default for StackTraceLogger<NativeFrameSource> {
    /// Logger configured from ~/.hooktrace/config.toml, or the defaults
    fn default() -> Self {
        Self::new(TraceConfig::load())
    }
}

impl<S: FrameSource> StackTraceLogger<S> {
    pub fn with_source(config: TraceConfig, source: S) -> Self {
        Self {
            formatter: TraceFormatter::new(config.dispatch_functions.iter().cloned()),
            sink: TraceSink::new(config.log_file.clone()),
            snapshotter: StackSnapshotter::new(source),
            config,
            clock: local_now,
        }
    }

    /// Replace the clock used for report timestamps
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn formatter(&self) -> &TraceFormatter {
        &self.formatter
    }

    pub fn sink(&self) -> &TraceSink {
        &self.sink
    }

    pub fn set_log_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.sink.set_path(path.clone());
        self.config.log_file = path;
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.config.max_depth = max_depth;
    }

    /// Argument-preserving capture bounded by the configured depth
    pub fn capture(&self, skip: usize) -> Vec<CallFrame> {
        self.snapshotter.capture(self.config.max_depth, skip, true)
    }

    /// Capture a report, append it to the log file and return it
    pub fn log(&self, message: &str, skip: usize) -> Result<String, TraceError> {
        let frames = self.capture(skip);
        let report = self
            .formatter
            .format_report(message, &frames, &(self.clock)());
        self.sink.append(&report)?;
        Ok(report)
    }

    /// Capture a report and print it to stdout
    pub fn print_trace(&self, message: &str, skip: usize) {
        let stdout = io::stdout();
        if let Err(e) = self.write_trace(&mut stdout.lock(), message, skip) {
            tracing::warn!(error = %e, "Failed to print stack trace");
        }
    }

    /// Capture a report and write the screen rendering to `out`
    pub fn write_trace<W: Write>(&self, out: &mut W, message: &str, skip: usize) -> io::Result<()> {
        let frames = self.capture(skip);
        out.write_all(self.formatter.format_screen_report(message, &frames).as_bytes())?;
        out.flush()
    }

    /// Capture a report and return the compact rendering without persisting it
    pub fn trace_string(&self, message: &str, skip: usize) -> String {
        let frames = self.capture(skip);
        self.formatter.format_plain_report(message, &frames)
    }

    /// Truncate the log file
    pub fn clear_log(&self) -> Result<(), TraceError> {
        self.sink.clear()
    }

    /// Last `lines` lines of the log file, or [`LOG_NOT_FOUND`]
    pub fn recent_logs(&self, lines: usize) -> Result<String, TraceError> {
        Ok(self
            .sink
            .tail(lines)?
            .unwrap_or_else(|| LOG_NOT_FOUND.to_string()))
    }
}

/// Append a report of the caller's stack to the configured log file
pub fn log_stack_trace(message: &str) -> Result<String, TraceError> {
    StackTraceLogger::default().log(message, 0)
}

/// Print a report of the caller's stack to stdout
pub fn print_stack_trace(message: &str) {
    StackTraceLogger::default().print_trace(message, 0);
}

/// Report of the caller's stack as a string
pub fn get_stack_trace(message: &str) -> String {
    StackTraceLogger::default().trace_string(message, 0)
}
