//! Stack trace capture for debugging event dispatch order.
//!
//! A [`StackTraceLogger`] snapshots the current call stack, tags frames that
//! are calls to a recognised event dispatch function (`do_action`,
//! `apply_filters`, ...) with the event name passed as their first argument,
//! and renders the result as text that can be appended to a log file,
//! printed, or returned.
//!
//! ```no_run
//! use hooktrace::{StackTraceLogger, TraceConfig};
//!
//! let logger = StackTraceLogger::new(TraceConfig::default().with_log_file("logs/trace.log"));
//! logger.log("Debugging REST API issue", 0)?;
//! logger.print_trace("Current execution path", 0);
//! let trace = logger.trace_string("Custom debug point", 0);
//! # let _ = trace;
//! # Ok::<(), hooktrace::TraceError>(())
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod frame;
pub mod logger;
pub mod native;
pub mod shadow;
pub mod sink;
pub mod snapshot;
pub mod util;

pub use config::TraceConfig;
pub use error::TraceError;
pub use format::{TraceFormatter, DEFAULT_DISPATCH_FUNCTIONS};
pub use frame::{CallFrame, CallOperator, FrameOwner, RawFrame};
pub use logger::{
    get_stack_trace, log_stack_trace, print_stack_trace, StackTraceLogger, LOG_NOT_FOUND,
};
pub use native::NativeFrameSource;
pub use shadow::ShadowFrameSource;
pub use sink::TraceSink;
pub use snapshot::{FixedFrameSource, FrameSource, StackSnapshotter};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::to_value;
}
