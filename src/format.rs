//! Text rendering of captured stacks

use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::frame::CallFrame;

/// Dispatch functions recognised out of the box
pub const DEFAULT_DISPATCH_FUNCTIONS: [&str; 4] = [
    "do_action",
    "apply_filters",
    "do_action_ref_array",
    "apply_filters_ref_array",
];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const UNKNOWN_FILE: &str = "Unknown file";
const UNKNOWN_LINE: &str = "Unknown line";
const UNKNOWN_FUNCTION: &str = "Unknown function";

const REPORT_RULE_WIDTH: usize = 80;
const SCREEN_RULE_WIDTH: usize = 50;
const PLAIN_RULE_WIDTH: usize = 40;

/// Renders call frames and tags event dispatch frames with their event name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFormatter {
    dispatch_functions: BTreeSet<String>,
}

impl Default for TraceFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_DISPATCH_FUNCTIONS)
    }
}

impl TraceFormatter {
    /// Create a formatter recognising exactly `dispatch_functions`
    pub fn new<I, S>(dispatch_functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dispatch_functions: dispatch_functions.into_iter().map(Into::into).collect(),
        }
    }

    /// Recognise one more dispatch function name
    pub fn add_dispatch_function(&mut self, name: impl Into<String>) {
        self.dispatch_functions.insert(name.into());
    }

    pub fn is_dispatch_function(&self, name: &str) -> bool {
        self.dispatch_functions.contains(name)
    }

    pub fn dispatch_functions(&self) -> impl Iterator<Item = &str> {
        self.dispatch_functions.iter().map(String::as_str)
    }

    /// Full report as written to the log file.
    ///
    /// An empty `message` omits the `MESSAGE:` line.
    pub fn format_report(
        &self,
        message: &str,
        frames: &[CallFrame],
        timestamp: &NaiveDateTime,
    ) -> String {
        let rule = "=".repeat(REPORT_RULE_WIDTH);

        let mut out = format!("\n{rule}\n");
        out.push_str(&format!(
            "STACK TRACE - {}\n",
            timestamp.format(TIMESTAMP_FORMAT)
        ));
        if !message.is_empty() {
            out.push_str(&format!("MESSAGE: {message}\n"));
        }
        out.push_str(&format!("{rule}\n"));
        self.push_frames(&mut out, frames);
        out.push_str(&format!("{rule}\n"));
        out
    }

    /// Report variant for printing to a terminal
    pub fn format_screen_report(&self, message: &str, frames: &[CallFrame]) -> String {
        let rule = "=".repeat(SCREEN_RULE_WIDTH);

        let mut out = format!("\n{rule}\n");
        out.push_str(&header(message));
        out.push_str(&format!("{rule}\n"));
        self.push_frames(&mut out, frames);
        out.push_str(&format!("{rule}\n\n"));
        out
    }

    /// Compact report variant returned as a string
    pub fn format_plain_report(&self, message: &str, frames: &[CallFrame]) -> String {
        let mut out = format!("\n{}", header(message));
        out.push_str(&format!("{}\n", "-".repeat(PLAIN_RULE_WIDTH)));
        self.push_frames(&mut out, frames);
        out
    }

    /// `#<index> <call> called at [<file>:<line>]`, newline terminated
    pub fn format_frame(&self, index: usize, frame: &CallFrame) -> String {
        let file = frame.source_file.as_deref().unwrap_or(UNKNOWN_FILE);
        let line = frame
            .source_line
            .map(|line| line.to_string())
            .unwrap_or_else(|| UNKNOWN_LINE.to_string());

        let mut call = call_expression(frame);
        if let Some(event) = self.extract_event_name(frame) {
            call.push_str(&format!(" [HOOK: '{event}']"));
        }

        format!("#{index} {call} called at [{file}:{line}]\n")
    }

    /// Event name of a dispatch frame, taken from its first argument.
    ///
    /// Requires preserved arguments, an exact match on a recognised dispatch
    /// function name, and a string first argument.
    pub fn extract_event_name<'a>(&self, frame: &'a CallFrame) -> Option<&'a str> {
        let arguments = frame.arguments.as_ref()?;
        let function = frame.function_name.as_deref()?;
        if !self.is_dispatch_function(function) {
            return None;
        }
        arguments.first()?.as_str()
    }

    fn push_frames(&self, out: &mut String, frames: &[CallFrame]) {
        for (index, frame) in frames.iter().enumerate() {
            out.push_str(&self.format_frame(index, frame));
        }
    }
}

fn header(message: &str) -> String {
    if message.is_empty() {
        "STACK TRACE\n".to_string()
    } else {
        format!("STACK TRACE - {message}\n")
    }
}

fn call_expression(frame: &CallFrame) -> String {
    let function = frame.function_name.as_deref().unwrap_or(UNKNOWN_FUNCTION);
    match &frame.owner {
        Some(owner) => format!("{}{}{}", owner.type_name, owner.operator, function),
        None => function.to_string(),
    }
}
