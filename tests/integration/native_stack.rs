//! Captures of the real Rust call stack

use hooktrace::{
    dispatch_frame, get_stack_trace, shadow, CallFrame, CallOperator, NativeFrameSource,
    StackSnapshotter, StackTraceLogger, TraceConfig,
};
use tempfile::TempDir;

use super::common::determinism::{init_test_logging, test_now};

#[inline(never)]
fn capture_here(max_depth: usize, skip: usize) -> Vec<CallFrame> {
    StackSnapshotter::new(NativeFrameSource::new()).capture(max_depth, skip, true)
}

#[inline(never)]
fn nested_capture(skip: usize) -> Vec<CallFrame> {
    capture_here(8, skip)
}

/// The first reported frame is the caller, not hooktrace or backtrace internals
#[test]
fn test_native_capture_starts_at_caller() {
    init_test_logging();
    let frames = capture_here(5, 0);
    assert!(!frames.is_empty() && frames.len() <= 5);

    let first = &frames[0];
    assert_eq!(first.function_name.as_deref(), Some("capture_here"));
    assert!(first.owner.is_none(), "free functions have no owner type");
    assert!(first.arguments.is_none());
}

struct Registry;

impl Registry {
    #[inline(never)]
    fn dispatch(&self) -> Vec<CallFrame> {
        capture_here(4, 1)
    }
}

#[test]
fn test_native_method_owner() {
    let frames = Registry.dispatch();
    let owner = frames[0].owner.as_ref().expect("method frames have an owner");
    assert!(owner.type_name.contains("native_stack::Registry"));
    assert_eq!(owner.operator, CallOperator::Static);
    assert_eq!(frames[0].function_name.as_deref(), Some("dispatch"));
}

#[inline(never)]
fn do_action(name: &str) -> String {
    let _frame = shadow::enter(dispatch_frame!("do_action", name));
    get_stack_trace("instrumented")
}

#[inline(never)]
fn apply_filters<T: serde::Serialize>(name: &str, value: T) -> String {
    let _frame = shadow::enter(dispatch_frame!("apply_filters", name, &value));
    do_action("init")
}

/// Instrumented dispatch calls are tagged on the live stack
#[test]
fn test_native_report_tags_instrumented_dispatch() {
    let text = apply_filters("the_title", String::from("Hello"));
    let lines: Vec<&str> = text.lines().filter(|l| l.starts_with('#')).collect();

    assert!(
        lines[0].starts_with("#0 do_action [HOOK: 'init'] called at ["),
        "unexpected first frame: {}",
        lines[0]
    );
    assert!(
        lines[1].starts_with("#1 apply_filters [HOOK: 'the_title'] called at ["),
        "unexpected second frame: {}",
        lines[1]
    );
    assert_eq!(text.matches("[HOOK:").count(), 2);
}

/// Without an instrumented frame nothing is tagged, even for a dispatch name
#[test]
fn test_native_uninstrumented_dispatch_is_untagged() {
    #[inline(never)]
    fn do_action() -> String {
        get_stack_trace("")
    }
    assert!(!do_action().contains("[HOOK:"));
}

#[test]
fn test_native_skip_drops_innermost() {
    let full = nested_capture(0);
    let skipped = nested_capture(1);

    assert!(full.len() >= 2);
    assert_eq!(full[1].function_name.as_deref(), Some("nested_capture"));
    assert_eq!(skipped[0].function_name, full[1].function_name);
}

#[test]
fn test_native_depth_budget() {
    assert!(capture_here(1, 0).len() <= 1);
    assert!(capture_here(0, 0).is_empty());
    assert!(capture_here(4, 10_000).is_empty());
}

#[test]
fn test_get_stack_trace_reports_caller() {
    let text = get_stack_trace("native");
    assert!(text.starts_with("\nSTACK TRACE - native\n"));
    assert!(text.contains("test_get_stack_trace_reports_caller"));
    assert!(!text.contains("StackTraceLogger"));
}

#[test]
fn test_native_log_to_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let logger = StackTraceLogger::new(
        TraceConfig::default()
            .with_log_file(dir.path().join("trace.log"))
            .with_max_depth(3),
    )
    .with_clock(test_now);

    let report = logger.log("native", 0).unwrap();
    let frame_lines = report.lines().filter(|l| l.starts_with('#')).count();
    assert!((1..=3).contains(&frame_lines));
    assert_eq!(logger.recent_logs(100).unwrap(), report);
}
