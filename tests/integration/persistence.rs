//! Log file persistence: append, tail and clear

use std::fs;
use std::sync::Arc;
use std::thread;

use hooktrace::{StackTraceLogger, TraceConfig, TraceError, TraceSink, LOG_NOT_FOUND};
use tempfile::TempDir;

use super::common::determinism::test_now;
use super::common::fixtures::three_deep_stack;

fn temp_log() -> (TempDir, TraceSink) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let sink = TraceSink::new(dir.path().join("logs").join("stacktrace.log"));
    (dir, sink)
}

#[test]
fn test_append_then_tail_round_trip() {
    let (_dir, sink) = temp_log();
    let written = ["first line\n", "\n", "=== second ===\n", "third [HOOK: 'x']\n"];
    sink.append(&written.concat()).unwrap();

    for n in 0..written.len() {
        let expected = written[written.len() - n..].concat();
        assert_eq!(sink.tail(n).unwrap(), Some(expected), "tail({n})");
    }
    assert_eq!(sink.tail(written.len()).unwrap(), Some(written.concat()));
    assert_eq!(sink.tail(written.len() + 10).unwrap(), Some(written.concat()));
}

#[test]
fn test_reports_accumulate() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let logger = StackTraceLogger::with_source(
        TraceConfig::default().with_log_file(dir.path().join("trace.log")),
        three_deep_stack(),
    )
    .with_clock(test_now);

    let first = logger.log("one", 0).unwrap();
    let second = logger.log("two", 0).unwrap();

    let contents = fs::read_to_string(dir.path().join("trace.log")).unwrap();
    assert_eq!(contents, format!("{first}{second}"));

    let second_lines = second.lines().count();
    assert_eq!(logger.recent_logs(second_lines).unwrap(), second);
}

#[test]
fn test_clear_then_tail() {
    let (_dir, sink) = temp_log();
    sink.append("a\nb\n").unwrap();
    sink.clear().unwrap();
    assert_eq!(sink.tail(5).unwrap().as_deref(), Some(""));
}

#[test]
fn test_recent_logs_sentinel() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let logger = StackTraceLogger::with_source(
        TraceConfig::default().with_log_file(dir.path().join("never-written.log")),
        three_deep_stack(),
    );
    assert_eq!(logger.recent_logs(50).unwrap(), LOG_NOT_FOUND);
    logger.clear_log().unwrap();
    assert_eq!(logger.recent_logs(50).unwrap(), LOG_NOT_FOUND);
}

#[cfg(unix)]
#[test]
fn test_unwritable_directory_is_an_error() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o500)).unwrap();

    // Root ignores directory permissions
    if fs::write(locked.join("writable"), "").is_ok() {
        return;
    }

    let sink = TraceSink::new(locked.join("sub").join("trace.log"));
    let err = sink.append("lost\n").unwrap_err();
    assert!(matches!(err, TraceError::CreateDir { .. }));

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o700)).unwrap();
}

/// Writers with their own handles on the same file never interleave blocks
#[test]
fn test_concurrent_appends_keep_blocks_intact() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = Arc::new(dir.path().join("shared.log"));

    let writers: Vec<_> = (0..4)
        .map(|id| {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                let sink = TraceSink::new(path.as_path());
                let block: String = (0..20).map(|line| format!("writer-{id} line-{line}\n")).collect();
                for _ in 0..25 {
                    sink.append(&block).unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let contents = fs::read_to_string(path.as_path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4 * 25 * 20);
    for block in lines.chunks(20) {
        let owner = block[0].split(' ').next().unwrap();
        assert!(block.iter().all(|l| l.starts_with(owner)));
        assert!(block[0].ends_with("line-0"));
    }
}
