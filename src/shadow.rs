//! Thread-local shadow stack for instrumented dispatch calls
//!
//! Rust exposes no call arguments through stack introspection, so a host
//! that wants hook names in its reports registers its dispatch calls here:
//!
//! ```
//! use hooktrace::{dispatch_frame, shadow};
//!
//! fn apply_filters(name: &str, value: String) -> String {
//!     let _frame = shadow::enter(dispatch_frame!("apply_filters", name, &value));
//!     value
//! }
//! # apply_filters("the_title", "Hello".into());
//! ```
//!
//! The pushed frame is popped when the returned guard drops.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::path::Path;

use crate::frame::RawFrame;
use crate::snapshot::FrameSource;

thread_local! {
    static SHADOW_STACK: RefCell<Vec<RawFrame>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a frame on the shadow stack while alive
#[must_use = "the frame is popped as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FrameGuard {
    index: usize,
    // Tied to the thread that owns the stack
    _not_send: PhantomData<*const ()>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        SHADOW_STACK.with(|stack| stack.borrow_mut().truncate(self.index));
    }
}

/// Push `frame` onto the current thread's shadow stack
pub fn enter(frame: RawFrame) -> FrameGuard {
    SHADOW_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        let index = stack.len();
        stack.push(frame);
        FrameGuard {
            index,
            _not_send: PhantomData,
        }
    })
}

/// Number of frames currently on this thread's shadow stack
pub fn depth() -> usize {
    SHADOW_STACK.with(|stack| stack.borrow().len())
}

/// Copy of this thread's shadow stack, innermost first
pub fn snapshot() -> Vec<RawFrame> {
    SHADOW_STACK.with(|stack| stack.borrow().iter().rev().cloned().collect())
}

/// Copy argument values from this thread's shadow stack onto `frames`.
///
/// `frames` is ordered innermost first. Shadow frames are matched in the
/// same order onto the next frame with an equal function name, and a file
/// path ending in the shadow frame's file when both are known. A shadow
/// frame with no match is skipped.
pub(crate) fn attach_arguments(frames: &mut [RawFrame]) {
    SHADOW_STACK.with(|stack| {
        let stack = stack.borrow();
        let mut next = 0;

        for shadow in stack.iter().rev() {
            let Some(function) = shadow.function.as_deref() else {
                continue;
            };
            let found = frames[next..].iter().position(|frame| {
                frame.function.as_deref() == Some(function)
                    && same_file(frame.file.as_deref(), shadow.file.as_deref())
            });
            if let Some(offset) = found {
                frames[next + offset].args = shadow.args.clone();
                next += offset + 1;
            }
        }
    });
}

fn same_file(native: Option<&str>, shadow: Option<&str>) -> bool {
    match (native, shadow) {
        (Some(native), Some(shadow)) => Path::new(native).ends_with(shadow),
        _ => true,
    }
}

/// Frame source backed by the calling thread's shadow stack
#[derive(Debug, Clone, Copy, Default)]
pub struct ShadowFrameSource;

impl FrameSource for ShadowFrameSource {
    fn capture_raw_frames(&self, limit: usize, with_arguments: bool) -> Vec<RawFrame> {
        SHADOW_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .take(limit)
                .cloned()
                .map(|mut frame| {
                    if !with_arguments {
                        frame.args = None;
                    }
                    frame
                })
                .collect()
        })
    }
}

/// Build a [`RawFrame`] for a dispatch call at the invocation site.
///
/// The first argument is the dispatch function's name; the rest are
/// serialized to JSON values and recorded as the call's arguments.
#[macro_export]
macro_rules! dispatch_frame {
    ($function:expr $(, $arg:expr)* $(,)?) => {
        $crate::frame::RawFrame::new($function)
            .at(file!(), line!())
            .with_args(vec![$($crate::__private::to_value(&$arg).unwrap_or_default()),*])
    };
}
