//! Bounded-depth stack snapshots

use std::sync::Arc;

use crate::frame::{CallFrame, RawFrame};

/// Default number of frames kept in a report
pub const DEFAULT_MAX_DEPTH: usize = 15;

/// Runtime introspection seam.
///
/// Implementations return at most `limit` frames ordered innermost first.
/// Argument values are only expected when `with_arguments` is set, and a
/// source that cannot provide them leaves `args` empty.
pub trait FrameSource {
    fn capture_raw_frames(&self, limit: usize, with_arguments: bool) -> Vec<RawFrame>;
}

impl<T: FrameSource + ?Sized> FrameSource for &T {
    fn capture_raw_frames(&self, limit: usize, with_arguments: bool) -> Vec<RawFrame> {
        (**self).capture_raw_frames(limit, with_arguments)
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn capture_raw_frames(&self, limit: usize, with_arguments: bool) -> Vec<RawFrame> {
        (**self).capture_raw_frames(limit, with_arguments)
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Arc<T> {
    fn capture_raw_frames(&self, limit: usize, with_arguments: bool) -> Vec<RawFrame> {
        (**self).capture_raw_frames(limit, with_arguments)
    }
}

/// Produces trimmed [`CallFrame`] sequences from a [`FrameSource`]
#[derive(Debug, Clone, Default)]
pub struct StackSnapshotter<S> {
    source: S,
}

impl<S: FrameSource> StackSnapshotter<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Capture up to `max_depth` frames after discarding the `skip_count`
    /// innermost ones.
    ///
    /// A stack shallower than the budget yields whatever is left after
    /// trimming, possibly nothing.
    pub fn capture(
        &self,
        max_depth: usize,
        skip_count: usize,
        preserve_arguments: bool,
    ) -> Vec<CallFrame> {
        let limit = max_depth.saturating_add(skip_count);
        let raw = self.source.capture_raw_frames(limit, preserve_arguments);
        let available = raw.len();

        let frames: Vec<CallFrame> = raw
            .into_iter()
            .skip(skip_count)
            .take(max_depth)
            .map(|frame| frame.into_call_frame(preserve_arguments))
            .collect();

        tracing::debug!(
            requested = limit,
            available,
            skipped = skip_count,
            kept = frames.len(),
            "Captured stack snapshot"
        );

        frames
    }
}

/// Frame source serving a fixed, pre-recorded stack
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedFrameSource {
    frames: Vec<RawFrame>,
}

impl FixedFrameSource {
    /// `frames` must be ordered innermost first
    pub fn new(frames: Vec<RawFrame>) -> Self {
        Self { frames }
    }

    /// Load frames from a JSON array of frame objects
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn frames(&self) -> &[RawFrame] {
        &self.frames
    }
}

impl FrameSource for FixedFrameSource {
    fn capture_raw_frames(&self, limit: usize, with_arguments: bool) -> Vec<RawFrame> {
        self.frames
            .iter()
            .take(limit)
            .cloned()
            .map(|mut frame| {
                if !with_arguments {
                    frame.args = None;
                }
                frame
            })
            .collect()
    }
}
