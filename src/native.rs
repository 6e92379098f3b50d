//! Live Rust call stack capture via the `backtrace` crate

use backtrace::Symbol;

use crate::frame::{CallOperator, RawFrame};
use crate::shadow;
use crate::snapshot::FrameSource;

const CRATE_PATH_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");
const BACKTRACE_PATH_PREFIX: &str = "backtrace::";

/// Frame source reading the native stack of the calling thread.
///
/// Leading frames whose symbol path belongs to one of the hidden prefixes
/// (the `backtrace` crate and this crate by default) are dropped before the
/// limit applies, so a capture starts at the code that asked for it.
///
/// The native stack holds no argument values. For argument-preserving
/// captures they are copied from the thread's [shadow stack](crate::shadow)
/// onto the matching native frames.
#[derive(Debug, Clone)]
pub struct NativeFrameSource {
    hidden_prefixes: Vec<String>,
}

impl Default for NativeFrameSource {
    fn default() -> Self {
        Self {
            hidden_prefixes: vec![
                BACKTRACE_PATH_PREFIX.to_string(),
                CRATE_PATH_PREFIX.to_string(),
            ],
        }
    }
}

impl NativeFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also hide leading frames under `prefix`, e.g. `"my_host::debug::"`
    /// for a host's own wrapper around the logger.
    pub fn hide_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.hidden_prefixes.push(prefix.into());
        self
    }

    fn is_hidden(&self, symbol_path: &str) -> bool {
        let qualifier = qualified_self(symbol_path);
        self.hidden_prefixes.iter().any(|prefix| {
            let prefix = prefix.as_str();
            symbol_path.starts_with(prefix)
                || qualifier.is_some_and(|(self_ty, trait_path)| {
                    self_ty.starts_with(prefix)
                        || trait_path.is_some_and(|t| t.starts_with(prefix))
                })
        })
    }
}

impl FrameSource for NativeFrameSource {
    fn capture_raw_frames(&self, limit: usize, with_arguments: bool) -> Vec<RawFrame> {
        let mut frames = Vec::new();
        if limit == 0 {
            return frames;
        }

        let mut leading = true;
        backtrace::trace(|frame| {
            // One physical frame resolves to several logical ones when
            // calls were inlined; they arrive innermost first.
            let mut resolved: Vec<(Option<String>, RawFrame)> = Vec::new();
            backtrace::resolve_frame(frame, |symbol| resolved.push(raw_from_symbol(symbol)));
            if resolved.is_empty() {
                resolved.push((None, RawFrame::default()));
            }

            for (path, raw) in resolved {
                if leading && path.as_deref().is_some_and(|p| self.is_hidden(p)) {
                    continue;
                }
                leading = false;
                frames.push(raw);
                if frames.len() >= limit {
                    return false;
                }
            }
            true
        });

        if with_arguments {
            shadow::attach_arguments(&mut frames);
        }
        frames
    }
}

fn raw_from_symbol(symbol: &Symbol) -> (Option<String>, RawFrame) {
    // `{:#}` drops the trailing hash from the demangled path
    let path = symbol.name().map(|name| format!("{name:#}"));
    let raw = raw_from_path(
        path.as_deref(),
        symbol.filename().map(|p| p.display().to_string()),
        symbol.lineno(),
    );
    (path, raw)
}

fn raw_from_path(path: Option<&str>, file: Option<String>, line: Option<u32>) -> RawFrame {
    let mut raw = RawFrame {
        file,
        line,
        ..RawFrame::default()
    };

    if let Some(path) = path {
        let (owner, function) = decompose_symbol_path(path);
        if let Some(owner) = owner {
            raw.owner_type = Some(owner.to_string());
            raw.operator = Some(CallOperator::Static);
        }
        raw.function = Some(function);
    }

    raw
}

/// Split a demangled path into its owning type, if any, and function name.
///
/// Turbofish segments (`::<T>`) are dropped and closures stay attached to
/// the function defining them (`main::{{closure}}`). The module path of a
/// free function is not an owner; a segment counts as a type when it is a
/// `<...>` qualifier or starts with an uppercase letter.
pub(crate) fn decompose_symbol_path(path: &str) -> (Option<&str>, String) {
    let mut rest = path;
    let mut inner: Option<String> = None;

    loop {
        let Some((head, last)) = split_symbol_path(rest) else {
            return (None, join_segments(rest, inner));
        };
        if last.starts_with('<') {
            rest = head;
            continue;
        }

        let name = join_segments(last, inner);
        if is_closure_segment(last) {
            inner = Some(name);
            rest = head;
            continue;
        }

        let owner = is_type_path(head).then_some(head);
        return (owner, name);
    }
}

fn join_segments(segment: &str, inner: Option<String>) -> String {
    match inner {
        Some(inner) => format!("{segment}::{inner}"),
        None => segment.to_string(),
    }
}

fn is_closure_segment(segment: &str) -> bool {
    segment == "{{closure}}" || segment.starts_with("{closure#")
}

fn is_type_path(path: &str) -> bool {
    let last = split_symbol_path(path).map_or(path, |(_, last)| last);
    last.starts_with('<') || last.starts_with(|c: char| c.is_ascii_uppercase())
}

/// Split a demangled path at its last `::` outside generic brackets.
///
/// `<app::Store as core::ops::Drop>::drop` splits into
/// `<app::Store as core::ops::Drop>` and `drop`.
pub(crate) fn split_symbol_path(path: &str) -> Option<(&str, &str)> {
    let bytes = path.as_bytes();
    let mut depth = 0usize;
    let mut split = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            // `->` inside a fn pointer type is not a closing bracket
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                split = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    split.map(|at| (&path[..at], &path[at + 2..]))
}

/// Self type and trait path of the `<Type as Trait>` qualifier that starts
/// a path, if any
fn qualified_self(path: &str) -> Option<(&str, Option<&str>)> {
    if !path.starts_with('<') {
        return None;
    }

    let bytes = path.as_bytes();
    let mut depth = 0usize;
    let mut as_at = None;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let self_ty = &path[1..as_at.unwrap_or(i)];
                    let trait_path = as_at.map(|at| &path[at + 4..i]);
                    return Some((strip_reference(self_ty), trait_path));
                }
            }
            b' ' if depth == 1 && as_at.is_none() && path[i..].starts_with(" as ") => {
                as_at = Some(i);
            }
            _ => {}
        }
    }
    None
}

fn strip_reference(ty: &str) -> &str {
    let ty = ty.trim_start_matches('&');
    let ty = ty.strip_prefix("mut ").unwrap_or(ty);
    ty.strip_prefix("dyn ").unwrap_or(ty)
}
