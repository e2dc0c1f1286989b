//! Call stack capture for tracked requests.
//!
//! # Responsibilities
//! - Capture the stack of the task issuing a request
//! - Skip the tracker's own frames so the stack starts at the caller
//! - Bound the number of recorded frames
//!
//! # Design Decisions
//! - Optional: compiled in with the `stacks` feature
//! - Frames whose symbols cannot be resolved are dropped, not reported
//! - The walk stops once the bound is reached; deeper frames are never
//!   visited or symbolicated

use std::fmt;

/// Default bound on recorded frames per request.
pub const MAX_STACK_FRAMES: usize = 64;

/// One resolved stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}() - {}:{}", self.function, self.file, self.line)
    }
}

/// Symbols belonging to the capture machinery or the tracker itself.
#[cfg_attr(not(feature = "stacks"), allow(dead_code))]
fn is_internal(function: &str) -> bool {
    function.starts_with("backtrace::")
        || function.contains("http_tracker::tracker::")
}

/// Capture the current call stack, innermost caller first.
#[cfg(feature = "stacks")]
pub fn capture(max_frames: usize) -> Vec<StackFrame> {
    walk(max_frames, is_internal).0
}

/// Walk the stack, resolving frames one at a time, until `max_frames` frames
/// past the leading `internal` ones are collected. Also returns how many raw
/// frames were visited.
#[cfg(feature = "stacks")]
fn walk(max_frames: usize, internal: impl Fn(&str) -> bool) -> (Vec<StackFrame>, usize) {
    let mut frames = Vec::with_capacity(max_frames.min(MAX_STACK_FRAMES));
    let mut visited = 0;
    if max_frames == 0 {
        return (frames, visited);
    }

    let mut in_tracker = true;
    backtrace::trace(|frame| {
        visited += 1;
        backtrace::resolve_frame(frame, |symbol| {
            if frames.len() == max_frames {
                return;
            }
            let Some(name) = symbol.name() else {
                return;
            };
            let function = format!("{:#}", name);
            if in_tracker {
                if internal(&function) {
                    return;
                }
                in_tracker = false;
            }
            frames.push(StackFrame {
                function,
                file: symbol
                    .filename()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "??".to_string()),
                line: symbol.lineno().unwrap_or(0),
            });
        });
        frames.len() < max_frames
    });
    (frames, visited)
}

#[cfg(not(feature = "stacks"))]
pub fn capture(_max_frames: usize) -> Vec<StackFrame> {
    Vec::new()
}
