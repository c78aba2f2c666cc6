//! Call-site traces attached to recorded failures and errors
//!
//! Frames are captured with `#[track_caller]` at the assertion or condition
//! call site, so a trace points at the fixture code rather than at the
//! framework. Filtering drops any frame that does resolve to a framework
//! source file, and the innermost surviving frame is annotated with the
//! owning class's short name for display.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;

/// One source location in a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub file: String,
    pub line: u32,
    /// Display label, e.g. `test_push(StackTest)`.
    pub label: Option<String>,
}

impl Frame {
    /// Capture the caller's source location.
    #[track_caller]
    pub fn here() -> Frame {
        let loc = Location::caller();
        Frame {
            file: loc.file().to_string(),
            line: loc.line(),
            label: None,
        }
    }

    /// A frame with no real source location, carrying only a label.
    /// Used for the synthesized test-method frame.
    pub fn synthetic(label: impl Into<String>) -> Frame {
        Frame {
            file: "<test>".to_string(),
            line: 0,
            label: Some(label.into()),
        }
    }

    fn is_framework_frame(&self) -> bool {
        let normalized = self.file.replace('\\', "/");
        normalized.contains("argus-unit/src/")
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}:{}:in `{}`", self.file, self.line, label),
            None => write!(f, "{}:{}", self.file, self.line),
        }
    }
}

/// Ordered sequence of frames, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    frames: Vec<Frame>,
}

impl Trace {
    pub fn new(frames: Vec<Frame>) -> Trace {
        Trace { frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Drop frames that point into the framework's own sources.
    pub fn filtered(&self) -> Trace {
        Trace {
            frames: self
                .frames
                .iter()
                .filter(|f| !f.is_framework_frame())
                .cloned()
                .collect(),
        }
    }

    /// Annotate the innermost frame with the owning class's short name.
    pub fn annotate_innermost(&mut self, short_name: &str) {
        if let Some(frame) = self.frames.first_mut() {
            frame.label = Some(match frame.label.take() {
                Some(existing) => format!("{}({})", existing, short_name),
                None => short_name.to_string(),
            });
        }
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "    {}", frame)?;
        }
        Ok(())
    }
}
