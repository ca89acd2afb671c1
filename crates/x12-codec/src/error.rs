//! Structural error reporting
//!
//! Structural findings never abort a parse; they accumulate in stream
//! order alongside the partial tree. Element-level coercion failures are
//! not reported here; they stay local as `Invalid` values inside the
//! tree.

use std::fmt;
use x12_tree::Position;

/// What kind of structural problem was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Segment id malformed or not in the version's dictionary
    UnknownSegment,
    /// Valid id, but no schema slot accepts it here
    UnexpectedSegment,
    /// Required child absent when its parent closed
    MissingMandatory,
    /// Required element absent from a placed segment
    MissingMandatoryElement,
    /// Occurrence count exceeded the declared repeat count
    TooManyRepetitions,
    /// Content found at an undeclared or not-used element position
    ExtraElement,
    /// Envelope control numbers or counts disagree
    ControlMismatch,
}

impl ErrorKind {
    /// Stable code for reports and logs.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::UnknownSegment => "UNKNOWN_SEGMENT",
            ErrorKind::UnexpectedSegment => "UNEXPECTED_SEGMENT",
            ErrorKind::MissingMandatory => "MISSING_MANDATORY",
            ErrorKind::MissingMandatoryElement => "MISSING_MANDATORY_ELEMENT",
            ErrorKind::TooManyRepetitions => "TOO_MANY_REPETITIONS",
            ErrorKind::ExtraElement => "EXTRA_ELEMENT",
            ErrorKind::ControlMismatch => "CONTROL_MISMATCH",
        }
    }
}

/// A located structural finding
#[derive(Debug, Clone)]
pub struct StructuralError {
    /// Finding kind
    pub kind: ErrorKind,
    /// Where in the stream the finding anchors
    pub position: Position,
    /// Identity of the definition involved, when known
    pub definition: Option<String>,
    /// Human-readable message
    pub message: String,
}

impl StructuralError {
    /// Create a new structural finding.
    pub fn new(kind: ErrorKind, position: Position, message: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            definition: None,
            message: message.into(),
        }
    }

    /// Attach the involved definition's identity.
    #[must_use]
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.kind.code(), self.message, self.position)
    }
}
