#![deny(rust_2018_idioms)]
#![warn(clippy::all)]

//! # x12-codec
//!
//! Tokenizer, schema-directed parser, and writer for X12 EDI.
//!
//! Bytes go in one side: the tokenizer recovers the delimiter hierarchy
//! from the ISA header and yields segment tokens; the state machine drives
//! a schema-directed descent producing a typed value tree plus a list of
//! precisely-located structural errors. The writer is the inverse. Only a
//! malformed ISA header is fatal; everything else is reported and parsing
//! continues.

mod elements;
/// Typed envelope views, control-number checks, separator replacement.
pub mod envelopes;
/// Structural error kinds and findings.
pub mod error;
/// Parser state machine and configuration.
pub mod machine;
/// Byte-level reading primitives.
pub mod syntax;
/// Lazy byte-stream to segment-token iterator.
pub mod tokenizer;
/// Constructed tree to wire bytes.
pub mod writer;

pub use envelopes::{
    parse_gs, parse_isa, parse_st, replace_separators, validate_interchange, GsSegment,
    IsaSegment, StSegment,
};
pub use error::{ErrorKind, StructuralError};
pub use machine::{ParseConfig, ParseOutcome, Parser};
pub use tokenizer::{ElementTok, SegmentTok, Tokenizer};
pub use writer::{Writer, WriterConfig};

use thiserror::Error as ThisError;
use x12_schema::InterchangeDef;
use x12_tree::{Node, SeparatorError};

/// Errors that abort codec operations
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("Malformed interchange header: {0}")]
    MalformedHeader(#[from] SeparatorError),

    #[error("Envelope error: {0}")]
    Envelope(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parse a byte stream against an interchange definition.
///
/// Returns the constructed tree and the structural errors found, in
/// stream order. Only a malformed ISA header is `Err`.
pub fn parse(data: &[u8], root: &InterchangeDef) -> Result<ParseOutcome> {
    Parser::new().parse(data, root)
}

/// Render a constructed tree to wire bytes under its own separators.
pub fn write(tree: &Node) -> Vec<u8> {
    Writer::new().write(tree)
}
