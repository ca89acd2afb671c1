#![deny(rust_2018_idioms)]
#![warn(clippy::all)]

//! # x12-tree
//!
//! Separators, typed element values, and the constructed value tree for
//! X12 EDI.
//!
//! The tree is schema-aware: every node carries the definition it was
//! constructed against, the delimiters in force, and its source position.
//! Once built, a tree is immutable and may be shared across threads.

/// Uniform tree nodes, element slots, and functional update.
pub mod node;
/// Source positions attached to every value.
pub mod position;
/// The five X12 delimiters and ISA-header recovery.
pub mod separators;
/// Cursor navigation for drilling into trees.
pub mod traversal;
/// Three-state typed element values and decimal arithmetic.
pub mod value;

/// Node primitives for tree structure.
pub use node::{CompositeValue, ElementSlot, Node, NodeChanges, NodeDef};
/// Position quadruple for error reporting.
pub use position::Position;
/// Delimiter tuple and recovery errors.
pub use separators::{SeparatorError, Separators};
/// Cursor entry point for path navigation.
pub use traversal::Cursor;
/// Typed element values.
pub use value::{DateValue, ElementValue, TimeValue, ToDecimal};

use thiserror::Error;

/// Errors that can occur when working with the tree
#[derive(Error, Debug)]
pub enum Error {
    #[error("Node not found at path: {path}")]
    NodeNotFound { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("No element of {definition} at position {position}")]
    SlotOutOfRange {
        definition: String,
        position: usize,
    },
}

impl Error {
    /// Build a node-not-found error with path context.
    pub fn node_not_found(path: impl Into<String>) -> Self {
        Self::NodeNotFound { path: path.into() }
    }

    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-local result type for tree operations.
pub type Result<T> = std::result::Result<T, Error>;
