//! # x12-schema
//!
//! Schema model, version registry, and loader for X12 EDI.
//!
//! Definitions describe the allowable shape of segments and envelope
//! nesting for one interchange version. They are immutable once loaded and
//! shared via `Arc`, so a catalog can be consulted concurrently by any
//! number of parses.

pub mod codelist;
pub mod loader;
pub mod model;
pub mod registry;

pub use codelist::CodeList;
pub use loader::SchemaLoader;
pub use model::{
    ChildDef, ChildUse, ComponentUse, CompositeDef, ElementDef, ElementKind, ElementUse,
    InterchangeDef, Requirement, RepeatCount, SegmentDef, SegmentDict, SlotDef, StructureDef,
    StructureKind, Usage,
};
pub use registry::{ConcurrentSchemaRegistry, SchemaRegistry, VersionCatalog};

use thiserror::Error;

/// Errors that can occur when working with schemas
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("No child of {definition} at position {position}")]
    OutOfRange {
        definition: String,
        position: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
