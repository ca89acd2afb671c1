//! Parser state machine
//!
//! A schema-directed descent over the token stream. The machine keeps a
//! stack of open frames, one per open structure (interchange, functional
//! group, transaction set, loop). Each frame tracks a cursor into its
//! definition's declared children and how many times each child has been
//! matched. Structural errors never abort a parse; premature end of input
//! closes every open frame cleanly and returns the partial tree.

use crate::elements::build_segment_node;
use crate::error::{ErrorKind, StructuralError};
use crate::tokenizer::{SegmentTok, Tokenizer};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, trace};
use x12_schema::{ChildDef, InterchangeDef, Requirement, StructureDef};
use x12_tree::{Node, Position, Separators};

/// Parser configuration
#[derive(Debug, Clone, Copy)]
pub struct ParseConfig {
    /// Maximum accumulated structural errors before the parse stops
    /// consuming tokens (0 = unlimited)
    pub max_errors: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self { max_errors: 0 }
    }
}

/// The result of a parse: the constructed tree plus structural findings
#[derive(Debug)]
pub struct ParseOutcome {
    /// Constructed tree (partial if input ended early)
    pub tree: Node,
    /// Structural findings in stream order
    pub errors: Vec<StructuralError>,
}

/// Schema-directed parser
#[derive(Debug, Default)]
pub struct Parser {
    config: ParseConfig,
}

impl Parser {
    /// Create a parser with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with specific configuration.
    pub fn with_config(config: ParseConfig) -> Self {
        Self { config }
    }

    /// Parse a byte stream against a root interchange definition.
    ///
    /// Only a malformed ISA header is fatal; every other problem is
    /// reported in the outcome's error list.
    pub fn parse(&self, data: &[u8], root: &InterchangeDef) -> Result<ParseOutcome> {
        let mut tokenizer = Tokenizer::new(data)?;
        let separators = tokenizer.separators();
        let mut machine = Machine::new(root, separators, self.config);

        for item in tokenizer.by_ref() {
            match item {
                Ok(token) => machine.push(token),
                Err(error) => machine.record(error),
            }
            if machine.at_error_limit() {
                debug!(max_errors = self.config.max_errors, "error limit reached");
                break;
            }
        }

        let end = Position::new(tokenizer.offset(), tokenizer.segment_index());
        Ok(machine.finish(end))
    }
}

struct Frame {
    def: Arc<StructureDef>,
    node: Node,
    cursor: usize,
    counts: Vec<usize>,
}

impl Frame {
    fn open(
        def: Arc<StructureDef>,
        requirement: Requirement,
        separators: Separators,
        position: Position,
    ) -> Self {
        let counts = vec![0; def.children.len()];
        let node = Node::new_structure(Arc::clone(&def), requirement, separators, position);
        Self {
            def,
            node,
            cursor: 0,
            counts,
        }
    }
}

#[derive(Clone, Copy)]
enum Decision {
    /// Place the token as the segment child at this index
    Place(usize),
    /// Push a frame for the structure child at this index and retry
    Open(usize),
    /// The current segment child's repeat count is exhausted
    Overflow(usize),
    /// Nothing at this level accepts the token
    Close,
}

struct Machine<'s> {
    root: &'s InterchangeDef,
    separators: Separators,
    config: ParseConfig,
    stack: Vec<Frame>,
    errors: Vec<StructuralError>,
}

impl<'s> Machine<'s> {
    fn new(root: &'s InterchangeDef, separators: Separators, config: ParseConfig) -> Self {
        let frame = Frame::open(
            Arc::clone(&root.structure),
            Requirement::Mandatory,
            separators,
            Position::new(0, 1),
        );
        Self {
            root,
            separators,
            config,
            stack: vec![frame],
            errors: Vec::new(),
        }
    }

    fn record(&mut self, error: StructuralError) {
        trace!(code = error.kind.code(), %error.position, "structural finding");
        self.errors.push(error);
    }

    fn at_error_limit(&self) -> bool {
        self.config.max_errors > 0 && self.errors.len() >= self.config.max_errors
    }

    fn push(&mut self, token: SegmentTok) {
        if !self.root.dict.contains(&token.id) {
            self.record(
                StructuralError::new(
                    ErrorKind::UnknownSegment,
                    token.position,
                    format!("segment {} is not in the dictionary", token.id),
                )
                .with_definition(token.id.clone()),
            );
            return;
        }

        loop {
            let decision = decide(self.stack.last().expect("root frame"), &token.id);
            match decision {
                Decision::Place(index) => {
                    self.note_skipped(index, token.position);
                    self.place_segment(index, &token);
                    return;
                }
                Decision::Open(index) => {
                    self.note_skipped(index, token.position);
                    self.open_structure(index, token.position);
                }
                Decision::Overflow(_) | Decision::Close => {
                    // Close frames only when some outer level actually
                    // accepts the segment; a wild segment is skipped in
                    // place instead of tearing the open envelopes down.
                    if self.outer_accepts(&token.id) {
                        self.close_top(token.position);
                        continue;
                    }
                    let error = match decision {
                        Decision::Overflow(index) => {
                            let frame = self.stack.last().expect("root frame");
                            let child = &frame.def.children[index];
                            StructuralError::new(
                                ErrorKind::TooManyRepetitions,
                                token.position,
                                format!(
                                    "{} exceeds its repeat count; occurrence dropped",
                                    token.id
                                ),
                            )
                            .with_definition(child.child.id().to_string())
                        }
                        _ => StructuralError::new(
                            ErrorKind::UnexpectedSegment,
                            token.position,
                            format!("no schema slot accepts {} here", token.id),
                        )
                        .with_definition(token.id.clone()),
                    };
                    self.record(error);
                    return;
                }
            }
        }
    }

    fn outer_accepts(&self, id: &str) -> bool {
        let outer = &self.stack[..self.stack.len() - 1];
        outer
            .iter()
            .rev()
            .any(|frame| matches!(decide(frame, id), Decision::Place(_) | Decision::Open(_)))
    }

    /// Emit `MissingMandatory` for unsatisfied mandatory children the
    /// cursor is advancing past, then move the cursor.
    fn note_skipped(&mut self, target: usize, position: Position) {
        let frame = self.stack.last().expect("root frame");
        let mut skipped = Vec::new();
        for index in frame.cursor..target {
            let child = &frame.def.children[index];
            if child.requirement.is_required() && frame.counts[index] == 0 {
                skipped.push(
                    StructuralError::new(
                        ErrorKind::MissingMandatory,
                        position,
                        format!(
                            "required {} absent in {}",
                            child.child.id(),
                            frame.def.id
                        ),
                    )
                    .with_definition(child.child.id().to_string()),
                );
            }
        }
        for error in skipped {
            self.record(error);
        }
        self.stack.last_mut().expect("root frame").cursor = target;
    }

    fn place_segment(&mut self, index: usize, token: &SegmentTok) {
        let separators = self.separators;
        let frame = self.stack.last_mut().expect("root frame");
        let ChildDef::Segment(def) = &frame.def.children[index].child else {
            unreachable!("decision placed a non-segment child");
        };
        let requirement = frame.def.children[index].requirement;
        frame.counts[index] += 1;
        trace!(segment = %token.id, parent = %frame.def.id, "placing segment");

        let def = Arc::clone(def);
        let node = build_segment_node(&def, requirement, token, separators, &mut self.errors);
        self.stack
            .last_mut()
            .expect("root frame")
            .node
            .children
            .push(node);
    }

    fn open_structure(&mut self, index: usize, position: Position) {
        let frame = self.stack.last_mut().expect("root frame");
        let ChildDef::Structure(def) = &frame.def.children[index].child else {
            unreachable!("decision opened a non-structure child");
        };
        let def = Arc::clone(def);
        let requirement = frame.def.children[index].requirement;
        frame.counts[index] += 1;
        debug!(structure = %def.id, parent = %frame.def.id, "opening structure");

        self.stack
            .push(Frame::open(def, requirement, self.separators, position));
    }

    fn close_top(&mut self, position: Position) {
        let frame = self.stack.pop().expect("closing with empty stack");
        debug!(structure = %frame.def.id, "closing structure");
        self.note_unsatisfied(&frame, position);
        self.stack
            .last_mut()
            .expect("root frame outlives children")
            .node
            .children
            .push(frame.node);
    }

    fn note_unsatisfied(&mut self, frame: &Frame, position: Position) {
        for index in frame.cursor..frame.def.children.len() {
            let child = &frame.def.children[index];
            if child.requirement.is_required() && frame.counts[index] == 0 {
                self.record(
                    StructuralError::new(
                        ErrorKind::MissingMandatory,
                        position,
                        format!(
                            "required {} absent when {} closed",
                            child.child.id(),
                            frame.def.id
                        ),
                    )
                    .with_definition(child.child.id().to_string()),
                );
            }
        }
    }

    fn finish(mut self, end: Position) -> ParseOutcome {
        while self.stack.len() > 1 {
            self.close_top(end);
        }
        let root = self.stack.pop().expect("root frame");
        self.note_unsatisfied(&root, end);
        ParseOutcome {
            tree: root.node,
            errors: self.errors,
        }
    }
}

/// Placement rules, in declaration order from the frame's cursor.
///
/// Earlier-declared children win ties; a structure child is re-opened
/// (continuation) as long as its repeat count allows, otherwise scanning
/// proceeds toward the children that would close it.
fn decide(frame: &Frame, id: &str) -> Decision {
    let mut overflow = None;
    for index in frame.cursor..frame.def.children.len() {
        let child = &frame.def.children[index];
        match &child.child {
            ChildDef::Segment(def) if def.id == id => {
                if child.repeat.allows(frame.counts[index]) {
                    return Decision::Place(index);
                }
                if index == frame.cursor && frame.counts[index] > 0 {
                    overflow.get_or_insert(index);
                }
            }
            ChildDef::Structure(def) if def.opens_with(id) => {
                if child.repeat.allows(frame.counts[index]) {
                    return Decision::Open(index);
                }
            }
            _ => {}
        }
    }
    match overflow {
        Some(index) => Decision::Overflow(index),
        None => Decision::Close,
    }
}
