//! Constructed value tree
//!
//! A uniform node shape for every envelope level: interchange, functional
//! group, transaction set, loop, and segment. Structural nodes carry child
//! nodes; segment nodes carry element slots. Nodes are immutable:
//! `copy` returns a new node with the listed fields replaced.

use crate::position::Position;
use crate::separators::Separators;
use crate::value::ElementValue;
use crate::{Error, Result};
use std::sync::Arc;
use x12_schema::{CompositeDef, Requirement, SegmentDef, StructureDef};

/// The schema definition a node was constructed against
#[derive(Debug, Clone)]
pub enum NodeDef {
    /// A segment definition
    Segment(Arc<SegmentDef>),
    /// A structure definition (interchange, group, transaction set, loop)
    Structure(Arc<StructureDef>),
}

impl NodeDef {
    /// Identity of the underlying definition.
    pub fn id(&self) -> &str {
        match self {
            NodeDef::Segment(def) => &def.id,
            NodeDef::Structure(def) => &def.id,
        }
    }
}

/// One element position of a segment node
#[derive(Debug, Clone)]
pub enum ElementSlot {
    /// Nothing at this position (absent trailing element or NotUsed slot)
    Absent,
    /// A simple element value
    Value(ElementValue),
    /// A composite value with ordered components
    Composite(CompositeValue),
    /// A repeated element; entries are `Value` or `Composite`
    Repeated(Vec<ElementSlot>),
}

impl ElementSlot {
    /// The simple value at this slot, if any.
    pub fn value(&self) -> Option<&ElementValue> {
        match self {
            ElementSlot::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The composite value at this slot, if any.
    pub fn composite(&self) -> Option<&CompositeValue> {
        match self {
            ElementSlot::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    /// The repetition list at this slot, if any.
    pub fn repetitions(&self) -> Option<&[ElementSlot]> {
        match self {
            ElementSlot::Repeated(slots) => Some(slots),
            _ => None,
        }
    }

    /// Whether nothing would be written for this slot.
    pub fn is_blank(&self) -> bool {
        match self {
            ElementSlot::Absent => true,
            ElementSlot::Value(value) => value.is_empty(),
            ElementSlot::Composite(composite) => {
                composite.components.iter().all(ElementValue::is_empty)
            }
            ElementSlot::Repeated(slots) => slots.iter().all(ElementSlot::is_blank),
        }
    }
}

/// A composite element value
#[derive(Debug, Clone)]
pub struct CompositeValue {
    /// The composite definition
    pub definition: Arc<CompositeDef>,
    /// Source position of the composite
    pub position: Position,
    /// Ordered component values
    pub components: Vec<ElementValue>,
}

impl CompositeValue {
    /// Create a composite value.
    pub fn new(
        definition: Arc<CompositeDef>,
        position: Position,
        components: Vec<ElementValue>,
    ) -> Self {
        Self {
            definition,
            position,
            components,
        }
    }

    /// Component value at a 1-indexed position.
    pub fn component(&self, position: usize) -> Result<&ElementValue> {
        position
            .checked_sub(1)
            .and_then(|i| self.components.get(i))
            .ok_or_else(|| Error::SlotOutOfRange {
                definition: self.definition.id.clone(),
                position,
            })
    }
}

/// Replacement fields for [`Node::copy`]
#[derive(Debug, Clone, Default)]
pub struct NodeChanges {
    /// Replace the separators handle
    pub separators: Option<Separators>,
    /// Replace the position
    pub position: Option<Position>,
    /// Replace the requirement
    pub requirement: Option<Requirement>,
    /// Replace the structural children
    pub children: Option<Vec<Node>>,
    /// Replace the element slots
    pub elements: Option<Vec<ElementSlot>>,
}

/// A node of the constructed tree
#[derive(Debug, Clone)]
pub struct Node {
    /// Schema definition this node was constructed against
    pub definition: NodeDef,
    /// Requirement at the position the node was placed
    pub requirement: Requirement,
    /// Delimiters in force for this node's interchange
    pub separators: Separators,
    /// Source position
    pub position: Position,
    /// Structural children (empty for segment nodes)
    pub children: Vec<Node>,
    /// Element slots (empty for structural nodes)
    pub elements: Vec<ElementSlot>,
}

impl Node {
    /// Create a structural node without children.
    pub fn new_structure(
        definition: Arc<StructureDef>,
        requirement: Requirement,
        separators: Separators,
        position: Position,
    ) -> Self {
        Self {
            definition: NodeDef::Structure(definition),
            requirement,
            separators,
            position,
            children: Vec::new(),
            elements: Vec::new(),
        }
    }

    /// Create a segment node with its element slots.
    pub fn new_segment(
        definition: Arc<SegmentDef>,
        requirement: Requirement,
        separators: Separators,
        position: Position,
        elements: Vec<ElementSlot>,
    ) -> Self {
        Self {
            definition: NodeDef::Segment(definition),
            requirement,
            separators,
            position,
            children: Vec::new(),
            elements,
        }
    }

    /// Identity of the node's definition.
    pub fn id(&self) -> &str {
        self.definition.id()
    }

    /// Whether this node is a segment.
    pub fn is_segment(&self) -> bool {
        matches!(self.definition, NodeDef::Segment(_))
    }

    /// Structural children.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Element slot at a 1-indexed position.
    pub fn element(&self, position: usize) -> Result<&ElementSlot> {
        position
            .checked_sub(1)
            .and_then(|i| self.elements.get(i))
            .ok_or_else(|| Error::SlotOutOfRange {
                definition: self.id().to_string(),
                position,
            })
    }

    /// The `occurrence`-th (1-indexed) descendant segment with this id,
    /// in document order.
    pub fn segment(&self, id: &str, occurrence: usize) -> Option<&Node> {
        if occurrence == 0 {
            return None;
        }
        let mut remaining = occurrence;
        self.find_segment_inner(id, &mut remaining)
    }

    fn find_segment_inner<'a>(&'a self, id: &str, remaining: &mut usize) -> Option<&'a Node> {
        if self.is_segment() && self.id() == id {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                return Some(self);
            }
        }
        for child in &self.children {
            if let Some(found) = child.find_segment_inner(id, remaining) {
                return Some(found);
            }
        }
        None
    }

    /// Pure functional update: a copy with the listed fields replaced.
    #[must_use]
    pub fn copy(&self, changes: NodeChanges) -> Self {
        Self {
            definition: self.definition.clone(),
            requirement: changes.requirement.unwrap_or(self.requirement),
            separators: changes.separators.unwrap_or(self.separators),
            position: changes.position.unwrap_or(self.position),
            children: changes.children.unwrap_or_else(|| self.children.clone()),
            elements: changes.elements.unwrap_or_else(|| self.elements.clone()),
        }
    }

    /// Navigate to a descendant by path (e.g. `"PO/850[0]/BEG"`).
    pub fn at(&self, path: &str) -> Result<&Node> {
        let cursor = crate::traversal::Cursor::new(self).navigate(path)?;
        Ok(cursor.node())
    }
}
