//! Schema model definitions
//!
//! Immutable descriptions of the X12 grammar: elements, composites,
//! segments, and the nested envelope structures (loops, transaction sets,
//! functional groups, interchanges). Definitions are built once at catalog
//! load and shared via `Arc`.

use crate::codelist::CodeList;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// The value domain of a simple element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Identifier code (optionally constrained by a code list)
    Id,
    /// Alphanumeric string (AN)
    Text,
    /// Fixed numeric with implied decimal places (N0..N9)
    Numeric {
        /// Implied decimal places
        precision: u8,
    },
    /// Real number with explicit decimal point (R)
    Decimal,
    /// Date, CCYYMMDD or YYMMDD (DT)
    Date,
    /// Time, HHMM with optional seconds and centiseconds (TM)
    Time,
}

impl ElementKind {
    /// Whether values of this kind participate in decimal arithmetic.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ElementKind::Numeric { .. } | ElementKind::Decimal)
    }
}

/// Definition of a simple data element
#[derive(Debug, Clone)]
pub struct ElementDef {
    /// Element identity (e.g. "E67", "I12")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Minimum rendered length
    pub min_length: usize,
    /// Maximum rendered length
    pub max_length: usize,
    /// Value domain
    pub kind: ElementKind,
    /// Allowed codes for `Id` elements, when enumerated
    pub code_list: Option<Arc<CodeList>>,
}

impl ElementDef {
    /// Create an element definition with 1..=35 length bounds.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            min_length: 1,
            max_length: 35,
            kind,
            code_list: None,
        }
    }

    /// Set length bounds
    #[must_use]
    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    /// Attach a code list
    #[must_use]
    pub fn with_code_list(mut self, list: Arc<CodeList>) -> Self {
        self.code_list = Some(list);
        self
    }

    /// Check construction invariants.
    pub fn validate(&self) -> Result<()> {
        if self.min_length > self.max_length {
            return Err(Error::InvalidSchema(format!(
                "element {}: min_length {} exceeds max_length {}",
                self.id, self.min_length, self.max_length
            )));
        }
        if let ElementKind::Numeric { precision } = self.kind {
            if usize::from(precision) > self.max_length {
                return Err(Error::InvalidSchema(format!(
                    "element {}: precision {} exceeds max_length {}",
                    self.id, precision, self.max_length
                )));
            }
        }
        Ok(())
    }
}

/// A component slot inside a composite definition
#[derive(Debug, Clone)]
pub struct ComponentUse {
    /// Component element definition
    pub definition: Arc<ElementDef>,
    /// Requirement at this component position
    pub requirement: Requirement,
}

impl ComponentUse {
    /// Create an optional component use.
    pub fn new(definition: Arc<ElementDef>) -> Self {
        Self {
            definition,
            requirement: Requirement::Optional,
        }
    }

    /// Set mandatory/optional
    #[must_use]
    pub fn mandatory(mut self, flag: bool) -> Self {
        self.requirement = if flag {
            Requirement::Mandatory
        } else {
            Requirement::Optional
        };
        self
    }

    /// Set the full requirement
    #[must_use]
    pub fn require(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }
}

/// Definition of a composite element
#[derive(Debug, Clone)]
pub struct CompositeDef {
    /// Composite identity (e.g. "C001")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Ordered component slots, positions 1-indexed and dense
    pub components: Vec<ComponentUse>,
}

impl CompositeDef {
    /// Create an empty composite definition.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            components: Vec::new(),
        }
    }

    /// Set components
    #[must_use]
    pub fn with_components(mut self, components: Vec<ComponentUse>) -> Self {
        self.components = components;
        self
    }

    /// Component use at a 1-indexed position.
    pub fn component_at(&self, position: usize) -> Result<&ComponentUse> {
        position
            .checked_sub(1)
            .and_then(|i| self.components.get(i))
            .ok_or_else(|| Error::OutOfRange {
                definition: self.id.clone(),
                position,
            })
    }

    /// Check construction invariants of the composite and its components.
    pub fn validate(&self) -> Result<()> {
        if self.components.is_empty() {
            return Err(Error::InvalidSchema(format!(
                "composite {}: no components declared",
                self.id
            )));
        }
        for component in &self.components {
            component.definition.validate()?;
        }
        Ok(())
    }
}

/// The definition bound at an element position: simple or composite.
#[derive(Debug, Clone)]
pub enum SlotDef {
    /// A simple element
    Simple(Arc<ElementDef>),
    /// A composite element
    Composite(Arc<CompositeDef>),
}

impl SlotDef {
    /// Identity of the bound definition.
    pub fn id(&self) -> &str {
        match self {
            SlotDef::Simple(def) => &def.id,
            SlotDef::Composite(def) => &def.id,
        }
    }
}

/// An element position within a segment definition
#[derive(Debug, Clone)]
pub struct ElementUse {
    /// Bound definition
    pub slot: SlotDef,
    /// Requirement at this position
    pub requirement: Requirement,
    /// Allowed repetitions
    pub repeat: RepeatCount,
}

impl ElementUse {
    /// Bind a simple element, optional, single occurrence.
    pub fn simple(definition: Arc<ElementDef>) -> Self {
        Self {
            slot: SlotDef::Simple(definition),
            requirement: Requirement::Optional,
            repeat: RepeatCount::bounded(1),
        }
    }

    /// Bind a composite element, optional, single occurrence.
    pub fn composite(definition: Arc<CompositeDef>) -> Self {
        Self {
            slot: SlotDef::Composite(definition),
            requirement: Requirement::Optional,
            repeat: RepeatCount::bounded(1),
        }
    }

    /// Set mandatory/optional
    #[must_use]
    pub fn mandatory(mut self, flag: bool) -> Self {
        self.requirement = if flag {
            Requirement::Mandatory
        } else {
            Requirement::Optional
        };
        self
    }

    /// Set the full requirement
    #[must_use]
    pub fn require(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    /// Set the repeat count
    #[must_use]
    pub fn repeat(mut self, repeat: RepeatCount) -> Self {
        self.repeat = repeat;
        self
    }
}

/// Definition of a segment
#[derive(Debug, Clone)]
pub struct SegmentDef {
    /// Segment identity, 2 or 3 uppercase alphanumerics (e.g. "ISA", "TDS")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Purpose text from the standard
    pub purpose: String,
    /// Ordered element uses, positions 1-indexed and dense
    pub elements: Vec<ElementUse>,
}

impl SegmentDef {
    /// Create a segment definition without elements.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            purpose: String::new(),
            elements: Vec::new(),
        }
    }

    /// Set the name
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the purpose text
    #[must_use]
    pub fn purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    /// Set element uses
    #[must_use]
    pub fn with_elements(mut self, elements: Vec<ElementUse>) -> Self {
        self.elements = elements;
        self
    }

    /// Element use at a 1-indexed position.
    pub fn element_at(&self, position: usize) -> Result<&ElementUse> {
        position
            .checked_sub(1)
            .and_then(|i| self.elements.get(i))
            .ok_or_else(|| Error::OutOfRange {
                definition: self.id.clone(),
                position,
            })
    }

    /// Check construction invariants of the segment and everything it binds.
    pub fn validate(&self) -> Result<()> {
        if !is_segment_id(&self.id) {
            return Err(Error::InvalidSchema(format!(
                "segment id '{}' is not 2-3 uppercase alphanumerics",
                self.id
            )));
        }
        for element_use in &self.elements {
            match &element_use.slot {
                SlotDef::Simple(def) => def.validate()?,
                SlotDef::Composite(def) => def.validate()?,
            }
            element_use.repeat.validate(self.id.as_str())?;
        }
        Ok(())
    }
}

/// Whether a string is a well-formed segment identifier.
pub fn is_segment_id(id: &str) -> bool {
    (2..=3).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Requirement of a definition at a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requirement {
    /// Must appear at least once
    Mandatory,
    /// May be absent
    #[default]
    Optional,
    /// Presence depends on sibling content; structurally optional
    Relational,
    /// Must not carry content
    NotUsed,
}

impl Requirement {
    /// True for `Mandatory`.
    pub fn is_required(&self) -> bool {
        matches!(self, Requirement::Mandatory)
    }

    /// True for `Optional` and `Relational`.
    pub fn is_optional(&self) -> bool {
        matches!(self, Requirement::Optional | Requirement::Relational)
    }

    /// True for `NotUsed`.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Requirement::NotUsed)
    }
}

/// Allowed occurrence count for a child or element use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatCount {
    /// At most `n` occurrences
    Bounded(u32),
    /// No upper bound
    Unbounded,
}

impl RepeatCount {
    /// Bounded repeat count.
    pub fn bounded(n: u32) -> Self {
        RepeatCount::Bounded(n)
    }

    /// Unbounded repeat count.
    pub fn unbounded() -> Self {
        RepeatCount::Unbounded
    }

    /// Whether one more occurrence is allowed after `current` have been seen.
    pub fn allows(&self, current: usize) -> bool {
        match self {
            RepeatCount::Bounded(n) => current < *n as usize,
            RepeatCount::Unbounded => true,
        }
    }

    /// Upper bound, if any.
    pub fn max(&self) -> Option<u32> {
        match self {
            RepeatCount::Bounded(n) => Some(*n),
            RepeatCount::Unbounded => None,
        }
    }

    fn validate(&self, owner: &str) -> Result<()> {
        if matches!(self, RepeatCount::Bounded(0)) {
            return Err(Error::InvalidSchema(format!(
                "{owner}: repeat count bounded(0) declared; use NotUsed instead"
            )));
        }
        Ok(())
    }
}

/// The level a structure definition describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    /// ISA..IEA envelope
    Interchange,
    /// GS..GE envelope
    FunctionalGroup,
    /// ST..SE envelope
    TransactionSet,
    /// A nested loop within a transaction set
    Loop,
}

/// A child position within a structure definition
#[derive(Debug, Clone)]
pub struct ChildUse {
    /// Bound child definition
    pub child: ChildDef,
    /// Requirement at this position
    pub requirement: Requirement,
    /// Allowed repetitions
    pub repeat: RepeatCount,
}

/// The definition bound at a structure child position.
#[derive(Debug, Clone)]
pub enum ChildDef {
    /// A segment child
    Segment(Arc<SegmentDef>),
    /// A nested structure (loop, transaction set, functional group)
    Structure(Arc<StructureDef>),
}

impl ChildDef {
    /// Identity of the bound definition.
    pub fn id(&self) -> &str {
        match self {
            ChildDef::Segment(def) => &def.id,
            ChildDef::Structure(def) => &def.id,
        }
    }
}

impl ChildUse {
    /// Bind a segment child, optional, single occurrence.
    pub fn segment(definition: Arc<SegmentDef>) -> Self {
        Self {
            child: ChildDef::Segment(definition),
            requirement: Requirement::Optional,
            repeat: RepeatCount::bounded(1),
        }
    }

    /// Bind a structure child, optional, single occurrence.
    pub fn structure(definition: Arc<StructureDef>) -> Self {
        Self {
            child: ChildDef::Structure(definition),
            requirement: Requirement::Optional,
            repeat: RepeatCount::bounded(1),
        }
    }

    /// Set mandatory/optional
    #[must_use]
    pub fn mandatory(mut self, flag: bool) -> Self {
        self.requirement = if flag {
            Requirement::Mandatory
        } else {
            Requirement::Optional
        };
        self
    }

    /// Set the repeat count
    #[must_use]
    pub fn repeat(mut self, repeat: RepeatCount) -> Self {
        self.repeat = repeat;
        self
    }
}

/// Ordered structure of permitted children at one nesting level
#[derive(Debug, Clone)]
pub struct StructureDef {
    /// Level this structure describes
    pub kind: StructureKind,
    /// Identity (loop id, transaction set code, functional group code, version)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Ordered child uses, positions 1-indexed and dense
    pub children: Vec<ChildUse>,
}

impl StructureDef {
    /// Create a structure definition without children.
    pub fn new(kind: StructureKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: String::new(),
            children: Vec::new(),
        }
    }

    /// Set the name
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set child uses
    #[must_use]
    pub fn with_children(mut self, children: Vec<ChildUse>) -> Self {
        self.children = children;
        self
    }

    /// Child use at a 1-indexed position.
    pub fn child_at(&self, position: usize) -> Result<&ChildUse> {
        position
            .checked_sub(1)
            .and_then(|i| self.children.get(i))
            .ok_or_else(|| Error::OutOfRange {
                definition: self.id.clone(),
                position,
            })
    }

    /// Whether a segment with this id can open the structure.
    ///
    /// Scans leading children until the first mandatory one (inclusive);
    /// nested structures are entered recursively.
    pub fn opens_with(&self, segment_id: &str) -> bool {
        for child_use in &self.children {
            let matched = match &child_use.child {
                ChildDef::Segment(def) => def.id == segment_id,
                ChildDef::Structure(def) => def.opens_with(segment_id),
            };
            if matched {
                return true;
            }
            if child_use.requirement.is_required() {
                return false;
            }
        }
        false
    }

    /// Check construction invariants recursively.
    pub fn validate(&self) -> Result<()> {
        if self.children.is_empty() {
            return Err(Error::InvalidSchema(format!(
                "structure {}: no children declared",
                self.id
            )));
        }
        for child_use in &self.children {
            match &child_use.child {
                ChildDef::Segment(def) => def.validate()?,
                ChildDef::Structure(def) => def.validate()?,
            }
            child_use.repeat.validate(self.id.as_str())?;
        }
        Ok(())
    }
}

/// Dictionary of segment definitions for one interchange version
#[derive(Debug, Clone, Default)]
pub struct SegmentDict {
    segments: HashMap<String, Arc<SegmentDef>>,
}

impl SegmentDict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, keyed by its segment id.
    pub fn insert(&mut self, definition: Arc<SegmentDef>) {
        self.segments.insert(definition.id.clone(), definition);
    }

    /// Look up a definition by segment id.
    pub fn lookup(&self, id: &str) -> Result<&Arc<SegmentDef>> {
        self.segments
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("segment {id}")))
    }

    /// Whether the dictionary knows this segment id.
    pub fn contains(&self, id: &str) -> bool {
        self.segments.contains_key(id)
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Root schema for one interchange version
#[derive(Debug, Clone)]
pub struct InterchangeDef {
    /// Version tag (e.g. "00401", "00501")
    pub version: String,
    /// The envelope structure (ISA, functional groups, IEA)
    pub structure: Arc<StructureDef>,
    /// Segment dictionary for this version
    pub dict: Arc<SegmentDict>,
}

impl InterchangeDef {
    /// Create an interchange definition.
    pub fn new(
        version: impl Into<String>,
        structure: Arc<StructureDef>,
        dict: Arc<SegmentDict>,
    ) -> Self {
        Self {
            version: version.into(),
            structure,
            dict,
        }
    }

    /// Check construction invariants.
    pub fn validate(&self) -> Result<()> {
        if self.structure.kind != StructureKind::Interchange {
            return Err(Error::InvalidSchema(format!(
                "interchange {}: root structure has kind {:?}",
                self.version, self.structure.kind
            )));
        }
        self.structure.validate()
    }
}

/// Runtime binding of an element definition to a requirement.
///
/// The handle through which a constructed value knows its schema context.
#[derive(Debug, Clone)]
pub struct Usage {
    /// Bound element definition
    pub definition: Arc<ElementDef>,
    /// Requirement at the bound position
    pub requirement: Requirement,
}

impl Usage {
    /// Bind a definition with a requirement.
    pub fn new(definition: Arc<ElementDef>, requirement: Requirement) -> Self {
        Self {
            definition,
            requirement,
        }
    }

    /// True for mandatory usages.
    pub fn is_required(&self) -> bool {
        self.requirement.is_required()
    }

    /// True for optional and relational usages.
    pub fn is_optional(&self) -> bool {
        self.requirement.is_optional()
    }

    /// True for not-used positions.
    pub fn is_forbidden(&self) -> bool {
        self.requirement.is_forbidden()
    }

    /// Whether two usages bind the same element definition.
    pub fn same_definition(&self, other: &Usage) -> bool {
        self.definition.id == other.definition.id
    }
}
