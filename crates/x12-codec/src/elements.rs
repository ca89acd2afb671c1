//! Element population
//!
//! Once the state machine places a segment, its element tokens are zipped
//! against the segment definition's element uses. Coercion failures stay
//! local as `Invalid` values; shape problems (missing mandatory elements,
//! content in undeclared or not-used positions, repetition overflow) are
//! recorded as structural errors.

use crate::error::{ErrorKind, StructuralError};
use crate::tokenizer::{ElementTok, SegmentTok};
use std::sync::Arc;
use x12_schema::{CompositeDef, ElementUse, Requirement, RepeatCount, SegmentDef, SlotDef, Usage};
use x12_tree::{CompositeValue, ElementSlot, ElementValue, Node, Position, Separators};

/// Build a segment node from a placed token.
pub(crate) fn build_segment_node(
    definition: &Arc<SegmentDef>,
    requirement: Requirement,
    token: &SegmentTok,
    separators: Separators,
    errors: &mut Vec<StructuralError>,
) -> Node {
    let mut slots = Vec::with_capacity(definition.elements.len());
    for (index, element_use) in definition.elements.iter().enumerate() {
        let position = token.position.at_element(index + 1);
        slots.push(build_slot(
            element_use,
            token.elements.get(index),
            position,
            separators,
            errors,
        ));
    }

    for (index, tok) in token
        .elements
        .iter()
        .enumerate()
        .skip(definition.elements.len())
    {
        if !tok.is_blank() {
            errors.push(
                StructuralError::new(
                    ErrorKind::ExtraElement,
                    token.position.at_element(index + 1),
                    format!(
                        "{} declares no element at position {}",
                        definition.id,
                        index + 1
                    ),
                )
                .with_definition(definition.id.clone()),
            );
        }
    }

    Node::new_segment(
        Arc::clone(definition),
        requirement,
        separators,
        token.position,
        slots,
    )
}

fn build_slot(
    element_use: &ElementUse,
    token: Option<&ElementTok>,
    position: Position,
    separators: Separators,
    errors: &mut Vec<StructuralError>,
) -> ElementSlot {
    let Some(token) = token else {
        if element_use.requirement.is_required() {
            errors.push(missing_element(element_use, position));
        }
        return ElementSlot::Absent;
    };

    if token.is_blank() {
        if element_use.requirement.is_required() {
            errors.push(missing_element(element_use, position));
        }
        return blank_slot(element_use, position);
    }

    if element_use.requirement.is_forbidden() {
        errors.push(
            StructuralError::new(
                ErrorKind::ExtraElement,
                position,
                format!("{} is not used but carries content", element_use.slot.id()),
            )
            .with_definition(element_use.slot.id().to_string()),
        );
        return ElementSlot::Absent;
    }

    if element_use.repeat == RepeatCount::Bounded(1) {
        if let ElementTok::Repeated(repetitions) = token {
            errors.push(
                StructuralError::new(
                    ErrorKind::TooManyRepetitions,
                    position,
                    format!("{} does not repeat", element_use.slot.id()),
                )
                .with_definition(element_use.slot.id().to_string()),
            );
            // Keep the first repetition, drop the excess.
            return match repetitions.first() {
                Some(first) => single_slot(element_use, first, position, separators, errors),
                None => ElementSlot::Absent,
            };
        }
        return single_slot(element_use, token, position, separators, errors);
    }

    let repetitions: Vec<&ElementTok> = match token {
        ElementTok::Repeated(repetitions) => repetitions.iter().collect(),
        single => vec![single],
    };

    let mut entries = Vec::new();
    for (occurrence, repetition) in repetitions.iter().enumerate() {
        if !element_use.repeat.allows(occurrence) {
            errors.push(
                StructuralError::new(
                    ErrorKind::TooManyRepetitions,
                    position,
                    format!(
                        "{} allows at most {} repetitions",
                        element_use.slot.id(),
                        element_use.repeat.max().unwrap_or(0)
                    ),
                )
                .with_definition(element_use.slot.id().to_string()),
            );
            break;
        }
        entries.push(single_slot(element_use, repetition, position, separators, errors));
    }
    ElementSlot::Repeated(entries)
}

fn blank_slot(element_use: &ElementUse, position: Position) -> ElementSlot {
    match &element_use.slot {
        SlotDef::Simple(def) => ElementSlot::Value(ElementValue::empty(
            Usage::new(Arc::clone(def), element_use.requirement),
            position,
        )),
        SlotDef::Composite(def) => {
            let components = def
                .components
                .iter()
                .enumerate()
                .map(|(i, component_use)| {
                    ElementValue::empty(
                        Usage::new(
                            Arc::clone(&component_use.definition),
                            component_use.requirement,
                        ),
                        position.at_component(i + 1),
                    )
                })
                .collect();
            ElementSlot::Composite(CompositeValue::new(Arc::clone(def), position, components))
        }
    }
}

fn single_slot(
    element_use: &ElementUse,
    token: &ElementTok,
    position: Position,
    separators: Separators,
    errors: &mut Vec<StructuralError>,
) -> ElementSlot {
    match (&element_use.slot, token) {
        (SlotDef::Simple(def), ElementTok::Simple(raw)) => {
            ElementSlot::Value(ElementValue::value(
                raw,
                Usage::new(Arc::clone(def), element_use.requirement),
                position,
            ))
        }
        (SlotDef::Simple(def), ElementTok::Composite(components)) => {
            // Components where a simple element is declared: keep the text
            // visible as an invalid value rather than guessing.
            let raw = components.join(&char::from(separators.component).to_string());
            ElementSlot::Value(ElementValue::invalid(
                raw,
                Usage::new(Arc::clone(def), element_use.requirement),
                position,
            ))
        }
        (SlotDef::Composite(def), ElementTok::Composite(components)) => {
            build_composite(def, components, position, errors)
        }
        (SlotDef::Composite(def), ElementTok::Simple(raw)) => {
            // A lone value fills the first component.
            build_composite(def, std::slice::from_ref(raw), position, errors)
        }
        (_, ElementTok::Repeated(repetitions)) => match repetitions.first() {
            Some(first) => single_slot(element_use, first, position, separators, errors),
            None => ElementSlot::Absent,
        },
    }
}

fn build_composite(
    definition: &Arc<CompositeDef>,
    components: &[String],
    position: Position,
    errors: &mut Vec<StructuralError>,
) -> ElementSlot {
    let mut values = Vec::with_capacity(definition.components.len());
    for (index, component_use) in definition.components.iter().enumerate() {
        let component_position = position.at_component(index + 1);
        let usage = Usage::new(
            Arc::clone(&component_use.definition),
            component_use.requirement,
        );
        let raw = components.get(index).map(String::as_str).unwrap_or("");

        if raw.is_empty() {
            if component_use.requirement.is_required() {
                errors.push(
                    StructuralError::new(
                        ErrorKind::MissingMandatoryElement,
                        component_position,
                        format!(
                            "required component {} of {} absent",
                            component_use.definition.id, definition.id
                        ),
                    )
                    .with_definition(component_use.definition.id.clone()),
                );
            }
            values.push(ElementValue::empty(usage, component_position));
        } else if component_use.requirement.is_forbidden() {
            errors.push(
                StructuralError::new(
                    ErrorKind::ExtraElement,
                    component_position,
                    format!(
                        "component {} of {} is not used but carries content",
                        component_use.definition.id, definition.id
                    ),
                )
                .with_definition(component_use.definition.id.clone()),
            );
            values.push(ElementValue::empty(usage, component_position));
        } else {
            values.push(ElementValue::value(raw, usage, component_position));
        }
    }

    for (index, raw) in components.iter().enumerate().skip(definition.components.len()) {
        if !raw.is_empty() {
            errors.push(
                StructuralError::new(
                    ErrorKind::ExtraElement,
                    position.at_component(index + 1),
                    format!(
                        "{} declares no component at position {}",
                        definition.id,
                        index + 1
                    ),
                )
                .with_definition(definition.id.clone()),
            );
        }
    }

    ElementSlot::Composite(CompositeValue::new(
        Arc::clone(definition),
        position,
        values,
    ))
}

fn missing_element(element_use: &ElementUse, position: Position) -> StructuralError {
    StructuralError::new(
        ErrorKind::MissingMandatoryElement,
        position,
        format!("required element {} absent", element_use.slot.id()),
    )
    .with_definition(element_use.slot.id().to_string())
}
