//! Wire writer
//!
//! Pre-order traversal of a constructed tree, rendering each segment under
//! the tree's separators. Values render with truncation on; trailing
//! optional elements that are blank are omitted, never a middle one that
//! would shift positions.

use x12_tree::{CompositeValue, ElementSlot, Node, NodeDef, Separators};

/// Writer configuration
#[derive(Debug, Clone, Default)]
pub struct WriterConfig {
    /// Optional suffix emitted after each segment terminator (e.g. "\n");
    /// the tokenizer ignores it on read
    pub segment_suffix: Option<String>,
}

/// Renders constructed trees to wire bytes
#[derive(Debug, Default)]
pub struct Writer {
    config: WriterConfig,
}

impl Writer {
    /// Create a writer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with specific configuration.
    pub fn with_config(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Render a tree to bytes under its own separators.
    pub fn write(&self, tree: &Node) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_node(tree, tree.separators, &mut out);
        out
    }

    fn write_node(&self, node: &Node, separators: Separators, out: &mut Vec<u8>) {
        if node.is_segment() {
            out.extend_from_slice(render_segment(node, separators).as_bytes());
            if let Some(suffix) = &self.config.segment_suffix {
                out.extend_from_slice(suffix.as_bytes());
            }
            return;
        }
        for child in &node.children {
            self.write_node(child, separators, out);
        }
    }
}

fn render_segment(node: &Node, separators: Separators) -> String {
    let NodeDef::Segment(def) = &node.definition else {
        return String::new();
    };

    let mut parts: Vec<String> = node
        .elements
        .iter()
        .map(|slot| render_slot(slot, separators))
        .collect();

    // Omit trailing blanks at optional positions.
    while let Some(last) = parts.last() {
        if !last.is_empty() {
            break;
        }
        let optional = def
            .elements
            .get(parts.len() - 1)
            .map(|element_use| !element_use.requirement.is_required())
            .unwrap_or(true);
        if !optional {
            break;
        }
        parts.pop();
    }

    let mut rendered = def.id.clone();
    for part in parts {
        rendered.push(char::from(separators.element));
        rendered.push_str(&part);
    }
    rendered.push(char::from(separators.segment));
    rendered
}

fn render_slot(slot: &ElementSlot, separators: Separators) -> String {
    match slot {
        ElementSlot::Absent => String::new(),
        ElementSlot::Value(value) => value.to_wire(true),
        ElementSlot::Composite(composite) => render_composite(composite, separators),
        ElementSlot::Repeated(entries) => {
            let mut rendered: Vec<String> = entries
                .iter()
                .map(|entry| render_slot(entry, separators))
                .collect();
            while rendered.last().is_some_and(String::is_empty) {
                rendered.pop();
            }
            rendered.join(&char::from(separators.repetition).to_string())
        }
    }
}

fn render_composite(composite: &CompositeValue, separators: Separators) -> String {
    let mut rendered: Vec<String> = composite
        .components
        .iter()
        .map(|component| component.to_wire(true))
        .collect();

    while let Some(last) = rendered.last() {
        if !last.is_empty() {
            break;
        }
        let optional = composite
            .definition
            .components
            .get(rendered.len() - 1)
            .map(|component_use| !component_use.requirement.is_required())
            .unwrap_or(true);
        if !optional {
            break;
        }
        rendered.pop();
    }

    rendered.join(&char::from(separators.component).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use x12_schema::{
        ComponentUse, CompositeDef, ElementDef, ElementKind, ElementUse, Requirement, SegmentDef,
        Usage,
    };
    use x12_tree::{ElementValue, Position};

    fn text_def(id: &str, min: usize, max: usize) -> Arc<ElementDef> {
        Arc::new(ElementDef::new(id, "", ElementKind::Text).length(min, max))
    }

    fn text_value(def: &Arc<ElementDef>, raw: &str) -> ElementValue {
        ElementValue::value(
            raw,
            Usage::new(Arc::clone(def), Requirement::Optional),
            Position::new(0, 1),
        )
    }

    fn segment_with(
        def: Arc<SegmentDef>,
        elements: Vec<ElementSlot>,
    ) -> Node {
        Node::new_segment(
            def,
            Requirement::Mandatory,
            Separators::default(),
            Position::new(0, 1),
            elements,
        )
    }

    #[test]
    fn test_render_simple_segment() {
        let code = text_def("353", 2, 2);
        let def = Arc::new(
            SegmentDef::new("BEG").with_elements(vec![
                ElementUse::simple(Arc::clone(&code)).mandatory(true),
            ]),
        );
        let node = segment_with(def, vec![ElementSlot::Value(text_value(&code, "00"))]);
        assert_eq!(render_segment(&node, Separators::default()), "BEG*00~");
    }

    #[test]
    fn test_trailing_blank_optional_elements_omitted() {
        let a = text_def("A", 1, 5);
        let def = Arc::new(
            SegmentDef::new("REF").with_elements(vec![
                ElementUse::simple(Arc::clone(&a)).mandatory(true),
                ElementUse::simple(Arc::clone(&a)),
                ElementUse::simple(Arc::clone(&a)),
            ]),
        );
        let node = segment_with(
            def,
            vec![
                ElementSlot::Value(text_value(&a, "ZZ")),
                ElementSlot::Absent,
                ElementSlot::Absent,
            ],
        );
        assert_eq!(render_segment(&node, Separators::default()), "REF*ZZ~");
    }

    #[test]
    fn test_middle_blank_is_preserved() {
        let a = text_def("A", 1, 5);
        let def = Arc::new(
            SegmentDef::new("REF").with_elements(vec![
                ElementUse::simple(Arc::clone(&a)).mandatory(true),
                ElementUse::simple(Arc::clone(&a)),
                ElementUse::simple(Arc::clone(&a)),
            ]),
        );
        let node = segment_with(
            def,
            vec![
                ElementSlot::Value(text_value(&a, "ZZ")),
                ElementSlot::Absent,
                ElementSlot::Value(text_value(&a, "X")),
            ],
        );
        assert_eq!(render_segment(&node, Separators::default()), "REF*ZZ**X~");
    }

    #[test]
    fn test_render_composite_and_repetition() {
        let part = text_def("C1", 1, 5);
        let composite = Arc::new(
            CompositeDef::new("C001", "").with_components(vec![
                ComponentUse::new(Arc::clone(&part)).mandatory(true),
                ComponentUse::new(Arc::clone(&part)),
            ]),
        );
        let def = Arc::new(
            SegmentDef::new("HI").with_elements(vec![
                ElementUse::composite(Arc::clone(&composite))
                    .repeat(x12_schema::RepeatCount::unbounded()),
            ]),
        );

        let make_composite = |a: &str, b: &str| {
            ElementSlot::Composite(x12_tree::CompositeValue::new(
                Arc::clone(&composite),
                Position::new(0, 1),
                vec![text_value(&part, a), text_value(&part, b)],
            ))
        };
        let node = segment_with(
            def,
            vec![ElementSlot::Repeated(vec![
                make_composite("A", "1"),
                make_composite("B", ""),
            ])],
        );
        assert_eq!(render_segment(&node, Separators::default()), "HI*A:1^B~");
    }

    #[test]
    fn test_custom_separators_are_honored() {
        let a = text_def("A", 1, 5);
        let def = Arc::new(
            SegmentDef::new("REF").with_elements(vec![
                ElementUse::simple(Arc::clone(&a)).mandatory(true),
            ]),
        );
        let node = Node::new_segment(
            def,
            Requirement::Mandatory,
            Separators::default().with_element(b'|').with_segment(b'\n'),
            Position::new(0, 1),
            vec![ElementSlot::Value(text_value(&a, "ZZ"))],
        );
        let separators = node.separators;
        assert_eq!(render_segment(&node, separators), "REF|ZZ\n");
    }

    #[test]
    fn test_writer_suffix() {
        let a = text_def("A", 1, 5);
        let def = Arc::new(
            SegmentDef::new("REF").with_elements(vec![
                ElementUse::simple(Arc::clone(&a)).mandatory(true),
            ]),
        );
        let node = segment_with(def, vec![ElementSlot::Value(text_value(&a, "Z"))]);

        let writer = Writer::with_config(WriterConfig {
            segment_suffix: Some("\n".to_string()),
        });
        assert_eq!(writer.write(&node), b"REF*Z~\n");
    }
}
