//! Envelope handling (ISA/IEA, GS/GE, ST/SE)
//!
//! Typed views over envelope segments, cross-checks of the control
//! numbers and counts the trailers carry, and the targeted rewrite of an
//! interchange under new separators.

use crate::error::{ErrorKind, StructuralError};
use crate::{Error, Result};
use x12_schema::StructureKind;
use x12_tree::{ElementSlot, ElementValue, Node, NodeChanges, NodeDef, Separators};

/// ISA - Interchange Control Header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsaSegment {
    /// Authorization information qualifier (ISA01)
    pub auth_qualifier: String,
    /// Authorization information (ISA02)
    pub auth_information: String,
    /// Security information qualifier (ISA03)
    pub security_qualifier: String,
    /// Security information (ISA04)
    pub security_information: String,
    /// Sender id qualifier (ISA05)
    pub sender_qualifier: String,
    /// Sender id (ISA06)
    pub sender_id: String,
    /// Receiver id qualifier (ISA07)
    pub receiver_qualifier: String,
    /// Receiver id (ISA08)
    pub receiver_id: String,
    /// Interchange date, YYMMDD (ISA09)
    pub date: String,
    /// Interchange time, HHMM (ISA10)
    pub time: String,
    /// Repetition separator character (ISA11)
    pub repetition_separator: String,
    /// Control version number (ISA12)
    pub version: String,
    /// Interchange control number (ISA13)
    pub control_number: String,
    /// Acknowledgment requested (ISA14)
    pub ack_requested: String,
    /// Usage indicator, P/T/I (ISA15)
    pub usage_indicator: String,
    /// Component separator character (ISA16)
    pub component_separator: String,
}

/// GS - Functional Group Header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsSegment {
    /// Functional identifier code (GS01)
    pub functional_code: String,
    /// Application sender's code (GS02)
    pub sender: String,
    /// Application receiver's code (GS03)
    pub receiver: String,
    /// Group date, CCYYMMDD (GS04)
    pub date: String,
    /// Group time (GS05)
    pub time: String,
    /// Group control number (GS06)
    pub control_number: String,
    /// Responsible agency code (GS07)
    pub agency: String,
    /// Version/release/industry code (GS08)
    pub version: String,
}

/// ST - Transaction Set Header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StSegment {
    /// Transaction set identifier code (ST01)
    pub transaction_code: String,
    /// Transaction set control number (ST02)
    pub control_number: String,
}

/// Rendered text of a segment node's element, trailing pad stripped.
fn element_text(segment: &Node, position: usize) -> Option<String> {
    match segment.element(position).ok()? {
        ElementSlot::Value(value) => Some(value.to_wire(false).trim_end().to_string()),
        _ => None,
    }
}

fn require_text(segment: &Node, position: usize) -> Result<String> {
    element_text(segment, position).ok_or_else(|| {
        Error::Envelope(format!(
            "{} element {} is absent",
            segment.id(),
            position
        ))
    })
}

fn expect_segment<'a>(node: &'a Node, id: &str) -> Result<&'a Node> {
    if node.is_segment() && node.id() == id {
        Ok(node)
    } else {
        Err(Error::Envelope(format!(
            "expected segment {id}, found {}",
            node.id()
        )))
    }
}

/// Read a typed view of an ISA segment node.
pub fn parse_isa(node: &Node) -> Result<IsaSegment> {
    let node = expect_segment(node, "ISA")?;
    Ok(IsaSegment {
        auth_qualifier: require_text(node, 1)?,
        auth_information: require_text(node, 2)?,
        security_qualifier: require_text(node, 3)?,
        security_information: require_text(node, 4)?,
        sender_qualifier: require_text(node, 5)?,
        sender_id: require_text(node, 6)?,
        receiver_qualifier: require_text(node, 7)?,
        receiver_id: require_text(node, 8)?,
        date: require_text(node, 9)?,
        time: require_text(node, 10)?,
        repetition_separator: require_text(node, 11)?,
        version: require_text(node, 12)?,
        control_number: require_text(node, 13)?,
        ack_requested: require_text(node, 14)?,
        usage_indicator: require_text(node, 15)?,
        component_separator: require_text(node, 16)?,
    })
}

/// Read a typed view of a GS segment node.
pub fn parse_gs(node: &Node) -> Result<GsSegment> {
    let node = expect_segment(node, "GS")?;
    Ok(GsSegment {
        functional_code: require_text(node, 1)?,
        sender: element_text(node, 2).unwrap_or_default(),
        receiver: element_text(node, 3).unwrap_or_default(),
        date: element_text(node, 4).unwrap_or_default(),
        time: element_text(node, 5).unwrap_or_default(),
        control_number: require_text(node, 6)?,
        agency: element_text(node, 7).unwrap_or_default(),
        version: element_text(node, 8).unwrap_or_default(),
    })
}

/// Read a typed view of an ST segment node.
pub fn parse_st(node: &Node) -> Result<StSegment> {
    let node = expect_segment(node, "ST")?;
    Ok(StSegment {
        transaction_code: require_text(node, 1)?,
        control_number: require_text(node, 2)?,
    })
}

fn structures(node: &Node, kind: StructureKind) -> Vec<&Node> {
    node.children
        .iter()
        .filter(|child| match &child.definition {
            NodeDef::Structure(def) => def.kind == kind,
            NodeDef::Segment(_) => false,
        })
        .collect()
}

fn direct_segment<'a>(node: &'a Node, id: &str) -> Option<&'a Node> {
    node.children
        .iter()
        .find(|child| child.is_segment() && child.id() == id)
}

fn count_segments(node: &Node) -> usize {
    if node.is_segment() {
        return 1;
    }
    node.children.iter().map(count_segments).sum()
}

fn control_mismatch(node: &Node, message: String) -> StructuralError {
    StructuralError::new(ErrorKind::ControlMismatch, node.position, message)
        .with_definition(node.id().to_string())
}

/// Cross-check envelope control numbers and counts.
///
/// Verifies IEA01 against the number of functional groups and IEA02
/// against ISA13, then GE01/GE02 and SE01/SE02 likewise at each level.
/// Findings are returned rather than raised; callers decide severity.
pub fn validate_interchange(tree: &Node) -> Vec<StructuralError> {
    let mut errors = Vec::new();
    let groups = structures(tree, StructureKind::FunctionalGroup);

    if let (Some(isa), Some(iea)) = (direct_segment(tree, "ISA"), direct_segment(tree, "IEA")) {
        let declared = element_text(iea, 1).and_then(|t| t.parse::<usize>().ok());
        if declared.is_some_and(|count| count != groups.len()) {
            errors.push(control_mismatch(
                iea,
                format!(
                    "IEA01 declares {} groups, interchange contains {}",
                    declared.unwrap_or(0),
                    groups.len()
                ),
            ));
        }
        let isa_ref = element_text(isa, 13);
        let iea_ref = element_text(iea, 2);
        if isa_ref.is_some() && iea_ref.is_some() && isa_ref != iea_ref {
            errors.push(control_mismatch(
                iea,
                format!(
                    "IEA02 control number {} does not match ISA13 {}",
                    iea_ref.unwrap_or_default(),
                    isa_ref.unwrap_or_default()
                ),
            ));
        }
    }

    for group in groups {
        errors.extend(validate_group(group));
    }
    errors
}

/// Cross-check one functional group's GE trailer.
pub fn validate_group(group: &Node) -> Vec<StructuralError> {
    let mut errors = Vec::new();
    let transactions = structures(group, StructureKind::TransactionSet);

    if let (Some(gs), Some(ge)) = (direct_segment(group, "GS"), direct_segment(group, "GE")) {
        let declared = element_text(ge, 1).and_then(|t| t.parse::<usize>().ok());
        if declared.is_some_and(|count| count != transactions.len()) {
            errors.push(control_mismatch(
                ge,
                format!(
                    "GE01 declares {} transaction sets, group contains {}",
                    declared.unwrap_or(0),
                    transactions.len()
                ),
            ));
        }
        let gs_ref = element_text(gs, 6);
        let ge_ref = element_text(ge, 2);
        if gs_ref.is_some() && ge_ref.is_some() && gs_ref != ge_ref {
            errors.push(control_mismatch(
                ge,
                format!(
                    "GE02 control number {} does not match GS06 {}",
                    ge_ref.unwrap_or_default(),
                    gs_ref.unwrap_or_default()
                ),
            ));
        }
    }

    for transaction in transactions {
        errors.extend(validate_transaction(transaction));
    }
    errors
}

/// Cross-check one transaction set's SE trailer.
pub fn validate_transaction(transaction: &Node) -> Vec<StructuralError> {
    let mut errors = Vec::new();
    let (Some(st), Some(se)) = (
        direct_segment(transaction, "ST"),
        direct_segment(transaction, "SE"),
    ) else {
        return errors;
    };

    let declared = element_text(se, 1).and_then(|t| t.parse::<usize>().ok());
    let actual = count_segments(transaction);
    if declared.is_some_and(|count| count != actual) {
        errors.push(control_mismatch(
            se,
            format!(
                "SE01 declares {} segments, transaction set contains {}",
                declared.unwrap_or(0),
                actual
            ),
        ));
    }

    let st_ref = element_text(st, 2);
    let se_ref = element_text(se, 2);
    if st_ref.is_some() && se_ref.is_some() && st_ref != se_ref {
        errors.push(control_mismatch(
            se,
            format!(
                "SE02 control number {} does not match ST02 {}",
                se_ref.unwrap_or_default(),
                st_ref.unwrap_or_default()
            ),
        ));
    }
    errors
}

/// Rewrite an interchange under new separators.
///
/// Returns a copy in which ISA11 and ISA16 carry the new repetition and
/// component characters as literals and the tree's separators handle is
/// swapped. No other element changes.
pub fn replace_separators(tree: &Node, separators: Separators) -> Result<Node> {
    separators
        .check_distinct()
        .map_err(|e| Error::Envelope(e.to_string()))?;

    let isa_index = tree
        .children
        .iter()
        .position(|child| child.is_segment() && child.id() == "ISA")
        .ok_or_else(|| Error::Envelope("interchange has no ISA segment".to_string()))?;

    let isa = &tree.children[isa_index];
    let mut elements = isa.elements.clone();
    replace_literal(&mut elements, 11, separators.repetition)?;
    replace_literal(&mut elements, 16, separators.component)?;

    let mut children = tree.children.clone();
    children[isa_index] = isa.copy(NodeChanges {
        separators: Some(separators),
        elements: Some(elements),
        ..NodeChanges::default()
    });

    Ok(tree.copy(NodeChanges {
        separators: Some(separators),
        children: Some(children),
        ..NodeChanges::default()
    }))
}

fn replace_literal(elements: &mut [ElementSlot], position: usize, byte: u8) -> Result<()> {
    let slot = elements.get_mut(position - 1).ok_or_else(|| {
        Error::Envelope(format!("ISA element {position} is absent"))
    })?;
    let ElementSlot::Value(old) = &*slot else {
        return Err(Error::Envelope(format!(
            "ISA element {position} is not a simple value"
        )));
    };
    let literal = char::from(byte).to_string();
    let replacement = ElementValue::value(&literal, old.usage().clone(), old.position());
    *slot = ElementSlot::Value(replacement);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Parser;
    use crate::writer::Writer;
    use std::sync::Arc;
    use x12_schema::{
        ChildUse, ElementDef, ElementKind, ElementUse, InterchangeDef, RepeatCount, SegmentDef,
        SegmentDict, StructureDef,
    };

    const ISA: &str = "ISA*00*          *00*          *ZZ*SENDER         *ZZ*RECEIVER       *240101*1200*^*00501*000000001*0*P*:~";

    fn text(id: &str, min: usize, max: usize) -> Arc<ElementDef> {
        Arc::new(ElementDef::new(id, "", ElementKind::Text).length(min, max))
    }

    fn isa_def() -> Arc<SegmentDef> {
        let widths = [2, 10, 2, 10, 2, 15, 2, 15, 6, 4, 1, 5, 9, 1, 1, 1];
        let elements = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                ElementUse::simple(text(&format!("I{:02}", i + 1), *w, *w)).mandatory(true)
            })
            .collect();
        Arc::new(SegmentDef::new("ISA").with_elements(elements))
    }

    fn schema() -> InterchangeDef {
        let isa = isa_def();
        let iea = Arc::new(SegmentDef::new("IEA").with_elements(vec![
            ElementUse::simple(text("I16A", 1, 5)).mandatory(true),
            ElementUse::simple(text("I12", 9, 9)).mandatory(true),
        ]));
        let gs = Arc::new(SegmentDef::new("GS").with_elements(vec![
            ElementUse::simple(text("479", 2, 2)).mandatory(true),
            ElementUse::simple(text("142", 2, 15)),
            ElementUse::simple(text("124", 2, 15)),
            ElementUse::simple(text("373", 8, 8)),
            ElementUse::simple(text("337", 4, 8)),
            ElementUse::simple(text("28", 1, 9)).mandatory(true),
            ElementUse::simple(text("455", 1, 2)),
            ElementUse::simple(text("480", 1, 12)),
        ]));
        let ge = Arc::new(SegmentDef::new("GE").with_elements(vec![
            ElementUse::simple(text("97", 1, 6)).mandatory(true),
            ElementUse::simple(text("28", 1, 9)).mandatory(true),
        ]));
        let st = Arc::new(SegmentDef::new("ST").with_elements(vec![
            ElementUse::simple(text("143", 3, 3)).mandatory(true),
            ElementUse::simple(text("329", 4, 9)).mandatory(true),
        ]));
        let se = Arc::new(SegmentDef::new("SE").with_elements(vec![
            ElementUse::simple(text("96", 1, 10)).mandatory(true),
            ElementUse::simple(text("329", 4, 9)).mandatory(true),
        ]));
        let beg = Arc::new(SegmentDef::new("BEG").with_elements(vec![
            ElementUse::simple(text("353", 2, 2)).mandatory(true),
        ]));

        let mut dict = SegmentDict::new();
        for def in [&isa, &iea, &gs, &ge, &st, &se, &beg] {
            dict.insert(Arc::clone(def));
        }

        let ts = Arc::new(
            StructureDef::new(x12_schema::StructureKind::TransactionSet, "850").with_children(
                vec![
                    ChildUse::segment(st).mandatory(true),
                    ChildUse::segment(beg).mandatory(true),
                    ChildUse::segment(se).mandatory(true),
                ],
            ),
        );
        let group = Arc::new(
            StructureDef::new(x12_schema::StructureKind::FunctionalGroup, "PO").with_children(
                vec![
                    ChildUse::segment(gs).mandatory(true),
                    ChildUse::structure(ts)
                        .mandatory(true)
                        .repeat(RepeatCount::unbounded()),
                    ChildUse::segment(ge).mandatory(true),
                ],
            ),
        );
        let interchange = Arc::new(
            StructureDef::new(x12_schema::StructureKind::Interchange, "00501").with_children(
                vec![
                    ChildUse::segment(isa).mandatory(true),
                    ChildUse::structure(group).repeat(RepeatCount::unbounded()),
                    ChildUse::segment(iea).mandatory(true),
                ],
            ),
        );
        InterchangeDef::new("00501", interchange, Arc::new(dict))
    }

    fn parse_tree(input: &str) -> Node {
        let outcome = Parser::new().parse(input.as_bytes(), &schema()).unwrap();
        assert!(outcome.errors.is_empty(), "errors: {:?}", outcome.errors);
        outcome.tree
    }

    fn full_interchange() -> String {
        format!(
            "{ISA}GS*PO*SND*RCV*20240101*1200*1*X*005010~\
ST*850*0001~BEG*00~SE*3*0001~GE*1*1~IEA*1*000000001~"
        )
    }

    #[test]
    fn test_parse_isa_view() {
        let tree = parse_tree(&full_interchange());
        let isa = parse_isa(tree.segment("ISA", 1).unwrap()).unwrap();

        assert_eq!(isa.sender_id, "SENDER");
        assert_eq!(isa.receiver_id, "RECEIVER");
        assert_eq!(isa.version, "00501");
        assert_eq!(isa.control_number, "000000001");
        assert_eq!(isa.repetition_separator, "^");
        assert_eq!(isa.component_separator, ":");
    }

    #[test]
    fn test_parse_gs_and_st_views() {
        let tree = parse_tree(&full_interchange());
        let gs = parse_gs(tree.segment("GS", 1).unwrap()).unwrap();
        assert_eq!(gs.functional_code, "PO");
        assert_eq!(gs.control_number, "1");
        assert_eq!(gs.version, "005010");

        let st = parse_st(tree.segment("ST", 1).unwrap()).unwrap();
        assert_eq!(st.transaction_code, "850");
        assert_eq!(st.control_number, "0001");
    }

    #[test]
    fn test_parse_isa_on_wrong_segment() {
        let tree = parse_tree(&full_interchange());
        assert!(parse_isa(tree.segment("GS", 1).unwrap()).is_err());
    }

    #[test]
    fn test_control_checks_pass_on_consistent_interchange() {
        let tree = parse_tree(&full_interchange());
        assert!(validate_interchange(&tree).is_empty());
    }

    #[test]
    fn test_group_count_mismatch() {
        let input = full_interchange().replace("IEA*1*", "IEA*2*");
        let tree = parse_tree(&input);
        let errors = validate_interchange(&tree);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::ControlMismatch);
        assert!(errors[0].message.contains("IEA01"));
    }

    #[test]
    fn test_control_reference_mismatch() {
        let input = full_interchange().replace("SE*3*0001", "SE*3*0002");
        let tree = parse_tree(&input);
        let errors = validate_interchange(&tree);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("SE02"));
    }

    #[test]
    fn test_segment_count_mismatch() {
        let input = full_interchange().replace("SE*3*", "SE*9*");
        let tree = parse_tree(&input);
        let errors = validate_interchange(&tree);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("SE01"));
    }

    #[test]
    fn test_replace_separators_rewrites_isa_literals() {
        let tree = parse_tree(&full_interchange());
        let swapped = replace_separators(
            &tree,
            Separators::default()
                .with_repetition(b'!')
                .with_component(b'>'),
        )
        .unwrap();

        let isa = parse_isa(swapped.segment("ISA", 1).unwrap()).unwrap();
        assert_eq!(isa.repetition_separator, "!");
        assert_eq!(isa.component_separator, ">");
        // Everything else is untouched.
        assert_eq!(isa.sender_id, "SENDER");
        assert_eq!(isa.control_number, "000000001");
        assert_eq!(swapped.separators.repetition, b'!');

        // The original tree is unchanged.
        let original = parse_isa(tree.segment("ISA", 1).unwrap()).unwrap();
        assert_eq!(original.repetition_separator, "^");
    }

    #[test]
    fn test_replace_separators_rejects_collision() {
        let tree = parse_tree(&full_interchange());
        let result = replace_separators(
            &tree,
            Separators::default().with_repetition(b'*'),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_replaced_tree_writes_under_new_delimiters() {
        let tree = parse_tree(&full_interchange());
        let swapped = replace_separators(
            &tree,
            Separators::default().with_element(b'|').with_repetition(b'!'),
        )
        .unwrap();

        let bytes = Writer::new().write(&swapped);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("ISA|00|"));
        assert!(text.contains("GS|PO|"));
        assert!(!text.contains('*'));
    }
}
