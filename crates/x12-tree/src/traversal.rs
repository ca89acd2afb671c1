//! Cursor navigation over the constructed tree

use crate::node::Node;
use crate::Error;
use crate::Result;

/// A cursor for navigating the tree
pub struct Cursor<'a> {
    /// Current node
    node: &'a Node,

    /// Path to current node (for error reporting)
    path: Vec<String>,
}

impl<'a> Cursor<'a> {
    /// Create a new cursor at the given node
    pub fn new(node: &'a Node) -> Self {
        Self {
            node,
            path: vec![node.id().to_string()],
        }
    }

    /// Get the current node
    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// Get the current path
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Navigate to the first child node with a definition id
    pub fn child(&self, id: &str) -> Result<Cursor<'a>> {
        match self.node.children.iter().find(|c| c.id() == id) {
            Some(child) => {
                let mut new_path = self.path.clone();
                new_path.push(id.to_string());
                Ok(Cursor {
                    node: child,
                    path: new_path,
                })
            }
            None => Err(Error::node_not_found(format!(
                "{}/{}",
                self.path.join("/"),
                id
            ))),
        }
    }

    /// Navigate to a child by index
    pub fn child_at(&self, index: usize) -> Result<Cursor<'a>> {
        match self.node.children.get(index) {
            Some(child) => {
                let mut new_path = self.path.clone();
                new_path.push(format!("[{index}]"));
                Ok(Cursor {
                    node: child,
                    path: new_path,
                })
            }
            None => Err(Error::node_not_found(format!(
                "{}[{}]",
                self.path.join("/"),
                index
            ))),
        }
    }

    /// Get all children matching a definition id
    pub fn children(&self, id: &str) -> Vec<Cursor<'a>> {
        self.node
            .children
            .iter()
            .filter(|c| c.id() == id)
            .enumerate()
            .map(|(idx, child)| {
                let mut new_path = self.path.clone();
                new_path.push(format!("{id}[{idx}]"));
                Cursor {
                    node: child,
                    path: new_path,
                }
            })
            .collect()
    }

    /// Navigate using a path (e.g. "PO/850[0]/BEG")
    pub fn navigate(&self, path: &str) -> Result<Cursor<'a>> {
        let mut current_node = self.node;
        let mut current_path = self.path.clone();

        for step in path.split('/') {
            if step.is_empty() {
                continue;
            }

            // Handle occurrence indexing like "N1[1]"
            if let Some(open_bracket) = step.find('[') {
                let id = &step[..open_bracket];
                let close_bracket = step.find(']').ok_or_else(|| {
                    Error::invalid_path(step, "unclosed bracket")
                })?;
                let index: usize = step[open_bracket + 1..close_bracket]
                    .parse()
                    .map_err(|_| Error::invalid_path(step, "invalid index"))?;

                let children: Vec<&Node> = current_node
                    .children
                    .iter()
                    .filter(|c| c.id() == id)
                    .collect();

                current_node = children.get(index).copied().ok_or_else(|| {
                    Error::node_not_found(format!("{}/{}", current_path.join("/"), step))
                })?;
                current_path.push(format!("{id}[{index}]"));
            } else {
                current_node = current_node
                    .children
                    .iter()
                    .find(|c| c.id() == step)
                    .ok_or_else(|| {
                        Error::node_not_found(format!("{}/{}", current_path.join("/"), step))
                    })?;
                current_path.push(step.to_string());
            }
        }

        Ok(Cursor {
            node: current_node,
            path: current_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::position::Position;
    use crate::separators::Separators;
    use std::sync::Arc;
    use x12_schema::{Requirement, SegmentDef, StructureDef, StructureKind};

    fn segment(id: &str) -> Node {
        Node::new_segment(
            Arc::new(SegmentDef::new(id)),
            Requirement::Optional,
            Separators::default(),
            Position::new(0, 1),
            Vec::new(),
        )
    }

    fn structure(kind: StructureKind, id: &str, children: Vec<Node>) -> Node {
        let mut node = Node::new_structure(
            Arc::new(StructureDef::new(kind, id)),
            Requirement::Optional,
            Separators::default(),
            Position::new(0, 1),
        );
        node.children = children;
        node
    }

    fn sample_tree() -> Node {
        let loop_a = structure(StructureKind::Loop, "N1", vec![segment("N1"), segment("N3")]);
        let loop_b = structure(StructureKind::Loop, "N1", vec![segment("N1")]);
        let ts = structure(
            StructureKind::TransactionSet,
            "850",
            vec![segment("ST"), loop_a, loop_b, segment("SE")],
        );
        structure(StructureKind::Interchange, "00501", vec![segment("ISA"), ts, segment("IEA")])
    }

    #[test]
    fn test_cursor_child() {
        let tree = sample_tree();
        let cursor = Cursor::new(&tree);

        let ts = cursor.child("850").unwrap();
        assert_eq!(ts.node().id(), "850");
        assert_eq!(ts.path(), &["00501", "850"]);

        assert!(cursor.child("999").is_err());
    }

    #[test]
    fn test_cursor_child_at() {
        let tree = sample_tree();
        let cursor = Cursor::new(&tree);

        assert_eq!(cursor.child_at(0).unwrap().node().id(), "ISA");
        assert_eq!(cursor.child_at(2).unwrap().node().id(), "IEA");
        assert!(cursor.child_at(3).is_err());
    }

    #[test]
    fn test_cursor_children_by_id() {
        let tree = sample_tree();
        let ts = Cursor::new(&tree).child("850").unwrap();

        let loops = ts.children("N1");
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0].path().last().unwrap(), "N1[0]");
        assert_eq!(loops[1].path().last().unwrap(), "N1[1]");
    }

    #[test]
    fn test_navigate_with_occurrence_index() {
        let tree = sample_tree();
        let cursor = Cursor::new(&tree);

        let n3 = cursor.navigate("850/N1[0]/N3").unwrap();
        assert_eq!(n3.node().id(), "N3");

        // The second N1 loop has no N3.
        assert!(cursor.navigate("850/N1[1]/N3").is_err());
        assert!(cursor.navigate("850/N1[2]").is_err());
    }

    #[test]
    fn test_navigate_invalid_path() {
        let tree = sample_tree();
        let cursor = Cursor::new(&tree);

        assert!(matches!(
            cursor.navigate("850/N1[0"),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            cursor.navigate("850/N1[x]"),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_node_at_delegates_to_cursor() {
        let tree = sample_tree();
        assert_eq!(tree.at("850/SE").unwrap().id(), "SE");
        assert!(tree.at("850/GS").is_err());
    }
}
