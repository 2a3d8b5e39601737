//! Indented text rendering of behavior graphs

use super::{BehaviorGraph, Node};
use std::collections::HashMap;
use std::fmt::Write;

/// Character repeated to build indents
pub const INDENT_MARKER: char = '-';

/// Renders graphs pre-order, one node per line
///
/// Indents are cached per depth for the dumper's lifetime. The cache is never
/// trimmed; real trees are a handful of levels deep.
#[derive(Debug, Default)]
pub struct GraphDumper {
    indents: HashMap<usize, String>,
}

impl GraphDumper {
    /// Create a dumper with an empty indent cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent for `depth`: `2 * depth` markers
    pub fn indent(&mut self, depth: usize) -> &str {
        self.indents
            .entry(depth)
            .or_insert_with(|| INDENT_MARKER.to_string().repeat(depth * 2))
            .as_str()
    }

    /// Number of cached indent strings
    pub fn cached_depths(&self) -> usize {
        self.indents.len()
    }

    /// Render a whole graph: metadata header, variables, then the task tree
    pub fn dump(&mut self, graph: &BehaviorGraph) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "\"{}\" has the following Behaviour Tree:", graph.owner);
        let _ = writeln!(out, "Name: {}", graph.name);
        let _ = writeln!(out, "Description: {}", graph.description);
        let _ = writeln!(
            out,
            "ExternalBehaviour: {}",
            graph.external_behavior.as_deref().unwrap_or("<null>")
        );
        let _ = writeln!(out, "Variables ({}):", graph.variables.len());
        for variable in &graph.variables {
            let _ = writeln!(out, "- {} = {}", variable.name, variable.value);
        }

        if let Some(root) = &graph.root {
            self.write_node(root, 0, &mut out);
        }
        out
    }

    /// Render a subtree only
    pub fn dump_node(&mut self, node: &Node) -> String {
        let mut out = String::new();
        self.write_node(node, 0, &mut out);
        out
    }

    fn write_node(&mut self, node: &Node, depth: usize, out: &mut String) {
        let indent = self.indent(depth);
        let _ = writeln!(out, "{}{} [{}]", indent, node.name, node.full_type_name);

        for child in node.children() {
            self.write_node(child, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Variable;
    use crate::host::Value;
    use pretty_assertions::assert_eq;

    fn sample_graph() -> BehaviorGraph {
        BehaviorGraph {
            owner: "Guard".to_string(),
            name: "Patrol".to_string(),
            description: "Walks the wall".to_string(),
            external_behavior: None,
            variables: vec![
                Variable {
                    name: "Speed".to_string(),
                    value: Value::Float(2.5),
                },
                Variable {
                    name: "Target".to_string(),
                    value: Value::Null,
                },
            ],
            root: Some(Node::composite(
                "Entry",
                "Tasks.Sequence",
                vec![
                    Node::leaf("Wait", "Tasks.Wait"),
                    Node::composite(
                        "Check",
                        "Tasks.Selector",
                        vec![Node::leaf("Look", "Tasks.Look"), Node::leaf("Move", "Tasks.Move")],
                    ),
                    Node::leaf("Idle", "Tasks.Idle"),
                ],
            )),
        }
    }

    #[test]
    fn test_dump_graph() {
        let mut dumper = GraphDumper::new();
        let text = dumper.dump(&sample_graph());

        let expected = "\
\"Guard\" has the following Behaviour Tree:
Name: Patrol
Description: Walks the wall
ExternalBehaviour: <null>
Variables (2):
- Speed = 2.5
- Target = <null>
Entry [Tasks.Sequence]
--Wait [Tasks.Wait]
--Check [Tasks.Selector]
----Look [Tasks.Look]
----Move [Tasks.Move]
--Idle [Tasks.Idle]
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_indent_cache() {
        let mut dumper = GraphDumper::new();
        assert_eq!(dumper.indent(0), "");
        assert_eq!(dumper.indent(3), "------");

        dumper.dump(&sample_graph());
        dumper.dump(&sample_graph());
        // depths 0, 1, 2 and the explicit 3
        assert_eq!(dumper.cached_depths(), 4);
    }

    #[test]
    fn test_dump_without_root() {
        let mut graph = sample_graph();
        graph.root = None;
        graph.variables.clear();
        graph.external_behavior = Some("Guards.SharedPatrol".to_string());

        let text = GraphDumper::new().dump(&graph);
        assert!(text.ends_with("ExternalBehaviour: Guards.SharedPatrol\nVariables (0):\n"));
    }

    #[test]
    fn test_dump_node() {
        let node = Node::composite("Seq", "Tasks.Sequence", vec![Node::leaf("A", "Tasks.Log")]);
        assert_eq!(
            GraphDumper::new().dump_node(&node),
            "Seq [Tasks.Sequence]\n--A [Tasks.Log]\n"
        );
    }
}
