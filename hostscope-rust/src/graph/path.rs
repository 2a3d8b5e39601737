//! Index-path addressing into a behavior graph
//!
//! A path such as `[1, 0, 2]` selects `children[1]` of the root, then
//! `children[0]` of that node, then `children[2]`. The empty path is the root.
//! Failures carry the chain of nodes actually visited, since the graph belongs
//! to a plugin and cannot be inspected after the fact.

use super::{Node, NodeKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between visited nodes in a path description
const SEGMENT_SEPARATOR: &str = " => ";

/// Traversal errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// A leaf was reached before the path was exhausted
    #[error("Task at depth {depth} is not traversable - Path: {path}")]
    NotTraversable {
        /// Depth of the leaf
        depth: usize,
        /// Visited nodes, root first
        path: String,
    },

    /// The index at some depth does not address a child
    #[error("Invalid path index {index} at depth {depth} (children: {child_count}) - Path: {path}")]
    IndexOutOfRange {
        /// Depth of the node whose children were indexed
        depth: usize,
        /// The rejected index
        index: usize,
        /// Children available at that depth
        child_count: usize,
        /// Visited nodes, root first
        path: String,
    },

    /// The graph has no root task
    #[error("Root task is missing")]
    MissingRoot,

    /// Path text could not be parsed
    #[error("Invalid task path '{0}'")]
    Syntax(String),
}

impl PathError {
    /// Depth the walk failed at, if it got that far
    pub fn depth(&self) -> Option<usize> {
        match self {
            Self::NotTraversable { depth, .. } | Self::IndexOutOfRange { depth, .. } => Some(*depth),
            _ => None,
        }
    }

    /// Description of the visited nodes, if any were visited
    pub fn visited(&self) -> Option<&str> {
        match self {
            Self::NotTraversable { path, .. } | Self::IndexOutOfRange { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Ordered child indices from the root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskPath(Vec<usize>);

impl TaskPath {
    /// Create a path from indices
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// The empty path, addressing the root
    pub fn root() -> Self {
        Self::default()
    }

    /// Indices, root first
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this addresses the root
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<usize>> for TaskPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl From<&[usize]> for TaskPath {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", index)?;
        }
        f.write_str("]")
    }
}

/// Accepts `1,0,2`, `[1, 0, 2]`, `1 0 2` and the empty string
impl FromStr for TaskPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim();
        let inner = inner
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(inner);

        let parse = |part: &str| part.parse::<usize>().map_err(|_| PathError::Syntax(s.to_string()));

        // Commas separate indices strictly: an empty segment is a typo, not a skip
        if inner.contains(',') {
            inner.split(',').map(|part| parse(part.trim())).collect::<Result<Vec<_>, _>>().map(Self)
        } else {
            inner.split_whitespace().map(parse).collect::<Result<Vec<_>, _>>().map(Self)
        }
    }
}

fn describe(visited: &[&Node]) -> String {
    visited
        .iter()
        .map(|node| node.to_string())
        .collect::<Vec<_>>()
        .join(SEGMENT_SEPARATOR)
}

/// Walk `path` down from `root`
///
/// Depth is bounded by the path length, so the walk terminates even on a
/// malformed graph.
pub fn resolve<'a>(root: &'a Node, path: &TaskPath) -> Result<&'a Node, PathError> {
    let mut visited = vec![root];
    let mut current = root;

    for (depth, &index) in path.indices().iter().enumerate() {
        let children = match &current.kind {
            NodeKind::Composite(children) => children,
            NodeKind::Leaf => {
                return Err(PathError::NotTraversable {
                    depth,
                    path: describe(&visited),
                })
            }
        };

        current = children.get(index).ok_or_else(|| PathError::IndexOutOfRange {
            depth,
            index,
            child_count: children.len(),
            path: describe(&visited),
        })?;
        visited.push(current);
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root[Root] with children [LeafA, CompositeB[LeafC, LeafD]]
    fn sample() -> Node {
        Node::composite(
            "root",
            "Root",
            vec![
                Node::leaf("LeafA", "Leaf"),
                Node::composite(
                    "CompositeB",
                    "Composite",
                    vec![Node::leaf("LeafC", "Leaf"), Node::leaf("LeafD", "Leaf")],
                ),
            ],
        )
    }

    #[test]
    fn test_empty_path_is_root() {
        let root = sample();
        assert_eq!(resolve(&root, &TaskPath::root()).unwrap().name, "root");
    }

    #[test]
    fn test_resolve_valid_paths() {
        let root = sample();
        let cases: [(&[usize], &str); 4] = [
            (&[0], "LeafA"),
            (&[1], "CompositeB"),
            (&[1, 0], "LeafC"),
            (&[1, 1], "LeafD"),
        ];
        for (path, expected) in cases {
            let node = resolve(&root, &TaskPath::from(path)).unwrap();
            assert_eq!(node.name, expected, "path {:?}", path);
        }
    }

    #[test]
    fn test_index_out_of_range_reports_visited_nodes() {
        let root = sample();
        let err = resolve(&root, &TaskPath::new(vec![1, 2])).unwrap_err();

        assert_eq!(
            err,
            PathError::IndexOutOfRange {
                depth: 1,
                index: 2,
                child_count: 2,
                path: "root[Root] => CompositeB[Composite]".to_string(),
            }
        );
        // depth + 1 segments
        assert_eq!(err.visited().unwrap().split(SEGMENT_SEPARATOR).count(), 2);
    }

    #[test]
    fn test_index_out_of_range_at_root() {
        let root = sample();
        let err = resolve(&root, &TaskPath::new(vec![5])).unwrap_err();

        assert_eq!(err.depth(), Some(0));
        assert_eq!(err.visited(), Some("root[Root]"));
    }

    #[test]
    fn test_leaf_is_not_traversable() {
        let root = sample();
        let err = resolve(&root, &TaskPath::new(vec![0, 0])).unwrap_err();

        assert_eq!(
            err,
            PathError::NotTraversable {
                depth: 1,
                path: "root[Root] => LeafA[Leaf]".to_string(),
            }
        );
    }

    #[test]
    fn test_leaf_deeper_in_path() {
        let root = sample();
        let err = resolve(&root, &TaskPath::new(vec![1, 0, 3, 3])).unwrap_err();

        assert_eq!(err.depth(), Some(2));
        assert_eq!(
            err.visited(),
            Some("root[Root] => CompositeB[Composite] => LeafC[Leaf]")
        );
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!("1,0,2".parse::<TaskPath>().unwrap(), TaskPath::new(vec![1, 0, 2]));
        assert_eq!("[1, 0, 2]".parse::<TaskPath>().unwrap(), TaskPath::new(vec![1, 0, 2]));
        assert_eq!(" 3 4 ".parse::<TaskPath>().unwrap(), TaskPath::new(vec![3, 4]));
        assert_eq!("".parse::<TaskPath>().unwrap(), TaskPath::root());
        assert_eq!("[]".parse::<TaskPath>().unwrap(), TaskPath::root());

        assert!(matches!("1,-1".parse::<TaskPath>(), Err(PathError::Syntax(_))));
        assert!(matches!("a".parse::<TaskPath>(), Err(PathError::Syntax(_))));
        assert!(matches!("1,,2".parse::<TaskPath>(), Err(PathError::Syntax(_))));
        assert!(matches!("[1, 2,]".parse::<TaskPath>(), Err(PathError::Syntax(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(TaskPath::new(vec![1, 0]).to_string(), "[1, 0]");
        assert_eq!(TaskPath::root().to_string(), "[]");
    }

    #[test]
    fn test_serde_is_plain_array() {
        let path: TaskPath = serde_json::from_str("[2, 1]").unwrap();
        assert_eq!(path.indices(), &[2, 1]);
        assert_eq!(serde_json::to_string(&path).unwrap(), "[2,1]");
    }
}
