//! Behavior graph layer
//!
//! Plugin graphs live inside the host and are only reachable through
//! [`HostScene`]. This module captures them into an owned tree so that path
//! resolution and dumping never need to check node kinds at run time:
//! - [`Node`] / [`NodeKind`]: tagged leaf/composite tree in storage order
//! - [`path`]: index-path addressing with contextual failures
//! - [`dump`]: indented text rendering
//! - [`fsm`]: finite-state machine helpers

use crate::host::{HostScene, ObjectRef, Value};
use crate::Result;
use std::fmt;

pub mod dump;
pub mod fsm;
pub mod path;

pub use dump::GraphDumper;
pub use path::{resolve, PathError, TaskPath};

/// A node of a behavior graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Display name
    pub name: String,
    /// Runtime type name without namespace
    pub type_name: String,
    /// Namespace-qualified runtime type name
    pub full_type_name: String,
    /// Backing host object, when captured from a live host
    pub object: Option<ObjectRef>,
    /// Leaf or composite
    pub kind: NodeKind,
}

/// Shape of a [`Node`]
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// No children
    Leaf,
    /// Ordered children, in declared storage order
    Composite(Vec<Node>),
}

fn short_name(full_type_name: &str) -> String {
    full_type_name
        .rsplit('.')
        .next()
        .unwrap_or(full_type_name)
        .to_string()
}

impl Node {
    /// Create a leaf node
    pub fn leaf(name: impl Into<String>, full_type_name: &str) -> Self {
        Self {
            name: name.into(),
            type_name: short_name(full_type_name),
            full_type_name: full_type_name.to_string(),
            object: None,
            kind: NodeKind::Leaf,
        }
    }

    /// Create a composite node
    pub fn composite(name: impl Into<String>, full_type_name: &str, children: Vec<Node>) -> Self {
        Self {
            kind: NodeKind::Composite(children),
            ..Self::leaf(name, full_type_name)
        }
    }

    /// Attach the backing host object
    pub fn with_object(mut self, object: ObjectRef) -> Self {
        self.object = Some(object);
        self
    }

    /// Children in storage order; empty for leaves
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Composite(children) => children,
            NodeKind::Leaf => &[],
        }
    }

    /// Whether the node can be descended into
    #[inline]
    pub fn is_composite(&self) -> bool {
        matches!(self.kind, NodeKind::Composite(_))
    }

    /// Capture a task and its subtree from the host
    pub fn capture<H: HostScene + ?Sized>(host: &H, task: ObjectRef) -> Result<Self> {
        let mut ancestors = Vec::new();
        capture_task(host, task, &mut ancestors)
    }
}

/// `name[Type]`, the segment format used in path descriptions
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.type_name)
    }
}

fn capture_task<H: HostScene + ?Sized>(host: &H, task: ObjectRef, ancestors: &mut Vec<ObjectRef>) -> Result<Node> {
    // A task that contains itself would recurse until the host's stack is gone
    if ancestors.contains(&task) {
        return Err(crate::host::HostError::Other(format!("task {} is its own ancestor", task)).into());
    }

    let info = host.task_info(task)?;
    let ty = host.type_of(task)?;

    let node = match info.children {
        Some(children) => {
            ancestors.push(task);
            let captured = children
                .into_iter()
                .map(|child| capture_task(host, child, ancestors))
                .collect::<Result<Vec<_>>>();
            ancestors.pop();
            Node::composite(info.display_name, &ty.full_name, captured?)
        }
        None => Node::leaf(info.display_name, &ty.full_name),
    };

    Ok(node.with_object(task))
}

/// An externally bound graph variable
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Variable name
    pub name: String,
    /// Value at capture time
    pub value: Value,
}

/// A behavior tree with its declared metadata
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorGraph {
    /// Name of the scene object owning the tree
    pub owner: String,
    /// Declared behavior name
    pub name: String,
    /// Declared description
    pub description: String,
    /// Type of the bound external behavior, if any
    pub external_behavior: Option<String>,
    /// Variable table
    pub variables: Vec<Variable>,
    /// Root task; absent when the plugin has not deserialized the tree
    pub root: Option<Node>,
}

impl BehaviorGraph {
    /// Capture the behavior tree attached to `game_object`
    ///
    /// Returns `None` when the object has no behavior tree component.
    pub fn capture<H: HostScene + ?Sized>(host: &H, game_object: ObjectRef) -> Result<Option<Self>> {
        let Some(source) = host.behavior_tree(game_object)? else {
            return Ok(None);
        };

        let root = match source.root {
            Some(task) => Some(Node::capture(host, task)?),
            None => None,
        };

        Ok(Some(Self {
            owner: host.object_name(game_object)?,
            name: source.name,
            description: source.description,
            external_behavior: source.external_behavior,
            variables: source
                .variables
                .into_iter()
                .map(|(name, value)| Variable { name, value })
                .collect(),
            root,
        }))
    }
}
