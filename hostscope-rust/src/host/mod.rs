//! Host capability layer
//!
//! This module describes everything the core needs from the inspected process:
//! - Type lookup and declared member enumeration
//! - Field reads/writes and method invocation on opaque object references
//! - Scene, behavior tree and FSM enumeration for the graph helpers
//!
//! The embedding hook implements [`HostRuntime`] and [`HostScene`]; nothing
//! else in the crate touches the host directly.

use std::fmt;
use std::sync::Arc;

pub mod value;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use value::{FromValue, IntoValue, Value};

/// Host capability errors
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// No type with this name is loaded in the host
    #[error("Type not found: {0}")]
    TypeNotFound(String),

    /// The reference does not point at a live object
    #[error("Invalid object reference: {0}")]
    InvalidObject(ObjectRef),

    /// The member handle is unknown to the host
    #[error("Invalid member handle: {0}")]
    InvalidMember(u64),

    /// The host raised while running a method
    #[error("Invocation of '{method}' failed: {reason}")]
    InvocationFailed {
        /// Method name
        method: String,
        /// Host-side failure description
        reason: String,
    },

    /// Host-specific error
    #[error("Host error: {0}")]
    Other(String),
}

/// Opaque reference to an object living in the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef(pub u64);

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:X}", self.0)
    }
}

/// Access category used to locate a member
///
/// Private covers protected members, public covers internal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Non-public instance members
    PrivateInstance,
    /// Non-public static members
    PrivateStatic,
    /// Public instance members
    PublicInstance,
    /// Public static members
    PublicStatic,
}

impl Visibility {
    /// Whether members of this class belong to the type rather than an instance
    #[inline]
    pub fn is_static(self) -> bool {
        matches!(self, Self::PrivateStatic | Self::PublicStatic)
    }

    /// Whether members of this class are public
    #[inline]
    pub fn is_public(self) -> bool {
        matches!(self, Self::PublicInstance | Self::PublicStatic)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PrivateInstance => "private instance",
            Self::PrivateStatic => "private static",
            Self::PublicInstance => "public instance",
            Self::PublicStatic => "public static",
        };
        f.write_str(name)
    }
}

/// Host-issued handle to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle(pub u64);

/// Host-issued handle to a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodHandle(pub u64);

/// A declared field
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Handle used for reads and writes
    pub handle: FieldHandle,
    /// Declared name
    pub name: String,
    /// Access category
    pub visibility: Visibility,
    /// Full name of the declared field type
    pub type_name: String,
}

/// A declared method
#[derive(Debug, Clone)]
pub struct MethodInfo {
    /// Handle used for invocation
    pub handle: MethodHandle,
    /// Declared name
    pub name: String,
    /// Access category
    pub visibility: Visibility,
    /// Number of generic parameters (0 for non-generic methods)
    pub generic_arity: usize,
    /// Full names of the parameter types, in declaration order
    pub parameter_types: Vec<String>,
    /// Full name of the return type
    pub return_type: String,
}

impl MethodInfo {
    /// Check name, generic arity and the ordered parameter types against a query
    pub fn matches(&self, query: &MethodQuery) -> bool {
        self.name == query.name
            && self.generic_arity == query.generic_arity
            && self.parameter_types == query.parameter_types
    }
}

/// Structural method signature used for lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodQuery {
    /// Method name
    pub name: String,
    /// Generic parameter count
    pub generic_arity: usize,
    /// Ordered parameter type names
    pub parameter_types: Vec<String>,
}

impl MethodQuery {
    /// A non-generic, parameterless method
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generic_arity: 0,
            parameter_types: Vec::new(),
        }
    }

    /// Set the generic parameter count
    pub fn generic_arity(mut self, arity: usize) -> Self {
        self.generic_arity = arity;
        self
    }

    /// Set the ordered parameter types
    pub fn parameters<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_types = types.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for MethodQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.generic_arity > 0 {
            write!(f, "`{}", self.generic_arity)?;
        }
        write!(f, "({})", self.parameter_types.join(", "))
    }
}

/// Reflection view of a host type
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// Namespace-qualified name, e.g. `BehaviorDesigner.Runtime.Tasks.InvokeMethod`
    pub full_name: String,
    /// Declared fields, in declaration order
    pub fields: Vec<FieldInfo>,
    /// Declared methods, in declaration order
    pub methods: Vec<MethodInfo>,
}

impl TypeInfo {
    /// Type name without its namespace
    pub fn name(&self) -> &str {
        self.full_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.full_name)
    }

    /// Find a field by exact name within one visibility class
    pub fn field(&self, name: &str, visibility: Visibility) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find(|f| f.visibility == visibility && f.name == name)
    }
}

/// Outcome of the host's arity-aware method lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodLookup {
    /// Exactly matched
    Found(MethodHandle),
    /// The host looked and found nothing
    Missing,
    /// The host has no arity-aware lookup; callers must scan declared methods
    Unsupported,
}

/// Core trait for reflecting over the host
///
/// Implementations are driven from the host's update thread only.
pub trait HostRuntime {
    /// Look up a loaded type by its full name
    fn find_type(&self, full_name: &str) -> Result<Arc<TypeInfo>, HostError>;

    /// Runtime type of an object
    fn type_of(&self, object: ObjectRef) -> Result<Arc<TypeInfo>, HostError>;

    /// Arity-aware method lookup
    ///
    /// The default reports the primitive as unavailable, which makes the
    /// resolver fall back to scanning [`TypeInfo::methods`].
    fn find_method(
        &self,
        owner: &TypeInfo,
        query: &MethodQuery,
        visibility: Visibility,
    ) -> Result<MethodLookup, HostError> {
        let _ = (owner, query, visibility);
        Ok(MethodLookup::Unsupported)
    }

    /// Read a field; `instance` is `None` for static fields
    fn get_field(&self, field: FieldHandle, instance: Option<ObjectRef>) -> Result<Value, HostError>;

    /// Write a field; `instance` is `None` for static fields
    fn set_field(
        &self,
        field: FieldHandle,
        instance: Option<ObjectRef>,
        value: Value,
    ) -> Result<(), HostError>;

    /// Invoke a method with positional arguments
    fn invoke(
        &self,
        method: MethodHandle,
        instance: Option<ObjectRef>,
        args: Vec<Value>,
    ) -> Result<Value, HostError>;

    /// Display name of a scene object
    fn object_name(&self, object: ObjectRef) -> Result<String, HostError>;
}

/// A behavior tree task as seen by the host
#[derive(Debug, Clone)]
pub struct TaskInfo {
    /// Friendly name shown in the plugin's editor
    pub display_name: String,
    /// Child tasks in storage order; `None` when the task is not a parent task
    pub children: Option<Vec<ObjectRef>>,
}

/// Behavior tree component attached to a scene object
#[derive(Debug, Clone, Default)]
pub struct TreeSource {
    /// Declared behavior name
    pub name: String,
    /// Declared behavior description
    pub description: String,
    /// Type of the bound external behavior asset, if any
    pub external_behavior: Option<String>,
    /// Shared variables and their current values
    pub variables: Vec<(String, Value)>,
    /// Root task; `None` when the tree has not been deserialized
    pub root: Option<ObjectRef>,
}

/// A state of a finite-state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsmState {
    /// State name
    pub name: String,
    /// The state's serialized action data object
    pub action_data: ObjectRef,
}

/// A finite-state machine component
#[derive(Debug, Clone, Default)]
pub struct FsmComponent {
    /// FSM name
    pub name: String,
    /// States in declaration order
    pub states: Vec<FsmState>,
}

/// Scene and plugin graph enumeration
pub trait HostScene: HostRuntime {
    /// Root objects of the active scene
    fn root_objects(&self) -> Result<Vec<ObjectRef>, HostError>;

    /// Direct children of a scene object, in transform order
    fn child_objects(&self, object: ObjectRef) -> Result<Vec<ObjectRef>, HostError>;

    /// Components attached to a scene object
    fn components(&self, object: ObjectRef) -> Result<Vec<ObjectRef>, HostError>;

    /// The behavior tree component of an object, if it has one
    fn behavior_tree(&self, object: ObjectRef) -> Result<Option<TreeSource>, HostError>;

    /// Name and children of a behavior tree task
    fn task_info(&self, task: ObjectRef) -> Result<TaskInfo, HostError>;

    /// FSM components of an object, in component order
    fn fsm_components(&self, object: ObjectRef) -> Result<Vec<FsmComponent>, HostError>;
}

impl fmt::Debug for dyn HostRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostRuntime").finish_non_exhaustive()
    }
}

impl fmt::Debug for dyn HostScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostScene").finish_non_exhaustive()
    }
}
