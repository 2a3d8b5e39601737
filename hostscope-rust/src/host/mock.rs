//! Mock host for testing
//!
//! This module provides an in-memory implementation of the host traits
//! that can be used to exercise the core without a live process.

use super::{
    FieldHandle, FieldInfo, FsmComponent, HostError, HostRuntime, HostScene, MethodHandle,
    MethodInfo, MethodLookup, MethodQuery, ObjectRef, TaskInfo, TreeSource, TypeInfo, Value,
    Visibility,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Behaviour of a mock method
#[derive(Clone)]
pub enum MethodBody {
    /// Return the named field of the receiver
    ReadsField(String),
    /// Compute the result from the arguments
    Computes(Arc<dyn Fn(&[Value]) -> Value + Send + Sync>),
}

/// Declarative type definition registered with [`MockHost::add_type`]
#[derive(Clone)]
pub struct MockType {
    full_name: String,
    fields: Vec<(String, Visibility, String)>,
    methods: Vec<(MethodQuery, Visibility, String, MethodBody)>,
}

impl MockType {
    /// Start a type definition
    pub fn new(full_name: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Declare a field
    pub fn field(mut self, name: &str, visibility: Visibility, type_name: &str) -> Self {
        self.fields
            .push((name.to_string(), visibility, type_name.to_string()));
        self
    }

    /// Declare a method
    pub fn method(
        mut self,
        query: MethodQuery,
        visibility: Visibility,
        return_type: &str,
        body: MethodBody,
    ) -> Self {
        self.methods
            .push((query, visibility, return_type.to_string(), body));
        self
    }
}

#[derive(Default)]
struct MockObject {
    name: String,
    type_name: String,
    fields: HashMap<FieldHandle, Value>,
    children: Vec<ObjectRef>,
    components: Vec<ObjectRef>,
    task: Option<TaskInfo>,
    tree: Option<TreeSource>,
    fsms: Vec<FsmComponent>,
}

#[derive(Default)]
struct MockState {
    types: HashMap<String, Arc<TypeInfo>>,
    objects: HashMap<ObjectRef, MockObject>,
    statics: HashMap<FieldHandle, Value>,
    bodies: HashMap<MethodHandle, (String, usize, MethodBody)>,
    roots: Vec<ObjectRef>,
    next_handle: u64,
    next_object: u64,
}

impl MockState {
    fn object(&self, object: ObjectRef) -> Result<&MockObject, HostError> {
        self.objects
            .get(&object)
            .ok_or(HostError::InvalidObject(object))
    }

    fn object_mut(&mut self, object: ObjectRef) -> Result<&mut MockObject, HostError> {
        self.objects
            .get_mut(&object)
            .ok_or(HostError::InvalidObject(object))
    }

    fn field_by_name(&self, object: ObjectRef, name: &str) -> Option<FieldHandle> {
        let obj = self.objects.get(&object)?;
        let ty = self.types.get(&obj.type_name)?;
        ty.fields.iter().find(|f| f.name == name).map(|f| f.handle)
    }
}

/// Mock host implementation for testing
#[derive(Clone, Default)]
pub struct MockHost {
    state: Arc<RwLock<MockState>>,
    arity_lookup: bool,
    type_lookups: Arc<AtomicUsize>,
}

impl MockHost {
    /// Create an empty mock host without an arity-aware method lookup
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the host-side arity-aware method lookup
    pub fn with_arity_lookup(mut self, enabled: bool) -> Self {
        self.arity_lookup = enabled;
        self
    }

    /// Number of `find_type` calls served so far
    pub fn type_lookups(&self) -> usize {
        self.type_lookups.load(Ordering::Relaxed)
    }

    /// Register a type, assigning member handles in declaration order
    pub fn add_type(&self, def: MockType) -> Arc<TypeInfo> {
        let mut state = self.state.write();

        let mut fields = Vec::new();
        for (name, visibility, type_name) in def.fields {
            state.next_handle += 1;
            fields.push(FieldInfo {
                handle: FieldHandle(state.next_handle),
                name,
                visibility,
                type_name,
            });
        }

        let mut methods = Vec::new();
        for (query, visibility, return_type, body) in def.methods {
            state.next_handle += 1;
            let handle = MethodHandle(state.next_handle);
            state.bodies.insert(
                handle,
                (query.name.clone(), query.parameter_types.len(), body),
            );
            methods.push(MethodInfo {
                handle,
                name: query.name,
                visibility,
                generic_arity: query.generic_arity,
                parameter_types: query.parameter_types,
                return_type,
            });
        }

        let info = Arc::new(TypeInfo {
            full_name: def.full_name.clone(),
            fields,
            methods,
        });
        state.types.insert(def.full_name, Arc::clone(&info));
        info
    }

    /// Create an object of a registered (or ad-hoc) type
    pub fn spawn(&self, type_name: &str, name: &str) -> ObjectRef {
        let mut state = self.state.write();
        state.next_object += 1;
        let object = ObjectRef(0x1000 + state.next_object);
        state.objects.insert(
            object,
            MockObject {
                name: name.to_string(),
                type_name: type_name.to_string(),
                ..Default::default()
            },
        );
        object
    }

    /// Write a field by name, bypassing visibility
    pub fn write_field(&self, object: ObjectRef, name: &str, value: Value) {
        let mut state = self.state.write();
        if let Some(handle) = state.field_by_name(object, name) {
            if let Some(obj) = state.objects.get_mut(&object) {
                obj.fields.insert(handle, value);
            }
        }
    }

    /// Read a field by name, bypassing visibility
    pub fn read_field(&self, object: ObjectRef, name: &str) -> Value {
        let state = self.state.read();
        state
            .field_by_name(object, name)
            .and_then(|handle| state.objects.get(&object)?.fields.get(&handle).cloned())
            .unwrap_or_default()
    }

    /// Mark an object as a scene root
    pub fn add_root(&self, object: ObjectRef) {
        self.state.write().roots.push(object);
    }

    /// Parent `child` under `parent` in the scene hierarchy
    pub fn add_child(&self, parent: ObjectRef, child: ObjectRef) {
        if let Some(obj) = self.state.write().objects.get_mut(&parent) {
            obj.children.push(child);
        }
    }

    /// Attach a component object
    pub fn add_component(&self, object: ObjectRef, component: ObjectRef) {
        if let Some(obj) = self.state.write().objects.get_mut(&object) {
            obj.components.push(component);
        }
    }

    /// Describe an object as a behavior tree task
    pub fn set_task(&self, task: ObjectRef, display_name: &str, children: Option<Vec<ObjectRef>>) {
        if let Some(obj) = self.state.write().objects.get_mut(&task) {
            obj.task = Some(TaskInfo {
                display_name: display_name.to_string(),
                children,
            });
        }
    }

    /// Attach a behavior tree component
    pub fn set_tree(&self, object: ObjectRef, tree: TreeSource) {
        if let Some(obj) = self.state.write().objects.get_mut(&object) {
            obj.tree = Some(tree);
        }
    }

    /// Attach an FSM component
    pub fn add_fsm(&self, object: ObjectRef, fsm: FsmComponent) {
        if let Some(obj) = self.state.write().objects.get_mut(&object) {
            obj.fsms.push(fsm);
        }
    }

    /// Create a mock host with a small behavior tree on a "Guard" object
    ///
    /// ```text
    /// root [Root]
    /// --LeafA [Leaf]
    /// --CompositeB [Composite]
    /// ----LeafC [Leaf]
    /// ----LeafD [Leaf]
    /// ```
    pub fn with_sample_tree() -> (Self, ObjectRef) {
        let host = Self::new();
        for name in ["Root", "Composite", "Leaf"] {
            host.add_type(MockType::new(&format!("BehaviorDesigner.Runtime.Tasks.{}", name)));
        }
        let task = |ty: &str, name: &str| {
            host.spawn(&format!("BehaviorDesigner.Runtime.Tasks.{}", ty), name)
        };

        let leaf_a = task("Leaf", "LeafA");
        let leaf_c = task("Leaf", "LeafC");
        let leaf_d = task("Leaf", "LeafD");
        let composite_b = task("Composite", "CompositeB");
        let root = task("Root", "root");

        host.set_task(leaf_a, "LeafA", None);
        host.set_task(leaf_c, "LeafC", None);
        host.set_task(leaf_d, "LeafD", None);
        host.set_task(composite_b, "CompositeB", Some(vec![leaf_c, leaf_d]));
        host.set_task(root, "root", Some(vec![leaf_a, composite_b]));

        let guard = host.spawn("UnityEngine.GameObject", "Guard");
        host.add_root(guard);
        host.set_tree(
            guard,
            TreeSource {
                name: "Patrol".to_string(),
                description: "Walks the wall".to_string(),
                external_behavior: None,
                variables: vec![
                    ("Speed".to_string(), Value::Float(2.5)),
                    ("Target".to_string(), Value::Null),
                ],
                root: Some(root),
            },
        );

        (host, guard)
    }
}

impl HostRuntime for MockHost {
    fn find_type(&self, full_name: &str) -> Result<Arc<TypeInfo>, HostError> {
        self.type_lookups.fetch_add(1, Ordering::Relaxed);
        self.state
            .read()
            .types
            .get(full_name)
            .cloned()
            .ok_or_else(|| HostError::TypeNotFound(full_name.to_string()))
    }

    fn type_of(&self, object: ObjectRef) -> Result<Arc<TypeInfo>, HostError> {
        let state = self.state.read();
        let obj = state.object(object)?;
        Ok(state.types.get(&obj.type_name).cloned().unwrap_or_else(|| {
            Arc::new(TypeInfo {
                full_name: obj.type_name.clone(),
                fields: Vec::new(),
                methods: Vec::new(),
            })
        }))
    }

    fn find_method(
        &self,
        owner: &TypeInfo,
        query: &MethodQuery,
        visibility: Visibility,
    ) -> Result<MethodLookup, HostError> {
        if !self.arity_lookup {
            return Ok(MethodLookup::Unsupported);
        }

        Ok(owner
            .methods
            .iter()
            .find(|m| m.visibility == visibility && m.matches(query))
            .map_or(MethodLookup::Missing, |m| MethodLookup::Found(m.handle)))
    }

    fn get_field(&self, field: FieldHandle, instance: Option<ObjectRef>) -> Result<Value, HostError> {
        let state = self.state.read();
        match instance {
            Some(object) => Ok(state.object(object)?.fields.get(&field).cloned().unwrap_or_default()),
            None => Ok(state.statics.get(&field).cloned().unwrap_or_default()),
        }
    }

    fn set_field(
        &self,
        field: FieldHandle,
        instance: Option<ObjectRef>,
        value: Value,
    ) -> Result<(), HostError> {
        let mut state = self.state.write();
        match instance {
            Some(object) => {
                state.object_mut(object)?.fields.insert(field, value);
            }
            None => {
                state.statics.insert(field, value);
            }
        }
        Ok(())
    }

    fn invoke(
        &self,
        method: MethodHandle,
        instance: Option<ObjectRef>,
        args: Vec<Value>,
    ) -> Result<Value, HostError> {
        let (name, arity, body) = self
            .state
            .read()
            .bodies
            .get(&method)
            .cloned()
            .ok_or(HostError::InvalidMember(method.0))?;

        if args.len() != arity {
            return Err(HostError::InvocationFailed {
                method: name,
                reason: format!("expected {} argument(s), got {}", arity, args.len()),
            });
        }

        match body {
            MethodBody::ReadsField(field) => {
                let object = instance.ok_or_else(|| HostError::InvocationFailed {
                    method: name,
                    reason: "no receiver".to_string(),
                })?;
                Ok(self.read_field(object, &field))
            }
            MethodBody::Computes(f) => Ok(f(&args)),
        }
    }

    fn object_name(&self, object: ObjectRef) -> Result<String, HostError> {
        Ok(self.state.read().object(object)?.name.clone())
    }
}

impl HostScene for MockHost {
    fn root_objects(&self) -> Result<Vec<ObjectRef>, HostError> {
        Ok(self.state.read().roots.clone())
    }

    fn child_objects(&self, object: ObjectRef) -> Result<Vec<ObjectRef>, HostError> {
        Ok(self.state.read().object(object)?.children.clone())
    }

    fn components(&self, object: ObjectRef) -> Result<Vec<ObjectRef>, HostError> {
        Ok(self.state.read().object(object)?.components.clone())
    }

    fn behavior_tree(&self, object: ObjectRef) -> Result<Option<TreeSource>, HostError> {
        Ok(self.state.read().object(object)?.tree.clone())
    }

    fn task_info(&self, task: ObjectRef) -> Result<TaskInfo, HostError> {
        let state = self.state.read();
        let obj = state.object(task)?;
        obj.task
            .clone()
            .ok_or_else(|| HostError::Other(format!("{} ({}) is not a task", obj.name, task)))
    }

    fn fsm_components(&self, object: ObjectRef) -> Result<Vec<FsmComponent>, HostError> {
        Ok(self.state.read().object(object)?.fsms.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_host_fields() {
        let host = MockHost::new();
        let ty = host.add_type(
            MockType::new("Game.Enemy").field("health", Visibility::PrivateInstance, "System.Int32"),
        );
        let enemy = host.spawn("Game.Enemy", "Enemy");

        let handle = ty.fields[0].handle;
        assert_eq!(host.get_field(handle, Some(enemy)).unwrap(), Value::Null);

        host.set_field(handle, Some(enemy), Value::Int(40)).unwrap();
        assert_eq!(host.read_field(enemy, "health"), Value::Int(40));
    }

    #[test]
    fn test_mock_host_statics_are_per_field() {
        let host = MockHost::new();
        let ty = host.add_type(
            MockType::new("Game.Settings")
                .field("difficulty", Visibility::PrivateStatic, "System.Int32")
                .field("volume", Visibility::PublicStatic, "System.Single"),
        );

        host.set_field(ty.fields[0].handle, None, Value::Int(3)).unwrap();
        assert_eq!(host.get_field(ty.fields[0].handle, None).unwrap(), Value::Int(3));
        assert_eq!(host.get_field(ty.fields[1].handle, None).unwrap(), Value::Null);
    }

    #[test]
    fn test_mock_host_invoke_checks_arity() {
        let host = MockHost::new();
        let ty = host.add_type(MockType::new("Game.Math").method(
            MethodQuery::new("Add").parameters(["System.Int32", "System.Int32"]),
            Visibility::PublicStatic,
            "System.Int32",
            MethodBody::Computes(Arc::new(|args| match (&args[0], &args[1]) {
                (Value::Int(a), Value::Int(b)) => Value::Int(a + b),
                _ => Value::Null,
            })),
        ));

        let add = ty.methods[0].handle;
        assert_eq!(
            host.invoke(add, None, vec![Value::Int(2), Value::Int(3)]).unwrap(),
            Value::Int(5)
        );
        assert!(matches!(
            host.invoke(add, None, vec![Value::Int(2)]),
            Err(HostError::InvocationFailed { .. })
        ));
    }

    #[test]
    fn test_mock_host_arity_lookup_toggle() {
        let host = MockHost::new();
        let ty = host.add_type(MockType::new("Game.Util").method(
            MethodQuery::new("Ping"),
            Visibility::PublicInstance,
            "System.Void",
            MethodBody::Computes(Arc::new(|_| Value::Null)),
        ));

        let query = MethodQuery::new("Ping");
        assert_eq!(
            host.find_method(&ty, &query, Visibility::PublicInstance).unwrap(),
            MethodLookup::Unsupported
        );

        let host = host.with_arity_lookup(true);
        assert_eq!(
            host.find_method(&ty, &query, Visibility::PublicInstance).unwrap(),
            MethodLookup::Found(ty.methods[0].handle)
        );
        assert_eq!(
            host.find_method(&ty, &query, Visibility::PrivateInstance).unwrap(),
            MethodLookup::Missing
        );
    }

    #[test]
    fn test_mock_host_with_sample_tree() {
        let (host, guard) = MockHost::with_sample_tree();

        assert_eq!(host.object_name(guard).unwrap(), "Guard");
        let tree = host.behavior_tree(guard).unwrap().unwrap();
        let root = tree.root.unwrap();

        let info = host.task_info(root).unwrap();
        assert_eq!(info.display_name, "root");
        assert_eq!(info.children.unwrap().len(), 2);
        assert_eq!(host.type_of(root).unwrap().name(), "Root");
    }

    #[test]
    fn test_invalid_object() {
        let host = MockHost::new();
        assert!(matches!(
            host.object_name(ObjectRef(0xDEAD)),
            Err(HostError::InvalidObject(ObjectRef(0xDEAD)))
        ));
    }
}
