//! Parameter slots of the behavior tree `InvokeMethod` action
//!
//! The action has a fixed shape: three identity slots (target object,
//! component name, method name) and four positional parameter slots, each
//! holding a shared-variable object. Because that shape is a known contract,
//! all seven fields are resolved together in [`InvokeMethodSlots::bind`].

use super::{AccessorResolver, FieldAccessor, MethodAccessor};
use crate::host::{HostRuntime, ObjectRef, Value, Visibility};
use crate::{Error, Result};

/// Full name of the action type
pub const INVOKE_METHOD_TYPE: &str = "BehaviorDesigner.Runtime.Tasks.InvokeMethod";

/// Base type of the values stored in the slots
pub const SHARED_VARIABLE_TYPE: &str = "BehaviorDesigner.Runtime.SharedVariable";

/// Number of positional parameter slots
pub const MAX_PARAMETERS: usize = 4;

type Slot = FieldAccessor<Option<ObjectRef>>;

/// Eagerly resolved accessors for every slot of the action
#[derive(Debug, Clone)]
pub struct InvokeMethodSlots {
    target_game_object: Slot,
    component_name: Slot,
    method_name: Slot,
    parameters: [Slot; MAX_PARAMETERS],
}

impl InvokeMethodSlots {
    /// Resolve all seven slots, failing on the first missing one
    pub fn bind<H>(resolver: &mut AccessorResolver, host: &H) -> Result<Self>
    where
        H: HostRuntime + ?Sized,
    {
        let vis = Visibility::PublicInstance;
        let target_game_object = resolver.field(host, INVOKE_METHOD_TYPE, "targetGameObject", vis)?;
        let component_name = resolver.field(host, INVOKE_METHOD_TYPE, "componentName", vis)?;
        let method_name = resolver.field(host, INVOKE_METHOD_TYPE, "methodName", vis)?;

        let mut parameter = |slot: usize| -> Result<Slot> {
            resolver.field(host, INVOKE_METHOD_TYPE, &format!("parameter{}", slot + 1), vis)
        };
        let parameters = [parameter(0)?, parameter(1)?, parameter(2)?, parameter(3)?];

        Ok(Self {
            target_game_object,
            component_name,
            method_name,
            parameters,
        })
    }

    /// Proxy over one `InvokeMethod` task object
    pub fn task(&self, task: ObjectRef) -> InvokeMethodTask {
        InvokeMethodTask {
            slots: self.clone(),
            task,
        }
    }
}

/// Get/set view over a single `InvokeMethod` task
#[derive(Debug, Clone)]
pub struct InvokeMethodTask {
    slots: InvokeMethodSlots,
    task: ObjectRef,
}

impl InvokeMethodTask {
    /// The wrapped task object
    pub fn object(&self) -> ObjectRef {
        self.task
    }

    /// Shared variable holding the target game object
    pub fn target_game_object<H: HostRuntime + ?Sized>(&self, host: &H) -> Result<Option<ObjectRef>> {
        self.slots.target_game_object.get(host, Some(self.task))
    }

    /// Replace the target game object variable
    pub fn set_target_game_object<H: HostRuntime + ?Sized>(
        &self,
        host: &H,
        value: Option<ObjectRef>,
    ) -> Result<()> {
        self.slots.target_game_object.set(host, Some(self.task), value)
    }

    /// Shared variable holding the component name
    pub fn component_name<H: HostRuntime + ?Sized>(&self, host: &H) -> Result<Option<ObjectRef>> {
        self.slots.component_name.get(host, Some(self.task))
    }

    /// Replace the component name variable
    pub fn set_component_name<H: HostRuntime + ?Sized>(
        &self,
        host: &H,
        value: Option<ObjectRef>,
    ) -> Result<()> {
        self.slots.component_name.set(host, Some(self.task), value)
    }

    /// Shared variable holding the method name
    pub fn method_name<H: HostRuntime + ?Sized>(&self, host: &H) -> Result<Option<ObjectRef>> {
        self.slots.method_name.get(host, Some(self.task))
    }

    /// Replace the method name variable
    pub fn set_method_name<H: HostRuntime + ?Sized>(&self, host: &H, value: Option<ObjectRef>) -> Result<()> {
        self.slots.method_name.set(host, Some(self.task), value)
    }

    /// Parameter slot `index` (0-based)
    pub fn parameter<H: HostRuntime + ?Sized>(&self, host: &H, index: usize) -> Result<Option<ObjectRef>> {
        self.slot(index)?.get(host, Some(self.task))
    }

    /// Replace parameter slot `index` (0-based)
    pub fn set_parameter<H: HostRuntime + ?Sized>(
        &self,
        host: &H,
        index: usize,
        value: Option<ObjectRef>,
    ) -> Result<()> {
        self.slot(index)?.set(host, Some(self.task), value)
    }

    fn slot(&self, index: usize) -> Result<&Slot> {
        self.slots.parameters.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: MAX_PARAMETERS,
        })
    }

    /// Render every slot as dump lines
    ///
    /// `read_value` reads the current value out of a shared variable.
    pub fn describe<H: HostRuntime + ?Sized>(
        &self,
        host: &H,
        read_value: &MethodAccessor<Value>,
    ) -> Result<Vec<String>> {
        let value_of = |variable: Option<ObjectRef>| -> Result<Value> {
            match variable {
                Some(v) => read_value.invoke(host, Some(v), Vec::new()),
                None => Ok(Value::Null),
            }
        };

        let target = match value_of(self.target_game_object(host)?)? {
            Value::Object(object) => host.object_name(object)?,
            other => other.to_string(),
        };

        let mut lines = vec![
            "=== InvokeMethod Dump ===".to_string(),
            format!("Target GameObject: {}", target),
            format!("Component Name: {}", value_of(self.component_name(host)?)?),
            format!("Method Name: {}", value_of(self.method_name(host)?)?),
        ];
        for index in 0..MAX_PARAMETERS {
            let value = value_of(self.parameter(host, index)?)?;
            lines.push(format!("Parameter {} = {}", index + 1, value));
        }
        lines.push("============================".to_string());

        Ok(lines)
    }
}
