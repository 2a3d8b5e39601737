//! Finite-state machine helpers
//!
//! FSM actions keep the game objects they reference in a private list on the
//! state's action data. [`FsmBindings`] resolves the two private fields needed
//! to read that list once, up front.

use crate::host::{FsmComponent, FsmState, HostRuntime, ObjectRef, Visibility};
use crate::reflection::{AccessorResolver, FieldAccessor};
use crate::Result;
use std::fmt::Write;

/// Serialized action data attached to every state
pub const ACTION_DATA_TYPE: &str = "HutongGames.PlayMaker.ActionData";

/// Wrapper around a game object parameter
pub const FSM_GAME_OBJECT_TYPE: &str = "HutongGames.PlayMaker.FsmGameObject";

/// Accessors for the game object parameters of FSM actions
#[derive(Debug, Clone)]
pub struct FsmBindings {
    game_object_params: FieldAccessor<Option<Vec<Option<ObjectRef>>>>,
    value: FieldAccessor<Option<ObjectRef>>,
}

impl FsmBindings {
    /// Resolve both fields, failing on the first missing one
    pub fn bind<H>(resolver: &mut AccessorResolver, host: &H) -> Result<Self>
    where
        H: HostRuntime + ?Sized,
    {
        Ok(Self {
            game_object_params: resolver.field(
                host,
                ACTION_DATA_TYPE,
                "fsmGameObjectParams",
                Visibility::PrivateInstance,
            )?,
            value: resolver.field(host, FSM_GAME_OBJECT_TYPE, "value", Visibility::PrivateInstance)?,
        })
    }

    /// Non-null game objects referenced by the actions of `state`, in parameter order
    pub fn state_objects<H>(&self, host: &H, state: &FsmState) -> Result<Vec<ObjectRef>>
    where
        H: HostRuntime + ?Sized,
    {
        let params = self
            .game_object_params
            .get(host, Some(state.action_data))?
            .unwrap_or_default();

        let mut objects = Vec::new();
        for param in params.into_iter().flatten() {
            if let Some(object) = self.value.get(host, Some(param))? {
                objects.push(object);
            }
        }
        Ok(objects)
    }
}

/// First state of `component` named `name`
pub fn find_state<'a>(component: &'a FsmComponent, name: &str) -> Option<&'a FsmState> {
    component.states.iter().find(|state| state.name == name)
}

/// List the states of every FSM component on `owner`
pub fn render_states(owner: &str, components: &[FsmComponent]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\"{}\" has the following FSMs:", owner);

    for (index, component) in components.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "=> PlayMakerFSM[{}]:", index);
        for state in &component.states {
            let _ = writeln!(out, "- {}", state.name);
        }
    }
    out
}
