//! Per-attachment context
//!
//! A [`Session`] is created when the hook attaches to the host and dropped
//! when it detaches. It owns every cache the core keeps (resolved accessors,
//! indent strings, log keys) so nothing lives in global state. All methods
//! run on the host's update thread.
//!
//! Error policy:
//! - accessor resolution failures are logged and returned as errors
//! - path failures are logged with the visited nodes and reported as `None`

use crate::config::Config;
use crate::diagnostics::DiagnosticSink;
use crate::graph::fsm::{self, FsmBindings};
use crate::graph::{self, BehaviorGraph, GraphDumper, Node, PathError, TaskPath};
use crate::host::{FsmComponent, FsmState, HostScene, MethodQuery, ObjectRef, Value, Visibility};
use crate::reflection::slots::SHARED_VARIABLE_TYPE;
use crate::reflection::{AccessorResolver, FieldAccessor, InvokeMethodSlots, InvokeMethodTask, MethodAccessor};
use crate::{scene, Error, Result};
use tracing::{info, warn};

/// Context owning the host handle and every process-lifetime cache
#[derive(Debug)]
pub struct Session<H> {
    host: H,
    config: Config,
    resolver: AccessorResolver,
    dumper: GraphDumper,
    sink: DiagnosticSink,
    invoke_slots: Option<InvokeMethodSlots>,
    shared_value: Option<MethodAccessor<Value>>,
    fsm: Option<FsmBindings>,
}

impl<H: HostScene> Session<H> {
    /// Attach to `host`, opening the log files named in `config`
    pub fn attach(host: H, config: Config) -> Result<Self> {
        let sink = DiagnosticSink::open(&config)?;
        info!(trace = %config.trace_path().display(), "attached");
        Ok(Self::with_sink(host, config, sink))
    }

    /// Attach with an already built sink
    pub fn with_sink(host: H, config: Config, sink: DiagnosticSink) -> Self {
        Self {
            host,
            config,
            resolver: AccessorResolver::new(),
            dumper: GraphDumper::new(),
            sink,
            invoke_slots: None,
            shared_value: None,
            fsm: None,
        }
    }

    /// Drop every cache and hand the host back
    pub fn detach(self) -> H {
        info!(members = self.resolver.len(), "detached");
        self.host
    }

    /// The host
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The diagnostic sink, for hook-specific lines
    pub fn sink(&mut self) -> &mut DiagnosticSink {
        &mut self.sink
    }

    /// Accessor cache
    pub fn resolver(&self) -> &AccessorResolver {
        &self.resolver
    }

    /// Cached field accessor
    pub fn field<T>(&mut self, owner: &str, name: &str, visibility: Visibility) -> Result<FieldAccessor<T>> {
        let result = self.resolver.field(&self.host, owner, name, visibility);
        self.report_resolution(result)
    }

    /// Cached method accessor
    pub fn method<R>(&mut self, owner: &str, query: MethodQuery, visibility: Visibility) -> Result<MethodAccessor<R>> {
        let result = self.resolver.method(&self.host, owner, query, visibility);
        self.report_resolution(result)
    }

    fn report_resolution<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            let message = format!("Error: {}", e);
            let cooldown = self.config.error_cooldown_secs;
            self.sink.log_with_cooldown(&message, &message, cooldown);
        }
        result
    }

    /// Log an error chain, at most once per cooldown window for `key`
    pub fn report_error(&mut self, error: impl Into<anyhow::Error>, key: &str) -> bool {
        let error = error.into();
        let cooldown = self.config.error_cooldown_secs;
        self.sink.log_error_with_cooldown(&error, key, cooldown)
    }

    /// Capture the behavior tree attached to `game_object`
    pub fn behavior_graph(&mut self, game_object: ObjectRef) -> Result<Option<BehaviorGraph>> {
        BehaviorGraph::capture(&self.host, game_object)
    }

    /// Resolve `path` in `graph`, logging failures and reporting them as `None`
    pub fn resolve_task<'g>(&mut self, graph: &'g BehaviorGraph, path: &TaskPath) -> Option<&'g Node> {
        let result = match &graph.root {
            Some(root) => graph::resolve(root, path),
            None => Err(PathError::MissingRoot),
        };

        match result {
            Ok(node) => Some(node),
            Err(e) => {
                warn!(owner = %graph.owner, %path, error = %e, "task path did not resolve");
                self.sink.log(&format!("Error: \"{}\" {}", graph.owner, e));
                None
            }
        }
    }

    /// Capture the tree of `game_object` and resolve `path` in it
    pub fn find_task(&mut self, game_object: ObjectRef, path: &TaskPath) -> Result<Option<Node>> {
        let Some(graph) = self.behavior_graph(game_object)? else {
            return Ok(None);
        };
        Ok(self.resolve_task(&graph, path).cloned())
    }

    /// [`Session::find_task`] with a path named in the configuration
    pub fn find_named_task(&mut self, game_object: ObjectRef, name: &str) -> Result<Option<Node>> {
        let path = self
            .config
            .path(name)
            .cloned()
            .ok_or_else(|| Error::Config(format!("no task path named '{}'", name)))?;
        self.find_task(game_object, &path)
    }

    /// Slot accessors for `InvokeMethod` tasks, bound on first use
    pub fn invoke_slots(&mut self) -> Result<&InvokeMethodSlots> {
        let slots = match self.invoke_slots.take() {
            Some(slots) => slots,
            None => {
                let result = InvokeMethodSlots::bind(&mut self.resolver, &self.host);
                self.report_resolution(result)?
            }
        };
        let slots: &InvokeMethodSlots = self.invoke_slots.insert(slots);
        Ok(slots)
    }

    /// Proxy for the `InvokeMethod` task at `path`
    pub fn invoke_method_task(&mut self, game_object: ObjectRef, path: &TaskPath) -> Result<Option<InvokeMethodTask>> {
        let Some(object) = self.find_task(game_object, path)?.and_then(|node| node.object) else {
            return Ok(None);
        };
        Ok(Some(self.invoke_slots()?.task(object)))
    }

    /// Log every slot of an `InvokeMethod` task
    pub fn dump_invoke_method(&mut self, task: &InvokeMethodTask) -> Result<()> {
        let read_value = match self.shared_value.take() {
            Some(accessor) => accessor,
            None => self.method(
                SHARED_VARIABLE_TYPE,
                MethodQuery::new("GetValue"),
                Visibility::PublicInstance,
            )?,
        };
        let lines = task.describe(&self.host, self.shared_value.insert(read_value))?;

        for line in lines {
            self.sink.log(&line);
        }
        Ok(())
    }

    /// Log the behavior tree of `game_object`, once per object name
    ///
    /// Returns whether anything was written.
    pub fn dump_behavior_tree(&mut self, game_object: ObjectRef) -> Result<bool> {
        let Some(graph) = self.behavior_graph(game_object)? else {
            return Ok(false);
        };
        let text = self.dumper.dump(&graph);
        Ok(self.sink.log_once(&text, &format!("{}_behaviourTree", graph.owner)))
    }

    fn fsm_bindings(&mut self) -> Result<&FsmBindings> {
        let bindings = match self.fsm.take() {
            Some(bindings) => bindings,
            None => {
                let result = FsmBindings::bind(&mut self.resolver, &self.host);
                self.report_resolution(result)?
            }
        };
        let bindings: &FsmBindings = self.fsm.insert(bindings);
        Ok(bindings)
    }

    /// FSM component `fsm_index` of `game_object`; out of range is logged and `None`
    fn select_fsm(&mut self, game_object: ObjectRef, fsm_index: usize) -> Result<Option<FsmComponent>> {
        let mut components = self.host.fsm_components(game_object)?;
        if fsm_index >= components.len() {
            let name = self.host.object_name(game_object)?;
            let message = format!(
                "[ERROR] \"{}\": fsm_index ({}) out of range. (Total: {}).",
                name,
                fsm_index,
                components.len()
            );
            let cooldown = self.config.fsm_index_cooldown_secs;
            self.sink
                .log_with_cooldown(&message, &format!("{}_{}", name, fsm_index), cooldown);
            return Ok(None);
        }
        Ok(Some(components.swap_remove(fsm_index)))
    }

    /// Visit every game object referenced by the states of one FSM component
    pub fn fsm_objects<F>(&mut self, game_object: ObjectRef, fsm_index: usize, mut callback: F) -> Result<()>
    where
        F: FnMut(&FsmState, ObjectRef),
    {
        let Some(component) = self.select_fsm(game_object, fsm_index)? else {
            return Ok(());
        };
        let bindings = self.fsm_bindings()?.clone();

        for state in &component.states {
            for object in bindings.state_objects(&self.host, state)? {
                callback(state, object);
            }
        }
        Ok(())
    }

    /// State `name` of FSM component `fsm_index`
    pub fn find_fsm_state(&mut self, game_object: ObjectRef, fsm_index: usize, name: &str) -> Result<Option<FsmState>> {
        Ok(self
            .select_fsm(game_object, fsm_index)?
            .and_then(|component| fsm::find_state(&component, name).cloned()))
    }

    /// Log the states of every FSM on `game_object`, once per object name
    pub fn dump_fsm_states(&mut self, game_object: ObjectRef) -> Result<bool> {
        let name = self.host.object_name(game_object)?;
        let components = self.host.fsm_components(game_object)?;
        let text = fsm::render_states(&name, &components);
        Ok(self.sink.log_once(&text, &format!("{}_states", name)))
    }

    /// Log the component types of `object`
    pub fn log_components(&mut self, object: ObjectRef) -> Result<()> {
        let text = scene::describe_components(&self.host, object)?;
        self.sink.log(&text);
        Ok(())
    }

    /// Log the component types of `object` the first time `key` is seen
    pub fn log_components_once(&mut self, object: ObjectRef, key: &str) -> Result<bool> {
        let text = scene::describe_components(&self.host, object)?;
        Ok(self.sink.log_once(&text, &format!("{}_components", key)))
    }

    /// Hook: a scene finished loading
    pub fn on_scene_loaded(&mut self, scene_name: &str) {
        self.sink.log(&format!("OnSceneLoaded({})", scene_name));
    }

    /// Hook: an animator started a state; logged once per object and state
    pub fn on_animator_play(&mut self, object: ObjectRef, state: &str) -> Result<bool> {
        let name = self.host.object_name(object)?;
        Ok(self
            .sink
            .log_once(&format!("OnAnimatorPlay({}, {})", name, state), &format!("{}_{}", name, state)))
    }

    /// Hook: an object was spawned; logged once per object name
    pub fn on_object_spawn(&mut self, object: ObjectRef) -> Result<bool> {
        let name = self.host.object_name(object)?;
        let ty = self.host.type_of(object)?;
        Ok(self
            .sink
            .log_once(&format!("Spawned: {} ({})", name, ty.name()), &name))
    }
}
