//! Worker context
//!
//! Named functions ("modules") with declared dependencies, run either on a
//! background thread pool or inline on the caller's thread. Callers get a
//! future either way, so code written against a background context works
//! unchanged with the inline fallback.
//!
//! There is no process-wide registry: every subsystem that needs background
//! work holds its own [`WorkerContext`] and terminates it when done.
//!
//! ```rust
//! use veneer_facade::worker::{WorkerContext, WorkerMode};
//!
//! let mut workers = WorkerContext::new(WorkerMode::Inline)?;
//! workers.define("double", &[], |_, args| {
//!     Ok(serde_json::json!(args.as_f64().unwrap_or(0.0) * 2.0))
//! })?;
//! workers.define("quadruple", &["double"], |scope, args| {
//!     let twice = scope.call("double", args)?;
//!     scope.call("double", twice)
//! })?;
//!
//! let result = pollster::block_on(workers.call("quadruple", serde_json::json!(3.0)))?;
//! assert_eq!(result, serde_json::json!(12.0));
//! # Ok::<(), veneer_facade::FacadeError>(())
//! ```

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value as Json;
use tokio::runtime::{Builder, Runtime};

use crate::error::{FacadeError, Result};
use crate::layout::{LayoutEngine, LayoutFuture, LayoutRequest, TaffyLayoutEngine};

/// Body of a worker module
pub type WorkerFn = Arc<dyn Fn(&WorkerScope, Json) -> Result<Json> + Send + Sync>;

/// Result of a worker call
pub type WorkerFuture = Pin<Box<dyn Future<Output = Result<Json>> + Send>>;

/// Where module calls execute
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorkerMode {
    /// On a dedicated tokio blocking pool
    #[default]
    Background,
    /// Synchronously inside `call`
    Inline,
}

struct WorkerModule {
    name: String,
    deps: Vec<String>,
    func: WorkerFn,
}

/// Modules reachable from the one being run
pub struct WorkerScope {
    modules: FxHashMap<String, Arc<WorkerModule>>,
}

impl WorkerScope {
    /// Call a declared dependency
    pub fn call(&self, name: &str, args: Json) -> Result<Json> {
        let module = self
            .modules
            .get(name)
            .ok_or_else(|| FacadeError::Worker(format!("`{name}` is not a declared dependency")))?;
        run_module(module, self, args)
    }
}

fn run_module(module: &WorkerModule, scope: &WorkerScope, args: Json) -> Result<Json> {
    catch_unwind(AssertUnwindSafe(|| (module.func)(scope, args))).unwrap_or_else(|_| {
        Err(FacadeError::Worker(format!(
            "module `{}` panicked",
            module.name
        )))
    })
}

/// Registry and executor for worker modules
pub struct WorkerContext {
    mode: WorkerMode,
    modules: FxHashMap<String, Arc<WorkerModule>>,
    runtime: Option<Runtime>,
    terminated: bool,
}

impl WorkerContext {
    pub fn new(mode: WorkerMode) -> Result<Self> {
        let runtime = match mode {
            WorkerMode::Background => Some(
                Builder::new_multi_thread()
                    .worker_threads(1)
                    .thread_name("veneer-worker")
                    .build()
                    .map_err(|err| FacadeError::Worker(format!("failed to start runtime: {err}")))?,
            ),
            WorkerMode::Inline => None,
        };
        tracing::debug!(?mode, "worker context started");
        Ok(Self {
            mode,
            modules: FxHashMap::default(),
            runtime,
            terminated: false,
        })
    }

    pub fn mode(&self) -> WorkerMode {
        self.mode
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Register a module. Every dependency must already be defined.
    /// Redefining a name replaces the previous module.
    pub fn define<F>(&mut self, name: &str, deps: &[&str], func: F) -> Result<()>
    where
        F: Fn(&WorkerScope, Json) -> Result<Json> + Send + Sync + 'static,
    {
        if self.terminated {
            return Err(FacadeError::Worker("worker context was terminated".into()));
        }
        if let Some(missing) = deps.iter().find(|dep| !self.modules.contains_key(**dep)) {
            return Err(FacadeError::Worker(format!(
                "module `{name}` depends on unknown module `{missing}`"
            )));
        }
        let module = WorkerModule {
            name: name.to_string(),
            deps: deps.iter().map(|dep| dep.to_string()).collect(),
            func: Arc::new(func),
        };
        if self.modules.insert(name.to_string(), Arc::new(module)).is_some() {
            tracing::debug!(module = name, "worker module redefined");
        }
        Ok(())
    }

    /// Run a module with `args`
    pub fn call(&self, name: &str, args: Json) -> WorkerFuture {
        let (module, scope) = match self.prepare(name) {
            Ok(prepared) => prepared,
            Err(err) => return Box::pin(std::future::ready(Err(err))),
        };

        match &self.runtime {
            Some(runtime) => {
                let handle = runtime.spawn_blocking(move || run_module(&module, &scope, args));
                let name = name.to_string();
                Box::pin(async move {
                    handle.await.map_err(|err| {
                        FacadeError::Worker(format!("module `{name}` did not complete: {err}"))
                    })?
                })
            }
            None => Box::pin(std::future::ready(run_module(&module, &scope, args))),
        }
    }

    /// Stop accepting calls and shut the pool down without waiting for
    /// in-flight work
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.modules.clear();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        tracing::debug!("worker context terminated");
    }

    fn prepare(&self, name: &str) -> Result<(Arc<WorkerModule>, WorkerScope)> {
        if self.terminated {
            return Err(FacadeError::Worker("worker context was terminated".into()));
        }
        let module = self
            .modules
            .get(name)
            .cloned()
            .ok_or_else(|| FacadeError::Worker(format!("unknown module `{name}`")))?;

        let mut modules = FxHashMap::default();
        let mut pending: Vec<&str> = module.deps.iter().map(String::as_str).collect();
        while let Some(dep) = pending.pop() {
            if modules.contains_key(dep) {
                continue;
            }
            if let Some(dep_module) = self.modules.get(dep) {
                pending.extend(dep_module.deps.iter().map(String::as_str));
                modules.insert(dep.to_string(), dep_module.clone());
            }
        }
        Ok((module, WorkerScope { modules }))
    }
}

impl Drop for WorkerContext {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

const LAYOUT_MODULE: &str = "layout";

/// Layout engine that solves requests inside a worker context
pub struct WorkerLayoutEngine {
    context: WorkerContext,
}

impl WorkerLayoutEngine {
    pub fn new(mode: WorkerMode) -> Result<Self> {
        let mut context = WorkerContext::new(mode)?;
        context.define(LAYOUT_MODULE, &[], |_, args| {
            let request: LayoutRequest = serde_json::from_value(args)?;
            let response = TaffyLayoutEngine.compute_now(&request)?;
            Ok(serde_json::to_value(response)?)
        })?;
        Ok(Self { context })
    }

    pub fn terminate(&mut self) {
        self.context.terminate();
    }
}

impl LayoutEngine for WorkerLayoutEngine {
    fn compute(&self, request: LayoutRequest) -> LayoutFuture {
        let args = match serde_json::to_value(&request) {
            Ok(args) => args,
            Err(err) => return Box::pin(std::future::ready(Err(err.into()))),
        };
        let call = self.context.call(LAYOUT_MODULE, args);
        Box::pin(async move {
            let value = call.await?;
            Ok(serde_json::from_value(value)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutNode, LayoutStyle, Length};
    use serde_json::json;
    use slotmap::SlotMap;
    use veneer_core::FacadeId;

    fn context(mode: WorkerMode) -> WorkerContext {
        let mut workers = WorkerContext::new(mode).unwrap();
        workers
            .define("add", &[], |_, args| {
                let a = args["a"].as_f64().unwrap_or(0.0);
                let b = args["b"].as_f64().unwrap_or(0.0);
                Ok(json!(a + b))
            })
            .unwrap();
        workers
            .define("sum_pair_twice", &["add"], |scope, args| {
                let once = scope.call("add", args)?;
                scope.call("add", json!({ "a": once.clone(), "b": once }))
            })
            .unwrap();
        workers
    }

    #[test]
    fn test_inline_call() {
        let workers = context(WorkerMode::Inline);
        let result = pollster::block_on(workers.call("add", json!({ "a": 1, "b": 2 }))).unwrap();
        assert_eq!(result, json!(3.0));
    }

    #[test]
    fn test_background_call_with_dependency() {
        let workers = context(WorkerMode::Background);
        let result =
            pollster::block_on(workers.call("sum_pair_twice", json!({ "a": 1, "b": 2 }))).unwrap();
        assert_eq!(result, json!(6.0));
    }

    #[test]
    fn test_undeclared_dependency_is_unreachable() {
        let mut workers = context(WorkerMode::Inline);
        workers
            .define("sneaky", &[], |scope, args| scope.call("add", args))
            .unwrap();
        assert!(pollster::block_on(workers.call("sneaky", json!({}))).is_err());
    }

    #[test]
    fn test_unknown_dependency_rejected_at_define() {
        let mut workers = WorkerContext::new(WorkerMode::Inline).unwrap();
        let err = workers
            .define("needs_missing", &["missing"], |_, args| Ok(args))
            .unwrap_err();
        assert!(matches!(err, FacadeError::Worker(_)));
    }

    #[test]
    fn test_unknown_module_and_terminated_calls_fail() {
        let mut workers = context(WorkerMode::Background);
        assert!(pollster::block_on(workers.call("nope", json!(null))).is_err());

        workers.terminate();
        assert!(workers.is_terminated());
        assert!(pollster::block_on(workers.call("add", json!({ "a": 1, "b": 1 }))).is_err());
    }

    #[test]
    fn test_panicking_module_becomes_error() {
        let mut workers = WorkerContext::new(WorkerMode::Inline).unwrap();
        workers
            .define("boom", &[], |_, _| panic!("module failure"))
            .unwrap();
        let err = pollster::block_on(workers.call("boom", json!(null))).unwrap_err();
        assert!(err.to_string().contains("panicked"));
    }

    #[test]
    fn test_worker_layout_engine() {
        let mut map: SlotMap<FacadeId, ()> = SlotMap::with_key();
        let (parent, child) = (map.insert(()), map.insert(()));
        let request = LayoutRequest {
            roots: vec![parent],
            nodes: vec![
                LayoutNode {
                    id: parent,
                    style: LayoutStyle::column().size(Length::Px(50.0), Length::Px(80.0)),
                    children: vec![child],
                },
                LayoutNode {
                    id: child,
                    style: LayoutStyle::default().size(Length::Percent(0.5), Length::Px(20.0)),
                    children: Vec::new(),
                },
            ],
            ..LayoutRequest::default()
        };

        let engine = WorkerLayoutEngine::new(WorkerMode::Background).unwrap();
        let response = pollster::block_on(engine.compute(request)).unwrap();
        let metrics = response.get(child).unwrap();
        assert_eq!(metrics.width, 25.0);
        assert_eq!(metrics.height, 20.0);
    }
}
