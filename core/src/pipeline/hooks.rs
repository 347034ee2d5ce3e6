// core/src/pipeline/hooks.rs

//! Registration of `before`, `on` and `after` hooks.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::definition::{Pipeline, StepHooks};
use std::future::Future;

#[derive(Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Adds a hook that runs before the step's `on` hooks.
  ///
  /// The hook's own error type only needs to convert into the pipeline's `Err`.
  pub fn before<F, HookErr>(&mut self, step_name: &str, hook: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, HookErr>> + Send + 'static,
    HookErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_hook(Phase::Before, step_name, hook);
  }

  /// Adds the main hook of a step.
  pub fn on<F, HookErr>(&mut self, step_name: &str, hook: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, HookErr>> + Send + 'static,
    HookErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_hook(Phase::On, step_name, hook);
  }

  /// Adds a hook that runs after the step's `on` hooks.
  pub fn after<F, HookErr>(&mut self, step_name: &str, hook: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, HookErr>> + Send + 'static,
    HookErr: Into<Err> + Send + Sync + 'static,
  {
    self.push_hook(Phase::After, step_name, hook);
  }

  /// Adds an already boxed hook to the `on` phase.
  pub fn on_boxed(&mut self, step_name: &str, handler: Handler<TData, Err>) {
    self.ensure_step_exists(step_name);
    self.hooks.entry(step_name.to_string()).or_default().on.push(handler);
  }

  fn push_hook<F, HookErr>(
    &mut self,
    phase: Phase,
    step_name: &str,
    hook: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HookErr>> + Send + 'static,
    HookErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler: Handler<TData, Err> = Box::new(move |ctx_data| {
      let fut = hook(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    let hooks: &mut StepHooks<TData, Err> = self.hooks.entry(step_name.to_string()).or_default();
    match phase {
      Phase::Before => hooks.before.push(handler),
      Phase::On => hooks.on.push(handler),
      Phase::After => hooks.after.push(handler),
    }
  }
}
