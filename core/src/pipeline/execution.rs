// core/src/pipeline/execution.rs

//! `Pipeline::run`: walks the steps and their hooks against one context.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

/// What happened while running one step.
enum StepOutcome<Err> {
  Continue,
  Stop,
  Failed(Err),
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// - A skip condition that holds skips the step.
  /// - A non-optional step without hooks fails with [`FlowError::HandlerMissing`].
  /// - `Stop` from any hook ends the run with [`PipelineResult::Stopped`].
  /// - An error from a non-optional step ends the run with that error; an
  ///   error from an optional step is logged and the run moves on.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(context_type = %std::any::type_name::<TData>(), num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline run starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if step_def.should_skip(&ctx_data) {
        event!(Level::DEBUG, step_name, "Step skipped by its skip condition.");
        continue;
      }

      let hooks = match self.hooks.get(step_name).filter(|h| !h.is_empty()) {
        Some(hooks) => hooks,
        None if step_def.optional => {
          event!(Level::DEBUG, step_name, "Optional step has no hooks, skipping.");
          continue;
        }
        None => {
          event!(Level::ERROR, step_name, "Non-optional step has no hooks.");
          return Err(Err::from(FlowError::HandlerMissing {
            step_name: step_def.name.clone(),
          }));
        }
      };

      let span = info_span!("pipeline_step", step_name, step_index = step_idx, optional = step_def.optional);
      let outcome = async {
        for (phase, handlers) in [("before", &hooks.before), ("on", &hooks.on), ("after", &hooks.after)] {
          match Self::run_phase(phase, handlers, &ctx_data).await {
            StepOutcome::Continue => {}
            other => return other,
          }
        }
        StepOutcome::Continue
      }
      .instrument(span)
      .await;

      match outcome {
        StepOutcome::Continue => {}
        StepOutcome::Stop => {
          event!(Level::INFO, step_name, "Pipeline stopped by a hook.");
          return Ok(PipelineResult::Stopped);
        }
        StepOutcome::Failed(e) if step_def.optional => {
          event!(Level::WARN, step_name, error = %e, "Optional step failed; continuing.");
        }
        StepOutcome::Failed(e) => return Err(e),
      }
    }

    event!(Level::DEBUG, "Pipeline run completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_phase(
    phase: &'static str,
    handlers: &[Handler<TData, Err>],
    ctx_data: &ContextData<TData>,
  ) -> StepOutcome<Err> {
    for (handler_idx, handler) in handlers.iter().enumerate() {
      match handler(ctx_data.clone()).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => return StepOutcome::Stop,
        Err(e) => {
          event!(Level::ERROR, phase, handler_index = handler_idx, error = %e, "Hook failed.");
          return StepOutcome::Failed(e);
        }
      }
    }
    StepOutcome::Continue
  }
}
