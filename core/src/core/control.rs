// core/src/core/control.rs

//! Flow-control signals returned by hooks and the outcome of a full run.

/// Returned by every hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Keep going with the next hook / step.
  Continue,
  /// Halt the whole pipeline; no further hooks run.
  Stop,
}

/// Outcome of [`Pipeline::run`](crate::Pipeline::run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step was executed or skipped.
  Completed,
  /// A hook returned [`PipelineControl::Stop`].
  Stopped,
}
