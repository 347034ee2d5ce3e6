// core/src/lib.rs

//! shopflow: async, type-safe step pipelines.
//!
//! A business flow (sign-up, checkout, ...) is declared once as a
//! [`Pipeline`] of named steps over a shared context type and registered with
//! a [`Shopflow`] registry. Each request then builds a fresh context, wraps it
//! in [`ContextData`] and asks the registry to run the pipeline for that
//! context type.
//!
//!  - Steps run in declaration order, each with `before` / `on` / `after` hooks.
//!  - Any hook may end the run early with [`PipelineControl::Stop`].
//!  - Steps may carry a skip condition evaluated against the live context.
//!  - Optional steps are best-effort: a failure is logged and the run goes on.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Shopflow;
