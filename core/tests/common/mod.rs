// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use shopflow::{ContextData, FlowError, Handler, PipelineControl};
use tracing::Level;

/// Context used across the engine tests; each executed hook stamps itself
/// into `journal` and appends its note to `receipt`.
#[derive(Clone, Debug, Default)]
pub struct OrderFlow {
  pub stamps: u32,
  pub receipt: String,
  pub journal: Vec<String>,
  pub halt_after: Option<String>,
  pub pickup_only: bool,
}

#[derive(Clone, Debug, Default)]
pub struct RefundFlow {
  pub refunded_cents: u64,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum FlowTestError {
  // FlowError is not PartialEq, so its Debug rendering is kept instead.
  #[error("engine: {0}")]
  Engine(String),

  #[error("rejected: {0}")]
  Rejected(String),
}

impl From<FlowError> for FlowTestError {
  fn from(err: FlowError) -> Self {
    FlowTestError::Engine(format!("{:?}", err))
  }
}

pub fn fresh() -> ContextData<OrderFlow> {
  ContextData::new(OrderFlow::default())
}

/// Hook that records `label` and halts the run if `halt_after` names it.
pub fn stamp(label: &'static str, note: &'static str) -> Handler<OrderFlow, FlowTestError> {
  Box::new(move |ctx: ContextData<OrderFlow>| {
    Box::pin(async move {
      let mut flow = ctx.write();
      flow.stamps += 1;
      flow.receipt.push_str(note);
      flow.journal.push(label.to_string());
      tracing::debug!(target: "flow_tests", label, stamps = flow.stamps, "stamped");
      if flow.halt_after.as_deref() == Some(label) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

/// Hook that records `label` and then fails with `reason`.
pub fn reject(label: &'static str, reason: &'static str) -> Handler<OrderFlow, FlowTestError> {
  Box::new(move |ctx: ContextData<OrderFlow>| {
    Box::pin(async move {
      ctx.write().journal.push(label.to_string());
      tracing::warn!(target: "flow_tests", label, reason, "rejecting");
      Err(FlowTestError::Rejected(reason.to_string()))
    })
  })
}

static TRACING: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}
