// core/src/pipeline/mod.rs

//! `Pipeline` definition, hook registration and execution.

pub mod definition;
pub mod execution;
pub mod hooks;
