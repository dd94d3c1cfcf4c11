//! Pipeline execution runtime
//!
//! This crate turns a graph snapshot into one deterministic,
//! dependency-ordered run: topological sorting with cycle detection,
//! pull-based input resolution, kind dispatch through the handler
//! registry, per-run memoization, and cooperative cancellation.

mod executor;
mod registry;
mod runtime;
mod sorter;

pub use executor::{GraphExecutor, RunOutcome};
pub use registry::{HandlerInfo, HandlerRegistry, PortSpec};
pub use runtime::{PipelineRuntime, RuntimeConfig};
pub use sorter::topo_sort;
