//! Core domain models for jobrun
//!
//! This module defines the data structures that represent pipelines,
//! steps, run conditions, outcomes and the state a run accumulates.

pub mod condition;
pub mod config;
pub mod outcome;
pub mod pipeline;
pub mod secrets;
pub mod state;
pub mod step;

pub use condition::*;
pub use outcome::*;
pub use pipeline::*;
pub use secrets::*;
pub use state::*;
pub use step::*;
