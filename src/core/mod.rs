//! Core domain models
//!
//! This module defines the fundamental data structures that represent
//! projects, modules, pipeline steps, and their state.

pub mod config;
pub mod module;
pub mod pipeline;
pub mod state;
pub mod step;

pub use config::*;
pub use module::*;
pub use pipeline::*;
pub use state::*;
pub use step::*;
