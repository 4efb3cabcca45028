//! Core types for the registry.

mod log;
mod publisher;
mod software;
mod webhook;

pub use log::*;
pub use publisher::*;
pub use software::*;
pub use webhook::*;
