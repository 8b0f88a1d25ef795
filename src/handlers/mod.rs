//! Command handlers: one per top-level mode.

pub mod exec;
pub mod interactive;
