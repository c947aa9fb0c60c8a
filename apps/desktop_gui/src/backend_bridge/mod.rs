//! Channel plumbing between the egui thread and the scan workflow worker.

pub mod commands;
pub mod runtime;
