//! Safe disk cleanup for macOS.
//!
//! Scanners enumerate cache, log and temp locations per category; the
//! orchestrator runs them on a bounded worker pool; the cleaner and the
//! backup manager mutate the disk only after `safety` approves each path at
//! the moment of the operation.

pub mod backup;
pub mod cleaner;
pub mod config;
pub mod constants;
pub mod ignore;
pub mod model;
pub mod orchestrator;
pub mod paths;
pub mod safety;
pub mod scanner;
