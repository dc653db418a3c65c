//! Scheduling engine for the mini-kernel simulator: given a parsed
//! workload, drives its processes to completion under one of four
//! policies and produces a deterministic essential-log trace.

pub mod cfs;
pub mod clock;
pub mod config;
pub mod error;
pub mod event_log;
pub mod pcb;
pub mod rbtree;
pub mod ready_queue;
mod scheduler;
pub mod workload;

pub use clock::Clock;
pub use config::{EngineConfig, EngineConfigOverrides};
pub use error::EngineError;
pub use event_log::EventLog;
pub use pcb::ProcessState;
pub use scheduler::SchedulerEngine;
pub use workload::{Policy, ProcessSpec};
