//! The scheduler engine: owns the process arena and every shared
//! structure the generator, worker, and scheduler tasks coordinate
//! through. No task reaches into ambient/global state; everything is a
//! borrow of an `Arc<SchedulerEngine>`.

mod dual;
mod generator;
mod single;
mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::cfs::CfsRunQueue;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::event_log::EventLog;
use crate::pcb::Pcb;
use crate::ready_queue::ReadyQueue;
use crate::workload::{Policy, ProcessSpec};

pub struct SchedulerEngine {
    pub processes: Vec<Pcb>,
    pub ready_queue: ReadyQueue,
    pub cfs: Mutex<CfsRunQueue>,
    pub event_log: EventLog,
    pub clock: Clock,
    pub config: EngineConfig,
    pub generator_done: AtomicBool,

    /// Dual-CPU mode's two processor slots, and the condition variable
    /// the coordinator loop suspends on while both are empty.
    slots: Mutex<[Option<usize>; 2]>,
    slots_cv: Condvar,
}

impl SchedulerEngine {
    pub fn new(specs: Vec<ProcessSpec>, config: EngineConfig) -> Self {
        let processes = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| {
                Pcb::new(
                    (i + 1) as u32,
                    spec.total_duration_ms,
                    spec.priority,
                    spec.thread_count,
                    spec.arrival_ms,
                )
            })
            .collect();

        Self {
            processes,
            ready_queue: ReadyQueue::new(),
            cfs: Mutex::new(CfsRunQueue::new(config.cfs_sched_latency_us, config.cfs_min_timeslice_us)),
            event_log: EventLog::new(),
            clock: Clock::new(),
            generator_done: AtomicBool::new(false),
            slots: Mutex::new([None, None]),
            slots_cv: Condvar::new(),
            config,
        }
    }

    fn worker_drives_debit(&self) -> bool {
        self.config.dual_cpu || self.config.policy == Policy::Fcfs
    }

    fn is_generator_done(&self) -> bool {
        self.generator_done.load(Ordering::SeqCst)
    }

    /// Shared circuit-breaker for every scheduler loop variant: guards
    /// against a malformed or mis-modeled workload spinning forever.
    fn check_iteration_budget(&self, iterations: &mut u64) -> Result<(), EngineError> {
        *iterations += 1;
        if *iterations > self.config.max_scheduler_iterations {
            return Err(EngineError::RunawayScheduler);
        }
        Ok(())
    }

    /// Called once by the generator after the last arrival has been
    /// injected: wakes every task that might be parked waiting for more
    /// work so its termination predicate gets re-checked.
    fn signal_generator_done(&self) {
        self.generator_done.store(true, Ordering::SeqCst);
        self.ready_queue.notify_all();
        self.slots_cv.notify_all();
    }

    /// Run the generator and scheduler to completion, then join every
    /// worker thread the generator spawned. Blocks the calling thread
    /// for the duration of the simulated run.
    pub fn run(self: &Arc<Self>) -> Result<(), EngineError> {
        let generator_handle = generator::spawn(Arc::clone(self));

        let result = if self.config.dual_cpu {
            dual::run(self)
        } else {
            single::run(self)
        };

        let worker_handles = generator_handle.join().expect("generator thread panicked");
        for handle in worker_handles {
            let _ = handle.join();
        }

        if result.is_ok() {
            self.event_log.essential("Escalonador terminou execução de todos processos");
        }
        result
    }
}
