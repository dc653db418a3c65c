//! Worker-thread contract: a TCB is trivial enough (back reference to
//! its PCB plus a thread index) that it doesn't need its own type here
//! — the generator spawns these as plain closures over `(engine, pid
//! index)`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::pcb::ProcessState;

use super::SchedulerEngine;

/// One worker thread's body. Loops: wait for the PCB to go RUNNING or
/// FINISHED; on FINISHED, exit; on RUNNING, either sleep a tick and
/// debit `remaining_ms` itself (`drives_debit`), or simply block until
/// the scheduler flips the state back, performing no arithmetic.
pub fn run(engine: &Arc<SchedulerEngine>, index: usize, drives_debit: bool) {
    loop {
        let pcb = &engine.processes[index];
        match pcb.wait_for_dispatch() {
            ProcessState::Finished => return,
            ProcessState::Running => {
                if drives_debit {
                    thread::sleep(Duration::from_millis(engine.config.worker_tick_ms));
                    pcb.debit(engine.config.worker_tick_ms);
                } else {
                    pcb.wait_while_running();
                }
            }
            ProcessState::Ready => unreachable!("wait_for_dispatch never returns READY"),
        }
    }
}
