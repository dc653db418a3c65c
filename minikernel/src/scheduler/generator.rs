//! Process generator: the collaborator that stages arrivals, spawns
//! worker threads per §4.6, and hands finished PCBs to the ready queue
//! or CFS runqueue at the moment they arrive. Runs on its own thread so
//! staggered arrivals are never serialized behind dispatch.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::EngineError;
use crate::workload::Policy;

use super::{worker, SchedulerEngine};

/// Spawn the generator thread. It returns, once every arrival has been
/// injected, the full list of worker-thread join handles it created —
/// the caller joins them after the scheduler loop terminates.
pub fn spawn(engine: Arc<SchedulerEngine>) -> JoinHandle<Vec<JoinHandle<()>>> {
    thread::spawn(move || {
        let mut worker_handles = Vec::new();
        let drives_debit = engine.worker_drives_debit();

        for index in 0..engine.processes.len() {
            wait_for_arrival(&engine, index);

            let pid = engine.processes[index].pid;
            let thread_count = engine.processes[index].thread_count;

            let mut spawned = Vec::with_capacity(thread_count as usize);
            let mut failure = None;
            for thread_index in 0..thread_count {
                let engine_for_worker = Arc::clone(&engine);
                match thread::Builder::new().spawn(move || worker::run(&engine_for_worker, index, drives_debit)) {
                    Ok(handle) => {
                        engine.processes[index].register_thread(handle.thread().id());
                        spawned.push(handle);
                    }
                    Err(source) => {
                        failure = Some(EngineError::ThreadCreate { pid, thread_index, source });
                        break;
                    }
                }
            }

            match failure {
                None => {
                    worker_handles.extend(spawned);
                    enqueue(&engine, index);
                }
                Some(err) => {
                    engine.event_log.verbose(format!("skipping process PID {pid}: {err}"));
                    // Any already-spawned siblings are parked waiting for
                    // dispatch; force the PCB straight to FINISHED so they
                    // observe a terminal state and exit instead of leaking.
                    engine.processes[index].force_finish();
                    for handle in spawned {
                        let _ = handle.join();
                    }
                }
            }
        }

        engine.signal_generator_done();
        worker_handles
    })
}

fn wait_for_arrival(engine: &Arc<SchedulerEngine>, index: usize) {
    let arrival_ms = engine.processes[index].arrival_ms;
    loop {
        let now = engine.clock.now_ms();
        if now >= arrival_ms {
            return;
        }
        thread::sleep(Duration::from_millis((arrival_ms - now).min(50)));
    }
}

fn enqueue(engine: &Arc<SchedulerEngine>, index: usize) {
    match engine.config.policy {
        Policy::Cfs => engine.cfs.lock().unwrap().enqueue(&engine.processes, index),
        Policy::Priority => engine.ready_queue.enqueue_by_priority(index, &engine.processes),
        Policy::Fcfs | Policy::RoundRobin => engine.ready_queue.enqueue(index),
    }
    if engine.config.dual_cpu {
        engine.slots_cv.notify_all();
    }
}
