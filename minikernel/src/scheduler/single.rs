//! Single-CPU scheduler cores: one loop per policy, each dispatching one
//! process at a time and emitting the essential-log records exactly as
//! specified.

use std::time::Duration;

use crate::error::EngineError;
use crate::pcb::ProcessState;
use crate::workload::Policy;

use super::SchedulerEngine;

const IDLE_WAIT: Duration = Duration::from_millis(20);

pub fn run(engine: &SchedulerEngine) -> Result<(), EngineError> {
    match engine.config.policy {
        Policy::Fcfs => run_fcfs(engine),
        Policy::RoundRobin => run_round_robin(engine),
        Policy::Priority => run_priority(engine),
        Policy::Cfs => run_cfs(engine),
    }
}

fn finished_tag(policy: Policy, pid: u32) -> String {
    format!("[{}] Processo PID {pid} finalizado", policy.tag())
}

fn run_fcfs(engine: &SchedulerEngine) -> Result<(), EngineError> {
    let mut iterations = 0u64;
    loop {
        engine.check_iteration_budget(&mut iterations)?;

        if engine.is_generator_done() && engine.ready_queue.is_empty() {
            return Ok(());
        }

        let index = match engine.ready_queue.wait_and_dequeue(IDLE_WAIT) {
            Some(i) => i,
            None => continue,
        };

        let pcb = &engine.processes[index];
        pcb.set_running();
        engine.event_log.essential(format!("[FCFS] Executando processo PID {}", pcb.pid));

        pcb.wait_until_finished();

        engine.event_log.essential(finished_tag(Policy::Fcfs, pcb.pid));
    }
}

fn run_round_robin(engine: &SchedulerEngine) -> Result<(), EngineError> {
    let mut iterations = 0u64;
    let quantum = engine.config.quantum_ms;
    loop {
        engine.check_iteration_budget(&mut iterations)?;

        if engine.is_generator_done() && engine.ready_queue.is_empty() {
            return Ok(());
        }

        let index = match engine.ready_queue.wait_and_dequeue(IDLE_WAIT) {
            Some(i) => i,
            None => continue,
        };

        let pcb = &engine.processes[index];
        engine
            .event_log
            .essential(format!("[RR] Executando processo PID {} com quantum {quantum}ms", pcb.pid));

        if pcb.remaining_ms() <= quantum {
            pcb.set_running();
            let remaining = pcb.remaining_ms();
            std::thread::sleep(Duration::from_millis(remaining));
            pcb.debit(remaining);
            engine.event_log.essential(finished_tag(Policy::RoundRobin, pcb.pid));
        } else {
            pcb.debit(quantum);
            engine.ready_queue.enqueue(index);
        }
    }
}

fn run_priority(engine: &SchedulerEngine) -> Result<(), EngineError> {
    let mut iterations = 0u64;
    let tick = engine.config.priority_tick_ms;
    loop {
        engine.check_iteration_budget(&mut iterations)?;

        if engine.is_generator_done() && engine.ready_queue.is_empty() {
            return Ok(());
        }

        let index = match engine.ready_queue.dequeue_highest_priority(&engine.processes) {
            Some(i) => i,
            None => {
                std::thread::sleep(IDLE_WAIT);
                continue;
            }
        };

        let pcb = &engine.processes[index];
        engine.event_log.essential(format!(
            "[PRIORIDADE] Executando processo PID {} prioridade {}",
            pcb.pid, pcb.priority
        ));
        pcb.set_running();

        loop {
            std::thread::sleep(Duration::from_millis(tick));
            let remaining = pcb.debit(tick);
            if remaining == 0 || pcb.is_finished() {
                engine.event_log.essential(finished_tag(Policy::Priority, pcb.pid));
                break;
            }
            if let Some(peeked) = engine.ready_queue.peek_highest_priority(&engine.processes) {
                if engine.processes[peeked].priority < pcb.priority {
                    pcb.set_ready();
                    engine.ready_queue.enqueue_by_priority(index, &engine.processes);
                    engine.event_log.essential(format!(
                        "[PRIORIDADE] Processo PID {} preemptado por processo de maior prioridade",
                        pcb.pid
                    ));
                    break;
                }
            }
        }
    }
}

fn run_cfs(engine: &SchedulerEngine) -> Result<(), EngineError> {
    let mut iterations = 0u64;
    loop {
        engine.check_iteration_budget(&mut iterations)?;

        let mut cfs = engine.cfs.lock().unwrap();
        if engine.is_generator_done() && cfs.is_empty() {
            return Ok(());
        }

        let index = match cfs.pick_next(&engine.processes) {
            Some(i) => i,
            None => {
                drop(cfs);
                std::thread::sleep(IDLE_WAIT);
                continue;
            }
        };
        let timeslice_us = cfs.timeslice_us(&engine.processes, index);
        drop(cfs);

        let pcb = &engine.processes[index];
        engine
            .event_log
            .essential(format!("[CFS] Executando processo PID {} com timeslice {timeslice_us}us", pcb.pid));
        pcb.set_running();

        let timeslice_ms = (timeslice_us / 1000).max(1);
        let run_ms = timeslice_ms.min(pcb.remaining_ms());
        std::thread::sleep(Duration::from_millis(run_ms));
        pcb.debit(run_ms);

        let mut cfs = engine.cfs.lock().unwrap();
        cfs.update_vruntime(&engine.processes, index, run_ms * 1_000_000);
        if pcb.is_finished() {
            engine.event_log.essential(finished_tag(Policy::Cfs, pcb.pid));
        } else {
            pcb.set_ready();
            cfs.put_prev(&engine.processes, index);
        }
    }
}
