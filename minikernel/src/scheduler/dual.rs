//! Dual-CPU coordinator: two processor slots driven by one loop, per
//! tick retiring finished work, expanding a lone round-robin process
//! into idle slots, and assigning freshly-ready work.
//!
//! Workers always drive their own `remaining_ms` debit in this mode
//! (see `SchedulerEngine::worker_drives_debit`), so unlike the
//! single-CPU cores this loop never touches simulated run time itself
//! — it is purely slot bookkeeping and log emission.

use std::time::Duration;

use crate::error::EngineError;
use crate::workload::Policy;

use super::SchedulerEngine;

const PACING: Duration = Duration::from_micros(50);
const IDLE_WAIT: Duration = Duration::from_millis(20);

pub fn run(engine: &SchedulerEngine) -> Result<(), EngineError> {
    let mut iterations = 0u64;
    loop {
        engine.check_iteration_budget(&mut iterations)?;

        retire_finished(engine);
        expand_round_robin(engine);
        assign_new_work(engine);

        let slots_empty = {
            let guard = engine.slots.lock().unwrap();
            guard[0].is_none() && guard[1].is_none()
        };
        let source_empty = ready_source_empty(engine);

        if engine.is_generator_done() && source_empty && slots_empty {
            return Ok(());
        }

        if source_empty && slots_empty {
            let guard = engine.slots.lock().unwrap();
            let _ = engine.slots_cv.wait_timeout(guard, IDLE_WAIT).unwrap();
        } else {
            std::thread::sleep(PACING);
        }
    }
}

fn ready_source_empty(engine: &SchedulerEngine) -> bool {
    if engine.config.policy == Policy::Cfs {
        engine.cfs.lock().unwrap().is_empty()
    } else {
        engine.ready_queue.is_empty()
    }
}

fn pick_for_policy(engine: &SchedulerEngine) -> Option<usize> {
    match engine.config.policy {
        Policy::Fcfs | Policy::RoundRobin => engine.ready_queue.dequeue(),
        Policy::Priority => engine.ready_queue.dequeue_highest_priority(&engine.processes),
        Policy::Cfs => engine.cfs.lock().unwrap().pick_next(&engine.processes),
    }
}

fn emit_executing(engine: &SchedulerEngine, index: usize, slot: usize) {
    let pcb = &engine.processes[index];
    let pid = pcb.pid;
    let message = match engine.config.policy {
        Policy::Fcfs => format!("[FCFS] Executando processo PID {pid} // processador {slot}"),
        Policy::RoundRobin => {
            format!("[RR] Executando processo PID {pid} com quantum {}ms // processador {slot}", engine.config.quantum_ms)
        }
        Policy::Priority => {
            format!("[PRIORIDADE] Executando processo PID {pid} prioridade {} // processador {slot}", pcb.priority)
        }
        Policy::Cfs => {
            let ts = engine.cfs.lock().unwrap().timeslice_us(&engine.processes, index);
            format!("[CFS] Executando processo PID {pid} com timeslice {ts}us // processador {slot}")
        }
    };
    engine.event_log.essential(message);
}

fn finished_message(policy: Policy, pid: u32) -> String {
    format!("[{}] Processo PID {pid} finalizado", policy.tag())
}

/// Step 1: clear every slot whose occupant has finished, emitting one
/// finish record per distinct process even if it spanned both slots,
/// then re-announce (or, under RR, compact) whatever keeps running.
fn retire_finished(engine: &SchedulerEngine) {
    let mut guard = engine.slots.lock().unwrap();

    let mut finished = Vec::new();
    for slot_value in guard.iter() {
        if let Some(index) = slot_value {
            if engine.processes[*index].is_finished() && !finished.contains(index) {
                finished.push(*index);
            }
        }
    }
    if finished.is_empty() {
        return;
    }

    for &index in &finished {
        engine.event_log.essential(finished_message(engine.config.policy, engine.processes[index].pid));
        for slot in guard.iter_mut() {
            if *slot == Some(index) {
                *slot = None;
            }
        }
    }

    if engine.config.policy == Policy::RoundRobin {
        let mut remaining: Vec<usize> = guard.iter().filter_map(|s| *s).collect();
        for slot in guard.iter_mut() {
            *slot = None;
        }
        let ready_nonempty = !engine.ready_queue.is_empty();
        for (slot, index) in remaining.drain(..).enumerate() {
            guard[slot] = Some(index);
            if ready_nonempty {
                drop(guard);
                emit_executing(engine, index, slot);
                guard = engine.slots.lock().unwrap();
            }
        }
    } else {
        for slot in 0..2 {
            if let Some(index) = guard[slot] {
                drop(guard);
                emit_executing(engine, index, slot);
                guard = engine.slots.lock().unwrap();
            }
        }
    }

    drop(guard);
    engine.slots_cv.notify_all();
}

/// Step 2: under RR, once the ready queue has run dry, let a lone
/// running process spread into any still-empty slot so it isn't
/// artificially confined to the slot it first landed on.
fn expand_round_robin(engine: &SchedulerEngine) {
    if engine.config.policy != Policy::RoundRobin || !engine.ready_queue.is_empty() {
        return;
    }

    let mut guard = engine.slots.lock().unwrap();
    let candidate = guard.iter().copied().flatten().next();
    let Some(candidate) = candidate else { return };
    if guard.iter().all(|s| *s == Some(candidate)) {
        return;
    }

    let mut expanded = false;
    for slot in 0..2 {
        if guard[slot].is_none() {
            guard[slot] = Some(candidate);
            expanded = true;
        }
    }
    drop(guard);

    if expanded {
        for slot in 0..2 {
            let guard = engine.slots.lock().unwrap();
            let occupant = guard[slot];
            drop(guard);
            if occupant == Some(candidate) {
                emit_executing(engine, candidate, slot);
            }
        }
        engine.slots_cv.notify_all();
    }
}

/// Step 3: fill every still-empty slot with freshly selected work.
fn assign_new_work(engine: &SchedulerEngine) {
    for slot in 0..2 {
        let is_empty = engine.slots.lock().unwrap()[slot].is_none();
        if !is_empty {
            continue;
        }
        let Some(index) = pick_for_policy(engine) else { continue };

        let pcb = &engine.processes[index];
        pcb.set_running();
        {
            let mut guard = engine.slots.lock().unwrap();
            guard[slot] = Some(index);
        }
        emit_executing(engine, index, slot);

        if pcb.thread_count > 1 && engine.config.policy != Policy::RoundRobin {
            let mut guard = engine.slots.lock().unwrap();
            let extra_slot = (0..2).find(|&s| guard[s].is_none());
            if let Some(extra_slot) = extra_slot {
                guard[extra_slot] = Some(index);
                drop(guard);
                emit_executing(engine, index, extra_slot);
            }
        }
        engine.slots_cv.notify_all();
    }
}
