//! End-to-end scheduler scenarios. Tick durations are compressed well
//! below the defaults so the suite runs fast; only ratios between
//! quantum/tick and process duration matter for the assertions below,
//! not wall-clock realism.

use std::sync::Arc;

use minikernel::{workload, EngineConfig, SchedulerEngine};

fn build(text: &str, configure: impl FnOnce(&mut EngineConfig)) -> Arc<SchedulerEngine> {
    let parsed = workload::parse(text).expect("workload parses");
    let mut config = EngineConfig::new(parsed.policy);
    config.worker_tick_ms = 10;
    config.priority_tick_ms = 5;
    config.cfs_sched_latency_us = 2_000;
    config.cfs_min_timeslice_us = 500;
    configure(&mut config);
    Arc::new(SchedulerEngine::new(parsed.processes, config))
}

fn finalizado(pid: u32) -> String {
    format!("[CFS] Processo PID {pid} finalizado")
}

#[test]
fn fcfs_two_processes_arriving_together() {
    let engine = build("2\n40 3 1 0\n40 1 1 0\n1\n", |_| {});
    engine.run().expect("run succeeds");

    let records = engine.event_log.essential_records();
    assert_eq!(
        records,
        vec![
            "[FCFS] Executando processo PID 1".to_string(),
            "[FCFS] Processo PID 1 finalizado".to_string(),
            "[FCFS] Executando processo PID 2".to_string(),
            "[FCFS] Processo PID 2 finalizado".to_string(),
            "Escalonador terminou execução de todos processos".to_string(),
        ]
    );
}

#[test]
fn round_robin_alternates_every_quantum() {
    let engine = build("2\n40 2 1 0\n40 2 1 0\n2\n", |cfg| cfg.quantum_ms = 20);
    engine.run().expect("run succeeds");

    let records = engine.event_log.essential_records();
    let executing: Vec<&String> = records.iter().filter(|r| r.contains("Executando")).collect();
    assert_eq!(
        executing,
        vec![
            "[RR] Executando processo PID 1 com quantum 20ms",
            "[RR] Executando processo PID 2 com quantum 20ms",
            "[RR] Executando processo PID 1 com quantum 20ms",
            "[RR] Executando processo PID 2 com quantum 20ms",
        ]
    );

    let finish_order: Vec<&String> = records.iter().filter(|r| r.contains("finalizado")).collect();
    assert_eq!(finish_order, vec!["[RR] Processo PID 1 finalizado", "[RR] Processo PID 2 finalizado"]);
}

#[test]
fn priority_preemption_on_late_arrival() {
    let engine = build("2\n80 3 1 0\n20 1 1 20\n3\n", |_| {});
    engine.run().expect("run succeeds");

    let records = engine.event_log.essential_records();

    let pos_exec_1_first = records.iter().position(|r| r == "[PRIORIDADE] Executando processo PID 1 prioridade 3").unwrap();
    let pos_preempt = records
        .iter()
        .position(|r| r == "[PRIORIDADE] Processo PID 1 preemptado por processo de maior prioridade")
        .unwrap();
    let pos_exec_2 = records.iter().position(|r| r == "[PRIORIDADE] Executando processo PID 2 prioridade 1").unwrap();
    let pos_finish_2 = records.iter().position(|r| r == "[PRIORIDADE] Processo PID 2 finalizado").unwrap();
    let pos_exec_1_again = records
        .iter()
        .rposition(|r| r == "[PRIORIDADE] Executando processo PID 1 prioridade 3")
        .unwrap();
    let pos_finish_1 = records.iter().position(|r| r == "[PRIORIDADE] Processo PID 1 finalizado").unwrap();

    assert!(pos_exec_1_first < pos_preempt);
    assert!(pos_preempt < pos_exec_2);
    assert!(pos_exec_2 < pos_finish_2);
    assert!(pos_finish_2 < pos_exec_1_again);
    assert!(pos_exec_1_again < pos_finish_1);
}

#[test]
fn cfs_runs_the_first_enqueued_process_first_on_a_vruntime_tie() {
    let engine = build("2\n60 1 1 0\n60 5 1 0\n4\n", |_| {});
    engine.run().expect("run succeeds");

    let records = engine.event_log.essential_records();
    let first_executing = records.iter().find(|r| r.contains("Executando")).unwrap();
    assert!(first_executing.contains("PID 1"));

    assert!(records.iter().any(|r| r == &finalizado(1)));
    assert!(records.iter().any(|r| r == &finalizado(2)));
    assert_eq!(records.last().unwrap(), "Escalonador terminou execução de todos processos");
}

#[test]
fn dual_cpu_fcfs_runs_both_processes_concurrently() {
    let engine = build("2\n40 3 1 0\n40 3 1 0\n1\n", |cfg| cfg.dual_cpu = true);
    engine.run().expect("run succeeds");

    let records = engine.event_log.essential_records();
    let executing: Vec<&String> = records.iter().filter(|r| r.contains("Executando")).collect();
    assert!(executing.len() >= 2);
    assert!(executing.iter().any(|r| r.ends_with("processador 0")));
    assert!(executing.iter().any(|r| r.ends_with("processador 1")));

    let first_executing_pos = records.iter().position(|r| r.contains("Executando")).unwrap();
    let last_finish_pos = records.iter().rposition(|r| r.contains("finalizado")).unwrap();
    assert!(first_executing_pos < last_finish_pos);

    assert_eq!(records.iter().filter(|r| r.contains("finalizado")).count(), 2);
}

#[test]
fn dual_cpu_round_robin_expands_a_lone_process_into_the_idle_slot() {
    let engine = build("1\n60 3 1 0\n2\n", |cfg| {
        cfg.dual_cpu = true;
        cfg.quantum_ms = 500;
    });
    engine.run().expect("run succeeds");

    let records = engine.event_log.essential_records();
    let executing: Vec<&String> = records.iter().filter(|r| r.contains("Executando")).collect();
    assert!(executing.iter().any(|r| r.ends_with("processador 0")));
    assert!(executing.iter().any(|r| r.ends_with("processador 1")));
    assert_eq!(records.iter().filter(|r| r.contains("finalizado")).count(), 1);
}
