//! Workload file format: whitespace-separated text describing a process
//! count, one line per process, and a trailing policy code.

use crate::error::EngineError;

pub const MAX_PROCESSES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Fcfs,
    RoundRobin,
    Priority,
    Cfs,
}

impl Policy {
    pub fn from_code(code: u8) -> Result<Self, EngineError> {
        match code {
            1 => Ok(Policy::Fcfs),
            2 => Ok(Policy::RoundRobin),
            3 => Ok(Policy::Priority),
            4 => Ok(Policy::Cfs),
            other => Err(EngineError::UnknownPolicy(other)),
        }
    }

    /// The essential-log tag for this policy, e.g. `FCFS`, `RR`,
    /// `PRIORIDADE`, `CFS`.
    pub fn tag(&self) -> &'static str {
        match self {
            Policy::Fcfs => "FCFS",
            Policy::RoundRobin => "RR",
            Policy::Priority => "PRIORIDADE",
            Policy::Cfs => "CFS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub total_duration_ms: u64,
    pub priority: u8,
    pub thread_count: u32,
    pub arrival_ms: u64,
}

pub struct Workload {
    pub processes: Vec<ProcessSpec>,
    pub policy: Policy,
}

fn next_field<'a>(tokens: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<&'a str, EngineError> {
    tokens
        .next()
        .ok_or_else(|| EngineError::InputFormat(format!("missing field: {what}")))
}

fn parse_u64(value: &str, what: &str) -> Result<u64, EngineError> {
    value
        .parse()
        .map_err(|_| EngineError::InputFormat(format!("invalid {what}: {value:?}")))
}

/// Parse a workload file's full text per the §6 format:
/// ```text
/// <N>
/// <dur_1> <prio_1> <threads_1> <arrival_1>
/// ...
/// <policy>
/// ```
pub fn parse(text: &str) -> Result<Workload, EngineError> {
    let mut tokens = text.split_whitespace();

    let n_str = next_field(&mut tokens, "process count")?;
    let n: usize = n_str
        .parse()
        .map_err(|_| EngineError::InputFormat(format!("invalid process count: {n_str:?}")))?;
    if n == 0 {
        return Err(EngineError::InputFormat("process count must be at least 1".into()));
    }
    if n > MAX_PROCESSES {
        return Err(EngineError::Capacity(format!(
            "process count {n} exceeds the maximum of {MAX_PROCESSES}"
        )));
    }

    let mut processes = Vec::with_capacity(n);
    for i in 0..n {
        let dur = parse_u64(next_field(&mut tokens, "duration")?, "duration")?;
        if dur == 0 {
            return Err(EngineError::InputFormat(format!("process {}: duration must be positive", i + 1)));
        }
        let prio_str = next_field(&mut tokens, "priority")?;
        let prio: u8 = prio_str
            .parse()
            .map_err(|_| EngineError::InputFormat(format!("invalid priority: {prio_str:?}")))?;
        if !(1..=5).contains(&prio) {
            return Err(EngineError::InputFormat(format!(
                "process {}: priority {prio} out of range [1,5]",
                i + 1
            )));
        }
        let threads_str = next_field(&mut tokens, "thread count")?;
        let threads: u32 = threads_str
            .parse()
            .map_err(|_| EngineError::InputFormat(format!("invalid thread count: {threads_str:?}")))?;
        if threads == 0 {
            return Err(EngineError::InputFormat(format!("process {}: thread count must be positive", i + 1)));
        }
        let arrival = parse_u64(next_field(&mut tokens, "arrival")?, "arrival")?;

        processes.push(ProcessSpec {
            total_duration_ms: dur,
            priority: prio,
            thread_count: threads,
            arrival_ms: arrival,
        });
    }

    let policy_str = next_field(&mut tokens, "policy")?;
    let policy_code: u8 = policy_str
        .parse()
        .map_err(|_| EngineError::InputFormat(format!("invalid policy code: {policy_str:?}")))?;
    let policy = Policy::from_code(policy_code)?;

    Ok(Workload { processes, policy })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_workload() {
        let text = "2\n1000 3 1 0\n1000 1 1 0\n1\n";
        let workload = parse(text).unwrap();
        assert_eq!(workload.processes.len(), 2);
        assert_eq!(workload.policy, Policy::Fcfs);
        assert_eq!(workload.processes[0].priority, 3);
    }

    #[test]
    fn accepts_cfs_policy_code_four() {
        let text = "1\n500 1 1 0\n4\n";
        let workload = parse(text).unwrap();
        assert_eq!(workload.policy, Policy::Cfs);
    }

    #[test]
    fn rejects_too_many_processes() {
        let mut text = format!("{}\n", MAX_PROCESSES + 1);
        for _ in 0..=MAX_PROCESSES {
            text.push_str("100 1 1 0\n");
        }
        text.push_str("1\n");
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, EngineError::Capacity(_)));
    }

    #[test]
    fn rejects_out_of_range_priority() {
        let text = "1\n100 9 1 0\n1\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, EngineError::InputFormat(_)));
    }

    #[test]
    fn rejects_unknown_policy() {
        let text = "1\n100 1 1 0\n9\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, EngineError::UnknownPolicy(9)));
    }

    #[test]
    fn rejects_zero_duration() {
        let text = "1\n0 1 1 0\n1\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, EngineError::InputFormat(_)));
    }

    #[test]
    fn rejects_missing_fields() {
        let text = "1\n100 1 1\n1\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(err, EngineError::InputFormat(_)));
    }
}
