//! Engine tuning knobs, with defaults reproducing the scheduling
//! behavior described in the component design, and a partial-override
//! type deserializable from a TOML file.

use serde::Deserialize;

use crate::workload::Policy;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub policy: Policy,
    pub quantum_ms: u64,
    pub dual_cpu: bool,
    pub worker_tick_ms: u64,
    pub priority_tick_ms: u64,
    pub cfs_sched_latency_us: u64,
    pub cfs_min_timeslice_us: u64,
    pub max_scheduler_iterations: u64,
}

impl EngineConfig {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            quantum_ms: 500,
            dual_cpu: false,
            worker_tick_ms: 500,
            priority_tick_ms: 50,
            cfs_sched_latency_us: 20_000,
            cfs_min_timeslice_us: 1_000,
            max_scheduler_iterations: 10_000,
        }
    }

    pub fn apply_overrides(&mut self, overrides: &EngineConfigOverrides) {
        if let Some(v) = overrides.quantum_ms {
            self.quantum_ms = v;
        }
        if let Some(v) = overrides.dual_cpu {
            self.dual_cpu = v;
        }
        if let Some(v) = overrides.worker_tick_ms {
            self.worker_tick_ms = v;
        }
        if let Some(v) = overrides.priority_tick_ms {
            self.priority_tick_ms = v;
        }
        if let Some(v) = overrides.cfs_sched_latency_us {
            self.cfs_sched_latency_us = v;
        }
        if let Some(v) = overrides.cfs_min_timeslice_us {
            self.cfs_min_timeslice_us = v;
        }
        if let Some(v) = overrides.max_scheduler_iterations {
            self.max_scheduler_iterations = v;
        }
    }
}

/// Partial override of [`EngineConfig`], loaded from an optional TOML
/// file; any field left out of the file keeps the engine default.
#[derive(Debug, Default, Deserialize)]
pub struct EngineConfigOverrides {
    pub quantum_ms: Option<u64>,
    pub dual_cpu: Option<bool>,
    pub worker_tick_ms: Option<u64>,
    pub priority_tick_ms: Option<u64>,
    pub cfs_sched_latency_us: Option<u64>,
    pub cfs_min_timeslice_us: Option<u64>,
    pub max_scheduler_iterations: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_component_design() {
        let cfg = EngineConfig::new(Policy::Fcfs);
        assert_eq!(cfg.quantum_ms, 500);
        assert!(!cfg.dual_cpu);
        assert_eq!(cfg.worker_tick_ms, 500);
        assert_eq!(cfg.priority_tick_ms, 50);
        assert_eq!(cfg.cfs_sched_latency_us, 20_000);
        assert_eq!(cfg.cfs_min_timeslice_us, 1_000);
        assert_eq!(cfg.max_scheduler_iterations, 10_000);
    }

    #[test]
    fn overrides_only_touch_specified_fields() {
        let mut cfg = EngineConfig::new(Policy::RoundRobin);
        let overrides = EngineConfigOverrides {
            quantum_ms: Some(250),
            ..Default::default()
        };
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.quantum_ms, 250);
        assert_eq!(cfg.worker_tick_ms, 500);
    }
}
