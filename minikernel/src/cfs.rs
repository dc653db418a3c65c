//! Completely-fair scheduling runqueue: a vruntime-ordered red-black
//! tree over the process arena, plus the weight table and timeslice
//! arithmetic the tree's ordering depends on.

use std::sync::atomic::Ordering;

use crate::pcb::Pcb;
use crate::rbtree::RbTree;

/// `prio_to_weight[priority]`, Linux's own table, indexed directly by
/// the (clamped) priority field rather than a nice value centered on
/// zero: priority 0 is the heaviest, 39 the lightest.
pub const WEIGHT_TABLE: [u64; 40] = [
    88761, 71755, 56483, 46273, 36291, 29154, 23254, 18705, 14949, 11916, 9548, 7620, 6100, 4904,
    3906, 3121, 2501, 1991, 1586, 1277, 1024, 820, 655, 526, 423, 335, 272, 215, 172, 137, 110,
    87, 70, 56, 45, 36, 29, 23, 18, 15,
];

pub const SCHED_LATENCY_US_DEFAULT: u64 = 20_000;
pub const MIN_TIMESLICE_US_DEFAULT: u64 = 1_000;

fn weight_for_priority(priority: u8) -> u64 {
    let idx = (priority as usize).min(WEIGHT_TABLE.len() - 1);
    WEIGHT_TABLE[idx]
}

pub struct CfsRunQueue {
    tree: RbTree,
    min_vruntime: i64,
    total_weight: u64,
    sched_latency_us: u64,
    min_timeslice_us: u64,
}

impl CfsRunQueue {
    pub fn new(sched_latency_us: u64, min_timeslice_us: u64) -> Self {
        Self {
            tree: RbTree::new(),
            min_vruntime: 0,
            total_weight: 0,
            sched_latency_us,
            min_timeslice_us,
        }
    }

    /// Reset to an empty runqueue, zeroing the aggregates `enqueue`
    /// accumulates. Idempotent: calling it on an already-empty queue is
    /// a no-op beyond re-zeroing `min_vruntime`.
    pub fn init(&mut self) {
        self.tree = RbTree::new();
        self.min_vruntime = 0;
        self.total_weight = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn has_processes(&self) -> bool {
        !self.is_empty()
    }

    pub fn nr_running(&self) -> usize {
        self.tree.len()
    }

    /// Tear down the runqueue at the end of a run. Identical to `init`
    /// today since the tree owns no resources beyond the arena it never
    /// owns, but kept as its own name so the scheduler's shutdown path
    /// reads as a distinct step from (re)initialization.
    pub fn cleanup(&mut self) {
        self.init();
    }

    fn key_of<'a>(arena: &'a [Pcb]) -> impl Fn(usize) -> i64 + 'a {
        move |i| arena[i].vruntime.load(Ordering::Relaxed)
    }

    /// Insert `pid_index` into the runqueue. New entrants start at
    /// `min_vruntime` so a freshly arrived process cannot starve
    /// everything else by entering at vruntime zero.
    pub fn enqueue(&mut self, arena: &[Pcb], index: usize) {
        let pcb = &arena[index];
        let weight = weight_for_priority(pcb.priority);
        pcb.weight.store(weight, Ordering::Relaxed);
        if pcb.vruntime.load(Ordering::Relaxed) < self.min_vruntime || pcb.start_vruntime().is_none() {
            pcb.vruntime.store(self.min_vruntime, Ordering::Relaxed);
        }
        pcb.record_start_vruntime(pcb.vruntime.load(Ordering::Relaxed));
        self.total_weight += weight;
        self.tree.insert(arena, index, Self::key_of(arena));
    }

    /// Remove the leftmost (smallest vruntime) entry and return it. Does
    /// not touch its vruntime; call [`CfsRunQueue::timeslice`] before
    /// removing to size the process's run.
    pub fn pick_next(&mut self, arena: &[Pcb]) -> Option<usize> {
        let leftmost = self.tree.leftmost(arena)?;
        self.remove(arena, leftmost);
        Some(leftmost)
    }

    pub fn peek_next(&self, arena: &[Pcb]) -> Option<usize> {
        self.tree.leftmost(arena)
    }

    /// Remove `index` from the tree (used both by `pick_next` and when a
    /// process finishes while still queued).
    pub fn remove(&mut self, arena: &[Pcb], index: usize) {
        self.tree.remove(arena, index);
        self.total_weight = self.total_weight.saturating_sub(arena[index].weight.load(Ordering::Relaxed));
        if let Some(leftmost) = self.tree.leftmost(arena) {
            self.min_vruntime = arena[leftmost].vruntime.load(Ordering::Relaxed);
        }
    }

    /// Put a process back after it has been charged its run, re-keying
    /// the tree by its new vruntime.
    pub fn put_prev(&mut self, arena: &[Pcb], index: usize) {
        self.enqueue(arena, index);
    }

    /// `sched_latency_us * weight / total_weight`, floored at
    /// `min_timeslice_us`. `total_weight` must include `index`'s own
    /// weight (call after enqueueing it, before picking it back out).
    pub fn timeslice_us(&self, arena: &[Pcb], index: usize) -> u64 {
        if self.total_weight == 0 {
            return self.min_timeslice_us;
        }
        let weight = arena[index].weight.load(Ordering::Relaxed);
        let raw = self.sched_latency_us.saturating_mul(weight) / self.total_weight;
        raw.max(self.min_timeslice_us)
    }

    /// `vruntime += runtime_ns * 1024 / weight`, the Linux approximation
    /// of "delta scaled by the inverse of the process's weight".
    pub fn update_vruntime(&mut self, arena: &[Pcb], index: usize, runtime_ns: u64) {
        let weight = arena[index].weight.load(Ordering::Relaxed).max(1);
        let delta = (runtime_ns as u128 * 1024 / weight as u128) as i64;
        let pcb = &arena[index];
        let updated = pcb.vruntime.fetch_add(delta, Ordering::Relaxed) + delta;
        if updated < self.min_vruntime {
            self.min_vruntime = updated;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(n: usize) -> Vec<Pcb> {
        (0..n).map(|i| Pcb::new(i as u32, 1000, 10, 1, 0)).collect()
    }

    #[test]
    fn init_clears_tree_and_aggregates() {
        let arena = arena(2);
        let mut rq = CfsRunQueue::new(SCHED_LATENCY_US_DEFAULT, MIN_TIMESLICE_US_DEFAULT);
        rq.enqueue(&arena, 0);
        rq.enqueue(&arena, 1);
        assert!(rq.has_processes());
        rq.init();
        assert!(!rq.has_processes());
        assert_eq!(rq.nr_running(), 0);
        assert_eq!(rq.total_weight, 0);
    }

    #[test]
    fn cleanup_empties_the_queue() {
        let arena = arena(1);
        let mut rq = CfsRunQueue::new(SCHED_LATENCY_US_DEFAULT, MIN_TIMESLICE_US_DEFAULT);
        rq.enqueue(&arena, 0);
        rq.cleanup();
        assert!(rq.is_empty());
    }

    #[test]
    fn higher_priority_gets_larger_weight() {
        assert!(weight_for_priority(0) > weight_for_priority(39));
    }

    #[test]
    fn priority_clamps_at_table_bound() {
        assert_eq!(weight_for_priority(200), weight_for_priority(39));
    }

    #[test]
    fn pick_next_returns_smallest_vruntime() {
        let arena = arena(3);
        arena[0].vruntime.store(100, Ordering::Relaxed);
        arena[1].vruntime.store(10, Ordering::Relaxed);
        arena[2].vruntime.store(50, Ordering::Relaxed);
        let mut rq = CfsRunQueue::new(SCHED_LATENCY_US_DEFAULT, MIN_TIMESLICE_US_DEFAULT);
        for i in 0..3 {
            rq.enqueue(&arena, i);
        }
        let next = rq.pick_next(&arena).unwrap();
        assert_eq!(next, 1);
        assert_eq!(rq.nr_running(), 2);
    }

    #[test]
    fn timeslice_is_floored_at_minimum() {
        let arena = arena(1);
        let mut rq = CfsRunQueue::new(1, 1000);
        rq.enqueue(&arena, 0);
        assert_eq!(rq.timeslice_us(&arena, 0), 1000);
    }

    #[test]
    fn new_entrant_starts_at_min_vruntime_not_zero() {
        let arena = arena(2);
        let mut rq = CfsRunQueue::new(SCHED_LATENCY_US_DEFAULT, MIN_TIMESLICE_US_DEFAULT);
        rq.enqueue(&arena, 0);
        rq.update_vruntime(&arena, 0, 5_000_000);
        let picked = rq.pick_next(&arena).unwrap();
        assert_eq!(picked, 0);
        rq.put_prev(&arena, 0);

        rq.enqueue(&arena, 1);
        assert!(arena[1].vruntime.load(Ordering::Relaxed) >= rq.min_vruntime);
    }

    #[test]
    fn update_vruntime_advances_by_inverse_weight() {
        let arena = arena(1);
        let mut rq = CfsRunQueue::new(SCHED_LATENCY_US_DEFAULT, MIN_TIMESLICE_US_DEFAULT);
        rq.enqueue(&arena, 0);
        let before = arena[0].vruntime.load(Ordering::Relaxed);
        rq.update_vruntime(&arena, 0, 1_000_000);
        let after = arena[0].vruntime.load(Ordering::Relaxed);
        assert!(after > before);
    }
}
