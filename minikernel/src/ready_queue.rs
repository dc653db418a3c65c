//! FIFO ready queue shared by FCFS and round-robin, with a
//! priority-ordered peek/dequeue used by the priority scheduler.
//!
//! Backed by a `Mutex<VecDeque<usize>>` of arena indices plus a
//! `Condvar` so a scheduler thread can block until work arrives instead
//! of busy-polling.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::pcb::Pcb;

pub struct ReadyQueue {
    queue: Mutex<VecDeque<usize>>,
    cv: Condvar,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            cv: Condvar::new(),
        }
    }

    pub fn enqueue(&self, index: usize) {
        self.queue.lock().unwrap().push_back(index);
        self.cv.notify_all();
    }

    /// Insert `index` so the queue stays ordered by ascending priority
    /// value (lowest number = highest priority). Ties keep insertion
    /// order: `index` lands after every existing entry of equal
    /// priority, never before.
    pub fn enqueue_by_priority(&self, index: usize, arena: &[Pcb]) {
        let mut guard = self.queue.lock().unwrap();
        let priority = arena[index].priority;
        let pos = guard.iter().position(|&i| arena[i].priority > priority).unwrap_or(guard.len());
        guard.insert(pos, index);
        drop(guard);
        self.cv.notify_all();
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Pop the front of the queue (FCFS / round-robin order).
    pub fn dequeue(&self) -> Option<usize> {
        self.queue.lock().unwrap().pop_front()
    }

    /// Remove the arena index whose priority is numerically lowest
    /// (lowest number = highest priority); on ties the one closer to the
    /// front of the queue wins, matching `Iterator::min_by_key`'s
    /// first-element tie-break.
    pub fn dequeue_highest_priority(&self, arena: &[Pcb]) -> Option<usize> {
        let mut guard = self.queue.lock().unwrap();
        let (pos, _) = guard
            .iter()
            .enumerate()
            .min_by_key(|&(_, &index)| arena[index].priority)?;
        guard.remove(pos)
    }

    pub fn peek_highest_priority(&self, arena: &[Pcb]) -> Option<usize> {
        let guard = self.queue.lock().unwrap();
        guard
            .iter()
            .min_by_key(|&&index| arena[index].priority)
            .copied()
    }

    /// Remove a specific index if present (used when a process is
    /// plucked out of order, e.g. dual-cpu assignment).
    pub fn remove(&self, index: usize) -> bool {
        let mut guard = self.queue.lock().unwrap();
        if let Some(pos) = guard.iter().position(|&i| i == index) {
            guard.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.queue.lock().unwrap().contains(&index)
    }

    /// Wake every waiter without changing the queue's contents, used
    /// when the generator finishes so idle waiters re-check their
    /// termination predicate.
    pub fn notify_all(&self) {
        self.cv.notify_all();
    }

    /// Block until the queue is non-empty or `timeout` elapses, then
    /// pop the front. Used by scheduler loops that otherwise have
    /// nothing to do but wait for the generator.
    pub fn wait_and_dequeue(&self, timeout: Duration) -> Option<usize> {
        let guard = self.queue.lock().unwrap();
        let (mut guard, _) = self
            .cv
            .wait_timeout_while(guard, timeout, |q| q.is_empty())
            .unwrap();
        guard.pop_front()
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}
