//! Process Control Block and the red-black tree links it carries while a
//! member of the CFS runqueue.
//!
//! PCBs live in a fixed-size arena (`SchedulerEngine::processes`, a
//! `Vec<Pcb>` built once at engine construction and never resized), so
//! every reference to a process after that point is a plain array index
//! rather than a pointer. The red-black tree therefore does not need
//! `Arc`/`Rc` nodes or raw pointers: a node's parent/children are simply
//! `Option<usize>` indices back into the same arena, stored on the PCB
//! itself ("nodes are the PCBs"), with tree membership segregated from
//! PCB identity per the index-vs-pointer split.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64};
use std::sync::{Condvar, Mutex};
use std::thread::ThreadId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

impl Default for Color {
    fn default() -> Self {
        Color::Red
    }
}

/// Red-black tree links for a PCB while it is a member of the CFS
/// runqueue. Meaningful only while `in_tree` is true.
#[derive(Debug, Default)]
pub(crate) struct TreeLink {
    pub parent: Option<usize>,
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub color: Color,
    pub in_tree: bool,
}

struct PcbState {
    remaining_ms: u64,
    state: ProcessState,
}

pub struct Pcb {
    pub pid: u32,
    pub total_duration_ms: u64,
    pub priority: u8,
    pub thread_count: u32,
    pub arrival_ms: u64,

    state: Mutex<PcbState>,
    pub(crate) cv: Condvar,

    pub should_preempt: AtomicBool,

    pub(crate) vruntime: AtomicI64,
    pub(crate) weight: AtomicU64,
    start_vruntime: Mutex<Option<i64>>,

    pub(crate) tree: Mutex<TreeLink>,

    thread_ids: Mutex<Vec<ThreadId>>,
}

impl Pcb {
    pub fn new(
        pid: u32,
        total_duration_ms: u64,
        priority: u8,
        thread_count: u32,
        arrival_ms: u64,
    ) -> Self {
        Self {
            pid,
            total_duration_ms,
            priority,
            thread_count,
            arrival_ms,
            state: Mutex::new(PcbState {
                remaining_ms: total_duration_ms,
                state: ProcessState::Ready,
            }),
            cv: Condvar::new(),
            should_preempt: AtomicBool::new(false),
            vruntime: AtomicI64::new(0),
            weight: AtomicU64::new(0),
            start_vruntime: Mutex::new(None),
            tree: Mutex::new(TreeLink::default()),
            thread_ids: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state.lock().unwrap().state
    }

    pub fn remaining_ms(&self) -> u64 {
        self.state.lock().unwrap().remaining_ms
    }

    pub fn is_finished(&self) -> bool {
        self.state() == ProcessState::Finished
    }

    pub fn register_thread(&self, id: ThreadId) {
        self.thread_ids.lock().unwrap().push(id);
    }

    pub fn thread_ids(&self) -> Vec<ThreadId> {
        self.thread_ids.lock().unwrap().clone()
    }

    /// Record the vruntime this PCB first entered the CFS runqueue with,
    /// if it hasn't already been recorded.
    pub(crate) fn record_start_vruntime(&self, v: i64) {
        let mut slot = self.start_vruntime.lock().unwrap();
        if slot.is_none() {
            *slot = Some(v);
        }
    }

    pub fn start_vruntime(&self) -> Option<i64> {
        *self.start_vruntime.lock().unwrap()
    }

    /// READY/RUNNING -> RUNNING, broadcasting the change to any worker
    /// blocked in `wait_for_dispatch`.
    pub fn set_running(&self) {
        let mut guard = self.state.lock().unwrap();
        guard.state = ProcessState::Running;
        drop(guard);
        self.cv.notify_all();
    }

    /// RUNNING -> READY (preemption). Only valid while `remaining_ms > 0`.
    pub fn set_ready(&self) {
        let mut guard = self.state.lock().unwrap();
        debug_assert!(guard.remaining_ms > 0, "finished processes are never re-readied");
        guard.state = ProcessState::Ready;
        drop(guard);
        self.cv.notify_all();
    }

    /// Decrement `remaining_ms` by `min(amount_ms, remaining_ms)`, under
    /// the PCB lock, transitioning to FINISHED if it reaches zero.
    /// Returns the remaining time after the debit.
    pub fn debit(&self, amount_ms: u64) -> u64 {
        let mut guard = self.state.lock().unwrap();
        let delta = amount_ms.min(guard.remaining_ms);
        guard.remaining_ms -= delta;
        if guard.remaining_ms == 0 {
            guard.state = ProcessState::Finished;
        }
        let remaining = guard.remaining_ms;
        drop(guard);
        self.cv.notify_all();
        remaining
    }

    /// Force a transition straight to FINISHED without ever running,
    /// used when the process is skipped because one of its worker
    /// threads failed to spawn: any sibling workers already blocked in
    /// `wait_for_dispatch` need a way out that isn't RUNNING.
    pub(crate) fn force_finish(&self) {
        let mut guard = self.state.lock().unwrap();
        guard.remaining_ms = 0;
        guard.state = ProcessState::Finished;
        drop(guard);
        self.cv.notify_all();
    }

    /// Worker contract: block while `state` is neither RUNNING nor
    /// FINISHED. Returns the state that unblocked the wait.
    pub fn wait_for_dispatch(&self) -> ProcessState {
        let mut guard = self.state.lock().unwrap();
        while !matches!(guard.state, ProcessState::Running | ProcessState::Finished) {
            guard = self.cv.wait(guard).unwrap();
        }
        guard.state
    }

    /// Block while `state == RUNNING`. Used by workers under policies
    /// where the scheduler itself drives the `remaining_ms` debit.
    pub fn wait_while_running(&self) {
        let mut guard = self.state.lock().unwrap();
        while guard.state == ProcessState::Running {
            guard = self.cv.wait(guard).unwrap();
        }
    }

    /// Block until FINISHED. Used by the FCFS scheduler, which dispatches
    /// a process and waits for its own worker thread(s) to drive it to
    /// completion.
    pub fn wait_until_finished(&self) {
        let mut guard = self.state.lock().unwrap();
        while guard.state != ProcessState::Finished {
            guard = self.cv.wait(guard).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn new_pcb_is_ready_with_full_remaining_time() {
        let pcb = Pcb::new(1, 1000, 3, 1, 0);
        assert_eq!(pcb.state(), ProcessState::Ready);
        assert_eq!(pcb.remaining_ms(), 1000);
    }

    #[test]
    fn debit_reaches_zero_and_finishes() {
        let pcb = Pcb::new(1, 500, 1, 1, 0);
        pcb.set_running();
        assert_eq!(pcb.debit(300), 200);
        assert_eq!(pcb.state(), ProcessState::Running);
        assert_eq!(pcb.debit(300), 0);
        assert_eq!(pcb.state(), ProcessState::Finished);
    }

    #[test]
    fn debit_never_goes_negative() {
        let pcb = Pcb::new(1, 100, 1, 1, 0);
        assert_eq!(pcb.debit(1000), 0);
        assert!(pcb.is_finished());
    }

    #[test]
    fn ready_running_ready_cycle() {
        let pcb = Pcb::new(1, 1000, 1, 1, 0);
        pcb.set_running();
        assert_eq!(pcb.state(), ProcessState::Running);
        pcb.set_ready();
        assert_eq!(pcb.state(), ProcessState::Ready);
    }

    #[test]
    fn wait_for_dispatch_unblocks_on_running() {
        let pcb = Arc::new(Pcb::new(1, 1000, 1, 1, 0));
        let waiter = {
            let pcb = Arc::clone(&pcb);
            thread::spawn(move || pcb.wait_for_dispatch())
        };
        thread::sleep(std::time::Duration::from_millis(20));
        pcb.set_running();
        assert_eq!(waiter.join().unwrap(), ProcessState::Running);
    }

    #[test]
    fn wait_while_running_unblocks_on_preemption() {
        let pcb = Arc::new(Pcb::new(1, 1000, 1, 1, 0));
        pcb.set_running();
        let waiter = {
            let pcb = Arc::clone(&pcb);
            thread::spawn(move || pcb.wait_while_running())
        };
        thread::sleep(std::time::Duration::from_millis(20));
        pcb.set_ready();
        waiter.join().unwrap();
    }

    #[test]
    fn force_finish_unblocks_waiting_workers() {
        let pcb = Arc::new(Pcb::new(1, 1000, 1, 2, 0));
        let waiter = {
            let pcb = Arc::clone(&pcb);
            thread::spawn(move || pcb.wait_for_dispatch())
        };
        thread::sleep(std::time::Duration::from_millis(20));
        pcb.force_finish();
        assert_eq!(waiter.join().unwrap(), ProcessState::Finished);
        assert_eq!(pcb.remaining_ms(), 0);
    }

    #[test]
    fn start_vruntime_is_recorded_once() {
        let pcb = Pcb::new(1, 1000, 1, 1, 0);
        pcb.record_start_vruntime(42);
        pcb.record_start_vruntime(99);
        assert_eq!(pcb.start_vruntime(), Some(42));
    }
}
