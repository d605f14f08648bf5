//! Tick-based deferred tasks.
//!
//! Delayed actions (the spawn cast time, the post-death despawn) are
//! queued here against a due tick instead of running on their own clocks.
//! A timer may name an owning entity so that everything tied to that
//! entity's lifetime can be cancelled in one call.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerToken(u64);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct Timer<T> {
    token: TimerToken,
    due_tick: u64,
    owner: Option<EntityId>,
    task: T,
}

/// Queue of tasks ordered by due tick, then by scheduling order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scheduler<T> {
    timers: Vec<Timer<T>>,
    next_token: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            timers: Vec::new(),
            next_token: 1,
        }
    }
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to fire on `due_tick`.
    pub fn schedule(&mut self, due_tick: u64, owner: Option<EntityId>, task: T) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;

        // Tokens only grow, so inserting after every timer due no later
        // keeps ties in scheduling order.
        let index = self.timers.partition_point(|t| t.due_tick <= due_tick);
        self.timers.insert(
            index,
            Timer {
                token,
                due_tick,
                owner,
                task,
            },
        );
        token
    }

    /// Cancel a single timer. Returns `false` if it already fired or never existed.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.token != token);
        self.timers.len() != before
    }

    /// Cancel every timer owned by `owner`, returning how many were dropped.
    pub fn cancel_owned_by(&mut self, owner: EntityId) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| t.owner != Some(owner));
        before - self.timers.len()
    }

    /// Remove and return every task due at or before `now`, in firing order.
    pub fn drain_due(&mut self, now: u64) -> Vec<T> {
        let split = self.timers.partition_point(|t| t.due_tick <= now);
        self.timers.drain(..split).map(|t| t.task).collect()
    }

    /// Number of timers still waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Tick of the next timer to fire.
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.timers.first().map(|t| t.due_tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(5, None, "late");
        scheduler.schedule(2, None, "early");
        assert_eq!(scheduler.drain_due(1), Vec::<&str>::new());
        assert_eq!(scheduler.drain_due(5), vec!["early", "late"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn ties_fire_in_scheduling_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(3, None, 1);
        scheduler.schedule(3, None, 2);
        scheduler.schedule(3, None, 3);
        assert_eq!(scheduler.drain_due(3), vec![1, 2, 3]);
    }

    #[test]
    fn cancel_by_token() {
        let mut scheduler = Scheduler::new();
        let keep = scheduler.schedule(1, None, "keep");
        let drop = scheduler.schedule(1, None, "drop");
        assert!(scheduler.cancel(drop));
        assert!(!scheduler.cancel(drop));
        assert_eq!(scheduler.drain_due(1), vec!["keep"]);
        assert!(!scheduler.cancel(keep));
    }

    #[test]
    fn cancel_by_owner() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(4, Some(7), 'a');
        scheduler.schedule(4, Some(8), 'b');
        scheduler.schedule(6, Some(7), 'c');
        assert_eq!(scheduler.cancel_owned_by(7), 2);
        assert_eq!(scheduler.next_due(), Some(4));
        assert_eq!(scheduler.drain_due(10), vec!['b']);
    }
}
