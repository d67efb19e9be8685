//! Deferred actions with generation-based invalidation.
//!
//! Actions are posted to run on a later tick. The queue carries a generation
//! counter: advancing it supersedes everything posted before, and superseded
//! actions are dropped when they come due instead of running against state
//! they were not scheduled for.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::logging::targets;

/// A unique identifier for a deferred action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug)]
struct TaskData<A> {
    id: TaskId,
    due: Instant,
    generation: u64,
    action: A,
}

/// Queue of actions to run once their due time has passed.
#[derive(Debug)]
pub struct DeferredQueue<A> {
    tasks: VecDeque<TaskData<A>>,
    generation: u64,
}

impl<A> DeferredQueue<A> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
            generation: 0,
        }
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Post an action to run `delay` after `now`, tagged with the current generation.
    pub fn post(&mut self, now: Instant, delay: Duration, action: A) -> TaskId {
        let id = next_task_id();
        self.tasks.push_back(TaskData {
            id,
            due: now + delay,
            generation: self.generation,
            action,
        });
        id
    }

    /// Cancel a pending action.
    ///
    /// Returns `true` if the action was found and cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        if let Some(pos) = self.tasks.iter().position(|t| t.id == id) {
            self.tasks.remove(pos);
            true
        } else {
            false
        }
    }

    /// Supersede every pending action.
    pub fn advance_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Check if there are any pending actions.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Get the number of pending actions.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Remove and return due actions of the current generation, in post order.
    ///
    /// Due actions from older generations are discarded.
    pub fn take_due(&mut self, now: Instant) -> Vec<A> {
        let mut ready = Vec::new();
        let mut remaining = VecDeque::with_capacity(self.tasks.len());

        for task in self.tasks.drain(..) {
            if task.due > now {
                remaining.push_back(task);
            } else if task.generation == self.generation {
                ready.push(task.action);
            } else {
                tracing::trace!(
                    target: targets::TASK,
                    id = task.id.as_u64(),
                    stale_generation = task.generation,
                    "dropping superseded action"
                );
            }
        }

        self.tasks = remaining;
        ready
    }
}

impl<A> Default for DeferredQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_actions_run_in_order() {
        let now = Instant::now();
        let mut queue = DeferredQueue::new();
        queue.post(now, Duration::ZERO, "a");
        queue.post(now, Duration::from_millis(5), "b");
        queue.post(now, Duration::ZERO, "c");

        assert_eq!(queue.take_due(now), vec!["a", "c"]);
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.take_due(now + Duration::from_millis(5)), vec!["b"]);
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_superseded_actions_are_dropped() {
        let now = Instant::now();
        let mut queue = DeferredQueue::new();
        queue.post(now, Duration::ZERO, 1);
        queue.advance_generation();
        queue.post(now, Duration::ZERO, 2);

        assert_eq!(queue.take_due(now), vec![2]);
    }

    #[test]
    fn test_cancel() {
        let now = Instant::now();
        let mut queue = DeferredQueue::new();
        let id = queue.post(now, Duration::ZERO, ());
        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert!(queue.take_due(now).is_empty());
    }
}
