//! Cooperative periodic task scheduler
//!
//! A thin rate limiter driven from the main loop. Each pass walks the tasks
//! in registration order and fires every task whose interval has elapsed,
//! handing it the time that actually passed since its previous run. Tasks
//! run to completion and must not block. Nothing here knows what a task
//! does; the context type `C` is whatever the callbacks operate on.

use heapless::Vec;
use thiserror_no_std::Error;

/// Timing information handed to a firing task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTick {
    /// Loop time at which the task fired (ms)
    pub now_ms: u64,
    /// Actual time since the task last fired (ms), not the nominal interval
    pub delta_ms: u64,
}

/// Task body
pub type TaskFn<C> = fn(&mut C, TaskTick);

/// One periodic unit of work
pub struct Task<C> {
    name: &'static str,
    interval_ms: u64,
    last_run_ms: u64,
    callback: TaskFn<C>,
}

impl<C> Task<C> {
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub const fn last_run_ms(&self) -> u64 {
        self.last_run_ms
    }

    /// True once at least one interval has passed since the last run
    pub const fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_run_ms) >= self.interval_ms
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Task table is full")]
    Full,
}

/// Fixed-capacity scheduler for up to `N` tasks
pub struct Scheduler<C, const N: usize> {
    tasks: Vec<Task<C>, N>,
}

impl<C, const N: usize> Scheduler<C, N> {
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Add a task. Its first run is one interval after `now_ms`.
    pub fn register(
        &mut self,
        name: &'static str,
        interval_ms: u32,
        callback: TaskFn<C>,
        now_ms: u64,
    ) -> Result<(), SchedulerError> {
        self.tasks
            .push(Task {
                name,
                interval_ms: u64::from(interval_ms),
                last_run_ms: now_ms,
                callback,
            })
            .map_err(|_| SchedulerError::Full)
    }

    /// Run every due task once, in registration order.
    ///
    /// Returns how many tasks fired.
    pub fn run_pending(&mut self, ctx: &mut C, now_ms: u64) -> usize {
        let mut fired = 0;
        for task in self.tasks.iter_mut() {
            if !task.is_due(now_ms) {
                continue;
            }
            let tick = TaskTick {
                now_ms,
                delta_ms: now_ms.saturating_sub(task.last_run_ms),
            };
            task.last_run_ms = now_ms;
            (task.callback)(ctx, tick);
            fired += 1;
        }
        fired
    }

    pub fn tasks(&self) -> &[Task<C>] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<C, const N: usize> Default for Scheduler<C, N> {
    fn default() -> Self {
        Self::new()
    }
}
