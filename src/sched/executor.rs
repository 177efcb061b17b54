// src/sched/executor.rs

//! Schedule execution: drive a set of tasks through their lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::sched::schedule::Schedule;
use crate::task::{StateLock, TaskHandle, TaskId, TaskState};

impl Schedule {
    /// Execute the schedule over the given tasks.
    ///
    /// The procedure is the simplest thing that satisfies both graphs: try
    /// to end every endable task, wait for those to end, start every
    /// startable task, and repeat until nothing is startable and nothing is
    /// live. Tasks in the map that were never added to the schedule are
    /// ignored.
    ///
    /// Before the loop every task's wakeup handle is replaced with a single
    /// shared one, so a state change in any task wakes the loop without the
    /// tasks knowing anything about the schedule driving them.
    ///
    /// There is no cycle precheck; callers who want one can run
    /// [`Schedule::topological_sort`] first. A cyclic start graph makes no
    /// task startable, nothing ever runs, and the loop exits on its first
    /// pass having started nothing. A live task that never becomes endable
    /// stalls the loop; schedule correctness is the caller's
    /// responsibility.
    pub async fn execute(&self, tasks: HashMap<TaskId, TaskHandle>) -> Result<()> {
        let shared = Arc::new(StateLock::new());
        for handle in tasks.values() {
            if !handle.status().set_state_lock(Arc::clone(&shared)) {
                warn!(
                    task = handle.status().task_id(),
                    "task already started; cannot share its state lock"
                );
            }
        }

        let mut runners: JoinSet<()> = JoinSet::new();

        loop {
            // End every task whose own state and end partners allow it,
            // then wait for each to finish resolving. Other tasks may
            // become endable during the wait; the next iteration picks
            // them up.
            let endable = self.endable_set(&tasks);
            let mut ending = Vec::with_capacity(endable.len());
            for id in &endable {
                debug!(task = id, "ending task");
                // A task may have resumed itself since the set was
                // computed; it will be picked up again on a later pass.
                if tasks[id].status().try_end() {
                    ending.push(*id);
                }
            }
            for id in &ending {
                tasks[id].status().wait_for_end().await;
                info!(task = id, "task ended");
            }

            let startable = self.startable_set(&tasks);
            for id in &startable {
                if let Some(runner) = tasks[id].take_runner() {
                    info!(task = id, "starting task");
                    runners.spawn(runner);
                }
            }

            // Done once nothing was just started and nothing is live. The
            // startable check matters: a task spawned above may not have
            // reached `Running` yet.
            if startable.is_empty() && self.is_quiescent(&tasks) {
                break;
            }

            // Block until the endable set changes; that is what keys every
            // action of this loop.
            let snapshot = endable;
            shared
                .wait_until(|| self.endable_set(&tasks) != snapshot)
                .await;
        }

        // Drain the worker pool.
        while runners.join_next().await.is_some() {}

        Ok(())
    }

    /// Tasks eligible to be ended now: state exactly `Endable`, and every
    /// end dependency present in the map with state at least `Endable`.
    fn endable_set(&self, tasks: &HashMap<TaskId, TaskHandle>) -> Vec<TaskId> {
        let mut endable: Vec<TaskId> = tasks
            .iter()
            .filter(|(id, handle)| {
                if handle.status().state() != TaskState::Endable {
                    return false;
                }
                let Some(deps) = self.end_depends(**id) else {
                    // Not part of this schedule.
                    return false;
                };
                deps.iter().all(|dep| {
                    tasks
                        .get(dep)
                        .is_some_and(|d| d.status().state() >= TaskState::Endable)
                })
            })
            .map(|(id, _)| *id)
            .collect();
        endable.sort_unstable();
        endable
    }

    /// Tasks eligible to start now: state `New`, every start dependency
    /// present and `Ended`, and every end dependency present in the map.
    /// A task whose end partner is unreachable must never start.
    fn startable_set(&self, tasks: &HashMap<TaskId, TaskHandle>) -> Vec<TaskId> {
        let mut startable: Vec<TaskId> = tasks
            .iter()
            .filter(|(id, handle)| {
                if handle.status().state() != TaskState::New {
                    return false;
                }
                let (Some(start_deps), Some(end_deps)) =
                    (self.start_depends(**id), self.end_depends(**id))
                else {
                    return false;
                };
                start_deps.iter().all(|dep| {
                    tasks
                        .get(dep)
                        .is_some_and(|d| d.status().state() == TaskState::Ended)
                }) && end_deps.iter().all(|dep| tasks.contains_key(dep))
            })
            .map(|(id, _)| *id)
            .collect();
        startable.sort_unstable();
        startable
    }

    /// True when no task is `Running`, `Endable`, or `Ending`.
    fn is_quiescent(&self, tasks: &HashMap<TaskId, TaskHandle>) -> bool {
        !tasks.values().any(|handle| {
            matches!(
                handle.status().state(),
                TaskState::Running | TaskState::Endable | TaskState::Ending
            )
        })
    }
}
