// src/task/status.rs

//! Guarded task state and the schedulable handle around it.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::task::lock::StateLock;
use crate::task::state::TaskState;
use crate::task::{SessionId, TaskId};

struct StatusInner {
    state: TaskState,
    lock: Arc<StateLock>,
}

/// Thread-safe state cell for one task.
///
/// All transitions go through the table in [`TaskState::can_transition_to`]
/// and return a success flag instead of an error; a rejected transition
/// leaves the state untouched. Every successful transition wakes all
/// waiters on the current [`StateLock`].
pub struct TaskStatus {
    task_id: TaskId,
    session_id: SessionId,
    inner: Mutex<StatusInner>,
}

impl TaskStatus {
    pub fn new(task_id: TaskId, session_id: SessionId) -> Self {
        Self {
            task_id,
            session_id,
            inner: Mutex::new(StatusInner {
                state: TaskState::New,
                lock: Arc::new(StateLock::new()),
            }),
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Current state, read under the lock.
    pub fn state(&self) -> TaskState {
        self.inner.lock().expect("task state poisoned").state
    }

    /// Replace the wakeup handle used by this task.
    ///
    /// Legal only while the task is still `New`; a scheduler calls this for
    /// every task before execution so they all share one handle. Returns
    /// false (and changes nothing) once the task has started.
    pub fn set_state_lock(&self, lock: Arc<StateLock>) -> bool {
        let mut inner = self.inner.lock().expect("task state poisoned");
        if inner.state != TaskState::New {
            return false;
        }
        inner.lock = lock;
        true
    }

    /// `New -> Running`; called once by the run loop.
    pub fn start(&self) -> bool {
        self.try_transition(TaskState::Running)
    }

    /// `Running -> Endable`; called by task logic when its local end
    /// condition holds.
    pub fn mark_endable(&self) -> bool {
        self.try_transition(TaskState::Endable)
    }

    /// `Endable -> Running`; called by task logic that no longer wants to
    /// be ended (e.g. a late bid extended the timer).
    pub fn resume(&self) -> bool {
        self.try_transition(TaskState::Running)
    }

    /// `Endable -> Ending`; called by a scheduler once every end partner is
    /// ready.
    pub fn try_end(&self) -> bool {
        self.try_transition(TaskState::Ending)
    }

    /// `Ending -> Ended`; called by the run loop after resolution.
    pub fn finish(&self) -> bool {
        self.try_transition(TaskState::Ended)
    }

    /// Block until `pred` holds for the current state.
    pub async fn wait_until<F>(&self, mut pred: F)
    where
        F: FnMut(TaskState) -> bool,
    {
        let lock = self.shared_lock();
        lock.wait_until(|| pred(self.state())).await;
    }

    /// Block until the task is `Ended`.
    pub async fn wait_for_end(&self) {
        self.wait_until(|s| s == TaskState::Ended).await;
    }

    fn shared_lock(&self) -> Arc<StateLock> {
        Arc::clone(&self.inner.lock().expect("task state poisoned").lock)
    }

    fn try_transition(&self, to: TaskState) -> bool {
        let lock = {
            let mut inner = self.inner.lock().expect("task state poisoned");
            if !inner.state.can_transition_to(to) {
                return false;
            }
            debug!(task = self.task_id, from = %inner.state, to = %to, "task state change");
            inner.state = to;
            Arc::clone(&inner.lock)
        };
        // Wake waiters outside the mutex; they re-check under it anyway.
        lock.notify_all();
        true
    }
}

impl std::fmt::Debug for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStatus")
            .field("task_id", &self.task_id)
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .finish()
    }
}

type Runner = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A unit of schedulable work: a shared status observer plus the task's
/// single-shot runner future.
///
/// The scheduler takes the runner exactly once when the task becomes
/// startable and spawns it on the runtime; the status stays behind for
/// state reads and waits.
pub struct TaskHandle {
    status: Arc<TaskStatus>,
    runner: Mutex<Option<Runner>>,
}

impl TaskHandle {
    pub fn new<F>(status: Arc<TaskStatus>, runner: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            status,
            runner: Mutex::new(Some(Box::pin(runner))),
        }
    }

    pub fn status(&self) -> &Arc<TaskStatus> {
        &self.status
    }

    /// Take the runner future, if it has not been taken already.
    pub fn take_runner(&self) -> Option<Runner> {
        self.runner.lock().expect("task runner poisoned").take()
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("status", &self.status)
            .field(
                "runner_taken",
                &self.runner.lock().expect("task runner poisoned").is_none(),
            )
            .finish()
    }
}
