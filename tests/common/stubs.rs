#![allow(dead_code)]

//! Minimal lifecycle-only tasks for scheduler tests, playing the role the
//! fake executors play in process-runner tests: no mailbox, no clients,
//! just observable state transitions and an event log.

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use gavel::task::{TaskHandle, TaskId, TaskState, TaskStatus};

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn log_event(log: &EventLog, event: impl Into<String>) {
    log.lock().unwrap().push(event.into());
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// A stub task that becomes endable as soon as it starts, then waits for a
/// scheduler to end it.
pub fn instant_stub(id: TaskId, log: EventLog) -> TaskHandle {
    let status = Arc::new(TaskStatus::new(id, 1));
    let observer = Arc::clone(&status);
    TaskHandle::new(status, async move {
        if observer.state() != TaskState::New {
            return;
        }
        observer.start();
        log_event(&log, format!("start {id}"));
        observer.mark_endable();
        observer.wait_until(|s| s >= TaskState::Ending).await;
        log_event(&log, format!("resolve {id}"));
        observer.finish();
    })
}

/// A stub task that becomes endable only once `gate` has been notified.
///
/// Use `gate.notify_one()`: the stored permit makes the order of gating and
/// task startup irrelevant.
pub fn gated_stub(id: TaskId, gate: Arc<Notify>, log: EventLog) -> TaskHandle {
    let status = Arc::new(TaskStatus::new(id, 1));
    let observer = Arc::clone(&status);
    TaskHandle::new(status, async move {
        if observer.state() != TaskState::New {
            return;
        }
        observer.start();
        log_event(&log, format!("start {id}"));
        gate.notified().await;
        observer.mark_endable();
        observer.wait_until(|s| s >= TaskState::Ending).await;
        log_event(&log, format!("resolve {id}"));
        observer.finish();
    })
}
