// src/task/state.rs

/// Lifecycle state of a task.
///
/// The derived `Ord` follows lifecycle order, so scheduling conditions like
/// "at least `Endable`" are plain comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskState {
    /// Constructed but not yet run.
    New,
    /// The run loop is processing messages.
    Running,
    /// The task's local end condition holds; it may still process messages
    /// and may be resumed.
    Endable,
    /// A scheduler has committed to ending the task; no way back.
    Ending,
    /// Terminal.
    Ended,
}

impl TaskState {
    /// Whether the edge `from -> to` is part of the lifecycle.
    ///
    /// Everything not listed here is rejected, `Ended` in particular has no
    /// outgoing edges.
    pub fn can_transition_to(self, to: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, to),
            (New, Running)
                | (Running, Endable)
                | (Endable, Running)
                | (Endable, Ending)
                | (Ending, Ended)
        )
    }

    /// Lower-case name used in log lines.
    pub fn name(self) -> &'static str {
        match self {
            TaskState::New => "new",
            TaskState::Running => "running",
            TaskState::Endable => "endable",
            TaskState::Ending => "ending",
            TaskState::Ended => "ended",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
