//! Shared identifiers and the job model used across the system.

/// Unit of work handed from producers to consumers. Always in `0..JOB_BOUND`.
pub type Job = u32;
/// Exclusive upper bound for generated job values.
pub const JOB_BOUND: u32 = 100;
/// Identifier of a producer or consumer thread, unique within its role.
pub type TaskId = usize;

/// Which side of the queue a task works on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskRole {
    Producer,
    Consumer,
}

impl TaskRole {
    /// Thread name used for spawning and log output, e.g. `producer-0`.
    pub fn thread_name(self, id: TaskId) -> String {
        match self {
            TaskRole::Producer => format!("producer-{id}"),
            TaskRole::Consumer => format!("consumer-{id}"),
        }
    }
}
