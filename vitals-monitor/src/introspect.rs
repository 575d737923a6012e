//! The seam between the monitor and the runtime it observes.
//!
//! Thread counters, names and stacks come from whatever the embedding
//! runtime can provide; the monitor only consumes them through the
//! [`ThreadIntrospector`] trait. What the runtime cannot provide is
//! declared once, up front, through [`RuntimeCapabilities`], and every
//! consumer skips the corresponding measurements instead of probing
//! again at each tick.

/// What the introspector is able to measure, resolved once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeCapabilities {
    /// Per-thread cumulative CPU time counters are available.
    pub cpu_time: bool,
    /// Per-thread cumulative allocated-byte counters are available.
    pub allocation: bool,
}

/// Point-in-time cumulative counters for one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadCounters {
    /// Runtime-assigned thread id.
    pub id: u64,
    /// Total CPU time in nanoseconds. Negative means the thread has
    /// terminated or the counter is unavailable.
    pub cpu_nanos: i64,
    /// CPU time spent in user mode, in nanoseconds.
    pub user_nanos: i64,
    /// Total bytes the thread has allocated.
    pub allocated_bytes: i64,
}

/// Naming information for one thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadIdentity {
    /// The thread's name.
    pub name: String,
    /// The group the runtime placed the thread in.
    pub group: String,
}

/// One frame of a captured stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackFrame {
    /// The type or module the executing function belongs to.
    pub type_name: String,
    /// The function or method name.
    pub method: String,
}

/// Read access to the threads of the observed runtime.
///
/// All methods are snapshots; nothing here blocks or mutates the
/// observed threads. Lookups by id return `None` for threads that have
/// already gone away.
pub trait ThreadIntrospector: Send + Sync {
    /// What this introspector can measure. Called once; the answer must
    /// not change over the process lifetime.
    fn capabilities(&self) -> RuntimeCapabilities;

    /// Counters for every currently live thread.
    fn counters(&self) -> Vec<ThreadCounters>;

    /// Name and group of the given thread.
    fn identity(&self, id: u64) -> Option<ThreadIdentity>;

    /// The thread's current stack, topmost frame first.
    fn stack(&self, id: u64) -> Option<Vec<StackFrame>>;

    /// Counters for the calling thread, used for task measurement.
    fn current(&self) -> Option<ThreadCounters>;
}

/// An introspector for runtimes that expose nothing.
///
/// Declares no capabilities and sees no threads. With it, a
/// [`Monitor`](crate::Monitor) still drives registered recordables but
/// skips thread statistics and profiling, and task measurement falls
/// back to wall-clock durations.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIntrospector;

impl ThreadIntrospector for NoopIntrospector {
    fn capabilities(&self) -> RuntimeCapabilities {
        RuntimeCapabilities::default()
    }

    fn counters(&self) -> Vec<ThreadCounters> {
        Vec::new()
    }

    fn identity(&self, _id: u64) -> Option<ThreadIdentity> {
        None
    }

    fn stack(&self, _id: u64) -> Option<Vec<StackFrame>> {
        None
    }

    fn current(&self) -> Option<ThreadCounters> {
        None
    }
}
