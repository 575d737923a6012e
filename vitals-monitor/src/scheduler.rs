use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use vitals_core::{Error, ErrorHandler, MetricSink};

use crate::recordable::Recordable;

struct Entry {
    due: Instant,
    name: String,
    recordable: Box<dyn Recordable>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Entry) -> bool {
        self.due == other.due
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Entry) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so the binary heap surfaces the earliest due entry.
    fn cmp(&self, other: &Entry) -> Ordering {
        other.due.cmp(&self.due)
    }
}

struct State {
    queue: BinaryHeap<Entry>,
    names: HashSet<String>,
    shutdown: bool,
}

struct SchedulerInner {
    sink: Arc<dyn MetricSink>,
    interval: Duration,
    handler: ErrorHandler,
    state: Mutex<State>,
    cvar: Condvar,
}

impl SchedulerInner {
    /// Runs every entry due at `now`, outside the lock, and re-arms
    /// the survivors at `now + interval`.
    fn run_due(&self, now: Instant) {
        let mut due = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            while state.queue.peek().map_or(false, |entry| entry.due <= now) {
                if let Some(entry) = state.queue.pop() {
                    due.push(entry);
                }
            }
        }

        for mut entry in due {
            if let Err(err) = entry.recordable.record(self.sink.as_ref()) {
                (self.handler)(&Error::Record {
                    name: entry.name.clone(),
                    source: err.into(),
                });
            }
            let mut state = self.state.lock().unwrap();
            if entry.recordable.is_valid() {
                entry.due = now + self.interval;
                state.queue.push(entry);
            } else {
                state.names.remove(&entry.name);
            }
        }
    }

    fn drive(&self) {
        loop {
            if self.state.lock().unwrap().shutdown {
                return;
            }
            self.run_due(Instant::now());

            let state = self.state.lock().unwrap();
            if state.shutdown {
                return;
            }
            let now = Instant::now();
            match state.queue.peek().map(|entry| entry.due) {
                Some(due) if due <= now => drop(state),
                Some(due) => {
                    let (state, _) = self.cvar.wait_timeout(state, due - now).unwrap();
                    drop(state);
                }
                None => {
                    let state = self.cvar.wait(state).unwrap();
                    drop(state);
                }
            }
        }
    }
}

/// Drives every registered [`Recordable`] on one shared interval.
///
/// All entries live in a single delay queue served by one driver
/// thread, so a hundred producers still cost one timer and one thread.
/// Entries are invoked with the queue lock released and never
/// concurrently with themselves; a failing entry is reported through
/// the error handler and retried on its next turn, an entry whose
/// [`Recordable::is_valid`] turns false is retired and its name freed.
///
/// Registration works at any time; a new entry first runs one interval
/// after it was registered.
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates a scheduler writing to `sink` every `interval`.
    ///
    /// Nothing runs until [`start`](Scheduler::start) is called.
    pub fn new(sink: Arc<dyn MetricSink>, interval: Duration, handler: ErrorHandler) -> Scheduler {
        Scheduler {
            inner: Arc::new(SchedulerInner {
                sink,
                interval,
                handler,
                state: Mutex::new(State {
                    queue: BinaryHeap::new(),
                    names: HashSet::new(),
                    shutdown: false,
                }),
                cvar: Condvar::new(),
            }),
            driver: Mutex::new(None),
        }
    }

    /// Registers a producer under a unique name.
    ///
    /// Fails with [`Error::DuplicateRecordable`] when the name is
    /// taken, leaving the existing entry untouched.
    pub fn register<R>(&self, name: impl Into<String>, recordable: R) -> Result<(), Error>
    where
        R: Recordable + 'static,
    {
        let name = name.into();
        let mut state = self.inner.state.lock().unwrap();
        if !state.names.insert(name.clone()) {
            return Err(Error::DuplicateRecordable(name));
        }
        state.queue.push(Entry {
            due: Instant::now() + self.inner.interval,
            name,
            recordable: Box::new(recordable),
        });
        drop(state);
        self.inner.cvar.notify_all();
        Ok(())
    }

    /// Starts the driver thread. Does nothing if it is already running.
    pub fn start(&self) {
        let mut driver = self.driver.lock().unwrap();
        if driver.is_some() {
            return;
        }
        self.inner.state.lock().unwrap().shutdown = false;
        let inner = self.inner.clone();
        *driver = thread::Builder::new()
            .name("vitals-scheduler".into())
            .spawn(move || inner.drive())
            .ok();
    }

    /// Stops the driver thread and waits for it to finish its tick.
    pub fn stop(&self) {
        self.inner.state.lock().unwrap().shutdown = true;
        self.inner.cvar.notify_all();
        if let Some(handle) = self.driver.lock().unwrap().take() {
            handle.join().ok();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
