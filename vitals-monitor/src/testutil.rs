//! Shared helpers for the unit tests in this crate: a sink that records
//! structured calls and a fully scriptable introspector.

use std::collections::VecDeque;
use std::mem;
use std::sync::{Arc, Mutex};

use vitals_core::{MetricSink, Tags};

use crate::introspect::{
    RuntimeCapabilities, StackFrame, ThreadCounters, ThreadIdentity, ThreadIntrospector,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Count(String, i64, Vec<String>),
    Gauge(String, i64, Vec<String>),
    GaugeFloat(String, f64, Vec<String>),
    Histogram(String, i64, Vec<String>),
    HistogramFloat(String, f64, Vec<String>),
    Time(String, i64, Vec<String>),
    Set(String, String, Vec<String>),
}

impl Recorded {
    pub fn metric(&self) -> &str {
        match self {
            Recorded::Count(metric, ..)
            | Recorded::Gauge(metric, ..)
            | Recorded::GaugeFloat(metric, ..)
            | Recorded::Histogram(metric, ..)
            | Recorded::HistogramFloat(metric, ..)
            | Recorded::Time(metric, ..)
            | Recorded::Set(metric, ..) => metric,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<Recorded>>,
}

impl RecordingSink {
    pub fn new() -> Arc<RecordingSink> {
        Arc::new(RecordingSink::default())
    }

    pub fn take(&self) -> Vec<Recorded> {
        mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn take_metric(&self, metric: &str) -> Vec<Recorded> {
        self.take()
            .into_iter()
            .filter(|call| call.metric() == metric)
            .collect()
    }
}

fn entries(tags: &Tags) -> Vec<String> {
    tags.entries().to_vec()
}

impl MetricSink for RecordingSink {
    fn count(&self, metric: &str, delta: i64, tags: &Tags) {
        self.calls
            .lock()
            .unwrap()
            .push(Recorded::Count(metric.into(), delta, entries(tags)));
    }

    fn gauge(&self, metric: &str, value: i64, tags: &Tags) {
        self.calls
            .lock()
            .unwrap()
            .push(Recorded::Gauge(metric.into(), value, entries(tags)));
    }

    fn gauge_float(&self, metric: &str, value: f64, tags: &Tags) {
        self.calls
            .lock()
            .unwrap()
            .push(Recorded::GaugeFloat(metric.into(), value, entries(tags)));
    }

    fn histogram(&self, metric: &str, value: i64, tags: &Tags) {
        self.calls
            .lock()
            .unwrap()
            .push(Recorded::Histogram(metric.into(), value, entries(tags)));
    }

    fn histogram_float(&self, metric: &str, value: f64, tags: &Tags) {
        self.calls
            .lock()
            .unwrap()
            .push(Recorded::HistogramFloat(metric.into(), value, entries(tags)));
    }

    fn time(&self, metric: &str, millis: i64, tags: &Tags) {
        self.calls
            .lock()
            .unwrap()
            .push(Recorded::Time(metric.into(), millis, entries(tags)));
    }

    fn set(&self, metric: &str, member: &str, tags: &Tags) {
        self.calls
            .lock()
            .unwrap()
            .push(Recorded::Set(metric.into(), member.into(), entries(tags)));
    }
}

pub fn frame(type_name: &str, method: &str) -> StackFrame {
    StackFrame {
        type_name: type_name.into(),
        method: method.into(),
    }
}

struct FakeThread {
    counters: ThreadCounters,
    identity: ThreadIdentity,
    stack: Vec<StackFrame>,
    present: bool,
}

#[derive(Default)]
struct FakeState {
    threads: Vec<FakeThread>,
    current: VecDeque<ThreadCounters>,
}

/// A scriptable introspector. Tests add threads, then adjust counters,
/// stacks and presence between ticks.
pub struct FakeThreads {
    caps: RuntimeCapabilities,
    state: Mutex<FakeState>,
}

impl FakeThreads {
    pub fn new(caps: RuntimeCapabilities) -> Arc<FakeThreads> {
        Arc::new(FakeThreads {
            caps,
            state: Mutex::new(FakeState::default()),
        })
    }

    pub fn add_thread(&self, id: u64, name: &str, group: &str) {
        self.state.lock().unwrap().threads.push(FakeThread {
            counters: ThreadCounters {
                id,
                cpu_nanos: 0,
                user_nanos: 0,
                allocated_bytes: 0,
            },
            identity: ThreadIdentity {
                name: name.into(),
                group: group.into(),
            },
            stack: Vec::new(),
            present: true,
        });
    }

    pub fn set_counters(&self, id: u64, cpu_nanos: i64, user_nanos: i64, allocated_bytes: i64) {
        let mut state = self.state.lock().unwrap();
        if let Some(thread) = state.threads.iter_mut().find(|t| t.counters.id == id) {
            thread.counters.cpu_nanos = cpu_nanos;
            thread.counters.user_nanos = user_nanos;
            thread.counters.allocated_bytes = allocated_bytes;
        }
    }

    pub fn set_stack(&self, id: u64, frames: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        if let Some(thread) = state.threads.iter_mut().find(|t| t.counters.id == id) {
            thread.stack = frames
                .iter()
                .map(|(type_name, method)| frame(type_name, method))
                .collect();
        }
    }

    pub fn set_present(&self, id: u64, present: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some(thread) = state.threads.iter_mut().find(|t| t.counters.id == id) {
            thread.present = present;
        }
    }

    pub fn push_current(&self, counters: ThreadCounters) {
        self.state.lock().unwrap().current.push_back(counters);
    }
}

impl ThreadIntrospector for FakeThreads {
    fn capabilities(&self) -> RuntimeCapabilities {
        self.caps
    }

    fn counters(&self) -> Vec<ThreadCounters> {
        self.state
            .lock()
            .unwrap()
            .threads
            .iter()
            .filter(|t| t.present)
            .map(|t| t.counters)
            .collect()
    }

    fn identity(&self, id: u64) -> Option<ThreadIdentity> {
        self.state
            .lock()
            .unwrap()
            .threads
            .iter()
            .find(|t| t.present && t.counters.id == id)
            .map(|t| t.identity.clone())
    }

    fn stack(&self, id: u64) -> Option<Vec<StackFrame>> {
        self.state
            .lock()
            .unwrap()
            .threads
            .iter()
            .find(|t| t.present && t.counters.id == id && !t.stack.is_empty())
            .map(|t| t.stack.clone())
    }

    fn current(&self) -> Option<ThreadCounters> {
        self.state.lock().unwrap().current.pop_front()
    }
}
