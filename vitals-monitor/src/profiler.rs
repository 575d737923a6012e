//! Adaptive stack sampling for threads the load estimator marks as busy.
//!
//! The profiler runs one detached sampling thread. Which threads it
//! looks at is controlled entirely through a [`ProfilerHandle`]: the
//! estimator marks a thread when its CPU share crosses the threshold
//! and unmarks it when the load subsides, and the handle can also be
//! driven manually. While no thread is marked the sampler idles on a
//! coarse sleep and costs close to nothing.
//!
//! Samples aggregate over a flush window. The [`start`] entry point
//! buckets frames by `(thread, group, type, method, depth)` and emits
//! one gauge per bucket at every window boundary;
//! [`start_with_consumer`] instead builds a [`CallTree`] per window and
//! hands it to a callback, for consumers that want the full shape of
//! the hot path.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use vitals_core::{MetricSink, Tags};

use crate::introspect::{StackFrame, ThreadIntrospector};
use crate::rules::GroupRules;

/// Sleep between membership checks while nothing is marked.
const IDLE_SLEEP: Duration = Duration::from_secs(1);

/// A predicate deciding whether a stack frame is worth counting.
pub type FrameFilter = Arc<dyn Fn(&StackFrame) -> bool + Send + Sync>;

/// Receives the aggregated [`CallTree`] at every flush window.
pub type ProfileConsumer = Arc<dyn Fn(&CallTree) + Send + Sync>;

/// Configuration settings for the sampling thread.
#[derive(Debug, Clone)]
pub struct ProfilerOptions {
    /// Sleep between sampling passes.
    pub pause: Duration,
    /// Sampling passes per wakeup.
    pub cycles: u32,
    /// How long samples aggregate before they are flushed.
    pub flush_interval: Duration,
    /// Metric name for the flat per-bucket gauges.
    pub metric: String,
    /// Type-name prefixes installed as initial frame filters. Empty
    /// means every frame counts.
    pub type_prefixes: Vec<String>,
    /// Group rules applied to sampled thread names.
    pub rules: GroupRules,
}

impl Default for ProfilerOptions {
    fn default() -> ProfilerOptions {
        ProfilerOptions {
            pause: Duration::from_millis(5),
            cycles: 1,
            flush_interval: Duration::from_secs(10),
            metric: "profiler.samples".into(),
            type_prefixes: Vec::new(),
            rules: GroupRules::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SampleKey {
    thread: String,
    group: String,
    type_name: String,
    method: String,
    depth: u32,
}

/// One node of an aggregated call tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallNode {
    /// How many samples went through this frame.
    pub count: u64,
    /// Callees observed under this frame.
    pub children: HashMap<StackFrame, CallNode>,
}

impl CallNode {
    /// Looks up a direct child by type and method name.
    pub fn child(&self, type_name: &str, method: &str) -> Option<&CallNode> {
        self.children
            .iter()
            .find(|(frame, _)| frame.type_name == type_name && frame.method == method)
            .map(|(_, node)| node)
    }
}

/// The call tree aggregated over one flush window.
///
/// The root is synthetic: its `count` is the total number of stacks
/// sampled in the window and its children are the bottommost frames.
/// Frames rejected by filters are skipped, with their callees attached
/// to the nearest kept ancestor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallTree {
    /// The synthetic root node.
    pub root: CallNode,
}

/// Shared control surface of a running profiler.
///
/// Cloning is cheap and all clones drive the same sampler. Once every
/// handle is dropped the sampling thread winds down on its own.
#[derive(Clone)]
pub struct ProfilerHandle {
    threads: Arc<Mutex<HashSet<u64>>>,
    filters: Arc<RwLock<Vec<FrameFilter>>>,
}

impl ProfilerHandle {
    pub(crate) fn new() -> ProfilerHandle {
        ProfilerHandle {
            threads: Arc::new(Mutex::new(HashSet::new())),
            filters: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Marks a thread for sampling.
    pub fn start_profiling(&self, id: u64) {
        self.threads.lock().unwrap().insert(id);
    }

    /// Unmarks a thread. Takes effect at the next window boundary.
    pub fn stop_profiling(&self, id: u64) {
        self.threads.lock().unwrap().remove(&id);
    }

    /// Whether a thread is currently marked.
    pub fn is_profiling(&self, id: u64) -> bool {
        self.threads.lock().unwrap().contains(&id)
    }

    /// Unmarks every thread, idling the sampler.
    pub fn clear(&self) {
        self.threads.lock().unwrap().clear();
    }

    /// Adds a frame filter. Filters are OR-ed; with none installed
    /// every frame counts.
    pub fn add_filter<F>(&self, filter: F)
    where
        F: Fn(&StackFrame) -> bool + Send + Sync + 'static,
    {
        self.filters.write().unwrap().push(Arc::new(filter));
    }

    /// Removes all frame filters.
    pub fn clear_filters(&self) {
        self.filters.write().unwrap().clear();
    }
}

impl fmt::Debug for ProfilerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfilerHandle")
            .field("threads", &self.threads.lock().unwrap().len())
            .field("filters", &self.filters.read().unwrap().len())
            .finish()
    }
}

enum Output {
    Flat {
        sink: Arc<dyn MetricSink>,
        metric: String,
        samples: HashMap<SampleKey, u64>,
    },
    Tree {
        consumer: ProfileConsumer,
        root: CallNode,
    },
}

struct Sampler {
    introspector: Arc<dyn ThreadIntrospector>,
    rules: GroupRules,
    output: Output,
}

fn accepted(filters: &[FrameFilter], frame: &StackFrame) -> bool {
    filters.is_empty() || filters.iter().any(|filter| filter(frame))
}

impl Sampler {
    /// One sampling pass over the snapshotted thread ids.
    fn sample(&mut self, ids: &[u64], filters: &[FrameFilter]) {
        for &id in ids {
            let Some(stack) = self.introspector.stack(id) else {
                continue;
            };
            if stack.is_empty() {
                continue;
            }
            match &mut self.output {
                Output::Flat { samples, .. } => {
                    let Some(identity) = self.introspector.identity(id) else {
                        continue;
                    };
                    let group = self.rules.resolve(&identity.name, &identity.group);
                    let frames = stack.len() as u32;
                    for (i, frame) in stack.iter().enumerate() {
                        if !accepted(filters, frame) {
                            continue;
                        }
                        let key = SampleKey {
                            thread: identity.name.clone(),
                            group: group.clone(),
                            type_name: frame.type_name.clone(),
                            method: frame.method.clone(),
                            // Depth counts from the bottom frame, which is 1.
                            depth: frames - i as u32,
                        };
                        *samples.entry(key).or_insert(0) += 1;
                    }
                }
                Output::Tree { root, .. } => {
                    root.count += 1;
                    let mut node = &mut *root;
                    for frame in stack.iter().rev() {
                        if !accepted(filters, frame) {
                            continue;
                        }
                        node = node.children.entry(frame.clone()).or_default();
                        node.count += 1;
                    }
                }
            }
        }
    }

    /// Emits and clears everything aggregated in the current window.
    fn flush(&mut self) {
        match &mut self.output {
            Output::Flat {
                sink,
                metric,
                samples,
            } => {
                for (key, count) in samples.drain() {
                    let mut tags = Tags::of("thread", &key.thread);
                    tags.add("group", &key.group)
                        .add("type", &key.type_name)
                        .add("method", &key.method)
                        .add("depth", key.depth);
                    sink.gauge(metric, count as i64, &tags);
                }
            }
            Output::Tree { consumer, root } => {
                if root.count == 0 {
                    return;
                }
                let tree = CallTree {
                    root: mem::take(root),
                };
                consumer(&tree);
            }
        }
    }
}

/// Starts a profiler that emits flat per-bucket gauges through `sink`.
pub fn start(
    introspector: Arc<dyn ThreadIntrospector>,
    options: ProfilerOptions,
    sink: Arc<dyn MetricSink>,
) -> ProfilerHandle {
    let output = Output::Flat {
        sink,
        metric: options.metric.clone(),
        samples: HashMap::new(),
    };
    spawn(introspector, options, output)
}

/// Starts a profiler that hands a [`CallTree`] per window to `consumer`.
pub fn start_with_consumer(
    introspector: Arc<dyn ThreadIntrospector>,
    options: ProfilerOptions,
    consumer: ProfileConsumer,
) -> ProfilerHandle {
    let output = Output::Tree {
        consumer,
        root: CallNode::default(),
    };
    spawn(introspector, options, output)
}

fn spawn(
    introspector: Arc<dyn ThreadIntrospector>,
    options: ProfilerOptions,
    output: Output,
) -> ProfilerHandle {
    let handle = ProfilerHandle::new();
    for prefix in &options.type_prefixes {
        let prefix = prefix.clone();
        handle.add_filter(move |frame: &StackFrame| frame.type_name.starts_with(&prefix));
    }

    let threads = handle.threads.clone();
    let filters = handle.filters.clone();
    let rules = options.rules.clone();
    let _ = thread::Builder::new()
        .name("vitals-profiler".into())
        .spawn(move || {
            let mut sampler = Sampler {
                introspector,
                rules,
                output,
            };
            let mut ids: Vec<u64> = Vec::new();
            let mut next_flush = Instant::now() + options.flush_interval;
            loop {
                // The thread is never joined; it exits once every
                // handle is gone.
                if Arc::strong_count(&threads) == 1 {
                    return;
                }
                if ids.is_empty() {
                    thread::sleep(IDLE_SLEEP);
                    ids = snapshot(&threads);
                    next_flush = Instant::now() + options.flush_interval;
                    continue;
                }
                thread::sleep(options.pause);
                let active: Vec<FrameFilter> = filters.read().unwrap().clone();
                for _ in 0..options.cycles {
                    sampler.sample(&ids, &active);
                }
                if Instant::now() >= next_flush {
                    sampler.flush();
                    ids = snapshot(&threads);
                    next_flush = Instant::now() + options.flush_interval;
                }
            }
        });
    handle
}

fn snapshot(threads: &Arc<Mutex<HashSet<u64>>>) -> Vec<u64> {
    threads.lock().unwrap().iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use crate::introspect::RuntimeCapabilities;
    use crate::testutil::{FakeThreads, Recorded, RecordingSink};

    use super::*;

    fn server_stack() -> Vec<(&'static str, &'static str)> {
        vec![
            ("app::Server", "handle"),
            ("app::Router", "route"),
            ("std::net", "accept"),
        ]
    }

    fn flat_sampler(
        threads: &Arc<FakeThreads>,
        sink: &Arc<RecordingSink>,
    ) -> Sampler {
        Sampler {
            introspector: threads.clone(),
            rules: GroupRules::new(),
            output: Output::Flat {
                sink: sink.clone(),
                metric: "profiler.samples".into(),
                samples: HashMap::new(),
            },
        }
    }

    fn bucket(count: i64, type_name: &str, method: &str, depth: u32) -> Recorded {
        Recorded::Gauge(
            "profiler.samples".into(),
            count,
            vec![
                "thread:hot".to_owned(),
                "group:pool".to_owned(),
                format!("type:{}", type_name.replace(':', "_")),
                format!("method:{method}"),
                format!("depth:{depth}"),
            ],
        )
    }

    #[test]
    fn test_flat_buckets_key_on_frame_and_depth() {
        let threads = FakeThreads::new(RuntimeCapabilities::default());
        threads.add_thread(1, "hot", "pool");
        threads.set_stack(1, &server_stack());
        let sink = RecordingSink::new();
        let mut sampler = flat_sampler(&threads, &sink);

        sampler.sample(&[1], &[]);
        sampler.sample(&[1], &[]);
        sampler.flush();

        let calls = sink.take();
        assert_eq!(calls.len(), 3);
        // Depth counts from the bottom frame.
        for expected in [
            bucket(2, "app::Server", "handle", 3),
            bucket(2, "app::Router", "route", 2),
            bucket(2, "std::net", "accept", 1),
        ] {
            assert!(calls.contains(&expected), "missing {expected:?}");
        }

        // The window is cleared by the flush.
        sampler.flush();
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_filters_are_or_ed_and_empty_accepts_all() {
        let threads = FakeThreads::new(RuntimeCapabilities::default());
        threads.add_thread(1, "hot", "pool");
        threads.set_stack(1, &server_stack());
        let sink = RecordingSink::new();
        let mut sampler = flat_sampler(&threads, &sink);

        let app_only: FrameFilter = Arc::new(|frame: &StackFrame| frame.type_name.starts_with("app"));
        sampler.sample(&[1], &[app_only.clone()]);
        sampler.flush();
        assert_eq!(sink.take().len(), 2);

        let std_only: FrameFilter = Arc::new(|frame: &StackFrame| frame.type_name.starts_with("std"));
        sampler.sample(&[1], &[app_only, std_only]);
        sampler.flush();
        assert_eq!(sink.take().len(), 3);

        sampler.sample(&[1], &[]);
        sampler.flush();
        assert_eq!(sink.take().len(), 3);
    }

    #[test]
    fn test_unknown_threads_are_skipped() {
        let threads = FakeThreads::new(RuntimeCapabilities::default());
        let sink = RecordingSink::new();
        let mut sampler = flat_sampler(&threads, &sink);

        sampler.sample(&[99], &[]);
        sampler.flush();
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_tree_counts_stacks_from_the_bottom() {
        let threads = FakeThreads::new(RuntimeCapabilities::default());
        threads.add_thread(1, "hot", "pool");
        threads.set_stack(1, &server_stack());

        let captured: Arc<Mutex<Vec<CallTree>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        let mut sampler = Sampler {
            introspector: threads.clone(),
            rules: GroupRules::new(),
            output: Output::Tree {
                consumer: Arc::new(move |tree: &CallTree| {
                    sink.lock().unwrap().push(tree.clone());
                }),
                root: CallNode::default(),
            },
        };

        sampler.sample(&[1], &[]);
        sampler.sample(&[1], &[]);
        sampler.flush();

        let trees = captured.lock().unwrap();
        assert_eq!(trees.len(), 1);
        let root = &trees[0].root;
        assert_eq!(root.count, 2);
        let accept = root.child("std::net", "accept").unwrap();
        assert_eq!(accept.count, 2);
        let route = accept.child("app::Router", "route").unwrap();
        assert_eq!(route.count, 2);
        assert_eq!(route.child("app::Server", "handle").unwrap().count, 2);
    }

    #[test]
    fn test_tree_filter_attaches_children_to_kept_ancestor() {
        let threads = FakeThreads::new(RuntimeCapabilities::default());
        threads.add_thread(1, "hot", "pool");
        threads.set_stack(1, &server_stack());

        let captured: Arc<Mutex<Vec<CallTree>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        let mut sampler = Sampler {
            introspector: threads.clone(),
            rules: GroupRules::new(),
            output: Output::Tree {
                consumer: Arc::new(move |tree: &CallTree| {
                    sink.lock().unwrap().push(tree.clone());
                }),
                root: CallNode::default(),
            },
        };

        let no_router: FrameFilter =
            Arc::new(|frame: &StackFrame| frame.type_name != "app::Router");
        sampler.sample(&[1], &[no_router]);
        sampler.flush();

        let trees = captured.lock().unwrap();
        let accept = trees[0].root.child("std::net", "accept").unwrap();
        assert!(accept.child("app::Router", "route").is_none());
        assert_eq!(accept.child("app::Server", "handle").unwrap().count, 1);

        // An empty follow-up window is not delivered.
        drop(trees);
        sampler.flush();
        assert_eq!(captured.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_handle_membership_controls() {
        let handle = ProfilerHandle::new();
        assert!(!handle.is_profiling(1));
        handle.start_profiling(1);
        handle.start_profiling(2);
        assert!(handle.is_profiling(1));
        handle.stop_profiling(1);
        assert!(!handle.is_profiling(1));
        assert!(handle.is_profiling(2));
        handle.clear();
        assert!(!handle.is_profiling(2));
    }

    #[test]
    fn test_samples_only_marked_threads_end_to_end() {
        let threads = FakeThreads::new(RuntimeCapabilities::default());
        threads.add_thread(1, "hot", "pool");
        threads.set_stack(1, &server_stack());
        threads.add_thread(2, "cold", "pool");
        threads.set_stack(2, &[("app::Idle", "wait")]);
        let sink = RecordingSink::new();

        let handle = start(
            threads.clone(),
            ProfilerOptions {
                pause: Duration::from_millis(1),
                flush_interval: Duration::from_millis(50),
                ..Default::default()
            },
            sink.clone(),
        );
        handle.start_profiling(1);

        // The sampler wakes from its idle sleep after about a second.
        thread::sleep(Duration::from_millis(1600));
        let calls = sink.take();
        assert!(!calls.is_empty(), "expected sampled buckets");
        for call in &calls {
            assert_eq!(call.metric(), "profiler.samples");
            assert!(matches!(
                call,
                Recorded::Gauge(_, _, tags) if tags.contains(&"thread:hot".to_owned())
            ));
        }
        handle.clear();
    }
}
