use std::fmt;
use std::sync::Arc;

/// A predicate over thread names used by [`GroupRules`].
pub type GroupPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Ordered rules mapping thread names to group labels.
///
/// Runtimes rarely group threads the way a dashboard wants them, so the
/// monitor lets the application override the reported group: the first
/// rule whose predicate matches the thread name wins, and threads no
/// rule matches keep the group the runtime reported.
///
/// ```
/// use vitals_monitor::GroupRules;
///
/// let rules = GroupRules::new()
///     .with(|name| name.starts_with("tokio-runtime"), "async")
///     .with(|name| name.ends_with("-io"), "io");
/// assert_eq!(rules.resolve("tokio-runtime-3", "main"), "async");
/// assert_eq!(rules.resolve("disk-io", "main"), "io");
/// assert_eq!(rules.resolve("janitor", "main"), "main");
/// ```
#[derive(Clone, Default)]
pub struct GroupRules {
    rules: Vec<(GroupPredicate, String)>,
}

impl GroupRules {
    /// Creates an empty rule list.
    pub fn new() -> GroupRules {
        GroupRules::default()
    }

    /// Appends a rule.
    pub fn add<P>(&mut self, predicate: P, group: impl Into<String>) -> &mut GroupRules
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.rules.push((Arc::new(predicate), group.into()));
        self
    }

    /// Appends a rule, builder style.
    pub fn with<P>(mut self, predicate: P, group: impl Into<String>) -> GroupRules
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.add(predicate, group);
        self
    }

    /// Resolves the group for a thread name, falling back to the
    /// runtime-reported group when no rule matches.
    pub fn resolve(&self, thread_name: &str, fallback: &str) -> String {
        for (predicate, group) in &self.rules {
            if predicate(thread_name) {
                return group.clone();
            }
        }
        fallback.to_owned()
    }

    /// The number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the list holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for GroupRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupRules")
            .field("rules", &self.rules.len())
            .finish()
    }
}
