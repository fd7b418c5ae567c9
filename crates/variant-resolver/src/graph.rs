//! Task graph query interface.
//!
//! The host build tool owns the real task graph; the resolver only needs to
//! look tasks up by name and read their declared dependencies.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// What a task does, as far as the resolver cares.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Merges exactly one application manifest for one variant.
    ManifestMerge,

    /// Anything else (aggregate, compile, test, ...).
    #[default]
    Other,
}

/// One task in the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskNode {
    /// Simple task name (e.g. "assembleFreeRelease").
    pub name: String,

    /// Fully qualified path (e.g. ":app:assembleFreeRelease").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Task kind.
    #[serde(default)]
    pub kind: TaskKind,

    /// Declared dependencies, by name or path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl TaskNode {
    /// Create a task of kind `Other` with no dependencies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            kind: TaskKind::Other,
            depends_on: Vec::new(),
        }
    }

    /// Create a manifest-merge task.
    pub fn manifest_merge(name: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::ManifestMerge,
            ..Self::new(name)
        }
    }

    /// Set the qualified path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add declared dependencies.
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Whether this task merges a variant's application manifest.
    pub fn is_manifest_merge(&self) -> bool {
        self.kind == TaskKind::ManifestMerge
    }
}

/// Read-only view of the host's task graph.
pub trait TaskGraph {
    /// Look a task up by simple name or qualified path.
    fn task(&self, name: &str) -> Option<&TaskNode>;
}

impl<T: TaskGraph + ?Sized> TaskGraph for &T {
    fn task(&self, name: &str) -> Option<&TaskNode> {
        (**self).task(name)
    }
}

/// A captured task graph, indexed by path and by simple name.
///
/// Projects routinely share simple names (`:app:assembleRelease`,
/// `:lib:assembleRelease`). A simple name carried by tasks with different
/// paths is ambiguous and only reachable through those paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<TaskNode>", into = "Vec<TaskNode>")]
pub struct TaskGraphSnapshot {
    tasks: Vec<TaskNode>,
    by_path: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    ambiguous: HashSet<String>,
}

impl TaskGraphSnapshot {
    /// Build a snapshot from a list of tasks. A later task with the same
    /// path (or the same name and no path) replaces the earlier one.
    pub fn new(tasks: Vec<TaskNode>) -> Self {
        let mut by_path = HashMap::with_capacity(tasks.len());
        let mut by_name: HashMap<String, usize> = HashMap::with_capacity(tasks.len());
        let mut ambiguous = HashSet::new();
        for (i, task) in tasks.iter().enumerate() {
            if let Some(ref path) = task.path {
                by_path.insert(path.clone(), i);
            }
            if let Some(&previous) = by_name.get(&task.name) {
                if tasks[previous].path != task.path {
                    ambiguous.insert(task.name.clone());
                }
            }
            by_name.insert(task.name.clone(), i);
        }
        Self {
            tasks,
            by_path,
            by_name,
            ambiguous,
        }
    }

    /// Whether `name` is a simple name shared by tasks of several projects.
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous.contains(name)
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the snapshot has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All tasks in insertion order.
    pub fn tasks(&self) -> &[TaskNode] {
        &self.tasks
    }
}

impl From<Vec<TaskNode>> for TaskGraphSnapshot {
    fn from(tasks: Vec<TaskNode>) -> Self {
        Self::new(tasks)
    }
}

impl From<TaskGraphSnapshot> for Vec<TaskNode> {
    fn from(snapshot: TaskGraphSnapshot) -> Self {
        snapshot.tasks
    }
}

impl FromIterator<TaskNode> for TaskGraphSnapshot {
    fn from_iter<I: IntoIterator<Item = TaskNode>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl TaskGraph for TaskGraphSnapshot {
    fn task(&self, name: &str) -> Option<&TaskNode> {
        let index = match self.by_path.get(name) {
            Some(&i) => Some(i),
            None if self.ambiguous.contains(name) => None,
            None => self.by_name.get(name).copied(),
        };
        index.map(|i| &self.tasks[i])
    }
}
