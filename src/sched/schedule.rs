// src/sched/schedule.rs

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::config::model::ConfigFile;
use crate::errors::{GavelError, Result};
use crate::task::TaskId;

/// A schedule of tasks as two dependency graphs.
///
/// `start_depends[a]` holds the tasks that must be *ended* before `a` may
/// start; `end_depends[a]` holds the tasks that must be at least *endable*
/// before `a` may be ended. The start graph must be acyclic; the end graph
/// need not be, since its condition is satisfiable simultaneously ("end
/// together").
///
/// BTree collections keep iteration deterministic, which makes log output
/// and test assertions stable.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    start_depends: BTreeMap<TaskId, BTreeSet<TaskId>>,
    end_depends: BTreeMap<TaskId, BTreeSet<TaskId>>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schedule from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut schedule = Self::new();
        for auction in cfg.auction.iter() {
            schedule.add_task(auction.id);
        }
        for auction in cfg.auction.iter() {
            for dep in auction.start_after.iter() {
                schedule.add_start_depend(auction.id, *dep)?;
            }
            for dep in auction.end_with.iter() {
                schedule.add_end_depend(auction.id, *dep)?;
            }
        }
        Ok(schedule)
    }

    /// Add a task node with empty dependency sets. Returns false (and
    /// changes nothing) if the id is already present.
    pub fn add_task(&mut self, id: TaskId) -> bool {
        if self.start_depends.contains_key(&id) {
            return false;
        }
        self.start_depends.insert(id, BTreeSet::new());
        self.end_depends.insert(id, BTreeSet::new());
        true
    }

    /// Record that `task` may not start until `dep` has ended.
    pub fn add_start_depend(&mut self, task: TaskId, dep: TaskId) -> Result<()> {
        self.check_edge(task, dep)?;
        self.start_depends
            .get_mut(&task)
            .expect("checked above")
            .insert(dep);
        Ok(())
    }

    /// Record that `task` may not be ended until `dep` is at least endable.
    pub fn add_end_depend(&mut self, task: TaskId, dep: TaskId) -> Result<()> {
        self.check_edge(task, dep)?;
        self.end_depends
            .get_mut(&task)
            .expect("checked above")
            .insert(dep);
        Ok(())
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.start_depends.contains_key(&id)
    }

    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.start_depends.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.start_depends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start_depends.is_empty()
    }

    /// Start dependencies of `id`, or `None` for an unknown id.
    pub fn start_depends(&self, id: TaskId) -> Option<&BTreeSet<TaskId>> {
        self.start_depends.get(&id)
    }

    /// End dependencies of `id`, or `None` for an unknown id.
    pub fn end_depends(&self, id: TaskId) -> Option<&BTreeSet<TaskId>> {
        self.end_depends.get(&id)
    }

    /// Kahn-order topological sort of the start-dependency graph.
    ///
    /// Returns the empty sequence when the graph contains a cycle. Only
    /// start dependencies are considered; the order returned is not
    /// necessarily the order tasks will execute in.
    pub fn topological_sort(&self) -> Vec<TaskId> {
        let mut edges = self.start_depends.clone();

        let mut queue: VecDeque<TaskId> = edges
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| *id)
            .collect();

        let mut sorted = Vec::with_capacity(edges.len());
        while let Some(node) = queue.pop_front() {
            sorted.push(node);
            for (id, deps) in edges.iter_mut() {
                if deps.remove(&node) && deps.is_empty() {
                    queue.push_back(*id);
                }
            }
        }

        // Any edge left over means a cycle.
        if edges.values().any(|deps| !deps.is_empty()) {
            sorted.clear();
        }

        sorted
    }

    fn check_edge(&self, task: TaskId, dep: TaskId) -> Result<()> {
        if !self.start_depends.contains_key(&task) {
            return Err(GavelError::TaskNotFound(task));
        }
        if !self.start_depends.contains_key(&dep) {
            return Err(GavelError::TaskNotFound(dep));
        }
        if task == dep {
            return Err(GavelError::SelfDependency(task));
        }
        Ok(())
    }
}
