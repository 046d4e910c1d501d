//! Dependency queries over the task collection.
//!
//! [`TaskGraph`] borrows the ordered task list and builds an id index for
//! lookups; the list itself stays the source of truth and determines every
//! tie-break (first in collection order wins).

use std::collections::{HashMap, HashSet};

use crate::core::state::Task;
use crate::core::types::TaskStatus;
use crate::error::StateError;

#[derive(Debug, Clone, Copy)]
enum Mark {
    Unvisited,
    Visiting,
    Done(usize),
}

#[derive(Debug)]
pub struct TaskGraph<'a> {
    tasks: &'a [Task],
    index: HashMap<&'a str, usize>,
}

impl<'a> TaskGraph<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        let mut index = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            index.entry(task.id.as_str()).or_insert(i);
        }
        Self { tasks, index }
    }

    /// Pending tasks whose dependencies are all exactly `complete`.
    ///
    /// Failed, blocked and unknown dependencies keep their dependents waiting.
    pub fn ready(&self) -> Vec<&'a Task> {
        let complete: HashSet<&str> = self
            .tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Complete)
            .map(|task| task.id.as_str())
            .collect();
        self.tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Pending)
            .filter(|task| {
                task.depends_on
                    .iter()
                    .all(|dep| complete.contains(dep.as_str()))
            })
            .collect()
    }

    /// One batch of ready tasks with pairwise disjoint file sets.
    pub fn parallel_batch(&self) -> Vec<&'a Task> {
        let ready = self.ready();
        greedy_batch(&ready)
            .into_iter()
            .map(|i| ready[i])
            .collect()
    }

    /// Successive greedy batches until every ready task is assigned.
    pub fn parallel_batches(&self) -> Vec<Vec<&'a Task>> {
        let mut remaining = self.ready();
        let mut batches = Vec::new();
        while !remaining.is_empty() {
            let picked = greedy_batch(&remaining);
            let picked_set: HashSet<usize> = picked.iter().copied().collect();
            batches.push(picked.iter().map(|&i| remaining[i]).collect());
            remaining = remaining
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !picked_set.contains(i))
                .map(|(_, task)| task)
                .collect();
        }
        batches
    }

    /// Longest dependency chain ending at each task, in collection order.
    pub fn chain_lengths(&self) -> Result<Vec<usize>, StateError> {
        let mut marks = vec![Mark::Unvisited; self.tasks.len()];
        (0..self.tasks.len())
            .map(|i| self.chain_length(i, &mut marks))
            .collect()
    }

    /// The longest dependency chain, root first.
    pub fn critical_path(&self) -> Result<Vec<&'a str>, StateError> {
        let lengths = self.chain_lengths()?;
        let Some(mut current) = first_max(0..lengths.len(), |i| lengths[i]) else {
            return Ok(Vec::new());
        };

        let mut path = vec![self.tasks[current].id.as_str()];
        loop {
            let known = self.known_deps(current);
            match first_max(known, |i| lengths[i]) {
                Some(next) => {
                    path.push(self.tasks[next].id.as_str());
                    current = next;
                }
                None => break,
            }
        }
        path.reverse();
        Ok(path)
    }

    /// Fails with the id of a task that sits on a dependency cycle.
    pub fn ensure_acyclic(&self) -> Result<(), StateError> {
        self.chain_lengths().map(|_| ())
    }

    fn known_deps(&self, i: usize) -> Vec<usize> {
        self.tasks[i]
            .depends_on
            .iter()
            .filter_map(|dep| self.index.get(dep.as_str()).copied())
            .collect()
    }

    fn chain_length(&self, i: usize, marks: &mut [Mark]) -> Result<usize, StateError> {
        match marks[i] {
            Mark::Done(len) => return Ok(len),
            Mark::Visiting => {
                return Err(StateError::Cycle {
                    task_id: self.tasks[i].id.clone(),
                });
            }
            Mark::Unvisited => {}
        }
        marks[i] = Mark::Visiting;
        let mut longest = 0;
        for dep in self.known_deps(i) {
            longest = longest.max(self.chain_length(dep, marks)?);
        }
        let len = longest + 1;
        marks[i] = Mark::Done(len);
        Ok(len)
    }
}

/// Single greedy pass: admit a candidate iff none of its files are claimed yet.
///
/// Returns positions into `candidates`. A rejected candidate is not revisited.
pub fn greedy_batch(candidates: &[&Task]) -> Vec<usize> {
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut picked = Vec::new();
    for (i, task) in candidates.iter().enumerate() {
        if task.files.iter().any(|file| claimed.contains(file.as_str())) {
            continue;
        }
        claimed.extend(task.files.iter().map(String::as_str));
        picked.push(i);
    }
    picked
}

fn first_max(items: impl IntoIterator<Item = usize>, key: impl Fn(usize) -> usize) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for item in items {
        let k = key(item);
        if best.is_none_or(|(_, best_k)| k > best_k) {
            best = Some((item, k));
        }
    }
    best.map(|(item, _)| item)
}
