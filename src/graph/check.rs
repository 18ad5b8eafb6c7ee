//! Structural invariants of a built job graph.

use super::model::{AUDIT_JOB, DISPATCH_JOB, JobGraph};
use crate::error::{FleetError, Result};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

fn violation(msg: String) -> FleetError {
    FleetError::ValidationError(format!("job graph invariant violated: {}", msg))
}

impl JobGraph {
    /// Verify the graph before it is serialized.
    ///
    /// Validation rules:
    /// - node ids are unique and every `needs` entry names an existing node
    /// - the `needs` relation is acyclic
    /// - every node downstream of the audit node runs unconditionally
    /// - every side-effecting node is gated on its agent's dispatch verdict
    ///   and has the dispatch node among its ancestors
    pub fn check(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for id in self.ids() {
            if !seen.insert(id) {
                return Err(violation(format!("duplicate node id '{}'", id)));
            }
        }

        for (id, job) in self.iter() {
            for need in &job.needs {
                if !self.contains(need) {
                    return Err(violation(format!(
                        "node '{}' needs unknown node '{}'",
                        id, need
                    )));
                }
            }
        }

        self.topological_order()?;

        for id in self.descendants(AUDIT_JOB) {
            let runs_always = self
                .get(id)
                .and_then(|j| j.condition.as_ref())
                .is_some_and(|c| c.runs_always());
            if !runs_always {
                return Err(violation(format!(
                    "node '{}' depends on '{}' but does not always run",
                    id, AUDIT_JOB
                )));
            }
        }

        for (id, job) in self.iter().filter(|(_, j)| j.side_effects) {
            let Some(gate) = &job.gate else {
                return Err(violation(format!("side-effecting node '{}' has no gate", id)));
            };
            let path = format!("needs.{}.outputs.{}", DISPATCH_JOB, gate);
            let gated = job
                .condition
                .as_ref()
                .is_some_and(|c| c.references(&path) && !c.runs_always());
            if !gated {
                return Err(violation(format!(
                    "side-effecting node '{}' is not gated on {}",
                    id, path
                )));
            }
            if !self.ancestors(id).contains(DISPATCH_JOB) {
                return Err(violation(format!(
                    "side-effecting node '{}' is not downstream of '{}'",
                    id, DISPATCH_JOB
                )));
            }
        }

        Ok(())
    }

    /// Node ids ordered so that every node follows everything it needs.
    pub fn topological_order(&self) -> Result<Vec<&str>> {
        let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (id, job) in self.iter() {
            indegree.insert(id, job.needs.len());
            for need in &job.needs {
                dependents.entry(need.as_str()).or_default().push(id);
            }
        }

        let mut ready: VecDeque<&str> = self
            .ids()
            .filter(|id| indegree.get(id) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(self.len());
        while let Some(id) = ready.pop_front() {
            order.push(id);
            for &next in dependents.get(id).map(Vec::as_slice).unwrap_or_default() {
                if let Some(d) = indegree.get_mut(next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push_back(next);
                    }
                }
            }
        }

        if order.len() != self.len() {
            let stuck: Vec<&str> = self.ids().filter(|id| !order.contains(id)).collect();
            return Err(violation(format!("cycle through {}", stuck.join(", "))));
        }
        Ok(order)
    }

    /// Every node that transitively needs `id`.
    pub fn descendants(&self, id: &str) -> BTreeSet<&str> {
        let mut found = BTreeSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for (other, job) in self.iter() {
                if job.needs.iter().any(|n| n == current) && found.insert(other) {
                    queue.push_back(other);
                }
            }
        }
        found
    }

    /// Every node `id` transitively needs.
    pub fn ancestors(&self, id: &str) -> BTreeSet<&str> {
        let mut found = BTreeSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if let Some(job) = self.get(current) {
                for need in &job.needs {
                    if found.insert(need.as_str()) {
                        queue.push_back(need.as_str());
                    }
                }
            }
        }
        found
    }
}
