//! petgraph-based containment tree over a document's activities.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};

use super::types::WorkflowDocument;
use crate::error::ValidatorError;

/// Node weights are indices into `WorkflowDocument::activities`.
pub struct ActivityGraph {
    pub graph: DiGraph<usize, ()>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl ActivityGraph {
    pub fn build(document: &WorkflowDocument) -> Result<Self, Vec<ValidatorError>> {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        let mut errors = Vec::new();

        // Add all activities
        for (i, activity) in document.activities.iter().enumerate() {
            if node_indices.contains_key(&activity.id) {
                errors.push(ValidatorError::document(
                    "P005",
                    format!("Duplicate activity id '{}'", activity.id),
                    Some(activity.id.clone()),
                ));
                continue;
            }
            let idx = graph.add_node(i);
            node_indices.insert(activity.id.clone(), idx);
        }

        // Add containment edges
        for edge in &document.edges {
            let parent = node_indices.get(&edge.parent);
            let child = node_indices.get(&edge.child);
            match (parent, child) {
                (Some(&p), Some(&c)) => {
                    if graph.neighbors_directed(c, Direction::Incoming).next().is_some() {
                        errors.push(ValidatorError::document(
                            "P003",
                            format!("Activity '{}' has more than one parent", edge.child),
                            Some(edge.child.clone()),
                        ));
                        continue;
                    }
                    graph.add_edge(p, c, ());
                }
                (None, _) => errors.push(ValidatorError::document(
                    "P002",
                    format!("Edge references unknown parent activity '{}'", edge.parent),
                    None,
                )),
                (_, None) => errors.push(ValidatorError::document(
                    "P002",
                    format!("Edge references unknown child activity '{}'", edge.child),
                    None,
                )),
            }
        }

        if errors.is_empty() && is_cyclic_directed(&graph) {
            errors.push(ValidatorError::document(
                "P003",
                "Activity containment contains a cycle",
                None,
            ));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ActivityGraph {
            graph,
            node_indices,
        })
    }

    /// Index of the containing activity, if any.
    pub fn parent(&self, activity: usize) -> Option<usize> {
        let idx = self.index_of(activity)?;
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
            .map(|p| self.graph[p])
    }

    /// Contained activities in document order.
    pub fn children(&self, activity: usize) -> Vec<usize> {
        let Some(idx) = self.index_of(activity) else {
            return vec![];
        };
        let mut children: Vec<usize> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect();
        children.sort_unstable();
        children
    }

    /// Every activity, parents before children, roots and siblings in
    /// document order.
    pub fn order(&self) -> Vec<usize> {
        let mut roots: Vec<usize> = self
            .graph
            .node_indices()
            .filter(|&n| {
                self.graph
                    .neighbors_directed(n, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|n| self.graph[n])
            .collect();
        roots.sort_unstable();

        let mut out = Vec::with_capacity(self.graph.node_count());
        let mut stack: Vec<usize> = roots.into_iter().rev().collect();
        while let Some(activity) = stack.pop() {
            out.push(activity);
            stack.extend(self.children(activity).into_iter().rev());
        }
        out
    }

    fn index_of(&self, activity: usize) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&n| self.graph[n] == activity)
    }
}
