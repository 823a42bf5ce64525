//! Schema Dependency Graph
//!
//! Model-wide view over the typed edges produced by the dependency
//! analyzer, stored in a petgraph `DiGraph` keyed by (schema id, definition
//! name). Used for dependents lookups and containment cycle detection.

pub mod classify;
pub mod dependencies;

pub use classify::{classify_reference, Classification, DependencyKind};
pub use dependencies::{analyze_dependencies, Dependency, DependencyAnalysis};

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::schema::Model;

/// A graph endpoint: a schema, or one named definition inside it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    pub schema: String,
    pub definition: Option<String>,
}

impl Endpoint {
    fn from_source(dependency: &Dependency) -> Self {
        Self {
            schema: dependency.from_schema.clone(),
            definition: dependency.from_definition_name.clone(),
        }
    }

    fn from_target(dependency: &Dependency) -> Self {
        Self {
            schema: dependency.to_schema.clone(),
            definition: dependency.to_definition_name.clone(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.definition {
            Some(name) => write!(f, "{}#/definitions/{}", self.schema, name),
            None => write!(f, "{}", self.schema),
        }
    }
}

/// Dependency edges of a whole model
pub struct DependencyGraph {
    graph: DiGraph<Endpoint, Dependency>,
    node_indices: HashMap<Endpoint, NodeIndex>,
    diagnostics: Diagnostics,
}

impl DependencyGraph {
    /// Analyze every schema of `model`
    pub fn from_model(model: &Model) -> Result<Self> {
        let mut graph = Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            diagnostics: Diagnostics::new(),
        };

        for schema in model.schemas() {
            graph.node(Endpoint {
                schema: schema.id.clone(),
                definition: None,
            });
            let analysis = analyze_dependencies(model, schema)?;
            for dependency in analysis.dependencies {
                let from = graph.node(Endpoint::from_source(&dependency));
                let to = graph.node(Endpoint::from_target(&dependency));
                graph.graph.add_edge(from, to, dependency);
            }
            graph.diagnostics.merge(analysis.diagnostics);
        }

        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built dependency graph"
        );
        Ok(graph)
    }

    fn node(&mut self, endpoint: Endpoint) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(&endpoint) {
            return idx;
        }
        let idx = self.graph.add_node(endpoint.clone());
        self.node_indices.insert(endpoint, idx);
        idx
    }

    // ========== Public API ==========

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Warnings raised while analyzing the model
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// All edges, in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Dependency> {
        self.graph.edge_weights()
    }

    /// Edges leaving any endpoint of the schema
    pub fn edges_from<'a>(&'a self, schema_id: &'a str) -> impl Iterator<Item = &'a Dependency> + 'a {
        self.graph.edge_weights().filter(move |d| d.from_schema == schema_id)
    }

    /// Edges arriving at any endpoint of the schema from other schemas
    pub fn dependents_of(&self, schema_id: &str) -> Vec<&Dependency> {
        let mut dependents: Vec<&Dependency> = self
            .graph
            .node_indices()
            .filter(|idx| self.graph[*idx].schema == schema_id)
            .flat_map(|idx| self.graph.edges_directed(idx, Direction::Incoming))
            .map(|edge| edge.weight())
            .filter(|d| d.from_schema != schema_id)
            .collect();
        dependents.sort_by(|a, b| a.from_schema.cmp(&b.from_schema));
        dependents
    }

    /// Groups of endpoints that contain each other, self containment included
    pub fn containment_cycles(&self) -> Vec<Vec<Endpoint>> {
        let containment = self.graph.filter_map(
            |_, endpoint| Some(endpoint.clone()),
            |_, dependency| (dependency.kind == DependencyKind::Contains).then_some(()),
        );

        let mut cycles = Vec::new();
        for scc in kosaraju_scc(&containment) {
            let cyclic = scc.len() > 1
                || containment
                    .edges_directed(scc[0], Direction::Outgoing)
                    .any(|e| e.target() == scc[0]);
            if cyclic {
                let mut members: Vec<Endpoint> = scc.iter().map(|idx| containment[*idx].clone()).collect();
                members.sort();
                cycles.push(members);
            }
        }
        cycles.sort();
        cycles
    }
}
