//! Directed multigraph of data types connected by converters.

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::data_type::DataType;
use crate::transformer::{same_converter, Converter};

/// A graph edge: one converter going from one of its source types to its return type.
#[derive(Debug, Clone)]
pub struct TransformationEdge {
    converter: Arc<dyn Converter>,
}

impl TransformationEdge {
    fn new(converter: Arc<dyn Converter>) -> Self {
        Self { converter }
    }

    /// The converter carried by this edge.
    pub fn converter(&self) -> &Arc<dyn Converter> {
        &self.converter
    }
}

/// Data types as vertices, converters as edges.
///
/// A converter with several source types contributes one edge per source type,
/// all ending at its return type. Converters are tracked by identity: adding the
/// same instance twice is a no-op, while two distinct instances between the same
/// pair of types are both kept. Vertices left without edges are dropped.
///
/// The graph is not synchronized; share it through immutable snapshots.
#[derive(Debug, Clone, Default)]
pub struct TransformationGraph {
    graph: StableDiGraph<DataType, TransformationEdge>,
    vertices: HashMap<DataType, NodeIndex>,
}

impl TransformationGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every edge declared by `converter`.
    pub fn add_converter(&mut self, converter: &Arc<dyn Converter>) {
        if self.contains_converter(converter) {
            return;
        }

        let target = self.ensure_vertex(converter.return_data_type());
        for source_type in converter.source_data_types() {
            let source = self.ensure_vertex(source_type);
            self.graph
                .add_edge(source, target, TransformationEdge::new(converter.clone()));
        }
    }

    /// Remove the edges created by this converter instance, then any vertex left bare.
    pub fn remove_converter(&mut self, converter: &Arc<dyn Converter>) {
        let edges: Vec<EdgeIndex> = self
            .graph
            .edge_indices()
            .filter(|&e| {
                self.graph
                    .edge_weight(e)
                    .is_some_and(|edge| same_converter(&edge.converter, converter))
            })
            .collect();
        if edges.is_empty() {
            return;
        }

        let mut touched = Vec::with_capacity(edges.len() * 2);
        for edge in edges {
            if let Some((source, target)) = self.graph.edge_endpoints(edge) {
                touched.push(source);
                touched.push(target);
            }
            self.graph.remove_edge(edge);
        }

        for vertex in touched {
            let orphaned = self.graph.contains_node(vertex)
                && self.graph.neighbors_undirected(vertex).next().is_none();
            if orphaned {
                if let Some(data_type) = self.graph.remove_node(vertex) {
                    self.vertices.remove(&data_type);
                }
            }
        }
    }

    /// Whether the converter instance is present as an edge.
    pub fn contains_converter(&self, converter: &Arc<dyn Converter>) -> bool {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_weight(e))
            .any(|edge| same_converter(&edge.converter, converter))
    }

    /// Whether `data_type` is a vertex.
    pub fn contains_vertex(&self, data_type: &DataType) -> bool {
        self.vertices.contains_key(data_type)
    }

    /// Whether at least one edge goes from `from` to `to`.
    pub fn contains_edge(&self, from: &DataType, to: &DataType) -> bool {
        match (self.vertices.get(from), self.vertices.get(to)) {
            (Some(&from), Some(&to)) => self.graph.contains_edge(from, to),
            _ => false,
        }
    }

    /// All edges touching `data_type`, in either direction.
    pub fn edges_of(&self, data_type: &DataType) -> Vec<&TransformationEdge> {
        let Some(&vertex) = self.vertices.get(data_type) else {
            return Vec::new();
        };
        let mut edges: Vec<(EdgeIndex, &TransformationEdge)> = self
            .graph
            .edges_directed(vertex, Direction::Outgoing)
            .chain(
                self.graph
                    .edges_directed(vertex, Direction::Incoming)
                    .filter(|e| e.source() != e.target()),
            )
            .map(|e| (e.id(), e.weight()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, edge)| edge).collect()
    }

    /// Edges leaving `data_type` paired with their target, ordered by edge index.
    pub fn outgoing_edges(&self, data_type: &DataType) -> Vec<(&TransformationEdge, &DataType)> {
        let Some(&vertex) = self.vertices.get(data_type) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(vertex, Direction::Outgoing)
            .map(|e| (e.id(), e.weight(), &self.graph[e.target()]))
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);
        edges
            .into_iter()
            .map(|(_, edge, target)| (edge, target))
            .collect()
    }

    /// All vertices.
    pub fn vertex_set(&self) -> Vec<&DataType> {
        self.graph
            .node_indices()
            .map(|vertex| &self.graph[vertex])
            .collect()
    }

    /// All edges.
    pub fn edge_set(&self) -> Vec<&TransformationEdge> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_weight(e))
            .collect()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn ensure_vertex(&mut self, data_type: DataType) -> NodeIndex {
        if let Some(&index) = self.vertices.get(&data_type) {
            return index;
        }
        let index = self.graph.add_node(data_type.clone());
        self.vertices.insert(data_type, index);
        index
    }
}
