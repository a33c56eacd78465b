use crate::interned_string_newtype;
use crate::util::InternString;
use derive_more::From;
use internment::Intern;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::fmt;

pub mod dot;

pub use dot::DotCollector;

/// Key of a vertex in a [`Graph`].
#[derive(Hash, Eq, PartialEq, derive_more::Debug, Clone, Copy, PartialOrd, Ord, From)]
#[debug("V({_0})")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeKey(pub u32);

impl NodeKey {
    fn index(self) -> NodeIndex {
        NodeIndex::new(self.0 as usize)
    }
}

impl From<NodeIndex> for NodeKey {
    fn from(ix: NodeIndex) -> Self {
        NodeKey(ix.index() as u32)
    }
}

/// Key of a stored edge, shared by both of its [`DirectedEdge`] views.
#[derive(Hash, Eq, PartialEq, derive_more::Debug, Clone, Copy, PartialOrd, Ord, From)]
#[debug("E({_0})")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeKey(pub u32);

impl EdgeKey {
    fn index(self) -> EdgeIndex {
        EdgeIndex::new(self.0 as usize)
    }
}

impl From<EdgeIndex> for EdgeKey {
    fn from(ix: EdgeIndex) -> Self {
        EdgeKey(ix.index() as u32)
    }
}

/// Label of a stored edge, e.g. a dependency relation such as `nsubj`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, From)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeLabel(pub InternString);
interned_string_newtype!(EdgeLabel);

impl EdgeLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Traversal direction of an edge relative to a vertex.
///
/// An edge stored `source -> target` points `Down` away from its source and
/// `Up` away from its target, following the dependency-graph convention
/// where governors sit above their dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn flip(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// The symbol that brackets an edge expression of this direction in
    /// pattern text.
    pub fn symbol(self) -> char {
        match self {
            Direction::Up => '<',
            Direction::Down => '>',
        }
    }
}

/// A direction-relative view of one stored edge.
///
/// Every stored edge yields two views, one per endpoint. Both share the
/// same [`EdgeKey`] and count as a single resource under the edge non-reuse
/// rule of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectedEdge {
    key: EdgeKey,
    source: NodeKey,
    target: NodeKey,
    label: EdgeLabel,
    direction: Direction,
}

impl DirectedEdge {
    pub fn key(&self) -> EdgeKey {
        self.key
    }

    /// Source of the stored edge, regardless of this view's direction.
    pub fn source(&self) -> NodeKey {
        self.source
    }

    /// Target of the stored edge, regardless of this view's direction.
    pub fn target(&self) -> NodeKey {
        self.target
    }

    pub fn label(&self) -> EdgeLabel {
        self.label
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The vertex this view is anchored at.
    pub fn start(&self) -> NodeKey {
        match self.direction {
            Direction::Down => self.source,
            Direction::Up => self.target,
        }
    }

    /// The vertex reached by traversing the edge in this view's direction.
    pub fn end(&self) -> NodeKey {
        match self.direction {
            Direction::Down => self.target,
            Direction::Up => self.source,
        }
    }

    /// The opposite view of the same stored edge.
    pub fn flip(&self) -> DirectedEdge {
        DirectedEdge {
            direction: self.direction.flip(),
            ..*self
        }
    }
}

impl fmt::Display for DirectedEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = self.direction.symbol();
        write!(
            f,
            "{:?} {sym}{}{sym} {:?}",
            self.start(),
            self.label,
            self.end()
        )
    }
}

/// An immutable-after-build directed labeled multigraph over opaque vertex
/// payloads.
///
/// The matching engine never inspects payloads itself. Only the predicates
/// inside node matchers do, which is what keeps the engine generic over
/// `T`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Graph<T> {
    graph: StableDiGraph<T, EdgeLabel>,
}

impl<T> Graph<T> {
    pub fn new() -> Self {
        Graph {
            graph: StableDiGraph::new(),
        }
    }

    pub fn add_vertex(&mut self, payload: T) -> NodeKey {
        self.graph.add_node(payload).into()
    }

    /// Adds a labeled edge from `source` to `target`. Parallel edges
    /// between the same endpoints are kept distinct.
    pub fn add_edge(
        &mut self,
        source: NodeKey,
        target: NodeKey,
        label: impl Into<EdgeLabel>,
    ) -> EdgeKey {
        self.graph
            .add_edge(source.index(), target.index(), label.into())
            .into()
    }

    /// All vertices in insertion order. This order defines the order of
    /// anchors in a whole-graph search.
    pub fn vertices(&self) -> impl Iterator<Item = (NodeKey, &T)> {
        self.graph
            .node_indices()
            .map(|ix| (ix.into(), &self.graph[ix]))
    }

    pub fn vertex(&self, key: NodeKey) -> Option<&T> {
        self.graph.node_weight(key.index())
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Endpoints and label of a stored edge.
    pub fn edge(&self, key: EdgeKey) -> Option<(NodeKey, NodeKey, EdgeLabel)> {
        let (source, target) = self.graph.edge_endpoints(key.index())?;
        let label = *self.graph.edge_weight(key.index())?;
        Some((source.into(), target.into(), label))
    }

    /// All direction-relative views incident to `vertex`: `Down` views of
    /// its outgoing edges, then `Up` views of its incoming edges.
    ///
    /// The enumeration order within each group is the adjacency order of
    /// the underlying store. It is deterministic for a given build
    /// sequence, and it is the order in which the search engine branches.
    pub fn incident_edges(&self, vertex: NodeKey) -> Vec<DirectedEdge> {
        let ix = vertex.index();
        let mut views = Vec::new();
        for (petgraph_dir, direction) in [
            (petgraph::Direction::Outgoing, Direction::Down),
            (petgraph::Direction::Incoming, Direction::Up),
        ] {
            for edge in self.graph.edges_directed(ix, petgraph_dir) {
                views.push(DirectedEdge {
                    key: edge.id().into(),
                    source: edge.source().into(),
                    target: edge.target().into(),
                    label: *edge.weight(),
                    direction,
                });
            }
        }
        views
    }
}

impl<T> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}
