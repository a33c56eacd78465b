//! A backtracking engine matching structural motifs in directed,
//! edge-labeled graphs.
//!
//! A [`Pattern`] is an alternating sequence of node and edge matchers,
//! conceptually a regular expression generalized from strings to labeled
//! graphs. Searching a [`Graph`] enumerates every structural [`Match`],
//! together with the vertices and directed edges recorded by capturing
//! matchers.
//!
//! Graphs and patterns are built once and reused; a search never mutates
//! either, so independent searches can run in parallel freely.
//!
//! ```
//! use graphex::prelude::*;
//!
//! // gave --nsubj--> Obama, gave --dobj--> speech
//! let mut graph = Graph::new();
//! let gave = graph.add_vertex("gave");
//! let obama = graph.add_vertex("Obama");
//! let speech = graph.add_vertex("speech");
//! graph.add_edge(gave, obama, "nsubj");
//! graph.add_edge(gave, speech, "dobj");
//!
//! // {arg1} <nsubj< {rel} >dobj> {arg2}
//! let pattern = Pattern::interleaved(
//!     vec![
//!         NodeMatcher::capture("arg1", NodeMatcher::Trivial),
//!         NodeMatcher::capture("rel", NodeMatcher::Trivial),
//!         NodeMatcher::capture("arg2", NodeMatcher::Trivial),
//!     ],
//!     vec![
//!         EdgeMatcher::up(EdgeMatcher::label("nsubj")),
//!         EdgeMatcher::down(EdgeMatcher::label("dobj")),
//!     ],
//! )
//! .unwrap();
//!
//! let matches = pattern.search(&graph);
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].captured_node("rel").unwrap().node, gave);
//! ```

pub mod graph;
pub mod matcher;
pub mod pattern;
pub mod search;
pub mod util;

pub use graph::{DirectedEdge, Direction, DotCollector, EdgeKey, EdgeLabel, Graph, NodeKey};
pub use matcher::{CaptureName, EdgeMatcher, Matcher, NodeMatcher, VertexTest, WILDCARD};
pub use pattern::{Pattern, PatternError, PatternResult};
pub use search::{EdgeCapture, Match, NodeCapture};

pub mod prelude {
    pub use crate::graph::{DirectedEdge, Direction, EdgeKey, EdgeLabel, Graph, NodeKey};
    pub use crate::matcher::{CaptureName, EdgeMatcher, Matcher, NodeMatcher, VertexTest};
    pub use crate::pattern::{Pattern, PatternError, PatternResult};
    pub use crate::search::{EdgeCapture, Match, NodeCapture};
}
