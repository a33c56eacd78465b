use crate::graph::{DirectedEdge, Graph, NodeKey};
use crate::matcher::{CaptureName, Matcher};
use crate::pattern::Pattern;
use crate::util::log;
use std::collections::HashMap;

/// A vertex recorded under a capture alias, with the matched text the
/// capturing matcher reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCapture {
    pub node: NodeKey,
    pub text: String,
}

/// A directed edge recorded under a capture alias, with the matched text
/// the capturing matcher reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeCapture {
    pub edge: DirectedEdge,
    pub text: String,
}

/// One successful anchored match.
///
/// Created only by the search engine and read-only afterwards. The edge
/// path is a walk in traversal order; the capture maps have unique keys
/// and no order significance.
pub struct Match<'p, T> {
    pattern: &'p Pattern<T>,
    edges: Vec<DirectedEdge>,
    node_captures: HashMap<CaptureName, NodeCapture>,
    edge_captures: HashMap<CaptureName, EdgeCapture>,
}

impl<'p, T> Match<'p, T> {
    /// The pattern that produced this match.
    pub fn pattern(&self) -> &'p Pattern<T> {
        self.pattern
    }

    /// The traversed directed edges, in traversal order.
    pub fn edges(&self) -> &[DirectedEdge] {
        &self.edges
    }

    pub fn node_captures(&self) -> &HashMap<CaptureName, NodeCapture> {
        &self.node_captures
    }

    pub fn edge_captures(&self) -> &HashMap<CaptureName, EdgeCapture> {
        &self.edge_captures
    }

    pub fn captured_node(&self, alias: impl Into<CaptureName>) -> Option<&NodeCapture> {
        self.node_captures.get(&alias.into())
    }

    pub fn captured_edge(&self, alias: impl Into<CaptureName>) -> Option<&EdgeCapture> {
        self.edge_captures.get(&alias.into())
    }
}

impl<T> Clone for Match<'_, T> {
    fn clone(&self) -> Self {
        Match {
            pattern: self.pattern,
            edges: self.edges.clone(),
            node_captures: self.node_captures.clone(),
            edge_captures: self.edge_captures.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Match<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Match")
            .field("edges", &self.edges)
            .field("node_captures", &self.node_captures)
            .field("edge_captures", &self.edge_captures)
            .finish_non_exhaustive()
    }
}

impl<T> Pattern<T> {
    /// All matches anchored at every vertex of `graph`, in the graph's
    /// vertex-enumeration order. Per anchor, results appear in the order
    /// the backtracking search discovers them.
    pub fn search<'p>(&'p self, graph: &Graph<T>) -> Vec<Match<'p, T>> {
        let mut matches = Vec::new();
        for (anchor, _) in graph.vertices() {
            self.collect_from(graph, anchor, usize::MAX, &mut matches);
        }
        matches
    }

    /// All matches anchored at `start`. A start key that is not in the
    /// graph yields no matches. Finding nothing is not an error.
    pub fn search_from<'p>(&'p self, graph: &Graph<T>, start: NodeKey) -> Vec<Match<'p, T>> {
        let mut matches = Vec::new();
        self.collect_from(graph, start, usize::MAX, &mut matches);
        matches
    }

    /// Like [`Pattern::search_from`], but stops after `max_matches`
    /// results. A guard for graphs with adversarial branching factors.
    pub fn search_from_bounded<'p>(
        &'p self,
        graph: &Graph<T>,
        start: NodeKey,
        max_matches: usize,
    ) -> Vec<Match<'p, T>> {
        let mut matches = Vec::new();
        self.collect_from(graph, start, max_matches, &mut matches);
        matches
    }

    fn collect_from<'p>(
        &'p self,
        graph: &Graph<T>,
        start: NodeKey,
        max_matches: usize,
        matches: &mut Vec<Match<'p, T>>,
    ) {
        let walk = Walk {
            graph,
            pattern: self,
            max_matches,
        };
        walk.step(
            self.matchers(),
            start,
            &[],
            &HashMap::new(),
            &HashMap::new(),
            matches,
        );
    }
}

/// One anchored backtracking search. The per-branch state (remaining
/// matcher suffix, frontier vertex, traversed path, capture maps) is
/// passed down the recursion and copied on branch, so independent
/// branches never observe each other's partial state.
struct Walk<'a, 'p, T> {
    graph: &'a Graph<T>,
    pattern: &'p Pattern<T>,
    max_matches: usize,
}

impl<'p, T> Walk<'_, 'p, T> {
    fn step(
        &self,
        remaining: &[Matcher<T>],
        frontier: NodeKey,
        path: &[DirectedEdge],
        node_captures: &HashMap<CaptureName, NodeCapture>,
        edge_captures: &HashMap<CaptureName, EdgeCapture>,
        matches: &mut Vec<Match<'p, T>>,
    ) {
        if matches.len() >= self.max_matches {
            return;
        }
        let Some((head, rest)) = remaining.split_first() else {
            matches.push(Match {
                pattern: self.pattern,
                edges: path.to_vec(),
                node_captures: node_captures.clone(),
                edge_captures: edge_captures.clone(),
            });
            return;
        };
        match head {
            Matcher::Node(node) => {
                let Some(payload) = self.graph.vertex(frontier) else {
                    return;
                };
                let mut recorded = Vec::new();
                if node.try_match(payload, &mut recorded).is_none() {
                    return;
                }
                if recorded.is_empty() {
                    self.step(rest, frontier, path, node_captures, edge_captures, matches);
                } else {
                    let mut node_captures = node_captures.clone();
                    for (alias, text) in recorded {
                        node_captures.insert(
                            alias,
                            NodeCapture {
                                node: frontier,
                                text,
                            },
                        );
                    }
                    self.step(rest, frontier, path, &node_captures, edge_captures, matches);
                }
            }
            Matcher::Edge(edge_matcher) => {
                for view in self.graph.incident_edges(frontier) {
                    // an edge and its reverse are one resource, spent at
                    // most once per match
                    if path.iter().any(|used| used.key() == view.key()) {
                        continue;
                    }
                    let mut recorded = Vec::new();
                    if edge_matcher.try_match(&view, &mut recorded).is_none() {
                        continue;
                    }
                    log::trace!("taking {view}, {} matchers left", rest.len());
                    let mut path = path.to_vec();
                    path.push(view);
                    if recorded.is_empty() {
                        self.step(rest, view.end(), &path, node_captures, edge_captures, matches);
                    } else {
                        let mut edge_captures = edge_captures.clone();
                        for (alias, text) in recorded {
                            edge_captures.insert(alias, EdgeCapture { edge: view, text });
                        }
                        self.step(rest, view.end(), &path, node_captures, &edge_captures, matches);
                    }
                    if matches.len() >= self.max_matches {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{EdgeMatcher, NodeMatcher};

    fn word(text: &'static str) -> NodeMatcher<&'static str> {
        NodeMatcher::test(format!("string=\"{text}\""), move |payload: &&str| {
            *payload == text
        })
    }

    fn capture(alias: &str) -> NodeMatcher<&'static str> {
        NodeMatcher::capture(alias, NodeMatcher::Trivial)
    }

    fn up(label: &str) -> EdgeMatcher {
        EdgeMatcher::up(EdgeMatcher::label(label))
    }

    fn down(label: &str) -> EdgeMatcher {
        EdgeMatcher::down(EdgeMatcher::label(label))
    }

    /// `gave` governs `Obama` via nsubj and `speech` via dobj.
    fn sentence() -> (Graph<&'static str>, NodeKey, NodeKey, NodeKey) {
        let mut graph = Graph::new();
        let gave = graph.add_vertex("gave");
        let obama = graph.add_vertex("Obama");
        let speech = graph.add_vertex("speech");
        graph.add_edge(gave, obama, "nsubj");
        graph.add_edge(gave, speech, "dobj");
        (graph, gave, obama, speech)
    }

    /// `{arg1} <nsubj< {rel} >dobj> {arg2}`
    fn triple_pattern() -> Pattern<&'static str> {
        Pattern::interleaved(
            vec![capture("arg1"), capture("rel"), capture("arg2")],
            vec![up("nsubj"), down("dobj")],
        )
        .unwrap()
    }

    #[test_log::test]
    fn anchored_search_extracts_the_triple() {
        let (graph, gave, obama, speech) = sentence();
        let pattern = triple_pattern();

        let matches = pattern.search_from(&graph, obama);
        assert_eq!(matches.len(), 1);
        let found = &matches[0];
        assert_eq!(found.captured_node("arg1").unwrap().node, obama);
        assert_eq!(found.captured_node("rel").unwrap().node, gave);
        assert_eq!(found.captured_node("arg2").unwrap().node, speech);
        assert_eq!(found.edges().len(), 2);
        assert_eq!(found.edges()[0].end(), gave);
        assert_eq!(found.edges()[1].end(), speech);
        assert_eq!(found.pattern(), &pattern);
    }

    #[test]
    fn whole_graph_search_finds_the_single_anchor() {
        let (graph, gave, ..) = sentence();
        let pattern = triple_pattern();
        assert_eq!(pattern.search(&graph).len(), 1);
        // the first matcher only ever tests the anchor itself
        assert!(pattern.search_from(&graph, gave).is_empty());
    }

    #[test]
    fn absent_label_yields_no_matches() {
        let (graph, gave, ..) = sentence();
        let pattern =
            Pattern::interleaved(vec![capture("a"), capture("b")], vec![down("iobj")]).unwrap();
        assert!(pattern.search_from(&graph, gave).is_empty());
        assert!(pattern.search(&graph).is_empty());
    }

    #[test]
    fn parallel_edges_branch_into_separate_matches() {
        let mut graph = Graph::new();
        let gave = graph.add_vertex("gave");
        let obama = graph.add_vertex("Obama");
        let biden = graph.add_vertex("Biden");
        graph.add_edge(gave, obama, "nsubj");
        graph.add_edge(gave, biden, "nsubj");

        let pattern =
            Pattern::interleaved(vec![capture("rel"), capture("arg1")], vec![down("nsubj")])
                .unwrap();
        let matches = pattern.search_from(&graph, gave);
        assert_eq!(matches.len(), 2);
        let mut subjects: Vec<_> = matches
            .iter()
            .map(|found| found.captured_node("arg1").unwrap().node)
            .collect();
        subjects.sort();
        assert_eq!(subjects, vec![obama, biden]);
        for found in &matches {
            assert_eq!(found.captured_node("rel").unwrap().node, gave);
        }
    }

    #[test]
    fn reflection_recovers_the_triple_from_the_opposite_anchor() {
        let (graph, gave, obama, speech) = sentence();
        let reflected = triple_pattern().reflection();

        let matches = reflected.search_from(&graph, speech);
        assert_eq!(matches.len(), 1);
        let found = &matches[0];
        assert_eq!(found.captured_node("arg1").unwrap().node, obama);
        assert_eq!(found.captured_node("rel").unwrap().node, gave);
        assert_eq!(found.captured_node("arg2").unwrap().node, speech);
        // the recorded path runs the other way
        assert_eq!(found.edges()[0].end(), gave);
        assert_eq!(found.edges()[1].end(), obama);
    }

    #[test]
    fn an_edge_is_never_reused_in_either_direction() {
        let mut graph = Graph::new();
        let gave = graph.add_vertex("gave");
        let obama = graph.add_vertex("Obama");
        graph.add_edge(gave, obama, "nsubj");

        // walking back down would have to re-traverse the only nsubj edge
        let bounce = Pattern::interleaved(
            vec![capture("a"), capture("b"), capture("c")],
            vec![up("nsubj"), down("nsubj")],
        )
        .unwrap();
        assert!(bounce.search_from(&graph, obama).is_empty());

        // a second nsubj edge makes the walk possible again
        let biden = graph.add_vertex("Biden");
        graph.add_edge(gave, biden, "nsubj");
        let matches = bounce.search_from(&graph, obama);
        assert_eq!(matches.len(), 1);
        let found = &matches[0];
        assert_eq!(found.captured_node("c").unwrap().node, biden);
        assert_ne!(found.edges()[0].key(), found.edges()[1].key());
    }

    #[test]
    fn captureless_patterns_produce_empty_capture_maps() {
        let (graph, _, obama, _) = sentence();
        let pattern = Pattern::interleaved(
            vec![word("Obama"), word("gave")],
            vec![up("nsubj")],
        )
        .unwrap();
        let matches = pattern.search_from(&graph, obama);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].node_captures().is_empty());
        assert!(matches[0].edge_captures().is_empty());
    }

    #[test]
    fn capturing_aliases_appear_in_every_match() {
        let (graph, gave, obama, _) = sentence();
        let pattern = Pattern::interleaved(
            vec![capture("x"), NodeMatcher::Trivial],
            vec![EdgeMatcher::capture("e", up("nsubj"))],
        )
        .unwrap();
        let matches = pattern.search_from(&graph, obama);
        assert_eq!(matches.len(), 1);
        let found = &matches[0];
        assert_eq!(found.captured_node("x").unwrap().node, obama);
        let edge_capture = found.captured_edge("e").unwrap();
        assert_eq!(edge_capture.edge.start(), obama);
        assert_eq!(edge_capture.edge.end(), gave);
        assert_eq!(edge_capture.text, "nsubj");
    }

    #[test]
    fn trivial_pattern_matches_every_vertex_in_order() {
        let (graph, gave, obama, speech) = sentence();
        let pattern = Pattern::new(vec![Matcher::Node(capture("v"))]).unwrap();
        let matches = pattern.search(&graph);
        let anchors: Vec<_> = matches
            .iter()
            .map(|found| found.captured_node("v").unwrap().node)
            .collect();
        assert_eq!(anchors, vec![gave, obama, speech]);
        assert!(matches.iter().all(|found| found.edges().is_empty()));
    }

    #[test]
    fn bounded_search_stops_at_the_cap() {
        let mut graph = Graph::new();
        let gave = graph.add_vertex("gave");
        for subject in ["Obama", "Biden", "Harris"] {
            let vertex = graph.add_vertex(subject);
            graph.add_edge(gave, vertex, "nsubj");
        }
        let pattern =
            Pattern::interleaved(vec![capture("rel"), capture("arg1")], vec![down("nsubj")])
                .unwrap();
        assert_eq!(pattern.search_from(&graph, gave).len(), 3);
        assert_eq!(pattern.search_from_bounded(&graph, gave, 2).len(), 2);
    }

    #[test]
    fn unknown_start_key_yields_nothing() {
        let (graph, ..) = sentence();
        let pattern = triple_pattern();
        assert!(pattern.search_from(&graph, NodeKey(99)).is_empty());
    }

    #[test]
    fn wildcard_and_label_texts_are_reported() {
        let (graph, _, obama, _) = sentence();
        let pattern = Pattern::interleaved(
            vec![capture("x"), NodeMatcher::Trivial],
            vec![EdgeMatcher::capture("e", EdgeMatcher::up(EdgeMatcher::Trivial))],
        )
        .unwrap();
        let matches = pattern.search_from(&graph, obama);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].captured_node("x").unwrap().text, "*");
        assert_eq!(matches[0].captured_edge("e").unwrap().text, "nsubj");
    }
}
