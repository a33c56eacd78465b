use crate::graph::{DirectedEdge, Direction, EdgeLabel};
use crate::interned_string_newtype;
use crate::pattern::{PatternError, PatternResult};
use crate::util::InternString;
use derive_more::{From, Into};
use error_stack::bail;
use internment::Intern;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::discriminant;
use std::sync::Arc;

/// Alias under which a capturing matcher records what it matched.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, From, Into)]
pub struct CaptureName(InternString);
interned_string_newtype!(CaptureName);

impl CaptureName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaptureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Matched text reported by the trivial node matcher.
pub const WILDCARD: &str = "*";

/// Captures recorded while one matcher runs. The frontier vertex or the
/// current edge is attached by the search engine, which is the only place
/// that knows it.
pub type RecordedCaptures = Vec<(CaptureName, String)>;

/// An opaque vertex predicate together with the canonical text it was
/// built from.
///
/// The text is the test's identity: two tests compare and hash equal
/// exactly when their texts do, which is what makes whole patterns usable
/// as cache keys.
pub struct VertexTest<T> {
    text: String,
    pred: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> VertexTest<T> {
    pub fn new(text: impl Into<String>, pred: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        VertexTest {
            text: text.into(),
            pred: Arc::new(pred),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn matches(&self, vertex: &T) -> bool {
        (self.pred)(vertex)
    }
}

impl<T> Clone for VertexTest<T> {
    fn clone(&self) -> Self {
        VertexTest {
            text: self.text.clone(),
            pred: Arc::clone(&self.pred),
        }
    }
}

impl<T> fmt::Debug for VertexTest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexTest")
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

impl<T> PartialEq for VertexTest<T> {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl<T> Eq for VertexTest<T> {}

impl<T> Hash for VertexTest<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl<T> fmt::Display for VertexTest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Vertex-side matchers.
///
/// Wrapping variants delegate the core test to their inner matcher and add
/// behavior on top. `Conjunction` must be built through
/// [`NodeMatcher::conjunction`], which enforces its arity and flatness
/// invariants; [`Pattern::new`] re-checks them.
///
/// [`Pattern::new`]: crate::pattern::Pattern::new
pub enum NodeMatcher<T> {
    /// Matches every vertex. Its matched text is the wildcard marker `*`.
    Trivial,
    /// Matches the vertices its predicate accepts. Its matched text is the
    /// test's canonical text.
    Test(VertexTest<T>),
    /// Delegates to `inner` and records the vertex under `alias`.
    Capture {
        alias: CaptureName,
        inner: Box<NodeMatcher<T>>,
    },
    /// Matches the vertices every member accepts. Its matched text is the
    /// first member's, in declaration order.
    Conjunction(Vec<NodeMatcher<T>>),
}

impl<T> NodeMatcher<T> {
    pub fn test(text: impl Into<String>, pred: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        NodeMatcher::Test(VertexTest::new(text, pred))
    }

    pub fn capture(alias: impl Into<CaptureName>, inner: NodeMatcher<T>) -> Self {
        NodeMatcher::Capture {
            alias: alias.into(),
            inner: Box::new(inner),
        }
    }

    /// Builds a conjunction of at least two non-conjunction members.
    /// Builders with nested conjunctions must flatten them first.
    pub fn conjunction(members: Vec<NodeMatcher<T>>) -> PatternResult<Self> {
        if members.len() < 2 {
            bail!(PatternError::ConjunctionTooSmall {
                len: members.len()
            });
        }
        if members
            .iter()
            .any(|member| matches!(member, NodeMatcher::Conjunction(_)))
        {
            bail!(PatternError::NestedConjunction);
        }
        Ok(NodeMatcher::Conjunction(members))
    }

    /// Tests `vertex`, returning the matched text on success and pushing
    /// every capture this matcher records into `captures`.
    ///
    /// On failure the contents of `captures` are unspecified; callers
    /// discard them.
    pub fn try_match(&self, vertex: &T, captures: &mut RecordedCaptures) -> Option<String> {
        match self {
            NodeMatcher::Trivial => Some(WILDCARD.to_owned()),
            NodeMatcher::Test(test) => test.matches(vertex).then(|| test.text().to_owned()),
            NodeMatcher::Capture { alias, inner } => {
                let text = inner.try_match(vertex, captures)?;
                captures.push((*alias, text.clone()));
                Some(text)
            }
            NodeMatcher::Conjunction(members) => {
                let mut first_text = None;
                for member in members {
                    let text = member.try_match(vertex, captures)?;
                    if first_text.is_none() {
                        first_text = Some(text);
                    }
                }
                first_text
            }
        }
    }

    /// The innermost unwrapped tests beneath this matcher. Plural because
    /// a conjunction aggregates several independent base tests.
    pub fn base_matchers(&self) -> Vec<&NodeMatcher<T>> {
        match self {
            NodeMatcher::Capture { inner, .. } => inner.base_matchers(),
            NodeMatcher::Conjunction(members) => members
                .iter()
                .flat_map(|member| member.base_matchers())
                .collect(),
            base => vec![base],
        }
    }
}

impl<T> Clone for NodeMatcher<T> {
    fn clone(&self) -> Self {
        match self {
            NodeMatcher::Trivial => NodeMatcher::Trivial,
            NodeMatcher::Test(test) => NodeMatcher::Test(test.clone()),
            NodeMatcher::Capture { alias, inner } => NodeMatcher::Capture {
                alias: *alias,
                inner: inner.clone(),
            },
            NodeMatcher::Conjunction(members) => NodeMatcher::Conjunction(members.clone()),
        }
    }
}

impl<T> fmt::Debug for NodeMatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeMatcher::Trivial => write!(f, "Trivial"),
            NodeMatcher::Test(test) => f.debug_tuple("Test").field(test).finish(),
            NodeMatcher::Capture { alias, inner } => f
                .debug_struct("Capture")
                .field("alias", alias)
                .field("inner", inner)
                .finish(),
            NodeMatcher::Conjunction(members) => {
                f.debug_tuple("Conjunction").field(members).finish()
            }
        }
    }
}

impl<T> PartialEq for NodeMatcher<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeMatcher::Trivial, NodeMatcher::Trivial) => true,
            (NodeMatcher::Test(a), NodeMatcher::Test(b)) => a == b,
            (
                NodeMatcher::Capture { alias, inner },
                NodeMatcher::Capture {
                    alias: other_alias,
                    inner: other_inner,
                },
            ) => alias == other_alias && inner == other_inner,
            (NodeMatcher::Conjunction(a), NodeMatcher::Conjunction(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> Eq for NodeMatcher<T> {}

impl<T> Hash for NodeMatcher<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(self).hash(state);
        match self {
            NodeMatcher::Trivial => {}
            NodeMatcher::Test(test) => test.hash(state),
            NodeMatcher::Capture { alias, inner } => {
                alias.hash(state);
                inner.hash(state);
            }
            NodeMatcher::Conjunction(members) => members.hash(state),
        }
    }
}

impl<T> fmt::Display for NodeMatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeMatcher::Trivial => write!(f, "{WILDCARD}"),
            NodeMatcher::Test(test) => write!(f, "{test}"),
            NodeMatcher::Capture { alias, inner } => match &**inner {
                NodeMatcher::Trivial => write!(f, "{{{alias}}}"),
                inner => write!(f, "{{{alias}:{inner}}}"),
            },
            NodeMatcher::Conjunction(members) => {
                for (position, member) in members.iter().enumerate() {
                    if position > 0 {
                        write!(f, ":")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}

/// Edge-side matchers.
///
/// Edge tests only ever look at the directed-edge view, never at vertex
/// payloads, so this side of the algebra is not generic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeMatcher {
    /// Matches any directed edge. Its matched text is the edge's label.
    Trivial,
    /// Matches edges carrying exactly this label.
    Label(EdgeLabel),
    /// Requires the view's traversal direction before consulting `inner`.
    Directed {
        direction: Direction,
        inner: Box<EdgeMatcher>,
    },
    /// Delegates to `inner` and records the directed edge under `alias`.
    Capture {
        alias: CaptureName,
        inner: Box<EdgeMatcher>,
    },
}

impl EdgeMatcher {
    pub fn label(label: impl Into<EdgeLabel>) -> Self {
        EdgeMatcher::Label(label.into())
    }

    pub fn directed(direction: Direction, inner: EdgeMatcher) -> Self {
        EdgeMatcher::Directed {
            direction,
            inner: Box::new(inner),
        }
    }

    pub fn up(inner: EdgeMatcher) -> Self {
        EdgeMatcher::directed(Direction::Up, inner)
    }

    pub fn down(inner: EdgeMatcher) -> Self {
        EdgeMatcher::directed(Direction::Down, inner)
    }

    pub fn capture(alias: impl Into<CaptureName>, inner: EdgeMatcher) -> Self {
        EdgeMatcher::Capture {
            alias: alias.into(),
            inner: Box::new(inner),
        }
    }

    /// Tests `edge`, returning the matched text on success and pushing
    /// every capture this matcher records into `captures`.
    ///
    /// On failure the contents of `captures` are unspecified; callers
    /// discard them.
    pub fn try_match(&self, edge: &DirectedEdge, captures: &mut RecordedCaptures) -> Option<String> {
        match self {
            EdgeMatcher::Trivial => Some(edge.label().to_string()),
            EdgeMatcher::Label(label) => (edge.label() == *label).then(|| label.to_string()),
            EdgeMatcher::Directed { direction, inner } => {
                if edge.direction() != *direction {
                    return None;
                }
                inner.try_match(edge, captures)
            }
            EdgeMatcher::Capture { alias, inner } => {
                let text = inner.try_match(edge, captures)?;
                captures.push((*alias, text.clone()));
                Some(text)
            }
        }
    }

    /// The same matcher with every direction requirement reversed. Wrapped
    /// inner matchers are kept as they are; only `Directed` layers change.
    pub fn flip(&self) -> EdgeMatcher {
        match self {
            EdgeMatcher::Directed { direction, inner } => EdgeMatcher::Directed {
                direction: direction.flip(),
                inner: inner.clone(),
            },
            EdgeMatcher::Capture { alias, inner } => EdgeMatcher::Capture {
                alias: *alias,
                inner: Box::new(inner.flip()),
            },
            other => other.clone(),
        }
    }

    /// The innermost unwrapped test beneath this matcher.
    pub fn base_matcher(&self) -> &EdgeMatcher {
        match self {
            EdgeMatcher::Directed { inner, .. } | EdgeMatcher::Capture { inner, .. } => {
                inner.base_matcher()
            }
            base => base,
        }
    }
}

impl fmt::Display for EdgeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // renders empty so a trivial directed edge shows as `<<` or `>>`
            EdgeMatcher::Trivial => Ok(()),
            EdgeMatcher::Label(label) => write!(f, "{label}"),
            EdgeMatcher::Directed { direction, inner } => {
                let sym = direction.symbol();
                write!(f, "{sym}{inner}{sym}")
            }
            EdgeMatcher::Capture { alias, inner } => match &**inner {
                EdgeMatcher::Trivial => write!(f, "{{{alias}}}"),
                inner => write!(f, "{{{alias}:{inner}}}"),
            },
        }
    }
}

/// Either side of the alternating matcher sequence of a pattern.
#[derive(From)]
pub enum Matcher<T> {
    Node(NodeMatcher<T>),
    Edge(EdgeMatcher),
}

impl<T> Clone for Matcher<T> {
    fn clone(&self) -> Self {
        match self {
            Matcher::Node(node) => Matcher::Node(node.clone()),
            Matcher::Edge(edge) => Matcher::Edge(edge.clone()),
        }
    }
}

impl<T> fmt::Debug for Matcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Matcher::Edge(edge) => f.debug_tuple("Edge").field(edge).finish(),
        }
    }
}

impl<T> PartialEq for Matcher<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Matcher::Node(a), Matcher::Node(b)) => a == b,
            (Matcher::Edge(a), Matcher::Edge(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> Eq for Matcher<T> {}

impl<T> Hash for Matcher<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(self).hash(state);
        match self {
            Matcher::Node(node) => node.hash(state),
            Matcher::Edge(edge) => edge.hash(state),
        }
    }
}

impl<T> fmt::Display for Matcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Node(node) => write!(f, "{node}"),
            Matcher::Edge(edge) => write!(f, "{edge}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn word(text: &'static str) -> NodeMatcher<&'static str> {
        NodeMatcher::test(format!("string=\"{text}\""), move |payload: &&str| {
            *payload == text
        })
    }

    fn nsubj_up_view() -> DirectedEdge {
        let mut graph = Graph::new();
        let gave = graph.add_vertex("gave");
        let obama = graph.add_vertex("Obama");
        graph.add_edge(gave, obama, "nsubj");
        graph.incident_edges(obama)[0]
    }

    #[test]
    fn conjunction_needs_at_least_two_members() {
        assert!(NodeMatcher::<&str>::conjunction(vec![]).is_err());
        assert!(NodeMatcher::conjunction(vec![word("gave")]).is_err());
        assert!(NodeMatcher::conjunction(vec![word("gave"), NodeMatcher::Trivial]).is_ok());
    }

    #[test]
    fn conjunction_rejects_nested_conjunctions() {
        let inner = NodeMatcher::conjunction(vec![word("a"), word("b")]).unwrap();
        let result = NodeMatcher::conjunction(vec![inner, word("c")]);
        assert!(result.is_err());
    }

    #[test]
    fn conjunction_reports_first_member_text() {
        let conj =
            NodeMatcher::conjunction(vec![word("gave"), NodeMatcher::Trivial]).unwrap();
        let mut captures = Vec::new();
        assert_eq!(
            conj.try_match(&"gave", &mut captures),
            Some("string=\"gave\"".to_owned())
        );
        assert_eq!(conj.try_match(&"took", &mut captures), None);
    }

    #[test]
    fn capture_delegates_and_records() {
        let capture = NodeMatcher::capture("arg1", word("Obama"));
        let mut captures = Vec::new();
        assert!(capture.try_match(&"Obama", &mut captures).is_some());
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].0, "arg1".into());

        let mut captures = Vec::new();
        assert_eq!(capture.try_match(&"Biden", &mut captures), None);
    }

    #[test]
    fn directed_matcher_checks_direction_before_inner() {
        let up = EdgeMatcher::up(EdgeMatcher::label("nsubj"));
        let down = EdgeMatcher::down(EdgeMatcher::label("nsubj"));
        let view = nsubj_up_view();
        let mut captures = Vec::new();
        assert_eq!(up.try_match(&view, &mut captures), Some("nsubj".to_owned()));
        assert_eq!(down.try_match(&view, &mut captures), None);
        assert!(down.try_match(&view.flip(), &mut captures).is_some());
    }

    #[test]
    fn flip_swaps_direction_and_keeps_inner() {
        let matcher = EdgeMatcher::capture("e", EdgeMatcher::up(EdgeMatcher::label("nsubj")));
        let flipped = matcher.flip();
        assert_eq!(
            flipped,
            EdgeMatcher::capture("e", EdgeMatcher::down(EdgeMatcher::label("nsubj")))
        );
        assert_eq!(flipped.flip(), matcher);
    }

    #[test]
    fn base_matchers_unwrap_all_layers() {
        let conj = NodeMatcher::conjunction(vec![
            NodeMatcher::capture("a", word("gave")),
            NodeMatcher::Trivial,
        ])
        .unwrap();
        let wrapped = NodeMatcher::capture("outer", conj);
        let bases = wrapped.base_matchers();
        assert_eq!(bases.len(), 2);
        assert_eq!(bases[0], &word("gave"));
        assert_eq!(bases[1], &NodeMatcher::Trivial);

        let edge = EdgeMatcher::capture("e", EdgeMatcher::up(EdgeMatcher::label("dobj")));
        assert_eq!(edge.base_matcher(), &EdgeMatcher::label("dobj"));
    }

    #[test]
    fn rendering_matches_pattern_text() {
        assert_eq!(
            NodeMatcher::<&str>::capture("arg1", NodeMatcher::Trivial).to_string(),
            "{arg1}"
        );
        assert_eq!(
            NodeMatcher::capture("rel", word("gave")).to_string(),
            "{rel:string=\"gave\"}"
        );
        assert_eq!(
            NodeMatcher::conjunction(vec![word("gave"), NodeMatcher::Trivial])
                .unwrap()
                .to_string(),
            "string=\"gave\":*"
        );
        assert_eq!(
            EdgeMatcher::up(EdgeMatcher::label("nsubj")).to_string(),
            "<nsubj<"
        );
        assert_eq!(EdgeMatcher::down(EdgeMatcher::Trivial).to_string(), ">>");
        assert_eq!(
            EdgeMatcher::down(EdgeMatcher::capture("e", EdgeMatcher::label("dobj"))).to_string(),
            ">{e:dobj}>"
        );
    }

    #[test]
    fn vertex_tests_compare_by_text() {
        let left = VertexTest::<&str>::new("lemma=\"give\"", |_| true);
        let right = VertexTest::<&str>::new("lemma=\"give\"", |_| false);
        assert_eq!(left, right);
        assert_ne!(left, VertexTest::new("lemma=\"take\"", |_| true));
    }
}
