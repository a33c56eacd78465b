use crate::matcher::{EdgeMatcher, Matcher, NodeMatcher};
use error_stack::bail;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Violations of the pattern construction invariants. Fatal to
/// construction and never retried.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern has no matchers")]
    Empty,
    #[error("pattern must start with a node matcher")]
    LeadingEdgeMatcher,
    #[error("pattern must end with a node matcher")]
    TrailingEdgeMatcher,
    #[error("node and edge matchers must alternate, violated at position {position}")]
    BrokenAlternation { position: usize },
    #[error("a conjunction needs at least two members, got {len}")]
    ConjunctionTooSmall { len: usize },
    #[error("a conjunction cannot contain another conjunction")]
    NestedConjunction,
}

pub type PatternResult<V> = error_stack::Result<V, PatternError>;

/// A validated, immutable, ordered sequence of matchers.
///
/// The sequence strictly alternates node and edge matchers and both starts
/// and ends on a node matcher, so its length is always odd and it has one
/// more node matcher than edge matchers.
///
/// Identity for equality, hashing and deduplication is the ordered matcher
/// sequence.
pub struct Pattern<T> {
    matchers: Vec<Matcher<T>>,
}

impl<T> Pattern<T> {
    /// Validates `matchers` and builds a pattern from them.
    pub fn new(matchers: Vec<Matcher<T>>) -> PatternResult<Self> {
        if matchers.is_empty() {
            bail!(PatternError::Empty);
        }
        for (position, matcher) in matchers.iter().enumerate() {
            let expect_node = position % 2 == 0;
            match matcher {
                Matcher::Node(node) if expect_node => validate_node(node)?,
                Matcher::Edge(_) if !expect_node => {}
                Matcher::Edge(_) if position == 0 => bail!(PatternError::LeadingEdgeMatcher),
                _ => bail!(PatternError::BrokenAlternation { position }),
            }
        }
        if matchers.len() % 2 == 0 {
            bail!(PatternError::TrailingEdgeMatcher);
        }
        Ok(Pattern { matchers })
    }

    /// Builds a pattern by interleaving `nodes` and `edges`, starting with
    /// the first node matcher. Equivalent to spelling out the alternation
    /// by hand, including its validation.
    pub fn interleaved(
        nodes: Vec<NodeMatcher<T>>,
        edges: Vec<EdgeMatcher>,
    ) -> PatternResult<Self> {
        let mut matchers = Vec::with_capacity(nodes.len() + edges.len());
        let mut nodes = nodes.into_iter();
        let mut edges = edges.into_iter();
        if let Some(first) = nodes.next() {
            matchers.push(Matcher::Node(first));
        }
        loop {
            match (edges.next(), nodes.next()) {
                (None, None) => break,
                (edge, node) => {
                    matchers.extend(edge.map(Matcher::Edge));
                    matchers.extend(node.map(Matcher::Node));
                }
            }
        }
        Pattern::new(matchers)
    }

    pub fn matchers(&self) -> &[Matcher<T>] {
        &self.matchers
    }

    /// The node matcher sub-sequence, in original order.
    pub fn node_matchers(&self) -> impl Iterator<Item = &NodeMatcher<T>> {
        self.matchers.iter().filter_map(|matcher| match matcher {
            Matcher::Node(node) => Some(node),
            Matcher::Edge(_) => None,
        })
    }

    /// The edge matcher sub-sequence, in original order.
    pub fn edge_matchers(&self) -> impl Iterator<Item = &EdgeMatcher> {
        self.matchers.iter().filter_map(|matcher| match matcher {
            Matcher::Edge(edge) => Some(edge),
            Matcher::Node(_) => None,
        })
    }

    /// A pattern matching the same graph structures when searched from the
    /// opposite end: the matcher list reversed, with every edge matcher
    /// flipped and node matchers passed through unchanged.
    ///
    /// Applying it twice restores the original pattern.
    pub fn reflection(&self) -> Pattern<T> {
        let matchers = self
            .matchers
            .iter()
            .rev()
            .map(|matcher| match matcher {
                Matcher::Node(node) => Matcher::Node(node.clone()),
                Matcher::Edge(edge) => Matcher::Edge(edge.flip()),
            })
            .collect();
        // reversal preserves the alternation, no re-validation needed
        Pattern { matchers }
    }
}

fn validate_node<T>(node: &NodeMatcher<T>) -> PatternResult<()> {
    match node {
        NodeMatcher::Capture { inner, .. } => validate_node(inner),
        NodeMatcher::Conjunction(members) => {
            if members.len() < 2 {
                bail!(PatternError::ConjunctionTooSmall {
                    len: members.len()
                });
            }
            for member in members {
                if matches!(member, NodeMatcher::Conjunction(_)) {
                    bail!(PatternError::NestedConjunction);
                }
                validate_node(member)?;
            }
            Ok(())
        }
        NodeMatcher::Trivial | NodeMatcher::Test(_) => Ok(()),
    }
}

impl<T> Clone for Pattern<T> {
    fn clone(&self) -> Self {
        Pattern {
            matchers: self.matchers.clone(),
        }
    }
}

impl<T> fmt::Debug for Pattern<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.matchers).finish()
    }
}

impl<T> PartialEq for Pattern<T> {
    fn eq(&self, other: &Self) -> bool {
        self.matchers == other.matchers
    }
}

impl<T> Eq for Pattern<T> {}

impl<T> Hash for Pattern<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.matchers.hash(state);
    }
}

impl<T> fmt::Display for Pattern<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, matcher) in self.matchers.iter().enumerate() {
            if position > 0 {
                write!(f, " ")?;
            }
            write!(f, "{matcher}")?;
        }
        Ok(())
    }
}
