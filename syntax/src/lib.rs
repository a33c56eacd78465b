//! Pattern-text compiler for [`graphex`].
//!
//! Translates a compact textual pattern language into a validated
//! [`Pattern`]. The language alternates node expressions with directed
//! edge expressions:
//!
//! ```text
//! {arg1} <nsubj< {rel:pos="VBD"} >dobj> {arg2}
//! ```
//!
//! Node expressions are attribute logic (`string`/`lemma`/`pos`/`chunk`
//! equality combined with `&`, `|`, `!` and parentheses), `*` for a
//! wildcard, `{alias}` or `{alias:expr}` for captures, and `:`-joined
//! sub-expressions for conjunctions. Edge expressions name a label between
//! direction symbols, `<label<` for upward and `>label>` for downward
//! traversal, with `<<`/`>>` accepting any label and `<{alias:label}<`
//! capturing the traversed edge.
//!
//! The compiler owns every syntax error; the matching core only ever sees
//! patterns that already satisfy its construction invariants.

pub mod logic;
pub mod token;

use crate::logic::{Attr, AttrTest, LogicExpr};
use crate::token::Attributed;
use ariadne::{Label, Report, ReportKind, sources};
use chumsky::{input::ValueInput, prelude::*};
use error_stack::{ResultExt, bail};
use graphex::{Direction, EdgeMatcher, Matcher, NodeMatcher, Pattern};
use std::fmt;
use std::ops::Range;
use thiserror::Error;

pub use token::LemmatizedToken;

pub type Span = SimpleSpan;
pub type Spanned<T> = (T, Span);

#[derive(Clone, Debug, PartialEq)]
pub enum Token<'src> {
    Ctrl(char),
    Ident(&'src str),
    Str(&'src str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ctrl(c) => write!(f, "{}", c),
            Token::Ident(i) => write!(f, "{}", i),
            Token::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, extra::Err<Rich<'src, char, Span>>> {
    // A parser for quoted attribute values. No escape sequences: a value
    // runs until the next double quote.
    let quoted = just('"')
        .ignore_then(
            any::<&'src str, extra::Err<Rich<'src, char, Span>>>()
                .filter(|c| *c != '"')
                .repeated()
                .to_slice(),
        )
        .then_ignore(just('"'))
        .map(Token::Str);

    // A parser for the structural characters of the pattern language
    let ctrl = one_of("{}()<>:&|!=*").map(Token::Ctrl);

    // A parser for capture aliases, attribute names and edge labels
    let ident = text::ascii::ident().map(Token::Ident);

    let token = quoted.or(ctrl).or(ident);

    token
        .map_with(|tok, e| (tok, e.span()))
        .padded()
        // If we encounter an error, skip and attempt to lex the next character as a token instead
        .recover_with(skip_then_retry_until(any().ignored(), end()))
        .repeated()
        .collect()
}

// The parse result is kept free of the vertex payload type; predicates are
// only materialized when lowering into matchers.

#[derive(Debug, Clone, PartialEq)]
enum NodeAst {
    Trivial,
    Test(LogicExpr),
    Capture { alias: String, inner: Box<NodeAst> },
    Conjunction(Vec<NodeAst>),
}

#[derive(Debug, Clone, PartialEq)]
enum EdgeInnerAst {
    Trivial,
    Label(String),
    Capture {
        alias: String,
        label: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct EdgeAst {
    direction: Direction,
    inner: EdgeInnerAst,
}

#[derive(Debug, Clone, PartialEq)]
enum ElemAst {
    Node(NodeAst),
    Edge(EdgeAst),
}

fn pattern_parser<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Vec<ElemAst>, extra::Err<Rich<'tokens, Token<'src>, Span>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = Span>,
{
    let ident = select! {
        Token::Ident(ident) => ident.to_string(),
    }
    .labelled("identifier");

    let quoted = select! {
        Token::Str(s) => s.to_string(),
    }
    .labelled("quoted value");

    let attr_test = ident
        .clone()
        .then_ignore(just(Token::Ctrl('=')))
        .then(quoted)
        .try_map(|(name, value), span| {
            let attr = Attr::from_name(&name)
                .ok_or_else(|| Rich::custom(span, format!("unknown attribute `{name}`")))?;
            Ok(LogicExpr::Test(AttrTest { attr, value }))
        })
        .labelled("attribute test");

    let logic = recursive(|logic| {
        let atom = attr_test
            .clone()
            .or(logic.delimited_by(just(Token::Ctrl('(')), just(Token::Ctrl(')'))));
        let unary = just(Token::Ctrl('!'))
            .repeated()
            .foldr(atom, |_, inner| LogicExpr::Not(Box::new(inner)));
        let conjunction = unary.clone().foldl(
            just(Token::Ctrl('&')).ignore_then(unary).repeated(),
            |lhs, rhs| LogicExpr::And(Box::new(lhs), Box::new(rhs)),
        );
        conjunction.clone().foldl(
            just(Token::Ctrl('|')).ignore_then(conjunction).repeated(),
            |lhs, rhs| LogicExpr::Or(Box::new(lhs), Box::new(rhs)),
        )
    });

    // {alias}, {alias:expr} or {alias:expr:expr}
    let node_capture = just(Token::Ctrl('{'))
        .ignore_then(ident.clone())
        .then(
            just(Token::Ctrl(':'))
                .ignore_then(
                    logic
                        .clone()
                        .separated_by(just(Token::Ctrl(':')))
                        .at_least(1)
                        .collect::<Vec<_>>(),
                )
                .or_not(),
        )
        .then_ignore(just(Token::Ctrl('}')))
        .map(|(alias, exprs)| {
            let inner = match exprs {
                None => NodeAst::Trivial,
                Some(mut exprs) if exprs.len() == 1 => NodeAst::Test(exprs.remove(0)),
                Some(exprs) => {
                    NodeAst::Conjunction(exprs.into_iter().map(NodeAst::Test).collect())
                }
            };
            NodeAst::Capture {
                alias,
                inner: Box::new(inner),
            }
        });

    let conjunct = node_capture
        .or(just(Token::Ctrl('*')).to(NodeAst::Trivial))
        .or(logic.clone().map(NodeAst::Test));

    // a `:`-joined list of two or more conjuncts becomes a conjunction,
    // already flat by construction
    let node = conjunct
        .separated_by(just(Token::Ctrl(':')))
        .at_least(1)
        .collect::<Vec<_>>()
        .map(|mut conjuncts| {
            if conjuncts.len() == 1 {
                conjuncts.remove(0)
            } else {
                NodeAst::Conjunction(conjuncts)
            }
        })
        .labelled("node expression");

    // <label<, <<, <{e}<, <{e:label}< and the downward `>` forms
    let edge_capture = just(Token::Ctrl('{'))
        .ignore_then(ident.clone())
        .then(just(Token::Ctrl(':')).ignore_then(ident.clone()).or_not())
        .then_ignore(just(Token::Ctrl('}')))
        .map(|(alias, label)| EdgeInnerAst::Capture { alias, label });

    let edge_inner = edge_capture
        .or(ident.map(EdgeInnerAst::Label))
        .or_not()
        .map(|inner| inner.unwrap_or(EdgeInnerAst::Trivial));

    let directed_edge = |sym: char, direction: Direction| {
        just(Token::Ctrl(sym))
            .ignore_then(edge_inner.clone())
            .then_ignore(just(Token::Ctrl(sym)))
            .map(move |inner| EdgeAst { direction, inner })
    };
    let edge = directed_edge('<', Direction::Up)
        .or(directed_edge('>', Direction::Down))
        .labelled("edge expression");

    node.clone()
        .then(edge.then(node).repeated().collect::<Vec<_>>())
        .map(|(first, rest)| {
            let mut elems = vec![ElemAst::Node(first)];
            for (edge, node) in rest {
                elems.push(ElemAst::Edge(edge));
                elems.push(ElemAst::Node(node));
            }
            elems
        })
        .then_ignore(end())
}

/// A single syntax error with its byte span in the pattern text.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct SyntaxErrors(pub Vec<Diagnostic>);

impl fmt::Display for SyntaxErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "unknown syntax error"),
            [first] => write!(f, "{}", first.message),
            [first, rest @ ..] => write!(f, "{} (and {} more)", first.message, rest.len()),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("pattern text failed to parse: {0}")]
    Syntax(SyntaxErrors),
    #[error("pattern text violates the matcher sequence rules")]
    InvalidPattern,
}

pub type CompileResult<V> = error_stack::Result<V, CompileError>;

/// Compiles pattern text into a validated [`Pattern`].
///
/// Syntax errors, unknown attribute names and missing quotes are all
/// reported as [`CompileError::Syntax`]; they never surface from the
/// matching core itself.
pub fn compile<T: Attributed + 'static>(src: &str) -> CompileResult<Pattern<T>> {
    let (tokens, lex_errs) = lexer().parse(src).into_output_errors();
    let mut diagnostics: Vec<Diagnostic> = lex_errs
        .into_iter()
        .map(|e| diagnostic(e.map_token(|c| c.to_string())))
        .collect();

    let ast = if let Some(tokens) = &tokens {
        let (ast, parse_errs) = pattern_parser()
            .parse(
                tokens
                    .as_slice()
                    .map((src.len()..src.len()).into(), |(t, s)| (t, s)),
            )
            .into_output_errors();
        diagnostics.extend(
            parse_errs
                .into_iter()
                .map(|e| diagnostic(e.map_token(|tok| tok.to_string()))),
        );
        ast
    } else {
        None
    };

    if !diagnostics.is_empty() {
        bail!(CompileError::Syntax(SyntaxErrors(diagnostics)));
    }
    let Some(elems) = ast else {
        bail!(CompileError::Syntax(SyntaxErrors(vec![Diagnostic {
            message: "empty pattern".to_owned(),
            span: 0..src.len(),
        }])));
    };

    lower(elems)
}

fn diagnostic(err: Rich<'_, String, Span>) -> Diagnostic {
    Diagnostic {
        message: err.to_string(),
        span: err.span().into_range(),
    }
}

fn lower<T: Attributed + 'static>(elems: Vec<ElemAst>) -> CompileResult<Pattern<T>> {
    let mut matchers = Vec::with_capacity(elems.len());
    for elem in elems {
        match elem {
            ElemAst::Node(node) => matchers.push(Matcher::Node(lower_node(node)?)),
            ElemAst::Edge(edge) => matchers.push(Matcher::Edge(lower_edge(edge))),
        }
    }
    Pattern::new(matchers).change_context(CompileError::InvalidPattern)
}

fn lower_node<T: Attributed + 'static>(node: NodeAst) -> CompileResult<NodeMatcher<T>> {
    Ok(match node {
        NodeAst::Trivial => NodeMatcher::Trivial,
        NodeAst::Test(expr) => NodeMatcher::Test(expr.into_test()),
        NodeAst::Capture { alias, inner } => NodeMatcher::capture(alias, lower_node(*inner)?),
        NodeAst::Conjunction(members) => {
            let members = members
                .into_iter()
                .map(lower_node)
                .collect::<Result<Vec<_>, _>>()?;
            NodeMatcher::conjunction(members).change_context(CompileError::InvalidPattern)?
        }
    })
}

fn lower_edge(edge: EdgeAst) -> EdgeMatcher {
    let inner = match edge.inner {
        EdgeInnerAst::Trivial => EdgeMatcher::Trivial,
        EdgeInnerAst::Label(label) => EdgeMatcher::label(label),
        EdgeInnerAst::Capture { alias, label } => EdgeMatcher::capture(
            alias,
            match label {
                Some(label) => EdgeMatcher::label(label),
                None => EdgeMatcher::Trivial,
            },
        ),
    };
    EdgeMatcher::directed(edge.direction, inner)
}

/// Renders the diagnostics of a [`CompileError::Syntax`] as human-readable
/// reports against the offending pattern text.
pub fn render_diagnostics(src: &str, error: &CompileError) -> String {
    let CompileError::Syntax(errors) = error else {
        return error.to_string();
    };
    let mut rendered = Vec::new();
    for diagnostic in &errors.0 {
        let mut buf = Vec::new();
        Report::build(
            ReportKind::Error,
            ("pattern".to_string(), diagnostic.span.clone()),
        )
        .with_config(
            ariadne::Config::new()
                .with_index_type(ariadne::IndexType::Byte)
                .with_color(false),
        )
        .with_message(&diagnostic.message)
        .with_label(
            Label::new(("pattern".to_string(), diagnostic.span.clone()))
                .with_message(&diagnostic.message),
        )
        .finish()
        .write(
            sources([("pattern".to_string(), src.to_string())]),
            &mut buf,
        )
        .ok();
        rendered.push(String::from_utf8_lossy(&buf).into_owned());
    }
    rendered.join("\n")
}
