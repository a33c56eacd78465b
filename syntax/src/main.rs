//! Compiles a pattern given on the command line and runs it against a
//! small built-in example sentence graph.
//! Run it with a command like:
//! cargo run -p graphex_syntax -- '{arg1}<nsubj<{rel}>dobj>{arg2}'

use graphex::Graph;
use graphex_syntax::{LemmatizedToken, compile, render_diagnostics};
use std::env;
use std::process::ExitCode;

/// "Obama gave a speech", dependency-parsed by hand.
fn example_sentence() -> Graph<LemmatizedToken> {
    let mut graph = Graph::new();
    let gave = graph.add_vertex(LemmatizedToken::new("gave", "give", "VBD", "VP"));
    let obama = graph.add_vertex(LemmatizedToken::new("Obama", "obama", "NNP", "NP"));
    let det = graph.add_vertex(LemmatizedToken::new("a", "a", "DT", "NP"));
    let speech = graph.add_vertex(LemmatizedToken::new("speech", "speech", "NN", "NP"));
    graph.add_edge(gave, obama, "nsubj");
    graph.add_edge(gave, speech, "dobj");
    graph.add_edge(speech, det, "det");
    graph
}

fn main() -> ExitCode {
    let Some(pattern_text) = env::args().nth(1) else {
        eprintln!("usage: graphex_syntax <pattern>");
        return ExitCode::FAILURE;
    };

    let pattern = match compile::<LemmatizedToken>(&pattern_text) {
        Ok(pattern) => pattern,
        Err(report) => {
            eprintln!(
                "{}",
                render_diagnostics(&pattern_text, report.current_context())
            );
            return ExitCode::FAILURE;
        }
    };

    println!("pattern: {pattern}");

    let graph = example_sentence();
    let matches = pattern.search(&graph);
    println!("{} match(es)", matches.len());
    for (index, found) in matches.iter().enumerate() {
        println!("match {index}:");
        let mut nodes: Vec<_> = found.node_captures().iter().collect();
        nodes.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));
        for (alias, capture) in nodes {
            let token = graph
                .vertex(capture.node)
                .map(|token| token.text.as_str())
                .unwrap_or("?");
            println!("  {alias} = {token}");
        }
        let mut edges: Vec<_> = found.edge_captures().iter().collect();
        edges.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));
        for (alias, capture) in edges {
            println!("  {alias} = {}", capture.edge);
        }
    }
    ExitCode::SUCCESS
}
