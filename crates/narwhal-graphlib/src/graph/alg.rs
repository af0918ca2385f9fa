//! Tree traversals over a [`DataGraph`](super::DataGraph).

use super::DataGraph;
use rustc_hash::FxHashSet;

/// Pre-order walk of the subtrees rooted at `roots` (each root precedes its descendants).
pub fn preorder<N, E>(g: &DataGraph<N, E>, roots: &[&str]) -> Vec<String> {
    fn dfs<N, E>(
        g: &DataGraph<N, E>,
        v: &str,
        visited: &mut FxHashSet<String>,
        out: &mut Vec<String>,
    ) {
        if !g.has_node(v) || !visited.insert(v.to_string()) {
            return;
        }
        out.push(v.to_string());
        for w in g.children(v) {
            dfs(g, w, visited, out);
        }
    }

    let mut visited: FxHashSet<String> = FxHashSet::default();
    let mut out: Vec<String> = Vec::new();
    for r in roots {
        dfs(g, r, &mut visited, &mut out);
    }
    out
}

/// Post-order walk of the subtrees rooted at `roots` (children before their parent).
pub fn postorder<N, E>(g: &DataGraph<N, E>, roots: &[&str]) -> Vec<String> {
    fn dfs<N, E>(
        g: &DataGraph<N, E>,
        v: &str,
        visited: &mut FxHashSet<String>,
        out: &mut Vec<String>,
    ) {
        if !g.has_node(v) || !visited.insert(v.to_string()) {
            return;
        }
        for w in g.children(v) {
            dfs(g, w, visited, out);
        }
        out.push(v.to_string());
    }

    let mut visited: FxHashSet<String> = FxHashSet::default();
    let mut out: Vec<String> = Vec::new();
    for r in roots {
        dfs(g, r, &mut visited, &mut out);
    }
    out
}

/// Whole forest in pre-order, following the top-level order.
pub fn tree_order<N, E>(g: &DataGraph<N, E>) -> Vec<String> {
    let roots: Vec<&str> = g.roots().iter().map(|s| s.as_str()).collect();
    preorder(g, &roots)
}

/// Deepest node that is a strict ancestor of both `a` and `b`, or `None` when they only meet at
/// the top level.
pub fn common_ancestor<'g, N, E>(g: &'g DataGraph<N, E>, a: &str, b: &str) -> Option<&'g str> {
    let mut chain_a = g.ancestors(a);
    let mut chain_b = g.ancestors(b);
    chain_a.reverse();
    chain_b.reverse();
    chain_a
        .iter()
        .zip(chain_b.iter())
        .take_while(|(x, y)| x == y)
        .last()
        .map(|(x, _)| *x)
}
