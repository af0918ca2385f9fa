#![forbid(unsafe_code)]

//! Compound data graph used by `narwhal`.
//!
//! A [`DataGraph`] holds everything a data source has delivered for one diagram: an ordered tree
//! of nodes (top-level nodes plus nested container children) and a set of links keyed by their
//! own ids. Links may reference node ids that are not (yet) part of the tree; such links are
//! kept and simply fail to resolve until the node arrives.

mod graph;

pub use graph::alg;
pub use graph::{DataGraph, LinkEndpoints};
