//! Internal storage entries for [`DataGraph`](super::DataGraph).

#[derive(Debug, Clone)]
pub(in crate::graph) struct NodeEntry<N> {
    pub(in crate::graph) label: N,
    pub(in crate::graph) parent: Option<String>,
    pub(in crate::graph) children: Vec<String>,
}

#[derive(Debug, Clone)]
pub(in crate::graph) struct LinkEntry<E> {
    pub(in crate::graph) start: String,
    pub(in crate::graph) end: String,
    pub(in crate::graph) label: E,
}
