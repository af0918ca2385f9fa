//! The `DataGraph` container.
//!
//! Nodes form a forest: every node has at most one parent and an ordered child list. The
//! top-level order is tracked separately so index-based inserts behave the same at every level.
//! Links are stored by id with an incidence index keyed by endpoint id, which does not require
//! the endpoint to exist in the tree.

mod entries;

pub mod alg;

use entries::{LinkEntry, NodeEntry};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};

type OrderedMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Borrowed `(start, end)` pair of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEndpoints<'a> {
    pub start: &'a str,
    pub end: &'a str,
}

#[derive(Debug, Clone)]
pub struct DataGraph<N, E> {
    nodes: OrderedMap<String, NodeEntry<N>>,
    roots: Vec<String>,
    links: OrderedMap<String, LinkEntry<E>>,
    incident: FxHashMap<String, Vec<String>>,
}

impl<N, E> Default for DataGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> DataGraph<N, E> {
    pub fn new() -> Self {
        Self {
            nodes: OrderedMap::default(),
            roots: Vec::new(),
            links: OrderedMap::default(),
            incident: FxHashMap::default(),
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
        self.links.clear();
        self.incident.clear();
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&N> {
        self.nodes.get(id).map(|n| &n.label)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node ids in insertion order (not tree order; see [`alg::preorder`] for that).
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|k| k.as_str())
    }

    /// Inserts `id` under `parent` (or at the top level) at `index`, appending when the index is
    /// absent or past the end.
    ///
    /// Returns `false` without inserting when `parent` is not a known node. Re-inserting an
    /// existing id replaces its payload and keeps its place in the tree.
    pub fn insert_node(
        &mut self,
        id: impl Into<String>,
        label: N,
        parent: Option<&str>,
        index: Option<usize>,
    ) -> bool {
        let id = id.into();
        if let Some(entry) = self.nodes.get_mut(&id) {
            entry.label = label;
            return true;
        }
        let siblings = match parent {
            Some(p) => match self.nodes.get_mut(p) {
                Some(entry) => &mut entry.children,
                None => return false,
            },
            None => &mut self.roots,
        };
        let at = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, id.clone());
        self.nodes.insert(
            id,
            NodeEntry {
                label,
                parent: parent.map(str::to_string),
                children: Vec::new(),
            },
        );
        true
    }

    /// Replaces the payload of an existing node, returning the previous one.
    pub fn replace_node(&mut self, id: &str, label: N) -> Option<N> {
        let entry = self.nodes.get_mut(id)?;
        Some(std::mem::replace(&mut entry.label, label))
    }

    /// Removes `id` and its whole subtree. Returns the removed ids, descendants first.
    ///
    /// Links are left in place: an endpoint that disappears from the tree simply stops
    /// resolving.
    pub fn remove_node(&mut self, id: &str) -> Vec<(String, N)> {
        let Some(parent) = self.nodes.get(id).map(|n| n.parent.clone()) else {
            return Vec::new();
        };
        match parent {
            Some(p) => {
                if let Some(entry) = self.nodes.get_mut(&p) {
                    entry.children.retain(|c| c != id);
                }
            }
            None => self.roots.retain(|c| c != id),
        }

        let order = alg::postorder(self, &[id]);
        let mut removed = Vec::with_capacity(order.len());
        for v in order {
            if let Some(entry) = self.nodes.shift_remove(&v) {
                removed.push((v, entry.label));
            }
        }
        removed
    }

    pub fn parent(&self, id: &str) -> Option<&str> {
        self.nodes.get(id)?.parent.as_deref()
    }

    pub fn children(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Position of `id` among its siblings.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        let siblings = match self.parent(id) {
            Some(p) => self.children(p),
            None => self.roots.as_slice(),
        };
        siblings.iter().position(|c| c == id)
    }

    /// Ancestor ids, nearest first. Does not include `id` itself.
    pub fn ancestors(&self, id: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            out.push(p);
            cur = self.parent(p);
        }
        out
    }

    pub fn is_descendant(&self, id: &str, ancestor: &str) -> bool {
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }

    /// Descendant ids in pre-order. Does not include `id` itself.
    pub fn descendants(&self, id: &str) -> Vec<String> {
        let mut out = alg::preorder(self, &[id]);
        if !out.is_empty() {
            out.remove(0);
        }
        out
    }

    pub fn has_link(&self, id: &str) -> bool {
        self.links.contains_key(id)
    }

    pub fn link(&self, id: &str) -> Option<&E> {
        self.links.get(id).map(|l| &l.label)
    }

    pub fn link_endpoints(&self, id: &str) -> Option<LinkEndpoints<'_>> {
        self.links.get(id).map(|l| LinkEndpoints {
            start: l.start.as_str(),
            end: l.end.as_str(),
        })
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(|k| k.as_str())
    }

    /// Inserts or replaces a link. Returns the previous payload when the id was already known.
    pub fn insert_link(
        &mut self,
        id: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        label: E,
    ) -> Option<E> {
        let id = id.into();
        let previous = self.remove_link(&id);
        let start = start.into();
        let end = end.into();
        self.index_incident(&start, &id);
        if end != start {
            self.index_incident(&end, &id);
        }
        self.links.insert(id, LinkEntry { start, end, label });
        previous
    }

    pub fn remove_link(&mut self, id: &str) -> Option<E> {
        let entry = self.links.shift_remove(id)?;
        self.unindex_incident(&entry.start, id);
        self.unindex_incident(&entry.end, id);
        Some(entry.label)
    }

    /// Ids of links that start or end at `node_id`, whether or not that node is in the tree.
    pub fn incident_links(&self, node_id: &str) -> &[String] {
        self.incident
            .get(node_id)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }

    fn index_incident(&mut self, node_id: &str, link_id: &str) {
        let entry = self.incident.entry(node_id.to_string()).or_default();
        if !entry.iter().any(|l| l == link_id) {
            entry.push(link_id.to_string());
        }
    }

    fn unindex_incident(&mut self, node_id: &str, link_id: &str) {
        let Some(entry) = self.incident.get_mut(node_id) else {
            return;
        };
        entry.retain(|l| l != link_id);
        if entry.is_empty() {
            self.incident.remove(node_id);
        }
    }
}
