//! Diagram state: the data tree, the visible records built from it, and the bookkeeping that
//! keeps them consistent across disclosure changes and data events.

use crate::animation::SnapshotScope;
use crate::config::DiagramConfig;
use crate::coords;
use crate::error::{Error, Result};
use crate::events::DataEvent;
use crate::generation::RenderGeneration;
use crate::geom::{Point, Rect, Transform, rect};
use crate::model::{Connectivity, DiagramData, LinkData, LinkId, LinkRecord, NodeData, NodeRecord};
use crate::promote::Promotion;
use indexmap::{IndexMap, IndexSet};
use narwhal_graphlib::DataGraph;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};

/// Every node and link the data source has delivered, visible or not.
pub type DataTree = DataGraph<NodeData, LinkData>;

pub(crate) type NodeMap = IndexMap<String, NodeRecord, FxBuildHasher>;
pub(crate) type LinkMap = IndexMap<LinkId, LinkRecord, FxBuildHasher>;
pub(crate) type IdSet = IndexSet<String, FxBuildHasher>;

/// Queries the engine makes against the host's data.
pub trait DataSource {
    fn child_count(&self, node_id: &str) -> usize;

    /// `Disjoint` subtrees are skipped when searching for hidden link endpoints.
    fn descendants_connectivity(&self, node_id: &str) -> Connectivity;
}

impl DataSource for DataTree {
    fn child_count(&self, node_id: &str) -> usize {
        self.children(node_id).len()
    }

    fn descendants_connectivity(&self, node_id: &str) -> Connectivity {
        self.node(node_id)
            .map(|n| n.descendants_connectivity)
            .unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct DiagramState {
    pub(crate) config: DiagramConfig,
    pub(crate) data: DataTree,
    /// Containers the user wants disclosed, visible or not.
    pub(crate) expanded: FxHashSet<String>,
    /// Visible node records.
    pub(crate) nodes: NodeMap,
    /// Rendered links: direct links keyed by data id, aggregates keyed by endpoint pair.
    pub(crate) links: LinkMap,
    /// Visible containers with children that are not disclosed, in the order they were tracked.
    pub(crate) collapsed: IdSet,
    pub(crate) link_status: FxHashMap<String, Promotion>,
    pub(crate) original_to_aggregate: FxHashMap<String, LinkId>,
    pub(crate) generation: RenderGeneration,
    pub(crate) transform: Transform,
    pub(crate) viewport: Rect,
}

impl Default for DiagramState {
    fn default() -> Self {
        Self::new(DiagramConfig::default())
    }
}

impl DiagramState {
    pub fn new(config: DiagramConfig) -> Self {
        let viewport = rect(
            0.0,
            0.0,
            config.component_size.width,
            config.component_size.height,
        );
        Self {
            config,
            data: DataTree::new(),
            expanded: FxHashSet::default(),
            nodes: NodeMap::default(),
            links: LinkMap::default(),
            collapsed: IdSet::default(),
            link_status: FxHashMap::default(),
            original_to_aggregate: FxHashMap::default(),
            generation: RenderGeneration::new(),
            transform: Transform::identity(),
            viewport,
        }
    }

    pub fn config(&self) -> &DiagramConfig {
        &self.config
    }

    pub fn data(&self) -> &DataTree {
        &self.data
    }

    pub fn generation(&self) -> &RenderGeneration {
        &self.generation
    }

    /// Replaces all content and rebuilds records, promotions included, from scratch.
    pub fn load(&mut self, content: DiagramData) -> SnapshotScope {
        self.data.clear();
        for tree in content.nodes {
            self.insert_tree(tree, None, None);
        }
        for link in content.links {
            self.data
                .insert_link(link.id.clone(), link.start_id.clone(), link.end_id.clone(), link);
        }
        self.expanded = content.expanded.into_iter().collect();
        self.rebuild();
        self.generation.bump();
        SnapshotScope::Full
    }

    /// Drops every record and materializes the visible tree again.
    pub fn rebuild(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.collapsed.clear();
        self.link_status.clear();
        self.original_to_aggregate.clear();
        let roots = self.data.roots().to_vec();
        for root in &roots {
            self.materialize(root, None);
        }
        let all: Vec<String> = self.data.links().map(str::to_string).collect();
        self.reconcile_links(all);
    }

    pub fn node(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn is_disclosed(&self, id: &str) -> bool {
        self.nodes.get(id).is_some_and(NodeRecord::disclosed)
    }

    /// Visible top-level node ids in data order.
    pub fn root_ids(&self) -> Vec<String> {
        self.data
            .roots()
            .iter()
            .filter(|r| self.nodes.contains_key(r.as_str()))
            .cloned()
            .collect()
    }

    pub fn link(&self, id: &LinkId) -> Option<&LinkRecord> {
        self.links.get(id)
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkRecord> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Visible containers currently collapsed, in tracking order.
    pub fn collapsed_containers(&self) -> impl Iterator<Item = &str> {
        self.collapsed.iter().map(String::as_str)
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// Offset of `id`'s coordinate space from the global origin.
    pub fn global_offset(&self, id: &str) -> Point {
        coords::global_offset(&mut ReadOnlySpace(&self.nodes), id)
    }

    pub fn relative_position(&self, id: &str, ancestor_id: Option<&str>) -> Option<Point> {
        coords::relative_position(&mut ReadOnlySpace(&self.nodes), id, ancestor_id)
    }

    pub fn local_to_global(&self, local: Point, id: &str) -> Point {
        coords::local_to_global(&mut ReadOnlySpace(&self.nodes), local, id)
    }

    /// Global origin of the space a container's children and links are expressed in.
    pub fn space_origin(&self, container_id: Option<&str>) -> Point {
        coords::space_origin(&mut ReadOnlySpace(&self.nodes), container_id)
    }

    /// Node bounds in global coordinates, once measured.
    pub fn global_bounds(&self, id: &str) -> Option<Rect> {
        let rec = self.nodes.get(id)?;
        let bounds = rec.bounds?;
        let origin = self.local_to_global(rec.position, id);
        Some(bounds.translate(origin.to_vector()))
    }

    pub fn expand(&mut self, id: &str) -> Result<SnapshotScope> {
        self.check_container(id)?;
        let scope = self.scope_for_disclosure(id);
        self.disclose(id);
        self.reconcile_links(self.subtree_links(id));
        self.generation.bump();
        Ok(scope)
    }

    pub fn collapse(&mut self, id: &str) -> Result<SnapshotScope> {
        self.check_container(id)?;
        let scope = self.scope_for_disclosure(id);
        self.conceal(id);
        self.reconcile_links(self.subtree_links(id));
        self.generation.bump();
        Ok(scope)
    }

    /// Makes `ids` the exact set of disclosed containers.
    pub fn set_expanded<I, S>(&mut self, ids: I) -> Result<SnapshotScope>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let wanted: FxHashSet<String> = ids.into_iter().map(Into::into).collect();
        for id in &wanted {
            self.check_container(id)?;
        }
        let (closing, opening) = self.expansion_changes(&wanted);
        let scope = self.scope_for_changes(&closing, &opening);
        for id in &closing {
            self.conceal(id);
        }
        // Preorder: an outer container is disclosed before the ones nested in it.
        for id in &opening {
            self.disclose(id);
        }
        let affected: Vec<String> = closing
            .iter()
            .chain(&opening)
            .flat_map(|id| self.subtree_links(id))
            .collect();
        self.reconcile_links(affected);
        self.generation.bump();
        Ok(scope)
    }

    pub fn apply_event(&mut self, event: DataEvent) -> Result<SnapshotScope> {
        if let Some(parent) = event.parent_id() {
            if !self.data.has_node(parent) {
                return Err(Error::InvalidEvent {
                    message: format!("unknown parent node `{parent}`"),
                });
            }
        }
        let scope = self.scope_for_event(&event);
        match event {
            DataEvent::Add {
                parent_id,
                nodes,
                links,
                index,
            } => self.add_content(parent_id.as_deref(), nodes, links, index),
            DataEvent::Remove { nodes, links, .. } => self.remove_content(&nodes, &links),
            DataEvent::Change { nodes, links } => self.change_content(nodes, links),
        }
        self.generation.bump();
        Ok(scope)
    }

    /// What a disclosure change of `id` touches: the container, its ancestors up to the root,
    /// its descendants and every link below it.
    pub fn scope_for_disclosure(&self, id: &str) -> SnapshotScope {
        let mut nodes = vec![id.to_string()];
        nodes.extend(self.data.descendants(id));
        self.event_scope(self.data.parent(id), nodes, self.subtree_links(id))
    }

    /// Scope of a [`DiagramState::set_expanded`] call, computed without applying it.
    pub fn scope_for_expanded(&self, ids: &[String]) -> SnapshotScope {
        let wanted: FxHashSet<String> = ids.iter().cloned().collect();
        let (closing, opening) = self.expansion_changes(&wanted);
        self.scope_for_changes(&closing, &opening)
    }

    /// Scope of a data event, computed against the current data so the same scope serves the
    /// snapshots before and after the event.
    pub fn scope_for_event(&self, event: &DataEvent) -> SnapshotScope {
        let mut scope = self.event_entities(event);
        self.add_event_aggregates(event, &mut scope);
        scope
    }

    fn event_entities(&self, event: &DataEvent) -> SnapshotScope {
        match event {
            DataEvent::Add {
                parent_id,
                nodes,
                links,
                ..
            } => {
                let mut ids = Vec::new();
                collect_tree_ids(nodes, &mut ids);
                let mut link_ids: Vec<String> = links.iter().map(|l| l.id.clone()).collect();
                for id in &ids {
                    link_ids.extend(self.data.incident_links(id).iter().cloned());
                }
                self.event_scope(parent_id.as_deref(), ids, link_ids)
            }
            DataEvent::Remove {
                parent_id,
                nodes,
                links,
            } => {
                let mut scope = self.event_scope(parent_id.as_deref(), Vec::new(), links.clone());
                for id in nodes.iter().filter(|id| self.data.has_node(id)) {
                    let mut ids = vec![id.clone()];
                    ids.extend(self.data.descendants(id));
                    let link_ids = ids
                        .iter()
                        .flat_map(|n| self.data.incident_links(n).iter().cloned())
                        .collect();
                    scope.merge(self.event_scope(self.data.parent(id), ids, link_ids));
                }
                scope
            }
            DataEvent::Change { nodes, links } => {
                let mut scope =
                    self.event_scope(None, Vec::new(), links.iter().map(|l| l.id.clone()).collect());
                for node in nodes.iter().filter(|n| self.data.has_node(&n.id)) {
                    let link_ids = if self.collapsed.contains(&node.id) {
                        self.subtree_links(&node.id)
                    } else {
                        Vec::new()
                    };
                    scope.merge(self.event_scope(
                        self.data.parent(&node.id),
                        vec![node.id.clone()],
                        link_ids,
                    ));
                }
                scope
            }
        }
    }

    /// Names the aggregates an event's links are drawn through before and after it, so both
    /// snapshots capture an aggregate that only gains or loses members.
    fn add_event_aggregates(&self, event: &DataEvent, scope: &mut SnapshotScope) {
        let incoming: FxHashMap<&str, &LinkData> = match event {
            DataEvent::Add { links, .. } | DataEvent::Change { links, .. } => {
                links.iter().map(|l| (l.id.as_str(), l)).collect()
            }
            DataEvent::Remove { .. } => FxHashMap::default(),
        };
        let mut aggregates = Vec::new();
        for id in scope.link_ids() {
            if let Some(before) = self.original_to_aggregate.get(id) {
                aggregates.push(before.clone());
            }
            if matches!(event, DataEvent::Remove { .. }) {
                continue;
            }
            let Some(link) = incoming.get(id).copied().or_else(|| self.data.link(id)) else {
                continue;
            };
            let start = self.predicted_anchor(&link.start_id, event);
            let end = self.predicted_anchor(&link.end_id, event);
            let (Some(start), Some(end)) = (start, end) else {
                continue;
            };
            if start != end && (start != link.start_id || end != link.end_id) {
                aggregates.push(LinkId::promoted(start, end));
            }
        }
        for id in aggregates {
            scope.add_aggregate(id);
        }
    }

    /// Visible node a link endpoint will be drawn at once `event` is applied. Add and change
    /// events never hide visible nodes, so only nodes the event brings in need a walk.
    fn predicted_anchor(&self, id: &str, event: &DataEvent) -> Option<String> {
        if self.nodes.contains_key(id) {
            return Some(id.to_string());
        }
        if self.data.has_node(id) {
            return self.collapsed_ancestor(id);
        }
        let DataEvent::Add {
            parent_id, nodes, ..
        } = event
        else {
            return None;
        };
        let path = tree_path(nodes, id)?;
        match parent_id.as_deref() {
            None => {}
            Some(p) if self.nodes.contains_key(p) => {
                if !self.is_disclosed(p) && !self.expanded.contains(p) {
                    return Some(p.to_string());
                }
            }
            Some(p) => return self.collapsed_ancestor(p),
        }
        // The top of the added tree is visible; stop at the first node that stays closed.
        path.into_iter()
            .find(|n| n.id == id || n.children.is_empty() || !self.expanded.contains(&n.id))
            .map(|n| n.id.clone())
    }

    fn collapsed_ancestor(&self, id: &str) -> Option<String> {
        self.data
            .ancestors(id)
            .into_iter()
            .find(|a| self.collapsed.contains(*a))
            .map(str::to_string)
    }

    fn add_content(
        &mut self,
        parent: Option<&str>,
        nodes: Vec<NodeData>,
        links: Vec<LinkData>,
        index: Option<usize>,
    ) {
        let mut top = Vec::new();
        for (i, tree) in nodes.into_iter().enumerate() {
            top.push(tree.id.clone());
            self.insert_tree(tree, parent, index.map(|at| at + i));
        }
        let mut affected: Vec<String> = links.iter().map(|l| l.id.clone()).collect();
        for link in links {
            self.data
                .insert_link(link.id.clone(), link.start_id.clone(), link.end_id.clone(), link);
        }

        match parent {
            None => {
                for id in &top {
                    self.show(id, None);
                }
            }
            Some(p) if self.is_disclosed(p) => {
                let children = self.data.children(p).to_vec();
                if let Some(container) = self.nodes.get_mut(p).and_then(|r| r.container.as_mut()) {
                    container.child_node_ids = children;
                }
                for id in &top {
                    self.show(id, Some(p));
                }
            }
            Some(p) if self.nodes.contains_key(p) => {
                if self.expanded.contains(p) {
                    self.disclose(p);
                } else {
                    self.collapsed.insert(p.to_string());
                }
            }
            Some(_) => {}
        }

        for id in &top {
            affected.extend(self.subtree_links(id));
        }
        self.reconcile_links(affected);
    }

    fn remove_content(&mut self, nodes: &[String], links: &[String]) {
        let mut affected: Vec<String> = links.to_vec();
        for id in nodes.iter().filter(|id| self.data.has_node(id)) {
            affected.extend(self.subtree_links(id));
        }
        for id in nodes {
            let owner = self.data.parent(id).map(str::to_string);
            self.hide(id);
            for (gone, _) in self.data.remove_node(id) {
                self.expanded.remove(&gone);
            }
            let Some(owner) = owner else {
                continue;
            };
            let children = self.data.children(&owner).to_vec();
            if children.is_empty() {
                self.collapsed.shift_remove(&owner);
            }
            if let Some(container) = self.nodes.get_mut(&owner).and_then(|r| r.container.as_mut()) {
                container.child_node_ids = children;
            }
        }
        for id in links {
            self.data.remove_link(id);
        }
        self.reconcile_links(affected);
    }

    fn change_content(&mut self, nodes: Vec<NodeData>, links: Vec<LinkData>) {
        let mut affected = Vec::new();
        for node in nodes {
            let (payload, _) = node.into_parts();
            let id = payload.id.clone();
            if !self.data.has_node(&id) {
                continue;
            }
            if let Some(rec) = self.nodes.get_mut(&id) {
                rec.refresh_from_data(&payload);
            }
            self.data.replace_node(&id, payload);
            // The connectivity hint may have changed what is searchable below it.
            if self.collapsed.contains(&id) {
                affected.extend(self.subtree_links(&id));
            }
        }
        for link in links {
            if !self.data.has_link(&link.id) {
                continue;
            }
            affected.push(link.id.clone());
            self.data
                .insert_link(link.id.clone(), link.start_id.clone(), link.end_id.clone(), link);
        }
        self.reconcile_links(affected);
    }

    /// Containers to close and to open, each in tree preorder, to reach `wanted`.
    fn expansion_changes(&self, wanted: &FxHashSet<String>) -> (Vec<String>, Vec<String>) {
        let order = narwhal_graphlib::alg::tree_order(&self.data);
        let closing = order
            .iter()
            .filter(|id| self.expanded.contains(*id) && !wanted.contains(*id))
            .cloned()
            .collect();
        let opening = order
            .iter()
            .filter(|id| wanted.contains(*id) && !self.expanded.contains(*id))
            .cloned()
            .collect();
        (closing, opening)
    }

    fn scope_for_changes(&self, closing: &[String], opening: &[String]) -> SnapshotScope {
        let mut scope = SnapshotScope::empty();
        for id in closing.iter().chain(opening) {
            scope.merge(self.scope_for_disclosure(id));
        }
        scope
    }

    fn check_container(&self, id: &str) -> Result<()> {
        if !self.data.has_node(id) {
            return Err(Error::UnknownNode { id: id.to_string() });
        }
        if self.data.child_count(id) == 0 {
            return Err(Error::NotAContainer { id: id.to_string() });
        }
        Ok(())
    }

    fn insert_tree(&mut self, tree: NodeData, parent: Option<&str>, index: Option<usize>) {
        let (payload, children) = tree.into_parts();
        let id = payload.id.clone();
        if !self.data.insert_node(id.clone(), payload, parent, index) {
            return;
        }
        for child in children {
            self.insert_tree(child, Some(&id), None);
        }
    }

    /// Creates the record for a node that just became visible, or refreshes an existing one.
    fn show(&mut self, id: &str, group: Option<&str>) {
        match (self.nodes.get_mut(id), self.data.node(id)) {
            (Some(rec), Some(data)) => rec.refresh_from_data(data),
            (None, Some(_)) => self.materialize(id, group),
            _ => {}
        }
    }

    fn materialize(&mut self, id: &str, group: Option<&str>) {
        let Some(data) = self.data.node(id) else {
            return;
        };
        let mut rec = NodeRecord::from_data(data, group.map(str::to_string));
        let children = self.data.children(id).to_vec();
        let disclosed = !children.is_empty() && self.expanded.contains(id);
        if disclosed {
            rec.disclose(self.config.container_padding, children.clone());
        } else if !children.is_empty() {
            self.collapsed.insert(id.to_string());
        }
        self.nodes.insert(id.to_string(), rec);
        if disclosed {
            for child in &children {
                self.materialize(child, Some(id));
            }
        }
    }

    /// Removes the records of `id` and its visible descendants.
    fn hide(&mut self, id: &str) {
        let Some(rec) = self.nodes.shift_remove(id) else {
            return;
        };
        self.collapsed.shift_remove(id);
        for child in rec.child_node_ids() {
            self.hide(child);
        }
    }

    fn disclose(&mut self, id: &str) {
        self.expanded.insert(id.to_string());
        if !self.nodes.contains_key(id) || self.is_disclosed(id) {
            return;
        }
        self.collapsed.shift_remove(id);
        let children = self.data.children(id).to_vec();
        if let Some(rec) = self.nodes.get_mut(id) {
            rec.disclose(self.config.container_padding, children.clone());
            rec.bounds = None;
            rec.content_bounds = None;
            rec.rendered = false;
        }
        for child in &children {
            self.materialize(child, Some(id));
        }
    }

    fn conceal(&mut self, id: &str) {
        self.expanded.remove(id);
        let Some(children) = self
            .nodes
            .get(id)
            .filter(|r| r.disclosed())
            .map(|r| r.child_node_ids().to_vec())
        else {
            return;
        };
        for child in &children {
            self.hide(child);
        }
        if let Some(rec) = self.nodes.get_mut(id) {
            rec.collapse();
        }
        self.collapsed.insert(id.to_string());
    }

    /// Data links touching `id` or anything below it.
    fn subtree_links(&self, id: &str) -> Vec<String> {
        let mut out = self.data.incident_links(id).to_vec();
        for d in self.data.descendants(id) {
            out.extend(self.data.incident_links(&d).iter().cloned());
        }
        out
    }

    fn event_scope(&self, parent: Option<&str>, nodes: Vec<String>, links: Vec<String>) -> SnapshotScope {
        let mut scope = SnapshotScope::empty();
        if let Some(p) = parent {
            scope.add_node(p);
            for a in self.data.ancestors(p) {
                scope.add_node(a);
            }
        }
        for n in nodes {
            scope.add_node(n);
        }
        for l in links {
            scope.add_link(l);
        }
        scope
    }
}

fn collect_tree_ids(nodes: &[NodeData], out: &mut Vec<String>) {
    for n in nodes {
        out.push(n.id.clone());
        collect_tree_ids(&n.children, out);
    }
}

/// Nodes from a root of `nodes` down to `id`, or `None` when `id` is not in those trees.
fn tree_path<'a>(nodes: &'a [NodeData], id: &str) -> Option<Vec<&'a NodeData>> {
    for n in nodes {
        if n.id == id {
            return Some(vec![n]);
        }
        if let Some(mut rest) = tree_path(&n.children, id) {
            rest.insert(0, n);
            return Some(rest);
        }
    }
    None
}

struct ReadOnlySpace<'a>(&'a NodeMap);

impl coords::CoordinateSpace for ReadOnlySpace<'_> {
    fn frame(&self, id: &str) -> Option<coords::NodeFrame<'_>> {
        self.0.frame(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinkData;

    fn content() -> DiagramData {
        DiagramData {
            nodes: vec![
                NodeData::new("A").with_children(vec![
                    NodeData::new("B"),
                    NodeData::new("B2").with_children(vec![NodeData::new("X")]),
                ]),
                NodeData::new("C"),
            ],
            links: vec![LinkData::new("L1", "B", "C")],
            expanded: vec!["A".into()],
        }
    }

    #[test]
    fn load_materializes_disclosed_containers() {
        let mut state = DiagramState::default();
        let before = state.generation().current();
        assert!(state.load(content()).is_full());
        assert!(state.generation().current() > before);

        let ids: Vec<&str> = state.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "B2", "C"]);
        assert_eq!(state.node("A").unwrap().child_node_ids(), &["B", "B2"]);
        assert_eq!(state.node("B").unwrap().group_id.as_deref(), Some("A"));
        assert_eq!(state.collapsed_containers().collect::<Vec<_>>(), vec!["B2"]);
        assert_eq!(state.root_ids(), vec!["A", "C"]);
    }

    #[test]
    fn collapse_hides_descendants_and_tracks_container() {
        let mut state = DiagramState::default();
        state.load(content());
        let scope = state.collapse("A").unwrap();
        assert!(scope.contains_node("A"));
        assert!(scope.contains_node("X"));
        assert!(scope.contains_link("L1"));

        assert!(!state.is_visible("B"));
        assert!(!state.is_disclosed("A"));
        assert_eq!(state.node("A").unwrap().container_padding(), None);
        assert_eq!(state.collapsed_containers().collect::<Vec<_>>(), vec!["A"]);

        state.expand("A").unwrap();
        assert!(state.is_visible("B"));
        assert_eq!(state.collapsed_containers().collect::<Vec<_>>(), vec!["B2"]);
    }

    #[test]
    fn disclosure_errors() {
        let mut state = DiagramState::default();
        state.load(content());
        assert!(matches!(state.expand("nope"), Err(Error::UnknownNode { .. })));
        assert!(matches!(state.collapse("C"), Err(Error::NotAContainer { .. })));
    }

    #[test]
    fn set_expanded_applies_the_difference() {
        let mut state = DiagramState::default();
        state.load(content());
        let scope = state.set_expanded(["A", "B2"]).unwrap();
        assert!(scope.contains_node("B2"));
        assert!(state.is_visible("X"));

        state.set_expanded(Vec::<String>::new()).unwrap();
        assert_eq!(state.node_count(), 2);
        assert_eq!(state.collapsed_containers().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn add_under_a_leaf_turns_it_into_a_collapsed_container() {
        let mut state = DiagramState::default();
        state.load(content());
        state
            .apply_event(DataEvent::Add {
                parent_id: Some("C".into()),
                nodes: vec![NodeData::new("C1")],
                links: Vec::new(),
                index: None,
            })
            .unwrap();
        assert!(!state.is_visible("C1"));
        assert!(state.collapsed_containers().any(|c| c == "C"));
    }

    #[test]
    fn add_into_a_disclosed_container_respects_the_index() {
        let mut state = DiagramState::default();
        state.load(content());
        let scope = state
            .apply_event(DataEvent::Add {
                parent_id: Some("A".into()),
                nodes: vec![NodeData::new("B0")],
                links: Vec::new(),
                index: Some(0),
            })
            .unwrap();
        assert!(scope.contains_node("A"));
        assert!(scope.contains_node("B0"));
        assert_eq!(state.node("A").unwrap().child_node_ids(), &["B0", "B", "B2"]);
        assert_eq!(state.node("B0").unwrap().group_id.as_deref(), Some("A"));
    }

    #[test]
    fn remove_drops_records_and_updates_the_parent() {
        let mut state = DiagramState::default();
        state.load(content());
        state
            .apply_event(DataEvent::Remove {
                parent_id: Some("A".into()),
                nodes: vec!["B2".into()],
                links: Vec::new(),
            })
            .unwrap();
        assert!(!state.is_visible("B2"));
        assert!(!state.data().has_node("X"));
        assert_eq!(state.node("A").unwrap().child_node_ids(), &["B"]);
        assert_eq!(state.collapsed_containers().count(), 0);
    }

    #[test]
    fn events_with_unknown_parents_are_rejected() {
        let mut state = DiagramState::default();
        state.load(content());
        let generation = state.generation().current();
        let err = state
            .apply_event(DataEvent::Add {
                parent_id: Some("ghost".into()),
                nodes: vec![NodeData::new("Z")],
                links: Vec::new(),
                index: None,
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEvent { .. }));
        assert!(!state.data().has_node("Z"));
        assert_eq!(state.generation().current(), generation);
    }

    #[test]
    fn change_refreshes_payload_and_forces_remeasure() {
        let mut state = DiagramState::default();
        state.load(content());
        state.nodes.get_mut("C").unwrap().bounds = Some(rect(0.0, 0.0, 5.0, 5.0));
        let mut changed = NodeData::new("C");
        changed.label = Some("renamed".into());
        state
            .apply_event(DataEvent::Change {
                nodes: vec![changed],
                links: Vec::new(),
            })
            .unwrap();
        let rec = state.node("C").unwrap();
        assert_eq!(rec.label.as_deref(), Some("renamed"));
        assert_eq!(rec.bounds, None);
    }

    #[test]
    fn event_scopes_name_the_aggregates_on_both_sides() {
        let mut state = DiagramState::default();
        let mut data = content();
        data.links.push(LinkData::new("L2", "X", "C"));
        state.load(data);
        let aggregate = LinkId::promoted("B2", "C");

        let removal = DataEvent::Remove {
            parent_id: None,
            nodes: Vec::new(),
            links: vec!["L1".into(), "L2".into()],
        };
        let scope = state.scope_for_event(&removal);
        assert!(scope.contains_aggregate(&aggregate));
        assert!(!scope.contains_aggregate(&LinkId::promoted("B", "C")));

        // A child added under the collapsed B2, and a new closed tree at the top level.
        let added = DataEvent::Add {
            parent_id: Some("B2".into()),
            nodes: vec![NodeData::new("Y")],
            links: vec![LinkData::new("L3", "Y", "C")],
            index: None,
        };
        assert!(state.scope_for_event(&added).contains_aggregate(&aggregate));
        let added = DataEvent::Add {
            parent_id: None,
            nodes: vec![NodeData::new("N").with_children(vec![NodeData::new("M")])],
            links: vec![LinkData::new("L4", "M", "C")],
            index: None,
        };
        let scope = state.scope_for_event(&added);
        assert!(scope.contains_aggregate(&LinkId::promoted("N", "C")));
        state.apply_event(added).unwrap();
        assert_eq!(state.aggregate_of("L4"), Some(&LinkId::promoted("N", "C")));
    }
}
