//! The facade handed to layout functions.
//!
//! A [`LayoutContext`] owns per-pass copies of the geometry a layout may read or write. Writes
//! go through setters that flag the context entry as dirty; after the layout resolves, only
//! dirty entries are applied back to the diagram's records.

use super::LayoutConfig;
use crate::coords::{self, CoordinateSpace, NodeFrame};
use crate::geom::{Point, Rect, Size, Vector};
use crate::model::{LinkId, LinkPath, LinkRecord, NodeRecord, Padding};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};

type OrderedMap<K, V> = IndexMap<K, V, FxBuildHasher>;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeContext {
    id: String,
    container_id: Option<String>,
    position: Point,
    content_offset: Vector,
    bounds: Rect,
    content_bounds: Rect,
    label_bounds: Option<Rect>,
    label_position: Option<Point>,
    label_rotation: f64,
    padding: Option<Padding>,
    child_ids: Vec<String>,
    read_only: bool,
    dirty: bool,
}

impl NodeContext {
    pub fn new(id: impl Into<String>, bounds: Rect) -> Self {
        Self {
            id: id.into(),
            container_id: None,
            position: Point::origin(),
            content_offset: Vector::zero(),
            bounds,
            content_bounds: bounds,
            label_bounds: None,
            label_position: None,
            label_rotation: 0.0,
            padding: None,
            child_ids: Vec::new(),
            read_only: false,
            dirty: false,
        }
    }

    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn with_disclosure(mut self, padding: Padding, child_ids: Vec<String>) -> Self {
        self.padding = Some(padding);
        self.child_ids = child_ids;
        self
    }

    pub fn with_label_bounds(mut self, label_bounds: Rect) -> Self {
        self.label_bounds = Some(label_bounds);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id of the containing node, `None` at the top level.
    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn content_bounds(&self) -> Rect {
        self.content_bounds
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
        self.dirty = true;
    }

    pub fn label_bounds(&self) -> Option<Rect> {
        self.label_bounds
    }

    pub fn label_position(&self) -> Option<Point> {
        self.label_position
    }

    pub fn set_label_position(&mut self, position: Point) {
        self.label_position = Some(position);
        self.dirty = true;
    }

    pub fn label_rotation(&self) -> f64 {
        self.label_rotation
    }

    pub fn set_label_rotation(&mut self, radians: f64) {
        self.label_rotation = radians;
        self.dirty = true;
    }

    pub fn is_disclosed(&self) -> bool {
        self.padding.is_some()
    }

    pub fn container_padding(&self) -> Option<Padding> {
        self.padding
    }

    pub fn child_node_ids(&self) -> &[String] {
        &self.child_ids
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn frame(&self) -> NodeFrame<'_> {
        NodeFrame {
            group_id: self.container_id.as_deref(),
            position: self.position,
            content_offset: self.content_offset,
            padding: self.padding,
        }
    }
}

impl From<&NodeRecord> for NodeContext {
    fn from(rec: &NodeRecord) -> Self {
        let bounds = rec.bounds.unwrap_or_else(Rect::zero);
        Self {
            id: rec.id.clone(),
            container_id: rec.group_id.clone(),
            position: rec.position,
            content_offset: rec.content_offset,
            bounds,
            content_bounds: rec.content_bounds.unwrap_or(bounds),
            label_bounds: rec.label_bounds,
            label_position: rec.label_position,
            label_rotation: rec.label_rotation,
            padding: rec.container_padding(),
            child_ids: rec.child_node_ids().to_vec(),
            read_only: rec.read_only,
            dirty: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkContext {
    id: LinkId,
    start_id: String,
    end_id: String,
    points: LinkPath,
    coordinate_space_id: Option<String>,
    label_bounds: Option<Rect>,
    label_position: Option<Point>,
    label_rotation: f64,
    link_width: f64,
    constituent_ids: Vec<String>,
    dirty: bool,
}

impl LinkContext {
    pub fn new(id: LinkId, start_id: impl Into<String>, end_id: impl Into<String>) -> Self {
        let constituent_ids = match &id {
            LinkId::Data(own) => vec![own.clone()],
            LinkId::Promoted { .. } => Vec::new(),
        };
        Self {
            id,
            start_id: start_id.into(),
            end_id: end_id.into(),
            points: LinkPath::default(),
            coordinate_space_id: None,
            label_bounds: None,
            label_position: None,
            label_rotation: 0.0,
            link_width: 1.0,
            constituent_ids,
            dirty: false,
        }
    }

    pub fn id(&self) -> &LinkId {
        &self.id
    }

    pub fn start_id(&self) -> &str {
        &self.start_id
    }

    pub fn end_id(&self) -> &str {
        &self.end_id
    }

    pub fn points(&self) -> &LinkPath {
        &self.points
    }

    pub fn set_points(&mut self, points: LinkPath) {
        self.points = points;
        self.dirty = true;
    }

    /// Container whose coordinate space `points` are expressed in; `None` is global.
    pub fn coordinate_space(&self) -> Option<&str> {
        self.coordinate_space_id.as_deref()
    }

    pub fn set_coordinate_space(&mut self, container_id: Option<String>) {
        self.coordinate_space_id = container_id;
        self.dirty = true;
    }

    pub fn label_bounds(&self) -> Option<Rect> {
        self.label_bounds
    }

    pub fn label_position(&self) -> Option<Point> {
        self.label_position
    }

    pub fn set_label_position(&mut self, position: Point) {
        self.label_position = Some(position);
        self.dirty = true;
    }

    pub fn label_rotation(&self) -> f64 {
        self.label_rotation
    }

    pub fn set_label_rotation(&mut self, radians: f64) {
        self.label_rotation = radians;
        self.dirty = true;
    }

    pub fn link_width(&self) -> f64 {
        self.link_width
    }

    pub fn is_promoted(&self) -> bool {
        self.id.is_promoted()
    }

    /// Ids of the data links this context renders.
    pub fn constituent_ids(&self) -> &[String] {
        &self.constituent_ids
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl From<&LinkRecord> for LinkContext {
    fn from(rec: &LinkRecord) -> Self {
        Self {
            id: rec.id.clone(),
            start_id: rec.start_id.clone(),
            end_id: rec.end_id.clone(),
            points: rec.points.clone(),
            coordinate_space_id: rec.coordinate_space_id.clone(),
            label_bounds: rec.label_bounds,
            label_position: rec.label_position,
            label_rotation: rec.label_rotation,
            link_width: rec.style.width.unwrap_or(1.0),
            constituent_ids: rec.constituent_ids().map(str::to_string).collect(),
            dirty: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutContext {
    config: LayoutConfig,
    /// Nodes the layout positions, in order. Index access and counts refer to this map.
    nodes: OrderedMap<String, NodeContext>,
    /// Nodes registered for id lookup only: read-only nodes and nested descendants.
    lookup_only: OrderedMap<String, NodeContext>,
    links: OrderedMap<LinkId, LinkContext>,
    dirty_nodes: FxHashSet<String>,
    dirty_links: FxHashSet<LinkId>,
}

impl LayoutContext {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            nodes: OrderedMap::default(),
            lookup_only: OrderedMap::default(),
            links: OrderedMap::default(),
            dirty_nodes: FxHashSet::default(),
            dirty_links: FxHashSet::default(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn layout_name(&self) -> &str {
        &self.config.layout_name
    }

    pub fn container_id(&self) -> Option<&str> {
        self.config.container_id.as_deref()
    }

    pub fn component_size(&self) -> Size {
        self.config.component_size
    }

    pub fn current_viewport(&self) -> Rect {
        self.config.current_viewport
    }

    pub fn is_locale_rtl(&self) -> bool {
        self.config.locale_is_right_to_left
    }

    /// Adds a positionable node. Re-adding an id replaces its context in place.
    pub fn add_node(&mut self, node: NodeContext) {
        self.lookup_only.shift_remove(node.id());
        self.nodes.insert(node.id.clone(), node);
    }

    /// Registers a node for lookup by id without making it positionable or counting it.
    pub fn add_node_to_map(&mut self, node: NodeContext) {
        if self.nodes.contains_key(node.id()) {
            return;
        }
        self.lookup_only.insert(node.id.clone(), node);
    }

    /// Adds a link. Re-adding an id replaces its context in place.
    pub fn add_link(&mut self, link: LinkContext) {
        self.links.insert(link.id.clone(), link);
    }

    /// Removes a node. With a `parent`, the node is also detached from that parent's child list.
    ///
    /// Id lookup and the positionable set share one ordered map, so a node that can no longer be
    /// looked up is no longer positionable either. Nested children are registered for lookup
    /// only, which leaves the count unchanged when they are removed through their parent; a
    /// positionable node removed through a parent (a sub-layout's child) does lower it.
    pub fn remove_node(&mut self, parent: Option<&str>, node_id: &str) -> Option<NodeContext> {
        if let Some(parent) = parent {
            if let Some(p) = self.node_by_id_mut(parent) {
                p.child_ids.retain(|c| c != node_id);
            }
        }
        self.dirty_nodes.remove(node_id);
        let removed = self.nodes.shift_remove(node_id);
        let looked_up = self.lookup_only.shift_remove(node_id);
        removed.or(looked_up)
    }

    pub fn node_by_id(&self, id: &str) -> Option<&NodeContext> {
        self.nodes.get(id).or_else(|| self.lookup_only.get(id))
    }

    pub fn node_by_id_mut(&mut self, id: &str) -> Option<&mut NodeContext> {
        match self.nodes.get_mut(id) {
            Some(n) => Some(n),
            None => self.lookup_only.get_mut(id),
        }
    }

    pub fn node_by_index(&self, index: usize) -> Option<&NodeContext> {
        self.nodes.get_index(index).map(|(_, n)| n)
    }

    pub fn node_by_index_mut(&mut self, index: usize) -> Option<&mut NodeContext> {
        self.nodes.get_index_mut(index).map(|(_, n)| n)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_by_id(&self, id: &LinkId) -> Option<&LinkContext> {
        self.links.get(id)
    }

    pub fn link_by_id_mut(&mut self, id: &LinkId) -> Option<&mut LinkContext> {
        self.links.get_mut(id)
    }

    pub fn link_by_index(&self, index: usize) -> Option<&LinkContext> {
        self.links.get_index(index).map(|(_, l)| l)
    }

    pub fn link_by_index_mut(&mut self, index: usize) -> Option<&mut LinkContext> {
        self.links.get_index_mut(index).map(|(_, l)| l)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn local_to_global(&self, local: Point, node_id: &str) -> Point {
        coords::local_to_global(&mut ContextSpace(self), local, node_id)
    }

    pub fn relative_position(&self, node_id: &str, ancestor_id: Option<&str>) -> Option<Point> {
        coords::relative_position(&mut ContextSpace(self), node_id, ancestor_id)
    }

    /// Global origin of the space `container_id`'s children are positioned in.
    pub fn space_origin(&self, container_id: Option<&str>) -> Point {
        coords::space_origin(&mut ContextSpace(self), container_id)
    }

    /// A node's bounds translated to global coordinates.
    pub fn global_bounds(&self, node_id: &str) -> Option<Rect> {
        let node = self.node_by_id(node_id)?;
        let origin = self.local_to_global(node.position, node_id);
        Some(node.bounds.translate(origin.to_vector()))
    }

    /// Deepest container shared by the ancestor chains of `a` and `b`; `None` when they only
    /// meet at the top level.
    pub fn common_container(&self, a: &str, b: &str) -> Option<String> {
        let chain_a = self.ancestor_chain(a);
        let chain_b = self.ancestor_chain(b);
        chain_a
            .iter()
            .zip(chain_b.iter())
            .take_while(|(x, y)| x == y)
            .last()
            .map(|(x, _)| x.clone())
    }

    /// Root-to-leaf ancestors of `id`, excluding `id`.
    fn ancestor_chain(&self, id: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut cur = self.node_by_id(id).and_then(|n| n.container_id.clone());
        while let Some(p) = cur {
            if chain.contains(&p) {
                break;
            }
            cur = self.node_by_id(&p).and_then(|n| n.container_id.clone());
            chain.push(p);
        }
        chain.reverse();
        chain
    }

    /// Sets the padding of the container being laid out. Ignored for top-level contexts.
    pub fn set_container_padding(&mut self, padding: Padding) {
        if self.config.container_id.is_some() {
            self.config.container_padding = Some(padding);
        }
    }

    pub fn container_padding(&self) -> Option<Padding> {
        self.config
            .container_id
            .as_ref()
            .and(self.config.container_padding)
    }

    /// Marks a node, or a direct link with that id, as needing its geometry applied.
    pub fn set_dirty(&mut self, id: &str) {
        if self.node_by_id(id).is_some() {
            self.dirty_nodes.insert(id.to_string());
            return;
        }
        let link = LinkId::data(id);
        if self.links.contains_key(&link) {
            self.dirty_links.insert(link);
        }
    }

    pub fn is_node_dirty(&self, id: &str) -> bool {
        self.dirty_nodes.contains(id) || self.node_by_id(id).is_some_and(|n| n.dirty)
    }

    pub fn is_link_dirty(&self, id: &LinkId) -> bool {
        self.dirty_links.contains(id) || self.links.get(id).is_some_and(|l| l.dirty)
    }

    /// Node contexts whose geometry must be applied back, positionable ones first.
    pub fn dirty_nodes(&self) -> Vec<&NodeContext> {
        self.nodes
            .values()
            .chain(self.lookup_only.values())
            .filter(|n| n.dirty || self.dirty_nodes.contains(&n.id))
            .collect()
    }

    pub fn dirty_links(&self) -> Vec<&LinkContext> {
        self.links
            .values()
            .filter(|l| l.dirty || self.dirty_links.contains(&l.id))
            .collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeContext> {
        self.nodes.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkContext> {
        self.links.values()
    }
}

/// Read-only coordinate space over a context. Nodes in a context are always measured, so
/// nothing is rendered on demand.
struct ContextSpace<'a>(&'a LayoutContext);

impl CoordinateSpace for ContextSpace<'_> {
    fn frame(&self, id: &str) -> Option<NodeFrame<'_>> {
        self.0.node_by_id(id).map(NodeContext::frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{point, rect};

    fn ctx() -> LayoutContext {
        let mut ctx = LayoutContext::new(LayoutConfig::default());
        ctx.add_node(
            NodeContext::new("a", rect(0.0, 0.0, 100.0, 100.0))
                .with_position(point(10.0, 10.0))
                .with_disclosure(Padding::new(5.0, 5.0, 5.0, 5.0), vec!["b".into(), "c".into()]),
        );
        ctx.add_node_to_map(
            NodeContext::new("b", rect(0.0, 0.0, 20.0, 20.0))
                .with_container("a")
                .with_position(point(1.0, 2.0)),
        );
        ctx.add_node_to_map(NodeContext::new("c", rect(0.0, 0.0, 20.0, 20.0)).with_container("a"));
        ctx.add_node(NodeContext::new("d", rect(0.0, 0.0, 30.0, 30.0)));
        ctx.add_link(LinkContext::new(LinkId::data("l1"), "b", "d"));
        ctx
    }

    #[test]
    fn counts_cover_positionable_nodes_only() {
        let ctx = ctx();
        assert_eq!(ctx.node_count(), 2);
        assert_eq!(ctx.node_by_index(1).map(NodeContext::id), Some("d"));
        assert!(ctx.node_by_id("b").is_some());
        assert!(ctx.node_by_id("zzz").is_none());
        assert_eq!(ctx.link_count(), 1);
    }

    #[test]
    fn re_adding_replaces_without_growing() {
        let mut ctx = ctx();
        ctx.add_node(NodeContext::new("d", rect(0.0, 0.0, 99.0, 99.0)));
        assert_eq!(ctx.node_count(), 2);
        assert_eq!(ctx.node_by_index(1).unwrap().bounds().size.width, 99.0);
        ctx.add_link(LinkContext::new(LinkId::data("l1"), "c", "d"));
        assert_eq!(ctx.link_count(), 1);
        assert_eq!(ctx.link_by_index(0).unwrap().start_id(), "c");
    }

    #[test]
    fn remove_node_with_parent_detaches_child() {
        let mut ctx = ctx();
        assert!(ctx.remove_node(Some("a"), "b").is_some());
        assert_eq!(ctx.node_by_id("a").unwrap().child_node_ids(), &["c"]);
        assert!(ctx.node_by_id("b").is_none());
        assert_eq!(ctx.node_count(), 2);

        assert!(ctx.remove_node(None, "d").is_some());
        assert_eq!(ctx.node_count(), 1);
        assert!(ctx.remove_node(None, "d").is_none());
    }

    #[test]
    fn sub_layout_children_removed_through_their_container_stop_counting() {
        let mut ctx = LayoutContext::new(LayoutConfig {
            container_id: Some("a".into()),
            ..LayoutConfig::default()
        });
        ctx.add_node_to_map(
            NodeContext::new("a", rect(0.0, 0.0, 50.0, 50.0))
                .with_disclosure(Padding::uniform(5.0), vec!["b".into(), "c".into()]),
        );
        ctx.add_node(NodeContext::new("b", rect(0.0, 0.0, 10.0, 10.0)).with_container("a"));
        ctx.add_node(NodeContext::new("c", rect(0.0, 0.0, 10.0, 10.0)).with_container("a"));
        assert_eq!(ctx.node_count(), 2);

        assert!(ctx.remove_node(Some("a"), "b").is_some());
        assert_eq!(ctx.node_count(), 1);
        assert_eq!(ctx.node_by_index(0).map(NodeContext::id), Some("c"));
        assert_eq!(ctx.node_by_id("a").unwrap().child_node_ids(), &["c"]);
    }

    #[test]
    fn local_to_global_goes_through_container_padding() {
        let ctx = ctx();
        assert_eq!(ctx.local_to_global(point(0.0, 0.0), "b"), point(15.0, 15.0));
        assert_eq!(
            ctx.global_bounds("b"),
            Some(rect(16.0, 17.0, 20.0, 20.0))
        );
        assert_eq!(ctx.relative_position("b", Some("a")), Some(point(0.0, 0.0)));
    }

    #[test]
    fn common_container_of_siblings_and_strangers() {
        let ctx = ctx();
        assert_eq!(ctx.common_container("b", "c"), Some("a".to_string()));
        assert_eq!(ctx.common_container("b", "d"), None);
        assert_eq!(ctx.common_container("a", "b"), None);
    }

    #[test]
    fn container_padding_needs_a_container_id() {
        let mut ctx = ctx();
        ctx.set_container_padding(Padding::uniform(3.0));
        assert_eq!(ctx.container_padding(), None);

        let cfg = LayoutConfig::default().for_container("a", Padding::uniform(1.0));
        let mut sub = LayoutContext::new(cfg);
        assert_eq!(sub.container_padding(), Some(Padding::uniform(1.0)));
        sub.set_container_padding(Padding::uniform(3.0));
        assert_eq!(sub.container_padding(), Some(Padding::uniform(3.0)));
    }

    #[test]
    fn setters_and_set_dirty_feed_the_dirty_lists() {
        let mut ctx = ctx();
        assert!(ctx.dirty_nodes().is_empty());
        ctx.node_by_id_mut("d").unwrap().set_position(point(3.0, 4.0));
        ctx.set_dirty("b");
        ctx.set_dirty("l1");
        ctx.set_dirty("nope");
        let dirty: Vec<&str> = ctx.dirty_nodes().into_iter().map(NodeContext::id).collect();
        assert_eq!(dirty, vec!["d", "b"]);
        assert!(ctx.is_link_dirty(&LinkId::data("l1")));
        assert_eq!(ctx.dirty_links().len(), 1);
    }
}
