use crate::geom::{Point, Rect, Size, Transform};
use crate::model::{LinkId, LinkPath, LinkRecord, NodeRecord};
use crate::shape::DiagramShape;
use crate::state::DiagramState;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxBuildHasher, FxHashSet};
use serde::Serialize;

/// Which part of the diagram a snapshot captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotScope {
    /// Every top-level node and every link.
    Full,
    /// Only the named nodes and the links touching them, backed by the named data links, or
    /// named as aggregates.
    Partial {
        node_ids: IndexSet<String, FxBuildHasher>,
        link_ids: IndexSet<String, FxBuildHasher>,
        /// Aggregates a change may grow or shrink, named on either side of it.
        aggregate_ids: IndexSet<LinkId, FxBuildHasher>,
    },
}

impl SnapshotScope {
    pub fn empty() -> Self {
        SnapshotScope::Partial {
            node_ids: IndexSet::default(),
            link_ids: IndexSet::default(),
            aggregate_ids: IndexSet::default(),
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, SnapshotScope::Full)
    }

    pub fn add_node(&mut self, id: impl Into<String>) {
        if let SnapshotScope::Partial { node_ids, .. } = self {
            node_ids.insert(id.into());
        }
    }

    pub fn add_link(&mut self, id: impl Into<String>) {
        if let SnapshotScope::Partial { link_ids, .. } = self {
            link_ids.insert(id.into());
        }
    }

    pub fn add_aggregate(&mut self, id: LinkId) {
        if let SnapshotScope::Partial { aggregate_ids, .. } = self {
            aggregate_ids.insert(id);
        }
    }

    /// Data link ids named by a partial scope.
    pub fn link_ids(&self) -> impl Iterator<Item = &str> {
        let ids = match self {
            SnapshotScope::Full => None,
            SnapshotScope::Partial { link_ids, .. } => Some(link_ids),
        };
        ids.into_iter().flatten().map(String::as_str)
    }

    pub fn contains_aggregate(&self, id: &LinkId) -> bool {
        match self {
            SnapshotScope::Full => true,
            SnapshotScope::Partial { aggregate_ids, .. } => aggregate_ids.contains(id),
        }
    }

    pub fn contains_node(&self, id: &str) -> bool {
        match self {
            SnapshotScope::Full => true,
            SnapshotScope::Partial { node_ids, .. } => node_ids.contains(id),
        }
    }

    pub fn contains_link(&self, id: &str) -> bool {
        match self {
            SnapshotScope::Full => true,
            SnapshotScope::Partial { link_ids, .. } => link_ids.contains(id),
        }
    }

    /// Union of both scopes. Anything merged with `Full` is `Full`.
    pub fn merge(&mut self, other: SnapshotScope) {
        let SnapshotScope::Partial {
            node_ids: more_nodes,
            link_ids: more_links,
            aggregate_ids: more_aggregates,
        } = other
        else {
            *self = SnapshotScope::Full;
            return;
        };
        if let SnapshotScope::Partial {
            node_ids,
            link_ids,
            aggregate_ids,
        } = self
        {
            node_ids.extend(more_nodes);
            link_ids.extend(more_links);
            aggregate_ids.extend(more_aggregates);
        }
    }

    /// Ids the render pass reports to layouts as changed. Empty for a full scope.
    pub fn dirty_ids(&self) -> Vec<String> {
        match self {
            SnapshotScope::Full => Vec::new(),
            SnapshotScope::Partial {
                node_ids, link_ids, ..
            } => node_ids.iter().chain(link_ids).cloned().collect(),
        }
    }
}

/// Interpolation data for one node, detached from the live record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: String,
    pub group_id: Option<String>,
    pub position: Point,
    pub global_position: Point,
    pub size: Option<Size>,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub label_position: Option<Point>,
    pub label_rotation: f64,
    pub disclosed: bool,
}

impl NodeSnapshot {
    fn capture(state: &DiagramState, rec: &NodeRecord) -> Self {
        let label = rec.label_geometry();
        Self {
            id: rec.id.clone(),
            group_id: rec.group_id.clone(),
            position: rec.position(),
            global_position: state.local_to_global(rec.position(), &rec.id),
            size: rec.bounds().map(|b| b.size),
            fill: rec.style.fill.clone(),
            stroke: rec.style.stroke.clone(),
            label_position: label.position,
            label_rotation: label.rotation,
            disclosed: rec.is_container(),
        }
    }
}

/// Interpolation data for one link. Points are global.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSnapshot {
    pub id: LinkId,
    pub start_id: String,
    pub end_id: String,
    pub promoted: bool,
    pub constituent_ids: Vec<String>,
    pub points: LinkPath,
    pub stroke: Option<String>,
    pub width: Option<f64>,
    pub label_position: Option<Point>,
    pub label_rotation: f64,
}

impl LinkSnapshot {
    fn capture(state: &DiagramState, rec: &LinkRecord) -> Self {
        let origin = state.space_origin(rec.coordinate_space_id.as_deref());
        let label = rec.label_geometry();
        let mut points = rec.points.clone();
        points.translate(origin.to_vector());
        Self {
            id: rec.id.clone(),
            start_id: rec.start_id.clone(),
            end_id: rec.end_id.clone(),
            promoted: rec.is_promoted(),
            constituent_ids: rec.constituent_ids().map(str::to_string).collect(),
            points,
            stroke: rec.style.stroke.clone(),
            width: rec.style.width,
            label_position: label.position.map(|p| p + origin.to_vector()),
            label_rotation: label.rotation,
        }
    }

    pub fn constituent_count(&self) -> usize {
        self.constituent_ids.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewNode {
    pub id: String,
    pub bounds: Rect,
}

/// Clone of the overview (minimap) state at capture time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewSnapshot {
    pub viewport: Rect,
    pub nodes: Vec<OverviewNode>,
}

/// Immutable capture of the entities a pending change may affect.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSnapshot {
    scope: SnapshotScope,
    nodes: IndexMap<String, NodeSnapshot, FxBuildHasher>,
    links: IndexMap<LinkId, LinkSnapshot, FxBuildHasher>,
    hidden_link_ids: FxHashSet<String>,
    transform: Transform,
    overview: Option<OverviewSnapshot>,
    pub(crate) new_nodes: Vec<NodeSnapshot>,
    pub(crate) new_links: Vec<LinkSnapshot>,
}

impl AnimationSnapshot {
    /// A snapshot with nothing in it, as before the first render.
    pub fn empty() -> Self {
        Self {
            scope: SnapshotScope::Full,
            nodes: IndexMap::default(),
            links: IndexMap::default(),
            hidden_link_ids: FxHashSet::default(),
            transform: Transform::identity(),
            overview: None,
            new_nodes: Vec::new(),
            new_links: Vec::new(),
        }
    }

    pub fn capture(state: &DiagramState, scope: &SnapshotScope) -> Self {
        let mut snap = Self::empty();
        snap.scope = scope.clone();
        snap.transform = state.transform();

        match scope {
            SnapshotScope::Full => {
                for id in state.root_ids() {
                    if let Some(rec) = state.node(&id) {
                        snap.nodes.insert(id, NodeSnapshot::capture(state, rec));
                    }
                }
                for rec in state.links() {
                    snap.links
                        .insert(rec.id.clone(), LinkSnapshot::capture(state, rec));
                }
                snap.hidden_link_ids = state.hidden_link_ids().map(str::to_string).collect();
            }
            SnapshotScope::Partial {
                node_ids,
                link_ids,
                aggregate_ids,
            } => {
                for rec in state.nodes().filter(|r| node_ids.contains(&r.id)) {
                    snap.nodes
                        .insert(rec.id.clone(), NodeSnapshot::capture(state, rec));
                }
                let touches = |rec: &LinkRecord| {
                    node_ids.contains(&rec.start_id)
                        || node_ids.contains(&rec.end_id)
                        || aggregate_ids.contains(&rec.id)
                        || rec.constituent_ids().any(|c| link_ids.contains(c))
                };
                for rec in state.links().filter(|r| touches(r)) {
                    snap.links
                        .insert(rec.id.clone(), LinkSnapshot::capture(state, rec));
                }
                snap.hidden_link_ids = state
                    .hidden_link_ids()
                    .filter(|id| link_ids.contains(*id))
                    .map(str::to_string)
                    .collect();
            }
        }

        if state.config().overview {
            let nodes = state
                .root_ids()
                .into_iter()
                .filter_map(|id| {
                    let bounds = state.global_bounds(&id)?;
                    Some(OverviewNode { id, bounds })
                })
                .collect();
            snap.overview = Some(OverviewSnapshot {
                viewport: state.viewport(),
                nodes,
            });
        }
        snap
    }

    pub fn scope(&self) -> &SnapshotScope {
        &self.scope
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeSnapshot> {
        self.nodes.values()
    }

    pub fn node(&self, id: &str) -> Option<&NodeSnapshot> {
        self.nodes.get(id)
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkSnapshot> {
        self.links.values()
    }

    pub fn link(&self, id: &LinkId) -> Option<&LinkSnapshot> {
        self.links.get(id)
    }

    /// Whether a data link existed but was not drawn when the snapshot was taken.
    pub fn is_link_hidden(&self, id: &str) -> bool {
        self.hidden_link_ids.contains(id)
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn overview(&self) -> Option<&OverviewSnapshot> {
        self.overview.as_ref()
    }

    /// Nodes found by reconciliation that this snapshot did not have.
    pub fn new_nodes(&self) -> &[NodeSnapshot] {
        &self.new_nodes
    }

    pub fn new_links(&self) -> &[LinkSnapshot] {
        &self.new_links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiagramData, LinkData, NodeData};

    fn state() -> DiagramState {
        let mut state = DiagramState::default();
        state.load(DiagramData {
            nodes: vec![
                NodeData::new("A").with_children(vec![NodeData::new("B")]),
                NodeData::new("C"),
                NodeData::new("D"),
            ],
            links: vec![LinkData::new("L1", "B", "C"), LinkData::new("L2", "C", "D")],
            expanded: vec!["A".into()],
        });
        state
    }

    #[test]
    fn full_snapshot_takes_top_level_nodes_and_all_links() {
        let snap = AnimationSnapshot::capture(&state(), &SnapshotScope::Full);
        let ids: Vec<&str> = snap.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C", "D"]);
        assert_eq!(snap.links().count(), 2);
        assert!(snap.overview().is_none());
    }

    #[test]
    fn partial_snapshot_follows_the_scope() {
        let state = state();
        let mut scope = SnapshotScope::empty();
        scope.add_node("A");
        scope.add_node("B");
        scope.add_link("L1");
        let snap = AnimationSnapshot::capture(&state, &scope);
        assert!(snap.node("B").is_some());
        assert!(snap.node("C").is_none());
        assert!(snap.link(&LinkId::data("L1")).is_some());
        assert!(snap.link(&LinkId::data("L2")).is_none());
    }

    #[test]
    fn merging_with_full_is_full() {
        let mut scope = SnapshotScope::empty();
        scope.add_node("x");
        scope.merge(SnapshotScope::Full);
        assert!(scope.is_full());
        assert!(scope.contains_node("anything"));
    }

    #[test]
    fn link_points_are_captured_in_global_space() {
        let mut state = state();
        state.nodes.get_mut("A").unwrap().position = crate::geom::point(100.0, 0.0);
        let rec = state.links.get_mut(&LinkId::data("L1")).unwrap();
        rec.coordinate_space_id = Some("A".into());
        rec.points = LinkPath::Polyline(vec![crate::geom::point(1.0, 1.0)]);
        let snap = AnimationSnapshot::capture(&state, &SnapshotScope::Full);
        // A sits at x = 100 with the default padding of 10.
        assert_eq!(
            snap.link(&LinkId::data("L1")).unwrap().points,
            LinkPath::Polyline(vec![crate::geom::point(111.0, 11.0)])
        );
    }
}
