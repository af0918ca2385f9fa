//! Data records (as delivered by a data source) and the render-side node/link records built from
//! them.
//!
//! Records are plain values owned by [`DiagramState`](crate::DiagramState). A node record
//! exists only while the node is visible; a link record is either a direct link backed by one
//! data link, or a promoted aggregate standing in for one or more data links whose endpoints are
//! hidden inside collapsed containers.

use crate::geom::{Point, Rect, Vector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hint from the data source about links touching a node's descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Connectivity {
    #[default]
    Unknown,
    Connected,
    /// No link starts or ends below this node.
    Disjoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeStyle {
    pub fill: Option<String>,
    pub stroke: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkStyle {
    pub stroke: Option<String>,
    pub width: Option<f64>,
}

/// A node as delivered by the data source. `children` is only used while a tree is being
/// delivered; once stored in the data graph the hierarchy lives in the graph itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub style: NodeStyle,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub descendants_connectivity: Connectivity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeData>,
}

impl NodeData {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: Vec<NodeData>) -> Self {
        self.children = children;
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Splits off the nested children, leaving a flat payload.
    pub(crate) fn into_parts(mut self) -> (NodeData, Vec<NodeData>) {
        let children = std::mem::take(&mut self.children);
        (self, children)
    }
}

/// A link as delivered by the data source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkData {
    pub id: String,
    pub start_id: String,
    pub end_id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub style: LinkStyle,
}

impl LinkData {
    pub fn new(id: impl Into<String>, start_id: impl Into<String>, end_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start_id: start_id.into(),
            end_id: end_id.into(),
            ..Default::default()
        }
    }
}

/// Initial content for a diagram.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagramData {
    pub nodes: Vec<NodeData>,
    pub links: Vec<LinkData>,
    /// Containers that start out disclosed.
    pub expanded: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub const ZERO: Padding = Padding::uniform(0.0);

    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub const fn uniform(v: f64) -> Self {
        Self::new(v, v, v, v)
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }

    /// Offset from a container's origin to its children's coordinate space.
    pub fn origin_offset(&self) -> Vector {
        crate::geom::vector(self.left, self.top)
    }
}

/// Disclosure data of an expanded container. Its presence on a [`NodeRecord`] is what makes the
/// node disclosed, so padding and child ids cannot exist on a collapsed node.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerState {
    pub padding: Padding,
    pub child_node_ids: Vec<String>,
}

/// Render-side node record. Exists while the node is visible.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: String,
    pub group_id: Option<String>,
    /// Container-local position.
    pub position: Point,
    /// Translation applied to this node's content in addition to its position.
    pub content_offset: Vector,
    /// Node-local bounds, filled in by measurement.
    pub bounds: Option<Rect>,
    pub content_bounds: Option<Rect>,
    pub label_bounds: Option<Rect>,
    pub label_position: Option<Point>,
    pub label_rotation: f64,
    pub container: Option<ContainerState>,
    pub read_only: bool,
    pub style: NodeStyle,
    pub label: Option<String>,
    pub preferred_size: Option<(f64, f64)>,
    /// Whether the renderer has produced this node yet.
    pub rendered: bool,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, group_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            group_id,
            position: Point::origin(),
            content_offset: Vector::zero(),
            bounds: None,
            content_bounds: None,
            label_bounds: None,
            label_position: None,
            label_rotation: 0.0,
            container: None,
            read_only: false,
            style: NodeStyle::default(),
            label: None,
            preferred_size: None,
            rendered: false,
        }
    }

    pub fn from_data(data: &NodeData, group_id: Option<String>) -> Self {
        let mut rec = Self::new(data.id.clone(), group_id);
        rec.refresh_from_data(data);
        rec
    }

    /// Copies data-driven fields and forces a re-measure.
    pub fn refresh_from_data(&mut self, data: &NodeData) {
        self.read_only = data.read_only;
        self.style = data.style.clone();
        self.label = data.label.clone();
        self.preferred_size = match (data.width, data.height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        };
        self.bounds = None;
        self.content_bounds = None;
        self.label_bounds = None;
        self.rendered = false;
    }

    pub fn disclosed(&self) -> bool {
        self.container.is_some()
    }

    pub fn container_padding(&self) -> Option<Padding> {
        self.container.as_ref().map(|c| c.padding)
    }

    pub fn child_node_ids(&self) -> &[String] {
        self.container
            .as_ref()
            .map(|c| c.child_node_ids.as_slice())
            .unwrap_or_default()
    }

    pub fn disclose(&mut self, padding: Padding, child_node_ids: Vec<String>) {
        self.container = Some(ContainerState {
            padding,
            child_node_ids,
        });
    }

    /// Drops container state. Bounds are re-measured for the collapsed shape.
    pub fn collapse(&mut self) {
        if self.container.take().is_some() {
            self.bounds = None;
            self.content_bounds = None;
            self.rendered = false;
        }
    }
}

/// Identity of a link record. Promoted aggregates are keyed structurally by the pair of visible
/// endpoints they connect, so two aggregates can never share an endpoint pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkId {
    Data(String),
    Promoted { start: String, end: String },
}

impl LinkId {
    pub fn data(id: impl Into<String>) -> Self {
        LinkId::Data(id.into())
    }

    pub fn promoted(start: impl Into<String>, end: impl Into<String>) -> Self {
        LinkId::Promoted {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn is_promoted(&self) -> bool {
        matches!(self, LinkId::Promoted { .. })
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkId::Data(id) => f.write_str(id),
            LinkId::Promoted { start, end } => write!(f, "promoted({start}, {end})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum PathCommand {
    MoveTo { to: Point },
    LineTo { to: Point },
    QuadTo { ctrl: Point, to: Point },
    CubicTo { ctrl1: Point, ctrl2: Point, to: Point },
    Close,
}

impl PathCommand {
    fn translate(&mut self, by: Vector) {
        match self {
            PathCommand::MoveTo { to } | PathCommand::LineTo { to } => *to += by,
            PathCommand::QuadTo { ctrl, to } => {
                *ctrl += by;
                *to += by;
            }
            PathCommand::CubicTo { ctrl1, ctrl2, to } => {
                *ctrl1 += by;
                *ctrl2 += by;
                *to += by;
            }
            PathCommand::Close => {}
        }
    }

    fn points(&self) -> impl Iterator<Item = Point> {
        let pts: [Option<Point>; 3] = match *self {
            PathCommand::MoveTo { to } | PathCommand::LineTo { to } => [Some(to), None, None],
            PathCommand::QuadTo { ctrl, to } => [Some(ctrl), Some(to), None],
            PathCommand::CubicTo { ctrl1, ctrl2, to } => [Some(ctrl1), Some(ctrl2), Some(to)],
            PathCommand::Close => [None, None, None],
        };
        pts.into_iter().flatten()
    }
}

/// Link geometry, in the coordinate space named by the record's `coordinate_space_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkPath {
    Polyline(Vec<Point>),
    Commands(Vec<PathCommand>),
}

impl Default for LinkPath {
    fn default() -> Self {
        LinkPath::Polyline(Vec::new())
    }
}

impl LinkPath {
    pub fn is_empty(&self) -> bool {
        match self {
            LinkPath::Polyline(p) => p.is_empty(),
            LinkPath::Commands(c) => c.is_empty(),
        }
    }

    pub fn translate(&mut self, by: Vector) {
        match self {
            LinkPath::Polyline(points) => points.iter_mut().for_each(|p| *p += by),
            LinkPath::Commands(cmds) => cmds.iter_mut().for_each(|c| c.translate(by)),
        }
    }

    pub fn points(&self) -> Vec<Point> {
        match self {
            LinkPath::Polyline(points) => points.clone(),
            LinkPath::Commands(cmds) => cmds.iter().flat_map(|c| c.points()).collect(),
        }
    }

    /// Bounding box of every point (control points included).
    pub fn bounds(&self) -> Option<Rect> {
        let pts = self.points();
        if pts.is_empty() {
            return None;
        }
        Some(Rect::from_points(pts))
    }
}

/// What a link record stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkBacking {
    Direct(LinkData),
    /// Never empty while the record is registered in a diagram.
    Promoted(Vec<LinkData>),
}

/// Render-side link record.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRecord {
    pub id: LinkId,
    pub start_id: String,
    pub end_id: String,
    pub backing: LinkBacking,
    pub points: LinkPath,
    pub coordinate_space_id: Option<String>,
    pub label_position: Option<Point>,
    pub label_bounds: Option<Rect>,
    pub label_rotation: f64,
    pub style: LinkStyle,
}

impl LinkRecord {
    pub fn direct(data: LinkData) -> Self {
        Self {
            id: LinkId::Data(data.id.clone()),
            start_id: data.start_id.clone(),
            end_id: data.end_id.clone(),
            style: data.style.clone(),
            backing: LinkBacking::Direct(data),
            points: LinkPath::default(),
            coordinate_space_id: None,
            label_position: None,
            label_bounds: None,
            label_rotation: 0.0,
        }
    }

    pub fn promoted(start_id: impl Into<String>, end_id: impl Into<String>) -> Self {
        let start_id = start_id.into();
        let end_id = end_id.into();
        Self {
            id: LinkId::promoted(start_id.clone(), end_id.clone()),
            start_id,
            end_id,
            backing: LinkBacking::Promoted(Vec::new()),
            points: LinkPath::default(),
            coordinate_space_id: None,
            label_position: None,
            label_bounds: None,
            label_rotation: 0.0,
            style: LinkStyle::default(),
        }
    }

    pub fn is_promoted(&self) -> bool {
        matches!(self.backing, LinkBacking::Promoted(_))
    }

    /// The data links this record renders: itself for a direct link, the aggregated members for
    /// a promoted one.
    pub fn constituents(&self) -> &[LinkData] {
        match &self.backing {
            LinkBacking::Direct(data) => std::slice::from_ref(data),
            LinkBacking::Promoted(members) => members,
        }
    }

    pub fn constituent_ids(&self) -> impl Iterator<Item = &str> {
        self.constituents().iter().map(|l| l.id.as_str())
    }

    pub fn constituent_count(&self) -> usize {
        self.constituents().len()
    }

    /// Adds or refreshes a member of a promoted aggregate. No-op on direct links.
    pub(crate) fn upsert_constituent(&mut self, data: LinkData) {
        let LinkBacking::Promoted(members) = &mut self.backing else {
            return;
        };
        match members.iter_mut().find(|m| m.id == data.id) {
            Some(existing) => *existing = data,
            None => members.push(data),
        }
    }

    /// Removes a member of a promoted aggregate, returning whether it was present.
    pub(crate) fn remove_constituent(&mut self, id: &str) -> bool {
        let LinkBacking::Promoted(members) = &mut self.backing else {
            return false;
        };
        let before = members.len();
        members.retain(|m| m.id != id);
        members.len() != before
    }
}
