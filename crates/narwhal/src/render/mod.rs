//! Render driver: measurement hooks, staged layout passes and the engine that ties a diagram
//! state, a renderer and a layout together.

mod engine;
mod pass;

pub use engine::{DiagramEngine, RenderOutcome};
pub use pass::{PassStatus, RenderPass};

use crate::animation::{AnimationSnapshot, Transition, TransitionKind};
use crate::coords::{self, CoordinateSpace, NodeFrame};
use crate::geom::{Point, Rect, Size, Vector, rect, size};
use crate::model::{LinkRecord, NodeRecord};
use crate::state::{DiagramState, NodeMap};

/// Geometry reported by the renderer for one node, in node-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeMeasurement {
    pub bounds: Rect,
    pub content_bounds: Rect,
    pub label_bounds: Option<Rect>,
    pub content_offset: Vector,
}

impl NodeMeasurement {
    pub fn sized(width: f64, height: f64) -> Self {
        let bounds = rect(0.0, 0.0, width, height);
        Self {
            bounds,
            content_bounds: bounds,
            label_bounds: None,
            content_offset: Vector::zero(),
        }
    }

    pub(crate) fn apply_to(&self, rec: &mut NodeRecord) {
        rec.bounds = Some(self.bounds);
        rec.content_bounds = Some(self.content_bounds);
        rec.label_bounds = self.label_bounds;
        rec.content_offset = self.content_offset;
        rec.rendered = true;
    }
}

/// Host side of rendering. The engine only ever asks for sizes and tells the host when a node
/// or a container's children must exist.
pub trait Renderer {
    fn measure(&mut self, node: &NodeRecord) -> NodeMeasurement;

    fn render(&mut self, _node_id: &str) {}

    fn render_container_children(&mut self, _container_id: &str) {}

    fn measure_link_label(&mut self, _link: &LinkRecord) -> Option<Rect> {
        None
    }
}

/// Measures every node as a box: its preferred size, or `default_size`. Labels are estimated at
/// a fixed advance per character.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxMeasurer {
    pub default_size: Size,
    pub char_width: f64,
    pub label_height: f64,
    /// Ids in the order they were first rendered.
    pub rendered: Vec<String>,
}

impl Default for BoxMeasurer {
    fn default() -> Self {
        Self {
            default_size: size(80.0, 40.0),
            char_width: 7.0,
            label_height: 14.0,
            rendered: Vec::new(),
        }
    }
}

impl BoxMeasurer {
    fn label_rect(&self, text: Option<&str>) -> Option<Rect> {
        let text = text?;
        Some(rect(
            0.0,
            0.0,
            text.chars().count() as f64 * self.char_width,
            self.label_height,
        ))
    }
}

impl Renderer for BoxMeasurer {
    fn measure(&mut self, node: &NodeRecord) -> NodeMeasurement {
        let (w, h) = node
            .preferred_size
            .unwrap_or((self.default_size.width, self.default_size.height));
        NodeMeasurement {
            label_bounds: self.label_rect(node.label.as_deref()),
            ..NodeMeasurement::sized(w, h)
        }
    }

    fn render(&mut self, node_id: &str) {
        if !self.rendered.iter().any(|r| r == node_id) {
            self.rendered.push(node_id.to_string());
        }
    }

    fn measure_link_label(&mut self, link: &LinkRecord) -> Option<Rect> {
        let label = link.constituents().first()?.label.as_deref();
        self.label_rect(label)
    }
}

/// Measures and renders a node the first time the resolver walks through it.
pub(crate) fn render_node<R>(rec: &mut NodeRecord, renderer: &mut R)
where
    R: Renderer + ?Sized,
{
    let m = renderer.measure(rec);
    m.apply_to(rec);
    renderer.render(&rec.id);
    if rec.disclosed() {
        renderer.render_container_children(&rec.id);
    }
}

/// Coordinate space over live records that renders nodes on demand.
struct RenderingSpace<'a, R: ?Sized> {
    nodes: &'a mut NodeMap,
    renderer: &'a mut R,
}

impl<R> CoordinateSpace for RenderingSpace<'_, R>
where
    R: Renderer + ?Sized,
{
    fn frame(&self, id: &str) -> Option<NodeFrame<'_>> {
        self.nodes.frame(id)
    }

    fn ensure_rendered(&mut self, id: &str) {
        if let Some(rec) = self.nodes.get_mut(id) {
            if !rec.rendered {
                render_node(rec, &mut *self.renderer);
            }
        }
    }
}

impl DiagramState {
    /// Like [`DiagramState::global_offset`], but ancestors that were never rendered are
    /// measured and rendered first.
    pub fn resolve_global_offset<R>(&mut self, id: &str, renderer: &mut R) -> Point
    where
        R: Renderer + ?Sized,
    {
        let mut space = RenderingSpace {
            nodes: &mut self.nodes,
            renderer,
        };
        coords::global_offset(&mut space, id)
    }
}

/// Result of a committed pass: the snapshots on both sides and the directives between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Transitions {
    pub old: AnimationSnapshot,
    pub new: AnimationSnapshot,
    pub directives: Vec<Transition>,
}

impl Transitions {
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn kinds(&self) -> Vec<TransitionKind> {
        self.directives.iter().map(Transition::kind).collect()
    }

    pub fn link_kinds(&self) -> Vec<TransitionKind> {
        self.directives
            .iter()
            .filter(|t| t.is_link())
            .map(Transition::kind)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::point;
    use crate::model::{DiagramData, NodeData};

    #[test]
    fn box_measurer_uses_preferred_size_and_label_length() {
        let mut m = BoxMeasurer::default();
        let mut data = NodeData::new("n").with_size(10.0, 20.0);
        data.label = Some("abc".into());
        let rec = NodeRecord::from_data(&data, None);
        let got = m.measure(&rec);
        assert_eq!(got.bounds, rect(0.0, 0.0, 10.0, 20.0));
        assert_eq!(got.label_bounds, Some(rect(0.0, 0.0, 21.0, 14.0)));
    }

    #[test]
    fn resolving_through_unrendered_ancestors_renders_them() {
        let mut state = DiagramState::default();
        state.load(DiagramData {
            nodes: vec![NodeData::new("A").with_children(vec![
                NodeData::new("B").with_children(vec![NodeData::new("C")]),
            ])],
            links: Vec::new(),
            expanded: vec!["A".into(), "B".into()],
        });
        let mut renderer = BoxMeasurer::default();
        let offset = state.resolve_global_offset("C", &mut renderer);
        // Two levels of default padding.
        assert_eq!(offset, point(20.0, 20.0));
        assert_eq!(renderer.rendered, vec!["B", "A"]);
        assert!(state.node("A").unwrap().rendered);
        assert!(!state.node("C").unwrap().rendered);
    }
}
