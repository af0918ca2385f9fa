//! Geometry view shared by node and link variants.
//!
//! Snapshots and the coordinate resolver only ever look at shapes through [`DiagramShape`], so a
//! host can plug in its own node/link variants without the core knowing their concrete types.

use crate::geom::{Point, Rect};
use crate::layout::{LinkContext, NodeContext};
use crate::model::{LinkRecord, NodeRecord};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LabelGeometry {
    pub position: Option<Point>,
    pub bounds: Option<Rect>,
    pub rotation: f64,
}

pub trait DiagramShape {
    /// Shape-local bounds, when known.
    fn bounds(&self) -> Option<Rect>;
    /// Position in the coordinate space of the containing container.
    fn position(&self) -> Point;
    fn label_geometry(&self) -> LabelGeometry;
    fn is_container(&self) -> bool;
}

impl DiagramShape for NodeRecord {
    fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    fn position(&self) -> Point {
        self.position
    }

    fn label_geometry(&self) -> LabelGeometry {
        LabelGeometry {
            position: self.label_position,
            bounds: self.label_bounds,
            rotation: self.label_rotation,
        }
    }

    fn is_container(&self) -> bool {
        self.disclosed()
    }
}

impl DiagramShape for LinkRecord {
    fn bounds(&self) -> Option<Rect> {
        self.points.bounds()
    }

    fn position(&self) -> Point {
        self.points
            .bounds()
            .map(|b| b.origin)
            .unwrap_or_else(Point::origin)
    }

    fn label_geometry(&self) -> LabelGeometry {
        LabelGeometry {
            position: self.label_position,
            bounds: self.label_bounds,
            rotation: self.label_rotation,
        }
    }

    fn is_container(&self) -> bool {
        false
    }
}

impl DiagramShape for NodeContext {
    fn bounds(&self) -> Option<Rect> {
        Some(NodeContext::bounds(self))
    }

    fn position(&self) -> Point {
        NodeContext::position(self)
    }

    fn label_geometry(&self) -> LabelGeometry {
        LabelGeometry {
            position: self.label_position(),
            bounds: NodeContext::label_bounds(self),
            rotation: self.label_rotation(),
        }
    }

    fn is_container(&self) -> bool {
        self.is_disclosed()
    }
}

impl DiagramShape for LinkContext {
    fn bounds(&self) -> Option<Rect> {
        self.points().bounds()
    }

    fn position(&self) -> Point {
        self.points()
            .bounds()
            .map(|b| b.origin)
            .unwrap_or_else(Point::origin)
    }

    fn label_geometry(&self) -> LabelGeometry {
        LabelGeometry {
            position: self.label_position(),
            bounds: LinkContext::label_bounds(self),
            rotation: self.label_rotation(),
        }
    }

    fn is_container(&self) -> bool {
        false
    }
}
