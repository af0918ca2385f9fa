//! Container-aware coordinate resolution.
//!
//! A node's position is local to the coordinate space of its container. The space of a
//! container's children starts at the container's own position, shifted by its content offset
//! and, while the container is disclosed, by its left/top padding. Converting to diagram-global
//! coordinates walks the container chain and sums those translations.

use crate::geom::{Point, Vector};
use crate::model::{NodeRecord, Padding};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

/// The pieces of a node the resolver accumulates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeFrame<'a> {
    pub group_id: Option<&'a str>,
    pub position: Point,
    pub content_offset: Vector,
    /// Only set for disclosed containers.
    pub padding: Option<Padding>,
}

impl<'a> NodeFrame<'a> {
    pub fn of_record(rec: &'a NodeRecord) -> Self {
        Self {
            group_id: rec.group_id.as_deref(),
            position: rec.position,
            content_offset: rec.content_offset,
            padding: rec.container_padding(),
        }
    }

    fn translation(&self) -> Vector {
        let mut t = self.content_offset + self.position.to_vector();
        if let Some(p) = self.padding {
            t += p.origin_offset();
        }
        t
    }
}

/// Anything that can answer frame lookups by node id.
pub trait CoordinateSpace {
    fn frame(&self, id: &str) -> Option<NodeFrame<'_>>;

    /// Called before a node's frame is read so a lazily rendered node can be produced first.
    fn ensure_rendered(&mut self, _id: &str) {}
}

impl CoordinateSpace for IndexMap<String, NodeRecord, FxBuildHasher> {
    fn frame(&self, id: &str) -> Option<NodeFrame<'_>> {
        self.get(id).map(NodeFrame::of_record)
    }
}

/// Walks from `start` up the container chain. Returns the summed translation and whether `stop`
/// was reached (always `true` when there is no stop id).
fn walk<S>(space: &mut S, start: Option<String>, stop: Option<&str>) -> (Vector, bool)
where
    S: CoordinateSpace + ?Sized,
{
    let mut acc = Vector::zero();
    let mut cur = start;
    while let Some(id) = cur {
        if stop == Some(id.as_str()) {
            return (acc, true);
        }
        space.ensure_rendered(&id);
        let Some(frame) = space.frame(&id) else {
            break;
        };
        acc += frame.translation();
        cur = frame.group_id.map(str::to_string);
    }
    (acc, stop.is_none())
}

fn group_of<S>(space: &S, node_id: &str) -> Option<String>
where
    S: CoordinateSpace + ?Sized,
{
    space
        .frame(node_id)
        .and_then(|f| f.group_id.map(str::to_string))
}

/// Offset of `node_id`'s coordinate space from the global origin. `{0, 0}` for top-level and
/// unknown nodes.
pub fn global_offset<S>(space: &mut S, node_id: &str) -> Point
where
    S: CoordinateSpace + ?Sized,
{
    let start = group_of(space, node_id);
    let (acc, _) = walk(space, start, None);
    acc.to_point()
}

/// Offset of `node_id`'s coordinate space from the space of its ancestor `ancestor_id`.
///
/// `None` when `ancestor_id` is not an ancestor. A `None` ancestor means the global space.
pub fn relative_position<S>(space: &mut S, node_id: &str, ancestor_id: Option<&str>) -> Option<Point>
where
    S: CoordinateSpace + ?Sized,
{
    let start = group_of(space, node_id);
    let (acc, reached) = walk(space, start, ancestor_id);
    reached.then(|| acc.to_point())
}

/// Global origin of the coordinate space in which `container_id`'s children (and links routed
/// in that container) are expressed. `None` is the global space itself.
pub fn space_origin<S>(space: &mut S, container_id: Option<&str>) -> Point
where
    S: CoordinateSpace + ?Sized,
{
    let (acc, _) = walk(space, container_id.map(str::to_string), None);
    acc.to_point()
}

pub fn local_to_global<S>(space: &mut S, local: Point, node_id: &str) -> Point
where
    S: CoordinateSpace + ?Sized,
{
    local + global_offset(space, node_id).to_vector()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{point, vector};

    type Nodes = IndexMap<String, NodeRecord, FxBuildHasher>;

    fn node(id: &str, group: Option<&str>, pos: Point, padding: Option<Padding>) -> NodeRecord {
        let mut rec = NodeRecord::new(id, group.map(str::to_string));
        rec.position = pos;
        if let Some(p) = padding {
            rec.disclose(p, Vec::new());
        }
        rec
    }

    fn nested() -> Nodes {
        let mut nodes = Nodes::default();
        for rec in [
            node("a", None, point(100.0, 50.0), Some(Padding::new(4.0, 0.0, 0.0, 2.0))),
            node("b", Some("a"), point(10.0, 20.0), Some(Padding::new(3.0, 9.0, 9.0, 5.0))),
            node("c", Some("b"), point(1.0, 1.0), Some(Padding::new(7.0, 0.0, 0.0, 6.0))),
            node("d", Some("c"), point(0.5, 0.5), None),
        ] {
            nodes.insert(rec.id.clone(), rec);
        }
        nodes.get_mut("b").unwrap().content_offset = vector(0.0, 30.0);
        nodes
    }

    #[test]
    fn global_offset_sums_positions_padding_and_content_offsets() {
        let mut nodes = nested();
        // c: (1 + 6, 1 + 7), b: (10 + 5, 20 + 3 + 30), a: (100 + 2, 50 + 4)
        assert_eq!(global_offset(&mut nodes, "d"), point(124.0, 115.0));
        assert_eq!(global_offset(&mut nodes, "a"), point(0.0, 0.0));
        assert_eq!(global_offset(&mut nodes, "missing"), point(0.0, 0.0));
    }

    #[test]
    fn collapsed_ancestors_contribute_no_padding() {
        let mut nodes = nested();
        nodes.get_mut("c").unwrap().collapse();
        assert_eq!(global_offset(&mut nodes, "d"), point(118.0, 108.0));
    }

    #[test]
    fn relative_position_stops_at_the_ancestor() {
        let mut nodes = nested();
        assert_eq!(relative_position(&mut nodes, "d", Some("c")), Some(point(0.0, 0.0)));
        assert_eq!(relative_position(&mut nodes, "d", Some("b")), Some(point(7.0, 8.0)));
        assert_eq!(relative_position(&mut nodes, "d", Some("a")), Some(point(22.0, 61.0)));
        assert_eq!(relative_position(&mut nodes, "b", Some("d")), None);
        assert_eq!(
            relative_position(&mut nodes, "d", None),
            Some(global_offset(&mut nodes, "d"))
        );
    }

    #[test]
    fn space_origin_includes_the_container_itself() {
        let mut nodes = nested();
        assert_eq!(space_origin(&mut nodes, Some("c")), point(124.0, 115.0));
        assert_eq!(space_origin(&mut nodes, None), point(0.0, 0.0));
        assert_eq!(
            local_to_global(&mut nodes, point(1.0, 2.0), "d"),
            point(125.0, 117.0)
        );
    }

    struct LazySpace {
        nodes: Nodes,
        rendered: Vec<String>,
    }

    impl CoordinateSpace for LazySpace {
        fn frame(&self, id: &str) -> Option<NodeFrame<'_>> {
            self.nodes.frame(id)
        }

        fn ensure_rendered(&mut self, id: &str) {
            if let Some(rec) = self.nodes.get_mut(id) {
                if !rec.rendered {
                    rec.rendered = true;
                    self.rendered.push(id.to_string());
                }
            }
        }
    }

    #[test]
    fn unrendered_ancestors_are_rendered_on_demand() {
        let mut space = LazySpace {
            nodes: nested(),
            rendered: Vec::new(),
        };
        global_offset(&mut space, "d");
        assert_eq!(space.rendered, vec!["c", "b", "a"]);
        global_offset(&mut space, "d");
        assert_eq!(space.rendered.len(), 3);
    }
}
