use super::{Layout, LayoutContext, LayoutFuture};
use crate::error::LayoutError;
use crate::geom::{Point, Rect, point, vector};
use crate::model::{LinkId, LinkPath, Padding};

/// Row-major grid.
///
/// Nodes are placed in cells sized to the largest node (plus its label), left to right or right
/// to left depending on the locale. Labels sit centered below their node. Links are straight
/// center-to-center segments routed in the space of their endpoints' common container.
///
/// Global attributes override the fields: `columns`, `hGap`, `vGap`, `labelGap`, and
/// `containerPadding` (a number, applied uniformly in container sub-layouts).
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    /// Defaults to `ceil(sqrt(n))`.
    pub columns: Option<usize>,
    pub h_gap: f64,
    pub v_gap: f64,
    pub label_gap: f64,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            columns: None,
            h_gap: 20.0,
            v_gap: 20.0,
            label_gap: 4.0,
        }
    }
}

impl GridLayout {
    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = Some(columns);
        self
    }

    fn resolved(&self, ctx: &LayoutContext) -> Self {
        let cfg = ctx.config();
        Self {
            columns: cfg
                .attribute("columns")
                .and_then(|v| v.as_u64())
                .map(|c| c as usize)
                .or(self.columns),
            h_gap: cfg.attribute_f64("hGap").unwrap_or(self.h_gap),
            v_gap: cfg.attribute_f64("vGap").unwrap_or(self.v_gap),
            label_gap: cfg.attribute_f64("labelGap").unwrap_or(self.label_gap),
        }
    }

    pub fn run(&self, ctx: &mut LayoutContext) -> Result<(), LayoutError> {
        let opts = self.resolved(ctx);
        if let Some(p) = ctx.config().attribute_f64("containerPadding") {
            if p < 0.0 {
                return Err(LayoutError::new(
                    "grid",
                    format!("negative containerPadding {p}"),
                ));
            }
            ctx.set_container_padding(Padding::uniform(p));
        }
        opts.place_nodes(ctx);
        route_links(ctx);
        Ok(())
    }

    fn place_nodes(&self, ctx: &mut LayoutContext) {
        let n = ctx.node_count();
        if n == 0 {
            return;
        }
        let cols = self
            .columns
            .unwrap_or_else(|| (n as f64).sqrt().ceil() as usize)
            .clamp(1, n);

        let mut cell_w: f64 = 0.0;
        let mut cell_h: f64 = 0.0;
        for i in 0..n {
            let Some(node) = ctx.node_by_index(i) else {
                continue;
            };
            let label_h = node
                .label_bounds()
                .map(|lb| lb.size.height + self.label_gap)
                .unwrap_or(0.0);
            let label_w = node.label_bounds().map(|lb| lb.size.width).unwrap_or(0.0);
            cell_w = cell_w.max(node.bounds().size.width.max(label_w));
            cell_h = cell_h.max(node.bounds().size.height + label_h);
        }

        let rtl = ctx.is_locale_rtl();
        for i in 0..n {
            let (row, mut col) = (i / cols, i % cols);
            if rtl {
                col = cols - 1 - col;
            }
            let cell = point(
                col as f64 * (cell_w + self.h_gap),
                row as f64 * (cell_h + self.v_gap),
            );
            let label_gap = self.label_gap;
            let Some(node) = ctx.node_by_index_mut(i) else {
                continue;
            };
            let bounds = node.bounds();
            // Center horizontally in the cell; `bounds` may not start at the node origin.
            let dx = (cell_w - bounds.size.width) / 2.0;
            node.set_position(cell + vector(dx, 0.0) - bounds.origin.to_vector());
            if let Some(lb) = node.label_bounds() {
                node.set_label_position(point(
                    bounds.center().x - lb.size.width / 2.0,
                    bounds.max_y() + label_gap,
                ));
            }
        }
    }
}

fn route_links(ctx: &mut LayoutContext) {
    let ids: Vec<LinkId> = ctx.links().map(|l| l.id().clone()).collect();
    for id in ids {
        let Some(link) = ctx.link_by_id(&id) else {
            continue;
        };
        let (start, end) = (link.start_id().to_string(), link.end_id().to_string());
        let (Some(a), Some(b)) = (ctx.global_bounds(&start), ctx.global_bounds(&end)) else {
            continue;
        };
        let space = ctx.common_container(&start, &end);
        let origin = ctx.space_origin(space.as_deref()).to_vector();
        let p1 = a.center() - origin;
        let p2 = b.center() - origin;
        let mid = p1.lerp(p2, 0.5);
        let Some(link) = ctx.link_by_id_mut(&id) else {
            continue;
        };
        let label_at = match link.label_bounds() {
            Some(lb) => label_origin(mid, lb),
            None => mid,
        };
        link.set_points(LinkPath::Polyline(vec![p1, p2]));
        link.set_coordinate_space(space);
        link.set_label_position(label_at);
    }
}

fn label_origin(mid: Point, label: Rect) -> Point {
    mid - vector(label.size.width / 2.0, label.size.height / 2.0)
}

impl Layout for GridLayout {
    fn name(&self) -> &str {
        "grid"
    }

    fn layout<'a>(&'a self, ctx: &'a mut LayoutContext) -> LayoutFuture<'a> {
        Box::pin(async move { self.run(ctx) })
    }
}
