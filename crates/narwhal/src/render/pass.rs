use super::{Renderer, Transitions, render_node};
use crate::animation::{AnimationSnapshot, SnapshotScope, reconcile};
use crate::config::AnimationMode;
use crate::error::LayoutError;
use crate::generation::GenerationStamp;
use crate::geom::{Rect, point, size, union_all};
use crate::layout::{Layout, LayoutConfig, LayoutContext, LinkContext, NodeContext};
use crate::model::{NodeRecord, Padding};
use crate::state::{DiagramState, LinkMap, NodeMap};
use std::cell::RefCell;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    Pending,
    Complete,
    /// A newer pass or a data event started after this one. Nothing was applied.
    Stale,
}

/// One layout pass over a staging copy of the diagram's records.
///
/// The pass never touches the diagram state while the layout runs. Geometry is only copied back
/// by [`DiagramState::commit`], and only if no newer generation has started.
#[derive(Debug)]
pub struct RenderPass {
    stamp: GenerationStamp,
    old: AnimationSnapshot,
    nodes: NodeMap,
    links: LinkMap,
    roots: Vec<String>,
    config: LayoutConfig,
    status: PassStatus,
    data_change: bool,
}

impl RenderPass {
    /// Marks the pass as rendering a data event, so `animationOnDataChange` applies to it.
    pub fn for_data_change(mut self) -> Self {
        self.data_change = true;
        self
    }

    pub fn generation(&self) -> u64 {
        self.stamp.value()
    }

    pub fn status(&self) -> PassStatus {
        self.status
    }

    pub fn scope(&self) -> &SnapshotScope {
        self.old.scope()
    }

    /// Measures, lays out every disclosed container (innermost first), then the top level.
    ///
    /// Returns `Stale` as soon as the generation moved on; a layout error is only reported while
    /// the pass is still current.
    pub async fn run<L, R>(&mut self, layout: &L, renderer: &RefCell<R>) -> Result<PassStatus, LayoutError>
    where
        L: Layout + ?Sized,
        R: Renderer + ?Sized,
    {
        if !self.stamp.is_current() {
            return Ok(self.finish(PassStatus::Stale));
        }
        debug!(
            generation = self.stamp.value(),
            full = self.scope().is_full(),
            nodes = self.nodes.len(),
            links = self.links.len(),
            layout = layout.name(),
            "render pass started"
        );
        self.measure(&mut *renderer.borrow_mut());

        for container in self.containers_innermost_first() {
            let mut ctx = self.container_context(&container);
            let result = layout.layout(&mut ctx).await;
            if !self.stamp.is_current() {
                return Ok(self.finish(PassStatus::Stale));
            }
            result?;
            self.apply(&ctx);
            self.fit_container(&container, ctx.container_padding());
        }

        let mut ctx = self.top_level_context();
        let result = layout.layout(&mut ctx).await;
        if !self.stamp.is_current() {
            return Ok(self.finish(PassStatus::Stale));
        }
        result?;
        self.apply(&ctx);
        Ok(self.finish(PassStatus::Complete))
    }

    fn finish(&mut self, status: PassStatus) -> PassStatus {
        self.status = status;
        status
    }

    fn measure<R>(&mut self, renderer: &mut R)
    where
        R: Renderer + ?Sized,
    {
        for rec in self.nodes.values_mut() {
            if !rec.rendered || rec.bounds.is_none() {
                render_node(rec, &mut *renderer);
            }
        }
        for rec in self.links.values_mut() {
            if rec.label_bounds.is_none() {
                rec.label_bounds = renderer.measure_link_label(rec);
            }
        }
    }

    fn containers_innermost_first(&self) -> Vec<String> {
        fn visit(nodes: &NodeMap, id: &str, out: &mut Vec<String>) {
            let Some(rec) = nodes.get(id) else {
                return;
            };
            for child in rec.child_node_ids() {
                visit(nodes, child, out);
            }
            if rec.disclosed() {
                out.push(id.to_string());
            }
        }
        let mut out = Vec::new();
        for root in &self.roots {
            visit(&self.nodes, root, &mut out);
        }
        out
    }

    /// Root-to-leaf container chain of a staged node, excluding the node.
    fn ancestors(&self, id: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut cur = self.nodes.get(id).and_then(|r| r.group_id.clone());
        while let Some(p) = cur {
            if chain.contains(&p) {
                break;
            }
            cur = self.nodes.get(&p).and_then(|r| r.group_id.clone());
            chain.push(p);
        }
        chain.reverse();
        chain
    }

    fn common_container(&self, a: &str, b: &str) -> Option<String> {
        let (chain_a, chain_b) = (self.ancestors(a), self.ancestors(b));
        chain_a
            .into_iter()
            .zip(chain_b)
            .take_while(|(x, y)| x == y)
            .last()
            .map(|(x, _)| x)
    }

    fn add_links_in(&self, ctx: &mut LayoutContext, space: Option<&str>) {
        for rec in self.links.values() {
            if self.common_container(&rec.start_id, &rec.end_id).as_deref() == space {
                ctx.add_link(LinkContext::from(rec));
            }
        }
    }

    fn container_context(&self, id: &str) -> LayoutContext {
        let Some(rec) = self.nodes.get(id) else {
            return LayoutContext::new(self.config.clone());
        };
        let padding = rec.container_padding().unwrap_or(Padding::ZERO);
        let mut ctx = LayoutContext::new(self.config.for_container(id, padding));
        for child in rec.child_node_ids() {
            let Some(child) = self.nodes.get(child) else {
                continue;
            };
            if child.read_only {
                ctx.add_node_to_map(NodeContext::from(child));
            } else {
                ctx.add_node(NodeContext::from(child));
            }
        }
        // Everything else is context for coordinate lookups only.
        for other in self.nodes.values() {
            if ctx.node_by_id(&other.id).is_none() {
                ctx.add_node_to_map(NodeContext::from(other));
            }
        }
        self.add_links_in(&mut ctx, Some(id));
        ctx
    }

    fn top_level_context(&self) -> LayoutContext {
        let mut ctx = LayoutContext::new(self.config.clone());
        for root in &self.roots {
            let Some(rec) = self.nodes.get(root) else {
                continue;
            };
            if rec.read_only {
                ctx.add_node_to_map(NodeContext::from(rec));
            } else {
                ctx.add_node(NodeContext::from(rec));
            }
        }
        for other in self.nodes.values() {
            if ctx.node_by_id(&other.id).is_none() {
                ctx.add_node_to_map(NodeContext::from(other));
            }
        }
        self.add_links_in(&mut ctx, None);
        ctx
    }

    /// Copies what the layout marked dirty into the staging records.
    fn apply(&mut self, ctx: &LayoutContext) {
        for node in ctx.dirty_nodes() {
            let Some(rec) = self.nodes.get_mut(node.id()) else {
                continue;
            };
            if rec.read_only {
                continue;
            }
            rec.position = node.position();
            rec.label_position = node.label_position();
            rec.label_rotation = node.label_rotation();
        }
        for link in ctx.dirty_links() {
            let Some(rec) = self.links.get_mut(link.id()) else {
                continue;
            };
            rec.points = link.points().clone();
            rec.coordinate_space_id = link.coordinate_space().map(str::to_string);
            rec.label_position = link.label_position();
            rec.label_rotation = link.label_rotation();
        }
    }

    /// Grows a container around its laid-out children plus padding.
    fn fit_container(&mut self, id: &str, padding: Option<Padding>) {
        let Some(rec) = self.nodes.get(id) else {
            return;
        };
        let padding = padding.or(rec.container_padding()).unwrap_or(Padding::ZERO);
        let placed: Vec<Rect> = rec
            .child_node_ids()
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .filter_map(placed_bounds)
            .collect();
        let content = union_all(&placed);
        let Some(rec) = self.nodes.get_mut(id) else {
            return;
        };
        if let Some(container) = rec.container.as_mut() {
            container.padding = padding;
        }
        let Some(content) = content else {
            return;
        };
        let width = content.max_x().max(0.0) + padding.horizontal();
        let height = content.max_y().max(0.0) + padding.vertical();
        let measured = rec.bounds.map(|b| b.size).unwrap_or_else(|| size(0.0, 0.0));
        rec.bounds = Some(Rect::new(
            point(0.0, 0.0),
            size(width.max(measured.width), height.max(measured.height)),
        ));
        rec.content_bounds = Some(content.translate(padding.origin_offset()));
    }
}

fn placed_bounds(rec: &NodeRecord) -> Option<Rect> {
    rec.bounds.map(|b| b.translate(rec.position.to_vector()))
}

impl DiagramState {
    /// Starts a pass against `old`, the snapshot taken before the change being rendered. Bumps
    /// the render generation, so any pass already in flight becomes stale.
    pub fn begin_render(&mut self, old: AnimationSnapshot) -> RenderPass {
        self.generation.bump();
        let config = LayoutConfig {
            layout_name: self.config.layout_name.clone(),
            global_attributes: self.config.layout_attributes.clone(),
            container_id: None,
            container_padding: None,
            locale_is_right_to_left: self.config.locale_is_right_to_left,
            component_size: self.config.component_size,
            current_viewport: self.viewport,
            dirty_ids: old.scope().dirty_ids(),
        };
        RenderPass {
            stamp: self.generation.stamp(),
            old,
            nodes: self.nodes.clone(),
            links: self.links.clone(),
            roots: self.root_ids(),
            config,
            status: PassStatus::Pending,
            data_change: false,
        }
    }

    /// Applies a completed pass and reconciles the before/after snapshots. `None` when the pass
    /// did not complete or a newer generation has started since.
    pub fn commit(&mut self, pass: RenderPass) -> Option<Transitions> {
        if pass.status != PassStatus::Complete || !pass.stamp.is_current() {
            return None;
        }
        for (id, staged) in pass.nodes {
            let Some(rec) = self.nodes.get_mut(&id) else {
                continue;
            };
            rec.position = staged.position;
            rec.content_offset = staged.content_offset;
            rec.bounds = staged.bounds;
            rec.content_bounds = staged.content_bounds;
            rec.label_bounds = staged.label_bounds;
            rec.label_position = staged.label_position;
            rec.label_rotation = staged.label_rotation;
            rec.rendered = staged.rendered;
            if let (Some(live), Some(staged)) = (rec.container.as_mut(), staged.container) {
                live.padding = staged.padding;
            }
        }
        for (id, staged) in pass.links {
            let Some(rec) = self.links.get_mut(&id) else {
                continue;
            };
            rec.points = staged.points;
            rec.coordinate_space_id = staged.coordinate_space_id;
            rec.label_position = staged.label_position;
            rec.label_bounds = staged.label_bounds;
            rec.label_rotation = staged.label_rotation;
        }

        let animate =
            !pass.data_change || self.config.animation_on_data_change == AnimationMode::Auto;
        let mut old = pass.old;
        let scope = old.scope().clone();
        let new = AnimationSnapshot::capture(self, &scope);
        let directives = if animate {
            reconcile(&mut old, &new)
        } else {
            Vec::new()
        };
        debug!(
            generation = pass.stamp.value(),
            directives = directives.len(),
            "render pass committed"
        );
        Some(Transitions {
            old,
            new,
            directives,
        })
    }
}
