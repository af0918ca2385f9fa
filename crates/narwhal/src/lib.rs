#![forbid(unsafe_code)]

//! Headless diagram layout coordination.
//!
//! Design goals:
//! - one place that owns visible records, disclosure state and promoted links
//! - layouts are pluggable and may complete asynchronously; stale passes never commit
//! - every render yields old/new snapshots and the transitions between them
//! - runtime-agnostic async APIs (no specific executor required)

pub mod animation;
pub mod config;
pub mod coords;
pub mod error;
pub mod events;
pub mod generation;
pub mod geom;
pub mod layout;
pub mod model;
pub mod promote;
pub mod render;
pub mod shape;
pub mod state;

pub use narwhal_graphlib as graphlib;

pub use animation::{
    AnimationSnapshot, LinkSnapshot, LinkTransition, NodeSnapshot, NodeTransition, SnapshotScope,
    Transition, TransitionKind, reconcile,
};
pub use config::{AnimationMode, DiagramConfig, PromotedLinkBehavior};
pub use error::{Error, LayoutError, Result};
pub use events::DataEvent;
pub use generation::{GenerationStamp, RenderGeneration};
pub use layout::{
    FnLayout, GridLayout, Layout, LayoutConfig, LayoutContext, LayoutFuture, LinkContext,
    NodeContext,
};
pub use model::{
    Connectivity, DiagramData, LinkData, LinkId, LinkPath, LinkRecord, NodeData, NodeRecord,
    Padding,
};
pub use promote::{DiscardReason, PromotedLinkResolver, Promotion};
pub use render::{
    BoxMeasurer, DiagramEngine, NodeMeasurement, PassStatus, RenderOutcome, RenderPass, Renderer,
    Transitions,
};
pub use shape::{DiagramShape, LabelGeometry};
pub use state::{DataSource, DataTree, DiagramState};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
