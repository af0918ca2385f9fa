//! Layout plug-in surface.
//!
//! A layout is an async function over a [`LayoutContext`]. The engine builds one context per
//! disclosed container (children only, post-order) and one for the top level, awaits the
//! layout on each, then applies whatever the layout marked dirty.

mod config;
mod context;
mod grid;

pub use config::LayoutConfig;
pub use context::{LayoutContext, LinkContext, NodeContext};
pub use grid::GridLayout;

use crate::error::LayoutError;
use futures::future::{self, LocalBoxFuture};
use std::fmt;

pub type LayoutFuture<'a> = LocalBoxFuture<'a, Result<(), LayoutError>>;

pub trait Layout {
    /// Name used in error reports.
    fn name(&self) -> &str;

    fn layout<'a>(&'a self, ctx: &'a mut LayoutContext) -> LayoutFuture<'a>;
}

/// Adapts a synchronous closure into a [`Layout`].
pub struct FnLayout<F> {
    name: String,
    f: F,
}

impl<F> FnLayout<F>
where
    F: Fn(&mut LayoutContext) -> Result<(), LayoutError>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for FnLayout<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLayout").field("name", &self.name).finish()
    }
}

impl<F> Layout for FnLayout<F>
where
    F: Fn(&mut LayoutContext) -> Result<(), LayoutError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn layout<'a>(&'a self, ctx: &'a mut LayoutContext) -> LayoutFuture<'a> {
        Box::pin(future::ready((self.f)(ctx)))
    }
}
