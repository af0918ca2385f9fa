use super::{PassStatus, Renderer, Transitions};
use crate::animation::{AnimationSnapshot, SnapshotScope};
use crate::config::DiagramConfig;
use crate::error::Result;
use crate::events::DataEvent;
use crate::layout::Layout;
use crate::model::DiagramData;
use crate::state::DiagramState;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Rendered(Transitions),
    /// A newer render or data event overtook this one; nothing was applied.
    Superseded,
}

impl RenderOutcome {
    pub fn transitions(&self) -> Option<&Transitions> {
        match self {
            RenderOutcome::Rendered(t) => Some(t),
            RenderOutcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, RenderOutcome::Superseded)
    }
}

/// Drives a diagram: every mutation captures a before-snapshot, runs a layout pass and, if the
/// pass is still current when the layout resolves, commits it and reports the transitions.
///
/// All handles are `Rc`s; the engine is single-threaded and executor-agnostic. Futures returned
/// by its methods may overlap, the later one wins.
pub struct DiagramEngine<R> {
    state: Rc<RefCell<DiagramState>>,
    renderer: Rc<RefCell<R>>,
    layout: Rc<dyn Layout>,
}

impl<R> Clone for DiagramEngine<R> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            renderer: Rc::clone(&self.renderer),
            layout: Rc::clone(&self.layout),
        }
    }
}

impl<R: Renderer> DiagramEngine<R> {
    pub fn new(config: DiagramConfig, renderer: R, layout: impl Layout + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(DiagramState::new(config))),
            renderer: Rc::new(RefCell::new(renderer)),
            layout: Rc::new(layout),
        }
    }

    pub fn state(&self) -> Ref<'_, DiagramState> {
        self.state.borrow()
    }

    pub fn state_handle(&self) -> Rc<RefCell<DiagramState>> {
        Rc::clone(&self.state)
    }

    pub fn renderer(&self) -> Ref<'_, R> {
        self.renderer.borrow()
    }

    pub async fn load(&self, data: DiagramData) -> Result<RenderOutcome> {
        let old = {
            let mut state = self.state.borrow_mut();
            let old = AnimationSnapshot::capture(&state, &SnapshotScope::Full);
            state.load(data);
            old
        };
        self.run_pass(old, false).await
    }

    /// Lays the current content out again without changing it.
    pub async fn render(&self) -> Result<RenderOutcome> {
        let old = AnimationSnapshot::capture(&self.state.borrow(), &SnapshotScope::Full);
        self.run_pass(old, false).await
    }

    pub async fn expand(&self, id: &str) -> Result<RenderOutcome> {
        let old = {
            let mut state = self.state.borrow_mut();
            let old = AnimationSnapshot::capture(&state, &state.scope_for_disclosure(id));
            state.expand(id)?;
            old
        };
        self.run_pass(old, false).await
    }

    pub async fn collapse(&self, id: &str) -> Result<RenderOutcome> {
        let old = {
            let mut state = self.state.borrow_mut();
            let old = AnimationSnapshot::capture(&state, &state.scope_for_disclosure(id));
            state.collapse(id)?;
            old
        };
        self.run_pass(old, false).await
    }

    pub async fn set_expanded(&self, ids: Vec<String>) -> Result<RenderOutcome> {
        let old = {
            let mut state = self.state.borrow_mut();
            let old = AnimationSnapshot::capture(&state, &state.scope_for_expanded(&ids));
            state.set_expanded(ids)?;
            old
        };
        self.run_pass(old, false).await
    }

    pub async fn apply_event(&self, event: DataEvent) -> Result<RenderOutcome> {
        let old = {
            let mut state = self.state.borrow_mut();
            let old = AnimationSnapshot::capture(&state, &state.scope_for_event(&event));
            state.apply_event(event)?;
            old
        };
        self.run_pass(old, true).await
    }

    async fn run_pass(&self, old: AnimationSnapshot, data_change: bool) -> Result<RenderOutcome> {
        let mut pass = self.state.borrow_mut().begin_render(old);
        if data_change {
            pass = pass.for_data_change();
        }
        let layout = Rc::clone(&self.layout);
        match pass.run(&*layout, &self.renderer).await {
            Ok(PassStatus::Complete) => Ok(match self.state.borrow_mut().commit(pass) {
                Some(t) => RenderOutcome::Rendered(t),
                None => RenderOutcome::Superseded,
            }),
            Ok(_) => Ok(RenderOutcome::Superseded),
            Err(err) => {
                warn!(generation = pass.generation(), %err, "layout failed; previous geometry kept");
                Err(err.into())
            }
        }
    }
}
