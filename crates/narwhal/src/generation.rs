use std::cell::Cell;
use std::rc::Rc;

/// Monotonic render-generation counter shared by a diagram and its in-flight passes.
#[derive(Debug, Clone, Default)]
pub struct RenderGeneration(Rc<Cell<u64>>);

impl RenderGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.get()
    }

    /// Starts a new generation, invalidating every stamp taken so far.
    pub fn bump(&self) -> u64 {
        let next = self.0.get().wrapping_add(1);
        self.0.set(next);
        next
    }

    pub fn stamp(&self) -> GenerationStamp {
        GenerationStamp {
            counter: self.clone(),
            value: self.current(),
        }
    }
}

/// The generation a pass started in.
#[derive(Debug, Clone)]
pub struct GenerationStamp {
    counter: RenderGeneration,
    value: u64,
}

impl GenerationStamp {
    pub fn value(&self) -> u64 {
        self.value
    }

    /// `false` once any later pass or data event has bumped the counter.
    pub fn is_current(&self) -> bool {
        self.counter.current() == self.value
    }
}
