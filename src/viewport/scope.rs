//! Per-generation cancellation scope.
//!
//! Each viewport generation owns one [`Scope`]. Retiring it cancels the token
//! its render loop checks every frame and removes every listener registered
//! under it, so handlers of a replaced viewport can never fire again.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug)]
pub struct Scope {
    generation: u64,
    token: CancellationToken,
}

impl Scope {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            token: CancellationToken::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn retire(&self) {
        if !self.token.is_cancelled() {
            log::debug!("Retiring scope of generation {}", self.generation);
        }
        self.token.cancel();
    }

    pub fn is_retired(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// What a listener was registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Pointer,
    Wheel,
    Keyboard,
    Resize,
}

type Handler<E, M> = Box<dyn FnMut(&E) -> Option<M>>;

struct Listener<E, M> {
    generation: u64,
    kind: ListenerKind,
    token: CancellationToken,
    handler: Handler<E, M>,
}

/// Event listeners grouped by the scope they were registered under.
pub struct ListenerRegistry<E, M> {
    listeners: Vec<Listener<E, M>>,
}

impl<E, M> Default for ListenerRegistry<E, M> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<E, M> fmt::Debug for ListenerRegistry<E, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E, M> ListenerRegistry<E, M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler that lives as long as `scope`. Registering on a retired scope is a no-op.
    pub fn register(
        &mut self,
        scope: &Scope,
        kind: ListenerKind,
        handler: impl FnMut(&E) -> Option<M> + 'static,
    ) {
        if scope.is_retired() {
            log::warn!(
                "Ignoring {:?} listener for retired generation {}",
                kind,
                scope.generation()
            );
            return;
        }
        self.listeners.push(Listener {
            generation: scope.generation(),
            kind,
            token: scope.token(),
            handler: Box::new(handler),
        });
    }

    /// Drop listeners whose scope was retired. Returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| !l.token.is_cancelled());
        let removed = before - self.listeners.len();
        if removed > 0 {
            log::debug!("Removed {} stale listeners", removed);
        }
        removed
    }

    /// Run every live listener on `event` and collect the messages they produce.
    pub fn dispatch(&mut self, event: &E) -> Vec<M> {
        self.prune();
        self.listeners
            .iter_mut()
            .filter_map(|listener| (listener.handler)(event))
            .collect()
    }

    /// [`dispatch`](Self::dispatch) restricted to listeners of one kind.
    pub fn dispatch_kind(&mut self, kind: ListenerKind, event: &E) -> Vec<M> {
        self.prune();
        self.listeners
            .iter_mut()
            .filter(|listener| listener.kind == kind)
            .filter_map(|listener| (listener.handler)(event))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn count_for_generation(&self, generation: u64) -> usize {
        self.listeners
            .iter()
            .filter(|l| l.generation == generation)
            .count()
    }

    pub fn count_of_kind(&self, kind: ListenerKind) -> usize {
        self.listeners.iter().filter(|l| l.kind == kind).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered { next_scheduled: bool },
    Cancelled,
}

/// Repeating frame task bound to a cancellation token.
#[derive(Debug)]
pub struct RenderLoop {
    token: CancellationToken,
    scheduled: bool,
    frames: u64,
}

impl RenderLoop {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            scheduled: true,
            frames: 0,
        }
    }

    /// Run one frame unless the loop was cancelled.
    pub fn frame<E>(
        &mut self,
        draw: impl FnOnce() -> Result<(), E>,
    ) -> Result<FrameOutcome, E> {
        if self.token.is_cancelled() {
            self.scheduled = false;
            return Ok(FrameOutcome::Cancelled);
        }
        draw()?;
        self.frames += 1;
        self.scheduled = !self.token.is_cancelled();
        Ok(FrameOutcome::Rendered {
            next_scheduled: self.scheduled,
        })
    }

    /// Ask for another frame. Refused once cancelled.
    pub fn request_frame(&mut self) -> bool {
        self.scheduled = !self.token.is_cancelled();
        self.scheduled
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled && !self.token.is_cancelled()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }
}
