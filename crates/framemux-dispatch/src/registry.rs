use framemux_frame::is_reserved;
use tracing::{debug, warn};

use crate::error::{DispatchError, Result};
use crate::handler::Handler;
use crate::reliability::{ChannelState, ReliabilityTable};

type HandlerFactory = Box<dyn FnMut() -> Box<dyn Handler> + Send>;

struct Entry {
    handler: Box<dyn Handler>,
    reliable: bool,
}

/// A handler together with its reliability channel, borrowed for one frame.
pub(crate) struct Route<'a> {
    pub handler: &'a mut dyn Handler,
    /// `Some` exactly when the handler was registered as reliable.
    pub channel: Option<&'a mut ChannelState>,
}

/// Identifier-keyed handler table.
///
/// Registering a reliable handler opens its channel at
/// [`ChannelState::AwaitingEven`]; deregistering closes it. Deferred
/// ("ensured") registrations queue up as factories and are applied in order
/// by [`drain_ensured`](Self::drain_ensured).
pub struct HandlerRegistry {
    entries: [Option<Entry>; 256],
    channels: ReliabilityTable,
    ensured: Vec<HandlerFactory>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: std::array::from_fn(|_| None),
            channels: ReliabilityTable::new(),
            ensured: Vec::new(),
        }
    }

    /// Register a handler under its own identifier.
    pub fn register<H: Handler + 'static>(&mut self, handler: H) -> Result<()> {
        self.register_boxed(Box::new(handler))
    }

    /// Register an already boxed handler.
    pub fn register_boxed(&mut self, handler: Box<dyn Handler>) -> Result<()> {
        let id = handler.id();
        if self.contains(id) {
            warn!(id, "identifier already registered");
            return Err(DispatchError::DuplicateIdentifier(id));
        }
        self.insert(handler);
        Ok(())
    }

    /// A registry whose first entry is `handler`.
    pub(crate) fn seeded(handler: Box<dyn Handler>) -> Self {
        let mut registry = Self::new();
        registry.insert(handler);
        registry
    }

    fn insert(&mut self, handler: Box<dyn Handler>) {
        let id = handler.id();
        let reliable = handler.is_reliable();
        if reliable {
            self.channels.open(id);
        }
        self.entries[usize::from(id)] = Some(Entry { handler, reliable });
        debug!(id, reliable, "registered handler");
    }

    /// Remove the handler for `id` and close its channel. Returns the handler
    /// if one was registered.
    pub fn deregister(&mut self, id: u8) -> Option<Box<dyn Handler>> {
        let entry = self.entries[usize::from(id)].take()?;
        self.channels.close(id);
        debug!(id, "deregistered handler");
        Some(entry.handler)
    }

    /// Every registered identifier except session control, ascending.
    pub fn list_ids(&self) -> Vec<u8> {
        (0..=u8::MAX)
            .filter(|&id| !is_reserved(id) && self.contains(id))
            .collect()
    }

    pub fn contains(&self, id: u8) -> bool {
        self.entries[usize::from(id)].is_some()
    }

    /// Whether `id` is registered as reliable. `None` if not registered.
    pub fn is_reliable(&self, id: u8) -> Option<bool> {
        self.entries[usize::from(id)]
            .as_ref()
            .map(|entry| entry.reliable)
    }

    /// Number of registered handlers, session control included.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current channel state for a reliable identifier.
    pub fn channel_state(&self, id: u8) -> Option<ChannelState> {
        self.channels.get(id)
    }

    /// Put every reliable channel back to `AwaitingEven`.
    pub fn reset_channels(&mut self) {
        for id in 0..=u8::MAX {
            if self.is_reliable(id) == Some(true) {
                self.channels.open(id);
            }
        }
    }

    /// Queue a deferred registration.
    ///
    /// The factory runs on every [`drain_ensured`](Self::drain_ensured) that
    /// reaches it, so the same batch can be re-applied after handlers were
    /// removed.
    pub fn enqueue_ensured<F, H>(&mut self, mut factory: F)
    where
        F: FnMut() -> H + Send + 'static,
        H: Handler + 'static,
    {
        self.ensured
            .push(Box::new(move || Box::new(factory()) as Box<dyn Handler>));
    }

    /// Number of queued factories.
    pub fn ensured_len(&self) -> usize {
        self.ensured.len()
    }

    /// Run the queued factories in order and register what they build.
    ///
    /// Stops at the first failure. Registrations applied before the failure
    /// stay in place and later factories are not invoked.
    pub fn drain_ensured(&mut self) -> Result<()> {
        for index in 0..self.ensured.len() {
            let handler = (self.ensured[index])();
            self.register_boxed(handler)?;
        }
        Ok(())
    }

    pub(crate) fn route(&mut self, id: u8) -> Option<Route<'_>> {
        let entry = self.entries[usize::from(id)].as_mut()?;
        let channel = if entry.reliable {
            self.channels.get_mut(id)
        } else {
            None
        };
        Some(Route {
            handler: entry.handler.as_mut(),
            channel,
        })
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<u8> = (0..=u8::MAX).filter(|&id| self.contains(id)).collect();
        f.debug_struct("HandlerRegistry")
            .field("ids", &ids)
            .field("channels", &self.channels.len())
            .field("ensured", &self.ensured.len())
            .finish()
    }
}
