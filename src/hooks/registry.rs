//! Handler registration and scoped suppression.

use super::{EventKind, HostEvent};
use crate::types::RecordId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Handler = Arc<dyn Fn(&HostEvent) + Send + Sync>;

/// Identifier of a registered handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

/// An active suppression entry.
#[derive(Clone, Debug)]
struct Suppression {
    token: u64,
    handlers: Vec<HandlerId>,
    /// `None` suppresses the handlers for every record.
    record_id: Option<RecordId>,
}

impl Suppression {
    fn covers(&self, handler: HandlerId, record_id: RecordId) -> bool {
        self.handlers.contains(&handler) && self.record_id.map_or(true, |r| r == record_id)
    }
}

/// Explicit observer interface for host events.
///
/// Handlers are invoked synchronously, in registration order, outside of any
/// registry lock, so a handler may subscribe or suppress without deadlocking.
pub struct HookRegistry {
    handlers: RwLock<HashMap<EventKind, Vec<(HandlerId, Handler)>>>,
    suppressions: Mutex<Vec<Suppression>>,
    next_id: AtomicU64,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            suppressions: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a handler for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&HostEvent) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        for list in handlers.values_mut() {
            if let Some(pos) = list.iter().position(|(hid, _)| *hid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Number of handlers registered for a kind.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Detach `handlers` (for one record, or all) until the guard drops.
    /// Every other handler keeps receiving events.
    ///
    /// The entry is removed when the returned guard is dropped, including on
    /// early returns and unwinding. Any event for a covered record dispatched
    /// while the guard lives skips the handlers, whichever thread fires it.
    pub fn suppress(
        &self,
        handlers: &[HandlerId],
        record_id: Option<RecordId>,
    ) -> SuppressionGuard<'_> {
        let token = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.suppressions.lock().push(Suppression {
            token,
            handlers: handlers.to_vec(),
            record_id,
        });
        tracing::debug!(?handlers, ?record_id, token, "hook suppression pushed");
        SuppressionGuard {
            registry: self,
            token,
        }
    }

    /// Whether `handler` is currently detached for `record_id`.
    pub fn is_suppressed(&self, handler: HandlerId, record_id: RecordId) -> bool {
        self.suppressions
            .lock()
            .iter()
            .any(|s| s.covers(handler, record_id))
    }

    /// Dispatch an event. Returns the number of handlers invoked.
    pub fn dispatch(&self, event: &HostEvent) -> usize {
        let kind = event.kind();
        let record_id = event.record_id();

        let handlers: Vec<(HandlerId, Handler)> = self
            .handlers
            .read()
            .get(&kind)
            .map(|list| list.iter().map(|(id, h)| (*id, Arc::clone(h))).collect())
            .unwrap_or_default();

        let mut invoked = 0;
        for (id, handler) in &handlers {
            if self.is_suppressed(*id, record_id) {
                tracing::debug!(handler = id.0, %record_id, "dispatch suppressed");
                continue;
            }
            handler(event);
            invoked += 1;
        }
        invoked
    }

    fn release(&self, token: u64) {
        let mut suppressions = self.suppressions.lock();
        if let Some(pos) = suppressions.iter().position(|s| s.token == token) {
            suppressions.remove(pos);
        }
        tracing::debug!(token, "hook suppression popped");
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases a suppression entry on drop.
#[must_use = "suppression ends as soon as the guard is dropped"]
pub struct SuppressionGuard<'a> {
    registry: &'a HookRegistry,
    token: u64,
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(self.token);
    }
}
