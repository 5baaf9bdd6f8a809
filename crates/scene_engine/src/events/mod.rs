//! Typed publish/subscribe channel
//!
//! An [`EventEmitter<L>`] broadcasts to every [`EventListener<L>`] registered
//! with it, where `L` is a capability trait (usually a `dyn Trait` whose
//! methods are the notifications). Key properties:
//! - Registration is symmetric: both sides record the link, and dropping
//!   either side removes it from the other
//! - Dispatch works on a snapshot and re-checks each link right before the
//!   call, so listeners may unregister themselves or others mid-dispatch
//! - A listener with receiving disabled stays registered but is skipped
//! - A listener whose handler is already running further up the stack is
//!   skipped instead of being re-entered
//!
//! Emitters are cheap reference-counted handles. Cloning one out of the scene
//! before dispatching lets callbacks receive `&mut Scene`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

mod listeners;

pub use listeners::{
    DragDropListener, FocusListener, GameObjectListener, ObjectListener, TransformListener,
    ValueChangedListener,
};

struct EmitterShared<L: ?Sized> {
    listeners: RefCell<Vec<Weak<ListenerShared<L>>>>,
}

struct ListenerShared<L: ?Sized> {
    receiving: Cell<bool>,
    emitters: RefCell<Vec<Weak<EmitterShared<L>>>>,
    handler: RefCell<Box<L>>,
}

impl<L: ?Sized> Drop for EmitterShared<L> {
    fn drop(&mut self) {
        let me: *const Self = self;
        for weak in self.listeners.get_mut().drain(..) {
            if let Some(listener) = weak.upgrade() {
                listener
                    .emitters
                    .borrow_mut()
                    .retain(|emitter| !std::ptr::eq(emitter.as_ptr(), me));
            }
        }
    }
}

fn contains_listener<L: ?Sized>(emitter: &EmitterShared<L>, listener: &Rc<ListenerShared<L>>) -> bool {
    let target = Rc::as_ptr(listener);
    emitter
        .listeners
        .borrow()
        .iter()
        .any(|weak| std::ptr::eq(weak.as_ptr(), target))
}

fn unlink<L: ?Sized>(emitter: &Rc<EmitterShared<L>>, listener: &Rc<ListenerShared<L>>) -> bool {
    let listener_ptr = Rc::as_ptr(listener);
    let removed = {
        let mut listeners = emitter.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|weak| !std::ptr::eq(weak.as_ptr(), listener_ptr));
        listeners.len() != before
    };

    let emitter_ptr = Rc::as_ptr(emitter);
    listener
        .emitters
        .borrow_mut()
        .retain(|weak| !std::ptr::eq(weak.as_ptr(), emitter_ptr));
    removed
}

/// Sending side of a typed notification channel
pub struct EventEmitter<L: ?Sized> {
    shared: Rc<EmitterShared<L>>,
}

impl<L: ?Sized> Clone for EventEmitter<L> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<L: ?Sized> Default for EventEmitter<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> fmt::Debug for EventEmitter<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<L: ?Sized> EventEmitter<L> {
    /// Create an emitter with no listeners
    pub fn new() -> Self {
        Self {
            shared: Rc::new(EmitterShared {
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Link a listener to this emitter
    ///
    /// Returns `false` if it was already registered.
    pub fn register_listener(&self, listener: &EventListener<L>) -> bool {
        if self.is_registered(listener) {
            return false;
        }
        self.shared
            .listeners
            .borrow_mut()
            .push(Rc::downgrade(&listener.shared));
        listener
            .shared
            .emitters
            .borrow_mut()
            .push(Rc::downgrade(&self.shared));
        true
    }

    /// Remove the link to a listener
    ///
    /// Returns `false` if it was not registered.
    pub fn unregister_listener(&self, listener: &EventListener<L>) -> bool {
        unlink(&self.shared, &listener.shared)
    }

    /// Remove the link to a listener through a weak handle
    ///
    /// This is how a handler unregisters itself from inside a callback.
    pub fn unregister_handle(&self, handle: &ListenerHandle<L>) -> bool {
        handle
            .shared
            .upgrade()
            .is_some_and(|listener| unlink(&self.shared, &listener))
    }

    /// Check whether a listener is currently linked
    pub fn is_registered(&self, listener: &EventListener<L>) -> bool {
        contains_listener(&self.shared, &listener.shared)
    }

    /// Number of live registered listeners
    pub fn listener_count(&self) -> usize {
        self.shared
            .listeners
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Force-unregister every listener
    pub fn unregister_all(&self) {
        let listeners = std::mem::take(&mut *self.shared.listeners.borrow_mut());
        let me = Rc::as_ptr(&self.shared);
        for weak in listeners {
            if let Some(listener) = weak.upgrade() {
                listener
                    .emitters
                    .borrow_mut()
                    .retain(|emitter| !std::ptr::eq(emitter.as_ptr(), me));
            }
        }
    }

    /// Check whether two handles refer to the same emitter
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// Invoke `method` on every registered, receiving listener in
    /// registration order
    ///
    /// Returns the number of listeners that were called.
    pub fn propagate(&self, mut method: impl FnMut(&mut L)) -> usize {
        let snapshot = self.shared.listeners.borrow().clone();
        let mut delivered = 0;

        for weak in snapshot {
            let Some(listener) = weak.upgrade() else {
                continue;
            };
            if !listener.receiving.get() || !contains_listener(&self.shared, &listener) {
                continue;
            }
            let Ok(mut handler) = listener.handler.try_borrow_mut() else {
                log::trace!("Skipping listener that is already handling an event");
                continue;
            };
            method(&mut **handler);
            delivered += 1;
        }

        delivered
    }
}

/// Receiving side of a typed notification channel
///
/// Owns the handler. Dropping the listener unregisters it everywhere.
pub struct EventListener<L: ?Sized> {
    shared: Rc<ListenerShared<L>>,
}

impl<L: ?Sized> fmt::Debug for EventListener<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener")
            .field("receiving", &self.receives_events())
            .field("emitters", &self.emitter_count())
            .finish()
    }
}

impl<L: ?Sized> EventListener<L> {
    /// Create a listener around a handler
    pub fn new(handler: Box<L>) -> Self {
        Self {
            shared: Rc::new(ListenerShared {
                receiving: Cell::new(true),
                emitters: RefCell::new(Vec::new()),
                handler: RefCell::new(handler),
            }),
        }
    }

    /// Weak handle usable from inside the handler itself
    pub fn handle(&self) -> ListenerHandle<L> {
        ListenerHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Enable or suppress delivery without unregistering
    pub fn set_receive_events(&self, receiving: bool) {
        self.shared.receiving.set(receiving);
    }

    /// Whether the listener currently accepts events
    pub fn receives_events(&self) -> bool {
        self.shared.receiving.get()
    }

    /// Number of live emitters this listener is registered with
    pub fn emitter_count(&self) -> usize {
        self.shared
            .emitters
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Check whether this listener is linked to an emitter
    pub fn is_registered_with(&self, emitter: &EventEmitter<L>) -> bool {
        emitter.is_registered(self)
    }

    /// Unregister from every emitter
    pub fn unregister_all(&self) {
        let emitters = std::mem::take(&mut *self.shared.emitters.borrow_mut());
        let me = Rc::as_ptr(&self.shared);
        for weak in emitters {
            if let Some(emitter) = weak.upgrade() {
                emitter
                    .listeners
                    .borrow_mut()
                    .retain(|listener| !std::ptr::eq(listener.as_ptr(), me));
            }
        }
    }

    /// Run a closure against the handler
    ///
    /// Returns `None` while the handler is executing a callback.
    pub fn with_handler<R>(&self, f: impl FnOnce(&mut L) -> R) -> Option<R> {
        let mut handler = self.shared.handler.try_borrow_mut().ok()?;
        Some(f(&mut **handler))
    }
}

impl<L: ?Sized> Drop for EventListener<L> {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

/// Non-owning reference to a listener
pub struct ListenerHandle<L: ?Sized> {
    shared: Weak<ListenerShared<L>>,
}

impl<L: ?Sized> Clone for ListenerHandle<L> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<L: ?Sized> fmt::Debug for ListenerHandle<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl<L: ?Sized> ListenerHandle<L> {
    /// Whether the owning listener still exists
    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }

    /// Enable or suppress delivery; no-op once the listener is gone
    pub fn set_receive_events(&self, receiving: bool) {
        if let Some(shared) = self.shared.upgrade() {
            shared.receiving.set(receiving);
        }
    }
}
