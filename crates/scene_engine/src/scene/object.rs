//! Lifecycle state shared by GameObjects and Components

use std::cell::Cell;

use super::{GameObjectId, ObjectId, Scene, SceneError, SceneResult};
use crate::events::{EventEmitter, ObjectListener};

/// Enabled / started / destroy state of one object
///
/// The recursive enabled flag is memoized: `None` means it must be recomputed
/// from the direct flag and the ancestor chain on the next query.
pub struct ObjectState {
    instance_id: u64,
    pub(crate) enabled: bool,
    pub(crate) pre_started: bool,
    pub(crate) started: bool,
    pub(crate) waiting_to_be_destroyed: bool,
    pub(crate) recursive_enabled: Cell<Option<bool>>,
    pub(crate) events: EventEmitter<dyn ObjectListener>,
}

impl std::fmt::Debug for ObjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectState")
            .field("instance_id", &self.instance_id)
            .field("enabled", &self.enabled)
            .field("started", &self.started)
            .field("waiting_to_be_destroyed", &self.waiting_to_be_destroyed)
            .finish()
    }
}

impl ObjectState {
    pub(crate) fn new(instance_id: u64) -> Self {
        Self {
            instance_id,
            enabled: true,
            pre_started: false,
            started: false,
            waiting_to_be_destroyed: false,
            recursive_enabled: Cell::new(None),
            events: EventEmitter::new(),
        }
    }

    /// Monotonic creation number, unique within the scene
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    /// Direct enabled flag
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `on_pre_start` has run
    pub fn is_pre_started(&self) -> bool {
        self.pre_started
    }

    /// Whether `on_start` has run
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether the object was marked for destruction
    pub fn is_waiting_to_be_destroyed(&self) -> bool {
        self.waiting_to_be_destroyed
    }

    /// Emitter for enable and destroy notifications
    pub fn events(&self) -> &EventEmitter<dyn ObjectListener> {
        &self.events
    }

    pub(crate) fn invalidate_recursive(&self) {
        self.recursive_enabled.set(None);
    }
}

impl Scene {
    /// Lifecycle state of a GameObject or Component
    pub fn object_state(&self, id: ObjectId) -> Option<&ObjectState> {
        match id {
            ObjectId::GameObject(go) => self.objects.get(go).map(|data| &data.object),
            ObjectId::Component(cid) => self.components.get(cid).map(|slot| &slot.object),
        }
    }

    fn object_state_mut(&mut self, id: ObjectId) -> Option<&mut ObjectState> {
        match id {
            ObjectId::GameObject(go) => self.objects.get_mut(go).map(|data| &mut data.object),
            ObjectId::Component(cid) => self.components.get_mut(cid).map(|slot| &mut slot.object),
        }
    }

    /// Clone of the enable/destroy emitter of an object
    pub fn object_events(&self, id: impl Into<ObjectId>) -> Option<EventEmitter<dyn ObjectListener>> {
        self.object_state(id.into()).map(|state| state.events.clone())
    }

    pub(crate) fn require_live(&self, id: ObjectId) -> SceneResult<&ObjectState> {
        let state = self.object_state(id).ok_or(match id {
            ObjectId::GameObject(go) => SceneError::StaleGameObject(go),
            ObjectId::Component(cid) => SceneError::StaleComponent(cid),
        })?;
        if state.waiting_to_be_destroyed {
            log::warn!("Rejected mutation of {:?}: waiting to be destroyed", id);
            return Err(SceneError::Destroyed(id));
        }
        Ok(state)
    }

    /// Direct enabled flag; `false` for stale handles
    pub fn is_enabled(&self, id: impl Into<ObjectId>) -> bool {
        self.object_state(id.into()).is_some_and(ObjectState::is_enabled)
    }

    /// Whether the object is marked for destruction; `false` for stale handles
    pub fn is_waiting_to_be_destroyed(&self, id: impl Into<ObjectId>) -> bool {
        self.object_state(id.into())
            .is_some_and(ObjectState::is_waiting_to_be_destroyed)
    }

    /// Effective enabled state: own flag AND every ancestor's flag, and for a
    /// component, being attached to an owner that is itself enabled
    /// recursively
    ///
    /// Memoized per object; the cache is dropped for a subtree whenever an
    /// ancestor is toggled or the subtree is re-parented.
    pub fn is_enabled_recursively(&self, id: impl Into<ObjectId>) -> bool {
        let id = id.into();
        let Some(state) = self.object_state(id) else {
            return false;
        };
        if let Some(cached) = state.recursive_enabled.get() {
            return cached;
        }

        let value = state.enabled
            && match id {
                ObjectId::GameObject(go) => self
                    .objects
                    .get(go)
                    .and_then(|data| data.parent)
                    .map_or(true, |parent| self.is_enabled_recursively(parent)),
                ObjectId::Component(cid) => self
                    .components
                    .get(cid)
                    .and_then(|slot| slot.owner)
                    .is_some_and(|owner| self.is_enabled_recursively(owner)),
            };
        state.recursive_enabled.set(Some(value));
        value
    }

    /// Toggle the direct enabled flag
    ///
    /// No-op when unchanged. Otherwise raises `on_enabled_changed` for the
    /// object, then `on_enabled_recursively_changed` for every object in the
    /// affected subtree whose effective state actually flipped.
    pub fn set_enabled(&mut self, id: impl Into<ObjectId>, enabled: bool) -> SceneResult<()> {
        let id = id.into();
        if self.require_live(id)?.enabled == enabled {
            return Ok(());
        }

        let affected = self.affected_objects(id);
        let before = self.snapshot_recursive(&affected);

        if let Some(state) = self.object_state_mut(id) {
            state.enabled = enabled;
        }
        self.invalidate_recursive_cache(&affected);

        if let Some(events) = self.object_state(id).map(|state| state.events.clone()) {
            events.propagate(|l| l.on_enabled_changed(self, id, enabled));
        }
        self.notify_recursive_flips(&affected, &before);
        Ok(())
    }

    fn affected_objects(&self, id: ObjectId) -> Vec<ObjectId> {
        match id {
            ObjectId::GameObject(go) => self.subtree_objects(go),
            ObjectId::Component(_) => vec![id],
        }
    }

    /// Pre-order list of a GameObject, its components, then its descendants
    pub(crate) fn subtree_objects(&self, root: GameObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(go) = stack.pop() {
            let Some(data) = self.objects.get(go) else {
                continue;
            };
            out.push(ObjectId::GameObject(go));
            out.extend(data.components.iter().map(|&cid| ObjectId::Component(cid)));
            stack.extend(data.children.iter().rev().copied());
        }
        out
    }

    pub(crate) fn snapshot_recursive(&self, objects: &[ObjectId]) -> Vec<bool> {
        objects
            .iter()
            .map(|&id| self.is_enabled_recursively(id))
            .collect()
    }

    pub(crate) fn invalidate_recursive_cache(&self, objects: &[ObjectId]) {
        for &id in objects {
            if let Some(state) = self.object_state(id) {
                state.invalidate_recursive();
            }
        }
    }

    /// Fire recursive-enabled notifications for objects whose effective
    /// state differs from `before`
    pub(crate) fn notify_recursive_flips(&mut self, objects: &[ObjectId], before: &[bool]) {
        for (&id, &was) in objects.iter().zip(before) {
            let Some(events) = self.object_state(id).map(|state| state.events.clone()) else {
                continue;
            };
            let now = self.is_enabled_recursively(id);
            if now == was {
                continue;
            }
            if let ObjectId::Component(cid) = id {
                self.with_behaviour(cid, |behaviour, scene| {
                    behaviour.on_enabled_changed(scene, cid, now);
                });
            }
            events.propagate(|l| l.on_enabled_recursively_changed(self, id, now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FlipRecorder {
        log: Rc<RefCell<Vec<(ObjectId, bool)>>>,
    }

    impl ObjectListener for FlipRecorder {
        fn on_enabled_recursively_changed(&mut self, _scene: &mut Scene, object: ObjectId, enabled: bool) {
            self.log.borrow_mut().push((object, enabled));
        }
    }

    #[test]
    fn test_disabling_root_disables_descendants_lazily() {
        let mut scene = Scene::new();
        let root = scene.create_game_object("root");
        let child = scene.create_child(root, "child").unwrap();
        let grandchild = scene.create_child(child, "grandchild").unwrap();
        assert!(scene.is_enabled_recursively(grandchild));

        scene.set_enabled(root, false).unwrap();

        assert!(scene.is_enabled(child));
        assert!(!scene.is_enabled_recursively(child));
        assert!(!scene.is_enabled_recursively(grandchild));

        scene.set_enabled(root, true).unwrap();
        assert!(scene.is_enabled_recursively(grandchild));
    }

    #[test]
    fn test_recursive_notification_only_for_flipped_objects() {
        let mut scene = Scene::new();
        let root = scene.create_game_object("root");
        let on = scene.create_child(root, "on").unwrap();
        let off = scene.create_child(root, "off").unwrap();
        scene.set_enabled(off, false).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Vec::new();
        for go in [root, on, off] {
            let listener: crate::events::EventListener<dyn ObjectListener> =
                crate::events::EventListener::new(Box::new(FlipRecorder { log: Rc::clone(&log) }));
            scene.object_events(go).unwrap().register_listener(&listener);
            listeners.push(listener);
        }

        scene.set_enabled(root, false).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![(ObjectId::from(root), false), (ObjectId::from(on), false)]
        );
    }

    #[test]
    fn test_set_enabled_same_value_is_noop() {
        let mut scene = Scene::new();
        let root = scene.create_game_object("root");
        assert!(scene.set_enabled(root, true).is_ok());
        assert!(scene.is_enabled_recursively(root));
    }

    #[test]
    fn test_set_enabled_on_destroyed_object_is_rejected() {
        let mut scene = Scene::new();
        let root = scene.create_game_object("root");
        let child = scene.create_child(root, "child").unwrap();
        scene.destroy(child).unwrap();

        let result = scene.set_enabled(child, false);
        assert_eq!(result, Err(SceneError::Destroyed(ObjectId::from(child))));
        assert!(scene.is_enabled(child));
    }
}
