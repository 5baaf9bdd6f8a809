//! Component trait and attachment
//!
//! A component is a boxed behaviour stored in a [`ComponentSlot`]. The slot
//! keeps the scene-side bookkeeping (lifecycle state, owner, capability flags,
//! layout links) so the behaviour itself only carries its own data.

use std::any::Any;

use bitflags::bitflags;

use super::{ComponentId, GameObjectId, MetaError, ObjectId, ObjectState, RenderPass, Scene, SceneError, SceneResult};
use crate::ui::layout::invalidation::LayoutLinks;
use crate::ui::layout::{LayoutController, LayoutElement};

bitflags! {
    /// Capabilities a component type declares once, at creation
    ///
    /// Scene and layout traversals filter on these flags instead of probing
    /// behaviour types.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Spatial transform (position / rotation / scale)
        const TRANSFORM = 1 << 0;
        /// UI rect transform (anchors / margins / pivot)
        const RECT_TRANSFORM = 1 << 1;
        /// Reports min / preferred / flexible sizes
        const LAYOUT_ELEMENT = 1 << 2;
        /// Positions the children of its GameObject
        const LAYOUT_CONTROLLER = 1 << 3;
        /// Resizes its own GameObject
        const LAYOUT_SELF_CONTROLLER = 1 << 4;
        /// At most one instance per GameObject
        const UNIQUE = 1 << 5;

        /// Either transform kind
        const TRANSFORM_FAMILY = Self::TRANSFORM.bits() | Self::RECT_TRANSFORM.bits();
        /// Either controller kind
        const ANY_LAYOUT_CONTROLLER = Self::LAYOUT_CONTROLLER.bits() | Self::LAYOUT_SELF_CONTROLLER.bits();
    }
}

/// Upcast helper for typed component access
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behaviour unit attached to a GameObject
///
/// Hooks receive the scene and their own handle. While a hook runs the
/// behaviour is checked out of its slot, so typed lookups of the running
/// component itself return `None`.
pub trait Component: AsAny {
    /// Stable type tag used by the registry and by meta export
    fn type_name(&self) -> &'static str;

    /// Capability flags, read once when the component is created
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Runs once before [`Component::on_start`]
    fn on_pre_start(&mut self, _scene: &mut Scene, _id: ComponentId) {}

    /// Runs once, the first time the component is started while enabled
    fn on_start(&mut self, _scene: &mut Scene, _id: ComponentId) {}

    /// Per-tick update
    fn on_update(&mut self, _scene: &mut Scene, _id: ComponentId, _delta_time: f32) {}

    /// Per-pass render hook
    fn on_render(&mut self, _scene: &mut Scene, _id: ComponentId, _pass: RenderPass) {}

    /// Effective enabled state flipped
    fn on_enabled_changed(&mut self, _scene: &mut Scene, _id: ComponentId, _enabled: bool) {}

    /// Marked for destruction
    fn on_destroy(&mut self, _scene: &mut Scene, _id: ComponentId) {}

    /// Attached to `owner`
    fn on_attached(&mut self, _scene: &mut Scene, _id: ComponentId, _owner: GameObjectId) {}

    /// Detached from `previous_owner`
    fn on_detached(&mut self, _scene: &mut Scene, _id: ComponentId, _previous_owner: GameObjectId) {}

    /// Serialize per-component fields
    fn export_meta(&self) -> Result<Option<ron::Value>, MetaError> {
        Ok(None)
    }

    /// Restore per-component fields on a fresh, unattached instance
    fn import_meta(&mut self, _meta: &ron::Value) -> Result<(), MetaError> {
        Ok(())
    }

    /// Layout element view, for types flagged `LAYOUT_ELEMENT`
    fn as_layout_element(&self) -> Option<&dyn LayoutElement> {
        None
    }

    /// Mutable layout element view
    fn as_layout_element_mut(&mut self) -> Option<&mut dyn LayoutElement> {
        None
    }

    /// Layout controller view, for types flagged as a controller
    fn as_layout_controller_mut(&mut self) -> Option<&mut dyn LayoutController> {
        None
    }
}

/// Scene-side storage of one component
pub struct ComponentSlot {
    pub(crate) object: ObjectState,
    pub(crate) owner: Option<GameObjectId>,
    type_name: &'static str,
    capabilities: Capabilities,
    pub(crate) behaviour: Option<Box<dyn Component>>,
    pub(crate) layout: LayoutLinks,
}

impl std::fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("type_name", &self.type_name)
            .field("owner", &self.owner)
            .field("capabilities", &self.capabilities)
            .field("object", &self.object)
            .finish()
    }
}

impl ComponentSlot {
    /// Lifecycle state
    pub fn object(&self) -> &ObjectState {
        &self.object
    }

    /// Owning GameObject
    pub fn owner(&self) -> Option<GameObjectId> {
        self.owner
    }

    /// Type tag recorded at creation
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Capabilities recorded at creation
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Behaviour, unless it is currently running a hook
    pub fn behaviour(&self) -> Option<&dyn Component> {
        self.behaviour.as_deref()
    }
}

impl Scene {
    /// Store a detached component
    pub fn create_component(&mut self, behaviour: Box<dyn Component>) -> ComponentId {
        let instance_id = self.next_instance_id();
        let capabilities = behaviour.capabilities();
        let type_name = behaviour.type_name();
        let id = self.components.insert(ComponentSlot {
            object: ObjectState::new(instance_id),
            owner: None,
            type_name,
            capabilities,
            behaviour: Some(behaviour),
            layout: LayoutLinks::new(capabilities),
        });
        log::trace!("Created component '{}' {:?}", type_name, id);
        id
    }

    /// Create a component and append it to `go`
    ///
    /// The component is discarded if attachment is rejected.
    pub fn attach(&mut self, go: GameObjectId, behaviour: Box<dyn Component>) -> SceneResult<ComponentId> {
        self.require_live(go.into())?;
        let id = self.create_component(behaviour);
        if let Err(e) = self.add_component(go, id, None) {
            self.components.remove(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Slot of a component
    pub fn component_slot(&self, id: ComponentId) -> Option<&ComponentSlot> {
        self.components.get(id)
    }

    /// Owner of a component
    pub fn owner(&self, id: ComponentId) -> Option<GameObjectId> {
        self.components.get(id).and_then(|slot| slot.owner)
    }

    /// Capability flags of a component; empty for stale handles
    pub fn capabilities(&self, id: ComponentId) -> Capabilities {
        self.components
            .get(id)
            .map_or(Capabilities::empty(), |slot| slot.capabilities)
    }

    /// Typed view of a component's behaviour
    pub fn component<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.components
            .get(id)?
            .behaviour
            .as_deref()?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Mutable typed view of a component's behaviour
    pub fn component_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.components
            .get_mut(id)?
            .behaviour
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// First component of type `T` on `go`
    pub fn get_component<T: Component>(&self, go: GameObjectId) -> Option<ComponentId> {
        self.components(go)
            .iter()
            .copied()
            .find(|&id| self.component::<T>(id).is_some())
    }

    /// Components on `go` whose flags intersect `capabilities`
    pub fn components_with(&self, go: GameObjectId, capabilities: Capabilities) -> Vec<ComponentId> {
        self.components(go)
            .iter()
            .copied()
            .filter(|&id| self.capabilities(id).intersects(capabilities))
            .collect()
    }

    /// Check a behaviour out of its slot for the duration of `f`
    ///
    /// Returns `None` if the slot is gone or the behaviour is already checked
    /// out. The behaviour is dropped if its slot was freed during `f`.
    pub(crate) fn with_behaviour<R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut dyn Component, &mut Scene) -> R,
    ) -> Option<R> {
        let mut behaviour = self.components.get_mut(id)?.behaviour.take()?;
        let result = f(&mut *behaviour, self);
        if let Some(slot) = self.components.get_mut(id) {
            slot.behaviour = Some(behaviour);
        }
        Some(result)
    }

    /// Attach `component` to `go` at `index` (append when `None`)
    ///
    /// A component owned elsewhere is detached from its old owner first.
    /// Returns the final index.
    pub fn add_component(&mut self, go: GameObjectId, component: ComponentId, index: Option<usize>) -> SceneResult<usize> {
        self.require_live(go.into())?;
        self.require_live(component.into())?;
        let (capabilities, type_name, current_owner) = match self.components.get(component) {
            Some(slot) => (slot.capabilities, slot.type_name, slot.owner),
            None => return Err(SceneError::StaleComponent(component)),
        };

        if current_owner == Some(go) {
            let position = self.components(go).iter().position(|&c| c == component);
            return Ok(position.unwrap_or_default());
        }
        let Some(data) = self.objects.get(go) else {
            return Err(SceneError::StaleGameObject(go));
        };
        if capabilities.intersects(Capabilities::TRANSFORM_FAMILY) && data.transform.is_some() {
            log::warn!("Rejected second transform on {:?}", go);
            return Err(SceneError::DuplicateTransform(go));
        }
        if capabilities.contains(Capabilities::UNIQUE)
            && data
                .components
                .iter()
                .any(|&c| self.components.get(c).is_some_and(|slot| slot.type_name == type_name))
        {
            log::warn!("Rejected duplicate '{}' on {:?}", type_name, go);
            return Err(SceneError::DuplicateComponent { object: go, type_name });
        }

        if let Some(previous) = current_owner {
            self.remove_component(previous, component)?;
        }

        let was_enabled = self.is_enabled_recursively(component);
        let Some(data) = self.objects.get_mut(go) else {
            return Err(SceneError::StaleGameObject(go));
        };
        let index = data.insert_component_at(index.unwrap_or(usize::MAX), component);
        if capabilities.intersects(Capabilities::TRANSFORM_FAMILY) {
            data.transform = Some(component);
        }
        if let Some(slot) = self.components.get_mut(component) {
            slot.owner = Some(go);
            slot.object.invalidate_recursive();
        }

        self.with_behaviour(component, |behaviour, scene| behaviour.on_attached(scene, component, go));
        self.link_layout_listeners(component, go);
        self.fire_tree(go, |l, scene| l.on_component_added(scene, go, component, index));
        self.notify_recursive_flips(&[component.into()], &[was_enabled]);
        if capabilities.intersects(Capabilities::TRANSFORM_FAMILY) {
            self.transform_changed(go);
        }
        Ok(index)
    }

    /// Detach `component` from `go`, leaving it alive and unowned
    pub fn remove_component(&mut self, go: GameObjectId, component: ComponentId) -> SceneResult<()> {
        self.require_live(component.into())?;
        if self.owner(component) != Some(go) {
            return Err(SceneError::ComponentNotAttached { object: go, component });
        }
        self.detach_component(go, component);
        Ok(())
    }

    pub(crate) fn detach_component(&mut self, go: GameObjectId, component: ComponentId) {
        let was_enabled = self.is_enabled_recursively(component);
        let Some(data) = self.objects.get_mut(go) else {
            return;
        };
        let Some(position) = data.components.iter().position(|&c| c == component) else {
            return;
        };
        data.remove_component_at(position);
        let was_transform = data.transform == Some(component);
        if was_transform {
            data.transform = None;
        }
        if let Some(slot) = self.components.get_mut(component) {
            slot.owner = None;
            slot.object.invalidate_recursive();
        }

        self.unlink_layout_listeners(component, go);
        self.with_behaviour(component, |behaviour, scene| behaviour.on_detached(scene, component, go));
        self.fire_tree(go, |l, scene| l.on_component_removed(scene, go, component));
        self.notify_recursive_flips(&[component.into()], &[was_enabled]);
        if was_transform {
            self.transform_changed(go);
        }
    }

    /// Mark a component for destruction
    ///
    /// Its destroy notification fires immediately. An attached component is
    /// detached and freed by its owner's next [`Scene::destroy_pending`]
    /// sweep; a detached one is freed inline. Repeated requests are no-ops.
    pub fn destroy_component(&mut self, id: ComponentId) -> SceneResult<()> {
        let Some(slot) = self.components.get(id) else {
            return Err(SceneError::StaleComponent(id));
        };
        if slot.object.waiting_to_be_destroyed {
            return Ok(());
        }
        self.mark_component_for_destroy(id);

        match self.owner(id) {
            Some(owner) => {
                if let Some(data) = self.objects.get_mut(owner) {
                    if !data.pending_components.contains(&id) {
                        data.pending_components.push(id);
                    }
                }
            }
            None => self.free_component(id),
        }
        Ok(())
    }

    pub(crate) fn mark_component_for_destroy(&mut self, id: ComponentId) {
        let Some(slot) = self.components.get_mut(id) else {
            return;
        };
        if slot.object.waiting_to_be_destroyed {
            return;
        }
        slot.object.waiting_to_be_destroyed = true;
        let events = slot.object.events.clone();
        if self.log_lifecycle() {
            log::debug!("Destroying component {:?}", id);
        }

        self.with_behaviour(id, |behaviour, scene| behaviour.on_destroy(scene, id));
        events.propagate(|l| l.on_destroy(self, ObjectId::Component(id)));
    }

    pub(crate) fn free_component(&mut self, id: ComponentId) {
        if self.components.remove(id).is_some() {
            log::trace!("Freed component {:?}", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventListener, GameObjectListener};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Health {
        points: i32,
    }

    impl Component for Health {
        fn type_name(&self) -> &'static str {
            "Health"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::UNIQUE
        }
    }

    struct Marker;

    impl Component for Marker {
        fn type_name(&self) -> &'static str {
            "Marker"
        }
    }

    struct AddedRecorder {
        log: Rc<RefCell<Vec<(ComponentId, usize)>>>,
    }

    impl GameObjectListener for AddedRecorder {
        fn on_component_added(&mut self, _scene: &mut Scene, _object: GameObjectId, component: ComponentId, index: usize) {
            self.log.borrow_mut().push((component, index));
        }
    }

    #[test]
    fn test_attach_postconditions() {
        let mut scene = Scene::new();
        let go = scene.create_game_object("player");
        let log = Rc::new(RefCell::new(Vec::new()));
        let listener: EventListener<dyn GameObjectListener> =
            EventListener::new(Box::new(AddedRecorder { log: Rc::clone(&log) }));
        scene.tree_events(go).unwrap().register_listener(&listener);

        let marker = scene.attach(go, Box::new(Marker)).unwrap();
        let health = scene.create_component(Box::new(Health { points: 3 }));
        let index = scene.add_component(go, health, Some(0)).unwrap();

        assert_eq!(index, 0);
        assert_eq!(scene.owner(health), Some(go));
        assert_eq!(scene.components(go), &[health, marker]);
        assert_eq!(*log.borrow(), vec![(marker, 0), (health, 0)]);
        assert_eq!(scene.component::<Health>(health).map(|h| h.points), Some(3));
        assert_eq!(scene.get_component::<Health>(go), Some(health));
    }

    #[test]
    fn test_unique_component_rejected() {
        let mut scene = Scene::new();
        let go = scene.create_game_object("player");
        scene.attach(go, Box::new(Health::default())).unwrap();

        let result = scene.attach(go, Box::new(Health::default()));

        assert_eq!(
            result,
            Err(SceneError::DuplicateComponent { object: go, type_name: "Health" })
        );
        assert_eq!(scene.components(go).len(), 1);
        assert_eq!(scene.component_count(), 1);
    }

    #[test]
    fn test_moving_component_between_owners() {
        let mut scene = Scene::new();
        let a = scene.create_game_object("a");
        let b = scene.create_game_object("b");
        let marker = scene.attach(a, Box::new(Marker)).unwrap();

        scene.add_component(b, marker, None).unwrap();

        assert!(scene.components(a).is_empty());
        assert_eq!(scene.components(b), &[marker]);
        assert_eq!(scene.owner(marker), Some(b));
    }

    #[test]
    fn test_detached_component_is_not_enabled_recursively() {
        let mut scene = Scene::new();
        let go = scene.create_game_object("go");
        let marker = scene.attach(go, Box::new(Marker)).unwrap();
        assert!(scene.is_enabled_recursively(marker));

        scene.remove_component(go, marker).unwrap();

        assert!(scene.is_enabled(marker));
        assert!(!scene.is_enabled_recursively(marker));
        assert_eq!(
            scene.remove_component(go, marker),
            Err(SceneError::ComponentNotAttached { object: go, component: marker })
        );
    }

    #[test]
    fn test_destroy_component_is_deferred() {
        let mut scene = Scene::new();
        let go = scene.create_game_object("go");
        let marker = scene.attach(go, Box::new(Marker)).unwrap();

        scene.destroy_component(marker).unwrap();
        assert!(scene.contains_component(marker));
        assert!(scene.is_waiting_to_be_destroyed(marker));
        assert_eq!(scene.destroy_component(marker), Ok(()));

        scene.destroy_pending(go);
        assert!(!scene.contains_component(marker));
        assert!(scene.components(go).is_empty());
    }

    #[test]
    fn test_destroy_detached_component_is_immediate() {
        let mut scene = Scene::new();
        let marker = scene.create_component(Box::new(Marker));
        scene.destroy_component(marker).unwrap();
        assert!(!scene.contains_component(marker));
    }
}
