//! Layout dirty state and the listeners that drive it
//!
//! Each layout component's slot holds its validity flags and, while
//! attached, forwarding listeners registered with its owner's object, tree
//! and transform emitters. Those listeners turn scene notifications into
//! invalidation calls:
//! - an element invalidates itself, then every controller on its parent's
//!   GameObject (child-affecting ones before self controllers), then the
//!   self controllers on its own GameObject
//! - a controller invalidates itself and then the elements on its own
//!   GameObject; an already invalid controller stops there

use crate::events::{EventListener, GameObjectListener, ObjectListener, TransformListener};
use crate::scene::{Capabilities, ComponentId, GameObjectId, ObjectId, Scene};

/// Per-slot layout bookkeeping
#[derive(Debug)]
pub(crate) struct LayoutLinks {
    /// Element sizes need recalculating, per axis
    pub(crate) element_dirty: [bool; 2],
    /// Controller needs to re-apply
    pub(crate) controller_dirty: bool,
    element_listeners: Option<Forwarders>,
    controller_listeners: Option<Forwarders>,
}

impl LayoutLinks {
    pub(crate) fn new(capabilities: Capabilities) -> Self {
        Self {
            element_dirty: [capabilities.contains(Capabilities::LAYOUT_ELEMENT); 2],
            controller_dirty: capabilities.intersects(Capabilities::ANY_LAYOUT_CONTROLLER),
            element_listeners: None,
            controller_listeners: None,
        }
    }
}

#[derive(Debug)]
struct Forwarders {
    object: EventListener<dyn ObjectListener>,
    tree: EventListener<dyn GameObjectListener>,
    transform: EventListener<dyn TransformListener>,
}

impl Forwarders {
    fn new<H>(handler: H) -> Self
    where
        H: ObjectListener + GameObjectListener + TransformListener + Clone + 'static,
    {
        let object: Box<dyn ObjectListener> = Box::new(handler.clone());
        let tree: Box<dyn GameObjectListener> = Box::new(handler.clone());
        let transform: Box<dyn TransformListener> = Box::new(handler);
        Self {
            object: EventListener::new(object),
            tree: EventListener::new(tree),
            transform: EventListener::new(transform),
        }
    }

    fn register(&self, scene: &Scene, owner: GameObjectId) {
        if let Some(events) = scene.object_events(owner) {
            events.register_listener(&self.object);
        }
        if let Some(events) = scene.tree_events(owner) {
            events.register_listener(&self.tree);
        }
        if let Some(events) = scene.transform_events(owner) {
            events.register_listener(&self.transform);
        }
    }

    fn set_receive_events(&self, receiving: bool) {
        self.object.set_receive_events(receiving);
        self.tree.set_receive_events(receiving);
        self.transform.set_receive_events(receiving);
    }
}

/// Invalidates a layout element when its GameObject changes
#[derive(Clone, Copy)]
struct ElementInvalidator {
    component: ComponentId,
}

impl ObjectListener for ElementInvalidator {
    fn on_enabled_recursively_changed(&mut self, scene: &mut Scene, _object: ObjectId, _enabled: bool) {
        scene.invalidate_layout_element(self.component);
    }
}

impl GameObjectListener for ElementInvalidator {
    fn on_parent_changed(&mut self, scene: &mut Scene, _object: GameObjectId, _previous: Option<GameObjectId>) {
        scene.invalidate_layout_element(self.component);
    }

    fn on_child_added(&mut self, scene: &mut Scene, _parent: GameObjectId, _child: GameObjectId, _index: usize) {
        scene.invalidate_layout_element(self.component);
    }

    fn on_child_removed(&mut self, scene: &mut Scene, _parent: GameObjectId, _child: GameObjectId) {
        scene.invalidate_layout_element(self.component);
    }

    fn on_component_added(&mut self, scene: &mut Scene, _object: GameObjectId, _component: ComponentId, _index: usize) {
        scene.invalidate_layout_element(self.component);
    }

    fn on_component_removed(&mut self, scene: &mut Scene, _previous_owner: GameObjectId, _component: ComponentId) {
        scene.invalidate_layout_element(self.component);
    }
}

impl TransformListener for ElementInvalidator {
    fn on_transform_changed(&mut self, scene: &mut Scene, _object: GameObjectId) {
        scene.invalidate_layout_element(self.component);
    }
}

/// Invalidates a layout controller when its GameObject or children change
#[derive(Clone, Copy)]
struct ControllerInvalidator {
    component: ComponentId,
}

impl ObjectListener for ControllerInvalidator {
    fn on_enabled_recursively_changed(&mut self, scene: &mut Scene, _object: ObjectId, _enabled: bool) {
        scene.invalidate_layout_controller(self.component);
    }
}

impl GameObjectListener for ControllerInvalidator {
    fn on_child_added(&mut self, scene: &mut Scene, _parent: GameObjectId, _child: GameObjectId, _index: usize) {
        scene.invalidate_layout_controller(self.component);
    }

    fn on_child_removed(&mut self, scene: &mut Scene, _parent: GameObjectId, _child: GameObjectId) {
        scene.invalidate_layout_controller(self.component);
    }

    fn on_component_added(&mut self, scene: &mut Scene, _object: GameObjectId, _component: ComponentId, _index: usize) {
        scene.invalidate_layout_controller(self.component);
    }

    fn on_component_removed(&mut self, scene: &mut Scene, _previous_owner: GameObjectId, _component: ComponentId) {
        scene.invalidate_layout_controller(self.component);
    }
}

impl TransformListener for ControllerInvalidator {
    fn on_transform_changed(&mut self, scene: &mut Scene, _object: GameObjectId) {
        scene.invalidate_layout_controller(self.component);
    }

    fn on_child_transform_changed(&mut self, scene: &mut Scene, _parent: GameObjectId, _child: GameObjectId) {
        scene.invalidate_layout_controller(self.component);
    }
}

impl Scene {
    /// Self controllers and child-affecting controllers on `go`
    pub(crate) fn layout_controllers(&self, go: GameObjectId) -> (Vec<ComponentId>, Vec<ComponentId>) {
        self.components_with(go, Capabilities::ANY_LAYOUT_CONTROLLER)
            .into_iter()
            .partition(|&id| self.capabilities(id).contains(Capabilities::LAYOUT_SELF_CONTROLLER))
    }

    /// Whether an element's sizes along an axis need recalculating
    pub fn is_layout_element_dirty(&self, id: ComponentId, axis: super::Axis) -> bool {
        self.components
            .get(id)
            .is_some_and(|slot| slot.layout.element_dirty[axis.index()])
    }

    /// Whether a controller needs to re-apply
    pub fn is_layout_controller_dirty(&self, id: ComponentId) -> bool {
        self.components.get(id).is_some_and(|slot| slot.layout.controller_dirty)
    }

    /// Mark an element's sizes stale and invalidate the controllers that
    /// consume them
    pub fn invalidate_layout_element(&mut self, id: ComponentId) {
        let Some(slot) = self.components.get_mut(id) else {
            return;
        };
        if !slot.capabilities().contains(Capabilities::LAYOUT_ELEMENT) {
            return;
        }
        slot.layout.element_dirty = [true; 2];
        if let Some(owner) = slot.owner {
            self.invalidate_parent_controllers(owner);
            self.invalidate_self_controllers(owner);
        }
    }

    fn invalidate_self_controllers(&mut self, go: GameObjectId) {
        for controller in self.components_with(go, Capabilities::LAYOUT_SELF_CONTROLLER) {
            self.invalidate_layout_controller(controller);
        }
    }

    fn invalidate_parent_controllers(&mut self, go: GameObjectId) {
        let Some(parent) = self.parent(go) else {
            return;
        };
        let (self_controllers, child_controllers) = self.layout_controllers(parent);
        for controller in child_controllers.into_iter().chain(self_controllers) {
            self.invalidate_layout_controller(controller);
        }
    }

    /// Mark a controller for re-application and invalidate the elements on
    /// its GameObject
    ///
    /// Does nothing if the controller is already invalid.
    pub fn invalidate_layout_controller(&mut self, id: ComponentId) {
        let Some(slot) = self.components.get_mut(id) else {
            return;
        };
        if !slot.capabilities().intersects(Capabilities::ANY_LAYOUT_CONTROLLER) || slot.layout.controller_dirty {
            return;
        }
        slot.layout.controller_dirty = true;
        log::trace!("Layout controller {:?} invalidated", id);
        if let Some(owner) = slot.owner {
            self.invalidate_own_elements(owner);
        }
    }

    fn invalidate_own_elements(&mut self, go: GameObjectId) {
        for element in self.components_with(go, Capabilities::LAYOUT_ELEMENT) {
            self.invalidate_layout_element(element);
        }
    }

    pub(crate) fn mark_layout_element_valid(&mut self, id: ComponentId, axis: super::Axis) {
        if let Some(slot) = self.components.get_mut(id) {
            slot.layout.element_dirty[axis.index()] = false;
        }
    }

    pub(crate) fn mark_layout_controller_valid(&mut self, id: ComponentId) {
        if let Some(slot) = self.components.get_mut(id) {
            slot.layout.controller_dirty = false;
        }
    }

    /// Subscribe a freshly attached layout component to `owner`'s emitters
    /// and invalidate it
    pub(crate) fn link_layout_listeners(&mut self, id: ComponentId, owner: GameObjectId) {
        let capabilities = self.capabilities(id);
        let element = capabilities
            .contains(Capabilities::LAYOUT_ELEMENT)
            .then(|| Forwarders::new(ElementInvalidator { component: id }));
        let controller = capabilities
            .intersects(Capabilities::ANY_LAYOUT_CONTROLLER)
            .then(|| Forwarders::new(ControllerInvalidator { component: id }));
        if element.is_none() && controller.is_none() {
            return;
        }
        for forwarders in element.iter().chain(controller.iter()) {
            forwarders.register(self, owner);
        }
        if let Some(slot) = self.components.get_mut(id) {
            slot.layout.element_listeners = element;
            slot.layout.controller_listeners = controller;
        }

        if capabilities.intersects(Capabilities::ANY_LAYOUT_CONTROLLER) {
            if let Some(slot) = self.components.get_mut(id) {
                slot.layout.controller_dirty = false;
            }
            self.invalidate_layout_controller(id);
        }
        self.invalidate_layout_element(id);
    }

    /// Drop the forwarding listeners of a detached layout component and
    /// invalidate what depended on it
    pub(crate) fn unlink_layout_listeners(&mut self, id: ComponentId, previous_owner: GameObjectId) {
        let Some(slot) = self.components.get_mut(id) else {
            return;
        };
        let capabilities = slot.capabilities();
        let had_links = slot.layout.element_listeners.take().is_some() | slot.layout.controller_listeners.take().is_some();
        if !had_links {
            return;
        }
        if capabilities.contains(Capabilities::LAYOUT_ELEMENT) {
            slot.layout.element_dirty = [true; 2];
            self.invalidate_parent_controllers(previous_owner);
        }
        if capabilities.intersects(Capabilities::ANY_LAYOUT_CONTROLLER) {
            if let Some(slot) = self.components.get_mut(id) {
                slot.layout.controller_dirty = true;
            }
            self.invalidate_own_elements(previous_owner);
        }
    }

    /// Suppress or restore delivery to an element's forwarding listeners
    pub(crate) fn set_element_listening(&self, id: ComponentId, receiving: bool) {
        if let Some(forwarders) = self
            .components
            .get(id)
            .and_then(|slot| slot.layout.element_listeners.as_ref())
        {
            forwarders.set_receive_events(receiving);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec2;
    use crate::transform::RectTransform;
    use crate::ui::layout::{Axis, ContentSizeFitter, DirectionalLayout, LayoutSizes};

    fn settle(scene: &mut Scene, ids: &[ComponentId]) {
        for &id in ids {
            for axis in Axis::ALL {
                scene.mark_layout_element_valid(id, axis);
            }
            scene.mark_layout_controller_valid(id);
        }
    }

    #[test]
    fn test_new_components_start_dirty() {
        let mut scene = Scene::new();
        let go = scene.create_game_object("go");
        let sizes = scene.attach(go, Box::new(LayoutSizes::default())).unwrap();
        let fitter = scene.attach(go, Box::new(ContentSizeFitter::default())).unwrap();

        assert!(scene.is_layout_element_dirty(sizes, Axis::Horizontal));
        assert!(scene.is_layout_element_dirty(sizes, Axis::Vertical));
        assert!(scene.is_layout_controller_dirty(fitter));
        assert!(!scene.is_layout_controller_dirty(sizes));
    }

    #[test]
    fn test_child_element_change_invalidates_parent_controller() {
        let mut scene = Scene::new();
        let panel = scene.create_game_object("panel");
        let item = scene.create_child(panel, "item").unwrap();
        scene.attach(panel, Box::new(RectTransform::with_reference_size(Vec2::new(100.0, 100.0)))).unwrap();
        scene.attach(item, Box::new(RectTransform::default())).unwrap();
        let layout = scene.attach(panel, Box::new(DirectionalLayout::default())).unwrap();
        let sizes = scene.attach(item, Box::new(LayoutSizes::default())).unwrap();
        settle(&mut scene, &[layout, sizes]);

        scene.invalidate_layout_element(sizes);

        assert!(scene.is_layout_controller_dirty(layout));
        // The controller re-dirtied the element it carries as well
        assert!(scene.is_layout_element_dirty(layout, Axis::Vertical));
    }

    #[test]
    fn test_dirty_controller_stops_propagation() {
        let mut scene = Scene::new();
        let panel = scene.create_game_object("panel");
        let layout = scene.attach(panel, Box::new(DirectionalLayout::default())).unwrap();
        settle(&mut scene, &[layout]);
        scene.invalidate_layout_controller(layout);
        scene.mark_layout_element_valid(layout, Axis::Horizontal);

        scene.invalidate_layout_controller(layout);

        assert!(!scene.is_layout_element_dirty(layout, Axis::Horizontal));
    }

    #[test]
    fn test_adding_child_invalidates_controller() {
        let mut scene = Scene::new();
        let panel = scene.create_game_object("panel");
        let layout = scene.attach(panel, Box::new(DirectionalLayout::default())).unwrap();
        settle(&mut scene, &[layout]);

        scene.create_child(panel, "late").unwrap();

        assert!(scene.is_layout_controller_dirty(layout));
    }

    #[test]
    fn test_suppressed_element_ignores_own_moves() {
        let mut scene = Scene::new();
        let go = scene.create_game_object("go");
        scene.attach(go, Box::new(RectTransform::with_reference_size(Vec2::new(10.0, 10.0)))).unwrap();
        let sizes = scene.attach(go, Box::new(LayoutSizes::default())).unwrap();
        settle(&mut scene, &[sizes]);

        scene.set_element_listening(sizes, false);
        scene.set_reference_size(go, Vec2::new(20.0, 20.0)).unwrap();
        assert!(!scene.is_layout_element_dirty(sizes, Axis::Horizontal));

        scene.set_element_listening(sizes, true);
        scene.set_reference_size(go, Vec2::new(30.0, 30.0)).unwrap();
        assert!(scene.is_layout_element_dirty(sizes, Axis::Horizontal));
    }

    #[test]
    fn test_detach_drops_listeners() {
        let mut scene = Scene::new();
        let go = scene.create_game_object("go");
        let sizes = scene.attach(go, Box::new(LayoutSizes::default())).unwrap();
        let listeners_before = scene.tree_events(go).unwrap().listener_count();

        scene.remove_component(go, sizes).unwrap();

        assert_eq!(scene.tree_events(go).unwrap().listener_count(), listeners_before - 1);
    }
}
