//! Capability listener traits
//!
//! Every method has an empty default so a handler only overrides the
//! notifications it cares about.

use crate::foundation::math::Vec2;
use crate::scene::{ComponentId, GameObjectId, ObjectId, Scene};

/// Lifecycle notifications shared by GameObjects and Components
pub trait ObjectListener {
    /// Direct enabled flag changed
    fn on_enabled_changed(&mut self, _scene: &mut Scene, _object: ObjectId, _enabled: bool) {}

    /// Effective (ancestor-aware) enabled state flipped
    fn on_enabled_recursively_changed(&mut self, _scene: &mut Scene, _object: ObjectId, _enabled: bool) {}

    /// Object was marked for destruction; it is still readable
    fn on_destroy(&mut self, _scene: &mut Scene, _object: ObjectId) {}
}

/// Structural notifications of a single GameObject
pub trait GameObjectListener {
    /// Name changed; the new name is readable from the scene
    fn on_name_changed(&mut self, _scene: &mut Scene, _object: GameObjectId, _previous: &str) {}

    /// Parent changed (including to or from root)
    fn on_parent_changed(
        &mut self,
        _scene: &mut Scene,
        _object: GameObjectId,
        _previous_parent: Option<GameObjectId>,
    ) {
    }

    /// A child was inserted at `index`
    fn on_child_added(&mut self, _scene: &mut Scene, _parent: GameObjectId, _child: GameObjectId, _index: usize) {}

    /// A child was removed
    fn on_child_removed(&mut self, _scene: &mut Scene, _parent: GameObjectId, _child: GameObjectId) {}

    /// A component was attached at `index`
    fn on_component_added(
        &mut self,
        _scene: &mut Scene,
        _object: GameObjectId,
        _component: ComponentId,
        _index: usize,
    ) {
    }

    /// A component was detached from `previous_owner`
    fn on_component_removed(&mut self, _scene: &mut Scene, _previous_owner: GameObjectId, _component: ComponentId) {}
}

/// Transform notifications of a single GameObject
pub trait TransformListener {
    /// Own world placement changed (own edit or an ancestor's)
    fn on_transform_changed(&mut self, _scene: &mut Scene, _object: GameObjectId) {}

    /// A direct child changed its own transform
    fn on_child_transform_changed(&mut self, _scene: &mut Scene, _parent: GameObjectId, _child: GameObjectId) {}
}

/// Keyboard focus notifications raised by the input layer
pub trait FocusListener {
    /// `target` received focus
    fn on_focus_gained(&mut self, _target: GameObjectId) {}

    /// `target` lost focus
    fn on_focus_lost(&mut self, _target: GameObjectId) {}
}

/// Drag and drop notifications raised by the input layer
pub trait DragDropListener {
    /// Pointer started dragging `source`
    fn on_drag_begin(&mut self, _source: GameObjectId, _position: Vec2) {}

    /// Pointer moved while dragging
    fn on_drag(&mut self, _source: GameObjectId, _position: Vec2) {}

    /// Drag finished without a drop target
    fn on_drag_end(&mut self, _source: GameObjectId, _position: Vec2) {}

    /// `source` was dropped onto `target`
    fn on_drop(&mut self, _source: GameObjectId, _target: GameObjectId, _position: Vec2) {}
}

/// Value notifications raised by editable widgets
pub trait ValueChangedListener<T> {
    /// The value held by `source` changed from `previous` to `value`
    fn on_value_changed(&mut self, source: GameObjectId, previous: &T, value: &T);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventEmitter, EventListener};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Slider {
        seen: Rc<RefCell<Vec<(f32, f32)>>>,
    }

    impl ValueChangedListener<f32> for Slider {
        fn on_value_changed(&mut self, _source: GameObjectId, previous: &f32, value: &f32) {
            self.seen.borrow_mut().push((*previous, *value));
        }
    }

    #[test]
    fn test_value_changed_over_emitter() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let emitter: EventEmitter<dyn ValueChangedListener<f32>> = EventEmitter::new();
        let listener: EventListener<dyn ValueChangedListener<f32>> =
            EventListener::new(Box::new(Slider { seen: Rc::clone(&seen) }));
        emitter.register_listener(&listener);

        let source = GameObjectId::default();
        emitter.propagate(|l| l.on_value_changed(source, &0.25, &0.5));

        assert_eq!(*seen.borrow(), vec![(0.25, 0.5)]);
    }

    #[test]
    fn test_default_focus_methods_are_noops() {
        struct Ignored;
        impl FocusListener for Ignored {}

        let emitter: EventEmitter<dyn FocusListener> = EventEmitter::new();
        let listener: EventListener<dyn FocusListener> = EventListener::new(Box::new(Ignored));
        emitter.register_listener(&listener);

        assert_eq!(emitter.propagate(|l| l.on_focus_gained(GameObjectId::default())), 1);
    }
}
