//! Lifecycle propagation
//!
//! Each pass walks a subtree depth-first: the GameObject, then its
//! components in order, then its children in order. Objects waiting to be
//! destroyed or disabled recursively are skipped together with their
//! subtrees.

use super::{ComponentId, GameObjectId, ObjectId, Scene};

/// Identifier of a render pass, defined by the render backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderPass(pub u32);

impl Scene {
    fn is_active(&self, id: impl Into<ObjectId>) -> bool {
        let id = id.into();
        !self.is_waiting_to_be_destroyed(id) && self.is_enabled_recursively(id)
    }

    /// Run `on_pre_start` once for every active, not yet pre-started object
    /// under `go`
    pub fn pre_start(&mut self, go: GameObjectId) {
        if !self.is_active(go) {
            return;
        }
        if let Some(data) = self.objects.get_mut(go) {
            if !data.object.pre_started {
                data.object.pre_started = true;
                if self.log_lifecycle() {
                    log::debug!("Pre-start GameObject {:?}", go);
                }
            }
        }
        self.for_each_component(go, Scene::pre_start_component);
        self.for_each_child(go, Scene::pre_start);
    }

    fn pre_start_component(&mut self, id: ComponentId) {
        if !self.is_active(id) {
            return;
        }
        let Some(slot) = self.components.get_mut(id) else {
            return;
        };
        if slot.object.pre_started {
            return;
        }
        slot.object.pre_started = true;
        self.with_behaviour(id, |behaviour, scene| behaviour.on_pre_start(scene, id));
    }

    /// Run `on_start` once for every active, not yet started object under
    /// `go`, pre-starting first where needed
    pub fn start(&mut self, go: GameObjectId) {
        if !self.is_active(go) {
            return;
        }
        let needs_pre_start = self
            .objects
            .get(go)
            .is_some_and(|data| !data.object.pre_started);
        if needs_pre_start {
            self.pre_start(go);
        }
        if let Some(data) = self.objects.get_mut(go) {
            if !data.object.started {
                data.object.started = true;
                if self.log_lifecycle() {
                    log::debug!("Start GameObject {:?}", go);
                }
            }
        }
        self.for_each_component(go, Scene::start_component);
        self.for_each_child(go, Scene::start);
    }

    fn start_component(&mut self, id: ComponentId) {
        if !self.is_active(id) {
            return;
        }
        if self.components.get(id).is_some_and(|slot| !slot.object.pre_started) {
            self.pre_start_component(id);
        }
        let Some(slot) = self.components.get_mut(id) else {
            return;
        };
        if slot.object.started {
            return;
        }
        slot.object.started = true;
        self.with_behaviour(id, |behaviour, scene| behaviour.on_start(scene, id));
    }

    /// Run `on_update` on every started, active component under `go`
    ///
    /// Returns the number of components updated.
    pub fn update(&mut self, go: GameObjectId, delta_time: f32) -> usize {
        if !self.is_active(go) {
            return 0;
        }
        let mut updated = 0;
        self.for_each_component(go, |scene, id| {
            if scene.is_started_and_active(id) {
                scene.with_behaviour(id, |behaviour, scene| behaviour.on_update(scene, id, delta_time));
                updated += 1;
            }
        });
        self.for_each_child(go, |scene, child| updated += scene.update(child, delta_time));
        updated
    }

    /// Run `on_render` on every started, active component of every visible
    /// GameObject under `go`
    pub fn render(&mut self, go: GameObjectId, pass: RenderPass) {
        if !self.is_active(go) || !self.objects.get(go).is_some_and(|data| data.visible) {
            return;
        }
        self.for_each_component(go, |scene, id| {
            if scene.is_started_and_active(id) {
                scene.with_behaviour(id, |behaviour, scene| behaviour.on_render(scene, id, pass));
            }
        });
        self.for_each_child(go, |scene, child| scene.render(child, pass));
    }

    fn is_started_and_active(&self, id: ComponentId) -> bool {
        self.components.get(id).is_some_and(|slot| slot.object.started) && self.is_active(id)
    }

    /// Whether an object has been started
    pub fn is_started(&self, id: impl Into<ObjectId>) -> bool {
        self.object_state(id.into()).is_some_and(|state| state.started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Component;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Probe {
        name: &'static str,
        journal: Journal,
    }

    impl Component for Probe {
        fn type_name(&self) -> &'static str {
            "Probe"
        }

        fn on_pre_start(&mut self, _scene: &mut Scene, _id: ComponentId) {
            self.journal.borrow_mut().push(format!("{}:pre_start", self.name));
        }

        fn on_start(&mut self, _scene: &mut Scene, _id: ComponentId) {
            self.journal.borrow_mut().push(format!("{}:start", self.name));
        }

        fn on_update(&mut self, _scene: &mut Scene, _id: ComponentId, _delta_time: f32) {
            self.journal.borrow_mut().push(format!("{}:update", self.name));
        }

        fn on_render(&mut self, _scene: &mut Scene, _id: ComponentId, pass: RenderPass) {
            self.journal.borrow_mut().push(format!("{}:render{}", self.name, pass.0));
        }
    }

    fn probe(name: &'static str, journal: &Journal) -> Box<Probe> {
        Box::new(Probe {
            name,
            journal: Rc::clone(journal),
        })
    }

    #[test]
    fn test_start_runs_once_in_order() {
        let journal = Journal::default();
        let mut scene = Scene::new();
        let root = scene.create_game_object("root");
        let child = scene.create_child(root, "child").unwrap();
        scene.attach(root, probe("root", &journal)).unwrap();
        scene.attach(child, probe("child", &journal)).unwrap();

        scene.start(root);
        scene.start(root);

        assert_eq!(
            *journal.borrow(),
            vec!["root:pre_start", "child:pre_start", "root:start", "child:start"]
        );
        assert!(scene.is_started(child));
    }

    #[test]
    fn test_disabled_subtree_is_not_started_until_enabled() {
        let journal = Journal::default();
        let mut scene = Scene::new();
        let root = scene.create_game_object("root");
        let child = scene.create_child(root, "child").unwrap();
        scene.attach(child, probe("child", &journal)).unwrap();
        scene.set_enabled(child, false).unwrap();

        scene.start(root);
        assert!(journal.borrow().is_empty());
        assert!(!scene.is_started(child));

        scene.set_enabled(child, true).unwrap();
        scene.start(root);
        assert_eq!(*journal.borrow(), vec!["child:pre_start", "child:start"]);
    }

    #[test]
    fn test_update_skips_unstarted_and_counts() {
        let journal = Journal::default();
        let mut scene = Scene::new();
        let root = scene.create_game_object("root");
        scene.attach(root, probe("a", &journal)).unwrap();

        assert_eq!(scene.update(root, 0.016), 0);
        scene.start(root);
        journal.borrow_mut().clear();

        assert_eq!(scene.update(root, 0.016), 1);
        assert_eq!(*journal.borrow(), vec!["a:update"]);
    }

    #[test]
    fn test_render_skips_invisible_subtrees() {
        let journal = Journal::default();
        let mut scene = Scene::new();
        let root = scene.create_game_object("root");
        let hidden = scene.create_child(root, "hidden").unwrap();
        scene.attach(root, probe("root", &journal)).unwrap();
        scene.attach(hidden, probe("hidden", &journal)).unwrap();
        scene.start(root);
        scene.set_visible(hidden, false).unwrap();
        journal.borrow_mut().clear();

        scene.render(root, RenderPass(2));

        assert_eq!(*journal.borrow(), vec!["root:render2"]);
    }
}
