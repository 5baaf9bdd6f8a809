//! Layout orchestration for one UI root

use std::cell::{RefCell, RefMut};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::{Rc, Weak};

use super::{Axis, SizeKind};
use crate::config::LayoutConfig;
use crate::events::{EventListener, GameObjectListener, ObjectListener};
use crate::scene::{Capabilities, ComponentId, GameObjectId, ObjectId, Scene};

#[derive(Debug, Default, Clone)]
struct ControllerSet {
    self_controllers: Vec<ComponentId>,
    child_controllers: Vec<ComponentId>,
}

/// Drops cache entries when a watched GameObject is destroyed or its
/// component list changes
#[derive(Debug)]
struct Watchers {
    _object: EventListener<dyn ObjectListener>,
    _tree: EventListener<dyn GameObjectListener>,
}

#[derive(Debug, Default)]
struct LayoutCaches {
    elements: HashMap<GameObjectId, Vec<ComponentId>>,
    controllers: HashMap<GameObjectId, ControllerSet>,
    watchers: HashMap<GameObjectId, Watchers>,
}

impl LayoutCaches {
    fn evict(&mut self, go: GameObjectId) {
        self.elements.remove(&go);
        self.controllers.remove(&go);
        self.watchers.remove(&go);
    }
}

/// Evictions raised while the caches were borrowed, applied on next access
type PendingEvictions = RefCell<Vec<GameObjectId>>;

#[derive(Clone)]
struct CacheEvictor {
    caches: Weak<RefCell<LayoutCaches>>,
    pending: Weak<PendingEvictions>,
}

impl CacheEvictor {
    fn evict(&self, go: GameObjectId) {
        let Some(caches) = self.caches.upgrade() else {
            return;
        };
        match caches.try_borrow_mut() {
            Ok(mut caches) => {
                caches.evict(go);
                log::trace!("Evicted layout cache for {:?}", go);
            }
            Err(_) => {
                if let Some(pending) = self.pending.upgrade() {
                    pending.borrow_mut().push(go);
                    log::trace!("Deferred layout cache eviction for {:?}", go);
                }
            }
        };
    }
}

impl ObjectListener for CacheEvictor {
    fn on_destroy(&mut self, _scene: &mut Scene, object: ObjectId) {
        if let ObjectId::GameObject(go) = object {
            self.evict(go);
        }
    }
}

impl GameObjectListener for CacheEvictor {
    fn on_component_added(&mut self, _scene: &mut Scene, object: GameObjectId, _component: ComponentId, _index: usize) {
        self.evict(object);
    }

    fn on_component_removed(&mut self, _scene: &mut Scene, previous_owner: GameObjectId, _component: ComponentId) {
        self.evict(previous_owner);
    }
}

/// Runs the layout passes for one UI root
///
/// Keeps per-GameObject caches of the layout elements and controllers found
/// there. An entry is dropped when its GameObject is destroyed or gains or
/// loses a component, and rebuilt on next use.
#[derive(Debug)]
pub struct UILayoutManager {
    root: GameObjectId,
    config: LayoutConfig,
    caches: Rc<RefCell<LayoutCaches>>,
    pending: Rc<PendingEvictions>,
}

impl UILayoutManager {
    /// Create a manager for the subtree under `root`
    pub fn new(root: GameObjectId, config: LayoutConfig) -> Self {
        Self {
            root,
            config,
            caches: Rc::new(RefCell::new(LayoutCaches::default())),
            pending: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// UI root this manager lays out
    pub fn root(&self) -> GameObjectId {
        self.root
    }

    /// Layout settings
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Number of GameObjects with cached layout capabilities
    pub fn cached_objects(&self) -> usize {
        self.caches().watchers.len()
    }

    /// Borrow the caches, first applying any deferred evictions
    fn caches(&self) -> RefMut<'_, LayoutCaches> {
        let mut caches = self.caches.borrow_mut();
        for go in self.pending.borrow_mut().drain(..) {
            caches.evict(go);
        }
        caches
    }

    fn watch(&self, scene: &Scene, go: GameObjectId, caches: &mut LayoutCaches) {
        if caches.watchers.contains_key(&go) {
            return;
        }
        let evictor = CacheEvictor {
            caches: Rc::downgrade(&self.caches),
            pending: Rc::downgrade(&self.pending),
        };
        let object: Box<dyn ObjectListener> = Box::new(evictor.clone());
        let tree: Box<dyn GameObjectListener> = Box::new(evictor);
        let watchers = Watchers {
            _object: EventListener::new(object),
            _tree: EventListener::new(tree),
        };
        if let Some(events) = scene.object_events(go) {
            events.register_listener(&watchers._object);
        }
        if let Some(events) = scene.tree_events(go) {
            events.register_listener(&watchers._tree);
        }
        caches.watchers.insert(go, watchers);
    }

    fn elements(&self, scene: &Scene, go: GameObjectId) -> Vec<ComponentId> {
        let mut caches = self.caches();
        if let Some(elements) = caches.elements.get(&go) {
            return elements.clone();
        }
        let elements = scene.components_with(go, Capabilities::LAYOUT_ELEMENT);
        self.watch(scene, go, &mut caches);
        caches.elements.insert(go, elements.clone());
        elements
    }

    fn controllers(&self, scene: &Scene, go: GameObjectId) -> ControllerSet {
        let mut caches = self.caches();
        if let Some(controllers) = caches.controllers.get(&go) {
            return controllers.clone();
        }
        let (self_controllers, child_controllers) = scene.layout_controllers(go);
        let controllers = ControllerSet {
            self_controllers,
            child_controllers,
        };
        self.watch(scene, go, &mut caches);
        caches.controllers.insert(go, controllers.clone());
        controllers
    }

    /// Effective size of `go` along `axis`
    ///
    /// Elements are bucketed by priority and scanned from the highest
    /// bucket down; the first bucket reporting a non-negative value wins,
    /// taking the largest value within it. Unresolved sizes are zero.
    pub fn get_size(&self, scene: &Scene, go: GameObjectId, kind: SizeKind, axis: Axis) -> f32 {
        let mut buckets: BTreeMap<i32, f32> = BTreeMap::new();
        for id in self.elements(scene, go) {
            if !scene.is_enabled_recursively(id) {
                continue;
            }
            let Some(element) = scene
                .component_slot(id)
                .and_then(|slot| slot.behaviour())
                .and_then(|behaviour| behaviour.as_layout_element())
            else {
                continue;
            };
            let priority = element.layout_priority().unwrap_or(self.config.default_priority);
            let value = element.size(kind, axis);
            let best = buckets.entry(priority).or_insert(-1.0);
            if value > *best {
                *best = value;
            }
        }
        buckets
            .values()
            .rev()
            .copied()
            .find(|&value| value >= 0.0)
            .unwrap_or(0.0)
    }

    /// Run the four layout passes over the root's subtree
    ///
    /// Horizontal sizes are calculated and applied before vertical sizes are
    /// calculated. Only invalid elements recalculate and only invalid
    /// controllers apply; controllers are marked valid once both axes are
    /// applied.
    pub fn rebuild_layout(&self, scene: &mut Scene) {
        if !scene.contains(self.root) || scene.is_waiting_to_be_destroyed(self.root) {
            return;
        }
        let mut applied = Vec::new();
        for axis in Axis::ALL {
            self.calculate_pass(scene, axis);
            self.apply_pass(scene, axis, &mut applied);
        }
        for id in applied {
            scene.mark_layout_controller_valid(id);
        }
    }

    fn is_participating(scene: &Scene, go: GameObjectId) -> bool {
        scene.contains(go) && !scene.is_waiting_to_be_destroyed(go) && scene.is_enabled_recursively(go)
    }

    fn post_order(scene: &Scene, go: GameObjectId, out: &mut Vec<GameObjectId>) {
        if !Self::is_participating(scene, go) {
            return;
        }
        for &child in scene.children(go) {
            Self::post_order(scene, child, out);
        }
        out.push(go);
    }

    fn calculate_pass(&self, scene: &mut Scene, axis: Axis) {
        let mut order = Vec::new();
        Self::post_order(scene, self.root, &mut order);

        for go in order {
            if scene.rect(go).is_none() {
                continue;
            }
            for id in self.elements(scene, go) {
                if !scene.is_layout_element_dirty(id, axis) || !scene.is_enabled_recursively(id) {
                    continue;
                }
                scene.with_behaviour(id, |behaviour, scene| {
                    if let Some(element) = behaviour.as_layout_element_mut() {
                        element.calculate_layout(scene, self, go, axis);
                    }
                });
                scene.mark_layout_element_valid(id, axis);
            }
        }
    }

    fn apply_pass(&self, scene: &mut Scene, axis: Axis, applied: &mut Vec<ComponentId>) {
        let mut queue = VecDeque::from([self.root]);
        while let Some(go) = queue.pop_front() {
            if !Self::is_participating(scene, go) {
                continue;
            }
            if scene.rect(go).is_some() {
                let controllers = self.controllers(scene, go);
                if !controllers.self_controllers.is_empty() {
                    let own_elements = self.elements(scene, go);
                    for &id in &own_elements {
                        scene.set_element_listening(id, false);
                    }
                    for &id in &controllers.self_controllers {
                        self.apply_controller(scene, id, go, axis, applied);
                    }
                    for &id in &own_elements {
                        scene.set_element_listening(id, true);
                    }
                }
                for &id in &controllers.child_controllers {
                    self.apply_controller(scene, id, go, axis, applied);
                }
            }
            queue.extend(scene.children(go).iter().copied());
        }
    }

    fn apply_controller(
        &self,
        scene: &mut Scene,
        id: ComponentId,
        owner: GameObjectId,
        axis: Axis,
        applied: &mut Vec<ComponentId>,
    ) {
        if !scene.is_layout_controller_dirty(id) || !scene.is_enabled_recursively(id) {
            return;
        }
        scene.with_behaviour(id, |behaviour, scene| {
            if let Some(controller) = behaviour.as_layout_controller_mut() {
                controller.apply_layout(scene, self, owner, axis);
            }
        });
        if !applied.contains(&id) {
            applied.push(id);
        }
    }
}
