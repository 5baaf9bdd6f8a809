//! GameObject tree nodes and structural mutation

use super::cursor::IterCursor;
use super::{ComponentId, GameObjectId, ObjectId, ObjectState, Scene, SceneError, SceneResult};
use crate::events::{EventEmitter, GameObjectListener, TransformListener};

/// One node of the scene tree
pub struct GameObjectData {
    pub(crate) object: ObjectState,
    pub(crate) name: String,
    pub(crate) visible: bool,
    pub(crate) dont_destroy_on_load: bool,
    pub(crate) parent: Option<GameObjectId>,
    pub(crate) children: Vec<GameObjectId>,
    pub(crate) components: Vec<ComponentId>,
    /// Cached Transform-family component
    pub(crate) transform: Option<ComponentId>,
    pub(crate) pending_children: Vec<GameObjectId>,
    pub(crate) pending_components: Vec<ComponentId>,
    pub(crate) cursors: Vec<IterCursor>,
    pub(crate) tree_events: EventEmitter<dyn GameObjectListener>,
    pub(crate) transform_events: EventEmitter<dyn TransformListener>,
}

impl std::fmt::Debug for GameObjectData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameObjectData")
            .field("name", &self.name)
            .field("object", &self.object)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("components", &self.components)
            .finish()
    }
}

impl GameObjectData {
    fn new(instance_id: u64, name: String) -> Self {
        Self {
            object: ObjectState::new(instance_id),
            name,
            visible: true,
            dont_destroy_on_load: false,
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
            transform: None,
            pending_children: Vec::new(),
            pending_components: Vec::new(),
            cursors: Vec::new(),
            tree_events: EventEmitter::new(),
            transform_events: EventEmitter::new(),
        }
    }

    /// Lifecycle state
    pub fn object(&self) -> &ObjectState {
        &self.object
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render visibility of this subtree
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Survives [`Scene::unload`]
    pub fn dont_destroy_on_load(&self) -> bool {
        self.dont_destroy_on_load
    }

    /// Parent, `None` for roots
    pub fn parent(&self) -> Option<GameObjectId> {
        self.parent
    }

    /// Children in order
    pub fn children(&self) -> &[GameObjectId] {
        &self.children
    }

    /// Attached components in order
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Transform-family component, if any
    pub fn transform(&self) -> Option<ComponentId> {
        self.transform
    }

    /// Structural notifications
    pub fn tree_events(&self) -> &EventEmitter<dyn GameObjectListener> {
        &self.tree_events
    }

    /// Transform notifications
    pub fn transform_events(&self) -> &EventEmitter<dyn TransformListener> {
        &self.transform_events
    }
}

impl Scene {
    /// Create a new root GameObject
    pub fn create_game_object(&mut self, name: impl Into<String>) -> GameObjectId {
        let instance_id = self.next_instance_id();
        let id = self.objects.insert(GameObjectData::new(instance_id, name.into()));
        self.roots.push(id);
        log::trace!("Created GameObject {:?}", id);
        id
    }

    /// Create a GameObject appended to `parent`'s children
    pub fn create_child(&mut self, parent: GameObjectId, name: impl Into<String>) -> SceneResult<GameObjectId> {
        self.require_live(parent.into())?;
        let child = self.create_game_object(name);
        self.set_parent(child, Some(parent), None)?;
        Ok(child)
    }

    /// Node data of a GameObject
    pub fn game_object(&self, id: GameObjectId) -> Option<&GameObjectData> {
        self.objects.get(id)
    }

    /// Root GameObjects in order
    pub fn roots(&self) -> &[GameObjectId] {
        &self.roots
    }

    /// Name of a GameObject
    pub fn name(&self, id: GameObjectId) -> Option<&str> {
        self.objects.get(id).map(|data| data.name.as_str())
    }

    /// Parent of a GameObject
    pub fn parent(&self, id: GameObjectId) -> Option<GameObjectId> {
        self.objects.get(id).and_then(|data| data.parent)
    }

    /// Children of a GameObject; empty for stale handles
    pub fn children(&self, id: GameObjectId) -> &[GameObjectId] {
        self.objects
            .get(id)
            .map(|data| data.children.as_slice())
            .unwrap_or_default()
    }

    /// Components of a GameObject; empty for stale handles
    pub fn components(&self, id: GameObjectId) -> &[ComponentId] {
        self.objects
            .get(id)
            .map(|data| data.components.as_slice())
            .unwrap_or_default()
    }

    /// Clone of a GameObject's structural emitter
    pub fn tree_events(&self, id: GameObjectId) -> Option<EventEmitter<dyn GameObjectListener>> {
        self.objects.get(id).map(|data| data.tree_events.clone())
    }

    /// Clone of a GameObject's transform emitter
    pub fn transform_events(&self, id: GameObjectId) -> Option<EventEmitter<dyn TransformListener>> {
        self.objects.get(id).map(|data| data.transform_events.clone())
    }

    pub(crate) fn fire_tree(&mut self, go: GameObjectId, mut f: impl FnMut(&mut dyn GameObjectListener, &mut Scene)) {
        if let Some(events) = self.tree_events(go) {
            events.propagate(|l| f(l, self));
        }
    }

    /// Rename a GameObject, notifying `on_name_changed` if it differs
    pub fn set_name(&mut self, id: GameObjectId, name: impl Into<String>) -> SceneResult<()> {
        self.require_live(id.into())?;
        let name = name.into();
        let Some(data) = self.objects.get_mut(id) else {
            return Err(SceneError::StaleGameObject(id));
        };
        if data.name == name {
            return Ok(());
        }
        let previous = std::mem::replace(&mut data.name, name);
        self.fire_tree(id, |l, scene| l.on_name_changed(scene, id, &previous));
        Ok(())
    }

    /// Show or hide a subtree for render passes
    pub fn set_visible(&mut self, id: GameObjectId, visible: bool) -> SceneResult<()> {
        self.require_live(id.into())?;
        if let Some(data) = self.objects.get_mut(id) {
            data.visible = visible;
        }
        Ok(())
    }

    /// Keep a root alive across [`Scene::unload`]
    pub fn set_dont_destroy_on_load(&mut self, id: GameObjectId, keep: bool) -> SceneResult<()> {
        self.require_live(id.into())?;
        if let Some(data) = self.objects.get_mut(id) {
            data.dont_destroy_on_load = keep;
        }
        Ok(())
    }

    /// Whether `ancestor` is `descendant` or lies on its parent chain
    pub fn is_ancestor_of(&self, ancestor: GameObjectId, descendant: GameObjectId) -> bool {
        let mut current = Some(descendant);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// First direct child with a matching name
    pub fn find_child(&self, parent: GameObjectId, name: &str) -> Option<GameObjectId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.name(child) == Some(name))
    }

    /// Resolve a `/`-separated name path starting at the roots
    pub fn find_by_path(&self, path: &str) -> Option<GameObjectId> {
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let first = segments.next()?;
        let root = self
            .roots
            .iter()
            .copied()
            .find(|&root| self.name(root) == Some(first))?;
        segments.try_fold(root, |current, segment| self.find_child(current, segment))
    }

    /// Insert `child` under `parent` at `index` (append when `None`)
    pub fn add_child(&mut self, parent: GameObjectId, child: GameObjectId, index: Option<usize>) -> SceneResult<()> {
        self.set_parent(child, Some(parent), index)
    }

    /// Detach a direct child, turning it into a root
    pub fn remove_child(&mut self, parent: GameObjectId, child: GameObjectId) -> SceneResult<()> {
        self.require_live(parent.into())?;
        if self.parent(child) != Some(parent) {
            return Err(SceneError::NotAChild { parent, child });
        }
        self.set_parent(child, None, None)
    }

    /// Move `child` under `new_parent` (or to the roots) at `index`
    ///
    /// Rejects self-parenting and parenting under a descendant. Moving within
    /// the same parent is a remove followed by an insert, so a forward move
    /// from `j` to `i > j` lands at `i - 1`. Out-of-range indices append.
    pub fn set_parent(
        &mut self,
        child: GameObjectId,
        new_parent: Option<GameObjectId>,
        index: Option<usize>,
    ) -> SceneResult<()> {
        self.require_live(child.into())?;
        if let Some(parent) = new_parent {
            self.require_live(parent.into())?;
            if parent == child {
                log::warn!("Rejected self-parenting of {:?}", child);
                return Err(SceneError::SelfParenting(child));
            }
            if self.is_ancestor_of(child, parent) {
                log::warn!("Rejected cyclic parenting of {:?} under {:?}", child, parent);
                return Err(SceneError::CyclicParenting { child, parent });
            }
        }

        let old_parent = self.parent(child);
        if old_parent == new_parent {
            self.reorder(child, new_parent, index);
            return Ok(());
        }

        let affected = self.subtree_objects(child);
        let before = self.snapshot_recursive(&affected);

        if let Some(old) = old_parent {
            if let Some(position) = self.children(old).iter().position(|&c| c == child) {
                if let Some(data) = self.objects.get_mut(old) {
                    data.remove_child_at(position);
                }
            }
        } else {
            self.roots.retain(|&root| root != child);
        }

        let mut inserted_at = 0;
        match new_parent {
            Some(parent) => {
                if let Some(data) = self.objects.get_mut(parent) {
                    inserted_at = data.insert_child_at(index.unwrap_or(usize::MAX), child);
                }
            }
            None => {
                let at = index.unwrap_or(usize::MAX).min(self.roots.len());
                self.roots.insert(at, child);
            }
        }
        if let Some(data) = self.objects.get_mut(child) {
            data.parent = new_parent;
        }

        self.invalidate_recursive_cache(&affected);
        self.invalidate_transform_caches(child);

        if let Some(old) = old_parent {
            self.fire_tree(old, |l, scene| l.on_child_removed(scene, old, child));
        }
        if let Some(parent) = new_parent {
            self.fire_tree(parent, |l, scene| l.on_child_added(scene, parent, child, inserted_at));
        }
        self.fire_tree(child, |l, scene| l.on_parent_changed(scene, child, old_parent));
        self.notify_recursive_flips(&affected, &before);
        self.transform_changed(child);
        Ok(())
    }

    fn reorder(&mut self, child: GameObjectId, parent: Option<GameObjectId>, index: Option<usize>) {
        let siblings = match parent {
            Some(parent) => self.children(parent),
            None => self.roots.as_slice(),
        };
        let Some(from) = siblings.iter().position(|&c| c == child) else {
            return;
        };
        let target = index.unwrap_or(siblings.len()).min(siblings.len());
        let to = if target > from { target - 1 } else { target };
        if to == from {
            return;
        }

        match parent {
            Some(parent) => {
                if let Some(data) = self.objects.get_mut(parent) {
                    data.remove_child_at(from);
                    data.insert_child_at(to, child);
                }
                self.fire_tree(parent, |l, scene| l.on_child_removed(scene, parent, child));
                self.fire_tree(parent, |l, scene| l.on_child_added(scene, parent, child, to));
            }
            None => {
                self.roots.remove(from);
                self.roots.insert(to, child);
            }
        }
    }

    /// Mark a GameObject and its whole subtree for destruction
    ///
    /// Destroy notifications fire immediately for every object in the
    /// subtree. A child is then queued on its parent and freed by the next
    /// [`Scene::destroy_pending`] sweep of an ancestor; a root is freed inline.
    /// Repeated requests are no-ops.
    pub fn destroy(&mut self, id: GameObjectId) -> SceneResult<()> {
        let Some(data) = self.objects.get(id) else {
            return Err(SceneError::StaleGameObject(id));
        };
        if data.object.waiting_to_be_destroyed {
            return Ok(());
        }

        self.mark_for_destroy(id);

        match self.parent(id) {
            Some(parent) => {
                if let Some(data) = self.objects.get_mut(parent) {
                    if !data.pending_children.contains(&id) {
                        data.pending_children.push(id);
                    }
                }
            }
            None => {
                self.destroy_pending(id);
                self.free_game_object(id);
            }
        }
        Ok(())
    }

    fn mark_for_destroy(&mut self, id: GameObjectId) {
        let Some(data) = self.objects.get_mut(id) else {
            return;
        };
        if data.object.waiting_to_be_destroyed {
            return;
        }
        data.object.waiting_to_be_destroyed = true;
        let events = data.object.events.clone();
        if self.log_lifecycle() {
            log::debug!("Destroying GameObject {:?}", id);
        }
        events.propagate(|l| l.on_destroy(self, ObjectId::GameObject(id)));

        self.for_each_component(id, |scene, cid| scene.mark_component_for_destroy(cid));
        self.for_each_child(id, |scene, child| scene.mark_for_destroy(child));
    }

    /// Free everything queued for destruction under `id`
    ///
    /// Recurses into children first, then drains this GameObject's pending
    /// children (unparent and free) and pending components (detach and free).
    pub fn destroy_pending(&mut self, id: GameObjectId) {
        if !self.contains(id) {
            return;
        }
        self.for_each_child(id, |scene, child| scene.destroy_pending(child));

        loop {
            let Some(data) = self.objects.get_mut(id) else {
                return;
            };
            let children = std::mem::take(&mut data.pending_children);
            let components = std::mem::take(&mut data.pending_components);
            if children.is_empty() && components.is_empty() {
                return;
            }

            for child in children {
                if let Some(position) = self.children(id).iter().position(|&c| c == child) {
                    if let Some(data) = self.objects.get_mut(id) {
                        data.remove_child_at(position);
                    }
                    self.fire_tree(id, |l, scene| l.on_child_removed(scene, id, child));
                }
                self.free_game_object(child);
            }
            for component in components {
                self.detach_component(id, component);
                self.free_component(component);
            }
        }
    }

    fn free_game_object(&mut self, id: GameObjectId) {
        let Some(data) = self.objects.remove(id) else {
            return;
        };
        if data.parent.is_none() {
            self.roots.retain(|&root| root != id);
        }
        for component in data.components {
            self.free_component(component);
        }
        for child in data.children {
            self.free_game_object(child);
        }
        log::trace!("Freed GameObject {:?}", id);
    }

    /// Destroy every root not flagged `dont_destroy_on_load`
    pub fn unload(&mut self) {
        let doomed: Vec<_> = self
            .roots
            .iter()
            .copied()
            .filter(|&root| !self.objects.get(root).is_some_and(|data| data.dont_destroy_on_load))
            .collect();
        log::debug!("Unloading {} root(s)", doomed.len());
        for root in doomed {
            if let Err(e) = self.destroy(root) {
                log::warn!("Failed to unload {:?}: {}", root, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use crate::events::EventListener;

    #[derive(Debug, PartialEq)]
    enum TreeEvent {
        Added(usize),
        Removed,
        Parent(Option<GameObjectId>),
        Name(String),
    }

    struct TreeRecorder {
        log: Rc<RefCell<Vec<TreeEvent>>>,
    }

    impl GameObjectListener for TreeRecorder {
        fn on_name_changed(&mut self, scene: &mut Scene, object: GameObjectId, previous: &str) {
            let now = scene.name(object).unwrap_or_default().to_string();
            self.log.borrow_mut().push(TreeEvent::Name(format!("{previous}->{now}")));
        }

        fn on_parent_changed(&mut self, _scene: &mut Scene, _object: GameObjectId, previous: Option<GameObjectId>) {
            self.log.borrow_mut().push(TreeEvent::Parent(previous));
        }

        fn on_child_added(&mut self, _scene: &mut Scene, _parent: GameObjectId, _child: GameObjectId, index: usize) {
            self.log.borrow_mut().push(TreeEvent::Added(index));
        }

        fn on_child_removed(&mut self, _scene: &mut Scene, _parent: GameObjectId, _child: GameObjectId) {
            self.log.borrow_mut().push(TreeEvent::Removed);
        }
    }

    fn record(scene: &Scene, id: GameObjectId) -> (EventListener<dyn GameObjectListener>, Rc<RefCell<Vec<TreeEvent>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let listener: EventListener<dyn GameObjectListener> =
            EventListener::new(Box::new(TreeRecorder { log: Rc::clone(&log) }));
        scene.tree_events(id).unwrap().register_listener(&listener);
        (listener, log)
    }

    #[test]
    fn test_create_child_links_both_ways() {
        let mut scene = Scene::new();
        let root = scene.create_game_object("root");
        let child = scene.create_child(root, "child").unwrap();

        assert_eq!(scene.parent(child), Some(root));
        assert_eq!(scene.children(root), &[child]);
        assert_eq!(scene.roots(), &[root]);
    }

    #[test]
    fn test_self_and_cyclic_parenting_rejected() {
        let mut scene = Scene::new();
        let root = scene.create_game_object("root");
        let child = scene.create_child(root, "child").unwrap();

        assert_eq!(scene.set_parent(root, Some(root), None), Err(SceneError::SelfParenting(root)));
        assert_eq!(
            scene.set_parent(root, Some(child), None),
            Err(SceneError::CyclicParenting { child: root, parent: child })
        );
        assert_eq!(scene.parent(root), None);
        assert_eq!(scene.children(root), &[child]);
    }

    #[test]
    fn test_forward_reorder_matches_remove_then_insert() {
        let mut scene = Scene::new();
        let parent = scene.create_game_object("parent");
        let kids: Vec<_> = (0..5)
            .map(|i| scene.create_child(parent, format!("c{i}")).unwrap())
            .collect();

        // Move index 1 to index 4 within the same parent
        scene.set_parent(kids[1], Some(parent), Some(4)).unwrap();

        let mut expected = kids.clone();
        let moved = expected.remove(1);
        expected.insert(3, moved);
        assert_eq!(scene.children(parent), expected.as_slice());
    }

    #[test]
    fn test_backward_reorder_inserts_at_index() {
        let mut scene = Scene::new();
        let parent = scene.create_game_object("parent");
        let kids: Vec<_> = (0..3)
            .map(|i| scene.create_child(parent, format!("c{i}")).unwrap())
            .collect();

        scene.set_parent(kids[2], Some(parent), Some(0)).unwrap();
        assert_eq!(scene.children(parent), &[kids[2], kids[0], kids[1]]);
    }

    #[test]
    fn test_reparent_fires_structural_events() {
        let mut scene = Scene::new();
        let a = scene.create_game_object("a");
        let b = scene.create_game_object("b");
        let child = scene.create_child(a, "child").unwrap();
        let (_la, log_a) = record(&scene, a);
        let (_lb, log_b) = record(&scene, b);
        let (_lc, log_child) = record(&scene, child);

        scene.set_parent(child, Some(b), None).unwrap();

        assert_eq!(*log_a.borrow(), vec![TreeEvent::Removed]);
        assert_eq!(*log_b.borrow(), vec![TreeEvent::Added(0)]);
        assert_eq!(*log_child.borrow(), vec![TreeEvent::Parent(Some(a))]);
        assert_eq!(scene.roots(), &[a, b]);
    }

    #[test]
    fn test_remove_child_makes_root() {
        let mut scene = Scene::new();
        let a = scene.create_game_object("a");
        let b = scene.create_game_object("b");
        let child = scene.create_child(a, "child").unwrap();

        assert_eq!(
            scene.remove_child(b, child),
            Err(SceneError::NotAChild { parent: b, child })
        );
        scene.remove_child(a, child).unwrap();
        assert_eq!(scene.parent(child), None);
        assert_eq!(scene.roots(), &[a, b, child]);
    }

    #[test]
    fn test_set_name_notifies_only_on_change() {
        let mut scene = Scene::new();
        let go = scene.create_game_object("old");
        let (_listener, log) = record(&scene, go);

        scene.set_name(go, "old").unwrap();
        scene.set_name(go, "new").unwrap();

        assert_eq!(*log.borrow(), vec![TreeEvent::Name("old->new".to_string())]);
    }

    #[test]
    fn test_find_by_path() {
        let mut scene = Scene::new();
        let canvas = scene.create_game_object("canvas");
        let panel = scene.create_child(canvas, "panel").unwrap();
        let button = scene.create_child(panel, "button").unwrap();

        assert_eq!(scene.find_by_path("canvas/panel/button"), Some(button));
        assert_eq!(scene.find_by_path("/canvas/panel"), Some(panel));
        assert_eq!(scene.find_by_path("canvas/missing"), None);
    }

    #[test]
    fn test_destroy_child_is_deferred_until_sweep() {
        let mut scene = Scene::new();
        let root = scene.create_game_object("root");
        let child = scene.create_child(root, "child").unwrap();
        let grandchild = scene.create_child(child, "grandchild").unwrap();

        scene.destroy(child).unwrap();
        assert!(scene.contains(child));
        assert!(scene.is_waiting_to_be_destroyed(grandchild));
        assert_eq!(scene.destroy(child), Ok(()));

        scene.destroy_pending(root);
        assert!(!scene.contains(child));
        assert!(!scene.contains(grandchild));
        assert!(scene.children(root).is_empty());
    }

    #[test]
    fn test_destroy_root_is_immediate() {
        let mut scene = Scene::new();
        let root = scene.create_game_object("root");
        scene.create_child(root, "child").unwrap();

        scene.destroy(root).unwrap();

        assert_eq!(scene.game_object_count(), 0);
        assert!(scene.roots().is_empty());
        assert_eq!(scene.destroy(root), Err(SceneError::StaleGameObject(root)));
    }

    #[test]
    fn test_unload_keeps_flagged_roots() {
        let mut scene = Scene::new();
        let level = scene.create_game_object("level");
        let persistent = scene.create_game_object("persistent");
        scene.set_dont_destroy_on_load(persistent, true).unwrap();

        scene.unload();

        assert!(!scene.contains(level));
        assert_eq!(scene.roots(), &[persistent]);
    }
}
