//! Mutation-safe iteration over child and component lists
//!
//! Every walk over a GameObject's children or components pushes a cursor
//! onto that GameObject. Insertions and removals on the list shift each
//! cursor so it keeps pointing at the same logical position. When the element
//! under a cursor is removed, the cursor stays on the slot the next element
//! slid into and holds for one step instead of advancing past it.

use super::{ComponentId, GameObjectData, GameObjectId, Scene, SceneResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListKind {
    Children,
    Components,
}

#[derive(Debug, Clone)]
pub(crate) struct IterCursor {
    id: u64,
    kind: ListKind,
    index: usize,
    /// Skip the next advance: `index` already names the next element
    hold: bool,
}

impl IterCursor {
    fn new(id: u64, kind: ListKind) -> Self {
        Self {
            id,
            kind,
            index: 0,
            hold: true,
        }
    }

    fn step(&mut self) -> usize {
        if self.hold {
            self.hold = false;
        } else {
            self.index += 1;
        }
        self.index
    }

    fn on_removed(&mut self, at: usize) {
        if at < self.index {
            self.index -= 1;
        } else if at == self.index && !self.hold {
            self.hold = true;
        }
    }

    fn on_inserted(&mut self, at: usize) {
        if at < self.index || (at == self.index && !self.hold) {
            self.index += 1;
        }
    }
}

impl GameObjectData {
    fn adjust_cursors(&mut self, kind: ListKind, f: impl Fn(&mut IterCursor)) {
        self.cursors
            .iter_mut()
            .filter(|cursor| cursor.kind == kind)
            .for_each(f);
    }

    pub(crate) fn insert_child_at(&mut self, index: usize, child: GameObjectId) -> usize {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
        self.adjust_cursors(ListKind::Children, |c| c.on_inserted(index));
        index
    }

    pub(crate) fn remove_child_at(&mut self, index: usize) -> GameObjectId {
        let child = self.children.remove(index);
        self.adjust_cursors(ListKind::Children, |c| c.on_removed(index));
        child
    }

    pub(crate) fn insert_component_at(&mut self, index: usize, component: ComponentId) -> usize {
        let index = index.min(self.components.len());
        self.components.insert(index, component);
        self.adjust_cursors(ListKind::Components, |c| c.on_inserted(index));
        index
    }

    pub(crate) fn remove_component_at(&mut self, index: usize) -> ComponentId {
        let component = self.components.remove(index);
        self.adjust_cursors(ListKind::Components, |c| c.on_removed(index));
        component
    }
}

impl Scene {
    fn push_cursor(&mut self, go: GameObjectId, kind: ListKind) -> Option<u64> {
        let id = self.next_cursor_id();
        self.objects.get_mut(go)?.cursors.push(IterCursor::new(id, kind));
        Some(id)
    }

    fn pop_cursor(&mut self, go: GameObjectId, cursor: u64) {
        if let Some(data) = self.objects.get_mut(go) {
            data.cursors.retain(|c| c.id != cursor);
        }
    }

    fn advance_cursor<K: Copy>(
        &mut self,
        go: GameObjectId,
        cursor: u64,
        list: fn(&GameObjectData) -> &[K],
    ) -> Option<K> {
        let data = self.objects.get_mut(go)?;
        let position = data.cursors.iter().position(|c| c.id == cursor)?;
        let index = data.cursors[position].step();
        list(data).get(index).copied()
    }

    /// Visit every element of one of `go`'s lists, tolerating structural
    /// changes made by `visit`
    ///
    /// Stops early if `go` itself is freed.
    pub(crate) fn iterate<K: Copy>(
        &mut self,
        go: GameObjectId,
        kind: ListKind,
        list: fn(&GameObjectData) -> &[K],
        mut visit: impl FnMut(&mut Scene, K),
    ) {
        let Some(cursor) = self.push_cursor(go, kind) else {
            return;
        };
        while let Some(item) = self.advance_cursor(go, cursor, list) {
            visit(self, item);
        }
        self.pop_cursor(go, cursor);
    }

    pub(crate) fn for_each_child(&mut self, go: GameObjectId, visit: impl FnMut(&mut Scene, GameObjectId)) {
        self.iterate(go, ListKind::Children, |data| &data.children, visit);
    }

    pub(crate) fn for_each_component(&mut self, go: GameObjectId, visit: impl FnMut(&mut Scene, ComponentId)) {
        self.iterate(go, ListKind::Components, |data| &data.components, visit);
    }

    /// Start an externally driven walk over `parent`'s children
    ///
    /// The cursor follows insertions and removals on the list until it is
    /// released.
    pub fn child_cursor(&mut self, parent: GameObjectId) -> SceneResult<ChildCursor> {
        let id = self
            .push_cursor(parent, ListKind::Children)
            .ok_or(super::SceneError::StaleGameObject(parent))?;
        Ok(ChildCursor { parent, id })
    }
}

/// Resumable walk over a GameObject's children
///
/// Call [`ChildCursor::release`] when done; an unreleased cursor keeps being
/// adjusted until its GameObject is freed.
#[derive(Debug)]
pub struct ChildCursor {
    parent: GameObjectId,
    id: u64,
}

impl ChildCursor {
    /// GameObject whose children are walked
    pub fn parent(&self) -> GameObjectId {
        self.parent
    }

    /// Next child, or `None` when the list is exhausted or the parent is gone
    pub fn next(&self, scene: &mut Scene) -> Option<GameObjectId> {
        scene.advance_cursor(self.parent, self.id, |data| &data.children)
    }

    /// Stop tracking
    pub fn release(self, scene: &mut Scene) {
        scene.pop_cursor(self.parent, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_steps_in_order() {
        let mut cursor = IterCursor::new(1, ListKind::Children);
        assert_eq!(cursor.step(), 0);
        assert_eq!(cursor.step(), 1);
        assert_eq!(cursor.step(), 2);
    }

    #[test]
    fn test_removing_current_element_holds_position() {
        let mut cursor = IterCursor::new(1, ListKind::Children);
        cursor.step();
        cursor.step();
        cursor.on_removed(1);
        // The element that slid into slot 1 is visited next
        assert_eq!(cursor.step(), 1);
        assert_eq!(cursor.step(), 2);
    }

    #[test]
    fn test_removal_before_cursor_shifts_back() {
        let mut cursor = IterCursor::new(1, ListKind::Components);
        cursor.step();
        cursor.step();
        cursor.step();
        cursor.on_removed(0);
        assert_eq!(cursor.step(), 2);
    }

    #[test]
    fn test_insertion_at_current_element_is_not_revisited() {
        let mut cursor = IterCursor::new(1, ListKind::Children);
        cursor.step();
        cursor.on_inserted(0);
        // Current element moved to slot 1, so the next visit is slot 2
        assert_eq!(cursor.step(), 2);
    }

    #[test]
    fn test_child_cursor_survives_removal_of_current() {
        let mut scene = Scene::new();
        let parent = scene.create_game_object("parent");
        let a = scene.create_child(parent, "a").unwrap();
        let b = scene.create_child(parent, "b").unwrap();
        let c = scene.create_child(parent, "c").unwrap();

        let cursor = scene.child_cursor(parent).unwrap();
        assert_eq!(cursor.next(&mut scene), Some(a));
        assert_eq!(cursor.next(&mut scene), Some(b));
        scene.remove_child(parent, b).unwrap();
        assert_eq!(cursor.next(&mut scene), Some(c));
        assert_eq!(cursor.next(&mut scene), None);
        cursor.release(&mut scene);

        assert!(scene.game_object(parent).unwrap().cursors.is_empty());
    }
}
