//! Transform-family components and matrix queries
//!
//! A GameObject carries at most one transform: a spatial [`Transform`] or a
//! UI [`RectTransform`]. Local and world matrices (and for rects, the
//! resolved rect) are cached on the component and dropped for the whole
//! subtree whenever a node moves, is re-parented, or gains or loses its
//! transform. Every such change raises `on_transform_changed` on the node and
//! its descendants, then `on_child_transform_changed` on its parent.

use std::cell::Cell;

mod rect;
mod spatial;

pub use rect::{Margins, RectLayout, RectTransform};
pub use spatial::Transform;

use crate::foundation::math::{Mat4, Quat, Rect, Transform as Trs, Vec2, Vec3};
use crate::scene::{Capabilities, ComponentId, GameObjectId, Scene, SceneResult};
use crate::ui::layout::Axis;

#[derive(Debug, Default)]
pub(crate) struct MatrixCache {
    pub(crate) local: Cell<Option<Mat4>>,
    pub(crate) world: Cell<Option<Mat4>>,
}

impl MatrixCache {
    pub(crate) fn invalidate(&self) {
        self.local.set(None);
        self.world.set(None);
    }
}

impl Scene {
    fn transform_id(&self, go: GameObjectId) -> Option<ComponentId> {
        self.objects.get(go)?.transform
    }

    /// Spatial transform of a GameObject
    pub fn transform_of(&self, go: GameObjectId) -> Option<&Transform> {
        self.component::<Transform>(self.transform_id(go)?)
    }

    /// Rect transform of a GameObject
    pub fn rect_transform(&self, go: GameObjectId) -> Option<&RectTransform> {
        self.component::<RectTransform>(self.transform_id(go)?)
    }

    fn matrix_cache(&self, go: GameObjectId) -> Option<&MatrixCache> {
        let id = self.transform_id(go)?;
        if self.capabilities(id).contains(Capabilities::RECT_TRANSFORM) {
            self.component::<RectTransform>(id).map(|rect| &rect.cache)
        } else {
            self.component::<Transform>(id).map(|transform| &transform.cache)
        }
    }

    /// Matrix from `go`'s local space into its parent's space
    ///
    /// Identity when `go` has no transform.
    pub fn local_matrix(&self, go: GameObjectId) -> Mat4 {
        if let Some(transform) = self.transform_of(go) {
            return transform.local_matrix();
        }
        let Some(rect_transform) = self.rect_transform(go) else {
            return Mat4::identity();
        };
        if let Some(matrix) = rect_transform.cache.local.get() {
            return matrix;
        }
        let rect = self.rect(go).unwrap_or_default();
        let matrix = rect_transform.layout.matrix(rect);
        rect_transform.cache.local.set(Some(matrix));
        matrix
    }

    /// Matrix from `go`'s local space into world space
    ///
    /// A GameObject without a transform passes its parent's matrix through.
    pub fn world_matrix(&self, go: GameObjectId) -> Mat4 {
        let parent_world = |scene: &Scene| {
            scene
                .parent(go)
                .map_or_else(Mat4::identity, |parent| scene.world_matrix(parent))
        };
        let Some(cache) = self.matrix_cache(go) else {
            return parent_world(self);
        };
        if let Some(matrix) = cache.world.get() {
            return matrix;
        }
        let matrix = parent_world(self) * self.local_matrix(go);
        cache.world.set(Some(matrix));
        matrix
    }

    /// Resolved rect of `go` in its parent's rect space
    ///
    /// Resolved against the parent's rect, or against the reference size when
    /// the parent has none. `None` without a [`RectTransform`].
    pub fn rect(&self, go: GameObjectId) -> Option<Rect> {
        let rect_transform = self.rect_transform(go)?;
        if let Some(rect) = rect_transform.rect.get() {
            return Some(rect);
        }
        let parent_size = self
            .parent(go)
            .and_then(|parent| self.rect(parent))
            .map_or(rect_transform.layout.reference_size, |rect| rect.size());
        let rect = rect_transform.layout.resolve(parent_size);
        rect_transform.rect.set(Some(rect));
        Some(rect)
    }

    /// Size of the area `go`'s anchors refer to
    pub fn parent_rect_size(&self, go: GameObjectId) -> Option<Vec2> {
        let rect_transform = self.rect_transform(go)?;
        Some(
            self.parent(go)
                .and_then(|parent| self.rect(parent))
                .map_or(rect_transform.layout.reference_size, |rect| rect.size()),
        )
    }

    /// Drop cached matrices and rects for `go` and its descendants
    pub(crate) fn invalidate_transform_caches(&self, go: GameObjectId) {
        let mut stack = vec![go];
        while let Some(current) = stack.pop() {
            if let Some(transform) = self.transform_of(current) {
                transform.cache.invalidate();
            } else if let Some(rect_transform) = self.rect_transform(current) {
                rect_transform.invalidate();
            }
            stack.extend_from_slice(self.children(current));
        }
    }

    /// Invalidate caches under `go` and raise the transform notifications
    pub(crate) fn transform_changed(&mut self, go: GameObjectId) {
        self.invalidate_transform_caches(go);
        self.notify_transform_changed(go);
        if let Some(parent) = self.parent(go) {
            if let Some(events) = self.transform_events(parent) {
                events.propagate(|l| l.on_child_transform_changed(self, parent, go));
            }
        }
    }

    fn notify_transform_changed(&mut self, go: GameObjectId) {
        if let Some(events) = self.transform_events(go) {
            events.propagate(|l| l.on_transform_changed(self, go));
        }
        self.for_each_child(go, Scene::notify_transform_changed);
    }

    fn modify_transform(&mut self, go: GameObjectId, f: impl FnOnce(&mut Trs)) -> SceneResult<()> {
        self.require_live(go.into())?;
        let Some(id) = self.transform_id(go) else {
            log::trace!("Ignored transform change on {:?}: no transform", go);
            return Ok(());
        };
        let Some(transform) = self.component_mut::<Transform>(id) else {
            return Ok(());
        };
        let before = transform.local.clone();
        f(&mut transform.local);
        if transform.local != before {
            self.transform_changed(go);
        }
        Ok(())
    }

    /// Set the local position
    pub fn set_local_position(&mut self, go: GameObjectId, position: Vec3) -> SceneResult<()> {
        self.modify_transform(go, |local| local.position = position)
    }

    /// Set the local rotation
    pub fn set_local_rotation(&mut self, go: GameObjectId, rotation: Quat) -> SceneResult<()> {
        self.modify_transform(go, |local| local.rotation = rotation)
    }

    /// Set the local scale
    pub fn set_local_scale(&mut self, go: GameObjectId, scale: Vec3) -> SceneResult<()> {
        self.modify_transform(go, |local| local.scale = scale)
    }

    /// Replace the whole local placement
    pub fn set_local_transform(&mut self, go: GameObjectId, transform: Trs) -> SceneResult<()> {
        self.modify_transform(go, |local| *local = transform)
    }

    fn modify_rect_transform(&mut self, go: GameObjectId, f: impl FnOnce(&mut RectLayout)) -> SceneResult<()> {
        self.require_live(go.into())?;
        let Some(id) = self.transform_id(go) else {
            log::trace!("Ignored rect change on {:?}: no rect transform", go);
            return Ok(());
        };
        let Some(rect_transform) = self.component_mut::<RectTransform>(id) else {
            return Ok(());
        };
        let before = rect_transform.layout;
        f(&mut rect_transform.layout);
        if rect_transform.layout != before {
            self.transform_changed(go);
        }
        Ok(())
    }

    /// Set both anchors
    pub fn set_anchors(&mut self, go: GameObjectId, anchor_min: Vec2, anchor_max: Vec2) -> SceneResult<()> {
        self.modify_rect_transform(go, |layout| {
            layout.anchor_min = anchor_min;
            layout.anchor_max = anchor_max;
        })
    }

    /// Set all four margins
    pub fn set_margins(&mut self, go: GameObjectId, margins: Margins) -> SceneResult<()> {
        self.modify_rect_transform(go, |layout| layout.margins = margins)
    }

    /// Set the pivot
    pub fn set_pivot(&mut self, go: GameObjectId, pivot: Vec2) -> SceneResult<()> {
        self.modify_rect_transform(go, |layout| layout.pivot = pivot)
    }

    /// Set the rect rotation, in radians
    pub fn set_rect_rotation(&mut self, go: GameObjectId, rotation: f32) -> SceneResult<()> {
        self.modify_rect_transform(go, |layout| layout.rotation = rotation)
    }

    /// Set the rect scale
    pub fn set_rect_scale(&mut self, go: GameObjectId, scale: Vec2) -> SceneResult<()> {
        self.modify_rect_transform(go, |layout| layout.scale = scale)
    }

    /// Set the parent size assumed when there is no parent rect
    pub fn set_reference_size(&mut self, go: GameObjectId, size: Vec2) -> SceneResult<()> {
        self.modify_rect_transform(go, |layout| layout.reference_size = size)
    }

    /// Set anchors and margins along one axis
    ///
    /// Notifies only if something actually changed.
    pub fn set_axis_placement(
        &mut self,
        go: GameObjectId,
        axis: Axis,
        anchor_min: f32,
        anchor_max: f32,
        start: f32,
        end: f32,
    ) -> SceneResult<()> {
        let i = axis.index();
        self.modify_rect_transform(go, |layout| {
            layout.anchor_min[i] = anchor_min;
            layout.anchor_max[i] = anchor_max;
            layout.margins.set_axis(axis, start, end);
        })
    }

    /// Resize along `axis`, keeping the anchors and the leading margin
    pub fn set_size_along_axis(&mut self, go: GameObjectId, axis: Axis, size: f32) -> SceneResult<()> {
        let Some(parent_size) = self.parent_rect_size(go) else {
            return Ok(());
        };
        let Some(layout) = self.rect_transform(go).map(|rect| rect.layout) else {
            return Ok(());
        };
        let i = axis.index();
        let span = (layout.anchor_max[i] - layout.anchor_min[i]) * parent_size[i];
        let start = layout.margins.start(axis);
        self.set_axis_placement(go, axis, layout.anchor_min[i], layout.anchor_max[i], start, span - start - size)
    }
}
