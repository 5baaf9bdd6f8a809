//! Explicit size declaration

use serde::{Deserialize, Serialize};

use super::{Axis, LayoutElement, SizeKind, UILayoutManager};
use crate::foundation::math::Vec2;
use crate::scene::meta::{self, MetaError};
use crate::scene::{Capabilities, Component, ComponentId, GameObjectId, Scene, SceneError, SceneResult};

/// Layout element with fixed min / preferred / flexible sizes
///
/// Any size may be left negative ("unset") so that a lower-priority element
/// on the same GameObject supplies it.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSizes {
    /// Indexed by [`SizeKind`], then by axis
    sizes: [[f32; 2]; 3],
    priority: Option<i32>,
}

impl Default for LayoutSizes {
    fn default() -> Self {
        Self {
            sizes: [[-1.0; 2]; 3],
            priority: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct LayoutSizesMeta {
    min: [f32; 2],
    preferred: [f32; 2],
    flexible: [f32; 2],
    #[serde(default)]
    priority: Option<i32>,
}

impl LayoutSizes {
    /// Type tag
    pub const TYPE_NAME: &'static str = "LayoutSizes";

    /// Set the minimum size
    pub fn with_min(mut self, size: Vec2) -> Self {
        self.sizes[SizeKind::Min.index()] = size.into();
        self
    }

    /// Set the preferred size
    pub fn with_preferred(mut self, size: Vec2) -> Self {
        self.sizes[SizeKind::Preferred.index()] = size.into();
        self
    }

    /// Set the flexible weights
    pub fn with_flexible(mut self, weight: Vec2) -> Self {
        self.sizes[SizeKind::Flexible.index()] = weight.into();
        self
    }

    /// Set the priority bucket
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Declared value, negative when unset
    pub fn get(&self, kind: SizeKind, axis: Axis) -> f32 {
        self.sizes[kind.index()][axis.index()]
    }
}

impl LayoutElement for LayoutSizes {
    fn layout_priority(&self) -> Option<i32> {
        self.priority
    }

    fn calculate_layout(&mut self, _scene: &Scene, _manager: &UILayoutManager, _owner: GameObjectId, _axis: Axis) {}

    fn size(&self, kind: SizeKind, axis: Axis) -> f32 {
        self.get(kind, axis)
    }
}

impl Component for LayoutSizes {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LAYOUT_ELEMENT
    }

    fn export_meta(&self) -> Result<Option<ron::Value>, MetaError> {
        meta::export_as(&LayoutSizesMeta {
            min: self.sizes[SizeKind::Min.index()],
            preferred: self.sizes[SizeKind::Preferred.index()],
            flexible: self.sizes[SizeKind::Flexible.index()],
            priority: self.priority,
        })
    }

    fn import_meta(&mut self, value: &ron::Value) -> Result<(), MetaError> {
        let data: LayoutSizesMeta = meta::from_value(value)?;
        self.sizes = [data.min, data.preferred, data.flexible];
        self.priority = data.priority;
        Ok(())
    }

    fn as_layout_element(&self) -> Option<&dyn LayoutElement> {
        Some(self)
    }

    fn as_layout_element_mut(&mut self) -> Option<&mut dyn LayoutElement> {
        Some(self)
    }
}

impl Scene {
    /// Change one declared size of a [`LayoutSizes`] and invalidate it
    pub fn set_layout_size(&mut self, id: ComponentId, kind: SizeKind, axis: Axis, value: f32) -> SceneResult<()> {
        self.require_live(id.into())?;
        let Some(sizes) = self.component_mut::<LayoutSizes>(id) else {
            return Err(SceneError::StaleComponent(id));
        };
        let slot = &mut sizes.sizes[kind.index()][axis.index()];
        if *slot == value {
            return Ok(());
        }
        *slot = value;
        self.invalidate_layout_element(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_each_kind() {
        let sizes = LayoutSizes::default()
            .with_min(Vec2::new(1.0, 2.0))
            .with_preferred(Vec2::new(3.0, 4.0))
            .with_flexible(Vec2::new(0.0, 1.0))
            .with_priority(2);

        assert_eq!(sizes.get(SizeKind::Min, Axis::Vertical), 2.0);
        assert_eq!(sizes.get(SizeKind::Preferred, Axis::Horizontal), 3.0);
        assert_eq!(sizes.get(SizeKind::Flexible, Axis::Horizontal), 0.0);
        assert_eq!(sizes.layout_priority(), Some(2));
    }

    #[test]
    fn test_meta_roundtrip_keeps_unset_values() {
        let original = LayoutSizes::default().with_preferred(Vec2::new(20.0, -1.0)).with_priority(3);

        let value = original.export_meta().unwrap().unwrap();
        let mut restored = LayoutSizes::default();
        restored.import_meta(&value).unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn test_set_layout_size_invalidates() {
        let mut scene = Scene::new();
        let go = scene.create_game_object("label");
        let id = scene.attach(go, Box::new(LayoutSizes::default())).unwrap();
        scene.mark_layout_element_valid(id, Axis::Horizontal);

        scene.set_layout_size(id, SizeKind::Preferred, Axis::Horizontal, 14.0).unwrap();

        assert!(scene.is_layout_element_dirty(id, Axis::Horizontal));
        assert_eq!(
            scene.component::<LayoutSizes>(id).map(|s| s.get(SizeKind::Preferred, Axis::Horizontal)),
            Some(14.0)
        );
    }
}
