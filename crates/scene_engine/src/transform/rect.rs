//! UI rect transform component

use std::cell::Cell;

use serde::{Deserialize, Serialize};

use super::MatrixCache;
use crate::foundation::math::{Mat4, Rect, Vec2, Vec3};
use crate::scene::meta::{self, MetaError};
use crate::scene::{Capabilities, Component};
use crate::ui::layout::Axis;

/// Insets from the anchored edges, in parent units (Y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Margins {
    /// Inset of the left edge
    pub left: f32,
    /// Inset of the top edge
    pub top: f32,
    /// Inset of the right edge
    pub right: f32,
    /// Inset of the bottom edge
    pub bottom: f32,
}

impl Margins {
    /// Create margins from the four insets
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Same inset on every side
    pub fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    /// Leading inset along `axis` (left or top)
    pub fn start(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.left,
            Axis::Vertical => self.top,
        }
    }

    /// Trailing inset along `axis` (right or bottom)
    pub fn end(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.right,
            Axis::Vertical => self.bottom,
        }
    }

    /// Sum of both insets along `axis`
    pub fn total(&self, axis: Axis) -> f32 {
        self.start(axis) + self.end(axis)
    }

    pub(crate) fn set_axis(&mut self, axis: Axis, start: f32, end: f32) {
        match axis {
            Axis::Horizontal => {
                self.left = start;
                self.right = end;
            }
            Axis::Vertical => {
                self.top = start;
                self.bottom = end;
            }
        }
    }
}

/// Placement parameters of a rect, relative to its parent rect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectLayout {
    /// Normalized parent point the top-left edge hangs from
    pub anchor_min: Vec2,
    /// Normalized parent point the bottom-right edge hangs from
    pub anchor_max: Vec2,
    /// Insets from the anchored edges
    pub margins: Margins,
    /// Normalized rotation and scale origin inside the rect
    pub pivot: Vec2,
    /// Rotation about the view axis, radians
    pub rotation: f32,
    /// Scale about the pivot
    pub scale: Vec2,
    /// Parent size assumed when there is no parent rect
    pub reference_size: Vec2,
}

impl Default for RectLayout {
    fn default() -> Self {
        Self {
            anchor_min: Vec2::zeros(),
            anchor_max: Vec2::new(1.0, 1.0),
            margins: Margins::default(),
            pivot: Vec2::new(0.5, 0.5),
            rotation: 0.0,
            scale: Vec2::new(1.0, 1.0),
            reference_size: Vec2::zeros(),
        }
    }
}

impl RectLayout {
    /// Resolve the rect inside a parent of `parent_size`
    pub fn resolve(&self, parent_size: Vec2) -> Rect {
        let x = self.anchor_min.x * parent_size.x + self.margins.left;
        let y = self.anchor_min.y * parent_size.y + self.margins.top;
        let right = self.anchor_max.x * parent_size.x - self.margins.right;
        let bottom = self.anchor_max.y * parent_size.y - self.margins.bottom;
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Matrix placing the rect's local space inside its parent
    pub fn matrix(&self, rect: Rect) -> Mat4 {
        let offset = Vec3::new(self.pivot.x * rect.width, self.pivot.y * rect.height, 0.0);
        let origin = Vec3::new(rect.x, rect.y, 0.0) + offset;
        Mat4::new_translation(&origin)
            * Mat4::from_axis_angle(&Vec3::z_axis(), self.rotation)
            * Mat4::new_nonuniform_scaling(&Vec3::new(self.scale.x, self.scale.y, 1.0))
            * Mat4::new_translation(&-offset)
    }
}

/// Anchored UI rectangle of a GameObject
///
/// The resolved rect and matrices are cached until this node or an ancestor
/// changes.
#[derive(Debug, Default)]
pub struct RectTransform {
    pub(crate) layout: RectLayout,
    pub(crate) rect: Cell<Option<Rect>>,
    pub(crate) cache: MatrixCache,
}

#[derive(Serialize, Deserialize)]
struct RectTransformMeta {
    anchor_min: [f32; 2],
    anchor_max: [f32; 2],
    margins: Margins,
    pivot: [f32; 2],
    #[serde(default)]
    rotation: f32,
    scale: [f32; 2],
    #[serde(default)]
    reference_size: [f32; 2],
}

impl RectTransform {
    /// Type tag
    pub const TYPE_NAME: &'static str = "RectTransform";

    /// Create a rect transform with explicit placement
    pub fn new(layout: RectLayout) -> Self {
        Self {
            layout,
            rect: Cell::new(None),
            cache: MatrixCache::default(),
        }
    }

    /// Root rect of a fixed size, filling its reference area
    pub fn with_reference_size(size: Vec2) -> Self {
        Self::new(RectLayout {
            reference_size: size,
            ..RectLayout::default()
        })
    }

    /// Placement parameters
    pub fn layout(&self) -> &RectLayout {
        &self.layout
    }

    pub(crate) fn invalidate(&self) {
        self.rect.set(None);
        self.cache.invalidate();
    }
}

impl Component for RectTransform {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::RECT_TRANSFORM | Capabilities::UNIQUE
    }

    fn export_meta(&self) -> Result<Option<ron::Value>, MetaError> {
        let layout = &self.layout;
        meta::export_as(&RectTransformMeta {
            anchor_min: layout.anchor_min.into(),
            anchor_max: layout.anchor_max.into(),
            margins: layout.margins,
            pivot: layout.pivot.into(),
            rotation: layout.rotation,
            scale: layout.scale.into(),
            reference_size: layout.reference_size.into(),
        })
    }

    fn import_meta(&mut self, value: &ron::Value) -> Result<(), MetaError> {
        let data: RectTransformMeta = meta::from_value(value)?;
        self.layout = RectLayout {
            anchor_min: data.anchor_min.into(),
            anchor_max: data.anchor_max.into(),
            margins: data.margins,
            pivot: data.pivot.into(),
            rotation: data.rotation,
            scale: data.scale.into(),
            reference_size: data.reference_size.into(),
        };
        self.invalidate();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_stretched_rect_with_margins() {
        let layout = RectLayout {
            margins: Margins::new(10.0, 5.0, 20.0, 15.0),
            ..RectLayout::default()
        };
        let rect = layout.resolve(Vec2::new(100.0, 50.0));
        assert_eq!(rect, Rect::new(10.0, 5.0, 70.0, 30.0));
    }

    #[test]
    fn test_point_anchor_uses_margins_as_offsets() {
        let layout = RectLayout {
            anchor_min: Vec2::new(0.5, 0.0),
            anchor_max: Vec2::new(0.5, 0.0),
            margins: Margins::new(-10.0, 0.0, -10.0, -8.0),
            ..RectLayout::default()
        };
        let rect = layout.resolve(Vec2::new(200.0, 100.0));
        assert_eq!(rect, Rect::new(90.0, 0.0, 20.0, 8.0));
    }

    #[test]
    fn test_inverted_margins_clamp_to_zero_size() {
        let layout = RectLayout {
            margins: Margins::new(60.0, 0.0, 60.0, 0.0),
            ..RectLayout::default()
        };
        assert_eq!(layout.resolve(Vec2::new(100.0, 10.0)).width, 0.0);
    }

    #[test]
    fn test_matrix_rotates_about_pivot() {
        let layout = RectLayout {
            rotation: std::f32::consts::FRAC_PI_2,
            ..RectLayout::default()
        };
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let matrix = layout.matrix(rect);

        // The pivot (rect center) stays fixed
        let center = matrix.transform_point(&nalgebra::Point3::new(5.0, 5.0, 0.0));
        assert_relative_eq!(center.coords, Vec3::new(5.0, 5.0, 0.0), epsilon = 1e-5);
        // The top-left corner swings around it
        let corner = matrix.transform_point(&nalgebra::Point3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(corner.coords, Vec3::new(10.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_meta_roundtrip() {
        let original = RectTransform::new(RectLayout {
            anchor_min: Vec2::new(0.0, 0.25),
            anchor_max: Vec2::new(1.0, 0.75),
            margins: Margins::uniform(4.0),
            pivot: Vec2::new(0.0, 1.0),
            rotation: 0.5,
            scale: Vec2::new(2.0, 1.0),
            reference_size: Vec2::new(640.0, 480.0),
        });

        let value = original.export_meta().unwrap().unwrap();
        let mut restored = RectTransform::default();
        restored.import_meta(&value).unwrap();

        assert_eq!(restored.layout(), original.layout());
    }
}
