//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the two value types the scene tree needs:
//! a TRS [`Transform`] and an axis-aligned UI [`Rect`].

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector2, Vector3};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// Axis-aligned rectangle in UI space (Y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width, never negative
    pub width: f32,
    /// Height, never negative
    pub height: f32,
}

impl Rect {
    /// Create a rect from its top-left corner and size
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Width and height
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_matrix_applies_scale_then_rotation_then_translation() {
        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2),
            scale: Vec3::new(2.0, 1.0, 1.0),
        };

        let moved = transform.to_matrix().transform_point(&nalgebra::Point3::new(1.0, 0.0, 0.0));

        assert_relative_eq!(moved.coords, Vec3::new(1.0, 4.0, 3.0), epsilon = 1e-5);
    }

    #[test]
    fn test_rect_clamps_negative_size() {
        let rect = Rect::new(10.0, 5.0, -4.0, 3.0);
        assert_eq!(rect.width, 0.0);
        assert_eq!(rect.size(), Vec2::new(0.0, 3.0));
    }
}
