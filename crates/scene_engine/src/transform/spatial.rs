//! Spatial transform component

use serde::{Deserialize, Serialize};

use super::MatrixCache;
use crate::foundation::math::{Mat4, Quat, Quaternion, Transform as Trs, Vec3};
use crate::scene::meta::{self, MetaError};
use crate::scene::{Capabilities, Component};

/// Local position / rotation / scale of a GameObject
///
/// Matrices are cached and dropped whenever this node or an ancestor moves.
#[derive(Debug, Default)]
pub struct Transform {
    pub(crate) local: Trs,
    pub(crate) cache: MatrixCache,
}

#[derive(Serialize, Deserialize)]
struct TransformMeta {
    position: [f32; 3],
    /// i, j, k, w
    rotation: [f32; 4],
    scale: [f32; 3],
}

impl Transform {
    /// Type tag
    pub const TYPE_NAME: &'static str = "Transform";

    /// Create a transform with the given local placement
    pub fn new(local: Trs) -> Self {
        Self {
            local,
            cache: MatrixCache::default(),
        }
    }

    /// Create a transform at `position`
    pub fn at(position: Vec3) -> Self {
        Self::new(Trs::from_position(position))
    }

    /// Local placement
    pub fn local(&self) -> &Trs {
        &self.local
    }

    /// Local position
    pub fn position(&self) -> Vec3 {
        self.local.position
    }

    /// Local rotation
    pub fn rotation(&self) -> Quat {
        self.local.rotation
    }

    /// Local scale
    pub fn scale(&self) -> Vec3 {
        self.local.scale
    }

    pub(crate) fn local_matrix(&self) -> Mat4 {
        if let Some(matrix) = self.cache.local.get() {
            return matrix;
        }
        let matrix = self.local.to_matrix();
        self.cache.local.set(Some(matrix));
        matrix
    }
}

impl Component for Transform {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TRANSFORM | Capabilities::UNIQUE
    }

    fn export_meta(&self) -> Result<Option<ron::Value>, MetaError> {
        let q = self.local.rotation.quaternion();
        meta::export_as(&TransformMeta {
            position: self.local.position.into(),
            rotation: [q.i, q.j, q.k, q.w],
            scale: self.local.scale.into(),
        })
    }

    fn import_meta(&mut self, value: &ron::Value) -> Result<(), MetaError> {
        let data: TransformMeta = meta::from_value(value)?;
        let [i, j, k, w] = data.rotation;
        let rotation = Quaternion::new(w, i, j, k);
        if rotation.norm() <= f32::EPSILON {
            return Err(MetaError::Invalid("zero-length rotation".to_string()));
        }
        self.local = Trs {
            position: data.position.into(),
            rotation: Quat::from_quaternion(rotation),
            scale: data.scale.into(),
        };
        self.cache.invalidate();
        Ok(())
    }
}
