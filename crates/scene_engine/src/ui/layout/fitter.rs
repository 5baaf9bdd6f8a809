//! Self-sizing from reported content size

use serde::{Deserialize, Serialize};

use super::{Axis, LayoutController, SizeKind, UILayoutManager};
use crate::scene::meta::{self, MetaError};
use crate::scene::{Capabilities, Component, GameObjectId, Scene};

/// Which reported size a [`ContentSizeFitter`] adopts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Leave the axis alone
    #[default]
    Unconstrained,
    /// Shrink to the minimum size
    MinSize,
    /// Match the preferred size
    PreferredSize,
}

impl FitMode {
    fn size_kind(self) -> Option<SizeKind> {
        match self {
            FitMode::Unconstrained => None,
            FitMode::MinSize => Some(SizeKind::Min),
            FitMode::PreferredSize => Some(SizeKind::Preferred),
        }
    }

    fn name(self) -> &'static str {
        match self {
            FitMode::Unconstrained => "Unconstrained",
            FitMode::MinSize => "MinSize",
            FitMode::PreferredSize => "PreferredSize",
        }
    }

    fn from_name(name: &str) -> Result<Self, MetaError> {
        match name {
            "Unconstrained" => Ok(FitMode::Unconstrained),
            "MinSize" => Ok(FitMode::MinSize),
            "PreferredSize" => Ok(FitMode::PreferredSize),
            other => Err(MetaError::Invalid(format!("unknown fit mode '{}'", other))),
        }
    }
}

/// Resizes its own rect to the size its layout elements report
///
/// The rect keeps its anchors and leading margin; only the trailing margin
/// moves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentSizeFitter {
    /// Fit mode, per axis
    pub fit: [FitMode; 2],
}

#[derive(Serialize, Deserialize)]
struct ContentSizeFitterMeta {
    horizontal: String,
    vertical: String,
}

impl ContentSizeFitter {
    /// Type tag
    pub const TYPE_NAME: &'static str = "ContentSizeFitter";

    /// Fitter with the given mode on each axis
    pub fn new(horizontal: FitMode, vertical: FitMode) -> Self {
        Self {
            fit: [horizontal, vertical],
        }
    }
}

impl LayoutController for ContentSizeFitter {
    fn apply_layout(&mut self, scene: &mut Scene, manager: &UILayoutManager, owner: GameObjectId, axis: Axis) {
        let Some(kind) = self.fit[axis.index()].size_kind() else {
            return;
        };
        let size = manager.get_size(scene, owner, kind, axis);
        if let Err(e) = scene.set_size_along_axis(owner, axis, size) {
            log::warn!("Failed to fit {:?}: {}", owner, e);
        }
    }
}

impl Component for ContentSizeFitter {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LAYOUT_SELF_CONTROLLER | Capabilities::UNIQUE
    }

    fn export_meta(&self) -> Result<Option<ron::Value>, MetaError> {
        meta::export_as(&ContentSizeFitterMeta {
            horizontal: self.fit[0].name().to_string(),
            vertical: self.fit[1].name().to_string(),
        })
    }

    fn import_meta(&mut self, value: &ron::Value) -> Result<(), MetaError> {
        let data: ContentSizeFitterMeta = meta::from_value(value)?;
        self.fit = [FitMode::from_name(&data.horizontal)?, FitMode::from_name(&data.vertical)?];
        Ok(())
    }

    fn as_layout_controller_mut(&mut self) -> Option<&mut dyn LayoutController> {
        Some(self)
    }
}
