//! Two-axis constraint layout
//!
//! Components take part in layout through two capabilities:
//! - a [`LayoutElement`] reports min / preferred / flexible sizes per axis
//! - a [`LayoutController`] writes rect margins, either of the children of
//!   its GameObject or (as a self controller) of the GameObject itself
//!
//! A [`UILayoutManager`] per UI root runs the calculate and apply passes.
//! Which component kinds participate is decided by their
//! [`Capabilities`](crate::scene::Capabilities), recorded at creation.

mod directional;
mod element;
mod fitter;
pub(crate) mod invalidation;
mod manager;

pub use directional::{Alignment, DirectionalLayout, Stretch};
pub use element::LayoutSizes;
pub use fitter::{ContentSizeFitter, FitMode};
pub use manager::UILayoutManager;

use crate::scene::{GameObjectId, MetaError, Scene};

/// Layout axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// X, left to right
    Horizontal,
    /// Y, top to bottom
    Vertical,
}

impl Axis {
    /// Both axes, in pass order
    pub const ALL: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];

    /// Vector component index
    pub fn index(self) -> usize {
        match self {
            Axis::Horizontal => 0,
            Axis::Vertical => 1,
        }
    }

    /// The perpendicular axis
    pub fn other(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Axis::Horizontal => "Horizontal",
            Axis::Vertical => "Vertical",
        }
    }

    pub(crate) fn from_name(name: &str) -> Result<Self, MetaError> {
        match name {
            "Horizontal" => Ok(Axis::Horizontal),
            "Vertical" => Ok(Axis::Vertical),
            other => Err(MetaError::Invalid(format!("unknown axis '{}'", other))),
        }
    }
}

/// Which size an element reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeKind {
    /// Smallest usable size
    Min,
    /// Size wanted when space allows
    Preferred,
    /// Relative weight for leftover space
    Flexible,
}

impl SizeKind {
    pub(crate) fn index(self) -> usize {
        match self {
            SizeKind::Min => 0,
            SizeKind::Preferred => 1,
            SizeKind::Flexible => 2,
        }
    }
}

/// Reports its sizes to the layout manager
///
/// Negative sizes mean "unset" and let a lower-priority element on the same
/// GameObject decide that axis.
pub trait LayoutElement {
    /// Priority bucket; `None` uses the manager's default
    fn layout_priority(&self) -> Option<i32> {
        None
    }

    /// Recompute cached sizes along `axis`
    ///
    /// Runs in post-order, so children are already up to date.
    fn calculate_layout(&mut self, scene: &Scene, manager: &UILayoutManager, owner: GameObjectId, axis: Axis);

    /// Cached size along `axis`
    fn size(&self, kind: SizeKind, axis: Axis) -> f32;
}

/// Writes rect placement along one axis
pub trait LayoutController {
    /// Place children (or the owner itself, for self controllers) along
    /// `axis`
    ///
    /// Horizontal placement is applied for the whole tree before any
    /// vertical size is calculated.
    fn apply_layout(&mut self, scene: &mut Scene, manager: &UILayoutManager, owner: GameObjectId, axis: Axis);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_names_roundtrip() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_name(axis.name()), Ok(axis));
            assert_eq!(axis.other().other(), axis);
        }
        assert!(Axis::from_name("Diagonal").is_err());
    }
}
