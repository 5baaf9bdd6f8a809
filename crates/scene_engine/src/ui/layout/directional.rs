//! Row / column layout

use serde::{Deserialize, Serialize};

use super::{Axis, LayoutController, LayoutElement, SizeKind, UILayoutManager};
use crate::scene::meta::{self, MetaError};
use crate::scene::{Capabilities, Component, GameObjectId, Scene};
use crate::transform::Margins;

/// Placement of the child block inside leftover space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Leading edge (left / top)
    #[default]
    Start,
    /// Centered
    Center,
    /// Trailing edge (right / bottom)
    End,
}

impl Alignment {
    fn offset(self, leftover: f32) -> f32 {
        match self {
            Alignment::Start => 0.0,
            Alignment::Center => leftover * 0.5,
            Alignment::End => leftover,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Alignment::Start => "Start",
            Alignment::Center => "Center",
            Alignment::End => "End",
        }
    }

    fn from_name(name: &str) -> Result<Self, MetaError> {
        match name {
            "Start" => Ok(Alignment::Start),
            "Center" => Ok(Alignment::Center),
            "End" => Ok(Alignment::End),
            other => Err(MetaError::Invalid(format!("unknown alignment '{}'", other))),
        }
    }
}

/// Override of the computed child sizes along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stretch {
    /// Keep the computed sizes
    #[default]
    None,
    /// Fill the available extent: every child on the cross axis, leftover
    /// space shared evenly on the layout axis when no child is flexible
    Fill,
    /// Give every child an equal share of the available extent
    Split,
}

impl Stretch {
    fn name(self) -> &'static str {
        match self {
            Stretch::None => "None",
            Stretch::Fill => "Fill",
            Stretch::Split => "Split",
        }
    }

    fn from_name(name: &str) -> Result<Self, MetaError> {
        match name {
            "None" => Ok(Stretch::None),
            "Fill" => Ok(Stretch::Fill),
            "Split" => Ok(Stretch::Split),
            other => Err(MetaError::Invalid(format!("unknown stretch '{}'", other))),
        }
    }
}

/// Lays out its children in a row or a column
///
/// Also reports the size its children need, so nested layouts and size
/// fitters can follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLayout {
    /// Axis the children are laid out along
    pub axis: Axis,
    /// Inner padding
    pub padding: Margins,
    /// Gap between consecutive children
    pub spacing: f32,
    /// Block placement, per axis
    pub alignment: [Alignment; 2],
    /// Size override, per axis
    pub stretch: [Stretch; 2],
    /// Indexed by [`SizeKind`], then by axis
    sizes: [[f32; 2]; 3],
}

impl Default for DirectionalLayout {
    fn default() -> Self {
        Self::new(Axis::Horizontal)
    }
}

#[derive(Serialize, Deserialize)]
struct DirectionalLayoutMeta {
    axis: String,
    #[serde(default)]
    padding: Margins,
    #[serde(default)]
    spacing: f32,
    alignment: [String; 2],
    stretch: [String; 2],
}

struct ChildSizes {
    id: GameObjectId,
    min: f32,
    preferred: f32,
    flexible: f32,
}

impl DirectionalLayout {
    /// Type tag
    pub const TYPE_NAME: &'static str = "DirectionalLayout";

    /// Layout along `axis` with no padding or spacing
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            padding: Margins::default(),
            spacing: 0.0,
            alignment: [Alignment::Start; 2],
            stretch: [Stretch::None; 2],
            sizes: [[-1.0; 2]; 3],
        }
    }

    /// Set the padding
    pub fn with_padding(mut self, padding: Margins) -> Self {
        self.padding = padding;
        self
    }

    /// Set the gap between children
    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }

    /// Set the alignment along one axis
    pub fn with_alignment(mut self, axis: Axis, alignment: Alignment) -> Self {
        self.alignment[axis.index()] = alignment;
        self
    }

    /// Set the stretch policy along one axis
    pub fn with_stretch(mut self, axis: Axis, stretch: Stretch) -> Self {
        self.stretch[axis.index()] = stretch;
        self
    }

    fn children(scene: &Scene, manager: &UILayoutManager, owner: GameObjectId, axis: Axis) -> Vec<ChildSizes> {
        scene
            .children(owner)
            .iter()
            .copied()
            .filter(|&child| {
                !scene.is_waiting_to_be_destroyed(child)
                    && scene.is_enabled_recursively(child)
                    && scene.rect_transform(child).is_some()
            })
            .map(|child| {
                let min = manager.get_size(scene, child, SizeKind::Min, axis);
                ChildSizes {
                    id: child,
                    min,
                    preferred: manager.get_size(scene, child, SizeKind::Preferred, axis).max(min),
                    flexible: manager.get_size(scene, child, SizeKind::Flexible, axis),
                }
            })
            .collect()
    }

    fn total_spacing(&self, count: usize) -> f32 {
        self.spacing * count.saturating_sub(1) as f32
    }

    fn apply_main_axis(&self, scene: &mut Scene, children: &[ChildSizes], available: f32, extent: f32, passes: usize) {
        let axis = self.axis;
        let content = available - self.total_spacing(children.len());
        let sizes = match self.stretch[axis.index()] {
            Stretch::Split => {
                let share = (content / children.len() as f32).max(0.0);
                vec![share; children.len()]
            }
            stretch => distribute(children, content, passes, stretch == Stretch::Fill),
        };

        let used: f32 = sizes.iter().sum::<f32>() + self.total_spacing(children.len());
        let mut position =
            self.padding.start(axis) + self.alignment[axis.index()].offset((available - used).max(0.0));
        for (child, size) in children.iter().zip(sizes) {
            place(scene, child.id, axis, position, size, extent);
            position += size + self.spacing;
        }
    }

    fn apply_cross_axis(&self, scene: &mut Scene, children: &[ChildSizes], axis: Axis, available: f32, extent: f32) {
        let fill = self.stretch[axis.index()] != Stretch::None;
        for child in children {
            let size = if fill || child.flexible > 0.0 {
                available
            } else {
                child.preferred.min(available)
            }
            .max(0.0);
            let position = self.padding.start(axis) + self.alignment[axis.index()].offset((available - size).max(0.0));
            place(scene, child.id, axis, position, size, extent);
        }
    }
}

/// Stretch the child across `[position, position + size]` of a parent
/// extent, anchored to both parent edges
fn place(scene: &mut Scene, child: GameObjectId, axis: Axis, position: f32, size: f32, extent: f32) {
    if let Err(e) = scene.set_axis_placement(child, axis, 0.0, 1.0, position, extent - (position + size)) {
        log::warn!("Failed to place {:?}: {}", child, e);
    }
}

/// Share `space` among children: minimums first, then toward preferred in
/// proportion to each child's unmet delta, then by flexible weight
fn distribute(children: &[ChildSizes], space: f32, passes: usize, fill: bool) -> Vec<f32> {
    let mut sizes: Vec<f32> = children.iter().map(|child| child.min).collect();
    let mut remaining = space - sizes.iter().sum::<f32>();
    if remaining <= 0.0 {
        return sizes;
    }

    let mut open: Vec<usize> = (0..children.len())
        .filter(|&i| children[i].preferred > sizes[i])
        .collect();
    for _ in 0..passes.max(1) {
        if open.is_empty() || remaining <= f32::EPSILON {
            break;
        }
        let unmet: f32 = open.iter().map(|&i| children[i].preferred - sizes[i]).sum();
        if unmet <= remaining {
            for &i in &open {
                sizes[i] = children[i].preferred;
            }
            remaining -= unmet;
            open.clear();
            break;
        }
        let budget = remaining;
        for &i in &open {
            let delta = children[i].preferred - sizes[i];
            let grant = (budget * delta / unmet).min(delta);
            sizes[i] += grant;
            remaining -= grant;
        }
        open.retain(|&i| children[i].preferred > sizes[i]);
    }

    if remaining > 0.0 {
        let weights: Vec<f32> = children.iter().map(|child| child.flexible.max(0.0)).collect();
        let total: f32 = weights.iter().sum();
        if total > 0.0 {
            for (size, weight) in sizes.iter_mut().zip(&weights) {
                *size += remaining * weight / total;
            }
        } else if fill && !children.is_empty() {
            let share = remaining / children.len() as f32;
            for size in &mut sizes {
                *size += share;
            }
        }
    }
    sizes
}

impl LayoutElement for DirectionalLayout {
    fn calculate_layout(&mut self, scene: &Scene, manager: &UILayoutManager, owner: GameObjectId, axis: Axis) {
        let children = Self::children(scene, manager, owner, axis);
        let padding = self.padding.total(axis);
        let (min, preferred) = if axis == self.axis {
            let spacing = self.total_spacing(children.len());
            (
                children.iter().map(|c| c.min).sum::<f32>() + spacing,
                children.iter().map(|c| c.preferred).sum::<f32>() + spacing,
            )
        } else {
            (
                children.iter().map(|c| c.min).fold(0.0, f32::max),
                children.iter().map(|c| c.preferred).fold(0.0, f32::max),
            )
        };
        let i = axis.index();
        self.sizes[SizeKind::Min.index()][i] = min + padding;
        self.sizes[SizeKind::Preferred.index()][i] = preferred + padding;
    }

    fn size(&self, kind: SizeKind, axis: Axis) -> f32 {
        self.sizes[kind.index()][axis.index()]
    }
}

impl LayoutController for DirectionalLayout {
    fn apply_layout(&mut self, scene: &mut Scene, manager: &UILayoutManager, owner: GameObjectId, axis: Axis) {
        let Some(rect) = scene.rect(owner) else {
            return;
        };
        let children = Self::children(scene, manager, owner, axis);
        if children.is_empty() {
            return;
        }
        let extent = rect.size()[axis.index()];
        let available = extent - self.padding.total(axis);
        if axis == self.axis {
            self.apply_main_axis(scene, &children, available, extent, manager.config().distribution_passes);
        } else {
            self.apply_cross_axis(scene, &children, axis, available, extent);
        }
    }
}

impl Component for DirectionalLayout {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LAYOUT_ELEMENT | Capabilities::LAYOUT_CONTROLLER | Capabilities::UNIQUE
    }

    fn export_meta(&self) -> Result<Option<ron::Value>, MetaError> {
        meta::export_as(&DirectionalLayoutMeta {
            axis: self.axis.name().to_string(),
            padding: self.padding,
            spacing: self.spacing,
            alignment: self.alignment.map(|a| a.name().to_string()),
            stretch: self.stretch.map(|s| s.name().to_string()),
        })
    }

    fn import_meta(&mut self, value: &ron::Value) -> Result<(), MetaError> {
        let data: DirectionalLayoutMeta = meta::from_value(value)?;
        let [align_x, align_y] = &data.alignment;
        let [stretch_x, stretch_y] = &data.stretch;
        *self = Self {
            axis: Axis::from_name(&data.axis)?,
            padding: data.padding,
            spacing: data.spacing,
            alignment: [Alignment::from_name(align_x)?, Alignment::from_name(align_y)?],
            stretch: [Stretch::from_name(stretch_x)?, Stretch::from_name(stretch_y)?],
            sizes: [[-1.0; 2]; 3],
        };
        Ok(())
    }

    fn as_layout_element(&self) -> Option<&dyn LayoutElement> {
        Some(self)
    }

    fn as_layout_element_mut(&mut self) -> Option<&mut dyn LayoutElement> {
        Some(self)
    }

    fn as_layout_controller_mut(&mut self) -> Option<&mut dyn LayoutController> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::foundation::math::{Rect, Vec2};
    use crate::transform::RectTransform;
    use crate::ui::layout::LayoutSizes;
    use approx::assert_relative_eq;

    fn child(min: f32, preferred: f32, flexible: f32) -> ChildSizes {
        ChildSizes {
            id: GameObjectId::default(),
            min,
            preferred,
            flexible,
        }
    }

    #[test]
    fn test_distribute_proportional_to_unmet_delta() {
        let children = [child(10.0, 30.0, 0.0), child(10.0, 20.0, 0.0)];
        // 20 left after minimums, 30 unmet in total
        let sizes = distribute(&children, 40.0, 8, false);
        assert_relative_eq!(sizes[0], 10.0 + 20.0 * 20.0 / 30.0);
        assert_relative_eq!(sizes[1], 10.0 + 20.0 * 10.0 / 30.0);
    }

    #[test]
    fn test_distribute_leftover_by_flexible_weight() {
        let children = [child(0.0, 10.0, 1.0), child(0.0, 10.0, 3.0), child(0.0, 10.0, 0.0)];
        let sizes = distribute(&children, 70.0, 8, false);
        assert_eq!(sizes, vec![20.0, 40.0, 10.0]);
    }

    #[test]
    fn test_distribute_never_shrinks_below_min() {
        let children = [child(15.0, 20.0, 1.0), child(15.0, 20.0, 1.0)];
        assert_eq!(distribute(&children, 20.0, 8, false), vec![15.0, 15.0]);
    }

    #[test]
    fn test_fill_shares_leftover_without_flexible_children() {
        let children = [child(0.0, 10.0, 0.0), child(0.0, 10.0, 0.0)];
        assert_eq!(distribute(&children, 50.0, 8, true), vec![25.0, 25.0]);
    }

    fn row(scene: &mut Scene, layout: DirectionalLayout, size: Vec2) -> GameObjectId {
        let root = scene.create_game_object("row");
        scene.attach(root, Box::new(RectTransform::with_reference_size(size))).unwrap();
        scene.attach(root, Box::new(layout)).unwrap();
        root
    }

    fn item(scene: &mut Scene, parent: GameObjectId, sizes: LayoutSizes) -> GameObjectId {
        let go = scene.create_child(parent, "item").unwrap();
        scene.attach(go, Box::new(RectTransform::default())).unwrap();
        scene.attach(go, Box::new(sizes)).unwrap();
        go
    }

    #[test]
    fn test_row_with_spacing_and_center_alignment() {
        let mut scene = Scene::new();
        let layout = DirectionalLayout::new(Axis::Horizontal)
            .with_spacing(10.0)
            .with_alignment(Axis::Horizontal, Alignment::Center)
            .with_alignment(Axis::Vertical, Alignment::End);
        let root = row(&mut scene, layout, Vec2::new(100.0, 40.0));
        let a = item(&mut scene, root, LayoutSizes::default().with_preferred(Vec2::new(20.0, 10.0)));
        let b = item(&mut scene, root, LayoutSizes::default().with_preferred(Vec2::new(30.0, 50.0)));

        UILayoutManager::new(root, LayoutConfig::default()).rebuild_layout(&mut scene);

        // 60 used of 100: block starts at 20; heights clamp to 40 and align to the bottom
        assert_eq!(scene.rect(a), Some(Rect::new(20.0, 30.0, 20.0, 10.0)));
        assert_eq!(scene.rect(b), Some(Rect::new(50.0, 0.0, 30.0, 40.0)));
    }

    #[test]
    fn test_column_padding_and_split() {
        let mut scene = Scene::new();
        let layout = DirectionalLayout::new(Axis::Vertical)
            .with_padding(Margins::uniform(5.0))
            .with_stretch(Axis::Vertical, Stretch::Split)
            .with_stretch(Axis::Horizontal, Stretch::Fill);
        let root = row(&mut scene, layout, Vec2::new(50.0, 110.0));
        let a = item(&mut scene, root, LayoutSizes::default().with_preferred(Vec2::new(10.0, 10.0)));
        let b = item(&mut scene, root, LayoutSizes::default().with_preferred(Vec2::new(10.0, 80.0)));

        UILayoutManager::new(root, LayoutConfig::default()).rebuild_layout(&mut scene);

        assert_eq!(scene.rect(a), Some(Rect::new(5.0, 5.0, 40.0, 50.0)));
        assert_eq!(scene.rect(b), Some(Rect::new(5.0, 55.0, 40.0, 50.0)));
    }

    #[test]
    fn test_reports_children_sizes_as_element() {
        let mut scene = Scene::new();
        let layout = DirectionalLayout::new(Axis::Horizontal)
            .with_spacing(4.0)
            .with_padding(Margins::new(1.0, 2.0, 3.0, 4.0));
        let root = row(&mut scene, layout, Vec2::new(200.0, 200.0));
        item(&mut scene, root, LayoutSizes::default().with_min(Vec2::new(5.0, 5.0)).with_preferred(Vec2::new(10.0, 12.0)));
        item(&mut scene, root, LayoutSizes::default().with_min(Vec2::new(6.0, 2.0)).with_preferred(Vec2::new(20.0, 8.0)));
        let manager = UILayoutManager::new(root, LayoutConfig::default());

        manager.rebuild_layout(&mut scene);

        assert_eq!(manager.get_size(&scene, root, SizeKind::Min, Axis::Horizontal), 5.0 + 6.0 + 4.0 + 4.0);
        assert_eq!(manager.get_size(&scene, root, SizeKind::Preferred, Axis::Horizontal), 10.0 + 20.0 + 4.0 + 4.0);
        assert_eq!(manager.get_size(&scene, root, SizeKind::Preferred, Axis::Vertical), 12.0 + 6.0);
    }

    #[test]
    fn test_meta_roundtrip() {
        let original = DirectionalLayout::new(Axis::Vertical)
            .with_spacing(3.0)
            .with_padding(Margins::uniform(2.0))
            .with_alignment(Axis::Horizontal, Alignment::Center)
            .with_stretch(Axis::Vertical, Stretch::Split);

        let value = original.export_meta().unwrap().unwrap();
        let mut restored = DirectionalLayout::default();
        restored.import_meta(&value).unwrap();

        assert_eq!(restored, original);
    }
}
