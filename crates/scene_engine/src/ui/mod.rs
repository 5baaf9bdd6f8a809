//! UI support: constraint layout and the active UI root

pub mod active;
pub mod layout;

pub use active::{active_root, clear_active_root, set_active_root};
pub use layout::{Axis, LayoutController, LayoutElement, SizeKind, UILayoutManager};
