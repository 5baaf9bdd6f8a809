//! Process-wide slot naming the UI root that input and layout target
//!
//! The slot is per thread, matching the single-threaded scene. There is no
//! fallback: with nothing set, lookups return `None`.

use std::cell::Cell;

use crate::scene::GameObjectId;

thread_local! {
    static ACTIVE_ROOT: Cell<Option<GameObjectId>> = const { Cell::new(None) };
}

/// Make `root` the active UI root, returning the previous one
pub fn set_active_root(root: GameObjectId) -> Option<GameObjectId> {
    let previous = ACTIVE_ROOT.with(|slot| slot.replace(Some(root)));
    log::debug!("Active UI root set to {:?}", root);
    previous
}

/// Currently active UI root
pub fn active_root() -> Option<GameObjectId> {
    ACTIVE_ROOT.with(Cell::get)
}

/// Clear the slot, returning what it held
pub fn clear_active_root() -> Option<GameObjectId> {
    ACTIVE_ROOT.with(|slot| slot.take())
}
