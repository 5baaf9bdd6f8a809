//! Scene tree
//!
//! GameObjects and Components live in two generational arenas owned by a
//! [`Scene`]. All handles are plain slot keys: a freed slot makes every copy
//! of its key stale instead of dangling.
//!
//! Tree mutation, lifecycle propagation and deferred destruction are all
//! methods on `Scene`, spread over the submodules by concern:
//! - `object`: enabled / started / destroy state and the recursive cache
//! - `game_object`: tree structure, naming, lookups, destroy
//! - `cursor`: mutation-safe iteration over child and component lists
//! - `component`: the `Component` trait and attachment
//! - `lifecycle`: pre-start, start, update and render propagation
//! - `meta`, `registry`: import/export hooks and the constructor table

use slotmap::SlotMap;

use crate::config::SceneConfig;

mod component;
mod cursor;
mod error;
mod game_object;
mod lifecycle;
pub mod meta;
mod object;
mod registry;

#[cfg(test)]
mod tests;

pub use component::{AsAny, Capabilities, Component, ComponentSlot};
pub use cursor::ChildCursor;
pub use error::{SceneError, SceneResult};
pub use game_object::GameObjectData;
pub use lifecycle::RenderPass;
pub use meta::{ComponentMeta, GameObjectMeta, MetaError};
pub use object::ObjectState;
pub use registry::{ComponentFactory, ComponentRegistry};

slotmap::new_key_type! {
    /// Handle to a GameObject slot
    pub struct GameObjectId;

    /// Handle to a Component slot
    pub struct ComponentId;
}

/// Either kind of scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectId {
    /// Tree node
    GameObject(GameObjectId),
    /// Behaviour unit
    Component(ComponentId),
}

impl From<GameObjectId> for ObjectId {
    fn from(id: GameObjectId) -> Self {
        Self::GameObject(id)
    }
}

impl From<ComponentId> for ObjectId {
    fn from(id: ComponentId) -> Self {
        Self::Component(id)
    }
}

/// Owner of every GameObject and Component
pub struct Scene {
    pub(crate) objects: SlotMap<GameObjectId, GameObjectData>,
    pub(crate) components: SlotMap<ComponentId, ComponentSlot>,
    pub(crate) roots: Vec<GameObjectId>,
    config: SceneConfig,
    next_instance_id: u64,
    next_cursor_id: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("game_objects", &self.objects.len())
            .field("components", &self.components.len())
            .field("roots", &self.roots)
            .finish()
    }
}

impl Scene {
    /// Create an empty scene with default settings
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// Create an empty scene
    pub fn with_config(config: SceneConfig) -> Self {
        Self {
            objects: SlotMap::with_capacity_and_key(config.initial_capacity),
            components: SlotMap::with_capacity_and_key(config.initial_capacity),
            roots: Vec::new(),
            config,
            next_instance_id: 0,
            next_cursor_id: 0,
        }
    }

    /// Scene settings
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Number of live GameObject slots (including those waiting to be freed)
    pub fn game_object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of live Component slots (including those waiting to be freed)
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Whether a GameObject handle is still valid
    pub fn contains(&self, id: GameObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Whether a Component handle is still valid
    pub fn contains_component(&self, id: ComponentId) -> bool {
        self.components.contains_key(id)
    }

    pub(crate) fn next_instance_id(&mut self) -> u64 {
        self.next_instance_id += 1;
        self.next_instance_id
    }

    pub(crate) fn next_cursor_id(&mut self) -> u64 {
        self.next_cursor_id += 1;
        self.next_cursor_id
    }

    pub(crate) fn log_lifecycle(&self) -> bool {
        self.config.log_lifecycle
    }
}
