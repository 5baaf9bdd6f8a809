//! Import / export of node attributes
//!
//! A [`GameObjectMeta`] captures the logical attributes of a subtree (names,
//! flags, per-component fields) without any file layout. Component fields
//! travel as `ron::Value` payloads produced by
//! [`export_meta`](crate::scene::Component::export_meta) and consumed by
//! [`import_meta`](crate::scene::Component::import_meta).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ComponentRegistry, GameObjectId, Scene, SceneError, SceneResult};

/// Errors raised while converting meta payloads
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetaError {
    /// A value could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// A payload could not be parsed into the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// A payload parsed but holds an unusable value
    #[error("Invalid value: {0}")]
    Invalid(String),
}

/// Convert any serializable value into a RON payload
pub fn to_value<T: Serialize>(value: &T) -> Result<ron::Value, MetaError> {
    let text = ron::to_string(value).map_err(|e| MetaError::Serialize(e.to_string()))?;
    ron::from_str(&text).map_err(|e| MetaError::Parse(e.to_string()))
}

/// Convert a RON payload back into a typed value
pub fn from_value<T: DeserializeOwned>(value: &ron::Value) -> Result<T, MetaError> {
    value
        .clone()
        .into_rust()
        .map_err(|e| MetaError::Parse(e.to_string()))
}

/// Exported attributes of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMeta {
    /// Registry key
    pub type_name: String,
    /// Direct enabled flag
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Component-specific fields
    #[serde(default)]
    pub data: Option<ron::Value>,
}

/// Exported attributes of a GameObject subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObjectMeta {
    /// Display name
    pub name: String,
    /// Direct enabled flag
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Render visibility
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Survives scene unload
    #[serde(default)]
    pub dont_destroy_on_load: bool,
    /// Components in order
    #[serde(default)]
    pub components: Vec<ComponentMeta>,
    /// Children in order
    #[serde(default)]
    pub children: Vec<GameObjectMeta>,
}

fn default_true() -> bool {
    true
}

impl GameObjectMeta {
    /// Render as pretty RON text
    pub fn to_ron_string(&self) -> Result<String, MetaError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| MetaError::Serialize(e.to_string()))
    }

    /// Parse from RON text
    pub fn from_ron_str(text: &str) -> Result<Self, MetaError> {
        ron::from_str(text).map_err(|e| MetaError::Parse(e.to_string()))
    }
}

impl Scene {
    /// Export a live subtree
    ///
    /// Objects waiting to be destroyed are left out.
    pub fn export_meta(&self, go: GameObjectId) -> SceneResult<GameObjectMeta> {
        let data = self.objects.get(go).ok_or(SceneError::StaleGameObject(go))?;

        let mut components = Vec::with_capacity(data.components.len());
        for &cid in &data.components {
            let Some(slot) = self.components.get(cid) else {
                continue;
            };
            if slot.object.waiting_to_be_destroyed {
                continue;
            }
            let payload = match slot.behaviour() {
                Some(behaviour) => behaviour.export_meta()?,
                None => None,
            };
            components.push(ComponentMeta {
                type_name: slot.type_name().to_string(),
                enabled: slot.object.enabled,
                data: payload,
            });
        }

        let mut children = Vec::with_capacity(data.children.len());
        for &child in &data.children {
            if self.is_waiting_to_be_destroyed(child) {
                continue;
            }
            children.push(self.export_meta(child)?);
        }

        Ok(GameObjectMeta {
            name: data.name.clone(),
            enabled: data.object.enabled,
            visible: data.visible,
            dont_destroy_on_load: data.dont_destroy_on_load,
            components,
            children,
        })
    }

    /// Build a fresh, not yet started subtree from `meta`
    ///
    /// Components are constructed through `registry` and receive their
    /// payload before being attached. On failure the partial subtree is
    /// destroyed and the error returned.
    pub fn import_meta(
        &mut self,
        meta: &GameObjectMeta,
        registry: &ComponentRegistry,
        parent: Option<GameObjectId>,
    ) -> SceneResult<GameObjectId> {
        if let Some(parent) = parent {
            self.require_live(parent.into())?;
        }
        let go = self.create_game_object(meta.name.clone());
        if let Err(e) = self.populate(go, meta, registry, parent) {
            log::warn!("Import of '{}' failed: {}", meta.name, e);
            if let Some(parent) = self.parent(go) {
                if let Err(detach) = self.remove_child(parent, go) {
                    log::warn!("Failed to detach partial import: {}", detach);
                }
            }
            if let Err(cleanup) = self.destroy(go) {
                log::warn!("Failed to discard partial import: {}", cleanup);
            }
            return Err(e);
        }
        Ok(go)
    }

    fn populate(
        &mut self,
        go: GameObjectId,
        meta: &GameObjectMeta,
        registry: &ComponentRegistry,
        parent: Option<GameObjectId>,
    ) -> SceneResult<()> {
        if let Some(data) = self.objects.get_mut(go) {
            data.object.enabled = meta.enabled;
            data.visible = meta.visible;
            data.dont_destroy_on_load = meta.dont_destroy_on_load;
            data.object.invalidate_recursive();
        }
        if parent.is_some() {
            self.set_parent(go, parent, None)?;
        }

        for component_meta in &meta.components {
            let mut behaviour = registry.create(&component_meta.type_name)?;
            if let Some(payload) = &component_meta.data {
                behaviour.import_meta(payload)?;
            }
            let cid = self.create_component(behaviour);
            if let Some(slot) = self.components.get_mut(cid) {
                slot.object.enabled = component_meta.enabled;
            }
            if let Err(e) = self.add_component(go, cid, None) {
                self.free_component(cid);
                return Err(e);
            }
        }

        for child_meta in &meta.children {
            let child = self.create_game_object(child_meta.name.clone());
            self.populate(child, child_meta, registry, Some(go))?;
        }
        Ok(())
    }
}

/// Shorthand used by component implementations
pub(crate) fn export_as<T: Serialize>(value: &T) -> Result<Option<ron::Value>, MetaError> {
    to_value(value).map(Some)
}
