//! Component constructor table keyed by type tag

use std::collections::HashMap;

use super::{Component, SceneError, SceneResult};
use crate::transform::{RectTransform, Transform};
use crate::ui::layout::{ContentSizeFitter, DirectionalLayout, LayoutSizes};

/// Constructor of a default component instance
pub type ComponentFactory = fn() -> Box<dyn Component>;

/// Maps component type tags to constructors
///
/// Used by meta import to instantiate components by name.
#[derive(Debug, Default, Clone)]
pub struct ComponentRegistry {
    factories: HashMap<&'static str, ComponentFactory>,
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the transform and layout components
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_default::<Transform>();
        registry.register_default::<RectTransform>();
        registry.register_default::<LayoutSizes>();
        registry.register_default::<DirectionalLayout>();
        registry.register_default::<ContentSizeFitter>();
        registry
    }

    /// Register a constructor, returning the one it replaced
    pub fn register(&mut self, type_name: &'static str, factory: ComponentFactory) -> Option<ComponentFactory> {
        let previous = self.factories.insert(type_name, factory);
        if previous.is_some() {
            log::warn!("Replaced component factory for '{}'", type_name);
        }
        previous
    }

    /// Register `T::default()` under the type tag it reports
    pub fn register_default<T: Component + Default>(&mut self) -> Option<ComponentFactory> {
        let type_name = T::default().type_name();
        self.register(type_name, || Box::new(T::default()))
    }

    /// Instantiate a component by type tag
    pub fn create(&self, type_name: &str) -> SceneResult<Box<dyn Component>> {
        self.factories
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| SceneError::UnknownComponentType(type_name.to_string()))
    }

    /// Whether a type tag is known
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type tags, sorted
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
