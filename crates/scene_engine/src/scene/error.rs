//! Scene error types

use super::{ComponentId, GameObjectId, ObjectId};
use crate::scene::meta::MetaError;
use thiserror::Error;

/// Result alias used by fallible scene operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Rejected scene operations
///
/// Every variant describes a call that was refused before touching any state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// GameObject handle refers to a freed slot
    #[error("GameObject {0:?} no longer exists")]
    StaleGameObject(GameObjectId),

    /// Component handle refers to a freed slot
    #[error("Component {0:?} no longer exists")]
    StaleComponent(ComponentId),

    /// Mutation of an object already waiting to be destroyed
    #[error("{0:?} is waiting to be destroyed")]
    Destroyed(ObjectId),

    /// Attempt to parent a GameObject to itself
    #[error("GameObject {0:?} cannot be its own parent")]
    SelfParenting(GameObjectId),

    /// Attempt to parent a GameObject under one of its descendants
    #[error("GameObject {child:?} is an ancestor of {parent:?}")]
    CyclicParenting {
        /// Object being moved
        child: GameObjectId,
        /// Requested parent
        parent: GameObjectId,
    },

    /// Second Transform-family component on one GameObject
    #[error("GameObject {0:?} already has a transform component")]
    DuplicateTransform(GameObjectId),

    /// Second instance of a component type flagged unique
    #[error("GameObject {object:?} already has a '{type_name}' component")]
    DuplicateComponent {
        /// Target GameObject
        object: GameObjectId,
        /// Component type tag
        type_name: &'static str,
    },

    /// `remove_child` with an object that is not a direct child
    #[error("GameObject {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Presumed parent
        parent: GameObjectId,
        /// Presumed child
        child: GameObjectId,
    },

    /// `remove_component` with a component owned elsewhere
    #[error("Component {component:?} is not attached to {object:?}")]
    ComponentNotAttached {
        /// Presumed owner
        object: GameObjectId,
        /// Component handle
        component: ComponentId,
    },

    /// Registry has no constructor for a type tag
    #[error("No component registered under '{0}'")]
    UnknownComponentType(String),

    /// Import or export hook failed
    #[error("Meta error: {0}")]
    Meta(#[from] MetaError),
}
