//! # Scene Engine
//!
//! Scene tree, typed events and constraint-based UI layout for a modular
//! game engine.
//!
//! ## Features
//!
//! - **Scene Tree**: GameObjects with ordered children and components,
//!   generational handles, deferred destruction
//! - **Lifecycle**: pre-start, start, update and render propagation with
//!   lazily cached recursive enable state
//! - **Events**: weakly linked emitters and listeners, safe to mutate while
//!   an event is being dispatched
//! - **Transforms**: spatial and anchored rect transforms with cached matrices
//! - **UI Layout**: two-pass per-axis layout with directional stacking and
//!   content fitting
//! - **Meta**: RON import/export through a component registry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, runtime: &mut Runtime) -> Result<(), AppError> {
//!         let canvas = runtime.scene_mut().create_game_object("canvas");
//!         runtime.register_ui_root(canvas)?;
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, runtime: &mut Runtime, _delta_time: f32) -> Result<(), AppError> {
//!         runtime.quit();
//!         Ok(())
//!     }
//!
//!     fn cleanup(&mut self, _runtime: &mut Runtime) {}
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let mut app = MyApp;
//!     Runtime::run(config, &mut app)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod events;
pub mod foundation;
pub mod scene;
pub mod transform;
pub mod ui;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use config::EngineConfig;
pub use engine::{EngineError, FrameStats, Runtime};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, LayoutConfig, SceneConfig},
        events::{EventEmitter, EventListener, GameObjectListener, ObjectListener, TransformListener},
        foundation::{
            math::{Mat4, Rect, Vec2, Vec3},
            time::{Stopwatch, Timer},
        },
        scene::{Capabilities, Component, ComponentId, ComponentRegistry, GameObjectId, RenderPass, Scene},
        transform::{Margins, RectTransform, Transform},
        ui::layout::{Alignment, ContentSizeFitter, DirectionalLayout, FitMode, LayoutSizes, Stretch},
        ui::{active_root, clear_active_root, set_active_root, Axis, SizeKind, UILayoutManager},
        AppError, Application, EngineConfig, EngineError, Runtime,
    };
}
