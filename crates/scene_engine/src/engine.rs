//! Host runtime driving the scene once per tick


use crate::{
    application::Application,
    config::EngineConfig,
    foundation::time::{Stopwatch, Timer},
    scene::{GameObjectId, RenderPass, Scene, SceneError},
    ui::{active, UILayoutManager},
};
use thiserror::Error;

/// Per-tick statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Ticks run so far
    pub frame: u64,
    /// Components updated during the last tick
    pub objects_updated: usize,
    /// Time spent rebuilding layouts during the last tick, in microseconds
    pub layout_micros: u64,
}

/// Owns the scene and the per-root layout managers
///
/// One [`Runtime::tick`] runs, for every root in order: pre-start, start and
/// update, then rebuilds every registered UI root and finally flushes
/// deferred destruction.
pub struct Runtime {
    scene: Scene,
    layouts: Vec<UILayoutManager>,
    config: EngineConfig,
    timer: Timer,
    stats: FrameStats,
    running: bool,
}

impl Runtime {
    /// Create a runtime with an empty scene
    pub fn new(config: EngineConfig) -> Self {
        log::info!("Initializing runtime...");
        Self {
            scene: Scene::with_config(config.scene.clone()),
            layouts: Vec::new(),
            config,
            timer: Timer::new(),
            stats: FrameStats::default(),
            running: true,
        }
    }

    /// The scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable access to the scene
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Runtime configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Statistics of the last tick
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Whether [`Runtime::quit`] has not been called
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Create a layout manager for the subtree under `root`
    ///
    /// Registering the same root again keeps the existing manager.
    pub fn register_ui_root(&mut self, root: GameObjectId) -> Result<&UILayoutManager, EngineError> {
        if !self.scene.contains(root) || self.scene.is_waiting_to_be_destroyed(root) {
            return Err(EngineError::Scene(SceneError::StaleGameObject(root)));
        }
        let index = match self.layouts.iter().position(|manager| manager.root() == root) {
            Some(index) => index,
            None => {
                log::debug!("Registered UI root {:?}", root);
                self.layouts.push(UILayoutManager::new(root, self.config.layout.clone()));
                self.layouts.len() - 1
            }
        };
        Ok(&self.layouts[index])
    }

    /// Drop the layout manager of `root`
    pub fn unregister_ui_root(&mut self, root: GameObjectId) -> Option<UILayoutManager> {
        let index = self.layouts.iter().position(|manager| manager.root() == root)?;
        Some(self.layouts.remove(index))
    }

    /// Layout manager of a registered UI root
    pub fn layout_manager(&self, root: GameObjectId) -> Option<&UILayoutManager> {
        self.layouts.iter().find(|manager| manager.root() == root)
    }

    /// Registered UI roots, in registration order
    ///
    /// Layouts are rebuilt in this order.
    pub fn ui_roots(&self) -> impl Iterator<Item = GameObjectId> + '_ {
        self.layouts.iter().map(UILayoutManager::root)
    }

    /// Layout manager of the active UI root
    ///
    /// `None` when no root is active or the active root is not registered.
    pub fn active_layout_manager(&self) -> Option<&UILayoutManager> {
        active::active_root().and_then(|root| self.layout_manager(root))
    }

    /// Rebuild every registered UI root now
    pub fn rebuild_layouts(&mut self) {
        let stopwatch = Stopwatch::start_new();
        let scene = &mut self.scene;
        self.layouts.retain(|manager| scene.contains(manager.root()));
        for manager in &self.layouts {
            manager.rebuild_layout(scene);
        }
        self.stats.layout_micros = stopwatch.elapsed_micros();
    }

    /// Advance the scene by one tick of `delta_time` seconds
    pub fn tick(&mut self, delta_time: f32) {
        let roots = self.scene.roots().to_vec();
        for &root in &roots {
            self.scene.pre_start(root);
        }
        for &root in &roots {
            self.scene.start(root);
        }

        let mut updated = 0;
        for &root in &roots {
            updated += self.scene.update(root, delta_time);
        }

        if self.config.layout.rebuild_on_tick {
            self.rebuild_layouts();
        }
        for root in self.scene.roots().to_vec() {
            self.scene.destroy_pending(root);
        }

        self.stats.frame += 1;
        self.stats.objects_updated = updated;
        log::trace!("Tick {} updated {} component(s)", self.stats.frame, updated);
    }

    /// Run one render pass over every visible root
    pub fn render(&mut self, pass: RenderPass) {
        for root in self.scene.roots().to_vec() {
            self.scene.render(root, pass);
        }
    }

    /// Drive `app` until it or the runtime requests shutdown
    ///
    /// Uses the configured fixed step when set, wall clock time otherwise.
    pub fn run<T: Application>(config: EngineConfig, app: &mut T) -> Result<(), EngineError> {
        let mut runtime = Self::new(config);

        app.initialize(&mut runtime)
            .map_err(|e| EngineError::ApplicationError(format!("App initialization: {}", e)))?;

        log::info!("Starting main loop...");

        while runtime.running {
            match runtime.config.fixed_delta_time {
                Some(step) => runtime.timer.advance(step),
                None => runtime.timer.update(),
            }
            let delta_time = runtime.timer.delta_time();

            app.update(&mut runtime, delta_time)
                .map_err(|e| EngineError::ApplicationError(format!("App update: {}", e)))?;

            runtime.tick(delta_time);

            app.render(&mut runtime)
                .map_err(|e| EngineError::ApplicationError(format!("App render: {}", e)))?;
        }

        app.cleanup(&mut runtime);

        log::info!("Runtime shutdown complete after {} tick(s)", runtime.stats.frame);
        Ok(())
    }

    /// Request shutdown at the end of the current tick
    pub fn quit(&mut self) {
        log::info!("Runtime shutdown requested");
        self.running = false;
    }

    /// Seconds since the runtime started
    pub fn total_time(&self) -> f32 {
        self.timer.total_time()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("scene", &self.scene)
            .field("ui_roots", &self.layouts.len())
            .field("stats", &self.stats)
            .field("running", &self.running)
            .finish()
    }
}

/// Runtime-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Scene operation rejected
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Application callback failed
    #[error("Application error: {0}")]
    ApplicationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<crate::config::ConfigError> for EngineError {
    fn from(error: crate::config::ConfigError) -> Self {
        EngineError::ConfigError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec2;
    use crate::scene::{Component, ComponentId};
    use crate::transform::RectTransform;
    use crate::ui::layout::{Axis, DirectionalLayout, LayoutSizes};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counter {
        ticks: Rc<Cell<u32>>,
    }

    impl Component for Counter {
        fn type_name(&self) -> &'static str {
            "Counter"
        }

        fn on_update(&mut self, _scene: &mut Scene, _id: ComponentId, _delta_time: f32) {
            self.ticks.set(self.ticks.get() + 1);
        }
    }

    #[test]
    fn test_tick_starts_updates_and_sweeps() {
        let ticks = Rc::new(Cell::new(0));
        let mut runtime = Runtime::new(EngineConfig::default());
        let root = runtime.scene_mut().create_game_object("root");
        let child = runtime.scene_mut().create_child(root, "child").unwrap();
        runtime
            .scene_mut()
            .attach(child, Box::new(Counter { ticks: Rc::clone(&ticks) }))
            .unwrap();

        runtime.tick(0.016);
        assert!(runtime.scene().is_started(child));
        assert_eq!(ticks.get(), 1);
        assert_eq!(runtime.stats().objects_updated, 1);

        runtime.scene_mut().destroy(child).unwrap();
        runtime.tick(0.016);
        assert!(!runtime.scene().contains(child));
        assert_eq!(runtime.stats().frame, 2);
    }

    #[test]
    fn test_tick_rebuilds_registered_roots() {
        let mut runtime = Runtime::new(EngineConfig::default());
        let scene = runtime.scene_mut();
        let canvas = scene.create_game_object("canvas");
        scene
            .attach(canvas, Box::new(RectTransform::with_reference_size(Vec2::new(40.0, 10.0))))
            .unwrap();
        scene.attach(canvas, Box::new(DirectionalLayout::new(Axis::Horizontal))).unwrap();
        let item = scene.create_child(canvas, "item").unwrap();
        scene.attach(item, Box::new(RectTransform::default())).unwrap();
        scene
            .attach(item, Box::new(LayoutSizes::default().with_preferred(Vec2::new(15.0, 10.0))))
            .unwrap();
        runtime.register_ui_root(canvas).unwrap();

        runtime.tick(0.016);

        assert_eq!(runtime.scene().rect(item).map(|r| r.width), Some(15.0));
    }

    #[test]
    fn test_ui_roots_keep_registration_order() {
        let mut runtime = Runtime::new(EngineConfig::default());
        let roots: Vec<_> = ["hud", "menu", "overlay", "tooltip"]
            .into_iter()
            .map(|name| runtime.scene_mut().create_game_object(name))
            .collect();
        for &root in roots.iter().rev() {
            runtime.register_ui_root(root).unwrap();
        }
        runtime.register_ui_root(roots[2]).unwrap();

        assert_eq!(runtime.ui_roots().collect::<Vec<_>>(), [roots[3], roots[2], roots[1], roots[0]]);

        runtime.unregister_ui_root(roots[2]).unwrap();
        runtime.scene_mut().destroy(roots[1]).unwrap();
        runtime.rebuild_layouts();

        assert_eq!(runtime.ui_roots().collect::<Vec<_>>(), [roots[3], roots[0]]);
    }

    #[test]
    fn test_active_layout_manager_has_no_fallback() {
        let mut runtime = Runtime::new(EngineConfig::default());
        let canvas = runtime.scene_mut().create_game_object("canvas");
        let other = runtime.scene_mut().create_game_object("other");
        runtime.register_ui_root(canvas).unwrap();

        active::clear_active_root();
        assert!(runtime.active_layout_manager().is_none());

        active::set_active_root(other);
        assert!(runtime.active_layout_manager().is_none());

        active::set_active_root(canvas);
        assert_eq!(runtime.active_layout_manager().map(UILayoutManager::root), Some(canvas));
        active::clear_active_root();
    }

    #[test]
    fn test_register_destroyed_root_fails() {
        let mut runtime = Runtime::new(EngineConfig::default());
        let canvas = runtime.scene_mut().create_game_object("canvas");
        runtime.scene_mut().destroy(canvas).unwrap();

        assert!(matches!(runtime.register_ui_root(canvas), Err(EngineError::Scene(_))));
    }
}
