//! Headless layout demo
//!
//! Builds a small menu under a UI root, toggles one of its rows on a timer
//! and logs the resolved rects each tick. Pass a `.toml` or `.ron` engine
//! config path as the first argument to override the defaults.

use scene_engine::prelude::*;

const MENU_ENTRIES: [&str; 3] = ["Resume", "Options", "Quit"];

/// Toggles its GameObject's enabled flag every `period` seconds
struct Blinker {
    target: GameObjectId,
    period: f32,
    elapsed: f32,
}

impl Component for Blinker {
    fn type_name(&self) -> &'static str {
        "Blinker"
    }

    fn on_update(&mut self, scene: &mut Scene, _id: ComponentId, delta_time: f32) {
        self.elapsed += delta_time;
        if self.elapsed < self.period {
            return;
        }
        self.elapsed -= self.period;
        let enabled = !scene.is_enabled(self.target);
        if let Err(e) = scene.set_enabled(self.target, enabled) {
            log::warn!("Blinker failed to toggle {:?}: {}", self.target, e);
        }
    }
}

struct MenuDemo {
    canvas: Option<GameObjectId>,
    ticks: u32,
    max_ticks: u32,
}

impl MenuDemo {
    fn new(max_ticks: u32) -> Self {
        Self {
            canvas: None,
            ticks: 0,
            max_ticks,
        }
    }

    fn build_menu(scene: &mut Scene) -> Result<GameObjectId, AppError> {
        let canvas = scene.create_game_object("canvas");
        scene.attach(canvas, Box::new(RectTransform::with_reference_size(Vec2::new(320.0, 200.0))))?;

        let menu = scene.create_child(canvas, "menu")?;
        scene.attach(menu, Box::new(RectTransform::default()))?;
        scene.set_anchors(menu, Vec2::new(0.5, 0.5), Vec2::new(0.5, 0.5))?;
        scene.attach(
            menu,
            Box::new(
                DirectionalLayout::new(Axis::Vertical)
                    .with_padding(Margins::uniform(8.0))
                    .with_spacing(4.0)
                    .with_stretch(Axis::Horizontal, Stretch::Fill),
            ),
        )?;
        scene.attach(
            menu,
            Box::new(ContentSizeFitter::new(FitMode::PreferredSize, FitMode::PreferredSize)),
        )?;

        for (index, entry) in MENU_ENTRIES.iter().enumerate() {
            let row = scene.create_child(menu, *entry)?;
            scene.attach(row, Box::new(RectTransform::default()))?;
            let width = 60.0 + 12.0 * entry.len() as f32;
            scene.attach(
                row,
                Box::new(
                    LayoutSizes::default()
                        .with_min(Vec2::new(40.0, 16.0))
                        .with_preferred(Vec2::new(width, 24.0)),
                ),
            )?;
            if index == 1 {
                scene.attach(
                    canvas,
                    Box::new(Blinker {
                        target: row,
                        period: 0.5,
                        elapsed: 0.0,
                    }),
                )?;
            }
        }
        Ok(canvas)
    }

    fn log_rects(scene: &Scene, go: GameObjectId, depth: usize) {
        if let Some(rect) = scene.rect(go) {
            log::info!(
                "{:indent$}{} [{:.1}, {:.1} {:.1}x{:.1}]{}",
                "",
                scene.name(go).unwrap_or("?"),
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                if scene.is_enabled_recursively(go) { "" } else { " (disabled)" },
                indent = depth * 2
            );
        }
        for &child in scene.children(go) {
            Self::log_rects(scene, child, depth + 1);
        }
    }
}

impl Application for MenuDemo {
    fn initialize(&mut self, runtime: &mut Runtime) -> Result<(), AppError> {
        log::info!("Building menu...");
        let canvas = Self::build_menu(runtime.scene_mut())?;
        runtime.register_ui_root(canvas)?;
        set_active_root(canvas);
        self.canvas = Some(canvas);
        Ok(())
    }

    fn update(&mut self, runtime: &mut Runtime, _delta_time: f32) -> Result<(), AppError> {
        self.ticks += 1;
        if self.ticks >= self.max_ticks {
            runtime.quit();
        }
        Ok(())
    }

    fn render(&mut self, runtime: &mut Runtime) -> Result<(), AppError> {
        let Some(canvas) = self.canvas else {
            return Ok(());
        };
        let stats = runtime.stats();
        log::info!(
            "Frame {} ({} updated, layout {} us)",
            stats.frame,
            stats.objects_updated,
            stats.layout_micros
        );
        Self::log_rects(runtime.scene(), canvas, 0);
        runtime.render(RenderPass::default());
        Ok(())
    }

    fn cleanup(&mut self, runtime: &mut Runtime) {
        let Some(canvas) = self.canvas.take() else {
            return;
        };
        clear_active_root();
        match runtime
            .scene()
            .export_meta(canvas)
            .and_then(|meta| meta.to_ron_string().map_err(Into::into))
        {
            Ok(text) => log::debug!("Final menu:\n{}", text),
            Err(e) => log::warn!("Failed to export menu: {}", e),
        }
        runtime.unregister_ui_root(canvas);
        runtime.scene_mut().unload();
        log::info!("Layout demo cleaned up");
    }
}

fn load_config() -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading config from {}", path);
            EngineConfig::load_from_file(&path)?
        }
        None => EngineConfig::default(),
    };
    if config.fixed_delta_time.is_none() {
        config.fixed_delta_time = Some(0.25);
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting layout demo");

    let config = load_config()?;
    let mut app = MenuDemo::new(6);

    match Runtime::run(config, &mut app) {
        Ok(()) => {
            log::info!("Layout demo finished successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Layout demo failed: {}", e);
            Err(e.into())
        }
    }
}
