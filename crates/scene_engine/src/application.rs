//! Application trait driven by [`Runtime::run`]

use crate::engine::{EngineError, Runtime};
use crate::scene::{RenderPass, SceneError};
use thiserror::Error;

/// Host application lifecycle
///
/// Implement this trait to build a scene and react to ticks; the runtime
/// owns the scene and drives it between `update` and `render`.
pub trait Application {
    /// Called once after the runtime is created. Build the initial scene
    /// and register UI roots here.
    fn initialize(&mut self, runtime: &mut Runtime) -> Result<(), AppError>;

    /// Called every tick before the scene is updated
    ///
    /// # Arguments
    /// * `runtime` - The runtime owning the scene
    /// * `delta_time` - Seconds since the previous tick
    fn update(&mut self, runtime: &mut Runtime, delta_time: f32) -> Result<(), AppError>;

    /// Called after the scene update; renders the default pass unless overridden
    fn render(&mut self, runtime: &mut Runtime) -> Result<(), AppError> {
        runtime.render(RenderPass::default());
        Ok(())
    }

    /// Called once when the main loop exits
    fn cleanup(&mut self, runtime: &mut Runtime);
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Runtime error propagated to application level
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Scene operation rejected
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    struct QuitAfter {
        ticks: u32,
        seen: u32,
        cleaned_up: bool,
    }

    impl Application for QuitAfter {
        fn initialize(&mut self, runtime: &mut Runtime) -> Result<(), AppError> {
            runtime.scene_mut().create_game_object("root");
            Ok(())
        }

        fn update(&mut self, runtime: &mut Runtime, _delta_time: f32) -> Result<(), AppError> {
            self.seen += 1;
            if self.seen >= self.ticks {
                runtime.quit();
            }
            Ok(())
        }

        fn cleanup(&mut self, runtime: &mut Runtime) {
            self.cleaned_up = runtime.stats().frame == u64::from(self.ticks);
        }
    }

    struct FailsOnInit;

    impl Application for FailsOnInit {
        fn initialize(&mut self, _runtime: &mut Runtime) -> Result<(), AppError> {
            Err(AppError::Custom("no scene".to_string()))
        }

        fn update(&mut self, _runtime: &mut Runtime, _delta_time: f32) -> Result<(), AppError> {
            Ok(())
        }

        fn cleanup(&mut self, _runtime: &mut Runtime) {}
    }

    #[test]
    fn test_run_until_quit_with_fixed_step() {
        let config = EngineConfig {
            fixed_delta_time: Some(0.5),
            ..EngineConfig::default()
        };
        let mut app = QuitAfter {
            ticks: 3,
            seen: 0,
            cleaned_up: false,
        };

        Runtime::run(config, &mut app).unwrap();

        assert_eq!(app.seen, 3);
        assert!(app.cleaned_up);
    }

    #[test]
    fn test_initialize_error_aborts_run() {
        let result = Runtime::run(EngineConfig::default(), &mut FailsOnInit);

        assert!(matches!(result, Err(EngineError::ApplicationError(_))));
    }

    #[test]
    fn test_scene_error_converts() {
        let error: AppError = SceneError::SelfParenting(crate::scene::GameObjectId::default()).into();
        assert!(matches!(error, AppError::Scene(_)));
    }
}
