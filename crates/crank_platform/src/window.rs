use crank_core::config::EngineConfig;
use crank_core::error::{EngineError, EngineResult};
use std::sync::Arc;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for PlatformConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            title: config.title.clone(),
            width: config.width,
            height: config.height,
        }
    }
}

/// The inner size is physical, so one logical engine unit is one drawable
/// pixel.
pub fn create_window(
    event_loop: &ActiveEventLoop,
    config: &PlatformConfig,
) -> EngineResult<Arc<Window>> {
    let attrs = WindowAttributes::default()
        .with_title(&config.title)
        .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height));

    let window = event_loop
        .create_window(attrs)
        .map_err(|e| EngineError::setup(format!("Failed to create window: {e}")))?;
    log::info!(
        "Window '{}' created at {}x{} (scale factor {})",
        config.title,
        config.width,
        config.height,
        window.scale_factor()
    );
    Ok(Arc::new(window))
}

/// Apply a title or size change requested by the game.
pub fn apply_window_request(
    window: &Window,
    title: Option<&str>,
    size: Option<(u32, u32)>,
) {
    if let Some(title) = title {
        window.set_title(title);
    }
    if let Some((width, height)) = size {
        // `None` means the request was queued and a Resized event follows.
        let _ = window.request_inner_size(winit::dpi::PhysicalSize::new(width, height));
    }
}
