//! Floating-element spawner.
//!
//! Interface-level component: it decides geometry and animation for the
//! visual layer and goes through the shared loader for pixels. A failed load
//! becomes a placeholder element with the same geometry.

use std::sync::Arc;

use rand::Rng;
use tracing::warn;

use crate::config::SpawnerConfig;
use crate::loader::ImageLoader;

/// Animations the visual layer knows how to play.
pub const ANIMATIONS: [&str; 7] = [
    "spin", "bounce", "float", "shake", "pulse", "zigzag", "explode",
];

/// Bounded area elements are placed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

/// One floating element for the visual layer to materialize.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatingElement {
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Edge length in pixels
    pub size: u32,
    pub animation: &'static str,
    pub duration_secs: f64,
    pub delay_secs: f64,
    /// True when the image failed to load and a placeholder should be shown
    pub placeholder: bool,
}

/// Materializes floating elements at randomized positions and animations.
pub struct ElementSpawner {
    loader: Arc<ImageLoader>,
    config: SpawnerConfig,
    viewport: Viewport,
}

impl ElementSpawner {
    pub fn new(loader: Arc<ImageLoader>, config: SpawnerConfig, viewport: Viewport) -> Self {
        Self {
            loader,
            config,
            viewport,
        }
    }

    /// Cap on simultaneously active elements, enforced by the visual layer.
    pub fn max_active(&self) -> usize {
        self.config.max_active_images
    }

    /// Build an element for `name`, falling back to a placeholder when the
    /// image cannot be loaded.
    pub async fn spawn(&self, name: &str) -> FloatingElement {
        match self.loader.load(name).await {
            Ok(_) => self.element(name, false),
            Err(err) => {
                warn!(%name, %err, "could not load image, using placeholder");
                self.element(name, true)
            }
        }
    }

    fn element(&self, name: &str, placeholder: bool) -> FloatingElement {
        let mut rng = rand::rng();
        let size = self.config.element_size;
        let max_x = (self.viewport.width - f64::from(size)).max(1.0);
        let max_y = (self.viewport.height - f64::from(size)).max(1.0);
        FloatingElement {
            name: name.to_string(),
            x: rng.random_range(0.0..max_x),
            y: rng.random_range(0.0..max_y),
            size,
            animation: ANIMATIONS[rng.random_range(0..ANIMATIONS.len())],
            duration_secs: 2.0 + rng.random_range(0.0..3.0),
            delay_secs: rng.random_range(0.0..2.0),
            placeholder,
        }
    }
}
