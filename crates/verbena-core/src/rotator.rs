//! Background rotation over the shuffled image pool.
//!
//! One rotation step draws the next pool name, resolves a display-reference
//! for it (preloading through the loader on a cache miss), publishes it on
//! the watch channel, and prefetches the next few pool entries. Steps are
//! mutually exclusive: a trigger that arrives while a step is in flight is
//! dropped, never queued. A failed step schedules a single retry of the
//! whole step after a fixed backoff instead of advancing further.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::catalog::ImageCatalog;
use crate::config::RotatorConfig;
use crate::error::{VerbenaError, VerbenaResult};
use crate::loader::ImageLoader;
use crate::pool::RotationPool;

/// Build the display-reference string the visual layer consumes.
pub fn display_reference(name: &str) -> String {
    format!("url('photos/{name}')")
}

struct RotatorState {
    pool: RotationPool,
    display_cache: HashMap<String, String>,
}

/// Clears the in-flight flag when a rotation step ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the rotation pool, the display-reference preload cache and the
/// in-flight guard. Constructed once per session by the engine.
pub struct BackgroundRotator {
    loader: Arc<ImageLoader>,
    config: RotatorConfig,
    state: Mutex<RotatorState>,
    in_flight: AtomicBool,
    current: watch::Sender<Option<String>>,
}

impl BackgroundRotator {
    pub fn new(loader: Arc<ImageLoader>, catalog: ImageCatalog, config: RotatorConfig) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            loader,
            config,
            state: Mutex::new(RotatorState {
                pool: RotationPool::new(catalog),
                display_cache: HashMap::new(),
            }),
            in_flight: AtomicBool::new(false),
            current,
        }
    }

    /// Receiver for the active display-reference property.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.current.subscribe()
    }

    /// Currently published display-reference, if any.
    pub fn current(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    /// Apply the first background, awaited at startup.
    ///
    /// If the initial step completes without a single success, the first
    /// catalog entry is applied directly, without preloading.
    pub async fn init(self: Arc<Self>) {
        Arc::clone(&self).rotate_once().await;
        if self.current.borrow().is_none() {
            let fallback = {
                let state = self.state.lock();
                state.pool.catalog().first().map(str::to_string)
            };
            if let Some(name) = fallback {
                warn!(%name, "initial rotation produced no background, applying fallback");
                self.current.send_replace(Some(display_reference(&name)));
            }
        }
    }

    /// Spawn the periodic rotation task.
    pub fn start(self: Arc<Self>) {
        let period = self.config.rotate_period();
        let rotator = Arc::clone(&self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately; the initial background
            // was already applied by `init`.
            interval.tick().await;
            loop {
                interval.tick().await;
                Arc::clone(&rotator).rotate_once().await;
            }
        });
        info!(?period, "background rotation task started");
    }

    /// Run one rotation step.
    pub async fn rotate_once(self: Arc<Self>) {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("rotation already in flight, dropping trigger");
            return;
        }
        let _guard = InFlightGuard(&self.in_flight);

        let next = {
            let mut state = self.state.lock();
            state.pool.next_name()
        };
        let Some(name) = next else {
            warn!("rotation skipped: catalog is empty");
            return;
        };

        match self.resolve_display_reference(&name).await {
            Ok(reference) => {
                self.current.send_replace(Some(reference));
                debug!(%name, "background applied");
                self.prefetch_upcoming().await;
            }
            Err(err) => {
                warn!(%name, %err, "rotation step failed, scheduling retry");
                let delay = self.config.retry_delay();
                spawn_retry(Arc::clone(&self), delay);
            }
        }
    }

    /// Resolve `name` through the preload cache, loading it on a miss.
    async fn resolve_display_reference(&self, name: &str) -> VerbenaResult<String> {
        {
            let state = self.state.lock();
            if let Some(reference) = state.display_cache.get(name) {
                return Ok(reference.clone());
            }
        }
        self.loader
            .load(name)
            .await
            .map_err(|e| VerbenaError::Rotation(e.to_string()))?;
        let reference = display_reference(name);
        self.state
            .lock()
            .display_cache
            .insert(name.to_string(), reference.clone());
        Ok(reference)
    }

    /// Best-effort prefetch of the next few pool entries. The preload cache
    /// and the loader cache keep repeated prefetches free.
    async fn prefetch_upcoming(&self) {
        let upcoming = {
            let state = self.state.lock();
            state.pool.upcoming(self.config.prefetch_count)
        };
        for name in upcoming {
            if let Err(err) = self.resolve_display_reference(&name).await {
                debug!(%name, %err, "prefetch skipped image");
            }
        }
    }
}

/// Spawn a single delayed retry of a rotation step.
///
/// Kept as a free function so the recursive `rotate_once` call lives outside
/// `rotate_once`'s own body, which lets the compiler resolve its `Send`-ness
/// without a self-referential auto-trait cycle.
fn spawn_retry(rotator: Arc<BackgroundRotator>, delay: std::time::Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        rotator.rotate_once().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_test_image(dir: &Path, name: &str) {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 120, 80, 255]));
        img.save_with_format(dir.join(name), image::ImageFormat::Png)
            .unwrap();
    }

    fn rotator_for(dir: &TempDir, names: &[&str]) -> Arc<BackgroundRotator> {
        let loader = Arc::new(ImageLoader::new(dir.path(), LoaderConfig::default()));
        let catalog = ImageCatalog::new(names.iter().map(|s| s.to_string()).collect());
        Arc::new(BackgroundRotator::new(
            loader,
            catalog,
            RotatorConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_three_steps_apply_a_permutation_of_three_names() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            write_test_image(dir.path(), name);
        }
        let rotator = rotator_for(&dir, &["a.jpg", "b.jpg", "c.jpg"]);

        let mut applied = Vec::new();
        for _ in 0..3 {
            Arc::clone(&rotator).rotate_once().await;
            applied.push(rotator.current().unwrap());
        }

        let unique: std::collections::HashSet<_> = applied.iter().cloned().collect();
        assert_eq!(unique.len(), 3);
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            assert!(applied.contains(&display_reference(name)));
        }

        // A fourth step starts a new cycle; still a catalog image.
        Arc::clone(&rotator).rotate_once().await;
        assert!(unique.contains(&rotator.current().unwrap()));
    }

    #[tokio::test]
    async fn test_trigger_while_in_flight_is_dropped() {
        let dir = TempDir::new().unwrap();
        write_test_image(dir.path(), "a.jpg");
        let rotator = rotator_for(&dir, &["a.jpg"]);

        rotator.in_flight.store(true, Ordering::Release);
        Arc::clone(&rotator).rotate_once().await;
        assert!(rotator.current().is_none());

        rotator.in_flight.store(false, Ordering::Release);
        Arc::clone(&rotator).rotate_once().await;
        assert_eq!(rotator.current().unwrap(), display_reference("a.jpg"));
    }

    #[tokio::test]
    async fn test_successful_step_prefetches_upcoming_entries() {
        let dir = TempDir::new().unwrap();
        let names = ["a.jpg", "b.jpg", "c.jpg", "d.jpg"];
        for name in names {
            write_test_image(dir.path(), name);
        }
        let loader = Arc::new(ImageLoader::new(dir.path(), LoaderConfig::default()));
        let catalog = ImageCatalog::new(names.iter().map(|s| s.to_string()).collect());
        let rotator = Arc::new(BackgroundRotator::new(
            Arc::clone(&loader),
            catalog,
            RotatorConfig::default(),
        ));

        Arc::clone(&rotator).rotate_once().await;

        // The applied entry plus the three upcoming ones are all cached.
        assert_eq!(loader.stats().cache_size, 4);
    }

    #[tokio::test]
    async fn test_init_falls_back_to_first_catalog_entry() {
        let dir = TempDir::new().unwrap();
        // No files on disk: every load fails.
        let rotator = rotator_for(&dir, &["a.jpg", "b.jpg"]);

        Arc::clone(&rotator).init().await;
        assert_eq!(rotator.current().unwrap(), display_reference("a.jpg"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_step_retries_after_backoff() {
        let dir = TempDir::new().unwrap();
        let rotator = rotator_for(&dir, &["a.jpg", "b.jpg"]);

        Arc::clone(&rotator).rotate_once().await;
        assert!(rotator.current().is_none());

        // The images appear before the retry fires.
        write_test_image(dir.path(), "a.jpg");
        write_test_image(dir.path(), "b.jpg");
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(rotator.current().is_some());
    }
}
