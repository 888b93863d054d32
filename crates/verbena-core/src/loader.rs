//! Async image loading with a session-lifetime cache.
//!
//! Successes and permanent failures are memoized in two disjoint,
//! append-only sets: a cache hit resolves without touching the filesystem,
//! and a name that exhausted its retries fails immediately for the rest of
//! the session. Concurrent loads of the same uncached name are not
//! coalesced; the first completion wins the cache slot and later callers
//! receive that handle.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::catalog::ImageCatalog;
use crate::config::LoaderConfig;
use crate::error::{VerbenaError, VerbenaResult};

/// Sliding window for the average-load-time statistic.
const LOAD_TIME_WINDOW: usize = 10;

/// Decoded image handle.
///
/// Cache hits hand out the same `Arc`, so two loads of one name compare
/// pointer-equal.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Catalog name this handle was loaded from
    pub name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Decoded pixels in RGBA8 form
    pub rgba8: Arc<image::RgbaImage>,
}

#[derive(Default)]
struct LoaderState {
    cache: HashMap<String, Arc<LoadedImage>>,
    loaded: HashSet<String>,
    failed: HashSet<String>,
    load_times_ms: VecDeque<f64>,
    errors: u64,
}

/// Point-in-time loader counters.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderStats {
    pub cache_size: usize,
    pub loaded_count: usize,
    pub failed_count: usize,
    pub total_errors: u64,
    /// Average over the last few successful loads, in milliseconds
    pub avg_load_time_ms: f64,
}

/// Loads catalog images from the photo directory and memoizes the outcome.
pub struct ImageLoader {
    photo_root: PathBuf,
    config: LoaderConfig,
    state: Mutex<LoaderState>,
}

impl ImageLoader {
    pub fn new(photo_root: impl Into<PathBuf>, config: LoaderConfig) -> Self {
        Self {
            photo_root: photo_root.into(),
            config,
            state: Mutex::new(LoaderState::default()),
        }
    }

    pub fn photo_root(&self) -> &Path {
        &self.photo_root
    }

    /// Load `name`, consulting the cache and the permanent-failure set first.
    ///
    /// A fresh load is attempted up to `retry_attempts + 1` times; once those
    /// are exhausted the name enters the failure set and every later call
    /// fails without filesystem access.
    pub async fn load(&self, name: &str) -> VerbenaResult<Arc<LoadedImage>> {
        {
            let state = self.state.lock();
            if let Some(handle) = state.cache.get(name) {
                return Ok(Arc::clone(handle));
            }
            if state.failed.contains(name) {
                return Err(VerbenaError::ImageLoad {
                    name: name.to_string(),
                });
            }
        }

        let path = ImageCatalog::path_for(&self.photo_root, name);
        let started = Instant::now();
        let mut attempt = 0u32;
        loop {
            match Self::read_and_decode(&path, name).await {
                Ok(image) => {
                    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                    return Ok(self.memoize(name, image, elapsed_ms));
                }
                Err(err) => {
                    attempt += 1;
                    if attempt > self.config.retry_attempts {
                        let mut state = self.state.lock();
                        state.failed.insert(name.to_string());
                        state.errors += 1;
                        warn!(%name, %err, "image load failed permanently");
                        return Err(VerbenaError::ImageLoad {
                            name: name.to_string(),
                        });
                    }
                    debug!(%name, attempt, %err, "image load failed, retrying");
                }
            }
        }
    }

    /// Warm the cache with the first `preload_count` catalog entries.
    ///
    /// Concurrency is bounded by `max_concurrent_loads`; individual failures
    /// are logged and ignored.
    pub async fn preload(&self, catalog: &ImageCatalog) {
        let count = self.config.preload_count.min(catalog.len());
        if count == 0 {
            return;
        }
        info!(count, "preloading catalog images");

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_loads.max(1)));
        let tasks = catalog.names()[..count].iter().map(|name| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };
                if let Err(err) = self.load(name).await {
                    debug!(%name, %err, "preload skipped image");
                }
            }
        });
        futures::future::join_all(tasks).await;

        let stats = self.stats();
        info!(
            loaded = stats.loaded_count,
            failed = stats.failed_count,
            "preload complete"
        );
    }

    /// Whether `name` resolved successfully earlier this session.
    pub fn is_cached(&self, name: &str) -> bool {
        self.state.lock().cache.contains_key(name)
    }

    /// Whether `name` is in the permanent-failure set.
    pub fn is_failed(&self, name: &str) -> bool {
        self.state.lock().failed.contains(name)
    }

    pub fn stats(&self) -> LoaderStats {
        let state = self.state.lock();
        let avg = if state.load_times_ms.is_empty() {
            0.0
        } else {
            state.load_times_ms.iter().sum::<f64>() / state.load_times_ms.len() as f64
        };
        LoaderStats {
            cache_size: state.cache.len(),
            loaded_count: state.loaded.len(),
            failed_count: state.failed.len(),
            total_errors: state.errors,
            avg_load_time_ms: avg,
        }
    }

    async fn read_and_decode(path: &Path, name: &str) -> VerbenaResult<LoadedImage> {
        let bytes = tokio::fs::read(path).await?;
        let decoded =
            image::load_from_memory(&bytes).map_err(|e| VerbenaError::Decode(e.to_string()))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(LoadedImage {
            name: name.to_string(),
            width,
            height,
            rgba8: Arc::new(rgba),
        })
    }

    fn memoize(&self, name: &str, image: LoadedImage, elapsed_ms: f64) -> Arc<LoadedImage> {
        let mut state = self.state.lock();
        state.load_times_ms.push_back(elapsed_ms);
        if state.load_times_ms.len() > LOAD_TIME_WINDOW {
            state.load_times_ms.pop_front();
        }
        // A concurrent load of the same name may have finished first; the
        // first handle in the cache stays authoritative.
        if let Some(existing) = state.cache.get(name) {
            return Arc::clone(existing);
        }
        let handle = Arc::new(image);
        state.cache.insert(name.to_string(), Arc::clone(&handle));
        state.loaded.insert(name.to_string());
        debug!(%name, "image cached");
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_test_image(dir: &Path, name: &str) {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 50, 50, 255]));
        img.save_with_format(dir.join(name), image::ImageFormat::Png)
            .unwrap();
    }

    fn loader(dir: &TempDir, retry_attempts: u32) -> ImageLoader {
        ImageLoader::new(
            dir.path(),
            LoaderConfig {
                retry_attempts,
                ..LoaderConfig::default()
            },
        )
    }

    fn catalog(names: &[&str]) -> ImageCatalog {
        ImageCatalog::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn test_cache_returns_the_same_handle_without_reading_again() {
        let dir = TempDir::new().unwrap();
        write_test_image(dir.path(), "a.jpg");
        let loader = loader(&dir, 0);

        let first = loader.load("a.jpg").await.unwrap();
        // Remove the backing file: a second load can only succeed from cache.
        std::fs::remove_file(dir.path().join("a.jpg")).unwrap();
        let second = loader.load("a.jpg").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.width, 4);
        assert_eq!(first.height, 4);
    }

    #[tokio::test]
    async fn test_permanent_failure_short_circuits_for_the_session() {
        let dir = TempDir::new().unwrap();
        let loader = loader(&dir, 0);

        assert!(loader.load("missing.jpg").await.is_err());
        assert!(loader.is_failed("missing.jpg"));

        // Even after the file appears, the failure set wins.
        write_test_image(dir.path(), "missing.jpg");
        let err = loader.load("missing.jpg").await.unwrap_err();
        assert!(matches!(err, VerbenaError::ImageLoad { name } if name == "missing.jpg"));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_fail_after_retries() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"not an image").unwrap();
        let loader = loader(&dir, 2);

        assert!(loader.load("broken.jpg").await.is_err());
        let stats = loader.stats();
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.total_errors, 1);
        assert_eq!(stats.loaded_count, 0);
    }

    #[tokio::test]
    async fn test_loaded_and_failed_sets_stay_disjoint() {
        let dir = TempDir::new().unwrap();
        write_test_image(dir.path(), "good.jpg");
        let loader = loader(&dir, 0);

        loader.load("good.jpg").await.unwrap();
        let _ = loader.load("bad.jpg").await;

        assert!(loader.is_cached("good.jpg") && !loader.is_failed("good.jpg"));
        assert!(loader.is_failed("bad.jpg") && !loader.is_cached("bad.jpg"));
    }

    #[tokio::test]
    async fn test_preload_warms_only_existing_images() {
        let dir = TempDir::new().unwrap();
        write_test_image(dir.path(), "a.jpg");
        write_test_image(dir.path(), "b.jpg");
        let loader = loader(&dir, 0);

        loader
            .preload(&catalog(&["a.jpg", "b.jpg", "gone.jpg"]))
            .await;

        let stats = loader.stats();
        assert_eq!(stats.loaded_count, 2);
        assert_eq!(stats.failed_count, 1);
        assert!(stats.avg_load_time_ms > 0.0);
    }

    #[tokio::test]
    async fn test_preload_respects_preload_count() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            write_test_image(dir.path(), name);
        }
        let loader = ImageLoader::new(
            dir.path(),
            LoaderConfig {
                preload_count: 2,
                ..LoaderConfig::default()
            },
        );

        loader.preload(&catalog(&["a.jpg", "b.jpg", "c.jpg"])).await;
        assert!(loader.is_cached("a.jpg"));
        assert!(loader.is_cached("b.jpg"));
        assert!(!loader.is_cached("c.jpg"));
    }
}
