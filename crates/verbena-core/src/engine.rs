//! Main InvitationEngine - the primary entry point for Verbena
//!
//! InvitationEngine coordinates the image loader, background rotator,
//! registration store and submission dispatcher:
//! - Persistent storage of RSVP registrations
//! - Cached image loading with batch preload
//! - Periodic background rotation over the shuffled catalog pool
//! - Best-effort forwarding of registrations to external sinks
//!
//! # Example
//!
//! ```ignore
//! use verbena_core::{Config, InvitationEngine};
//!
//! let engine = InvitationEngine::new("~/.verbena/data", Config::default())?;
//!
//! // Apply the first background, then rotate on a timer
//! engine.init_background().await;
//! engine.start_rotation();
//!
//! // Record an RSVP and forward it to the configured sinks
//! let registered = engine.submit_rsvp("Ana").await;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::catalog::ImageCatalog;
use crate::config::Config;
use crate::dispatch::{DispatchOutcome, SubmissionDispatcher, SubmissionSink};
use crate::error::VerbenaResult;
use crate::loader::{ImageLoader, LoaderStats};
use crate::rotator::BackgroundRotator;
use crate::spawner::{ElementSpawner, Viewport};
use crate::store::RegistrationStore;
use crate::types::RsvpRecord;

/// Main entry point for Verbena
///
/// One engine instance per session owns every cache, pool and flag; nothing
/// lives in module-level globals. Collaborators receive what they need from
/// this instance.
pub struct InvitationEngine {
    /// Data directory path
    data_dir: PathBuf,
    /// Persistent RSVP storage
    store: Arc<RegistrationStore>,
    /// Shared image loader/cache
    loader: Arc<ImageLoader>,
    /// Background rotation state machine
    rotator: Arc<BackgroundRotator>,
    /// Record-first submission dispatcher
    dispatcher: SubmissionDispatcher,
    /// Floating-element interface for the visual layer
    spawner: ElementSpawner,
    /// Catalog served by the rotation pool
    catalog: ImageCatalog,
}

impl InvitationEngine {
    /// Create a new engine with the given data directory.
    ///
    /// This will:
    /// - Create the data directory if it doesn't exist
    /// - Initialize the registration database
    ///
    /// # Errors
    ///
    /// Returns `VerbenaError::Io` if the directory cannot be created.
    /// Returns `VerbenaError::Database` if storage initialization fails.
    pub fn new(data_dir: impl AsRef<Path>, config: Config) -> VerbenaResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        info!(?data_dir, "Initializing InvitationEngine");

        std::fs::create_dir_all(&data_dir)?;

        let db_path = data_dir.join("verbena.redb");
        let store = Arc::new(RegistrationStore::new(&db_path)?);

        let catalog = ImageCatalog::new(config.catalog.clone());
        let loader = Arc::new(ImageLoader::new(
            config.photo_dir.clone(),
            config.loader.clone(),
        ));
        let rotator = Arc::new(BackgroundRotator::new(
            Arc::clone(&loader),
            catalog.clone(),
            config.rotator.clone(),
        ));
        let dispatcher = SubmissionDispatcher::new(
            Arc::clone(&store),
            SubmissionSink::from_config(&config.sinks),
        );
        let spawner = ElementSpawner::new(
            Arc::clone(&loader),
            config.spawner.clone(),
            Viewport::default(),
        );

        Ok(Self {
            data_dir,
            store,
            loader,
            rotator,
            dispatcher,
            spawner,
            catalog,
        })
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the catalog served by the rotation pool
    pub fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    /// Get a reference to the registration store
    pub fn store(&self) -> &Arc<RegistrationStore> {
        &self.store
    }

    /// Get the floating-element spawner
    pub fn spawner(&self) -> &ElementSpawner {
        &self.spawner
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Background Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Warm the image cache and apply the first background. Awaited at
    /// startup; falls back to the first catalog entry if the initial step
    /// produces nothing.
    pub async fn init_background(&self) {
        self.loader.preload(&self.catalog).await;
        Arc::clone(&self.rotator).init().await;
    }

    /// Start the periodic background rotation task.
    ///
    /// The task will continue running until the process exits.
    pub fn start_rotation(&self) {
        Arc::clone(&self.rotator).start();
    }

    /// Receiver for the active display-reference property consumed by the
    /// visual layer.
    pub fn background(&self) -> watch::Receiver<Option<String>> {
        self.rotator.subscribe()
    }

    /// Currently published display-reference, if any.
    pub fn current_background(&self) -> Option<String> {
        self.rotator.current()
    }

    /// Point-in-time loader counters.
    pub fn loader_stats(&self) -> LoaderStats {
        self.loader.stats()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Registration Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Record an RSVP and forward it to the configured sinks.
    ///
    /// Returns `true` whenever local persistence succeeded; sink failures
    /// are logged only.
    pub async fn submit_rsvp(&self, name: &str) -> bool {
        self.dispatcher.submit(name).await
    }

    /// Like [`submit_rsvp`](Self::submit_rsvp), with per-phase detail for
    /// status messages.
    pub async fn dispatch_rsvp(&self, name: &str) -> DispatchOutcome {
        self.dispatcher.dispatch(name).await
    }

    /// All recorded registrations, oldest first.
    pub fn registrations(&self) -> Vec<RsvpRecord> {
        self.store.list()
    }

    /// Export registrations as a dated CSV file in `dir`; `Ok(None)` when
    /// there is nothing to export.
    pub fn export_csv(&self, dir: &Path) -> VerbenaResult<Option<PathBuf>> {
        self.store.export_csv(dir)
    }

    /// Export registrations as a dated JSON file in `dir`; `Ok(None)` when
    /// there is nothing to export.
    pub fn export_json(&self, dir: &Path) -> VerbenaResult<Option<PathBuf>> {
        self.store.export_json(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SinksConfig;
    use crate::rotator::display_reference;
    use tempfile::TempDir;

    fn offline_config(temp: &TempDir, catalog: &[&str]) -> Config {
        Config {
            photo_dir: temp.path().join("photos"),
            catalog: catalog.iter().map(|s| s.to_string()).collect(),
            sinks: SinksConfig {
                form_relay_url: None,
                webhook_url: None,
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_new_creates_data_dir_and_database() {
        let temp = TempDir::new().unwrap();
        let data_dir = temp.path().join("nested/data");
        let engine =
            InvitationEngine::new(&data_dir, offline_config(&temp, &["a.jpg"])).unwrap();

        assert!(data_dir.join("verbena.redb").exists());
        assert!(engine.registrations().is_empty());
    }

    #[tokio::test]
    async fn test_submit_rsvp_without_sinks_persists_locally() {
        let temp = TempDir::new().unwrap();
        let engine = InvitationEngine::new(
            temp.path().join("data"),
            offline_config(&temp, &["a.jpg"]),
        )
        .unwrap();

        assert!(engine.submit_rsvp("Ana").await);
        let records = engine.registrations();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Ana");
    }

    #[tokio::test]
    async fn test_init_background_falls_back_when_photos_are_missing() {
        let temp = TempDir::new().unwrap();
        let engine = InvitationEngine::new(
            temp.path().join("data"),
            offline_config(&temp, &["a.jpg", "b.jpg"]),
        )
        .unwrap();

        engine.init_background().await;
        assert_eq!(
            engine.current_background().unwrap(),
            display_reference("a.jpg")
        );
    }

    #[tokio::test]
    async fn test_init_background_applies_a_catalog_image() {
        let temp = TempDir::new().unwrap();
        let photos = temp.path().join("photos");
        std::fs::create_dir_all(&photos).unwrap();
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([9, 9, 9, 255]));
        for name in ["a.jpg", "b.jpg"] {
            img.save_with_format(photos.join(name), image::ImageFormat::Png)
                .unwrap();
        }

        let engine = InvitationEngine::new(
            temp.path().join("data"),
            offline_config(&temp, &["a.jpg", "b.jpg"]),
        )
        .unwrap();

        engine.init_background().await;
        let current = engine.current_background().unwrap();
        assert!(
            current == display_reference("a.jpg") || current == display_reference("b.jpg"),
            "unexpected background: {current}"
        );
        // Preload warmed both entries.
        assert_eq!(engine.loader_stats().loaded_count, 2);
    }
}
