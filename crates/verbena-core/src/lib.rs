//! Verbena Core Library
//!
//! Party kiosk engine: rotating meme backgrounds and a durable RSVP registry.
//!
//! ## Overview
//!
//! Verbena drives a birthday-invitation display. A fixed catalog of images
//! feeds a shuffled, non-repeating rotation pool; a background rotator
//! applies the next image on a timer with caching and lookahead prefetch;
//! RSVP confirmations land in durable local storage and are best-effort
//! forwarded to external sinks.
//!
//! ## Core Principles
//!
//! - **Local-first**: registrations persist before any network is touched;
//!   sink failures never lose a confirmation
//! - **One instance owns everything**: caches, pools and flags are fields of
//!   a single [`InvitationEngine`] per session, not globals
//! - **Contained failures**: load, rotation and sink errors degrade to logs
//!   and fallbacks at the component boundary that produced them
//!
//! ## Quick Start
//!
//! ```ignore
//! use verbena_core::{Config, InvitationEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = InvitationEngine::new("~/.verbena/data", Config::default())?;
//!
//!     engine.init_background().await;
//!     engine.start_rotation();
//!
//!     let registered = engine.submit_rsvp("Ana").await;
//!     println!("registered: {registered}");
//!
//!     for record in engine.registrations() {
//!         println!("{} - {} {}", record.name, record.date, record.time);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod loader;
pub mod pool;
pub mod rotator;
pub mod spawner;
pub mod store;
pub mod types;

// Re-exports
pub use catalog::{ImageCatalog, DEFAULT_IMAGES};
pub use config::{Config, LoaderConfig, RotatorConfig, SinksConfig, SpawnerConfig};
pub use dispatch::{
    DispatchOutcome, SubmissionDispatcher, SubmissionSink, DEFAULT_FORM_RELAY_URL,
};
pub use engine::InvitationEngine;
pub use error::{VerbenaError, VerbenaResult};
pub use loader::{ImageLoader, LoadedImage, LoaderStats};
pub use pool::RotationPool;
pub use rotator::{display_reference, BackgroundRotator};
pub use spawner::{ElementSpawner, FloatingElement, Viewport, ANIMATIONS};
pub use store::{RegistrationStore, CSV_HEADER};
pub use types::{RsvpId, RsvpRecord};
