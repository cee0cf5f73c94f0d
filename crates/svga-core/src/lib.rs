//! # SVGA Core
//!
//! `svga-core` decodes SVGA animation archives and plays them back frame by frame without drawing
//! a single pixel. Renderers consume the resolved [`Scene`] of the current frame: one
//! [`DrawDescriptor`] per sprite, carrying the bitmap, transform, alpha, clip path and matte
//! relationship.
//!
//! ## Pipeline
//!
//! *   **Archive**: [`ArchiveReader`] detects the container generation (1.x zip or 2.x deflated
//!     protobuf), extracts legacy archives into a content-addressed cache and builds a
//!     [`MovieEntity`].
//! *   **Entities**: immutable movie, sprite, frame and shape records, shared behind `Arc`.
//! *   **Playback**: [`PlaybackEngine`] owns frame index, loop counter, fill mode and dynamic
//!     overrides. It is driven by a [`FrameClock`] and reports every transition as an [`Outcome`].
//! *   **Scene**: [`SceneResolver`] turns a frame index into draw descriptors, reusing layers from
//!     a [`LayerPool`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use svga_core::{ArchiveReader, PlaybackConfig, PlaybackEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("rose.svga")?;
//! let movie = Arc::new(ArchiveReader::new().read(&bytes)?);
//!
//! let mut engine = PlaybackEngine::headless(PlaybackConfig::default());
//! engine.set_movie(Some(movie))?;
//! engine.tick();
//! for descriptor in engine.scene().drawable() {
//!     println!("{} alpha={}", descriptor.image_key, descriptor.alpha);
//! }
//! # Ok(())
//! # }
//! ```

/// Container detection, extraction and caching.
pub mod archive;
/// Frame clock seam.
pub mod clock;
/// Decoded movie model.
pub mod entity;
pub mod errors;
/// Placement of the movie canvas inside a surface.
pub mod fit;
/// Path command strings.
pub mod path;
pub mod player;
pub mod pool;
pub mod scene;

pub use archive::{ArchiveFormat, ArchiveReader};
pub use clock::{FrameClock, ManualClock};
pub use entity::{
    AudioEntity, Bitmap, Color, DashPattern, FrameEntity, LineCap, LineJoin, MovieEntity,
    ShapeEntity, ShapeKind, ShapeStyle, SpriteEntity, SpriteKind,
};
pub use errors::{DecodeError, SceneError};
pub use fit::{fit_transform, ContentMode};
pub use path::{parse_path, PathParser};
pub use player::{FillMode, Outcome, PlaybackConfig, PlaybackEngine, PlaybackState, PlayerEvent};
pub use pool::LayerPool;
pub use scene::{resolve_scene, DrawDescriptor, DynamicOverrides, ResolvedShape, Scene, SceneResolver};
