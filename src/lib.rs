//! # SVGA Player
//!
//! Decoder and frame-accurate playback for SVGA vector animation archives.
//!
//! This crate re-exports [`svga_core`] and adds the collaborators the core only describes at its
//! boundary:
//!
//! *   **Loading**: [`MovieLoader`] fetches and decodes on worker threads. Newer requests
//!     supersede older ones.
//! *   **Clocking**: [`ThreadClock`] emits frame ticks at the movie's frame rate.
//! *   **Player**: [`Player`] applies loads and ticks to one [`PlaybackEngine`] in order.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use svga_player::{ArchiveReader, FileFetcher, PlaybackConfig, Player};
//!
//! let mut player = Player::new(
//!     PlaybackConfig::default(),
//!     Arc::new(FileFetcher),
//!     ArchiveReader::new(),
//! );
//! player.load("angel.svga");
//! player.wait_for_load(Duration::from_secs(5));
//!
//! loop {
//!     for event in player.pump() {
//!         println!("{event:?}");
//!     }
//!     let scene = player.scene();
//!     // hand `scene.drawable()` to a renderer
//! #   let _ = scene;
//! #   break;
//! }
//! ```

pub mod clock;
pub mod loader;
pub mod player;

pub use clock::{ThreadClock, Tick};
pub use loader::{CancelToken, Fetcher, FileFetcher, LoadCompletion, LoadError, LoadTicket, MovieLoader};
pub use player::Player;

pub use svga_core;
pub use svga_core::{
    fit_transform, parse_path, resolve_scene, ArchiveFormat, ArchiveReader, Bitmap, ContentMode,
    DecodeError, DrawDescriptor, DynamicOverrides, FillMode, FrameClock, ManualClock, MovieEntity,
    Outcome, PlaybackConfig, PlaybackEngine, PlaybackState, PlayerEvent, Scene, SceneError,
    SpriteKind,
};
