//! Playback state machine.
//!
//! A [`PlaybackEngine`] owns everything mutable about one playing instance: frame index, loop
//! counter, state, dynamic overrides and the resolved layers. The movie itself is shared and
//! read-only. Every operation returns an [`Outcome`] listing the notifications it produced, in
//! order, instead of firing callbacks.

use crate::clock::{FrameClock, ManualClock};
use crate::entity::{Bitmap, MovieEntity};
use crate::errors::SceneError;
use crate::scene::{DynamicOverrides, Scene, SceneResolver};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

/// What stays on screen once the loop limit is reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// Keep the last frame.
    #[default]
    Forward,
    /// Return to frame 0.
    Backward,
    /// Draw nothing.
    Clear,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub fill_mode: FillMode,
    /// Number of loops before playback finishes. `0` loops forever.
    pub total_loop: usize,
    /// Start when the surface becomes attached and stop when it is detached.
    pub auto_play: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fill_mode: FillMode::Forward,
            total_loop: 0,
            auto_play: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// A movie was attached and its first frame resolved.
    Loaded { frames: usize },
    /// The movie was detached.
    Unloaded,
    /// The scene was resolved for a new frame.
    Updated { index: usize, loop_count: usize },
    AnimatingChanged { playing: bool },
    /// The loop limit was reached. Emitted after the fill mode has been applied.
    Finished { loop_count: usize },
}

/// Result of one engine operation.
///
/// `applied` is `false` when the request was silently ignored (already playing, surface
/// detached, index out of range, ...). `events` can be non-empty even then, e.g. a tick
/// without a movie still reports that playback stopped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub applied: bool,
    pub events: Vec<PlayerEvent>,
}

impl Outcome {
    fn new(applied: bool, events: Vec<PlayerEvent>) -> Self {
        Self { applied, events }
    }

    fn ignored() -> Self {
        Self::default()
    }
}

pub struct PlaybackEngine {
    config: PlaybackConfig,
    clock: Box<dyn FrameClock>,
    movie: Option<Arc<MovieEntity>>,
    resolver: SceneResolver,
    overrides: DynamicOverrides,
    state: PlaybackState,
    current_index: usize,
    loop_count: usize,
    total_frames: usize,
    surface_attached: bool,
    scene_hidden: bool,
}

impl PlaybackEngine {
    /// New engine with no movie. The surface starts out attached.
    pub fn new(config: PlaybackConfig, clock: Box<dyn FrameClock>) -> Self {
        Self {
            config,
            clock,
            movie: None,
            resolver: SceneResolver::new(),
            overrides: DynamicOverrides::default(),
            state: PlaybackState::Stopped,
            current_index: 0,
            loop_count: 0,
            total_frames: 0,
            surface_attached: true,
            scene_hidden: true,
        }
    }

    /// Engine driven by explicit `tick()` calls.
    pub fn headless(config: PlaybackConfig) -> Self {
        Self::new(config, Box::new(ManualClock::new()))
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn set_fill_mode(&mut self, fill_mode: FillMode) {
        self.config.fill_mode = fill_mode;
    }

    pub fn set_total_loop(&mut self, total_loop: usize) {
        self.config.total_loop = total_loop;
    }

    pub fn set_auto_play(&mut self, auto_play: bool) {
        self.config.auto_play = auto_play;
    }

    pub fn movie(&self) -> Option<&Arc<MovieEntity>> {
        self.movie.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn loop_count(&self) -> usize {
        self.loop_count
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn is_surface_attached(&self) -> bool {
        self.surface_attached
    }

    pub fn overrides(&self) -> &DynamicOverrides {
        &self.overrides
    }

    /// The resolved scene of the current frame. Empty when there is no movie or the scene was
    /// cleared by [`FillMode::Clear`].
    pub fn scene(&self) -> Scene {
        if self.scene_hidden || self.movie.is_none() {
            return Scene {
                index: self.current_index,
                descriptors: Vec::new(),
            };
        }
        self.resolver.snapshot(self.current_index)
    }

    /// Replaces the movie and resets all playback state.
    ///
    /// With a movie, the first frame is resolved immediately and playback starts at frame 0
    /// unless the surface is detached. Fails when the movie's matte layers are out of order; the
    /// engine is then left untouched.
    pub fn set_movie(&mut self, movie: Option<Arc<MovieEntity>>) -> Result<Outcome, SceneError> {
        if let Some(movie) = &movie {
            SceneResolver::validate(movie)?;
        }
        let mut events = Vec::new();
        self.stop_inner(&mut events);
        self.resolver.reset();
        self.movie = None;
        self.current_index = 0;
        self.loop_count = 0;
        self.total_frames = 0;
        self.scene_hidden = true;

        let Some(movie) = movie else {
            events.push(PlayerEvent::Unloaded);
            return Ok(Outcome::new(true, events));
        };

        self.resolver.prepare(&movie)?;
        self.total_frames = movie.frames;
        self.scene_hidden = false;
        self.clock.set_preferred_fps(movie.fps);
        self.movie = Some(movie);

        self.update(&mut events);
        self.start_inner(0, &mut events);
        events.push(PlayerEvent::Loaded {
            frames: self.total_frames,
        });
        debug!(frames = self.total_frames, playing = self.is_playing(), "movie attached");
        Ok(Outcome::new(true, events))
    }

    /// Reports whether the presentation surface is attached (visible).
    ///
    /// With auto-play enabled, attaching starts playback from frame 0 and detaching stops it.
    pub fn set_surface_attached(&mut self, attached: bool) -> Outcome {
        self.surface_attached = attached;
        if !self.config.auto_play {
            return Outcome::ignored();
        }
        let mut events = Vec::new();
        let applied = if attached {
            self.start_inner(0, &mut events)
        } else {
            self.stop_inner(&mut events)
        };
        Outcome::new(applied, events)
    }

    pub fn start(&mut self) -> Outcome {
        self.start_at(0)
    }

    /// Starts playing from `index`.
    ///
    /// Ignored when already playing, when the surface is detached, or when `index` is past
    /// the last frame.
    pub fn start_at(&mut self, index: usize) -> Outcome {
        let mut events = Vec::new();
        let applied = self.start_inner(index, &mut events);
        Outcome::new(applied, events)
    }

    pub fn stop(&mut self) -> Outcome {
        let mut events = Vec::new();
        let applied = self.stop_inner(&mut events);
        Outcome::new(applied, events)
    }

    /// Advances one frame. Called by the clock owner each time the clock fires.
    pub fn tick(&mut self) -> Outcome {
        let mut events = Vec::new();
        if self.movie.is_none() {
            self.stop_inner(&mut events);
            return Outcome::new(false, events);
        }
        if !self.is_playing() {
            return Outcome::ignored();
        }

        let next = self.current_index + 1;
        if next >= self.total_frames {
            self.loop_count += 1;
            if self.config.total_loop > 0 && self.loop_count >= self.config.total_loop {
                self.stop_inner(&mut events);
                self.finish(&mut events);
                return Outcome::new(true, events);
            }
        }

        self.current_index = next % self.total_frames;
        self.update(&mut events);
        Outcome::new(true, events)
    }

    /// Jumps to `index` and resolves it, optionally starting playback from there.
    ///
    /// Ignored when `index` is out of range or already current.
    pub fn seek(&mut self, index: usize, play: bool) -> Outcome {
        let mut events = Vec::new();
        let applied = self.seek_inner(index, play, &mut events);
        Outcome::new(applied, events)
    }

    /// Replaces the bitmap of every sprite using `key`; `None` restores the archive's bitmap.
    pub fn set_dynamic_image(&mut self, key: impl Into<String>, image: Option<Arc<Bitmap>>) {
        self.overrides.set_image(key, image);
        self.refresh();
    }

    pub fn set_dynamic_hidden(&mut self, key: impl Into<String>, hidden: bool) {
        self.overrides.set_hidden(key, hidden);
        self.refresh();
    }

    pub fn clear_dynamic(&mut self) {
        self.overrides.clear();
        self.refresh();
    }

    fn set_state(&mut self, state: PlaybackState, events: &mut Vec<PlayerEvent>) {
        if self.state != state {
            self.state = state;
            events.push(PlayerEvent::AnimatingChanged {
                playing: state == PlaybackState::Playing,
            });
        }
    }

    fn start_inner(&mut self, index: usize, events: &mut Vec<PlayerEvent>) -> bool {
        if self.is_playing() || !self.surface_attached || index >= self.total_frames {
            return false;
        }
        let needs_update = self.scene_hidden || self.current_index != index;
        self.scene_hidden = false;
        self.set_state(PlaybackState::Playing, events);
        self.current_index = index;
        self.loop_count = 0;
        if needs_update {
            self.update(events);
        }
        self.clock.resume();
        true
    }

    fn stop_inner(&mut self, events: &mut Vec<PlayerEvent>) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.set_state(PlaybackState::Stopped, events);
        self.clock.pause();
        true
    }

    fn seek_inner(&mut self, index: usize, play: bool, events: &mut Vec<PlayerEvent>) -> bool {
        if index >= self.total_frames || index == self.current_index {
            return false;
        }
        self.scene_hidden = false;
        self.current_index = index;
        self.update(events);
        if play && !self.is_playing() {
            self.start_inner(index, events);
        }
        true
    }

    fn finish(&mut self, events: &mut Vec<PlayerEvent>) {
        match self.config.fill_mode {
            FillMode::Forward => {}
            FillMode::Backward => {
                self.seek_inner(0, false, events);
            }
            FillMode::Clear => self.scene_hidden = true,
        }
        debug!(loop_count = self.loop_count, fill_mode = ?self.config.fill_mode, "playback finished");
        events.push(PlayerEvent::Finished {
            loop_count: self.loop_count,
        });
    }

    fn update(&mut self, events: &mut Vec<PlayerEvent>) {
        self.refresh();
        events.push(PlayerEvent::Updated {
            index: self.current_index,
            loop_count: self.loop_count,
        });
    }

    /// Re-resolves the current frame without notifying.
    fn refresh(&mut self) {
        if let Some(movie) = self.movie.as_ref() {
            self.resolver.step(movie, self.current_index, &self.overrides);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: PlaybackConfig =
            serde_json::from_str(r#"{ "fill_mode": "backward", "total_loop": 3 }"#).unwrap();
        assert_eq!(config.fill_mode, FillMode::Backward);
        assert_eq!(config.total_loop, 3);
        assert!(config.auto_play);
    }

    #[test]
    fn test_empty_engine_ignores_everything() {
        let mut engine = PlaybackEngine::headless(PlaybackConfig::default());
        assert!(!engine.start().applied);
        assert!(!engine.tick().applied);
        assert!(!engine.seek(0, true).applied);
        assert!(!engine.stop().applied);
        assert!(engine.scene().is_empty());
        assert_eq!(engine.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_detaching_clears_movie() {
        let mut engine = PlaybackEngine::headless(PlaybackConfig::default());
        let outcome = engine.set_movie(None).unwrap();
        assert_eq!(outcome.events, vec![PlayerEvent::Unloaded]);
        assert_eq!(engine.total_frames(), 0);
    }
}
