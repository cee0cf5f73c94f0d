use crate::clock::{ThreadClock, Tick};
use crate::loader::{Fetcher, LoadCompletion, LoadError, LoadTicket, MovieLoader};
use crossbeam_channel::{never, Receiver};
use std::sync::Arc;
use std::time::Duration;
use svga_core::{
    ArchiveReader, Bitmap, FrameClock, MovieEntity, Outcome, PlaybackConfig, PlaybackEngine,
    PlayerEvent, Scene,
};
use tracing::{debug, warn};

/// A playing instance with loading and clocking wired in.
///
/// The player is the only writer of its [`PlaybackEngine`]. Completed loads, clock ticks and
/// host calls are all applied from the thread that calls [`Player::pump`], one after the other.
pub struct Player {
    engine: PlaybackEngine,
    loader: MovieLoader,
    ticks: Receiver<Tick>,
    last_error: Option<LoadError>,
}

impl Player {
    /// Player driven by a [`ThreadClock`].
    pub fn new(config: PlaybackConfig, fetcher: Arc<dyn Fetcher>, reader: ArchiveReader) -> Self {
        let (clock, ticks) = ThreadClock::spawn();
        Self::with_clock(config, Box::new(clock), ticks, MovieLoader::new(fetcher, reader))
    }

    /// Player fed by an arbitrary clock. `ticks` yields one item per frame the clock fires.
    pub fn with_clock(
        config: PlaybackConfig,
        clock: Box<dyn FrameClock>,
        ticks: Receiver<Tick>,
        loader: MovieLoader,
    ) -> Self {
        Self {
            engine: PlaybackEngine::new(config, clock),
            loader,
            ticks,
            last_error: None,
        }
    }

    /// Player without a clock; call [`Player::tick`] to advance.
    pub fn manual(config: PlaybackConfig, loader: MovieLoader) -> Self {
        Self::with_clock(config, Box::new(svga_core::ManualClock::new()), never(), loader)
    }

    /// Requests `source`. The current movie keeps playing until the load completes.
    pub fn load(&mut self, source: impl Into<String>) -> LoadTicket {
        self.loader.request(source)
    }

    pub fn cancel_loading(&mut self) -> Option<LoadTicket> {
        self.loader.cancel()
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    /// Applies a completed load, then every pending tick, and returns what happened in order.
    pub fn pump(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        if let Some(done) = self.loader.poll() {
            self.complete(done, &mut events);
        }
        while self.ticks.try_recv().is_ok() {
            events.extend(self.engine.tick().events);
        }
        events
    }

    /// Blocks up to `timeout` for the current load, applies it, then pumps.
    pub fn wait_for_load(&mut self, timeout: Duration) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        if let Some(done) = self.loader.wait(timeout) {
            self.complete(done, &mut events);
        }
        events.extend(self.pump());
        events
    }

    /// Replaces the movie directly, bypassing the loader.
    pub fn set_movie(&mut self, movie: Option<Arc<MovieEntity>>) -> Result<Outcome, LoadError> {
        self.loader.cancel();
        Ok(self.engine.set_movie(movie)?)
    }

    pub fn tick(&mut self) -> Outcome {
        self.engine.tick()
    }

    pub fn start(&mut self) -> Outcome {
        self.engine.start()
    }

    pub fn start_at(&mut self, index: usize) -> Outcome {
        self.engine.start_at(index)
    }

    pub fn stop(&mut self) -> Outcome {
        self.engine.stop()
    }

    pub fn seek(&mut self, index: usize, play: bool) -> Outcome {
        self.engine.seek(index, play)
    }

    pub fn set_surface_attached(&mut self, attached: bool) -> Outcome {
        self.engine.set_surface_attached(attached)
    }

    pub fn set_dynamic_image(&mut self, key: impl Into<String>, image: Option<Arc<Bitmap>>) {
        self.engine.set_dynamic_image(key, image);
    }

    pub fn set_dynamic_hidden(&mut self, key: impl Into<String>, hidden: bool) {
        self.engine.set_dynamic_hidden(key, hidden);
    }

    pub fn clear_dynamic(&mut self) {
        self.engine.clear_dynamic();
    }

    pub fn scene(&self) -> Scene {
        self.engine.scene()
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.engine
    }

    /// The failure of the most recent load, cleared by the next successful one.
    pub fn last_error(&self) -> Option<&LoadError> {
        self.last_error.as_ref()
    }

    fn complete(&mut self, done: LoadCompletion, events: &mut Vec<PlayerEvent>) {
        let LoadCompletion { ticket, result } = done;
        let movie = match result {
            Ok(movie) => movie,
            Err(LoadError::Cancelled) => {
                debug!(id = ticket.id, "cancelled load completed");
                return;
            }
            Err(err) => {
                warn!(id = ticket.id, source = %ticket.source, error = %err, "load failed");
                self.last_error = Some(err);
                return;
            }
        };
        match self.engine.set_movie(Some(movie)) {
            Ok(outcome) => {
                self.last_error = None;
                events.extend(outcome.events);
            }
            Err(err) => {
                warn!(id = ticket.id, source = %ticket.source, error = %err, "movie rejected");
                self.last_error = Some(err.into());
            }
        }
    }
}
