//! Background archive loading.
//!
//! Fetching and decoding never run on the playback timeline. Each request gets its own worker
//! thread and a [`LoadTicket`]; completions travel back over a channel and are only accepted when
//! they match the most recent request, so a slow load can never replace a newer one.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use svga_core::{ArchiveReader, DecodeError, MovieEntity, SceneError, SceneResolver};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Load was cancelled")]
    Cancelled,
    #[error("Failed to fetch archive")]
    Fetch(#[source] anyhow::Error),
    #[error("Failed to decode archive")]
    Decode(#[from] DecodeError),
    #[error("Archive layers are inconsistent")]
    Scene(#[from] SceneError),
    #[error("Failed to spawn loader thread")]
    Spawn(#[source] std::io::Error),
}

/// Shared cancellation flag. Cancelling never interrupts work; it only marks the result as unwanted.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Produces archive bytes for a source string.
///
/// Implementations may check `cancel` to give up early.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, source: &str, cancel: &CancelToken) -> anyhow::Result<Vec<u8>>;

    /// Where the archive lives on disk, if anywhere. Lets the reader find sibling images.
    fn location(&self, _source: &str) -> Option<PathBuf> {
        None
    }
}

/// Treats sources as local file paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileFetcher;

impl Fetcher for FileFetcher {
    fn fetch(&self, source: &str, _cancel: &CancelToken) -> anyhow::Result<Vec<u8>> {
        Ok(std::fs::read(source)?)
    }

    fn location(&self, source: &str) -> Option<PathBuf> {
        Some(PathBuf::from(source))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    pub id: u64,
    pub source: String,
}

#[derive(Debug)]
pub struct LoadCompletion {
    pub ticket: LoadTicket,
    pub result: Result<Arc<MovieEntity>, LoadError>,
}

pub struct MovieLoader {
    fetcher: Arc<dyn Fetcher>,
    reader: ArchiveReader,
    next_id: u64,
    current: Option<(LoadTicket, CancelToken)>,
    done_tx: Sender<LoadCompletion>,
    done_rx: Receiver<LoadCompletion>,
}

impl MovieLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, reader: ArchiveReader) -> Self {
        let (done_tx, done_rx) = unbounded();
        Self {
            fetcher,
            reader,
            next_id: 0,
            current: None,
            done_tx,
            done_rx,
        }
    }

    /// Starts loading `source`, superseding any request still in flight.
    pub fn request(&mut self, source: impl Into<String>) -> LoadTicket {
        self.cancel();
        self.next_id += 1;
        let ticket = LoadTicket {
            id: self.next_id,
            source: source.into(),
        };
        let cancel = CancelToken::new();
        self.current = Some((ticket.clone(), cancel.clone()));

        let fetcher = Arc::clone(&self.fetcher);
        let reader = self.reader.clone();
        let done_tx = self.done_tx.clone();
        let job_ticket = ticket.clone();
        let spawned = thread::Builder::new()
            .name(format!("svga-load-{}", ticket.id))
            .spawn(move || {
                let result = load(fetcher.as_ref(), &reader, &job_ticket.source, &cancel);
                let _ = done_tx.send(LoadCompletion {
                    ticket: job_ticket,
                    result,
                });
            });
        if let Err(err) = spawned {
            let _ = self.done_tx.send(LoadCompletion {
                ticket: ticket.clone(),
                result: Err(LoadError::Spawn(err)),
            });
        }
        info!(id = ticket.id, source = %ticket.source, "load requested");
        ticket
    }

    /// Flags the in-flight request as cancelled. Its completion will be discarded.
    pub fn cancel(&mut self) -> Option<LoadTicket> {
        let (ticket, cancel) = self.current.take()?;
        cancel.cancel();
        debug!(id = ticket.id, "load cancelled");
        Some(ticket)
    }

    pub fn current(&self) -> Option<&LoadTicket> {
        self.current.as_ref().map(|(ticket, _)| ticket)
    }

    pub fn is_loading(&self) -> bool {
        self.current.is_some()
    }

    /// Returns the completion of the current request if it has arrived.
    pub fn poll(&mut self) -> Option<LoadCompletion> {
        while let Ok(done) = self.done_rx.try_recv() {
            if let Some(done) = self.accept(done) {
                return Some(done);
            }
        }
        None
    }

    /// Blocks up to `timeout` for the completion of the current request.
    pub fn wait(&mut self, timeout: Duration) -> Option<LoadCompletion> {
        let deadline = Instant::now() + timeout;
        while self.current.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.done_rx.recv_timeout(remaining) {
                Ok(done) => {
                    if let Some(done) = self.accept(done) {
                        return Some(done);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        None
    }

    fn accept(&mut self, done: LoadCompletion) -> Option<LoadCompletion> {
        let current = self.current.as_ref().map(|(ticket, _)| ticket.id);
        if current == Some(done.ticket.id) {
            self.current = None;
            Some(done)
        } else {
            debug!(id = done.ticket.id, "discarding superseded load");
            None
        }
    }
}

fn load(
    fetcher: &dyn Fetcher,
    reader: &ArchiveReader,
    source: &str,
    cancel: &CancelToken,
) -> Result<Arc<MovieEntity>, LoadError> {
    let bytes = fetcher.fetch(source, cancel).map_err(LoadError::Fetch)?;
    if cancel.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    let location = fetcher.location(source);
    let movie = reader.read_with_location(&bytes, location.as_deref())?;
    SceneResolver::validate(&movie)?;
    if cancel.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    Ok(Arc::new(movie))
}
