use crossbeam_channel::{bounded, never, select, tick, unbounded, Receiver, Sender, TrySendError};
use std::thread;
use std::time::{Duration, Instant};
use svga_core::FrameClock;
use tracing::debug;

/// Commands sent to the clock thread.
enum ClockCommand {
    SetFps(u32),
    Resume,
    Pause,
    Shutdown,
}

/// One firing of a [`ThreadClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Monotonic counter, starting at 1.
    pub seq: u64,
}

/// Frame clock backed by a dedicated thread.
///
/// While resumed it emits a [`Tick`] at the preferred rate on the receiver returned by
/// [`ThreadClock::spawn`]. Ticks are dropped, not queued, when the consumer falls behind.
pub struct ThreadClock {
    cmd_tx: Sender<ClockCommand>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ThreadClock {
    pub fn spawn() -> (Self, Receiver<Tick>) {
        let (cmd_tx, cmd_rx) = unbounded();
        let (tick_tx, tick_rx) = bounded(2);
        let handle = thread::spawn(move || run(cmd_rx, tick_tx));
        (
            Self {
                cmd_tx,
                handle: Some(handle),
            },
            tick_rx,
        )
    }

    fn send(&self, cmd: ClockCommand) {
        let _ = self.cmd_tx.send(cmd);
    }
}

impl FrameClock for ThreadClock {
    fn set_preferred_fps(&mut self, fps: u32) {
        self.send(ClockCommand::SetFps(fps));
    }

    fn resume(&mut self) {
        self.send(ClockCommand::Resume);
    }

    fn pause(&mut self) {
        self.send(ClockCommand::Pause);
    }
}

impl Drop for ThreadClock {
    fn drop(&mut self) {
        self.send(ClockCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn period(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

fn run(cmd_rx: Receiver<ClockCommand>, tick_tx: Sender<Tick>) {
    let mut fps = 60;
    let mut running = false;
    let mut ticker: Receiver<Instant> = never();
    let mut seq = 0;

    loop {
        // `None` means the ticker fired.
        let cmd = select! {
            recv(cmd_rx) -> cmd => Some(cmd),
            recv(ticker) -> _ => None,
        };
        match cmd {
            None => {
                seq += 1;
                match tick_tx.try_send(Tick { seq }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => debug!(seq, "consumer behind, dropping tick"),
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            Some(Ok(ClockCommand::SetFps(next))) => {
                fps = next;
                if running {
                    ticker = tick(period(fps));
                }
            }
            Some(Ok(ClockCommand::Resume)) => {
                if !running {
                    running = true;
                    ticker = tick(period(fps));
                }
            }
            Some(Ok(ClockCommand::Pause)) => {
                running = false;
                ticker = never();
            }
            Some(Ok(ClockCommand::Shutdown)) | Some(Err(_)) => break,
        }
    }
}
