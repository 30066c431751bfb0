//! Real-time playback of pre-rendered frames.
//!
//! Each pass draws frames at a fixed origin and keeps wall-clock time: when
//! drawing falls behind the schedule whole frames are skipped, when it runs
//! more than [`DEAD_BAND`] seconds ahead the loop sleeps. Interrupts are
//! observed at the top of every draw and during sleeps.

use crate::converter::RenderedFrame;
use crate::terminal::{TerminalAdapter, TerminalSession};
use crate::Result;
use log::{debug, info, warn};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Tolerance in seconds within which no corrective sleep or skip happens
pub const DEAD_BAND: f64 = 0.1;

/// What the scheduler does after drawing a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pace {
    /// Behind schedule: advance this many frames without sleeping
    CatchUp(usize),
    /// Ahead of schedule: sleep, then advance one frame
    Sleep(Duration),
    /// Within the dead-band: advance one frame
    Continue,
}

impl Pace {
    pub fn frames_to_advance(&self) -> usize {
        match self {
            Pace::CatchUp(frames) => *frames,
            Pace::Sleep(_) | Pace::Continue => 1,
        }
    }
}

/// Decide how to continue after drawing `frame_index` at `elapsed` seconds
pub fn pace(elapsed: f64, frame_index: usize, fps: f64) -> Pace {
    let target = frame_index as f64 / fps;
    let offset = elapsed - target;

    if offset > 0.0 {
        Pace::CatchUp((offset * fps).floor() as usize + 1)
    } else if offset < -DEAD_BAND {
        Pace::Sleep(Duration::from_secs_f64(-offset - DEAD_BAND))
    } else {
        Pace::Continue
    }
}

/// Monotonic time source used for pacing
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Time since an arbitrary fixed epoch
    fn now(&self) -> Duration;

    async fn sleep(&mut self, duration: Duration);
}

/// Wall clock backed by tokio's monotonic instant
pub struct MonotonicClock {
    epoch: tokio::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: tokio::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    async fn sleep(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Default)]
struct CancelInner {
    flag: AtomicBool,
    notify: Notify,
}

/// Shared interrupt flag that can also be awaited
#[derive(Clone, Default)]
pub struct Cancellation {
    inner: Arc<CancelInner>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Resolve once [`Cancellation::cancel`] has been called
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Cancel when the process receives Ctrl+C
    pub fn listen_for_ctrl_c(&self) -> JoinHandle<()> {
        let cancel = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    debug!("Interrupt received");
                    cancel.cancel();
                }
                Err(e) => warn!("Unable to listen for interrupts: {}", e),
            }
        })
    }
}

/// Playback configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    pub fps: f64,
    pub loop_playback: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            loop_playback: false,
        }
    }
}

/// How a playback run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed {
        frames_drawn: usize,
        frames_skipped: usize,
    },
    /// The terminal has been reset and the cursor parked below the frame
    Interrupted { frames_drawn: usize },
}

/// Per-pass scheduler state
#[derive(Debug, Clone)]
struct PlaybackState {
    frame_index: usize,
    start: Duration,
    /// `(row, col)` where every frame is drawn
    origin: (u16, u16),
    /// Line count of the first frame
    frame_height: usize,
    /// Lines drawn for the most recent frame
    actual_height: usize,
    /// Last successfully queried terminal height
    terminal_lines: Option<u16>,
}

impl PlaybackState {
    /// Cut `frame` down to what fits below the origin when the terminal has
    /// no spare row for the frame's trailing line break
    fn fit<'f>(&mut self, frame: &'f RenderedFrame, lines: Option<u16>) -> Cow<'f, str> {
        if lines.is_some() {
            self.terminal_lines = lines;
        }

        match self.terminal_lines {
            Some(lines) if usize::from(lines) <= self.frame_height => {
                self.actual_height =
                    (usize::from(lines) + 1).saturating_sub(usize::from(self.origin.0));
                Cow::Owned(frame.head(self.actual_height))
            }
            _ => {
                self.actual_height = self.frame_height;
                Cow::Borrowed(frame.as_str())
            }
        }
    }

    /// Row just below the last drawn frame
    fn resume_row(&self) -> u16 {
        let height = u16::try_from(self.actual_height).unwrap_or(u16::MAX);
        self.origin.0.saturating_add(height)
    }
}

/// Drives playback of rendered frames on a terminal
pub struct Player<T: TerminalAdapter, C: Clock> {
    terminal: T,
    clock: C,
    cancel: Cancellation,
    config: PlaybackConfig,
}

impl<T: TerminalAdapter, C: Clock> Player<T, C> {
    pub fn new(terminal: T, clock: C, cancel: Cancellation, config: PlaybackConfig) -> Self {
        Self {
            terminal,
            clock,
            cancel,
            config,
        }
    }

    /// Play the frames once, or repeatedly when looping, until done or interrupted
    pub async fn play(&mut self, frames: &[RenderedFrame]) -> Result<PlaybackOutcome> {
        let mut passes = 0u64;
        loop {
            let outcome = self.play_pass(frames).await?;
            passes += 1;
            match outcome {
                PlaybackOutcome::Completed {
                    frames_drawn,
                    frames_skipped,
                } => {
                    debug!(
                        "Pass {} finished: {} drawn, {} skipped",
                        passes, frames_drawn, frames_skipped
                    );
                    if !self.config.loop_playback || frames.is_empty() {
                        return Ok(outcome);
                    }
                }
                PlaybackOutcome::Interrupted { .. } => return Ok(outcome),
            }
        }
    }

    /// One pass over `frames` with fresh playback state
    pub async fn play_pass(&mut self, frames: &[RenderedFrame]) -> Result<PlaybackOutcome> {
        let Some(first) = frames.first() else {
            return Ok(PlaybackOutcome::Completed {
                frames_drawn: 0,
                frames_skipped: 0,
            });
        };

        let fps = self.config.fps;
        let mut session = TerminalSession::begin(&mut self.terminal)?;
        let origin = session.get_cursor_position().unwrap_or_else(|e| {
            warn!("Unable to read cursor position, drawing at the top left: {}", e);
            (1, 1)
        });
        let frame_height = first.line_count();
        let mut state = PlaybackState {
            frame_index: 0,
            start: self.clock.now(),
            origin,
            frame_height,
            actual_height: frame_height,
            terminal_lines: None,
        };
        debug!(
            "Starting pass: {} frames of {} lines at {:?}, {} FPS",
            frames.len(),
            frame_height,
            origin,
            fps
        );

        let mut frames_drawn = 0;
        let mut frames_skipped = 0;
        loop {
            if self.cancel.is_cancelled() {
                interrupt(&mut session, &state);
                return Ok(PlaybackOutcome::Interrupted { frames_drawn });
            }
            if state.frame_index >= frames.len() {
                break;
            }

            let lines = match session.get_terminal_size() {
                Ok((lines, _)) => Some(lines),
                Err(e) => {
                    debug!("Terminal size unavailable, keeping last known: {}", e);
                    None
                }
            };
            let text = state.fit(&frames[state.frame_index], lines);
            session.set_cursor_position(origin.0, origin.1)?;
            session.write_and_flush(&text)?;
            frames_drawn += 1;

            let elapsed = self.clock.now().saturating_sub(state.start).as_secs_f64();
            let decision = pace(elapsed, state.frame_index, fps);
            match decision {
                Pace::CatchUp(frames_behind) => {
                    let remaining = frames.len() - state.frame_index;
                    frames_skipped += frames_behind.min(remaining) - 1;
                    debug!(
                        "Frame {} is {:.3}s late, skipping {}",
                        state.frame_index,
                        elapsed - state.frame_index as f64 / fps,
                        frames_behind - 1
                    );
                }
                Pace::Sleep(duration) => {
                    tokio::select! {
                        _ = self.clock.sleep(duration) => {}
                        _ = self.cancel.cancelled() => {}
                    }
                }
                Pace::Continue => {}
            }
            state.frame_index += decision.frames_to_advance();
        }

        session.release()?;
        Ok(PlaybackOutcome::Completed {
            frames_drawn,
            frames_skipped,
        })
    }
}

/// Reset the terminal and park the cursor one line below the frame
fn interrupt<T: TerminalAdapter + ?Sized>(session: &mut TerminalSession<'_, T>, state: &PlaybackState) {
    if let Err(e) = session.release() {
        warn!("Failed to reset terminal modes: {}", e);
    }
    let row = state.resume_row();
    if let Err(e) = session.set_cursor_position(row, state.origin.1) {
        warn!("Failed to move cursor below the frame: {}", e);
    }
    info!("Playback interrupted");
}
