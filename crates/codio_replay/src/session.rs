//! Playback session: play, pause, resume and seek a loaded recording.

use crate::player::{Player, PlayerError, PlayerResult, PlayerState};
use crate::progress::ProgressTimer;
use crate::surface::DocumentSurface;
use codio_core::{EpochMs, RelativeMs};
use codio_log::{Cursor, Event};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::{debug, info};

/// Drives a [`Player`] and its progress timer.
///
/// A [`Cursor`] tracks the relative time reached so far: pausing moves it
/// forward by the time spent playing, resuming continues from there.
#[derive(Debug)]
pub struct PlaybackSession<S: DocumentSurface + 'static> {
    player: Player<S>,
    progress: ProgressTimer,
    cursor: Cursor,
    run_started: Option<EpochMs>,
    finished: Arc<AtomicBool>,
    finish_signal: Arc<Notify>,
    closed: bool,
}

impl<S: DocumentSurface + 'static> PlaybackSession<S> {
    /// Wrap a loaded player
    ///
    /// # Errors
    ///
    /// Returns error if the player holds no recording or was destroyed
    pub fn new(player: Player<S>) -> PlayerResult<Self> {
        match player.state() {
            PlayerState::Idle => return Err(PlayerError::NotLoaded),
            PlayerState::Destroyed => return Err(PlayerError::Destroyed),
            _ => {}
        }

        let progress = ProgressTimer::new(player.duration());
        let cursor = Cursor::new(player.duration());
        let finished = Arc::new(AtomicBool::new(false));
        let finish_signal = Arc::new(Notify::new());
        {
            let finished = Arc::clone(&finished);
            let finish_signal = Arc::clone(&finish_signal);
            progress.on_finish(move || {
                finished.store(true, Ordering::SeqCst);
                finish_signal.notify_one();
            });
        }

        Ok(Self {
            player,
            progress,
            cursor,
            run_started: None,
            finished,
            finish_signal,
            closed: false,
        })
    }

    /// Register a progress observer receiving `(current_second, total_seconds)`
    pub fn on_progress(&self, observer: impl Fn(u64, u64) + Send + Sync + 'static) {
        self.progress.on_update(observer);
    }

    /// Show the initial frame and play the whole recording
    ///
    /// # Errors
    ///
    /// Returns error if the session is closed
    pub fn start(&mut self) -> PlayerResult<()> {
        self.ensure_open()?;
        self.player.move_to_frame(RelativeMs::zero());
        self.cursor.reset();
        let events = self.player.events().to_vec();
        self.run(&events, RelativeMs::zero());
        info!(length = %self.player.duration(), "playback started");
        Ok(())
    }

    /// Show the frame at `t` and play the rest of the recording from there
    ///
    /// # Errors
    ///
    /// Returns error if the session is closed
    pub fn play_from(&mut self, t: RelativeMs) -> PlayerResult<()> {
        self.ensure_open()?;
        if self.is_playing() {
            self.pause_media();
        }
        let outcome = self.player.move_to_frame(t);
        self.cursor.seek(outcome.at);
        let remaining = self.player.get_timeline(outcome.at);
        self.run(&remaining, outcome.at);
        debug!(from = %outcome.at, events = remaining.len(), "playing from offset");
        Ok(())
    }

    /// Pause, keeping the position reached
    pub fn pause(&mut self) {
        let Some(started) = self.run_started else {
            return;
        };
        let now = self.player.now();
        self.pause_media();
        self.cursor.move_forward(now.since(started));
        debug!(at = %self.cursor.pos(), "playback paused");
    }

    /// Continue from where playback was paused
    ///
    /// # Errors
    ///
    /// Returns error if the session is closed
    pub fn resume(&mut self) -> PlayerResult<()> {
        self.play_from(self.cursor.pos())
    }

    /// Jump back by `by` and keep playing
    ///
    /// # Errors
    ///
    /// Returns error if the session is closed
    pub fn rewind(&mut self, by: RelativeMs) -> PlayerResult<()> {
        self.ensure_open()?;
        self.pause();
        self.cursor.move_backward(by);
        self.play_from(self.cursor.pos())
    }

    /// Jump forward by `by` and keep playing
    ///
    /// # Errors
    ///
    /// Returns error if the session is closed
    pub fn forward(&mut self, by: RelativeMs) -> PlayerResult<()> {
        self.ensure_open()?;
        self.pause();
        self.cursor.move_forward(by);
        self.play_from(self.cursor.pos())
    }

    /// Pause and close the session
    pub fn stop(&mut self) {
        self.pause();
        self.progress.stop();
        self.closed = true;
        info!(at = %self.cursor.pos(), "playback stopped");
    }

    /// Current relative position
    #[must_use]
    pub fn position(&self) -> RelativeMs {
        match self.run_started {
            Some(started) => {
                let mut cursor = self.cursor;
                cursor.move_forward(self.player.now().since(started));
                cursor.pos()
            }
            None => self.cursor.pos(),
        }
    }

    /// Whether playback is running
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.run_started.is_some()
    }

    /// Whether the progress timer ran past the end of the recording
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Whether [`PlaybackSession::stop`] was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Wait until the progress timer reports the end of the recording
    pub async fn finished(&self) {
        if self.is_finished() {
            return;
        }
        self.finish_signal.notified().await;
    }

    /// The driven player
    #[must_use]
    pub fn player(&self) -> &Player<S> {
        &self.player
    }

    fn run(&mut self, events: &[Event], from: RelativeMs) {
        let now = self.player.now();
        self.finished.store(false, Ordering::SeqCst);
        self.player.play(events, now);
        self.progress.run(from.as_secs());
        self.run_started = Some(now);
    }

    fn pause_media(&mut self) {
        self.player.pause();
        self.progress.stop();
        self.run_started = None;
    }

    fn ensure_open(&self) -> PlayerResult<()> {
        if self.closed {
            Err(PlayerError::SessionClosed)
        } else {
            Ok(())
        }
    }
}
