//! Recording session: lifecycle, pause accounting, and saving to disk.

use crate::host::{EditorHost, RecordError, RecordResult};
use crate::recorder::Recorder;
use chrono::{DateTime, Utc};
use codio_core::{Clock, EpochMs, FORMAT_VERSION, RelativeMs};
use codio_log::{METADATA_FILE, Metadata, PersistedTimeline, TIMELINE_FILE};
use codio_replay::ProgressTimer;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Recording configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Delay between starting and the recording origin, in milliseconds
    pub start_latency_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self { start_latency_ms: 300 }
    }
}

/// Recording lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordingState {
    /// Not started, or cancelled
    Idle,
    /// Capturing events
    Recording,
    /// Started but not capturing
    Paused,
    /// Finished; ready to save
    Stopped,
}

/// One recording from start to save
pub struct RecordingSession {
    name: String,
    config: RecorderConfig,
    clock: Arc<dyn Clock>,
    recorder: Recorder,
    progress: ProgressTimer,
    state: RecordingState,
    recording_start: EpochMs,
    recorded_at: Option<DateTime<Utc>>,
    length: RelativeMs,
}

impl RecordingSession {
    /// Create an idle session
    #[must_use]
    pub fn new(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            config: RecorderConfig::default(),
            recorder: Recorder::new(Arc::clone(&clock)),
            clock,
            progress: ProgressTimer::unbounded(),
            state: RecordingState::Idle,
            recording_start: EpochMs(0),
            recorded_at: None,
            length: RelativeMs::zero(),
        }
    }

    /// Create with custom config
    #[must_use]
    pub fn with_config(mut self, config: RecorderConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a progress observer receiving `(elapsed_seconds, 0)`
    pub fn on_progress(&self, observer: impl Fn(u64, u64) + Send + Sync + 'static) {
        self.progress.on_update(observer);
    }

    /// Start capturing.
    ///
    /// The recording origin is placed `start_latency_ms` after now. A stopped
    /// session starts over with an empty recording. Must be called from
    /// within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if a recording is running or the host refuses a channel
    pub fn start(&mut self, host: &mut dyn EditorHost) -> RecordResult<()> {
        if matches!(self.state, RecordingState::Recording | RecordingState::Paused) {
            return Err(RecordError::AlreadyRecording);
        }
        let mut recorder = Recorder::new(Arc::clone(&self.clock));
        recorder.start_recording(host)?;
        self.recorder = recorder;
        self.length = RelativeMs::zero();
        self.recording_start = self
            .clock
            .now()
            .offset_by(RelativeMs(self.config.start_latency_ms));
        self.recorded_at = Some(Utc::now());
        self.progress.run(0);
        self.state = RecordingState::Recording;
        info!(name = %self.name, origin = %self.recording_start, "recording session started");
        Ok(())
    }

    /// Stop capturing without ending the recording
    pub fn pause(&mut self, host: &mut dyn EditorHost) {
        if self.state != RecordingState::Recording {
            return;
        }
        self.recorder.pause(host);
        self.progress.stop();
        self.state = RecordingState::Paused;
    }

    /// Capture again after [`RecordingSession::pause`]
    ///
    /// # Errors
    ///
    /// Returns error if the host refuses a channel
    pub fn resume(&mut self, host: &mut dyn EditorHost) -> RecordResult<()> {
        if self.state != RecordingState::Paused {
            return Ok(());
        }
        self.recorder.resume(host)?;
        self.progress.run(self.progress.current_second());
        self.state = RecordingState::Recording;
        Ok(())
    }

    /// End the recording and compute its length, excluding paused time
    ///
    /// # Errors
    ///
    /// Returns error if nothing is being recorded
    pub fn stop(&mut self, host: &mut dyn EditorHost) -> RecordResult<RelativeMs> {
        if self.state == RecordingState::Paused {
            if let Err(err) = self.resume(host) {
                warn!(error = %err, "failed to resume before stopping");
                self.state = RecordingState::Recording;
            }
        }
        if self.state != RecordingState::Recording {
            return Err(RecordError::NotRecording);
        }

        self.progress.stop();
        self.recorder.stop_recording(host);
        self.length = self
            .clock
            .now()
            .since(self.recording_start)
            .saturating_sub(self.recorder.paused_time());
        self.state = RecordingState::Stopped;
        info!(name = %self.name, length = %self.length, "recording session stopped");
        Ok(self.length)
    }

    /// Stop and discard everything recorded
    pub fn cancel(&mut self, host: &mut dyn EditorHost) {
        if let Err(err) = self.stop(host) {
            warn!(error = %err, "cancelled recording was not running");
        }
        self.recorder = Recorder::new(Arc::clone(&self.clock));
        self.recorded_at = None;
        self.length = RelativeMs::zero();
        self.state = RecordingState::Idle;
        info!(name = %self.name, "recording session cancelled");
    }

    /// Persisted timeline with documents named relative to `root`
    ///
    /// # Errors
    ///
    /// Returns error if the recording has not been stopped or cannot be encoded
    pub fn timeline(&self, root: Option<&Path>) -> RecordResult<PersistedTimeline> {
        if self.state != RecordingState::Stopped {
            return Err(RecordError::StillRecording);
        }
        Ok(self
            .recorder
            .timeline_content(self.recording_start, root)?
            .into_persisted(self.length))
    }

    /// Metadata describing the recording
    #[must_use]
    pub fn metadata(&self) -> Metadata {
        Metadata {
            length: self.length,
            name: self.name.clone(),
            version: FORMAT_VERSION,
            recorded_at: self.recorded_at,
        }
    }

    /// Write the timeline and metadata files into `dir`
    ///
    /// # Errors
    ///
    /// Returns error if the recording has not been stopped or a file cannot be written
    pub fn save(&self, dir: &Path, root: Option<&Path>) -> RecordResult<()> {
        let timeline = self.timeline(root)?;
        std::fs::create_dir_all(dir)?;
        timeline.write_to(&dir.join(TIMELINE_FILE))?;
        self.metadata().write_to(&dir.join(METADATA_FILE))?;
        info!(dir = %dir.display(), events = timeline.events.len(), "recording saved");
        Ok(())
    }

    /// Lifecycle state
    #[must_use]
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Recording length; zero until stopped
    #[must_use]
    pub fn length(&self) -> RelativeMs {
        self.length
    }

    /// Total time spent paused
    #[must_use]
    pub fn paused_time(&self) -> RelativeMs {
        self.recorder.paused_time()
    }

    /// Absolute time offset zero maps to
    #[must_use]
    pub fn origin(&self) -> EpochMs {
        self.recording_start
    }

    /// The underlying recorder
    #[must_use]
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// The underlying recorder, for delivering notifications
    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("origin", &self.recording_start)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Read the timeline saved in `dir`
///
/// # Errors
///
/// Returns error if the file is missing or malformed
pub fn load_timeline(dir: &Path) -> RecordResult<PersistedTimeline> {
    Ok(PersistedTimeline::read_from(&dir.join(TIMELINE_FILE))?)
}

/// Read the metadata saved in `dir`
///
/// # Errors
///
/// Returns error if the file is missing or malformed
pub fn load_metadata(dir: &Path) -> RecordResult<Metadata> {
    Ok(Metadata::read_from(&dir.join(METADATA_FILE))?)
}
