use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use annexb::reframe::{self, Reframed};

use crate::error::RecorderError;
use crate::finalize;
use crate::sink::{self, ContainerSink, ParameterSetKind, SinkBackend, VideoGeometry};
use crate::timestamp::SampleClock;

/// Sample clock resolution for all recordings, in ticks per second. 90 kHz is
/// the conventional MPEG video timescale.
pub const SAMPLE_CLOCK_HZ: u32 = 90_000;

/// Frame rate assumed when the caller does not specify one.
pub const DEFAULT_FRAME_RATE: u32 = 25;

/// H.264 parameter sets registered with the container when a recording
/// starts. In-band copies arriving later in the stream are dropped.
#[derive(Debug, Clone)]
pub struct ParameterSets {
    pub sps: Vec<u8>,
    pub pps: Vec<u8>,
}

impl Default for ParameterSets {
    /// Built-in High-profile Level 3.1 pair matching the synthetic test
    /// streams. Callers that own a real encoder should pass its actual
    /// SPS/PPS via [`RecordingSession::start_with`].
    fn default() -> Self {
        Self {
            sps: vec![
                0x67, 0x64, 0x00, 0x1F, 0xAC, 0xD9, 0x40, 0x50, 0x05, 0xBB, 0x01, 0x10, 0x00,
                0x00, 0x03, 0x00, 0x10, 0x00, 0x00, 0x03, 0x03, 0xC0, 0xF1, 0x42, 0x99, 0x60,
            ],
            pps: vec![0x68, 0xEB, 0xE3, 0xCB, 0x22, 0xC0],
        }
    }
}

/// Resources owned for the duration of one active recording.
struct ActiveRecording {
    sink: Box<dyn ContainerSink>,
    clock: SampleClock,
    started_at: DateTime<Local>,
    temp_path: PathBuf,
}

enum SessionState {
    Idle,
    Active(ActiveRecording),
}

/// One recording lifetime: `start` → `write_frame`* → `stop`.
///
/// Exactly one container sink is owned per active period. The session is a
/// single-producer object: `start`/`write_frame`/`stop` must be invoked
/// serially from one thread.
pub struct RecordingSession {
    output_dir: PathBuf,
    prefix: String,
    backend: SinkBackend,
    state: SessionState,
    last_output: Option<PathBuf>,
}

impl RecordingSession {
    /// Create an idle session writing into `output_dir`.
    ///
    /// Directory creation is attempted here but only reported; `start`
    /// re-checks it and fails properly if the directory is unusable.
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        let output_dir = output_dir.into();
        if let Err(e) = fs::create_dir_all(&output_dir) {
            log::warn!(
                "Could not create output directory {}: {}",
                output_dir.display(),
                e
            );
        }
        Self {
            output_dir,
            prefix: prefix.into(),
            backend: SinkBackend::default(),
            state: SessionState::Idle,
            last_output: None,
        }
    }

    /// Select the container backend used by subsequent `start` calls.
    pub fn with_backend(mut self, backend: SinkBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Start recording with the built-in parameter sets.
    pub fn start(&mut self, width: u32, height: u32, frame_rate: u32) -> Result<(), RecorderError> {
        self.start_with(width, height, frame_rate, ParameterSets::default())
    }

    /// Start recording, registering the given parameter sets with the sink.
    ///
    /// A `start` while already recording finalizes the previous file first.
    /// On any failure the session stays idle and partially created sink
    /// resources are released.
    pub fn start_with(
        &mut self,
        width: u32,
        height: u32,
        frame_rate: u32,
        parameter_sets: ParameterSets,
    ) -> Result<(), RecorderError> {
        if self.is_recording() {
            if let Some(path) = self.stop() {
                log::info!("Implicitly stopped previous recording: {}", path.display());
            }
        }

        if width == 0 || height == 0 || frame_rate == 0 {
            return Err(RecorderError::InvalidGeometry {
                width,
                height,
                frame_rate,
            });
        }

        fs::create_dir_all(&self.output_dir).map_err(|source| RecorderError::CreateDirectory {
            dir: self.output_dir.clone(),
            source,
        })?;

        let started_at = Local::now();
        let temp_path = self.output_dir.join(format!("{}_temp.mp4", self.prefix));
        let geometry = VideoGeometry {
            width,
            height,
            frame_rate,
        };

        let mut sink = sink::create(self.backend, &temp_path, geometry, SAMPLE_CLOCK_HZ)
            .map_err(|e| {
                discard_partial(&temp_path);
                RecorderError::Initialization(e)
            })?;

        for (kind, bytes) in [
            (ParameterSetKind::Sps, &parameter_sets.sps),
            (ParameterSetKind::Pps, &parameter_sets.pps),
        ] {
            if let Err(e) = sink.register_parameter_set(kind, bytes) {
                drop(sink);
                discard_partial(&temp_path);
                return Err(RecorderError::Initialization(e));
            }
        }

        log::info!(
            "Recording {}x{} @ {} fps to {}",
            width,
            height,
            frame_rate,
            temp_path.display()
        );
        self.state = SessionState::Active(ActiveRecording {
            sink,
            clock: SampleClock::new(SAMPLE_CLOCK_HZ, frame_rate),
            started_at,
            temp_path,
        });
        Ok(())
    }

    /// Write one H.264 NAL unit.
    ///
    /// Accepts Annex B or length-prefixed input. In-band parameter sets are
    /// silently dropped (they were registered at `start`). Malformed input
    /// and sink write failures are reported per call; the session stays
    /// active either way so the caller may retry or stop.
    pub fn write_frame(
        &mut self,
        data: &[u8],
        key_frame: bool,
        pts_ms: i64,
    ) -> Result<(), RecorderError> {
        let recording = match &mut self.state {
            SessionState::Active(r) => r,
            SessionState::Idle => return Err(RecorderError::NotRecording),
        };

        let sample = match reframe::reframe(data)? {
            Reframed::Sample(bytes) => bytes,
            Reframed::Suppressed => {
                log::debug!("Skipping in-band parameter set NAL unit");
                return Ok(());
            }
        };

        let timestamp = recording.clock.translate(pts_ms);
        recording
            .sink
            .write_sample(&sample, timestamp, key_frame)
            .map_err(RecorderError::Write)
    }

    /// Stop recording and publish the finalized file.
    ///
    /// Returns the finalized path, or the in-progress path if the rename
    /// failed, or `None` if no recording was active. A container finalize
    /// error is logged and publication proceeds so data already on disk
    /// keeps a path.
    pub fn stop(&mut self) -> Option<PathBuf> {
        let recording = match mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Active(r) => r,
            SessionState::Idle => return None,
        };
        let ended_at = Local::now();

        if let Err(e) = recording.sink.finalize() {
            log::error!("Error finalizing container: {}", e);
        }

        let name = finalize::build_file_name(&self.prefix, &recording.started_at, Some(&ended_at));
        let final_path = finalize::publish(&recording.temp_path, &self.output_dir, &name);
        log::info!("Recording finished: {}", final_path.display());

        self.last_output = Some(final_path.clone());
        Some(final_path)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    /// The in-progress file while recording, the last finalized file after
    /// `stop`, `None` before the first `start`.
    pub fn current_file_path(&self) -> Option<&Path> {
        match &self.state {
            SessionState::Active(r) => Some(&r.temp_path),
            SessionState::Idle => self.last_output.as_deref(),
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.is_recording() {
            self.stop();
        }
    }
}

/// Remove an in-progress file left behind by a failed `start`.
fn discard_partial(temp_path: &Path) {
    let _ = fs::remove_file(temp_path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_while_idle_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = RecordingSession::new(dir.path(), "video");
        assert_eq!(session.stop(), None);
        assert!(!session.is_recording());
        assert_eq!(session.current_file_path(), None);
    }

    #[test]
    fn test_write_frame_while_idle_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = RecordingSession::new(dir.path(), "video");
        let err = session
            .write_frame(&[0, 0, 0, 1, 0x41, 0xAA], false, 0)
            .unwrap_err();
        assert!(matches!(err, RecorderError::NotRecording));
    }

    #[test]
    fn test_zero_geometry_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = RecordingSession::new(dir.path(), "video");
        assert!(matches!(
            session.start(0, 720, 25),
            Err(RecorderError::InvalidGeometry { .. })
        ));
        assert!(matches!(
            session.start(1280, 720, 0),
            Err(RecorderError::InvalidGeometry { .. })
        ));
        assert!(!session.is_recording());
    }

    #[test]
    fn test_start_reports_in_progress_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = RecordingSession::new(dir.path(), "video");
        session.start(1280, 720, 25).unwrap();

        assert!(session.is_recording());
        assert_eq!(
            session.current_file_path(),
            Some(dir.path().join("video_temp.mp4").as_path())
        );
        session.stop();
    }

    #[test]
    fn test_malformed_frame_keeps_session_active() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = RecordingSession::new(dir.path(), "video");
        session.start(1280, 720, 25).unwrap();

        let err = session.write_frame(&[0, 0], false, 0).unwrap_err();
        assert!(matches!(err, RecorderError::MalformedInput(_)));
        assert!(session.is_recording());

        // A valid frame still goes through afterwards
        session
            .write_frame(&[0, 0, 0, 1, 0x65, 0xAA, 0xBB], true, 40)
            .unwrap();
        assert!(session.stop().is_some());
    }

    #[test]
    fn test_in_band_parameter_sets_are_suppressed_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = RecordingSession::new(dir.path(), "video");
        session.start(1280, 720, 25).unwrap();

        session
            .write_frame(&[0, 0, 0, 1, 0x67, 0x64, 0x00], false, 0)
            .unwrap();
        session
            .write_frame(&[0, 0, 0, 1, 0x68, 0xEB], false, 0)
            .unwrap();
        session.stop();
    }

    #[test]
    fn test_drop_while_active_finalizes() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut session = RecordingSession::new(dir.path(), "video");
            session.start(1280, 720, 25).unwrap();
            session
                .write_frame(&[0, 0, 0, 1, 0x65, 0xAA], true, 40)
                .unwrap();
        }
        // The temp file must be gone — the drop finalized and renamed it
        assert!(!dir.path().join("video_temp.mp4").exists());
        let outputs: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(outputs.len(), 1);
    }
}
