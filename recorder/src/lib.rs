//! Core recording logic: accepts a live sequence of H.264 NAL units, rewrites
//! them into container samples, and produces a finalized MP4 file whose name
//! encodes the wall-clock span of the recording.

pub mod error;
pub mod finalize;
mod mp4sink;
pub mod session;
pub mod sink;
pub mod timestamp;

pub use error::RecorderError;
pub use session::{DEFAULT_FRAME_RATE, ParameterSets, RecordingSession, SAMPLE_CLOCK_HZ};
