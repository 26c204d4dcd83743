use std::path::Path;
use std::sync::Once;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("container error ({context}): {message}")]
    Container {
        context: &'static str,
        message: String,
    },

    #[error("{0}")]
    Rejected(&'static str),

    #[error("video geometry {width}x{height} exceeds container limits")]
    GeometryOutOfRange { width: u32, height: u32 },
}

/// Which parameter set is being registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSetKind {
    Sps,
    Pps,
}

/// Video geometry for a recording.
#[derive(Debug, Clone, Copy)]
pub struct VideoGeometry {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// Container writer collaborator.
///
/// A sink owns one in-progress container file. Parameter sets are registered
/// out-of-band before the first sample; samples arrive 4-byte
/// length-prefixed with timestamps in the tick domain agreed at creation.
/// `finalize` flushes trailer/index structures and releases the file handle.
pub trait ContainerSink {
    fn register_parameter_set(
        &mut self,
        kind: ParameterSetKind,
        data: &[u8],
    ) -> Result<(), SinkError>;

    fn write_sample(
        &mut self,
        data: &[u8],
        timestamp_ticks: u64,
        keyframe: bool,
    ) -> Result<(), SinkError>;

    fn finalize(self: Box<Self>) -> Result<(), SinkError>;
}

/// Available container backends, selected at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkBackend {
    #[default]
    Mp4,
}

static SINK_INIT: Once = Once::new();

/// One-time process-wide backend setup.
///
/// Backends that need library-level initialisation hook it here so that
/// concurrent sessions in one process initialise exactly once. The MP4
/// backend currently has nothing to set up.
fn ensure_init() {
    SINK_INIT.call_once(|| {
        log::debug!("container sink backends initialised");
    });
}

/// Construct a container sink writing to `path`.
pub fn create(
    backend: SinkBackend,
    path: &Path,
    geometry: VideoGeometry,
    ticks_per_second: u32,
) -> Result<Box<dyn ContainerSink>, SinkError> {
    ensure_init();
    match backend {
        SinkBackend::Mp4 => Ok(Box::new(crate::mp4sink::Mp4FileSink::create(
            path,
            geometry,
            ticks_per_second,
        )?)),
    }
}
