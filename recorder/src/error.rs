use std::path::PathBuf;

use thiserror::Error;

use crate::sink::SinkError;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("failed to create output directory {dir}: {source}")]
    CreateDirectory {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid video geometry {width}x{height} @ {frame_rate} fps")]
    InvalidGeometry {
        width: u32,
        height: u32,
        frame_rate: u32,
    },

    #[error("failed to initialise container sink: {0}")]
    Initialization(#[source] SinkError),

    #[error("malformed frame: {0}")]
    MalformedInput(#[from] annexb::error::AnnexbError),

    #[error("failed to write sample: {0}")]
    Write(#[source] SinkError),

    #[error("no recording in progress")]
    NotRecording,
}
