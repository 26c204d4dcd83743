use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bytes::Bytes;
use mp4::{AvcConfig, MediaConfig, Mp4Config, Mp4Sample, Mp4Writer, TrackConfig};

use crate::sink::{ContainerSink, ParameterSetKind, SinkError, VideoGeometry};

fn container_err(context: &'static str) -> impl FnOnce(mp4::Error) -> SinkError {
    move |e: mp4::Error| SinkError::Container {
        context,
        message: e.to_string(),
    }
}

/// MP4 backend over the pure-Rust `mp4` crate.
///
/// The crate takes SPS/PPS at track-add time, so the video track is created
/// lazily once both parameter sets have been registered; the first written
/// sample locks further registration out.
pub struct Mp4FileSink {
    writer: Mp4Writer<BufWriter<File>>,
    geometry: VideoGeometry,
    ticks_per_second: u32,
    /// Nominal per-sample duration in ticks.
    sample_duration: u32,
    sps: Option<Vec<u8>>,
    pps: Option<Vec<u8>>,
    track_id: Option<u32>,
}

impl std::fmt::Debug for Mp4FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mp4FileSink")
            .field("geometry", &self.geometry)
            .field("ticks_per_second", &self.ticks_per_second)
            .field("sample_duration", &self.sample_duration)
            .field("sps", &self.sps)
            .field("pps", &self.pps)
            .field("track_id", &self.track_id)
            .finish_non_exhaustive()
    }
}

impl Mp4FileSink {
    pub fn create(
        path: &Path,
        geometry: VideoGeometry,
        ticks_per_second: u32,
    ) -> Result<Self, SinkError> {
        if geometry.width > u16::MAX as u32 || geometry.height > u16::MAX as u32 {
            return Err(SinkError::GeometryOutOfRange {
                width: geometry.width,
                height: geometry.height,
            });
        }

        let config = Mp4Config {
            major_brand: "isom"
                .parse()
                .map_err(|_| SinkError::Rejected("invalid major brand"))?,
            minor_version: 512,
            compatible_brands: ["isom", "iso2", "avc1", "mp41"]
                .iter()
                .filter_map(|b| b.parse().ok())
                .collect(),
            timescale: ticks_per_second,
        };

        let file = BufWriter::new(File::create(path)?);
        let writer =
            Mp4Writer::write_start(file, &config).map_err(container_err("writing MP4 header"))?;

        Ok(Self {
            writer,
            geometry,
            ticks_per_second,
            sample_duration: ticks_per_second / geometry.frame_rate.max(1),
            sps: None,
            pps: None,
            track_id: None,
        })
    }

    fn ensure_track(&mut self) -> Result<u32, SinkError> {
        if let Some(id) = self.track_id {
            return Ok(id);
        }
        let (sps, pps) = match (&self.sps, &self.pps) {
            (Some(s), Some(p)) => (s.clone(), p.clone()),
            _ => {
                return Err(SinkError::Rejected(
                    "both SPS and PPS must be registered before the first sample",
                ));
            }
        };

        let track = TrackConfig {
            track_type: mp4::TrackType::Video,
            timescale: self.ticks_per_second,
            language: "und".to_string(),
            media_conf: MediaConfig::AvcConfig(AvcConfig {
                width: self.geometry.width as u16,
                height: self.geometry.height as u16,
                seq_param_set: sps,
                pic_param_set: pps,
            }),
        };
        self.writer
            .add_track(&track)
            .map_err(container_err("adding video track"))?;

        self.track_id = Some(1);
        Ok(1)
    }
}

impl ContainerSink for Mp4FileSink {
    fn register_parameter_set(
        &mut self,
        kind: ParameterSetKind,
        data: &[u8],
    ) -> Result<(), SinkError> {
        if self.track_id.is_some() {
            return Err(SinkError::Rejected(
                "parameter sets must be registered before the first sample",
            ));
        }
        match kind {
            ParameterSetKind::Sps => self.sps = Some(data.to_vec()),
            ParameterSetKind::Pps => self.pps = Some(data.to_vec()),
        }
        Ok(())
    }

    fn write_sample(
        &mut self,
        data: &[u8],
        timestamp_ticks: u64,
        keyframe: bool,
    ) -> Result<(), SinkError> {
        let track_id = self.ensure_track()?;
        let sample = Mp4Sample {
            start_time: timestamp_ticks,
            duration: self.sample_duration,
            rendering_offset: 0,
            is_sync: keyframe,
            bytes: Bytes::copy_from_slice(data),
        };
        self.writer
            .write_sample(track_id, &sample)
            .map_err(container_err("writing sample"))
    }

    fn finalize(self: Box<Self>) -> Result<(), SinkError> {
        let mut this = *self;
        this.writer
            .write_end()
            .map_err(container_err("writing MP4 trailer"))?;
        this.writer.into_writer().flush()?;
        Ok(())
    }
}
