//! Deterministic synthetic H.264 Annex B bitstreams for tests and demos.
//!
//! The payloads are not decodable video: they are NAL-shaped containers of
//! pseudo-random bytes with correct start codes, header bytes, and keyframe
//! cadence, which is all a recording pipeline inspects.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use annexb::nal;

/// 4-byte Annex B NAL start code.
const NAL_START_CODE: [u8; 4] = [0, 0, 0, 1];

/// SPS emitted at the head of generated streams (High profile, Level 3.1,
/// 1280x720).
pub const SYNTH_SPS: [u8; 26] = [
    0x67, 0x64, 0x00, 0x1F, 0xAC, 0xD9, 0x40, 0x50, 0x05, 0xBB, 0x01, 0x10, 0x00, 0x00, 0x03,
    0x00, 0x10, 0x00, 0x00, 0x03, 0x03, 0xC0, 0xF1, 0x42, 0x99, 0x60,
];

/// PPS paired with [`SYNTH_SPS`].
pub const SYNTH_PPS: [u8; 6] = [0x68, 0xEB, 0xE3, 0xCB, 0x22, 0xC0];

/// Configuration for a synthetic bitstream.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// Number of slice NAL units to generate.
    pub frame_count: u32,
    /// Payload bytes per slice (excluding start code and NAL header).
    pub frame_size: u32,
    /// Every n-th slice is an IDR. The first slice is always an IDR.
    pub keyframe_interval: u32,
    /// Emit SPS/PPS NAL units ahead of the first slice.
    pub with_parameter_sets: bool,
    /// Seed for the payload byte generator.
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            frame_count: 100,
            frame_size: 4096,
            keyframe_interval: 10,
            with_parameter_sets: true,
            seed: 0x5EED,
        }
    }
}

/// xorshift64* — enough randomness for fixture payloads without an RNG
/// dependency, and fully reproducible from the seed.
struct XorShift64(u64);

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    fn next_byte(&mut self) -> u8 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        (x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 56) as u8
    }
}

/// Whether slice `index` should be an IDR at the given interval.
pub fn is_keyframe(index: u32, interval: u32) -> bool {
    index == 0 || (interval > 0 && index % interval == 0)
}

/// Generate the NAL units of a synthetic stream, one buffer per unit, each
/// with a leading start code.
pub fn generate_frames(config: &SynthConfig) -> Vec<Vec<u8>> {
    let mut rng = XorShift64::new(config.seed);
    let mut frames = Vec::with_capacity(config.frame_count as usize + 2);

    if config.with_parameter_sets {
        for ps in [&SYNTH_SPS[..], &SYNTH_PPS[..]] {
            let mut unit = Vec::with_capacity(ps.len() + 4);
            unit.extend_from_slice(&NAL_START_CODE);
            unit.extend_from_slice(ps);
            frames.push(unit);
        }
    }

    for i in 0..config.frame_count {
        let keyframe = is_keyframe(i, config.keyframe_interval);
        // nal_ref_idc 3 for IDR slices (0x65), 2 for the rest (0x41)
        let header = if keyframe {
            0x60 | nal::NAL_SLICE_IDR
        } else {
            0x40 | nal::NAL_SLICE
        };

        let mut frame = Vec::with_capacity(config.frame_size as usize + 5);
        frame.extend_from_slice(&NAL_START_CODE);
        frame.push(header);
        for _ in 0..config.frame_size {
            let b = rng.next_byte();
            // Zero bytes are remapped so payloads can never emulate a start
            // code (the generator does not implement emulation prevention)
            frame.push(if b == 0 { 0xFF } else { b });
        }
        frames.push(frame);
    }

    frames
}

/// Write a synthetic bitstream to `path`, one NAL unit after another.
pub fn write_bitstream(path: &Path, config: &SynthConfig) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for frame in generate_frames(config) {
        writer.write_all(&frame)?;
    }
    writer.flush()
}
