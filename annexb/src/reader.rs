use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{AnnexbError, Result};
use crate::nal;

/// One NAL unit located in a raw Annex B bitstream.
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct NalRecord {
    /// Byte offset of the start code in the stream.
    pub offset: u64,
    /// Total size in bytes, including the start code.
    pub size: u32,
    /// Length of the leading start code (3 or 4).
    pub start_code_len: u8,
    /// NAL unit type (low 5 bits of the header byte).
    pub nal_type: u8,
    /// Whether this unit is an IDR slice.
    pub keyframe: bool,
}

/// Index of all NAL units found in a bitstream.
#[derive(Debug, Clone, serde::Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct BitstreamIndex {
    pub nals: Vec<NalRecord>,
}

/// Read a `.h264` or `.h264.gz` file fully into memory.
///
/// Gzip-compressed files are transparently decompressed. Loading the whole
/// stream is intentional: gzip inputs are primarily test fixtures and demo
/// clips, so the simplest non-seeking approach wins over a windowed reader.
pub fn read_bitstream(path: &Path) -> Result<Vec<u8>> {
    let is_gz = path.to_str().map(|s| s.ends_with(".gz")).unwrap_or(false);

    let mut buf = Vec::new();
    if is_gz {
        let file = File::open(path)?;
        GzDecoder::new(file).read_to_end(&mut buf)?;
    } else {
        File::open(path)?.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

/// Find the next Annex B start code at or after `from`.
///
/// Returns the offset of the first start-code byte and the code length.
/// A 4-byte code is preferred over the 3-byte code embedded in its tail.
fn find_start_code(data: &[u8], from: usize) -> Option<(usize, u8)> {
    let mut i = from;
    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 {
            if data[i + 2] == 1 {
                return Some((i, 3));
            }
            if i + 4 <= data.len() && data[i + 2] == 0 && data[i + 3] == 1 {
                return Some((i, 4));
            }
        }
        i += 1;
    }
    None
}

/// Scan a raw Annex B buffer into an index of NAL units.
///
/// Each unit spans from its start code to the next start code (or the end of
/// the buffer). An empty buffer yields an empty index; a non-empty buffer
/// with no start code at all is malformed. A dangling start code at the very
/// end of the stream (as written by tools that emit a trailing separator) is
/// ignored.
pub fn scan(data: &[u8]) -> Result<BitstreamIndex> {
    let mut nals = Vec::new();
    if data.is_empty() {
        return Ok(BitstreamIndex { nals });
    }

    let (mut pos, mut sc_len) = match find_start_code(data, 0) {
        Some(found) => found,
        None => return Err(AnnexbError::MissingStartCode { offset: 0 }),
    };

    loop {
        let header_at = pos + sc_len as usize;
        if header_at >= data.len() {
            // Trailing separator with nothing behind it
            break;
        }
        let nal_type = nal::nal_unit_type(data[header_at]);

        let next = find_start_code(data, header_at + 1);
        let end = next.map(|(p, _)| p).unwrap_or(data.len());

        nals.push(NalRecord {
            offset: pos as u64,
            size: (end - pos) as u32,
            start_code_len: sc_len,
            nal_type,
            keyframe: nal::is_idr(nal_type),
        });

        match next {
            Some((p, l)) => {
                pos = p;
                sc_len = l;
            }
            None => break,
        }
    }

    Ok(BitstreamIndex { nals })
}

/// Borrow the bytes of one indexed NAL unit, start code included.
pub fn nal_bytes<'a>(data: &'a [u8], record: &NalRecord) -> &'a [u8] {
    let start = record.offset as usize;
    &data[start..start + record.size as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&[0, 0, 0, 1, 0x67, 0x64, 0x00]); // SPS
        data.extend_from_slice(&[0, 0, 0, 1, 0x68, 0xEB]); // PPS
        data.extend_from_slice(&[0, 0, 1, 0x65, 0xAA, 0xBB]); // IDR, 3-byte code
        data.extend_from_slice(&[0, 0, 0, 1, 0x41, 0xCC]); // non-IDR slice
        data
    }

    #[test]
    fn test_scan_indexes_all_units() {
        let data = stream();
        let index = scan(&data).unwrap();

        assert_eq!(index.nals.len(), 4);
        assert_eq!(
            index.nals.iter().map(|n| n.nal_type).collect::<Vec<_>>(),
            vec![7, 8, 5, 1]
        );
        assert_eq!(index.nals[2].start_code_len, 3);
        assert!(index.nals[2].keyframe);
        assert!(!index.nals[3].keyframe);
    }

    #[test]
    fn test_scan_offsets_and_sizes_cover_stream() {
        let data = stream();
        let index = scan(&data).unwrap();

        let mut expected_offset = 0u64;
        for record in &index.nals {
            assert_eq!(record.offset, expected_offset);
            expected_offset += record.size as u64;
        }
        assert_eq!(expected_offset, data.len() as u64);
    }

    #[test]
    fn test_nal_bytes_reframes_cleanly() {
        let data = stream();
        let index = scan(&data).unwrap();
        let idr = nal_bytes(&data, &index.nals[2]);
        assert_eq!(idr, &[0, 0, 1, 0x65, 0xAA, 0xBB]);
    }

    #[test]
    fn test_scan_empty_buffer() {
        assert!(scan(&[]).unwrap().nals.is_empty());
    }

    #[test]
    fn test_scan_without_start_code_is_malformed() {
        assert!(matches!(
            scan(&[1, 2, 3, 4, 5]),
            Err(AnnexbError::MissingStartCode { offset: 0 })
        ));
    }

    #[test]
    fn test_scan_ignores_trailing_separator() {
        let mut data = stream();
        data.extend_from_slice(&[0, 0, 0, 1]);
        let index = scan(&data).unwrap();
        assert_eq!(index.nals.len(), 4);
        // The last real unit ends where the dangling code begins
        assert_eq!(index.nals[3].size, 6);
    }

    #[test]
    fn test_read_bitstream_gzip_transparency() {
        use std::io::Write;

        let data = stream();
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("clip.h264");
        std::fs::write(&plain, &data).unwrap();

        let gz = dir.path().join("clip.h264.gz");
        let mut encoder = flate2::write::GzEncoder::new(
            std::fs::File::create(&gz).unwrap(),
            flate2::Compression::default(),
        );
        encoder.write_all(&data).unwrap();
        encoder.finish().unwrap();

        assert_eq!(read_bitstream(&plain).unwrap(), data);
        assert_eq!(read_bitstream(&gz).unwrap(), data);
    }

    #[test]
    fn test_record_json_field_names() {
        // annexb-info consumers rely on these field names
        let index = scan(&stream()).unwrap();
        let json = serde_json::to_string(&index.nals[0]).unwrap();
        for field in ["offset", "size", "start_code_len", "nal_type", "keyframe"] {
            assert!(json.contains(field), "missing {field} in {json}");
        }
    }
}
