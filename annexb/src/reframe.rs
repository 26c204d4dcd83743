use crate::error::{AnnexbError, Result};
use crate::nal::{self, Delimiter};

/// Outcome of reframing one NAL unit for container storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reframed {
    /// A 4-byte-length-prefixed sample ready to hand to the container.
    Sample(Vec<u8>),
    /// The unit is an in-band parameter set (SPS/PPS) and must not be
    /// forwarded as a sample. Not an error: parameter sets are registered
    /// out-of-band when the recording starts.
    Suppressed,
}

/// Normalise one NAL unit into the container's 4-byte length-prefixed sample
/// format.
///
/// Accepts Annex B input (3- or 4-byte start code) or input that already
/// carries a length prefix. Start codes are replaced by a big-endian length;
/// pre-framed input is validated and copied through unchanged. The caller's
/// buffer is never mutated.
pub fn reframe(data: &[u8]) -> Result<Reframed> {
    if data.len() < 4 {
        return Err(AnnexbError::TruncatedNalUnit { got: data.len() });
    }

    match Delimiter::detect(data) {
        delim @ (Delimiter::StartCode4 | Delimiter::StartCode3) => {
            let payload = &data[delim.len()..];
            if payload.is_empty() {
                // A bare 4-byte start code with no NAL header behind it
                return Err(AnnexbError::TruncatedNalUnit { got: data.len() });
            }
            if nal::is_parameter_set(nal::nal_unit_type(payload[0])) {
                return Ok(Reframed::Suppressed);
            }

            let mut out = Vec::with_capacity(payload.len() + 4);
            out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            out.extend_from_slice(payload);
            Ok(Reframed::Sample(out))
        }

        Delimiter::LengthPrefix => {
            let declared = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
            if declared == 0 {
                return Err(AnnexbError::EmptyNalUnit);
            }
            if declared + 4 > data.len() {
                return Err(AnnexbError::LengthOverrun {
                    declared,
                    available: data.len(),
                });
            }
            if nal::is_parameter_set(nal::nal_unit_type(data[4])) {
                return Ok(Reframed::Suppressed);
            }

            // Already in the target format
            Ok(Reframed::Sample(data.to_vec()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(result: Reframed) -> Vec<u8> {
        match result {
            Reframed::Sample(bytes) => bytes,
            Reframed::Suppressed => panic!("expected a sample, got Suppressed"),
        }
    }

    #[test]
    fn test_4_byte_start_code_becomes_length_prefix() {
        let input = [0, 0, 0, 1, 0x65, 0xAA, 0xBB, 0xCC];
        let out = sample(reframe(&input).unwrap());

        // Output = payload length + 4, prefix decodes to payload length
        assert_eq!(out.len(), 8);
        assert_eq!(u32::from_be_bytes([out[0], out[1], out[2], out[3]]), 4);
        assert_eq!(&out[4..], &input[4..]);
    }

    #[test]
    fn test_3_byte_start_code_becomes_length_prefix() {
        let input = [0, 0, 1, 0x41, 0x11, 0x22];
        let out = sample(reframe(&input).unwrap());

        assert_eq!(out.len(), 7);
        assert_eq!(u32::from_be_bytes([out[0], out[1], out[2], out[3]]), 3);
        assert_eq!(&out[4..], &input[3..]);
    }

    #[test]
    fn test_sps_suppressed_regardless_of_delimiter() {
        // Start-code delimited SPS
        assert_eq!(
            reframe(&[0, 0, 0, 1, 0x67, 0x64, 0x00]).unwrap(),
            Reframed::Suppressed
        );
        // 3-byte start code PPS
        assert_eq!(
            reframe(&[0, 0, 1, 0x68, 0xEB]).unwrap(),
            Reframed::Suppressed
        );
        // Length-prefixed SPS
        assert_eq!(
            reframe(&[0, 0, 0, 2, 0x67, 0x64]).unwrap(),
            Reframed::Suppressed
        );
    }

    #[test]
    fn test_too_short_is_malformed() {
        assert!(matches!(
            reframe(&[0, 0, 1]),
            Err(AnnexbError::TruncatedNalUnit { got: 3 })
        ));
        assert!(matches!(reframe(&[]), Err(AnnexbError::TruncatedNalUnit { got: 0 })));
    }

    #[test]
    fn test_bare_start_code_is_malformed() {
        assert!(matches!(
            reframe(&[0, 0, 0, 1]),
            Err(AnnexbError::TruncatedNalUnit { got: 4 })
        ));
    }

    #[test]
    fn test_length_overrun_is_malformed() {
        // Declares 10 payload bytes but only 2 follow the prefix
        let input = [0, 0, 0, 10, 0x41, 0x11];
        assert!(matches!(
            reframe(&input),
            Err(AnnexbError::LengthOverrun {
                declared: 10,
                available: 6
            })
        ));
    }

    #[test]
    fn test_zero_length_prefix_is_malformed() {
        assert!(matches!(
            reframe(&[0, 0, 0, 0, 0x41]),
            Err(AnnexbError::EmptyNalUnit)
        ));
    }

    #[test]
    fn test_preframed_input_is_idempotent() {
        let first = sample(reframe(&[0, 0, 0, 1, 0x41, 0x10, 0x20, 0x30]).unwrap());
        let second = sample(reframe(&first).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_parameter_set_types_pass_through() {
        for header in [0x41u8, 0x65, 0x06, 0x09] {
            let input = [0, 0, 0, 1, header, 0x55];
            assert!(matches!(reframe(&input), Ok(Reframed::Sample(_))), "type {header:#x}");
        }
    }
}
