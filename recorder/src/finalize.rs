use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Timelike};

/// Format a local time as `YYYYMMDD_HHMMSS_mmm` with zero-padded milliseconds.
pub fn format_timestamp(t: &DateTime<Local>) -> String {
    let millis = t.nanosecond() / 1_000_000;
    // Leap-second nanos would render as four digits; clamp instead
    format!("{}_{:03}", t.format("%Y%m%d_%H%M%S"), millis.min(999))
}

/// Build the finalized file name: `[<prefix>_]<start>[_to_<end>].mp4`.
pub fn build_file_name(
    prefix: &str,
    start: &DateTime<Local>,
    end: Option<&DateTime<Local>>,
) -> String {
    let mut name = String::new();
    if !prefix.is_empty() {
        name.push_str(prefix);
        name.push('_');
    }
    name.push_str(&format_timestamp(start));
    if let Some(end) = end {
        name.push_str("_to_");
        name.push_str(&format_timestamp(end));
    }
    name.push_str(".mp4");
    name
}

/// Atomically publish the in-progress file under its computed name.
///
/// On rename failure (cross-device, permissions, collision) the in-progress
/// file is left untouched and its path is returned, so recorded data is
/// never lost to a failed finalize.
pub fn publish(temp_path: &Path, output_dir: &Path, file_name: &str) -> PathBuf {
    let final_path = output_dir.join(file_name);
    match fs::rename(temp_path, &final_path) {
        Ok(()) => final_path,
        Err(e) => {
            log::warn!(
                "Could not rename {} to {}: {} — keeping the in-progress name",
                temp_path.display(),
                final_path.display(),
                e
            );
            temp_path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: i64) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .unwrap()
            .checked_add_signed(Duration::milliseconds(ms))
            .unwrap()
    }

    #[test]
    fn test_format_timestamp_zero_pads() {
        let t = local(2026, 8, 6, 9, 5, 3, 7);
        assert_eq!(format_timestamp(&t), "20260806_090503_007");
    }

    #[test]
    fn test_file_name_with_prefix_and_span() {
        let start = local(2026, 8, 6, 10, 0, 0, 0);
        let end = local(2026, 8, 6, 10, 0, 30, 250);
        assert_eq!(
            build_file_name("video", &start, Some(&end)),
            "video_20260806_100000_000_to_20260806_100030_250.mp4"
        );
    }

    #[test]
    fn test_file_name_without_prefix() {
        let start = local(2026, 1, 2, 3, 4, 5, 600);
        assert_eq!(
            build_file_name("", &start, None),
            "20260102_030405_600.mp4"
        );
    }

    #[test]
    fn test_publish_renames_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("video_temp.mp4");
        fs::write(&temp, b"data").unwrap();

        let published = publish(&temp, dir.path(), "video_final.mp4");
        assert_eq!(published, dir.path().join("video_final.mp4"));
        assert!(published.exists());
        assert!(!temp.exists());
    }

    #[test]
    fn test_publish_failure_returns_original_path() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("video_temp.mp4");
        fs::write(&temp, b"data").unwrap();

        // Target directory does not exist, so the rename must fail
        let missing = dir.path().join("gone");
        let published = publish(&temp, &missing, "video_final.mp4");
        assert_eq!(published, temp);
        assert!(temp.exists(), "in-progress file must survive a failed rename");
    }
}
