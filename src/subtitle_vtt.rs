//! WebVTT duration parsing and one-segment HLS playlist synthesis
//! (spec §4.6). Grounded on `original_source/tools/subtitle/subtitle.go`.

use anyhow::{Context, Result};
use std::path::Path;

/// Parses a VTT/SRT-style timestamp in either `HH:MM:SS.mmm` or
/// `MM:SS.mmm` form into seconds.
fn parse_time_to_seconds(time: &str) -> Result<f64> {
    let time = time.trim();
    let parts: Vec<&str> = time.split(':').collect();
    let (hours, minutes, seconds): (f64, f64, f64) = match parts.as_slice() {
        [h, m, s] => (
            h.parse().with_context(|| format!("bad hours in timestamp {time:?}"))?,
            m.parse().with_context(|| format!("bad minutes in timestamp {time:?}"))?,
            s.parse().with_context(|| format!("bad seconds in timestamp {time:?}"))?,
        ),
        [m, s] => (
            0.0,
            m.parse().with_context(|| format!("bad minutes in timestamp {time:?}"))?,
            s.parse().with_context(|| format!("bad seconds in timestamp {time:?}"))?,
        ),
        _ => anyhow::bail!("unrecognized timestamp shape: {time:?}"),
    };
    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Scans a VTT file's cue timing lines (`... --> ...`) and returns the
/// latest end timestamp seen, i.e. the file's total duration.
pub async fn parse_vtt_total_duration(vtt_file: &Path) -> Result<f64> {
    let content = tokio::fs::read_to_string(vtt_file)
        .await
        .with_context(|| format!("failed to read VTT file {}", vtt_file.display()))?;

    let mut max_end = 0.0f64;
    for line in content.lines() {
        if let Some((_, end)) = line.split_once(" --> ") {
            let end = end.split_whitespace().next().unwrap_or(end);
            if let Ok(seconds) = parse_time_to_seconds(end) {
                if seconds > max_end {
                    max_end = seconds;
                }
            }
        }
    }
    Ok(max_end)
}

/// Writes a one-segment playlist (`<dir>/index.m3u8`) referencing `vtt_file`
/// as its single cue, with `EXT-X-TARGETDURATION` rounded up to the next
/// whole second.
pub async fn create_m3u8_from_vtt(dir: &Path, vtt_file_name: &str) -> Result<()> {
    let vtt_path = dir.join(vtt_file_name);
    let duration = parse_vtt_total_duration(&vtt_path).await?;
    let target_duration = duration.ceil() as u64;

    let content = format!(
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-ALLOW-CACHE:YES\n#EXT-X-TARGETDURATION:{target_duration}\n#EXT-X-MEDIA-SEQUENCE:0\n#EXTINF:{duration:.1},\n{vtt_file_name}\n#EXT-X-ENDLIST\n"
    );

    let out_path = dir.join("index.m3u8");
    tokio::fs::write(&out_path, content)
        .await
        .with_context(|| format!("failed to write subtitle playlist {}", out_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hh_mm_ss_timestamp() {
        assert_eq!(parse_time_to_seconds("00:01:02.500").unwrap(), 62.5);
    }

    #[test]
    fn parses_mm_ss_timestamp() {
        assert_eq!(parse_time_to_seconds("01:02.500").unwrap(), 62.5);
    }

    #[tokio::test]
    async fn total_duration_is_the_max_cue_end_time() {
        let tmp = tempfile::tempdir().unwrap();
        let vtt_path = tmp.path().join("subs.vtt");
        tokio::fs::write(
            &vtt_path,
            "WEBVTT\n\n00:00:00.000 --> 00:00:05.000\nHello\n\n00:00:05.000 --> 00:00:12.250\nWorld\n",
        )
        .await
        .unwrap();
        let duration = parse_vtt_total_duration(&vtt_path).await.unwrap();
        assert_eq!(duration, 12.25);
    }

    #[tokio::test]
    async fn m3u8_target_duration_is_ceil_of_cue_end() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(
            tmp.path().join("subs.vtt"),
            "WEBVTT\n\n00:00:00.000 --> 00:00:12.250\nHi\n",
        )
        .await
        .unwrap();
        create_m3u8_from_vtt(tmp.path(), "subs.vtt").await.unwrap();
        let playlist = tokio::fs::read_to_string(tmp.path().join("index.m3u8"))
            .await
            .unwrap();
        assert!(playlist.contains("#EXT-X-TARGETDURATION:13"));
        assert!(playlist.contains("#EXTINF:12.2,") || playlist.contains("#EXTINF:12.3,"));
    }
}
