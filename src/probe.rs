//! The probe adapter: wraps `ffprobe` invocations and tolerates its JSON
//! quirks (spec §4.2). Grounded on `original_source/tools/ffmpeg/ffmpeg.go`
//! (`GetVideoInfo`, `GetSubtitleStreams`, `GetAudioStreamName`,
//! `GetSubtitleName`, `GetAudioStreamIndexes`), style grounded on the
//! teacher's `video.rs::get_video_metadata` (`tokio::process::Command` +
//! `anyhow::Context`).

use crate::models::VideoInfo;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

/// Runs ffprobe against `input` and parses its JSON stream listing.
///
/// ffprobe occasionally prefixes its JSON with warning text on stdout before
/// the `"streams":` key; when straight `serde_json::from_str` fails we retry
/// by splitting on `"streams":` and reconstructing a minimal object from the
/// second half, matching the original's `strings.Split(res, "\"streams\":")`
/// fallback exactly.
pub async fn probe_video(ffprobe_bin: &str, input: &Path) -> Result<VideoInfo> {
    let output = tokio::process::Command::new(ffprobe_bin)
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("stream=width,height,codec_type,duration,profile,index:stream_tags=language")
        .arg(input)
        .arg("-of")
        .arg("json")
        .output()
        .await
        .context("failed to run ffprobe")?;

    let raw = String::from_utf8_lossy(&output.stdout).into_owned();
    parse_probe_output(&raw)
}

fn parse_probe_output(raw: &str) -> Result<VideoInfo> {
    match serde_json::from_str::<VideoInfo>(raw) {
        Ok(info) => Ok(info),
        Err(first_err) => {
            let parts: Vec<&str> = raw.splitn(2, "\"streams\":").collect();
            if parts.len() == 2 {
                let reconstructed = format!("{{ \"streams\":{}", parts[1]);
                serde_json::from_str::<VideoInfo>(&reconstructed)
                    .context("ffprobe output has a preamble but is still not valid JSON")
            } else {
                Err(first_err).context("ffprobe output is not valid JSON and has no recoverable preamble")
            }
        }
    }
}

/// CSV line shape shared by the audio/subtitle stream probes:
/// `index,language[,title]`.
struct CsvStreamLine {
    index: i32,
    language: String,
    title: Option<String>,
}

async fn probe_stream_csv(ffprobe_bin: &str, input: &Path, select: &str) -> Result<Vec<CsvStreamLine>> {
    let output = tokio::process::Command::new(ffprobe_bin)
        .arg("-v")
        .arg("error")
        .arg("-select_streams")
        .arg(select)
        .arg("-show_entries")
        .arg("stream=index:stream_tags=title:stream_tags=language")
        .arg("-of")
        .arg("csv=p=0")
        .arg(input)
        .output()
        .await
        .with_context(|| format!("failed to run ffprobe for {select} streams"))?;

    let raw = String::from_utf8_lossy(&output.stdout);
    let mut lines = Vec::new();
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.is_empty() {
            continue;
        }
        let index: i32 = fields[0].parse().unwrap_or(-1);
        let language = fields.get(1).copied().unwrap_or("").to_string();
        let title = fields.get(2).map(|s| s.to_string()).filter(|s| !s.is_empty());
        lines.push(CsvStreamLine {
            index,
            language,
            title,
        });
    }
    Ok(lines)
}

fn sanitize_tag(raw: &str) -> String {
    let joined = raw.replace(" | ", "_").replace(' ', "_");
    let re = Regex::new(r"[^a-zA-Zа-яА-Я0-9_]").expect("static pattern is valid");
    re.replace_all(&joined, "").to_string()
}

/// Display names for subtitle streams, keyed by stream index. A stream whose
/// sanitized language+title collapses to an empty string is dropped entirely
/// rather than given a synthetic name (`GetSubtitleName`'s skip rule).
pub async fn subtitle_stream_names(ffprobe_bin: &str, input: &Path) -> Result<Vec<(i32, String)>> {
    let lines = probe_stream_csv(ffprobe_bin, input, "s").await?;
    Ok(lines
        .into_iter()
        .filter_map(|l| {
            let raw = match &l.title {
                Some(title) => format!("{}_{}", l.language, title),
                None => l.language.clone(),
            };
            let tag = sanitize_tag(&raw);
            if tag.is_empty() {
                None
            } else {
                Some((l.index, tag))
            }
        })
        .collect())
}

/// Display names for audio streams. Unlike the subtitle side, an empty
/// sanitized name falls back to `"rus"` instead of being dropped
/// (`GetAudioStreamName`'s asymmetric default).
pub async fn audio_stream_names(ffprobe_bin: &str, input: &Path) -> Result<Vec<(i32, String)>> {
    let lines = probe_stream_csv(ffprobe_bin, input, "a").await?;
    Ok(lines
        .into_iter()
        .map(|l| {
            let raw = match &l.title {
                Some(title) => format!("{}_{}", l.language, title),
                None => l.language.clone(),
            };
            let tag = sanitize_tag(&raw);
            let tag = if tag.is_empty() { "rus".to_string() } else { tag };
            (l.index, tag)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let raw = r#"{"streams":[{"index":0,"codec_type":"video","width":1920,"height":1080,"duration":"10.0","profile":"High","tags":{"language":"eng"}}]}"#;
        let info = parse_probe_output(raw).unwrap();
        assert_eq!(info.streams.len(), 1);
        assert_eq!(info.streams[0].width, 1920);
    }

    #[test]
    fn tolerates_warning_preamble_before_streams_key() {
        let raw = "deprecated pixel format used, make sure you did set range correctly\n\"streams\": [{\"index\":0,\"codec_type\":\"video\",\"width\":1280,\"height\":720,\"duration\":\"5.0\",\"profile\":\"Main\",\"tags\":{\"language\":\"\"}}]}";
        let info = parse_probe_output(raw).unwrap();
        assert_eq!(info.streams[0].height, 720);
    }

    #[test]
    fn unparsable_output_with_no_streams_key_errors() {
        let raw = "ffprobe: command not found";
        assert!(parse_probe_output(raw).is_err());
    }

    #[test]
    fn sanitize_tag_strips_non_word_characters() {
        assert_eq!(sanitize_tag("eng | Commentary Track"), "eng_Commentary_Track");
        assert_eq!(sanitize_tag("  "), "");
    }
}
