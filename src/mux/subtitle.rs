//! Subtitle multiplexing (spec §4.5). Grounded on
//! `original_source/pkg/handler/handler.go:AddSubtitles` and
//! `original_source/tools/ffmpeg/ffmpeg.go:SubtitleFileTOVTTFile`/
//! `ExtractSubtitleStream`.
//!
//! The original splices a failed conversion out of `Pipeline.Subtitle` by
//! index while iterating the same slice it is mutating, which can delete the
//! wrong entry once an earlier removal has shifted indices (spec.md Open
//! Question (a)). We build a filtered output list instead and only assign it
//! back once, which cannot misindex.

use crate::models::{Pipeline, SubtitleRequest};
use crate::playlist::MasterPlaylist;
use crate::probe;
use crate::subtitle_vtt::create_m3u8_from_vtt;
use anyhow::Context;
use std::path::Path;
use tracing::warn;

async fn srt_to_vtt(ffmpeg_bin: &str, input: &Path, output: &Path) -> anyhow::Result<()> {
    let result = tokio::process::Command::new(ffmpeg_bin)
        .arg("-i")
        .arg(input)
        .arg(output)
        .output()
        .await
        .context("failed to spawn ffmpeg for subtitle conversion")?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        anyhow::bail!("subtitle conversion failed: {stderr}");
    }
    Ok(())
}

async fn extract_subtitle_stream(
    ffmpeg_bin: &str,
    input: &Path,
    stream_index: i32,
    out_dir: &Path,
    tag: &str,
) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("failed to create subtitle dir {}", out_dir.display()))?;

    let dest = out_dir.join(format!("{tag}.vtt"));
    let result = tokio::process::Command::new(ffmpeg_bin)
        .arg("-i")
        .arg(input)
        .arg("-map")
        .arg(format!("0:{stream_index}"))
        .arg(&dest)
        .output()
        .await
        .context("failed to spawn ffmpeg for subtitle extraction")?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        anyhow::bail!("subtitle extraction failed for stream {stream_index}: {stderr}");
    }
    Ok(())
}

fn media_line(lang: &str, lang_code: &str, is_default: bool) -> String {
    let flag = if is_default { "YES" } else { "NO" };
    format!(
        "#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID=\"subs\",NAME=\"{lang}\",DEFAULT={flag},AUTOSELECT={flag},LANGUAGE=\"{lang_code}\",URI=\"subtitle/{lang}/index.m3u8\""
    )
}

/// Converts every explicitly-requested subtitle plus every subtitle stream
/// embedded in the source, dropping (not retrying) any that fail conversion,
/// and splices the survivors into the master playlist. `audio_track_count`
/// is the number of `#EXT-X-MEDIA` audio lines already spliced in, since the
/// subtitle anchor sits immediately after them.
pub async fn add_subtitles(
    ffmpeg_bin: &str,
    ffprobe_bin: &str,
    input: &Path,
    job_root: &Path,
    pipeline: &mut Pipeline,
    playlist_path: &Path,
    audio_track_count: usize,
) -> anyhow::Result<()> {
    let subtitle_root = job_root.join("subtitle");
    let mut survivors: Vec<SubtitleRequest> = Vec::new();

    for request in pipeline.subtitle.drain(..).collect::<Vec<_>>() {
        let lang = if request.language_code.is_empty() {
            request.language.clone()
        } else {
            request.language_code.clone()
        };
        let dir = subtitle_root.join(&lang);
        let vtt_name = format!("{lang}.vtt");

        let converted = async {
            tokio::fs::create_dir_all(&dir).await?;
            let src = Path::new(&request.input_url);
            srt_to_vtt(ffmpeg_bin, src, &dir.join(&vtt_name)).await?;
            create_m3u8_from_vtt(&dir, &vtt_name).await?;
            Ok::<(), anyhow::Error>(())
        }
        .await;

        match converted {
            Ok(()) => survivors.push(request),
            Err(e) => warn!(language = %lang, error = %e, "dropping subtitle request that failed to convert"),
        }
    }

    let stream_names = probe::subtitle_stream_names(ffprobe_bin, input).await.unwrap_or_default();
    for (stream_index, tag) in stream_names {
        let dir = subtitle_root.join(&tag);
        let converted = async {
            extract_subtitle_stream(ffmpeg_bin, input, stream_index, &dir, &tag).await?;
            create_m3u8_from_vtt(&dir, &format!("{tag}.vtt")).await?;
            Ok::<(), anyhow::Error>(())
        }
        .await;

        match converted {
            Ok(()) => survivors.push(SubtitleRequest {
                input_url: String::new(),
                language_code: tag.clone(),
                language: tag,
            }),
            Err(e) => warn!(stream_index, error = %e, "dropping embedded subtitle stream that failed to convert"),
        }
    }

    pipeline.subtitle = survivors;

    if pipeline.subtitle.is_empty() {
        return Ok(());
    }

    let media_lines: Vec<String> = pipeline
        .subtitle
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let lang = if s.language_code.is_empty() { &s.language } else { &s.language_code };
            media_line(lang, &s.language_code, i == 0)
        })
        .collect();

    let mut playlist = MasterPlaylist::read(playlist_path).await?;
    let anchor = 2 + audio_track_count;
    playlist.splice(anchor, media_lines, false);
    playlist.edit_stream_inf(4, |line| Ok(format!("{line},SUBTITLES=\"subs\"")))?;
    playlist.write(playlist_path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_line_uses_subs_group_id() {
        assert!(media_line("eng", "eng", false).contains("GROUP-ID=\"subs\""));
    }

    #[test]
    fn first_entry_is_marked_default() {
        assert!(media_line("eng", "eng", true).contains("DEFAULT=YES,AUTOSELECT=YES"));
        assert!(media_line("fra", "fra", false).contains("DEFAULT=NO,AUTOSELECT=NO"));
    }
}
