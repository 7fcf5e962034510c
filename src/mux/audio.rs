//! Audio track multiplexing (spec §4.4). Grounded on
//! `original_source/pkg/handler/handler.go:AddAudioTracks` and
//! `original_source/tools/ffmpeg/newCommandCpu.go:CreateAudioStreamCPU`
//! (audio HLS segments are always produced with the CPU/software AAC
//! template, regardless of whether the video path used GPU or CPU encoding).

use crate::models::{AudioTrack, Pipeline};
use crate::playlist::{splice_into_trailing_quote, MasterPlaylist};
use crate::probe;
use anyhow::{Context, Result};
use std::path::Path;

async fn extract_mp3(ffmpeg_bin: &str, input: &Path, stream_index: i32, dest: &Path) -> Result<()> {
    let output = tokio::process::Command::new(ffmpeg_bin)
        .arg("-i")
        .arg(input)
        .arg("-map")
        .arg(format!("0:{stream_index}"))
        .arg("-acodec")
        .arg("libmp3lame")
        .arg("-y")
        .arg(dest)
        .output()
        .await
        .context("failed to spawn ffmpeg for audio extraction")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("audio extraction failed for stream {stream_index}: {stderr}");
    }
    Ok(())
}

/// Segments one audio track into its own HLS rendition. `source` is either a
/// locally extracted mp3 (embedded streams) or the track's own `input_url`
/// (caller-supplied tracks) — ffmpeg reads both the same way, matching
/// `CreateAudioStream`, which runs this same command over whatever
/// `AudioTrack.InputURL` happens to hold.
async fn segment_audio_hls(ffmpeg_bin: &str, source: &Path, out_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("failed to create audio rendition dir {}", out_dir.display()))?;

    let output = tokio::process::Command::new(ffmpeg_bin)
        .arg("-i")
        .arg(source)
        .arg("-c:a")
        .arg("aac")
        .arg("-b:a")
        .arg("128k")
        .arg("-vn")
        .arg("-hls_time")
        .arg("3")
        .arg("-hls_list_size")
        .arg("0")
        .arg(out_dir.join("index.m3u8"))
        .output()
        .await
        .context("failed to spawn ffmpeg for audio HLS segmenting")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("audio HLS segmenting failed: {stderr}");
    }
    Ok(())
}

fn media_line(lang: &str, lang_code: &str, is_default: bool) -> String {
    let flag = if is_default { "YES" } else { "NO" };
    format!(
        "#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"audio\",NAME=\"{lang}\",DEFAULT={flag},AUTOSELECT={flag},LANGUAGE=\"{lang_code}\",URI=\"audio/{lang}/index.m3u8\""
    )
}

/// Builds the combined audio-tracks list, extracts/segments every entry into
/// its own HLS audio rendition, and splices the resulting `#EXT-X-MEDIA`
/// lines (plus the CODECS suffix on every variant line) into the master
/// playlist. The caller-supplied tracks already on `pipeline.audio_tracks`
/// (from the ingress JSON) come first, followed by any audio streams
/// discovered embedded in the source container — matching the original's
/// `AddAudioTracks`, which appends discovered tracks onto the
/// already-populated `Pipeline.AudioTracks` slice and then walks the whole
/// thing. The first entry in that combined order is marked `DEFAULT=YES`.
/// Returns the number of tracks added, which the subtitle stage needs to
/// compute its own splice anchor.
pub async fn add_audio_tracks(
    ffmpeg_bin: &str,
    ffprobe_bin: &str,
    input: &Path,
    job_root: &Path,
    pipeline: &mut Pipeline,
    playlist_path: &Path,
) -> Result<usize> {
    let audio_root = job_root.join("audio");
    let mut combined: Vec<AudioTrack> = std::mem::take(&mut pipeline.audio_tracks);

    let discovered = probe::audio_stream_names(ffprobe_bin, input).await?;
    for (stream_index, lang) in &discovered {
        let mp3_path = audio_root.join(format!("{lang}.mp3"));
        extract_mp3(ffmpeg_bin, input, *stream_index, &mp3_path).await?;
        combined.push(AudioTrack {
            id: stream_index.to_string(),
            input_url: mp3_path.display().to_string(),
            language_code: lang.clone(),
            language: lang.clone(),
        });
    }

    if combined.is_empty() {
        return Ok(0);
    }

    let mut media_lines = Vec::with_capacity(combined.len());
    for (i, track) in combined.iter().enumerate() {
        let rendition_dir = audio_root.join(&track.language);
        segment_audio_hls(ffmpeg_bin, Path::new(&track.input_url), &rendition_dir).await?;
        media_lines.push(media_line(&track.language, &track.language_code, i == 0));
    }

    let count = combined.len();
    pipeline.audio_tracks = combined;

    let mut playlist = MasterPlaylist::read(playlist_path).await?;
    playlist.splice(2, media_lines, true);
    playlist.edit_stream_inf(4, |line| {
        splice_into_trailing_quote(line, ",mp4a.40.2\",AUDIO=\"audio\"")
    })?;
    playlist.write(playlist_path).await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_track_is_marked_default() {
        assert!(media_line("eng", "eng", true).contains("DEFAULT=YES"));
        assert!(media_line("fra", "fra", false).contains("DEFAULT=NO"));
    }
}
