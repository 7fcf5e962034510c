//! Integration tests for the master playlist editor driven only through its
//! public API, against files written to a temp directory.

use std::path::Path;
use transcoder_worker::playlist::{splice_into_trailing_quote, MasterPlaylist};

async fn write_sample(path: &Path) {
    tokio::fs::write(
        path,
        "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360,CODECS=\"avc1.4d001f\"\n\
360p/index.m3u8\n\
#EXT-X-STREAM-INF:BANDWIDTH=1500000,RESOLUTION=1280x720,CODECS=\"avc1.4d001f\"\n\
720p/index.m3u8\n",
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn audio_splice_then_subtitle_splice_round_trips_through_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("master.m3u8");
    write_sample(&path).await;

    let mut playlist = MasterPlaylist::read(&path).await.unwrap();
    playlist.splice(2, vec!["#EXT-X-MEDIA:TYPE=AUDIO,NAME=\"eng\"".to_string()], true);
    playlist
        .edit_stream_inf(4, |line| splice_into_trailing_quote(line, ",mp4a.40.2\",AUDIO=\"audio\""))
        .unwrap();
    playlist.write(&path).await.unwrap();

    let mut playlist = MasterPlaylist::read(&path).await.unwrap();
    playlist.splice(3, vec!["#EXT-X-MEDIA:TYPE=SUBTITLES,NAME=\"eng\"".to_string()], false);
    playlist
        .edit_stream_inf(4, |line| Ok(format!("{line},SUBTITLES=\"subs\"")))
        .unwrap();
    playlist.write(&path).await.unwrap();

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    let variant_lines: Vec<&str> = content
        .lines()
        .filter(|l| l.contains("RESOLUTION"))
        .collect();

    assert_eq!(variant_lines.len(), 2);
    for line in &variant_lines {
        assert!(line.contains(",mp4a.40.2\",AUDIO=\"audio\""));
        assert!(line.ends_with(",SUBTITLES=\"subs\""));
    }
}

#[tokio::test]
async fn edit_stream_inf_never_touches_uri_lines() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("master.m3u8");
    write_sample(&path).await;

    let mut playlist = MasterPlaylist::read(&path).await.unwrap();
    playlist
        .edit_stream_inf(4, |line| Ok(format!("{line},X=1")))
        .unwrap();

    assert!(playlist.lines().iter().any(|l| l == "360p/index.m3u8"));
    assert!(playlist.lines().iter().any(|l| l == "720p/index.m3u8"));
}
