//! Integration tests for VTT duration parsing and one-segment playlist
//! synthesis, driven only through the public API (spec §8).

use proptest::prelude::*;
use transcoder_worker::subtitle_vtt::{create_m3u8_from_vtt, parse_vtt_total_duration};

#[tokio::test]
async fn duration_ignores_cue_order_and_picks_the_latest_end() {
    let tmp = tempfile::tempdir().unwrap();
    let vtt = tmp.path().join("out-of-order.vtt");
    tokio::fs::write(
        &vtt,
        "WEBVTT\n\n\
00:00:10.000 --> 00:00:15.000\nSecond\n\n\
00:00:00.000 --> 00:00:03.000\nFirst\n\n\
01:00:00.000 --> 01:00:01.000\nLast\n",
    )
    .await
    .unwrap();

    let duration = parse_vtt_total_duration(&vtt).await.unwrap();
    assert_eq!(duration, 3601.0);
}

#[tokio::test]
async fn generated_playlist_always_ends_with_endlist() {
    let tmp = tempfile::tempdir().unwrap();
    tokio::fs::write(
        tmp.path().join("single.vtt"),
        "WEBVTT\n\n00:00:00.000 --> 00:00:04.000\nHi\n",
    )
    .await
    .unwrap();

    create_m3u8_from_vtt(tmp.path(), "single.vtt").await.unwrap();
    let content = tokio::fs::read_to_string(tmp.path().join("index.m3u8")).await.unwrap();
    assert!(content.trim_end().ends_with("#EXT-X-ENDLIST"));
    assert!(content.starts_with("#EXTM3U"));
}

proptest! {
    #[test]
    fn target_duration_is_never_less_than_the_cue_end(end_tenths in 1u32..36000) {
        let end = end_tenths as f64 / 10.0;
        let target = end.ceil() as u64;
        prop_assert!(target as f64 >= end);
    }
}
