//! Wire types for the broker ingress/egress protocol (spec §3, §6).

use crate::ladder::ResolutionFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A pipeline job as delivered on the ingress queue. Immutable except for
/// `audio_tracks` and `subtitle`, which the transcode stage appends to as it
/// discovers streams embedded in the source container.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub input_uri: String,
    pub output_key: String,
    pub output_path: String,
    #[serde(default)]
    pub cdn_url: String,
    #[serde(default)]
    pub cdn_access_key: String,
    #[serde(default)]
    pub cdn_secret_key: String,
    #[serde(default)]
    pub cdn_region: String,
    #[serde(default)]
    pub cdn_bucket: String,
    pub cdn_type: CdnType,
    #[serde(default)]
    pub resolutions: Vec<String>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrack>,
    #[serde(default)]
    pub subtitle: Vec<SubtitleRequest>,
}

/// Unrecognized values deserialize to `Unknown` rather than failing the
/// whole `Pipeline` parse, so a bad `cdn_type` surfaces as an
/// `InvalidRequest` failure at upload dispatch (spec §7) instead of
/// silently dropping the message at the broker boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CdnType {
    Minio,
    S3,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioTrack {
    #[serde(default)]
    pub id: String,
    pub input_url: String,
    #[serde(default, rename = "lang_code")]
    pub language_code: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubtitleRequest {
    pub input_url: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    pub language: String,
}

/// Normalized probe result: an ordered sequence of stream records (spec §3 VideoInfo).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub streams: Vec<Stream>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Stream {
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub profile: String,
    pub codec_type: String,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub tags: StreamTags,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamTags {
    #[serde(default)]
    pub language: String,
}

impl VideoInfo {
    /// The video stream with the highest resolution, ties broken on height
    /// (spec §4.1; the original only compares width, we honor the spec's
    /// stated height tie-break here since it is the one place a tie can
    /// actually occur — two video streams sharing a width).
    pub fn highest_resolution_stream(&self) -> Option<&Stream> {
        self.streams
            .iter()
            .filter(|s| s.codec_type == "video")
            .max_by(|a, b| (a.width, a.height).cmp(&(b.width, b.height)))
    }
}

/// Status envelope published at every stage boundary and on failure (spec §3).
#[derive(Debug, Clone, Serialize)]
pub struct UpdatePipelineStage {
    pub id: String,
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(rename = "preparation_duration")]
    pub preparation_duration_ms: u64,
    #[serde(rename = "transcode_duration")]
    pub transcode_duration_ms: u64,
    #[serde(rename = "upload_duration")]
    pub upload_duration_ms: u64,
    pub video_duration: f64,
    pub resolutions: Vec<Resolution>,
    pub fail_description: String,
    pub error_code: ErrorCode,
}

impl UpdatePipelineStage {
    pub fn pending(id: impl Into<String>, stage: Stage) -> Self {
        Self {
            id: id.into(),
            stage,
            status: StageStatus::Pending,
            preparation_duration_ms: 0,
            transcode_duration_ms: 0,
            upload_duration_ms: 0,
            video_duration: 0.0,
            resolutions: Vec::new(),
            fail_description: String::new(),
            error_code: ErrorCode::Success,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preparation,
    Transcode,
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Success,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    Success,
    InvalidRequest,
    InternalServerError,
}

/// A rendition entry as reported on the wire (spec §3 Resolution).
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub resolution: String,
    pub measure: String,
    pub bitrate: String,
}

/// Per-job working set threaded through the three pipeline stages over
/// `tokio::sync::mpsc` channels. Owned exclusively by whichever worker holds
/// it at a given moment — no `Arc`/`Mutex` needed.
pub struct TrInfo {
    pub file_name: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub upload_path: PathBuf,
    pub use_gpu: bool,
    pub video_info: VideoInfo,
    pub duration: f64,
    pub resolution: ResolutionFormat,
    pub pipeline: Pipeline,
}
