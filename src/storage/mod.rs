//! Object storage upload dispatch (spec §4.8). Grounded on
//! `original_source/tools/storage/{s3.go,minioStorage.go,cloud_storage.go}`.
//! Both CDN types are S3-compatible, so both branches are built on
//! `aws_sdk_s3` pointed at the pipeline's own endpoint/credentials — the same
//! pattern the teacher's `main.rs` already uses to talk to Cloudflare R2
//! through the S3 API.

pub mod minio;
pub mod s3;

use crate::models::{CdnType, Pipeline};
use anyhow::Result;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client;
use std::path::Path;

/// Builds an S3 client scoped to one pipeline's CDN credentials. MinIO gets
/// path-style addressing since it rarely has wildcard DNS for
/// virtual-hosted buckets; real S3 uses the SDK's default.
fn client_for(pipeline: &Pipeline) -> Client {
    let credentials = Credentials::new(
        &pipeline.cdn_access_key,
        &pipeline.cdn_secret_key,
        None,
        None,
        "pipeline-cdn",
    );

    let mut builder = aws_sdk_s3::config::Builder::new()
        .credentials_provider(credentials)
        .region(Region::new(pipeline.cdn_region.clone()));

    if !pipeline.cdn_url.is_empty() {
        builder = builder.endpoint_url(&pipeline.cdn_url);
    }
    if pipeline.cdn_type == CdnType::Minio {
        builder = builder.force_path_style(true);
    }

    Client::from_conf(builder.build())
}

/// Uploads every file under `local_dir` to the pipeline's configured bucket,
/// dispatching by `cdn_type` since S3 and MinIO have different retry
/// policies (spec §4.8, §7).
pub async fn upload_tree(pipeline: &Pipeline, local_dir: &Path) -> Result<()> {
    let client = client_for(pipeline);
    match pipeline.cdn_type {
        CdnType::S3 => s3::upload_files_to_cloud(&client, pipeline, local_dir).await,
        CdnType::Minio => minio::upload_files_to_cloud(&client, pipeline, local_dir).await,
        CdnType::Unknown => anyhow::bail!("unrecognized cdn_type"),
    }
}

/// Sniffs content-type from the first 512 bytes, matching Go's
/// `http.DetectContentType` semantics more closely than extension-based
/// guessing would.
pub(crate) fn detect_content_type(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

pub(crate) fn relative_key(output_key: &str, rel_path: &Path) -> String {
    format!("{}/{}", output_key, rel_path.display())
}
