//! S3 upload path: retries each file up to 5 times with a 5s backoff, and
//! recreates the client handle every 1,000 files with a 1s pause — grounded
//! on `original_source/tools/storage/s3.go:UploadFilesToCloud`.

use super::{client_for, detect_content_type, relative_key};
use crate::models::Pipeline;
use anyhow::{Context, Result};
use aws_sdk_s3::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;

const MAX_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_secs(5);
const RECREATE_EVERY: usize = 1000;

pub async fn upload_files_to_cloud(client: &Client, pipeline: &Pipeline, local_dir: &Path) -> Result<()> {
    let mut client = client.clone();
    let mut uploaded = 0usize;

    for entry in WalkDir::new(local_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = path
            .strip_prefix(local_dir)
            .with_context(|| format!("{} is not under {}", path.display(), local_dir.display()))?;
        let key = relative_key(&pipeline.output_key, rel);

        upload_one_with_retry(&client, pipeline, path, &key).await?;

        uploaded += 1;
        if uploaded % RECREATE_EVERY == 0 {
            info!(uploaded, "recreating S3 client handle after 1000 uploads");
            client = client_for(pipeline);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
    Ok(())
}

async fn upload_one_with_retry(client: &Client, pipeline: &Pipeline, path: &Path, key: &str) -> Result<()> {
    let mut last_err = None;
    for attempt in 1..=MAX_ATTEMPTS {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {} for upload", path.display()))?;
        let content_type = detect_content_type(&bytes[..bytes.len().min(512)]);

        let result = client
            .put_object()
            .bucket(&pipeline.cdn_bucket)
            .key(key)
            .body(bytes.into())
            .content_type(content_type)
            .send()
            .await;

        match result {
            Ok(_) => return Ok(()),
            Err(e) => {
                warn!(attempt, key, error = %e, "S3 upload attempt failed");
                last_err = Some(e);
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }
    }
    Err(anyhow::anyhow!(
        "S3 upload of {key} failed after {MAX_ATTEMPTS} attempts: {:?}",
        last_err
    ))
}
