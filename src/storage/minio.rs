//! MinIO upload path: a single attempt per file, first failure aborts the
//! whole tree — grounded on
//! `original_source/tools/storage/minioStorage.go:UploadFilesToCloud`.

use super::{detect_content_type, relative_key};
use crate::models::Pipeline;
use anyhow::{Context, Result};
use aws_sdk_s3::Client;
use std::path::Path;
use walkdir::WalkDir;

pub async fn upload_files_to_cloud(client: &Client, pipeline: &Pipeline, local_dir: &Path) -> Result<()> {
    for entry in WalkDir::new(local_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = path
            .strip_prefix(local_dir)
            .with_context(|| format!("{} is not under {}", path.display(), local_dir.display()))?;
        let key = relative_key(&pipeline.output_key, rel);

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {} for upload", path.display()))?;
        let content_type = detect_content_type(&bytes[..bytes.len().min(512)]);

        client
            .put_object()
            .bucket(&pipeline.cdn_bucket)
            .key(&key)
            .body(bytes.into())
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("MinIO upload of {key} failed"))?;
    }
    Ok(())
}
