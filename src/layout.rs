//! Local working-directory layout for a job (spec §4.12). Grounded on
//! `original_source/tools/storage/file.go:CreateFolder`/`RemoveFromDir`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const RENDITION_DIRS: &[&str] = &["240p", "360p", "480p", "720p", "1080p", "4k", "audio", "subtitle"];

/// Creates `<root>/<key>/{240p,360p,...,audio,subtitle}` and returns the job
/// root (`<root>/<key>`).
pub async fn create_job_tree(root: &str, key: &str) -> Result<PathBuf> {
    let job_root = Path::new(root).join(key);
    tokio::fs::create_dir_all(&job_root)
        .await
        .with_context(|| format!("failed to create job directory {}", job_root.display()))?;

    for dir in RENDITION_DIRS {
        let path = job_root.join(dir);
        tokio::fs::create_dir_all(&path)
            .await
            .with_context(|| format!("failed to create rendition directory {}", path.display()))?;
    }

    Ok(job_root)
}

/// Removes a job's working tree entirely.
pub async fn cleanup(path: &Path) -> Result<()> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        tokio::fs::remove_dir_all(path)
            .await
            .with_context(|| format!("failed to remove job directory {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_job_tree_makes_every_rendition_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap();
        let job_root = create_job_tree(root, "job-42").await.unwrap();
        for dir in RENDITION_DIRS {
            assert!(job_root.join(dir).is_dir());
        }
    }

    #[tokio::test]
    async fn cleanup_removes_whole_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_str().unwrap();
        let job_root = create_job_tree(root, "job-1").await.unwrap();
        cleanup(&job_root).await.unwrap();
        assert!(!job_root.exists());
    }
}
