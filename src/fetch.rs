//! Downloads a source video to local disk (spec §4.11). Grounded on
//! `original_source/tools/storage/file.go:DownloadWithWget`; the encoder and
//! prober binaries are treated as opaque external processes the same way
//! here.

use anyhow::{Context, Result};
use std::path::Path;

pub async fn download(url: &str, dest: &Path) -> Result<()> {
    let output = tokio::process::Command::new("wget")
        .arg("-O")
        .arg(dest)
        .arg(url)
        .output()
        .await
        .context("failed to spawn wget")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("wget failed for {url}: {stderr}");
    }
    Ok(())
}
