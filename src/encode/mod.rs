//! Encoder command builder and the GPU/CPU fallback policy (spec §4.3).
//! Grounded on `original_source/tools/ffmpeg/{newCommand.go,newCommandCpu.go,ffmpeg.go}`.

pub mod cpu;
pub mod gpu;

use crate::ladder::ResolutionFormat;
use crate::models::TrInfo;
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Runs the encoder for `info`, trying the configured path first and the
/// opposite path exactly once on failure (`ResizeVideoGpuMaster`'s
/// try-opposite-exactly-once policy — never a retry loop).
pub async fn encode_hls(ffmpeg_bin: &str, info: &TrInfo, renditions: &[ResolutionFormat]) -> Result<()> {
    let (primary, fallback): (fn(&TrInfo, &[ResolutionFormat]) -> Vec<String>, _) = if info.use_gpu {
        (gpu::build_command, cpu::build_command)
    } else {
        (cpu::build_command, gpu::build_command)
    };

    match run_ffmpeg(ffmpeg_bin, &primary(info, renditions)).await {
        Ok(()) => Ok(()),
        Err(primary_err) => {
            warn!(
                job_id = %info.pipeline.id,
                use_gpu = info.use_gpu,
                error = %primary_err,
                "primary encoder path failed, trying the opposite path once"
            );
            match run_ffmpeg(ffmpeg_bin, &fallback(info, renditions)).await {
                Ok(()) => {
                    info!(job_id = %info.pipeline.id, "fallback encoder path succeeded");
                    Ok(())
                }
                Err(_) => Err(primary_err),
            }
        }
    }
}

async fn run_ffmpeg(ffmpeg_bin: &str, args: &[String]) -> Result<()> {
    let output = tokio::process::Command::new(ffmpeg_bin)
        .args(args)
        .output()
        .await
        .context("failed to spawn ffmpeg")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffmpeg exited with {}: {stderr}", output.status);
    }
    Ok(())
}

/// `-var_stream_map "v:0,name:240p v:1,name:360p ..."`, shared by both paths.
pub(crate) fn var_stream_map(renditions: &[ResolutionFormat]) -> String {
    renditions
        .iter()
        .enumerate()
        .map(|(i, r)| format!("v:{i},name:{}", r.name))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The trailing HLS-muxer arguments both paths append, identical modulo the
/// master-playlist name and segment template.
pub(crate) fn hls_master_args(output_dir: &str) -> Vec<String> {
    vec![
        "-master_pl_name".into(),
        "master.m3u8".into(),
        "-hls_time".into(),
        "3".into(),
        "-hls_list_size".into(),
        "0".into(),
        "-hls_segment_filename".into(),
        format!("{output_dir}/%v/fileSequence%d.ts"),
        format!("{output_dir}/%v/index.m3u8"),
    ]
}
