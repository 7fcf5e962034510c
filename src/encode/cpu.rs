//! CPU (libx264) command builder, the default fallback path. Grounded on
//! `original_source/tools/ffmpeg/newCommandCpu.go`.

use super::{hls_master_args, var_stream_map};
use crate::ladder::ResolutionFormat;
use crate::models::TrInfo;

fn stream_video(source_index: i32, renditions: &[ResolutionFormat]) -> Vec<String> {
    let mut args = Vec::new();
    for (i, r) in renditions.iter().enumerate() {
        args.push("-map".into());
        args.push(format!("0:{source_index}"));
        args.push(format!("-s:v:{i}"));
        args.push(r.measure.into());
        args.push(format!("-c:v:{i}"));
        args.push("libx264".into());
        args.push(format!("-b:v:{i}"));
        args.push(r.video_bitrate.into());
    }
    args
}

pub fn build_command(info: &TrInfo, renditions: &[ResolutionFormat]) -> Vec<String> {
    let source_index = info
        .video_info
        .highest_resolution_stream()
        .map(|s| s.index)
        .unwrap_or(0);

    let mut args: Vec<String> = vec![
        "-y".into(),
        "-i".into(),
        info.input.display().to_string(),
        "-preset".into(),
        "slow".into(),
        "-sc_threshold".into(),
        "0".into(),
    ];
    args.extend(stream_video(source_index, renditions));
    args.push("-var_stream_map".into());
    args.push(var_stream_map(renditions));
    args.extend(hls_master_args(&info.output.display().to_string()));
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::renditions_up_to;

    #[test]
    fn stream_video_emits_one_triplet_per_rendition() {
        let rs = renditions_up_to(1);
        let args = stream_video(0, &rs);
        assert_eq!(args.len(), rs.len() * 6);
        assert_eq!(args[4], "-c:v:0");
        assert_eq!(args[5], "libx264");
    }
}
