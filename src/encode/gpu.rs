//! GPU (NVENC/CUDA) command builder. Grounded on
//! `original_source/tools/ffmpeg/newCommand.go`.

use super::{hls_master_args, var_stream_map};
use crate::ladder::ResolutionFormat;
use crate::models::TrInfo;

/// Thread count the original picks from source duration: 2 below 400s, 3 at
/// or above it (`makeDynamicCommand`'s `threadCount`).
fn thread_count(duration: f64) -> &'static str {
    if duration < 400.0 {
        "2"
    } else {
        "3"
    }
}

fn filter_complex(source_index: i32, renditions: &[ResolutionFormat]) -> String {
    let count = renditions.len();
    let splits: String = (0..count).map(|i| format!("[in{i}]")).collect();
    let mut filter = format!("[0:{source_index}]split={count}{splits}");
    for (i, r) in renditions.iter().enumerate() {
        let width = r.measure.split('x').next().unwrap_or("-2");
        filter.push_str(&format!(";[in{i}]scale_npp={width}:-1[{}]", r.name));
    }
    filter
}

fn mapping_video(renditions: &[ResolutionFormat]) -> Vec<String> {
    let mut args = Vec::new();
    for (i, r) in renditions.iter().enumerate() {
        args.push("-map".into());
        args.push(format!("[{}]", r.name));
        args.push(format!("-c:v:{i}"));
        args.push("h264_nvenc".into());
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
        "-vsync".into(),
        "passthrough".into(),
        "-hwaccel".into(),
        "cuda".into(),
        "-hwaccel_output_format".into(),
        "cuda".into(),
        "-extra_hw_frames".into(),
        "5".into(),
        "-threads".into(),
        thread_count(info.duration).into(),
        "-i".into(),
        info.input.display().to_string(),
        "-filter_complex".into(),
        filter_complex(source_index, renditions),
        "-g".into(),
        "48".into(),
        "-sc_threshold".into(),
        "0".into(),
    ];
    args.extend(mapping_video(renditions));
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
    fn thread_count_switches_at_400_seconds() {
        assert_eq!(thread_count(399.0), "2");
        assert_eq!(thread_count(400.0), "3");
    }

    #[test]
    fn filter_complex_splits_once_per_rendition() {
        let rs = renditions_up_to(2);
        let fc = filter_complex(0, &rs);
        assert!(fc.contains("split=3"));
        assert!(fc.contains("scale_npp=426:-1[240p]"));
    }
}
