//! The resolution ladder: a fixed table of renditions and the floor-match
//! that picks every rendition at or below a source width (spec §4.1).
//!
//! Grounded on `original_source/tools/transcoder/transcoder.go`: the table
//! there is kept in two orders, a low-to-high one (`ResolutionsPriorityUpdate`)
//! that `FindResolutionFormat` actually walks, and a high-to-low one
//! (`ResolutionsPriority`) that exists only for legacy reporting. We keep
//! both for the same reason.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionName {
    R240p,
    R360p,
    R480p,
    R720p,
    R1080p,
    R4k,
}

impl fmt::Display for ResolutionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResolutionName::R240p => "240p",
            ResolutionName::R360p => "360p",
            ResolutionName::R480p => "480p",
            ResolutionName::R720p => "720p",
            ResolutionName::R1080p => "1080p",
            ResolutionName::R4k => "4k",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFormat {
    pub name: ResolutionName,
    pub measure: &'static str,
    pub video_bitrate: &'static str,
    pub priority: u8,
    /// Index into the probed source's stream list this entry was matched
    /// against. Filled in by the caller once a format has been chosen.
    pub index: i32,
}

impl ResolutionFormat {
    pub const fn width(&self) -> u32 {
        match self.name {
            ResolutionName::R240p => 426,
            ResolutionName::R360p => 640,
            ResolutionName::R480p => 854,
            ResolutionName::R720p => 1280,
            ResolutionName::R1080p => 1920,
            ResolutionName::R4k => 3840,
        }
    }
}

macro_rules! ladder_entry {
    ($name:expr, $measure:expr, $bitrate:expr, $priority:expr) => {
        ResolutionFormat {
            name: $name,
            measure: $measure,
            video_bitrate: $bitrate,
            priority: $priority,
            index: -1,
        }
    };
}

/// Canonical, low-to-high table `FindResolutionFormat` walks.
pub fn priority_ladder() -> Vec<ResolutionFormat> {
    vec![
        ladder_entry!(ResolutionName::R240p, "426x240", "300k", 0),
        ladder_entry!(ResolutionName::R360p, "640x360", "500k", 1),
        ladder_entry!(ResolutionName::R480p, "854x480", "1.5M", 2),
        ladder_entry!(ResolutionName::R720p, "1280x720", "3M", 3),
        ladder_entry!(ResolutionName::R1080p, "1920x1080", "4M", 4),
        ladder_entry!(ResolutionName::R4k, "3840x2160", "6M", 5),
    ]
}

/// Legacy high-to-low table, kept only so callers that want the historical
/// display ordering can still get it. Never used for matching.
pub fn legacy_order() -> Vec<ResolutionFormat> {
    let mut v = priority_ladder();
    v.reverse();
    v
}

/// Largest ladder entry whose width is `<= width`, exact match short-circuits.
/// Widths above the top entry collapse to the top entry. Widths below the
/// smallest entry have no match.
pub fn find_resolution_format(width: u32) -> Option<ResolutionFormat> {
    let ladder = priority_ladder();
    let max_width = ladder.last().expect("ladder is non-empty").width();
    if width > max_width {
        return Some(ladder.into_iter().last().unwrap());
    }

    let mut floor: Option<ResolutionFormat> = None;
    for entry in ladder {
        let w = entry.width();
        if width == w {
            return Some(entry);
        }
        if width > w {
            floor = Some(entry);
        }
    }
    floor
}

/// Every ladder entry at or below the matched format's priority, in
/// ascending priority order — the set of renditions a source actually gets
/// encoded to (spec §4.1).
pub fn renditions_up_to(matched_priority: u8) -> Vec<ResolutionFormat> {
    priority_ladder()
        .into_iter()
        .filter(|r| r.priority <= matched_priority)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_returns_that_entry() {
        let r = find_resolution_format(1280).unwrap();
        assert_eq!(r.name, ResolutionName::R720p);
        assert_eq!(r.priority, 3);
    }

    #[test]
    fn floor_match_picks_widest_entry_not_exceeding_source() {
        let r = find_resolution_format(1300).unwrap();
        assert_eq!(r.name, ResolutionName::R720p);
    }

    #[test]
    fn width_above_top_entry_collapses_to_4k() {
        let r = find_resolution_format(7680).unwrap();
        assert_eq!(r.name, ResolutionName::R4k);
    }

    #[test]
    fn width_below_smallest_entry_has_no_match() {
        assert!(find_resolution_format(100).is_none());
    }

    #[test]
    fn renditions_up_to_720p_includes_everything_below_it() {
        let rs = renditions_up_to(3);
        let names: Vec<_> = rs.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                ResolutionName::R240p,
                ResolutionName::R360p,
                ResolutionName::R480p,
                ResolutionName::R720p,
            ]
        );
    }

    proptest::proptest! {
        #[test]
        fn floor_match_never_exceeds_source_width(width in 1u32..8000) {
            if let Some(r) = find_resolution_format(width) {
                if r.name != ResolutionName::R4k {
                    proptest::prop_assert!(r.width() <= width);
                }
            }
        }
    }
}
