//! Integration tests for the resolution ladder's public matching API
//! (spec §8's ladder-matching properties).

use proptest::prelude::*;
use transcoder_worker::ladder::{find_resolution_format, renditions_up_to, ResolutionName};

#[test]
fn ladder_has_six_renditions_at_the_top_priority() {
    let top = find_resolution_format(7680).unwrap();
    let all = renditions_up_to(top.priority);
    assert_eq!(all.len(), 6);
    assert_eq!(all.last().unwrap().name, ResolutionName::R4k);
}

#[test]
fn renditions_up_to_is_monotonic_in_priority() {
    for p in 0..=5u8 {
        let rs = renditions_up_to(p);
        assert_eq!(rs.len(), p as usize + 1);
        assert!(rs.windows(2).all(|w| w[0].priority < w[1].priority));
    }
}

proptest! {
    #[test]
    fn a_matched_format_is_always_in_its_own_up_to_set(width in 1u32..8000) {
        if let Some(format) = find_resolution_format(width) {
            let set = renditions_up_to(format.priority);
            prop_assert!(set.iter().any(|r| r.name == format.name));
        }
    }

    #[test]
    fn higher_source_width_never_yields_a_lower_priority(a in 1u32..8000, b in 1u32..8000) {
        if let (Some(fa), Some(fb)) = (find_resolution_format(a), find_resolution_format(b)) {
            if a <= b {
                prop_assert!(fa.priority <= fb.priority);
            }
        }
    }
}
