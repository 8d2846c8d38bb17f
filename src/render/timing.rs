/// Map a playback position onto an analysis frame.
///
/// `floor(position_s * sample_rate / hop_length)`, computed in integers so
/// the result is exact and monotonic in `position_ms`. Negative positions
/// (pre-roll) give frame 0; positions past the end stick to the last frame.
pub fn frame_index(position_ms: i64, sample_rate: u32, hop_length: usize, frame_count: usize) -> usize {
    if frame_count == 0 || hop_length == 0 {
        return 0;
    }
    let last = frame_count - 1;
    let Ok(position_ms) = u128::try_from(position_ms) else {
        return 0;
    };

    let index = position_ms * sample_rate as u128 / (1000 * hop_length as u128);
    usize::try_from(index).map_or(last, |i| i.min(last))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 22_050;
    const HOP: usize = 512;

    #[test]
    fn start_of_track_is_frame_zero() {
        assert_eq!(frame_index(0, SR, HOP, 100), 0);
    }

    #[test]
    fn matches_floor_of_seconds_times_rate_over_hop() {
        assert_eq!(frame_index(500, SR, HOP, 1000), 21);
        assert_eq!(frame_index(1000, SR, HOP, 1000), 43);
        assert_eq!(frame_index(1999, SR, HOP, 1000), 86);
    }

    #[test]
    fn clamps_to_last_frame() {
        assert_eq!(frame_index(5000, SR, HOP, 83), 82);
        assert_eq!(frame_index(i64::MAX, SR, HOP, 83), 82);
    }

    #[test]
    fn negative_positions_clamp_to_zero() {
        assert_eq!(frame_index(-250, SR, HOP, 83), 0);
        assert_eq!(frame_index(i64::MIN, SR, HOP, 83), 0);
    }

    #[test]
    fn empty_map_always_yields_zero() {
        assert_eq!(frame_index(1234, SR, HOP, 0), 0);
    }

    #[test]
    fn non_decreasing_in_position() {
        let mut prev = 0;
        for ms in (0..10_000).step_by(7) {
            let idx = frame_index(ms, SR, HOP, 300);
            assert!(idx >= prev);
            prev = idx;
        }
        assert_eq!(prev, 299);
    }
}
