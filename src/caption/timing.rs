/// Format seconds as a subtitle cue timestamp: `H:MM:SS.CC`.
///
/// Centisecond precision with rounding; negative inputs clamp to zero.
pub fn format_cue_time(seconds: f64) -> String {
    let clamped = seconds.max(0.0);
    let total_centis = (clamped * 100.0).round() as u64;
    let hours = total_centis / 360_000;
    let minutes = (total_centis % 360_000) / 6_000;
    let secs = (total_centis % 6_000) / 100;
    let centis = total_centis % 100;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, centis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cue_time() {
        assert_eq!(format_cue_time(0.0), "0:00:00.00");
        assert_eq!(format_cue_time(1.5), "0:00:01.50");
        assert_eq!(format_cue_time(65.123), "0:01:05.12");
        // 3661.005 * 100 lands just above the half-centisecond in f64, so
        // rounding goes up.
        assert_eq!(format_cue_time(3661.005), "1:01:01.01");
        assert_eq!(format_cue_time(3661.01), "1:01:01.01");
    }

    #[test]
    fn test_centisecond_rounding() {
        assert_eq!(format_cue_time(0.996), "0:00:01.00");
        assert_eq!(format_cue_time(0.994), "0:00:00.99");
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        assert_eq!(format_cue_time(-3.0), "0:00:00.00");
    }

    #[test]
    fn test_monotonic_within_fixed_width() {
        // Lexicographic order matches numeric order while the hour field
        // stays single-digit.
        let mut previous = format_cue_time(0.0);
        for i in 1..2000 {
            let current = format_cue_time(i as f64 * 1.37);
            assert!(previous <= current, "{} > {}", previous, current);
            previous = current;
        }
    }
}
