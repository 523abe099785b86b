/// Format a number of seconds as mm:ss for the countdown display.
/// Minutes are not capped at 59, a two hour exam shows as 120:00.
pub fn format_clock(total_secs: u32) -> String {
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}", mins, secs)
}

pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock_zero() {
        assert_eq!(format_clock(0), "00:00");
    }

    #[test]
    fn test_format_clock_under_a_minute() {
        assert_eq!(format_clock(9), "00:09");
        assert_eq!(format_clock(59), "00:59");
    }

    #[test]
    fn test_format_clock_minutes() {
        assert_eq!(format_clock(60), "01:00");
        assert_eq!(format_clock(240), "04:00");
        assert_eq!(format_clock(754), "12:34");
    }

    #[test]
    fn test_format_clock_over_an_hour() {
        assert_eq!(format_clock(7200), "120:00");
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(3, 4), 75.0);
        assert_eq!(percentage(4, 4), 100.0);
    }

    #[test]
    fn test_percentage_empty_whole() {
        assert_eq!(percentage(0, 0), 0.0);
    }
}
