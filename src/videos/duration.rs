/// Cutoff for treating a video as a YouTube Short.
const SHORT_MAX_SECS: u64 = 60;

/// Parse the ISO 8601 duration subset YouTube emits (`PT41M23S`,
/// `PT1H2M`, rarely `P1DT2H`). Returns total seconds.
pub fn parse_iso8601_duration(raw: &str) -> Option<u64> {
    let rest = raw.strip_prefix('P')?;
    let mut total: u64 = 0;
    let mut number = String::new();
    let mut saw_unit = false;

    for ch in rest.chars() {
        match ch {
            'T' => {
                if !number.is_empty() {
                    return None;
                }
            }
            '0'..='9' => number.push(ch),
            'D' | 'H' | 'M' | 'S' => {
                let value: u64 = number.parse().ok()?;
                number.clear();
                saw_unit = true;
                let factor = match ch {
                    'D' => 86_400,
                    'H' => 3_600,
                    'M' => 60,
                    _ => 1,
                };
                total = total.checked_add(value.checked_mul(factor)?)?;
            }
            _ => return None,
        }
    }

    if !number.is_empty() || !saw_unit {
        return None;
    }
    Some(total)
}

/// `H:MM:SS` for anything an hour or longer, `M:SS` below that.
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Shorts are filtered out of the default listing: anything a minute
/// or under, or explicitly tagged in the title.
pub fn is_short(duration_secs: Option<u64>, title: &str) -> bool {
    if duration_secs.is_some_and(|secs| secs <= SHORT_MAX_SECS) {
        return true;
    }
    title.to_lowercase().contains("#shorts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_common_shapes() {
        assert_eq!(parse_iso8601_duration("PT41M23S"), Some(2483));
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_iso8601_duration("PT1H"), Some(3600));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("P1DT2H"), Some(93_600));
        assert_eq!(parse_iso8601_duration("PT0S"), Some(0));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_iso8601_duration(""), None);
        assert_eq!(parse_iso8601_duration("41:23"), None);
        assert_eq!(parse_iso8601_duration("PT"), None);
        assert_eq!(parse_iso8601_duration("PT5"), None);
        assert_eq!(parse_iso8601_duration("PT5X"), None);
    }

    #[test]
    fn formats_with_and_without_hours() {
        assert_eq!(format_duration(3723), "1:02:03");
        assert_eq!(format_duration(2483), "41:23");
        assert_eq!(format_duration(45), "0:45");
        assert_eq!(format_duration(0), "0:00");
    }

    #[test]
    fn shorts_by_length_or_title_tag() {
        assert!(is_short(Some(45), "Quick thought on the parasha"));
        assert!(is_short(Some(60), "Exactly a minute"));
        assert!(!is_short(Some(61), "A minute and change"));
        assert!(is_short(None, "Daily chizuk #Shorts"));
        assert!(!is_short(None, "Full shiur on Bereishit"));
    }
}
