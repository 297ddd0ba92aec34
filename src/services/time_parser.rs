// src/services/time_parser.rs
use regex::Regex;
use std::sync::OnceLock;

static DURATION_PARTS: OnceLock<[(Regex, f64); 4]> = OnceLock::new();

fn duration_parts() -> &'static [(Regex, f64); 4] {
    DURATION_PARTS.get_or_init(|| {
        let part = |pattern: &str| Regex::new(pattern).expect("literal duration pattern");
        [
            (part(r"(\d+)d"), 24.0),
            (part(r"(\d+)h"), 1.0),
            (part(r"(\d+)m"), 1.0 / 60.0),
            (part(r"(\d+)s"), 1.0 / 3600.0),
        ]
    })
}

/// Converts a countdown such as `"1d 2h 3m"` into fractional hours.
///
/// Each unit is matched independently anywhere in the text; missing units count
/// as zero and anything unparseable yields `0.0`.
pub fn parse_duration(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }

    duration_parts()
        .iter()
        .filter_map(|(re, hours_per_unit)| {
            re.captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .map(|n| n * hours_per_unit)
        })
        .sum()
}

/// Renders a minute count as `"<h>h <m>m"`.
pub fn format_minutes(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn sums_every_unit() {
        assert!(close(parse_duration("1d 2h 3m 4s"), 24.0 + 2.0 + 3.0 / 60.0 + 4.0 / 3600.0));
        assert!(close(parse_duration("1d2h3m4s"), 24.0 + 2.0 + 3.0 / 60.0 + 4.0 / 3600.0));
    }

    #[test]
    fn missing_units_count_as_zero() {
        assert!(close(parse_duration("45m"), 0.75));
        assert!(close(parse_duration("3h"), 3.0));
        assert!(close(parse_duration("2d 30s"), 48.0 + 30.0 / 3600.0));
    }

    #[test]
    fn garbage_is_zero() {
        assert_eq!(parse_duration(""), 0.0);
        assert_eq!(parse_duration("Decayed"), 0.0);
        assert_eq!(parse_duration("--"), 0.0);
    }

    #[test]
    fn formats_minutes() {
        assert_eq!(format_minutes(0), "0h 0m");
        assert_eq!(format_minutes(125), "2h 5m");
    }
}
