//! Predicates shared by the list filters. An absent or empty filter value
//! matches everything.

use chrono::{DateTime, NaiveDateTime, Utc};

fn active(filter: Option<&str>) -> Option<&str> {
    filter.map(str::trim).filter(|f| !f.is_empty())
}

/// Case-insensitive substring match. A missing field only matches an inactive filter.
pub fn contains_ci(field: Option<&str>, filter: Option<&str>) -> bool {
    match active(filter) {
        None => true,
        Some(needle) => field
            .map(|value| value.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
    }
}

pub fn exact<T: PartialEq>(field: &T, filter: Option<&T>) -> bool {
    filter.map_or(true, |wanted| field == wanted)
}

/// Prefix match against the ISO-8601 rendering, so `2024-05` selects a month
/// and `2024-05-01` a day.
pub fn date_prefix(rendered: &str, filter: Option<&str>) -> bool {
    active(filter).map_or(true, |prefix| rendered.starts_with(prefix))
}

pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn iso_local(at: &NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn substring_is_case_insensitive() {
        assert!(contains_ci(Some("María Gómez"), Some("maría")));
        assert!(contains_ci(Some("Buenos Aires"), Some("AIRES")));
        assert!(!contains_ci(Some("Rosario"), Some("cordoba")));
    }

    #[test]
    fn empty_filter_matches_missing_fields() {
        assert!(contains_ci(None, None));
        assert!(contains_ci(None, Some("  ")));
        assert!(!contains_ci(None, Some("x")));
    }

    #[test]
    fn date_prefix_selects_month_and_day() {
        let at = Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 0).unwrap();
        let rendered = iso_timestamp(&at);
        assert!(date_prefix(&rendered, Some("2024-05")));
        assert!(date_prefix(&rendered, Some("2024-05-14")));
        assert!(!date_prefix(&rendered, Some("2024-05-15")));
        assert!(date_prefix(&rendered, None));
    }

    #[test]
    fn exact_ignores_absent_filter() {
        assert!(exact(&3, None));
        assert!(exact(&3, Some(&3)));
        assert!(!exact(&3, Some(&4)));
    }
}
