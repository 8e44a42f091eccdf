use chrono::{DateTime, Datelike, Utc};

/// Calendar-month key used for insurance billing lookups, e.g. "2026-08".
pub fn month_key(ts: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", ts.year(), ts.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn month_key_zero_pads() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(month_key(ts), "2024-03");
        let ts = Utc.with_ymd_and_hms(2024, 11, 30, 23, 59, 59).unwrap();
        assert_eq!(month_key(ts), "2024-11");
    }
}
